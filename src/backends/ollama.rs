use async_trait::async_trait;
use reqwest::{Client, IntoUrl, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::backends::{
    backends::Provider, reqwest_error_kind, Backend, Completion, Error, ErrorKind,
};
use crate::registry::registry::{ModelRecord, Settings};

const OLLAMA_DEFAULT_ENDPOINT: &'static str = "http://localhost:11434";

#[derive(Debug, thiserror::Error)]
pub(super) enum ApiError {
    #[error("invalid ollama api base: {0}")]
    InvalidApiBase(reqwest::Error),

    #[error("invalid ollama endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("a request to ollama failed: {0}")]
    RequestFailed(reqwest::Error),

    #[error("failed to query ollama resource: {0}")]
    NotFound(String),

    #[error("request to the ollama api failed: {0}")]
    BadRequest(String),

    #[error("ollama encountered an internal error: {0}")]
    InternalError(String),

    #[error("the ollama API returned an unspecified error: {0}")]
    UnspecifiedError(String),
}

impl From<ApiError> for Error {
    fn from(value: ApiError) -> Self {
        let kind = match &value {
            ApiError::RequestFailed(err) => reqwest_error_kind(err),
            ApiError::InvalidApiBase(_) | ApiError::InvalidEndpoint(_) => ErrorKind::Connection,
            ApiError::NotFound(_) => ErrorKind::NotFound,
            ApiError::BadRequest(_) => ErrorKind::BadRequest,
            ApiError::InternalError(_) => ErrorKind::InternalError,
            ApiError::UnspecifiedError(_) => ErrorKind::UnspecifiedError,
        };

        Error::from_source(kind, Box::new(value))
    }
}

/* === IO === */

// Structures to serialize /api/chat

#[derive(Serialize, Debug)]
struct ChatMessage<'m> {
    role: &'static str,
    content: &'m str,
}

#[derive(Serialize, Debug, Default, PartialEq)]
struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    // Ollama spells the completion-length limit "num_predict".
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

impl ChatOptions {
    fn from_settings(settings: &Settings) -> ChatOptions {
        ChatOptions {
            temperature: settings.get("temperature").and_then(Value::as_f64),
            top_p: settings.get("top_p").and_then(Value::as_f64),
            num_predict: settings
                .get("max_tokens")
                .and_then(Value::as_u64)
                .map(|v| v as u32),
        }
    }
}

#[derive(Serialize, Debug)]
struct ChatRequest<'m> {
    model: &'m str,
    messages: &'m [ChatMessage<'m>],
    options: &'m ChatOptions,
    stream: bool,
}

// Structures to deserialize /api/chat

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    content: String,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    message: ResponseMessage,
}

// Errors

#[derive(Deserialize, Debug)]
struct ApiErrorBody {
    error: String,
}

struct OllamaApi {
    api_base: Url,
}

impl OllamaApi {
    fn with_api_base<U: IntoUrl>(api_base: U) -> Result<OllamaApi, ApiError> {
        Ok(OllamaApi {
            api_base: api_base.into_url().map_err(ApiError::InvalidApiBase)?,
        })
    }

    async fn maybe_parse_api_error(res: Response) -> Result<Response, ApiError> {
        let status = res.status();

        if status.is_success() {
            return Ok(res);
        }

        let message = match res.json::<ApiErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => format!("http status {}", status),
        };

        match status {
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(message)),
            code => match code.as_u16() {
                400..=499 => Err(ApiError::BadRequest(message)),
                500..=599 => Err(ApiError::InternalError(message)),
                _ => Err(ApiError::UnspecifiedError(message)),
            },
        }
    }

    // The tag listing doubles as a liveness check; the probe only cares
    // whether the endpoint answers, so the body is not parsed.
    async fn tags(&self) -> Result<(), ApiError> {
        let url = self.api_base.join("/api/tags")?;

        let res = Client::new()
            .get(url)
            .send()
            .await
            .map_err(ApiError::RequestFailed)?;

        Self::maybe_parse_api_error(res).await?;

        Ok(())
    }

    async fn chat(
        &self,
        model: &str,
        prompt: &str,
        options: &ChatOptions,
    ) -> Result<String, ApiError> {
        let url = self.api_base.join("/api/chat")?;

        let messages = [ChatMessage {
            role: "user",
            content: prompt,
        }];

        let res = Client::new()
            .post(url)
            .json(&ChatRequest {
                model,
                messages: &messages,
                options,
                stream: false,
            })
            .send()
            .await
            .map_err(ApiError::RequestFailed)?;

        let res = Self::maybe_parse_api_error(res).await?;

        let completion: ChatResponse = res.json().await.map_err(ApiError::RequestFailed)?;

        Ok(completion.message.content)
    }
}

pub(crate) struct OllamaBackend {
    api: OllamaApi,
}

impl OllamaBackend {
    pub(crate) fn with_api_base<U: IntoUrl>(api_base: U) -> Result<OllamaBackend, Error> {
        Ok(OllamaBackend {
            api: OllamaApi::with_api_base(api_base)?,
        })
    }

    pub(crate) fn new() -> OllamaBackend {
        Self::with_api_base(OLLAMA_DEFAULT_ENDPOINT).unwrap()
    }
}

#[async_trait]
impl Backend for OllamaBackend {
    fn provider(&self) -> Provider {
        Provider::Ollama
    }

    async fn reachable(&self) -> bool {
        match self.api.tags().await {
            Ok(_) => true,
            // Any answer at all means the runtime is up; only transport
            // failures count as unreachable.
            Err(err) => !matches!(
                Error::from(err).kind(),
                ErrorKind::Connection | ErrorKind::TimedOut
            ),
        }
    }

    async fn execute(
        &self,
        record: &ModelRecord,
        prompt: &str,
        settings: &Settings,
    ) -> Result<Completion, Error> {
        let options = ChatOptions::from_settings(settings);

        let response = self.api.chat(&record.name, prompt, &options).await?;

        Ok(Completion {
            model: record.id.clone(),
            prompt: prompt.to_string(),
            response,
            settings: settings.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_options_map_max_tokens_to_num_predict() {
        let settings = match json!({"temperature": 0.7, "max_tokens": 2000, "top_p": 0.9}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };

        let options = ChatOptions::from_settings(&settings);

        assert_eq!(options.num_predict, Some(2000));
        assert_eq!(options.temperature, Some(0.7));
        assert_eq!(options.top_p, Some(0.9));
    }

    #[test]
    fn test_request_serialization() {
        let options = ChatOptions {
            temperature: Some(0.7),
            ..ChatOptions::default()
        };

        let messages = [ChatMessage {
            role: "user",
            content: "Hello!",
        }];

        let request = ChatRequest {
            model: "llama3",
            messages: &messages,
            options: &options,
            stream: false,
        };

        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(
            body,
            json!({
                "model": "llama3",
                "messages": [{"role": "user", "content": "Hello!"}],
                "options": {"temperature": 0.7},
                "stream": false
            })
        );
    }
}

//! Non-streaming client for OpenAI-compatible chat-completion APIs.
//!
//! Both the OpenAI and Groq backends speak this wire format; they differ
//! only in API base and credentials.

use reqwest::{Client, IntoUrl};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::backends::{reqwest_error_kind, ErrorKind};
use crate::registry::registry::Settings;

#[derive(thiserror::Error, Debug)]
pub(super) enum Error {
    /// The API base is not a URL that can be used in a network request
    #[error("invalid api base")]
    InvalidApiBase(#[source] reqwest::Error),

    /// Endpoint URL is invalid
    #[error("invalid endpoint")]
    InvalidEndpoint(
        #[from]
        #[source]
        url::ParseError,
    ),

    /// Some issue with the request
    #[error("request failed: {0}")]
    RequestFailed(#[source] reqwest::Error),

    /// The completion arrived but carried no choices
    #[error("the completion response contained no choices")]
    MalformedResponse,

    /// Your request was malformed or missing some required parameters
    #[error("{}", .0.message)]
    BadRequest(ApiErrorPayload),

    /// Invalid authentication or an incorrect API key
    #[error("{}", .0.message)]
    Authentication(ApiErrorPayload),

    /// You don't have access to the requested resource
    #[error("{}", .0.message)]
    PermissionDenied(ApiErrorPayload),

    /// Requested resource does not exist
    #[error("{}", .0.message)]
    NotFound(ApiErrorPayload),

    /// You have hit your assigned rate limit
    #[error("{}", .0.message)]
    RateLimit(ApiErrorPayload),

    /// The service has an internal issue
    #[error("{}", .0.message)]
    InternalError(ApiErrorPayload),

    /// The engine is currently overloaded, please try again later
    #[error("{}", .0.message)]
    ApiOverloaded(ApiErrorPayload),

    /// Some unknown error was returned by the API
    #[error("{}", .0.message)]
    UnknownStatus(ApiErrorPayload),
}

impl Error {
    fn from_status(status: u16, payload: ApiErrorPayload) -> Error {
        match status {
            400 => Error::BadRequest(payload),
            401 => Error::Authentication(payload),
            403 => Error::PermissionDenied(payload),
            404 => Error::NotFound(payload),
            429 => Error::RateLimit(payload),
            500 => Error::InternalError(payload),
            503 => Error::ApiOverloaded(payload),
            _ => Error::UnknownStatus(payload),
        }
    }
}

impl From<Error> for crate::backends::Error {
    fn from(value: Error) -> Self {
        let kind = match &value {
            Error::Authentication(_) | Error::PermissionDenied(_) => ErrorKind::Authentication,
            Error::BadRequest(_) | Error::InvalidApiBase(_) | Error::InvalidEndpoint(_) => {
                ErrorKind::BadRequest
            }
            Error::InternalError(_) => ErrorKind::InternalError,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::RateLimit(_) => ErrorKind::ExcessUsage,
            Error::ApiOverloaded(_) => ErrorKind::ApiOverloaded,
            Error::MalformedResponse => ErrorKind::UnexpectedResponse,
            Error::UnknownStatus(_) => ErrorKind::UnspecifiedError,
            Error::RequestFailed(err) => reqwest_error_kind(err),
        };

        crate::backends::Error::from_source(kind, Box::new(value))
    }
}

/* Structures to serialize /chat/completions */

#[derive(Serialize, Debug)]
struct ChatMessage<'m> {
    role: &'static str,
    content: &'m str,
}

#[derive(Serialize, Debug, Default, PartialEq)]
pub(super) struct CompletionOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f64>,
}

fn float_setting(settings: &Settings, key: &str) -> Option<f64> {
    settings.get(key).and_then(Value::as_f64)
}

fn int_setting(settings: &Settings, key: &str) -> Option<u32> {
    settings.get(key).and_then(Value::as_u64).map(|v| v as u32)
}

impl CompletionOptions {
    /// Extracts the wire parameters this API understands from the merged
    /// settings map. Keys the API has no field for are ignored.
    pub(super) fn from_settings(settings: &Settings) -> CompletionOptions {
        CompletionOptions {
            temperature: float_setting(settings, "temperature"),
            top_p: float_setting(settings, "top_p"),
            max_tokens: int_setting(settings, "max_tokens"),
            presence_penalty: float_setting(settings, "presence_penalty"),
            frequency_penalty: float_setting(settings, "frequency_penalty"),
        }
    }
}

#[derive(Serialize, Debug)]
struct ChatCompletionRequest<'m> {
    model: &'m str,
    messages: &'m [ChatMessage<'m>],
    #[serde(flatten)]
    options: &'m CompletionOptions,
    stream: bool,
}

/* Structures to deserialize /chat/completions */

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    content: String,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

/* API Errors */

#[derive(Deserialize, Debug)]
pub(super) struct ApiErrorPayload {
    pub message: String,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    error: ApiErrorPayload,
}

pub(super) struct ChatCompletionsApi {
    api_base: Url,
    api_key: String,
}

impl ChatCompletionsApi {
    pub(super) fn new<U: IntoUrl>(api_key: &str, api_base: U) -> Result<ChatCompletionsApi, Error> {
        let api_base = api_base.into_url().map_err(Error::InvalidApiBase)?;

        Ok(ChatCompletionsApi {
            api_base,
            api_key: api_key.to_string(),
        })
    }

    pub(super) async fn complete(
        &self,
        model: &str,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, Error> {
        let url = self.api_base.join("chat/completions")?;

        let messages = [ChatMessage {
            role: "user",
            content: prompt,
        }];

        let res = Client::new()
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&ChatCompletionRequest {
                model,
                messages: &messages,
                options,
                stream: false,
            })
            .send()
            .await
            .map_err(Error::RequestFailed)?;

        let status = res.status();

        if !status.is_success() {
            let payload = match res.json::<ApiErrorResponse>().await {
                Ok(body) => body.error,
                // The error body is not the documented envelope. Synthesize
                // a payload from the status so the failure stays structured.
                Err(_) => ApiErrorPayload {
                    message: format!("http status {}", status),
                },
            };

            return Err(Error::from_status(status.as_u16(), payload));
        }

        let completion: ChatCompletion = res.json().await.map_err(Error::RequestFailed)?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or(Error::MalformedResponse)?;

        Ok(choice.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings_of(value: serde_json::Value) -> Settings {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_options_from_settings() {
        let settings = settings_of(json!({
            "temperature": 0.7,
            "max_tokens": 2000,
            "top_p": 1,
            "frequency_penalty": 0,
            "presence_penalty": 0
        }));

        let options = CompletionOptions::from_settings(&settings);

        assert_eq!(options.temperature, Some(0.7));
        assert_eq!(options.max_tokens, Some(2000));
        assert_eq!(options.top_p, Some(1.0));
        assert_eq!(options.frequency_penalty, Some(0.0));
        assert_eq!(options.presence_penalty, Some(0.0));
    }

    #[test]
    fn test_unknown_settings_ignored() {
        let settings = settings_of(json!({
            "temperature": 0.2,
            "voice": "alloy"
        }));

        let options = CompletionOptions::from_settings(&settings);

        assert_eq!(options.temperature, Some(0.2));
        assert_eq!(options.max_tokens, None);
    }

    #[test]
    fn test_request_serialization() {
        let options = CompletionOptions {
            temperature: Some(0.5),
            max_tokens: Some(100),
            ..CompletionOptions::default()
        };

        let messages = [ChatMessage {
            role: "user",
            content: "Hello",
        }];

        let request = ChatCompletionRequest {
            model: "gpt-4o",
            messages: &messages,
            options: &options,
            stream: false,
        };

        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(
            body,
            json!({
                "model": "gpt-4o",
                "messages": [{"role": "user", "content": "Hello"}],
                "temperature": 0.5,
                "max_tokens": 100,
                "stream": false
            })
        );
    }

    #[test]
    fn test_error_status_mapping() {
        let payload = |msg: &str| ApiErrorPayload {
            message: msg.to_string(),
        };

        assert!(matches!(
            Error::from_status(401, payload("bad key")),
            Error::Authentication(_)
        ));
        assert!(matches!(
            Error::from_status(404, payload("no model")),
            Error::NotFound(_)
        ));
        assert!(matches!(
            Error::from_status(429, payload("slow down")),
            Error::RateLimit(_)
        ));
        assert!(matches!(
            Error::from_status(502, payload("bad gateway")),
            Error::UnknownStatus(_)
        ));
    }
}

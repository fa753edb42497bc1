use async_trait::async_trait;
use reqwest::IntoUrl;

use super::chat_api::{ChatCompletionsApi, CompletionOptions};
use crate::backends::{backends::Provider, Backend, Completion, Error};
use crate::registry::registry::{ModelRecord, Settings};

// Groq serves the OpenAI chat-completions wire format under its own host.
const DEFAULT_API_BASE: &'static str = "https://api.groq.com/openai/v1/";

pub(crate) struct GroqBackend {
    api: ChatCompletionsApi,
}

impl GroqBackend {
    pub(crate) fn new<U: IntoUrl>(api_key: &str, api_base: U) -> Result<GroqBackend, Error> {
        Ok(GroqBackend {
            api: ChatCompletionsApi::new(api_key, api_base)?,
        })
    }

    pub(crate) fn with_api_key(api_key: &str) -> GroqBackend {
        Self::new(api_key, DEFAULT_API_BASE).unwrap()
    }
}

#[async_trait]
impl Backend for GroqBackend {
    fn provider(&self) -> Provider {
        Provider::Groq
    }

    async fn execute(
        &self,
        record: &ModelRecord,
        prompt: &str,
        settings: &Settings,
    ) -> Result<Completion, Error> {
        let options = CompletionOptions::from_settings(settings);

        let response = self.api.complete(&record.name, prompt, &options).await?;

        Ok(Completion {
            model: record.id.clone(),
            prompt: prompt.to_string(),
            response,
            settings: settings.clone(),
        })
    }
}

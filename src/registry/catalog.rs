use std::collections::HashMap;

use lazy_static::lazy_static;
use serde_json::{json, Value};

use super::registry::Settings;
use crate::backends::backends::Provider;

// The cloud providers offer no stable listing API worth depending on at
// startup, and the local runtime's catalogue must exist even when the
// runtime is down, so every family ships a fixed catalogue. This list needs
// updating when providers rotate their line-ups.
pub(crate) const OPENAI_MODELS: [&str; 3] = ["gpt-4o", "gpt-4-turbo", "gpt-3.5-turbo"];

pub(crate) const OLLAMA_MODELS: [&str; 4] = ["llama3", "mistral", "gemma", "phi"];

pub(crate) const GROQ_MODELS: [&str; 3] =
    ["llama3-70b-8192", "llama3-8b-8192", "mixtral-8x7b-32768"];

const FALLBACK_DESCRIPTION: &'static str = "No description available.";

lazy_static! {
    static ref DESCRIPTIONS: HashMap<&'static str, &'static str> = HashMap::from([
        // OpenAI models
        ("gpt-4o", "Powerful multimodal model for various tasks."),
        ("gpt-4-turbo", "Advanced model with high performance and speed."),
        ("gpt-3.5-turbo", "Fast and cost-effective model for simpler tasks."),
        // Ollama models
        ("llama3", "Local Llama 3 model for enhanced privacy and offline use."),
        ("mistral", "Efficient local model with good price-performance ratio."),
        ("gemma", "Compact, lightweight model from Google for local execution."),
        ("phi", "Small, efficient model for resource-constrained environments."),
        // Groq models
        ("llama3-70b-8192", "Large Llama 3 model (70B) with high performance via Groq."),
        ("llama3-8b-8192", "Smaller Llama 3 model (8B) with good balance of performance and speed."),
        ("mixtral-8x7b-32768", "Powerful Mixtral model with large context window."),
    ]);
}

pub(crate) fn model_description(name: &str) -> &'static str {
    DESCRIPTIONS.get(name).copied().unwrap_or(FALLBACK_DESCRIPTION)
}

/// The default-settings template a catalogue record of this provider starts
/// from. Each record gets its own copy; templates are never shared.
pub(crate) fn default_settings(provider: Provider) -> Settings {
    let template = match provider {
        Provider::OpenAI => json!({
            "temperature": 0.7,
            "max_tokens": 2000,
            "top_p": 1,
            "frequency_penalty": 0,
            "presence_penalty": 0
        }),
        Provider::Ollama | Provider::Groq => json!({
            "temperature": 0.7,
            "max_tokens": 2000,
            "top_p": 0.9
        }),
        Provider::HuggingFace | Provider::Custom => json!({
            "temperature": 0.7,
            "max_tokens": 2000
        }),
    };

    match template {
        Value::Object(map) => map,
        _ => unreachable!("settings templates are objects"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_known_description() {
        assert_eq!(
            model_description("gpt-4o"),
            "Powerful multimodal model for various tasks."
        );
    }

    #[test]
    fn test_unknown_description_falls_back() {
        assert_eq!(model_description("gpt-17"), "No description available.");
    }

    #[test]
    fn test_templates_differ_per_provider() {
        let openai = default_settings(Provider::OpenAI);
        let ollama = default_settings(Provider::Ollama);

        assert_eq!(openai["top_p"], json!(1));
        assert_eq!(ollama["top_p"], json!(0.9));
        assert!(openai.contains_key("frequency_penalty"));
        assert!(!ollama.contains_key("frequency_penalty"));
    }
}

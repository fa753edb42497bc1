use std::env::VarError;

use crate::die;

use super::catalog::{
    default_settings, model_description, GROQ_MODELS, OLLAMA_MODELS, OPENAI_MODELS,
};
use super::registry::{ModelRecord, Registry};
use crate::backends::backends::{GroqBackend, OllamaBackend, OpenAIBackend, Provider};
use crate::config::{Config, ProviderActivationPolicy};
use crate::system::ModelSystem;

const OPENAI_ENV_KEY_VAR: &'static str = "OPENAI_API_KEY";
const GROQ_ENV_KEY_VAR: &'static str = "GROQ_API_KEY";
const OLLAMA_ENV_BASE_VAR: &'static str = "OLLAMA_BASE_URL";

fn env_var(var: &'static str) -> Option<String> {
    match std::env::var(var) {
        Ok(value) => Some(value),
        Err(err) => match err {
            VarError::NotUnicode(_) => die!("failed to parse {}", var),
            VarError::NotPresent => None,
        },
    }
}

fn catalogue_records(provider: Provider, names: &[&str], is_local: bool) -> Vec<ModelRecord> {
    names
        .iter()
        .map(|name| ModelRecord {
            id: format!("{}-{}", provider, name),
            name: name.to_string(),
            provider,
            description: model_description(name).to_string(),
            settings: default_settings(provider),
            is_local,
        })
        .collect()
}

/// Seeds the registry from the static per-provider catalogues and re-derives
/// the default selection.
///
/// The three loaders are independent and idempotent: they register the same
/// ids every run, so seeding twice is externally a no-op. Local records are
/// registered whether or not the local runtime is reachable; reachability is
/// a dispatch-time concern.
pub(crate) fn seed_catalogue(registry: &mut Registry) {
    registry.register(catalogue_records(Provider::OpenAI, &OPENAI_MODELS, false));
    registry.register(catalogue_records(Provider::Ollama, &OLLAMA_MODELS, true));
    registry.register(catalogue_records(Provider::Groq, &GROQ_MODELS, false));

    registry.select_default();
}

/// Builds a model system from the configuration: install one backend per
/// activated provider, store the resolved credentials, then initialize.
pub(crate) async fn populated_system(config: &Config) -> ModelSystem {
    let mut system = ModelSystem::new(config.switching);

    {
        let ollama = &config.providers.ollama;

        match ollama.activate {
            ProviderActivationPolicy::Auto | ProviderActivationPolicy::Enabled => {
                let api_base = ollama
                    .api_base
                    .clone()
                    .or_else(|| env_var(OLLAMA_ENV_BASE_VAR));

                let backend = match api_base {
                    Some(api_base) => match OllamaBackend::with_api_base(&api_base) {
                        Ok(backend) => backend,
                        Err(err) => die!("ollama API base failed to parse: {}", err),
                    },
                    None => OllamaBackend::new(),
                };

                system.register_backend(Box::new(backend));
            }
            ProviderActivationPolicy::Disabled => {}
        }
    }

    {
        let openai = &config.providers.openai;

        let api_key = openai.api_key.clone().or_else(|| env_var(OPENAI_ENV_KEY_VAR));

        let api_key = match openai.activate {
            // Activate if an API key is present
            ProviderActivationPolicy::Auto => api_key,
            ProviderActivationPolicy::Enabled => {
                if api_key.is_none() {
                    die!("the \"openai\" provider is activated but the API key is not defined, either add it to the config or define {}", OPENAI_ENV_KEY_VAR);
                }

                api_key
            }
            ProviderActivationPolicy::Disabled => None,
        };

        if let Some(api_key) = api_key {
            system.set_api_key(Provider::OpenAI, &api_key);
            system.register_backend(Box::new(OpenAIBackend::with_api_key(&api_key)));
        }
    }

    {
        let groq = &config.providers.groq;

        let api_key = groq.api_key.clone().or_else(|| env_var(GROQ_ENV_KEY_VAR));

        let api_key = match groq.activate {
            ProviderActivationPolicy::Auto => api_key,
            ProviderActivationPolicy::Enabled => {
                if api_key.is_none() {
                    die!("the \"groq\" provider is activated but the API key is not defined, either add it to the config or define {}", GROQ_ENV_KEY_VAR);
                }

                api_key
            }
            ProviderActivationPolicy::Disabled => None,
        };

        if let Some(api_key) = api_key {
            system.set_api_key(Provider::Groq, &api_key);
            system.register_backend(Box::new(GroqBackend::with_api_key(&api_key)));
        }
    }

    system.initialize().await;

    system
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_registers_full_catalogue() {
        let mut registry = Registry::new();

        seed_catalogue(&mut registry);

        assert_eq!(
            registry.len(),
            OPENAI_MODELS.len() + OLLAMA_MODELS.len() + GROQ_MODELS.len()
        );

        assert!(registry.get("openai-gpt-4o").is_some());
        assert!(registry.get("ollama-phi").is_some());
        assert!(registry.get("groq-mixtral-8x7b-32768").is_some());
    }

    #[test]
    fn test_seed_selects_first_local_record() {
        let mut registry = Registry::new();

        seed_catalogue(&mut registry);

        assert_eq!(registry.active().unwrap().id, "ollama-llama3");
    }

    #[test]
    fn test_seed_is_idempotent() {
        let mut registry = Registry::new();

        seed_catalogue(&mut registry);
        let count = registry.len();
        let active = registry.active().unwrap().id.clone();

        seed_catalogue(&mut registry);

        assert_eq!(registry.len(), count);
        assert_eq!(registry.active().unwrap().id, active);
    }

    #[test]
    fn test_seeded_records_carry_descriptions_and_templates() {
        let mut registry = Registry::new();

        seed_catalogue(&mut registry);

        let record = registry.get("ollama-llama3").unwrap();

        assert!(record.is_local);
        assert_eq!(
            record.description,
            "Local Llama 3 model for enhanced privacy and offline use."
        );
        assert_eq!(record.settings["temperature"], serde_json::json!(0.7));
    }
}

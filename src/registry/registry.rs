use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use super::default_selection::default_model_id;
use crate::backends::backends::Provider;

#[derive(Error, Debug, PartialEq, Eq)]
pub(crate) enum RegistryError {
    /// The referenced model id is absent from the registry
    #[error("model \"{0}\" is not registered")]
    ModelNotFound(String),
}

/// Tunable parameters of a record (temperature, max_tokens, ...). The set of
/// keys is open; backends pick out the ones their wire format understands.
pub(crate) type Settings = serde_json::Map<String, serde_json::Value>;

/// Shallow merge: every key of `patch` overwrites the corresponding key of
/// `base`, keys absent from `patch` are untouched.
pub(crate) fn merge_settings(base: &Settings, patch: &Settings) -> Settings {
    let mut merged = base.clone();

    for (key, value) in patch {
        merged.insert(key.clone(), value.clone());
    }

    merged
}

/// One model's identity and capability descriptor.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ModelRecord {
    /// Primary key, unique across the registry
    pub id: String,
    /// Human-readable name; may repeat across providers
    pub name: String,
    pub provider: Provider,
    pub description: String,
    /// Independently mutable per record
    pub settings: Settings,
    /// True for on-device backends, false for remote API-backed ones
    pub is_local: bool,
}

/// An opaque credential blob for one provider. At most one is stored per
/// provider; saving again overwrites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Credentials {
    pub api_key: String,
}

pub(crate) struct Registry {
    records: HashMap<String, ModelRecord>,
    // Insertion order of the ids in `records`. "First in mapping order" in
    // the selection rules means first registered.
    order: Vec<String>,
    active: Option<String>,
    credentials: HashMap<Provider, Credentials>,
}

fn custom_model_id(name: &str) -> String {
    let lowered = name.to_lowercase();
    let parts: Vec<&str> = lowered.split_whitespace().collect();

    format!("custom-{}", parts.join("-"))
}

impl Registry {
    pub(crate) fn new() -> Registry {
        Registry {
            records: HashMap::new(),
            order: Vec::new(),
            active: None,
            credentials: HashMap::new(),
        }
    }

    fn insert(&mut self, record: ModelRecord) {
        if !self.records.contains_key(&record.id) {
            self.order.push(record.id.clone());
        }

        self.records.insert(record.id.clone(), record);
    }

    /// Inserts the records, overwriting by id.
    pub(crate) fn register<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = ModelRecord>,
    {
        for record in records {
            self.insert(record);
        }
    }

    pub(crate) fn get(&self, id: &str) -> Option<&ModelRecord> {
        self.records.get(id)
    }

    /// Iterates records in registration order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &ModelRecord> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Points the active selection at `id`. On an unknown id the registry is
    /// left unchanged.
    pub(crate) fn set_active(&mut self, id: &str) -> Result<(), RegistryError> {
        if !self.records.contains_key(id) {
            return Err(RegistryError::ModelNotFound(id.to_string()));
        }

        self.active = Some(id.to_string());

        Ok(())
    }

    /// The record behind the active pointer, or `None` when the pointer is
    /// unset or stale.
    pub(crate) fn active(&self) -> Option<&ModelRecord> {
        self.active.as_deref().and_then(|id| self.records.get(id))
    }

    /// Re-derives the active pointer with the default-selection policy.
    pub(crate) fn select_default(&mut self) {
        self.active = default_model_id(self);
    }

    /// Deletes a record. Removing the active record immediately re-runs
    /// default selection so the pointer never dangles.
    pub(crate) fn remove(&mut self, id: &str) -> Result<(), RegistryError> {
        if self.records.remove(id).is_none() {
            return Err(RegistryError::ModelNotFound(id.to_string()));
        }

        self.order.retain(|existing| existing != id);

        if self.active.as_deref() == Some(id) {
            self.select_default();
        }

        Ok(())
    }

    /// Synthesizes a `custom-` id from the name (lowercased, whitespace runs
    /// collapsed to single hyphens) and registers the record under it. A
    /// collision with an existing custom id overwrites that record.
    pub(crate) fn add_custom(&mut self, name: &str, settings: Settings, is_local: bool) -> String {
        let id = custom_model_id(name);

        self.insert(ModelRecord {
            id: id.clone(),
            name: name.to_string(),
            provider: Provider::Custom,
            description: format!("Custom model: {}", name),
            settings,
            is_local,
        });

        id
    }

    /// Shallow-merges `patch` into the record's settings.
    pub(crate) fn update_settings(&mut self, id: &str, patch: &Settings) -> Result<(), RegistryError> {
        let record = self
            .records
            .get_mut(id)
            .ok_or_else(|| RegistryError::ModelNotFound(id.to_string()))?;

        for (key, value) in patch {
            record.settings.insert(key.clone(), value.clone());
        }

        Ok(())
    }

    pub(crate) fn local_models(&self) -> Vec<&ModelRecord> {
        self.iter().filter(|record| record.is_local).collect()
    }

    pub(crate) fn cloud_models(&self) -> Vec<&ModelRecord> {
        self.iter().filter(|record| !record.is_local).collect()
    }

    pub(crate) fn set_credentials(&mut self, provider: Provider, credentials: Credentials) {
        self.credentials.insert(provider, credentials);
    }

    pub(crate) fn credentials(&self, provider: Provider) -> Option<&Credentials> {
        self.credentials.get(&provider)
    }
}

/// Builds a bare record the way the catalogue loaders would. Test-only.
#[cfg(test)]
pub(crate) fn test_record(provider: Provider, name: &str, is_local: bool) -> ModelRecord {
    ModelRecord {
        id: format!("{}-{}", provider, name),
        name: name.to_string(),
        provider,
        description: "test record".to_string(),
        settings: Settings::new(),
        is_local,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use super::test_record as record;

    #[test]
    fn test_register_and_retrieve() {
        let mut registry = Registry::new();

        registry.register([
            record(Provider::OpenAI, "gpt-4o", false),
            record(Provider::Ollama, "llama3", true),
        ]);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("openai-gpt-4o").unwrap().name, "gpt-4o");
        assert_eq!(registry.get("ollama-llama3").unwrap().name, "llama3");
    }

    #[test]
    fn test_register_collision_keeps_later_write() {
        let mut registry = Registry::new();

        let mut first = record(Provider::OpenAI, "gpt-4o", false);
        first.description = "first".to_string();

        let mut second = record(Provider::OpenAI, "gpt-4o", false);
        second.description = "second".to_string();

        registry.register([first, second]);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("openai-gpt-4o").unwrap().description, "second");
    }

    #[test]
    fn test_iteration_preserves_registration_order() {
        let mut registry = Registry::new();

        registry.register([
            record(Provider::Groq, "llama3-8b-8192", false),
            record(Provider::OpenAI, "gpt-4o", false),
            record(Provider::Ollama, "llama3", true),
        ]);

        let ids: Vec<&str> = registry.iter().map(|r| r.id.as_str()).collect();

        assert_eq!(
            ids,
            ["groq-llama3-8b-8192", "openai-gpt-4o", "ollama-llama3"]
        );
    }

    #[test]
    fn test_set_active_unknown_id_leaves_state_unchanged() {
        let mut registry = Registry::new();

        registry.register([record(Provider::OpenAI, "gpt-4o", false)]);
        registry.set_active("openai-gpt-4o").unwrap();

        let result = registry.set_active("openai-no-such-model");

        assert_eq!(
            result,
            Err(RegistryError::ModelNotFound(
                "openai-no-such-model".to_string()
            ))
        );
        assert_eq!(registry.active().unwrap().id, "openai-gpt-4o");
    }

    #[test]
    fn test_remove_active_record_reselects() {
        let mut registry = Registry::new();

        registry.register([
            record(Provider::OpenAI, "gpt-4o", false),
            record(Provider::Ollama, "llama3", true),
        ]);
        registry.set_active("ollama-llama3").unwrap();

        registry.remove("ollama-llama3").unwrap();

        // The pointer never dangles: it lands on a surviving record.
        let active = registry.active().unwrap();
        assert_eq!(active.id, "openai-gpt-4o");
    }

    #[test]
    fn test_remove_last_record_unsets_active() {
        let mut registry = Registry::new();

        registry.register([record(Provider::OpenAI, "gpt-4o", false)]);
        registry.set_active("openai-gpt-4o").unwrap();

        registry.remove("openai-gpt-4o").unwrap();

        assert!(registry.active().is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_unknown_id() {
        let mut registry = Registry::new();

        assert_eq!(
            registry.remove("custom-ghost"),
            Err(RegistryError::ModelNotFound("custom-ghost".to_string()))
        );
    }

    #[test]
    fn test_add_custom_slugs_name() {
        let mut registry = Registry::new();

        let id = registry.add_custom("My Model", Settings::new(), true);

        assert_eq!(id, "custom-my-model");

        let record = registry.get(&id).unwrap();
        assert_eq!(record.name, "My Model");
        assert_eq!(record.provider, Provider::Custom);
        assert_eq!(record.description, "Custom model: My Model");
        assert!(record.is_local);
    }

    #[test]
    fn test_add_custom_collapses_whitespace_runs() {
        let mut registry = Registry::new();

        let id = registry.add_custom("My   Fine\tModel", Settings::new(), false);

        assert_eq!(id, "custom-my-fine-model");
    }

    #[test]
    fn test_add_custom_twice_overwrites() {
        let mut registry = Registry::new();

        let first = registry.add_custom("My Model", Settings::new(), true);
        let second = registry.add_custom("My Model", Settings::new(), false);

        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
        assert!(!registry.get(&second).unwrap().is_local);
    }

    #[test]
    fn test_update_settings_shallow_merges() {
        let mut registry = Registry::new();

        let mut seeded = record(Provider::OpenAI, "gpt-4o", false);
        seeded.settings = match json!({"temperature": 0.7, "max_tokens": 2000}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };

        registry.register([seeded]);

        let patch = match json!({"temperature": 0.2}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };

        registry.update_settings("openai-gpt-4o", &patch).unwrap();

        let settings = &registry.get("openai-gpt-4o").unwrap().settings;
        assert_eq!(settings["temperature"], json!(0.2));
        assert_eq!(settings["max_tokens"], json!(2000));
    }

    #[test]
    fn test_update_settings_unknown_id() {
        let mut registry = Registry::new();

        assert!(matches!(
            registry.update_settings("openai-ghost", &Settings::new()),
            Err(RegistryError::ModelNotFound(_))
        ));
    }

    #[test]
    fn test_local_and_cloud_views() {
        let mut registry = Registry::new();

        registry.register([
            record(Provider::OpenAI, "gpt-4o", false),
            record(Provider::Ollama, "llama3", true),
            record(Provider::Groq, "mixtral-8x7b-32768", false),
        ]);

        let local: Vec<&str> = registry.local_models().iter().map(|r| r.id.as_str()).collect();
        let cloud: Vec<&str> = registry.cloud_models().iter().map(|r| r.id.as_str()).collect();

        assert_eq!(local, ["ollama-llama3"]);
        assert_eq!(cloud, ["openai-gpt-4o", "groq-mixtral-8x7b-32768"]);
    }

    #[test]
    fn test_credentials_overwrite_on_resave() {
        let mut registry = Registry::new();

        registry.set_credentials(
            Provider::OpenAI,
            Credentials {
                api_key: "sk-first".to_string(),
            },
        );
        registry.set_credentials(
            Provider::OpenAI,
            Credentials {
                api_key: "sk-second".to_string(),
            },
        );

        assert_eq!(
            registry.credentials(Provider::OpenAI).unwrap().api_key,
            "sk-second"
        );
        assert!(registry.credentials(Provider::Groq).is_none());
    }

    #[test]
    fn test_merge_settings_patch_wins() {
        let base = match json!({"temperature": 0.7, "top_p": 1}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        let patch = match json!({"temperature": 0.1, "max_tokens": 50}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };

        let merged = merge_settings(&base, &patch);

        assert_eq!(merged["temperature"], json!(0.1));
        assert_eq!(merged["top_p"], json!(1));
        assert_eq!(merged["max_tokens"], json!(50));
    }
}

use super::registry::Registry;
use crate::backends::backends::Provider;

/// The default-selection policy: prefer the first local record in
/// registration order, else the first OpenAI record, else the first record
/// of any kind, else nothing (empty registry).
///
/// The ordering encodes privacy first, then compatibility, then bare
/// availability. It runs at initialization and again whenever the active
/// record is removed.
pub(crate) fn default_model_id(registry: &Registry) -> Option<String> {
    if let Some(record) = registry.iter().find(|record| record.is_local) {
        return Some(record.id.clone());
    }

    if let Some(record) = registry
        .iter()
        .find(|record| record.provider == Provider::OpenAI)
    {
        return Some(record.id.clone());
    }

    registry.iter().next().map(|record| record.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::registry::test_record as record;

    #[test]
    fn test_prefers_local_regardless_of_order() {
        let mut registry = Registry::new();

        registry.register([
            record(Provider::OpenAI, "gpt-4o", false),
            record(Provider::Groq, "llama3-70b-8192", false),
            record(Provider::Ollama, "llama3", true),
        ]);

        assert_eq!(default_model_id(&registry).unwrap(), "ollama-llama3");
    }

    #[test]
    fn test_falls_back_to_openai_when_no_local() {
        let mut registry = Registry::new();

        registry.register([
            record(Provider::Groq, "llama3-70b-8192", false),
            record(Provider::OpenAI, "gpt-4o", false),
            record(Provider::OpenAI, "gpt-3.5-turbo", false),
        ]);

        assert_eq!(default_model_id(&registry).unwrap(), "openai-gpt-4o");
    }

    #[test]
    fn test_falls_back_to_first_record() {
        let mut registry = Registry::new();

        registry.register([
            record(Provider::Groq, "llama3-70b-8192", false),
            record(Provider::Groq, "mixtral-8x7b-32768", false),
        ]);

        assert_eq!(default_model_id(&registry).unwrap(), "groq-llama3-70b-8192");
    }

    #[test]
    fn test_empty_registry_selects_nothing() {
        let registry = Registry::new();

        assert!(default_model_id(&registry).is_none());
    }
}

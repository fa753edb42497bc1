//! The model system ties the registry to the installed backends: it seeds
//! the catalogue, answers the operations the embedding layer calls, picks a
//! record for each request, and dispatches prompts.
//!
//! A `ModelSystem` is an ordinary value, constructed explicitly and passed
//! to whoever needs it; independent systems never share state.

use std::collections::HashMap;

use thiserror::Error;

use crate::backends::{backends::Provider, Backend, Completion};
use crate::config::Switching;
use crate::registry::populate::seed_catalogue;
use crate::registry::registry::{
    merge_settings, Credentials, ModelRecord, Registry, RegistryError, Settings,
};
use crate::warn;

#[derive(Error, Debug)]
pub(crate) enum DispatchError {
    /// The registry is empty and no active record resolves
    #[error("no model is available to serve the request")]
    NoModelAvailable,
    /// The selected record's provider has no installed backend
    #[error("no backend is configured for provider \"{0}\"")]
    BackendUnavailable(Provider),
    /// The backend call failed; the source carries the category and cause
    #[error("backend request failed")]
    Backend(#[from] crate::backends::Error),
}

/// Per-request routing hints. Each flag is independent; precedence between
/// them is fixed by the selection heuristic.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Requirements {
    pub privacy: bool,
    pub complexity: bool,
    pub speed: bool,
}

#[derive(Debug, Default)]
pub(crate) struct RequestOptions {
    /// Per-request setting overrides; keys here win over the record's stored
    /// settings.
    pub overrides: Settings,
    pub requirements: Option<Requirements>,
}

pub(crate) struct ModelSystem {
    registry: Registry,
    switching: Switching,
    backends: HashMap<Provider, Box<dyn Backend>>,
}

impl ModelSystem {
    pub(crate) fn new(switching: Switching) -> ModelSystem {
        ModelSystem {
            registry: Registry::new(),
            switching,
            backends: HashMap::new(),
        }
    }

    /// Installs an execution backend, keyed by the provider it serves.
    /// Installing a second backend for the same provider replaces the first.
    pub(crate) fn register_backend(&mut self, backend: Box<dyn Backend>) {
        self.backends.insert(backend.provider(), backend);
    }

    pub(crate) fn has_backend(&self, provider: Provider) -> bool {
        self.backends.contains_key(&provider)
    }

    /// Seeds the catalogue, derives the default selection, and reports on
    /// backend reachability. Safe to call again; re-seeding is externally a
    /// no-op.
    pub(crate) async fn initialize(&mut self) {
        seed_catalogue(&mut self.registry);

        for backend in self.backends.values() {
            if !backend.reachable().await {
                warn!(
                    "the \"{}\" runtime is not reachable, requests routed to it will fail",
                    backend.provider()
                );
            }
        }
    }

    pub(crate) fn register_models<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = ModelRecord>,
    {
        self.registry.register(records);
    }

    pub(crate) fn available_models(&self) -> Vec<&ModelRecord> {
        self.registry.iter().collect()
    }

    pub(crate) fn available_local_models(&self) -> Vec<&ModelRecord> {
        self.registry.local_models()
    }

    pub(crate) fn available_cloud_models(&self) -> Vec<&ModelRecord> {
        self.registry.cloud_models()
    }

    pub(crate) fn active_model(&self) -> Option<&ModelRecord> {
        self.registry.active()
    }

    pub(crate) fn set_active_model(&mut self, id: &str) -> Result<(), RegistryError> {
        self.registry.set_active(id)
    }

    pub(crate) fn update_model_settings(
        &mut self,
        id: &str,
        patch: &Settings,
    ) -> Result<(), RegistryError> {
        self.registry.update_settings(id, patch)
    }

    pub(crate) fn add_custom_model(
        &mut self,
        name: &str,
        settings: Settings,
        is_local: bool,
    ) -> String {
        self.registry.add_custom(name, settings, is_local)
    }

    pub(crate) fn remove_model(&mut self, id: &str) -> Result<(), RegistryError> {
        self.registry.remove(id)
    }

    pub(crate) fn set_api_key(&mut self, provider: Provider, api_key: &str) {
        self.registry.set_credentials(
            provider,
            Credentials {
                api_key: api_key.to_string(),
            },
        );
    }

    pub(crate) fn credentials(&self, provider: Provider) -> Option<&Credentials> {
        self.registry.credentials(provider)
    }

    /// Chooses a record for the given requirements.
    ///
    /// With switching disabled this is always the active record. Otherwise
    /// the flags are evaluated in fixed precedence order, privacy first,
    /// then complexity, then speed; the first flag that is both requested
    /// and enabled in the switching criteria claims the request, and later
    /// flags are not consulted even when the claiming filter matches
    /// nothing. The criteria can conflict, and this silent precedence is the
    /// only disambiguation rule.
    ///
    /// - privacy: the first local record in registration order.
    /// - complexity: the first OpenAI record whose name contains "gpt-4".
    /// - speed: the first Groq record, or OpenAI record whose name contains
    ///   "gpt-3.5".
    ///
    /// A claiming filter with no candidates, or no claiming flag at all,
    /// falls back to the active record.
    pub(crate) fn select_model_for_task(&self, requirements: &Requirements) -> Option<&ModelRecord> {
        if !self.switching.enabled {
            return self.registry.active();
        }

        let criteria = &self.switching.criteria;

        let selected = if requirements.privacy && criteria.privacy {
            self.registry.iter().find(|record| record.is_local)
        } else if requirements.complexity && criteria.complexity {
            self.registry.iter().find(|record| {
                record.provider == Provider::OpenAI && record.name.contains("gpt-4")
            })
        } else if requirements.speed && criteria.speed {
            self.registry.iter().find(|record| {
                record.provider == Provider::Groq
                    || (record.provider == Provider::OpenAI && record.name.contains("gpt-3.5"))
            })
        } else {
            None
        };

        selected.or_else(|| self.registry.active())
    }

    /// Routes a prompt: select a record, merge its settings with the
    /// per-request overrides (override keys win), and delegate to the
    /// record's backend.
    ///
    /// Every failure mode comes back as a `DispatchError` value; no backend
    /// fault escapes this boundary.
    pub(crate) async fn send_request(
        &self,
        prompt: &str,
        options: RequestOptions,
    ) -> Result<Completion, DispatchError> {
        let requirements = options.requirements.unwrap_or_default();

        let record = self
            .select_model_for_task(&requirements)
            .ok_or(DispatchError::NoModelAvailable)?;

        let settings = merge_settings(&record.settings, &options.overrides);

        let backend = self
            .backends
            .get(&record.provider)
            .ok_or(DispatchError::BackendUnavailable(record.provider))?;

        let completion = backend.execute(record, prompt, &settings).await?;

        Ok(completion)
    }
}

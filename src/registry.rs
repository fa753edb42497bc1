//! The registry is the in-memory catalogue of model records. It owns the
//! `id -> record` mapping, the active-selection pointer, and the per-provider
//! credential store.
//!
//! Record ids take the form `{provider}-{name}` for catalogue entries and
//! `custom-{slug}` for user-added entries. Ids are unique across the registry
//! at all times: registration is keyed by id, so a collision overwrites the
//! earlier record rather than duplicating it.
//!
//! The active pointer refers into the mapping by id and never owns a record.
//! It is re-derived by the default-selection policy whenever the record it
//! names is removed, so it cannot dangle. The policy prefers local records
//! (privacy), then OpenAI records (compatibility), then whatever is
//! registered (availability).
//!
//! The registry is created empty and populated by the catalogue loaders in
//! [`populate`]; catalogue presence is static and never depends on whether a
//! runtime is actually reachable.

pub(crate) mod catalog;
pub(crate) mod default_selection;
pub(crate) mod populate;
pub(crate) mod registry;

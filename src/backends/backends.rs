//! Concrete types for backends, along with their provider identifier variants

use serde::{Deserialize, Serialize};
use strum_macros;

/// The `Provider` is a unique per-provider-family identifier. Every model
/// record carries one, and backends are looked up by it at dispatch time.
///
/// The `to_string` and `FromStr` forms are part of the record id format and
/// the CLI and should remain stable.
#[derive(
    Debug,
    PartialEq,
    Eq,
    Hash,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub(crate) enum Provider {
    OpenAI,
    Ollama,
    Groq,
    HuggingFace,
    Custom,
}

pub(crate) use super::groq::GroqBackend;
pub(crate) use super::ollama::OllamaBackend;
pub(crate) use super::openai::OpenAIBackend;

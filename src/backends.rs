//! Traits and type definitions for backend execution.
//!
//! The `backends` module contains the components that actually carry a
//! request to a model runtime. The interface is the [`Backend`] trait: a
//! backend accepts a model record, a prompt, and the merged settings for the
//! request, and produces a [`Completion`] or a failure. One backend exists
//! per provider family; the dispatch layer looks backends up by provider and
//! never constructs them itself, so alternative implementations (including
//! test stubs) can be injected freely.
//!
//! ## Reachability
//!
//! A backend may optionally report whether its runtime is reachable. This is
//! advisory: registration of catalogue records never depends on it, and an
//! unreachable backend simply fails at request time. Only the local-runtime
//! backend overrides the default.
//!
//! ## Error Handling
//!
//! Each runtime API has its own bespoke error surface. Per-client error
//! types are encapsulated in [`Error`], and the [`ErrorKind`] enum provides
//! an indication of the category of failure.

mod chat_api;
mod groq;
mod ollama;
mod openai;

pub(crate) mod backends;

use async_trait::async_trait;
use serde::Serialize;
use std::error::Error as StdError;
use std::fmt;

use self::backends::Provider;
use crate::registry::registry::{ModelRecord, Settings};

/// General categories of errors that can be returned by a [`Backend`].
#[derive(Debug, Clone, Copy)]
pub(crate) enum ErrorKind {
    /// Failed to connect to the underlying API service.
    /// This could be due to network issues like DNS
    /// resolution, connectivity issues, or routing problems.
    Connection,
    /// A request timed out.
    TimedOut,
    /// An API key was not provided or service-specific
    /// permissions are needed.
    Authentication,
    /// A rate limit was reached or a quota was exceeded.
    ExcessUsage,
    /// The servers are overloaded. This is non-fatal
    /// and indicates that a retry may be needed later.
    ApiOverloaded,
    /// The requested resource was not found. This likely means that
    /// the model named by the record is not served by the runtime.
    NotFound,
    /// The request was malformed or is otherwise improper. This
    /// often corresponds to errors with HTTP status codes in
    /// the 400s.
    BadRequest,
    /// The server encountered an error. This often corresponds to
    /// errors with HTTP status codes in the 500s.
    InternalError,
    /// An API response was unable to be deserialized, malformed,
    /// or otherwise violated the assumptions of the client.
    UnexpectedResponse,
    /// An error that does not fit into any of the other categories.
    UnspecifiedError,
}

#[derive(Debug)]
pub(crate) struct Error {
    kind: ErrorKind,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub(crate) fn from_kind(kind: ErrorKind) -> Error {
        Error { kind, source: None }
    }

    pub(crate) fn from_source(kind: ErrorKind, source: Box<dyn StdError + Send + Sync>) -> Error {
        Error {
            kind,
            source: Some(source),
        }
    }

    pub(crate) fn kind(&self) -> ErrorKind {
        self.kind
    }

    fn message(&self) -> &'static str {
        match self.kind {
            ErrorKind::Connection => "failed to connect to the API service",
            ErrorKind::TimedOut => "request timed out",
            ErrorKind::Authentication => "authentication failed or not provided",
            ErrorKind::ExcessUsage => "rate limit exceeded or quota crossed",
            ErrorKind::ApiOverloaded => "API server(s) are currently overloaded",
            ErrorKind::NotFound => "the requested resource was not found",
            ErrorKind::BadRequest => "the request was bad or malformed",
            ErrorKind::InternalError => "the server encountered an internal error",
            ErrorKind::UnexpectedResponse => "API response was unexpected or malformed",
            ErrorKind::UnspecifiedError => "an unspecified error occurred",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|e| &**e as _)
    }
}

/// Classify a transport-level failure. The kinds mirror reqwest's own
/// predicates so callers can match exclusively.
pub(crate) fn reqwest_error_kind(err: &reqwest::Error) -> ErrorKind {
    if err.is_timeout() {
        ErrorKind::TimedOut
    } else if err.is_connect() {
        ErrorKind::Connection
    } else if err.is_decode() {
        ErrorKind::UnexpectedResponse
    } else {
        ErrorKind::UnspecifiedError
    }
}

/// The result of a dispatched request: the record that served it, the prompt
/// as sent, the generated text, and the settings the backend was given.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Completion {
    pub model: String,
    pub prompt: String,
    pub response: String,
    pub settings: Settings,
}

/// A trait implemented by all backend executors.
#[async_trait]
pub(crate) trait Backend: Send + Sync {
    /// Returns the provider family this backend serves.
    fn provider(&self) -> Provider;

    /// Whether the runtime behind this backend can currently be reached.
    /// Advisory only; the default assumes reachability.
    async fn reachable(&self) -> bool {
        true
    }

    /// Carries `prompt` to the runtime serving `record` and returns the
    /// completion.
    ///
    /// `settings` is the already-merged parameter map for this request;
    /// backends map the keys they understand onto the wire format and ignore
    /// the rest.
    async fn execute(
        &self,
        record: &ModelRecord,
        prompt: &str,
        settings: &Settings,
    ) -> Result<Completion, Error>;
}

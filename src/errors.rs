use serde::Serialize;
use thiserror::Error;

use crate::schema::Domain;

/// Registry misuse. These are programmer errors and should surface at
/// startup, not during request handling.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("operation '{name}' is already registered for domain '{domain}'")]
    DuplicateOperation { domain: Domain, name: String },
}

/// Failures at the model boundary. The router never retries these; it maps
/// them straight into a rejected decision for the caller to act on.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("model request failed: {0}")]
    Request(String),

    #[error("model returned a malformed payload: {0}")]
    Malformed(String),

    #[error("model call was cancelled")]
    Cancelled,
}

/// The expression carries no calendar anchor the normalizer can work with.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("cannot resolve '{expression}' into a datetime")]
pub struct UnresolvableDateError {
    pub expression: String,
}

/// A payload field violated its declared shape. `path` points at the
/// offending field so the caller can render an actionable message.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{path}: {reason}")]
pub struct ValidationError {
    pub path: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Propagated from the storage collaborator. Retry policy belongs to the
/// caller, never to the dispatcher.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("backend call failed: {0}")]
    Call(String),

    #[error("backend call was cancelled")]
    Cancelled,
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("decision was rejected; nothing to dispatch")]
    RejectedDecision,

    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("invalid config line {line}: {content}")]
    InvalidLine { line: usize, content: String },
}

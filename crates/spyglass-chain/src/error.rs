//! Error types for the chain-data access layer.
use std::time::Duration;

use thiserror::Error;

/// Everything that can go wrong between the explorer and the node.
///
/// The split that matters is [`ChainError::is_transient`]: transient
/// errors on read paths degrade to synthetic data, terminal ones
/// (`NotFound`, `Validation`) reach the caller. Write paths propagate
/// all of them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("connection: {0}")] Connection(String),
    #[error("timed out after {0:?}")] Timeout(Duration),
    #[error("rpc: {0}")] Rpc(String),
    #[error("not found: {0}")] NotFound(String),
    #[error("invalid {field}: {reason}")] Validation { field: &'static str, reason: String },
}

impl ChainError {
    /// True for failures that say nothing about the data itself, only
    /// about reachability. Reads replace these with synthetic payloads.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ChainError::Connection(_) | ChainError::Timeout(_) | ChainError::Rpc(_)
        )
    }

    /// Shorthand for a malformed caller parameter.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ChainError::Validation { field, reason: reason.into() }
    }
}

//! Error types for the toolgate domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all toolgate operations.
///
/// None of these ever reach a `filter` caller at request time — the facade
/// converts every pipeline failure into the degraded full-registry result.
/// They surface only when constructing or reconfiguring the filter.
#[derive(Debug, Error)]
pub enum Error {
    // --- Registry errors ---
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    // --- Selection errors ---
    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("Duplicate tool name: {0}")]
    DuplicateTool(String),
}

#[derive(Debug, Clone, Error)]
pub enum SelectionError {
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Tool limit {limit} cannot hold {required} always-include tools")]
    LimitTooSmall { limit: usize, required: usize },
}

//! Error types for the guide.
//!
//! Nothing here is fatal to the host page. Dispatcher operations report
//! configuration misses and missing targets as outcomes; these errors cover
//! catalog loading, durable storage, and log export.

use std::path::PathBuf;

/// Top-level error type for the guide.
#[derive(Debug, thiserror::Error)]
pub enum GuideError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Step {0} not found in catalog")]
    UnknownStep(u32),
}

/// Problems with the step/feature catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Catalog has no steps")]
    Empty,

    #[error("Duplicate step number {0}")]
    DuplicateStep(u32),

    #[error("Duplicate feature id {feature} in step {step}")]
    DuplicateFeature { step: u32, feature: String },

    #[error("Feature {feature} in step {step} requires unknown feature {prerequisite}")]
    UnknownPrerequisite {
        step: u32,
        feature: String,
        prerequisite: String,
    },

    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Durable key-value storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to read key {key}: {reason}")]
    Read { key: String, reason: String },

    #[error("Failed to write key {key}: {reason}")]
    Write { key: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Diagnostic log export errors.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Failed to write export to {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the guide.
pub type Result<T> = std::result::Result<T, GuideError>;

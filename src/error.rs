//! Error types for the structural engine

use thiserror::Error;

use crate::graph::TypeKind;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, ShapeError>;

/// Engine errors
///
/// Only structural failures live here. Problems found in a data instance are
/// reported through [`crate::validate::ValidationResult`], never as errors.
#[derive(Error, Debug)]
pub enum ShapeError {
    #[error("Root type not found: {name}{}", format_suggestions(.suggestions))]
    RootTypeNotFound {
        name: String,
        suggestions: Vec<String>,
    },

    #[error("Root type {name} is not an object type (found {kind})")]
    RootTypeNotObject { name: String, kind: TypeKind },

    #[error("Invalid type reference: {0}")]
    InvalidTypeReference(String),

    #[error("Invalid data path: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean {}?)", suggestions.join(", "))
    }
}

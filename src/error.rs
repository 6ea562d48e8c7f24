//! Error taxonomy for catalog construction and command dispatch.
//!
//! `DispatchError` values are the only thing an operation may hand back to
//! the REPL when it fails; the loop prints them and keeps reading. A
//! `CatalogError` means the generated command set is not well-formed and
//! startup must stop.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// No catalog entry carries this command name.
    #[error("Unknown command: {command}{}", suggestion_hint(.suggestions))]
    UnknownCommand {
        command: String,
        suggestions: Vec<String>,
    },

    /// Malformed, missing, surplus, or duplicated argument.
    #[error("{0}")]
    Validation(String),

    /// Search criteria or record key matched nothing where a match is required.
    #[error("{0}")]
    NotFound(String),
}

impl DispatchError {
    pub fn validation(message: impl Into<String>) -> Self {
        DispatchError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        DispatchError::NotFound(message.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// Two owners generated the same public command name.
    #[error("command '{command}' is generated by both {first} and {second}")]
    AmbiguousCollision {
        command: String,
        first: String,
        second: String,
    },
}

fn suggestion_hint(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean: {}?)", suggestions.join(", "))
    }
}

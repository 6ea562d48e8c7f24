//! Catalog entries: one public command and the parameters it accepts.
//!
//! These types are pure data. `CommandCatalog` builds them from the
//! registered books and the dispatcher reads `target` to decide what to call;
//! they serialize to JSON for `recordbook --catalog`.

use crate::catalog::naming::{Verb, search_label, update_label};
use serde::Serialize;
use std::fmt;

/// How a bound parameter feeds its field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamRole {
    /// New value for the field (add).
    Value,
    /// Criterion selecting records or elements.
    Search,
    /// Replacement value for matched records or elements.
    Update,
    /// Declared argument of a custom operation.
    Argument,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    pub label: String,
    pub field: String,
    pub role: ParamRole,
}

impl ParamSpec {
    pub fn value(field: &str) -> Self {
        Self {
            label: field.to_string(),
            field: field.to_string(),
            role: ParamRole::Value,
        }
    }

    pub fn search(field: &str) -> Self {
        Self {
            label: search_label(field),
            field: field.to_string(),
            role: ParamRole::Search,
        }
    }

    pub fn update(field: &str) -> Self {
        Self {
            label: update_label(field),
            field: field.to_string(),
            role: ParamRole::Update,
        }
    }

    pub fn argument(name: &str) -> Self {
        Self {
            label: name.to_string(),
            field: name.to_string(),
            role: ParamRole::Argument,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Builtin {
    Help,
    Exit,
}

/// What a command invokes. `book` is the registration position in the library.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandTarget {
    Builtin { builtin: Builtin },
    Record { book: usize, verb: Verb },
    Entry { book: usize, verb: Verb, field: String },
    Custom { book: usize, operation: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
    pub name: String,
    /// Owning book name; `None` for built-ins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub target: CommandTarget,
    pub params: Vec<ParamSpec>,
}

impl CommandSpec {
    /// Per-element commands take the owning record's key as first positional.
    pub fn takes_key(&self) -> bool {
        matches!(self.target, CommandTarget::Entry { .. })
    }

    pub fn param(&self, label: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|param| param.label == label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|param| param.label.as_str())
    }

    /// Who generated the command, for collision reports.
    pub fn owner_description(&self) -> String {
        match &self.owner {
            Some(book) => format!("book '{book}'"),
            None => "the built-in commands".to_string(),
        }
    }
}

impl fmt::Display for CommandSpec {
    /// One catalog line: `update-contact-phone-number <contact> search_phone_number ...`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.takes_key() {
            let owner = self.owner.as_deref().unwrap_or("record");
            write!(f, " <{owner}>")?;
        }
        for label in self.labels() {
            write!(f, " {label}")?;
        }
        Ok(())
    }
}

//! Naming convention shared by catalog construction and dispatch.
//!
//! Books declare operations under internal snake_case names. Generic record
//! operations carry the `record` placeholder (`add_record`), which the
//! catalog replaces with the book name; every `_` then becomes `-` in the
//! public command. Parameter labels keep the internal separator.

use serde::Serialize;
use std::fmt;

/// Placeholder segment that stands for "this kind of record".
pub const RECORD_PLACEHOLDER: &str = "record";
pub const SEARCH_PREFIX: &str = "search";
pub const UPDATE_PREFIX: &str = "update";

const INTERNAL_SEPARATOR: char = '_';
const PUBLIC_SEPARATOR: char = '-';

/// The four verbs shared by whole-record and per-element operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verb {
    Add,
    Get,
    Update,
    Delete,
}

impl Verb {
    /// Declaration order of the generic record operations.
    pub const ALL: [Verb; 4] = [Verb::Add, Verb::Get, Verb::Update, Verb::Delete];

    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Add => "add",
            Verb::Get => "get",
            Verb::Update => "update",
            Verb::Delete => "delete",
        }
    }

    pub fn past_tense(self) -> &'static str {
        match self {
            Verb::Add => "added",
            Verb::Get => "found",
            Verb::Update => "updated",
            Verb::Delete => "deleted",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Internal name of the generic record operation for `verb`.
pub fn record_operation_name(verb: Verb) -> String {
    format!("{}{INTERNAL_SEPARATOR}{RECORD_PLACEHOLDER}", verb.as_str())
}

pub fn to_public(internal: &str) -> String {
    internal.replace(INTERNAL_SEPARATOR, &PUBLIC_SEPARATOR.to_string())
}

pub fn to_internal(public: &str) -> String {
    public.replace(PUBLIC_SEPARATOR, &INTERNAL_SEPARATOR.to_string())
}

/// Public command for a generic record operation of `book`.
///
/// Only whole placeholder segments are substituted, so an operation named
/// `get_recorded` keeps its name.
pub fn record_command_name(operation: &str, book: &str) -> String {
    let substituted = operation
        .split(INTERNAL_SEPARATOR)
        .map(|segment| {
            if segment == RECORD_PLACEHOLDER {
                book
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join(&INTERNAL_SEPARATOR.to_string());
    to_public(&substituted)
}

/// Public command for a per-element operation on a multi-valued field.
pub fn entry_command_name(verb: Verb, book: &str, field: &str) -> String {
    format!(
        "{}{PUBLIC_SEPARATOR}{}{PUBLIC_SEPARATOR}{}",
        verb.as_str(),
        to_public(book),
        to_public(field)
    )
}

pub fn custom_command_name(operation: &str) -> String {
    to_public(operation)
}

pub fn search_label(field: &str) -> String {
    format!("{SEARCH_PREFIX}{INTERNAL_SEPARATOR}{field}")
}

pub fn update_label(field: &str) -> String {
    format!("{UPDATE_PREFIX}{INTERNAL_SEPARATOR}{field}")
}

/// Book, field, and operation names must match `^[a-z][a-z0-9_]*$` with no
/// empty segments, so the `_` ↔ `-` conversion stays reversible.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    first.is_ascii_lowercase()
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == INTERNAL_SEPARATOR)
        && name.split(INTERNAL_SEPARATOR).all(|segment| !segment.is_empty())
}

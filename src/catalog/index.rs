//! Command catalog derived from the registered books.
//!
//! The catalog is computed once per library: built-in commands first, then
//! each book's visible operations in declaration order, then the per-element
//! commands for every multi-valued field. Public names are unique; a second
//! owner producing a name already taken aborts construction.

use crate::book::{Book, OperationKind, OperationSpec};
use crate::catalog::model::{Builtin, CommandSpec, CommandTarget, ParamSpec};
use crate::catalog::naming::{Verb, custom_command_name, entry_command_name, record_command_name};
use crate::error::CatalogError;
use crate::library::Library;
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use std::collections::BTreeMap;
use tracing::debug;

const BUILTINS: &[(&str, Builtin)] = &[
    ("help", Builtin::Help),
    ("exit", Builtin::Exit),
    ("close", Builtin::Exit),
];

/// Order in which per-element commands are generated for a field.
const ENTRY_VERBS: [Verb; 4] = [Verb::Add, Verb::Update, Verb::Delete, Verb::Get];

const MAX_SUGGESTIONS: usize = 5;

#[derive(Clone, Debug, Default)]
pub struct CommandCatalog {
    entries: Vec<CommandSpec>,
    by_name: BTreeMap<String, usize>,
}

impl CommandCatalog {
    pub fn build(library: &Library) -> Result<Self, CatalogError> {
        let mut catalog = Self::default();
        for (name, builtin) in BUILTINS {
            catalog.insert(CommandSpec {
                name: name.to_string(),
                owner: None,
                target: CommandTarget::Builtin { builtin: *builtin },
                params: Vec::new(),
            })?;
        }
        for (position, book) in library.books().enumerate() {
            for operation in book.operations() {
                if let Some(spec) = operation_command(position, book, &operation) {
                    catalog.insert(spec)?;
                }
            }
            for field in book.schema().multi_value_fields() {
                for verb in ENTRY_VERBS {
                    catalog.insert(CommandSpec {
                        name: entry_command_name(verb, book.name(), field),
                        owner: Some(book.name().to_string()),
                        target: CommandTarget::Entry {
                            book: position,
                            verb,
                            field: field.clone(),
                        },
                        params: entry_params(verb, field),
                    })?;
                }
            }
        }
        debug!(
            commands = catalog.len(),
            books = library.len(),
            "built command catalog"
        );
        Ok(catalog)
    }

    fn insert(&mut self, spec: CommandSpec) -> Result<(), CatalogError> {
        if let Some(&existing) = self.by_name.get(&spec.name) {
            return Err(CatalogError::AmbiguousCollision {
                command: spec.name.clone(),
                first: self.entries[existing].owner_description(),
                second: spec.owner_description(),
            });
        }
        self.by_name.insert(spec.name.clone(), self.entries.len());
        self.entries.push(spec);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.by_name.get(name).map(|&index| &self.entries[index])
    }

    /// Commands in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &CommandSpec> {
        self.entries.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|spec| spec.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Closest command names to `typed`, best first.
    pub fn suggest(&self, typed: &str) -> Vec<String> {
        if typed.is_empty() {
            return Vec::new();
        }
        let matcher = SkimMatcherV2::default();
        let mut scored: Vec<(i64, &str)> = self
            .names()
            .filter_map(|name| matcher.fuzzy_match(name, typed).map(|score| (score, name)))
            .collect();
        scored.sort_by(|left, right| right.0.cmp(&left.0).then_with(|| left.1.cmp(right.1)));
        scored
            .into_iter()
            .take(MAX_SUGGESTIONS)
            .map(|(_, name)| name.to_string())
            .collect()
    }

    /// Human-readable listing, one command per line.
    pub fn render(&self) -> String {
        let mut out = String::from("Available commands:");
        for spec in &self.entries {
            out.push_str("\n  ");
            out.push_str(&spec.to_string());
        }
        out
    }
}

fn operation_command(
    position: usize,
    book: &dyn Book,
    operation: &OperationSpec,
) -> Option<CommandSpec> {
    let (name, target, params) = match operation.kind {
        OperationKind::Hidden => return None,
        OperationKind::Record(verb) => {
            let fields = book.schema().fields();
            let params = if fields.is_empty() {
                argument_params(&operation.params)
            } else {
                record_params(verb, fields)
            };
            (
                record_command_name(&operation.name, book.name()),
                CommandTarget::Record {
                    book: position,
                    verb,
                },
                params,
            )
        }
        OperationKind::Custom => (
            custom_command_name(&operation.name),
            CommandTarget::Custom {
                book: position,
                operation: operation.name.clone(),
            },
            argument_params(&operation.params),
        ),
    };
    Some(CommandSpec {
        name,
        owner: Some(book.name().to_string()),
        target,
        params,
    })
}

/// Parameters of a whole-record command, one (or two for update) per field.
pub fn record_params(verb: Verb, fields: &[String]) -> Vec<ParamSpec> {
    match verb {
        Verb::Add => fields.iter().map(|field| ParamSpec::value(field)).collect(),
        Verb::Get | Verb::Delete => fields.iter().map(|field| ParamSpec::search(field)).collect(),
        Verb::Update => fields
            .iter()
            .flat_map(|field| [ParamSpec::search(field), ParamSpec::update(field)])
            .collect(),
    }
}

pub fn entry_params(verb: Verb, field: &str) -> Vec<ParamSpec> {
    match verb {
        Verb::Add => vec![ParamSpec::value(field)],
        Verb::Get | Verb::Delete => vec![ParamSpec::search(field)],
        Verb::Update => vec![ParamSpec::search(field), ParamSpec::update(field)],
    }
}

fn argument_params(names: &[String]) -> Vec<ParamSpec> {
    names.iter().map(|name| ParamSpec::argument(name)).collect()
}

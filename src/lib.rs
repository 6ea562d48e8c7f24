//! Shared library for the recordbook REPL.
//!
//! Books (`book`, `books`) hold schema-checked records; `catalog` derives the
//! public command set from whatever books the `Library` registers; `dispatch`
//! turns one input line into a call on a book. `persistence` and `runtime`
//! carry the state file, signal handling and logging used by the binary.

use anyhow::{Context, Result};
use std::path::Path;

pub mod book;
pub mod books;
pub mod catalog;
pub mod dispatch;
pub mod error;
pub mod library;
pub mod outcome;
pub mod persistence;
pub mod record;
pub mod runtime;

pub use book::{Book, BookSchema, OperationKind, OperationSpec, RecordStore};
pub use catalog::{CommandCatalog, CommandSpec, CommandTarget, ParamRole, ParamSpec, Verb};
pub use dispatch::{Arguments, CommandLine, Dispatcher};
pub use error::{CatalogError, DispatchError};
pub use library::Library;
pub use outcome::Outcome;
pub use persistence::{load_state, resolve_state_path, save_state};
pub use record::Record;

/// Register the built-in books, restore `state` into them, and build the
/// dispatcher over the resulting catalog.
pub fn open_library(state: &Path) -> Result<(Library, Dispatcher)> {
    let mut library = Library::with_default_books()?;
    load_state(&mut library, state)?;
    let catalog = CommandCatalog::build(&library).context("building command catalog")?;
    Ok((library, Dispatcher::new(catalog)))
}

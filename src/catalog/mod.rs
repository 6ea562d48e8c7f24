//! Command catalog: the public command set generated from registered books.
//!
//! `naming` holds the internal/public naming convention, `model` the catalog
//! entry types, and `index` the construction and lookup logic.

pub mod index;
pub mod model;
pub mod naming;

pub use index::CommandCatalog;
pub use model::{Builtin, CommandSpec, CommandTarget, ParamRole, ParamSpec};
pub use naming::Verb;

//! Owns the registered books for the lifetime of a session.
//!
//! Registration order is significant: the catalog lists commands in that
//! order and addresses books by their position. The library is the only
//! owner of book state; catalog and dispatcher borrow it per call.

use crate::book::Book;
use crate::books::{ContactBook, NoteBook};
use crate::catalog::naming::is_valid_identifier;
use anyhow::{Context, Result, bail};
use tracing::debug;

/// Registered books in registration order.
#[derive(Default)]
pub struct Library {
    books: Vec<Box<dyn Book>>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct one instance of every built-in book.
    pub fn with_default_books() -> Result<Self> {
        let mut library = Self::new();
        library.register(Box::new(ContactBook::new()))?;
        library.register(Box::new(NoteBook::new()))?;
        Ok(library)
    }

    /// Register a book after checking its name and schema.
    ///
    /// Duplicate names are accepted here; catalog construction reports them
    /// as colliding commands.
    pub fn register(&mut self, book: Box<dyn Book>) -> Result<()> {
        let name = book.name().to_string();
        if !is_valid_identifier(&name) {
            bail!("book name must match ^[a-z][a-z0-9_]*$, got '{name}'");
        }
        book.schema()
            .validate()
            .with_context(|| format!("invalid schema for book '{name}'"))?;
        for operation in book.operations() {
            if !is_valid_identifier(&operation.name) {
                bail!(
                    "book '{name}' declares operation with invalid name '{}'",
                    operation.name
                );
            }
        }
        debug!(book = %name, position = self.books.len(), "registered book");
        self.books.push(book);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn books(&self) -> impl Iterator<Item = &dyn Book> {
        self.books.iter().map(|book| book.as_ref() as &dyn Book)
    }

    pub fn book(&self, position: usize) -> Option<&dyn Book> {
        self.books
            .get(position)
            .map(|book| book.as_ref() as &dyn Book)
    }

    pub fn book_mut(&mut self, position: usize) -> Option<&mut dyn Book> {
        match self.books.get_mut(position) {
            Some(book) => Some(book.as_mut() as &mut dyn Book),
            None => None,
        }
    }

    /// First registered book with this name.
    pub fn find(&self, name: &str) -> Option<&dyn Book> {
        self.books().find(|book| book.name() == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut dyn Book> {
        match self.books.iter_mut().find(|book| book.name() == name) {
            Some(book) => Some(book.as_mut() as &mut dyn Book),
            None => None,
        }
    }
}

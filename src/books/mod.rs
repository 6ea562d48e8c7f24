//! Built-in record books, registered by the loader in this order.

pub mod contact;
pub mod note;

pub use contact::ContactBook;
pub use note::NoteBook;

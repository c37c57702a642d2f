//! Query compilation and file selection.

pub mod compiler;
pub mod selector;

pub use compiler::{compile, Category, Query, SqlQuery};
pub use selector::{select, FileSelector};

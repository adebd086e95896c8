//! Persistence module split across logical submodules. `Store` owns the one
//! SQLite connection; the entity modules hold the SQL.

pub mod books;
mod connection;
pub mod loans;
pub mod members;
mod patch;
pub mod staff;

pub(crate) use connection::like_pattern;
pub use connection::{ensure_schema, Store};
pub use patch::{apply_patch, Patch, Table};

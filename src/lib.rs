//! Library records manager: books, members, loans and staff kept in SQLite
//! behind a menu-driven terminal UI.
//!
//! `library` holds the operations and their rules, `db` the SQL, and `ui`
//! the screens. The binary only wires configuration, logging and the store
//! together before handing control to the event loop.
pub mod config;
pub mod db;
pub mod error;
pub mod library;
pub mod logging;
pub mod models;
pub mod ui;

pub use config::Config;
pub use db::Store;
pub use error::{LibraryError, LibraryResult, StoreError};
pub use models::{Book, Loan, LoanDetails, LoanStatus, Member, Staff, StaffRole};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};

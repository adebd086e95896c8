//! Error kinds returned by the persistence layer and the library operations.
//! The TUI renders these; nothing below the UI prints.

use rusqlite::ErrorCode;
use thiserror::Error;

/// Failures raised by the data access layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A UNIQUE, CHECK, NOT NULL or FOREIGN KEY constraint rejected a write.
    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("database error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("failed to prepare data directory: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        if matches!(
            err.sqlite_error_code(),
            Some(ErrorCode::ConstraintViolation)
        ) {
            StoreError::Constraint(err.to_string())
        } else {
            StoreError::Sqlite(err)
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome kinds for every library operation. Variants other than `Store`
/// are raised before any write happens.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("{0}")]
    Validation(String),

    #[error("Member {0} not found.")]
    MemberNotFound(i64),

    #[error("Book {0} not found.")]
    BookNotFound(i64),

    #[error("Staff member {0} not found.")]
    StaffNotFound(i64),

    #[error("Book {0} has no available copies.")]
    BookUnavailable(i64),

    #[error("Member {member_id} already has {limit} active loans.")]
    LoanLimitReached { member_id: i64, limit: i64 },

    #[error("Member {member_id} already has book {book_id} on loan.")]
    AlreadyBorrowed { member_id: i64, book_id: i64 },

    #[error("No active loan of book {book_id} for member {member_id}.")]
    NoActiveLoan { member_id: i64, book_id: i64 },

    #[error("{entity} {id} has loan records and cannot be removed.")]
    HasLoanHistory { entity: &'static str, id: i64 },

    #[error("Access denied: staff {staff_id} is a {role}.")]
    AccessDenied { staff_id: i64, role: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<rusqlite::Error> for LibraryError {
    fn from(err: rusqlite::Error) -> Self {
        LibraryError::Store(err.into())
    }
}

impl LibraryError {
    /// True for failures caused by the request rather than the store.
    pub fn is_precondition(&self) -> bool {
        !matches!(self, LibraryError::Validation(_) | LibraryError::Store(_))
    }
}

pub type LibraryResult<T> = Result<T, LibraryError>;

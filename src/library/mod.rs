//! Library operations. Each function validates its input, checks the
//! preconditions it needs against the store, and returns a typed outcome; the
//! TUI decides how to show it.

pub mod access;
pub mod books;
pub mod loans;
pub mod members;
pub mod staff;

use chrono::{Local, NaiveDate};

use crate::error::{LibraryError, LibraryResult};

/// Local calendar date used for loan and due dates.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Trim an optional edit field; blank means "keep the stored value".
pub(crate) fn provided(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trimmed text for a field that must not be blank.
pub(crate) fn required(field: &str, value: &str) -> LibraryResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(LibraryError::Validation(format!("{field} is required.")))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Loose sanity check; the address only needs an `@` with text on both sides.
pub(crate) fn check_email(email: Option<&str>) -> LibraryResult<()> {
    match email {
        Some(email) => match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
            _ => Err(LibraryError::Validation(format!(
                "'{email}' is not a valid email address."
            ))),
        },
        None => Ok(()),
    }
}

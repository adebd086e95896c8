//! Domain models that mirror the SQLite schema and get passed between the
//! persistence layer, the library operations, and the TUI. They stay plain
//! data holders; rules live in `library` and SQL lives in `db`.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

use crate::error::LibraryError;

#[derive(Debug, Clone, PartialEq, Eq)]
/// A catalogued title and its copy counts.
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    /// Unique across the catalogue; the store rejects duplicates.
    pub isbn: String,
    pub publication_year: Option<i32>,
    pub genre: Option<String>,
    pub total_copies: i64,
    /// Copies not currently on loan. Always within `0..=total_copies`.
    pub available_copies: i64,
}

impl Book {
    /// Copies currently checked out.
    pub fn on_loan(&self) -> i64 {
        self.total_copies - self.available_copies
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} by {}", self.title, self.author)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub membership_date: NaiveDate,
}

impl Member {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Staff {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub role: StaffRole,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub hire_date: NaiveDate,
}

impl Staff {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Job titles stored in the `staff.role` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaffRole {
    Manager,
    HeadLibrarian,
    Librarian,
    Assistant,
}

impl StaffRole {
    pub const ALL: [StaffRole; 4] = [
        StaffRole::Manager,
        StaffRole::HeadLibrarian,
        StaffRole::Librarian,
        StaffRole::Assistant,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Manager => "Manager",
            StaffRole::HeadLibrarian => "Head Librarian",
            StaffRole::Librarian => "Librarian",
            StaffRole::Assistant => "Assistant",
        }
    }

    /// Roles allowed into staff management.
    pub fn can_manage_staff(&self) -> bool {
        matches!(self, StaffRole::Manager | StaffRole::HeadLibrarian)
    }
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for StaffRole {
    type Err = LibraryError;

    /// Case-insensitive; spacing inside "Head Librarian" is not significant.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        StaffRole::ALL
            .into_iter()
            .find(|role| role.as_str().to_lowercase() == normalized)
            .ok_or_else(|| {
                LibraryError::Validation(format!(
                    "Unknown role '{}'. Expected one of: Manager, Head Librarian, Librarian, Assistant.",
                    s.trim()
                ))
            })
    }
}

impl ToSql for StaffRole {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for StaffRole {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        text.parse().map_err(|err| FromSqlError::Other(Box::new(err)))
    }
}

/// Loan lifecycle. `Returned` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanStatus {
    Active,
    Returned,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "Active",
            LoanStatus::Returned => "Returned",
        }
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl ToSql for LoanStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for LoanStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "Active" => Ok(LoanStatus::Active),
            "Returned" => Ok(LoanStatus::Returned),
            other => Err(FromSqlError::Other(
                format!("unknown loan status '{other}'").into(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loan {
    pub id: i64,
    pub member_id: i64,
    pub book_id: i64,
    pub loan_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: LoanStatus,
}

impl Loan {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == LoanStatus::Active && self.due_date < today
    }
}

/// A loan joined with the names needed to list it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanDetails {
    pub loan: Loan,
    pub member_name: String,
    pub book_title: String,
}

/// Input for a new catalogue entry.
#[derive(Debug, Clone, Default)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub publication_year: Option<i32>,
    pub genre: Option<String>,
    pub total_copies: i64,
}

/// Fields an edit may change. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct BookUpdate {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub publication_year: Option<i32>,
    pub genre: Option<String>,
    pub total_copies: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct NewMember {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MemberUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewStaff {
    pub first_name: String,
    pub last_name: String,
    pub role: StaffRole,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StaffUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<StaffRole>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

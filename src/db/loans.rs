use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::StoreResult;
use crate::models::{Loan, LoanDetails, LoanStatus};

use super::Store;

const LOAN_COLUMNS: &str = "id, member_id, book_id, loan_date, due_date, status";

fn loan_from_row(row: &Row<'_>) -> rusqlite::Result<Loan> {
    Ok(Loan {
        id: row.get("id")?,
        member_id: row.get("member_id")?,
        book_id: row.get("book_id")?,
        loan_date: row.get("loan_date")?,
        due_date: row.get("due_date")?,
        status: row.get("status")?,
    })
}

fn details_from_row(row: &Row<'_>) -> rusqlite::Result<LoanDetails> {
    Ok(LoanDetails {
        loan: loan_from_row(row)?,
        member_name: row.get("member_name")?,
        book_title: row.get("book_title")?,
    })
}

/// Shared projection for the listing queries. Column aliases line up with
/// `loan_from_row` so both mappers read the same names.
const DETAILS_SELECT: &str = "SELECT l.id AS id, l.member_id AS member_id, l.book_id AS book_id,
        l.loan_date AS loan_date, l.due_date AS due_date, l.status AS status,
        m.first_name || ' ' || m.last_name AS member_name, b.title AS book_title
     FROM loans l
     INNER JOIN members m ON m.id = l.member_id
     INNER JOIN books b ON b.id = l.book_id";

pub fn insert_loan(
    conn: &Connection,
    member_id: i64,
    book_id: i64,
    loan_date: NaiveDate,
    due_date: NaiveDate,
) -> StoreResult<i64> {
    conn.execute(
        "INSERT INTO loans (member_id, book_id, loan_date, due_date, status)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![member_id, book_id, loan_date, due_date, LoanStatus::Active],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn fetch_loan(conn: &Connection, id: i64) -> StoreResult<Option<Loan>> {
    let loan = conn
        .query_row(
            &format!("SELECT {LOAN_COLUMNS} FROM loans WHERE id = ?1"),
            [id],
            loan_from_row,
        )
        .optional()?;
    Ok(loan)
}

/// The open loan for a (member, book) pair, if one exists.
pub fn find_active_loan(
    conn: &Connection,
    member_id: i64,
    book_id: i64,
) -> StoreResult<Option<Loan>> {
    let loan = conn
        .query_row(
            &format!(
                "SELECT {LOAN_COLUMNS} FROM loans
                 WHERE member_id = ?1 AND book_id = ?2 AND status = ?3
                 ORDER BY id DESC LIMIT 1"
            ),
            params![member_id, book_id, LoanStatus::Active],
            loan_from_row,
        )
        .optional()?;
    Ok(loan)
}

pub fn count_active_loans(conn: &Connection, member_id: i64) -> StoreResult<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM loans WHERE member_id = ?1 AND status = ?2",
        params![member_id, LoanStatus::Active],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Move the due date of an active loan.
pub fn set_due_date(conn: &Connection, loan_id: i64, due_date: NaiveDate) -> StoreResult<usize> {
    Ok(conn.execute(
        "UPDATE loans SET due_date = ?1 WHERE id = ?2 AND status = ?3",
        params![due_date, loan_id, LoanStatus::Active],
    )?)
}

/// Close an active loan. Returned loans are never reopened.
pub fn mark_returned(conn: &Connection, loan_id: i64) -> StoreResult<usize> {
    Ok(conn.execute(
        "UPDATE loans SET status = ?1 WHERE id = ?2 AND status = ?3",
        params![LoanStatus::Returned, loan_id, LoanStatus::Active],
    )?)
}

pub fn fetch_active_loans(store: &Store) -> StoreResult<Vec<LoanDetails>> {
    store.query(
        &format!("{DETAILS_SELECT} WHERE l.status = ?1 ORDER BY l.due_date, l.id"),
        [LoanStatus::Active],
        details_from_row,
    )
}

/// Active loans due strictly before `today`. Dates are zero-padded ISO text,
/// so the string comparison orders them chronologically.
pub fn fetch_overdue_loans(store: &Store, today: NaiveDate) -> StoreResult<Vec<LoanDetails>> {
    store.query(
        &format!(
            "{DETAILS_SELECT} WHERE l.status = ?1 AND l.due_date < ?2
             ORDER BY l.due_date, l.id"
        ),
        params![LoanStatus::Active, today],
        details_from_row,
    )
}

/// Full history for one member, newest first.
pub fn fetch_member_loans(store: &Store, member_id: i64) -> StoreResult<Vec<LoanDetails>> {
    store.query(
        &format!("{DETAILS_SELECT} WHERE l.member_id = ?1 ORDER BY l.loan_date DESC, l.id DESC"),
        [member_id],
        details_from_row,
    )
}

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::StoreResult;
use crate::models::{NewStaff, Staff, StaffRole};

use super::Store;

const STAFF_COLUMNS: &str = "id, first_name, last_name, role, email, phone, hire_date";

fn staff_from_row(row: &Row<'_>) -> rusqlite::Result<Staff> {
    Ok(Staff {
        id: row.get("id")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        role: row.get("role")?,
        email: row.get("email")?,
        phone: row.get("phone")?,
        hire_date: row.get("hire_date")?,
    })
}

pub fn fetch_all_staff(store: &Store) -> StoreResult<Vec<Staff>> {
    store.query(
        &format!("SELECT {STAFF_COLUMNS} FROM staff ORDER BY id"),
        [],
        staff_from_row,
    )
}

pub fn fetch_staff(conn: &Connection, id: i64) -> StoreResult<Option<Staff>> {
    let staff = conn
        .query_row(
            &format!("SELECT {STAFF_COLUMNS} FROM staff WHERE id = ?1"),
            [id],
            staff_from_row,
        )
        .optional()?;
    Ok(staff)
}

/// Role text only. The access gate reads this so an unrecognised role in the
/// table denies access instead of failing to decode the whole row.
pub fn fetch_staff_role(conn: &Connection, id: i64) -> StoreResult<Option<String>> {
    let role = conn
        .query_row("SELECT role FROM staff WHERE id = ?1", [id], |row| row.get(0))
        .optional()?;
    Ok(role)
}

pub fn insert_staff(store: &mut Store, staff: &NewStaff, hired: NaiveDate) -> StoreResult<i64> {
    store.write(
        "INSERT INTO staff (first_name, last_name, role, email, phone, hire_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            staff.first_name,
            staff.last_name,
            staff.role,
            staff.email,
            staff.phone,
            hired,
        ],
    )?;
    Ok(store.conn().last_insert_rowid())
}

pub fn delete_staff(conn: &Connection, id: i64) -> StoreResult<usize> {
    Ok(conn.execute("DELETE FROM staff WHERE id = ?1", [id])?)
}

/// Staff whose role lets them into staff management.
pub fn count_staff_managers(conn: &Connection) -> StoreResult<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM staff WHERE role IN (?1, ?2)",
        params![StaffRole::Manager, StaffRole::HeadLibrarian],
        |row| row.get(0),
    )?;
    Ok(count)
}

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::StoreResult;
use crate::models::{Member, NewMember};

use super::{like_pattern, Store};

const MEMBER_COLUMNS: &str = "id, first_name, last_name, email, phone, address, membership_date";

fn member_from_row(row: &Row<'_>) -> rusqlite::Result<Member> {
    Ok(Member {
        id: row.get("id")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        email: row.get("email")?,
        phone: row.get("phone")?,
        address: row.get("address")?,
        membership_date: row.get("membership_date")?,
    })
}

pub fn fetch_members(store: &Store) -> StoreResult<Vec<Member>> {
    store.query(
        &format!(
            "SELECT {MEMBER_COLUMNS} FROM members
             ORDER BY last_name COLLATE NOCASE, first_name COLLATE NOCASE"
        ),
        [],
        member_from_row,
    )
}

pub fn fetch_member(conn: &Connection, id: i64) -> StoreResult<Option<Member>> {
    let member = conn
        .query_row(
            &format!("SELECT {MEMBER_COLUMNS} FROM members WHERE id = ?1"),
            [id],
            member_from_row,
        )
        .optional()?;
    Ok(member)
}

/// Match against either name or the email address.
pub fn search_members(store: &Store, term: &str) -> StoreResult<Vec<Member>> {
    let pattern = like_pattern(term);
    store.query(
        &format!(
            "SELECT {MEMBER_COLUMNS} FROM members
             WHERE first_name LIKE ?1 ESCAPE '\\' OR last_name LIKE ?1 ESCAPE '\\'
                OR (first_name || ' ' || last_name) LIKE ?1 ESCAPE '\\'
                OR email LIKE ?1 ESCAPE '\\'
             ORDER BY last_name COLLATE NOCASE, first_name COLLATE NOCASE"
        ),
        [pattern],
        member_from_row,
    )
}

pub fn insert_member(store: &mut Store, member: &NewMember, joined: NaiveDate) -> StoreResult<i64> {
    store.write(
        "INSERT INTO members (first_name, last_name, email, phone, address, membership_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            member.first_name,
            member.last_name,
            member.email,
            member.phone,
            member.address,
            joined,
        ],
    )?;
    Ok(store.conn().last_insert_rowid())
}

pub fn delete_member(store: &mut Store, id: i64) -> StoreResult<usize> {
    store.write("DELETE FROM members WHERE id = ?1", [id])
}

pub fn member_has_loans(conn: &Connection, id: i64) -> StoreResult<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM loans WHERE member_id = ?1)",
        [id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

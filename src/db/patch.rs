use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use crate::error::StoreResult;

/// Tables that accept patches. Keeping this closed means table names in the
/// generated SQL never come from user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Books,
    Members,
    Staff,
}

impl Table {
    fn name(&self) -> &'static str {
        match self {
            Table::Books => "books",
            Table::Members => "members",
            Table::Staff => "staff",
        }
    }
}

/// Column assignments for an UPDATE, in insertion order. Only fields that were
/// actually supplied end up here; absent ones keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct Patch {
    fields: Vec<(&'static str, Value)>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `column = value` when `value` is present.
    pub fn set<V: Into<Value>>(mut self, column: &'static str, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.fields.retain(|(existing, _)| *existing != column);
            self.fields.push((column, value.into()));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(column, _)| *column)
    }

    /// Render the UPDATE statement for this patch. The row id binds last.
    fn to_sql(&self, table: Table) -> String {
        let assignments = self
            .fields
            .iter()
            .enumerate()
            .map(|(idx, (column, _))| format!("{column} = ?{}", idx + 1))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "UPDATE {} SET {assignments} WHERE id = ?{}",
            table.name(),
            self.fields.len() + 1
        )
    }
}

/// Apply `patch` to row `id` as a single parameterized statement. An empty
/// patch writes nothing and reports zero affected rows.
pub fn apply_patch(conn: &Connection, table: Table, id: i64, patch: &Patch) -> StoreResult<usize> {
    if patch.is_empty() {
        return Ok(0);
    }
    let sql = patch.to_sql(table);
    let values = patch
        .fields
        .iter()
        .map(|(_, value)| value.clone())
        .chain(std::iter::once(Value::Integer(id)));
    Ok(conn.execute(&sql, params_from_iter(values))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn_with_row() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE members (id INTEGER PRIMARY KEY, first_name TEXT, last_name TEXT, email TEXT);
             INSERT INTO members VALUES (1, 'Ada', 'Lovelace', 'ada@example.com');",
        )
        .unwrap();
        conn
    }

    #[test]
    fn only_supplied_columns_are_rendered() {
        let patch = Patch::new()
            .set("title", Some("Dune".to_string()))
            .set::<String>("author", None)
            .set("total_copies", Some(3_i64));
        assert_eq!(
            patch.to_sql(Table::Books),
            "UPDATE books SET title = ?1, total_copies = ?2 WHERE id = ?3"
        );
    }

    #[test]
    fn setting_a_column_twice_keeps_the_last_value() {
        let patch = Patch::new()
            .set("title", Some("a".to_string()))
            .set("title", Some("b".to_string()));
        assert_eq!(patch.columns().collect::<Vec<_>>(), vec!["title"]);
    }

    #[test]
    fn empty_patch_is_a_no_op() {
        let conn = conn_with_row();
        assert_eq!(apply_patch(&conn, Table::Members, 1, &Patch::new()).unwrap(), 0);
    }

    #[test]
    fn apply_keeps_absent_fields() {
        let conn = conn_with_row();
        let patch = Patch::new()
            .set("last_name", Some("King".to_string()))
            .set::<String>("email", None);
        assert_eq!(apply_patch(&conn, Table::Members, 1, &patch).unwrap(), 1);
        let (first, last, email): (String, String, String) = conn
            .query_row(
                "SELECT first_name, last_name, email FROM members WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(first, "Ada");
        assert_eq!(last, "King");
        assert_eq!(email, "ada@example.com");
    }

    #[test]
    fn missing_row_reports_zero() {
        let conn = conn_with_row();
        let patch = Patch::new().set("first_name", Some("Grace".to_string()));
        assert_eq!(apply_patch(&conn, Table::Members, 42, &patch).unwrap(), 0);
    }
}

use std::fs;
use std::path::Path;

use rusqlite::{Connection, Params, Row, Transaction};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};

/// Single owner of the SQLite connection for the lifetime of the process.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Ensure the database file exists, run lazy migrations, and return a live
    /// store. Foreign keys are switched on so loans cannot point at missing
    /// books or members.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "opened library database");
        Self::from_connection(conn)
    }

    /// Fresh schema in memory. Used by tests.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        ensure_schema(&conn)?;
        seed_staff(&conn)?;
        Ok(Self { conn })
    }

    /// Read-only access for helpers that run a single statement.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run a read and map every row. Columns are addressed by name inside
    /// `map` (`row.get("title")`).
    pub fn query<T, P, F>(&self, sql: &str, params: P, map: F) -> StoreResult<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, map)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Run one mutation in its own transaction and return the affected-row
    /// count. Any error rolls the transaction back before it is returned.
    pub fn write<P: Params>(&mut self, sql: &str, params: P) -> StoreResult<usize> {
        let tx = self.conn.transaction()?;
        let affected = match tx.execute(sql, params) {
            Ok(affected) => affected,
            Err(err) => {
                warn!(error = %err, "write rolled back");
                return Err(err.into());
            }
        };
        tx.commit()?;
        debug!(affected, "write committed");
        Ok(affected)
    }

    /// Run `work` inside one transaction. `Ok` commits every write it made;
    /// `Err` drops the transaction, which rolls all of them back.
    pub fn unit_of_work<T, E, F>(&mut self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let tx = self.conn.transaction().map_err(StoreError::from)?;
        match work(&tx) {
            Ok(value) => {
                tx.commit().map_err(StoreError::from)?;
                Ok(value)
            }
            Err(err) => {
                debug!("unit of work rolled back");
                Err(err)
            }
        }
    }
}

/// Idempotent schema bootstrap. The CHECK on `books` keeps availability inside
/// `0..=total_copies` even if a caller skips the domain checks; the one on
/// `staff.role` keeps every row decodable as a `StaffRole`.
pub fn ensure_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS books (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            author TEXT NOT NULL,
            isbn TEXT NOT NULL UNIQUE,
            publication_year INTEGER,
            genre TEXT,
            total_copies INTEGER NOT NULL CHECK (total_copies > 0),
            available_copies INTEGER NOT NULL,
            CHECK (available_copies >= 0 AND available_copies <= total_copies)
        );

        CREATE TABLE IF NOT EXISTS members (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT,
            phone TEXT,
            address TEXT,
            membership_date TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS loans (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            member_id INTEGER NOT NULL REFERENCES members(id),
            book_id INTEGER NOT NULL REFERENCES books(id),
            loan_date TEXT NOT NULL,
            due_date TEXT NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('Active', 'Returned'))
        );

        CREATE INDEX IF NOT EXISTS loans_member_status ON loans (member_id, status);
        CREATE INDEX IF NOT EXISTS loans_book ON loans (book_id);

        CREATE TABLE IF NOT EXISTS staff (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            role TEXT NOT NULL
                CHECK (role IN ('Manager', 'Head Librarian', 'Librarian', 'Assistant')),
            email TEXT,
            phone TEXT,
            hire_date TEXT NOT NULL
        );",
    )?;
    Ok(())
}

/// `%term%` for a `LIKE ... ESCAPE '\'` clause. `%`, `_` and `\` in the term
/// match themselves.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.trim().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Give a brand new database one manager so staff management is reachable.
fn seed_staff(conn: &Connection) -> StoreResult<()> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM staff", [], |row| row.get(0))?;
    if count == 0 {
        conn.execute(
            "INSERT INTO staff (first_name, last_name, role, hire_date)
             VALUES ('Library', 'Manager', 'Manager', date('now', 'localtime'))",
            [],
        )?;
        info!(
            staff_id = conn.last_insert_rowid(),
            "seeded default manager account"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LibraryError;
    use rusqlite::params;

    fn count_books(store: &Store) -> i64 {
        store
            .conn()
            .query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))
            .unwrap()
    }

    fn insert_book(isbn: &str) -> String {
        format!(
            "INSERT INTO books (title, author, isbn, total_copies, available_copies)
             VALUES ('T', 'A', '{isbn}', 1, 1)"
        )
    }

    #[test]
    fn schema_bootstrap_is_idempotent_and_seeds_once() {
        let store = Store::open_in_memory().unwrap();
        ensure_schema(store.conn()).unwrap();
        seed_staff(store.conn()).unwrap();
        let staff: i64 = store
            .conn()
            .query_row("SELECT COUNT(*) FROM staff", [], |row| row.get(0))
            .unwrap();
        assert_eq!(staff, 1);
    }

    #[test]
    fn unknown_staff_role_is_a_constraint_violation() {
        let mut store = Store::open_in_memory().unwrap();
        let err = store
            .write(
                "INSERT INTO staff (first_name, last_name, role, hire_date)
                 VALUES ('Vol', 'Unteer', 'Volunteer', '2024-01-01')",
                [],
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
        assert_eq!(
            store
                .conn()
                .query_row("SELECT COUNT(*) FROM staff", [], |row| row.get::<_, i64>(0))
                .unwrap(),
            1
        );
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" 50%_off "), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn write_commits_and_reports_affected_rows() {
        let mut store = Store::open_in_memory().unwrap();
        assert_eq!(store.write(&insert_book("1"), []).unwrap(), 1);
        assert_eq!(count_books(&store), 1);
    }

    #[test]
    fn failed_write_reports_constraint_and_leaves_table_untouched() {
        let mut store = Store::open_in_memory().unwrap();
        store.write(&insert_book("dup"), []).unwrap();
        let err = store.write(&insert_book("dup"), []).unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
        assert_eq!(count_books(&store), 1);
    }

    #[test]
    fn query_maps_rows_by_column_name() {
        let mut store = Store::open_in_memory().unwrap();
        store.write(&insert_book("a"), []).unwrap();
        store.write(&insert_book("b"), []).unwrap();
        let isbns = store
            .query(
                "SELECT isbn FROM books WHERE isbn <> ?1 ORDER BY isbn",
                params!["a"],
                |row| row.get::<_, String>("isbn"),
            )
            .unwrap();
        assert_eq!(isbns, vec!["b".to_string()]);
    }

    #[test]
    fn query_surfaces_errors_instead_of_panicking() {
        let store = Store::open_in_memory().unwrap();
        let result = store.query("SELECT nope FROM books", [], |row| row.get::<_, i64>(0));
        assert!(result.is_err());
    }

    #[test]
    fn unit_of_work_rolls_back_every_write_on_error() {
        let mut store = Store::open_in_memory().unwrap();
        let result: Result<(), LibraryError> = store.unit_of_work(|tx| {
            tx.execute(&insert_book("first"), [])?;
            tx.execute(&insert_book("first"), [])?;
            Ok(())
        });
        assert!(matches!(result, Err(LibraryError::Store(StoreError::Constraint(_)))));
        assert_eq!(count_books(&store), 0);
    }

    #[test]
    fn unit_of_work_commits_on_success() {
        let mut store = Store::open_in_memory().unwrap();
        let id = store
            .unit_of_work(|tx| -> Result<i64, StoreError> {
                tx.execute(&insert_book("x"), [])?;
                Ok(tx.last_insert_rowid())
            })
            .unwrap();
        assert!(id > 0);
        assert_eq!(count_books(&store), 1);
    }
}

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::StoreResult;
use crate::models::{Book, NewBook};

use super::{like_pattern, Store};

const BOOK_COLUMNS: &str =
    "id, title, author, isbn, publication_year, genre, total_copies, available_copies";

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        id: row.get("id")?,
        title: row.get("title")?,
        author: row.get("author")?,
        isbn: row.get("isbn")?,
        publication_year: row.get("publication_year")?,
        genre: row.get("genre")?,
        total_copies: row.get("total_copies")?,
        available_copies: row.get("available_copies")?,
    })
}

/// Every book, ordered case-insensitively by title then author.
pub fn fetch_books(store: &Store) -> StoreResult<Vec<Book>> {
    store.query(
        &format!(
            "SELECT {BOOK_COLUMNS} FROM books
             ORDER BY title COLLATE NOCASE, author COLLATE NOCASE"
        ),
        [],
        book_from_row,
    )
}

/// Look up one book. Takes a bare connection so it also works inside a
/// unit of work.
pub fn fetch_book(conn: &Connection, id: i64) -> StoreResult<Option<Book>> {
    let book = conn
        .query_row(
            &format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ?1"),
            [id],
            book_from_row,
        )
        .optional()?;
    Ok(book)
}

/// Substring match over title, author, genre and ISBN. SQLite's LIKE is
/// case-insensitive for ASCII, which is what catalogue searches want.
pub fn search_books(store: &Store, term: &str) -> StoreResult<Vec<Book>> {
    let pattern = like_pattern(term);
    store.query(
        &format!(
            "SELECT {BOOK_COLUMNS} FROM books
             WHERE title LIKE ?1 ESCAPE '\\' OR author LIKE ?1 ESCAPE '\\'
                OR genre LIKE ?1 ESCAPE '\\' OR isbn LIKE ?1 ESCAPE '\\'
             ORDER BY title COLLATE NOCASE, author COLLATE NOCASE"
        ),
        [pattern],
        book_from_row,
    )
}

/// Insert a catalogue entry with every copy available and return its id.
pub fn insert_book(store: &mut Store, book: &NewBook) -> StoreResult<i64> {
    store.write(
        "INSERT INTO books
            (title, author, isbn, publication_year, genre, total_copies, available_copies)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![
            book.title,
            book.author,
            book.isbn,
            book.publication_year,
            book.genre,
            book.total_copies,
        ],
    )?;
    Ok(store.conn().last_insert_rowid())
}

pub fn delete_book(store: &mut Store, id: i64) -> StoreResult<usize> {
    store.write("DELETE FROM books WHERE id = ?1", [id])
}

/// Take one copy off the shelf. Guarded so availability never goes below
/// zero; a zero return means nothing was available.
pub fn decrement_available(conn: &Connection, id: i64) -> StoreResult<usize> {
    Ok(conn.execute(
        "UPDATE books SET available_copies = available_copies - 1
         WHERE id = ?1 AND available_copies > 0",
        [id],
    )?)
}

/// Put one copy back. The table CHECK rejects going past `total_copies`.
pub fn increment_available(conn: &Connection, id: i64) -> StoreResult<usize> {
    Ok(conn.execute(
        "UPDATE books SET available_copies = available_copies + 1 WHERE id = ?1",
        [id],
    )?)
}

/// Whether any loan row, active or returned, references the book.
pub fn book_has_loans(conn: &Connection, id: i64) -> StoreResult<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM loans WHERE book_id = ?1)",
        [id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

use chrono::{Datelike, NaiveDate};
use tracing::info;

use crate::db::{apply_patch, books, Patch, Store, Table};
use crate::error::{LibraryError, LibraryResult};
use crate::models::{Book, BookUpdate, NewBook};

use super::{provided, required};

fn check_year(year: Option<i32>, today: NaiveDate) -> LibraryResult<()> {
    match year {
        Some(year) if !(0..=today.year() + 1).contains(&year) => Err(LibraryError::Validation(
            format!("Publication year {year} is out of range."),
        )),
        _ => Ok(()),
    }
}

fn check_copies(copies: i64) -> LibraryResult<()> {
    if copies > 0 {
        Ok(())
    } else {
        Err(LibraryError::Validation(
            "Total copies must be greater than zero.".to_string(),
        ))
    }
}

/// Add a title to the catalogue with every copy available. A duplicate ISBN
/// comes back as a store constraint error.
pub fn add_book(store: &mut Store, book: NewBook, today: NaiveDate) -> LibraryResult<Book> {
    let book = NewBook {
        title: required("Title", &book.title)?,
        author: required("Author", &book.author)?,
        isbn: required("ISBN", &book.isbn)?,
        genre: provided(book.genre),
        ..book
    };
    check_copies(book.total_copies)?;
    check_year(book.publication_year, today)?;

    let id = books::insert_book(store, &book)?;
    info!(book_id = id, isbn = %book.isbn, copies = book.total_copies, "book added");
    get_book(store, id)
}

/// Apply the supplied fields and keep the rest. Changing the total shifts the
/// available count by the same amount; the total may not drop below the
/// number of copies currently on loan.
pub fn update_book(
    store: &mut Store,
    id: i64,
    update: BookUpdate,
    today: NaiveDate,
) -> LibraryResult<Book> {
    if let Some(total) = update.total_copies {
        check_copies(total)?;
    }
    check_year(update.publication_year, today)?;

    store.unit_of_work(|tx| {
        let current = books::fetch_book(tx, id)?.ok_or(LibraryError::BookNotFound(id))?;
        let available = match update.total_copies {
            Some(total) if total < current.on_loan() => {
                return Err(LibraryError::Validation(format!(
                    "{} copies are on loan; total cannot drop to {total}.",
                    current.on_loan()
                )));
            }
            Some(total) => Some(total - current.on_loan()),
            None => None,
        };

        let patch = Patch::new()
            .set("title", provided(update.title))
            .set("author", provided(update.author))
            .set("isbn", provided(update.isbn))
            .set("publication_year", update.publication_year)
            .set("genre", provided(update.genre))
            .set("total_copies", update.total_copies)
            .set("available_copies", available);
        let columns: Vec<_> = patch.columns().collect();
        apply_patch(tx, Table::Books, id, &patch)?;
        info!(book_id = id, ?columns, "book updated");
        Ok(())
    })?;

    get_book(store, id)
}

/// Remove a title that has never been lent. Loan rows are permanent, so a
/// book with any history stays in the catalogue.
pub fn remove_book(store: &mut Store, id: i64) -> LibraryResult<Book> {
    let book = get_book(store, id)?;
    if books::book_has_loans(store.conn(), id)? {
        return Err(LibraryError::HasLoanHistory { entity: "Book", id });
    }
    books::delete_book(store, id)?;
    info!(book_id = id, "book removed");
    Ok(book)
}

pub fn get_book(store: &Store, id: i64) -> LibraryResult<Book> {
    books::fetch_book(store.conn(), id)?.ok_or(LibraryError::BookNotFound(id))
}

pub fn list_books(store: &Store) -> LibraryResult<Vec<Book>> {
    Ok(books::fetch_books(store)?)
}

/// Blank search terms list the whole catalogue.
pub fn search_books(store: &Store, term: &str) -> LibraryResult<Vec<Book>> {
    if term.trim().is_empty() {
        return list_books(store);
    }
    Ok(books::search_books(store, term)?)
}

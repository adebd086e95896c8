//! Borrow, renew and return. These are the only operations that touch two
//! tables at once, so each pair of writes runs in a single unit of work: a
//! failure anywhere leaves both `books` and `loans` as they were.

use chrono::{Days, NaiveDate};
use tracing::{info, warn};

use crate::db::{books, loans, members, Store};
use crate::error::{LibraryError, LibraryResult, StoreError};
use crate::models::{Loan, LoanDetails, LoanStatus};

/// Calendar days between a borrow (or renewal) and the due date.
pub const LOAN_PERIOD_DAYS: u64 = 14;
/// Active loans one member may hold at the same time.
pub const MAX_ACTIVE_LOANS: i64 = 5;

/// Due date for a loan started or renewed on `from`.
pub fn due_date_from(from: NaiveDate) -> NaiveDate {
    from.checked_add_days(Days::new(LOAN_PERIOD_DAYS))
        .unwrap_or(NaiveDate::MAX)
}

/// Check a book out to a member.
///
/// Preconditions are checked in order (member, book, availability, duplicate
/// loan, loan limit) and the first failure is returned without writing. On
/// success the new loan row and the availability decrement commit together.
pub fn borrow_book(
    store: &mut Store,
    member_id: i64,
    book_id: i64,
    today: NaiveDate,
) -> LibraryResult<Loan> {
    let loan = store.unit_of_work(|tx| {
        if members::fetch_member(tx, member_id)?.is_none() {
            return Err(LibraryError::MemberNotFound(member_id));
        }
        let book = books::fetch_book(tx, book_id)?.ok_or(LibraryError::BookNotFound(book_id))?;
        if book.available_copies <= 0 {
            return Err(LibraryError::BookUnavailable(book_id));
        }
        if loans::find_active_loan(tx, member_id, book_id)?.is_some() {
            return Err(LibraryError::AlreadyBorrowed { member_id, book_id });
        }
        if loans::count_active_loans(tx, member_id)? >= MAX_ACTIVE_LOANS {
            return Err(LibraryError::LoanLimitReached {
                member_id,
                limit: MAX_ACTIVE_LOANS,
            });
        }

        let due_date = due_date_from(today);
        let loan_id = loans::insert_loan(tx, member_id, book_id, today, due_date)?;
        if books::decrement_available(tx, book_id)? != 1 {
            return Err(LibraryError::BookUnavailable(book_id));
        }

        Ok(Loan {
            id: loan_id,
            member_id,
            book_id,
            loan_date: today,
            due_date,
            status: LoanStatus::Active,
        })
    });

    match &loan {
        Ok(loan) => info!(
            loan_id = loan.id,
            member_id,
            book_id,
            due = %loan.due_date,
            "book borrowed"
        ),
        Err(err) => warn!(member_id, book_id, error = %err, "borrow refused"),
    }
    loan
}

/// Push the due date of an active loan to `today + LOAN_PERIOD_DAYS`. There
/// is no cap on the number of renewals.
pub fn renew_loan(
    store: &mut Store,
    member_id: i64,
    book_id: i64,
    today: NaiveDate,
) -> LibraryResult<Loan> {
    let result = store.unit_of_work(|tx| {
        let mut loan = loans::find_active_loan(tx, member_id, book_id)?
            .ok_or(LibraryError::NoActiveLoan { member_id, book_id })?;
        let due_date = due_date_from(today);
        if loans::set_due_date(tx, loan.id, due_date)? != 1 {
            return Err(LibraryError::NoActiveLoan { member_id, book_id });
        }
        loan.due_date = due_date;
        Ok(loan)
    });

    match &result {
        Ok(loan) => info!(loan_id = loan.id, due = %loan.due_date, "loan renewed"),
        Err(err) => warn!(member_id, book_id, error = %err, "renewal refused"),
    }
    result
}

/// Close the active loan for (member, book) and put the copy back on the
/// shelf. Both writes commit together or not at all.
pub fn return_book(store: &mut Store, member_id: i64, book_id: i64) -> LibraryResult<Loan> {
    let result = store.unit_of_work(|tx| {
        let mut loan = loans::find_active_loan(tx, member_id, book_id)?
            .ok_or(LibraryError::NoActiveLoan { member_id, book_id })?;
        if loans::mark_returned(tx, loan.id)? != 1 {
            return Err(LibraryError::NoActiveLoan { member_id, book_id });
        }
        if books::increment_available(tx, book_id)? != 1 {
            return Err(LibraryError::Store(StoreError::Constraint(format!(
                "book {book_id} could not be restocked"
            ))));
        }
        loan.status = LoanStatus::Returned;
        Ok(loan)
    });

    match &result {
        Ok(loan) => info!(loan_id = loan.id, member_id, book_id, "book returned"),
        Err(err) => warn!(member_id, book_id, error = %err, "return refused"),
    }
    result
}

/// Every active loan regardless of due date, soonest due first.
pub fn active_loans(store: &Store) -> LibraryResult<Vec<LoanDetails>> {
    Ok(loans::fetch_active_loans(store)?)
}

/// Active loans whose due date is strictly before `today`.
pub fn overdue_loans(store: &Store, today: NaiveDate) -> LibraryResult<Vec<LoanDetails>> {
    Ok(loans::fetch_overdue_loans(store, today)?)
}

/// A member's complete borrowing history.
pub fn member_loans(store: &Store, member_id: i64) -> LibraryResult<Vec<LoanDetails>> {
    if members::fetch_member(store.conn(), member_id)?.is_none() {
        return Err(LibraryError::MemberNotFound(member_id));
    }
    Ok(loans::fetch_member_loans(store, member_id)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewBook, NewMember};
    use rstest::{fixture, rstest};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn add_member(store: &mut Store, first: &str) -> i64 {
        let member = NewMember {
            first_name: first.to_string(),
            last_name: "Reader".to_string(),
            ..NewMember::default()
        };
        members::insert_member(store, &member, day(1)).unwrap()
    }

    fn add_book(store: &mut Store, isbn: &str, copies: i64) -> i64 {
        let book = NewBook {
            title: format!("Book {isbn}"),
            author: "Author".to_string(),
            isbn: isbn.to_string(),
            total_copies: copies,
            ..NewBook::default()
        };
        books::insert_book(store, &book).unwrap()
    }

    fn available(store: &Store, book_id: i64) -> i64 {
        books::fetch_book(store.conn(), book_id)
            .unwrap()
            .unwrap()
            .available_copies
    }

    fn loan_count(store: &Store) -> i64 {
        store
            .conn()
            .query_row("SELECT COUNT(*) FROM loans", [], |row| row.get(0))
            .unwrap()
    }

    struct Library {
        store: Store,
        member: i64,
        book: i64,
    }

    #[fixture]
    fn library() -> Library {
        let mut store = Store::open_in_memory().unwrap();
        let member = add_member(&mut store, "Ada");
        let book = add_book(&mut store, "978-1", 3);
        Library {
            store,
            member,
            book,
        }
    }

    #[test]
    fn due_date_is_fourteen_calendar_days_out() {
        assert_eq!(due_date_from(day(20)), NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
        let feb = NaiveDate::from_ymd_opt(2024, 2, 20).unwrap();
        assert_eq!(due_date_from(feb), NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
    }

    #[rstest]
    fn borrow_creates_active_loan_and_takes_a_copy(mut library: Library) {
        let loan = borrow_book(&mut library.store, library.member, library.book, day(1)).unwrap();
        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(loan.loan_date, day(1));
        assert_eq!(loan.due_date, day(15));
        assert_eq!(available(&library.store, library.book), 2);
        assert_eq!(loan_count(&library.store), 1);

        let stored = loans::fetch_loan(library.store.conn(), loan.id)
            .unwrap()
            .unwrap();
        assert_eq!(stored, loan);
    }

    #[rstest]
    #[case::unknown_member(Some(999), None)]
    #[case::unknown_book(None, Some(999))]
    fn borrow_with_unknown_ids_writes_nothing(
        mut library: Library,
        #[case] member: Option<i64>,
        #[case] book: Option<i64>,
    ) {
        let member_id = member.unwrap_or(library.member);
        let book_id = book.unwrap_or(library.book);
        let err = borrow_book(&mut library.store, member_id, book_id, day(1)).unwrap_err();
        match (member, book) {
            (Some(id), _) => assert!(matches!(err, LibraryError::MemberNotFound(m) if m == id)),
            (_, Some(id)) => assert!(matches!(err, LibraryError::BookNotFound(b) if b == id)),
            _ => unreachable!(),
        }
        assert_eq!(loan_count(&library.store), 0);
        assert_eq!(available(&library.store, library.book), 3);
    }

    #[rstest]
    fn borrow_refuses_when_no_copies_left(mut library: Library) {
        let single = add_book(&mut library.store, "978-2", 1);
        let other = add_member(&mut library.store, "Grace");
        borrow_book(&mut library.store, library.member, single, day(1)).unwrap();

        let err = borrow_book(&mut library.store, other, single, day(1)).unwrap_err();
        assert!(matches!(err, LibraryError::BookUnavailable(id) if id == single));
        assert_eq!(available(&library.store, single), 0);
        assert_eq!(loan_count(&library.store), 1);
    }

    #[rstest]
    fn borrow_refuses_second_active_loan_of_same_book(mut library: Library) {
        borrow_book(&mut library.store, library.member, library.book, day(1)).unwrap();
        let err = borrow_book(&mut library.store, library.member, library.book, day(2)).unwrap_err();
        assert!(matches!(err, LibraryError::AlreadyBorrowed { .. }));
        assert_eq!(available(&library.store, library.book), 2);
    }

    #[rstest]
    fn sixth_active_loan_is_rejected(mut library: Library) {
        let ids: Vec<i64> = (0..6)
            .map(|n| add_book(&mut library.store, &format!("isbn-{n}"), 1))
            .collect();
        for id in &ids[..5] {
            borrow_book(&mut library.store, library.member, *id, day(1)).unwrap();
        }

        let err = borrow_book(&mut library.store, library.member, ids[5], day(1)).unwrap_err();
        assert!(matches!(
            err,
            LibraryError::LoanLimitReached { limit: MAX_ACTIVE_LOANS, .. }
        ));
        assert_eq!(available(&library.store, ids[5]), 1);
        assert_eq!(loan_count(&library.store), 5);
    }

    #[rstest]
    fn returning_frees_a_slot_under_the_limit(mut library: Library) {
        let ids: Vec<i64> = (0..6)
            .map(|n| add_book(&mut library.store, &format!("isbn-{n}"), 1))
            .collect();
        for id in &ids[..5] {
            borrow_book(&mut library.store, library.member, *id, day(1)).unwrap();
        }
        return_book(&mut library.store, library.member, ids[0]).unwrap();
        borrow_book(&mut library.store, library.member, ids[5], day(2)).unwrap();
    }

    #[rstest]
    fn availability_never_leaves_bounds(mut library: Library) {
        let readers: Vec<i64> = ["B", "C", "D", "E", "F"]
            .iter()
            .map(|name| add_member(&mut library.store, name))
            .collect();
        let mut outcomes = Vec::new();
        for reader in &readers {
            outcomes.push(borrow_book(&mut library.store, *reader, library.book, day(1)).is_ok());
        }
        assert_eq!(outcomes, vec![true, true, true, false, false]);
        assert_eq!(available(&library.store, library.book), 0);

        for reader in &readers[..3] {
            return_book(&mut library.store, *reader, library.book).unwrap();
            let left = available(&library.store, library.book);
            assert!((0..=3).contains(&left));
        }
        assert_eq!(available(&library.store, library.book), 3);
    }

    #[rstest]
    fn renew_moves_due_date_from_renewal_day(mut library: Library) {
        borrow_book(&mut library.store, library.member, library.book, day(1)).unwrap();
        let renewed = renew_loan(&mut library.store, library.member, library.book, day(10)).unwrap();
        assert_eq!(renewed.due_date, day(24));
        assert_eq!(available(&library.store, library.book), 2);
        assert_eq!(loan_count(&library.store), 1);

        let again = renew_loan(&mut library.store, library.member, library.book, day(12)).unwrap();
        assert_eq!(again.due_date, day(26));
    }

    #[rstest]
    fn renew_without_active_loan_changes_nothing(mut library: Library) {
        let err = renew_loan(&mut library.store, library.member, library.book, day(3)).unwrap_err();
        assert!(matches!(err, LibraryError::NoActiveLoan { .. }));
        assert_eq!(loan_count(&library.store), 0);
    }

    #[rstest]
    fn return_closes_loan_and_restocks(mut library: Library) {
        let loan = borrow_book(&mut library.store, library.member, library.book, day(1)).unwrap();
        let returned = return_book(&mut library.store, library.member, library.book).unwrap();
        assert_eq!(returned.id, loan.id);
        assert_eq!(returned.status, LoanStatus::Returned);
        assert_eq!(available(&library.store, library.book), 3);

        let err = return_book(&mut library.store, library.member, library.book).unwrap_err();
        assert!(matches!(err, LibraryError::NoActiveLoan { .. }));
        assert_eq!(available(&library.store, library.book), 3);
    }

    #[rstest]
    fn failed_restock_keeps_the_loan_active(mut library: Library) {
        let single = add_book(&mut library.store, "978-9", 1);
        let loan = borrow_book(&mut library.store, library.member, single, day(1)).unwrap();
        // Someone fixed the count by hand, so the increment would overflow the total.
        library
            .store
            .write("UPDATE books SET available_copies = 1 WHERE id = ?1", [single])
            .unwrap();

        let err = return_book(&mut library.store, library.member, single).unwrap_err();
        assert!(matches!(err, LibraryError::Store(StoreError::Constraint(_))));
        let stored = loans::fetch_loan(library.store.conn(), loan.id)
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, LoanStatus::Active);
    }

    #[rstest]
    fn overdue_lists_only_active_loans_past_due(mut library: Library) {
        let late = add_book(&mut library.store, "late", 1);
        let due_today = add_book(&mut library.store, "today", 1);
        let returned = add_book(&mut library.store, "returned", 1);
        borrow_book(&mut library.store, library.member, late, day(1)).unwrap();
        borrow_book(&mut library.store, library.member, due_today, day(2)).unwrap();
        borrow_book(&mut library.store, library.member, returned, day(1)).unwrap();
        return_book(&mut library.store, library.member, returned).unwrap();

        // day(16): loan from day(1) was due day(15); loan from day(2) is due today.
        let overdue = overdue_loans(&library.store, day(16)).unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].loan.book_id, late);
        assert_eq!(overdue[0].member_name, "Ada Reader");

        let active = active_loans(&library.store).unwrap();
        let mut ids: Vec<i64> = active.iter().map(|d| d.loan.book_id).collect();
        ids.sort();
        assert_eq!(ids, vec![late, due_today]);
    }

    #[rstest]
    fn member_history_includes_returned_loans(mut library: Library) {
        borrow_book(&mut library.store, library.member, library.book, day(1)).unwrap();
        return_book(&mut library.store, library.member, library.book).unwrap();
        borrow_book(&mut library.store, library.member, library.book, day(3)).unwrap();

        let history = member_loans(&library.store, library.member).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].loan.status, LoanStatus::Active);
        assert_eq!(history[1].loan.status, LoanStatus::Returned);

        assert!(matches!(
            member_loans(&library.store, 404),
            Err(LibraryError::MemberNotFound(404))
        ));
    }
}

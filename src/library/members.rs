use chrono::NaiveDate;
use tracing::info;

use crate::db::{apply_patch, members, Patch, Store, Table};
use crate::error::{LibraryError, LibraryResult};
use crate::models::{Member, MemberUpdate, NewMember};

use super::{check_email, provided, required};

/// Register a member; the membership date is the day of registration.
pub fn add_member(store: &mut Store, member: NewMember, today: NaiveDate) -> LibraryResult<Member> {
    let member = NewMember {
        first_name: required("First name", &member.first_name)?,
        last_name: required("Last name", &member.last_name)?,
        email: provided(member.email),
        phone: provided(member.phone),
        address: provided(member.address),
    };
    check_email(member.email.as_deref())?;

    let id = members::insert_member(store, &member, today)?;
    info!(member_id = id, "member added");
    get_member(store, id)
}

pub fn update_member(store: &mut Store, id: i64, update: MemberUpdate) -> LibraryResult<Member> {
    let email = provided(update.email);
    check_email(email.as_deref())?;
    get_member(store, id)?;

    let patch = Patch::new()
        .set("first_name", provided(update.first_name))
        .set("last_name", provided(update.last_name))
        .set("email", email)
        .set("phone", provided(update.phone))
        .set("address", provided(update.address));
    let columns: Vec<_> = patch.columns().collect();
    apply_patch(store.conn(), Table::Members, id, &patch)?;
    info!(member_id = id, ?columns, "member updated");

    get_member(store, id)
}

/// Members who have ever borrowed keep their record, since loans are never
/// deleted and reference the member.
pub fn remove_member(store: &mut Store, id: i64) -> LibraryResult<Member> {
    let member = get_member(store, id)?;
    if members::member_has_loans(store.conn(), id)? {
        return Err(LibraryError::HasLoanHistory {
            entity: "Member",
            id,
        });
    }
    members::delete_member(store, id)?;
    info!(member_id = id, "member removed");
    Ok(member)
}

pub fn get_member(store: &Store, id: i64) -> LibraryResult<Member> {
    members::fetch_member(store.conn(), id)?.ok_or(LibraryError::MemberNotFound(id))
}

pub fn list_members(store: &Store) -> LibraryResult<Vec<Member>> {
    Ok(members::fetch_members(store)?)
}

pub fn search_members(store: &Store, term: &str) -> LibraryResult<Vec<Member>> {
    if term.trim().is_empty() {
        return list_members(store);
    }
    Ok(members::search_members(store, term)?)
}

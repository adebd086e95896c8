use chrono::NaiveDate;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::db::{apply_patch, staff, Patch, Store, Table};
use crate::error::{LibraryError, LibraryResult};
use crate::models::{NewStaff, Staff, StaffUpdate};

use super::{check_email, provided, required};

pub fn add_staff(store: &mut Store, new: NewStaff, today: NaiveDate) -> LibraryResult<Staff> {
    let new = NewStaff {
        first_name: required("First name", &new.first_name)?,
        last_name: required("Last name", &new.last_name)?,
        email: provided(new.email),
        phone: provided(new.phone),
        ..new
    };
    check_email(new.email.as_deref())?;

    let id = staff::insert_staff(store, &new, today)?;
    info!(staff_id = id, role = %new.role, "staff added");
    get_staff(store, id)
}

/// Refuse a change that leaves nobody able to enter staff management. Runs
/// after the write inside the same unit of work, so `Err` rolls it back.
fn keep_a_manager(conn: &Connection, id: i64) -> LibraryResult<()> {
    if staff::count_staff_managers(conn)? == 0 {
        warn!(staff_id = id, "refused change to the last manager");
        return Err(LibraryError::Validation(
            "At least one Manager or Head Librarian must remain.".to_string(),
        ));
    }
    Ok(())
}

pub fn update_staff(store: &mut Store, id: i64, update: StaffUpdate) -> LibraryResult<Staff> {
    let email = provided(update.email);
    check_email(email.as_deref())?;

    let patch = Patch::new()
        .set("first_name", provided(update.first_name))
        .set("last_name", provided(update.last_name))
        .set("role", update.role.map(|role| role.as_str().to_string()))
        .set("email", email)
        .set("phone", provided(update.phone));
    let columns: Vec<_> = patch.columns().collect();

    store.unit_of_work(|tx| {
        staff::fetch_staff(tx, id)?.ok_or(LibraryError::StaffNotFound(id))?;
        apply_patch(tx, Table::Staff, id, &patch)?;
        keep_a_manager(tx, id)
    })?;
    info!(staff_id = id, ?columns, "staff updated");

    get_staff(store, id)
}

pub fn remove_staff(store: &mut Store, id: i64) -> LibraryResult<Staff> {
    let removed = store.unit_of_work(|tx| {
        let removed = staff::fetch_staff(tx, id)?.ok_or(LibraryError::StaffNotFound(id))?;
        staff::delete_staff(tx, id)?;
        keep_a_manager(tx, id)?;
        Ok::<_, LibraryError>(removed)
    })?;
    info!(staff_id = id, "staff removed");
    Ok(removed)
}

pub fn get_staff(store: &Store, id: i64) -> LibraryResult<Staff> {
    staff::fetch_staff(store.conn(), id)?.ok_or(LibraryError::StaffNotFound(id))
}

pub fn list_staff(store: &Store) -> LibraryResult<Vec<Staff>> {
    Ok(staff::fetch_all_staff(store)?)
}

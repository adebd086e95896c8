//! Gate in front of staff management. Checked on every entry; nothing about
//! a successful check is remembered.

use tracing::{info, warn};

use crate::db::{staff, Store};
use crate::error::{LibraryError, LibraryResult};
use crate::models::{Staff, StaffRole};

/// Admit `staff_id` to staff management if their role is Manager or Head
/// Librarian. An unrecognised role text in the table is treated as a denial.
pub fn authorize_staff_management(store: &Store, staff_id: i64) -> LibraryResult<Staff> {
    let Some(role_text) = staff::fetch_staff_role(store.conn(), staff_id)? else {
        warn!(staff_id, "staff management denied: unknown staff id");
        return Err(LibraryError::StaffNotFound(staff_id));
    };

    match role_text.parse::<StaffRole>() {
        Ok(role) if role.can_manage_staff() => {
            let member = staff::fetch_staff(store.conn(), staff_id)?
                .ok_or(LibraryError::StaffNotFound(staff_id))?;
            info!(staff_id, role = %role, "staff management granted");
            Ok(member)
        }
        _ => {
            warn!(staff_id, role = %role_text, "staff management denied");
            Err(LibraryError::AccessDenied {
                staff_id,
                role: role_text,
            })
        }
    }
}

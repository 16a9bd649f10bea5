//! Role capabilities
//!
//! Every role check in the crate goes through [`authorize`].

use super::DomainError;
use crate::models::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Borrow,
    ManageCatalog,
    ManageLending,
    ManageMembers,
    ManageStaff,
}

pub fn can(role: Role, capability: Capability) -> bool {
    match capability {
        Capability::Borrow => true,
        Capability::ManageCatalog | Capability::ManageLending | Capability::ManageMembers => {
            role.is_staff()
        }
        Capability::ManageStaff => role == Role::Admin,
    }
}

pub fn authorize(role: Role, capability: Capability) -> Result<(), DomainError> {
    if can(role, capability) {
        Ok(())
    } else {
        Err(DomainError::Forbidden(format!(
            "role '{}' may not perform {:?}",
            role.as_str(),
            capability
        )))
    }
}

/// Capability needed to create, edit or delete an account with `target` role.
pub fn capability_for_account(target: Role) -> Capability {
    if target.is_staff() {
        Capability::ManageStaff
    } else {
        Capability::ManageMembers
    }
}

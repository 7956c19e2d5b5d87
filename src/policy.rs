// src/policy.rs
//
// Role & visibility decisions. Everything here is a pure function of the
// caller's role; no lookups, no side effects.

use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{Actor, Appointment, Role};

/// Which appointments a caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    OwnedBy(Uuid),
}

impl Scope {
    pub fn permits(&self, appointment: &Appointment) -> bool {
        match self {
            Scope::All => true,
            Scope::OwnedBy(user_id) => appointment.user_id == *user_id,
        }
    }
}

/// Staff see everything, clients see their own bookings.
///
/// An unrecognized role gets `OwnedBy(nil)`: identifiers are v4 UUIDs, so the
/// nil id owns nothing and the caller sees an empty set.
pub fn scope_for(role: Option<Role>, requester_id: Uuid) -> Scope {
    match role {
        Some(Role::Admin) | Some(Role::Employee) => Scope::All,
        Some(Role::Client) => Scope::OwnedBy(requester_id),
        None => Scope::OwnedBy(Uuid::nil()),
    }
}

pub fn scope_of(actor: &Actor) -> Scope {
    scope_for(actor.role, actor.user_id)
}

/// Related records attached to an appointment in a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projection {
    pub pet: bool,
    pub service: bool,
    pub owner: bool,
}

impl Projection {
    pub const CLIENT_VIEW: Projection = Projection { pet: true, service: true, owner: false };
    pub const STAFF_VIEW: Projection = Projection { pet: true, service: true, owner: true };
    pub const SERVICE_ONLY: Projection = Projection { pet: false, service: true, owner: false };
}

/// Owner profiles are only shown to staff.
pub fn projection_for(role: Option<Role>) -> Projection {
    match role {
        Some(Role::Admin) | Some(Role::Employee) => Projection::STAFF_VIEW,
        Some(Role::Client) | None => Projection::CLIENT_VIEW,
    }
}

pub fn can_book(role: Option<Role>) -> bool {
    match role {
        Some(Role::Client) => true,
        Some(Role::Employee) | Some(Role::Admin) | None => false,
    }
}

/// Status changes do not require ownership.
pub fn can_change_status(role: Option<Role>) -> bool {
    match role {
        Some(Role::Employee) | Some(Role::Admin) => true,
        Some(Role::Client) | None => false,
    }
}

pub fn can_delete(role: Option<Role>) -> bool {
    match role {
        Some(Role::Admin) => true,
        Some(Role::Employee) | Some(Role::Client) | None => false,
    }
}

pub fn can_view_reports(role: Option<Role>) -> bool {
    can_change_status(role)
}

pub fn ensure(allowed: bool, what: &str) -> Result<(), CoreError> {
    if allowed {
        Ok(())
    } else {
        Err(CoreError::Forbidden(format!("role may not {what}")))
    }
}

/// Route-table check: is `role` one of `allowed`?
pub fn role_allowed(role: Option<Role>, allowed: &[Role]) -> bool {
    role.is_some_and(|r| allowed.contains(&r))
}

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::CoreError;
use crate::lifecycle::TransitionRules;
use crate::notify::NotificationSink;
use crate::store::{AppointmentStore, Registry, SessionStore};

#[derive(Clone)]
pub struct AppState {
    pub appointments: Arc<dyn AppointmentStore>,
    pub registry: Arc<dyn Registry>,
    pub sessions: Arc<dyn SessionStore>,
    pub notifier: Arc<dyn NotificationSink>,
    pub rules: TransitionRules,
    pub low_stock_threshold: i32,
}

/* -------------------------
   API envelopes
--------------------------*/

#[derive(Debug, Serialize)]
pub struct ApiOk<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct OkData {
    pub ok: bool,
}

/* -------------------------
   Roles & statuses
--------------------------*/

/// Role mapping stored as smallint on `app_user.role`:
/// 0 client, 1 employee, 2 admin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Client,
    Employee,
    Admin,
}

impl Role {
    /// Unknown codes yield `None`; callers treat that as "no permissions".
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(Role::Client),
            1 => Some(Role::Employee),
            2 => Some(Role::Admin),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn code(self) -> i16 {
        match self {
            Role::Client => 0,
            Role::Employee => 1,
            Role::Admin => 2,
        }
    }
}

/// Stored as smallint on `appointment.status`:
/// 0 scheduled, 1 confirmed, 2 completed, 3 cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 4] = [
        AppointmentStatus::Scheduled,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
    ];

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(AppointmentStatus::Scheduled),
            1 => Some(AppointmentStatus::Confirmed),
            2 => Some(AppointmentStatus::Completed),
            3 => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }

    pub fn code(self) -> i16 {
        match self {
            AppointmentStatus::Scheduled => 0,
            AppointmentStatus::Confirmed => 1,
            AppointmentStatus::Completed => 2,
            AppointmentStatus::Cancelled => 3,
        }
    }

    /// Active appointments occupy their timeslot. Postgres enforces this
    /// with `appointment_active_slot_uq`; the in-memory store asks here.
    #[cfg(test)]
    pub fn is_active(self) -> bool {
        matches!(self, AppointmentStatus::Scheduled | AppointmentStatus::Confirmed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "SCHEDULED",
            AppointmentStatus::Confirmed => "CONFIRMED",
            AppointmentStatus::Completed => "COMPLETED",
            AppointmentStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resolved caller, as handed over by the identity collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Option<Role>,
}

impl Actor {
    pub fn new(user_id: Uuid, role: Option<Role>) -> Self {
        Self { user_id, role }
    }
}

/* -------------------------
   Appointment
--------------------------*/

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Appointment {
    pub appointment_id: Uuid,
    pub pet_id: Uuid,
    pub service_id: Uuid,
    pub user_id: Uuid,
    pub date: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct AppointmentRow {
    pub appointment_id: Uuid,
    pub pet_id: Uuid,
    pub service_id: Uuid,
    pub user_id: Uuid,
    pub date: DateTime<Utc>,
    pub status: i16,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = CoreError;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        let status = AppointmentStatus::from_code(row.status).ok_or_else(|| {
            CoreError::Store(format!(
                "appointment {} has unknown status code {}",
                row.appointment_id, row.status
            ))
        })?;

        Ok(Appointment {
            appointment_id: row.appointment_id,
            pet_id: row.pet_id,
            service_id: row.service_id,
            user_id: row.user_id,
            date: row.date,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Fields of a booking; status always starts at SCHEDULED.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAppointment {
    pub pet_id: Uuid,
    pub service_id: Uuid,
    pub user_id: Uuid,
    pub date: DateTime<Utc>,
}

/* -------------------------
   Collaborator-owned records (read-only here)
--------------------------*/

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct PetRow {
    pub pet_id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub species: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct ServiceRow {
    pub service_id: Uuid,
    pub name: String,
    pub price_cents: i64,
    pub duration_min: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct ProductRow {
    pub product_id: Uuid,
    pub name: String,
    pub price_cents: i64,
    pub stock: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
}

/// Inclusive `[start, end]` instant range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start_date: DateTime<Utc>, end_date: DateTime<Utc>) -> Result<Self, CoreError> {
        if start_date > end_date {
            return Err(CoreError::Validation(
                "start_date must not be after end_date".into(),
            ));
        }
        Ok(Self { start_date, end_date })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start_date <= at && at <= self.end_date
    }
}

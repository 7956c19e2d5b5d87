// src/store/mod.rs
//
// Persistence boundary. The core only talks to these traits; `postgres`
// is the production adapter, `memory` backs the unit tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{
    Appointment, AppointmentStatus, DateRange, NewAppointment, PetRow, ProductRow, ServiceRow,
    UserProfile,
};
use crate::policy::Scope;

pub mod postgres;

#[cfg(test)]
pub mod memory;

/// Filter for report queries over the appointment table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeQuery {
    pub range: DateRange,
    pub service_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
}

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn find_by_id(&self, appointment_id: Uuid) -> Result<Option<Appointment>, CoreError>;

    /// Ordered by `date` ascending, ties by id.
    async fn find_by_scope(&self, scope: Scope) -> Result<Vec<Appointment>, CoreError>;

    /// An active (SCHEDULED/CONFIRMED) appointment holding exactly `date`.
    async fn find_conflicting(
        &self,
        date: DateTime<Utc>,
    ) -> Result<Option<Appointment>, CoreError>;

    /// Inserts a SCHEDULED appointment in one atomic step, or fails with
    /// `SlotTaken` when an active appointment already holds the instant.
    async fn create(&self, new: NewAppointment) -> Result<Appointment, CoreError>;

    /// Moves `current` to `status` only if its stored status is still
    /// `current.status`. `Ok(None)` means the row vanished or changed underneath.
    /// Reactivating into an occupied slot fails with `SlotTaken`.
    async fn update_status(
        &self,
        current: &Appointment,
        status: AppointmentStatus,
    ) -> Result<Option<Appointment>, CoreError>;

    /// `true` if a row was removed.
    async fn delete(&self, appointment_id: Uuid) -> Result<bool, CoreError>;

    /// Ordered by `date` ascending, ties by id.
    async fn find_in_range(&self, query: RangeQuery) -> Result<Vec<Appointment>, CoreError>;
}

/// Read-only lookups into collaborator-owned registries (pets, services,
/// products, user profiles).
#[async_trait]
pub trait Registry: Send + Sync {
    async fn find_owned_pet(
        &self,
        pet_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<PetRow>, CoreError>;

    async fn find_service(&self, service_id: Uuid) -> Result<Option<ServiceRow>, CoreError>;

    async fn pets_by_ids(&self, ids: &[Uuid]) -> Result<Vec<PetRow>, CoreError>;

    async fn services_by_ids(&self, ids: &[Uuid]) -> Result<Vec<ServiceRow>, CoreError>;

    async fn users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<UserProfile>, CoreError>;

    /// All products, or only those with `stock <= max_stock`.
    /// Ordered by stock ascending, then name.
    async fn list_products(&self, max_stock: Option<i32>) -> Result<Vec<ProductRow>, CoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub session_token_id: Uuid,
    pub user_id: Uuid,
    pub role_code: i16,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Live session of an active user for the given token hash.
    async fn resolve_session(&self, token_hash: &str)
        -> Result<Option<SessionIdentity>, CoreError>;
}

/// Deduplicated id list for batch lookups.
pub fn unique_ids(ids: impl IntoIterator<Item = Uuid>) -> Vec<Uuid> {
    let mut out: Vec<Uuid> = ids.into_iter().collect();
    out.sort_unstable();
    out.dedup();
    out
}

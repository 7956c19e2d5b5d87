// src/appointments.rs
//
// Scoped reads. A record outside the caller's scope is reported as absent,
// never as forbidden.

use uuid::Uuid;

use crate::error::{CoreError, Entity};
use crate::models::Actor;
use crate::policy;
use crate::projection::{project, project_one, AppointmentView};
use crate::store::{AppointmentStore, Registry};

pub async fn list_appointments(
    store: &dyn AppointmentStore,
    registry: &dyn Registry,
    actor: &Actor,
) -> Result<Vec<AppointmentView>, CoreError> {
    let scope = policy::scope_of(actor);
    let appointments = store.find_by_scope(scope).await?;
    project(registry, appointments, policy::projection_for(actor.role)).await
}

pub async fn get_appointment(
    store: &dyn AppointmentStore,
    registry: &dyn Registry,
    actor: &Actor,
    appointment_id: Uuid,
) -> Result<AppointmentView, CoreError> {
    let appointment = store
        .find_by_id(appointment_id)
        .await?
        .filter(|a| policy::scope_of(actor).permits(a))
        .ok_or(CoreError::NotFound(Entity::Appointment))?;

    project_one(registry, appointment, policy::projection_for(actor.role)).await
}

// src/lifecycle.rs
//
// Appointment status state machine.
//
//   SCHEDULED -> CONFIRMED -> COMPLETED
//   SCHEDULED | CONFIRMED -> CANCELLED
//
// COMPLETED and CANCELLED are terminal.

use serde::Deserialize;
use uuid::Uuid;

use crate::error::{CoreError, Entity};
use crate::models::{Actor, Appointment, AppointmentStatus};
use crate::notify::{IntentKind, NotificationIntent, NotificationSink};
use crate::policy::{self, Projection};
use crate::projection::{project_one, AppointmentView};
use crate::store::{AppointmentStore, Registry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRules {
    /// When false any target status is accepted (legacy behaviour).
    pub strict: bool,
}

impl Default for TransitionRules {
    fn default() -> Self {
        Self { strict: true }
    }
}

impl TransitionRules {
    pub fn permits(&self, from: AppointmentStatus, to: AppointmentStatus) -> bool {
        !self.strict || is_edge(from, to)
    }
}

pub fn is_edge(from: AppointmentStatus, to: AppointmentStatus) -> bool {
    use crate::models::AppointmentStatus::*;
    matches!(
        (from, to),
        (Scheduled, Confirmed) | (Scheduled, Cancelled) | (Confirmed, Completed) | (Confirmed, Cancelled)
    )
}

pub fn successors(from: AppointmentStatus) -> Vec<AppointmentStatus> {
    AppointmentStatus::ALL
        .into_iter()
        .filter(|to| is_edge(from, *to))
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusChange {
    pub status: AppointmentStatus,
}

pub async fn update_status(
    store: &dyn AppointmentStore,
    registry: &dyn Registry,
    notifier: &dyn NotificationSink,
    rules: TransitionRules,
    actor: &Actor,
    appointment_id: Uuid,
    change: StatusChange,
) -> Result<AppointmentView, CoreError> {
    policy::ensure(
        policy::can_change_status(actor.role),
        "change appointment status",
    )?;

    let current = store
        .find_by_id(appointment_id)
        .await?
        .ok_or(CoreError::NotFound(Entity::Appointment))?;

    let to = change.status;
    if !rules.permits(current.status, to) {
        tracing::warn!(
            appointment_id = %appointment_id,
            from = %current.status,
            to = %to,
            allowed = ?successors(current.status),
            "rejected status transition"
        );
        return Err(CoreError::InvalidTransition { from: current.status, to });
    }

    let updated = match store.update_status(&current, to).await? {
        Some(updated) => updated,
        None => return Err(lost_race(store, appointment_id, to).await),
    };

    tracing::info!(
        appointment_id = %appointment_id,
        actor_id = %actor.user_id,
        from = %current.status,
        to = %to,
        "appointment status changed"
    );

    // The write is committed; from here on nothing may turn it into an error.
    let view = match project_one(registry, updated.clone(), Projection::STAFF_VIEW).await {
        Ok(view) => view,
        Err(e) => {
            tracing::warn!(
                appointment_id = %appointment_id,
                error = %e,
                "status saved but related records could not be attached"
            );
            AppointmentView {
                appointment: updated,
                pet: None,
                service: None,
                user: None,
            }
        }
    };

    if let Some(kind) = IntentKind::for_status(to) {
        notifier.emit(intent_for(kind, &view));
    }
    Ok(view)
}

/// The row changed between read and write: report what it is now.
async fn lost_race(
    store: &dyn AppointmentStore,
    appointment_id: Uuid,
    to: AppointmentStatus,
) -> CoreError {
    match store.find_by_id(appointment_id).await {
        Ok(Some(now)) => CoreError::InvalidTransition { from: now.status, to },
        Ok(None) => CoreError::NotFound(Entity::Appointment),
        Err(e) => e,
    }
}

fn intent_for(kind: IntentKind, view: &AppointmentView) -> NotificationIntent {
    let a: &Appointment = &view.appointment;
    NotificationIntent {
        kind,
        user_id: a.user_id,
        appointment_id: a.appointment_id,
        date: a.date,
        service_name: view.service.as_ref().map(|s| s.name.clone()),
        pet_name: view.pet.as_ref().map(|p| p.name.clone()),
    }
}

/// Admin-only; deletes regardless of status.
pub async fn remove(
    store: &dyn AppointmentStore,
    actor: &Actor,
    appointment_id: Uuid,
) -> Result<(), CoreError> {
    policy::ensure(policy::can_delete(actor.role), "delete appointments")?;

    if !store.delete(appointment_id).await? {
        return Err(CoreError::NotFound(Entity::Appointment));
    }

    tracing::info!(appointment_id = %appointment_id, actor_id = %actor.user_id, "appointment deleted");
    Ok(())
}

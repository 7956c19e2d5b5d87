// src/booking.rs
//
// Booking and the timeslot conflict detector.
//
// Exclusivity is shop-wide: one active appointment per instant, whatever the
// service or pet. The pre-check gives a clean early rejection; the store's
// conditional insert is what actually holds the invariant under concurrency.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{CoreError, Entity};
use crate::models::{Actor, Appointment, NewAppointment};
use crate::policy;
use crate::store::{AppointmentStore, Registry};

#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    #[serde(alias = "petId")]
    pub pet_id: Uuid,
    #[serde(alias = "serviceId")]
    pub service_id: Uuid,
    pub date: DateTime<Utc>,
}

/// `true` when no active appointment holds exactly `date`.
pub async fn can_book(
    store: &dyn AppointmentStore,
    date: DateTime<Utc>,
) -> Result<bool, CoreError> {
    Ok(store.find_conflicting(date).await?.is_none())
}

pub async fn create_appointment(
    store: &dyn AppointmentStore,
    registry: &dyn Registry,
    actor: &Actor,
    req: BookingRequest,
) -> Result<Appointment, CoreError> {
    policy::ensure(policy::can_book(actor.role), "book appointments")?;

    // Unknown pet and someone else's pet look the same to the caller.
    registry
        .find_owned_pet(req.pet_id, actor.user_id)
        .await?
        .ok_or(CoreError::NotFound(Entity::Pet))?;

    registry
        .find_service(req.service_id)
        .await?
        .ok_or(CoreError::NotFound(Entity::Service))?;

    if !can_book(store, req.date).await? {
        tracing::warn!(date = %req.date, user_id = %actor.user_id, "timeslot already taken");
        return Err(CoreError::SlotTaken(req.date));
    }

    let appointment = store
        .create(NewAppointment {
            pet_id: req.pet_id,
            service_id: req.service_id,
            user_id: actor.user_id,
            date: req.date,
        })
        .await
        .inspect_err(|e| {
            if matches!(e, CoreError::SlotTaken(_)) {
                tracing::warn!(date = %req.date, "timeslot taken by a concurrent booking");
            }
        })?;

    tracing::info!(
        appointment_id = %appointment.appointment_id,
        user_id = %actor.user_id,
        date = %appointment.date,
        "appointment booked"
    );
    Ok(appointment)
}

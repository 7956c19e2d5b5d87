// src/projection.rs
//
// Attaches related records to appointments according to a `Projection`.
// Lookups are batched: one registry call per related table, not per row.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{Appointment, PetRow, ServiceRow, UserProfile};
use crate::policy::Projection;
use crate::store::{unique_ids, Registry};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppointmentView {
    #[serde(flatten)]
    pub appointment: Appointment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pet: Option<PetRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}

pub async fn project(
    registry: &dyn Registry,
    appointments: Vec<Appointment>,
    projection: Projection,
) -> Result<Vec<AppointmentView>, CoreError> {
    if appointments.is_empty() {
        return Ok(vec![]);
    }

    let mut pets: HashMap<Uuid, PetRow> = HashMap::new();
    if projection.pet {
        let ids = unique_ids(appointments.iter().map(|a| a.pet_id));
        pets = registry
            .pets_by_ids(&ids)
            .await?
            .into_iter()
            .map(|p| (p.pet_id, p))
            .collect();
    }

    let mut services: HashMap<Uuid, ServiceRow> = HashMap::new();
    if projection.service {
        let ids = unique_ids(appointments.iter().map(|a| a.service_id));
        services = registry
            .services_by_ids(&ids)
            .await?
            .into_iter()
            .map(|s| (s.service_id, s))
            .collect();
    }

    let mut users: HashMap<Uuid, UserProfile> = HashMap::new();
    if projection.owner {
        let ids = unique_ids(appointments.iter().map(|a| a.user_id));
        users = registry
            .users_by_ids(&ids)
            .await?
            .into_iter()
            .map(|u| (u.user_id, u))
            .collect();
    }

    Ok(appointments
        .into_iter()
        .map(|appointment| AppointmentView {
            pet: pets.get(&appointment.pet_id).cloned(),
            service: services.get(&appointment.service_id).cloned(),
            user: users.get(&appointment.user_id).cloned(),
            appointment,
        })
        .collect())
}

pub async fn project_one(
    registry: &dyn Registry,
    appointment: Appointment,
    projection: Projection,
) -> Result<AppointmentView, CoreError> {
    let mut views = project(registry, vec![appointment.clone()], projection).await?;
    Ok(views.pop().unwrap_or(AppointmentView {
        appointment,
        pet: None,
        service: None,
        user: None,
    }))
}

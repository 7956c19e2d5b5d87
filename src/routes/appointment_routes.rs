// src/routes/appointment_routes.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    appointments,
    booking::{self, BookingRequest},
    error::ApiError,
    lifecycle::{self, StatusChange},
    middleware::auth_context::AuthContext,
    models::{ApiOk, AppState, Appointment, OkData},
    projection::AppointmentView,
};

/* ============================================================
   POST /appointments
   ============================================================ */

pub async fn create_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<BookingRequest>,
) -> Result<(StatusCode, Json<ApiOk<Appointment>>), ApiError> {
    let created = booking::create_appointment(
        state.appointments.as_ref(),
        state.registry.as_ref(),
        &auth.actor(),
        req,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(ApiOk { data: created })))
}

/* ============================================================
   GET /appointments
   ============================================================ */

pub async fn list_appointments(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiOk<Vec<AppointmentView>>>, ApiError> {
    let list = appointments::list_appointments(
        state.appointments.as_ref(),
        state.registry.as_ref(),
        &auth.actor(),
    )
    .await?;

    Ok(Json(ApiOk { data: list }))
}

/* ============================================================
   GET /appointments/{id}
   ============================================================ */

pub async fn get_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<ApiOk<AppointmentView>>, ApiError> {
    let view = appointments::get_appointment(
        state.appointments.as_ref(),
        state.registry.as_ref(),
        &auth.actor(),
        appointment_id,
    )
    .await?;

    Ok(Json(ApiOk { data: view }))
}

/* ============================================================
   PATCH /appointments/{id}
   ============================================================ */

pub async fn patch_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
    Json(req): Json<StatusChange>,
) -> Result<Json<ApiOk<AppointmentView>>, ApiError> {
    let view = lifecycle::update_status(
        state.appointments.as_ref(),
        state.registry.as_ref(),
        state.notifier.as_ref(),
        state.rules,
        &auth.actor(),
        appointment_id,
        req,
    )
    .await?;

    Ok(Json(ApiOk { data: view }))
}

/* ============================================================
   DELETE /appointments/{id}
   ============================================================ */

pub async fn delete_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<ApiOk<OkData>>, ApiError> {
    lifecycle::remove(state.appointments.as_ref(), &auth.actor(), appointment_id).await?;

    Ok(Json(ApiOk { data: OkData { ok: true } }))
}

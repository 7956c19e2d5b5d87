// src/routes/report_routes.rs

use axum::{extract::State, Json};

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{ApiOk, AppState},
    reports::{self, ReportRequest, ReportResult},
};

/* ============================================================
   POST /reports/generate
   ============================================================ */

pub async fn generate_report(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<ReportRequest>,
) -> Result<Json<ApiOk<ReportResult>>, ApiError> {
    let report = reports::generate_report(
        state.appointments.as_ref(),
        state.registry.as_ref(),
        state.low_stock_threshold,
        &auth.actor(),
        req,
    )
    .await?;

    Ok(Json(ApiOk { data: report }))
}

use std::sync::Arc;

use axum::{
    http::Method,
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post, MethodRouter},
    Json, Router,
};

use crate::middleware::route_gate::{route_gate, Gate, RouteAccess};
use crate::models::{ApiOk, AppState, OkData, Role};

pub mod appointment_routes;
pub mod report_routes;

pub const APPOINTMENTS: &str = "/api/v1/appointments";
pub const APPOINTMENT: &str = "/api/v1/appointments/{appointment_id}";
pub const REPORTS_GENERATE: &str = "/api/v1/reports/generate";

const CLIENT: &[Role] = &[Role::Client];
const ANY_ROLE: &[Role] = &[Role::Client, Role::Employee, Role::Admin];
const STAFF: &[Role] = &[Role::Employee, Role::Admin];
const ADMIN: &[Role] = &[Role::Admin];

pub struct RouteEntry {
    pub access: RouteAccess,
    pub handler: MethodRouter<AppState>,
}

fn entry(method: Method, path: &'static str, roles: &'static [Role], handler: MethodRouter<AppState>) -> RouteEntry {
    RouteEntry {
        access: RouteAccess { method, path, roles },
        handler,
    }
}

/// Every protected endpoint: (method, path) -> (roles, handler).
pub fn route_table() -> Vec<RouteEntry> {
    use appointment_routes as appt;

    vec![
        entry(Method::POST, APPOINTMENTS, CLIENT, post(appt::create_appointment)),
        entry(Method::GET, APPOINTMENTS, ANY_ROLE, get(appt::list_appointments)),
        entry(Method::GET, APPOINTMENT, ANY_ROLE, get(appt::get_appointment)),
        entry(Method::PATCH, APPOINTMENT, STAFF, patch(appt::patch_appointment)),
        entry(Method::DELETE, APPOINTMENT, ADMIN, delete(appt::delete_appointment)),
        entry(Method::POST, REPORTS_GENERATE, STAFF, post(report_routes::generate_report)),
    ]
}

pub fn router(state: AppState) -> Router {
    let table = route_table();
    let access: Vec<RouteAccess> = table.iter().map(|e| e.access.clone()).collect();

    let mut protected = Router::new();
    for e in table {
        protected = protected.route(e.access.path, e.handler);
    }
    let gate = Gate {
        state: state.clone(),
        table: Arc::new(access),
    };
    let protected = protected.route_layer(from_fn_with_state(gate, route_gate));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .with_state(state)
}

async fn health() -> Json<ApiOk<OkData>> {
    Json(ApiOk { data: OkData { ok: true } })
}

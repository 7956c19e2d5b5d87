// src/middleware/route_gate.rs
//
// Single authorization gate in front of every protected route. Access is
// decided from the route table, not from per-handler checks.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, MatchedPath, Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::middleware::auth_context::AuthContext;
use crate::models::{AppState, Role};
use crate::policy;

/// One row of the route table: who may call `method path`.
#[derive(Debug, Clone)]
pub struct RouteAccess {
    pub method: Method,
    pub path: &'static str,
    pub roles: &'static [Role],
}

#[derive(Clone)]
pub struct Gate {
    pub state: AppState,
    pub table: Arc<Vec<RouteAccess>>,
}

impl Gate {
    /// Missing entries yield `None`, which the gate treats as "nobody".
    fn roles_for(&self, method: &Method, path: &str) -> Option<&'static [Role]> {
        self.table
            .iter()
            .find(|r| r.method == *method && r.path == path)
            .map(|r| r.roles)
    }
}

pub async fn route_gate(
    State(gate): State<Gate>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (mut parts, body) = req.into_parts();

    let auth = AuthContext::from_request_parts(&mut parts, &gate.state).await?;

    let matched = parts
        .extensions
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned());
    let allowed = matched
        .as_deref()
        .and_then(|path| gate.roles_for(&parts.method, path));

    match allowed {
        Some(roles) if policy::role_allowed(auth.role, roles) => {}
        _ => {
            tracing::warn!(
                method = %parts.method,
                path = matched.as_deref().unwrap_or("<unmatched>"),
                user_id = %auth.user_id,
                session_token_id = %auth.session_token_id,
                role = ?auth.role,
                "route gate rejected request"
            );
            return Err(ApiError::Forbidden(
                "FORBIDDEN",
                "Your role may not call this endpoint".into(),
            ));
        }
    }

    Ok(next.run(Request::from_parts(parts, body)).await)
}

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use uuid::Uuid;

use crate::auth::hash_access_token;
use crate::error::ApiError;
use crate::models::{Actor, AppState, Role};

#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    /// `None` when the stored role code is not one we know.
    pub role: Option<Role>,
    pub session_token_id: Uuid,
}

impl AuthContext {
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.role)
    }
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            // Already resolved by the route gate
            if let Some(ctx) = parts.extensions.get::<AuthContext>() {
                return Ok(ctx.clone());
            }

            // Extract Authorization: Bearer <token>
            let TypedHeader(authz): TypedHeader<Authorization<Bearer>> =
                TypedHeader::from_request_parts(parts, state)
                    .await
                    .map_err(|_| ApiError::session_expired())?;

            let token_hash = hash_access_token(authz.token());

            let session = state
                .sessions
                .resolve_session(&token_hash)
                .await?
                .ok_or_else(ApiError::session_expired)?;

            let role = Role::from_code(session.role_code);
            if role.is_none() {
                tracing::warn!(
                    user_id = %session.user_id,
                    role_code = session.role_code,
                    "session carries an unrecognized role"
                );
            }

            let ctx = AuthContext {
                user_id: session.user_id,
                role,
                session_token_id: session.session_token_id,
            };
            parts.extensions.insert(ctx.clone());
            Ok(ctx)
        }
    }
}

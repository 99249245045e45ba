//! Admin authentication middleware

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use super::jwt::JwtError;
use crate::{error::ApiError, state::AppState};

/// Operator identity attached to authenticated requests
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub user_id: String,
    pub email: Option<String>,
}

/// Require a valid Supabase session whose email is on the admin list
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .ok_or(ApiError::Unauthorized)?;

    let claims = state.jwt.validate(token).map_err(|e| {
        match &e {
            JwtError::Validation(detail) => {
                tracing::warn!(error = %detail, "Rejected malformed session token")
            }
            other => tracing::debug!(error = %other, "Rejected session token"),
        }
        ApiError::InvalidToken
    })?;

    if !state.config.is_admin_email(claims.email.as_deref()) {
        tracing::warn!(user_id = %claims.sub, "Non-admin user denied dashboard access");
        return Err(ApiError::Forbidden);
    }

    request.extensions_mut().insert(AdminUser {
        user_id: claims.sub,
        email: claims.email,
    });

    Ok(next.run(request).await)
}

fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

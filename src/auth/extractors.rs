use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::{
    auth::cookie::token_from_headers, config::SubjectCheck, error::AppError, state::AppState,
};

/// Authenticated user id taken from the identity cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub i64);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Already validated by `require_auth`.
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(*user);
        }

        let token = token_from_headers(&parts.headers, &state.config.cookie.name).ok_or_else(|| {
            debug!("missing identity cookie");
            AppError::Unauthorized
        })?;

        let claims = state.keys.verify(&token).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            AppError::Unauthorized
        })?;

        if state.config.subject_check == SubjectCheck::Lookup
            && state.users.find_by_id(claims.sub).await?.is_none()
        {
            warn!(user_id = claims.sub, "token subject no longer exists");
            return Err(AppError::Unauthorized);
        }

        Ok(AuthUser(claims.sub))
    }
}

/// Rejects the request unless it carries a valid identity cookie; attaches [`AuthUser`] to it.
pub async fn require_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = request.into_parts();
    let user = AuthUser::from_request_parts(&mut parts, &state).await?;
    parts.extensions.insert(user);
    Ok(next.run(Request::from_parts(parts, body)).await)
}

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        cookie::{removal_cookie, session_cookie},
        dto::{
            IdentityResponse, LoginRequest, LoginResponse, MessageResponse, PublicUser,
            RegisterRequest, UserListItem,
        },
        extractors::AuthUser,
        services,
    },
    error::AppError,
    state::AppState,
};

/// Routes reachable without a session.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/login/logout", post(logout))
}

/// Routes that sit behind `require_auth`.
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/login/validate", get(validate))
        .route("/users", get(list_users))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PublicUser>), AppError> {
    let Json(payload) = payload?;
    let user = services::register_user(state.users.as_ref(), payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let user = services::authenticate(state.users.as_ref(), payload).await?;

    let token = state.keys.sign(user.id).map_err(|e| AppError::Internal(e.context("sign jwt")))?;
    let cookie = session_cookie(&state.config.cookie, token, state.keys.ttl).map_err(AppError::Internal)?;

    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(LoginResponse {
            message: "Login successful",
            user: PublicUser::from(&user),
        }),
    ))
}

#[instrument(skip_all)]
pub async fn validate(AuthUser(user_id): AuthUser) -> Json<IdentityResponse> {
    Json(IdentityResponse { user_id })
}

/// Clears the client cookie only; an already issued token stays valid until it expires.
#[instrument(skip(state))]
pub async fn logout(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let cookie = removal_cookie(&state.config.cookie).map_err(AppError::Internal)?;
    info!("identity cookie cleared");
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(MessageResponse {
            message: "Logged out",
        }),
    ))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
) -> Result<Json<Vec<UserListItem>>, AppError> {
    let users = state.users.list().await?;
    Ok(Json(users.into_iter().map(UserListItem::from).collect()))
}

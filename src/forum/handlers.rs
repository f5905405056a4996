use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::AuthUser,
    error::AppError,
    forum::{
        dto::{
            CreatePostRequest, CreateSubThemeRequest, CreateThemeRequest, CreateTopicRequest,
            PostCreated, SubThemeCreated, ThemeCreated, TopicCreated,
        },
        repo_types::{Post, SubTheme, Theme, TopicSummary},
        services,
    },
    state::AppState,
};

// --- routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/themes", get(list_themes))
        .route("/themes/:id/subthemes", get(list_sub_themes))
        .route("/themes/subthemes/:id/topics", get(list_topics))
        .route("/themes/subthemes/topics/:id/posts", get(list_posts))
}

/// Routes that sit behind `require_auth`.
pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/themes/create", post(create_theme))
        .route("/themes/subthemes", post(create_sub_theme))
        .route("/themes/subthemes/topics", post(create_topic))
        .route("/themes/subthemes/topics/posts", post(create_post))
}

// --- handlers ---

#[instrument(skip(state))]
pub async fn list_themes(State(state): State<AppState>) -> Result<Json<Vec<Theme>>, AppError> {
    Ok(Json(state.forum.list_themes().await?))
}

#[instrument(skip(state, payload))]
pub async fn create_theme(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    payload: Result<Json<CreateThemeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ThemeCreated>), AppError> {
    let Json(payload) = payload?;
    let theme = services::create_theme(state.forum.as_ref(), payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ThemeCreated {
            message: "Theme created",
            theme,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn list_sub_themes(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<SubTheme>>, AppError> {
    let Path(theme_id) = id?;
    Ok(Json(state.forum.list_sub_themes(theme_id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_sub_theme(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    payload: Result<Json<CreateSubThemeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubThemeCreated>), AppError> {
    let Json(payload) = payload?;
    let sub_theme = services::create_sub_theme(state.forum.as_ref(), payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(SubThemeCreated {
            message: "Sub-theme created",
            sub_theme,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn list_topics(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<TopicSummary>>, AppError> {
    let Path(sub_theme_id) = id?;
    Ok(Json(state.forum.list_topics(sub_theme_id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_topic(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<CreateTopicRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TopicCreated>), AppError> {
    let Json(payload) = payload?;
    let topic = services::create_topic(state.forum.as_ref(), user_id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(TopicCreated {
            message: "Topic created",
            topic,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn list_posts(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<Post>>, AppError> {
    let Path(topic_id) = id?;
    Ok(Json(state.forum.list_posts(topic_id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_post(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<CreatePostRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PostCreated>), AppError> {
    let Json(payload) = payload?;
    let post = services::create_post(state.forum.as_ref(), user_id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(PostCreated {
            message: "Post created",
            post,
        }),
    ))
}

use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Theme {
    pub id: i64,
    pub title: String,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SubTheme {
    pub id: i64,
    pub title: String,
    pub status: String,
    pub parent_id: i64, // owning theme
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Topic {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub author_id: i64,
    pub sub_theme_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Topic as listed under its sub-theme.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TopicSummary {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub topic: Topic,
    pub post_count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Post {
    pub id: i64,
    pub content: String,
    pub author_id: i64,
    pub topic_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewTheme {
    pub title: String,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct NewSubTheme {
    pub title: String,
    pub status: String,
    pub parent_id: i64,
}

#[derive(Debug, Clone)]
pub struct NewTopic {
    pub title: String,
    pub content: String,
    pub author_id: i64,
    pub sub_theme_id: i64,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub content: String,
    pub author_id: i64,
    pub topic_id: i64,
}

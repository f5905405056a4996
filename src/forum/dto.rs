use serde::{Deserialize, Serialize};

use crate::forum::repo_types::{Post, SubTheme, Theme, Topic};

#[derive(Debug, Deserialize)]
pub struct CreateThemeRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateSubThemeRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub parent_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateTopicRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String, // optional body
    #[serde(default)]
    pub sub_theme_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub topic_id: i64,
}

#[derive(Debug, Serialize)]
pub struct ThemeCreated {
    pub message: &'static str,
    pub theme: Theme,
}

#[derive(Debug, Serialize)]
pub struct SubThemeCreated {
    pub message: &'static str,
    pub sub_theme: SubTheme,
}

#[derive(Debug, Serialize)]
pub struct TopicCreated {
    pub message: &'static str,
    pub topic: Topic,
}

#[derive(Debug, Serialize)]
pub struct PostCreated {
    pub message: &'static str,
    pub post: Post,
}

use tracing::info;

use crate::error::AppError;
use crate::forum::{
    dto::{CreatePostRequest, CreateSubThemeRequest, CreateThemeRequest, CreateTopicRequest},
    repo::ForumRepo,
    repo_types::{NewPost, NewSubTheme, NewTheme, NewTopic, Post, SubTheme, Theme, Topic},
};

pub const MAX_TITLE_LEN: usize = 200;

fn required(value: &str, field: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn title(value: &str) -> Result<String, AppError> {
    let title = required(value, "title")?;
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::Validation(format!(
            "title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(title)
}

fn reference(id: i64, field: &str) -> Result<i64, AppError> {
    if id <= 0 {
        return Err(AppError::Validation(format!("{field} must be a positive id")));
    }
    Ok(id)
}

pub async fn create_theme(forum: &dyn ForumRepo, req: CreateThemeRequest) -> Result<Theme, AppError> {
    let theme = forum
        .create_theme(NewTheme {
            title: title(&req.title)?,
            status: required(&req.status, "status")?,
        })
        .await?;
    info!(theme_id = theme.id, "theme created");
    Ok(theme)
}

pub async fn create_sub_theme(
    forum: &dyn ForumRepo,
    req: CreateSubThemeRequest,
) -> Result<SubTheme, AppError> {
    let sub_theme = forum
        .create_sub_theme(NewSubTheme {
            title: title(&req.title)?,
            status: required(&req.status, "status")?,
            parent_id: reference(req.parent_id, "parent_id")?,
        })
        .await?;
    info!(sub_theme_id = sub_theme.id, parent_id = sub_theme.parent_id, "sub-theme created");
    Ok(sub_theme)
}

pub async fn create_topic(
    forum: &dyn ForumRepo,
    author_id: i64,
    req: CreateTopicRequest,
) -> Result<Topic, AppError> {
    let topic = forum
        .create_topic(NewTopic {
            title: title(&req.title)?,
            content: req.content.trim().to_string(),
            author_id,
            sub_theme_id: reference(req.sub_theme_id, "sub_theme_id")?,
        })
        .await?;
    info!(topic_id = topic.id, author_id, "topic created");
    Ok(topic)
}

pub async fn create_post(
    forum: &dyn ForumRepo,
    author_id: i64,
    req: CreatePostRequest,
) -> Result<Post, AppError> {
    let post = forum
        .create_post(NewPost {
            content: required(&req.content, "content")?,
            author_id,
            topic_id: reference(req.topic_id, "topic_id")?,
        })
        .await?;
    info!(post_id = post.id, topic_id = post.topic_id, author_id, "post created");
    Ok(post)
}

use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::{backend, map_write_error, RepoError};
use crate::forum::repo_types::{
    NewPost, NewSubTheme, NewTheme, NewTopic, Post, SubTheme, Theme, Topic, TopicSummary,
};

pub(crate) const THEME_CONFLICT: &str = "A theme with this title already exists";
pub(crate) const MISSING_THEME: &str = "Parent theme not found";
pub(crate) const MISSING_SUB_THEME: &str = "Sub-theme not found";
pub(crate) const MISSING_TOPIC: &str = "Topic not found";
pub(crate) const MISSING_AUTHOR: &str = "Author not found";

/// Persistence seam for the theme → sub-theme → topic → post hierarchy.
///
/// Creating a child whose parent does not exist yields [`RepoError::MissingParent`].
#[async_trait]
pub trait ForumRepo: Send + Sync {
    async fn create_theme(&self, theme: NewTheme) -> Result<Theme, RepoError>;
    async fn list_themes(&self) -> Result<Vec<Theme>, RepoError>;

    async fn create_sub_theme(&self, sub_theme: NewSubTheme) -> Result<SubTheme, RepoError>;
    async fn list_sub_themes(&self, parent_id: i64) -> Result<Vec<SubTheme>, RepoError>;

    async fn create_topic(&self, topic: NewTopic) -> Result<Topic, RepoError>;
    /// Newest first, each with its post count.
    async fn list_topics(&self, sub_theme_id: i64) -> Result<Vec<TopicSummary>, RepoError>;

    async fn create_post(&self, post: NewPost) -> Result<Post, RepoError>;
    /// Oldest first.
    async fn list_posts(&self, topic_id: i64) -> Result<Vec<Post>, RepoError>;
}

#[derive(Clone)]
pub struct PgForumRepo {
    db: PgPool,
}

impl PgForumRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ForumRepo for PgForumRepo {
    async fn create_theme(&self, theme: NewTheme) -> Result<Theme, RepoError> {
        sqlx::query_as::<_, Theme>(
            r#"
            INSERT INTO themes (title, status)
            VALUES ($1, $2)
            RETURNING id, title, status, created_at
            "#,
        )
        .bind(&theme.title)
        .bind(&theme.status)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_write_error(e, THEME_CONFLICT, &[], "insert theme"))
    }

    async fn list_themes(&self) -> Result<Vec<Theme>, RepoError> {
        sqlx::query_as::<_, Theme>(
            r#"
            SELECT id, title, status, created_at
            FROM themes
            ORDER BY id
            "#,
        )
        .fetch_all(&self.db)
        .await
        .map_err(|e| backend(e, "list themes"))
    }

    async fn create_sub_theme(&self, sub_theme: NewSubTheme) -> Result<SubTheme, RepoError> {
        sqlx::query_as::<_, SubTheme>(
            r#"
            INSERT INTO sub_themes (title, status, parent_id)
            VALUES ($1, $2, $3)
            RETURNING id, title, status, parent_id, created_at
            "#,
        )
        .bind(&sub_theme.title)
        .bind(&sub_theme.status)
        .bind(sub_theme.parent_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            map_write_error(e, "", &[("parent_id", MISSING_THEME)], "insert sub-theme")
        })
    }

    async fn list_sub_themes(&self, parent_id: i64) -> Result<Vec<SubTheme>, RepoError> {
        sqlx::query_as::<_, SubTheme>(
            r#"
            SELECT id, title, status, parent_id, created_at
            FROM sub_themes
            WHERE parent_id = $1
            ORDER BY id
            "#,
        )
        .bind(parent_id)
        .fetch_all(&self.db)
        .await
        .map_err(|e| backend(e, "list sub-themes"))
    }

    async fn create_topic(&self, topic: NewTopic) -> Result<Topic, RepoError> {
        sqlx::query_as::<_, Topic>(
            r#"
            INSERT INTO topics (title, content, author_id, sub_theme_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, title, content, author_id, sub_theme_id, created_at, updated_at
            "#,
        )
        .bind(&topic.title)
        .bind(&topic.content)
        .bind(topic.author_id)
        .bind(topic.sub_theme_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            map_write_error(
                e,
                "",
                &[("sub_theme_id", MISSING_SUB_THEME), ("author_id", MISSING_AUTHOR)],
                "insert topic",
            )
        })
    }

    async fn list_topics(&self, sub_theme_id: i64) -> Result<Vec<TopicSummary>, RepoError> {
        sqlx::query_as::<_, TopicSummary>(
            r#"
            SELECT t.id, t.title, t.content, t.author_id, t.sub_theme_id,
                   t.created_at, t.updated_at, COUNT(p.id) AS post_count
            FROM topics t
            LEFT JOIN posts p ON p.topic_id = t.id
            WHERE t.sub_theme_id = $1
            GROUP BY t.id
            ORDER BY t.created_at DESC, t.id DESC
            "#,
        )
        .bind(sub_theme_id)
        .fetch_all(&self.db)
        .await
        .map_err(|e| backend(e, "list topics"))
    }

    async fn create_post(&self, post: NewPost) -> Result<Post, RepoError> {
        sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (content, author_id, topic_id)
            VALUES ($1, $2, $3)
            RETURNING id, content, author_id, topic_id, created_at, updated_at
            "#,
        )
        .bind(&post.content)
        .bind(post.author_id)
        .bind(post.topic_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            map_write_error(
                e,
                "",
                &[("topic_id", MISSING_TOPIC), ("author_id", MISSING_AUTHOR)],
                "insert post",
            )
        })
    }

    async fn list_posts(&self, topic_id: i64) -> Result<Vec<Post>, RepoError> {
        sqlx::query_as::<_, Post>(
            r#"
            SELECT id, content, author_id, topic_id, created_at, updated_at
            FROM posts
            WHERE topic_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(topic_id)
        .fetch_all(&self.db)
        .await
        .map_err(|e| backend(e, "list posts"))
    }
}

//! In-process store implementing every repository trait.
//!
//! Used when no database is configured and by the test-suite. It enforces the same
//! uniqueness and parent-reference rules as the Postgres schema.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::auth::repo::{UserRepo, USER_CONFLICT};
use crate::auth::repo_types::{NewUser, User};
use crate::db::RepoError;
use crate::forum::repo::{
    ForumRepo, MISSING_AUTHOR, MISSING_SUB_THEME, MISSING_THEME, MISSING_TOPIC, THEME_CONFLICT,
};
use crate::forum::repo_types::{
    NewPost, NewSubTheme, NewTheme, NewTopic, Post, SubTheme, Theme, Topic, TopicSummary,
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    themes: Vec<Theme>,
    sub_themes: Vec<SubTheme>,
    topics: Vec<Topic>,
    posts: Vec<Post>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepoError> {
        self.tables
            .lock()
            .map_err(|_| RepoError::Backend(anyhow::anyhow!("memory store lock poisoned")))
    }
}

/// Rows are never deleted, so the next id is one past the row count.
fn next_id(len: usize) -> i64 {
    len as i64 + 1
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepoError> {
        Ok(self.lock()?.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        Ok(self
            .lock()?
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, RepoError> {
        Ok(self
            .lock()?
            .users
            .iter()
            .find(|u| u.username == username || u.email == email)
            .cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, RepoError> {
        let mut tables = self.lock()?;
        if tables
            .users
            .iter()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(RepoError::Conflict(USER_CONFLICT.into()));
        }
        let row = User {
            id: next_id(tables.users.len()),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.users.push(row.clone());
        Ok(row)
    }

    async fn list(&self) -> Result<Vec<User>, RepoError> {
        Ok(self.lock()?.users.clone())
    }
}

#[async_trait]
impl ForumRepo for MemoryStore {
    async fn create_theme(&self, theme: NewTheme) -> Result<Theme, RepoError> {
        let mut tables = self.lock()?;
        if tables.themes.iter().any(|t| t.title == theme.title) {
            return Err(RepoError::Conflict(THEME_CONFLICT.into()));
        }
        let row = Theme {
            id: next_id(tables.themes.len()),
            title: theme.title,
            status: theme.status,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.themes.push(row.clone());
        Ok(row)
    }

    async fn list_themes(&self) -> Result<Vec<Theme>, RepoError> {
        Ok(self.lock()?.themes.clone())
    }

    async fn create_sub_theme(&self, sub_theme: NewSubTheme) -> Result<SubTheme, RepoError> {
        let mut tables = self.lock()?;
        if !tables.themes.iter().any(|t| t.id == sub_theme.parent_id) {
            return Err(RepoError::MissingParent(MISSING_THEME.into()));
        }
        let row = SubTheme {
            id: next_id(tables.sub_themes.len()),
            title: sub_theme.title,
            status: sub_theme.status,
            parent_id: sub_theme.parent_id,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.sub_themes.push(row.clone());
        Ok(row)
    }

    async fn list_sub_themes(&self, parent_id: i64) -> Result<Vec<SubTheme>, RepoError> {
        Ok(self
            .lock()?
            .sub_themes
            .iter()
            .filter(|s| s.parent_id == parent_id)
            .cloned()
            .collect())
    }

    async fn create_topic(&self, topic: NewTopic) -> Result<Topic, RepoError> {
        let mut tables = self.lock()?;
        if !tables.sub_themes.iter().any(|s| s.id == topic.sub_theme_id) {
            return Err(RepoError::MissingParent(MISSING_SUB_THEME.into()));
        }
        if !tables.users.iter().any(|u| u.id == topic.author_id) {
            return Err(RepoError::MissingParent(MISSING_AUTHOR.into()));
        }
        let now = OffsetDateTime::now_utc();
        let row = Topic {
            id: next_id(tables.topics.len()),
            title: topic.title,
            content: topic.content,
            author_id: topic.author_id,
            sub_theme_id: topic.sub_theme_id,
            created_at: now,
            updated_at: now,
        };
        tables.topics.push(row.clone());
        Ok(row)
    }

    async fn list_topics(&self, sub_theme_id: i64) -> Result<Vec<TopicSummary>, RepoError> {
        let tables = self.lock()?;
        let mut topics: Vec<TopicSummary> = tables
            .topics
            .iter()
            .filter(|t| t.sub_theme_id == sub_theme_id)
            .map(|t| TopicSummary {
                topic: t.clone(),
                post_count: tables.posts.iter().filter(|p| p.topic_id == t.id).count() as i64,
            })
            .collect();
        topics.sort_by(|a, b| {
            (b.topic.created_at, b.topic.id).cmp(&(a.topic.created_at, a.topic.id))
        });
        Ok(topics)
    }

    async fn create_post(&self, post: NewPost) -> Result<Post, RepoError> {
        let mut tables = self.lock()?;
        if !tables.topics.iter().any(|t| t.id == post.topic_id) {
            return Err(RepoError::MissingParent(MISSING_TOPIC.into()));
        }
        if !tables.users.iter().any(|u| u.id == post.author_id) {
            return Err(RepoError::MissingParent(MISSING_AUTHOR.into()));
        }
        let now = OffsetDateTime::now_utc();
        let row = Post {
            id: next_id(tables.posts.len()),
            content: post.content,
            author_id: post.author_id,
            topic_id: post.topic_id,
            created_at: now,
            updated_at: now,
        };
        tables.posts.push(row.clone());
        Ok(row)
    }

    async fn list_posts(&self, topic_id: i64) -> Result<Vec<Post>, RepoError> {
        let mut posts: Vec<Post> = self
            .lock()?
            .posts
            .iter()
            .filter(|p| p.topic_id == topic_id)
            .cloned()
            .collect();
        posts.sort_by_key(|p| (p.created_at, p.id));
        Ok(posts)
    }
}

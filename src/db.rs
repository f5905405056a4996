use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

/// Failure modes of the persistence layer that callers need to tell apart.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// A uniqueness constraint rejected the write.
    #[error("{0}")]
    Conflict(String),

    /// The referenced parent row does not exist.
    #[error("{0}")]
    MissingParent(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .context("connect to database")
}

pub async fn migrate(db: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")
}

/// Maps constraint violations onto [`RepoError`], everything else is a backend failure.
///
/// `parents` pairs a foreign-key column with the message used when that reference is
/// dangling; the first entry is the fallback when the constraint name is unknown.
pub(crate) fn map_write_error(
    err: sqlx::Error,
    conflict: &str,
    parents: &[(&str, &str)],
    context: &'static str,
) -> RepoError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return RepoError::Conflict(conflict.to_string());
        }
        if db_err.is_foreign_key_violation() {
            let constraint = db_err.constraint().unwrap_or_default();
            let message = parents
                .iter()
                .find(|(column, _)| constraint.contains(column))
                .or_else(|| parents.first())
                .map(|(_, message)| message.to_string())
                .unwrap_or_else(|| "Referenced record not found".to_string());
            return RepoError::MissingParent(message);
        }
    }
    RepoError::Backend(anyhow::Error::new(err).context(context))
}

pub(crate) fn backend(err: sqlx::Error, context: &'static str) -> RepoError {
    RepoError::Backend(anyhow::Error::new(err).context(context))
}

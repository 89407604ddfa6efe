use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::{str::FromStr, time::Duration};

use crate::config::VoteConfig;

/// Builds the pool. One connection is always kept open: an in-memory SQLite
/// database lives only as long as its connection.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    if max_connections == 0 {
        return Err(sqlx::Error::Configuration(
            "max_connections must be at least 1".into(),
        ));
    }

    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect_with(options)
        .await
}

/// Creates the vote table and its indexes using the configured names.
pub async fn install_schema(pool: &SqlitePool, config: &VoteConfig) -> Result<(), sqlx::Error> {
    let table = config.vote_table();
    let fk = config.user_foreign_key();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id BLOB PRIMARY KEY NOT NULL,
            voter_type TEXT NOT NULL,
            {fk} BLOB NOT NULL,
            voteable_type TEXT NOT NULL,
            voteable_id BLOB NOT NULL,
            upvote BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#
    ))
    .execute(pool)
    .await?;

    // One vote per (voter, subject) pair.
    sqlx::query(&format!(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS {table}_voter_voteable_unique
        ON {table} (voter_type, {fk}, voteable_type, voteable_id);
        "#
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        r#"
        CREATE INDEX IF NOT EXISTS {table}_voteable_index
        ON {table} (voteable_type, voteable_id);
        "#
    ))
    .execute(pool)
    .await?;

    tracing::debug!("Vote schema installed on table {}", table);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zero_connections_is_a_configuration_error() {
        let err = create_pool("sqlite::memory:", 0).await.unwrap_err();
        assert!(matches!(err, sqlx::Error::Configuration(_)));
    }

    #[tokio::test]
    async fn memory_pool_keeps_schema_between_queries() {
        let pool = create_pool("sqlite::memory:", 1).await.unwrap();
        install_schema(&pool, &VoteConfig::default()).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM votes")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert!(pool.size() >= 1);
    }
}

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::{
    config::VoteConfig,
    error::Result,
    models::{MorphKey, NewVote, Vote},
};

/// Optional restrictions applied when listing or counting vote rows.
#[derive(Debug, Clone, Default)]
pub struct VoteFilter {
    pub voteable: Option<MorphKey>,
    pub voteable_type: Option<String>,
    pub voter: Option<MorphKey>,
    pub upvote: Option<bool>,
}

impl VoteFilter {
    pub fn for_voteable(voteable: MorphKey) -> Self {
        Self {
            voteable: Some(voteable),
            ..Self::default()
        }
    }

    pub fn for_voter(voter: MorphKey) -> Self {
        Self {
            voter: Some(voter),
            ..Self::default()
        }
    }

    pub fn direction(mut self, upvote: Option<bool>) -> Self {
        self.upvote = upvote;
        self
    }

    fn push_where(&self, query: &mut QueryBuilder<'_, Sqlite>, config: &VoteConfig) {
        query.push(" WHERE 1 = 1");

        if let Some(voteable) = &self.voteable {
            query
                .push(" AND voteable_type = ")
                .push_bind(voteable.morph_type.clone())
                .push(" AND voteable_id = ")
                .push_bind(voteable.key);
        }

        if let Some(voteable_type) = &self.voteable_type {
            query
                .push(" AND voteable_type = ")
                .push_bind(voteable_type.clone());
        }

        if let Some(voter) = &self.voter {
            query
                .push(" AND voter_type = ")
                .push_bind(voter.morph_type.clone())
                .push(format!(" AND {} = ", config.user_foreign_key()))
                .push_bind(voter.key);
        }

        if let Some(upvote) = self.upvote {
            query.push(" AND upvote = ").push_bind(upvote);
        }
    }
}

pub(crate) fn vote_columns(config: &VoteConfig) -> String {
    format!(
        "id, voter_type, {} AS voter_id, voteable_type, voteable_id, upvote, created_at, updated_at",
        config.user_foreign_key()
    )
}

/// Inserts a new row. A second vote for the same (voter, subject) pair is
/// rejected by the unique index and surfaces as a database error.
pub async fn insert_vote(db: &SqlitePool, config: &VoteConfig, new: &NewVote) -> Result<Vote> {
    let now = Utc::now();
    let vote = sqlx::query_as::<_, Vote>(&format!(
        r#"
        INSERT INTO {table} (id, voter_type, {fk}, voteable_type, voteable_id, upvote, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {columns}
        "#,
        table = config.vote_table(),
        fk = config.user_foreign_key(),
        columns = vote_columns(config),
    ))
    .bind(Uuid::new_v4())
    .bind(&new.voter.morph_type)
    .bind(new.voter.key)
    .bind(&new.voteable.morph_type)
    .bind(new.voteable.key)
    .bind(new.upvote)
    .bind(now)
    .bind(now)
    .fetch_one(db)
    .await?;

    Ok(vote)
}

/// Inserts the vote or, if the pair already voted, rewrites its direction.
/// The row id and `created_at` of an existing vote are kept.
pub async fn upsert_vote(db: &SqlitePool, config: &VoteConfig, new: &NewVote) -> Result<Vote> {
    let now = Utc::now();
    let vote = sqlx::query_as::<_, Vote>(&format!(
        r#"
        INSERT INTO {table} (id, voter_type, {fk}, voteable_type, voteable_id, upvote, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (voter_type, {fk}, voteable_type, voteable_id)
        DO UPDATE SET upvote = excluded.upvote, updated_at = excluded.updated_at
        RETURNING {columns}
        "#,
        table = config.vote_table(),
        fk = config.user_foreign_key(),
        columns = vote_columns(config),
    ))
    .bind(Uuid::new_v4())
    .bind(&new.voter.morph_type)
    .bind(new.voter.key)
    .bind(&new.voteable.morph_type)
    .bind(new.voteable.key)
    .bind(new.upvote)
    .bind(now)
    .bind(now)
    .fetch_one(db)
    .await?;

    Ok(vote)
}

pub async fn update_vote_direction(
    db: &SqlitePool,
    config: &VoteConfig,
    vote_id: Uuid,
    upvote: bool,
) -> Result<Option<Vote>> {
    let vote = sqlx::query_as::<_, Vote>(&format!(
        "UPDATE {} SET upvote = ?, updated_at = ? WHERE id = ? RETURNING {}",
        config.vote_table(),
        vote_columns(config),
    ))
    .bind(upvote)
    .bind(Utc::now())
    .bind(vote_id)
    .fetch_optional(db)
    .await?;

    Ok(vote)
}

/// Returns whether a row was removed.
pub async fn delete_vote(
    db: &SqlitePool,
    config: &VoteConfig,
    voter: &MorphKey,
    voteable: &MorphKey,
) -> Result<bool> {
    let result = sqlx::query(&format!(
        r#"
        DELETE FROM {}
        WHERE voter_type = ? AND {} = ? AND voteable_type = ? AND voteable_id = ?
        "#,
        config.vote_table(),
        config.user_foreign_key(),
    ))
    .bind(&voter.morph_type)
    .bind(voter.key)
    .bind(&voteable.morph_type)
    .bind(voteable.key)
    .execute(db)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn find_vote(
    db: &SqlitePool,
    config: &VoteConfig,
    voter: &MorphKey,
    voteable: &MorphKey,
) -> Result<Option<Vote>> {
    let vote = sqlx::query_as::<_, Vote>(&format!(
        r#"
        SELECT {} FROM {}
        WHERE voter_type = ? AND {} = ? AND voteable_type = ? AND voteable_id = ?
        "#,
        vote_columns(config),
        config.vote_table(),
        config.user_foreign_key(),
    ))
    .bind(&voter.morph_type)
    .bind(voter.key)
    .bind(&voteable.morph_type)
    .bind(voteable.key)
    .fetch_optional(db)
    .await?;

    Ok(vote)
}

pub async fn list_votes(
    db: &SqlitePool,
    config: &VoteConfig,
    filter: &VoteFilter,
) -> Result<Vec<Vote>> {
    let mut query = QueryBuilder::new(format!(
        "SELECT {} FROM {}",
        vote_columns(config),
        config.vote_table()
    ));
    filter.push_where(&mut query, config);
    query.push(" ORDER BY created_at, id");

    let votes = query.build_query_as::<Vote>().fetch_all(db).await?;

    Ok(votes)
}

pub async fn count_votes(db: &SqlitePool, config: &VoteConfig, filter: &VoteFilter) -> Result<i64> {
    let mut query = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", config.vote_table()));
    filter.push_where(&mut query, config);

    let count = query.build_query_scalar::<i64>().fetch_one(db).await?;
    tracing::debug!("Counted {} votes for {:?}", count, filter);

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_renders_configured_foreign_key() {
        let mut config = VoteConfig::default();
        config.column_names.user_foreign_key = "member_id".to_string();

        let filter = VoteFilter::for_voter(MorphKey::new("member", Uuid::new_v4())).direction(Some(true));
        let mut query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM votes");
        filter.push_where(&mut query, &config);

        assert_eq!(
            query.sql(),
            "SELECT COUNT(*) FROM votes WHERE 1 = 1 AND voter_type = ? AND member_id = ? AND upvote = ?"
        );
    }

    #[test]
    fn empty_filter_matches_everything() {
        let config = VoteConfig::default();
        let mut query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM votes");
        VoteFilter::default().push_where(&mut query, &config);

        assert_eq!(query.sql(), "SELECT COUNT(*) FROM votes WHERE 1 = 1");
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, sqlite::SqliteRow};
use uuid::Uuid;

use crate::models::MorphKey;

// The voter column name is configurable, so queries alias it to `voter_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Vote {
    pub id: Uuid,
    pub voter_type: String,
    pub voter_id: Uuid,
    pub voteable_type: String,
    pub voteable_id: Uuid,
    pub upvote: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vote {
    pub fn voter(&self) -> MorphKey {
        MorphKey::new(self.voter_type.clone(), self.voter_id)
    }

    pub fn voteable(&self) -> MorphKey {
        MorphKey::new(self.voteable_type.clone(), self.voteable_id)
    }

    pub fn is_upvote(&self) -> bool {
        self.upvote
    }

    pub fn is_downvote(&self) -> bool {
        !self.upvote
    }
}

#[derive(Debug, Clone)]
pub struct NewVote {
    pub voter: MorphKey,
    pub voteable: MorphKey,
    pub upvote: bool,
}

/// Join-row data carried alongside a voter fetched through the vote table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct VotePivot {
    #[sqlx(rename = "pivot_upvote")]
    pub upvote: bool,
    #[sqlx(rename = "pivot_created_at")]
    pub created_at: DateTime<Utc>,
    #[sqlx(rename = "pivot_updated_at")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Pivoted<U> {
    pub entity: U,
    pub pivot: VotePivot,
}

impl<'r, U> FromRow<'r, SqliteRow> for Pivoted<U>
where
    U: FromRow<'r, SqliteRow>,
{
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            entity: U::from_row(row)?,
            pivot: VotePivot::from_row(row)?,
        })
    }
}

/// Voter primary key with its pivot data, the in-memory form of a loaded
/// voters relation.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct VoterEntry {
    pub voter_id: Uuid,
    #[sqlx(flatten)]
    pub pivot: VotePivot,
}

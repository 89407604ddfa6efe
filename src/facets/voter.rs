use sqlx::{QueryBuilder, Sqlite};

use crate::{
    VoteLedger,
    error::Result,
    models::{Model, ModelRef, MorphKey, NewVote, Vote},
    services::vote_service::{self, VoteFilter},
};

/// Voting operations on behalf of one voter.
pub struct Voter<'l> {
    ledger: &'l VoteLedger,
    voter: MorphKey,
}

impl<'l> Voter<'l> {
    pub(crate) fn new(ledger: &'l VoteLedger, voter: MorphKey) -> Self {
        Self { ledger, voter }
    }

    pub fn key(&self) -> &MorphKey {
        &self.voter
    }

    /// Casts a vote on `subject`, flipping an existing vote in place if the
    /// direction differs. Never leaves two rows for the same pair.
    pub async fn vote<M: Model>(&self, subject: &M, upvote: bool) -> Result<Vote> {
        let db = &self.ledger.db;
        let config = self.ledger.config();
        let voteable = subject.morph_key();

        if let Some(existing) = vote_service::find_vote(db, config, &self.voter, &voteable).await? {
            if existing.upvote == upvote {
                return Ok(existing);
            }

            if let Some(updated) =
                vote_service::update_vote_direction(db, config, existing.id, upvote).await?
            {
                tracing::info!(
                    "Vote {} by {} on {} {} changed to {}",
                    updated.id,
                    self.voter.key,
                    voteable.morph_type,
                    voteable.key,
                    direction_label(upvote)
                );
                return Ok(updated);
            }
        }

        let vote = vote_service::upsert_vote(
            db,
            config,
            &NewVote {
                voter: self.voter.clone(),
                voteable: voteable.clone(),
                upvote,
            },
        )
        .await?;

        tracing::info!(
            "Vote {} cast by {} on {} {} ({})",
            vote.id,
            self.voter.key,
            voteable.morph_type,
            voteable.key,
            direction_label(upvote)
        );

        Ok(vote)
    }

    pub async fn upvote<M: Model>(&self, subject: &M) -> Result<Vote> {
        self.vote(subject, true).await
    }

    pub async fn downvote<M: Model>(&self, subject: &M) -> Result<Vote> {
        self.vote(subject, false).await
    }

    /// Removes the vote on `subject`; `false` if there was none.
    pub async fn cancel_vote<M: Model>(&self, subject: &M) -> Result<bool> {
        let voteable = subject.morph_key();
        let removed = vote_service::delete_vote(
            &self.ledger.db,
            self.ledger.config(),
            &self.voter,
            &voteable,
        )
        .await?;

        if removed {
            tracing::info!(
                "Vote by {} on {} {} cancelled",
                self.voter.key,
                voteable.morph_type,
                voteable.key
            );
        } else {
            tracing::debug!(
                "No vote by {} on {} {} to cancel",
                self.voter.key,
                voteable.morph_type,
                voteable.key
            );
        }

        Ok(removed)
    }

    pub async fn has_voted<M: Model>(&self, subject: &M) -> Result<bool> {
        self.has_vote_on(subject, None).await
    }

    pub async fn has_upvoted<M: Model>(&self, subject: &M) -> Result<bool> {
        self.has_vote_on(subject, Some(true)).await
    }

    pub async fn has_downvoted<M: Model>(&self, subject: &M) -> Result<bool> {
        self.has_vote_on(subject, Some(false)).await
    }

    async fn has_vote_on<M: Model>(&self, subject: &M, upvote: Option<bool>) -> Result<bool> {
        let mut filter = VoteFilter::for_voter(self.voter.clone()).direction(upvote);
        filter.voteable = Some(subject.morph_key());

        let count =
            vote_service::count_votes(&self.ledger.db, self.ledger.config(), &filter).await?;
        Ok(count > 0)
    }

    /// Every vote this voter has cast, oldest first.
    pub async fn votes(&self) -> Result<Vec<Vote>> {
        vote_service::list_votes(
            &self.ledger.db,
            self.ledger.config(),
            &VoteFilter::for_voter(self.voter.clone()),
        )
        .await
    }

    pub async fn voted_items<M: Model>(&self) -> Result<Vec<M>> {
        self.items(None).await
    }

    pub async fn upvoted_items<M: Model>(&self) -> Result<Vec<M>> {
        self.items(Some(true)).await
    }

    pub async fn downvoted_items<M: Model>(&self) -> Result<Vec<M>> {
        self.items(Some(false)).await
    }

    async fn items<M: Model>(&self, upvote: Option<bool>) -> Result<Vec<M>> {
        let config = self.ledger.config();
        let subject = ModelRef::of::<M>();

        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT s.* FROM {subjects} s WHERE EXISTS (SELECT 1 FROM {votes} v \
             WHERE v.voteable_id = s.{key} AND v.{fk} = ",
            subjects = subject.table,
            votes = config.vote_table(),
            key = subject.key_column,
            fk = config.user_foreign_key(),
        ));

        query
            .push_bind(self.voter.key)
            .push(" AND v.voter_type = ")
            .push_bind(self.voter.morph_type.clone())
            .push(" AND v.voteable_type = ")
            .push_bind(subject.morph_type.clone());

        if let Some(upvote) = upvote {
            query.push(" AND v.upvote = ").push_bind(upvote);
        }
        query.push(")");

        let items = query
            .build_query_as::<M>()
            .fetch_all(&self.ledger.db)
            .await?;

        Ok(items)
    }
}

fn direction_label(upvote: bool) -> &'static str {
    if upvote { "upvote" } else { "downvote" }
}

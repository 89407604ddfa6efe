use crate::{
    VoteLedger,
    error::Result,
    facets::query::{VotersQuery, VotesQuery},
    models::{Model, MorphKey, Vote, VoterEntry},
    services::count_format::{FormatOptions, count_for_humans},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Any,
    Up,
    Down,
}

impl Direction {
    fn upvote(self) -> Option<bool> {
        match self {
            Direction::Any => None,
            Direction::Up => Some(true),
            Direction::Down => Some(false),
        }
    }

    fn matches(self, upvote: bool) -> bool {
        self.upvote().is_none_or(|wanted| wanted == upvote)
    }
}

/// Relations fetched ahead of time. `None` means "not fetched", in which case
/// membership checks go to the store.
#[derive(Debug, Clone, Default)]
pub struct LoadedRelations {
    pub votes: Option<Vec<Vote>>,
    pub voters: Option<Vec<VoterEntry>>,
    pub upvoters: Option<Vec<VoterEntry>>,
    pub downvoters: Option<Vec<VoterEntry>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CachedCounts {
    pub voters: Option<i64>,
    pub upvoters: Option<i64>,
    pub downvoters: Option<i64>,
}

/// Voting view of one subject.
///
/// Counts are computed on first use and then kept for the lifetime of this
/// value; votes cast afterwards are not reflected until [`refresh`] is called.
///
/// [`refresh`]: Voteable::refresh
pub struct Voteable<'l> {
    ledger: &'l VoteLedger,
    subject: MorphKey,
    relations: LoadedRelations,
    counts: CachedCounts,
}

impl<'l> Voteable<'l> {
    pub(crate) fn new(ledger: &'l VoteLedger, subject: MorphKey) -> Self {
        Self {
            ledger,
            subject,
            relations: LoadedRelations::default(),
            counts: CachedCounts::default(),
        }
    }

    pub fn subject(&self) -> &MorphKey {
        &self.subject
    }

    pub fn relations(&self) -> &LoadedRelations {
        &self.relations
    }

    pub fn counts(&self) -> CachedCounts {
        self.counts
    }

    /// Seeds the instance with relations loaded elsewhere, e.g. in bulk.
    pub fn with_relations(mut self, relations: LoadedRelations) -> Self {
        self.relations = relations;
        self
    }

    /// Seeds the count cache, e.g. from counts selected alongside a listing.
    pub fn with_counts(mut self, counts: CachedCounts) -> Self {
        self.counts = counts;
        self
    }

    /// Drops cached counts and loaded relations.
    pub fn refresh(&mut self) {
        self.relations = LoadedRelations::default();
        self.counts = CachedCounts::default();
    }

    pub fn votes(&self) -> VotesQuery<'l> {
        VotesQuery::new(self.ledger, self.subject.clone())
    }

    pub fn voters(&self) -> VotersQuery<'l> {
        VotersQuery::new(self.ledger, self.subject.clone(), None)
    }

    pub fn upvoters(&self) -> VotersQuery<'l> {
        VotersQuery::new(self.ledger, self.subject.clone(), Some(true))
    }

    pub fn downvoters(&self) -> VotersQuery<'l> {
        VotersQuery::new(self.ledger, self.subject.clone(), Some(false))
    }

    pub async fn load_votes(&mut self) -> Result<&[Vote]> {
        let votes = self.votes().fetch_all().await?;
        Ok(self.relations.votes.insert(votes).as_slice())
    }

    pub async fn load_voters(&mut self) -> Result<&[VoterEntry]> {
        let voters = self.voters().entries().await?;
        Ok(self.relations.voters.insert(voters).as_slice())
    }

    pub async fn load_upvoters(&mut self) -> Result<&[VoterEntry]> {
        let upvoters = self.upvoters().entries().await?;
        Ok(self.relations.upvoters.insert(upvoters).as_slice())
    }

    pub async fn load_downvoters(&mut self) -> Result<&[VoterEntry]> {
        let downvoters = self.downvoters().entries().await?;
        Ok(self.relations.downvoters.insert(downvoters).as_slice())
    }

    pub async fn is_voted_by<V: Model>(&self, voter: &V) -> Result<bool> {
        self.has_voter(voter, Direction::Any).await
    }

    pub async fn is_upvoted_by<V: Model>(&self, voter: &V) -> Result<bool> {
        self.has_voter(voter, Direction::Up).await
    }

    pub async fn is_downvoted_by<V: Model>(&self, voter: &V) -> Result<bool> {
        self.has_voter(voter, Direction::Down).await
    }

    pub async fn is_not_voted_by<V: Model>(&self, voter: &V) -> Result<bool> {
        Ok(!self.is_voted_by(voter).await?)
    }

    pub async fn is_not_upvoted_by<V: Model>(&self, voter: &V) -> Result<bool> {
        Ok(!self.is_upvoted_by(voter).await?)
    }

    pub async fn is_not_downvoted_by<V: Model>(&self, voter: &V) -> Result<bool> {
        Ok(!self.is_downvoted_by(voter).await?)
    }

    async fn has_voter<V: Model>(&self, voter: &V, direction: Direction) -> Result<bool> {
        // Only the configured voter type can have voted.
        if V::MORPH_TYPE != self.ledger.config().voter_type() {
            return Ok(false);
        }

        let key = voter.key();

        let loaded = match direction {
            Direction::Any => &self.relations.voters,
            Direction::Up => &self.relations.upvoters,
            Direction::Down => &self.relations.downvoters,
        };
        if let Some(entries) = loaded {
            return Ok(entries.iter().any(|entry| entry.voter_id == key));
        }

        if let Some(votes) = &self.relations.votes {
            return Ok(votes.iter().any(|vote| {
                vote.voter_type == V::MORPH_TYPE && vote.voter_id == key && direction.matches(vote.upvote)
            }));
        }

        self.votes()
            .by_voter(key)
            .direction(direction.upvote())
            .exists()
            .await
    }

    pub async fn voters_count(&mut self) -> Result<i64> {
        if let Some(count) = self.counts.voters {
            return Ok(count);
        }

        let count = self.voters().count().await?;
        self.counts.voters = Some(count);
        Ok(count)
    }

    pub async fn upvoters_count(&mut self) -> Result<i64> {
        if let Some(count) = self.counts.upvoters {
            return Ok(count);
        }

        let count = self.upvoters().count().await?;
        self.counts.upvoters = Some(count);
        Ok(count)
    }

    pub async fn downvoters_count(&mut self) -> Result<i64> {
        if let Some(count) = self.counts.downvoters {
            return Ok(count);
        }

        let count = self.downvoters().count().await?;
        self.counts.downvoters = Some(count);
        Ok(count)
    }

    pub async fn voters_count_for_humans(&mut self, options: FormatOptions<'_>) -> Result<String> {
        let count = self.voters_count().await?;
        Ok(self.format_count(count, options))
    }

    pub async fn upvoters_count_for_humans(&mut self, options: FormatOptions<'_>) -> Result<String> {
        let count = self.upvoters_count().await?;
        Ok(self.format_count(count, options))
    }

    pub async fn downvoters_count_for_humans(
        &mut self,
        options: FormatOptions<'_>,
    ) -> Result<String> {
        let count = self.downvoters_count().await?;
        Ok(self.format_count(count, options))
    }

    fn format_count(&self, count: i64, options: FormatOptions<'_>) -> String {
        let divisors = options
            .divisors
            .unwrap_or(&self.ledger.config().divisors);

        count_for_humans(count, options.precision, options.mode, divisors)
    }
}

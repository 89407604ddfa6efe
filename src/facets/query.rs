use sqlx::{FromRow, QueryBuilder, Sqlite, sqlite::SqliteRow};
use std::marker::PhantomData;
use uuid::Uuid;

use crate::{
    VoteLedger,
    config::VoteConfig,
    error::Result,
    models::{Model, ModelRef, MorphKey, Pivoted, Vote, VoterEntry},
    services::vote_service::{self, VoteFilter},
};

/// Lazy query over the vote rows of one subject. Nothing runs until a
/// terminal method is awaited, and every terminal call re-executes.
#[derive(Clone)]
pub struct VotesQuery<'l> {
    ledger: &'l VoteLedger,
    filter: VoteFilter,
}

impl<'l> VotesQuery<'l> {
    pub(crate) fn new(ledger: &'l VoteLedger, subject: MorphKey) -> Self {
        Self {
            ledger,
            filter: VoteFilter::for_voteable(subject),
        }
    }

    /// Restricts to votes cast by the configured voter type with this key.
    pub fn by_voter(mut self, voter_key: Uuid) -> Self {
        self.filter.voter = Some(MorphKey::new(
            self.ledger.config().voter_type(),
            voter_key,
        ));
        self
    }

    pub fn upvotes(mut self) -> Self {
        self.filter.upvote = Some(true);
        self
    }

    pub fn downvotes(mut self) -> Self {
        self.filter.upvote = Some(false);
        self
    }

    pub(crate) fn direction(mut self, upvote: Option<bool>) -> Self {
        self.filter.upvote = upvote;
        self
    }

    pub fn filter(&self) -> &VoteFilter {
        &self.filter
    }

    pub async fn fetch_all(&self) -> Result<Vec<Vote>> {
        vote_service::list_votes(&self.ledger.db, self.ledger.config(), &self.filter).await
    }

    pub async fn count(&self) -> Result<i64> {
        vote_service::count_votes(&self.ledger.db, self.ledger.config(), &self.filter).await
    }

    pub async fn exists(&self) -> Result<bool> {
        Ok(self.count().await? > 0)
    }
}

/// Lazy query over the voter entities of one subject, joined through the
/// vote table.
#[derive(Clone)]
pub struct VotersQuery<'l> {
    ledger: &'l VoteLedger,
    subject: MorphKey,
    upvote: Option<bool>,
}

impl<'l> VotersQuery<'l> {
    pub(crate) fn new(ledger: &'l VoteLedger, subject: MorphKey, upvote: Option<bool>) -> Self {
        Self {
            ledger,
            subject,
            upvote,
        }
    }

    pub fn upvote(&self) -> Option<bool> {
        self.upvote
    }

    fn select(&self, columns: &str) -> QueryBuilder<'static, Sqlite> {
        let config = self.ledger.config();
        let voter = self.ledger.voter_model();

        let mut query = QueryBuilder::new(format!(
            "SELECT {columns} FROM {voters} u INNER JOIN {votes} v ON v.{fk} = u.{key}",
            voters = voter.table,
            votes = config.vote_table(),
            fk = config.user_foreign_key(),
            key = voter.key_column,
        ));

        query
            .push(" WHERE v.voter_type = ")
            .push_bind(voter.morph_type.clone())
            .push(" AND v.voteable_type = ")
            .push_bind(self.subject.morph_type.clone())
            .push(" AND v.voteable_id = ")
            .push_bind(self.subject.key);

        if let Some(upvote) = self.upvote {
            query.push(" AND v.upvote = ").push_bind(upvote);
        }

        query
    }

    /// Voter rows with the vote's direction and timestamps attached.
    pub async fn fetch_all<U>(&self) -> Result<Vec<Pivoted<U>>>
    where
        U: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        let mut query = self.select(
            "u.*, v.upvote AS pivot_upvote, v.created_at AS pivot_created_at, v.updated_at AS pivot_updated_at",
        );
        query.push(" ORDER BY v.created_at");

        let voters = query
            .build_query_as::<Pivoted<U>>()
            .fetch_all(&self.ledger.db)
            .await?;

        Ok(voters)
    }

    /// Voter keys only; what a loaded relation keeps in memory.
    pub async fn entries(&self) -> Result<Vec<VoterEntry>> {
        let mut query = self.select(&format!(
            "u.{} AS voter_id, v.upvote AS pivot_upvote, v.created_at AS pivot_created_at, v.updated_at AS pivot_updated_at",
            self.ledger.voter_model().key_column
        ));
        query.push(" ORDER BY v.created_at");

        let entries = query
            .build_query_as::<VoterEntry>()
            .fetch_all(&self.ledger.db)
            .await?;

        Ok(entries)
    }

    pub async fn count(&self) -> Result<i64> {
        let mut query = self.select("COUNT(*)");
        let count = query
            .build_query_scalar::<i64>()
            .fetch_one(&self.ledger.db)
            .await?;

        Ok(count)
    }
}

/// Existence filter on subjects, keyed by a voter's primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VotePredicate {
    voter: MorphKey,
    upvote: Option<bool>,
    negated: bool,
}

impl VotePredicate {
    fn new<V: Model>(voter: &V, upvote: Option<bool>, negated: bool) -> Self {
        Self {
            voter: voter.morph_key(),
            upvote,
            negated,
        }
    }

    pub fn voted_by<V: Model>(voter: &V) -> Self {
        Self::new(voter, None, false)
    }

    pub fn not_voted_by<V: Model>(voter: &V) -> Self {
        Self::new(voter, None, true)
    }

    pub fn upvoted_by<V: Model>(voter: &V) -> Self {
        Self::new(voter, Some(true), false)
    }

    pub fn not_upvoted_by<V: Model>(voter: &V) -> Self {
        Self::new(voter, Some(true), true)
    }

    pub fn downvoted_by<V: Model>(voter: &V) -> Self {
        Self::new(voter, Some(false), false)
    }

    pub fn not_downvoted_by<V: Model>(voter: &V) -> Self {
        Self::new(voter, Some(false), true)
    }

    /// Appends `[NOT] EXISTS (...)` correlated on `subject_table.subject_key`.
    /// The caller supplies the surrounding `WHERE`/`AND`.
    pub fn push_sql(
        &self,
        query: &mut QueryBuilder<'_, Sqlite>,
        config: &VoteConfig,
        voter_model: &ModelRef,
        subject: &ModelRef,
    ) {
        if self.negated {
            query.push("NOT ");
        }

        query.push(format!(
            "EXISTS (SELECT 1 FROM {voters} u INNER JOIN {votes} v ON v.{fk} = u.{voter_key} \
             WHERE v.voteable_id = {subjects}.{subject_key}",
            voters = voter_model.table,
            votes = config.vote_table(),
            fk = config.user_foreign_key(),
            voter_key = voter_model.key_column,
            subjects = subject.table,
            subject_key = subject.key_column,
        ));

        query
            .push(" AND v.voteable_type = ")
            .push_bind(subject.morph_type.clone())
            .push(" AND v.voter_type = ")
            .push_bind(self.voter.morph_type.clone())
            .push(format!(" AND u.{} = ", voter_model.key_column))
            .push_bind(self.voter.key);

        if let Some(upvote) = self.upvote {
            query.push(" AND v.upvote = ").push_bind(upvote);
        }

        query.push(")");
    }
}

/// Listing of subjects of type `M`, narrowed by vote predicates.
pub struct SubjectQuery<'l, M> {
    ledger: &'l VoteLedger,
    predicates: Vec<VotePredicate>,
    keys: Option<Vec<Uuid>>,
    _model: PhantomData<fn() -> M>,
}

impl<M> Clone for SubjectQuery<'_, M> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger,
            predicates: self.predicates.clone(),
            keys: self.keys.clone(),
            _model: PhantomData,
        }
    }
}

impl<'l, M: Model> SubjectQuery<'l, M> {
    pub(crate) fn new(ledger: &'l VoteLedger) -> Self {
        Self {
            ledger,
            predicates: Vec::new(),
            keys: None,
            _model: PhantomData,
        }
    }

    pub fn filter(mut self, predicate: VotePredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn where_voted_by<V: Model>(self, voter: &V) -> Self {
        self.filter(VotePredicate::voted_by(voter))
    }

    pub fn where_not_voted_by<V: Model>(self, voter: &V) -> Self {
        self.filter(VotePredicate::not_voted_by(voter))
    }

    pub fn where_upvoted_by<V: Model>(self, voter: &V) -> Self {
        self.filter(VotePredicate::upvoted_by(voter))
    }

    pub fn where_not_upvoted_by<V: Model>(self, voter: &V) -> Self {
        self.filter(VotePredicate::not_upvoted_by(voter))
    }

    pub fn where_downvoted_by<V: Model>(self, voter: &V) -> Self {
        self.filter(VotePredicate::downvoted_by(voter))
    }

    pub fn where_not_downvoted_by<V: Model>(self, voter: &V) -> Self {
        self.filter(VotePredicate::not_downvoted_by(voter))
    }

    /// Limits the listing to these primary keys.
    pub fn where_key_in(mut self, keys: impl IntoIterator<Item = Uuid>) -> Self {
        self.keys = Some(keys.into_iter().collect());
        self
    }

    pub fn predicates(&self) -> &[VotePredicate] {
        &self.predicates
    }

    fn select(&self, columns: &str) -> QueryBuilder<'static, Sqlite> {
        let subject = ModelRef::of::<M>();
        let mut query = QueryBuilder::new(format!("SELECT {} FROM {}", columns, subject.table));
        query.push(" WHERE 1 = 1");

        if let Some(keys) = &self.keys {
            if keys.is_empty() {
                query.push(" AND 1 = 0");
            } else {
                query.push(format!(" AND {}.{} IN (", subject.table, subject.key_column));
                let mut separated = query.separated(", ");
                for key in keys {
                    separated.push_bind(*key);
                }
                separated.push_unseparated(")");
            }
        }

        for predicate in &self.predicates {
            query.push(" AND ");
            predicate.push_sql(
                &mut query,
                self.ledger.config(),
                self.ledger.voter_model(),
                &subject,
            );
        }

        query
    }

    pub async fn fetch_all(&self) -> Result<Vec<M>> {
        let mut query = self.select(&format!("{}.*", M::TABLE));
        let subjects = query
            .build_query_as::<M>()
            .fetch_all(&self.ledger.db)
            .await?;

        tracing::debug!(
            "Fetched {} {} rows with {} vote predicates",
            subjects.len(),
            M::MORPH_TYPE,
            self.predicates.len()
        );

        Ok(subjects)
    }

    pub async fn count(&self) -> Result<i64> {
        let mut query = self.select("COUNT(*)");
        let count = query
            .build_query_scalar::<i64>()
            .fetch_one(&self.ledger.db)
            .await?;

        Ok(count)
    }
}

pub mod config;
pub mod database;
pub mod error;
pub mod facets;
pub mod models;
pub mod services;

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::{
    config::VoteConfig,
    error::{Result, VoteError},
    facets::{query::SubjectQuery, voteable::Voteable, voter::Voter},
    models::{Model, ModelRef, ModelRegistry, MorphKey},
};

pub use crate::services::count_format::{
    Divisors, FormatOptions, RoundingMode, count_for_humans, default_divisors,
};

/// Entry point of the ledger: the pool plus configuration resolved once at
/// startup. Cheap to clone.
#[derive(Clone)]
pub struct VoteLedger {
    pub db: SqlitePool,
    config: Arc<VoteConfig>,
    registry: Arc<ModelRegistry>,
    voter_model: Arc<ModelRef>,
}

impl VoteLedger {
    pub fn new(db: SqlitePool, config: VoteConfig, registry: ModelRegistry) -> Result<Self> {
        config.validate()?;

        let voter_model = match registry.require(config.voter_type()) {
            Ok(model) => model.clone(),
            Err(VoteError::UnknownModel(morph_type)) => {
                return Err(VoteError::ConfigurationMissing(format!(
                    "models.user: no model registered for {:?}",
                    morph_type
                )));
            }
            Err(e) => return Err(e),
        };

        tracing::debug!(
            "Vote ledger ready: voter type {} ({}), vote table {}",
            voter_model.morph_type,
            voter_model.table,
            config.vote_table()
        );

        Ok(Self {
            db,
            config: Arc::new(config),
            registry: Arc::new(registry),
            voter_model: Arc::new(voter_model),
        })
    }

    pub fn config(&self) -> &VoteConfig {
        &self.config
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Table and key column of the configured voter type.
    pub fn voter_model(&self) -> &ModelRef {
        &self.voter_model
    }

    pub async fn install_schema(&self) -> Result<()> {
        database::install_schema(&self.db, &self.config).await?;
        Ok(())
    }

    pub fn voteable<M: Model>(&self, subject: &M) -> Voteable<'_> {
        Voteable::new(self, subject.morph_key())
    }

    pub fn voteable_key(&self, subject: MorphKey) -> Voteable<'_> {
        Voteable::new(self, subject)
    }

    /// Fails with `TypeMismatch` unless `voter` is of the configured voter type.
    pub fn voter<V: Model>(&self, voter: &V) -> Result<Voter<'_>> {
        if V::MORPH_TYPE != self.config.voter_type() {
            return Err(VoteError::TypeMismatch {
                expected: self.config.voter_type().to_string(),
                found: V::MORPH_TYPE.to_string(),
            });
        }

        Ok(Voter::new(self, voter.morph_key()))
    }

    pub fn subjects<M: Model>(&self) -> SubjectQuery<'_, M> {
        SubjectQuery::new(self)
    }
}

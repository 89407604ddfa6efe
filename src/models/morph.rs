use serde::{Deserialize, Serialize};
use sqlx::{FromRow, sqlite::SqliteRow};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    config::validate_identifier,
    error::{Result, VoteError},
};

/// A persisted entity that can take part in voting, either as the voter or
/// as the subject being voted on.
pub trait Model: for<'r> FromRow<'r, SqliteRow> + Send + Unpin {
    /// Discriminator stored in the `*_type` columns of the vote table.
    const MORPH_TYPE: &'static str;
    const TABLE: &'static str;
    const KEY_COLUMN: &'static str = "id";

    fn key(&self) -> Uuid;

    fn morph_key(&self) -> MorphKey {
        MorphKey::new(Self::MORPH_TYPE, self.key())
    }
}

/// Polymorphic reference: type discriminator plus primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MorphKey {
    pub morph_type: String,
    pub key: Uuid,
}

impl MorphKey {
    pub fn new(morph_type: impl Into<String>, key: Uuid) -> Self {
        Self {
            morph_type: morph_type.into(),
            key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRef {
    pub morph_type: String,
    pub table: String,
    pub key_column: String,
}

impl ModelRef {
    pub fn of<M: Model>() -> Self {
        Self {
            morph_type: M::MORPH_TYPE.to_string(),
            table: M::TABLE.to_string(),
            key_column: M::KEY_COLUMN.to_string(),
        }
    }
}

/// Maps type discriminators to the tables that hold those entities.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: HashMap<String, ModelRef>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<M: Model>(&mut self) -> &mut Self {
        self.insert(ModelRef::of::<M>());
        self
    }

    pub fn insert(&mut self, model: ModelRef) -> &mut Self {
        self.models.insert(model.morph_type.clone(), model);
        self
    }

    pub fn resolve(&self, morph_type: &str) -> Option<&ModelRef> {
        self.models.get(morph_type)
    }

    /// Like [`resolve`](Self::resolve) but also checks that the table and key
    /// column are safe to interpolate into SQL.
    pub fn require(&self, morph_type: &str) -> Result<&ModelRef> {
        let model = self
            .resolve(morph_type)
            .ok_or_else(|| VoteError::UnknownModel(morph_type.to_string()))?;

        validate_identifier("table", &model.table)?;
        validate_identifier("key column", &model.key_column)?;

        Ok(model)
    }
}

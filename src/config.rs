use regex::Regex;
use serde::Deserialize;
use std::{env, path::Path, sync::LazyLock};

use crate::{
    error::{Result, VoteError},
    services::count_format::{Divisors, default_divisors},
};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub vote: VoteConfig,
}

impl Config {
    /// Reads `.env` (if present) and then the process environment.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Like [`Config::load`], reading the given dotenv file instead of `.env`.
    /// Variables already present in the process environment win.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        dotenvy::from_path(path.as_ref()).map_err(|e| {
            VoteError::InvalidConfiguration(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::from_env()
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| VoteError::ConfigurationMissing("DATABASE_URL".to_string()))?;

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(VoteError::InvalidConfiguration(format!(
                        "DATABASE_MAX_CONNECTIONS must be a positive integer: {:?}",
                        raw
                    )));
                }
            },
            None => 5,
        };

        Ok(Self {
            database_url,
            max_connections,
            vote: VoteConfig::from_lookup(lookup)?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelNames {
    /// Type discriminator of the voter entity.
    pub user: String,
    /// Table holding vote rows.
    pub vote: String,
}

impl Default for ModelNames {
    fn default() -> Self {
        Self {
            user: "user".to_string(),
            vote: "votes".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub user_foreign_key: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            user_foreign_key: "user_id".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VoteConfig {
    pub models: ModelNames,
    pub column_names: ColumnNames,
    pub divisors: Divisors,
}

impl Default for VoteConfig {
    fn default() -> Self {
        Self {
            models: ModelNames::default(),
            column_names: ColumnNames::default(),
            divisors: default_divisors(),
        }
    }
}

impl VoteConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let divisors = match lookup("VOTE_DIVISORS") {
            Some(raw) => serde_json::from_str(&raw)?,
            None => defaults.divisors,
        };

        let config = Self {
            models: ModelNames {
                user: lookup("VOTE_USER_MODEL").unwrap_or(defaults.models.user),
                vote: lookup("VOTE_TABLE").unwrap_or(defaults.models.vote),
            },
            column_names: ColumnNames {
                user_foreign_key: lookup("VOTE_USER_FOREIGN_KEY")
                    .unwrap_or(defaults.column_names.user_foreign_key),
            },
            divisors,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn voter_type(&self) -> &str {
        &self.models.user
    }

    pub fn vote_table(&self) -> &str {
        &self.models.vote
    }

    pub fn user_foreign_key(&self) -> &str {
        &self.column_names.user_foreign_key
    }

    /// Every query interpolates these names, so they must be present and be
    /// plain SQL identifiers.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("models.user", self.voter_type()),
            ("models.vote", self.vote_table()),
            (
                "column_names.user_foreign_key",
                self.user_foreign_key(),
            ),
        ];

        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(VoteError::ConfigurationMissing(name.to_string()));
            }
        }

        validate_identifier("models.vote", self.vote_table())?;
        validate_identifier("column_names.user_foreign_key", self.user_foreign_key())?;

        Ok(())
    }
}

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

pub(crate) fn validate_identifier(name: &str, value: &str) -> Result<()> {
    if !IDENTIFIER.is_match(value) {
        return Err(VoteError::InvalidConfiguration(format!(
            "{} is not a valid identifier: {:?}",
            name, value
        )));
    }

    Ok(())
}

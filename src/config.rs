use std::{env, fmt::Display, str::FromStr};

use thiserror::Error;

use crate::{
    constants::{
        DEFAULT_MAX_CONNECTIONS, DEFAULT_PORT, MAX_AMOUNT, MAX_COOKING_TIME, MIN_AMOUNT,
        MIN_COOKING_TIME, RECIPE_COUNT_PER_PAGE,
    },
    validation::RecipeLimits,
};

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Environment variable {0} is required")]
    Missing(&'static str),

    #[error("Invalid {key} value: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    pub jwt_secret: String,
    pub page_size: i64,
    pub limits: RecipeLimits,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; `load` reads the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cooking_time = try_load(&lookup, "COOKING_TIME_MIN", MIN_COOKING_TIME)?
            ..=try_load(&lookup, "COOKING_TIME_MAX", MAX_COOKING_TIME)?;
        let amount =
            try_load(&lookup, "AMOUNT_MIN", MIN_AMOUNT)?..=try_load(&lookup, "AMOUNT_MAX", MAX_AMOUNT)?;

        if cooking_time.is_empty() || *cooking_time.start() < 1 {
            return Err(ConfigError::Invalid {
                key: "COOKING_TIME_MIN",
                reason: format!("bounds {cooking_time:?} are not a positive range"),
            });
        }
        if amount.is_empty() || *amount.start() < 1 {
            return Err(ConfigError::Invalid {
                key: "AMOUNT_MIN",
                reason: format!("bounds {amount:?} are not a positive range"),
            });
        }

        let page_size = try_load(&lookup, "PAGE_SIZE", RECIPE_COUNT_PER_PAGE)?;
        if page_size < 1 {
            return Err(ConfigError::Invalid {
                key: "PAGE_SIZE",
                reason: format!("{page_size} is not positive"),
            });
        }

        Ok(Self {
            port: try_load(&lookup, "PORT", DEFAULT_PORT)?,
            database_url: require(&lookup, "DATABASE_URL")?,
            max_connections: try_load(&lookup, "DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
            jwt_secret: require(&lookup, "JWT_SECRET")?,
            page_size,
            limits: RecipeLimits {
                cooking_time,
                amount,
            },
        })
    }
}

fn require<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn try_load<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|e: T::Err| {
            log::warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key,
                reason: e.to_string(),
            }
        }),
        None => {
            log::info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

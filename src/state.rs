use std::sync::Arc;

use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::{config::Config, error::ServiceError};

pub struct State {
    pub pool: Pool<Postgres>,
    pub config: Config,
    /// Session key, shared with the identity filters.
    pub secret: Arc<str>,
}

impl State {
    pub async fn connect(config: Config) -> Result<Arc<Self>, ServiceError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await?;

        log::info!("> Connected to database");

        Ok(Self::with_pool(pool, config))
    }

    pub fn with_pool(pool: Pool<Postgres>, config: Config) -> Arc<Self> {
        let secret = Arc::from(config.jwt_secret.as_str());

        Arc::new(Self {
            pool,
            config,
            secret,
        })
    }
}

use sqlx::{Pool, Postgres};

use crate::{
    error::ServiceError,
    schema::{User, UserProfile, Uuid},
};

use super::is_subscribed;

pub async fn get_user_by_id(
    pool: &Pool<Postgres>,
    user_id: Uuid,
) -> Result<Option<User>, ServiceError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Profile of `user_id` as seen by `viewer`; anonymous viewers are never subscribed.
pub async fn get_user_profile(
    user_id: Uuid,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<UserProfile, ServiceError> {
    let user = get_user_by_id(pool, user_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("User not found"))?;

    let subscribed = match viewer {
        Some(viewer) => is_subscribed(viewer, user_id, pool).await?,
        None => false,
    };

    Ok(UserProfile::from_user(user, subscribed))
}

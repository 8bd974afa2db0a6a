use sqlx::{Pool, Postgres};

use crate::{
    error::{violated_constraint, Constraint, ServiceError},
    form::PageRequest,
    pagination::{split_counted_rows, PageContext},
    schema::{RecipeShort, RelationKind, Subscription, Uuid},
};

use super::{get_recipe_short, get_user_by_id, get_user_profile};

pub async fn has_relation(
    kind: RelationKind,
    user_id: Uuid,
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<bool, ServiceError> {
    let result: Option<(i32,)> = sqlx::query_as(&format!(
        "SELECT recipe_id FROM {} WHERE user_id = $1 AND recipe_id = $2",
        kind.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .fetch_optional(pool)
    .await?;

    Ok(result.is_some())
}

/// Adds `recipe_id` to the user's favorites or shopping cart. The unique
/// constraint on `(user_id, recipe_id)` decides whether the row is new, so two
/// concurrent adds yield exactly one success.
pub async fn add_relation(
    kind: RelationKind,
    user_id: Uuid,
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<RecipeShort, ServiceError> {
    let recipe = get_recipe_short(recipe_id, pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("Recipe not found"))?;

    let result = sqlx::query(&format!(
        "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        kind.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(|e| match violated_constraint(&e) {
        Some(Constraint::ForeignKey) => ServiceError::not_found("Recipe not found"),
        _ => e.into(),
    })?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::DuplicateRelation(
            kind.already_exists().to_owned(),
        ));
    }

    log::info!("> User {user_id} added recipe {recipe_id} to {}", kind.table());

    Ok(recipe)
}

pub async fn remove_relation(
    kind: RelationKind,
    user_id: Uuid,
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), ServiceError> {
    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
        kind.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::not_found(kind.missing()));
    }

    log::info!("> User {user_id} removed recipe {recipe_id} from {}", kind.table());

    Ok(())
}

pub async fn is_subscribed(
    user_id: Uuid,
    author_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<bool, ServiceError> {
    let result: Option<(i32,)> =
        sqlx::query_as("SELECT author_id FROM follows WHERE user_id = $1 AND author_id = $2")
            .bind(user_id)
            .bind(author_id)
            .fetch_optional(pool)
            .await?;

    Ok(result.is_some())
}

pub fn check_follow_target(user_id: Uuid, author_id: Uuid) -> Result<(), ServiceError> {
    if user_id == author_id {
        return Err(ServiceError::validation(
            "author",
            "You cannot subscribe to yourself",
        ));
    }
    Ok(())
}

pub async fn subscribe(
    user_id: Uuid,
    author_id: Uuid,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Subscription, ServiceError> {
    check_follow_target(user_id, author_id)?;

    if get_user_by_id(pool, author_id).await?.is_none() {
        return Err(ServiceError::not_found("User not found"));
    }

    let result = sqlx::query(
        "INSERT INTO follows (user_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(author_id)
    .execute(pool)
    .await
    .map_err(|e| match violated_constraint(&e) {
        Some(Constraint::ForeignKey) => ServiceError::not_found("User not found"),
        Some(Constraint::Check) => ServiceError::validation("author", "You cannot subscribe to yourself"),
        _ => e.into(),
    })?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::DuplicateRelation(
            "You are already subscribed to this author".to_owned(),
        ));
    }

    log::info!("> User {user_id} subscribed to {author_id}");

    get_subscription(author_id, user_id, recipes_limit, pool).await
}

pub async fn unsubscribe(
    user_id: Uuid,
    author_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), ServiceError> {
    let result = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND author_id = $2")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::not_found(
            "You are not subscribed to this author",
        ));
    }

    log::info!("> User {user_id} unsubscribed from {author_id}");

    Ok(())
}

pub async fn get_subscription(
    author_id: Uuid,
    viewer: Uuid,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Subscription, ServiceError> {
    let author = get_user_profile(author_id, Some(viewer), pool).await?;

    let recipes: Vec<RecipeShort> = sqlx::query_as(
        "
        SELECT id, name, image, cooking_time
        FROM recipes
        WHERE author_id = $1
        ORDER BY id DESC
        LIMIT $2
    ",
    )
    .bind(author_id)
    .bind(recipes_limit.filter(|limit| *limit >= 0))
    .fetch_all(pool)
    .await?;

    let recipes_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(author_id)
        .fetch_one(pool)
        .await?;

    Ok(Subscription {
        author,
        recipes,
        recipes_count: recipes_count.0,
    })
}

pub async fn fetch_subscriptions(
    user_id: Uuid,
    page: PageRequest,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<Subscription>, ServiceError> {
    let rows: Vec<(Uuid, i64)> = sqlx::query_as(
        "
        SELECT f.author_id, COUNT(*) OVER()
        FROM follows f
        WHERE f.user_id = $1
        ORDER BY f.id DESC
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(user_id)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let (authors, total_count) = split_counted_rows(rows, &page)?;

    let mut subscriptions = Vec::with_capacity(authors.len());
    for author_id in authors {
        subscriptions.push(get_subscription(author_id, user_id, recipes_limit, pool).await?);
    }

    Ok(PageContext::from_rows(
        subscriptions,
        total_count,
        page.limit,
        page.page,
    ))
}

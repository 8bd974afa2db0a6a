use std::collections::BTreeMap;

use sqlx::{Pool, Postgres};

use crate::{
    constants::SHOPPING_LIST_HEADER,
    error::ServiceError,
    schema::{CartIngredientRow, ShoppingListEntry, Uuid},
};

/// Every ingredient join row reachable through the user's shopping cart, one
/// row per (recipe, ingredient) pair.
pub async fn list_cart_ingredients(
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<CartIngredientRow>, ServiceError> {
    let rows: Vec<CartIngredientRow> = sqlx::query_as(
        "
        SELECT i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM shopping_cart sc
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE sc.user_id = $1
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Groups rows by (name, measurement unit) and sums their amounts. The result
/// is ordered by name, then unit, with each pair present once.
pub fn aggregate_ingredients<I>(rows: I) -> Vec<ShoppingListEntry>
where
    I: IntoIterator<Item = CartIngredientRow>,
{
    let totals = rows
        .into_iter()
        .fold(BTreeMap::new(), |mut totals: BTreeMap<(String, String), i64>, row| {
            *totals.entry((row.name, row.measurement_unit)).or_insert(0) += i64::from(row.amount);
            totals
        });

    totals
        .into_iter()
        .map(|((name, measurement_unit), total)| ShoppingListEntry {
            name,
            measurement_unit,
            total,
        })
        .collect()
}

pub fn render_shopping_list(entries: &[ShoppingListEntry]) -> String {
    entries.iter().fold(
        String::from(SHOPPING_LIST_HEADER),
        |mut s, entry| {
            s += &format!(
                "\n{} ({}) - {}",
                entry.name, entry.measurement_unit, entry.total
            );
            s
        },
    )
}

/// An empty cart yields an empty list rather than an error.
pub async fn build_shopping_list(
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<ShoppingListEntry>, ServiceError> {
    let rows = list_cart_ingredients(user_id, pool).await?;
    let entries = aggregate_ingredients(rows);

    log::debug!(
        "> Shopping list for user {user_id} has {} entries",
        entries.len()
    );

    Ok(entries)
}

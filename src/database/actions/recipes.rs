use sqlx::{Pool, Postgres, QueryBuilder, Transaction};

use crate::{
    authentication::permissions::ActionType,
    error::{violated_constraint, Constraint, ServiceError},
    form::RecipeFilter,
    jwt::SessionData,
    pagination::{split_counted_rows, PageContext},
    schema::{Recipe, RecipeRecord, RecipeShort, RelationKind, Uuid},
    validation::{RecipeForm, RecipeLimits, ValidatedRecipe},
};

use super::{get_user_profile, has_relation, list_recipe_ingredients, list_recipe_tags};

pub async fn get_recipe(
    id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Option<RecipeRecord>, ServiceError> {
    let row: Option<RecipeRecord> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn get_recipe_short(
    id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Option<RecipeShort>, ServiceError> {
    let row: Option<RecipeShort> =
        sqlx::query_as("SELECT id, name, image, cooking_time FROM recipes WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

    Ok(row)
}

/// Loads a recipe the session is allowed to modify: its author, or anyone
/// allowed to manage all recipes.
pub async fn get_recipe_mut(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<RecipeRecord, ServiceError> {
    session.authenticate(ActionType::ManageOwnRecipes)?;

    match get_recipe(id, pool).await? {
        Some(recipe) => {
            if session.owns_or_manages(recipe.author_id, ActionType::ManageAllRecipes) {
                Ok(recipe)
            } else {
                Err(ServiceError::PermissionDenied)
            }
        }
        None => Err(ServiceError::not_found("Recipe not found")),
    }
}

/// Full read projection of a recipe as seen by `viewer`.
pub async fn get_recipe_detail(
    id: Uuid,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<Recipe, ServiceError> {
    let recipe = get_recipe(id, pool)
        .await?
        .ok_or_else(|| ServiceError::not_found("Recipe not found"))?;

    let (is_favorited, is_in_shopping_cart) = match viewer {
        Some(viewer) => (
            has_relation(RelationKind::Favorite, viewer, id, pool).await?,
            has_relation(RelationKind::ShoppingCart, viewer, id, pool).await?,
        ),
        None => (false, false),
    };

    Ok(Recipe {
        id: recipe.id,
        tags: list_recipe_tags(id, pool).await?,
        author: get_user_profile(recipe.author_id, viewer, pool).await?,
        ingredients: list_recipe_ingredients(id, pool).await?,
        is_favorited,
        is_in_shopping_cart,
        name: recipe.name,
        image: recipe.image,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
    })
}

pub async fn fetch_recipes(
    filter: &RecipeFilter,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<Recipe>, ServiceError> {
    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT r.id, COUNT(*) OVER() FROM recipes r WHERE TRUE");

    if let Some(author) = filter.author {
        query.push(" AND r.author_id = ").push_bind(author);
    }

    if !filter.tags.is_empty() {
        query
            .push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(filter.tags.clone())
            .push("))");
    }

    // Relation filters only apply to identified viewers.
    if let Some(viewer) = viewer {
        let relations = [
            (filter.is_favorited, RelationKind::Favorite),
            (filter.is_in_shopping_cart, RelationKind::ShoppingCart),
        ];
        for (_, kind) in relations.iter().filter(|(enabled, _)| *enabled) {
            query
                .push(format!(
                    " AND EXISTS (SELECT 1 FROM {} x WHERE x.recipe_id = r.id AND x.user_id = ",
                    kind.table()
                ))
                .push_bind(viewer)
                .push(")");
        }
    }

    query
        .push(" ORDER BY r.id DESC LIMIT ")
        .push_bind(filter.page.limit)
        .push(" OFFSET ")
        .push_bind(filter.page.offset());

    let rows: Vec<(Uuid, i64)> = query.build_query_as().fetch_all(pool).await?;
    let (ids, total_count) = split_counted_rows(rows, &filter.page)?;

    let mut recipes = Vec::with_capacity(ids.len());
    for id in ids {
        recipes.push(get_recipe_detail(id, viewer, pool).await?);
    }

    Ok(PageContext::from_rows(
        recipes,
        total_count,
        filter.page.limit,
        filter.page.page,
    ))
}

/// Validates and stores a recipe with all of its ingredient and tag rows in a
/// single transaction.
pub async fn create_recipe(
    session: &SessionData,
    form: RecipeForm,
    limits: &RecipeLimits,
    pool: &Pool<Postgres>,
) -> Result<Uuid, ServiceError> {
    session.authenticate(ActionType::ManageOwnRecipes)?;
    let recipe = form.validate(limits)?;

    let mut tr = pool.begin().await?;

    let id: (Uuid,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(session.user_id)
    .bind(&recipe.name)
    .bind(&recipe.image)
    .bind(&recipe.text)
    .bind(recipe.cooking_time)
    .fetch_one(&mut *tr)
    .await?;

    insert_recipe_parts(id.0, &recipe, &mut tr).await?;
    tr.commit().await?;

    log::info!(
        "> User {} created recipe {} with {} ingredients and {} tags",
        session.user_id,
        id.0,
        recipe.ingredients.len(),
        recipe.tags.len()
    );

    Ok(id.0)
}

/// Replaces the scalar fields and every ingredient and tag row of a recipe.
/// Join rows are cleared and recreated, never merged.
pub async fn update_recipe(
    id: Uuid,
    session: &SessionData,
    form: RecipeForm,
    limits: &RecipeLimits,
    pool: &Pool<Postgres>,
) -> Result<(), ServiceError> {
    get_recipe_mut(id, session, pool).await?;
    let recipe = form.validate(limits)?;

    let mut tr = pool.begin().await?;

    let result = sqlx::query(
        "UPDATE recipes SET name = $1, image = $2, text = $3, cooking_time = $4 WHERE id = $5",
    )
    .bind(&recipe.name)
    .bind(&recipe.image)
    .bind(&recipe.text)
    .bind(recipe.cooking_time)
    .bind(id)
    .execute(&mut *tr)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::not_found("Recipe not found"));
    }

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await?;

    insert_recipe_parts(id, &recipe, &mut tr).await?;
    tr.commit().await?;

    log::info!("> User {} updated recipe {id}", session.user_id);

    Ok(())
}

pub async fn delete_recipe(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), ServiceError> {
    get_recipe_mut(id, session, pool).await?;

    // Join rows, favorites and cart entries cascade with the recipe.
    let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::not_found("Recipe not found"));
    }

    log::info!("> User {} deleted recipe {id}", session.user_id);

    Ok(())
}

async fn insert_recipe_parts(
    recipe_id: Uuid,
    recipe: &ValidatedRecipe,
    tr: &mut Transaction<'_, Postgres>,
) -> Result<(), ServiceError> {
    let mut ingredients: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");
    ingredients.push_values(&recipe.ingredients, |mut row, part| {
        row.push_bind(recipe_id)
            .push_bind(part.id)
            .push_bind(part.amount);
    });
    ingredients
        .build()
        .execute(&mut **tr)
        .await
        .map_err(|e| reference_error("ingredients", "Ingredient", e))?;

    let mut tags: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
    tags.push_values(&recipe.tags, |mut row, tag| {
        row.push_bind(recipe_id).push_bind(*tag);
    });
    tags.build()
        .execute(&mut **tr)
        .await
        .map_err(|e| reference_error("tags", "Tag", e))?;

    Ok(())
}

/// Translates integrity errors raised while writing join rows into
/// field-level validation errors.
fn reference_error(field: &'static str, entity: &str, e: sqlx::Error) -> ServiceError {
    match violated_constraint(&e) {
        Some(Constraint::ForeignKey) => {
            ServiceError::validation(field, format!("{entity} does not exist"))
        }
        Some(Constraint::Unique) => {
            ServiceError::validation(field, format!("{entity} is listed more than once"))
        }
        Some(Constraint::Check) => ServiceError::validation(field, "Invalid amount"),
        None => e.into(),
    }
}

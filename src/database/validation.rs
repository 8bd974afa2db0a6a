use std::{collections::HashSet, ops::RangeInclusive};

use serde::Deserialize;

use crate::{
    constants::{MAX_AMOUNT, MAX_COOKING_TIME, MAX_NAME_LENGTH, MIN_AMOUNT, MIN_COOKING_TIME},
    error::ServiceError,
    schema::Uuid,
};

/// Inclusive bounds applied to recipe submissions.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeLimits {
    pub cooking_time: RangeInclusive<i32>,
    pub amount: RangeInclusive<i32>,
}

impl Default for RecipeLimits {
    fn default() -> Self {
        Self {
            cooking_time: MIN_COOKING_TIME..=MAX_COOKING_TIME,
            amount: MIN_AMOUNT..=MAX_AMOUNT,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientAmount {
    pub id: Uuid,
    pub amount: i32,
}

/// Recipe submission as received from a client. Every field defaults so that
/// a missing field is reported by [`RecipeForm::validate`] with its name.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct RecipeForm {
    #[serde(default)]
    pub ingredients: Vec<IngredientAmount>,
    #[serde(default)]
    pub tags: Vec<Uuid>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub cooking_time: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRecipe {
    pub name: String,
    pub text: String,
    pub image: String,
    pub cooking_time: i32,
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<Uuid>,
}

impl RecipeForm {
    pub fn validate(self, limits: &RecipeLimits) -> Result<ValidatedRecipe, ServiceError> {
        let name = self.name.trim().to_owned();
        if name.is_empty() {
            return Err(ServiceError::validation("name", "This field is required"));
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(ServiceError::validation(
                "name",
                format!("Ensure this field has no more than {MAX_NAME_LENGTH} characters"),
            ));
        }

        if self.text.trim().is_empty() {
            return Err(ServiceError::validation("text", "This field is required"));
        }

        let image = match self.image {
            Some(image) if !image.trim().is_empty() => image,
            _ => return Err(ServiceError::validation("image", "Image is required")),
        };

        let cooking_time = self
            .cooking_time
            .ok_or_else(|| ServiceError::validation("cooking_time", "This field is required"))?;
        if !limits.cooking_time.contains(&cooking_time) {
            return Err(ServiceError::validation(
                "cooking_time",
                out_of_bounds(&limits.cooking_time),
            ));
        }

        check_ingredients(&self.ingredients, limits)?;
        check_tags(&self.tags)?;

        Ok(ValidatedRecipe {
            name,
            text: self.text,
            image,
            cooking_time,
            ingredients: self.ingredients,
            tags: self.tags,
        })
    }
}

fn check_ingredients(
    ingredients: &[IngredientAmount],
    limits: &RecipeLimits,
) -> Result<(), ServiceError> {
    if ingredients.is_empty() {
        return Err(ServiceError::validation(
            "ingredients",
            "At least one ingredient is required",
        ));
    }

    let mut seen = HashSet::with_capacity(ingredients.len());
    for part in ingredients {
        if !seen.insert(part.id) {
            return Err(ServiceError::validation(
                "ingredients",
                format!("Ingredient {} is listed more than once", part.id),
            ));
        }
        if !limits.amount.contains(&part.amount) {
            return Err(ServiceError::validation(
                "ingredients",
                format!(
                    "Amount of ingredient {}: {}",
                    part.id,
                    out_of_bounds(&limits.amount)
                ),
            ));
        }
    }

    Ok(())
}

fn check_tags(tags: &[Uuid]) -> Result<(), ServiceError> {
    if tags.is_empty() {
        return Err(ServiceError::validation("tags", "At least one tag is required"));
    }

    let mut seen = HashSet::with_capacity(tags.len());
    if let Some(tag) = tags.iter().find(|tag| !seen.insert(**tag)) {
        return Err(ServiceError::validation(
            "tags",
            format!("Tag {tag} is listed more than once"),
        ));
    }

    Ok(())
}

fn out_of_bounds(range: &RangeInclusive<i32>) -> String {
    format!(
        "Value must be between {} and {}",
        range.start(),
        range.end()
    )
}

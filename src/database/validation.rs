use std::collections::HashSet;

use crate::catalog::{IngredientCatalog, TagCatalog};
use crate::constants::{
    MAX_COOKING_TIME, MAX_INGREDIENT_AMOUNT, MIN_COOKING_TIME, MIN_INGREDIENT_AMOUNT,
    TAG_SLUG_MAX_LENGTH,
};
use crate::error::Error;
use crate::schema::{IngredientAmount, RecipePayload, Uuid};

/// A recipe payload that passed every referential and range check.
/// Ingredient and tag order is the submitted order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRecipe {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: Option<String>,
    pub tags: Vec<Uuid>,
    pub ingredients: Vec<IngredientAmount>,
}

/// Checks a recipe payload against the current catalogs. Pure: read-only
/// lookups, no side effects, fails on the first violation.
pub fn validate_recipe(
    payload: &RecipePayload,
    ingredients: &IngredientCatalog,
    tags: &TagCatalog,
) -> Result<ValidatedRecipe, Error> {
    if payload.ingredients.is_empty() {
        return Err(Error::MissingField("ingredients"));
    }

    let mut seen: HashSet<Uuid> = HashSet::new();
    for entry in payload.ingredients.iter() {
        if ingredients.find(entry.id).is_none() {
            return Err(Error::NotFound {
                entity: "ingredient",
                id: Some(entry.id),
            });
        }
        if !seen.insert(entry.id) {
            return Err(Error::DuplicateEntry("ingredients"));
        }
        if entry.amount < MIN_INGREDIENT_AMOUNT || entry.amount > MAX_INGREDIENT_AMOUNT {
            return Err(Error::OutOfRange {
                field: "amount",
                min: MIN_INGREDIENT_AMOUNT,
                max: MAX_INGREDIENT_AMOUNT,
            });
        }
    }

    // Set-vs-list length mismatch signals a repeated tag.
    let tag_set: HashSet<Uuid> = payload.tags.iter().copied().collect();
    if tag_set.len() != payload.tags.len() {
        return Err(Error::DuplicateEntry("tags"));
    }
    for tag_id in payload.tags.iter() {
        if tags.find(*tag_id).is_none() {
            return Err(Error::NotFound {
                entity: "tag",
                id: Some(*tag_id),
            });
        }
    }

    if payload.cooking_time < MIN_COOKING_TIME || payload.cooking_time > MAX_COOKING_TIME {
        return Err(Error::OutOfRange {
            field: "cooking_time",
            min: MIN_COOKING_TIME,
            max: MAX_COOKING_TIME,
        });
    }

    Ok(ValidatedRecipe {
        name: payload.name.clone(),
        text: payload.text.clone(),
        cooking_time: payload.cooking_time,
        image: payload.image.clone(),
        tags: payload.tags.clone(),
        ingredients: payload.ingredients.clone(),
    })
}

/// Tag colors are hex codes of the `#RRGGBB` form.
pub fn validate_tag_color(color: &str) -> Result<(), Error> {
    let rest = match color.strip_prefix('#') {
        Some(rest) => rest,
        None => return Err(Error::InvalidType("color")),
    };
    if rest.len() != 6 || !rest.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::InvalidType("color"));
    }
    Ok(())
}

/// Tag slugs are URL-safe: latin letters, digits, `-` and `_`.
pub fn validate_tag_slug(slug: &str) -> Result<(), Error> {
    if slug.is_empty() || slug.len() > TAG_SLUG_MAX_LENGTH {
        return Err(Error::InvalidType("slug"));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(Error::InvalidType("slug"));
    }
    Ok(())
}

/// Self-follow guard, checked before any row is written.
pub fn ensure_not_self(user_id: Uuid, author_id: Uuid) -> Result<(), Error> {
    if user_id == author_id {
        return Err(Error::SelfReferenceNotAllowed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Ingredient, Tag};

    fn ingredient_catalog() -> IngredientCatalog {
        IngredientCatalog::from_rows(vec![
            Ingredient {
                id: 1,
                name: "flour".to_string(),
                measurement_unit: "g".to_string(),
            },
            Ingredient {
                id: 2,
                name: "milk".to_string(),
                measurement_unit: "ml".to_string(),
            },
            Ingredient {
                id: 3,
                name: "egg".to_string(),
                measurement_unit: "pcs".to_string(),
            },
        ])
    }

    fn tag_catalog() -> TagCatalog {
        TagCatalog::from_rows(vec![
            Tag {
                id: 10,
                name: "breakfast".to_string(),
                color: "#E26C2D".to_string(),
                slug: "breakfast".to_string(),
            },
            Tag {
                id: 11,
                name: "dinner".to_string(),
                color: "#49B64E".to_string(),
                slug: "dinner".to_string(),
            },
        ])
    }

    fn payload() -> RecipePayload {
        RecipePayload {
            name: "Pancakes".to_string(),
            text: "Mix and fry".to_string(),
            cooking_time: 20,
            image: None,
            tags: vec![11, 10],
            ingredients: vec![
                IngredientAmount { id: 2, amount: 300 },
                IngredientAmount { id: 1, amount: 200 },
                IngredientAmount { id: 3, amount: 2 },
            ],
        }
    }

    #[test]
    fn accepts_valid_payload_and_preserves_order() {
        let validated =
            validate_recipe(&payload(), &ingredient_catalog(), &tag_catalog()).unwrap();

        assert_eq!(validated.tags, vec![11, 10]);
        assert_eq!(
            validated
                .ingredients
                .iter()
                .map(|e| e.id)
                .collect::<Vec<_>>(),
            vec![2, 1, 3]
        );
    }

    #[test]
    fn rejects_empty_ingredients_list() {
        let mut payload = payload();
        payload.ingredients.clear();

        let err = validate_recipe(&payload, &ingredient_catalog(), &tag_catalog()).unwrap_err();
        assert!(matches!(err, Error::MissingField("ingredients")));
    }

    #[test]
    fn rejects_unknown_ingredient() {
        let mut payload = payload();
        payload.ingredients[0].id = 99;

        let err = validate_recipe(&payload, &ingredient_catalog(), &tag_catalog()).unwrap_err();
        assert!(matches!(
            err,
            Error::NotFound {
                entity: "ingredient",
                id: Some(99)
            }
        ));
    }

    #[test]
    fn rejects_repeated_ingredient() {
        let mut payload = payload();
        payload.ingredients[2].id = 2;

        let err = validate_recipe(&payload, &ingredient_catalog(), &tag_catalog()).unwrap_err();
        assert!(matches!(err, Error::DuplicateEntry("ingredients")));
    }

    #[test]
    fn rejects_non_positive_amount() {
        for amount in [0, -5] {
            let mut payload = payload();
            payload.ingredients[0].amount = amount;

            let err =
                validate_recipe(&payload, &ingredient_catalog(), &tag_catalog()).unwrap_err();
            assert!(matches!(err, Error::OutOfRange { field: "amount", .. }));
        }
    }

    #[test]
    fn rejects_repeated_tag() {
        let mut payload = payload();
        payload.tags = vec![10, 11, 10];

        let err = validate_recipe(&payload, &ingredient_catalog(), &tag_catalog()).unwrap_err();
        assert!(matches!(err, Error::DuplicateEntry("tags")));
    }

    #[test]
    fn rejects_unknown_tag() {
        let mut payload = payload();
        payload.tags = vec![42];

        let err = validate_recipe(&payload, &ingredient_catalog(), &tag_catalog()).unwrap_err();
        assert!(matches!(
            err,
            Error::NotFound {
                entity: "tag",
                id: Some(42)
            }
        ));
    }

    #[test]
    fn rejects_cooking_time_outside_bounds() {
        for cooking_time in [0, 3601] {
            let mut payload = payload();
            payload.cooking_time = cooking_time;

            let err =
                validate_recipe(&payload, &ingredient_catalog(), &tag_catalog()).unwrap_err();
            assert!(matches!(
                err,
                Error::OutOfRange {
                    field: "cooking_time",
                    ..
                }
            ));
        }
    }

    #[test]
    fn tag_color_pattern() {
        assert!(validate_tag_color("#E26C2D").is_ok());
        assert!(validate_tag_color("E26C2D").is_err());
        assert!(validate_tag_color("#E26C2").is_err());
        assert!(validate_tag_color("#E26C2DD").is_err());
        assert!(validate_tag_color("#GGGGGG").is_err());
    }

    #[test]
    fn tag_slug_pattern() {
        assert!(validate_tag_slug("new-year_2022").is_ok());
        assert!(validate_tag_slug("").is_err());
        assert!(validate_tag_slug("с-новым-годом").is_err());
        assert!(validate_tag_slug(&"x".repeat(51)).is_err());
    }

    #[test]
    fn self_follow_is_rejected_for_any_user() {
        for id in [1, 7, 1000] {
            assert!(matches!(
                ensure_not_self(id, id),
                Err(Error::SelfReferenceNotAllowed)
            ));
        }
        assert!(ensure_not_self(1, 2).is_ok());
    }
}

use sqlx::{Pool, Postgres};

use crate::error::{Error, QueryError};
use crate::schema::{CartIngredientRow, Uuid};
use crate::shopping_list::ShoppingList;

use super::recipes::get_recipe;

pub async fn in_shopping_cart(
    recipe_id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        "SELECT recipe_id FROM shopping_carts WHERE recipe_id = $1 AND user_id = $2",
    )
    .bind(recipe_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row.is_some())
}

pub async fn add_to_cart(
    recipe_id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    if get_recipe(recipe_id, pool).await?.is_none() {
        return Err(Error::NotFound {
            entity: "recipe",
            id: Some(recipe_id),
        });
    }

    let result = sqlx::query(
        "INSERT INTO shopping_carts (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(Error::DuplicateEntry("shopping cart entry"));
    }

    Ok(())
}

pub async fn remove_from_cart(
    recipe_id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM shopping_carts WHERE user_id = $1 AND recipe_id = $2")
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(Error::Conflict("shopping cart entry"));
    }

    Ok(())
}

pub async fn list_cart_recipe_ids(
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<Uuid>, Error> {
    let rows: Vec<(Uuid,)> =
        sqlx::query_as("SELECT recipe_id FROM shopping_carts WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|r| r.0).collect())
}

/// Walks every cart entry of the user, joins to the recipes' ingredient
/// lines and folds them into one consolidated list. An empty cart comes
/// back as [`ShoppingList::Empty`], not as an empty report.
pub async fn build_shopping_list(
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<ShoppingList, Error> {
    let cart = list_cart_recipe_ids(user_id, pool).await?;
    if cart.is_empty() {
        return Ok(ShoppingList::Empty);
    }

    let rows: Vec<CartIngredientRow> = sqlx::query_as(
        "
        SELECT i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM shopping_carts sc
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE sc.user_id = $1
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(ShoppingList::from_cart(cart.len(), rows))
}

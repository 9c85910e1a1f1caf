use sqlx::{Pool, Postgres};

use crate::constants::INGREDIENT_COUNT_PER_PAGE;
use crate::error::{Error, QueryError};
use crate::pagination::PageContext;
use crate::schema::{Ingredient, IngredientRow, Uuid};

/// Creates a catalog ingredient. The (name, measurement_unit) pair is
/// unique; the name alone is not.
pub async fn create_ingredient(
    name: &str,
    measurement_unit: &str,
    pool: &Pool<Postgres>,
) -> Result<Uuid, Error> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        "
        INSERT INTO ingredients (name, measurement_unit)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING RETURNING id
    ",
    )
    .bind(name)
    .bind(measurement_unit)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    match row {
        Some(row) => Ok(row.0),
        None => Err(Error::DuplicateEntry("ingredient")),
    }
}

pub async fn get_ingredient(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Ingredient>, Error> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn list_ingredients(pool: &Pool<Postgres>) -> Result<Vec<Ingredient>, Error> {
    let rows: Vec<Ingredient> = sqlx::query_as("SELECT * FROM ingredients ORDER BY name")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(rows)
}

/// Prefix search used by the recipe form's ingredient picker.
pub async fn search_ingredients(
    prefix: &str,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<PageContext<IngredientRow>, Error> {
    let rows: Vec<IngredientRow> = sqlx::query_as(
        "
        SELECT i.*, COUNT(*) OVER() AS count FROM ingredients i
        WHERE i.name ILIKE $1
        ORDER BY i.name LIMIT $2 OFFSET $3
    ",
    )
    .bind(format!("{prefix}%"))
    .bind(INGREDIENT_COUNT_PER_PAGE)
    .bind(offset)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.get(0).map(|p| p.count).unwrap_or(0);
    let page = PageContext::from_rows(rows, total_count, INGREDIENT_COUNT_PER_PAGE, offset);
    Ok(page)
}

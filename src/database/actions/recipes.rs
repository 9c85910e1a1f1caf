use sqlx::{Pool, Postgres, QueryBuilder, Transaction};

use crate::constants::RECIPE_COUNT_PER_PAGE;
use crate::error::{Error, QueryError};
use crate::pagination::PageContext;
use crate::schema::{Recipe, RecipeAggregate, RecipeIngredientLine, RecipeRow, Tag, User, Uuid};
use crate::validation::ValidatedRecipe;

/// Persists a new recipe with its tag and ingredient links in one
/// transaction. Either the whole aggregate commits or nothing does.
pub async fn create_recipe(
    author_id: Uuid,
    recipe: &ValidatedRecipe,
    pool: &Pool<Postgres>,
) -> Result<Uuid, Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let row: (Uuid,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, text, image, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(&recipe.name)
    .bind(&recipe.text)
    .bind(&recipe.image)
    .bind(recipe.cooking_time)
    .fetch_one(&mut *tr)
    .await
    .map_err(map_write_error)?;

    let recipe_id = row.0;
    insert_recipe_links(&mut tr, recipe_id, recipe).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    log::debug!("created recipe {recipe_id} by user {author_id}");
    Ok(recipe_id)
}

/// Overwrites the scalar fields and replaces both link relations wholesale:
/// delete every existing link row, then bulk-insert the validated set. The
/// surrounding transaction keeps the empty intermediate state invisible.
///
/// Returns nothing on purpose; callers that answer with the updated recipe
/// follow up with [`get_recipe_aggregate`], which reflects the replaced
/// link set once this commit has landed.
pub async fn update_recipe(
    recipe_id: Uuid,
    recipe: &ValidatedRecipe,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let result = sqlx::query(
        "UPDATE recipes SET name = $1, text = $2, image = $3, cooking_time = $4 WHERE id = $5",
    )
    .bind(&recipe.name)
    .bind(&recipe.text)
    .bind(&recipe.image)
    .bind(recipe.cooking_time)
    .bind(recipe_id)
    .execute(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound {
            entity: "recipe",
            id: Some(recipe_id),
        });
    }

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    insert_recipe_links(&mut tr, recipe_id, recipe).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    log::debug!("replaced links of recipe {recipe_id}");
    Ok(())
}

/// The exact link rows a validated payload maps to. Building them is
/// deterministic, so a repeated full replace lands on the same set.
pub fn link_rows(
    recipe_id: Uuid,
    recipe: &ValidatedRecipe,
) -> (Vec<(Uuid, Uuid)>, Vec<(Uuid, Uuid, i32)>) {
    let tag_links = recipe
        .tags
        .iter()
        .map(|tag_id| (recipe_id, *tag_id))
        .collect();
    let ingredient_links = recipe
        .ingredients
        .iter()
        .map(|entry| (recipe_id, entry.id, entry.amount))
        .collect();

    (tag_links, ingredient_links)
}

async fn insert_recipe_links(
    tr: &mut Transaction<'_, Postgres>,
    recipe_id: Uuid,
    recipe: &ValidatedRecipe,
) -> Result<(), Error> {
    let (tag_links, ingredient_links) = link_rows(recipe_id, recipe);

    if !tag_links.is_empty() {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");

        query_builder.push_values(tag_links.iter(), |mut b, (recipe_id, tag_id)| {
            b.push_bind(*recipe_id).push_bind(*tag_id);
        });

        query_builder
            .build()
            .execute(&mut **tr)
            .await
            .map_err(map_write_error)?;
    }

    if !ingredient_links.is_empty() {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");

        query_builder.push_values(
            ingredient_links.iter(),
            |mut b, (recipe_id, ingredient_id, amount)| {
                b.push_bind(*recipe_id)
                    .push_bind(*ingredient_id)
                    .push_bind(*amount);
            },
        );

        query_builder
            .build()
            .execute(&mut **tr)
            .await
            .map_err(map_write_error)?;
    }

    Ok(())
}

/// A catalog row deleted between validation and the link insert shows up as
/// a foreign-key violation here; report it as a missing reference so the
/// caller rolls back instead of answering with a server error.
fn map_write_error(e: sqlx::Error) -> Error {
    match e.as_database_error().and_then(|db| db.code()) {
        Some(code) if code == "23503" => Error::NotFound {
            entity: "referenced catalog entry",
            id: None,
        },
        Some(code) if code == "23505" => Error::DuplicateEntry("recipe links"),
        _ => QueryError::from(e).into(),
    }
}

pub async fn get_recipe(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Recipe>, Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn find_recipe(name: &str, pool: &Pool<Postgres>) -> Result<Option<Uuid>, Error> {
    let row: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM recipes WHERE LOWER(name) = LOWER($1)")
            .bind(name)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(row.map(|r| r.0))
}

pub async fn list_recipe_ingredients(
    pool: &Pool<Postgres>,
    recipe_id: Uuid,
) -> Result<Vec<RecipeIngredientLine>, Error> {
    let rows: Vec<RecipeIngredientLine> = sqlx::query_as(
        "
        SELECT ri.recipe_id AS recipe_id, i.id AS ingredient_id, i.name AS name,
               i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = $1
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn list_recipe_tags(pool: &Pool<Postgres>, recipe_id: Uuid) -> Result<Vec<Tag>, Error> {
    let rows: Vec<Tag> = sqlx::query_as(
        "
        SELECT t.*
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = $1
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

/// Loads a recipe with its author, tags and ingredient lines eagerly.
pub async fn get_recipe_aggregate(
    id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<RecipeAggregate, Error> {
    let recipe = match get_recipe(id, pool).await? {
        Some(recipe) => recipe,
        None => {
            return Err(Error::NotFound {
                entity: "recipe",
                id: Some(id),
            })
        }
    };

    let author: Option<User> = sqlx::query_as(
        "SELECT id, username, email, first_name, last_name FROM users WHERE id = $1",
    )
    .bind(recipe.author_id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    let author = match author {
        Some(author) => author,
        None => {
            return Err(Error::NotFound {
                entity: "user",
                id: Some(recipe.author_id),
            })
        }
    };

    let tags = list_recipe_tags(pool, id).await?;
    let ingredients = list_recipe_ingredients(pool, id).await?;

    Ok(RecipeAggregate {
        id: recipe.id,
        name: recipe.name,
        text: recipe.text,
        author,
        image: recipe.image,
        cooking_time: recipe.cooking_time,
        pub_date: recipe.pub_date,
        tags,
        ingredients,
    })
}

/// Deletes a recipe and everything hanging off it.
/// ATTENTION: DOES NOT CHECK FOR OWNERSHIP BY ITSELF
pub async fn delete_recipe(id: Uuid, pool: &Pool<Postgres>) -> Result<(), Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    sqlx::query("DELETE FROM favorites WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    sqlx::query("DELETE FROM shopping_carts WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound {
            entity: "recipe",
            id: Some(id),
        });
    }

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    Ok(())
}

pub async fn fetch_recipes(
    author: Option<Uuid>,
    tag_slug: Option<String>,
    search: String,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeRow>, Error> {
    let rows: Vec<RecipeRow> = match (author, tag_slug) {
        (Some(author), Some(slug)) => {
            sqlx::query_as("
                SELECT r.*, COUNT(*) OVER() AS count FROM recipes r
                WHERE r.author_id = $1 AND r.name ILIKE $2
                  AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.slug = $3)
                ORDER BY r.pub_date DESC LIMIT $4 OFFSET $5
            ")
                .bind(author)
                .bind(search)
                .bind(slug)
                .bind(RECIPE_COUNT_PER_PAGE)
                .bind(offset)
                .fetch_all(pool).await.map_err(QueryError::from)?
        }
        (Some(author), None) => {
            sqlx::query_as("
                SELECT r.*, COUNT(*) OVER() AS count FROM recipes r
                WHERE r.author_id = $1 AND r.name ILIKE $2
                ORDER BY r.pub_date DESC LIMIT $3 OFFSET $4
            ")
                .bind(author)
                .bind(search)
                .bind(RECIPE_COUNT_PER_PAGE)
                .bind(offset)
                .fetch_all(pool).await.map_err(QueryError::from)?
        }
        (None, Some(slug)) => {
            sqlx::query_as("
                SELECT r.*, COUNT(*) OVER() AS count FROM recipes r
                WHERE r.name ILIKE $1
                  AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.slug = $2)
                ORDER BY r.pub_date DESC LIMIT $3 OFFSET $4
            ")
                .bind(search)
                .bind(slug)
                .bind(RECIPE_COUNT_PER_PAGE)
                .bind(offset)
                .fetch_all(pool).await.map_err(QueryError::from)?
        }
        (None, None) => {
            sqlx::query_as("
                SELECT r.*, COUNT(*) OVER() AS count FROM recipes r
                WHERE r.name ILIKE $1
                ORDER BY r.pub_date DESC LIMIT $2 OFFSET $3
            ")
                .bind(search)
                .bind(RECIPE_COUNT_PER_PAGE)
                .bind(offset)
                .fetch_all(pool).await.map_err(QueryError::from)?
        }
    };

    let total_count = rows.get(0).map(|p| p.count).unwrap_or(0);
    let page = PageContext::from_rows(rows, total_count, RECIPE_COUNT_PER_PAGE, offset);
    Ok(page)
}

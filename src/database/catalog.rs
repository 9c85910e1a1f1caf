use std::collections::HashMap;

use sqlx::{Pool, Postgres};

use crate::error::{Error, QueryError};
use crate::schema::{Ingredient, Tag, Uuid};

/// Read-only ingredient reference table. Loaded once from the database and
/// handed to the validator, so validation stays a pure lookup.
#[derive(Debug, Clone, Default)]
pub struct IngredientCatalog {
    by_id: HashMap<Uuid, Ingredient>,
}

impl IngredientCatalog {
    pub async fn load(pool: &Pool<Postgres>) -> Result<Self, Error> {
        let rows: Vec<Ingredient> = sqlx::query_as("SELECT * FROM ingredients")
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?;

        Ok(Self::from_rows(rows))
    }

    pub fn from_rows(rows: Vec<Ingredient>) -> Self {
        let by_id = rows.into_iter().map(|row| (row.id, row)).collect();
        Self { by_id }
    }

    pub fn find(&self, id: Uuid) -> Option<&Ingredient> {
        self.by_id.get(&id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Read-only tag reference table, same lifecycle as [`IngredientCatalog`].
#[derive(Debug, Clone, Default)]
pub struct TagCatalog {
    by_id: HashMap<Uuid, Tag>,
}

impl TagCatalog {
    pub async fn load(pool: &Pool<Postgres>) -> Result<Self, Error> {
        let rows: Vec<Tag> = sqlx::query_as("SELECT * FROM tags")
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?;

        Ok(Self::from_rows(rows))
    }

    pub fn from_rows(rows: Vec<Tag>) -> Self {
        let by_id = rows.into_iter().map(|row| (row.id, row)).collect();
        Self { by_id }
    }

    pub fn find(&self, id: Uuid) -> Option<&Tag> {
        self.by_id.get(&id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

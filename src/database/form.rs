use std::collections::HashMap;

use serde_json::Value;

use crate::error::Error;
use crate::schema::{IngredientAmount, RecipePayload, Uuid};

pub type FormData = HashMap<String, Value>;

/// Loose request payload. Field values arrive as `serde_json::Value` and are
/// coerced into the canonical shapes here; everything downstream works with
/// `RecipePayload` only.
pub struct Form {
    inner: HashMap<String, Value>,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    pub fn get_str(&self, key: &'static str) -> Result<String, Error> {
        match self.inner.get(key) {
            Some(value) => match value.as_str() {
                Some(v) => Ok(v.to_string()),
                None => Err(Error::InvalidType(key)),
            },
            None => Err(Error::MissingField(key)),
        }
    }

    pub fn get_opt_str(&self, key: &'static str) -> Option<String> {
        self.inner
            .get(key)
            .and_then(|value| value.as_str())
            .map(|v| v.to_string())
    }

    /// Integers may be submitted as JSON numbers or as numeric strings.
    pub fn get_int(&self, key: &'static str) -> Result<i64, Error> {
        match self.inner.get(key) {
            Some(value) => coerce_int(value, key),
            None => Err(Error::MissingField(key)),
        }
    }

    pub fn get_array(&self, key: &'static str) -> Result<&Vec<Value>, Error> {
        match self.inner.get(key) {
            Some(value) => match value.as_array() {
                Some(v) => Ok(v),
                None => Err(Error::InvalidType(key)),
            },
            None => Err(Error::MissingField(key)),
        }
    }
}

fn coerce_int(value: &Value, key: &'static str) -> Result<i64, Error> {
    match value {
        Value::Number(n) => n.as_i64().ok_or(Error::InvalidType(key)),
        Value::String(s) => s.parse().map_err(|_e| Error::InvalidType(key)),
        _ => Err(Error::InvalidType(key)),
    }
}

/// Ids, amounts and cooking times are 32-bit columns; anything wider is
/// not a valid value for the field, never silently truncated.
fn narrow(value: i64, key: &'static str) -> Result<i32, Error> {
    i32::try_from(value).map_err(|_e| Error::InvalidType(key))
}

/// Parses the canonical recipe payload out of loosely-typed form data:
/// `{ name, text, cooking_time, image?, tags: [id], ingredients: [{id, amount}] }`.
pub fn parse_recipe_form(data: FormData) -> Result<RecipePayload, Error> {
    let form = Form::from_data(data);

    let name = form.get_str("name")?;
    let text = form.get_str("text")?;
    let cooking_time = narrow(form.get_int("cooking_time")?, "cooking_time")?;
    let image = form.get_opt_str("image");

    let tags = form
        .get_array("tags")?
        .iter()
        .map(|value| coerce_int(value, "tags").and_then(|id| narrow(id, "tags")))
        .collect::<Result<Vec<Uuid>, Error>>()?;

    let ingredients = form
        .get_array("ingredients")?
        .iter()
        .map(parse_ingredient_entry)
        .collect::<Result<Vec<IngredientAmount>, Error>>()?;

    Ok(RecipePayload {
        name,
        text,
        cooking_time,
        image,
        tags,
        ingredients,
    })
}

fn parse_ingredient_entry(value: &Value) -> Result<IngredientAmount, Error> {
    let entry = match value.as_object() {
        Some(entry) => entry,
        None => return Err(Error::InvalidType("ingredients")),
    };

    let id = match entry.get("id") {
        Some(id) => narrow(coerce_int(id, "id")?, "id")?,
        None => return Err(Error::MissingField("id")),
    };
    let amount = match entry.get("amount") {
        Some(amount) => narrow(coerce_int(amount, "amount")?, "amount")?,
        None => return Err(Error::MissingField("amount")),
    };

    Ok(IngredientAmount { id, amount })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form_data(value: Value) -> FormData {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn parses_canonical_payload() {
        let payload = parse_recipe_form(form_data(json!({
            "name": "Borscht",
            "text": "Simmer and serve with sour cream",
            "cooking_time": 90,
            "tags": [1, 2],
            "ingredients": [
                { "id": 3, "amount": 500 },
                { "id": 4, "amount": 2 },
            ],
        })))
        .unwrap();

        assert_eq!(payload.name, "Borscht");
        assert_eq!(payload.cooking_time, 90);
        assert_eq!(payload.image, None);
        assert_eq!(payload.tags, vec![1, 2]);
        assert_eq!(payload.ingredients[1], IngredientAmount { id: 4, amount: 2 });
    }

    #[test]
    fn coerces_numeric_strings() {
        let payload = parse_recipe_form(form_data(json!({
            "name": "Tea",
            "text": "Boil",
            "cooking_time": "5",
            "tags": [],
            "ingredients": [{ "id": "1", "amount": "200" }],
        })))
        .unwrap();

        assert_eq!(payload.cooking_time, 5);
        assert_eq!(payload.ingredients[0].amount, 200);
    }

    #[test]
    fn missing_ingredients_list_is_reported() {
        let err = parse_recipe_form(form_data(json!({
            "name": "Tea",
            "text": "Boil",
            "cooking_time": 5,
            "tags": [],
        })))
        .unwrap_err();

        assert!(matches!(err, Error::MissingField("ingredients")));
    }

    #[test]
    fn entry_without_amount_is_reported() {
        let err = parse_recipe_form(form_data(json!({
            "name": "Tea",
            "text": "Boil",
            "cooking_time": 5,
            "tags": [],
            "ingredients": [{ "id": 1 }],
        })))
        .unwrap_err();

        assert!(matches!(err, Error::MissingField("amount")));
    }

    #[test]
    fn integers_wider_than_their_column_are_type_errors() {
        // 2^32 + 1 would wrap to cooking_time = 1 under a plain cast.
        let err = parse_recipe_form(form_data(json!({
            "name": "Tea",
            "text": "Boil",
            "cooking_time": 4_294_967_297i64,
            "tags": [],
            "ingredients": [{ "id": 1, "amount": 200 }],
        })))
        .unwrap_err();
        assert!(matches!(err, Error::InvalidType("cooking_time")));

        // 2^32 + 200 would wrap to amount = 200.
        let err = parse_recipe_form(form_data(json!({
            "name": "Tea",
            "text": "Boil",
            "cooking_time": 5,
            "tags": [],
            "ingredients": [{ "id": 1, "amount": 4_294_967_496i64 }],
        })))
        .unwrap_err();
        assert!(matches!(err, Error::InvalidType("amount")));

        let err = parse_recipe_form(form_data(json!({
            "name": "Tea",
            "text": "Boil",
            "cooking_time": 5,
            "tags": [4_294_967_297i64],
            "ingredients": [{ "id": 1, "amount": 200 }],
        })))
        .unwrap_err();
        assert!(matches!(err, Error::InvalidType("tags")));
    }

    #[test]
    fn non_numeric_amount_is_a_type_error() {
        let err = parse_recipe_form(form_data(json!({
            "name": "Tea",
            "text": "Boil",
            "cooking_time": 5,
            "tags": [],
            "ingredients": [{ "id": 1, "amount": "a lot" }],
        })))
        .unwrap_err();

        assert!(matches!(err, Error::InvalidType("amount")));
    }
}

use std::collections::BTreeMap;

use serde::Serialize;

use crate::constants::SHOPPING_LIST_HEADER;
use crate::schema::{CartIngredientRow, ShoppingListItem};

/// Aggregated shopping list for one user's cart. `Empty` means the cart has
/// no entries at all, which callers present differently from a list that
/// merely produced no lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ShoppingList {
    Empty,
    Items(Vec<ShoppingListItem>),
}

impl ShoppingList {
    /// Folds the cart-joined ingredient lines into one entry per
    /// (name, measurement unit) pair, summing amounts. Grouping is by
    /// name and unit rather than ingredient id on purpose: catalog rows
    /// that share both are the same thing to a shopper.
    pub fn from_cart(cart_len: usize, rows: Vec<CartIngredientRow>) -> Self {
        if cart_len == 0 {
            return ShoppingList::Empty;
        }

        let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
        for row in rows {
            *totals
                .entry((row.name, row.measurement_unit))
                .or_insert(0) += row.amount as i64;
        }

        let items = totals
            .into_iter()
            .map(|((name, measurement_unit), total_amount)| ShoppingListItem {
                name,
                measurement_unit,
                total_amount,
            })
            .collect();

        ShoppingList::Items(items)
    }

    pub fn is_empty_cart(&self) -> bool {
        matches!(self, ShoppingList::Empty)
    }

    /// Renders the downloadable report: fixed header, then one line per
    /// entry as `<name> - <amount>(<unit>)`, in ascending name order.
    pub fn render(&self) -> Option<String> {
        let items = match self {
            ShoppingList::Empty => return None,
            ShoppingList::Items(items) => items,
        };

        let mut out = String::from(SHOPPING_LIST_HEADER);
        out.push('\n');
        for item in items {
            out.push_str(&format!(
                "{} - {}({})\n",
                item.name, item.total_amount, item.measurement_unit
            ));
        }

        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, unit: &str, amount: i32) -> CartIngredientRow {
        CartIngredientRow {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    #[test]
    fn sums_same_ingredient_across_recipes() {
        let list = ShoppingList::from_cart(2, vec![row("flour", "g", 200), row("flour", "g", 300)]);

        assert_eq!(
            list,
            ShoppingList::Items(vec![ShoppingListItem {
                name: "flour".to_string(),
                measurement_unit: "g".to_string(),
                total_amount: 500,
            }])
        );
    }

    #[test]
    fn groups_by_name_and_unit_not_id() {
        // Two catalog rows named "salt"/"g" merge; "salt"/"tsp" stays apart.
        let list = ShoppingList::from_cart(
            2,
            vec![row("salt", "g", 5), row("salt", "g", 3), row("salt", "tsp", 1)],
        );

        match list {
            ShoppingList::Items(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0].total_amount, 8);
                assert_eq!(items[1].measurement_unit, "tsp");
            }
            ShoppingList::Empty => panic!("expected items"),
        }
    }

    #[test]
    fn orders_entries_by_name_ascending() {
        let list = ShoppingList::from_cart(
            1,
            vec![row("sugar", "g", 50), row("butter", "g", 100), row("milk", "ml", 200)],
        );

        match list {
            ShoppingList::Items(items) => {
                let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
                assert_eq!(names, vec!["butter", "milk", "sugar"]);
            }
            ShoppingList::Empty => panic!("expected items"),
        }
    }

    #[test]
    fn empty_cart_is_a_marker_not_an_empty_list() {
        let list = ShoppingList::from_cart(0, vec![]);
        assert!(list.is_empty_cart());
        assert_ne!(list, ShoppingList::Items(vec![]));
        assert_eq!(list.render(), None);
    }

    #[test]
    fn cart_with_no_lines_still_renders_a_report() {
        // Recipes without ingredient lines cannot exist past validation, but
        // the aggregate stays well defined either way.
        let list = ShoppingList::from_cart(1, vec![]);
        assert_eq!(list, ShoppingList::Items(vec![]));
        assert!(list.render().is_some());
    }

    #[test]
    fn renders_header_and_line_format() {
        let list = ShoppingList::from_cart(2, vec![row("flour", "g", 500), row("milk", "ml", 200)]);

        assert_eq!(
            list.render().unwrap(),
            "Shopping list:\nflour - 500(g)\nmilk - 200(ml)\n"
        );
    }
}

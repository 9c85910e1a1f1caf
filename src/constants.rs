pub const RECIPE_COUNT_PER_PAGE: i64 = 10;
pub const INGREDIENT_COUNT_PER_PAGE: i64 = 100;

pub const MIN_COOKING_TIME: i32 = 1;
pub const MAX_COOKING_TIME: i32 = 3600;

pub const MIN_INGREDIENT_AMOUNT: i32 = 1;
pub const MAX_INGREDIENT_AMOUNT: i32 = 10000;

pub const TAG_SLUG_MAX_LENGTH: usize = 50;

pub const SHOPPING_LIST_FILE_NAME: &str = "shopping_list.txt";
pub const SHOPPING_LIST_HEADER: &str = "Shopping list:";

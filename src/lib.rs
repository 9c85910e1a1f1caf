mod database {
    pub mod actions;
    pub mod catalog;
    pub mod error;
    pub mod form;
    pub mod pagination;
    pub mod schema;
    pub mod shopping_list;
    pub mod validation;
}
mod constants;

pub use constants::*;
pub use database::*;

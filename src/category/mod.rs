//! Categories and subcategories for grouping transactions.

mod create;
mod db;
mod delete;
mod domain;
mod edit;
mod limits;
mod list;
mod sync;

pub use create::create_category_endpoint;
pub use db::{
    create_category, create_category_tables, delete_category, get_all_categories,
    get_categories_by_nature, get_category,
};
pub(crate) use db::{
    find_category_by_name, find_subcategory_by_name, get_subcategory, insert_category,
    insert_subcategory,
};
pub use delete::delete_category_endpoint;
pub use domain::{
    Category, CategoryId, CategoryName, CategoryNature, CategoryUpdate, NewCategory, Subcategory,
    SubcategoryId, SubcategoryUpdate,
};
pub use edit::update_category_endpoint;
pub use limits::{
    LimitsCategory, LimitsSubcategory, LimitsUpdate, LimitsUpdateSummary, apply_limits_update,
    get_limits_endpoint, update_limits_endpoint,
};
pub use list::{get_category_endpoint, list_categories_endpoint};
pub use sync::update_category;

#[cfg(test)]
pub(crate) use db::test_utils;

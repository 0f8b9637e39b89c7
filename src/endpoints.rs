//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/categories/{category_id}', use [format_endpoint].

use std::fmt::Display;

/// The root route which returns a short service banner.
pub const ROOT: &str = "/";
/// The route for checking that the server is up.
pub const HEALTH: &str = "/health";

/// The route to list and create categories.
pub const CATEGORIES: &str = "/api/categories";
/// The route to access a single category.
pub const CATEGORY: &str = "/api/categories/{category_id}";
/// The route to view and bulk update category spending limits.
pub const LIMITS: &str = "/api/limits";

/// The route to list and create transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route to access a single transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route to access all installments of a purchase.
pub const TRANSACTION_GROUP: &str = "/api/transactions/groups/{group_id}";

/// The route for expenses grouped by category and subcategory.
pub const SPENDING_BY_CATEGORY: &str = "/api/dashboard/spending-by-category";
/// The route for income grouped by category and subcategory.
pub const INCOME_BY_CATEGORY: &str = "/api/dashboard/income-by-category";
/// The route for the month by month income and expenses of a year.
pub const YEARLY_SUMMARY: &str = "/api/dashboard/yearly-summary";
/// The route for the totals and transactions of a date range.
pub const STATEMENT: &str = "/api/dashboard/statement";
/// The route for the categories available to a nature.
pub const CATEGORY_OPTIONS: &str = "/api/dashboard/category-options";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/api/categories/{category_id}', '{category_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: impl Display) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_string();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|end| param_start + end + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}

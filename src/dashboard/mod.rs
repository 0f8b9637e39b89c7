//! Dashboard module
//!
//! Read-only summaries of the transactions: totals by category, a monthly
//! breakdown of a year, a statement of a period and the category options a
//! client can offer when recording a transaction.

mod aggregation;
mod handlers;
mod transaction;

pub use aggregation::{CategoryTotal, MonthSummary, SubcategoryTotal};
pub use handlers::{
    CategoryOption, CategoryOptions, CategoryTotals, Statement, YearlySummary,
    get_category_options, get_income_by_category, get_spending_by_category, get_statement,
    get_yearly_summary,
};

//! Transaction data aggregation for the dashboard.
//!
//! Provides functions to group transactions by category and subcategory,
//! bucket a year of transactions by month and total a period by transaction
//! type. These are pure functions over already-queried transactions.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use time::Month;

use crate::{
    Amount,
    category::CategoryId,
    dashboard::transaction::CategorizedTransaction,
    transaction::{Transaction, TransactionKind},
};

/// The total of one subcategory within a [CategoryTotal].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubcategoryTotal {
    /// The subcategory name.
    pub name: String,
    /// The sum of the subcategory's transactions.
    pub amount: Amount,
}

/// The total of one category, broken down by subcategory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    /// The category name.
    pub name: String,
    /// The sum of the category's transactions.
    pub total: Amount,
    /// The spending limit configured for the category.
    pub limit: Amount,
    /// The subcategories with a positive total, ordered by name.
    pub subcategories: Vec<SubcategoryTotal>,
}

/// Income and expenses of a single month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthSummary {
    /// The lowercase English month name, e.g. "january".
    pub month: &'static str,
    /// The sum of income transactions due in the month.
    pub income: Amount,
    /// The sum of expense transactions due in the month.
    pub expense: Amount,
}

/// The totals of a period by transaction type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(super) struct PeriodTotals {
    pub income: Amount,
    pub expense: Amount,
    pub invested: Amount,
}

/// Groups transactions by category, then by subcategory, summing amounts.
///
/// Only categories and subcategories with a total greater than zero are
/// returned. Categories are ordered by name.
pub(super) fn group_by_category(transactions: &[CategorizedTransaction]) -> Vec<CategoryTotal> {
    struct Accumulator<'a> {
        name: &'a str,
        limit: Amount,
        total: Amount,
        subcategories: BTreeMap<&'a str, Amount>,
    }

    let mut totals_by_category: HashMap<CategoryId, Accumulator> = HashMap::new();

    for transaction in transactions {
        let accumulator = totals_by_category
            .entry(transaction.category_id)
            .or_insert_with(|| Accumulator {
                name: &transaction.category_name,
                limit: transaction.category_limit,
                total: Amount::ZERO,
                subcategories: BTreeMap::new(),
            });

        accumulator.total += transaction.amount;
        *accumulator
            .subcategories
            .entry(transaction.subcategory_name.as_str())
            .or_default() += transaction.amount;
    }

    let mut category_totals: Vec<CategoryTotal> = totals_by_category
        .into_values()
        .filter(|accumulator| accumulator.total.is_positive())
        .map(|accumulator| CategoryTotal {
            name: accumulator.name.to_owned(),
            total: accumulator.total,
            limit: accumulator.limit,
            subcategories: accumulator
                .subcategories
                .into_iter()
                .filter(|(_, amount)| amount.is_positive())
                .map(|(name, amount)| SubcategoryTotal {
                    name: name.to_owned(),
                    amount,
                })
                .collect(),
        })
        .collect();

    category_totals.sort_by(|a, b| a.name.cmp(&b.name));
    category_totals
}

/// Buckets transactions into the twelve months of the year by due date.
///
/// Every month from January to December is present, months without
/// transactions have zero income and expense. Investments are not counted.
pub(super) fn monthly_breakdown(transactions: &[Transaction]) -> Vec<MonthSummary> {
    let mut months: Vec<MonthSummary> = (1..=12u8)
        .filter_map(|month| Month::try_from(month).ok())
        .map(|month| MonthSummary {
            month: month_name(month),
            income: Amount::ZERO,
            expense: Amount::ZERO,
        })
        .collect();

    for transaction in transactions {
        let index = usize::from(u8::from(transaction.due_date.month())) - 1;
        let summary = &mut months[index];

        match transaction.kind {
            TransactionKind::Income => summary.income += transaction.amount,
            TransactionKind::Expense => summary.expense += transaction.amount,
            TransactionKind::Investment => {}
        }
    }

    months
}

/// Totals transactions by type.
pub(super) fn period_totals(transactions: &[Transaction]) -> PeriodTotals {
    transactions
        .iter()
        .fold(PeriodTotals::default(), |mut totals, transaction| {
            match transaction.kind {
                TransactionKind::Income => totals.income += transaction.amount,
                TransactionKind::Expense => totals.expense += transaction.amount,
                TransactionKind::Investment => totals.invested += transaction.amount,
            }

            totals
        })
}

fn month_name(month: Month) -> &'static str {
    match month {
        Month::January => "january",
        Month::February => "february",
        Month::March => "march",
        Month::April => "april",
        Month::May => "may",
        Month::June => "june",
        Month::July => "july",
        Month::August => "august",
        Month::September => "september",
        Month::October => "october",
        Month::November => "november",
        Month::December => "december",
    }
}

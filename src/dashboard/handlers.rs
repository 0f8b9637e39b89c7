//! Dashboard HTTP handlers.
//!
//! This module contains:
//! - Route handlers for the category breakdowns, the yearly summary, the
//!   statement and the category options
//! - The state and query types used by the handlers

use std::{
    ops::Range,
    sync::{Arc, Mutex},
};

use axum::{
    Json,
    extract::{FromRef, Query, State},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::{Date, Month, PrimitiveDateTime, Time};

use crate::{
    Amount, AppState, Error,
    category::{CategoryNature, get_categories_by_nature},
    dashboard::{
        aggregation::{
            CategoryTotal, MonthSummary, group_by_category, monthly_breakdown, period_totals,
        },
        transaction::{get_categorized_transactions, get_transactions_by_nature},
    },
    date_input::{end_of_day_bound, parse_date, parse_date_time},
    transaction::{Nature, Transaction, TransactionKind},
};

/// The state needed for the dashboard endpoints.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The monthly goal reported by the yearly summary and the statement.
    pub monthly_goal: Amount,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            monthly_goal: state.monthly_goal,
        }
    }
}

/// Query parameters for the endpoints that cover a date range.
#[derive(Debug, Clone, Deserialize)]
pub struct PeriodQuery {
    /// Personal or business transactions.
    pub nature: Nature,
    /// The first day of the period.
    pub start_date: String,
    /// The last day of the period, included in full.
    pub end_date: String,
}

impl PeriodQuery {
    /// The half-open due date range covering the whole period.
    fn due_dates(&self) -> Result<Range<PrimitiveDateTime>, Error> {
        let start = parse_date_time(&self.start_date)?;
        let end = end_of_day_bound(parse_date(&self.end_date)?)?;

        if start >= end {
            return Err(Error::Validation(format!(
                "start_date {} is after end_date {}",
                self.start_date, self.end_date
            )));
        }

        Ok(start..end)
    }
}

/// Query parameters for the yearly summary.
#[derive(Debug, Clone, Deserialize)]
pub struct YearQuery {
    /// The calendar year to summarize.
    pub year: i32,
    /// Personal or business transactions.
    pub nature: Nature,
}

/// Query parameters for the category options.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryOptionsQuery {
    /// Only include categories usable for this nature. Defaults to all.
    #[serde(default)]
    pub nature: CategoryNature,
}

/// Totals by category over a period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotals {
    /// The start of the period, as requested.
    pub start_date: String,
    /// The end of the period, as requested.
    pub end_date: String,
    /// The categories with a positive total, ordered by name.
    pub categories: Vec<CategoryTotal>,
}

/// Income and expenses for each month of a year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlySummary {
    /// The summarized year.
    pub year: i32,
    /// The configured monthly goal.
    pub monthly_goal: Amount,
    /// Twelve entries, January to December.
    pub months: Vec<MonthSummary>,
}

/// The totals and transactions of a period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    /// The sum of income transactions.
    pub income: Amount,
    /// The sum of expense transactions.
    pub expense: Amount,
    /// The sum of investment transactions.
    pub total_invested: Amount,
    /// The configured monthly goal.
    pub monthly_goal: Amount,
    /// The start of the period, as requested.
    pub start_date: String,
    /// The end of the period, as requested.
    pub end_date: String,
    /// The transactions in the period, newest due date first.
    pub transactions: Vec<Transaction>,
}

/// A category and the names of its subcategories.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryOption {
    /// The category name.
    pub category: String,
    /// The subcategory names, ordered by name.
    pub subcategories: Vec<String>,
}

/// The categories a client can offer when recording a transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryOptions {
    /// The categories ordered by name.
    pub options: Vec<CategoryOption>,
}

/// Expenses in a period grouped by category and subcategory.
pub async fn get_spending_by_category(
    State(state): State<DashboardState>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<CategoryTotals>, Error> {
    get_category_totals(state, query, TransactionKind::Expense).map(Json)
}

/// Income in a period grouped by category and subcategory.
pub async fn get_income_by_category(
    State(state): State<DashboardState>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<CategoryTotals>, Error> {
    get_category_totals(state, query, TransactionKind::Income).map(Json)
}

fn get_category_totals(
    state: DashboardState,
    query: PeriodQuery,
    kind: TransactionKind,
) -> Result<CategoryTotals, Error> {
    let due_dates = query.due_dates()?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let transactions = get_categorized_transactions(kind, query.nature, due_dates, &connection)
        .inspect_err(|error| tracing::error!("could not get {} transactions: {error}", kind.as_str()))?;

    Ok(CategoryTotals {
        categories: group_by_category(&transactions),
        start_date: query.start_date,
        end_date: query.end_date,
    })
}

/// Income and expenses for each month of a year.
pub async fn get_yearly_summary(
    State(state): State<DashboardState>,
    Query(query): Query<YearQuery>,
) -> Result<Json<YearlySummary>, Error> {
    let due_dates = year_range(query.year)?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let transactions = get_transactions_by_nature(query.nature, due_dates, &connection)?;

    Ok(Json(YearlySummary {
        year: query.year,
        monthly_goal: state.monthly_goal,
        months: monthly_breakdown(&transactions),
    }))
}

fn year_range(year: i32) -> Result<Range<PrimitiveDateTime>, Error> {
    let invalid_year = || Error::Validation(format!("{year} is not a supported year"));

    let start = Date::from_calendar_date(year, Month::January, 1).map_err(|_| invalid_year())?;
    let end = year
        .checked_add(1)
        .and_then(|next_year| Date::from_calendar_date(next_year, Month::January, 1).ok())
        .ok_or_else(invalid_year)?;

    Ok(PrimitiveDateTime::new(start, Time::MIDNIGHT)..PrimitiveDateTime::new(end, Time::MIDNIGHT))
}

/// The totals and transactions of a period.
pub async fn get_statement(
    State(state): State<DashboardState>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<Statement>, Error> {
    let due_dates = query.due_dates()?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let transactions = get_transactions_by_nature(query.nature, due_dates, &connection)?;
    let totals = period_totals(&transactions);

    tracing::debug!(
        "statement from {} to {} has {} transaction(s)",
        query.start_date,
        query.end_date,
        transactions.len()
    );

    Ok(Json(Statement {
        income: totals.income,
        expense: totals.expense,
        total_invested: totals.invested,
        monthly_goal: state.monthly_goal,
        start_date: query.start_date,
        end_date: query.end_date,
        transactions,
    }))
}

/// The categories and subcategory names available for a nature.
pub async fn get_category_options(
    State(state): State<DashboardState>,
    Query(query): Query<CategoryOptionsQuery>,
) -> Result<Json<CategoryOptions>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let options = get_categories_by_nature(query.nature, &connection)?
        .into_iter()
        .map(|category| CategoryOption {
            category: category.name.to_string(),
            subcategories: category
                .subcategories
                .into_iter()
                .map(|subcategory| subcategory.name)
                .collect(),
        })
        .collect();

    Ok(Json(CategoryOptions { options }))
}

#[cfg(test)]
mod dashboard_handler_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Json,
        extract::{Query, State},
    };
    use rusqlite::Connection;
    use time::{PrimitiveDateTime, macros::datetime};

    use crate::{
        Amount, Error,
        category::{
            CategoryNature,
            test_utils::{create_test_category, get_test_connection},
        },
        transaction::{
            InstallmentCount, Nature, NewTransaction, PaymentMethod, TransactionKind,
            test_utils::new_expense, create_transaction,
        },
    };

    use super::{
        CategoryOptionsQuery, DashboardState, PeriodQuery, YearQuery, get_category_options,
        get_income_by_category, get_spending_by_category, get_statement, get_yearly_summary,
    };

    fn insert(
        cents: i64,
        kind: TransactionKind,
        due_date: PrimitiveDateTime,
        connection: &Connection,
    ) {
        create_transaction(
            NewTransaction {
                kind,
                due_date,
                ..new_expense(cents)
            },
            connection,
        )
        .unwrap();
    }

    fn get_state(connection: Connection) -> DashboardState {
        DashboardState {
            db_connection: Arc::new(Mutex::new(connection)),
            monthly_goal: Amount::from_cents(400_000),
        }
    }

    fn january(nature: Nature) -> PeriodQuery {
        PeriodQuery {
            nature,
            start_date: "01/01/2025".to_owned(),
            end_date: "31/01/2025".to_owned(),
        }
    }

    #[tokio::test]
    async fn spending_covers_the_whole_last_day() {
        let connection = get_test_connection();
        insert(1_000, TransactionKind::Expense, datetime!(2025 - 01 - 31 23:30), &connection);
        insert(2_000, TransactionKind::Expense, datetime!(2025 - 02 - 01 0:00), &connection);
        insert(5_000, TransactionKind::Income, datetime!(2025 - 01 - 10 0:00), &connection);

        let Json(totals) = get_spending_by_category(
            State(get_state(connection)),
            Query(january(Nature::Pf)),
        )
        .await
        .unwrap();

        assert_eq!(totals.start_date, "01/01/2025");
        assert_eq!(totals.categories.len(), 1);
        assert_eq!(totals.categories[0].name, "Food");
        assert_eq!(totals.categories[0].total, Amount::from_cents(1_000));
        assert_eq!(totals.categories[0].subcategories[0].name, "Groceries");
    }

    #[tokio::test]
    async fn spending_includes_category_limit() {
        let connection = get_test_connection();
        create_test_category("Food", CategoryNature::Pf, &["Groceries"], &connection);
        connection
            .execute("UPDATE category SET spending_limit = 50000 WHERE name = 'Food'", [])
            .unwrap();
        insert(1_000, TransactionKind::Expense, datetime!(2025 - 01 - 15 0:00), &connection);

        let Json(totals) = get_spending_by_category(
            State(get_state(connection)),
            Query(january(Nature::Pf)),
        )
        .await
        .unwrap();

        assert_eq!(totals.categories[0].limit, Amount::from_cents(50_000));
    }

    #[tokio::test]
    async fn income_only_counts_income() {
        let connection = get_test_connection();
        insert(1_000, TransactionKind::Expense, datetime!(2025 - 01 - 15 0:00), &connection);
        insert(7_000, TransactionKind::Income, datetime!(2025 - 01 - 10 0:00), &connection);

        let Json(totals) =
            get_income_by_category(State(get_state(connection)), Query(january(Nature::Pf)))
                .await
                .unwrap();

        assert_eq!(totals.categories.len(), 1);
        assert_eq!(totals.categories[0].total, Amount::from_cents(7_000));
    }

    #[tokio::test]
    async fn other_nature_is_excluded() {
        let connection = get_test_connection();
        insert(1_000, TransactionKind::Expense, datetime!(2025 - 01 - 15 0:00), &connection);

        let Json(totals) = get_spending_by_category(
            State(get_state(connection)),
            Query(january(Nature::Pj)),
        )
        .await
        .unwrap();

        assert!(totals.categories.is_empty());
    }

    #[tokio::test]
    async fn start_after_end_is_rejected() {
        let query = PeriodQuery {
            nature: Nature::Pf,
            start_date: "2025-02-01".to_owned(),
            end_date: "2025-01-01".to_owned(),
        };

        let result =
            get_spending_by_category(State(get_state(get_test_connection())), Query(query)).await;

        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn invalid_date_is_rejected() {
        let query = PeriodQuery {
            nature: Nature::Pf,
            start_date: "soon".to_owned(),
            end_date: "2025-01-01".to_owned(),
        };

        let result = get_statement(State(get_state(get_test_connection())), Query(query)).await;

        assert!(matches!(result, Err(Error::InvalidDate(_))));
    }

    #[tokio::test]
    async fn yearly_summary_spreads_installments_over_months() {
        let connection = get_test_connection();
        create_transaction(
            NewTransaction {
                installment_count: InstallmentCount::new(3).unwrap(),
                payment_method: PaymentMethod::Credit,
                due_date: datetime!(2025 - 11 - 15 0:00),
                ..new_expense(30_000)
            },
            &connection,
        )
        .unwrap();

        let Json(summary) = get_yearly_summary(
            State(get_state(connection)),
            Query(YearQuery {
                year: 2025,
                nature: Nature::Pf,
            }),
        )
        .await
        .unwrap();

        assert_eq!(summary.monthly_goal, Amount::from_cents(400_000));
        assert_eq!(summary.months.len(), 12);
        assert_eq!(summary.months[10].expense, Amount::from_cents(10_000));
        assert_eq!(summary.months[11].expense, Amount::from_cents(10_000));
        // The third installment falls in January of the next year.
        assert_eq!(summary.months[0].expense, Amount::ZERO);
    }

    #[tokio::test]
    async fn statement_reports_totals_and_transactions() {
        let connection = get_test_connection();
        insert(10_000, TransactionKind::Income, datetime!(2025 - 01 - 05 0:00), &connection);
        insert(3_000, TransactionKind::Expense, datetime!(2025 - 01 - 20 0:00), &connection);
        insert(2_000, TransactionKind::Investment, datetime!(2025 - 01 - 25 0:00), &connection);

        let Json(statement) = get_statement(State(get_state(connection)), Query(january(Nature::Pf)))
            .await
            .unwrap();

        assert_eq!(statement.income, Amount::from_cents(10_000));
        assert_eq!(statement.expense, Amount::from_cents(3_000));
        assert_eq!(statement.total_invested, Amount::from_cents(2_000));
        assert_eq!(statement.monthly_goal, Amount::from_cents(400_000));
        assert_eq!(statement.end_date, "31/01/2025");
        let amounts: Vec<_> = statement
            .transactions
            .iter()
            .map(|transaction| transaction.amount.cents())
            .collect();
        assert_eq!(amounts, [2_000, 3_000, 10_000]);
    }

    #[tokio::test]
    async fn category_options_filter_by_nature() {
        let connection = get_test_connection();
        create_test_category("Office", CategoryNature::Pj, &["Rent"], &connection);
        create_test_category("Food", CategoryNature::Pf, &["Groceries", "Bakery"], &connection);
        create_test_category("Taxes", CategoryNature::All, &[], &connection);
        let state = get_state(connection);

        let Json(pf_options) = get_category_options(
            State(state.clone()),
            Query(CategoryOptionsQuery {
                nature: CategoryNature::Pf,
            }),
        )
        .await
        .unwrap();
        let Json(all_options) =
            get_category_options(State(state), Query(CategoryOptionsQuery::default()))
                .await
                .unwrap();

        let pf_names: Vec<_> = pf_options.options.iter().map(|o| o.category.as_str()).collect();
        assert_eq!(pf_names, ["Food", "Taxes"]);
        assert_eq!(pf_options.options[0].subcategories, ["Bakery", "Groceries"]);
        assert_eq!(all_options.options.len(), 3);
    }
}

//! Endpoints for reading transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, Query, State},
};
use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    AppState, Error,
    database_id::TransactionId,
    date_input::{end_of_day_bound, parse_date, parse_date_time},
    transaction::{Transaction, get_transaction, get_transaction_group, get_transactions},
};

/// The state needed for reading transactions.
#[derive(Debug, Clone)]
pub struct TransactionsState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The optional date filter for listing transactions.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionsQuery {
    /// Only include transactions due on or after this date.
    pub start_date: Option<String>,
    /// Only include transactions due on or before this date (the whole day).
    pub end_date: Option<String>,
}

/// List transactions, newest due date first.
pub async fn list_transactions_endpoint(
    State(state): State<TransactionsState>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<Vec<Transaction>>, Error> {
    let start = query.start_date.as_deref().map(parse_date_time).transpose()?;
    let end = query
        .end_date
        .as_deref()
        .map(|end_date| parse_date(end_date).and_then(end_of_day_bound))
        .transpose()?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    get_transactions(start, end, &connection).map(Json)
}

/// Get a single transaction.
pub async fn get_transaction_endpoint(
    State(state): State<TransactionsState>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Json<Transaction>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    get_transaction(transaction_id, &connection)
        .inspect_err(|error| tracing::warn!("could not get transaction {transaction_id}: {error}"))
        .map(Json)
}

/// Get all installments of a purchase, ordered by installment number.
pub async fn get_transaction_group_endpoint(
    State(state): State<TransactionsState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<Vec<Transaction>>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    get_transaction_group(group_id, &connection).map(Json)
}

#[cfg(test)]
mod list_transactions_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Json,
        extract::{Query, State},
    };
    use time::macros::datetime;

    use crate::{
        Error,
        category::test_utils::get_test_connection,
        transaction::{NewTransaction, test_utils::new_expense, create_transaction},
    };

    use super::{TransactionsQuery, TransactionsState, list_transactions_endpoint};

    fn get_state_with_transactions() -> TransactionsState {
        let connection = get_test_connection();

        for (cents, due_date) in [
            (100, datetime!(2025 - 01 - 01 0:00)),
            (200, datetime!(2025 - 01 - 31 23:59)),
            (300, datetime!(2025 - 02 - 01 0:00)),
        ] {
            create_transaction(
                NewTransaction {
                    due_date,
                    ..new_expense(cents)
                },
                &connection,
            )
            .unwrap();
        }

        TransactionsState {
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    #[tokio::test]
    async fn lists_newest_first() {
        let state = get_state_with_transactions();

        let Json(transactions) =
            list_transactions_endpoint(State(state), Query(TransactionsQuery::default()))
                .await
                .unwrap();

        let amounts: Vec<_> = transactions.iter().map(|t| t.amount.cents()).collect();
        assert_eq!(amounts, [300, 200, 100]);
    }

    #[tokio::test]
    async fn end_date_covers_the_whole_day() {
        let state = get_state_with_transactions();
        let query = TransactionsQuery {
            start_date: Some("01/01/2025".to_owned()),
            end_date: Some("2025-01-31".to_owned()),
        };

        let Json(transactions) = list_transactions_endpoint(State(state), Query(query))
            .await
            .unwrap();

        let amounts: Vec<_> = transactions.iter().map(|t| t.amount.cents()).collect();
        assert_eq!(amounts, [200, 100]);
    }

    #[tokio::test]
    async fn invalid_date_is_rejected() {
        let state = get_state_with_transactions();
        let query = TransactionsQuery {
            start_date: Some("yesterday".to_owned()),
            end_date: None,
        };

        let result = list_transactions_endpoint(State(state), Query(query)).await;

        assert_eq!(
            result.map(|Json(transactions)| transactions.len()),
            Err(Error::InvalidDate("yesterday".to_owned()))
        );
    }
}

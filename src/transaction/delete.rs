//! Deleting transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
};
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    AppState, Error,
    database_id::TransactionId,
    transaction::{
        Transaction,
        core::{TRANSACTION_COLUMNS, map_transaction_row},
    },
};

/// Delete a single transaction and return it.
///
/// Other installments of the same purchase are kept as they are and are not
/// renumbered. Use [delete_transaction_group] to remove a whole purchase.
///
/// # Errors
/// This function will return a [Error::DeleteMissingTransaction] if `id`
/// does not refer to a transaction.
pub fn delete_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "DELETE FROM \"transaction\" WHERE id = ?1 RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row([id], map_transaction_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::DeleteMissingTransaction,
            error => error.into(),
        })?;

    tracing::info!("deleted transaction {id}");

    Ok(transaction)
}

/// Delete every installment of a purchase and return how many were removed.
///
/// # Errors
/// This function will return a [Error::DeleteMissingTransaction] if no
/// transaction has `group_id`.
pub fn delete_transaction_group(group_id: Uuid, connection: &Connection) -> Result<usize, Error> {
    let sql_transaction = connection.unchecked_transaction()?;

    let deleted = sql_transaction.execute(
        "DELETE FROM \"transaction\" WHERE group_id = ?1",
        [group_id.to_string()],
    )?;

    if deleted == 0 {
        return Err(Error::DeleteMissingTransaction);
    }

    sql_transaction.commit()?;

    tracing::info!("deleted {deleted} transaction(s) in group {group_id}");

    Ok(deleted)
}

/// The state needed for deleting transactions.
#[derive(Debug, Clone)]
pub struct DeleteTransactionState {
    /// The database connection for deleting transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Delete a single transaction, responding with the deleted transaction.
pub async fn delete_transaction_endpoint(
    State(state): State<DeleteTransactionState>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Json<Transaction>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    delete_transaction(transaction_id, &connection).map(Json)
}

/// The response body for deleting a group of installments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeletedGroup {
    /// The group that was deleted.
    pub group_id: Uuid,
    /// How many installments were removed.
    pub deleted: usize,
}

/// Delete all installments of a purchase.
pub async fn delete_transaction_group_endpoint(
    State(state): State<DeleteTransactionState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<DeletedGroup>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    delete_transaction_group(group_id, &connection).map(|deleted| Json(DeletedGroup { group_id, deleted }))
}

//! Updating a single stored transaction.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
};
use rusqlite::Connection;
use serde::Deserialize;
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::{
    Amount, AppState, Error,
    category::{CategoryId, SubcategoryId, get_subcategory},
    database_id::TransactionId,
    date_input::DateInput,
    transaction::{
        CategoryRef, Nature, PaymentMethod, SubcategoryRef, Transaction, TransactionKind,
        core::{TRANSACTION_COLUMNS, map_transaction_row},
        create::validate_description,
        get_transaction,
        resolve::{resolve_category, resolve_subcategory},
    },
};

/// The changes to apply to a transaction. Fields that are `None` are kept.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransactionChanges {
    /// The new amount of this installment.
    pub amount: Option<Amount>,
    /// The new description.
    pub description: Option<String>,
    /// The new due date.
    pub due_date: Option<PrimitiveDateTime>,
    /// The new transaction type.
    pub kind: Option<TransactionKind>,
    /// The new nature.
    pub nature: Option<Nature>,
    /// The new payment method.
    pub payment_method: Option<PaymentMethod>,
    /// The new category.
    pub category: Option<CategoryRef>,
    /// The new subcategory.
    pub subcategory: Option<SubcategoryRef>,
}

/// The JSON body for updating a transaction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTransactionPayload {
    /// The new amount, must be greater than zero.
    #[serde(default)]
    pub amount: Option<Amount>,
    /// The new description.
    #[serde(default)]
    pub description: Option<String>,
    /// The new due date in any supported format.
    #[serde(default)]
    pub due_date: Option<DateInput>,
    /// The new transaction type.
    #[serde(default, rename = "type")]
    pub kind: Option<TransactionKind>,
    /// The new nature.
    #[serde(default)]
    pub nature: Option<Nature>,
    /// The new payment method.
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    /// The ID of an existing category.
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// The name of a category, created if it does not exist.
    #[serde(default)]
    pub category_name: Option<String>,
    /// The ID of an existing subcategory.
    #[serde(default)]
    pub subcategory_id: Option<SubcategoryId>,
    /// The name of a subcategory, created if it does not exist.
    #[serde(default)]
    pub subcategory_name: Option<String>,
}

impl TryFrom<UpdateTransactionPayload> for TransactionChanges {
    type Error = Error;

    fn try_from(payload: UpdateTransactionPayload) -> Result<Self, Self::Error> {
        if let Some(amount) = payload.amount.filter(|amount| !amount.is_positive()) {
            return Err(Error::InvalidAmount(format!(
                "{amount} (the amount must be greater than zero)"
            )));
        }

        Ok(TransactionChanges {
            amount: payload.amount,
            description: payload
                .description
                .as_deref()
                .map(validate_description)
                .transpose()?,
            due_date: payload.due_date.as_ref().map(DateInput::resolve).transpose()?,
            kind: payload.kind,
            nature: payload.nature,
            payment_method: payload.payment_method,
            category: CategoryRef::from_fields(
                payload.category_id,
                payload.category_name.as_deref(),
            )?,
            subcategory: SubcategoryRef::from_fields(
                payload.subcategory_id,
                payload.subcategory_name.as_deref(),
            ),
        })
    }
}

/// Apply `changes` to the transaction `id` and return the updated transaction.
///
/// Only the given transaction is changed, other installments of the same
/// purchase are left alone. When the category changes but no subcategory is
/// given, the current subcategory must also belong to the new category.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingTransaction] if `id` does not refer to a transaction,
/// - [Error::CategoryNotFound] or [Error::InvalidSubcategory] if the references cannot be resolved,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_transaction(
    id: TransactionId,
    changes: TransactionChanges,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let sql_transaction = connection.unchecked_transaction()?;

    let existing = get_transaction(id, &sql_transaction).map_err(|error| match error {
        Error::NotFound => Error::UpdateMissingTransaction,
        error => error,
    })?;

    let nature = changes.nature.unwrap_or(existing.nature);

    let category_id = match &changes.category {
        Some(reference) => resolve_category(reference, nature, &sql_transaction)?.id,
        None => existing.category_id,
    };

    let subcategory_id = match &changes.subcategory {
        Some(reference) => resolve_subcategory(reference, category_id, &sql_transaction)?.id,
        None if category_id != existing.category_id => {
            let subcategory = get_subcategory(existing.subcategory_id, &sql_transaction)?;

            if subcategory.category_id != category_id {
                return Err(Error::InvalidSubcategory(subcategory.id, category_id));
            }

            subcategory.id
        }
        None => existing.subcategory_id,
    };

    let transaction = sql_transaction
        .prepare(&format!(
            "UPDATE \"transaction\"
             SET amount = ?1, description = ?2, due_date = ?3, kind = ?4, nature = ?5,
                 payment_method = ?6, category_id = ?7, subcategory_id = ?8, updated_at = ?9
             WHERE id = ?10
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            rusqlite::params![
                changes.amount.unwrap_or(existing.amount),
                changes.description.unwrap_or(existing.description),
                changes.due_date.unwrap_or(existing.due_date),
                changes.kind.unwrap_or(existing.kind),
                nature,
                changes.payment_method.unwrap_or(existing.payment_method),
                category_id,
                subcategory_id,
                OffsetDateTime::now_utc(),
                id,
            ],
            map_transaction_row,
        )?;

    sql_transaction.commit()?;

    tracing::info!("updated transaction {id}");

    Ok(transaction)
}

/// The state needed for updating a transaction.
#[derive(Debug, Clone)]
pub struct UpdateTransactionState {
    /// The database connection for writing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for UpdateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Update a single transaction.
pub async fn update_transaction_endpoint(
    State(state): State<UpdateTransactionState>,
    Path(transaction_id): Path<TransactionId>,
    Json(payload): Json<UpdateTransactionPayload>,
) -> Result<Json<Transaction>, Error> {
    let changes = TransactionChanges::try_from(payload)?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    update_transaction(transaction_id, changes, &connection).map(Json)
}

//! Livro Caixa is a bookkeeping backend for personal (pf) and business (pj)
//! finances.
//!
//! This library provides a JSON REST API for managing categories,
//! subcategories, transactions (including credit purchases split into monthly
//! installments) and the dashboard aggregations built on top of them.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod amount;
mod app_state;
mod category;
mod dashboard;
mod database_id;
mod date_input;
mod db;
mod endpoints;
mod logging;
mod routing;
mod transaction;

pub use amount::Amount;
pub use app_state::{AppState, DEFAULT_MONTHLY_GOAL};
pub use category::{
    Category, CategoryId, CategoryName, CategoryNature, CategoryUpdate, LimitsCategory,
    LimitsSubcategory, LimitsUpdate, LimitsUpdateSummary, NewCategory, Subcategory,
    SubcategoryId, SubcategoryUpdate, apply_limits_update, create_category, delete_category,
    get_all_categories, get_categories_by_nature, get_category, update_category,
};
pub use dashboard::{
    CategoryOption, CategoryOptions, CategoryTotal, CategoryTotals, MonthSummary, Statement,
    SubcategoryTotal, YearlySummary,
};
pub use database_id::{DatabaseId, TransactionId};
pub use date_input::{DateInput, parse_date, parse_date_time};
pub use db::initialize as initialize_db;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use routing::build_router;
pub use transaction::{
    CategoryRef, Installment, InstallmentCount, Nature, NewTransaction, PaymentMethod,
    SubcategoryRef, Transaction, TransactionChanges, TransactionKind, count_transactions,
    create_transaction, delete_transaction, delete_transaction_group, get_transaction,
    get_transaction_group, get_transactions, split_into_installments, update_transaction,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The request payload was well-formed JSON but failed a business rule,
    /// e.g. neither a category ID nor a category name was given.
    #[error("{0}")]
    Validation(String),

    /// A date string or timestamp could not be parsed with any of the
    /// supported formats.
    #[error("could not parse \"{0}\" as a date, use DD/MM/YYYY, YYYY-MM-DD, ISO 8601 or a Unix timestamp")]
    InvalidDate(String),

    /// A monetary amount was negative, zero where a positive value is
    /// required, or not a finite number.
    #[error("{0} is not a valid amount")]
    InvalidAmount(String),

    /// The category name is already used by another category.
    #[error("the category \"{0}\" already exists")]
    DuplicateCategoryName(String),

    /// The subcategory name is already used within the same category.
    #[error("the subcategory \"{0}\" already exists in this category")]
    DuplicateSubcategoryName(String),

    /// The category cannot be deleted while transactions still refer to it.
    #[error("the category {0} still has transactions and cannot be deleted")]
    CategoryInUse(CategoryId),

    /// The subcategory cannot be deleted while transactions still refer to it.
    #[error("the subcategory {0} still has transactions and cannot be deleted")]
    SubcategoryInUse(SubcategoryId),

    /// The subcategory does not belong to the category it was paired with.
    #[error("the subcategory {0} does not belong to the category {1}")]
    InvalidSubcategory(SubcategoryId, CategoryId),

    /// A category ID in the request payload did not match a category.
    #[error("the category {0} could not be found")]
    CategoryNotFound(CategoryId),

    /// A subcategory ID in the request payload did not match a subcategory.
    #[error("the subcategory {0} could not be found")]
    SubcategoryNotFound(SubcategoryId),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Tried to update a transaction that does not exist
    #[error("tried to update a transaction that is not in the database")]
    UpdateMissingTransaction,

    /// Tried to delete a transaction that does not exist
    #[error("tried to delete a transaction that is not in the database")]
    DeleteMissingTransaction,

    /// Tried to update a category that does not exist
    #[error("tried to update a category that is not in the database")]
    UpdateMissingCategory,

    /// Tried to delete a category that does not exist
    #[error("tried to delete a category that is not in the database")]
    DeleteMissingCategory,

    /// A database constraint was violated in a way that is not covered by
    /// a more specific error.
    #[error("the request violates a database constraint: {0}")]
    IntegrityError(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            rusqlite::Error::SqliteFailure(sql_error, description)
                if sql_error.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                let description = description.unwrap_or_else(|| sql_error.to_string());
                tracing::warn!("a database constraint was violated: {description}");
                Error::IntegrityError(description)
            }
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) | Error::InvalidDate(_) | Error::InvalidAmount(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Error::DuplicateCategoryName(_)
            | Error::DuplicateSubcategoryName(_)
            | Error::CategoryInUse(_)
            | Error::SubcategoryInUse(_) => StatusCode::CONFLICT,
            Error::InvalidSubcategory(_, _) | Error::IntegrityError(_) => StatusCode::BAD_REQUEST,
            Error::CategoryNotFound(_)
            | Error::SubcategoryNotFound(_)
            | Error::NotFound
            | Error::UpdateMissingTransaction
            | Error::DeleteMissingTransaction
            | Error::UpdateMissingCategory
            | Error::DeleteMissingCategory => StatusCode::NOT_FOUND,
            Error::SqlError(_) | Error::DatabaseLockError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal errors are only meant for the server logs.
        let message = if status.is_server_error() {
            tracing::error!("An unexpected error occurred: {}", self);
            "Internal server error".to_owned()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

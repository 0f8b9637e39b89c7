//! Defines the core data models and database queries for transactions.

use std::str::FromStr;

use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, PrimitiveDateTime};
use uuid::Uuid;

use crate::{
    Amount, Error,
    category::{CategoryId, SubcategoryId},
    database_id::TransactionId,
    date_input::{serialize_date_time, serialize_rfc3339},
};

// ============================================================================
// MODELS
// ============================================================================

/// Stores a unit-like enum as lowercase text.
macro_rules! text_column {
    ($name:ident, $label:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// The value stored in the database and sent to clients.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err(Error::Validation(format!(
                        "\"{other}\" is not a valid {}",
                        $label
                    ))),
                }
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|error: Error| FromSqlError::Other(Box::new(error)))
            }
        }
    };
}

/// Whether money came in, went out or was invested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money received, e.g. a salary.
    Income,
    /// Money spent.
    Expense,
    /// Money moved into investments.
    Investment,
}

text_column!(TransactionKind, "transaction type", {
    Income => "income",
    Expense => "expense",
    Investment => "investment",
});

/// Whose books a transaction belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Nature {
    /// Personal finances (pessoa física).
    Pf,
    /// Business finances (pessoa jurídica).
    Pj,
}

text_column!(Nature, "nature", {
    Pf => "pf",
    Pj => "pj",
});

/// How a transaction was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Credit card, the only method that may be split into installments.
    Credit,
    /// Debit card.
    Debit,
    /// Instant payment.
    Pix,
    /// Bank transfer.
    Transfer,
    /// Cash.
    Cash,
}

text_column!(PaymentMethod, "payment method", {
    Credit => "credit",
    Debit => "debit",
    Pix => "pix",
    Transfer => "transfer",
    Cash => "cash",
});

/// A single stored transaction.
///
/// A purchase split into N installments is stored as N transactions that
/// share a `group_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// Shared by all installments of the same purchase.
    pub group_id: Uuid,
    /// The amount due for this installment.
    pub amount: Amount,
    /// A text description of what the transaction was for.
    pub description: String,
    /// The position of this installment in its group, starting at 1.
    pub installment_index: u32,
    /// The number of installments in the group.
    pub installment_count: u32,
    /// When the transaction is due.
    #[serde(serialize_with = "serialize_date_time")]
    pub due_date: PrimitiveDateTime,
    /// When the transaction was created.
    #[serde(serialize_with = "serialize_rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the transaction was last changed.
    #[serde(serialize_with = "serialize_rfc3339")]
    pub updated_at: OffsetDateTime,
    /// Income, expense or investment.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Personal or business.
    pub nature: Nature,
    /// How the transaction was paid.
    pub payment_method: PaymentMethod,
    /// The category of the transaction.
    pub category_id: CategoryId,
    /// The subcategory of the transaction.
    pub subcategory_id: SubcategoryId,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

pub(crate) const TRANSACTION_COLUMNS: &str = "id, group_id, amount, description, \
    installment_index, installment_count, due_date, created_at, updated_at, kind, nature, \
    payment_method, category_id, subcategory_id";

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE id = :id"
        ))?
        .query_row(&[(":id", &id)], map_transaction_row)?;

    Ok(transaction)
}

/// Retrieve transactions due in the optional range `[start, end)`, newest first.
pub fn get_transactions(
    start: Option<PrimitiveDateTime>,
    end: Option<PrimitiveDateTime>,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\"
             WHERE (?1 IS NULL OR due_date >= ?1) AND (?2 IS NULL OR due_date < ?2)
             ORDER BY due_date DESC, id DESC"
        ))?
        .query_map((start, end), map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

/// Retrieve all installments of a purchase ordered by installment number.
///
/// # Errors
/// This function will return a [Error::NotFound] if no transaction has
/// `group_id`.
pub fn get_transaction_group(
    group_id: Uuid,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let transactions = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\"
             WHERE group_id = ?1
             ORDER BY installment_index ASC"
        ))?
        .query_map([group_id.to_string()], map_transaction_row)?
        .collect::<Result<Vec<_>, _>>()?;

    if transactions.is_empty() {
        return Err(Error::NotFound);
    }

    Ok(transactions)
}

/// Get the total number of transactions in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn count_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            group_id TEXT NOT NULL,
            amount INTEGER NOT NULL CHECK (amount > 0 OR installment_count > 1),
            description TEXT NOT NULL,
            installment_index INTEGER NOT NULL CHECK (installment_index >= 1),
            installment_count INTEGER NOT NULL CHECK (installment_count >= installment_index),
            due_date TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            kind TEXT NOT NULL CHECK (kind IN ('income', 'expense', 'investment')),
            nature TEXT NOT NULL CHECK (nature IN ('pf', 'pj')),
            payment_method TEXT NOT NULL
                CHECK (payment_method IN ('credit', 'debit', 'pix', 'transfer', 'cash')),
            category_id INTEGER NOT NULL,
            subcategory_id INTEGER NOT NULL,
            FOREIGN KEY(category_id) REFERENCES category(id) ON DELETE RESTRICT,
            FOREIGN KEY(subcategory_id) REFERENCES subcategory(id) ON DELETE RESTRICT
        );

        CREATE INDEX IF NOT EXISTS idx_transaction_due_date_nature
            ON \"transaction\"(due_date, nature);
        CREATE INDEX IF NOT EXISTS idx_transaction_group_id ON \"transaction\"(group_id);",
    )?;

    Ok(())
}

/// Map a row selected with [TRANSACTION_COLUMNS] to a [Transaction].
pub(crate) fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let raw_group_id: String = row.get(1)?;
    let group_id = Uuid::parse_str(&raw_group_id).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(error))
    })?;

    Ok(Transaction {
        id: row.get(0)?,
        group_id,
        amount: row.get(2)?,
        description: row.get(3)?,
        installment_index: row.get(4)?,
        installment_count: row.get(5)?,
        due_date: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
        kind: row.get(9)?,
        nature: row.get(10)?,
        payment_method: row.get(11)?,
        category_id: row.get(12)?,
        subcategory_id: row.get(13)?,
    })
}

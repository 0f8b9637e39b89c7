//! Database setup for the application's SQLite database.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{Error, category::create_category_tables, transaction::create_transaction_table};

/// Create the tables and indexes for the domain models.
///
/// Foreign key enforcement is switched on for `connection` first, since
/// subcategories cascade with their category and transactions restrict the
/// deletion of categories that are still in use.
///
/// This function is idempotent and may be called on an existing database.
///
/// # Errors
/// Returns an error if a table cannot be created or if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    // Has no effect inside a transaction, so it must run first.
    connection.pragma_update(None, "foreign_keys", true)?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_category_tables(&transaction)?;
    create_transaction_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

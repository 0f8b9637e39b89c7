//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{Amount, Error, db::initialize};

/// The monthly income goal used when none is configured, 4000.00.
pub const DEFAULT_MONTHLY_GOAL: Amount = Amount::from_cents(400_000);

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,

    /// The monthly goal reported alongside the yearly summary and statement.
    pub monthly_goal: Amount,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(db_connection: Connection, monthly_goal: Amount) -> Result<Self, Error> {
        initialize(&db_connection)?;

        Ok(Self {
            db_connection: Arc::new(Mutex::new(db_connection)),
            monthly_goal,
        })
    }
}

//! Endpoints for reading categories.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    category::{Category, CategoryId, get_all_categories, get_category},
};

/// The state needed for reading categories.
#[derive(Debug, Clone)]
pub struct CategoriesState {
    /// The database connection for reading categories.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoriesState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// List all categories with their subcategories, ordered by name.
pub async fn list_categories_endpoint(
    State(state): State<CategoriesState>,
) -> Result<Json<Vec<Category>>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    get_all_categories(&connection).map(Json)
}

/// Get a single category with its subcategories.
pub async fn get_category_endpoint(
    State(state): State<CategoriesState>,
    Path(category_id): Path<CategoryId>,
) -> Result<Json<Category>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    get_category(category_id, &connection)
        .inspect_err(|error| tracing::warn!("could not get category {category_id}: {error}"))
        .map(Json)
}

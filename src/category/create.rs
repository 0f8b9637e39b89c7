//! Category creation endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    category::{Category, NewCategory, create_category},
};

/// The state needed for creating a category.
#[derive(Debug, Clone)]
pub struct CreateCategoryState {
    /// The database connection for writing categories.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateCategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Create a category and its subcategories.
///
/// Responds with 201 and the new category, or 409 if the name is taken.
pub async fn create_category_endpoint(
    State(state): State<CreateCategoryState>,
    Json(new_category): Json<NewCategory>,
) -> Result<(StatusCode, Json<Category>), Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    create_category(new_category, &connection)
        .map(|category| (StatusCode::CREATED, Json(category)))
}

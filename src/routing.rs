//! Application router configuration.

use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::{
    AppState, Error,
    category::{
        create_category_endpoint, delete_category_endpoint, get_category_endpoint,
        get_limits_endpoint, list_categories_endpoint, update_category_endpoint,
        update_limits_endpoint,
    },
    dashboard::{
        get_category_options, get_income_by_category, get_spending_by_category, get_statement,
        get_yearly_summary,
    },
    endpoints,
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint,
        delete_transaction_group_endpoint, get_transaction_endpoint,
        get_transaction_group_endpoint, list_transactions_endpoint, update_transaction_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let category_routes = Router::new()
        .route(
            endpoints::CATEGORIES,
            get(list_categories_endpoint).post(create_category_endpoint),
        )
        .route(
            endpoints::CATEGORY,
            get(get_category_endpoint)
                .put(update_category_endpoint)
                .delete(delete_category_endpoint),
        )
        .route(
            endpoints::LIMITS,
            get(get_limits_endpoint).put(update_limits_endpoint),
        );

    let transaction_routes = Router::new()
        .route(
            endpoints::TRANSACTIONS,
            get(list_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            get(get_transaction_endpoint)
                .put(update_transaction_endpoint)
                .delete(delete_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION_GROUP,
            get(get_transaction_group_endpoint).delete(delete_transaction_group_endpoint),
        );

    let dashboard_routes = Router::new()
        .route(endpoints::SPENDING_BY_CATEGORY, get(get_spending_by_category))
        .route(endpoints::INCOME_BY_CATEGORY, get(get_income_by_category))
        .route(endpoints::YEARLY_SUMMARY, get(get_yearly_summary))
        .route(endpoints::STATEMENT, get(get_statement))
        .route(endpoints::CATEGORY_OPTIONS, get(get_category_options));

    Router::new()
        .route(endpoints::ROOT, get(get_root))
        .route(endpoints::HEALTH, get(get_health))
        .merge(category_routes)
        .merge(transaction_routes)
        .merge(dashboard_routes)
        .fallback(get_not_found)
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct Banner {
    name: &'static str,
    version: &'static str,
}

/// The root path '/' describes the service.
async fn get_root() -> Json<Banner> {
    Json(Banner {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
}

async fn get_health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn get_not_found() -> Error {
    Error::NotFound
}

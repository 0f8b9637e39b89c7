//! Bulk editing of category spending limits.
//!
//! The limits screen sends every category it created or changed in one
//! request. Each category is applied on its own, so one bad entry does not
//! prevent the others from being saved.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    Amount, AppState, Error,
    category::{
        Category, CategoryId, CategoryName, CategoryNature, NewCategory, SubcategoryId,
        db::{
            find_category_by_name, get_all_categories, get_category, insert_category,
            insert_subcategory, rename_subcategory, update_category_fields,
        },
    },
};

/// A subcategory row on the limits screen.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LimitsSubcategory {
    /// The ID of an existing subcategory, `None` for a new one.
    #[serde(default)]
    pub id: Option<SubcategoryId>,
    /// The subcategory name, blank names are ignored.
    pub name: String,
}

/// A category row on the limits screen.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LimitsCategory {
    /// The ID of an existing category, `None` for a new one.
    #[serde(default)]
    pub id: Option<CategoryId>,
    /// The category name.
    pub name: String,
    /// The category nature as text, checked per entry.
    pub nature: String,
    /// The monthly spending limit.
    #[serde(default)]
    pub limit: Amount,
    /// The subcategories to create or rename.
    #[serde(default)]
    pub subcategories: Vec<LimitsSubcategory>,
}

/// The payload of a bulk limits update.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct LimitsUpdate {
    /// Categories to create.
    #[serde(default)]
    pub new: Vec<LimitsCategory>,
    /// Existing categories to update.
    #[serde(default)]
    pub modified: Vec<LimitsCategory>,
}

/// The outcome of a bulk limits update.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct LimitsUpdateSummary {
    /// Whether every entry was applied.
    pub success: bool,
    /// A human readable summary.
    pub message: String,
    /// The number of categories created.
    pub created_categories: usize,
    /// The number of categories updated.
    pub updated_categories: usize,
    /// The number of subcategories created.
    pub created_subcategories: usize,
    /// The number of subcategories renamed.
    pub updated_subcategories: usize,
    /// One message per entry that could not be applied.
    pub errors: Vec<String>,
}

#[derive(Debug, Default)]
struct Counts {
    created_categories: usize,
    updated_categories: usize,
    created_subcategories: usize,
    updated_subcategories: usize,
}

impl LimitsUpdateSummary {
    fn add(&mut self, counts: Counts) {
        self.created_categories += counts.created_categories;
        self.updated_categories += counts.updated_categories;
        self.created_subcategories += counts.created_subcategories;
        self.updated_subcategories += counts.updated_subcategories;
    }
}

/// Create the new categories and update the modified ones in `update`.
///
/// Every entry is applied inside its own savepoint. An entry that fails is
/// rolled back and reported in [LimitsUpdateSummary::errors], and the
/// remaining entries are still applied. Only entries that were applied are
/// counted.
///
/// # Errors
/// Returns an [Error::SqlError] if the enclosing SQL transaction cannot be
/// started or committed.
pub fn apply_limits_update(
    update: LimitsUpdate,
    connection: &Connection,
) -> Result<LimitsUpdateSummary, Error> {
    let mut transaction = connection.unchecked_transaction()?;
    let mut summary = LimitsUpdateSummary::default();

    for entry in &update.new {
        let savepoint = transaction.savepoint()?;

        match create_limits_category(entry, &savepoint) {
            Ok(counts) => {
                savepoint.commit()?;
                summary.add(counts);
            }
            Err(error) => {
                tracing::warn!("could not create category \"{}\": {error}", entry.name);
                summary
                    .errors
                    .push(format!("could not create category \"{}\": {error}", entry.name));
            }
        }
    }

    for entry in &update.modified {
        let savepoint = transaction.savepoint()?;

        match update_limits_category(entry, &savepoint) {
            Ok(counts) => {
                savepoint.commit()?;
                summary.add(counts);
            }
            Err(error) => {
                let label = entry
                    .id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| format!("\"{}\"", entry.name));
                tracing::warn!("could not update category {label}: {error}");
                summary
                    .errors
                    .push(format!("could not update category {label}: {error}"));
            }
        }
    }

    transaction.commit()?;

    summary.success = summary.errors.is_empty();
    summary.message = if summary.success {
        "limits updated successfully".to_owned()
    } else {
        format!("finished with {} error(s)", summary.errors.len())
    };

    tracing::info!(
        "limits updated: {} categories created, {} categories updated",
        summary.created_categories,
        summary.updated_categories
    );

    Ok(summary)
}

fn create_limits_category(entry: &LimitsCategory, connection: &Connection) -> Result<Counts, Error> {
    let name = CategoryName::new(&entry.name)?;
    let nature: CategoryNature = entry.nature.parse()?;

    if find_category_by_name(&name, connection)?.is_some() {
        return Err(Error::DuplicateCategoryName(name.to_string()));
    }

    let subcategories: Vec<String> = entry
        .subcategories
        .iter()
        .filter(|subcategory| !subcategory.name.trim().is_empty())
        .map(|subcategory| subcategory.name.clone())
        .collect();

    let category = insert_category(
        &NewCategory {
            name,
            nature,
            limit: entry.limit,
            subcategories,
        },
        connection,
    )?;

    Ok(Counts {
        created_categories: 1,
        created_subcategories: category.subcategories.len(),
        ..Default::default()
    })
}

fn update_limits_category(entry: &LimitsCategory, connection: &Connection) -> Result<Counts, Error> {
    let category_id = entry.id.ok_or_else(|| {
        Error::Validation("a category ID is required to update a category".to_owned())
    })?;
    let name = CategoryName::new(&entry.name)?;
    let nature: CategoryNature = entry.nature.parse()?;

    let existing = get_category(category_id, connection)?;

    update_category_fields(category_id, &name, nature, entry.limit, connection)?;

    let mut counts = Counts {
        updated_categories: 1,
        ..Default::default()
    };

    for subcategory in &entry.subcategories {
        if subcategory.name.trim().is_empty() {
            continue;
        }

        match subcategory.id {
            Some(id) => {
                if !existing.subcategories.iter().any(|s| s.id == id) {
                    return Err(Error::InvalidSubcategory(id, category_id));
                }

                rename_subcategory(id, &subcategory.name, connection)?;
                counts.updated_subcategories += 1;
            }
            None => {
                insert_subcategory(&subcategory.name, category_id, connection)?;
                counts.created_subcategories += 1;
            }
        }
    }

    Ok(counts)
}

/// The state needed for the limits endpoints.
#[derive(Debug, Clone)]
pub struct LimitsState {
    /// The database connection for reading and writing categories.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LimitsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Get every category with its limit and subcategories.
pub async fn get_limits_endpoint(
    State(state): State<LimitsState>,
) -> Result<Json<Vec<Category>>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    get_all_categories(&connection)
        .inspect_err(|error| tracing::error!("could not get categories for limits: {error}"))
        .map(Json)
}

/// Apply a bulk limits update and report what happened.
pub async fn update_limits_endpoint(
    State(state): State<LimitsState>,
    Json(update): Json<LimitsUpdate>,
) -> Result<Json<LimitsUpdateSummary>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    apply_limits_update(update, &connection).map(Json)
}

#[cfg(test)]
mod apply_limits_update_tests {
    use crate::{
        Amount,
        category::{
            CategoryNature,
            db::{
                get_all_categories, get_category,
                test_utils::{create_test_category, get_test_connection},
            },
        },
    };

    use super::{LimitsCategory, LimitsSubcategory, LimitsUpdate, apply_limits_update};

    fn entry(id: Option<i64>, name: &str, subcategories: &[(Option<i64>, &str)]) -> LimitsCategory {
        LimitsCategory {
            id,
            name: name.to_owned(),
            nature: "pf".to_owned(),
            limit: Amount::from_cents(10_000),
            subcategories: subcategories
                .iter()
                .map(|(id, name)| LimitsSubcategory {
                    id: *id,
                    name: name.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn creates_and_updates_categories() {
        let connection = get_test_connection();
        let food = create_test_category("Food", CategoryNature::Pf, &["Bakery"], &connection);
        let bakery_id = food.subcategories[0].id;

        let summary = apply_limits_update(
            LimitsUpdate {
                new: vec![entry(None, "Travel", &[(None, "Flights"), (None, "  ")])],
                modified: vec![entry(
                    Some(food.id),
                    "Food",
                    &[(Some(bakery_id), "Bread"), (None, "Market")],
                )],
            },
            &connection,
        )
        .expect("Could not apply limits update");

        assert!(summary.success, "unexpected errors: {:?}", summary.errors);
        assert_eq!(summary.created_categories, 1);
        assert_eq!(summary.updated_categories, 1);
        assert_eq!(summary.created_subcategories, 2);
        assert_eq!(summary.updated_subcategories, 1);

        let food = get_category(food.id, &connection).unwrap();
        assert_eq!(food.limit, Amount::from_cents(10_000));
        let names: Vec<_> = food.subcategories.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Bread", "Market"]);
    }

    #[test]
    fn collects_errors_without_aborting_other_entries() {
        let connection = get_test_connection();
        create_test_category("Food", CategoryNature::Pf, &[], &connection);

        let mut bad_nature = entry(None, "Health", &[]);
        bad_nature.nature = "mensal".to_owned();

        let summary = apply_limits_update(
            LimitsUpdate {
                new: vec![
                    entry(None, "Food", &[]),
                    bad_nature,
                    entry(None, "Travel", &[]),
                ],
                modified: vec![entry(None, "No ID", &[]), entry(Some(999), "Ghost", &[])],
            },
            &connection,
        )
        .unwrap();

        assert!(!summary.success);
        assert_eq!(summary.errors.len(), 4);
        assert_eq!(summary.created_categories, 1);
        assert_eq!(summary.message, "finished with 4 error(s)");

        let names: Vec<_> = get_all_categories(&connection)
            .unwrap()
            .into_iter()
            .map(|category| category.name.to_string())
            .collect();
        assert_eq!(names, ["Food", "Travel"]);
    }

    #[test]
    fn failed_entry_is_rolled_back_completely() {
        let connection = get_test_connection();

        // The second subcategory collides with the first, so the category
        // itself must not be kept either.
        let summary = apply_limits_update(
            LimitsUpdate {
                new: vec![entry(None, "Travel", &[(None, "Hotel"), (None, "Hotel")])],
                modified: Vec::new(),
            },
            &connection,
        )
        .unwrap();

        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.created_categories, 0);
        assert_eq!(summary.created_subcategories, 0);
        assert!(get_all_categories(&connection).unwrap().is_empty());
    }
}

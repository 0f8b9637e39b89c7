//! Database operations for categories and subcategories.

use std::collections::HashMap;

use rusqlite::{Connection, OptionalExtension, Row};

use crate::{
    Amount, Error,
    category::{
        Category, CategoryId, CategoryName, CategoryNature, NewCategory, Subcategory,
        SubcategoryId,
        domain::{validate_limit, validate_subcategory_name},
    },
};

fn is_unique_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
            },
            _,
        )
    )
}

fn is_foreign_key_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
            },
            _,
        )
    )
}

/// Whether a delete failed because other rows still refer to the deleted row.
///
/// SQLite reports an `ON DELETE RESTRICT` action as a trigger constraint
/// rather than a foreign key constraint.
fn is_still_referenced(error: &rusqlite::Error) -> bool {
    is_foreign_key_violation(error)
        || matches!(
            error,
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_TRIGGER,
                },
                _,
            )
        )
}

/// Create a category and its subcategories and return it with its generated ID.
///
/// The category and its subcategories are written in a single SQL
/// transaction, if any insert fails nothing is persisted.
///
/// # Errors
/// This function will return a:
/// - [Error::DuplicateCategoryName] if a category with the same name exists,
/// - [Error::DuplicateSubcategoryName] if a subcategory name is repeated,
/// - [Error::Validation] or [Error::InvalidAmount] for blank subcategory names or a negative limit,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_category(new_category: NewCategory, connection: &Connection) -> Result<Category, Error> {
    let transaction = connection.unchecked_transaction()?;

    let category = insert_category(&new_category, &transaction)?;

    transaction.commit()?;

    Ok(category)
}

/// Insert a category and its subcategories without opening an SQL transaction.
///
/// The caller is responsible for rolling back on error.
pub(crate) fn insert_category(
    new_category: &NewCategory,
    connection: &Connection,
) -> Result<Category, Error> {
    let limit = validate_limit(new_category.limit)?;

    connection
        .execute(
            "INSERT INTO category (name, nature, spending_limit) VALUES (?1, ?2, ?3)",
            (new_category.name.as_ref(), new_category.nature, limit),
        )
        .map_err(|error| {
            if is_unique_violation(&error) {
                Error::DuplicateCategoryName(new_category.name.to_string())
            } else {
                error.into()
            }
        })?;

    let id = connection.last_insert_rowid();

    let mut subcategories = new_category
        .subcategories
        .iter()
        .map(|name| insert_subcategory(name, id, connection))
        .collect::<Result<Vec<_>, _>>()?;
    subcategories.sort_by(|a, b| a.name.cmp(&b.name));

    tracing::info!("created category {id} \"{}\"", new_category.name);

    Ok(Category {
        id,
        name: new_category.name.clone(),
        nature: new_category.nature,
        limit,
        subcategories,
    })
}

/// Add a subcategory to the category `category_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] if `name` is blank,
/// - [Error::DuplicateSubcategoryName] if the category already has a subcategory called `name`,
/// - [Error::CategoryNotFound] if `category_id` does not refer to a category,
/// - or [Error::SqlError] if there is some other SQL error.
pub(crate) fn insert_subcategory(
    name: &str,
    category_id: CategoryId,
    connection: &Connection,
) -> Result<Subcategory, Error> {
    let name = validate_subcategory_name(name)?;

    connection
        .execute(
            "INSERT INTO subcategory (name, category_id) VALUES (?1, ?2)",
            (&name, category_id),
        )
        .map_err(|error| {
            if is_unique_violation(&error) {
                Error::DuplicateSubcategoryName(name.clone())
            } else if is_foreign_key_violation(&error) {
                Error::CategoryNotFound(category_id)
            } else {
                error.into()
            }
        })?;

    Ok(Subcategory {
        id: connection.last_insert_rowid(),
        name,
        category_id,
    })
}

/// Retrieve a single category and its subcategories by ID.
///
/// # Errors
/// This function will return a [Error::CategoryNotFound] if `category_id`
/// does not refer to a category, or [Error::SqlError] if there is some other SQL error.
pub fn get_category(category_id: CategoryId, connection: &Connection) -> Result<Category, Error> {
    let category = connection
        .prepare("SELECT id, name, nature, spending_limit FROM category WHERE id = :id")?
        .query_row(&[(":id", &category_id)], map_category_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::CategoryNotFound(category_id),
            error => error.into(),
        })?;

    let subcategories = get_subcategories(category_id, connection)?;

    Ok(Category {
        subcategories,
        ..category
    })
}

/// Retrieve all categories with their subcategories, ordered by name.
pub fn get_all_categories(connection: &Connection) -> Result<Vec<Category>, Error> {
    let categories = connection
        .prepare("SELECT id, name, nature, spending_limit FROM category ORDER BY name ASC")?
        .query_map([], map_category_row)?
        .collect::<Result<Vec<_>, _>>()?;

    attach_subcategories(categories, connection)
}

/// Retrieve the categories available to `nature`, ordered by name.
///
/// [CategoryNature::All] returns every category. [CategoryNature::Pf] and
/// [CategoryNature::Pj] return the categories of that nature together with
/// the ones shared by both.
pub fn get_categories_by_nature(
    nature: CategoryNature,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    if nature == CategoryNature::All {
        return get_all_categories(connection);
    }

    let categories = connection
        .prepare(
            "SELECT id, name, nature, spending_limit FROM category
             WHERE nature = ?1 OR nature = ?2
             ORDER BY name ASC",
        )?
        .query_map((nature, CategoryNature::All), map_category_row)?
        .collect::<Result<Vec<_>, _>>()?;

    attach_subcategories(categories, connection)
}

fn attach_subcategories(
    categories: Vec<Category>,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    let mut subcategories_by_category: HashMap<CategoryId, Vec<Subcategory>> = HashMap::new();

    connection
        .prepare("SELECT id, name, category_id FROM subcategory ORDER BY name ASC")?
        .query_map([], map_subcategory_row)?
        .try_for_each(|subcategory| {
            let subcategory = subcategory?;
            subcategories_by_category
                .entry(subcategory.category_id)
                .or_default()
                .push(subcategory);

            Ok::<_, rusqlite::Error>(())
        })?;

    Ok(categories
        .into_iter()
        .map(|category| Category {
            subcategories: subcategories_by_category
                .remove(&category.id)
                .unwrap_or_default(),
            ..category
        })
        .collect())
}

/// Find a category by its exact name.
pub(crate) fn find_category_by_name(
    name: &CategoryName,
    connection: &Connection,
) -> Result<Option<Category>, Error> {
    let category_id: Option<CategoryId> = connection
        .query_row(
            "SELECT id FROM category WHERE name = ?1",
            [name.as_ref()],
            |row| row.get(0),
        )
        .optional()?;

    category_id
        .map(|id| get_category(id, connection))
        .transpose()
}

/// Retrieve the subcategories of a category ordered by name.
pub(crate) fn get_subcategories(
    category_id: CategoryId,
    connection: &Connection,
) -> Result<Vec<Subcategory>, Error> {
    connection
        .prepare(
            "SELECT id, name, category_id FROM subcategory
             WHERE category_id = ?1
             ORDER BY name ASC",
        )?
        .query_map([category_id], map_subcategory_row)?
        .map(|maybe_subcategory| maybe_subcategory.map_err(|error| error.into()))
        .collect()
}

/// Retrieve a single subcategory by ID.
///
/// # Errors
/// This function will return a [Error::SubcategoryNotFound] if
/// `subcategory_id` does not refer to a subcategory.
pub(crate) fn get_subcategory(
    subcategory_id: SubcategoryId,
    connection: &Connection,
) -> Result<Subcategory, Error> {
    connection
        .prepare("SELECT id, name, category_id FROM subcategory WHERE id = :id")?
        .query_row(&[(":id", &subcategory_id)], map_subcategory_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::SubcategoryNotFound(subcategory_id),
            error => error.into(),
        })
}

/// Find a subcategory of `category_id` by its exact name.
pub(crate) fn find_subcategory_by_name(
    name: &str,
    category_id: CategoryId,
    connection: &Connection,
) -> Result<Option<Subcategory>, Error> {
    connection
        .query_row(
            "SELECT id, name, category_id FROM subcategory WHERE name = ?1 AND category_id = ?2",
            (name.trim(), category_id),
            map_subcategory_row,
        )
        .optional()
        .map_err(|error| error.into())
}

/// Overwrite the name, nature and limit of a category.
///
/// # Errors
/// This function will return a:
/// - [Error::DuplicateCategoryName] if another category is already called `name`,
/// - [Error::InvalidAmount] if `limit` is negative,
/// - [Error::UpdateMissingCategory] if `category_id` does not refer to a category,
/// - or [Error::SqlError] if there is some other SQL error.
pub(crate) fn update_category_fields(
    category_id: CategoryId,
    name: &CategoryName,
    nature: CategoryNature,
    limit: Amount,
    connection: &Connection,
) -> Result<(), Error> {
    let limit = validate_limit(limit)?;

    let name_taken: bool = connection.query_row(
        "SELECT EXISTS(SELECT 1 FROM category WHERE name = ?1 AND id != ?2)",
        (name.as_ref(), category_id),
        |row| row.get(0),
    )?;

    if name_taken {
        return Err(Error::DuplicateCategoryName(name.to_string()));
    }

    let rows_affected = connection.execute(
        "UPDATE category SET name = ?1, nature = ?2, spending_limit = ?3 WHERE id = ?4",
        (name.as_ref(), nature, limit, category_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingCategory);
    }

    Ok(())
}

/// Rename a subcategory.
///
/// # Errors
/// This function will return a [Error::DuplicateSubcategoryName] if a
/// sibling subcategory already uses `name`, or [Error::SubcategoryNotFound]
/// if `subcategory_id` does not refer to a subcategory.
pub(crate) fn rename_subcategory(
    subcategory_id: SubcategoryId,
    name: &str,
    connection: &Connection,
) -> Result<(), Error> {
    let name = validate_subcategory_name(name)?;

    let rows_affected = connection
        .execute(
            "UPDATE subcategory SET name = ?1 WHERE id = ?2",
            (&name, subcategory_id),
        )
        .map_err(|error| {
            if is_unique_violation(&error) {
                Error::DuplicateSubcategoryName(name.clone())
            } else {
                error.into()
            }
        })?;

    if rows_affected == 0 {
        return Err(Error::SubcategoryNotFound(subcategory_id));
    }

    Ok(())
}

/// Delete a subcategory.
///
/// # Errors
/// This function will return a [Error::SubcategoryInUse] if transactions
/// still refer to the subcategory.
pub(crate) fn delete_subcategory(
    subcategory_id: SubcategoryId,
    connection: &Connection,
) -> Result<(), Error> {
    connection
        .execute("DELETE FROM subcategory WHERE id = ?1", [subcategory_id])
        .map_err(|error| {
            if is_still_referenced(&error) {
                Error::SubcategoryInUse(subcategory_id)
            } else {
                error.into()
            }
        })?;

    Ok(())
}

/// Delete a category and, through the cascade, its subcategories.
///
/// # Errors
/// This function will return a:
/// - [Error::CategoryInUse] if transactions still refer to the category,
/// - [Error::DeleteMissingCategory] if `category_id` does not refer to a category,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_category(category_id: CategoryId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection
        .execute("DELETE FROM category WHERE id = ?1", [category_id])
        .map_err(|error| {
            if is_still_referenced(&error) {
                Error::CategoryInUse(category_id)
            } else {
                error.into()
            }
        })?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingCategory);
    }

    tracing::info!("deleted category {category_id}");

    Ok(())
}

/// Initialize the category and subcategory tables and indexes.
pub fn create_category_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            nature TEXT NOT NULL CHECK (nature IN ('pf', 'pj', 'all')),
            spending_limit INTEGER NOT NULL DEFAULT 0 CHECK (spending_limit >= 0)
        );

        CREATE TABLE IF NOT EXISTS subcategory (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            category_id INTEGER NOT NULL,
            FOREIGN KEY(category_id) REFERENCES category(id) ON DELETE CASCADE,
            UNIQUE(category_id, name)
        );

        CREATE INDEX IF NOT EXISTS idx_category_nature ON category(nature);",
    )?;

    Ok(())
}

fn map_category_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let raw_name: String = row.get(1)?;

    Ok(Category {
        id: row.get(0)?,
        name: CategoryName::new_unchecked(&raw_name),
        nature: row.get(2)?,
        limit: row.get(3)?,
        subcategories: Vec::new(),
    })
}

fn map_subcategory_row(row: &Row) -> Result<Subcategory, rusqlite::Error> {
    Ok(Subcategory {
        id: row.get(0)?,
        name: row.get(1)?,
        category_id: row.get(2)?,
    })
}

#[cfg(test)]
pub(crate) mod test_utils {
    use rusqlite::Connection;

    use crate::{
        category::{Category, CategoryName, CategoryNature, NewCategory, create_category},
        db::initialize,
    };

    pub(crate) fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().expect("Could not open in-memory database");
        initialize(&connection).expect("Could not initialize database");
        connection
    }

    pub(crate) fn create_test_category(
        name: &str,
        nature: CategoryNature,
        subcategories: &[&str],
        connection: &Connection,
    ) -> Category {
        create_category(
            NewCategory {
                subcategories: subcategories.iter().map(|name| name.to_string()).collect(),
                ..NewCategory::new(CategoryName::new_unchecked(name), nature)
            },
            connection,
        )
        .expect("Could not create test category")
    }
}

//! Updating a category together with its list of subcategories.

use std::collections::HashSet;

use rusqlite::Connection;

use crate::{
    Error,
    category::{
        Category, CategoryId, CategoryUpdate, SubcategoryId,
        db::{
            delete_subcategory, get_category, insert_subcategory, rename_subcategory,
            update_category_fields,
        },
    },
};

/// Apply `update` to the category `category_id` and return the updated category.
///
/// When `update.subcategories` is given it replaces the category's
/// subcategories: existing subcategories whose IDs are missing from the list
/// are deleted, entries with an ID are renamed and entries without an ID are
/// created. Everything happens in one SQL transaction.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingCategory] if `category_id` does not refer to a category,
/// - [Error::DuplicateCategoryName] if another category already uses the new name,
/// - [Error::InvalidSubcategory] if an entry's ID is not a subcategory of this category,
/// - [Error::SubcategoryInUse] if a removed subcategory still has transactions,
/// - [Error::DuplicateSubcategoryName] if two subcategories would share a name,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_category(
    category_id: CategoryId,
    update: CategoryUpdate,
    connection: &Connection,
) -> Result<Category, Error> {
    let transaction = connection.unchecked_transaction()?;

    let existing = get_category(category_id, &transaction).map_err(|error| match error {
        Error::CategoryNotFound(_) => Error::UpdateMissingCategory,
        error => error,
    })?;

    update_category_fields(
        category_id,
        update.name.as_ref().unwrap_or(&existing.name),
        update.nature.unwrap_or(existing.nature),
        update.limit.unwrap_or(existing.limit),
        &transaction,
    )?;

    if let Some(subcategories) = update.subcategories {
        let existing_ids: HashSet<SubcategoryId> =
            existing.subcategories.iter().map(|s| s.id).collect();
        let incoming_ids: HashSet<SubcategoryId> =
            subcategories.iter().filter_map(|s| s.id).collect();

        if let Some(unknown_id) = incoming_ids.difference(&existing_ids).next() {
            return Err(Error::InvalidSubcategory(*unknown_id, category_id));
        }

        for removed_id in existing_ids.difference(&incoming_ids) {
            delete_subcategory(*removed_id, &transaction)?;
        }

        for subcategory in &subcategories {
            match subcategory.id {
                Some(id) => rename_subcategory(id, &subcategory.name, &transaction)?,
                None => {
                    insert_subcategory(&subcategory.name, category_id, &transaction)?;
                }
            }
        }
    }

    let category = get_category(category_id, &transaction)?;

    transaction.commit()?;

    tracing::info!("updated category {category_id}");

    Ok(category)
}

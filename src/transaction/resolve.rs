//! Resolving the category and subcategory a transaction refers to.
//!
//! Clients may refer to a category or subcategory either by ID or by name.
//! A name that does not exist yet creates the category or subcategory on the
//! fly, which lets a client record a transaction under a new category in one
//! request.

use rusqlite::Connection;

use crate::{
    Amount, Error,
    category::{
        Category, CategoryId, CategoryName, NewCategory, Subcategory, SubcategoryId,
        find_category_by_name, find_subcategory_by_name, get_category, get_subcategory,
        insert_category, insert_subcategory,
    },
    transaction::Nature,
};

/// A reference to a category by ID or by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryRef {
    /// An existing category.
    Id(CategoryId),
    /// A category that is created if it does not exist.
    Name(CategoryName),
}

impl CategoryRef {
    /// Build a reference from the optional ID and name fields of a request.
    ///
    /// The ID wins when both are given. Blank names count as missing.
    /// Returns `None` when neither is given.
    pub fn from_fields(
        id: Option<CategoryId>,
        name: Option<&str>,
    ) -> Result<Option<Self>, Error> {
        match (id, name.filter(|name| !name.trim().is_empty())) {
            (Some(id), _) => Ok(Some(CategoryRef::Id(id))),
            (None, Some(name)) => CategoryName::new(name).map(|name| Some(CategoryRef::Name(name))),
            (None, None) => Ok(None),
        }
    }

    /// Like [CategoryRef::from_fields], but a reference must be given.
    pub fn required(id: Option<CategoryId>, name: Option<&str>) -> Result<Self, Error> {
        Self::from_fields(id, name)?
            .ok_or_else(|| Error::Validation("provide a category_id or a category_name".to_owned()))
    }
}

/// A reference to a subcategory by ID or by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubcategoryRef {
    /// An existing subcategory, which must belong to the resolved category.
    Id(SubcategoryId),
    /// A subcategory of the resolved category that is created if it does not exist.
    Name(String),
}

impl SubcategoryRef {
    /// Build a reference from the optional ID and name fields of a request.
    ///
    /// The ID wins when both are given. Blank names count as missing.
    /// Returns `None` when neither is given.
    pub fn from_fields(id: Option<SubcategoryId>, name: Option<&str>) -> Option<Self> {
        match (id, name.map(str::trim).filter(|name| !name.is_empty())) {
            (Some(id), _) => Some(SubcategoryRef::Id(id)),
            (None, Some(name)) => Some(SubcategoryRef::Name(name.to_owned())),
            (None, None) => None,
        }
    }

    /// Like [SubcategoryRef::from_fields], but a reference must be given.
    pub fn required(id: Option<SubcategoryId>, name: Option<&str>) -> Result<Self, Error> {
        Self::from_fields(id, name).ok_or_else(|| {
            Error::Validation("provide a subcategory_id or a subcategory_name".to_owned())
        })
    }
}

/// Find the category `reference` points to, creating it if it is a new name.
///
/// Categories created here have no limit and take the transaction's `nature`.
///
/// # Errors
/// This function will return a [Error::CategoryNotFound] if an ID does not
/// refer to a category, or [Error::SqlError] if there is some other SQL error.
pub fn resolve_category(
    reference: &CategoryRef,
    nature: Nature,
    connection: &Connection,
) -> Result<Category, Error> {
    match reference {
        CategoryRef::Id(id) => get_category(*id, connection),
        CategoryRef::Name(name) => match find_category_by_name(name, connection)? {
            Some(category) => Ok(category),
            None => {
                tracing::info!("creating category \"{name}\" for a transaction");

                insert_category(
                    &NewCategory {
                        limit: Amount::ZERO,
                        ..NewCategory::new(name.clone(), nature.into())
                    },
                    connection,
                )
            }
        },
    }
}

/// Find the subcategory of `category_id` that `reference` points to,
/// creating it if it is a new name.
///
/// # Errors
/// This function will return a [Error::InvalidSubcategory] if an ID does not
/// refer to a subcategory of `category_id`, or [Error::SqlError] if there is
/// some other SQL error.
pub fn resolve_subcategory(
    reference: &SubcategoryRef,
    category_id: CategoryId,
    connection: &Connection,
) -> Result<Subcategory, Error> {
    match reference {
        SubcategoryRef::Id(id) => match get_subcategory(*id, connection) {
            Ok(subcategory) if subcategory.category_id == category_id => Ok(subcategory),
            Ok(_) | Err(Error::SubcategoryNotFound(_)) => {
                Err(Error::InvalidSubcategory(*id, category_id))
            }
            Err(error) => Err(error),
        },
        SubcategoryRef::Name(name) => {
            match find_subcategory_by_name(name, category_id, connection)? {
                Some(subcategory) => Ok(subcategory),
                None => {
                    tracing::info!(
                        "creating subcategory \"{name}\" in category {category_id} for a transaction"
                    );
                    insert_subcategory(name, category_id, connection)
                }
            }
        }
    }
}

#[cfg(test)]
mod reference_tests {
    use crate::{
        Error,
        category::CategoryName,
        transaction::{CategoryRef, SubcategoryRef},
    };

    #[test]
    fn id_wins_over_name() {
        assert_eq!(
            CategoryRef::from_fields(Some(3), Some("Food")),
            Ok(Some(CategoryRef::Id(3)))
        );
        assert_eq!(
            SubcategoryRef::from_fields(Some(4), Some("Bakery")),
            Some(SubcategoryRef::Id(4))
        );
    }

    #[test]
    fn blank_names_count_as_missing() {
        assert_eq!(CategoryRef::from_fields(None, Some("  ")), Ok(None));
        assert_eq!(SubcategoryRef::from_fields(None, Some("")), None);
    }

    #[test]
    fn names_are_trimmed() {
        assert_eq!(
            CategoryRef::from_fields(None, Some(" Food ")),
            Ok(Some(CategoryRef::Name(CategoryName::new_unchecked("Food"))))
        );
        assert_eq!(
            SubcategoryRef::from_fields(None, Some(" Bakery ")),
            Some(SubcategoryRef::Name("Bakery".to_owned()))
        );
    }

    #[test]
    fn required_reference_must_be_given() {
        assert!(matches!(
            CategoryRef::required(None, None),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            SubcategoryRef::required(None, Some(" ")),
            Err(Error::Validation(_))
        ));
    }
}

#[cfg(test)]
mod resolve_tests {
    use crate::{
        Amount, Error,
        category::{
            CategoryName, CategoryNature, get_all_categories,
            test_utils::{create_test_category, get_test_connection},
        },
        transaction::{CategoryRef, Nature, SubcategoryRef},
    };

    use super::{resolve_category, resolve_subcategory};

    #[test]
    fn resolves_existing_category_by_id_and_name() {
        let connection = get_test_connection();
        let food = create_test_category("Food", CategoryNature::Pf, &[], &connection);

        assert_eq!(
            resolve_category(&CategoryRef::Id(food.id), Nature::Pf, &connection),
            Ok(food.clone())
        );
        assert_eq!(
            resolve_category(
                &CategoryRef::Name(CategoryName::new_unchecked("Food")),
                Nature::Pj,
                &connection
            ),
            Ok(food)
        );
        assert_eq!(get_all_categories(&connection).unwrap().len(), 1);
    }

    #[test]
    fn unknown_category_id_is_not_found() {
        let connection = get_test_connection();

        assert_eq!(
            resolve_category(&CategoryRef::Id(12), Nature::Pf, &connection),
            Err(Error::CategoryNotFound(12))
        );
    }

    #[test]
    fn new_category_name_creates_category_with_transaction_nature() {
        let connection = get_test_connection();

        let category = resolve_category(
            &CategoryRef::Name(CategoryName::new_unchecked("Marketing")),
            Nature::Pj,
            &connection,
        )
        .expect("Could not resolve category");

        assert_eq!(category.name.as_ref(), "Marketing");
        assert_eq!(category.nature, CategoryNature::Pj);
        assert_eq!(category.limit, Amount::ZERO);
        assert!(category.subcategories.is_empty());
    }

    #[test]
    fn subcategory_of_another_category_is_invalid() {
        let connection = get_test_connection();
        let food = create_test_category("Food", CategoryNature::Pf, &["Bakery"], &connection);
        let home = create_test_category("Home", CategoryNature::Pf, &["Rent"], &connection);
        let rent_id = home.subcategories[0].id;

        assert_eq!(
            resolve_subcategory(&SubcategoryRef::Id(rent_id), food.id, &connection),
            Err(Error::InvalidSubcategory(rent_id, food.id))
        );
        assert_eq!(
            resolve_subcategory(&SubcategoryRef::Id(999), food.id, &connection),
            Err(Error::InvalidSubcategory(999, food.id))
        );
    }

    #[test]
    fn subcategory_name_is_matched_within_category() {
        let connection = get_test_connection();
        let food = create_test_category("Food", CategoryNature::Pf, &["Other"], &connection);
        let home = create_test_category("Home", CategoryNature::Pf, &[], &connection);

        let existing = resolve_subcategory(
            &SubcategoryRef::Name("Other".to_owned()),
            food.id,
            &connection,
        )
        .unwrap();
        let created = resolve_subcategory(
            &SubcategoryRef::Name("Other".to_owned()),
            home.id,
            &connection,
        )
        .unwrap();

        assert_eq!(existing, food.subcategories[0]);
        assert_ne!(created.id, existing.id);
        assert_eq!(created.category_id, home.id);
    }
}

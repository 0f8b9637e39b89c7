//! Core category domain types.

use std::{fmt::Display, str::FromStr};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::{Amount, Error, database_id::DatabaseId, transaction::Nature};

/// Database identifier for a category.
pub type CategoryId = DatabaseId;

/// Database identifier for a subcategory.
pub type SubcategoryId = DatabaseId;

/// A validated, non-empty category name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash, PartialOrd, Ord)]
#[serde(try_from = "String")]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name.
    ///
    /// Leading and trailing whitespace is removed.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::Validation] if `name` is empty or just whitespace.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::Validation("category name cannot be empty".to_owned()))
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a category name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl TryFrom<String> for CategoryName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        CategoryName::new(&value)
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for CategoryName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CategoryName::new(s)
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trim a subcategory name and check that something is left.
pub(crate) fn validate_subcategory_name(name: &str) -> Result<String, Error> {
    let name = name.trim();

    if name.is_empty() {
        Err(Error::Validation(
            "subcategory name cannot be empty".to_owned(),
        ))
    } else {
        Ok(name.to_owned())
    }
}

/// Which books a category is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CategoryNature {
    /// Personal finances (pessoa física).
    Pf,
    /// Business finances (pessoa jurídica).
    Pj,
    /// Shared by personal and business finances.
    #[default]
    All,
}

impl CategoryNature {
    /// The value stored in the database and sent to clients.
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryNature::Pf => "pf",
            CategoryNature::Pj => "pj",
            CategoryNature::All => "all",
        }
    }
}

impl FromStr for CategoryNature {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pf" => Ok(CategoryNature::Pf),
            "pj" => Ok(CategoryNature::Pj),
            "all" => Ok(CategoryNature::All),
            other => Err(Error::Validation(format!(
                "\"{other}\" is not a category nature, expected pf, pj or all"
            ))),
        }
    }
}

impl From<Nature> for CategoryNature {
    fn from(nature: Nature) -> Self {
        match nature {
            Nature::Pf => CategoryNature::Pf,
            Nature::Pj => CategoryNature::Pj,
        }
    }
}

impl ToSql for CategoryNature {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for CategoryNature {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: Error| FromSqlError::Other(Box::new(error)))
    }
}

/// A subcategory, e.g. "Restaurants" under "Food".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Subcategory {
    /// The ID of the subcategory.
    pub id: SubcategoryId,
    /// The subcategory name, unique within its category.
    pub name: String,
    /// The category the subcategory belongs to.
    pub category_id: CategoryId,
}

/// A category for grouping transactions, e.g. "Food", "Salary", "Marketing".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The unique category name.
    pub name: CategoryName,
    /// Which books the category is used for.
    pub nature: CategoryNature,
    /// The monthly spending limit, zero if there is none.
    pub limit: Amount,
    /// The subcategories ordered by name.
    pub subcategories: Vec<Subcategory>,
}

/// The data needed to create a category.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewCategory {
    /// The unique category name.
    pub name: CategoryName,
    /// Which books the category is used for.
    #[serde(default)]
    pub nature: CategoryNature,
    /// The monthly spending limit.
    #[serde(default)]
    pub limit: Amount,
    /// Names of subcategories to create along with the category.
    #[serde(default)]
    pub subcategories: Vec<String>,
}

impl NewCategory {
    /// A category with no limit and no subcategories.
    pub fn new(name: CategoryName, nature: CategoryNature) -> Self {
        Self {
            name,
            nature,
            limit: Amount::ZERO,
            subcategories: Vec::new(),
        }
    }
}

/// A subcategory entry in a category update.
///
/// Entries with an ID rename an existing subcategory, entries without one
/// create a new subcategory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubcategoryUpdate {
    /// The ID of an existing subcategory of the category being updated.
    #[serde(default)]
    pub id: Option<SubcategoryId>,
    /// The new or updated subcategory name.
    pub name: String,
}

/// A partial update of a category.
///
/// Fields that are `None` are left as they are. When `subcategories` is
/// given, it is the complete list of subcategories the category should have.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct CategoryUpdate {
    /// The new unique category name.
    #[serde(default)]
    pub name: Option<CategoryName>,
    /// The new nature.
    #[serde(default)]
    pub nature: Option<CategoryNature>,
    /// The new monthly spending limit.
    #[serde(default)]
    pub limit: Option<Amount>,
    /// The full list of subcategories.
    #[serde(default)]
    pub subcategories: Option<Vec<SubcategoryUpdate>>,
}

/// Reject negative limits.
pub(crate) fn validate_limit(limit: Amount) -> Result<Amount, Error> {
    if limit < Amount::ZERO {
        Err(Error::InvalidAmount(format!(
            "{limit} (a limit cannot be negative)"
        )))
    } else {
        Ok(limit)
    }
}

#[cfg(test)]
mod category_name_tests {
    use crate::{Error, category::CategoryName};

    #[test]
    fn new_fails_on_empty_string() {
        let name = CategoryName::new("");

        assert!(matches!(name, Err(Error::Validation(_))));
    }

    #[test]
    fn new_fails_on_just_whitespace() {
        let name = CategoryName::new("\n\t \r");

        assert!(matches!(name, Err(Error::Validation(_))));
    }

    #[test]
    fn new_trims_whitespace() {
        let name = CategoryName::new("  Food ").unwrap();

        assert_eq!(name.as_ref(), "Food");
    }

    #[test]
    fn deserialize_validates() {
        let result: Result<CategoryName, _> = serde_json::from_str("\"   \"");

        assert!(result.is_err());
    }
}

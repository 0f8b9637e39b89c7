//! Recording new transactions, including purchases split into installments.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::Deserialize;
use time::{OffsetDateTime, PrimitiveDateTime};
use uuid::Uuid;

use crate::{
    Amount, AppState, Error,
    category::{CategoryId, SubcategoryId},
    date_input::DateInput,
    transaction::{
        CategoryRef, InstallmentCount, Nature, PaymentMethod, SubcategoryRef, Transaction,
        TransactionKind,
        core::{TRANSACTION_COLUMNS, map_transaction_row},
        installment::split_into_installments,
        resolve::{resolve_category, resolve_subcategory},
    },
};

/// The longest description accepted, in characters.
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

/// A validated transaction, ready to be split and stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// The total amount of the purchase.
    pub amount: Amount,
    /// What the transaction was for.
    pub description: String,
    /// How many installments to split the purchase into.
    pub installment_count: InstallmentCount,
    /// When the first (or only) installment is due.
    pub due_date: PrimitiveDateTime,
    /// Income, expense or investment.
    pub kind: TransactionKind,
    /// Personal or business.
    pub nature: Nature,
    /// How the transaction was paid.
    pub payment_method: PaymentMethod,
    /// The category, by ID or by name.
    pub category: CategoryRef,
    /// The subcategory, by ID or by name.
    pub subcategory: SubcategoryRef,
}

/// Trim a description and check its length.
pub(crate) fn validate_description(description: &str) -> Result<String, Error> {
    let description = description.trim();
    let length = description.chars().count();

    if length == 0 {
        return Err(Error::Validation("description cannot be empty".to_owned()));
    }

    if length > MAX_DESCRIPTION_LENGTH {
        return Err(Error::Validation(format!(
            "description must be at most {MAX_DESCRIPTION_LENGTH} characters, got {length}"
        )));
    }

    Ok(description.to_owned())
}

/// The JSON body for creating a transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTransactionPayload {
    /// The total amount, must be greater than zero.
    pub amount: Amount,
    /// What the transaction was for.
    pub description: String,
    /// The number of installments, defaults to one.
    #[serde(default)]
    pub installment_count: Option<InstallmentCount>,
    /// The due date in any supported format.
    pub due_date: DateInput,
    /// Income, expense or investment.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Personal or business.
    pub nature: Nature,
    /// How the transaction was paid.
    pub payment_method: PaymentMethod,
    /// The ID of an existing category.
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// The name of a category, created if it does not exist.
    #[serde(default)]
    pub category_name: Option<String>,
    /// The ID of an existing subcategory of the category.
    #[serde(default)]
    pub subcategory_id: Option<SubcategoryId>,
    /// The name of a subcategory, created if it does not exist.
    #[serde(default)]
    pub subcategory_name: Option<String>,
}

impl TryFrom<CreateTransactionPayload> for NewTransaction {
    type Error = Error;

    fn try_from(payload: CreateTransactionPayload) -> Result<Self, Self::Error> {
        if !payload.amount.is_positive() {
            return Err(Error::InvalidAmount(format!(
                "{} (the amount must be greater than zero)",
                payload.amount
            )));
        }

        Ok(NewTransaction {
            amount: payload.amount,
            description: validate_description(&payload.description)?,
            installment_count: payload.installment_count.unwrap_or_default(),
            due_date: payload.due_date.resolve()?,
            kind: payload.kind,
            nature: payload.nature,
            payment_method: payload.payment_method,
            category: CategoryRef::required(
                payload.category_id,
                payload.category_name.as_deref(),
            )?,
            subcategory: SubcategoryRef::required(
                payload.subcategory_id,
                payload.subcategory_name.as_deref(),
            )?,
        })
    }
}

/// Store a transaction, split into installments when paid by credit.
///
/// The category and subcategory are resolved (and created if referenced by a
/// new name) in the same SQL transaction as the inserts, so either every
/// installment is stored or nothing is.
///
/// Returns the stored installments ordered by installment number.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] if more than one installment is requested for a payment method other than credit,
/// - [Error::InvalidAmount] if the amount cannot be split into the requested installments,
/// - [Error::CategoryNotFound] or [Error::InvalidSubcategory] if the references cannot be resolved,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    new_transaction: NewTransaction,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    if new_transaction.installment_count > InstallmentCount::ONE
        && new_transaction.payment_method != PaymentMethod::Credit
    {
        return Err(Error::Validation(format!(
            "only credit purchases can be split into installments, got {} installments paid by {}",
            new_transaction.installment_count,
            new_transaction.payment_method.as_str()
        )));
    }

    let installments = split_into_installments(
        new_transaction.amount,
        new_transaction.installment_count,
        new_transaction.due_date,
        &new_transaction.description,
    )?;

    let sql_transaction = connection.unchecked_transaction()?;

    let category = resolve_category(
        &new_transaction.category,
        new_transaction.nature,
        &sql_transaction,
    )?;
    let subcategory = resolve_subcategory(
        &new_transaction.subcategory,
        category.id,
        &sql_transaction,
    )?;

    let group_id = Uuid::new_v4();
    let now = OffsetDateTime::now_utc();
    let installment_count = new_transaction.installment_count.get();

    let transactions = {
        let mut statement = sql_transaction.prepare(&format!(
            "INSERT INTO \"transaction\" (group_id, amount, description, installment_index,
                installment_count, due_date, created_at, updated_at, kind, nature,
                payment_method, category_id, subcategory_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, ?8, ?9, ?10, ?11, ?12)
             RETURNING {TRANSACTION_COLUMNS}"
        ))?;

        installments
            .into_iter()
            .map(|installment| {
                statement.query_row(
                    rusqlite::params![
                        group_id.to_string(),
                        installment.amount,
                        installment.description,
                        installment.index,
                        installment_count,
                        installment.due_date,
                        now,
                        new_transaction.kind,
                        new_transaction.nature,
                        new_transaction.payment_method,
                        category.id,
                        subcategory.id,
                    ],
                    map_transaction_row,
                )
            })
            .collect::<Result<Vec<_>, _>>()?
    };

    sql_transaction.commit()?;

    tracing::info!(
        "created transaction group {group_id} with {} installment(s)",
        transactions.len()
    );

    Ok(transactions)
}

/// The state needed for creating a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionState {
    /// The database connection for writing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Create a transaction, or a group of installments for a credit purchase.
///
/// Responds with 201 and the first installment, which carries the group ID
/// for fetching the rest.
pub async fn create_transaction_endpoint(
    State(state): State<CreateTransactionState>,
    Json(payload): Json<CreateTransactionPayload>,
) -> Result<(StatusCode, Json<Transaction>), Error> {
    let new_transaction = NewTransaction::try_from(payload)?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let transactions = create_transaction(new_transaction, &connection)?;

    transactions
        .into_iter()
        .next()
        .map(|first| (StatusCode::CREATED, Json(first)))
        .ok_or_else(|| {
            tracing::error!("creating a transaction returned no installments");
            Error::NotFound
        })
}

#[cfg(test)]
pub(crate) mod test_utils {
    use time::macros::datetime;

    use crate::{
        Amount,
        category::CategoryName,
        transaction::{
            CategoryRef, InstallmentCount, Nature, NewTransaction, PaymentMethod, SubcategoryRef,
            TransactionKind,
        },
    };

    /// A single expense of `cents` in "Food" / "Groceries".
    pub(crate) fn new_expense(cents: i64) -> NewTransaction {
        NewTransaction {
            amount: Amount::from_cents(cents),
            description: "Groceries".to_owned(),
            installment_count: InstallmentCount::ONE,
            due_date: datetime!(2025 - 01 - 31 0:00),
            kind: TransactionKind::Expense,
            nature: Nature::Pf,
            payment_method: PaymentMethod::Debit,
            category: CategoryRef::Name(CategoryName::new_unchecked("Food")),
            subcategory: SubcategoryRef::Name("Groceries".to_owned()),
        }
    }
}

#[cfg(test)]
mod create_transaction_tests {
    use time::macros::datetime;

    use crate::{
        Amount, Error,
        category::{CategoryNature, get_all_categories, test_utils::get_test_connection},
        transaction::{
            InstallmentCount, NewTransaction, PaymentMethod, SubcategoryRef, count_transactions,
            create_transaction, get_transaction_group,
        },
    };

    use super::test_utils::new_expense;

    fn credit_purchase(cents: i64, installments: i64) -> NewTransaction {
        NewTransaction {
            description: "Laptop".to_owned(),
            installment_count: InstallmentCount::new(installments).unwrap(),
            payment_method: PaymentMethod::Credit,
            ..new_expense(cents)
        }
    }

    #[test]
    fn single_transaction_keeps_amount_and_description() {
        let connection = get_test_connection();

        let transactions = create_transaction(new_expense(4_990), &connection).unwrap();

        assert_eq!(transactions.len(), 1);
        let transaction = &transactions[0];
        assert_eq!(transaction.amount, Amount::from_cents(4_990));
        assert_eq!(transaction.description, "Groceries");
        assert_eq!(transaction.installment_index, 1);
        assert_eq!(transaction.installment_count, 1);
        assert_eq!(transaction.due_date, datetime!(2025 - 01 - 31 0:00));
        assert_eq!(transaction.created_at, transaction.updated_at);
    }

    #[test]
    fn credit_purchase_is_split_into_installments() {
        let connection = get_test_connection();

        let transactions = create_transaction(credit_purchase(10_000, 3), &connection).unwrap();

        let amounts: Vec<_> = transactions.iter().map(|t| t.amount.cents()).collect();
        assert_eq!(amounts, [3334, 3333, 3333]);
        let dates: Vec<_> = transactions.iter().map(|t| t.due_date).collect();
        assert_eq!(
            dates,
            [
                datetime!(2025 - 01 - 31 0:00),
                datetime!(2025 - 02 - 01 0:00),
                datetime!(2025 - 03 - 01 0:00),
            ]
        );
        assert!(transactions.iter().all(|t| t.group_id == transactions[0].group_id));
        assert_eq!(transactions[2].description, "Laptop - installment 3/3");

        let group = get_transaction_group(transactions[0].group_id, &connection).unwrap();
        assert_eq!(group, transactions);
    }

    #[test]
    fn small_credit_purchase_stores_every_installment() {
        let connection = get_test_connection();

        let transactions = create_transaction(credit_purchase(100, 21), &connection).unwrap();

        assert_eq!(transactions.len(), 21);
        assert_eq!(transactions[0].amount, Amount::ZERO);
        assert_eq!(
            transactions.iter().map(|t| t.amount).sum::<Amount>(),
            Amount::from_cents(100)
        );
        assert_eq!(count_transactions(&connection), Ok(21));
    }

    #[test]
    fn installments_with_other_payment_methods_are_rejected() {
        let connection = get_test_connection();
        let new_transaction = NewTransaction {
            payment_method: PaymentMethod::Pix,
            ..credit_purchase(10_000, 3)
        };

        let result = create_transaction(new_transaction, &connection);

        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(count_transactions(&connection), Ok(0));
    }

    #[test]
    fn new_category_name_is_created_with_transaction_nature() {
        let connection = get_test_connection();

        let transactions = create_transaction(new_expense(1_000), &connection).unwrap();

        let categories = get_all_categories(&connection).unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].nature, CategoryNature::Pf);
        assert_eq!(transactions[0].category_id, categories[0].id);
        assert_eq!(
            transactions[0].subcategory_id,
            categories[0].subcategories[0].id
        );
    }

    #[test]
    fn failed_insert_rolls_back_the_whole_batch() {
        let connection = get_test_connection();
        connection
            .execute_batch(
                "CREATE TRIGGER fail_second_installment
                 BEFORE INSERT ON \"transaction\"
                 WHEN NEW.installment_index = 2
                 BEGIN
                     SELECT RAISE(ABORT, 'simulated failure');
                 END;",
            )
            .unwrap();

        let result = create_transaction(credit_purchase(30_000, 3), &connection);

        assert!(result.is_err());
        assert_eq!(count_transactions(&connection), Ok(0));
        // The category created from the name is rolled back too.
        assert!(get_all_categories(&connection).unwrap().is_empty());
    }

    #[test]
    fn invalid_subcategory_creates_nothing() {
        let connection = get_test_connection();
        let new_transaction = NewTransaction {
            subcategory: SubcategoryRef::Id(42),
            ..new_expense(1_000)
        };

        let result = create_transaction(new_transaction, &connection);

        assert!(matches!(result, Err(Error::InvalidSubcategory(42, _))));
        assert!(get_all_categories(&connection).unwrap().is_empty());
    }
}

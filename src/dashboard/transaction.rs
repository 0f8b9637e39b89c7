//! Database queries for retrieving dashboard transaction data.
//!
//! The category breakdowns only need the amount, the due date and the names
//! of the category and subcategory, so they use a simplified view joined with
//! the category tables instead of the full [Transaction].

use std::ops::Range;

use rusqlite::Connection;
use time::PrimitiveDateTime;

use crate::{
    Amount, Error,
    category::CategoryId,
    transaction::{Nature, TRANSACTION_COLUMNS, Transaction, TransactionKind, map_transaction_row},
};

/// A transaction joined with its category and subcategory names.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct CategorizedTransaction {
    pub amount: Amount,
    pub category_id: CategoryId,
    pub category_name: String,
    pub category_limit: Amount,
    pub subcategory_name: String,
}

/// Gets the transactions of `kind` and `nature` due within `due_dates`,
/// joined with their category and subcategory.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub(super) fn get_categorized_transactions(
    kind: TransactionKind,
    nature: Nature,
    due_dates: Range<PrimitiveDateTime>,
    connection: &Connection,
) -> Result<Vec<CategorizedTransaction>, Error> {
    connection
        .prepare(
            "SELECT t.amount, c.id, c.name, c.spending_limit, s.name
             FROM \"transaction\" t
             INNER JOIN category c ON c.id = t.category_id
             INNER JOIN subcategory s ON s.id = t.subcategory_id
             WHERE t.kind = ?1 AND t.nature = ?2 AND t.due_date >= ?3 AND t.due_date < ?4",
        )?
        .query_map(
            (kind, nature, due_dates.start, due_dates.end),
            |row| {
                Ok(CategorizedTransaction {
                    amount: row.get(0)?,
                    category_id: row.get(1)?,
                    category_name: row.get(2)?,
                    category_limit: row.get(3)?,
                    subcategory_name: row.get(4)?,
                })
            },
        )?
        .collect::<Result<Vec<_>, rusqlite::Error>>()
        .map_err(|error| error.into())
}

/// Gets every transaction of `nature` due within `due_dates`, newest first.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub(super) fn get_transactions_by_nature(
    nature: Nature,
    due_dates: Range<PrimitiveDateTime>,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\"
             WHERE nature = ?1 AND due_date >= ?2 AND due_date < ?3
             ORDER BY due_date DESC, id DESC"
        ))?
        .query_map((nature, due_dates.start, due_dates.end), map_transaction_row)?
        .collect::<Result<Vec<_>, rusqlite::Error>>()
        .map_err(|error| error.into())
}

#[cfg(test)]
mod dashboard_query_tests {
    use rusqlite::Connection;
    use time::macros::datetime;

    use crate::{
        Amount, CategoryName,
        category::test_utils::get_test_connection,
        transaction::{
            CategoryRef, Nature, NewTransaction, SubcategoryRef, TransactionKind,
            test_utils::new_expense, create_transaction,
        },
    };

    use super::{get_categorized_transactions, get_transactions_by_nature};

    fn insert(
        cents: i64,
        kind: TransactionKind,
        nature: Nature,
        due_date: time::PrimitiveDateTime,
        connection: &Connection,
    ) {
        create_transaction(
            NewTransaction {
                kind,
                nature,
                due_date,
                ..new_expense(cents)
            },
            connection,
        )
        .unwrap();
    }

    #[test]
    fn filters_by_kind_nature_and_range() {
        let connection = get_test_connection();
        insert(100, TransactionKind::Expense, Nature::Pf, datetime!(2025 - 01 - 01 0:00), &connection);
        insert(200, TransactionKind::Expense, Nature::Pf, datetime!(2025 - 01 - 31 23:59), &connection);
        insert(300, TransactionKind::Income, Nature::Pf, datetime!(2025 - 01 - 10 0:00), &connection);
        insert(400, TransactionKind::Expense, Nature::Pj, datetime!(2025 - 01 - 10 0:00), &connection);
        insert(500, TransactionKind::Expense, Nature::Pf, datetime!(2025 - 02 - 01 0:00), &connection);

        let transactions = get_categorized_transactions(
            TransactionKind::Expense,
            Nature::Pf,
            datetime!(2025 - 01 - 01 0:00)..datetime!(2025 - 02 - 01 0:00),
            &connection,
        )
        .unwrap();

        let total: Amount = transactions.iter().map(|t| t.amount).sum();
        assert_eq!(transactions.len(), 2);
        assert_eq!(total, Amount::from_cents(300));
        assert!(transactions.iter().all(|t| t.category_name == "Food"));
        assert!(transactions.iter().all(|t| t.subcategory_name == "Groceries"));
    }

    #[test]
    fn joins_category_and_subcategory_names() {
        let connection = get_test_connection();
        create_transaction(
            NewTransaction {
                category: CategoryRef::Name(CategoryName::new_unchecked("Home")),
                subcategory: SubcategoryRef::Name("Rent".to_owned()),
                ..new_expense(150_000)
            },
            &connection,
        )
        .unwrap();

        let transactions = get_categorized_transactions(
            TransactionKind::Expense,
            Nature::Pf,
            datetime!(2025 - 01 - 01 0:00)..datetime!(2026 - 01 - 01 0:00),
            &connection,
        )
        .unwrap();

        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].category_name, "Home");
        assert_eq!(transactions[0].subcategory_name, "Rent");
        assert_eq!(transactions[0].category_limit, Amount::ZERO);
    }

    #[test]
    fn transactions_by_nature_are_newest_first() {
        let connection = get_test_connection();
        insert(100, TransactionKind::Expense, Nature::Pj, datetime!(2025 - 03 - 01 0:00), &connection);
        insert(200, TransactionKind::Income, Nature::Pj, datetime!(2025 - 03 - 05 0:00), &connection);
        insert(300, TransactionKind::Income, Nature::Pf, datetime!(2025 - 03 - 06 0:00), &connection);

        let transactions = get_transactions_by_nature(
            Nature::Pj,
            datetime!(2025 - 03 - 01 0:00)..datetime!(2025 - 04 - 01 0:00),
            &connection,
        )
        .unwrap();

        let amounts: Vec<_> = transactions.iter().map(|t| t.amount.cents()).collect();
        assert_eq!(amounts, [200, 100]);
    }
}

//! Transactions, including credit purchases split into monthly installments.

mod core;
mod create;
mod delete;
mod edit;
mod installment;
mod list;
mod resolve;

pub use core::{
    Nature, PaymentMethod, Transaction, TransactionKind, count_transactions,
    create_transaction_table, get_transaction, get_transaction_group, get_transactions,
};
pub use create::{NewTransaction, create_transaction, create_transaction_endpoint};
pub use delete::{
    delete_transaction, delete_transaction_endpoint, delete_transaction_group,
    delete_transaction_group_endpoint,
};
pub use edit::{TransactionChanges, update_transaction, update_transaction_endpoint};
pub use installment::{Installment, InstallmentCount, split_into_installments};
pub use list::{
    get_transaction_endpoint, get_transaction_group_endpoint, list_transactions_endpoint,
};
pub use resolve::{CategoryRef, SubcategoryRef};

pub(crate) use core::{TRANSACTION_COLUMNS, map_transaction_row};

#[cfg(test)]
pub(crate) use create::test_utils;

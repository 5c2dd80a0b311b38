//! Transaction management for the finance tracker.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and `TransactionBuilder` for creating transactions
//! - Database functions for storing and managing transactions
//! - Filtered, sorted, and paged queries over the transaction table

mod core;
mod query;

pub use self::core::{
    Transaction, TransactionBuilder, TransactionId, TransactionUpdate, count_transactions,
    create_transaction, create_transaction_table, delete_transaction, get_transaction,
    get_transactions_by_category, get_transactions_by_user, map_transaction_row,
    update_transaction,
};
pub use self::query::{CreatedRange, SortOrder, TransactionQuery, query_transactions};

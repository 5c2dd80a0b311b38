//! Database initialisation for the application.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    Error, budget::create_budget_table, category::create_category_table,
    payment_method::create_payment_method_table,
    recurring_transaction::create_recurring_transaction_table, tag::create_tag_table,
    transaction::create_transaction_table, user::create_user_table,
};

/// Create the application schema on `connection` and turn on foreign key
/// enforcement.
///
/// Safe to call on a database that has already been initialised. Foreign keys
/// are enforced per connection in SQLite, so this function should be called
/// on every new connection, not just when the database file is first created.
///
/// # Errors
/// This function will return a [Error::SqlError] if a table cannot be
/// created or there is some other SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    // Must be set outside a transaction, SQLite ignores it otherwise.
    connection.pragma_update(None, "foreign_keys", true)?;

    let transaction =
        SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_category_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_tag_table(&transaction)?;
    create_payment_method_table(&transaction)?;
    create_recurring_transaction_table(&transaction)?;
    create_budget_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

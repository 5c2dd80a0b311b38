//! Core payment method domain types and database operations.
//!
//! Payment methods (e.g., 'Visa ending 1234', 'Cash') are associated to
//! transactions through the `transaction_payment_method` table rather than a
//! column on the transaction itself, and each transaction has at most one.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{
    DatabaseId, Error,
    transaction::{Transaction, TransactionId, get_transaction, map_transaction_row},
};

/// Database identifier for a payment method.
pub type PaymentMethodId = DatabaseId;

/// A validated, non-empty payment method name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct PaymentMethodName(String);

impl PaymentMethodName {
    /// Create a payment method name.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyPaymentMethodName] if `name`
    /// is an empty string.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyPaymentMethodName)
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a payment method name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because
    /// if the non-empty invariant is violated it will cause incorrect
    /// behaviour but not affect memory safety.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for PaymentMethodName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for PaymentMethodName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentMethodName::new(s)
    }
}

impl Display for PaymentMethodName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A way of paying for transactions (e.g., 'Visa ending 1234', 'Cash').
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct PaymentMethod {
    /// The ID of the payment method.
    pub id: PaymentMethodId,
    /// The payment method's display name, unique within the database.
    pub name: PaymentMethodName,
}

/// Create a payment method and return it with its generated ID.
///
/// # Errors
/// This function will return a:
/// - [Error::DuplicatePaymentMethodName] if a payment method with the same
///   name exists,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_payment_method(
    name: PaymentMethodName,
    connection: &Connection,
) -> Result<PaymentMethod, Error> {
    connection
        .execute(
            "INSERT INTO payment_method (name) VALUES (?1);",
            (name.as_ref(),),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicatePaymentMethodName(name.as_ref().to_string()),
            error => error.into(),
        })?;

    let id = connection.last_insert_rowid();

    Ok(PaymentMethod { id, name })
}

/// Retrieve a single payment method by ID.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `payment_method_id` does not refer to a valid
///   payment method,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_payment_method(
    payment_method_id: PaymentMethodId,
    connection: &Connection,
) -> Result<PaymentMethod, Error> {
    connection
        .prepare("SELECT id, name FROM payment_method WHERE id = :id;")?
        .query_row(&[(":id", &payment_method_id)], map_row)
        .map_err(|error| error.into())
}

/// Retrieve all payment methods ordered alphabetically by name.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_all_payment_methods(connection: &Connection) -> Result<Vec<PaymentMethod>, Error> {
    connection
        .prepare("SELECT id, name FROM payment_method ORDER BY name ASC;")?
        .query_map([], map_row)?
        .map(|maybe_payment_method| maybe_payment_method.map_err(|error| error.into()))
        .collect()
}

/// Update a payment method's name.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingPaymentMethod] if `payment_method_id` does not
///   refer to a valid payment method,
/// - or [Error::DuplicatePaymentMethodName] if another payment method
///   already has `new_name`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_payment_method(
    payment_method_id: PaymentMethodId,
    new_name: PaymentMethodName,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection
        .execute(
            "UPDATE payment_method SET name = ?1 WHERE id = ?2",
            (new_name.as_ref(), payment_method_id),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicatePaymentMethodName(new_name.as_ref().to_string()),
            error => error.into(),
        })?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingPaymentMethod);
    }

    Ok(())
}

/// Delete a payment method by ID.
///
/// Associations with transactions are removed along with the payment method.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingPaymentMethod] if `payment_method_id` does not
///   refer to a valid payment method,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_payment_method(
    payment_method_id: PaymentMethodId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM payment_method WHERE id = ?1",
        [payment_method_id],
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingPaymentMethod);
    }

    Ok(())
}

/// Get the number of payment methods in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn count_payment_methods(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM payment_method;", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

/// Record which payment method a transaction was paid with, replacing any
/// previous assignment.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidTransaction] if `transaction_id` does not refer to a
///   valid transaction,
/// - or [Error::InvalidPaymentMethod] if `payment_method_id` does not refer
///   to a valid payment method,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn set_transaction_payment_method(
    transaction_id: TransactionId,
    payment_method_id: PaymentMethodId,
    connection: &Connection,
) -> Result<(), Error> {
    get_transaction(transaction_id, connection).map_err(|error| match error {
        Error::NotFound => Error::InvalidTransaction(transaction_id),
        error => error,
    })?;
    get_payment_method(payment_method_id, connection).map_err(|error| match error {
        Error::NotFound => Error::InvalidPaymentMethod(payment_method_id),
        error => error,
    })?;

    connection.execute(
        "INSERT OR REPLACE INTO transaction_payment_method (transaction_id, payment_method_id)
         VALUES (?1, ?2)",
        (transaction_id, payment_method_id),
    )?;

    Ok(())
}

/// Remove the payment method assignment from a transaction.
///
/// Clearing a transaction without an assignment is a no-op.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn clear_transaction_payment_method(
    transaction_id: TransactionId,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "DELETE FROM transaction_payment_method WHERE transaction_id = ?1",
        [transaction_id],
    )?;

    Ok(())
}

/// Get the payment method a transaction was paid with, if one was recorded.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_transaction_payment_method(
    transaction_id: TransactionId,
    connection: &Connection,
) -> Result<Option<PaymentMethod>, Error> {
    let result = connection
        .prepare(
            "SELECT pm.id, pm.name
             FROM payment_method pm
             INNER JOIN transaction_payment_method tpm ON pm.id = tpm.payment_method_id
             WHERE tpm.transaction_id = ?1",
        )?
        .query_row([transaction_id], map_row);

    match result {
        Ok(payment_method) => Ok(Some(payment_method)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(error) => Err(error.into()),
    }
}

/// Get all transactions paid with a payment method, most recent first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_transactions_with_payment_method(
    payment_method_id: PaymentMethodId,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT tr.id, tr.text, tr.amount, tr.user_id, tr.category_id, tr.notes, tr.import_id, tr.created_at
             FROM \"transaction\" tr
             INNER JOIN transaction_payment_method tpm ON tr.id = tpm.transaction_id
             WHERE tpm.payment_method_id = ?1
             ORDER BY tr.created_at DESC, tr.id DESC",
        )?
        .query_map([payment_method_id], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::SqlError))
        .collect()
}

/// Create the payment_method and transaction_payment_method tables in the
/// database.
///
/// # Errors
/// Returns an error if the tables cannot be created or if there is an SQL error.
pub fn create_payment_method_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS payment_method (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS transaction_payment_method (
            transaction_id INTEGER PRIMARY KEY,
            payment_method_id INTEGER NOT NULL,
            FOREIGN KEY(transaction_id) REFERENCES \"transaction\"(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(payment_method_id) REFERENCES payment_method(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_transaction_payment_method_payment_method_id
            ON transaction_payment_method(payment_method_id);",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<PaymentMethod, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_name: String = row.get(1)?;
    let name = PaymentMethodName::new_unchecked(&raw_name);

    Ok(PaymentMethod { id, name })
}

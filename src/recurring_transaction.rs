//! Recurring transaction domain types and database operations.
//!
//! A recurring transaction marks an existing transaction as one that repeats
//! on a regular schedule (e.g., wages, phone bill) and records when the next
//! payment is due. This crate only stores that metadata; it never advances
//! the schedule or generates occurrences.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    DatabaseId, Error,
    transaction::{TransactionId, get_transaction},
    user::UserId,
};

/// Database identifier for a recurring transaction.
pub type RecurringTransactionId = DatabaseId;

/// How often a recurring transaction happens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// Every day.
    Daily,
    /// Every week.
    Weekly,
    /// Every two weeks.
    Fortnightly,
    /// A calendar month of variable length.
    Monthly,
    /// A calendar quarter (Jan-Mar, Apr-Jun, Jul-Sep, Oct-Dec).
    Quarterly,
    /// Every year.
    Yearly,
}

impl Frequency {
    /// The lowercase text form stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Fortnightly => "fortnightly",
            Frequency::Monthly => "monthly",
            Frequency::Quarterly => "quarterly",
            Frequency::Yearly => "yearly",
        }
    }
}

impl FromStr for Frequency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "fortnightly" => Ok(Frequency::Fortnightly),
            "monthly" => Ok(Frequency::Monthly),
            "quarterly" => Ok(Frequency::Quarterly),
            "yearly" => Ok(Frequency::Yearly),
            _ => Err(Error::InvalidFrequency(s.to_string())),
        }
    }
}

impl Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A transaction that repeats on a regular schedule.
///
/// This object must be attached to an existing transaction and cannot exist
/// independently. `user_id` always matches the owning user of the referenced
/// transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringTransaction {
    /// The ID of the recurring transaction.
    pub id: RecurringTransactionId,
    /// The ID of the transaction that repeats.
    pub transaction_id: TransactionId,
    /// How often the transaction repeats.
    pub frequency: Frequency,
    /// When the next payment is due.
    pub next_payment: Date,
    /// The ID of the user the underlying transaction belongs to.
    pub user_id: UserId,
    /// When the recurring transaction was recorded, in UTC.
    pub created_at: OffsetDateTime,
}

/// Mark a transaction as recurring.
///
/// The owning user is taken from the referenced transaction so the two can
/// never disagree.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidTransaction] if `transaction_id` does not refer to a
///   valid transaction,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_recurring_transaction(
    transaction_id: TransactionId,
    frequency: Frequency,
    next_payment: Date,
    connection: &Connection,
) -> Result<RecurringTransaction, Error> {
    let transaction = get_transaction(transaction_id, connection).map_err(|error| match error {
        Error::NotFound => Error::InvalidTransaction(transaction_id),
        error => error,
    })?;

    let recurring_transaction = connection
        .prepare(
            "INSERT INTO recurring_transaction (transaction_id, frequency, next_payment, user_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, transaction_id, frequency, next_payment, user_id, created_at",
        )?
        .query_row(
            (
                transaction_id,
                frequency.as_str(),
                next_payment,
                transaction.user_id.as_i64(),
                OffsetDateTime::now_utc(),
            ),
            map_row,
        )?;

    Ok(recurring_transaction)
}

/// Retrieve a recurring transaction by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid recurring
///   transaction,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_recurring_transaction(
    id: RecurringTransactionId,
    connection: &Connection,
) -> Result<RecurringTransaction, Error> {
    let recurring_transaction = connection
        .prepare(
            "SELECT id, transaction_id, frequency, next_payment, user_id, created_at
             FROM recurring_transaction WHERE id = :id",
        )?
        .query_row(&[(":id", &id)], map_row)?;

    Ok(recurring_transaction)
}

/// Retrieve a user's recurring transactions, ordered by the next payment due.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_recurring_transactions_by_user(
    user_id: UserId,
    connection: &Connection,
) -> Result<Vec<RecurringTransaction>, Error> {
    connection
        .prepare(
            "SELECT id, transaction_id, frequency, next_payment, user_id, created_at
             FROM recurring_transaction WHERE user_id = :user_id
             ORDER BY next_payment ASC, id ASC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row)?
        .map(|maybe_recurring| maybe_recurring.map_err(Error::SqlError))
        .collect()
}

/// Retrieve the recurring transactions attached to a transaction.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_recurring_transactions_for_transaction(
    transaction_id: TransactionId,
    connection: &Connection,
) -> Result<Vec<RecurringTransaction>, Error> {
    connection
        .prepare(
            "SELECT id, transaction_id, frequency, next_payment, user_id, created_at
             FROM recurring_transaction WHERE transaction_id = :transaction_id
             ORDER BY id ASC",
        )?
        .query_map(&[(":transaction_id", &transaction_id)], map_row)?
        .map(|maybe_recurring| maybe_recurring.map_err(Error::SqlError))
        .collect()
}

/// Update a recurring transaction's frequency and next payment date.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingRecurringTransaction] if `id` does not refer to a
///   valid recurring transaction,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_recurring_transaction(
    id: RecurringTransactionId,
    frequency: Frequency,
    next_payment: Date,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE recurring_transaction SET frequency = ?1, next_payment = ?2 WHERE id = ?3",
        (frequency.as_str(), next_payment, id),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingRecurringTransaction);
    }

    Ok(())
}

/// Delete a recurring transaction by ID.
///
/// The underlying transaction is not affected.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingRecurringTransaction] if `id` does not refer to a
///   valid recurring transaction,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_recurring_transaction(
    id: RecurringTransactionId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected =
        connection.execute("DELETE FROM recurring_transaction WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingRecurringTransaction);
    }

    Ok(())
}

/// Get the number of recurring transactions in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn count_recurring_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM recurring_transaction;", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

/// Create the recurring transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_recurring_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS recurring_transaction (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            transaction_id INTEGER NOT NULL,
            frequency TEXT NOT NULL,
            next_payment TEXT NOT NULL,
            user_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(transaction_id) REFERENCES \"transaction\"(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_recurring_transaction_user_next_payment
            ON recurring_transaction(user_id, next_payment);",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<RecurringTransaction, rusqlite::Error> {
    let id = row.get(0)?;
    let transaction_id = row.get(1)?;
    let raw_frequency: String = row.get(2)?;
    let frequency = raw_frequency.parse::<Frequency>().map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(error))
    })?;
    let next_payment = row.get(3)?;
    let user_id = UserId::new(row.get(4)?);
    let created_at = row.get(5)?;

    Ok(RecurringTransaction {
        id,
        transaction_id,
        frequency,
        next_payment,
        user_id,
        created_at,
    })
}

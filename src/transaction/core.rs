//! Defines the core data model and database operations for transactions.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, UtcOffset};

use crate::{
    DatabaseId, Error,
    category::{CategoryId, get_category},
    user::{UserId, get_user},
};

/// Database identifier for a transaction.
pub type TransactionId = DatabaseId;

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// To create a new `Transaction`, use [Transaction::build] and
/// [create_transaction].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// A text description of what the transaction was for.
    pub text: String,
    /// The amount of money spent or earned in this transaction.
    ///
    /// Positive values represent income, negative values represent expenses.
    pub amount: f64,
    /// The ID of the user the transaction belongs to.
    pub user_id: UserId,
    /// The ID of the category the transaction belongs to.
    pub category_id: CategoryId,
    /// Free-form notes attached to the transaction, if any.
    pub notes: Option<String>,
    /// A unique identifier for imported transactions.
    ///
    /// - `Some(id)` - the transaction was imported from a CSV file
    /// - `None` - the transaction was created manually by the user
    pub import_id: Option<i64>,
    /// When the transaction was recorded, in UTC.
    pub created_at: OffsetDateTime,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(
        text: &str,
        amount: f64,
        user_id: UserId,
        category_id: CategoryId,
    ) -> TransactionBuilder {
        TransactionBuilder {
            text: text.to_owned(),
            amount,
            user_id,
            category_id,
            notes: None,
            import_id: None,
            created_at: None,
        }
    }
}

/// A builder for creating [Transaction] instances.
///
/// This builder allows you to construct transactions step by step, providing
/// sensible defaults for optional fields. Pass the finished builder to
/// [create_transaction] to store the transaction.
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// A text description of what the transaction was for.
    pub text: String,
    /// The monetary amount of the transaction.
    pub amount: f64,
    /// The ID of the user the transaction belongs to.
    pub user_id: UserId,
    /// The ID of the category the transaction belongs to.
    pub category_id: CategoryId,
    /// Free-form notes attached to the transaction.
    pub notes: Option<String>,
    /// Optional unique identifier for imported transactions.
    ///
    /// This field is used to prevent duplicate imports when processing CSV
    /// files. The database enforces uniqueness on this field, so importing a
    /// transaction with a duplicate `import_id` fails gracefully and the same
    /// file can be imported multiple times safely.
    pub import_id: Option<i64>,
    /// When the transaction was recorded. Defaults to now if not specified.
    pub created_at: Option<OffsetDateTime>,
}

impl TransactionBuilder {
    /// Set the notes for the transaction.
    pub fn notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }

    /// Set the import ID for the transaction.
    pub fn import_id(mut self, import_id: Option<i64>) -> Self {
        self.import_id = import_id;
        self
    }

    /// Set the creation time for the transaction.
    pub fn created_at(mut self, created_at: OffsetDateTime) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// The fields that [update_transaction] can change.
///
/// Ownership of a transaction is fixed at creation, so `user_id` cannot be
/// changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionUpdate {
    /// A text description of what the transaction was for.
    pub text: String,
    /// The monetary amount of the transaction.
    pub amount: f64,
    /// The ID of the category the transaction belongs to.
    pub category_id: CategoryId,
    /// Free-form notes attached to the transaction, `None` clears them.
    pub notes: Option<String>,
}

/// Create a new transaction in the database from a builder.
///
/// Timestamps are normalised to UTC before storage.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidUser] if the builder's user ID does not refer to a real
///   user,
/// - or [Error::InvalidCategory] if the builder's category ID does not refer
///   to a real category,
/// - or [Error::DuplicateImportId] if a transaction with the specified import
///   ID already exists,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    get_user(builder.user_id, connection).map_err(|error| match error {
        Error::NotFound => Error::InvalidUser(builder.user_id),
        error => error,
    })?;
    get_category(builder.category_id, connection).map_err(|error| match error {
        Error::NotFound => Error::InvalidCategory(builder.category_id),
        error => error,
    })?;

    let created_at = builder
        .created_at
        .unwrap_or_else(OffsetDateTime::now_utc)
        .to_offset(UtcOffset::UTC);

    let transaction = connection
        .prepare(
            "INSERT INTO \"transaction\" (text, amount, user_id, category_id, notes, import_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             RETURNING id, text, amount, user_id, category_id, notes, import_id, created_at",
        )?
        .query_row(
            (
                builder.text,
                builder.amount,
                builder.user_id.as_i64(),
                builder.category_id,
                builder.notes,
                builder.import_id,
                created_at,
            ),
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "SELECT id, text, amount, user_id, category_id, notes, import_id, created_at
             FROM \"transaction\" WHERE id = :id",
        )?
        .query_row(&[(":id", &id)], map_transaction_row)?;

    Ok(transaction)
}

/// Retrieve the transactions belonging to a user, most recent first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_transactions_by_user(
    user_id: UserId,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, text, amount, user_id, category_id, notes, import_id, created_at
             FROM \"transaction\" WHERE user_id = :user_id
             ORDER BY created_at DESC, id DESC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::SqlError))
        .collect()
}

/// Retrieve the transactions in a category, most recent first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_transactions_by_category(
    category_id: CategoryId,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, text, amount, user_id, category_id, notes, import_id, created_at
             FROM \"transaction\" WHERE category_id = :category_id
             ORDER BY created_at DESC, id DESC",
        )?
        .query_map(&[(":category_id", &category_id)], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::SqlError))
        .collect()
}

/// Update a transaction's text, amount, category, and notes.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidCategory] if the update's category ID does not refer to a
///   real category,
/// - or [Error::UpdateMissingTransaction] if `id` does not refer to a valid
///   transaction,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_transaction(
    id: TransactionId,
    update: TransactionUpdate,
    connection: &Connection,
) -> Result<(), Error> {
    get_category(update.category_id, connection).map_err(|error| match error {
        Error::NotFound => Error::InvalidCategory(update.category_id),
        error => error,
    })?;

    let rows_affected = connection.execute(
        "UPDATE \"transaction\" SET text = ?1, amount = ?2, category_id = ?3, notes = ?4 WHERE id = ?5",
        (update.text, update.amount, update.category_id, update.notes, id),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingTransaction);
    }

    Ok(())
}

/// Delete a transaction by ID.
///
/// Recurring transactions attached to it and its tag and payment method
/// associations are deleted along with it.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingTransaction] if `id` does not refer to a valid
///   transaction,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_transaction(id: TransactionId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM \"transaction\" WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingTransaction);
    }

    Ok(())
}

/// Get the total number of transactions in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn count_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL,
                amount REAL NOT NULL,
                user_id INTEGER NOT NULL,
                category_id INTEGER NOT NULL,
                notes TEXT,
                import_id INTEGER UNIQUE,
                created_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE
                )",
        (),
    )?;

    // Composite index used by the per-user listing and filtered queries.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user_created
         ON \"transaction\"(user_id, created_at);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let text = row.get(1)?;
    let amount = row.get(2)?;
    let user_id = UserId::new(row.get(3)?);
    let category_id = row.get(4)?;
    let notes = row.get(5)?;
    let import_id = row.get(6)?;
    let created_at = row.get(7)?;

    Ok(Transaction {
        id,
        text,
        amount,
        user_id,
        category_id,
        notes,
        import_id,
        created_at,
    })
}

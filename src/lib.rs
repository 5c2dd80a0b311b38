//! Moneylog is the data layer for a personal finance tracker.
//!
//! This library models the records a finance tracker keeps — users,
//! transactions, categories, tags, payment methods, recurring transactions,
//! and budgets — and stores them in a SQLite database. It is intended to be
//! consumed by application code (a server, a CLI, an importer) that provides
//! its own presentation and identity handling.
//!
//! Call [initialize_db] on a fresh [rusqlite::Connection] to create the
//! schema, then use the entity modules ([user], [transaction], [category],
//! [tag], [payment_method], [recurring_transaction], [budget]) to create and
//! query records.

#![warn(missing_docs)]

pub mod budget;
pub mod category;
pub mod csv_import;
mod database_id;
pub mod db;
pub mod email;
pub mod payment_method;
pub mod recurring_transaction;
pub mod tag;
pub mod transaction;
pub mod user;

pub use database_id::DatabaseId;
pub use db::initialize as initialize_db;
pub use email::Email;
pub use user::{User, UserId};

use crate::{
    category::CategoryId, payment_method::PaymentMethodId, tag::TagId, transaction::TransactionId,
};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A string that is not a valid email address was used to create an email.
    #[error("{0} is not a valid email address")]
    InvalidEmail(String),

    /// An empty string was used to create a category name.
    #[error("category name cannot be empty")]
    EmptyCategoryName,

    /// An empty string was used to create a tag name.
    #[error("tag name cannot be empty")]
    EmptyTagName,

    /// An empty string was used to create a payment method name.
    #[error("payment method name cannot be empty")]
    EmptyPaymentMethodName,

    /// A string that does not name a supported frequency was used to create a
    /// recurring transaction.
    #[error("{0} is not a valid frequency")]
    InvalidFrequency(String),

    /// A zero or negative amount was used to create or update a budget.
    ///
    /// A budget is a spending limit, so its amount must be greater than zero.
    #[error("{0} is not a valid budget amount, the amount must be greater than zero")]
    InvalidBudgetAmount(f64),

    /// The email address already belongs to another user.
    #[error("the email address already belongs to another user")]
    DuplicateEmail,

    /// The external identity is already linked to another user.
    #[error("the external identity is already linked to another user")]
    DuplicateExternalId,

    /// The category name already exists in the database.
    #[error("the category \"{0}\" already exists in the database")]
    DuplicateCategoryName(String),

    /// The tag name already exists in the database.
    #[error("the tag \"{0}\" already exists in the database")]
    DuplicateTagName(String),

    /// The payment method name already exists in the database.
    #[error("the payment method \"{0}\" already exists in the database")]
    DuplicatePaymentMethodName(String),

    /// The specified import ID already exists in the database.
    ///
    /// Import IDs uniquely identify imported transactions. Rejecting
    /// duplicate import IDs avoids recording the same transaction multiple
    /// times, which is likely to happen if the user imports CSV files that
    /// overlap in time.
    #[error("the import ID already exists in the database")]
    DuplicateImportId,

    /// The user ID does not refer to a valid user.
    #[error("the user ID {0} does not refer to a valid user")]
    InvalidUser(UserId),

    /// The category ID does not refer to a valid category.
    #[error("the category ID {0} does not refer to a valid category")]
    InvalidCategory(CategoryId),

    /// The transaction ID does not refer to a valid transaction.
    #[error("the transaction ID {0} does not refer to a valid transaction")]
    InvalidTransaction(TransactionId),

    /// The tag ID does not refer to a valid tag.
    #[error("the tag ID {0} does not refer to a valid tag")]
    InvalidTag(TagId),

    /// The payment method ID does not refer to a valid payment method.
    #[error("the payment method ID {0} does not refer to a valid payment method")]
    InvalidPaymentMethod(PaymentMethodId),

    /// Tried to delete a category that transactions or budgets still refer to.
    ///
    /// Transactions must always belong to a category, so a category cannot be
    /// removed while it is referenced.
    #[error("the category ID {0} is still referenced by transactions or budgets")]
    CategoryInUse(CategoryId),

    /// The CSV had issues that prevented it from being parsed.
    #[error("could not parse the CSV file: {0}")]
    InvalidCsv(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Tried to update a user that does not exist
    #[error("tried to update a user that is not in the database")]
    UpdateMissingUser,

    /// Tried to delete a user that does not exist
    #[error("tried to delete a user that is not in the database")]
    DeleteMissingUser,

    /// Tried to update a category that does not exist
    #[error("tried to update a category that is not in the database")]
    UpdateMissingCategory,

    /// Tried to delete a category that does not exist
    #[error("tried to delete a category that is not in the database")]
    DeleteMissingCategory,

    /// Tried to update a tag that does not exist
    #[error("tried to update a tag that is not in the database")]
    UpdateMissingTag,

    /// Tried to delete a tag that does not exist
    #[error("tried to delete a tag that is not in the database")]
    DeleteMissingTag,

    /// Tried to update a payment method that does not exist
    #[error("tried to update a payment method that is not in the database")]
    UpdateMissingPaymentMethod,

    /// Tried to delete a payment method that does not exist
    #[error("tried to delete a payment method that is not in the database")]
    DeleteMissingPaymentMethod,

    /// Tried to update a transaction that does not exist
    #[error("tried to update a transaction that is not in the database")]
    UpdateMissingTransaction,

    /// Tried to delete a transaction that does not exist
    #[error("tried to delete a transaction that is not in the database")]
    DeleteMissingTransaction,

    /// Tried to update a recurring transaction that does not exist
    #[error("tried to update a recurring transaction that is not in the database")]
    UpdateMissingRecurringTransaction,

    /// Tried to delete a recurring transaction that does not exist
    #[error("tried to delete a recurring transaction that is not in the database")]
    DeleteMissingRecurringTransaction,

    /// Tried to update a budget that does not exist
    #[error("tried to update a budget that is not in the database")]
    UpdateMissingBudget,

    /// Tried to delete a budget that does not exist
    #[error("tried to delete a budget that is not in the database")]
    DeleteMissingBudget,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    && desc.ends_with("user.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    && desc.ends_with("user.external_id") =>
            {
                Error::DuplicateExternalId
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    && desc.ends_with("transaction.import_id") =>
            {
                Error::DuplicateImportId
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

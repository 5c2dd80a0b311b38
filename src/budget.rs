//! Budget domain types and database operations.
//!
//! A budget is a planned spending limit for a user within a category over a
//! period, identified by the first day of that period. This crate only stores
//! budgets; measuring spending against them is left to the consumer.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    DatabaseId, Error,
    category::{CategoryId, get_category},
    user::{UserId, get_user},
};

/// Database identifier for a budget.
pub type BudgetId = DatabaseId;

/// A planned spending limit for a user within a category over a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    /// The ID of the budget.
    pub id: BudgetId,
    /// The ID of the user the budget belongs to.
    pub user_id: UserId,
    /// The ID of the category the budget limits.
    pub category_id: CategoryId,
    /// The spending limit. Always greater than zero.
    pub amount: f64,
    /// The first day of the period the budget covers.
    pub period: Date,
    /// When the budget was recorded, in UTC.
    pub created_at: OffsetDateTime,
}

/// Create a budget and return it with its generated ID.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidBudgetAmount] if `amount` is not greater than zero,
/// - or [Error::InvalidUser] if `user_id` does not refer to a real user,
/// - or [Error::InvalidCategory] if `category_id` does not refer to a real
///   category,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_budget(
    user_id: UserId,
    category_id: CategoryId,
    amount: f64,
    period: Date,
    connection: &Connection,
) -> Result<Budget, Error> {
    // The comparison is written so that NaN is rejected as well.
    if !(amount > 0.0) {
        return Err(Error::InvalidBudgetAmount(amount));
    }

    get_user(user_id, connection).map_err(|error| match error {
        Error::NotFound => Error::InvalidUser(user_id),
        error => error,
    })?;
    get_category(category_id, connection).map_err(|error| match error {
        Error::NotFound => Error::InvalidCategory(category_id),
        error => error,
    })?;

    let budget = connection
        .prepare(
            "INSERT INTO budget (user_id, category_id, amount, period, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, user_id, category_id, amount, period, created_at",
        )?
        .query_row(
            (
                user_id.as_i64(),
                category_id,
                amount,
                period,
                OffsetDateTime::now_utc(),
            ),
            map_row,
        )?;

    Ok(budget)
}

/// Retrieve a budget by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid budget,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_budget(id: BudgetId, connection: &Connection) -> Result<Budget, Error> {
    let budget = connection
        .prepare(
            "SELECT id, user_id, category_id, amount, period, created_at
             FROM budget WHERE id = :id",
        )?
        .query_row(&[(":id", &id)], map_row)?;

    Ok(budget)
}

/// Retrieve a user's budgets, most recent period first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_budgets_by_user(
    user_id: UserId,
    connection: &Connection,
) -> Result<Vec<Budget>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, category_id, amount, period, created_at
             FROM budget WHERE user_id = :user_id
             ORDER BY period DESC, id ASC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row)?
        .map(|maybe_budget| maybe_budget.map_err(Error::SqlError))
        .collect()
}

/// Retrieve the budgets set for a category, most recent period first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_budgets_by_category(
    category_id: CategoryId,
    connection: &Connection,
) -> Result<Vec<Budget>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, category_id, amount, period, created_at
             FROM budget WHERE category_id = :category_id
             ORDER BY period DESC, id ASC",
        )?
        .query_map(&[(":category_id", &category_id)], map_row)?
        .map(|maybe_budget| maybe_budget.map_err(Error::SqlError))
        .collect()
}

/// Update a budget's amount and period.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidBudgetAmount] if `amount` is not greater than zero,
/// - or [Error::UpdateMissingBudget] if `id` does not refer to a valid
///   budget,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_budget(
    id: BudgetId,
    amount: f64,
    period: Date,
    connection: &Connection,
) -> Result<(), Error> {
    if !(amount > 0.0) {
        return Err(Error::InvalidBudgetAmount(amount));
    }

    let rows_affected = connection.execute(
        "UPDATE budget SET amount = ?1, period = ?2 WHERE id = ?3",
        (amount, period, id),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingBudget);
    }

    Ok(())
}

/// Delete a budget by ID.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingBudget] if `id` does not refer to a valid budget,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_budget(id: BudgetId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM budget WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingBudget);
    }

    Ok(())
}

/// Get the number of budgets in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn count_budgets(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM budget;", [], |row| row.get(0))
        .map_err(|error| error.into())
}

/// Create the budget table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS budget (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            category_id INTEGER NOT NULL,
            amount REAL NOT NULL,
            period TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_budget_user_period ON budget(user_id, period);",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Budget, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = UserId::new(row.get(1)?);
    let category_id = row.get(2)?;
    let amount = row.get(3)?;
    let period = row.get(4)?;
    let created_at = row.get(5)?;

    Ok(Budget {
        id,
        user_id,
        category_id,
        amount,
        period,
        created_at,
    })
}

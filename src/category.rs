//! Core category domain types and database operations.
//!
//! Every transaction belongs to exactly one category, and budgets are set
//! per category, so categories cannot be deleted while they are referenced.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{DatabaseId, Error};

/// Database identifier for a category.
pub type CategoryId = DatabaseId;

/// A validated, non-empty category name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyCategoryName] if `name` is
    /// an empty string.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyCategoryName)
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a category name without validation.
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

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for CategoryName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CategoryName::new(s)
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A category that groups transactions and budgets (e.g., 'Groceries',
/// 'Rent').
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The category's display name, unique within the database.
    pub name: CategoryName,
}

/// Create a category and return it with its generated ID.
///
/// # Errors
/// This function will return a:
/// - [Error::DuplicateCategoryName] if a category with the same name exists,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_category(name: CategoryName, connection: &Connection) -> Result<Category, Error> {
    connection
        .execute("INSERT INTO category (name) VALUES (?1);", (name.as_ref(),))
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateCategoryName(name.as_ref().to_string()),
            error => error.into(),
        })?;

    let id = connection.last_insert_rowid();

    Ok(Category { id, name })
}

/// Retrieve a single category by ID.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `category_id` does not refer to a valid category,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_category(category_id: CategoryId, connection: &Connection) -> Result<Category, Error> {
    connection
        .prepare("SELECT id, name FROM category WHERE id = :id;")?
        .query_row(&[(":id", &category_id)], map_row)
        .map_err(|error| error.into())
}

/// Retrieve a single category by its name.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if no category is called `name`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_category_by_name(
    name: &CategoryName,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare("SELECT id, name FROM category WHERE name = :name;")?
        .query_row(&[(":name", &name.as_ref())], map_row)
        .map_err(|error| error.into())
}

/// Retrieve all categories ordered alphabetically by name.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_all_categories(connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare("SELECT id, name FROM category ORDER BY name ASC;")?
        .query_map([], map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Update a category's name.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingCategory] if `category_id` does not refer to a
///   valid category,
/// - or [Error::DuplicateCategoryName] if another category already has
///   `new_name`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_category(
    category_id: CategoryId,
    new_name: CategoryName,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection
        .execute(
            "UPDATE category SET name = ?1 WHERE id = ?2",
            (new_name.as_ref(), category_id),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateCategoryName(new_name.as_ref().to_string()),
            error => error.into(),
        })?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingCategory);
    }

    Ok(())
}

/// Delete a category by ID.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingCategory] if `category_id` does not refer to a
///   valid category,
/// - or [Error::CategoryInUse] if transactions or budgets still reference
///   the category,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_category(category_id: CategoryId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection
        .execute("DELETE FROM category WHERE id = ?1", [category_id])
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::CategoryInUse(category_id),
            error => error.into(),
        })?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingCategory);
    }

    Ok(())
}

/// Get the number of categories in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn count_categories(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM category;", [], |row| row.get(0))
        .map_err(|error| error.into())
}

/// Create the category table and indexes in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        );

        CREATE INDEX IF NOT EXISTS idx_category_name ON category(name);",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_name: String = row.get(1)?;
    let name = CategoryName::new_unchecked(&raw_name);

    Ok(Category { id, name })
}

#[cfg(test)]
mod category_name_tests {
    use crate::{Error, category::CategoryName};

    #[test]
    fn new_fails_on_empty_string() {
        let name = CategoryName::new("");

        assert_eq!(name, Err(Error::EmptyCategoryName));
    }

    #[test]
    fn new_fails_on_just_whitespace() {
        let name = CategoryName::new("\n\t \r");

        assert_eq!(name, Err(Error::EmptyCategoryName));
    }

    #[test]
    fn new_trims_surrounding_whitespace() {
        let name = CategoryName::new("  Groceries ").unwrap();

        assert_eq!(name.as_ref(), "Groceries");
    }
}

#[cfg(test)]
mod category_query_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Email, Error,
        budget::create_budget,
        category::{
            Category, CategoryName, count_categories, create_category, delete_category,
            get_all_categories, get_category, get_category_by_name, update_category,
        },
        db::initialize,
        transaction::{Transaction, create_transaction},
        user::{User, create_user},
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn create_test_category(name: &str, connection: &Connection) -> Category {
        create_category(CategoryName::new_unchecked(name), connection)
            .expect("Could not create test category")
    }

    #[test]
    fn create_category_succeeds() {
        let conn = get_test_connection();
        let name = CategoryName::new("Categorically a category").unwrap();

        let category = create_category(name.clone(), &conn).expect("Could not create category");

        assert!(category.id > 0);
        assert_eq!(category.name, name);
    }

    #[test]
    fn create_category_fails_on_duplicate_name() {
        let conn = get_test_connection();
        create_test_category("Groceries", &conn);

        let duplicate = create_category(CategoryName::new_unchecked("Groceries"), &conn);

        assert_eq!(
            duplicate,
            Err(Error::DuplicateCategoryName("Groceries".to_string()))
        );
    }

    #[test]
    fn get_category_succeeds() {
        let conn = get_test_connection();
        let inserted_category = create_test_category("Foo", &conn);

        let selected_category = get_category(inserted_category.id, &conn);

        assert_eq!(Ok(inserted_category), selected_category);
    }

    #[test]
    fn get_category_with_invalid_id_returns_not_found() {
        let conn = get_test_connection();
        let inserted_category = create_test_category("Foo", &conn);

        let selected_category = get_category(inserted_category.id + 123, &conn);

        assert_eq!(selected_category, Err(Error::NotFound));
    }

    #[test]
    fn get_category_by_name_succeeds() {
        let conn = get_test_connection();
        let inserted_category = create_test_category("Foo", &conn);

        let selected_category = get_category_by_name(&CategoryName::new_unchecked("Foo"), &conn);

        assert_eq!(Ok(inserted_category), selected_category);
    }

    #[test]
    fn get_all_categories_orders_by_name() {
        let conn = get_test_connection();
        let zoo = create_test_category("Zoo trips", &conn);
        let groceries = create_test_category("Groceries", &conn);

        let categories = get_all_categories(&conn).expect("Could not get all categories");

        assert_eq!(categories, vec![groceries, zoo]);
    }

    #[test]
    fn update_category_succeeds() {
        let conn = get_test_connection();
        let category = create_test_category("Original", &conn);

        let new_name = CategoryName::new_unchecked("Updated");
        update_category(category.id, new_name.clone(), &conn).expect("Could not update category");

        let updated_category = get_category(category.id, &conn).expect("Could not get category");
        assert_eq!(updated_category.name, new_name);
        assert_eq!(updated_category.id, category.id);
    }

    #[test]
    fn update_category_fails_on_duplicate_name() {
        let conn = get_test_connection();
        create_test_category("Groceries", &conn);
        let category = create_test_category("Rent", &conn);

        let result = update_category(category.id, CategoryName::new_unchecked("Groceries"), &conn);

        assert_eq!(
            result,
            Err(Error::DuplicateCategoryName("Groceries".to_string()))
        );
    }

    #[test]
    fn update_category_with_invalid_id_returns_not_found() {
        let conn = get_test_connection();

        let result = update_category(999999, CategoryName::new_unchecked("Updated"), &conn);

        assert_eq!(result, Err(Error::UpdateMissingCategory));
    }

    #[test]
    fn delete_category_succeeds() {
        let conn = get_test_connection();
        let category = create_test_category("ToDelete", &conn);

        delete_category(category.id, &conn).expect("Could not delete category");

        assert_eq!(get_category(category.id, &conn), Err(Error::NotFound));
    }

    #[test]
    fn delete_category_with_invalid_id_returns_not_found() {
        let conn = get_test_connection();

        let result = delete_category(999999, &conn);

        assert_eq!(result, Err(Error::DeleteMissingCategory));
    }

    #[test]
    fn delete_category_fails_while_transactions_reference_it() {
        let conn = get_test_connection();
        let user = create_user(
            User::build("identity|1", Email::new_unchecked("foo@bar.baz")),
            &conn,
        )
        .expect("Could not create test user");
        let category = create_test_category("Groceries", &conn);
        create_transaction(
            Transaction::build("Weekly shop", -42.5, user.id, category.id),
            &conn,
        )
        .expect("Could not create test transaction");

        let result = delete_category(category.id, &conn);

        assert_eq!(result, Err(Error::CategoryInUse(category.id)));
    }

    #[test]
    fn delete_category_fails_while_budgets_reference_it() {
        let conn = get_test_connection();
        let user = create_user(
            User::build("identity|1", Email::new_unchecked("foo@bar.baz")),
            &conn,
        )
        .expect("Could not create test user");
        let category = create_test_category("Groceries", &conn);
        create_budget(user.id, category.id, 250.0, date!(2025 - 11 - 01), &conn)
            .expect("Could not create test budget");

        let result = delete_category(category.id, &conn);

        assert_eq!(result, Err(Error::CategoryInUse(category.id)));
    }

    #[test]
    fn returns_correct_count() {
        let conn = get_test_connection();

        let count = count_categories(&conn).expect("Could not get count");
        assert_eq!(0, count, "Want zero categories before insertion");

        create_test_category("Foo", &conn);
        create_test_category("Bar", &conn);

        let count = count_categories(&conn).expect("Could not get count");
        assert_eq!(2, count, "Want two categories after insertion");
    }
}

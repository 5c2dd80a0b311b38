//! Core tag domain types and database operations.
//!
//! Tags are free-form labels with a many-to-many relationship to
//! transactions, kept in the `transaction_tag` junction table. Unlike
//! categories, a transaction may carry any number of tags, and deleting a
//! tag only removes its associations.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{
    DatabaseId, Error,
    transaction::{Transaction, TransactionId, get_transaction, map_transaction_row},
};

/// Database identifier for a tag.
pub type TagId = DatabaseId;

/// A validated, non-empty tag name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct TagName(String);

impl TagName {
    /// Create a tag name.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyTagName] if `name` is an
    /// empty string.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyTagName)
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a tag name without validation.
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

impl AsRef<str> for TagName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for TagName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TagName::new(s)
    }
}

impl Display for TagName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A tag for labelling transactions (e.g., 'holiday-2025', 'tax-deductible').
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Tag {
    /// The ID of the tag.
    pub id: TagId,
    /// The tag's display name, unique within the database.
    pub name: TagName,
}

/// Create a tag and return it with its generated ID.
///
/// # Errors
/// This function will return a:
/// - [Error::DuplicateTagName] if a tag with the same name exists,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_tag(name: TagName, connection: &Connection) -> Result<Tag, Error> {
    connection
        .execute("INSERT INTO tag (name) VALUES (?1);", (name.as_ref(),))
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateTagName(name.as_ref().to_string()),
            error => error.into(),
        })?;

    let id = connection.last_insert_rowid();

    Ok(Tag { id, name })
}

/// Retrieve a single tag by ID.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `tag_id` does not refer to a valid tag,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_tag(tag_id: TagId, connection: &Connection) -> Result<Tag, Error> {
    connection
        .prepare("SELECT id, name FROM tag WHERE id = :id;")?
        .query_row(&[(":id", &tag_id)], map_row)
        .map_err(|error| error.into())
}

/// Retrieve all tags ordered alphabetically by name.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_all_tags(connection: &Connection) -> Result<Vec<Tag>, Error> {
    connection
        .prepare("SELECT id, name FROM tag ORDER BY name ASC;")?
        .query_map([], map_row)?
        .map(|maybe_tag| maybe_tag.map_err(|error| error.into()))
        .collect()
}

/// Update a tag's name.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingTag] if `tag_id` does not refer to a valid tag,
/// - or [Error::DuplicateTagName] if another tag already has `new_name`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_tag(tag_id: TagId, new_name: TagName, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection
        .execute(
            "UPDATE tag SET name = ?1 WHERE id = ?2",
            (new_name.as_ref(), tag_id),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateTagName(new_name.as_ref().to_string()),
            error => error.into(),
        })?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingTag);
    }

    Ok(())
}

/// Delete a tag by ID.
///
/// Associations with transactions are removed along with the tag.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingTag] if `tag_id` does not refer to a valid tag,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_tag(tag_id: TagId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM tag WHERE id = ?1", [tag_id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingTag);
    }

    Ok(())
}

/// Get the number of tags in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn count_tags(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM tag;", [], |row| row.get(0))
        .map_err(|error| error.into())
}

/// Add a tag to a transaction.
///
/// Adding a tag that the transaction already has is a no-op.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidTransaction] if `transaction_id` does not refer to a
///   valid transaction,
/// - or [Error::InvalidTag] if `tag_id` does not refer to a valid tag,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn add_tag_to_transaction(
    transaction_id: TransactionId,
    tag_id: TagId,
    connection: &Connection,
) -> Result<(), Error> {
    get_transaction(transaction_id, connection).map_err(|error| match error {
        Error::NotFound => Error::InvalidTransaction(transaction_id),
        error => error,
    })?;
    get_tag(tag_id, connection).map_err(|error| match error {
        Error::NotFound => Error::InvalidTag(tag_id),
        error => error,
    })?;

    connection.execute(
        "INSERT OR IGNORE INTO transaction_tag (transaction_id, tag_id) VALUES (?1, ?2)",
        (transaction_id, tag_id),
    )?;

    Ok(())
}

/// Remove a tag from a transaction.
///
/// Removing a tag that the transaction does not have is a no-op.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn remove_tag_from_transaction(
    transaction_id: TransactionId,
    tag_id: TagId,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "DELETE FROM transaction_tag WHERE transaction_id = ?1 AND tag_id = ?2",
        (transaction_id, tag_id),
    )?;

    Ok(())
}

/// Get all tags for a transaction, ordered alphabetically by name.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_transaction_tags(
    transaction_id: TransactionId,
    connection: &Connection,
) -> Result<Vec<Tag>, Error> {
    connection
        .prepare(
            "SELECT t.id, t.name
             FROM tag t
             INNER JOIN transaction_tag tt ON t.id = tt.tag_id
             WHERE tt.transaction_id = ?1
             ORDER BY t.name",
        )?
        .query_map([transaction_id], map_row)?
        .map(|maybe_tag| maybe_tag.map_err(Error::SqlError))
        .collect()
}

/// Get all transactions that carry a tag, most recent first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_transactions_with_tag(
    tag_id: TagId,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT tr.id, tr.text, tr.amount, tr.user_id, tr.category_id, tr.notes, tr.import_id, tr.created_at
             FROM \"transaction\" tr
             INNER JOIN transaction_tag tt ON tr.id = tt.transaction_id
             WHERE tt.tag_id = ?1
             ORDER BY tr.created_at DESC, tr.id DESC",
        )?
        .query_map([tag_id], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::SqlError))
        .collect()
}

/// Get the number of transactions associated with a tag.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_tag_transaction_count(tag_id: TagId, connection: &Connection) -> Result<u32, Error> {
    let count = connection.query_row(
        "SELECT COUNT(*) FROM transaction_tag WHERE tag_id = ?1",
        [tag_id],
        |row| row.get(0),
    )?;

    Ok(count)
}

/// Create the tag and transaction_tag junction tables in the database.
///
/// # Errors
/// Returns an error if the tables cannot be created or if there is an SQL error.
pub fn create_tag_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS tag (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        );

        CREATE INDEX IF NOT EXISTS idx_tag_name ON tag(name);

        CREATE TABLE IF NOT EXISTS transaction_tag (
            transaction_id INTEGER NOT NULL,
            tag_id INTEGER NOT NULL,
            PRIMARY KEY (transaction_id, tag_id),
            FOREIGN KEY(transaction_id) REFERENCES \"transaction\"(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(tag_id) REFERENCES tag(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_transaction_tag_tag_id ON transaction_tag(tag_id);",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Tag, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_name: String = row.get(1)?;
    let name = TagName::new_unchecked(&raw_name);

    Ok(Tag { id, name })
}


#[cfg(test)]
mod tag_query_tests {
    use std::collections::HashSet;

    use rusqlite::Connection;

    use crate::{
        Error,
        db::initialize,
        tag::{TagName, count_tags, create_tag, delete_tag, get_all_tags, get_tag, update_tag},
    };

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    #[test]
    fn create_tag_succeeds() {
        let connection = get_test_connection();
        let name = TagName::new("Terrifically a tag").unwrap();

        let tag = create_tag(name.clone(), &connection);

        let got_tag = tag.expect("Could not create tag");
        assert!(got_tag.id > 0);
        assert_eq!(got_tag.name, name);
    }

    #[test]
    fn create_tag_fails_on_duplicate_name() {
        let connection = get_test_connection();
        create_tag(TagName::new_unchecked("Foo"), &connection).expect("Could not create test tag");

        let duplicate = create_tag(TagName::new_unchecked("Foo"), &connection);

        assert_eq!(duplicate, Err(Error::DuplicateTagName("Foo".to_string())));
    }

    #[test]
    fn get_tag_succeeds() {
        let connection = get_test_connection();
        let name = TagName::new_unchecked("Foo");
        let inserted_tag = create_tag(name, &connection).expect("Could not create test tag");

        let selected_tag = get_tag(inserted_tag.id, &connection);

        assert_eq!(Ok(inserted_tag), selected_tag);
    }

    #[test]
    fn get_tag_with_invalid_id_returns_not_found() {
        let connection = get_test_connection();
        let inserted_tag = create_tag(TagName::new_unchecked("Foo"), &connection)
            .expect("Could not create test tag");

        let selected_tag = get_tag(inserted_tag.id + 123, &connection);

        assert_eq!(selected_tag, Err(Error::NotFound));
    }

    #[test]
    fn get_all_tags_returns_every_tag() {
        let connection = get_test_connection();

        let inserted_tags = HashSet::from([
            create_tag(TagName::new_unchecked("Foo"), &connection)
                .expect("Could not create test tag"),
            create_tag(TagName::new_unchecked("Bar"), &connection)
                .expect("Could not create test tag"),
        ]);

        let selected_tags = get_all_tags(&connection).expect("Could not get all tags");
        let selected_tags = HashSet::from_iter(selected_tags);

        assert_eq!(inserted_tags, selected_tags);
    }

    #[test]
    fn update_tag_succeeds() {
        let connection = get_test_connection();
        let original_name = TagName::new_unchecked("Original");
        let tag = create_tag(original_name, &connection).expect("Could not create test tag");

        let new_name = TagName::new_unchecked("Updated");
        let result = update_tag(tag.id, new_name.clone(), &connection);

        assert!(result.is_ok());

        let updated_tag = get_tag(tag.id, &connection).expect("Could not get updated tag");
        assert_eq!(updated_tag.name, new_name);
        assert_eq!(updated_tag.id, tag.id);
    }

    #[test]
    fn update_tag_with_invalid_id_returns_not_found() {
        let connection = get_test_connection();
        let invalid_id = 999999;
        let new_name = TagName::new_unchecked("Updated");

        let result = update_tag(invalid_id, new_name, &connection);

        assert_eq!(result, Err(Error::UpdateMissingTag));
    }

    #[test]
    fn delete_tag_succeeds() {
        let connection = get_test_connection();
        let name = TagName::new_unchecked("ToDelete");
        let tag = create_tag(name, &connection).expect("Could not create test tag");

        let result = delete_tag(tag.id, &connection);

        assert!(result.is_ok());

        let get_result = get_tag(tag.id, &connection);
        assert_eq!(get_result, Err(Error::NotFound));
    }

    #[test]
    fn delete_tag_with_invalid_id_returns_not_found() {
        let connection = get_test_connection();
        let invalid_id = 999999;

        let result = delete_tag(invalid_id, &connection);

        assert_eq!(result, Err(Error::DeleteMissingTag));
    }

    #[test]
    fn returns_correct_count() {
        let connection = get_test_connection();

        create_tag(TagName::new_unchecked("Foo"), &connection).expect("Could not create test tag");
        create_tag(TagName::new_unchecked("Bar"), &connection).expect("Could not create test tag");

        let count = count_tags(&connection).expect("Could not get count");

        assert_eq!(count, 2);
    }
}

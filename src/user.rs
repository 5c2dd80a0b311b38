//! The user model and database operations for the user table.
//!
//! A user owns transactions, budgets, and recurring transactions. Identity
//! itself (login, sessions) is handled outside this crate; each user row
//! only records the opaque subject identifier of the external identity
//! provider alongside profile data.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Email, Error};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to
/// better compile time errors, and more flexible generics that can have
/// distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserId(i64);

impl UserId {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A user of the application.
///
/// To create a new `User`, use [User::build] and [create_user].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserId,
    /// The subject identifier assigned by the external identity provider.
    ///
    /// Opaque to this crate, unique per user.
    pub external_id: String,
    /// The user's email address.
    pub email: Email,
    /// The user's display name, if they have set one.
    pub name: Option<String>,
    /// A URL for the user's avatar image, if they have set one.
    pub image_url: Option<String>,
    /// When the user was first recorded.
    pub created_at: OffsetDateTime,
    /// When the user's profile was last changed.
    pub updated_at: OffsetDateTime,
}

impl User {
    /// Create a new user.
    ///
    /// Shortcut for [UserBuilder] for discoverability.
    pub fn build(external_id: &str, email: Email) -> UserBuilder {
        UserBuilder {
            external_id: external_id.to_owned(),
            email,
            name: None,
            image_url: None,
        }
    }
}

/// A builder for creating [User] instances.
///
/// Set the optional profile fields with [UserBuilder::name] and
/// [UserBuilder::image_url], then pass the builder to [create_user].
#[derive(Debug, PartialEq, Clone)]
pub struct UserBuilder {
    /// The subject identifier assigned by the external identity provider.
    pub external_id: String,
    /// The user's email address.
    pub email: Email,
    /// The user's display name.
    pub name: Option<String>,
    /// A URL for the user's avatar image.
    pub image_url: Option<String>,
}

impl UserBuilder {
    /// Set the display name for the user.
    pub fn name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    /// Set the avatar image URL for the user.
    pub fn image_url(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url;
        self
    }
}

/// The profile fields that [update_user] can change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// The user's display name, `None` clears it.
    pub name: Option<String>,
    /// A URL for the user's avatar image, `None` clears it.
    pub image_url: Option<String>,
}

/// Create a new user in the database from a builder.
///
/// # Errors
/// This function will return a:
/// - [Error::DuplicateEmail] if a user with the same email already exists,
/// - or [Error::DuplicateExternalId] if the external identity is already
///   linked to a user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_user(builder: UserBuilder, connection: &Connection) -> Result<User, Error> {
    let now = OffsetDateTime::now_utc();

    let user = connection
        .prepare(
            "INSERT INTO user (external_id, email, name, image_url, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING id, external_id, email, name, image_url, created_at, updated_at",
        )?
        .query_row(
            (
                builder.external_id,
                builder.email.as_ref(),
                builder.name,
                builder.image_url,
                now,
                now,
            ),
            map_user_row,
        )?;

    Ok(user)
}

/// Retrieve a user from the database by their `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_user(id: UserId, connection: &Connection) -> Result<User, Error> {
    let user = connection
        .prepare(
            "SELECT id, external_id, email, name, image_url, created_at, updated_at
             FROM user WHERE id = :id",
        )?
        .query_row(&[(":id", &id.as_i64())], map_user_row)?;

    Ok(user)
}

/// Retrieve a user from the database by the subject identifier of the
/// external identity provider.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if no user is linked to `external_id`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_user_by_external_id(external_id: &str, connection: &Connection) -> Result<User, Error> {
    let user = connection
        .prepare(
            "SELECT id, external_id, email, name, image_url, created_at, updated_at
             FROM user WHERE external_id = :external_id",
        )?
        .query_row(&[(":external_id", &external_id)], map_user_row)?;

    Ok(user)
}

/// Retrieve a user from the database by their email address.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if no user has `email`,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_user_by_email(email: &Email, connection: &Connection) -> Result<User, Error> {
    let user = connection
        .prepare(
            "SELECT id, external_id, email, name, image_url, created_at, updated_at
             FROM user WHERE email = :email",
        )?
        .query_row(&[(":email", &email.as_ref())], map_user_row)?;

    Ok(user)
}

/// Update a user's profile and touch their `updated_at` timestamp.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingUser] if `id` does not refer to a valid user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_user(id: UserId, profile: UserProfile, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET name = ?1, image_url = ?2, updated_at = ?3 WHERE id = ?4",
        (
            profile.name,
            profile.image_url,
            OffsetDateTime::now_utc(),
            id.as_i64(),
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingUser);
    }

    Ok(())
}

/// Delete a user by ID.
///
/// The user's transactions, budgets, and recurring transactions are deleted
/// along with them.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingUser] if `id` does not refer to a valid user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_user(id: UserId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM user WHERE id = ?1", [id.as_i64()])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingUser);
    }

    Ok(())
}

/// Get the number of users in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn count_users(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM user;", [], |row| row.get(0))
        .map_err(|error| error.into())
}

/// Create the user table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                external_id TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                name TEXT,
                image_url TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Map a database row to a User.
pub fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let id = UserId::new(row.get(0)?);
    let external_id = row.get(1)?;
    let raw_email: String = row.get(2)?;
    let email = Email::new_unchecked(&raw_email);
    let name = row.get(3)?;
    let image_url = row.get(4)?;
    let created_at = row.get(5)?;
    let updated_at = row.get(6)?;

    Ok(User {
        id,
        external_id,
        email,
        name,
        image_url,
        created_at,
        updated_at,
    })
}

#[cfg(test)]
mod user_tests {
    use rusqlite::Connection;

    use crate::{
        Email, Error,
        db::initialize,
        user::{
            User, UserId, UserProfile, count_users, create_user, delete_user, get_user,
            get_user_by_email, get_user_by_external_id, update_user,
        },
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn create_test_user(connection: &Connection) -> User {
        create_user(
            User::build("identity|1234", Email::new_unchecked("foo@bar.baz")),
            connection,
        )
        .expect("Could not create test user")
    }

    #[test]
    fn create_user_succeeds() {
        let conn = get_test_connection();

        let user = create_user(
            User::build("identity|1234", Email::new_unchecked("foo@bar.baz"))
                .name(Some("Foo Bar".to_string())),
            &conn,
        )
        .expect("Could not create user");

        assert!(user.id.as_i64() > 0);
        assert_eq!(user.external_id, "identity|1234");
        assert_eq!(user.email, Email::new_unchecked("foo@bar.baz"));
        assert_eq!(user.name, Some("Foo Bar".to_string()));
        assert_eq!(user.image_url, None);
    }

    #[test]
    fn create_user_fails_on_duplicate_email() {
        let conn = get_test_connection();
        create_test_user(&conn);

        let duplicate = create_user(
            User::build("identity|5678", Email::new_unchecked("foo@bar.baz")),
            &conn,
        );

        assert_eq!(duplicate, Err(Error::DuplicateEmail));
    }

    #[test]
    fn create_user_fails_on_duplicate_external_id() {
        let conn = get_test_connection();
        create_test_user(&conn);

        let duplicate = create_user(
            User::build("identity|1234", Email::new_unchecked("bar@baz.qux")),
            &conn,
        );

        assert_eq!(duplicate, Err(Error::DuplicateExternalId));
    }

    #[test]
    fn get_user_succeeds_with_existing_id() {
        let conn = get_test_connection();
        let inserted_user = create_test_user(&conn);

        let selected_user = get_user(inserted_user.id, &conn).expect("Could not get user");

        assert_eq!(inserted_user, selected_user);
    }

    #[test]
    fn get_user_fails_with_non_existent_id() {
        let conn = get_test_connection();

        let selected_user = get_user(UserId::new(42), &conn);

        assert_eq!(selected_user, Err(Error::NotFound));
    }

    #[test]
    fn get_user_by_external_id_succeeds() {
        let conn = get_test_connection();
        let inserted_user = create_test_user(&conn);

        let selected_user =
            get_user_by_external_id("identity|1234", &conn).expect("Could not get user");

        assert_eq!(inserted_user, selected_user);
    }

    #[test]
    fn get_user_by_email_succeeds() {
        let conn = get_test_connection();
        let inserted_user = create_test_user(&conn);

        let selected_user = get_user_by_email(&Email::new_unchecked("foo@bar.baz"), &conn)
            .expect("Could not get user");

        assert_eq!(inserted_user, selected_user);
    }

    #[test]
    fn update_user_changes_profile() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);

        update_user(
            user.id,
            UserProfile {
                name: Some("Renamed".to_string()),
                image_url: Some("https://example.com/avatar.png".to_string()),
            },
            &conn,
        )
        .expect("Could not update user");

        let updated_user = get_user(user.id, &conn).expect("Could not get updated user");
        assert_eq!(updated_user.name, Some("Renamed".to_string()));
        assert_eq!(
            updated_user.image_url,
            Some("https://example.com/avatar.png".to_string())
        );
        assert_eq!(updated_user.created_at, user.created_at);
    }

    #[test]
    fn update_user_fails_with_non_existent_id() {
        let conn = get_test_connection();

        let result = update_user(
            UserId::new(42),
            UserProfile {
                name: None,
                image_url: None,
            },
            &conn,
        );

        assert_eq!(result, Err(Error::UpdateMissingUser));
    }

    #[test]
    fn delete_user_succeeds() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);

        delete_user(user.id, &conn).expect("Could not delete user");

        assert_eq!(get_user(user.id, &conn), Err(Error::NotFound));
    }

    #[test]
    fn delete_user_fails_with_non_existent_id() {
        let conn = get_test_connection();

        let result = delete_user(UserId::new(42), &conn);

        assert_eq!(result, Err(Error::DeleteMissingUser));
    }

    #[test]
    fn returns_correct_count() {
        let conn = get_test_connection();

        let count = count_users(&conn).expect("Could not get user count");
        assert_eq!(0, count, "Want zero users before insertion, got {count}");

        create_test_user(&conn);

        let count = count_users(&conn).expect("Could not get user count");
        assert_eq!(1, count, "Want one user after insertion, got {count}");
    }
}

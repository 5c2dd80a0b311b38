//! Filtered, sorted, and paged queries over the transaction table.

use rusqlite::{Connection, ToSql};
use time::{OffsetDateTime, UtcOffset};

use crate::{Error, category::CategoryId, user::UserId};

use super::core::{Transaction, map_transaction_row};

/// The order to sort transactions in a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Oldest transactions first.
    Ascending,
    /// Most recent transactions first.
    Descending,
}

/// An inclusive range of recording times.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreatedRange {
    /// The earliest recording time to include.
    pub start: OffsetDateTime,
    /// The latest recording time to include.
    pub end: OffsetDateTime,
}

/// A filter describing which transactions to return and in what order.
///
/// All filter fields are optional and combine with AND semantics. The
/// default query returns every transaction, most recent first.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionQuery {
    /// Only return transactions belonging to this user.
    pub user_id: Option<UserId>,
    /// Only return transactions in this category.
    pub category_id: Option<CategoryId>,
    /// Only return transactions recorded within this range.
    pub created: Option<CreatedRange>,
    /// Only return transactions whose text contains this string,
    /// case-insensitively.
    pub search: Option<String>,
    /// Sort direction on the recording time (ID as tie-break).
    pub sort_order: SortOrder,
    /// Return at most this many transactions.
    pub limit: Option<u64>,
    /// Skip this many transactions before returning results.
    pub offset: u64,
}

impl Default for TransactionQuery {
    fn default() -> Self {
        Self {
            user_id: None,
            category_id: None,
            created: None,
            search: None,
            sort_order: SortOrder::Descending,
            limit: None,
            offset: 0,
        }
    }
}

/// Get the transactions matching `query`.
///
/// Results are sorted by recording time and then by ID to keep transaction
/// order stable after updates.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn query_transactions(
    query: &TransactionQuery,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let mut sql = String::from(
        "SELECT id, text, amount, user_id, category_id, notes, import_id, created_at \
         FROM \"transaction\"",
    );
    let mut clauses: Vec<&str> = Vec::new();
    let mut params: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(user_id) = query.user_id {
        clauses.push("user_id = ?");
        params.push(Box::new(user_id.as_i64()));
    }

    if let Some(category_id) = query.category_id {
        clauses.push("category_id = ?");
        params.push(Box::new(category_id));
    }

    if let Some(range) = &query.created {
        clauses.push("created_at BETWEEN ? AND ?");
        params.push(Box::new(range.start.to_offset(UtcOffset::UTC)));
        params.push(Box::new(range.end.to_offset(UtcOffset::UTC)));
    }

    if let Some(search) = &query.search {
        clauses.push("instr(lower(text), lower(?)) > 0");
        params.push(Box::new(search.clone()));
    }

    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    sql.push_str(match query.sort_order {
        SortOrder::Ascending => " ORDER BY created_at ASC, id ASC",
        SortOrder::Descending => " ORDER BY created_at DESC, id DESC",
    });

    match query.limit {
        Some(limit) => sql.push_str(&format!(" LIMIT {limit} OFFSET {}", query.offset)),
        // A negative limit means no limit in SQLite, which lets OFFSET apply
        // on its own.
        None if query.offset > 0 => sql.push_str(&format!(" LIMIT -1 OFFSET {}", query.offset)),
        None => {}
    }

    connection
        .prepare(&sql)?
        .query_map(rusqlite::params_from_iter(params), map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::SqlError))
        .collect()
}

#[cfg(test)]
mod query_tests {
    use rusqlite::Connection;
    use time::macros::datetime;

    use crate::{
        Email,
        category::{Category, CategoryName, create_category},
        db::initialize,
        transaction::{Transaction, create_transaction},
        user::{User, create_user},
    };

    use super::{CreatedRange, SortOrder, TransactionQuery, query_transactions};

    struct Fixture {
        conn: Connection,
        alice: User,
        bob: User,
        groceries: Category,
        rent: Category,
        transactions: Vec<Transaction>,
    }

    /// Five transactions across two users and two categories, recorded a
    /// month apart starting January 2025.
    fn build_fixture() -> Fixture {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let alice = create_user(
            User::build("identity|alice", Email::new_unchecked("alice@example.com")),
            &conn,
        )
        .expect("Could not create test user");
        let bob = create_user(
            User::build("identity|bob", Email::new_unchecked("bob@example.com")),
            &conn,
        )
        .expect("Could not create test user");

        let groceries = create_category(CategoryName::new_unchecked("Groceries"), &conn)
            .expect("Could not create test category");
        let rent = create_category(CategoryName::new_unchecked("Rent"), &conn)
            .expect("Could not create test category");

        let builders = [
            Transaction::build("Weekly shop", -42.5, alice.id, groceries.id)
                .created_at(datetime!(2025-01-10 10:00 UTC)),
            Transaction::build("January rent", -1200.0, alice.id, rent.id)
                .created_at(datetime!(2025-02-01 08:00 UTC)),
            Transaction::build("Corner store", -7.2, bob.id, groceries.id)
                .created_at(datetime!(2025-03-05 18:30 UTC)),
            Transaction::build("Weekly shop", -38.9, alice.id, groceries.id)
                .created_at(datetime!(2025-04-12 10:15 UTC)),
            Transaction::build("May rent", -1200.0, bob.id, rent.id)
                .created_at(datetime!(2025-05-01 08:00 UTC)),
        ];

        let transactions = builders
            .into_iter()
            .map(|builder| {
                create_transaction(builder, &conn).expect("Could not create transaction")
            })
            .collect();

        Fixture {
            conn,
            alice,
            bob,
            groceries,
            rent,
            transactions,
        }
    }

    #[test]
    fn default_query_returns_everything_newest_first() {
        let fixture = build_fixture();

        let got = query_transactions(&TransactionQuery::default(), &fixture.conn)
            .expect("Could not query transactions");

        let mut want = fixture.transactions.clone();
        want.reverse();
        assert_eq!(got, want);
    }

    #[test]
    fn ascending_sort_returns_oldest_first() {
        let fixture = build_fixture();

        let got = query_transactions(
            &TransactionQuery {
                sort_order: SortOrder::Ascending,
                ..Default::default()
            },
            &fixture.conn,
        )
        .expect("Could not query transactions");

        assert_eq!(got, fixture.transactions);
    }

    #[test]
    fn filters_by_user() {
        let fixture = build_fixture();

        let got = query_transactions(
            &TransactionQuery {
                user_id: Some(fixture.bob.id),
                sort_order: SortOrder::Ascending,
                ..Default::default()
            },
            &fixture.conn,
        )
        .expect("Could not query transactions");

        assert_eq!(
            got,
            vec![
                fixture.transactions[2].clone(),
                fixture.transactions[4].clone()
            ]
        );
    }

    #[test]
    fn filters_by_category() {
        let fixture = build_fixture();

        let got = query_transactions(
            &TransactionQuery {
                category_id: Some(fixture.rent.id),
                sort_order: SortOrder::Ascending,
                ..Default::default()
            },
            &fixture.conn,
        )
        .expect("Could not query transactions");

        assert_eq!(
            got,
            vec![
                fixture.transactions[1].clone(),
                fixture.transactions[4].clone()
            ]
        );
    }

    #[test]
    fn filters_by_user_and_category_together() {
        let fixture = build_fixture();

        let got = query_transactions(
            &TransactionQuery {
                user_id: Some(fixture.alice.id),
                category_id: Some(fixture.groceries.id),
                sort_order: SortOrder::Ascending,
                ..Default::default()
            },
            &fixture.conn,
        )
        .expect("Could not query transactions");

        assert_eq!(
            got,
            vec![
                fixture.transactions[0].clone(),
                fixture.transactions[3].clone()
            ]
        );
    }

    #[test]
    fn filters_by_created_range_inclusive() {
        let fixture = build_fixture();

        let got = query_transactions(
            &TransactionQuery {
                created: Some(CreatedRange {
                    start: datetime!(2025-02-01 08:00 UTC),
                    end: datetime!(2025-04-12 10:15 UTC),
                }),
                sort_order: SortOrder::Ascending,
                ..Default::default()
            },
            &fixture.conn,
        )
        .expect("Could not query transactions");

        assert_eq!(got, fixture.transactions[1..4].to_vec());
    }

    #[test]
    fn search_matches_text_case_insensitively() {
        let fixture = build_fixture();

        let got = query_transactions(
            &TransactionQuery {
                search: Some("WEEKLY".to_string()),
                sort_order: SortOrder::Ascending,
                ..Default::default()
            },
            &fixture.conn,
        )
        .expect("Could not query transactions");

        assert_eq!(
            got,
            vec![
                fixture.transactions[0].clone(),
                fixture.transactions[3].clone()
            ]
        );
    }

    #[test]
    fn limit_and_offset_page_through_results() {
        let fixture = build_fixture();

        let first_page = query_transactions(
            &TransactionQuery {
                sort_order: SortOrder::Ascending,
                limit: Some(2),
                ..Default::default()
            },
            &fixture.conn,
        )
        .expect("Could not query transactions");
        let second_page = query_transactions(
            &TransactionQuery {
                sort_order: SortOrder::Ascending,
                limit: Some(2),
                offset: 2,
                ..Default::default()
            },
            &fixture.conn,
        )
        .expect("Could not query transactions");

        assert_eq!(first_page, fixture.transactions[..2].to_vec());
        assert_eq!(second_page, fixture.transactions[2..4].to_vec());
    }

    #[test]
    fn offset_without_limit_skips_results() {
        let fixture = build_fixture();

        let got = query_transactions(
            &TransactionQuery {
                sort_order: SortOrder::Ascending,
                offset: 3,
                ..Default::default()
            },
            &fixture.conn,
        )
        .expect("Could not query transactions");

        assert_eq!(got, fixture.transactions[3..].to_vec());
    }

    #[test]
    fn query_with_no_matches_returns_empty() {
        let fixture = build_fixture();

        let got = query_transactions(
            &TransactionQuery {
                search: Some("yacht".to_string()),
                ..Default::default()
            },
            &fixture.conn,
        )
        .expect("Could not query transactions");

        assert!(got.is_empty());
    }
}

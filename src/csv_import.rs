//! Importing transactions from CSV files.
//!
//! The expected format is a headered CSV with the columns `created_at`
//! (`YYYY-MM-DD`), `text`, `amount`, `category`, and `notes`, in any column
//! order. Categories are matched by name and created on demand. Every record
//! is given an import ID derived from a hash of its raw content, so importing
//! a file that overlaps a previous import records each transaction only once.

use rusqlite::Connection;
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    Error,
    category::{CategoryName, create_category, get_category_by_name},
    transaction::{Transaction, create_transaction},
    user::UserId,
};

/// What happened during an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    /// The number of transactions recorded.
    pub imported: u32,
    /// The number of records skipped because they were already imported.
    pub skipped: u32,
}

const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// Import transactions for `user_id` from CSV data.
///
/// Records whose import ID already exists in the database are skipped, so
/// the same file (or overlapping files) can be imported repeatedly without
/// double-recording transactions. Note that two byte-identical records in
/// one file hash to the same import ID and are therefore recorded once.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidCsv] if a required column is missing or a record cannot
///   be parsed,
/// - or [Error::InvalidUser] if `user_id` does not refer to a real user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn import_transactions(
    csv_text: &str,
    user_id: UserId,
    connection: &Connection,
) -> Result<ImportSummary, Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(csv_text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|error| Error::InvalidCsv(error.to_string()))?
        .clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|header| header == name)
            .ok_or_else(|| Error::InvalidCsv(format!("missing column \"{name}\"")))
    };
    let created_at_column = column("created_at")?;
    let text_column = column("text")?;
    let amount_column = column("amount")?;
    let category_column = column("category")?;
    let notes_column = column("notes")?;

    let mut summary = ImportSummary::default();

    for (record_number, record) in reader.records().enumerate() {
        // Header is line 1, so the first record is line 2.
        let line_number = record_number + 2;
        let record = record.map_err(|error| Error::InvalidCsv(error.to_string()))?;
        let field = |column: usize| record.get(column).unwrap_or_default();

        let created_at = Date::parse(field(created_at_column), &DATE_FORMAT)
            .map_err(|error| {
                Error::InvalidCsv(format!(
                    "could not parse date {:?} on line {line_number}: {error}",
                    field(created_at_column)
                ))
            })?
            .midnight()
            .assume_utc();

        let amount: f64 = field(amount_column).parse().map_err(|error| {
            Error::InvalidCsv(format!(
                "could not parse amount {:?} on line {line_number}: {error}",
                field(amount_column)
            ))
        })?;

        let category_name = CategoryName::new(field(category_column))
            .map_err(|_| Error::InvalidCsv(format!("empty category on line {line_number}")))?;
        let category = match get_category_by_name(&category_name, connection) {
            Ok(category) => category,
            Err(Error::NotFound) => create_category(category_name, connection)?,
            Err(error) => return Err(error),
        };

        let notes = match field(notes_column) {
            "" => None,
            notes => Some(notes.to_string()),
        };

        let builder = Transaction::build(field(text_column), amount, user_id, category.id)
            .notes(notes)
            .import_id(Some(create_import_id(&record)))
            .created_at(created_at);

        match create_transaction(builder, connection) {
            Ok(_) => summary.imported += 1,
            Err(Error::DuplicateImportId) => {
                tracing::debug!("Skipping already imported record on line {line_number}");
                summary.skipped += 1;
            }
            Err(error) => return Err(error),
        }
    }

    Ok(summary)
}

/// Creates a hash for a transaction based on the raw record content.
///
/// Truncating the digest to 64 bits leaves collisions possible in principle,
/// but not at the scale of a personal ledger.
pub fn create_import_id(record: &csv::StringRecord) -> i64 {
    let line = record.iter().collect::<Vec<_>>().join(",");
    let hash_128 = md5::compute(line);
    let mut hash_64 = [0; 8];
    hash_64.copy_from_slice(&hash_128[0..8]);
    i64::from_le_bytes(hash_64)
}

use std::{error::Error, path::Path, process::exit};

use clap::Parser;
use rusqlite::Connection;
use time::macros::date;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use moneylog::{
    Email, User, initialize_db,
    budget::create_budget,
    category::{CategoryName, create_category},
    payment_method::{PaymentMethodName, create_payment_method, set_transaction_payment_method},
    recurring_transaction::{Frequency, create_recurring_transaction},
    tag::{TagName, add_tag_to_transaction, create_tag},
    transaction::{Transaction, create_transaction},
    user::create_user,
};

/// A utility for creating a populated test database for moneylog.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    setup_logging();

    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    tracing::info!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    tracing::info!("Creating test user...");
    let user = create_user(
        User::build("identity|demo", Email::new("demo@example.com")?)
            .name(Some("Demo User".to_string())),
        &conn,
    )?;

    tracing::info!("Creating categories, tags, and payment methods...");
    let groceries = create_category(CategoryName::new("Groceries")?, &conn)?;
    let rent = create_category(CategoryName::new("Rent")?, &conn)?;
    let salary = create_category(CategoryName::new("Salary")?, &conn)?;

    let essentials = create_tag(TagName::new("essentials")?, &conn)?;
    let weekend = create_tag(TagName::new("weekend")?, &conn)?;

    let visa = create_payment_method(PaymentMethodName::new("Visa ending 1234")?, &conn)?;
    let bank_transfer = create_payment_method(PaymentMethodName::new("Bank transfer")?, &conn)?;

    tracing::info!("Creating transactions...");
    let pay = create_transaction(
        Transaction::build("October pay", 4200.0, user.id, salary.id),
        &conn,
    )?;
    let october_rent = create_transaction(
        Transaction::build("October rent", -1850.0, user.id, rent.id),
        &conn,
    )?;
    let weekly_shop = create_transaction(
        Transaction::build("Weekly shop", -96.4, user.id, groceries.id)
            .notes(Some("Includes birthday cake ingredients".to_string())),
        &conn,
    )?;
    let market = create_transaction(
        Transaction::build("Saturday market", -23.75, user.id, groceries.id),
        &conn,
    )?;

    set_transaction_payment_method(october_rent.id, bank_transfer.id, &conn)?;
    set_transaction_payment_method(weekly_shop.id, visa.id, &conn)?;
    set_transaction_payment_method(market.id, visa.id, &conn)?;

    add_tag_to_transaction(october_rent.id, essentials.id, &conn)?;
    add_tag_to_transaction(weekly_shop.id, essentials.id, &conn)?;
    add_tag_to_transaction(market.id, weekend.id, &conn)?;

    tracing::info!("Creating budget and recurring transactions...");
    create_budget(user.id, groceries.id, 400.0, date!(2025 - 10 - 01), &conn)?;
    create_recurring_transaction(october_rent.id, Frequency::Monthly, date!(2025 - 11 - 01), &conn)?;
    create_recurring_transaction(pay.id, Frequency::Monthly, date!(2025 - 11 - 01), &conn)?;

    tracing::info!("Success!");

    Ok(())
}

fn setup_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().pretty())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::{Date, Month, PrimitiveDateTime, Time};

use livro_caixa::{
    Amount, CategoryName, CategoryNature, CategoryRef, InstallmentCount, Nature, NewCategory,
    NewTransaction, PaymentMethod, SubcategoryRef, TransactionKind, create_category,
    create_transaction, initialize_db,
};

/// A utility for creating a test database for the REST API server of livro_caixa.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// The year to generate transactions for.
    #[arg(long, default_value_t = 2025)]
    year: i32,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
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

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating categories...");

    let categories = [
        ("Food", CategoryNature::Pf, 80_000, &["Groceries", "Restaurants"][..]),
        ("Home", CategoryNature::Pf, 250_000, &["Rent", "Utilities"][..]),
        ("Salary", CategoryNature::Pf, 0, &["Monthly"][..]),
        ("Office", CategoryNature::Pj, 150_000, &["Software", "Equipment"][..]),
        ("Clients", CategoryNature::Pj, 0, &["Services"][..]),
        ("Investments", CategoryNature::All, 0, &["Savings"][..]),
    ];

    for (name, nature, limit_cents, subcategories) in categories {
        create_category(
            NewCategory {
                name: CategoryName::new(name)?,
                nature,
                limit: Amount::from_cents(limit_cents),
                subcategories: subcategories.iter().map(|s| (*s).to_owned()).collect(),
            },
            &conn,
        )?;
    }

    println!("Creating transactions...");

    for month in 1..=12u8 {
        let first_of_month = Date::from_calendar_date(args.year, Month::try_from(month)?, 1)?;
        let due_date = |day: u8| -> Result<PrimitiveDateTime, Box<dyn Error>> {
            Ok(PrimitiveDateTime::new(
                first_of_month.replace_day(day)?,
                Time::MIDNIGHT,
            ))
        };

        let monthly = [
            ("Salary", "Monthly", "Salary", TransactionKind::Income, Nature::Pf, 650_000, 5),
            ("Home", "Rent", "Rent", TransactionKind::Expense, Nature::Pf, 180_000, 10),
            ("Food", "Groceries", "Supermarket", TransactionKind::Expense, Nature::Pf, 45_000 + i64::from(month) * 1_000, 15),
            ("Clients", "Services", "Consulting invoice", TransactionKind::Income, Nature::Pj, 900_000, 20),
            ("Office", "Software", "Subscriptions", TransactionKind::Expense, Nature::Pj, 12_000, 25),
            ("Investments", "Savings", "Savings deposit", TransactionKind::Investment, Nature::Pf, 50_000, 28),
        ];

        for (category, subcategory, description, kind, nature, cents, day) in monthly {
            create_transaction(
                NewTransaction {
                    amount: Amount::from_cents(cents),
                    description: description.to_owned(),
                    installment_count: InstallmentCount::ONE,
                    due_date: due_date(day)?,
                    kind,
                    nature,
                    payment_method: PaymentMethod::Pix,
                    category: CategoryRef::Name(CategoryName::new(category)?),
                    subcategory: SubcategoryRef::Name(subcategory.to_owned()),
                },
                &conn,
            )?;
        }
    }

    create_transaction(
        NewTransaction {
            amount: Amount::from_cents(600_000),
            description: "Laptop".to_owned(),
            installment_count: InstallmentCount::new(10)?,
            due_date: PrimitiveDateTime::new(
                Date::from_calendar_date(args.year, Month::March, 31)?,
                Time::MIDNIGHT,
            ),
            kind: TransactionKind::Expense,
            nature: Nature::Pj,
            payment_method: PaymentMethod::Credit,
            category: CategoryRef::Name(CategoryName::new("Office")?),
            subcategory: SubcategoryRef::Name("Equipment".to_owned()),
        },
        &conn,
    )?;

    println!("Success!");

    Ok(())
}

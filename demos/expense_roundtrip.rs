//! Smoke test against a running server: create an expense, read it back,
//! then delete it.
//!
//! Uses `SPLITBOOK_SERVER` (default `http://127.0.0.1:3000`).
//!
//! Run: `cargo run --example expense_roundtrip`

use std::process::ExitCode;

use splitbook::client::{DEFAULT_BASE_URL, SplitbookBlockingClient};
use splitbook::models::NewExpense;
use splitbook::storage::BlockingStorage;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let _dotenv = dotenvy::dotenv();

    let base_url =
        std::env::var("SPLITBOOK_SERVER").unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned());
    let client = SplitbookBlockingClient::builder()
        .base_url(base_url)
        .build()?;

    let health = client.health()?;
    println!("Server status: {}", health.status);

    let before = client.expenses()?;
    println!("Expenses before: {}", before.len());

    let created = client.create_expense(NewExpense {
        date: chrono::Utc::now().date_naive().to_string(),
        description: "Roundtrip demo, safe to delete".to_owned(),
        payer: "Demo".to_owned(),
        amount: 1.0,
    })?;
    println!("Created expense {}", created.id);

    let fetched = client
        .expense(created.id)?
        .ok_or("created expense not found")?;
    assert_eq!(fetched, created, "server returned a different record");

    if client.delete_expense(created.id)? {
        println!("Deleted expense {}", created.id);
    } else {
        return Err("expense vanished before delete".into());
    }

    let after = client.expenses()?;
    println!("Expenses after: {}", after.len());
    Ok(())
}

//! Basic authentication example.
//!
//! Signs in to Monzo (reusing a cached token when there is one) and lists the
//! accounts with their most recent transactions.
//!
//! Run with: cargo run --example basic_auth

use monzo_expenses::MonzoClient;

#[tokio::main]
async fn main() -> monzo_expenses::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // MONZO_EXPENSES_CLIENT_ID and MONZO_EXPENSES_CLIENT_SECRET must be set
    let client = MonzoClient::from_env()?;

    if client.restore_session().await? {
        println!("Using cached access token");
    } else {
        println!("Opening the Monzo login page...");
        client.authenticate().await?;
    }

    println!("Successfully authenticated!");

    let accounts = client
        .with_reauthentication(|client| async move { client.accounts().list().await })
        .await?;
    println!("\nFound {} account(s):", accounts.len());

    for account in &accounts {
        println!(
            "  - {} ({}{})",
            account.identifier,
            account.account_type,
            if account.is_closed { ", closed" } else { "" }
        );

        let transactions = client.transactions().list(&account.identifier).await?;
        for txn in transactions.iter().rev().take(5) {
            println!(
                "    {}  {:>10}  {}",
                txn.created.format("%d/%m/%Y"),
                format!("{:.2}", txn.amount as f64 / 100.0),
                txn.description
            );
        }
    }

    println!("\nDone!");
    Ok(())
}

//! Basic authentication example.
//!
//! Logs in as the institution, adds one customer session, makes an
//! authenticated call, and stops.
//!
//! Required environment variables: `GTN_API_URL`, `GTN_APP_KEY`,
//! `GTN_APP_SECRET`, `GTN_PRIVATE_KEY`, `GTN_INSTITUTION`, `GTN_USER_ID`.
//! Optional: `GTN_CHANNEL`, `GTN_INSTITUTION_ID`, `GTN_CUSTOMER`.
//!
//! Run with: RUST_LOG=gtn_rs=debug cargo run --example basic_auth

use gtn_rs::{ClientConfig, Credential, CustomerNumber, GtnClient};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> gtn_rs::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let api_url = std::env::var("GTN_API_URL")
        .expect("GTN_API_URL environment variable required");
    let credential = Credential::from_env()?;

    println!("Connecting to {api_url} as {}...", credential.institution());

    let client = GtnClient::connect(&api_url, credential, ClientConfig::default())?;

    let outcome = client.init().await?;
    println!("Institution login: {}", serde_json::to_string(&outcome)?);
    if !outcome.is_success() {
        return Ok(());
    }

    if let Ok(customer) = std::env::var("GTN_CUSTOMER") {
        let customer = CustomerNumber::new(customer);
        let outcome = client.init_customer(customer.clone()).await;
        println!("Customer login: {}", serde_json::to_string(&outcome)?);

        if outcome.is_success() {
            let response = client.get("/trade/accounts", Some(&customer)).await?;
            println!("Accounts ({}): {}", response.status, response.body);
        }
    }

    println!("Active customers: {:?}", client.active_customers().await);

    client.stop().await;
    println!("\nDone!");
    Ok(())
}

//! Order Book Service
//!
//! Hosts the order book escrow engine behind a REST API. The service owns an
//! in-process token bank; harnesses provision accounts through the funding
//! and approval endpoints (or the `[[funding]]` config section) before
//! driving order scenarios.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

mod api;
mod config;
mod engine;
mod error;
mod events;
mod ledger;
mod transfer;

use config::Config;
use engine::EscrowEngine;
use transfer::TokenBank;

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

/// Main application entry point that initializes and runs the order book
/// service.
///
/// This function:
/// 1. Initializes logging and tracing
/// 2. Loads configuration from TOML file
/// 3. Builds the token bank and applies configured funding
/// 4. Builds the escrow engine
/// 5. Runs the API server until shutdown
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured logging for debugging and monitoring
    tracing_subscriber::fmt::init();

    info!("Starting Order Book Service");

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    // Check for help flag
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        println!("Order Book Service");
        println!();
        println!("Usage: orderbook [OPTIONS]");
        println!();
        println!("Options:");
        println!("  --config <path>   Use custom config file path");
        println!("  --help, -h        Show this help message");
        println!();
        println!("Environment variables:");
        println!("  ORDERBOOK_CONFIG_PATH    Path to config file (overrides --config)");
        return Ok(());
    }

    // Check for custom config path
    let mut config_path = None;
    for (i, arg) in args.iter().enumerate() {
        if arg == "--config" && i + 1 < args.len() {
            config_path = Some(args[i + 1].clone());
            break;
        }
    }

    if let Some(path) = config_path {
        if std::env::var("ORDERBOOK_CONFIG_PATH").is_err() {
            std::env::set_var("ORDERBOOK_CONFIG_PATH", &path);
            info!("Using custom config: {}", path);
        }
    }

    // Load configuration from config file (or ORDERBOOK_CONFIG_PATH env var)
    let config = Config::load()?;
    info!("Configuration loaded successfully");

    // Build the token bank and apply initial funding
    let bank = Arc::new(TokenBank::new());
    for entry in &config.funding {
        bank.set_balance(&entry.token, &entry.account, entry.amount);
    }
    if !config.funding.is_empty() {
        info!("Applied {} funding entries", config.funding.len());
    }

    // Build the escrow engine over the bank
    let engine = EscrowEngine::new(
        config.ledger.custody_account.clone(),
        config.ledger.base_order_id,
        bank.clone(),
    );
    info!(
        custody_account = %config.ledger.custody_account,
        base_order_id = config.ledger.base_order_id,
        "Escrow engine initialized"
    );

    // Run the REST API server
    let api_server = api::ApiServer::new(config, engine, bank);
    api_server.run().await
}

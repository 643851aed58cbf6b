//! Configuration Management Module
//!
//! Loads and validates configuration for the order book service: ledger
//! settings, API server settings, and optional initial funding applied to
//! the token bank at startup.

use serde::{Deserialize, Serialize};

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Main configuration structure containing all service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Ledger settings (id base, custody account label)
    pub ledger: LedgerConfig,
    /// API server configuration (host, port, CORS settings)
    pub api: ApiConfig,
    /// Initial balances applied to the token bank at startup.
    /// Mirrors the funding step a harness performs before a scenario.
    #[serde(default)]
    pub funding: Vec<FundingConfig>,
}

/// Order ledger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// First order id the ledger will assign
    pub base_order_id: u64,
    /// Account label under which the engine holds escrowed tokens
    pub custody_account: String,
}

/// API server configuration for external communication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host address to bind the API server to
    pub host: String,
    /// Port number to bind the API server to
    pub port: u16,
    /// Allowed CORS origins for cross-origin requests
    pub cors_origins: Vec<String>,
}

/// One initial balance entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingConfig {
    /// Token identifier
    pub token: String,
    /// Account to fund
    pub account: String,
    /// Balance to set, in the token's smallest unit
    pub amount: u64,
}

// ============================================================================
// CONFIGURATION LOADING AND MANAGEMENT
// ============================================================================

impl Config {
    /// Validates the configuration.
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Configuration is valid
    /// - `Err(anyhow::Error)` - Empty custody account, custody account used
    ///   as a funding target, or unparsable bind address
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.ledger.custody_account.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "Configuration error: ledger.custody_account must not be empty"
            ));
        }

        // Custody holds escrow only; funding it directly would break the
        // conservation invariant between ledger and bank.
        for entry in &self.funding {
            if entry.account == self.ledger.custody_account {
                return Err(anyhow::anyhow!(
                    "Configuration error: funding entry targets the custody account '{}'",
                    entry.account
                ));
            }
        }

        format!("{}:{}", self.api.host, self.api.port)
            .parse::<std::net::SocketAddr>()
            .map_err(|e| {
                anyhow::anyhow!(
                    "Configuration error: invalid API bind address {}:{}: {}",
                    self.api.host,
                    self.api.port,
                    e
                )
            })?;

        Ok(())
    }

    /// Loads configuration from the TOML file.
    ///
    /// The path comes from the `ORDERBOOK_CONFIG_PATH` environment variable
    /// when set, otherwise `config/orderbook.toml`.
    ///
    /// # Returns
    ///
    /// - `Ok(Config)` - Successfully loaded and validated configuration
    /// - `Err(anyhow::Error)` - File missing, unparsable, or invalid
    pub fn load() -> anyhow::Result<Self> {
        let config_path = std::env::var("ORDERBOOK_CONFIG_PATH")
            .unwrap_or_else(|_| "config/orderbook.toml".to_string());

        if std::path::Path::new(&config_path).exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Err(anyhow::anyhow!(
                "Configuration file '{}' not found. Please copy the template:\n\
                cp config/orderbook.template.toml config/orderbook.toml\n\
                Then edit config/orderbook.toml with your actual values.",
                config_path
            ))
        }
    }

    /// Creates a default configuration suitable for local development and
    /// tests.
    pub fn default() -> Self {
        Self {
            ledger: LedgerConfig {
                base_order_id: 1,
                custody_account: "orderbook-custody".to_string(),
            },
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 3030,
                cors_origins: vec!["*".to_string()],
            },
            funding: Vec::new(),
        }
    }
}

//! Configuration loading from TOML with environment variable fallback.
//!
//! Reads `config.toml` (or the file named by `MOMENTUM_CONFIG`) into
//! strongly-typed structs. Without a config file, the same settings are
//! read from the process environment (`MOMENTUM_POOL_ID`, `SWAP_AMOUNT`,
//! ...). The private key is referenced by env-var name and resolved at
//! runtime via `std::env::var`.

use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::engine::accountant::PriceTable;
use crate::engine::controller::ControllerSettings;
use crate::ledger::transaction::same_type;
use crate::types::{Network, SwapDirection, TradeSize, TradingConfiguration, SUI_COIN_TYPE};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const CONFIG_PATH_ENV: &str = "MOMENTUM_CONFIG";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    pub pool: PoolConfig,
    pub trade: TradeConfig,
    #[serde(default)]
    pub gas: GasConfig,
    /// USD price per upper-case symbol, merged over the built-in table.
    #[serde(default)]
    pub prices: HashMap<String, Decimal>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BotConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_interval")]
    pub swap_interval_secs: u64,
    #[serde(default = "default_direction")]
    pub initial_direction: SwapDirection,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NetworkConfig {
    #[serde(default = "default_network")]
    pub network: Network,
    /// Empty or absent means the network's public fullnode.
    #[serde(default)]
    pub rpc_url: Option<String>,
    #[serde(default = "default_key_env")]
    pub private_key_env: String,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PoolConfig {
    pub pool_id: String,
    pub clmm_package_id: String,
    /// Protocol version object passed to trade entry points.
    pub global_config: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TradeConfig {
    #[serde(default = "default_base_token")]
    pub base_token: String,
    pub quote_token: String,
    /// `ALL` or a decimal quantity of the source asset.
    #[serde(default = "default_amount")]
    pub amount: String,
    #[serde(default = "default_slippage")]
    pub slippage_tolerance: Decimal,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GasConfig {
    #[serde(default = "default_gas_budget")]
    pub budget_mist: u64,
    #[serde(default = "default_min_gas")]
    pub min_balance: Decimal,
    #[serde(default = "default_low_gas")]
    pub low_balance_warning: Decimal,
}

fn default_name() -> String {
    "MOMENTUM-001".to_string()
}
fn default_interval() -> u64 {
    5
}
fn default_direction() -> SwapDirection {
    SwapDirection::BaseToQuote
}
fn default_network() -> Network {
    Network::Testnet
}
fn default_key_env() -> String {
    "SUI_PRIVATE_KEY".to_string()
}
fn default_timeout() -> u64 {
    30
}
fn default_base_token() -> String {
    SUI_COIN_TYPE.to_string()
}
fn default_amount() -> String {
    "0.1".to_string()
}
fn default_slippage() -> Decimal {
    dec!(0.02)
}
fn default_gas_budget() -> u64 {
    50_000_000
}
fn default_min_gas() -> Decimal {
    dec!(0.05)
}
fn default_low_gas() -> Decimal {
    dec!(0.1)
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            swap_interval_secs: default_interval(),
            initial_direction: default_direction(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            rpc_url: None,
            private_key_env: default_key_env(),
            request_timeout_secs: default_timeout(),
        }
    }
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            budget_mist: default_gas_budget(),
            min_balance: default_min_gas(),
            low_balance_warning: default_low_gas(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// `$MOMENTUM_CONFIG`, else `config.toml` if present, else environment.
    pub fn load_default() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Self::load(&path);
        }
        if Path::new(DEFAULT_CONFIG_PATH).exists() {
            return Self::load(DEFAULT_CONFIG_PATH);
        }
        Self::from_env()
    }

    /// Build from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (the environment in production).
    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            get(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("Environment variable not set: {key}"))
        };

        let network = match get("NETWORK") {
            Some(n) => n.parse::<Network>()?,
            None => default_network(),
        };
        let swap_interval_secs = match get("SWAP_INTERVAL_SECONDS") {
            Some(s) => s
                .trim()
                .parse()
                .with_context(|| format!("Invalid SWAP_INTERVAL_SECONDS: {s}"))?,
            None => default_interval(),
        };
        let slippage_tolerance = match get("SLIPPAGE_TOLERANCE") {
            Some(s) => s
                .trim()
                .parse()
                .with_context(|| format!("Invalid SLIPPAGE_TOLERANCE: {s}"))?,
            None => default_slippage(),
        };

        // The key itself is only checked for presence here.
        required(&default_key_env())?;

        let config = AppConfig {
            bot: BotConfig {
                swap_interval_secs,
                ..BotConfig::default()
            },
            network: NetworkConfig {
                network,
                rpc_url: get("SUI_RPC_URL"),
                ..NetworkConfig::default()
            },
            pool: PoolConfig {
                pool_id: required("MOMENTUM_POOL_ID")?,
                clmm_package_id: required("MOMENTUM_CLMM_PACKAGE_ID")?,
                global_config: required("MOMENTUM_GLOBAL_CONFIG")?,
            },
            trade: TradeConfig {
                base_token: get("BASE_TOKEN").unwrap_or_else(default_base_token),
                quote_token: required("QUOTE_TOKEN")?,
                amount: get("SWAP_AMOUNT").unwrap_or_else(default_amount),
                slippage_tolerance,
            },
            gas: GasConfig::default(),
            prices: HashMap::new(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        let trade_size = self.trade_size()?;
        if let TradeSize::FixedAmount(x) = trade_size {
            if x <= Decimal::ZERO {
                bail!("Swap amount must be positive, got {x}");
            }
        }

        let slippage = self.trade.slippage_tolerance;
        if slippage < Decimal::ZERO || slippage >= Decimal::ONE {
            bail!("Slippage tolerance must be in [0, 1), got {slippage}");
        }
        if self.bot.swap_interval_secs == 0 {
            bail!("Swap interval must be at least one second");
        }
        if self.network.request_timeout_secs == 0 {
            bail!("Request timeout must be at least one second");
        }
        if self.gas.budget_mist == 0 {
            bail!("Gas budget must be positive");
        }

        for (name, value) in [
            ("pool.pool_id", &self.pool.pool_id),
            ("pool.clmm_package_id", &self.pool.clmm_package_id),
            ("pool.global_config", &self.pool.global_config),
            ("trade.base_token", &self.trade.base_token),
            ("trade.quote_token", &self.trade.quote_token),
        ] {
            if value.trim().is_empty() {
                bail!("{name} must not be empty");
            }
        }
        let (base, quote) = (self.trade.base_token.trim(), self.trade.quote_token.trim());
        if base == quote || same_type(base, quote) {
            bail!("Base and quote tokens must differ");
        }
        Ok(())
    }

    pub fn trade_size(&self) -> Result<TradeSize> {
        Ok(self.trade.amount.parse::<TradeSize>()?)
    }

    pub fn rpc_url(&self) -> String {
        match &self.network.rpc_url {
            Some(url) if !url.trim().is_empty() => url.trim().to_string(),
            _ => self.network.network.default_rpc_url().to_string(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.network.request_timeout_secs)
    }

    /// Immutable per-run settings handed to the engine.
    pub fn trading_configuration(&self) -> Result<TradingConfiguration> {
        Ok(TradingConfiguration {
            pool_id: self.pool.pool_id.clone(),
            base_token: self.trade.base_token.clone(),
            quote_token: self.trade.quote_token.clone(),
            trade_size: self.trade_size()?,
            slippage_tolerance: self.trade.slippage_tolerance,
            network: self.network.network,
            rpc_url: self.rpc_url(),
            clmm_package_id: self.pool.clmm_package_id.clone(),
            global_config: self.pool.global_config.clone(),
        })
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            interval: Duration::from_secs(self.bot.swap_interval_secs),
            min_gas: self.gas.min_balance,
            low_gas_warning: self.gas.low_balance_warning,
            gas_budget: self.gas.budget_mist,
            initial_direction: self.bot.initial_direction,
            prices: PriceTable::default().with_overrides(&self.prices),
        }
    }

    /// Resolve the signing key from the environment.
    pub fn private_key(&self) -> Result<SecretString> {
        Self::resolve_env(&self.network.private_key_env).map(SecretString::new)
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}

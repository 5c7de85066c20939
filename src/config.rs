//! 配置管理模块
//! 支持从环境变量和配置文件加载配置

use std::{path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::utils::address_validator::AddressValidator;

/// 原始部署地址（hardhat 本地网络第一个合约）
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

/// 应用配置结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub contract: ContractConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 钱包配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// 钱包 RPC 地址；未设置时视为未检测到钱包
    #[serde(default)]
    pub rpc_url: Option<String>,
    pub account_poll_interval_ms: u64,
}

/// 域名市场合约配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractConfig {
    pub address: String,
    /// 视为成功所需的区块确认数
    pub confirmations: usize,
    /// 调用方未给出价格时 buyDomain 附带的金额（ETH）
    pub default_purchase_price_eth: String,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
}

impl WalletConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.account_poll_interval_ms)
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            rpc_url: std::env::var("WALLET_RPC_URL")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            account_poll_interval_ms: std::env::var("WALLET_ACCOUNT_POLL_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1000),
        }
    }
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            address: std::env::var("CONTRACT_ADDRESS")
                .unwrap_or_else(|_| DEFAULT_CONTRACT_ADDRESS.into()),
            confirmations: std::env::var("TX_CONFIRMATIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1),
            default_purchase_price_eth: std::env::var("DEFAULT_PURCHASE_PRICE_ETH")
                .unwrap_or_else(|_| "1".into()),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".into()),
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            wallet: WalletConfig::default(),
            contract: ContractConfig::default(),
            logging: LoggingConfig::default(),
        })
    }

    /// 从配置文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// 从环境变量和配置文件合并加载（配置文件优先级更高）
    pub fn from_env_and_file<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut config = Self::from_env()?;

        if let Some(path) = path {
            if path.as_ref().exists() {
                config = Self::from_file(path)?;
            } else {
                tracing::warn!(path = ?path.as_ref(), "Config file not found, using environment");
            }
        }

        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        if !AddressValidator::is_valid_evm_address(&self.contract.address) {
            anyhow::bail!(
                "CONTRACT_ADDRESS is not a valid EIP-55 address: {}",
                self.contract.address
            );
        }

        if self.contract.confirmations == 0 {
            anyhow::bail!("TX_CONFIRMATIONS must be at least 1");
        }

        crate::domain::units::parse_ether_exact(&self.contract.default_purchase_price_eth)
            .with_context(|| "DEFAULT_PURCHASE_PRICE_ETH is not an exact ETH amount")?;

        if self.wallet.account_poll_interval_ms == 0 {
            anyhow::bail!("WALLET_ACCOUNT_POLL_INTERVAL_MS must be positive");
        }

        if let Some(url) = &self.wallet.rpc_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("WALLET_RPC_URL must start with http:// or https://");
            }
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("LOG_LEVEL must be one of: {:?}", valid_levels);
        }

        if self.logging.format != "json" && self.logging.format != "text" {
            anyhow::bail!("LOG_FORMAT must be 'json' or 'text'");
        }

        Ok(())
    }
}

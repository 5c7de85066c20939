// 域名市场合约网关
// listDomain / buyDomain 统一走 提交 → 等待确认 流程，确认前绝不返回成功

use std::fmt;

use ethers::{
    abi::parse_abi,
    contract::BaseContract,
    types::{Address, Bytes, TransactionReceipt, TransactionRequest, TxHash, U256, U64},
};
use thiserror::Error;

use crate::{
    config::ContractConfig,
    domain::{
        listing::DomainListing,
        transaction_status::TransactionStatus,
        units::{format_ether, parse_ether_exact, UnitsError},
    },
    infrastructure::wallet_provider::{TransactionSigner, WalletError, WalletErrorKind},
    utils::address_validator::AddressValidator,
};

/// 合约 ABI（只包含本仓库调用的两个写方法）
pub const MARKETPLACE_ABI: &[&str] = &[
    "function listDomain(string domainName, uint256 price)",
    "function buyDomain(string domainName) payable",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractMethod {
    ListDomain,
    BuyDomain,
}

impl ContractMethod {
    pub fn abi_name(&self) -> &'static str {
        match self {
            Self::ListDomain => "listDomain",
            Self::BuyDomain => "buyDomain",
        }
    }
}

impl fmt::Display for ContractMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abi_name())
    }
}

/// 单次用户操作对应的合约调用，提交一次后即丢弃
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketplaceCall {
    ListDomain { domain_name: String, price_wei: U256 },
    BuyDomain { domain_name: String, value_wei: U256 },
}

impl MarketplaceCall {
    pub fn method(&self) -> ContractMethod {
        match self {
            Self::ListDomain { .. } => ContractMethod::ListDomain,
            Self::BuyDomain { .. } => ContractMethod::BuyDomain,
        }
    }

    pub fn domain_name(&self) -> &str {
        match self {
            Self::ListDomain { domain_name, .. } | Self::BuyDomain { domain_name, .. } => {
                domain_name
            }
        }
    }

    /// 随交易附带的原生币数量
    pub fn attached_value(&self) -> U256 {
        match self {
            Self::ListDomain { .. } => U256::zero(),
            Self::BuyDomain { value_wei, .. } => *value_wei,
        }
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid price: {0}")]
    InvalidPrice(#[from] UnitsError),

    #[error("domain name must not be empty")]
    EmptyDomainName,

    #[error("listing {0} is not active")]
    ListingInactive(String),

    #[error("contract ABI error: {0}")]
    Abi(String),

    #[error("invalid contract address: {0}")]
    InvalidAddress(String),

    /// 提交或确认阶段的所有失败，保留底层原因
    #[error("{method} transaction failed ({outcome}): {cause}")]
    TransactionFailed {
        method: ContractMethod,
        outcome: TransactionStatus,
        tx_hash: Option<TxHash>,
        #[source]
        cause: WalletError,
    },
}

impl GatewayError {
    pub fn outcome(&self) -> Option<TransactionStatus> {
        match self {
            Self::TransactionFailed { outcome, .. } => Some(*outcome),
            _ => None,
        }
    }
}

/// 已确认的交易
#[derive(Debug, Clone)]
pub struct ConfirmedTransaction {
    pub method: ContractMethod,
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub receipt: TransactionReceipt,
}

#[derive(Debug, Clone)]
pub struct ContractGateway {
    address: Address,
    contract: BaseContract,
    confirmations: usize,
    default_purchase_price: U256,
}

impl ContractGateway {
    pub fn new(
        address: Address,
        confirmations: usize,
        default_purchase_price: U256,
    ) -> Result<Self, GatewayError> {
        let abi = parse_abi(MARKETPLACE_ABI).map_err(|e| GatewayError::Abi(e.to_string()))?;
        Ok(Self {
            address,
            contract: BaseContract::from(abi),
            confirmations: confirmations.max(1),
            default_purchase_price,
        })
    }

    pub fn from_config(config: &ContractConfig) -> Result<Self, GatewayError> {
        let address = AddressValidator::parse(&config.address)
            .ok_or_else(|| GatewayError::InvalidAddress(config.address.clone()))?;
        let default_price = parse_ether_exact(&config.default_purchase_price_eth)?;
        Self::new(address, config.confirmations, default_price)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn confirmations(&self) -> usize {
        self.confirmations
    }

    pub fn default_purchase_price(&self) -> U256 {
        self.default_purchase_price
    }

    /// 挂单：价格按18位定点精确换算成 wei
    pub async fn list_domain(
        &self,
        signer: &dyn TransactionSigner,
        domain_name: &str,
        price_eth: &str,
    ) -> Result<ConfirmedTransaction, GatewayError> {
        let domain_name = Self::check_domain_name(domain_name)?;
        let price_wei = parse_ether_exact(price_eth)?;
        self.submit(
            signer,
            MarketplaceCall::ListDomain {
                domain_name,
                price_wei,
            },
        )
        .await
    }

    /// 购买：附带调用方给出的价格（ETH）
    pub async fn buy_domain(
        &self,
        signer: &dyn TransactionSigner,
        domain_name: &str,
        price_eth: &str,
    ) -> Result<ConfirmedTransaction, GatewayError> {
        let value_wei = parse_ether_exact(price_eth)?;
        self.buy_domain_wei(signer, domain_name, value_wei).await
    }

    pub async fn buy_domain_wei(
        &self,
        signer: &dyn TransactionSigner,
        domain_name: &str,
        value_wei: U256,
    ) -> Result<ConfirmedTransaction, GatewayError> {
        let domain_name = Self::check_domain_name(domain_name)?;
        self.submit(
            signer,
            MarketplaceCall::BuyDomain {
                domain_name,
                value_wei,
            },
        )
        .await
    }

    /// 按挂单的真实价格购买
    pub async fn buy_listing(
        &self,
        signer: &dyn TransactionSigner,
        listing: &DomainListing,
    ) -> Result<ConfirmedTransaction, GatewayError> {
        if !listing.is_purchasable() {
            return Err(GatewayError::ListingInactive(listing.domain_name.clone()));
        }
        self.buy_domain_wei(signer, &listing.domain_name, listing.price_wei)
            .await
    }

    /// 兼容旧前端：不知道价格时附带配置的默认金额（默认 1 ETH）
    pub async fn buy_domain_at_default_price(
        &self,
        signer: &dyn TransactionSigner,
        domain_name: &str,
    ) -> Result<ConfirmedTransaction, GatewayError> {
        tracing::warn!(
            domain = %domain_name,
            value_eth = %format_ether(self.default_purchase_price),
            "Buying with default price, not the listing price"
        );
        self.buy_domain_wei(signer, domain_name, self.default_purchase_price)
            .await
    }

    pub fn encode(&self, call: &MarketplaceCall) -> Result<Bytes, GatewayError> {
        let method = call.method();
        let encoded = match call {
            MarketplaceCall::ListDomain {
                domain_name,
                price_wei,
            } => self
                .contract
                .encode(method.abi_name(), (domain_name.clone(), *price_wei)),
            MarketplaceCall::BuyDomain { domain_name, .. } => {
                self.contract.encode(method.abi_name(), domain_name.clone())
            }
        };
        encoded.map_err(|e| GatewayError::Abi(format!("{method}: {e}")))
    }

    /// 构造未签名交易；from 由签名者填写
    pub fn build_transaction(
        &self,
        call: &MarketplaceCall,
    ) -> Result<TransactionRequest, GatewayError> {
        Ok(TransactionRequest::new()
            .to(self.address)
            .data(self.encode(call)?)
            .value(call.attached_value()))
    }

    async fn submit(
        &self,
        signer: &dyn TransactionSigner,
        call: MarketplaceCall,
    ) -> Result<ConfirmedTransaction, GatewayError> {
        let method = call.method();
        let tx = self.build_transaction(&call)?;
        let mut status = TransactionStatus::Built;

        tracing::info!(
            method = %method,
            domain = %call.domain_name(),
            from = %AddressValidator::to_checksum(&signer.address()),
            value_eth = %format_ether(call.attached_value()),
            "Submitting marketplace transaction"
        );

        let tx_hash = match signer.send_transaction(tx).await {
            Ok(hash) => hash,
            Err(cause) => {
                let outcome = match cause.kind {
                    WalletErrorKind::UserRejected => TransactionStatus::RejectedByUser,
                    WalletErrorKind::ExecutionReverted => TransactionStatus::Reverted,
                    _ => TransactionStatus::NetworkError,
                };
                return Err(Self::fail(&call, &mut status, outcome, None, cause));
            }
        };
        Self::advance(&mut status, TransactionStatus::Submitted, method);
        tracing::info!(method = %method, tx_hash = ?tx_hash, "Transaction submitted, waiting for confirmation");

        let receipt = match signer
            .wait_for_confirmation(tx_hash, self.confirmations)
            .await
        {
            Ok(Some(receipt)) => receipt,
            Ok(None) => {
                let cause = WalletError::network(format!("transaction {tx_hash:?} was dropped"));
                return Err(Self::fail(
                    &call,
                    &mut status,
                    TransactionStatus::NetworkError,
                    Some(tx_hash),
                    cause,
                ));
            }
            Err(cause) => {
                let outcome = if cause.kind == WalletErrorKind::ExecutionReverted {
                    TransactionStatus::Reverted
                } else {
                    TransactionStatus::NetworkError
                };
                return Err(Self::fail(&call, &mut status, outcome, Some(tx_hash), cause));
            }
        };

        if receipt.status == Some(U64::zero()) {
            let cause = WalletError::new(
                WalletErrorKind::ExecutionReverted,
                format!(
                    "transaction {tx_hash:?} reverted in block {:?}",
                    receipt.block_number
                ),
            );
            return Err(Self::fail(
                &call,
                &mut status,
                TransactionStatus::Reverted,
                Some(tx_hash),
                cause,
            ));
        }

        Self::advance(&mut status, TransactionStatus::Confirmed, method);
        let block_number = receipt.block_number.map(|b| b.as_u64());
        tracing::info!(
            method = %method,
            domain = %call.domain_name(),
            tx_hash = ?tx_hash,
            block_number = ?block_number,
            "Transaction confirmed"
        );

        Ok(ConfirmedTransaction {
            method,
            tx_hash,
            block_number,
            receipt,
        })
    }

    fn advance(status: &mut TransactionStatus, next: TransactionStatus, method: ContractMethod) {
        if !status.can_transition_to(&next) {
            tracing::warn!(method = %method, from = %status, to = %next, "Unexpected transaction status transition");
        }
        *status = next;
    }

    fn fail(
        call: &MarketplaceCall,
        status: &mut TransactionStatus,
        outcome: TransactionStatus,
        tx_hash: Option<TxHash>,
        cause: WalletError,
    ) -> GatewayError {
        let method = call.method();
        Self::advance(status, outcome, method);
        tracing::error!(
            method = %method,
            domain = %call.domain_name(),
            outcome = %outcome,
            tx_hash = ?tx_hash,
            error = %cause,
            "Marketplace transaction failed"
        );
        GatewayError::TransactionFailed {
            method,
            outcome,
            tx_hash,
            cause,
        }
    }

    fn check_domain_name(domain_name: &str) -> Result<String, GatewayError> {
        let name = domain_name.trim();
        if name.is_empty() {
            return Err(GatewayError::EmptyDomainName);
        }
        Ok(name.to_string())
    }
}

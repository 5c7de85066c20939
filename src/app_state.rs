use std::sync::Arc;

use ethers::types::Address;

use crate::{
    config::Config,
    domain::{listing::DomainListing, wallet_session::WalletSession},
    error::AppError,
    infrastructure::{
        notifier::{LogNotifier, UserNotifier},
        rpc_wallet::detect_wallet,
        wallet_provider::{TransactionSigner, WalletProvider},
    },
    service::{
        contract_gateway::{ConfirmedTransaction, ContractGateway, GatewayError},
        session_service::WalletSessionService,
    },
};

/// 应用状态
/// 界面层拿到的唯一上下文：会话 + 合约网关
#[derive(Debug, Clone)]
pub struct AppState {
    pub session: Arc<WalletSessionService>,
    pub gateway: Arc<ContractGateway>,
}

impl AppState {
    pub fn new(session: Arc<WalletSessionService>, gateway: ContractGateway) -> Self {
        Self {
            session,
            gateway: Arc::new(gateway),
        }
    }

    /// 按配置组装：探测钱包、构建网关
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::with_wallet(config, detect_wallet(&config.wallet), Arc::new(LogNotifier))
    }

    pub fn with_wallet(
        config: &Config,
        wallet: Option<Arc<dyn WalletProvider>>,
        notifier: Arc<dyn UserNotifier>,
    ) -> anyhow::Result<Self> {
        let gateway = ContractGateway::from_config(&config.contract)?;
        let session = WalletSessionService::new(wallet, notifier);
        Ok(Self::new(session, gateway))
    }

    /// 挂载：开始监听钱包账户变化
    pub fn mount(&self) -> bool {
        self.session.mount()
    }

    pub async fn teardown(&self) {
        self.session.teardown().await;
    }

    pub async fn connect_wallet(&self) -> Option<Address> {
        self.session.connect_wallet().await
    }

    /// `{provider, signer, account}` 一致快照
    pub async fn snapshot(&self) -> WalletSession {
        self.session.snapshot().await
    }

    pub async fn list_domain(
        &self,
        signer: &dyn TransactionSigner,
        domain_name: &str,
        price_eth: &str,
    ) -> Result<ConfirmedTransaction, GatewayError> {
        self.gateway.list_domain(signer, domain_name, price_eth).await
    }

    pub async fn buy_domain(
        &self,
        signer: &dyn TransactionSigner,
        domain_name: &str,
        price_eth: &str,
    ) -> Result<ConfirmedTransaction, GatewayError> {
        self.gateway.buy_domain(signer, domain_name, price_eth).await
    }

    /// 用当前会话的签名者挂单；未连接时直接拒绝
    pub async fn list_with_session(
        &self,
        domain_name: &str,
        price_eth: &str,
    ) -> Result<ConfirmedTransaction, AppError> {
        let signer = self.current_signer().await?;
        Ok(self
            .gateway
            .list_domain(signer.as_ref(), domain_name, price_eth)
            .await?)
    }

    /// 用当前会话的签名者购买；`price_eth` 缺省时使用配置的默认价格
    pub async fn buy_with_session(
        &self,
        domain_name: &str,
        price_eth: Option<&str>,
    ) -> Result<ConfirmedTransaction, AppError> {
        let signer = self.current_signer().await?;
        let result = match price_eth {
            Some(price) => {
                self.gateway
                    .buy_domain(signer.as_ref(), domain_name, price)
                    .await
            }
            None => {
                self.gateway
                    .buy_domain_at_default_price(signer.as_ref(), domain_name)
                    .await
            }
        };
        Ok(result?)
    }

    pub async fn buy_listing_with_session(
        &self,
        listing: &DomainListing,
    ) -> Result<ConfirmedTransaction, AppError> {
        let signer = self.current_signer().await?;
        Ok(self.gateway.buy_listing(signer.as_ref(), listing).await?)
    }

    async fn current_signer(&self) -> Result<Arc<dyn TransactionSigner>, AppError> {
        self.session
            .signer()
            .await
            .ok_or_else(AppError::wallet_not_connected)
    }
}

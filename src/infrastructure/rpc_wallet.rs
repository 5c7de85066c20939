// 节点托管钱包 - 基于 ethers-rs 的 JSON-RPC 实现
// 账户私钥由节点（hardhat/anvil/geth --unlock）持有，签名走 eth_sendTransaction，
// 与浏览器钱包的 JsonRpcSigner 语义一致

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use ethers::{
    providers::{Http, Middleware, PendingTransaction, Provider, ProviderError, RpcError},
    types::{Address, TransactionReceipt, TransactionRequest, TxHash},
};
use tokio::{
    sync::broadcast,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};

use crate::{
    config::WalletConfig,
    infrastructure::wallet_provider::{
        TransactionSigner, WalletError, WalletErrorKind, WalletProvider,
    },
};

const ACCOUNTS_CHANNEL_CAPACITY: usize = 16;

/// ProviderError → 结构化 WalletError（按错误码，不按消息文本）
pub fn classify_provider_error(err: &ProviderError) -> WalletError {
    if let Some(resp) = err.as_error_response() {
        return WalletError::from_rpc(resp.code, resp.message.clone());
    }
    WalletError::network(err.to_string())
}

/// 按配置探测钱包：未配置 RPC 地址视为"未安装钱包"
pub fn detect_wallet(config: &WalletConfig) -> Option<Arc<dyn WalletProvider>> {
    let url = config.rpc_url.as_deref()?;
    match RpcWalletProvider::connect(url, config.poll_interval()) {
        Ok(provider) => {
            tracing::info!(rpc_url = %url, "Wallet provider detected");
            Some(Arc::new(provider))
        }
        Err(e) => {
            tracing::warn!(rpc_url = %url, error = %e, "Wallet provider unusable");
            None
        }
    }
}

#[derive(Debug)]
pub struct RpcWalletProvider {
    provider: Provider<Http>,
    poll_interval: Duration,
    accounts_tx: broadcast::Sender<Vec<Address>>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl RpcWalletProvider {
    pub fn connect(rpc_url: &str, poll_interval: Duration) -> Result<Self, WalletError> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| WalletError::network(format!("invalid wallet RPC url {rpc_url}: {e}")))?
            .interval(poll_interval);
        let (accounts_tx, _) = broadcast::channel(ACCOUNTS_CHANNEL_CAPACITY);

        Ok(Self {
            provider,
            poll_interval,
            accounts_tx,
            poller: Mutex::new(None),
        })
    }

    /// 首个订阅者出现时启动轮询；所有订阅者离开后轮询自行退出
    fn ensure_poller(&self) {
        let mut guard = match self.poller.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No tokio runtime, accountsChanged polling disabled");
            return;
        };
        *guard = Some(runtime.spawn(poll_accounts(
            self.provider.clone(),
            self.accounts_tx.clone(),
            self.poll_interval,
        )));
    }
}

impl Drop for RpcWalletProvider {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.poller.lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
    }
}

/// 轮询 eth_accounts，变化时广播（第一次只记录基线）
async fn poll_accounts(
    provider: Provider<Http>,
    accounts_tx: broadcast::Sender<Vec<Address>>,
    every: Duration,
) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last: Option<Vec<Address>> = None;

    loop {
        ticker.tick().await;

        if accounts_tx.receiver_count() == 0 {
            tracing::debug!("No accountsChanged subscribers left, stopping poller");
            break;
        }

        match provider.get_accounts().await {
            Ok(accounts) => {
                if last.as_ref().is_some_and(|prev| *prev != accounts) {
                    tracing::info!(accounts = ?accounts, "Wallet accounts changed");
                    let _ = accounts_tx.send(accounts.clone());
                }
                last = Some(accounts);
            }
            Err(e) => {
                tracing::warn!(error = %classify_provider_error(&e), "Failed to poll wallet accounts");
            }
        }
    }
}

#[async_trait]
impl WalletProvider for RpcWalletProvider {
    async fn request_permissions(&self) -> Result<(), WalletError> {
        let params = [serde_json::json!({ "eth_accounts": {} })];
        match self
            .provider
            .request::<_, serde_json::Value>("wallet_requestPermissions", params)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                let err = classify_provider_error(&e);
                if err.kind == WalletErrorKind::Unsupported {
                    // 节点托管账户天然已授权
                    tracing::debug!("wallet_requestPermissions unsupported, treating as granted");
                    return Ok(());
                }
                Err(err)
            }
        }
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        match self
            .provider
            .request::<_, Vec<Address>>("eth_requestAccounts", ())
            .await
        {
            Ok(accounts) => Ok(accounts),
            Err(e) => {
                let err = classify_provider_error(&e);
                if err.kind != WalletErrorKind::Unsupported {
                    return Err(err);
                }
                tracing::debug!("eth_requestAccounts unsupported, falling back to eth_accounts");
                self.provider
                    .get_accounts()
                    .await
                    .map_err(|e| classify_provider_error(&e))
            }
        }
    }

    async fn signer_for(
        &self,
        account: Address,
    ) -> Result<Arc<dyn TransactionSigner>, WalletError> {
        Ok(Arc::new(JsonRpcSigner {
            provider: self.provider.clone(),
            address: account,
        }))
    }

    fn subscribe_accounts_changed(&self) -> broadcast::Receiver<Vec<Address>> {
        let rx = self.accounts_tx.subscribe();
        self.ensure_poller();
        rx
    }
}

/// 由节点代签的账户
#[derive(Debug, Clone)]
pub struct JsonRpcSigner {
    provider: Provider<Http>,
    address: Address,
}

#[async_trait]
impl TransactionSigner for JsonRpcSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash, WalletError> {
        let tx = tx.from(self.address);
        let pending = self
            .provider
            .send_transaction(tx, None)
            .await
            .map_err(|e| classify_provider_error(&e))?;
        Ok(pending.tx_hash())
    }

    async fn wait_for_confirmation(
        &self,
        tx_hash: TxHash,
        confirmations: usize,
    ) -> Result<Option<TransactionReceipt>, WalletError> {
        PendingTransaction::new(tx_hash, &self.provider)
            .confirmations(confirmations)
            .await
            .map_err(|e| classify_provider_error(&e))
    }
}

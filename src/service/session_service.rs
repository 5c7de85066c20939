// 钱包会话服务
// 负责钱包握手：授权 → 获取账户 → 获取签名者 → 原子提交会话
// 会话对象显式传递（Arc<WalletSessionService>），不使用全局状态

use std::sync::{Arc, Mutex};

use ethers::types::Address;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};

use crate::{
    domain::wallet_session::{SessionEvent, WalletConnection, WalletSession},
    infrastructure::{
        notifier::UserNotifier,
        wallet_provider::{TransactionSigner, WalletError, WalletErrorKind, WalletProvider},
    },
    service::session_watcher::{SessionWatcher, WatcherGuard},
    utils::address_validator::AddressValidator,
};

pub const NO_ACTIVE_ACCOUNT_ALERT: &str =
    "Please ensure your wallet is unlocked and logged in with an active account.";

const SESSION_EVENT_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// 未检测到钱包扩展，用户需要安装/启用
    #[error("wallet extension not detected")]
    WalletNotFound,

    /// 用户拒绝授权，可重试
    #[error("wallet permission denied: {0}")]
    PermissionDenied(#[source] WalletError),

    /// 已授权但钱包没有活动账户（未解锁）
    #[error("no active account: ensure wallet is unlocked and an account is active")]
    NoActiveAccount,

    #[error(transparent)]
    Wallet(#[from] WalletError),
}

impl SessionError {
    fn from_permission_step(err: WalletError) -> Self {
        match err.kind {
            WalletErrorKind::UserRejected | WalletErrorKind::Unauthorized => {
                Self::PermissionDenied(err)
            }
            _ => Self::Wallet(err),
        }
    }
}

pub struct WalletSessionService {
    provider: Option<Arc<dyn WalletProvider>>,
    session: RwLock<WalletSession>,
    events: broadcast::Sender<SessionEvent>,
    notifier: Arc<dyn UserNotifier>,
    watcher: Mutex<Option<WatcherGuard>>,
}

impl WalletSessionService {
    /// `provider` 为 None 表示宿主环境中没有钱包
    pub fn new(
        provider: Option<Arc<dyn WalletProvider>>,
        notifier: Arc<dyn UserNotifier>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
        Arc::new(Self {
            provider,
            session: RwLock::new(WalletSession::empty()),
            events,
            notifier,
            watcher: Mutex::new(None),
        })
    }

    pub fn wallet_detected(&self) -> bool {
        self.provider.is_some()
    }

    /// 完整连接流程
    ///
    /// 所有步骤成功后才一次性替换会话；任何一步失败都不改动现有会话。
    /// 并发调用之间不互斥，后写入者生效。
    pub async fn connect(self: &Arc<Self>) -> Result<Address, SessionError> {
        let Some(provider) = self.provider.clone() else {
            tracing::info!("Wallet not detected");
            return Err(SessionError::WalletNotFound);
        };

        self.ensure_watcher(&provider);

        provider
            .request_permissions()
            .await
            .map_err(SessionError::from_permission_step)?;

        let accounts = provider
            .request_accounts()
            .await
            .map_err(SessionError::from_permission_step)?;

        let account = *accounts.first().ok_or(SessionError::NoActiveAccount)?;
        let signer = provider.signer_for(account).await?;

        self.commit(WalletConnection {
            provider,
            signer,
            account,
        })
        .await;

        Ok(account)
    }

    /// 面向 UI 的连接入口：失败只记录日志（无活动账户时额外弹出提示），不向上抛出
    pub async fn connect_wallet(self: &Arc<Self>) -> Option<Address> {
        match self.connect().await {
            Ok(account) => Some(account),
            Err(SessionError::WalletNotFound) => None,
            Err(SessionError::NoActiveAccount) => {
                tracing::error!("Error connecting to wallet: no active account");
                self.notifier.alert(NO_ACTIVE_ACCOUNT_ALERT);
                None
            }
            Err(e) => {
                tracing::error!(error = %e, "Error connecting to wallet");
                None
            }
        }
    }

    /// 清空会话（钱包报告零账户或钱包被移除）
    pub async fn disconnect_or_reset(&self) {
        let mut session = self.session.write().await;
        if !session.is_connected() {
            return;
        }
        *session = WalletSession::empty();
        drop(session);

        tracing::info!("Wallet session reset");
        let _ = self.events.send(SessionEvent::Reset);
    }

    /// accountsChanged 通知处理：空列表清空会话，否则完整重连
    pub async fn resync(self: &Arc<Self>, accounts: Vec<Address>) {
        tracing::debug!(accounts = ?accounts, "Resyncing wallet session");
        if accounts.is_empty() {
            self.disconnect_or_reset().await;
            return;
        }
        self.connect_wallet().await;
    }

    /// 组件挂载：注册账户变更监听（幂等）
    pub fn mount(self: &Arc<Self>) -> bool {
        match &self.provider {
            Some(provider) => {
                self.ensure_watcher(provider);
                true
            }
            None => false,
        }
    }

    /// 组件卸载：确定性地取消监听
    pub async fn teardown(&self) {
        let guard = match self.watcher.lock() {
            Ok(mut g) => g.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(guard) = guard {
            guard.unsubscribe().await;
            tracing::debug!("Account change listener removed");
        }
    }

    pub fn is_watching(&self) -> bool {
        match self.watcher.lock() {
            Ok(g) => g.is_some(),
            Err(poisoned) => poisoned.into_inner().is_some(),
        }
    }

    /// 会话整体快照，provider/signer/account 来自同一次提交
    pub async fn snapshot(&self) -> WalletSession {
        self.session.read().await.clone()
    }

    pub async fn account(&self) -> Option<Address> {
        self.session.read().await.account()
    }

    pub async fn signer(&self) -> Option<Arc<dyn TransactionSigner>> {
        self.session.read().await.signer()
    }

    pub async fn is_connected(&self) -> bool {
        self.session.read().await.is_connected()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    async fn commit(&self, connection: WalletConnection) {
        let account = connection.account;
        *self.session.write().await = WalletSession::connected(connection);

        tracing::info!(
            account = %AddressValidator::to_checksum(&account),
            "Wallet connected"
        );
        let _ = self.events.send(SessionEvent::Connected { account });
    }

    fn ensure_watcher(self: &Arc<Self>, provider: &Arc<dyn WalletProvider>) {
        let mut watcher = match self.watcher.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        if watcher.is_none() {
            *watcher = Some(SessionWatcher::spawn(
                Arc::downgrade(self),
                provider.subscribe_accounts_changed(),
            ));
            tracing::debug!("Account change listener registered");
        }
    }
}

impl std::fmt::Debug for WalletSessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletSessionService")
            .field("wallet_detected", &self.provider.is_some())
            .finish_non_exhaustive()
    }
}

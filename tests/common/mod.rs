//! 测试辅助模块
//! 内存钱包、可编排的签名者和记录型提示器

#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use domain_market::{
    config::{Config, ContractConfig, LoggingConfig, WalletConfig, DEFAULT_CONTRACT_ADDRESS},
    domain::SessionEvent,
    infrastructure::{
        notifier::UserNotifier,
        wallet_provider::{TransactionSigner, WalletError, WalletProvider},
    },
};
use ethers::types::{Address, TransactionReceipt, TransactionRequest, TxHash, H256, U64};
use tokio::sync::{broadcast, Notify};

pub const WAIT: Duration = Duration::from_secs(2);

pub fn account(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

pub fn test_config() -> Config {
    Config {
        wallet: WalletConfig {
            rpc_url: None,
            account_poll_interval_ms: 50,
        },
        contract: ContractConfig {
            address: DEFAULT_CONTRACT_ADDRESS.into(),
            confirmations: 1,
            default_purchase_price_eth: "1".into(),
        },
        logging: LoggingConfig {
            level: "debug".into(),
            format: "text".into(),
        },
    }
}

/// 等待下一条会话事件
pub async fn next_event(rx: &mut broadcast::Receiver<SessionEvent>) -> SessionEvent {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for session event")
        .expect("session event channel closed")
}

/// 轮询直到条件成立
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while !cond() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

// ============ 签名者 ============

#[derive(Debug, Clone)]
pub enum ConfirmBehavior {
    Success,
    Revert,
    Dropped,
    Fail(WalletError),
}

#[derive(Debug)]
pub struct MockSigner {
    address: Address,
    send_error: Mutex<Option<WalletError>>,
    confirm: Mutex<ConfirmBehavior>,
    /// 设置后确认等待会挂起，直到 notify
    confirm_gate: Mutex<Option<Arc<Notify>>>,
    pub sent: Mutex<Vec<TransactionRequest>>,
    pub confirmations_requested: Mutex<Vec<usize>>,
    nonce: AtomicUsize,
}

impl MockSigner {
    pub fn new(address: Address) -> Arc<Self> {
        Arc::new(Self {
            address,
            send_error: Mutex::new(None),
            confirm: Mutex::new(ConfirmBehavior::Success),
            confirm_gate: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            confirmations_requested: Mutex::new(Vec::new()),
            nonce: AtomicUsize::new(1),
        })
    }

    pub fn reject_send(&self, err: WalletError) {
        *self.send_error.lock().unwrap() = Some(err);
    }

    pub fn set_confirm(&self, behavior: ConfirmBehavior) {
        *self.confirm.lock().unwrap() = behavior;
    }

    pub fn gate_confirmation(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.confirm_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn last_sent(&self) -> TransactionRequest {
        self.sent.lock().unwrap().last().cloned().expect("no transaction sent")
    }
}

#[async_trait]
impl TransactionSigner for MockSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash, WalletError> {
        if let Some(err) = self.send_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.sent.lock().unwrap().push(tx.from(self.address));
        let n = self.nonce.fetch_add(1, Ordering::SeqCst);
        Ok(H256::from_low_u64_be(n as u64))
    }

    async fn wait_for_confirmation(
        &self,
        tx_hash: TxHash,
        confirmations: usize,
    ) -> Result<Option<TransactionReceipt>, WalletError> {
        self.confirmations_requested
            .lock()
            .unwrap()
            .push(confirmations);

        let gate = self.confirm_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let behavior = self.confirm.lock().unwrap().clone();
        let receipt = |status: u64| TransactionReceipt {
            transaction_hash: tx_hash,
            block_number: Some(U64::from(42)),
            status: Some(U64::from(status)),
            ..Default::default()
        };
        match behavior {
            ConfirmBehavior::Success => Ok(Some(receipt(1))),
            ConfirmBehavior::Revert => Ok(Some(receipt(0))),
            ConfirmBehavior::Dropped => Ok(None),
            ConfirmBehavior::Fail(err) => Err(err),
        }
    }
}

// ============ 钱包 ============

#[derive(Debug)]
pub struct MockWallet {
    accounts: Mutex<Vec<Address>>,
    permission_error: Mutex<Option<WalletError>>,
    accounts_error: Mutex<Option<WalletError>>,
    signers: Mutex<Vec<Arc<MockSigner>>>,
    accounts_tx: broadcast::Sender<Vec<Address>>,
    pub permission_requests: AtomicUsize,
    pub subscriptions: AtomicUsize,
}

impl MockWallet {
    pub fn with_accounts(accounts: Vec<Address>) -> Arc<Self> {
        let (accounts_tx, _) = broadcast::channel(16);
        Arc::new(Self {
            accounts: Mutex::new(accounts),
            permission_error: Mutex::new(None),
            accounts_error: Mutex::new(None),
            signers: Mutex::new(Vec::new()),
            accounts_tx,
            permission_requests: AtomicUsize::new(0),
            subscriptions: AtomicUsize::new(0),
        })
    }

    pub fn as_provider(self: &Arc<Self>) -> Arc<dyn WalletProvider> {
        self.clone()
    }

    pub fn set_accounts(&self, accounts: Vec<Address>) {
        *self.accounts.lock().unwrap() = accounts;
    }

    pub fn fail_permissions(&self, err: Option<WalletError>) {
        *self.permission_error.lock().unwrap() = err;
    }

    pub fn fail_accounts(&self, err: Option<WalletError>) {
        *self.accounts_error.lock().unwrap() = err;
    }

    /// 模拟钱包内切换账户并触发 accountsChanged
    pub fn switch_accounts(&self, accounts: Vec<Address>) {
        self.set_accounts(accounts.clone());
        let _ = self.accounts_tx.send(accounts);
    }

    pub fn listener_count(&self) -> usize {
        self.accounts_tx.receiver_count()
    }

    pub fn permission_request_count(&self) -> usize {
        self.permission_requests.load(Ordering::SeqCst)
    }

    /// 最近为某个账户发放的签名者
    pub fn signer(&self, account: Address) -> Arc<MockSigner> {
        self.signers
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|s| s.address() == account)
            .cloned()
            .expect("no signer issued for account")
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    async fn request_permissions(&self) -> Result<(), WalletError> {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        match self.permission_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        if let Some(err) = self.accounts_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.accounts.lock().unwrap().clone())
    }

    async fn signer_for(
        &self,
        account: Address,
    ) -> Result<Arc<dyn TransactionSigner>, WalletError> {
        let signer = MockSigner::new(account);
        self.signers.lock().unwrap().push(signer.clone());
        Ok(signer)
    }

    fn subscribe_accounts_changed(&self) -> broadcast::Receiver<Vec<Address>> {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        self.accounts_tx.subscribe()
    }
}

// ============ 提示器 ============

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub alerts: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().unwrap().clone()
    }
}

impl UserNotifier for RecordingNotifier {
    fn alert(&self, message: &str) {
        self.alerts.lock().unwrap().push(message.to_string());
    }
}

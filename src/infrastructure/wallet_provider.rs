//! 钱包边界适配层（EIP-1193 形态）
//!
//! 上层只依赖这里的 trait 和结构化错误；具体实现见 `rpc_wallet`，
//! 测试中用内存 mock 替换。

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use ethers::types::{Address, TransactionReceipt, TransactionRequest, TxHash};
use thiserror::Error;
use tokio::sync::broadcast;

/// EIP-1193 / JSON-RPC 错误码
pub mod codes {
    pub const USER_REJECTED: i64 = 4001;
    pub const UNAUTHORIZED: i64 = 4100;
    pub const UNSUPPORTED_METHOD: i64 = 4200;
    pub const DISCONNECTED: i64 = 4900;
    pub const CHAIN_DISCONNECTED: i64 = 4901;
    pub const EXECUTION_REVERTED: i64 = 3;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const METHOD_NOT_SUPPORTED: i64 = -32004;
    pub const RESOURCE_UNAVAILABLE: i64 = -32002;
}

/// 结构化错误类别，替代对错误消息的子串匹配
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalletErrorKind {
    /// 用户在钱包弹窗中拒绝
    UserRejected,
    /// 账户未授权给当前应用
    Unauthorized,
    /// 钱包/节点不支持该方法
    Unsupported,
    Disconnected,
    /// 已有同类请求在等待用户处理
    RequestPending,
    ExecutionReverted,
    /// 节点返回的其他 JSON-RPC 错误（余额不足、nonce 等）
    Rpc,
    /// 传输层失败，没有拿到 JSON-RPC 响应
    Network,
}

impl WalletErrorKind {
    pub fn from_code(code: i64) -> Self {
        match code {
            codes::USER_REJECTED => Self::UserRejected,
            codes::UNAUTHORIZED => Self::Unauthorized,
            codes::UNSUPPORTED_METHOD | codes::METHOD_NOT_FOUND | codes::METHOD_NOT_SUPPORTED => {
                Self::Unsupported
            }
            codes::DISCONNECTED | codes::CHAIN_DISCONNECTED => Self::Disconnected,
            codes::RESOURCE_UNAVAILABLE => Self::RequestPending,
            codes::EXECUTION_REVERTED => Self::ExecutionReverted,
            _ => Self::Rpc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserRejected => "user_rejected",
            Self::Unauthorized => "unauthorized",
            Self::Unsupported => "unsupported",
            Self::Disconnected => "disconnected",
            Self::RequestPending => "request_pending",
            Self::ExecutionReverted => "execution_reverted",
            Self::Rpc => "rpc",
            Self::Network => "network",
        }
    }
}

impl fmt::Display for WalletErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("wallet request failed [{kind}]: {message}")]
pub struct WalletError {
    pub kind: WalletErrorKind,
    /// 原始 JSON-RPC 错误码（传输层错误时为 None）
    pub code: Option<i64>,
    pub message: String,
}

impl WalletError {
    pub fn new(kind: WalletErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            message: message.into(),
        }
    }

    pub fn from_rpc(code: i64, message: impl Into<String>) -> Self {
        Self {
            kind: WalletErrorKind::from_code(code),
            code: Some(code),
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(WalletErrorKind::Network, message)
    }

    pub fn is_user_rejection(&self) -> bool {
        self.kind == WalletErrorKind::UserRejected
    }
}

/// 代表单个账户签名并提交交易的能力
#[async_trait]
pub trait TransactionSigner: Send + Sync + fmt::Debug {
    fn address(&self) -> Address;

    /// 提交交易，返回交易哈希（只表示已广播，不代表已上链）
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash, WalletError>;

    /// 挂起直到交易获得 `confirmations` 个确认
    ///
    /// 交易被丢弃时返回 `Ok(None)`。
    async fn wait_for_confirmation(
        &self,
        tx_hash: TxHash,
        confirmations: usize,
    ) -> Result<Option<TransactionReceipt>, WalletError>;
}

/// 浏览器钱包扩展（或等价的节点托管钱包）
#[async_trait]
pub trait WalletProvider: Send + Sync + fmt::Debug {
    /// `wallet_requestPermissions({ eth_accounts: {} })`，显式重新弹出授权
    async fn request_permissions(&self) -> Result<(), WalletError>;

    /// `eth_requestAccounts`
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError>;

    async fn signer_for(&self, account: Address)
        -> Result<Arc<dyn TransactionSigner>, WalletError>;

    /// `accountsChanged` 通知；丢弃 Receiver 即取消订阅
    fn subscribe_accounts_changed(&self) -> broadcast::Receiver<Vec<Address>>;
}

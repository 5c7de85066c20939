//! 钱包会话状态
//!
//! provider/signer/account 三者整体存在或整体缺失，
//! 用 `Option<WalletConnection>` 在类型层面保证。

use std::sync::Arc;

use ethers::types::Address;
use serde::Serialize;

use crate::infrastructure::wallet_provider::{TransactionSigner, WalletProvider};

/// 一次成功连接得到的全部句柄
#[derive(Debug, Clone)]
pub struct WalletConnection {
    pub provider: Arc<dyn WalletProvider>,
    pub signer: Arc<dyn TransactionSigner>,
    pub account: Address,
}

#[derive(Debug, Clone, Default)]
pub struct WalletSession {
    connection: Option<WalletConnection>,
}

impl WalletSession {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn connected(connection: WalletConnection) -> Self {
        Self {
            connection: Some(connection),
        }
    }

    pub fn connection(&self) -> Option<&WalletConnection> {
        self.connection.as_ref()
    }

    pub fn provider(&self) -> Option<Arc<dyn WalletProvider>> {
        self.connection.as_ref().map(|c| c.provider.clone())
    }

    pub fn signer(&self) -> Option<Arc<dyn TransactionSigner>> {
        self.connection.as_ref().map(|c| c.signer.clone())
    }

    pub fn account(&self) -> Option<Address> {
        self.connection.as_ref().map(|c| c.account)
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }
}

/// 已提交的会话变更，推送给 UI 观察者
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Connected { account: Address },
    Reset,
}

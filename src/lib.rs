//! domain-market - 域名市场 dApp 核心
//!
//! 钱包会话、账户变更监听、合约调用提交与确认

pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod service;
pub mod utils;

// 重新导出常用类型
pub use app_state::AppState;
pub use error::{AppError, AppErrorCode};

pub mod prelude {
    pub use crate::{
        app_state::AppState,
        domain::{DomainListing, SessionEvent, TransactionStatus, WalletSession},
        error::{AppError, AppErrorCode},
        infrastructure::wallet_provider::{
            TransactionSigner, WalletError, WalletErrorKind, WalletProvider,
        },
        service::{
            contract_gateway::{ConfirmedTransaction, ContractGateway, GatewayError},
            session_service::{SessionError, WalletSessionService},
        },
    };
}

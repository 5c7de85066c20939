//! 应用级错误（UI 边界）
//!
//! 组件内部使用各自的 thiserror 枚举；到达界面层时统一成
//! 稳定的错误码 + 面向用户的提示。

use std::fmt;

use serde::Serialize;

use crate::{
    infrastructure::wallet_provider::WalletErrorKind,
    service::{
        contract_gateway::GatewayError,
        session_service::{SessionError, NO_ACTIVE_ACCOUNT_ALERT},
    },
};

pub const CONNECT_WALLET_FIRST: &str = "Please connect your wallet first.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppErrorCode {
    WalletNotFound,
    PermissionDenied,
    NoActiveAccount,
    WalletNotConnected,
    InvalidAmount,
    InvalidParameter,
    TransactionFailed,
    RpcError,
    Internal,
}

impl AppErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WalletNotFound => "wallet_not_found",
            Self::PermissionDenied => "permission_denied",
            Self::NoActiveAccount => "no_active_account",
            Self::WalletNotConnected => "wallet_not_connected",
            Self::InvalidAmount => "invalid_amount",
            Self::InvalidParameter => "invalid_parameter",
            Self::TransactionFailed => "transaction_failed",
            Self::RpcError => "rpc_error",
            Self::Internal => "internal",
        }
    }

    /// 用户重新发起操作是否可能成功
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::WalletNotFound | Self::Internal)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AppError {
    pub code: AppErrorCode,
    pub message: String,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {}

impl AppError {
    pub fn new(code: AppErrorCode, msg: impl Into<String>) -> Self {
        Self {
            code,
            message: msg.into(),
        }
    }

    pub fn wallet_not_connected() -> Self {
        Self::new(AppErrorCode::WalletNotConnected, CONNECT_WALLET_FIRST)
    }

    pub fn invalid_amount(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::InvalidAmount, msg)
    }

    pub fn transaction_failed(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::TransactionFailed, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::Internal, msg)
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::WalletNotFound => Self::new(
                AppErrorCode::WalletNotFound,
                "No wallet detected. Install or enable a wallet and try again.",
            ),
            SessionError::PermissionDenied(_) => Self::new(
                AppErrorCode::PermissionDenied,
                "Wallet access was declined. Approve the request to continue.",
            ),
            SessionError::NoActiveAccount => {
                Self::new(AppErrorCode::NoActiveAccount, NO_ACTIVE_ACCOUNT_ALERT)
            }
            SessionError::Wallet(e) => Self::new(AppErrorCode::RpcError, e.message),
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        let text = err.to_string();
        match err {
            GatewayError::InvalidPrice(e) => Self::invalid_amount(e.to_string()),
            GatewayError::EmptyDomainName | GatewayError::ListingInactive(_) => {
                Self::new(AppErrorCode::InvalidParameter, text)
            }
            GatewayError::Abi(_) | GatewayError::InvalidAddress(_) => Self::internal(text),
            GatewayError::TransactionFailed { method, cause, .. } => {
                let reason = match cause.kind {
                    WalletErrorKind::UserRejected => "request was rejected in the wallet".into(),
                    _ => cause.message,
                };
                Self::transaction_failed(format!("Failed to {method}: {reason}"))
            }
        }
    }
}

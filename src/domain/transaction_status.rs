//! 合约调用交易的生命周期
//! Built → Submitted → (Confirmed | Reverted | RejectedByUser | NetworkError)

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// 调用已编码，尚未交给钱包
    Built,

    /// 钱包已接受并广播，等待上链确认
    Submitted,

    /// 已被打包且执行成功
    Confirmed,

    /// 已被打包但合约执行回滚
    Reverted,

    /// 用户在钱包中拒绝签名
    RejectedByUser,

    /// RPC/网络故障，或交易被丢弃
    NetworkError,
}

impl TransactionStatus {
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Built | Self::Submitted)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Confirmed)
    }

    /// 状态机约束
    pub fn can_transition_to(&self, target: &Self) -> bool {
        use TransactionStatus::*;

        match (self, target) {
            // 提交前钱包拒绝或节点不可用
            (Built, Submitted) | (Built, RejectedByUser) | (Built, NetworkError) => true,

            // 执行期回滚（estimateGas 阶段）也归为 Reverted
            (Built, Reverted) => true,

            (Submitted, Confirmed)
            | (Submitted, Reverted)
            | (Submitted, NetworkError) => true,

            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Built => "built",
            Self::Submitted => "submitted",
            Self::Confirmed => "confirmed",
            Self::Reverted => "reverted",
            Self::RejectedByUser => "rejected_by_user",
            Self::NetworkError => "network_error",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        use TransactionStatus::*;

        assert!(Built.can_transition_to(&Submitted));
        assert!(Built.can_transition_to(&RejectedByUser));
        assert!(Submitted.can_transition_to(&Confirmed));
        assert!(Submitted.can_transition_to(&Reverted));
        assert!(Submitted.can_transition_to(&NetworkError));

        // 未提交不能直接确认
        assert!(!Built.can_transition_to(&Confirmed));
        // 用户拒绝只可能发生在提交前
        assert!(!Submitted.can_transition_to(&RejectedByUser));
        assert!(!Submitted.can_transition_to(&Built));

        // 最终状态不可转换
        assert!(!Confirmed.can_transition_to(&Submitted));
        assert!(!Reverted.can_transition_to(&Confirmed));
    }

    #[test]
    fn test_is_final() {
        use TransactionStatus::*;

        assert!(!Built.is_final());
        assert!(!Submitted.is_final());
        assert!(Confirmed.is_final());
        assert!(Reverted.is_final());
        assert!(RejectedByUser.is_final());
        assert!(NetworkError.is_final());
        assert!(Confirmed.is_success());
        assert!(!Reverted.is_success());
    }

    #[test]
    fn test_display() {
        assert_eq!(TransactionStatus::RejectedByUser.to_string(), "rejected_by_user");
    }
}

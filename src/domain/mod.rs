//! Domain 模块
//!
//! 领域模型：会话状态、交易生命周期、挂单、金额换算

pub mod listing;
pub mod transaction_status;
pub mod units;
pub mod wallet_session;

// 重新导出常用类型
pub use listing::DomainListing;
pub use transaction_status::TransactionStatus;
pub use units::{parse_ether_exact, EtherAmount, UnitsError};
pub use wallet_session::{SessionEvent, WalletConnection, WalletSession};

//! 域名挂单（链上合约持有，本地只读）

use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::domain::units::format_ether;

/// 合约中的一条域名挂单
///
/// 本仓库从不直接修改挂单，只通过合约调用间接影响它。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainListing {
    /// 唯一键
    pub domain_name: String,
    pub price_wei: U256,
    pub seller: Address,
    pub active: bool,
}

impl DomainListing {
    pub fn is_purchasable(&self) -> bool {
        self.active && !self.domain_name.is_empty()
    }

    pub fn display_price(&self) -> String {
        format!("{} ETH", format_ether(self.price_wei))
    }
}

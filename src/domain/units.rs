//! 以太币单位换算
//!
//! 整数ETH/小数ETH字符串 → wei（18位定点），严格精确，不经过浮点

use std::fmt;

use ethers::types::U256;
use thiserror::Error;

/// 1 ETH = 10^18 wei
pub const ETHER_DECIMALS: usize = 18;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitsError {
    #[error("price is empty")]
    Empty,

    #[error("price must not be negative: {0}")]
    Negative(String),

    #[error("price is not a decimal number: {0}")]
    Malformed(String),

    /// 小数位超过18位，无法用wei精确表示
    #[error("price {value} has {decimals} decimal places, at most 18 are supported")]
    TooPrecise { value: String, decimals: usize },

    #[error("price {0} overflows uint256")]
    Overflow(String),
}

/// 精确解析ETH金额为wei
///
/// 接受 `"1"`、`"0.5"`、`".25"`、`"2."` 这类十进制写法；拒绝科学计数法、
/// 符号、空白以外的任何字符。超出18位的小数部分只有在全为0时才被接受。
pub fn parse_ether_exact(input: &str) -> Result<U256, UnitsError> {
    let value = input.trim();
    if value.is_empty() {
        return Err(UnitsError::Empty);
    }
    if value.starts_with('-') {
        return Err(UnitsError::Negative(value.to_string()));
    }
    let value = value.strip_prefix('+').unwrap_or(value);

    let (int_part, frac_part) = match value.split_once('.') {
        Some((i, f)) => (i, f),
        None => (value, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(UnitsError::Malformed(input.to_string()));
    }
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(UnitsError::Malformed(input.to_string()));
    }

    let frac_trimmed = frac_part.trim_end_matches('0');
    if frac_trimmed.len() > ETHER_DECIMALS {
        return Err(UnitsError::TooPrecise {
            value: input.trim().to_string(),
            decimals: frac_trimmed.len(),
        });
    }

    // 右侧补0到18位后拼接成整数wei
    let digits = format!(
        "{}{}{}",
        int_part,
        frac_trimmed,
        "0".repeat(ETHER_DECIMALS - frac_trimmed.len())
    );
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::zero());
    }

    U256::from_dec_str(digits).map_err(|_| UnitsError::Overflow(input.trim().to_string()))
}

/// wei → ETH 显示字符串（日志用）
pub fn format_ether(wei: U256) -> String {
    ethers::utils::format_ether(wei)
}

/// 已校验的ETH价格
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EtherAmount(U256);

impl EtherAmount {
    pub fn from_wei(wei: U256) -> Self {
        Self(wei)
    }

    pub fn parse(input: &str) -> Result<Self, UnitsError> {
        parse_ether_exact(input).map(Self)
    }

    pub fn wei(&self) -> U256 {
        self.0
    }
}

impl fmt::Display for EtherAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ETH", format_ether(self.0))
    }
}

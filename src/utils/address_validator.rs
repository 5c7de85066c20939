//! 地址验证模块
//!
//! EVM 地址格式 + EIP-55 Checksum

use ethers::types::Address;
use sha3::{Digest, Keccak256};

/// 地址验证器
pub struct AddressValidator;

impl AddressValidator {
    /// 验证EVM地址（支持EIP-55 Checksum）
    ///
    /// 全小写/全大写地址只检查格式；大小写混合时必须通过校验和。
    pub fn is_valid_evm_address(address: &str) -> bool {
        let Some(hex_part) = address.strip_prefix("0x") else {
            return false;
        };

        if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return false;
        }

        let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
        let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
        if has_upper && has_lower {
            return Self::verify_eip55_checksum(hex_part);
        }

        true
    }

    /// 解析并校验地址
    pub fn parse(address: &str) -> Option<Address> {
        if !Self::is_valid_evm_address(address) {
            return None;
        }
        address.parse().ok()
    }

    /// EIP-55 校验和格式（日志展示用）
    pub fn to_checksum(address: &Address) -> String {
        ethers::utils::to_checksum(address, None)
    }

    /// https://eips.ethereum.org/EIPS/eip-55
    fn verify_eip55_checksum(hex_part: &str) -> bool {
        let lower = hex_part.to_lowercase();
        let hash = Keccak256::digest(lower.as_bytes());
        let hash_hex = hex::encode(hash);

        hex_part
            .chars()
            .zip(hash_hex.chars())
            .all(|(ch, nibble)| {
                if !ch.is_ascii_alphabetic() {
                    return true;
                }
                let should_be_upper = nibble.to_digit(16).unwrap_or(0) >= 8;
                ch.is_ascii_uppercase() == should_be_upper
            })
    }
}

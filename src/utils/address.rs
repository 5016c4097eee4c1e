//! 地址编解码模块
//!
//! Base58Check 地址按链参数的版本字节解析为 P2PKH 锁定脚本
//!
//! bitcoin crate 的 `Address` 只认单字节版本的 BTC 网络，
//! 这里用 bs58 处理任意长度的版本前缀，脚本交给 `ScriptBuf::new_p2pkh`。

use bitcoin::{hashes::Hash, PubkeyHash, ScriptBuf};

use crate::error::BuildError;

/// HASH160 长度
pub const PUBKEY_HASH_LEN: usize = 20;

/// P2PKH 锁定脚本长度：OP_DUP OP_HASH160 <20> OP_EQUALVERIFY OP_CHECKSIG
pub const P2PKH_SCRIPT_LEN: usize = 25;

/// 地址编解码器
pub struct AddressCodec;

impl AddressCodec {
    /// 解码 Base58Check 地址，校验版本前缀并返回公钥哈希
    ///
    /// # 参数
    /// - `address`: 待解码地址
    /// - `version`: 链参数中的地址版本字节（可以多于一个字节）
    pub fn decode_pubkey_hash(
        address: &str,
        version: &[u8],
    ) -> Result<[u8; PUBKEY_HASH_LEN], BuildError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(BuildError::encoding("empty address"));
        }

        let payload = bs58::decode(address)
            .with_check(None)
            .into_vec()
            .map_err(|e| BuildError::encoding(format!("invalid base58check address {}: {}", address, e)))?;

        if !payload.starts_with(version) {
            return Err(BuildError::encoding(format!(
                "address {} does not carry version bytes {}",
                address,
                hex::encode(version)
            )));
        }

        let body = &payload[version.len()..];
        if body.len() != PUBKEY_HASH_LEN {
            return Err(BuildError::encoding(format!(
                "address {} has {}-byte payload, expected {}",
                address,
                body.len(),
                PUBKEY_HASH_LEN
            )));
        }

        let mut hash = [0u8; PUBKEY_HASH_LEN];
        hash.copy_from_slice(body);
        Ok(hash)
    }

    /// 将公钥哈希编码为 Base58Check 地址
    pub fn encode(version: &[u8], pubkey_hash: &[u8; PUBKEY_HASH_LEN]) -> String {
        let mut payload = Vec::with_capacity(version.len() + PUBKEY_HASH_LEN);
        payload.extend_from_slice(version);
        payload.extend_from_slice(pubkey_hash);
        bs58::encode(payload).with_check().into_string()
    }

    /// 构建 P2PKH 锁定脚本
    pub fn p2pkh_script(pubkey_hash: &[u8; PUBKEY_HASH_LEN]) -> ScriptBuf {
        ScriptBuf::new_p2pkh(&PubkeyHash::from_byte_array(*pubkey_hash))
    }

    /// 地址 → 锁定脚本
    pub fn script_for(address: &str, version: &[u8]) -> Result<ScriptBuf, BuildError> {
        let hash = Self::decode_pubkey_hash(address, version)?;
        Ok(Self::p2pkh_script(&hash))
    }
}

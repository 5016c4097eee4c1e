//! 链参数模块
//!
//! 每条链的不可变网络参数：标识符、消息前缀、地址版本字节、扩展标记、时间常量

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    error::RegistryError,
    utils::{keccak256, sha256d, write_varint},
};

/// 交易内携带时间戳的链（Peercoin 系列）
pub const FLAG_TIMESTAMPED_TX: &str = "timestamped-tx";

/// 使用 EIP-191 签名消息格式
pub const FLAG_EIP191: &str = "EIP191";

/// 链参数
///
/// 构造后不可修改；字段只通过 getter 暴露。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawChainParameters")]
pub struct ChainParameters {
    identifier: String,
    message_prefix: String,
    #[serde(with = "hex")]
    address_version_bytes: Vec<u8>,
    extension_flags: Vec<String>,
    timing_constant: i64,
}

/// 反序列化中间结构，经 `ChainParameters::new` 校验
#[derive(Deserialize)]
struct RawChainParameters {
    identifier: String,
    message_prefix: String,
    #[serde(with = "hex")]
    address_version_bytes: Vec<u8>,
    #[serde(default)]
    extension_flags: Vec<String>,
    #[serde(default)]
    timing_constant: i64,
}

impl TryFrom<RawChainParameters> for ChainParameters {
    type Error = RegistryError;

    fn try_from(raw: RawChainParameters) -> Result<Self, Self::Error> {
        ChainParameters::new(
            raw.identifier,
            raw.message_prefix,
            raw.address_version_bytes,
            raw.extension_flags,
            raw.timing_constant,
        )
    }
}

impl ChainParameters {
    /// 创建链参数
    ///
    /// 扩展标记按首次出现顺序去重；标识符不能为空。
    pub fn new(
        identifier: impl Into<String>,
        message_prefix: impl Into<String>,
        address_version_bytes: impl Into<Vec<u8>>,
        extension_flags: impl IntoIterator<Item = impl Into<String>>,
        timing_constant: i64,
    ) -> Result<Self, RegistryError> {
        let identifier = identifier.into().trim().to_string();
        if identifier.is_empty() {
            return Err(RegistryError::InvalidParameters(
                "identifier must not be empty".to_string(),
            ));
        }

        // 标志不区分大小写，去重时保留第一次出现的写法
        let mut flags: Vec<String> = Vec::new();
        for flag in extension_flags {
            let flag = flag.into();
            if !flags.iter().any(|f| f.eq_ignore_ascii_case(&flag)) {
                flags.push(flag);
            }
        }

        Ok(Self {
            identifier,
            message_prefix: message_prefix.into(),
            address_version_bytes: address_version_bytes.into(),
            extension_flags: flags,
            timing_constant,
        })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn message_prefix(&self) -> &str {
        &self.message_prefix
    }

    pub fn address_version_bytes(&self) -> &[u8] {
        &self.address_version_bytes
    }

    pub fn extension_flags(&self) -> &[String] {
        &self.extension_flags
    }

    pub fn timing_constant(&self) -> i64 {
        self.timing_constant
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.extension_flags.iter().any(|f| f.eq_ignore_ascii_case(flag))
    }

    /// 交易序列化是否包含时间戳字段
    pub fn uses_timestamped_transactions(&self) -> bool {
        self.has_flag(FLAG_TIMESTAMPED_TX)
    }

    /// 计算签名消息摘要
    ///
    /// - EIP-191 链: `keccak256(0x19 ‖ prefix ‖ ":\n" ‖ len ‖ message)`
    /// - 其他链: `sha256d(varint(|prefix|) ‖ prefix ‖ varint(|message|) ‖ message)`
    pub fn message_digest(&self, message: &[u8]) -> [u8; 32] {
        if self.has_flag(FLAG_EIP191) {
            let mut data = Vec::with_capacity(message.len() + self.message_prefix.len() + 24);
            data.push(0x19);
            data.extend_from_slice(self.message_prefix.as_bytes());
            data.extend_from_slice(b":\n");
            data.extend_from_slice(message.len().to_string().as_bytes());
            data.extend_from_slice(message);
            return keccak256(&data);
        }

        let prefix = self.message_prefix.as_bytes();
        let mut data = Vec::with_capacity(message.len() + prefix.len() + 18);
        write_varint(&mut data, prefix.len() as u64);
        data.extend_from_slice(prefix);
        write_varint(&mut data, message.len() as u64);
        data.extend_from_slice(message);
        sha256d(&data)
    }
}

impl fmt::Display for ChainParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ChainParameters{{identifier={}, message_prefix={:?}, address_version_bytes={}, extension_flags={:?}, timing_constant={}}}",
            self.identifier,
            self.message_prefix,
            hex::encode(&self.address_version_bytes),
            self.extension_flags,
            self.timing_constant
        )
    }
}

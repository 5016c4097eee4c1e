//! 链参数注册表
//!
//! 启动时一次性填充（内置表 + 配置扩展），之后只读。全局实例通过
//! `OnceCell` 冻结，冻结后只能拿到 `&'static` 引用，读取无需加锁。

use std::{collections::HashMap, sync::Arc};

use once_cell::sync::OnceCell;

use super::chain_params::{ChainParameters, FLAG_EIP191, FLAG_TIMESTAMPED_TX};
use crate::error::RegistryError;

/// BIP32 xpub 版本字节（Ethereum 系列的 XPUB version）
const XPUB_VERSION: [u8; 4] = [0x04, 0x88, 0xb2, 0x1e];

/// 链参数注册表
#[derive(Debug, Default, Clone)]
pub struct ParameterRegistry {
    entries: HashMap<String, Arc<ChainParameters>>,
    order: Vec<String>,
}

impl ParameterRegistry {
    /// 空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置所有内置链的注册表
    pub fn with_builtin_chains() -> Self {
        let mut registry = Self::new();
        for params in builtin_chains() {
            // 内置表标识符唯一，重复时保留第一条并记录
            if let Err(e) = registry.register(params) {
                tracing::error!(error = %e, "builtin chain table contains a duplicate");
            }
        }
        registry
    }

    fn key(identifier: &str) -> String {
        identifier.trim().to_lowercase()
    }

    /// 注册链参数
    ///
    /// 标识符（忽略大小写）已存在时返回 `DuplicateIdentifier`，注册表保持不变。
    pub fn register(&mut self, params: ChainParameters) -> Result<(), RegistryError> {
        let key = Self::key(params.identifier());
        if self.entries.contains_key(&key) {
            return Err(RegistryError::DuplicateIdentifier(
                params.identifier().to_string(),
            ));
        }

        tracing::debug!(chain = %params.identifier(), "chain parameters registered");
        self.order.push(key.clone());
        self.entries.insert(key, Arc::new(params));
        Ok(())
    }

    /// 查找链参数，未知链返回 `None`
    pub fn get(&self, identifier: &str) -> Option<Arc<ChainParameters>> {
        self.entries.get(&Self::key(identifier)).cloned()
    }

    /// 解析链参数，未知链返回 `UnknownChain`
    pub fn resolve(&self, identifier: &str) -> Result<Arc<ChainParameters>, RegistryError> {
        self.get(identifier)
            .ok_or_else(|| RegistryError::UnknownChain(identifier.to_string()))
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains_key(&Self::key(identifier))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按注册顺序列出所有链
    pub fn list(&self) -> Vec<Arc<ChainParameters>> {
        self.order
            .iter()
            .filter_map(|key| self.entries.get(key).cloned())
            .collect()
    }

    /// 验证所有链参数的完整性，返回发现的全部问题
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for params in self.list() {
            if params.address_version_bytes().is_empty() {
                errors.push(format!(
                    "Chain {} has empty address_version_bytes",
                    params.identifier()
                ));
            }
            if params.message_prefix().is_empty() {
                errors.push(format!("Chain {} has empty message_prefix", params.identifier()));
            }
            if params.uses_timestamped_transactions() && params.timing_constant() < 0 {
                errors.push(format!(
                    "Chain {} has negative timing_constant: {}",
                    params.identifier(),
                    params.timing_constant()
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// 内置链表（每个支持的链变体一条）
pub fn builtin_chains() -> Vec<ChainParameters> {
    let table: Vec<(&str, &str, Vec<u8>, Vec<&str>, i64)> = vec![
        // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
        // Bitcoin 系列 (UTXO)
        // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
        ("btc-main", "Bitcoin Signed Message:\n", vec![0x00], vec![], 0),
        ("btc-test", "Bitcoin Signed Message:\n", vec![0x6f], vec![], 0),
        ("ltc-main", "Litecoin Signed Message:\n", vec![0x30], vec![], 0),
        ("doge-main", "Dogecoin Signed Message:\n", vec![0x1e], vec![], 0),
        ("dash-main", "DarkCoin Signed Message:\n", vec![0x4c], vec![], 0),
        // Peercoin 交易带时间戳
        (
            "ppc-main",
            "PPCoin Signed Message:\n",
            vec![0x37],
            vec![FLAG_TIMESTAMPED_TX],
            0,
        ),
        // Zcash 透明地址使用两字节版本
        (
            "zec-main",
            "Zcash Signed Message:\n",
            vec![0x1c, 0xb8],
            vec!["BIP143"],
            0,
        ),
        // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
        // Ethereum 系列
        // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
        (
            "eth-main",
            "Ethereum Signed Message",
            XPUB_VERSION.to_vec(),
            vec!["EIP155", FLAG_EIP191],
            0,
        ),
        (
            "etc-main",
            "Ethereum Signed Message",
            XPUB_VERSION.to_vec(),
            vec!["EIP155", FLAG_EIP191],
            0,
        ),
    ];

    table
        .into_iter()
        .filter_map(|(id, prefix, version, flags, timing)| {
            match ChainParameters::new(id, prefix, version, flags, timing) {
                Ok(params) => Some(params),
                Err(e) => {
                    tracing::error!(chain = id, error = %e, "invalid builtin chain parameters");
                    None
                }
            }
        })
        .collect()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 进程级注册表
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

static GLOBAL_REGISTRY: OnceCell<ParameterRegistry> = OnceCell::new();

/// 初始化进程级注册表：内置表 + 额外链参数
///
/// 只能成功一次；全局注册表一旦被读取或初始化，再次调用返回 `AlreadyInitialized`。
pub fn initialize(
    extra: impl IntoIterator<Item = ChainParameters>,
) -> Result<&'static ParameterRegistry, RegistryError> {
    if GLOBAL_REGISTRY.get().is_some() {
        return Err(RegistryError::AlreadyInitialized);
    }

    let mut registry = ParameterRegistry::with_builtin_chains();
    for params in extra {
        registry.register(params)?;
    }
    let count = registry.len();

    GLOBAL_REGISTRY
        .set(registry)
        .map_err(|_| RegistryError::AlreadyInitialized)?;
    tracing::info!(chains = count, "parameter registry initialized");

    GLOBAL_REGISTRY.get().ok_or(RegistryError::AlreadyInitialized)
}

/// 全局注册表；未显式初始化时安装内置表
pub fn global() -> &'static ParameterRegistry {
    GLOBAL_REGISTRY.get_or_init(ParameterRegistry::with_builtin_chains)
}

/// 在全局注册表中解析链参数
pub fn resolve(identifier: &str) -> Result<Arc<ChainParameters>, RegistryError> {
    global().resolve(identifier)
}

//! 构建请求
//!
//! 每次构建一个请求，由构建任务独占持有；账户快照通过 `Arc` 共享且只读

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{account::AccountState, chain_params::ChainParameters, registry};
use crate::{
    error::RegistryError,
    service::{coin_selection::SelectionPolicy, fee_policy::FeePolicy},
};

/// 支付输出
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOutput {
    pub address: String,
    pub amount: u64,
}

impl PaymentOutput {
    pub fn new(address: impl Into<String>, amount: u64) -> Self {
        Self {
            address: address.into(),
            amount,
        }
    }
}

/// 交易构建请求
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub request_id: Uuid,
    pub account: Arc<AccountState>,
    pub outputs: Vec<PaymentOutput>,
    pub fee_policy: FeePolicy,
    pub chain: Arc<ChainParameters>,
    pub selection: SelectionPolicy,
    pub lock_time: u32,
    /// 请求创建时间（Unix 秒），时间戳链用来计算交易时间
    pub timestamp: u32,
}

impl BuildRequest {
    pub fn new(
        account: Arc<AccountState>,
        outputs: Vec<PaymentOutput>,
        fee_policy: FeePolicy,
        chain: Arc<ChainParameters>,
    ) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            account,
            outputs,
            fee_policy,
            chain,
            selection: SelectionPolicy::default(),
            lock_time: 0,
            timestamp: u32::try_from(Utc::now().timestamp()).unwrap_or(u32::MAX),
        }
    }

    /// 按标识符从全局注册表解析链参数
    pub fn for_chain(
        chain_id: &str,
        account: Arc<AccountState>,
        outputs: Vec<PaymentOutput>,
        fee_policy: FeePolicy,
    ) -> Result<Self, RegistryError> {
        let chain = registry::resolve(chain_id)?;
        Ok(Self::new(account, outputs, fee_policy, chain))
    }

    pub fn with_selection(mut self, selection: SelectionPolicy) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_lock_time(mut self, lock_time: u32) -> Self {
        self.lock_time = lock_time;
        self
    }

    pub fn with_timestamp(mut self, timestamp: u32) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = request_id;
        self
    }
}

/// 构建请求的外部描述（JSON 文件 / 边界层）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildRequestSpec {
    pub chain: String,
    pub account: AccountState,
    pub outputs: Vec<PaymentOutput>,
    pub fee_policy: FeePolicy,
    #[serde(default)]
    pub selection: SelectionPolicy,
    #[serde(default)]
    pub lock_time: u32,
    #[serde(default)]
    pub timestamp: Option<u32>,
}

impl BuildRequestSpec {
    /// 在给定注册表中解析链并生成请求
    pub fn into_request(
        self,
        registry: &registry::ParameterRegistry,
    ) -> Result<BuildRequest, RegistryError> {
        let chain = registry.resolve(&self.chain)?;
        let mut request = BuildRequest::new(
            Arc::new(self.account),
            self.outputs,
            self.fee_policy,
            chain,
        )
        .with_selection(self.selection)
        .with_lock_time(self.lock_time);
        if let Some(ts) = self.timestamp {
            request = request.with_timestamp(ts);
        }
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_into_request_resolves_chain() {
        let spec: BuildRequestSpec = serde_json::from_value(serde_json::json!({
            "chain": "btc-main",
            "account": { "utxos": [], "change_address": "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa" },
            "outputs": [{ "address": "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa", "amount": 1000 }],
            "fee_policy": { "type": "fixed", "amount": 100 },
            "lock_time": 7,
            "timestamp": 1700000000
        }))
        .unwrap();

        let registry = registry::ParameterRegistry::with_builtin_chains();
        let request = spec.into_request(&registry).unwrap();
        assert_eq!(request.chain.identifier(), "btc-main");
        assert_eq!(request.lock_time, 7);
        assert_eq!(request.timestamp, 1_700_000_000);
        assert_eq!(request.selection, SelectionPolicy::LargestFirst);
    }

    #[test]
    fn test_spec_with_unknown_chain() {
        let spec = BuildRequestSpec {
            chain: "unknown-chain".to_string(),
            account: AccountState::new(vec![], "x"),
            outputs: vec![],
            fee_policy: FeePolicy::Fixed { amount: 1 },
            selection: SelectionPolicy::default(),
            lock_time: 0,
            timestamp: None,
        };
        let err = spec
            .into_request(&registry::ParameterRegistry::new())
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownChain(_)));
    }
}

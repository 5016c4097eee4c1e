//! txcore - 链参数注册表与异步交易构建
//!
//! 只构建未签名交易：签名、广播与节点通信由外部组件负责

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod metrics;
pub mod service;
pub mod utils;

// 重新导出常用类型
pub use error::{BuildError, BuildErrorCode, RegistryError};

// 统一模块导出
pub mod prelude {
    pub use crate::{
        config::Config,
        domain::{
            registry, AccountState, BuildRequest, BuildRequestSpec, BuiltTransaction,
            ChainParameters, OutPoint, ParameterRegistry, PaymentOutput, TaskState, Utxo,
        },
        error::{BuildError, BuildErrorCode, RegistryError},
        service::{
            AsyncTaskRunner, BuildEngine, FeePolicy, PendingTaskHandle, ResultCallback, SelectionPolicy,
            TransactionBuilder, TransactionCallback, TransactionResult,
        },
    };
}

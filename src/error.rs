//! 错误类型定义
//!
//! 注册表错误同步返回给调用方；构建错误只通过终态回调投递

use serde::Serialize;

/// 链参数注册表错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// 标识符已注册
    #[error("duplicate chain identifier: {0}")]
    DuplicateIdentifier(String),
    /// 未知链
    #[error("unknown chain: {0}")]
    UnknownChain(String),
    /// 参数本身不合法（例如空标识符）
    #[error("invalid chain parameters: {0}")]
    InvalidParameters(String),
    /// 全局注册表已经初始化，不再接受写入
    #[error("parameter registry already initialized")]
    AlreadyInitialized,
}

/// 交易构建错误
///
/// 由构建任务捕获后放入 `TransactionResult` 的错误分支，永远不会跨越异步边界抛出。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// 请求本身不合法（空输出、零金额、金额溢出）
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// 可用 UTXO 不足以覆盖输出与手续费
    #[error("insufficient funds: needed {needed}, available {available}")]
    InsufficientFunds { needed: u64, available: u64 },
    /// 地址或脚本编码失败
    #[error("encoding error: {0}")]
    EncodingError(String),
    /// 任务被取消
    #[error("build task cancelled")]
    Cancelled,
    /// 构建过程中出现未预期的故障（panic 等）
    #[error("internal build failure: {0}")]
    Internal(String),
}

/// 稳定的错误码，供边界层序列化
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildErrorCode {
    InvalidRequest,
    InsufficientFunds,
    EncodingError,
    Cancelled,
    Internal,
}

impl BuildErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildErrorCode::InvalidRequest => "invalid_request",
            BuildErrorCode::InsufficientFunds => "insufficient_funds",
            BuildErrorCode::EncodingError => "encoding_error",
            BuildErrorCode::Cancelled => "cancelled",
            BuildErrorCode::Internal => "internal",
        }
    }
}

impl BuildError {
    pub fn code(&self) -> BuildErrorCode {
        match self {
            BuildError::InvalidRequest(_) => BuildErrorCode::InvalidRequest,
            BuildError::InsufficientFunds { .. } => BuildErrorCode::InsufficientFunds,
            BuildError::EncodingError(_) => BuildErrorCode::EncodingError,
            BuildError::Cancelled => BuildErrorCode::Cancelled,
            BuildError::Internal(_) => BuildErrorCode::Internal,
        }
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        BuildError::InvalidRequest(msg.into())
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        BuildError::EncodingError(msg.into())
    }

    /// 边界层使用的错误体
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code().as_str(),
            message: self.to_string(),
        }
    }
}

/// 错误响应体
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

//! Domain 模块
//!
//! 链参数、账户快照、构建请求与交易模型

pub mod account;
pub mod build_request;
pub mod chain_params;
pub mod registry;
pub mod task_state;
pub mod transaction;

// Re-exports
pub use account::{AccountState, OutPoint, Utxo};
pub use build_request::{BuildRequest, BuildRequestSpec, PaymentOutput};
pub use chain_params::ChainParameters;
pub use registry::ParameterRegistry;
pub use task_state::TaskState;
pub use transaction::{BuiltOutput, BuiltTransaction, SelectedInput, UnsignedTransaction};

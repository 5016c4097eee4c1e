pub mod callback; // 结果回调契约与适配器
pub mod coin_selection;
pub mod fee_policy;
pub mod task_runner; // 异步执行器：有界并发、取消、恰好一次回调
pub mod transaction_builder;

pub use callback::{oneshot_callback, split_outcome, two_slot, ResultCallback, TransactionCallback};
pub use coin_selection::SelectionPolicy;
pub use fee_policy::FeePolicy;
pub use task_runner::{AsyncTaskRunner, PendingTaskHandle};
pub use transaction_builder::{BuildEngine, TransactionBuilder, TransactionResult};

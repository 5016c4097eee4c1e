//! 构建结果回调
//!
//! `ResultCallback` 以 `self: Box<Self>` 消费自身，类型层面保证最多调用一次；
//! 执行器保证每个任务恰好调用一次。
//!
//! 边界层习惯"两个可空槽位"的形式，由 [`two_slot`] 适配，任何时候只会填其中一个。

use std::sync::Arc;

use tokio::sync::oneshot;

use super::transaction_builder::TransactionResult;
use crate::{domain::BuiltTransaction, error::BuildError};

/// 构建结果回调
///
/// 在运行时工作线程上调用，不会在 `submit` 的调用栈内同步触发。
pub trait ResultCallback: Send + 'static {
    fn on_result(self: Box<Self>, result: &TransactionResult);
}

impl<F> ResultCallback for F
where
    F: FnOnce(&TransactionResult) + Send + 'static,
{
    fn on_result(self: Box<Self>, result: &TransactionResult) {
        (*self)(result)
    }
}

/// 双槽位回调：交易与错误恰好一个为 `Some`
pub trait TransactionCallback: Send + Sync {
    fn on_callback(&self, transaction: Option<&BuiltTransaction>, error: Option<&BuildError>);
}

/// 把结果拆成两个互斥槽位
pub fn split_outcome(
    result: &TransactionResult,
) -> (Option<&BuiltTransaction>, Option<&BuildError>) {
    match result {
        Ok(tx) => (Some(tx), None),
        Err(err) => (None, Some(err)),
    }
}

/// 把双槽位回调适配为 `ResultCallback`
pub fn two_slot(
    callback: Arc<dyn TransactionCallback>,
) -> impl FnOnce(&TransactionResult) + Send + 'static {
    move |result: &TransactionResult| {
        let (transaction, error) = split_outcome(result);
        callback.on_callback(transaction, error);
    }
}

/// 结果转发到 oneshot 通道，便于在 async 代码中等待
pub fn oneshot_callback() -> (
    impl FnOnce(&TransactionResult) + Send + 'static,
    oneshot::Receiver<TransactionResult>,
) {
    let (tx, rx) = oneshot::channel();
    let callback = move |result: &TransactionResult| {
        // 接收端已丢弃时结果无人关心
        let _ = tx.send(result.clone());
    };
    (callback, rx)
}

//! 异步构建执行器
//!
//! 提交立即返回 [`PendingTaskHandle`]，构建在阻塞线程池上执行，
//! 结果通过 [`ResultCallback`] 投递。
//!
//! # 保证
//! - 每个提交的任务恰好收到一次回调（包括被取消的任务，收到 `BuildError::Cancelled`）
//! - `cancel` 被接受后不会再投递成功结果
//! - 同时执行的构建数不超过 `max_concurrent_builds`
//! - 回调在运行时工作线程上执行，不会在 `submit` 调用栈内触发
//! - 构建中的 panic 在任务边界捕获，以 `BuildError::Internal` 投递
//!
//! 运行时本身已关闭时任务无法调度：回调以 `BuildError::Cancelled`
//! 在丢弃任务的线程上同步投递（通常就是 `submit` 的调用方）。
//!
//! 任务按执行器分配的 `task_id` 跟踪，同一请求可重复提交。任务之间没有顺序保证。

use std::{
    any::Any,
    collections::HashMap,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard,
    },
    time::Instant,
};

use chrono::{DateTime, Utc};
use tokio::{
    runtime::Handle,
    sync::{watch, Semaphore},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{
    callback::ResultCallback,
    transaction_builder::{BuildEngine, TransactionBuilder, TransactionResult},
};
use crate::{
    config::{Config, RunnerConfig},
    domain::{build_request::BuildRequest, task_state::TaskState},
    error::BuildError,
    metrics,
};

/// 任务状态快照，经 watch 通道发布
#[derive(Debug, Clone)]
struct TaskSnapshot {
    state: TaskState,
    cancel_requested: bool,
    /// 结果已定（此后取消请求一律拒绝）
    settled: bool,
    outcome: Option<TransactionResult>,
}

/// 执行器与句柄共享的任务记录
struct TaskShared {
    /// 执行器分配的任务 ID；同一请求可以被多次提交
    task_id: Uuid,
    request_id: Uuid,
    chain: String,
    submitted_at: DateTime<Utc>,
    token: CancellationToken,
    status: watch::Sender<TaskSnapshot>,
}

impl TaskShared {
    fn new(request: &BuildRequest) -> Self {
        let (status, _) = watch::channel(TaskSnapshot {
            state: TaskState::Scheduled,
            cancel_requested: false,
            settled: false,
            outcome: None,
        });
        Self {
            task_id: Uuid::new_v4(),
            request_id: request.request_id,
            chain: request.chain.identifier().to_string(),
            submitted_at: Utc::now(),
            token: CancellationToken::new(),
            status,
        }
    }

    /// 只有第一次且结果未定时接受
    fn request_cancel(&self) -> bool {
        let accepted = self.status.send_if_modified(|s| {
            if s.settled || s.cancel_requested || s.state.is_terminal() {
                return false;
            }
            s.cancel_requested = true;
            true
        });
        if accepted {
            self.token.cancel();
        }
        accepted
    }

    fn transition(&self, target: TaskState) {
        self.status.send_if_modified(|s| {
            if !s.state.can_transition_to(&target) {
                tracing::warn!(
                    request_id = %self.request_id,
                    from = %s.state,
                    to = %target,
                    "illegal task state transition ignored"
                );
                return false;
            }
            s.state = target;
            true
        });
    }

    /// 进入终态并发布结果，二者对等待方同时可见
    fn finish(&self, target: TaskState, outcome: TransactionResult) {
        self.status.send_modify(|s| {
            if !s.state.can_transition_to(&target) {
                tracing::warn!(
                    request_id = %self.request_id,
                    from = %s.state,
                    to = %target,
                    "unexpected terminal transition"
                );
            }
            s.state = target;
            s.outcome = Some(outcome);
        });
    }
}

/// 已提交任务的句柄
///
/// 可克隆，可跨线程传递；只用于查询状态与取消，结果仍经回调投递。
#[derive(Clone)]
pub struct PendingTaskHandle {
    shared: Arc<TaskShared>,
}

impl PendingTaskHandle {
    pub fn task_id(&self) -> Uuid {
        self.shared.task_id
    }

    pub fn request_id(&self) -> Uuid {
        self.shared.request_id
    }

    pub fn chain(&self) -> &str {
        &self.shared.chain
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.shared.submitted_at
    }

    pub fn state(&self) -> TaskState {
        self.shared.status.borrow().state
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.shared.status.borrow().cancel_requested
    }

    /// 终态后的结果；未到终态返回 `None`
    pub fn outcome(&self) -> Option<TransactionResult> {
        self.shared.status.borrow().outcome.clone()
    }

    /// 请求取消
    ///
    /// 返回 true 表示取消被接受：任务随后会收到 `BuildError::Cancelled`。
    /// 重复取消或结果已定时返回 false。
    pub fn cancel(&self) -> bool {
        self.shared.request_cancel()
    }

    /// 等待任务进入终态并返回结果
    ///
    /// 返回时回调已经执行完毕。
    pub async fn wait(&self) -> TransactionResult {
        let mut rx = self.shared.status.subscribe();
        let outcome = match rx.wait_for(|s| s.state.is_terminal()).await {
            Ok(snapshot) => snapshot.outcome.clone().unwrap_or_else(|| {
                Err(BuildError::Internal(
                    "task reached terminal state without outcome".to_string(),
                ))
            }),
            Err(_) => Err(BuildError::Internal(
                "task status channel closed".to_string(),
            )),
        };
        outcome
    }
}

impl std::fmt::Debug for PendingTaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingTaskHandle")
            .field("task_id", &self.shared.task_id)
            .field("request_id", &self.shared.request_id)
            .field("chain", &self.shared.chain)
            .field("state", &self.state())
            .finish()
    }
}

struct RunnerInner {
    handle: Handle,
    engine: Arc<dyn BuildEngine>,
    permits: Arc<Semaphore>,
    max_concurrent_builds: usize,
    tasks: Mutex<HashMap<Uuid, Arc<TaskShared>>>,
    closed: AtomicBool,
}

impl RunnerInner {
    fn tasks(&self) -> MutexGuard<'_, HashMap<Uuid, Arc<TaskShared>>> {
        match self.tasks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// 异步构建执行器
#[derive(Clone)]
pub struct AsyncTaskRunner {
    inner: Arc<RunnerInner>,
}

impl AsyncTaskRunner {
    /// 在指定运行时上创建执行器
    ///
    /// `engine` 通常是 [`TransactionBuilder`]。
    pub fn new<E: BuildEngine>(handle: Handle, config: &RunnerConfig, engine: E) -> Self {
        let max_concurrent_builds = config.max_concurrent_builds.max(1);
        tracing::info!(max_concurrent_builds, "async task runner created");
        Self {
            inner: Arc::new(RunnerInner {
                handle,
                engine: Arc::new(engine),
                permits: Arc::new(Semaphore::new(max_concurrent_builds)),
                max_concurrent_builds,
                tasks: Mutex::new(HashMap::new()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// 在当前运行时上按配置创建执行器
    ///
    /// 必须在 tokio 运行时内调用。
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Handle::current(),
            &config.runner,
            TransactionBuilder::new(config.builder.clone()),
        )
    }

    pub fn max_concurrent_builds(&self) -> usize {
        self.inner.max_concurrent_builds
    }

    /// 尚未到达终态的任务数
    pub fn in_flight(&self) -> usize {
        self.inner.tasks().len()
    }

    /// 提交构建任务，立即返回
    pub fn submit<C>(&self, request: BuildRequest, callback: C) -> PendingTaskHandle
    where
        C: ResultCallback,
    {
        self.submit_boxed(request, Box::new(callback))
    }

    pub fn submit_boxed(
        &self,
        request: BuildRequest,
        callback: Box<dyn ResultCallback>,
    ) -> PendingTaskHandle {
        let shared = Arc::new(TaskShared::new(&request));
        self.inner
            .tasks()
            .insert(shared.task_id, Arc::clone(&shared));

        // 关闭后提交的任务直接以取消结束，回调照常投递
        if self.inner.closed.load(Ordering::SeqCst) {
            shared.request_cancel();
        }

        metrics::count_submitted();
        tracing::debug!(
            task_id = %shared.task_id,
            request_id = %shared.request_id,
            chain = %shared.chain,
            outputs = request.outputs.len(),
            "build task submitted"
        );

        // 运行时已关闭时任务在 spawn 内被丢弃，由 Delivery 的 Drop 投递取消结果
        let delivery = Delivery {
            inner: Arc::clone(&self.inner),
            shared: Arc::clone(&shared),
            callback: Some(callback),
            started: Instant::now(),
        };
        self.inner.handle.spawn(run_task(delivery, request));

        PendingTaskHandle { shared }
    }

    /// 提交并等待结果
    pub async fn submit_and_wait(&self, request: BuildRequest) -> TransactionResult {
        let handle = self.submit(request, |_: &TransactionResult| {});
        handle.wait().await
    }

    /// 取消任务，语义同 [`PendingTaskHandle::cancel`]
    pub fn cancel(&self, handle: &PendingTaskHandle) -> bool {
        let accepted = handle.cancel();
        tracing::debug!(request_id = %handle.request_id(), accepted, "cancel requested");
        accepted
    }

    /// 停止接收新构建并取消所有未完成任务
    ///
    /// 返回被取消的任务数。每个被取消的任务仍会收到一次回调。
    pub fn shutdown(&self) -> usize {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.permits.close();

        let pending: Vec<Arc<TaskShared>> = self.inner.tasks().values().cloned().collect();
        let cancelled = pending.iter().filter(|t| t.request_cancel()).count();
        tracing::info!(cancelled, "async task runner shut down");
        cancelled
    }
}

/// 任务结果投递
///
/// 持有回调直到结果投递完成。任务在投递前被丢弃（运行时关闭）时，
/// `Drop` 以 `BuildError::Cancelled` 补投，保证恰好一次回调。
struct Delivery {
    inner: Arc<RunnerInner>,
    shared: Arc<TaskShared>,
    callback: Option<Box<dyn ResultCallback>>,
    started: Instant,
}

impl Delivery {
    fn complete(&mut self, result: TransactionResult) {
        let Some(callback) = self.callback.take() else {
            return;
        };
        let shared = &self.shared;

        // 先定结果：已接受的取消覆盖任何结果
        let mut outcome = result;
        shared.status.send_if_modified(|s| {
            if s.cancel_requested {
                outcome = Err(BuildError::Cancelled);
            }
            s.settled = true;
            false
        });

        let delivered = catch_unwind(AssertUnwindSafe(|| callback.on_result(&outcome)));
        if let Err(payload) = delivered {
            tracing::error!(
                task_id = %shared.task_id,
                request_id = %shared.request_id,
                panic = %panic_message(payload),
                "result callback panicked"
            );
        }

        let terminal = match outcome {
            Err(BuildError::Cancelled) => TaskState::Cancelled,
            _ => TaskState::Completed,
        };
        self.inner.tasks().remove(&shared.task_id);
        shared.finish(terminal, outcome.clone());

        let elapsed = self.started.elapsed();
        metrics::record_outcome(&outcome, elapsed);
        match &outcome {
            Ok(tx) => tracing::info!(
                task_id = %shared.task_id,
                request_id = %shared.request_id,
                chain = %shared.chain,
                fee = tx.fee,
                hash = %tx.unsigned_hash,
                elapsed_ms = elapsed.as_millis() as u64,
                "build task completed"
            ),
            Err(e) => tracing::info!(
                task_id = %shared.task_id,
                request_id = %shared.request_id,
                chain = %shared.chain,
                code = e.code().as_str(),
                error = %e,
                elapsed_ms = elapsed.as_millis() as u64,
                "build task finished with error"
            ),
        }
    }
}

impl Drop for Delivery {
    fn drop(&mut self) {
        if self.callback.is_some() {
            tracing::warn!(
                task_id = %self.shared.task_id,
                request_id = %self.shared.request_id,
                "build task dropped before delivery, runtime shut down"
            );
            self.complete(Err(BuildError::Cancelled));
        }
    }
}

async fn run_task(mut delivery: Delivery, request: BuildRequest) {
    let inner = Arc::clone(&delivery.inner);
    let shared = Arc::clone(&delivery.shared);

    let permit = tokio::select! {
        biased;
        _ = shared.token.cancelled() => None,
        permit = Arc::clone(&inner.permits).acquire_owned() => permit.ok(),
    };

    let result = match permit {
        Some(permit) if !shared.token.is_cancelled() => {
            shared.transition(TaskState::Running);
            let engine = Arc::clone(&inner.engine);
            let token = shared.token.clone();
            let joined = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                engine.build_cancellable(&request, &token)
            })
            .await;

            match joined {
                Ok(result) => result,
                Err(e) => {
                    let message = if e.is_panic() {
                        panic_message(e.into_panic())
                    } else {
                        e.to_string()
                    };
                    tracing::error!(
                        task_id = %shared.task_id,
                        request_id = %shared.request_id,
                        error = %message,
                        "build task failed"
                    );
                    Err(BuildError::Internal(message))
                }
            }
        }
        _ => Err(BuildError::Cancelled),
    };

    delivery.complete(result);
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

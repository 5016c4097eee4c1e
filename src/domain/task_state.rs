//! 构建任务状态
//! 状态机：Scheduled → Running → {Completed | Cancelled}，Scheduled → Cancelled

use std::fmt;

use serde::{Deserialize, Serialize};

/// 构建任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// 已提交，等待工作线程
    Scheduled,

    /// 构建中
    Running,

    /// 已完成，回调已投递（成功或失败）
    Completed,

    /// 已取消，回调已投递 `Cancelled` 错误
    Cancelled,
}

impl TaskState {
    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// 验证状态转换合法性
    pub fn can_transition_to(&self, target: &Self) -> bool {
        use TaskState::*;

        match (self, target) {
            (Scheduled, Running) | (Scheduled, Cancelled) => true,
            (Running, Completed) | (Running, Cancelled) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! 决策层错误类型定义

use sumo_tools::TuningError;
use thiserror::Error;

/// 决策层错误类型
///
/// 状态机内部没有可恢复的错误：传感器数据在上游构造时就保证结构有效。
/// 这里只覆盖构造期的配置错误；通道关闭通过 [`crate::StopReason::FeedClosed`]
/// 报告，不是错误。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LogicError {
    /// 调参配置无效
    #[error("Invalid tuning: {0}")]
    InvalidTuning(#[from] TuningError),
}

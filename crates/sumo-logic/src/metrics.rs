//! 运行指标
//!
//! 原子计数器，引擎线程写入，任何线程都可以读取快照。

use std::sync::atomic::{AtomicU64, Ordering};

/// 运行实时指标
///
/// # 使用示例
///
/// ```rust
/// use sumo_logic::RunMetrics;
/// use std::sync::Arc;
/// use std::sync::atomic::Ordering;
///
/// let metrics = Arc::new(RunMetrics::default());
/// metrics.snapshots_total.fetch_add(1, Ordering::Relaxed);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.snapshots_total, 1);
/// ```
#[derive(Debug, Default)]
pub struct RunMetrics {
    /// 处理的传感器快照数
    pub snapshots_total: AtomicU64,

    /// 处理的按键事件数（含被忽略的）
    pub keys_total: AtomicU64,

    /// 输出的命令数
    pub commands_total: AtomicU64,

    /// 阶段切换次数（含子阶段切换）
    pub handoffs_total: AtomicU64,

    /// 边界触发次数（进入 BackingOff）
    pub border_triggers: AtomicU64,

    /// 单周期切换次数超限（配置退化）
    pub handoff_overflows: AtomicU64,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取所有计数器
    pub fn snapshot(&self) -> RunMetricsSnapshot {
        RunMetricsSnapshot {
            snapshots_total: self.snapshots_total.load(Ordering::Relaxed),
            keys_total: self.keys_total.load(Ordering::Relaxed),
            commands_total: self.commands_total.load(Ordering::Relaxed),
            handoffs_total: self.handoffs_total.load(Ordering::Relaxed),
            border_triggers: self.border_triggers.load(Ordering::Relaxed),
            handoff_overflows: self.handoff_overflows.load(Ordering::Relaxed),
        }
    }

    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunMetricsSnapshot {
    pub snapshots_total: u64,
    pub keys_total: u64,
    pub commands_total: u64,
    pub handoffs_total: u64,
    pub border_triggers: u64,
    pub handoff_overflows: u64,
}

impl RunMetricsSnapshot {
    /// 每个快照平均的阶段切换次数
    pub fn handoffs_per_snapshot(&self) -> f64 {
        if self.snapshots_total == 0 {
            return 0.0;
        }
        self.handoffs_total as f64 / self.snapshots_total as f64
    }
}

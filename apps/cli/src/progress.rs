//! 运行进度报告
//!
//! 后台线程按固定间隔读取引擎指标并打印一行进度，终止信号触发后立即退出。

use std::sync::Arc;
use std::thread;
use std::time::Duration;
use sumo_logic::{AbortSignal, RunMetrics};
use tracing::info;

/// 默认报告间隔
pub const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// 启动进度报告线程，返回打印的报告次数
pub fn spawn_progress(
    metrics: Arc<RunMetrics>,
    abort: AbortSignal,
    interval: Duration,
) -> thread::JoinHandle<u64> {
    thread::spawn(move || {
        let mut reports = 0;
        while abort.wait_timeout(interval).is_none() {
            let m = metrics.snapshot();
            info!(
                "Progress: {} snapshots, {} commands, {} hand-offs, {} border triggers",
                m.snapshots_total, m.commands_total, m.handoffs_total, m.border_triggers
            );
            reports += 1;
        }
        reports
    })
}

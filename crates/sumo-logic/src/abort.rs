//! 运行终止信号
//!
//! 一次运行只允许终止一次：第一个 `raise` 记录原因并唤醒所有等待者，
//! 之后的 `raise` 都是空操作。外部控制器（CLI 主线程、仿真传感器源）
//! 通过它得知何时关闭传感器/执行器并退出。

use crossbeam_channel::{Receiver, Sender, bounded};
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// 运行终止原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// 操作员按下 Quit/Back
    UserAbort,
    /// 比赛时长用尽
    MatchOver,
    /// 传感器源关闭
    FeedClosed,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::UserAbort => "user abort",
            StopReason::MatchOver => "match over",
            StopReason::FeedClosed => "feed closed",
        };
        f.write_str(s)
    }
}

struct AbortInner {
    reason: OnceLock<StopReason>,
    // 容量为 1：唯一的一条消息只用于唤醒，接收端关闭前永不被取走
    notify_tx: Sender<StopReason>,
    notify_rx: Receiver<StopReason>,
}

/// 一次性终止信号
///
/// 可自由克隆，所有克隆共享同一状态。
#[derive(Clone)]
pub struct AbortSignal {
    inner: Arc<AbortInner>,
}

impl AbortSignal {
    pub fn new() -> Self {
        let (notify_tx, notify_rx) = bounded(1);
        Self {
            inner: Arc::new(AbortInner {
                reason: OnceLock::new(),
                notify_tx,
                notify_rx,
            }),
        }
    }

    /// 触发终止
    ///
    /// 只有第一次调用生效并返回 `true`。
    pub fn raise(&self, reason: StopReason) -> bool {
        if self.inner.reason.set(reason).is_err() {
            return false;
        }
        let _ = self.inner.notify_tx.try_send(reason);
        true
    }

    #[inline]
    pub fn is_raised(&self) -> bool {
        self.inner.reason.get().is_some()
    }

    /// 终止原因（尚未终止时为 `None`）
    pub fn reason(&self) -> Option<StopReason> {
        self.inner.reason.get().copied()
    }

    /// 阻塞等待终止
    pub fn wait(&self) -> StopReason {
        loop {
            if let Some(reason) = self.reason() {
                return reason;
            }
            // 发送端由自身持有，recv 不会因断开而返回错误；
            // 收到的消息放回去，保证其他等待者也能被唤醒
            if let Ok(reason) = self.inner.notify_rx.recv() {
                let _ = self.inner.notify_tx.try_send(reason);
            }
        }
    }

    /// 带超时的等待，超时返回 `None`
    pub fn wait_timeout(&self, timeout: Duration) -> Option<StopReason> {
        if let Some(reason) = self.reason() {
            return Some(reason);
        }
        match self.inner.notify_rx.recv_timeout(timeout) {
            Ok(reason) => {
                let _ = self.inner.notify_tx.try_send(reason);
                Some(reason)
            },
            Err(_) => self.reason(),
        }
    }
}

impl Default for AbortSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AbortSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortSignal").field("reason", &self.reason()).finish()
    }
}

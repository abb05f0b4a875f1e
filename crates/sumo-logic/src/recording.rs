//! 异步录制钩子
//!
//! 把输入事件和输出命令通过有界通道交给后台线程，后台线程再写入
//! [`sumo_tools::RunRecording`]。队列满时丢弃而不是阻塞引擎线程，
//! 丢弃数量由 `dropped` 计数器给出。
//!
//! ```rust
//! use sumo_logic::recording::{Recorded, RecordingHook};
//! use sumo_logic::hooks::RunHook;
//! use sumo_protocol::Command;
//!
//! let (hook, rx) = RecordingHook::new();
//! hook.on_command_sent(&Command::neutral(10));
//! assert_eq!(rx.try_recv().unwrap(), Recorded::Command(Command::neutral(10)));
//! ```

use crate::hooks::RunHook;
use crossbeam_channel::{Receiver, Sender, bounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use sumo_protocol::{Command, InputEvent};
use sumo_tools::RunRecording;

/// 默认队列容量（约 8 分钟 @ 100Hz，每周期一个输入加一条命令）
pub const DEFAULT_CAPACITY: usize = 100_000;

/// 录制项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    Input(InputEvent),
    Command(Command),
}

/// 异步录制钩子
pub struct RecordingHook {
    tx: Sender<Recorded>,
    dropped: Arc<AtomicU64>,
    recorded: Arc<AtomicU64>,
}

impl RecordingHook {
    /// 创建录制钩子，返回 (钩子, 接收端)
    #[must_use]
    pub fn new() -> (Self, Receiver<Recorded>) {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> (Self, Receiver<Recorded>) {
        let (tx, rx) = bounded(capacity);
        let hook = Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
            recorded: Arc::new(AtomicU64::new(0)),
        };
        (hook, rx)
    }

    /// 丢弃计数器
    #[must_use]
    pub fn dropped(&self) -> &Arc<AtomicU64> {
        &self.dropped
    }

    /// 已入队计数器
    #[must_use]
    pub fn recorded(&self) -> &Arc<AtomicU64> {
        &self.recorded
    }

    fn push(&self, item: Recorded) {
        if self.tx.try_send(item).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        } else {
            self.recorded.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl RunHook for RecordingHook {
    fn on_input_received(&self, event: &InputEvent) {
        self.push(Recorded::Input(*event));
    }

    fn on_command_sent(&self, command: &Command) {
        self.push(Recorded::Command(*command));
    }
}

/// 把接收端剩余的录制项全部写入录制
///
/// 所有发送端都关闭后，这个函数会读完队列并返回写入数量。
pub fn drain_into(rx: &Receiver<Recorded>, recording: &mut RunRecording) -> usize {
    let mut count = 0;
    for item in rx.iter() {
        match item {
            Recorded::Input(event) => recording.push_input(event),
            Recorded::Command(command) => recording.push_command(command),
        }
        count += 1;
    }
    count
}

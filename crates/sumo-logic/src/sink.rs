//! 命令接收端
//!
//! 运行循环在每次产生命令后调用 [`CommandSink::apply`]，不等待确认。

use crossbeam_channel::{Sender, TrySendError};
use sumo_protocol::Command;
use tracing::warn;

/// 命令接收端（把命令施加到执行器）
pub trait CommandSink {
    fn apply(&mut self, command: &Command);
}

impl<F> CommandSink for F
where
    F: FnMut(&Command),
{
    fn apply(&mut self, command: &Command) {
        self(command)
    }
}

/// 通过通道把命令交给执行器线程
///
/// 执行器只关心最新命令；队列满时丢弃当前命令。
pub struct ChannelSink {
    tx: Sender<Command>,
    dropped: u64,
}

impl ChannelSink {
    pub fn new(tx: Sender<Command>) -> Self {
        Self { tx, dropped: 0 }
    }

    /// 因队列满或接收端关闭而丢弃的命令数
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl CommandSink for ChannelSink {
    fn apply(&mut self, command: &Command) {
        match self.tx.try_send(*command) {
            Ok(()) => {},
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
            },
            Err(TrySendError::Disconnected(_)) => {
                if self.dropped == 0 {
                    warn!("Command receiver disconnected, dropping commands");
                }
                self.dropped += 1;
            },
        }
    }
}

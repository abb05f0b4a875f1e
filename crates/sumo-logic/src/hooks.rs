//! 运行钩子
//!
//! 在运行循环收到输入事件、发出命令时触发自定义回调，用于录制和监控。
//!
//! # 使用示例
//!
//! ```rust
//! use sumo_logic::hooks::{HookSet, RunHook};
//! use sumo_logic::recording::RecordingHook;
//! use std::sync::Arc;
//!
//! let mut hooks = HookSet::new();
//! let (hook, _rx) = RecordingHook::new();
//! hooks.add(Arc::new(hook) as Arc<dyn RunHook>);
//! assert_eq!(hooks.len(), 1);
//! ```

use std::sync::Arc;
use sumo_protocol::{Command, InputEvent};

/// 运行回调
///
/// 回调在引擎线程上同步执行，必须非阻塞：推荐用
/// `crossbeam_channel::Sender::try_send` 把数据交给后台线程处理。
pub trait RunHook: Send + Sync {
    /// 运行循环取到一个输入事件（交给引擎之前）
    fn on_input_received(&self, event: &InputEvent) {
        let _ = event;
    }

    /// 命令已交给命令接收端
    fn on_command_sent(&self, command: &Command) {
        let _ = command;
    }
}

/// 回调集合
#[derive(Default)]
pub struct HookSet {
    hooks: Vec<Arc<dyn RunHook>>,
}

impl HookSet {
    #[must_use]
    pub const fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    pub fn add(&mut self, hook: Arc<dyn RunHook>) {
        self.hooks.push(hook);
    }

    pub fn input_received(&self, event: &InputEvent) {
        for hook in &self.hooks {
            hook.on_input_received(event);
        }
    }

    pub fn command_sent(&self, command: &Command) {
        for hook in &self.hooks {
            hook.on_command_sent(command);
        }
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl std::fmt::Debug for HookSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookSet").field("len", &self.hooks.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use sumo_protocol::SensorSnapshot;

    #[derive(Default)]
    struct Counter {
        inputs: AtomicU64,
        commands: AtomicU64,
    }

    impl RunHook for Counter {
        fn on_input_received(&self, _event: &InputEvent) {
            self.inputs.fetch_add(1, Ordering::Relaxed);
        }

        fn on_command_sent(&self, _command: &Command) {
            self.commands.fetch_add(1, Ordering::Relaxed);
        }
    }

    struct InputOnly;

    impl RunHook for InputOnly {}

    #[test]
    fn test_hookset_triggers_all() {
        let a = Arc::new(Counter::default());
        let b = Arc::new(Counter::default());

        let mut hooks = HookSet::new();
        assert!(hooks.is_empty());
        hooks.add(a.clone());
        hooks.add(b.clone());
        hooks.add(Arc::new(InputOnly));
        assert_eq!(hooks.len(), 3);

        let event = InputEvent::Sensor(SensorSnapshot::at(0));
        hooks.input_received(&event);
        hooks.input_received(&event);
        hooks.command_sent(&Command::neutral(0));

        assert_eq!(a.inputs.load(Ordering::Relaxed), 2);
        assert_eq!(b.inputs.load(Ordering::Relaxed), 2);
        assert_eq!(a.commands.load(Ordering::Relaxed), 1);
        assert_eq!(b.commands.load(Ordering::Relaxed), 1);
    }
}

//! # Sumo Logic
//!
//! 相扑机器人的决策层：把传感器快照和按键事件转换成电机/LED 命令。
//!
//! ## 结构
//!
//! - [`phase`]: 阶段状态机（带标签的枚举 + 转移函数）
//! - [`engine`]: 阶段引擎，持有当前阶段和共享命令记录
//! - [`pipeline`]: 单线程反应式运行循环（`crossbeam_channel::select!`）
//! - [`strategy`]: 开赛前策略选择与倒计时
//! - [`triggers`]: 边界/视觉触发判定
//! - [`command`]: 共享命令记录与 LED 规则
//! - [`hooks`] / [`recording`]: 运行钩子与异步录制
//! - [`abort`]: 一次性终止信号
//!
//! ## 示例
//!
//! ```rust
//! use sumo_logic::{PhaseEngine, Reaction};
//! use sumo_protocol::{Key, KeyEvent, SensorSnapshot};
//! use sumo_tools::Tuning;
//!
//! let mut engine = PhaseEngine::new(Tuning::default())?;
//! engine.on_key(&KeyEvent::new(0, Key::Enter)); // 进入策略选择
//! engine.on_key(&KeyEvent::new(10, Key::Enter)); // 提交：向左搜索
//!
//! // 倒计时结束后开始搜索
//! let reaction = engine.on_snapshot(&SensorSnapshot::at(5010));
//! assert!(matches!(reaction, Reaction::Emit(c) if c.speed_left == 6000));
//! # Ok::<(), sumo_logic::LogicError>(())
//! ```

pub mod abort;
pub mod command;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod metrics;
pub mod phase;
pub mod pipeline;
pub mod recording;
pub mod sink;
pub mod strategy;
pub mod triggers;

pub use abort::{AbortSignal, StopReason};
pub use command::CommandState;
pub use engine::{MAX_HANDOFFS_PER_TICK, PhaseEngine, Reaction};
pub use error::LogicError;
pub use hooks::{HookSet, RunHook};
pub use metrics::{RunMetrics, RunMetricsSnapshot};
pub use phase::{
    BackOffStage, CircleStage, ForwardStage, Phase, PhaseKind, RetreatStage, SeekStage, Tick,
    TickContext,
};
pub use pipeline::{Emission, RunOutcome, commands_of, replay_events, run_loop};
pub use recording::{Recorded, RecordingHook};
pub use sink::{ChannelSink, CommandSink};
pub use strategy::{Plan, Selection, Strategy, countdown_leds};

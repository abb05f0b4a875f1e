//! 反应式运行循环
//!
//! 单线程循环，同时等待传感器通道和按键通道，把事件按到达顺序交给
//! [`PhaseEngine`]。同一时刻只有一个阶段处于活动状态，阶段切换在
//! 引擎内部同步完成，没有第二个循环写共享命令。
//!
//! 按键用 `try_recv` 优先取出，保证 `Quit` 在下一个处理步骤就生效。

use crate::abort::{AbortSignal, StopReason};
use crate::engine::{PhaseEngine, Reaction};
use crate::hooks::HookSet;
use crate::metrics::RunMetricsSnapshot;
use crate::phase::PhaseKind;
use crate::sink::CommandSink;
use crossbeam_channel::{Receiver, TryRecvError, never, select};
use std::time::Duration;
use sumo_protocol::{Command, InputEvent, KeyEvent, SensorSnapshot};
use tracing::{debug, info, trace, warn};

/// 两个通道都空闲时，重新检查终止信号的间隔
const ABORT_POLL_INTERVAL: Duration = Duration::from_millis(20);

enum Next {
    Input(InputEvent),
    Idle,
    KeysClosed,
    SensorsClosed,
}

/// 一次运行的结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunOutcome {
    /// 终止原因
    pub reason: StopReason,
    /// 终止前的最后一个阶段
    pub last_phase: PhaseKind,
    /// 运行指标
    pub metrics: RunMetricsSnapshot,
}

/// 运行循环
///
/// 返回条件：
///
/// - 引擎终止（`Quit`/`Back`、比赛时长用尽）：触发 `abort`
/// - 传感器通道关闭：引擎按 [`StopReason::FeedClosed`] 终止，触发 `abort`
/// - `abort` 被外部触发：引擎按同一原因终止
///
/// 按键通道关闭不终止运行，只是不再等待按键。
pub fn run_loop<S: CommandSink>(
    engine: &mut PhaseEngine,
    sensors: &Receiver<SensorSnapshot>,
    keys: &Receiver<KeyEvent>,
    sink: &mut S,
    hooks: &HookSet,
    abort: &AbortSignal,
) -> RunOutcome {
    let mut keys = keys.clone();
    let mut last_phase = engine.phase().kind();

    info!("Run loop started in {}", last_phase);

    loop {
        if let Some(reason) = abort.reason() {
            debug!("Abort signal observed ({})", reason);
            engine.halt(reason);
            return outcome(engine, reason, last_phase);
        }

        // 按键优先；两个通道都空时再公平等待
        let next = match keys.try_recv() {
            Ok(key) => Next::Input(InputEvent::Key(key)),
            Err(TryRecvError::Disconnected) => Next::KeysClosed,
            Err(TryRecvError::Empty) => select! {
                recv(sensors) -> msg => match msg {
                    Ok(snapshot) => Next::Input(InputEvent::Sensor(snapshot)),
                    Err(_) => Next::SensorsClosed,
                },
                recv(keys) -> msg => match msg {
                    Ok(key) => Next::Input(InputEvent::Key(key)),
                    Err(_) => Next::KeysClosed,
                },
                default(ABORT_POLL_INTERVAL) => Next::Idle,
            },
        };

        let event = match next {
            Next::Input(event) => event,
            Next::Idle => continue,
            Next::KeysClosed => {
                debug!("Key feed closed, continuing with sensors only");
                keys = never();
                continue;
            },
            Next::SensorsClosed => {
                warn!("Sensor feed closed, stopping run");
                let reason = close(engine, abort, StopReason::FeedClosed);
                return outcome(engine, reason, last_phase);
            },
        };

        hooks.input_received(&event);
        let reaction = engine.on_event(&event);

        let kind = engine.phase().kind();
        if kind != PhaseKind::Stopped {
            last_phase = kind;
        }

        match reaction {
            Reaction::Emit(command) => {
                trace!(
                    "Emit at {} ms: ({}, {})",
                    command.millis, command.speed_left, command.speed_right
                );
                sink.apply(&command);
                hooks.command_sent(&command);
            },
            Reaction::Silent => {},
            Reaction::Stop(reason) => {
                let reason = if abort.raise(reason) {
                    reason
                } else {
                    abort.reason().unwrap_or(reason)
                };
                return outcome(engine, reason, last_phase);
            },
        }
    }
}

fn close(engine: &mut PhaseEngine, abort: &AbortSignal, reason: StopReason) -> StopReason {
    engine.halt(reason);
    abort.raise(reason);
    abort.reason().unwrap_or(reason)
}

fn outcome(engine: &PhaseEngine, reason: StopReason, last_phase: PhaseKind) -> RunOutcome {
    let outcome = RunOutcome {
        reason,
        last_phase,
        metrics: engine.metrics(),
    };
    info!(
        "Run loop finished: {} in {} ({} snapshots, {} commands, {} hand-offs)",
        reason,
        last_phase,
        outcome.metrics.snapshots_total,
        outcome.metrics.commands_total,
        outcome.metrics.handoffs_total
    );
    outcome
}

/// 回放中引擎的一次输出
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emission {
    Command(Command),
    Stop(StopReason),
}

/// 不经过通道，按顺序把事件交给引擎
///
/// 引擎终止后不再处理后续事件。
pub fn replay_events<I>(engine: &mut PhaseEngine, events: I) -> Vec<Emission>
where
    I: IntoIterator<Item = InputEvent>,
{
    let mut emissions = Vec::new();
    for event in events {
        match engine.on_event(&event) {
            Reaction::Emit(command) => emissions.push(Emission::Command(command)),
            Reaction::Silent => {},
            Reaction::Stop(reason) => {
                emissions.push(Emission::Stop(reason));
                break;
            },
        }
    }
    emissions
}

/// 回放输出中的命令
pub fn commands_of(emissions: &[Emission]) -> Vec<Command> {
    emissions
        .iter()
        .filter_map(|e| match e {
            Emission::Command(command) => Some(*command),
            Emission::Stop(_) => None,
        })
        .collect()
}

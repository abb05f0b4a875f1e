//! # 阶段引擎
//!
//! 持有当前阶段、共享命令记录和调参配置，把传感器快照与按键事件
//! 分发给当前阶段，并执行阶段切换。
//!
//! 引擎本身是同步、单线程的：不读取墙钟，不持有通道。
//! 通道多路复用由 [`crate::pipeline::run_loop`] 负责，
//! 因此同一输入序列总是得到同一命令序列。

use crate::abort::StopReason;
use crate::command::CommandState;
use crate::error::LogicError;
use crate::metrics::{RunMetrics, RunMetricsSnapshot};
use crate::phase::{BackOffStage, Phase, PhaseKind, Tick, TickContext};
use crate::strategy::Selection;
use std::sync::Arc;
use sumo_protocol::{Command, InputEvent, Key, KeyEvent, SensorSnapshot};
use sumo_tools::Tuning;
use tracing::{debug, error, info, trace};

/// 单个快照内允许的最大阶段切换次数
///
/// 正常配置下一个快照最多引起两次切换（例如倒计时结束 → 策略阶段 →
/// 立即越界后退）。超过上限说明配置退化成了环，此时输出中性命令。
pub const MAX_HANDOFFS_PER_TICK: usize = 8;

/// 引擎对一个输入事件的反应
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    /// 把命令交给命令接收端
    Emit(Command),
    /// 无输出
    Silent,
    /// 运行终止（只出现一次）
    Stop(StopReason),
}

impl Reaction {
    pub fn command(&self) -> Option<&Command> {
        match self {
            Reaction::Emit(command) => Some(command),
            _ => None,
        }
    }
}

/// 阶段引擎
pub struct PhaseEngine {
    tuning: Tuning,
    phase: Phase,
    command: CommandState,
    /// 比赛结束时间，倒计时结束时确定
    match_deadline: Option<i64>,
    metrics: Arc<RunMetrics>,
}

impl PhaseEngine {
    /// 创建引擎，初始阶段为 `Idle`
    ///
    /// # 错误
    ///
    /// 调参配置校验失败时返回 [`LogicError::InvalidTuning`]。
    pub fn new(tuning: Tuning) -> Result<Self, LogicError> {
        Self::with_phase(tuning, Phase::Idle)
    }

    /// 从指定阶段开始（用于测试和跳过开赛流程）
    pub fn with_phase(tuning: Tuning, phase: Phase) -> Result<Self, LogicError> {
        tuning.validate()?;
        Ok(Self {
            tuning,
            phase,
            command: CommandState::new(),
            match_deadline: None,
            metrics: Arc::new(RunMetrics::new()),
        })
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    /// 当前阶段
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// 最近一次计算的命令
    pub fn command(&self) -> &Command {
        self.command.current()
    }

    /// 指标快照
    pub fn metrics(&self) -> RunMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// 指标句柄（可在其他线程读取）
    pub fn metrics_handle(&self) -> Arc<RunMetrics> {
        Arc::clone(&self.metrics)
    }

    /// 比赛结束时间（倒计时结束前为 `None`）
    pub fn match_deadline(&self) -> Option<i64> {
        self.match_deadline
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.phase.is_stopped()
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        match self.phase {
            Phase::Stopped(reason) => Some(reason),
            _ => None,
        }
    }

    /// 处理一个传感器快照
    ///
    /// 当前阶段到期或触发时，后继阶段立即用同一个快照继续处理，
    /// 所以每个快照（终止前）都恰好产生一条命令。
    pub fn on_snapshot(&mut self, snapshot: &SensorSnapshot) -> Reaction {
        if self.is_stopped() {
            return Reaction::Silent;
        }
        RunMetrics::bump(&self.metrics.snapshots_total);
        let now = snapshot.elapsed_millis;
        trace!("Snapshot at {} ms in {}", now, self.phase.kind());

        for _ in 0..=MAX_HANDOFFS_PER_TICK {
            let ctx = TickContext {
                tuning: &self.tuning,
                match_deadline: self.match_deadline,
            };
            match self.phase.tick(&ctx, snapshot, &mut self.command) {
                Tick::Hold => return self.emit(),
                Tick::HandOff(next) => self.hand_off(next, now),
                Tick::Stop(reason) => return self.halt(reason),
            }
        }

        error!(
            "More than {} phase hand-offs at {} ms (now in {} {}), emitting neutral command",
            MAX_HANDOFFS_PER_TICK,
            now,
            self.phase.kind(),
            self.phase.stage_name()
        );
        RunMetrics::bump(&self.metrics.handoff_overflows);
        self.command.set_millis(now);
        self.command.neutral();
        self.emit()
    }

    /// 处理一个按键事件
    ///
    /// `Quit`/`Back` 在任何阶段都立即终止运行；其余按键只在
    /// `Idle`（Enter 进入策略选择）和 `StrategySelect` 中有意义。
    pub fn on_key(&mut self, event: &KeyEvent) -> Reaction {
        if self.is_stopped() {
            return Reaction::Silent;
        }
        RunMetrics::bump(&self.metrics.keys_total);
        debug!(
            "Key {} at {} ms in {}",
            event.key,
            event.millis,
            self.phase.kind()
        );

        if event.key.is_abort() {
            return self.halt(StopReason::UserAbort);
        }

        match self.phase {
            Phase::Idle if event.key == Key::Enter => {
                self.command.set_millis(event.millis);
                self.hand_off(Phase::StrategySelect(Selection::default()), event.millis);
                self.emit()
            },
            Phase::StrategySelect(mut selection) => {
                self.command.set_millis(event.millis);
                match selection.on_key(event.key, &self.tuning.forward, &mut self.command) {
                    Some(plan) => {
                        info!(
                            "Strategy committed: {} {} (adjust {})",
                            plan.strategy, plan.dir, plan.adjust
                        );
                        self.hand_off(
                            Phase::ArmedCountdown {
                                plan,
                                entered_at: event.millis,
                            },
                            event.millis,
                        );
                        Reaction::Silent
                    },
                    None => {
                        self.phase = Phase::StrategySelect(selection);
                        self.emit()
                    },
                }
            },
            _ => Reaction::Silent,
        }
    }

    /// 处理一个统一输入事件
    pub fn on_event(&mut self, event: &InputEvent) -> Reaction {
        match event {
            InputEvent::Sensor(snapshot) => self.on_snapshot(snapshot),
            InputEvent::Key(key) => self.on_key(key),
        }
    }

    /// 终止运行
    ///
    /// 已终止时返回 `Silent`，保证 `Stop` 只出现一次。
    pub fn halt(&mut self, reason: StopReason) -> Reaction {
        if self.is_stopped() {
            return Reaction::Silent;
        }
        info!(
            "Run stopped ({}) in {} at {} ms",
            reason,
            self.phase.kind(),
            self.command.current().millis
        );
        self.phase = Phase::Stopped(reason);
        self.command.neutral();
        Reaction::Stop(reason)
    }

    fn emit(&mut self) -> Reaction {
        RunMetrics::bump(&self.metrics.commands_total);
        Reaction::Emit(*self.command.current())
    }

    fn hand_off(&mut self, next: Phase, now: i64) {
        let previous = self.phase;

        if previous.kind() == PhaseKind::ArmedCountdown && next.kind().is_movement() {
            let limit = self.tuning.general.match_limit_ms;
            if limit > 0 {
                self.match_deadline = Some(now + i64::from(limit));
                info!("Match started at {} ms, limit {} ms", now, limit);
            } else {
                info!("Match started at {} ms, no time limit", now);
            }
        }

        if matches!(
            next,
            Phase::BackingOff {
                stage: BackOffStage::First,
                ..
            }
        ) {
            RunMetrics::bump(&self.metrics.border_triggers);
        }
        RunMetrics::bump(&self.metrics.handoffs_total);

        if previous.kind() != next.kind() {
            match next.direction() {
                Some(dir) => info!(
                    "Phase {} -> {} ({}) at {} ms",
                    previous.kind(),
                    next.kind(),
                    dir,
                    now
                ),
                None => info!("Phase {} -> {} at {} ms", previous.kind(), next.kind(), now),
            }
        } else {
            debug!(
                "{} stage {} -> {} at {} ms",
                next.kind(),
                previous.stage_name(),
                next.stage_name(),
                now
            );
        }

        self.command.neutral();
        self.phase = next;
    }
}

impl std::fmt::Debug for PhaseEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseEngine")
            .field("phase", &self.phase)
            .field("command", self.command.current())
            .field("match_deadline", &self.match_deadline)
            .finish_non_exhaustive()
    }
}

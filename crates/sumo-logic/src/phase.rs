//! # 阶段状态机
//!
//! 每个行为阶段是 [`Phase`] 的一个变体，携带自己的方向、子阶段和进入时间。
//! [`Phase::tick`] 是转移函数：对一个传感器快照要么原地更新命令（[`Tick::Hold`]），
//! 要么返回唯一的后继阶段（[`Tick::HandOff`]），要么终止运行（[`Tick::Stop`]）。
//!
//! 后继阶段由引擎用同一个快照重新驱动，进入时间就是该快照的时间。
//!
//! ## 运动阶段每周期的判定顺序
//!
//! 1. 比赛时长用尽 → 终止
//! 2. 视觉触发
//! 3. 边界触发（`Seeking`、`GoingForward`、`Retreating`）
//! 4. 子阶段时长到期 → 下一子阶段或后继阶段
//! 5. 运动规律 + LED
//!
//! 时长为 0 的子阶段按 1 ms 处理：进入它的那个快照仍会输出一条命令。

use crate::abort::StopReason;
use crate::command::CommandState;
use crate::strategy::{Plan, Selection, countdown_leds};
use crate::triggers::{check_border, check_vision};
use std::fmt;
use sumo_protocol::{Direction, SensorSnapshot};
use sumo_tools::Tuning;

/// `Seeking` 子阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeekStage {
    Move,
    Turn,
}

/// `Circling` 子阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CircleStage {
    FindBorder,
    Drive,
    Spiral,
}

/// `GoingForward` 子阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForwardStage {
    Drive,
    Turn,
}

/// `Retreating` 子阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetreatStage {
    PreMove,
    Turn,
    Move,
}

/// `BackingOff` 子阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackOffStage {
    First,
    Second,
}

/// 行为阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// 等待操作员按 Enter
    Idle,
    /// 开赛前策略选择
    StrategySelect(Selection),
    /// 倒计时（`entered_at` 为提交按键的时间）
    ArmedCountdown { plan: Plan, entered_at: i64 },
    Seeking {
        dir: Direction,
        stage: SeekStage,
        entered_at: i64,
    },
    Circling {
        dir: Direction,
        stage: CircleStage,
        entered_at: i64,
    },
    GoingForward {
        dir: Direction,
        adjust: u32,
        stage: ForwardStage,
        entered_at: i64,
    },
    Retreating {
        dir: Direction,
        stage: RetreatStage,
        entered_at: i64,
    },
    BackingOff {
        dir: Direction,
        stage: BackOffStage,
        entered_at: i64,
    },
    /// 终止状态
    Stopped(StopReason),
}

/// 阶段种类（不含参数）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    Idle,
    StrategySelect,
    ArmedCountdown,
    Seeking,
    Circling,
    GoingForward,
    Retreating,
    BackingOff,
    Stopped,
}

impl PhaseKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PhaseKind::Idle => "Idle",
            PhaseKind::StrategySelect => "StrategySelect",
            PhaseKind::ArmedCountdown => "ArmedCountdown",
            PhaseKind::Seeking => "Seeking",
            PhaseKind::Circling => "Circling",
            PhaseKind::GoingForward => "GoingForward",
            PhaseKind::Retreating => "Retreating",
            PhaseKind::BackingOff => "BackingOff",
            PhaseKind::Stopped => "Stopped",
        }
    }

    /// 是否为运动阶段（倒计时结束之后的阶段）
    pub fn is_movement(self) -> bool {
        matches!(
            self,
            PhaseKind::Seeking
                | PhaseKind::Circling
                | PhaseKind::GoingForward
                | PhaseKind::Retreating
                | PhaseKind::BackingOff
        )
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 转移函数的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// 保持当前阶段，命令已更新
    Hold,
    /// 交给后继阶段
    HandOff(Phase),
    /// 终止运行
    Stop(StopReason),
}

/// 单次转移的只读上下文
#[derive(Debug, Clone, Copy)]
pub struct TickContext<'a> {
    pub tuning: &'a Tuning,
    /// 比赛结束时间（快照时间基准），`None` 表示不限时
    pub match_deadline: Option<i64>,
}

impl TickContext<'_> {
    #[inline]
    fn match_over(&self, now: i64) -> bool {
        self.match_deadline.is_some_and(|deadline| now >= deadline)
    }
}

/// 运动子阶段的单周期结果
enum Motion {
    Drive(i32, i32),
    Next(Phase),
}

/// 子阶段是否到期（时长 0 按 1 ms 处理）
#[inline]
fn expired(elapsed: i64, duration_ms: u32) -> bool {
    elapsed >= i64::from(duration_ms).max(1)
}

impl Phase {
    /// 越界后退阶段的入口
    pub fn backing_off(dir: Direction, now: i64) -> Self {
        Phase::BackingOff {
            dir,
            stage: BackOffStage::First,
            entered_at: now,
        }
    }

    /// 搜索阶段的入口（从直行子阶段开始）
    pub fn seeking(dir: Direction, now: i64) -> Self {
        Phase::Seeking {
            dir,
            stage: SeekStage::Move,
            entered_at: now,
        }
    }

    pub fn kind(&self) -> PhaseKind {
        match self {
            Phase::Idle => PhaseKind::Idle,
            Phase::StrategySelect(_) => PhaseKind::StrategySelect,
            Phase::ArmedCountdown { .. } => PhaseKind::ArmedCountdown,
            Phase::Seeking { .. } => PhaseKind::Seeking,
            Phase::Circling { .. } => PhaseKind::Circling,
            Phase::GoingForward { .. } => PhaseKind::GoingForward,
            Phase::Retreating { .. } => PhaseKind::Retreating,
            Phase::BackingOff { .. } => PhaseKind::BackingOff,
            Phase::Stopped(_) => PhaseKind::Stopped,
        }
    }

    /// 当前方向（非运动阶段为 `None`）
    pub fn direction(&self) -> Option<Direction> {
        match *self {
            Phase::Seeking { dir, .. }
            | Phase::Circling { dir, .. }
            | Phase::GoingForward { dir, .. }
            | Phase::Retreating { dir, .. }
            | Phase::BackingOff { dir, .. } => Some(dir),
            _ => None,
        }
    }

    /// 进入时间（`Idle`、`StrategySelect`、`Stopped` 没有）
    pub fn entered_at(&self) -> Option<i64> {
        match *self {
            Phase::ArmedCountdown { entered_at, .. }
            | Phase::Seeking { entered_at, .. }
            | Phase::Circling { entered_at, .. }
            | Phase::GoingForward { entered_at, .. }
            | Phase::Retreating { entered_at, .. }
            | Phase::BackingOff { entered_at, .. } => Some(entered_at),
            _ => None,
        }
    }

    /// 子阶段名（用于日志）
    pub fn stage_name(&self) -> &'static str {
        match self {
            Phase::Seeking { stage, .. } => match stage {
                SeekStage::Move => "move",
                SeekStage::Turn => "turn",
            },
            Phase::Circling { stage, .. } => match stage {
                CircleStage::FindBorder => "find-border",
                CircleStage::Drive => "drive",
                CircleStage::Spiral => "spiral",
            },
            Phase::GoingForward { stage, .. } => match stage {
                ForwardStage::Drive => "drive",
                ForwardStage::Turn => "turn",
            },
            Phase::Retreating { stage, .. } => match stage {
                RetreatStage::PreMove => "pre-move",
                RetreatStage::Turn => "turn",
                RetreatStage::Move => "move",
            },
            Phase::BackingOff { stage, .. } => match stage {
                BackOffStage::First => "first",
                BackOffStage::Second => "second",
            },
            _ => "-",
        }
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        matches!(self, Phase::Stopped(_))
    }

    /// 是否响应边界触发
    ///
    /// `BackingOff` 正在处理越界；`Circling` 把角落读数当作控制输入。
    fn watches_border(&self) -> bool {
        matches!(
            self,
            Phase::Seeking { .. } | Phase::GoingForward { .. } | Phase::Retreating { .. }
        )
    }

    /// 转移函数
    ///
    /// 先记录快照时间，再按当前阶段处理快照。返回 `Hold` 时命令已完整更新，
    /// 返回 `HandOff`/`Stop` 时命令内容未定义，由引擎负责重置。
    pub fn tick(
        &self,
        ctx: &TickContext<'_>,
        snapshot: &SensorSnapshot,
        command: &mut CommandState,
    ) -> Tick {
        let tuning = ctx.tuning;
        let now = snapshot.elapsed_millis;
        command.handle_time(snapshot);

        match *self {
            Phase::Stopped(reason) => Tick::Stop(reason),
            Phase::Idle => {
                command.speed(0, 0);
                command.leds_from_data(snapshot, &tuning.vision);
                Tick::Hold
            },
            Phase::StrategySelect(_) => {
                command.speed(0, 0);
                Tick::Hold
            },
            Phase::ArmedCountdown { plan, entered_at } => {
                let elapsed = now - entered_at;
                let window = i64::from(tuning.general.countdown_ms);
                if elapsed >= window {
                    return Tick::HandOff(plan.start(now));
                }
                let (left_green, right_green, left_red, right_red) =
                    countdown_leds(elapsed, window);
                command.speed(0, 0);
                command.leds(left_green, right_green, left_red, right_red);
                Tick::Hold
            },
            _ => self.tick_movement(ctx, snapshot, command),
        }
    }

    fn tick_movement(
        &self,
        ctx: &TickContext<'_>,
        snapshot: &SensorSnapshot,
        command: &mut CommandState,
    ) -> Tick {
        let tuning = ctx.tuning;
        let now = snapshot.elapsed_millis;

        if ctx.match_over(now) {
            return Tick::Stop(StopReason::MatchOver);
        }
        if let Some(next) = check_vision(snapshot, tuning) {
            return Tick::HandOff(next);
        }
        if self.watches_border()
            && let Some(dir) = check_border(snapshot)
        {
            return Tick::HandOff(Phase::backing_off(dir, now));
        }

        let elapsed = now - self.entered_at().unwrap_or(now);
        let motion = match *self {
            Phase::Seeking { dir, stage, .. } => seek_motion(tuning, dir, stage, elapsed, now),
            Phase::Circling { dir, stage, .. } => {
                circle_motion(tuning, dir, stage, elapsed, now, snapshot)
            },
            Phase::GoingForward {
                dir, adjust, stage, ..
            } => forward_motion(tuning, dir, adjust, stage, elapsed, now),
            Phase::Retreating { dir, stage, .. } => {
                retreat_motion(tuning, dir, stage, elapsed, now)
            },
            Phase::BackingOff { dir, stage, .. } => {
                back_off_motion(tuning, dir, stage, elapsed, now)
            },
            Phase::Idle
            | Phase::StrategySelect(_)
            | Phase::ArmedCountdown { .. }
            | Phase::Stopped(_) => Motion::Drive(0, 0),
        };

        match motion {
            Motion::Drive(left, right) => {
                command.speed(left, right);
                command.leds_from_data(snapshot, &tuning.vision);
                Tick::Hold
            },
            Motion::Next(next) => Tick::HandOff(next),
        }
    }
}

fn seek_motion(
    tuning: &Tuning,
    dir: Direction,
    stage: SeekStage,
    elapsed: i64,
    now: i64,
) -> Motion {
    let seek = &tuning.seek;
    match stage {
        SeekStage::Move => {
            if expired(elapsed, seek.move_ms) {
                return Motion::Next(Phase::Seeking {
                    dir,
                    stage: SeekStage::Turn,
                    entered_at: now,
                });
            }
            Motion::Drive(seek.move_speed, seek.move_speed)
        },
        SeekStage::Turn => {
            if expired(elapsed, seek.turn_ms) {
                return Motion::Next(Phase::seeking(dir.flipped(), now));
            }
            Motion::Drive(
                seek.turn_speed * dir.left_turn_versor(),
                seek.turn_speed * dir.right_turn_versor(),
            )
        },
    }
}

fn circle_motion(
    tuning: &Tuning,
    dir: Direction,
    stage: CircleStage,
    elapsed: i64,
    now: i64,
    snapshot: &SensorSnapshot,
) -> Motion {
    let circle = &tuning.circle;
    match stage {
        CircleStage::FindBorder => {
            let (border_found, slow) = match dir {
                Direction::Left => (snapshot.corner_left_out, circle.find_border_slow_left),
                Direction::Right | Direction::None => {
                    (snapshot.corner_right_out, circle.find_border_slow_right)
                },
            };
            if border_found {
                return Motion::Next(Phase::Circling {
                    dir: dir.flipped(),
                    stage: CircleStage::Drive,
                    entered_at: now,
                });
            }
            let pair = if elapsed < i64::from(circle.find_border_ms) {
                circle.find_border
            } else {
                slow
            };
            let (left, right) = dir.outer_inner(pair.outer, -pair.inner);
            Motion::Drive(left, right)
        },
        CircleStage::Drive => {
            if expired(elapsed, circle.drive_ms) {
                return Motion::Next(Phase::Circling {
                    dir,
                    stage: CircleStage::Spiral,
                    entered_at: now,
                });
            }
            // 内侧轮按对侧角落读数减速
            let inner = |speed: i32, reading: i32| {
                let reduction =
                    i64::from(reading.clamp(0, 100)) * i64::from(circle.adjust_inner_max) / 100;
                (i64::from(speed) - reduction).clamp(i64::from(i32::MIN), i64::from(i32::MAX))
                    as i32
            };
            match dir {
                Direction::Left => Motion::Drive(
                    inner(circle.inner_speed_left, snapshot.corner_right_value),
                    circle.outer_speed,
                ),
                Direction::Right | Direction::None => Motion::Drive(
                    circle.outer_speed,
                    inner(circle.inner_speed_right, snapshot.corner_left_value),
                ),
            }
        },
        CircleStage::Spiral => {
            if expired(elapsed, circle.spiral_ms) {
                return Motion::Next(Phase::seeking(dir.flipped(), now));
            }
            let (left, right) = dir.outer_inner(circle.spiral.outer, circle.spiral.inner);
            Motion::Drive(left, right)
        },
    }
}

fn forward_motion(
    tuning: &Tuning,
    dir: Direction,
    adjust: u32,
    stage: ForwardStage,
    elapsed: i64,
    now: i64,
) -> Motion {
    let forward = &tuning.forward;
    match stage {
        ForwardStage::Drive => {
            if expired(elapsed, forward.drive_ms) {
                return Motion::Next(Phase::GoingForward {
                    dir,
                    adjust,
                    stage: ForwardStage::Turn,
                    entered_at: now,
                });
            }
            let penalty = i64::from(adjust) * i64::from(forward.adjustment_step);
            let biased = (i64::from(forward.speed) - penalty)
                .clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
            match dir {
                Direction::Left => Motion::Drive(biased, forward.speed),
                Direction::Right => Motion::Drive(forward.speed, biased),
                Direction::None => Motion::Drive(forward.speed, forward.speed),
            }
        },
        ForwardStage::Turn => {
            if expired(elapsed, forward.turn_ms) {
                return Motion::Next(Phase::seeking(dir.flipped(), now));
            }
            let (left, right) = dir.outer_inner(forward.turn.outer, forward.turn.inner);
            Motion::Drive(left, right)
        },
    }
}

fn retreat_motion(
    tuning: &Tuning,
    dir: Direction,
    stage: RetreatStage,
    elapsed: i64,
    now: i64,
) -> Motion {
    let retreat = &tuning.retreat;
    let next = |stage| {
        Motion::Next(Phase::Retreating {
            dir,
            stage,
            entered_at: now,
        })
    };
    match stage {
        RetreatStage::PreMove => {
            if expired(elapsed, retreat.pre_move_ms) {
                return next(RetreatStage::Turn);
            }
            Motion::Drive(retreat.pre_move_speed, retreat.pre_move_speed)
        },
        RetreatStage::Turn => {
            if expired(elapsed, retreat.turn_ms) {
                return next(RetreatStage::Move);
            }
            let (left, right) = dir.outer_inner(retreat.turn.outer, retreat.turn.inner);
            Motion::Drive(left, right)
        },
        RetreatStage::Move => {
            if expired(elapsed, retreat.move_ms) {
                return Motion::Next(Phase::seeking(dir.flipped(), now));
            }
            let trailing = retreat.move_speed * retreat.trailing_percent / 100;
            match dir {
                Direction::Right => Motion::Drive(trailing, retreat.move_speed),
                Direction::Left | Direction::None => Motion::Drive(retreat.move_speed, trailing),
            }
        },
    }
}

fn back_off_motion(
    tuning: &Tuning,
    dir: Direction,
    stage: BackOffStage,
    elapsed: i64,
    now: i64,
) -> Motion {
    let back = &tuning.back;
    let (duration, left, right) = match (dir, stage) {
        (Direction::Right, BackOffStage::First) => {
            (back.turn1_ms, -back.turn1.inner, -back.turn1.outer)
        },
        (Direction::Right, BackOffStage::Second) => {
            (back.turn2_ms, back.turn2_speed, -back.turn2_speed)
        },
        (Direction::Left, BackOffStage::First) => {
            (back.turn1_ms, -back.turn1.outer, -back.turn1.inner)
        },
        (Direction::Left, BackOffStage::Second) => {
            (back.turn2_ms, -back.turn2_speed, back.turn2_speed)
        },
        (Direction::None, BackOffStage::First) => {
            (back.move_ms, -back.move_speed, -back.move_speed)
        },
        (Direction::None, BackOffStage::Second) => {
            (back.turn3_ms, back.turn3_speed, -back.turn3_speed)
        },
    };

    if expired(elapsed, duration) {
        return match stage {
            BackOffStage::First => Motion::Next(Phase::BackingOff {
                dir,
                stage: BackOffStage::Second,
                entered_at: now,
            }),
            BackOffStage::Second => {
                // 双侧越界的掉头按顺时针完成，之后向右搜索
                let resume = match dir {
                    Direction::None => Direction::Right,
                    other => other,
                };
                Motion::Next(Phase::seeking(resume, now))
            },
        };
    }
    Motion::Drive(left, right)
}

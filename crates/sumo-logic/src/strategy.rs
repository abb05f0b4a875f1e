//! 开赛前的策略选择与倒计时
//!
//! 操作员在 `StrategySelect` 阶段用方向键挑选策略和偏置方向，
//! `Enter` 提交后进入 `ArmedCountdown`，倒计时结束时由 [`Plan::start`]
//! 生成首个运动阶段。

use crate::command::CommandState;
use crate::phase::{CircleStage, ForwardStage, Phase, RetreatStage, SeekStage};
use std::fmt;
use sumo_protocol::{Direction, Key, LED_MAX};
use sumo_tools::ForwardTuning;
use tracing::debug;

/// 运动策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Strategy {
    /// 搜索：直行与原地转向交替
    #[default]
    Seek,
    /// 带偏置的前冲
    GoForward,
    /// 回撤：直行、转向、拖尾移动
    Retreat,
    /// 绕圈：找边后沿边行驶
    Circle,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Seek => "seek",
            Strategy::GoForward => "forward",
            Strategy::Retreat => "retreat",
            Strategy::Circle => "circle",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 已提交的策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    pub strategy: Strategy,
    pub dir: Direction,
    /// 前冲偏置级数（仅 `GoForward` 使用）
    pub adjust: u32,
}

impl Plan {
    /// 生成首个运动阶段，进入时间为 `now`
    pub fn start(&self, now: i64) -> Phase {
        match self.strategy {
            Strategy::Seek => Phase::Seeking {
                dir: self.dir,
                stage: SeekStage::Move,
                entered_at: now,
            },
            Strategy::GoForward => Phase::GoingForward {
                dir: self.dir,
                adjust: self.adjust,
                stage: ForwardStage::Drive,
                entered_at: now,
            },
            Strategy::Retreat => Phase::Retreating {
                dir: self.dir,
                stage: RetreatStage::PreMove,
                entered_at: now,
            },
            Strategy::Circle => Phase::Circling {
                dir: self.dir,
                stage: CircleStage::FindBorder,
                entered_at: now,
            },
        }
    }
}

/// 策略选择状态
///
/// 初始为向左搜索、偏置 0。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub strategy: Strategy,
    pub dir: Direction,
    pub adjust: u32,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            strategy: Strategy::Seek,
            dir: Direction::Left,
            adjust: 0,
        }
    }
}

impl Selection {
    /// 处理一个选择按键，并在 `command` 上给出 LED 反馈
    ///
    /// - `Left`/`Right`：选中前冲并设定偏置方向，偏置级数加一（超过上限回绕到 0）
    /// - `Up`：在前冲与搜索之间切换
    /// - `Down`：选中回撤，再按一次切换到绕圈
    /// - `Enter`：提交，返回 [`Plan`]
    ///
    /// 速度始终为零。终止类按键由引擎在此之前处理。
    pub fn on_key(
        &mut self,
        key: Key,
        forward: &ForwardTuning,
        command: &mut CommandState,
    ) -> Option<Plan> {
        let steps = forward.adjustment_steps.max(1);
        let full = i32::from(LED_MAX);

        match key {
            Key::Enter => {
                return Some(Plan {
                    strategy: self.strategy,
                    dir: self.dir,
                    adjust: self.adjust,
                });
            },
            Key::Left | Key::Right => {
                self.dir = if key == Key::Left {
                    Direction::Left
                } else {
                    Direction::Right
                };
                self.strategy = Strategy::GoForward;
                self.adjust += 1;
                if self.adjust > steps {
                    self.adjust = 0;
                }
                let level = (i64::from(self.adjust) * i64::from(full) / i64::from(steps)) as i32;
                match self.dir {
                    Direction::Left => command.leds(full, level, 0, 0),
                    _ => command.leds(level, full, 0, 0),
                }
                debug!("Selected forward {} (adjust {})", self.dir, self.adjust);
            },
            Key::Up => {
                if self.strategy == Strategy::GoForward {
                    self.strategy = Strategy::Seek;
                    command.leds(0, 0, 0, 0);
                } else {
                    self.strategy = Strategy::GoForward;
                    self.adjust = 0;
                    match self.dir {
                        Direction::Left => command.leds(full, 0, 0, 0),
                        _ => command.leds(0, full, 0, 0),
                    }
                }
                debug!("Selected {} {}", self.strategy, self.dir);
            },
            Key::Down => {
                if self.strategy == Strategy::Retreat {
                    self.strategy = Strategy::Circle;
                    match self.dir {
                        Direction::Left => command.leds(full, 0, full, 0),
                        _ => command.leds(0, full, 0, full),
                    }
                } else {
                    self.strategy = Strategy::Retreat;
                    match self.dir {
                        Direction::Left => command.leds(0, 0, full, 0),
                        _ => command.leds(0, 0, 0, full),
                    }
                }
                debug!("Selected {} {}", self.strategy, self.dir);
            },
            Key::Back | Key::Quit => {},
        }

        command.speed(0, 0);
        None
    }
}

/// 倒计时 LED 亮度，返回 (左绿, 右绿, 左红, 右红)
///
/// 亮度 `(elapsed mod 1000)·255 / (window/5)`，截断到 0-255。
/// 窗口前 4/5 只点亮左侧两灯，最后 1/5 四灯全亮。
pub fn countdown_leds(elapsed: i64, window: i64) -> (i32, i32, i32, i32) {
    let ramp = (window / 5).max(1);
    let full = i64::from(LED_MAX);
    let intensity = ((elapsed.max(0) % 1000) * full / ramp).clamp(0, full) as i32;

    if elapsed * 5 >= window * 4 {
        (intensity, intensity, intensity, intensity)
    } else {
        (intensity, 0, intensity, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(selection: &mut Selection, key: Key, state: &mut CommandState) -> Option<Plan> {
        selection.on_key(key, &ForwardTuning::default(), state)
    }

    #[test]
    fn test_default_selection_commits_seek_left() {
        let mut selection = Selection::default();
        let mut state = CommandState::new();
        let plan = press(&mut selection, Key::Enter, &mut state).unwrap();
        assert_eq!(
            plan,
            Plan {
                strategy: Strategy::Seek,
                dir: Direction::Left,
                adjust: 0
            }
        );
    }

    #[test]
    fn test_left_right_bias_and_wrap() {
        let mut selection = Selection::default();
        let mut state = CommandState::new();

        // 默认 4 级：1, 2, 3, 4, 然后回绕到 0
        for expected in [1, 2, 3, 4, 0, 1] {
            assert!(press(&mut selection, Key::Left, &mut state).is_none());
            assert_eq!(selection.adjust, expected);
        }
        assert_eq!(selection.strategy, Strategy::GoForward);
        assert_eq!(selection.dir, Direction::Left);
        // 1 级：左绿满，右绿 255/4
        assert_eq!(state.current().leds(), (255, 63, 0, 0));

        press(&mut selection, Key::Right, &mut state);
        assert_eq!(selection.dir, Direction::Right);
        assert_eq!(selection.adjust, 2);
        assert_eq!(state.current().leds(), (127, 255, 0, 0));
        assert!(state.current().is_stationary());
    }

    #[test]
    fn test_up_toggles_forward_and_seek() {
        let mut selection = Selection::default();
        let mut state = CommandState::new();

        press(&mut selection, Key::Left, &mut state);
        press(&mut selection, Key::Left, &mut state);
        assert_eq!(selection.adjust, 2);

        press(&mut selection, Key::Up, &mut state);
        assert_eq!(selection.strategy, Strategy::Seek);
        assert!(state.current().leds_off());

        press(&mut selection, Key::Up, &mut state);
        assert_eq!(selection.strategy, Strategy::GoForward);
        assert_eq!(selection.adjust, 0);
        assert_eq!(state.current().leds(), (255, 0, 0, 0));
    }

    #[test]
    fn test_down_toggles_retreat_and_circle() {
        let mut selection = Selection::default();
        let mut state = CommandState::new();

        press(&mut selection, Key::Right, &mut state);
        press(&mut selection, Key::Down, &mut state);
        assert_eq!(selection.strategy, Strategy::Retreat);
        assert_eq!(state.current().leds(), (0, 0, 0, 255));

        press(&mut selection, Key::Down, &mut state);
        assert_eq!(selection.strategy, Strategy::Circle);
        assert_eq!(state.current().leds(), (0, 255, 0, 255));

        press(&mut selection, Key::Down, &mut state);
        assert_eq!(selection.strategy, Strategy::Retreat);

        let plan = press(&mut selection, Key::Enter, &mut state).unwrap();
        assert_eq!(plan.strategy, Strategy::Retreat);
        assert_eq!(plan.dir, Direction::Right);
    }

    #[test]
    fn test_plan_start_phases() {
        let plan = Plan {
            strategy: Strategy::GoForward,
            dir: Direction::Left,
            adjust: 3,
        };
        assert_eq!(
            plan.start(5000),
            Phase::GoingForward {
                dir: Direction::Left,
                adjust: 3,
                stage: ForwardStage::Drive,
                entered_at: 5000,
            }
        );

        let plan = Plan {
            strategy: Strategy::Circle,
            dir: Direction::Right,
            adjust: 0,
        };
        assert!(matches!(
            plan.start(10),
            Phase::Circling {
                stage: CircleStage::FindBorder,
                entered_at: 10,
                ..
            }
        ));
    }

    #[test]
    fn test_countdown_leds_ramp() {
        let window = 5000;
        assert_eq!(countdown_leds(0, window), (0, 0, 0, 0));
        // 500 ms: 500·255/1000 = 127，仅左侧
        assert_eq!(countdown_leds(500, window), (127, 0, 127, 0));
        // 4/5 处切换到四灯
        assert_eq!(countdown_leds(3990, window), (252, 0, 252, 0));
        assert_eq!(countdown_leds(4000, window), (0, 0, 0, 0));
        assert_eq!(countdown_leds(4500, window), (127, 127, 127, 127));
    }

    #[test]
    fn test_countdown_leds_short_window_clamped() {
        // 窗口 100 ms：斜坡 20 ms，亮度很快饱和
        assert_eq!(countdown_leds(50, 100), (255, 0, 255, 0));
        assert_eq!(countdown_leds(90, 100), (255, 255, 255, 255));
    }
}

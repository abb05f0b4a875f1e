//! 仿真场地（传感器源 + 命令接收端）
//!
//! 差速驱动的运动学模型：按最新命令积分位姿，再由两个前角传感器相对
//! 场地圆心的距离生成角落读数。以固定周期发送快照，终止信号触发或
//! 达到时长上限时关闭传感器通道。

use crate::clock::RunClock;
use crossbeam_channel::{Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};
use sumo_logic::AbortSignal;
use sumo_logic::triggers::corner_is_out;
use sumo_protocol::{Command, SensorSnapshot};
use tracing::{debug, warn};

/// 场地半径（mm）
pub const RING_RADIUS_MM: f64 = 385.0;
/// 白色边线宽度（mm）
pub const BORDER_WIDTH_MM: f64 = 25.0;
/// 满速（±10000）对应的轮速（mm/s）
pub const MAX_WHEEL_SPEED_MM_S: f64 = 400.0;
/// 轮距（mm）
pub const WHEEL_BASE_MM: f64 = 120.0;
/// 前角传感器相对车体中心的前向偏移（mm）
pub const SENSOR_FORWARD_MM: f64 = 70.0;
/// 前角传感器的侧向偏移（mm）
pub const SENSOR_LATERAL_MM: f64 = 50.0;

/// 黑色场地上的读数
const READING_INSIDE: i32 = 5;
/// 白色边线上的读数
const READING_BORDER: i32 = 45;
/// 场外的读数
const READING_OUTSIDE: i32 = 80;

/// 仿真位姿
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arena {
    pub x: f64,
    pub y: f64,
    /// 朝向（弧度，0 为 +x）
    pub heading: f64,
    /// 电机满速值（命令速度的归一化分母）
    max_speed: i32,
}

impl Arena {
    /// 机器人位于场地中心，朝向 +x
    pub fn new(max_speed: i32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            heading: 0.0,
            max_speed: max_speed.max(1),
        }
    }

    pub fn with_pose(mut self, x: f64, y: f64, heading: f64) -> Self {
        self.x = x;
        self.y = y;
        self.heading = heading;
        self
    }

    fn wheel_speed(&self, speed: i32) -> f64 {
        let clamped = speed.clamp(-self.max_speed, self.max_speed);
        let ratio = f64::from(clamped) / f64::from(self.max_speed);
        ratio * MAX_WHEEL_SPEED_MM_S
    }

    /// 按命令推进 `dt`
    pub fn step(&mut self, command: &Command, dt: Duration) {
        let dt = dt.as_secs_f64();
        let left = self.wheel_speed(command.speed_left);
        let right = self.wheel_speed(command.speed_right);

        let v = (left + right) / 2.0;
        // 左轮快于右轮时顺时针（朝向角减小）
        let w = (right - left) / WHEEL_BASE_MM;

        self.heading += w * dt;
        self.x += v * self.heading.cos() * dt;
        self.y += v * self.heading.sin() * dt;
    }

    /// 两个前角传感器的位置 (左, 右)
    fn sensor_positions(&self) -> ((f64, f64), (f64, f64)) {
        let (sin, cos) = self.heading.sin_cos();
        let fx = self.x + SENSOR_FORWARD_MM * cos;
        let fy = self.y + SENSOR_FORWARD_MM * sin;
        // 左侧为朝向逆时针 90°
        let left = (fx - SENSOR_LATERAL_MM * sin, fy + SENSOR_LATERAL_MM * cos);
        let right = (fx + SENSOR_LATERAL_MM * sin, fy - SENSOR_LATERAL_MM * cos);
        (left, right)
    }

    fn reading_at((x, y): (f64, f64)) -> i32 {
        let distance = x.hypot(y);
        if distance > RING_RADIUS_MM {
            READING_OUTSIDE
        } else if distance > RING_RADIUS_MM - BORDER_WIDTH_MM {
            READING_BORDER
        } else {
            READING_INSIDE
        }
    }

    /// 生成当前位姿的传感器快照
    pub fn snapshot(&self, elapsed_millis: i64, threshold: i32) -> SensorSnapshot {
        let (left, right) = self.sensor_positions();
        let left_value = Self::reading_at(left);
        let right_value = Self::reading_at(right);
        SensorSnapshot::at(elapsed_millis)
            .with_corner_values(left_value, right_value)
            .with_corners(
                corner_is_out(left_value, threshold),
                corner_is_out(right_value, threshold),
            )
    }

    /// 车体中心是否已经离开场地
    pub fn is_outside(&self) -> bool {
        self.x.hypot(self.y) > RING_RADIUS_MM
    }
}

/// 仿真传感器源配置
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub tick: Duration,
    pub corner_threshold: i32,
    pub max_speed: i32,
    /// 仿真时长上限，到达后关闭传感器通道
    pub duration: Option<Duration>,
}

/// 仿真统计
#[derive(Debug, Clone, Copy, Default)]
pub struct SimStats {
    pub ticks: u64,
    pub overruns: u64,
    /// 车体中心离开场地的周期数
    pub ticks_outside: u64,
}

/// 启动仿真线程
///
/// 线程持有 `sensors` 发送端；线程退出即传感器通道关闭。
pub fn spawn_arena(
    config: SimConfig,
    clock: RunClock,
    commands: Receiver<Command>,
    sensors: Sender<SensorSnapshot>,
    abort: AbortSignal,
) -> thread::JoinHandle<SimStats> {
    thread::spawn(move || {
        let mut arena = Arena::new(config.max_speed);
        let mut latest = Command::default();
        let mut stats = SimStats::default();
        let mut next_tick = Instant::now();

        loop {
            if abort.is_raised() {
                debug!("Arena: abort raised, stopping");
                break;
            }
            if config.duration.is_some_and(|limit| clock.elapsed() >= limit) {
                debug!("Arena: duration reached, closing sensor feed");
                break;
            }

            // 只使用最新命令
            while let Ok(command) = commands.try_recv() {
                latest = command;
            }

            arena.step(&latest, config.tick);
            if arena.is_outside() {
                stats.ticks_outside += 1;
            }

            let snapshot = arena
                .snapshot(clock.millis(), config.corner_threshold)
                .captured_now();
            if sensors.send(snapshot).is_err() {
                debug!("Arena: sensor receiver closed");
                break;
            }
            stats.ticks += 1;

            next_tick += config.tick;
            let now = Instant::now();
            if next_tick > now {
                spin_sleep::sleep(next_tick - now);
            } else {
                stats.overruns += 1;
                if stats.overruns == 1 {
                    warn!(
                        "Arena tick overrun by {:?} (tick {:?})",
                        now.duration_since(next_tick),
                        config.tick
                    );
                }
                next_tick = now;
            }
        }

        stats
    })
}

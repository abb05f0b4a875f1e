//! # 调参配置
//!
//! 各阶段使用的全部速度、时长和阈值。默认值来自赛场实测。
//!
//! 速度单位为电机占空比万分比（`max_speed` = 10000 为满速），时长单位为毫秒。
//! 配置文件只需写出要覆盖的字段，缺省字段取默认值，未知字段报错。
//!
//! ```toml
//! [general]
//! countdown_ms = 5000
//!
//! [seek]
//! move_speed = 6000
//! move_ms = 850
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// 调参配置错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TuningError {
    /// 必须为正数的字段
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: i64 },

    /// 速度超出电机范围
    #[error("{field} = {value} exceeds max speed {max}")]
    SpeedOutOfRange {
        field: &'static str,
        value: i32,
        max: i32,
    },

    /// 百分比超出 0-100
    #[error("{field} = {value} is not a percentage (0-100)")]
    PercentOutOfRange { field: &'static str, value: i32 },

    /// 倒计时窗口过短（LED 斜坡按窗口的 1/5 计算）
    #[error("countdown window {0} ms is shorter than 5 ms")]
    CountdownTooShort(u32),
}

/// (外侧, 内侧) 轮速对
///
/// 按方向镜像：向右转时左轮为外侧。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpeedPair {
    pub outer: i32,
    pub inner: i32,
}

impl SpeedPair {
    pub const fn new(outer: i32, inner: i32) -> Self {
        Self { outer, inner }
    }
}

/// 调参配置
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Tuning {
    /// 通用参数
    pub general: GeneralTuning,
    /// 视觉信号归一化
    pub vision: VisionTuning,
    /// 搜索（Seeking）
    pub seek: SeekTuning,
    /// 越界后退（BackingOff）
    pub back: BackOffTuning,
    /// 绕圈（Circling）
    pub circle: CircleTuning,
    /// 前冲（GoingForward）
    pub forward: ForwardTuning,
    /// 回撤（Retreating）
    pub retreat: RetreatTuning,
}

/// 通用参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneralTuning {
    /// 电机满速
    pub max_speed: i32,
    /// 传感器采样周期（ms），由外部传感器源使用
    pub tick_ms: u32,
    /// 开赛倒计时窗口（ms）
    pub countdown_ms: u32,
    /// 角落传感器越界阈值（读数大于此值视为越界）
    pub corner_out_threshold: i32,
    /// 比赛时长上限（ms，从倒计时结束算起），0 表示不限
    pub match_limit_ms: u32,
}

impl Default for GeneralTuning {
    fn default() -> Self {
        Self {
            max_speed: 10_000,
            tick_ms: 10,
            countdown_ms: 5_000,
            corner_out_threshold: 20,
            match_limit_ms: 180_000,
        }
    }
}

/// 视觉信号归一化参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VisionTuning {
    /// 视觉强度上限
    pub intensity_max: i32,
    /// 视觉方位上限（绝对值）
    pub angle_max: i32,
}

impl Default for VisionTuning {
    fn default() -> Self {
        Self {
            intensity_max: 100,
            angle_max: 100,
        }
    }
}

/// 搜索参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeekTuning {
    pub move_speed: i32,
    pub move_ms: u32,
    pub turn_speed: i32,
    pub turn_ms: u32,
}

impl Default for SeekTuning {
    fn default() -> Self {
        Self {
            move_speed: 6_000,
            move_ms: 850,
            turn_speed: 4_000,
            turn_ms: 1_500,
        }
    }
}

/// 越界后退参数
///
/// 单侧越界：倒车转向（turn1）后原地反向转（turn2）；
/// 双侧越界：直线倒车（move）后原地掉头（turn3）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackOffTuning {
    pub turn1_ms: u32,
    pub turn2_speed: i32,
    pub turn2_ms: u32,
    pub move_speed: i32,
    pub move_ms: u32,
    pub turn3_speed: i32,
    pub turn3_ms: u32,
    pub turn1: SpeedPair,
}

impl Default for BackOffTuning {
    fn default() -> Self {
        Self {
            turn1_ms: 400,
            turn2_speed: 5_000,
            turn2_ms: 800,
            move_speed: 10_000,
            move_ms: 500,
            turn3_speed: 5_000,
            turn3_ms: 1_000,
            turn1: SpeedPair::new(10_000, 5_000),
        }
    }
}

/// 绕圈参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CircleTuning {
    /// 找边阶段快速段时长，之后切换到慢速微调
    pub find_border_ms: u32,
    /// 沿边行驶时长
    pub drive_ms: u32,
    pub outer_speed: i32,
    pub inner_speed_left: i32,
    pub inner_speed_right: i32,
    /// 内侧轮按对侧角落读数减速的上限
    pub adjust_inner_max: i32,
    pub spiral_ms: u32,
    /// 找边快速段（内侧轮反转）
    pub find_border: SpeedPair,
    /// 找边慢速段（向左）
    pub find_border_slow_left: SpeedPair,
    /// 找边慢速段（向右）
    pub find_border_slow_right: SpeedPair,
    pub spiral: SpeedPair,
}

impl Default for CircleTuning {
    fn default() -> Self {
        Self {
            find_border_ms: 200,
            drive_ms: 2_000,
            outer_speed: 10_000,
            inner_speed_left: 5_300,
            inner_speed_right: 5_300,
            adjust_inner_max: 300,
            spiral_ms: 500,
            find_border: SpeedPair::new(6_000, 2_500),
            find_border_slow_left: SpeedPair::new(3_100, 1_800),
            find_border_slow_right: SpeedPair::new(3_100, 1_800),
            spiral: SpeedPair::new(10_000, 2_000),
        }
    }
}

/// 前冲参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForwardTuning {
    pub drive_ms: u32,
    pub speed: i32,
    /// 每级偏置调整量（施加在偏置一侧的车轮上）
    pub adjustment_step: i32,
    /// 偏置调整级数上限（超过后回绕到 0）
    pub adjustment_steps: u32,
    pub turn_ms: u32,
    pub turn: SpeedPair,
}

impl Default for ForwardTuning {
    fn default() -> Self {
        Self {
            drive_ms: 1_000,
            speed: 10_000,
            adjustment_step: 500,
            adjustment_steps: 4,
            turn_ms: 600,
            turn: SpeedPair::new(10_000, 1_000),
        }
    }
}

/// 回撤参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetreatTuning {
    pub pre_move_speed: i32,
    pub pre_move_ms: u32,
    pub turn_ms: u32,
    pub move_ms: u32,
    pub move_speed: i32,
    /// 移动阶段拖后轮速度占领先轮的百分比
    pub trailing_percent: i32,
    pub turn: SpeedPair,
}

impl Default for RetreatTuning {
    fn default() -> Self {
        Self {
            pre_move_speed: 10_000,
            pre_move_ms: 200,
            turn_ms: 300,
            move_ms: 500,
            move_speed: 10_000,
            trailing_percent: 20,
            turn: SpeedPair::new(10_000, -10_000),
        }
    }
}

impl Tuning {
    /// 从 TOML 文件加载配置并校验
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        let tuning = Self::from_toml_str(&content)
            .with_context(|| format!("解析配置文件失败: {}", path.display()))?;
        Ok(tuning)
    }

    /// 从 TOML 文本解析配置并校验
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let tuning: Tuning = toml::from_str(content).context("TOML 格式错误")?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// 序列化为 TOML 文本
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置失败")
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = self.to_toml_string()?;
        fs::write(path, content)
            .with_context(|| format!("写入配置文件失败: {}", path.display()))?;
        Ok(())
    }

    /// 校验配置
    ///
    /// 时长为 0 是允许的（对应阶段至少处理一个采样周期），
    /// 但作为除数或上限的字段必须为正。
    pub fn validate(&self) -> Result<(), TuningError> {
        let g = &self.general;
        positive("general.max_speed", i64::from(g.max_speed))?;
        positive("general.tick_ms", i64::from(g.tick_ms))?;
        positive("vision.intensity_max", i64::from(self.vision.intensity_max))?;
        positive("vision.angle_max", i64::from(self.vision.angle_max))?;
        positive(
            "forward.adjustment_steps",
            i64::from(self.forward.adjustment_steps),
        )?;
        if g.countdown_ms < 5 {
            return Err(TuningError::CountdownTooShort(g.countdown_ms));
        }
        if !(0..=100).contains(&self.retreat.trailing_percent) {
            return Err(TuningError::PercentOutOfRange {
                field: "retreat.trailing_percent",
                value: self.retreat.trailing_percent,
            });
        }
        if self.circle.adjust_inner_max < 0 {
            return Err(TuningError::NonPositive {
                field: "circle.adjust_inner_max",
                value: i64::from(self.circle.adjust_inner_max),
            });
        }
        if self.circle.adjust_inner_max > g.max_speed {
            return Err(TuningError::SpeedOutOfRange {
                field: "circle.adjust_inner_max",
                value: self.circle.adjust_inner_max,
                max: g.max_speed,
            });
        }

        for (field, value) in self.speeds() {
            if value.abs() > g.max_speed {
                return Err(TuningError::SpeedOutOfRange {
                    field,
                    value,
                    max: g.max_speed,
                });
            }
        }
        Ok(())
    }

    /// 所有直接下发到电机的速度字段
    fn speeds(&self) -> [(&'static str, i32); 25] {
        let (s, b, c, f, r) = (
            &self.seek,
            &self.back,
            &self.circle,
            &self.forward,
            &self.retreat,
        );
        [
            ("seek.move_speed", s.move_speed),
            ("seek.turn_speed", s.turn_speed),
            ("back.turn1.outer", b.turn1.outer),
            ("back.turn1.inner", b.turn1.inner),
            ("back.turn2_speed", b.turn2_speed),
            ("back.move_speed", b.move_speed),
            ("back.turn3_speed", b.turn3_speed),
            ("circle.find_border.outer", c.find_border.outer),
            ("circle.find_border.inner", c.find_border.inner),
            ("circle.find_border_slow_left.outer", c.find_border_slow_left.outer),
            ("circle.find_border_slow_left.inner", c.find_border_slow_left.inner),
            ("circle.find_border_slow_right.outer", c.find_border_slow_right.outer),
            ("circle.find_border_slow_right.inner", c.find_border_slow_right.inner),
            ("circle.outer_speed", c.outer_speed),
            ("circle.inner_speed_left", c.inner_speed_left),
            ("circle.inner_speed_right", c.inner_speed_right),
            ("circle.spiral.outer", c.spiral.outer),
            ("circle.spiral.inner", c.spiral.inner),
            ("forward.speed", f.speed),
            ("forward.turn.outer", f.turn.outer),
            ("forward.turn.inner", f.turn.inner),
            ("retreat.pre_move_speed", r.pre_move_speed),
            ("retreat.turn.outer", r.turn.outer),
            ("retreat.turn.inner", r.turn.inner),
            ("retreat.move_speed", r.move_speed),
        ]
    }
}

fn positive(field: &'static str, value: i64) -> Result<(), TuningError> {
    if value > 0 {
        Ok(())
    } else {
        Err(TuningError::NonPositive { field, value })
    }
}

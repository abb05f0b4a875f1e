//! 传感器快照定义

use std::time::Instant;

/// 传感器快照
///
/// 外部传感器源每个采样周期（典型 10ms）产生一份，只被当前活动阶段消费一次。
///
/// # 字段约定
///
/// - `elapsed_millis`: 自运行开始的毫秒数，是决策层唯一的时间来源
/// - `corner_*_out`: 角落反射传感器是否已经越过场地边界（读数超过阈值）
/// - `corner_*_value`: 角落传感器原始模拟读数（0-100）
/// - `vision_intensity`: 视觉目标强度（0-100）
/// - `vision_angle`: 视觉目标方位（-100 ~ 100，负值偏左）
///
/// `captured_at` 仅用于诊断（测量采样延迟），不参与任何决策计算，
/// 也不参与录制序列化。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorSnapshot {
    /// 采样时刻（单调时钟）
    #[cfg_attr(feature = "serde", serde(skip))]
    pub captured_at: Option<Instant>,
    /// 自运行开始的毫秒数
    pub elapsed_millis: i64,
    /// 左前角越界
    pub corner_left_out: bool,
    /// 右前角越界
    pub corner_right_out: bool,
    /// 左前角模拟读数
    pub corner_left_value: i32,
    /// 右前角模拟读数
    pub corner_right_value: i32,
    /// 视觉强度（0-100）
    pub vision_intensity: i32,
    /// 视觉方位（-100 ~ 100）
    pub vision_angle: i32,
}

impl SensorSnapshot {
    /// 创建一份只有时间戳的快照（所有读数为"场内、无目标"）
    pub fn at(elapsed_millis: i64) -> Self {
        Self {
            elapsed_millis,
            ..Self::default()
        }
    }

    /// 设置角落越界标志
    pub fn with_corners(mut self, left_out: bool, right_out: bool) -> Self {
        self.corner_left_out = left_out;
        self.corner_right_out = right_out;
        self
    }

    /// 设置角落模拟读数
    pub fn with_corner_values(mut self, left: i32, right: i32) -> Self {
        self.corner_left_value = left;
        self.corner_right_value = right;
        self
    }

    /// 设置视觉读数
    pub fn with_vision(mut self, intensity: i32, angle: i32) -> Self {
        self.vision_intensity = intensity;
        self.vision_angle = angle;
        self
    }

    /// 记录采样时刻
    pub fn captured_now(mut self) -> Self {
        self.captured_at = Some(Instant::now());
        self
    }

    /// 是否有任一角落越界
    #[inline]
    pub fn any_corner_out(&self) -> bool {
        self.corner_left_out || self.corner_right_out
    }
}

//! 电机/LED 命令定义

/// LED 亮度上限
pub const LED_MAX: u8 = 255;

/// 电机与 LED 命令
///
/// 整个运行期间只有一份，由当前活动阶段原地更新，每次更新后交给命令接收端。
/// 速度单位是电机占空比的万分比（±10000 为满速），LED 亮度为 0-255。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Command {
    /// 命令对应的快照时间（毫秒）
    pub millis: i64,
    /// 左轮速度
    pub speed_left: i32,
    /// 右轮速度
    pub speed_right: i32,
    /// 左侧红灯
    pub led_left_red: u8,
    /// 左侧绿灯
    pub led_left_green: u8,
    /// 右侧红灯
    pub led_right_red: u8,
    /// 右侧绿灯
    pub led_right_green: u8,
}

impl Command {
    /// 中性命令：零速度，LED 全灭
    pub fn neutral(millis: i64) -> Self {
        Self {
            millis,
            ..Self::default()
        }
    }

    /// 是否处于静止状态
    #[inline]
    pub fn is_stationary(&self) -> bool {
        self.speed_left == 0 && self.speed_right == 0
    }

    /// 是否所有 LED 都熄灭
    #[inline]
    pub fn leds_off(&self) -> bool {
        self.led_left_red == 0
            && self.led_left_green == 0
            && self.led_right_red == 0
            && self.led_right_green == 0
    }

    /// 按 (左绿, 右绿, 左红, 右红) 顺序返回 LED 值
    pub fn leds(&self) -> (u8, u8, u8, u8) {
        (
            self.led_left_green,
            self.led_right_green,
            self.led_left_red,
            self.led_right_red,
        )
    }
}

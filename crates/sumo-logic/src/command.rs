//! 共享命令模型
//!
//! 整个运行期间只有一份 [`Command`]，由 [`CommandState`] 持有。
//! 只有当前活动阶段通过 `&mut CommandState` 写入；阶段切换时由引擎
//! 重置为中性，新阶段在同一快照上重新计算全部字段。

use sumo_protocol::{Command, LED_MAX, SensorSnapshot};
use sumo_tools::VisionTuning;

/// 共享命令记录
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandState {
    current: Command,
}

impl CommandState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前命令
    #[inline]
    pub fn current(&self) -> &Command {
        &self.current
    }

    /// 记录命令对应的快照时间
    #[inline]
    pub fn handle_time(&mut self, snapshot: &SensorSnapshot) {
        self.current.millis = snapshot.elapsed_millis;
    }

    pub(crate) fn set_millis(&mut self, millis: i64) {
        self.current.millis = millis;
    }

    /// 设置左右轮速度
    #[inline]
    pub fn speed(&mut self, left: i32, right: i32) {
        self.current.speed_left = left;
        self.current.speed_right = right;
    }

    /// 设置四个 LED，超出 0-255 的值会被截断
    pub fn leds(&mut self, left_green: i32, right_green: i32, left_red: i32, right_red: i32) {
        self.current.led_left_green = clamp_led(i64::from(left_green));
        self.current.led_right_green = clamp_led(i64::from(right_green));
        self.current.led_left_red = clamp_led(i64::from(left_red));
        self.current.led_right_red = clamp_led(i64::from(right_red));
    }

    /// 重置为中性：零速度，LED 全灭（保留时间）
    pub fn neutral(&mut self) {
        self.current = Command::neutral(self.current.millis);
    }

    /// 按传感器数据点亮 LED
    ///
    /// 绿灯编码视觉方位偏向：
    /// `左绿 = 255·I·(M−a) / (2·Imax·M)`，右绿把 `a` 取反。
    /// 红灯表示对应角落越界。
    pub fn leds_from_data(&mut self, snapshot: &SensorSnapshot, vision: &VisionTuning) {
        let intensity = i64::from(snapshot.vision_intensity);
        let angle = i64::from(snapshot.vision_angle);
        let angle_max = i64::from(vision.angle_max);
        let denominator = 2 * i64::from(vision.intensity_max) * angle_max;

        let glow = |bias: i64| {
            if denominator <= 0 {
                return 0;
            }
            clamp_led(i64::from(LED_MAX) * intensity * bias / denominator)
        };

        self.current.led_left_green = glow(angle_max - angle);
        self.current.led_right_green = glow(angle_max + angle);
        self.current.led_left_red = if snapshot.corner_left_out { LED_MAX } else { 0 };
        self.current.led_right_red = if snapshot.corner_right_out { LED_MAX } else { 0 };
    }
}

#[inline]
fn clamp_led(value: i64) -> u8 {
    value.clamp(0, i64::from(LED_MAX)) as u8
}

//! 边界/视觉触发判定
//!
//! 每个运动阶段在每个采样周期先判定视觉触发，再判定边界触发，
//! 最后才检查时长。触发优先于时长到期。

use crate::phase::Phase;
use sumo_protocol::{Direction, SensorSnapshot};
use sumo_tools::Tuning;

/// 角落模拟读数是否表示越界
///
/// 读数严格大于阈值视为越界（场外反射弱，读数高）。
#[inline]
pub fn corner_is_out(value: i32, threshold: i32) -> bool {
    value > threshold
}

/// 边界触发
///
/// 任一角落越界时返回后退方向，让机器人转离危险一侧：
///
/// | 左越界 | 右越界 | 后退方向 |
/// |---|---|---|
/// | ✓ | | `Right` |
/// | | ✓ | `Left` |
/// | ✓ | ✓ | `None` |
pub fn check_border(snapshot: &SensorSnapshot) -> Option<Direction> {
    match (snapshot.corner_left_out, snapshot.corner_right_out) {
        (false, false) => None,
        (true, false) => Some(Direction::Right),
        (false, true) => Some(Direction::Left),
        (true, true) => Some(Direction::None),
    }
}

/// 视觉触发
///
/// 预留的扩展点：返回要切入的阶段。当前配置下从不触发。
pub fn check_vision(_snapshot: &SensorSnapshot, _tuning: &Tuning) -> Option<Phase> {
    None
}

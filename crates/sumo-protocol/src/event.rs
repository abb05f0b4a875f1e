//! 统一输入事件
//!
//! 决策层只有两个输入源：传感器快照和按键事件。录制与回放时把两者按到达顺序
//! 合并成一个序列。

use crate::{KeyEvent, SensorSnapshot};

/// 输入事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InputEvent {
    /// 传感器快照
    Sensor(SensorSnapshot),
    /// 按键事件
    Key(KeyEvent),
}

impl InputEvent {
    /// 事件时间（毫秒）
    pub fn millis(&self) -> i64 {
        match self {
            InputEvent::Sensor(s) => s.elapsed_millis,
            InputEvent::Key(k) => k.millis,
        }
    }
}

impl From<SensorSnapshot> for InputEvent {
    fn from(snapshot: SensorSnapshot) -> Self {
        InputEvent::Sensor(snapshot)
    }
}

impl From<KeyEvent> for InputEvent {
    fn from(key: KeyEvent) -> Self {
        InputEvent::Key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Key;

    #[test]
    fn test_event_millis() {
        let s: InputEvent = SensorSnapshot::at(30).into();
        let k: InputEvent = KeyEvent::new(45, Key::Up).into();
        assert_eq!(s.millis(), 30);
        assert_eq!(k.millis(), 45);
    }
}

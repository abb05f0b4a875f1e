//! # Sumo Protocol
//!
//! 相扑机器人决策层的数据模型（无硬件依赖）
//!
//! ## 模块
//!
//! - `sensor`: 传感器快照（每个采样周期一份，不可变）
//! - `command`: 电机/LED 命令记录
//! - `key`: 按键事件与按键名解析
//! - `direction`: 转向方向及其镜像规则
//! - `event`: 统一输入事件（传感器 + 按键），用于录制和回放
//!
//! ## 时间基准
//!
//! 所有时间字段都是"自运行开始的毫秒数"，由外部传感器源统一给出。
//! 决策层内部从不读取墙钟时间，保证同一输入序列的输出完全可复现。

pub mod command;
pub mod direction;
pub mod event;
pub mod key;
pub mod sensor;

pub use command::{Command, LED_MAX};
pub use direction::Direction;
pub use event::InputEvent;
pub use key::{Key, KeyEvent};
pub use sensor::SensorSnapshot;

use thiserror::Error;

/// 协议层错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// 无法识别的按键名
    #[error("Unknown key name: {0:?}")]
    UnknownKey(String),

    /// 无法识别的方向名
    #[error("Unknown direction name: {0:?}")]
    UnknownDirection(String),
}

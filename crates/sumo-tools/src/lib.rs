//! # Sumo Tools - 共享配置与录制格式
//!
//! **依赖原则**: 只依赖 `sumo-protocol`，避免依赖 `sumo-logic`
//!
//! ## 包含模块
//!
//! - `tuning` - 所有速度、时长、阈值参数（TOML 配置文件）
//! - `recording` - 运行录制格式（输入事件 + 输出命令）

pub mod recording;
pub mod tuning;

// 重新导出常用类型
pub use recording::{MAGIC, RecordingMetadata, RunRecording};
pub use tuning::{
    BackOffTuning, CircleTuning, ForwardTuning, GeneralTuning, RetreatTuning, SeekTuning,
    SpeedPair, Tuning, TuningError, VisionTuning,
};

//! # 运行录制格式
//!
//! 一次运行的完整输入（传感器快照 + 按键事件，按到达顺序）和全部输出命令。
//! 决策层是确定性的：用录制的调参配置重放同一输入序列，必须得到同一命令序列。

use crate::tuning::Tuning;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use sumo_protocol::{Command, InputEvent, KeyEvent};

/// 录制文件魔数（用于文件格式识别）
pub const MAGIC: &[u8; 8] = b"SUMOREC\0";

/// 当前格式版本
const VERSION: u8 = 1;

/// 运行录制 v1
///
/// 格式：
///
/// ```text
/// [MAGIC: 8 bytes]
/// [Version: 1 byte]
/// [Data: bincode serialized RunRecording]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecording {
    /// 格式版本
    pub version: u8,

    /// 元数据
    pub metadata: RecordingMetadata,

    /// 运行时使用的调参配置
    pub tuning: Tuning,

    /// 输入事件（按处理顺序）
    pub inputs: Vec<InputEvent>,

    /// 输出命令（按发送顺序）
    pub commands: Vec<Command>,
}

impl RunRecording {
    /// 创建新的录制
    pub fn new(metadata: RecordingMetadata, tuning: Tuning) -> Self {
        Self {
            version: VERSION,
            metadata,
            tuning,
            inputs: Vec::new(),
            commands: Vec::new(),
        }
    }

    /// 追加输入事件
    pub fn push_input(&mut self, event: InputEvent) {
        self.inputs.push(event);
    }

    /// 追加输出命令
    pub fn push_command(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    /// 录制覆盖的时间跨度（毫秒）
    pub fn duration_millis(&self) -> Option<i64> {
        let first = self.inputs.first()?.millis();
        let last = self.inputs.last()?.millis();
        Some(last - first)
    }

    /// 录制中的按键事件
    pub fn key_events(&self) -> impl Iterator<Item = &KeyEvent> {
        self.inputs.iter().filter_map(|event| match event {
            InputEvent::Key(key) => Some(key),
            InputEvent::Sensor(_) => None,
        })
    }

    /// 保存到文件
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref()).context("创建录制文件失败")?;

        let mut writer = BufWriter::new(file);

        writer.write_all(MAGIC).context("写入魔数失败")?;
        writer.write_all(&[self.version]).context("写入版本失败")?;

        let data = bincode::serialize(self).context("序列化录制失败")?;
        writer.write_all(&data).context("写入录制数据失败")?;

        writer.flush().context("刷新缓冲区失败")?;

        Ok(())
    }

    /// 从文件加载
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref()).context("打开录制文件失败")?;

        let mut reader = BufReader::new(file);

        // 读取并验证魔数
        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic).context("读取魔数失败")?;

        if &magic != MAGIC {
            anyhow::bail!("无效的录制文件格式（魔数不匹配）");
        }

        let mut version = [0u8; 1];
        reader.read_exact(&mut version).context("读取版本失败")?;

        if version[0] != VERSION {
            anyhow::bail!("不支持的录制文件版本: {}", version[0]);
        }

        let mut data = Vec::new();
        reader.read_to_end(&mut data).context("读取录制数据失败")?;

        let recording: RunRecording = bincode::deserialize(&data).context("反序列化录制失败")?;

        Ok(recording)
    }
}

/// 录制元数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    /// 录制开始时间（Unix 时间戳，秒）
    pub start_time: u64,

    /// 输入来源（如 "sim"）
    pub source: String,

    /// 平台信息
    pub platform: String,

    /// 备注
    pub notes: String,
}

impl RecordingMetadata {
    /// 创建新的元数据
    pub fn new(source: impl Into<String>) -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};

        Self {
            start_time: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            source: source.into(),
            platform: std::env::consts::OS.to_string(),
            notes: String::new(),
        }
    }
}

//! replay 命令
//!
//! 用录制中的调参配置重放输入序列，逐条对比输出命令。

use anyhow::{Context, Result};
use clap::Args;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use sumo_logic::{Emission, PhaseEngine, commands_of, replay_events};
use sumo_protocol::Command;
use sumo_tools::RunRecording;
use tracing::info;

/// 回放命令参数
#[derive(Args, Debug)]
pub struct ReplayCommand {
    /// 录制文件路径
    pub input: PathBuf,

    /// 把重放得到的命令导出为 JSON Lines
    #[arg(long)]
    pub dump: Option<PathBuf>,
}

/// 两个命令序列的第一处分歧
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Divergence {
    pub index: usize,
    pub recorded: Option<Command>,
    pub replayed: Option<Command>,
}

/// 找出第一处分歧（长度不同也算分歧）
pub fn first_divergence(recorded: &[Command], replayed: &[Command]) -> Option<Divergence> {
    let len = recorded.len().max(replayed.len());
    (0..len)
        .find(|&i| recorded.get(i) != replayed.get(i))
        .map(|index| Divergence {
            index,
            recorded: recorded.get(index).copied(),
            replayed: replayed.get(index).copied(),
        })
}

impl ReplayCommand {
    pub fn execute(&self) -> Result<()> {
        if !self.input.exists() {
            anyhow::bail!("❌ 录制文件不存在: {}", self.input.display());
        }

        let recording = RunRecording::load(&self.input)?;

        println!("════════════════════════════════════════");
        println!("           回放校验");
        println!("════════════════════════════════════════");
        println!();
        println!("📁 文件: {}", self.input.display());
        println!("🖥️  来源: {} ({})", recording.metadata.source, recording.metadata.platform);
        println!(
            "📦 {} 个输入 ({} 个按键), {} 条命令",
            recording.input_count(),
            recording.key_events().count(),
            recording.command_count()
        );
        if let Some(ms) = recording.duration_millis() {
            println!("⏱️  时长: {} ms", ms);
        }
        println!();

        let mut engine = PhaseEngine::new(recording.tuning.clone()).context("录制中的调参配置无效")?;
        let emissions = replay_events(&mut engine, recording.inputs.iter().copied());
        let replayed = commands_of(&emissions);

        info!(
            "Replayed {} inputs into {} commands",
            recording.input_count(),
            replayed.len()
        );

        if let Some(path) = &self.dump {
            dump_commands(path, &replayed)?;
            println!("💾 已导出 {} 条命令: {}", replayed.len(), path.display());
        }

        match emissions.last() {
            Some(Emission::Stop(reason)) => println!("🏁 引擎终止: {}", reason),
            _ => println!("🏁 最后阶段: {}", engine.phase().kind()),
        }

        match first_divergence(&recording.commands, &replayed) {
            None => {
                println!("✅ 回放一致: {} 条命令完全相同", replayed.len());
                Ok(())
            },
            Some(d) => {
                println!("❌ 第 {} 条命令出现分歧", d.index);
                println!("  录制: {:?}", d.recorded);
                println!("  回放: {:?}", d.replayed);
                anyhow::bail!(
                    "回放与录制不一致（录制 {} 条，回放 {} 条）",
                    recording.command_count(),
                    replayed.len()
                )
            },
        }
    }
}

fn dump_commands(path: &Path, commands: &[Command]) -> Result<()> {
    let file = File::create(path).context("创建导出文件失败")?;
    let mut writer = BufWriter::new(file);
    for command in commands {
        serde_json::to_writer(&mut writer, command).context("序列化命令失败")?;
        writer.write_all(b"\n").context("写入导出文件失败")?;
    }
    writer.flush().context("刷新缓冲区失败")?;
    Ok(())
}

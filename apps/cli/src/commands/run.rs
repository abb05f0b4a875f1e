//! run 命令
//!
//! 在仿真场地上运行阶段引擎：
//!
//! ```text
//! stdin / Ctrl-C / 预选 ──► 按键通道 ──┐
//!                                      ├──► run_loop ──► 命令通道 ──► 仿真场地
//! 仿真场地 ──────────────► 传感器通道 ──┘                                │
//!     ▲                                                                  │
//!     └──────────────────────────────────────────────────────────────────┘
//! ```

use crate::clock::RunClock;
use crate::commands::config::resolve_tuning;
use crate::input::{inject_keys, install_ctrlc, preselect_keys, spawn_stdin_keys};
use crate::progress::{REPORT_INTERVAL, spawn_progress};
use crate::sim::{SimConfig, spawn_arena};
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;
use sumo_logic::recording::drain_into;
use sumo_logic::{
    AbortSignal, ChannelSink, HookSet, PhaseEngine, RecordingHook, RunOutcome, Strategy,
    run_loop,
};
use sumo_protocol::{Command, Direction, KeyEvent, SensorSnapshot};
use sumo_tools::{RecordingMetadata, RunRecording};
use tracing::{info, warn};

/// 命令通道容量（仿真只取最新命令）
const COMMAND_QUEUE: usize = 64;
/// 传感器通道容量
const SENSOR_QUEUE: usize = 64;

/// 预选策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    Seek,
    Forward,
    Retreat,
    Circle,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Seek => Strategy::Seek,
            StrategyArg::Forward => Strategy::GoForward,
            StrategyArg::Retreat => Strategy::Retreat,
            StrategyArg::Circle => Strategy::Circle,
        }
    }
}

/// 运行命令参数
#[derive(Args, Debug)]
pub struct RunCommand {
    /// 调参配置文件（默认 <config_dir>/sumo/tuning.toml）
    #[arg(short, long)]
    pub tuning: Option<PathBuf>,

    /// 录制输出文件
    #[arg(short, long)]
    pub record: Option<PathBuf>,

    /// 预选策略（通过注入按键完成选择）
    #[arg(short, long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// 预选方向
    #[arg(short, long, default_value = "left")]
    pub dir: Direction,

    /// 前冲偏置级数（仅 forward 策略）
    #[arg(short, long, default_value_t = 0)]
    pub adjust: u32,

    /// 预选后立即提交并开始倒计时
    #[arg(long)]
    pub auto_start: bool,

    /// 仿真时长上限（毫秒），到达后关闭传感器源
    #[arg(long)]
    pub duration_ms: Option<u64>,

    /// 不读取 stdin 按键
    #[arg(long)]
    pub no_stdin: bool,
}

impl RunCommand {
    pub fn execute(&self) -> Result<()> {
        // === 1. 参数与配置 ===

        if self.auto_start && self.strategy.is_none() {
            anyhow::bail!("❌ --auto-start 需要同时指定 --strategy");
        }
        if self.adjust > 0 && self.strategy != Some(StrategyArg::Forward) {
            anyhow::bail!("❌ --adjust 只适用于 forward 策略");
        }
        if self.dir == Direction::None {
            anyhow::bail!("❌ 方向必须是 left 或 right");
        }

        let (tuning, source) = resolve_tuning(self.tuning.as_deref())?;
        if self.adjust > tuning.forward.adjustment_steps {
            anyhow::bail!(
                "❌ 偏置级数超出范围: {} > {}",
                self.adjust,
                tuning.forward.adjustment_steps
            );
        }
        let mut engine = PhaseEngine::new(tuning.clone()).context("调参配置无效")?;

        println!("════════════════════════════════════════");
        println!("           相扑机器人 · 仿真运行");
        println!("════════════════════════════════════════");
        println!();
        match &source {
            Some(path) => println!("⚙️  配置: {}", path.display()),
            None => println!("⚙️  配置: 内置默认值"),
        }
        println!("⏱️  采样周期: {} ms", tuning.general.tick_ms);
        if let Some(ms) = self.duration_ms {
            println!("⏳ 仿真时长: {} ms", ms);
        }
        if !self.no_stdin {
            println!("⌨️  按键: w/a/s/d 方向, 回车 确认, q 退出");
        }
        println!();

        // === 2. 通道与终止信号 ===

        let clock = RunClock::start();
        let abort = AbortSignal::new();
        let (sensor_tx, sensor_rx) = crossbeam_channel::bounded::<SensorSnapshot>(SENSOR_QUEUE);
        let (command_tx, command_rx) = crossbeam_channel::bounded::<Command>(COMMAND_QUEUE);
        let (key_tx, key_rx) = crossbeam_channel::unbounded::<KeyEvent>();

        install_ctrlc(clock, key_tx.clone())?;

        if let Some(strategy) = self.strategy {
            let sequence = preselect_keys(strategy.into(), self.dir, self.adjust, self.auto_start);
            info!("Preselecting {:?} {} with {} keys", strategy, self.dir, sequence.len());
            inject_keys(&clock, &key_tx, &sequence)?;
        }

        if !self.no_stdin {
            spawn_stdin_keys(clock, key_tx.clone());
        }
        // 只保留 stdin 线程和 Ctrl-C 处理器持有的发送端
        drop(key_tx);

        // === 3. 录制 ===

        let mut hooks = HookSet::new();
        let recorder = match &self.record {
            Some(_) => {
                let (hook, rx) = RecordingHook::new();
                let dropped = Arc::clone(hook.dropped());
                hooks.add(Arc::new(hook));

                let mut recording =
                    RunRecording::new(RecordingMetadata::new("sim"), tuning.clone());
                let handle = thread::spawn(move || {
                    drain_into(&rx, &mut recording);
                    recording
                });
                Some((handle, dropped))
            },
            None => None,
        };

        // === 4. 仿真场地 ===

        let arena = spawn_arena(
            SimConfig {
                tick: Duration::from_millis(u64::from(tuning.general.tick_ms)),
                corner_threshold: tuning.general.corner_out_threshold,
                max_speed: tuning.general.max_speed,
                duration: self.duration_ms.map(Duration::from_millis),
            },
            clock,
            command_rx,
            sensor_tx,
            abort.clone(),
        );

        // === 5. 运行循环 ===

        let progress = spawn_progress(engine.metrics_handle(), abort.clone(), REPORT_INTERVAL);

        let mut sink = ChannelSink::new(command_tx);
        let outcome = run_loop(&mut engine, &sensor_rx, &key_rx, &mut sink, &hooks, &abort);
        abort.raise(outcome.reason);
        let _ = progress.join();

        let stats = arena
            .join()
            .map_err(|_| anyhow::anyhow!("仿真线程异常退出"))?;

        // 释放钩子后录制线程读完队列
        drop(hooks);

        print_summary(&outcome, sink.dropped());
        println!(
            "🏟️  仿真: {} 个周期, {} 次超时, {} 个周期车体出界",
            stats.ticks, stats.overruns, stats.ticks_outside
        );

        // === 6. 保存录制 ===

        if let (Some(path), Some((handle, dropped))) = (&self.record, recorder) {
            let recording = handle
                .join()
                .map_err(|_| anyhow::anyhow!("录制线程异常退出"))?;
            recording.save(path)?;

            let dropped = dropped.load(Ordering::Relaxed);
            if dropped > 0 {
                warn!("Recording dropped {} items, replay will diverge", dropped);
                println!("⚠️  录制丢弃 {} 项，回放结果将不一致", dropped);
            }
            println!(
                "💾 录制已保存: {} ({} 个输入, {} 条命令)",
                path.display(),
                recording.input_count(),
                recording.command_count()
            );
        }

        Ok(())
    }
}

fn print_summary(outcome: &RunOutcome, sink_dropped: u64) {
    let m = &outcome.metrics;

    println!();
    println!("🏁 运行结束: {}（最后阶段 {}）", outcome.reason, outcome.last_phase);
    println!("📊 指标:");
    println!("  快照: {}", m.snapshots_total);
    println!("  按键: {}", m.keys_total);
    println!("  命令: {}", m.commands_total);
    println!(
        "  阶段切换: {} ({:.3} 次/快照)",
        m.handoffs_total,
        m.handoffs_per_snapshot()
    );
    println!("  边界触发: {}", m.border_triggers);
    if m.handoff_overflows > 0 {
        println!("  ⚠️  切换超限: {}", m.handoff_overflows);
    }
    if sink_dropped > 0 {
        println!("  ⚠️  命令丢弃: {}", sink_dropped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_arg_mapping() {
        assert_eq!(Strategy::from(StrategyArg::Seek), Strategy::Seek);
        assert_eq!(Strategy::from(StrategyArg::Forward), Strategy::GoForward);
        assert_eq!(Strategy::from(StrategyArg::Retreat), Strategy::Retreat);
        assert_eq!(Strategy::from(StrategyArg::Circle), Strategy::Circle);
    }
}

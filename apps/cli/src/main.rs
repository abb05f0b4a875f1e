//! # Sumo CLI
//!
//! 相扑机器人阶段引擎的命令行工具。
//!
//! ```bash
//! # 写出默认调参配置
//! sumo-cli config init
//!
//! # 在仿真场地上运行，预选向右前冲并立即开始倒计时
//! sumo-cli run --strategy forward --dir right --auto-start --record run.bin
//!
//! # 校验录制的确定性
//! sumo-cli replay run.bin
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod clock;
mod commands;
mod input;
mod progress;
mod sim;

use commands::{ConfigCommand, ReplayCommand, RunCommand};

/// Sumo CLI - 相扑机器人命令行工具
#[derive(Parser, Debug)]
#[command(name = "sumo-cli")]
#[command(about = "Command-line runner for the sumo bot phase engine", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 调参配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 在仿真场地上运行
    Run {
        #[command(flatten)]
        args: RunCommand,
    },

    /// 重放录制并校验命令序列
    Replay {
        #[command(flatten)]
        args: ReplayCommand,
    },
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sumo_cli=info".parse()?)
                .add_directive("sumo_logic=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config(cmd) => cmd.execute(),

        Commands::Run { args } => args.execute(),

        Commands::Replay { args } => args.execute(),
    }
}

//! 配置管理命令
//!
//! 调参配置默认位于 `<config_dir>/sumo/tuning.toml`。

use anyhow::{Context, Result};
use clap::Subcommand;
use std::fs;
use std::path::{Path, PathBuf};
use sumo_tools::Tuning;
use tracing::debug;

/// 默认调参配置路径
pub fn default_tuning_path() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;

    path.push("sumo");
    path.push("tuning.toml");
    Ok(path)
}

/// 解析运行使用的调参配置
///
/// 显式路径必须存在；否则读取默认路径，默认路径不存在时使用内置默认值。
/// 返回 (配置, 来源路径)。
pub fn resolve_tuning(explicit: Option<&Path>) -> Result<(Tuning, Option<PathBuf>)> {
    if let Some(path) = explicit {
        let tuning = Tuning::load_from_file(path)?;
        return Ok((tuning, Some(path.to_path_buf())));
    }

    match default_tuning_path() {
        Ok(path) if path.exists() => {
            let tuning = Tuning::load_from_file(&path)?;
            Ok((tuning, Some(path)))
        },
        Ok(path) => {
            debug!("No tuning file at {}, using defaults", path.display());
            Ok((Tuning::default(), None))
        },
        Err(e) => {
            debug!("Config dir unavailable ({}), using defaults", e);
            Ok((Tuning::default(), None))
        },
    }
}

fn target_path(file: Option<PathBuf>) -> Result<PathBuf> {
    match file {
        Some(path) => Ok(path),
        None => default_tuning_path(),
    }
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 显示生效的调参配置（TOML）
    Show {
        /// 配置文件路径（默认 <config_dir>/sumo/tuning.toml）
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// 写出默认调参配置
    Init {
        /// 配置文件路径（默认 <config_dir>/sumo/tuning.toml）
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// 覆盖已存在的文件
        #[arg(long)]
        force: bool,
    },

    /// 校验调参配置
    Check {
        /// 配置文件路径（默认 <config_dir>/sumo/tuning.toml）
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// 打印默认配置路径
    Path,
}

impl ConfigCommand {
    pub fn execute(self) -> Result<()> {
        match self {
            ConfigCommand::Show { file } => Self::show_(file),

            ConfigCommand::Init { file, force } => Self::init_(file, force),

            ConfigCommand::Check { file } => Self::check_(file),

            ConfigCommand::Path => {
                println!("{}", default_tuning_path()?.display());
                Ok(())
            },
        }
    }

    fn show_(file: Option<PathBuf>) -> Result<()> {
        let path = target_path(file)?;

        let tuning = if path.exists() {
            println!("# 配置文件: {}", path.display());
            Tuning::load_from_file(&path)?
        } else {
            println!("# 配置文件不存在: {}（显示默认值）", path.display());
            Tuning::default()
        };

        print!("{}", tuning.to_toml_string()?);
        Ok(())
    }

    fn init_(file: Option<PathBuf>, force: bool) -> Result<()> {
        let path = target_path(file)?;

        if path.exists() && !force {
            anyhow::bail!(
                "❌ 配置文件已存在: {}（使用 --force 覆盖）",
                path.display()
            );
        }

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).context("创建配置目录失败")?;
        }

        Tuning::default().save_to_file(&path)?;
        println!("✅ 已写入默认配置: {}", path.display());
        Ok(())
    }

    fn check_(file: Option<PathBuf>) -> Result<()> {
        let path = target_path(file)?;

        if !path.exists() {
            anyhow::bail!("❌ 配置文件不存在: {}", path.display());
        }

        let tuning = Tuning::load_from_file(&path)?;
        let g = &tuning.general;

        println!("✅ 配置有效: {}", path.display());
        println!("  满速: {}", g.max_speed);
        println!("  采样周期: {} ms", g.tick_ms);
        println!("  倒计时: {} ms", g.countdown_ms);
        println!("  越界阈值: {}", g.corner_out_threshold);
        if g.match_limit_ms == 0 {
            println!("  比赛时长: 不限");
        } else {
            println!("  比赛时长: {} ms", g.match_limit_ms);
        }
        Ok(())
    }
}

//! 按键输入源
//!
//! 专用 stdin 线程逐行读取按键名，带上运行时钟的时间戳送入按键通道。
//! Ctrl-C 注入 `Quit`。预选参数在运行开始前被翻译成一串按键事件。

use crate::clock::RunClock;
use anyhow::{Context, Result};
use crossbeam_channel::Sender;
use std::io::BufRead;
use std::thread;
use sumo_logic::Strategy;
use sumo_protocol::{Direction, Key, KeyEvent};
use tracing::{debug, warn};

/// 启动 stdin 输入线程
///
/// 无法识别的按键名只给出提示，不终止输入。EOF 时线程退出，按键通道
/// 随之关闭（运行继续，只是不再接收按键）。
pub fn spawn_stdin_keys(clock: RunClock, keys: Sender<KeyEvent>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("stdin read failed: {}", e);
                    break;
                },
            };
            match line.parse::<Key>() {
                Ok(key) => {
                    let event = KeyEvent::new(clock.millis(), key);
                    debug!("stdin key {} at {} ms", key, event.millis);
                    if keys.send(event).is_err() {
                        break;
                    }
                    if key.is_abort() {
                        break;
                    }
                },
                Err(e) => {
                    eprintln!("⚠️  {} (可用: w/a/s/d, enter, b, q)", e);
                },
            }
        }
        debug!("stdin key thread exiting");
    })
}

/// 注册 Ctrl-C 处理器：注入 `Quit`
pub fn install_ctrlc(clock: RunClock, keys: Sender<KeyEvent>) -> Result<()> {
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("🛑 收到 Ctrl-C，正在停止...");
        let _ = keys.try_send(KeyEvent::new(clock.millis(), Key::Quit));
    })
    .context("注册 Ctrl-C 处理器失败")
}

/// 把策略预选翻译成选择阶段的按键序列
///
/// 序列从 `Idle` 开始：`Enter` 进入选择（向左搜索、偏置 0），末尾的
/// `Enter` 提交（仅当 `commit` 为真）。
pub fn preselect_keys(
    strategy: Strategy,
    dir: Direction,
    adjust: u32,
    commit: bool,
) -> Vec<Key> {
    let mut keys = vec![Key::Enter];

    let side = if dir == Direction::Right {
        // Right 选中向右前冲（偏置 1），Up 三次回到向右搜索且偏置清零
        keys.extend([Key::Right, Key::Up, Key::Up, Key::Up]);
        Key::Right
    } else {
        Key::Left
    };

    match strategy {
        Strategy::Seek => {},
        Strategy::GoForward if adjust == 0 => keys.push(Key::Up),
        Strategy::GoForward => keys.extend(std::iter::repeat_n(side, adjust as usize)),
        Strategy::Retreat => keys.push(Key::Down),
        Strategy::Circle => keys.extend([Key::Down, Key::Down]),
    }

    if commit {
        keys.push(Key::Enter);
    }
    keys
}

/// 按顺序发送预选按键（都使用当前时间戳）
pub fn inject_keys(clock: &RunClock, keys: &Sender<KeyEvent>, sequence: &[Key]) -> Result<()> {
    for key in sequence {
        keys.send(KeyEvent::new(clock.millis(), *key))
            .context("按键通道已关闭")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sumo_logic::{Phase, PhaseEngine, Plan};
    use sumo_tools::Tuning;

    /// 在引擎上执行按键序列，返回提交的计划
    fn committed(keys: &[Key]) -> Plan {
        let mut engine = PhaseEngine::new(Tuning::default()).unwrap();
        for (i, key) in keys.iter().enumerate() {
            engine.on_key(&KeyEvent::new(i as i64, *key));
        }
        match engine.phase() {
            Phase::ArmedCountdown { plan, .. } => *plan,
            other => panic!("not armed: {:?}", other),
        }
    }

    #[test]
    fn test_preselect_every_strategy_and_direction() {
        let strategies = [
            Strategy::Seek,
            Strategy::GoForward,
            Strategy::Retreat,
            Strategy::Circle,
        ];
        for strategy in strategies {
            for dir in [Direction::Left, Direction::Right] {
                let plan = committed(&preselect_keys(strategy, dir, 0, true));
                assert_eq!(plan.strategy, strategy, "{:?} {:?}", strategy, dir);
                assert_eq!(plan.dir, dir, "{:?} {:?}", strategy, dir);
                assert_eq!(plan.adjust, 0);
            }
        }
    }

    #[test]
    fn test_preselect_forward_adjust() {
        let plan = committed(&preselect_keys(Strategy::GoForward, Direction::Right, 3, true));
        assert_eq!(plan.strategy, Strategy::GoForward);
        assert_eq!(plan.dir, Direction::Right);
        assert_eq!(plan.adjust, 3);
    }

    #[test]
    fn test_preselect_without_commit_stays_in_selection() {
        let keys = preselect_keys(Strategy::Retreat, Direction::Left, 0, false);
        assert_eq!(keys, vec![Key::Enter, Key::Down]);

        let mut engine = PhaseEngine::new(Tuning::default()).unwrap();
        for key in keys {
            engine.on_key(&KeyEvent::new(0, key));
        }
        assert!(matches!(engine.phase(), Phase::StrategySelect(_)));
    }

    #[test]
    fn test_inject_keys() {
        let (tx, rx) = crossbeam_channel::unbounded();
        inject_keys(&RunClock::start(), &tx, &[Key::Enter, Key::Up]).unwrap();
        let keys: Vec<_> = rx.try_iter().map(|e| e.key).collect();
        assert_eq!(keys, vec![Key::Enter, Key::Up]);
    }
}

//! 确定性测试
//!
//! 同一输入序列在两个全新引擎上必须得到同一输出序列，
//! 且每个快照（终止前）恰好输出一条命令。

use proptest::prelude::*;
use sumo_logic::{Emission, PhaseEngine, StopReason, commands_of, replay_events};
use sumo_protocol::{InputEvent, Key, KeyEvent, SensorSnapshot};
use sumo_tools::Tuning;

fn key_strategy() -> impl Strategy<Value = Key> {
    prop_oneof![
        8 => Just(Key::Enter),
        3 => Just(Key::Left),
        3 => Just(Key::Right),
        3 => Just(Key::Up),
        3 => Just(Key::Down),
        1 => Just(Key::Quit),
    ]
}

/// (时间步进, 左越界, 右越界, 左读数, 右读数, 强度, 方位) 或按键
fn events_strategy() -> impl Strategy<Value = Vec<InputEvent>> {
    let step = prop_oneof![
        6 => (
            prop_oneof![Just(10i64), Just(0i64), 1i64..400],
            prop::bool::weighted(0.05),
            prop::bool::weighted(0.05),
            0i32..100,
            0i32..100,
            0i32..=100,
            -100i32..=100,
        )
            .prop_map(|(dt, l, r, lv, rv, i, a)| (dt, Some((l, r, lv, rv, i, a)), None::<Key>)),
        1 => key_strategy().prop_map(|k| (0i64, None::<(bool, bool, i32, i32, i32, i32)>, Some(k))),
    ];

    prop::collection::vec(step, 1..400).prop_map(|steps| {
        let mut now = 0i64;
        steps
            .into_iter()
            .map(|(dt, snapshot, key)| -> InputEvent {
                now += dt;
                match (snapshot, key) {
                    (Some((l, r, lv, rv, i, a)), _) => SensorSnapshot::at(now)
                        .with_corners(l, r)
                        .with_corner_values(lv, rv)
                        .with_vision(i, a)
                        .into(),
                    (None, Some(key)) => KeyEvent::new(now, key).into(),
                    (None, None) => SensorSnapshot::at(now).into(),
                }
            })
            .collect::<Vec<_>>()
    })
}

fn short_tuning() -> Tuning {
    let mut tuning = Tuning::default();
    // 缩短倒计时，让随机序列能进入运动阶段
    tuning.general.countdown_ms = 50;
    tuning.general.match_limit_ms = 3_000;
    tuning
}

proptest! {
    #[test]
    fn test_replay_is_deterministic(events in events_strategy()) {
        let mut a = PhaseEngine::new(short_tuning()).unwrap();
        let mut b = PhaseEngine::new(short_tuning()).unwrap();

        let first = replay_events(&mut a, events.clone());
        let second = replay_events(&mut b, events);

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(a.phase(), b.phase());
        prop_assert_eq!(a.metrics(), b.metrics());
    }

    #[test]
    fn test_one_command_per_snapshot(events in events_strategy()) {
        let mut engine = PhaseEngine::new(short_tuning()).unwrap();
        let mut snapshots = 0u64;

        for event in &events {
            if engine.is_stopped() {
                break;
            }
            if let InputEvent::Sensor(snapshot) = event {
                snapshots += 1;
                let emissions = replay_events(&mut engine, [InputEvent::Sensor(*snapshot)]);
                prop_assert_eq!(emissions.len(), 1);
                if let Emission::Command(command) = emissions[0] {
                    prop_assert_eq!(command.millis, snapshot.elapsed_millis);
                }
            } else {
                replay_events(&mut engine, [*event]);
            }
        }

        prop_assert_eq!(engine.metrics().snapshots_total, snapshots);
        prop_assert_eq!(engine.metrics().handoff_overflows, 0);
    }

    #[test]
    fn test_stop_is_last_emission(events in events_strategy()) {
        let mut engine = PhaseEngine::new(short_tuning()).unwrap();
        let emissions = replay_events(&mut engine, events);

        let stops: Vec<_> = emissions
            .iter()
            .enumerate()
            .filter(|(_, e)| matches!(e, Emission::Stop(_)))
            .collect();
        prop_assert!(stops.len() <= 1);
        if let Some((index, _)) = stops.first() {
            prop_assert_eq!(*index, emissions.len() - 1);
            prop_assert!(engine.is_stopped());
        }
        prop_assert_eq!(commands_of(&emissions).len() + stops.len(), emissions.len());
    }
}

#[test]
fn test_identical_runs_match_example() {
    let events: Vec<InputEvent> = vec![
        KeyEvent::new(0, Key::Enter).into(),
        KeyEvent::new(1, Key::Right).into(),
        KeyEvent::new(2, Key::Enter).into(),
        SensorSnapshot::at(60).into(),
        SensorSnapshot::at(70).with_corners(false, true).into(),
        SensorSnapshot::at(80).into(),
        KeyEvent::new(85, Key::Quit).into(),
        SensorSnapshot::at(90).into(),
    ];

    let mut a = PhaseEngine::new(short_tuning()).unwrap();
    let mut b = PhaseEngine::new(short_tuning()).unwrap();
    let first = replay_events(&mut a, events.clone());
    assert_eq!(first, replay_events(&mut b, events));
    assert_eq!(first.last(), Some(&Emission::Stop(StopReason::UserAbort)));
    // Enter、Right 各一条，快照 3 条
    assert_eq!(commands_of(&first).len(), 5);
}

//! 阶段引擎行为测试
//!
//! 用合成的快照序列驱动引擎，检查每个阶段输出的命令和切换时机。

use sumo_logic::{
    BackOffStage, CircleStage, ForwardStage, Phase, PhaseEngine, PhaseKind, Reaction,
    RetreatStage, SeekStage, StopReason,
};
use sumo_protocol::{Command, Direction, Key, KeyEvent, SensorSnapshot};
use sumo_tools::Tuning;

fn engine_in(phase: Phase) -> PhaseEngine {
    PhaseEngine::with_phase(Tuning::default(), phase).unwrap()
}

fn emit(engine: &mut PhaseEngine, snapshot: SensorSnapshot) -> Command {
    match engine.on_snapshot(&snapshot) {
        Reaction::Emit(command) => command,
        other => panic!("expected a command at {} ms, got {:?}", snapshot.elapsed_millis, other),
    }
}

fn speeds(command: &Command) -> (i32, i32) {
    (command.speed_left, command.speed_right)
}

/// 从 Idle 开始按键进入倒计时
fn armed(keys: &[Key]) -> PhaseEngine {
    let mut engine = PhaseEngine::new(Tuning::default()).unwrap();
    engine.on_key(&KeyEvent::new(0, Key::Enter));
    for (i, key) in keys.iter().enumerate() {
        engine.on_key(&KeyEvent::new(10 + i as i64, *key));
    }
    engine.on_key(&KeyEvent::new(100, Key::Enter));
    assert_eq!(engine.phase().kind(), PhaseKind::ArmedCountdown);
    engine
}

#[test]
fn test_seek_move_holds_until_850() {
    let mut engine = engine_in(Phase::seeking(Direction::Right, 0));

    for millis in (0..850).step_by(10) {
        let command = emit(&mut engine, SensorSnapshot::at(millis));
        assert_eq!(speeds(&command), (6000, 6000), "at {} ms", millis);
        assert_eq!(command.millis, millis);
    }

    // 850 ms 进入转向子阶段，同一快照就输出转向速度
    let command = emit(&mut engine, SensorSnapshot::at(850));
    assert_eq!(speeds(&command), (4000, -4000));
    assert_eq!(
        engine.phase(),
        &Phase::Seeking {
            dir: Direction::Right,
            stage: SeekStage::Turn,
            entered_at: 850,
        }
    );
}

#[test]
fn test_seek_alternates_and_flips_forever() {
    let mut engine = engine_in(Phase::seeking(Direction::Right, 0));
    let mut turns = Vec::new();
    let mut last_stage = SeekStage::Move;

    // 30 秒：每轮 2350 ms，约 12 轮
    for millis in (0..30_000).step_by(10) {
        let command = emit(&mut engine, SensorSnapshot::at(millis));
        match *engine.phase() {
            Phase::Seeking { dir, stage, .. } => {
                if stage == SeekStage::Turn && last_stage == SeekStage::Move {
                    turns.push((dir, speeds(&command)));
                }
                last_stage = stage;
            },
            other => panic!("left Seeking: {:?}", other),
        }
    }

    assert!(turns.len() >= 12, "only {} turns", turns.len());
    for pair in turns.windows(2) {
        assert_eq!(pair[1].0, pair[0].0.flipped());
    }
    assert_eq!(turns[0], (Direction::Right, (4000, -4000)));
    assert_eq!(turns[1], (Direction::Left, (-4000, 4000)));
    assert!(!engine.is_stopped());
}

#[test]
fn test_forward_left_with_adjust_three() {
    let mut engine = engine_in(Phase::GoingForward {
        dir: Direction::Left,
        adjust: 3,
        stage: ForwardStage::Drive,
        entered_at: 0,
    });
    let tuning = Tuning::default();
    let base = tuning.forward.speed;
    let penalty = tuning.forward.adjustment_step;

    for millis in (0..1000).step_by(10) {
        let command = emit(&mut engine, SensorSnapshot::at(millis));
        assert_eq!(speeds(&command), (base - 3 * penalty, base), "at {} ms", millis);
    }

    let command = emit(&mut engine, SensorSnapshot::at(1000));
    assert_eq!(speeds(&command), (1000, 10000));
    assert!(matches!(
        engine.phase(),
        Phase::GoingForward {
            stage: ForwardStage::Turn,
            ..
        }
    ));
}

#[test]
fn test_forward_selected_via_keys() {
    // Left ×3 → 向左前冲，偏置 3
    let mut engine = armed(&[Key::Left, Key::Left, Key::Left]);
    let command = emit(&mut engine, SensorSnapshot::at(5100));
    assert_eq!(speeds(&command), (8500, 10000));
    assert_eq!(
        engine.phase(),
        &Phase::GoingForward {
            dir: Direction::Left,
            adjust: 3,
            stage: ForwardStage::Drive,
            entered_at: 5100,
        }
    );
}

#[test]
fn test_border_mapping_in_movement_phases() {
    let cases = [
        ((true, false), Direction::Right),
        ((false, true), Direction::Left),
        ((true, true), Direction::None),
    ];
    let phases = [
        Phase::seeking(Direction::Left, 0),
        Phase::Seeking {
            dir: Direction::Right,
            stage: SeekStage::Turn,
            entered_at: 0,
        },
        Phase::GoingForward {
            dir: Direction::Right,
            adjust: 1,
            stage: ForwardStage::Drive,
            entered_at: 0,
        },
        Phase::GoingForward {
            dir: Direction::Left,
            adjust: 0,
            stage: ForwardStage::Turn,
            entered_at: 0,
        },
        Phase::Retreating {
            dir: Direction::Left,
            stage: RetreatStage::PreMove,
            entered_at: 0,
        },
        Phase::Retreating {
            dir: Direction::Right,
            stage: RetreatStage::Move,
            entered_at: 0,
        },
    ];

    for phase in phases {
        for ((left, right), expected) in cases {
            let mut engine = engine_in(phase);
            emit(&mut engine, SensorSnapshot::at(0));
            let command = emit(&mut engine, SensorSnapshot::at(10).with_corners(left, right));

            assert_eq!(
                engine.phase(),
                &Phase::backing_off(expected, 10),
                "{:?} with corners ({}, {})",
                phase,
                left,
                right
            );
            // 这条命令已经来自 BackingOff 的第一个子阶段
            let tuning = Tuning::default();
            let expected_speeds = match expected {
                Direction::Right => (-tuning.back.turn1.inner, -tuning.back.turn1.outer),
                Direction::Left => (-tuning.back.turn1.outer, -tuning.back.turn1.inner),
                Direction::None => (-tuning.back.move_speed, -tuning.back.move_speed),
            };
            assert_eq!(speeds(&command), expected_speeds);
            assert_eq!(command.led_left_red, if left { 255 } else { 0 });
            assert_eq!(command.led_right_red, if right { 255 } else { 0 });
        }
    }
}

#[test]
fn test_back_off_runs_to_completion() {
    let mut engine = engine_in(Phase::seeking(Direction::Left, 0));
    emit(&mut engine, SensorSnapshot::at(0).with_corners(true, false));
    assert_eq!(engine.phase(), &Phase::backing_off(Direction::Right, 0));

    // 后退过程中角落仍然越界，不会重新开始
    for millis in (10..400).step_by(10) {
        let command = emit(&mut engine, SensorSnapshot::at(millis).with_corners(true, false));
        assert_eq!(speeds(&command), (-5000, -10000));
    }
    let command = emit(&mut engine, SensorSnapshot::at(400));
    assert_eq!(speeds(&command), (5000, -5000));
    assert_eq!(
        engine.phase(),
        &Phase::BackingOff {
            dir: Direction::Right,
            stage: BackOffStage::Second,
            entered_at: 400,
        }
    );

    let command = emit(&mut engine, SensorSnapshot::at(1200));
    assert_eq!(speeds(&command), (6000, 6000));
    assert_eq!(engine.phase(), &Phase::seeking(Direction::Right, 1200));
    assert_eq!(engine.metrics().border_triggers, 1);
}

#[test]
fn test_countdown_leds_and_single_handoff() {
    let mut engine = armed(&[]);
    let window = 5000;
    let start = 100;

    let command = emit(&mut engine, SensorSnapshot::at(start));
    assert!(command.leds_off());
    assert!(command.is_stationary());

    // 前 4/5：只有左侧灯
    let command = emit(&mut engine, SensorSnapshot::at(start + 3500));
    assert_eq!(command.leds(), (127, 0, 127, 0));
    assert!(command.is_stationary());

    // 4/5 之后：四灯
    let command = emit(&mut engine, SensorSnapshot::at(start + window * 4 / 5 + 250));
    assert_eq!(command.leds(), (63, 63, 63, 63));

    let before = engine.metrics().handoffs_total;
    emit(&mut engine, SensorSnapshot::at(start + window));
    assert_eq!(engine.phase(), &Phase::seeking(Direction::Left, start + window));
    emit(&mut engine, SensorSnapshot::at(start + window + 10));
    assert_eq!(engine.metrics().handoffs_total, before + 1);
}

#[test]
fn test_retreat_selected_via_keys() {
    let mut engine = armed(&[Key::Right, Key::Down]);
    let command = emit(&mut engine, SensorSnapshot::at(5100));
    assert_eq!(speeds(&command), (10000, 10000));

    emit(&mut engine, SensorSnapshot::at(5300));
    assert!(matches!(
        engine.phase(),
        Phase::Retreating {
            dir: Direction::Right,
            stage: RetreatStage::Turn,
            ..
        }
    ));
    let command = emit(&mut engine, SensorSnapshot::at(5600));
    assert_eq!(speeds(&command), (2000, 10000));
    let command = emit(&mut engine, SensorSnapshot::at(6100));
    assert_eq!(speeds(&command), (6000, 6000));
    assert_eq!(engine.phase(), &Phase::seeking(Direction::Left, 6100));
}

#[test]
fn test_circle_selected_via_keys() {
    let mut engine = armed(&[Key::Down, Key::Down]);
    let command = emit(&mut engine, SensorSnapshot::at(5100));
    // 向左找边：右轮外侧，左轮反转
    assert_eq!(speeds(&command), (-2500, 6000));

    // 右角越界不算向左找边的目标，也不触发后退
    emit(&mut engine, SensorSnapshot::at(5110).with_corners(false, true));
    assert_eq!(engine.phase().kind(), PhaseKind::Circling);

    let command = emit(&mut engine, SensorSnapshot::at(5400));
    assert_eq!(speeds(&command), (-1800, 3100));

    emit(&mut engine, SensorSnapshot::at(5410).with_corners(true, false));
    assert_eq!(
        engine.phase(),
        &Phase::Circling {
            dir: Direction::Right,
            stage: CircleStage::Drive,
            entered_at: 5410,
        }
    );
    let command = emit(&mut engine, SensorSnapshot::at(5420).with_corner_values(100, 0));
    assert_eq!(speeds(&command), (10000, 5000));
}

#[test]
fn test_quit_in_every_phase_stops_once() {
    let phases = [
        Phase::Idle,
        Phase::seeking(Direction::Left, 0),
        Phase::backing_off(Direction::None, 0),
        Phase::Circling {
            dir: Direction::Left,
            stage: CircleStage::Spiral,
            entered_at: 0,
        },
        Phase::Retreating {
            dir: Direction::Left,
            stage: RetreatStage::Turn,
            entered_at: 0,
        },
    ];

    for phase in phases {
        for key in [Key::Quit, Key::Back] {
            let mut engine = engine_in(phase);
            emit(&mut engine, SensorSnapshot::at(0));
            assert_eq!(
                engine.on_key(&KeyEvent::new(5, key)),
                Reaction::Stop(StopReason::UserAbort)
            );
            for millis in (10..200).step_by(10) {
                assert_eq!(
                    engine.on_snapshot(&SensorSnapshot::at(millis)),
                    Reaction::Silent
                );
            }
            assert_eq!(engine.on_key(&KeyEvent::new(300, key)), Reaction::Silent);
        }
    }
}

#[test]
fn test_match_limit_stops_run() {
    let mut tuning = Tuning::default();
    tuning.general.match_limit_ms = 1000;
    tuning.general.countdown_ms = 100;
    let mut engine = PhaseEngine::new(tuning).unwrap();
    engine.on_key(&KeyEvent::new(0, Key::Enter));
    engine.on_key(&KeyEvent::new(0, Key::Enter));

    let mut stop = None;
    for millis in (0..2000).step_by(10) {
        match engine.on_snapshot(&SensorSnapshot::at(millis)) {
            Reaction::Emit(_) => {},
            Reaction::Stop(reason) => {
                stop = Some((millis, reason));
                break;
            },
            Reaction::Silent => panic!("silent before stop at {} ms", millis),
        }
    }
    assert_eq!(stop, Some((1100, StopReason::MatchOver)));
    assert!(engine.is_stopped());
}

#[test]
fn test_vision_leds_follow_target() {
    let mut engine = engine_in(Phase::seeking(Direction::Left, 0));
    let command = emit(&mut engine, SensorSnapshot::at(0).with_vision(100, -100));
    assert_eq!(command.leds(), (255, 0, 0, 0));
    let command = emit(&mut engine, SensorSnapshot::at(10).with_vision(50, 50));
    assert_eq!(command.leds(), (31, 95, 0, 0));
}

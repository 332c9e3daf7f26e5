use utatsumi::{
    ClockSource, JudgeOutcome, ManualClock, Millis, Phase, RoundEngine, RoundEvent, Rules, Token,
};

/// 一帧（约 60Hz）
const FRAME: Millis = 16.0;

/// 自动演奏：在判定目标附近的那一帧按下正确的键
fn auto_press(engine: &mut RoundEngine, now: Millis) {
    if engine.phase() != Phase::Playing || engine.state().received_input() {
        return;
    }
    let Some(index) = engine.state().beat_index else {
        return;
    };
    let target = engine
        .rules()
        .judge
        .target_time(engine.state().beat_start_at, engine.beat_interval_ms());
    if now + FRAME / 2.0 >= target
        && let Some(&token) = engine.sequence().get(index)
    {
        assert!(engine.record_input(token, now));
    }
}

/// 逐帧推进直到 `until`，每帧先处理输入再 tick
fn run_frames(
    engine: &mut RoundEngine,
    clock: &ManualClock,
    until: Millis,
    mut on_frame: impl FnMut(&mut RoundEngine, Millis),
) -> Vec<RoundEvent> {
    let mut events = Vec::new();
    while clock.now() < until {
        clock.advance(FRAME);
        let now = clock.now();
        on_frame(engine, now);
        engine.tick(now);
        events.extend(engine.drain_events());
    }
    events
}

fn outcomes(events: &[RoundEvent]) -> Vec<JudgeOutcome> {
    events
        .iter()
        .filter_map(|e| match e {
            RoundEvent::BeatJudged { outcome, .. } => Some(*outcome),
            _ => None,
        })
        .collect()
}

#[test]
fn frame_driven_perfect_play_speeds_up_each_loop() {
    let clock = ManualClock::at(0.0);
    let mut engine = RoundEngine::with_seed(Rules::default(), 2024);
    engine.start(clock.now());

    // 预备拍 4 拍 + 3 周（每周 7 拍 + 留白），时间充足
    let events = run_frames(&mut engine, &clock, 20_000.0, auto_press);

    let judged = outcomes(&events);
    assert!(judged.len() >= 21, "judged {} beats", judged.len());
    assert!(judged.iter().all(|o| *o == JudgeOutcome::Perfect));
    assert_eq!(engine.state().miss_count, 0);

    let round = engine.state().round_count;
    assert!(round >= 3);
    let expected_bpm = (90.0 + 6.0 * f64::from(round)).min(220.0);
    assert!((engine.bpm() - expected_bpm).abs() < 1e-9);

    // 每周完成后 BPM 单调不减
    let bpms: Vec<f64> = events
        .iter()
        .filter_map(|e| match e {
            RoundEvent::StatsChanged { bpm, .. } => Some(*bpm),
            _ => None,
        })
        .collect();
    assert!(bpms.windows(2).all(|w| w[1] >= w[0]));
}

#[test]
fn loop_boundary_at_ninety_bpm() {
    let clock = ManualClock::at(0.0);
    let mut engine = RoundEngine::with_seed(Rules::default(), 8);
    engine.start(clock.now());
    assert!((engine.beat_interval_ms() - 666.67).abs() < 0.01);

    let mut completed_at = None;
    while completed_at.is_none() {
        clock.advance(FRAME);
        let now = clock.now();
        auto_press(&mut engine, now);
        engine.tick(now);
        if engine
            .drain_events()
            .any(|e| matches!(e, RoundEvent::StatsChanged { round: 1, .. }))
        {
            completed_at = Some(now);
        }
        assert!(now < 10_000.0, "loop never completed");
    }
    let completed_at = completed_at.unwrap_or_default();

    assert_eq!(engine.state().beat_index, Some(0));
    assert!((engine.state().beat_start_at - (completed_at + 400.0)).abs() < 1e-9);
    assert_eq!(engine.sequence().len(), 7);
    assert_eq!(
        engine.sequence().get(4..),
        Some(&[Token::Up, Token::Left, Token::Right][..])
    );
    assert!((engine.bpm() - 96.0).abs() < f64::EPSILON);
}

#[test]
fn idle_player_loses_after_five_beats() {
    let clock = ManualClock::at(0.0);
    let mut engine = RoundEngine::with_seed(Rules::default(), 1);
    engine.start(clock.now());

    let events = run_frames(&mut engine, &clock, 15_000.0, |_, _| {});
    assert_eq!(engine.phase(), Phase::GameOver);
    assert_eq!(outcomes(&events), vec![JudgeOutcome::Miss; 5]);
    assert_eq!(engine.state().beat_index, Some(4));
    let game_overs = events
        .iter()
        .filter(|e| matches!(e, RoundEvent::GameOver { final_round: 0 }))
        .count();
    assert_eq!(game_overs, 1);

    // 结束后重开：计数与速度全部复位
    engine.restart(clock.now());
    assert_eq!(engine.phase(), Phase::CountIn);
    assert_eq!(engine.state().miss_count, 0);
    assert_eq!(engine.state().round_count, 0);
    assert!((engine.bpm() - 90.0).abs() < f64::EPSILON);
}

#[test]
fn long_stall_advances_only_one_beat() {
    let clock = ManualClock::at(0.0);
    let mut engine = RoundEngine::with_seed(Rules::default(), 4);
    engine.start(clock.now());
    run_frames(&mut engine, &clock, 3_000.0, |_, _| {});
    assert_eq!(engine.phase(), Phase::Playing);
    let before = engine.state().beat_index;

    clock.advance(10_000.0);
    engine.tick(clock.now());
    assert_eq!(
        engine.state().beat_index,
        before.map(|i| i + 1),
        "a stalled tick judges exactly one beat"
    );
}

#[test]
fn late_or_early_press_grades_ok() {
    let clock = ManualClock::at(0.0);
    let mut engine = RoundEngine::with_seed(Rules::default(), 6);
    engine.start(clock.now());
    run_frames(&mut engine, &clock, 2_800.0, |_, _| {});
    assert_eq!(engine.phase(), Phase::Playing);

    let target = engine
        .rules()
        .judge
        .target_time(engine.state().beat_start_at, engine.beat_interval_ms());
    let token = engine.sequence().first().copied().unwrap_or(Token::Up);
    // 停在目标前约 110ms 的那一帧按下
    run_frames(&mut engine, &clock, target - 120.0, |_, _| {});
    let early = clock.now() - target;
    assert!(early < -90.0 && early >= -180.0, "early by {early}");
    assert!(engine.record_input(token, clock.now()));
    let events = run_frames(&mut engine, &clock, target + 200.0, |_, _| {});
    assert_eq!(outcomes(&events).first(), Some(&JudgeOutcome::Ok));
}

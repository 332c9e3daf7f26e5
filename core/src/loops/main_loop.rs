//! 主循环：推进回合引擎并分发事件
//!
//! - 以固定间隔推进 `RoundEngine::tick`
//! - 两次 tick 之间阻塞等待输入，输入到达时立即打上时间戳
//! - 将引擎事件转发给表现层，并把提示音 / 语音请求发给音频循环

use std::{
    sync::mpsc,
    thread,
    time::{Duration, Instant},
};

use tracing::{debug, info};

use crate::clock::ClockSource;
use crate::loops::audio::Msg;
use crate::loops::key_map::KeyMap;
use crate::loops::{ControlMsg, InputMsg, RawInputMsg, ViewMsg};
use crate::round::{Phase, RoundEngine, RoundEvent};

/// 调度间隔（约 60Hz）
pub const TICK: Duration = Duration::from_millis(16);

/// 单步执行后的去向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// 继续运行
    Continue,
    /// 停止主循环
    Stop,
}

/// 主循环驱动器：持有引擎、时钟与各通道端点
pub struct Driver<C: ClockSource> {
    /// 回合引擎
    engine: RoundEngine,
    /// 时钟源
    clock: C,
    /// 按键映射器
    key_map: KeyMap,
    /// 控制消息接收端
    control_rx: mpsc::Receiver<ControlMsg>,
    /// 原始输入消息接收端
    raw_input_rx: mpsc::Receiver<RawInputMsg>,
    /// 表现层消息发送端
    view_tx: mpsc::SyncSender<ViewMsg>,
    /// 音频请求发送端（静音时为 `None`）
    audio_tx: Option<mpsc::SyncSender<Msg>>,
}

impl<C: ClockSource> Driver<C> {
    /// 创建驱动器
    #[must_use]
    pub const fn new(
        engine: RoundEngine,
        clock: C,
        key_map: KeyMap,
        control_rx: mpsc::Receiver<ControlMsg>,
        raw_input_rx: mpsc::Receiver<RawInputMsg>,
        view_tx: mpsc::SyncSender<ViewMsg>,
        audio_tx: Option<mpsc::SyncSender<Msg>>,
    ) -> Self {
        Self {
            engine,
            clock,
            key_map,
            control_rx,
            raw_input_rx,
            view_tx,
            audio_tx,
        }
    }

    /// 回合引擎
    #[must_use]
    pub const fn engine(&self) -> &RoundEngine {
        &self.engine
    }

    /// 执行一步：处理控制消息与积压输入，推进引擎，分发事件
    pub fn step(&mut self) -> Flow {
        loop {
            match self.control_rx.try_recv() {
                Ok(msg) => {
                    if self.apply_control(msg) == Flow::Stop {
                        return Flow::Stop;
                    }
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => return Flow::Stop,
            }
        }
        while let Ok(raw_msg) = self.raw_input_rx.try_recv() {
            self.handle_raw(raw_msg);
        }
        let now = self.clock.now();
        self.engine.tick(now);
        self.dispatch()
    }

    /// 在 `timeout` 内等待输入，每个输入到达时立即记录
    pub fn wait_input(&mut self, timeout: Duration) {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return;
        };
        loop {
            let Some(wait) = deadline.checked_duration_since(Instant::now()) else {
                return;
            };
            match self.raw_input_rx.recv_timeout(wait) {
                Ok(raw_msg) => self.handle_raw(raw_msg),
                Err(mpsc::RecvTimeoutError::Timeout) => return,
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    thread::sleep(wait);
                    return;
                }
            }
        }
    }

    /// 应用控制消息
    fn apply_control(&mut self, msg: ControlMsg) -> Flow {
        let now = self.clock.now();
        debug!(?msg, "控制消息");
        match msg {
            ControlMsg::Start => self.engine.start(now),
            ControlMsg::Restart => self.engine.restart(now),
            ControlMsg::Pause => self.engine.pause(),
            ControlMsg::Resume => self.engine.resume(),
            ControlMsg::TogglePause => match self.engine.phase() {
                Phase::Playing => self.engine.pause(),
                Phase::Paused => self.engine.resume(),
                _ => {}
            },
            ControlMsg::Quit => return Flow::Stop,
        }
        Flow::Continue
    }

    /// 转换并记录原始输入
    fn handle_raw(&mut self, raw_msg: RawInputMsg) {
        let at = self.clock.now();
        if let Some(InputMsg::Press(token)) = self.key_map.convert(raw_msg) {
            let _ = self.engine.record_input(token, at);
        }
    }

    /// 分发引擎事件；表现层断开时停止
    fn dispatch(&mut self) -> Flow {
        let events: Vec<RoundEvent> = self.engine.drain_events().collect();
        for event in events {
            if let Some(audio_tx) = self.audio_tx.as_ref() {
                let request = match &event {
                    RoundEvent::CueFired { accented } => Some(Msg::Click { accent: *accented }),
                    RoundEvent::InputAccepted(token) => Some(Msg::Voice(*token)),
                    _ => None,
                };
                if let Some(request) = request {
                    // 音频循环跟不上时宁可丢音，不阻塞节拍
                    let _ = audio_tx.try_send(request);
                }
            }
            if self.view_tx.send(ViewMsg::Round(event)).is_err() {
                return Flow::Stop;
            }
        }
        Flow::Continue
    }
}

/// 运行主循环，直到收到退出消息或通道断开
pub fn run<C: ClockSource>(mut driver: Driver<C>) {
    info!("主循环启动");
    let mut next_tick = Instant::now();
    loop {
        let Some(t) = next_tick.checked_add(TICK) else {
            next_tick = Instant::now();
            continue;
        };
        next_tick = t;
        let now_instant = Instant::now();
        if let Some(wait) = next_tick.checked_duration_since(now_instant) {
            driver.wait_input(wait);
        } else {
            next_tick = now_instant;
        }
        if driver.step() == Flow::Stop {
            break;
        }
    }
    let _ = driver.view_tx.send(ViewMsg::Closed);
    info!("主循环退出");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::loops::RawKeyCode;
    use crate::rules::Rules;
    use crate::token::Token;

    struct Harness<'a> {
        driver: Driver<&'a ManualClock>,
        control_tx: mpsc::Sender<ControlMsg>,
        input_tx: mpsc::Sender<RawInputMsg>,
        view_rx: mpsc::Receiver<ViewMsg>,
        audio_rx: mpsc::Receiver<Msg>,
    }

    fn harness(clock: &ManualClock) -> Harness<'_> {
        let (control_tx, control_rx) = mpsc::channel();
        let (input_tx, input_rx) = mpsc::channel();
        let (view_tx, view_rx) = mpsc::sync_channel(1024);
        let (audio_tx, audio_rx) = mpsc::sync_channel(64);
        let engine = RoundEngine::with_seed(Rules::default(), 11);
        Harness {
            driver: Driver::new(
                engine,
                clock,
                KeyMap::default(),
                control_rx,
                input_rx,
                view_tx,
                Some(audio_tx),
            ),
            control_tx,
            input_tx,
            view_rx,
            audio_rx,
        }
    }

    fn events(rx: &mpsc::Receiver<ViewMsg>) -> Vec<RoundEvent> {
        rx.try_iter()
            .filter_map(|m| match m {
                ViewMsg::Round(e) => Some(e),
                ViewMsg::Closed => None,
            })
            .collect()
    }

    fn play_through_count_in(h: &mut Harness<'_>, clock: &ManualClock) {
        for _ in 0..4 {
            clock.advance(700.0);
            assert_eq!(h.driver.step(), Flow::Continue);
        }
        assert_eq!(h.driver.engine().phase(), Phase::Playing);
    }

    #[test]
    fn start_message_begins_count_in() {
        let clock = ManualClock::at(0.0);
        let mut h = harness(&clock);
        h.control_tx.send(ControlMsg::Start).expect("control channel");
        assert_eq!(h.driver.step(), Flow::Continue);
        assert_eq!(h.driver.engine().phase(), Phase::CountIn);
        assert!(events(&h.view_rx).contains(&RoundEvent::PhaseChanged(Phase::CountIn)));
    }

    #[test]
    fn count_in_cues_reach_audio_loop() {
        let clock = ManualClock::at(0.0);
        let mut h = harness(&clock);
        h.control_tx.send(ControlMsg::Start).expect("control channel");
        h.driver.step();
        play_through_count_in(&mut h, &clock);
        let clicks: Vec<bool> = h
            .audio_rx
            .try_iter()
            .filter_map(|m| match m {
                Msg::Click { accent } => Some(accent),
                _ => None,
            })
            .collect();
        assert_eq!(clicks, vec![false, false, false, true]);
    }

    #[test]
    fn key_input_is_mapped_recorded_and_voiced() {
        let clock = ManualClock::at(0.0);
        let mut h = harness(&clock);
        h.control_tx.send(ControlMsg::Start).expect("control channel");
        h.driver.step();
        play_through_count_in(&mut h, &clock);
        let _ = events(&h.view_rx);
        let _ = h.audio_rx.try_iter().count();

        clock.advance(100.0);
        h.input_tx
            .send(RawInputMsg::Key(RawKeyCode("ArrowLeft".into())))
            .expect("input channel");
        h.input_tx
            .send(RawInputMsg::Key(RawKeyCode("KeyQ".into())))
            .expect("input channel");
        h.driver.step();
        let state = h.driver.engine().state();
        assert_eq!(state.input.map(|i| i.token), Some(Token::Left));
        assert!(events(&h.view_rx).contains(&RoundEvent::InputAccepted(Token::Left)));
        assert!(
            h.audio_rx
                .try_iter()
                .any(|m| matches!(m, Msg::Voice(Token::Left)))
        );
    }

    #[test]
    fn toggle_pause_round_trips() {
        let clock = ManualClock::at(0.0);
        let mut h = harness(&clock);
        h.control_tx.send(ControlMsg::Start).expect("control channel");
        h.driver.step();
        play_through_count_in(&mut h, &clock);
        h.control_tx.send(ControlMsg::TogglePause).expect("control channel");
        h.driver.step();
        assert_eq!(h.driver.engine().phase(), Phase::Paused);
        h.control_tx.send(ControlMsg::TogglePause).expect("control channel");
        h.driver.step();
        assert_eq!(h.driver.engine().phase(), Phase::Playing);
    }

    #[test]
    fn quit_or_disconnect_stops() {
        let clock = ManualClock::at(0.0);
        let mut h = harness(&clock);
        h.control_tx.send(ControlMsg::Quit).expect("control channel");
        assert_eq!(h.driver.step(), Flow::Stop);

        let mut h = harness(&clock);
        drop(h.control_tx);
        assert_eq!(h.driver.step(), Flow::Stop);
    }

    #[test]
    fn dropped_view_stops() {
        let clock = ManualClock::at(0.0);
        let mut h = harness(&clock);
        drop(h.view_rx);
        h.control_tx.send(ControlMsg::Start).expect("control channel");
        assert_eq!(h.driver.step(), Flow::Stop);
    }

    #[test]
    fn wait_input_records_with_arrival_time() {
        let clock = ManualClock::at(0.0);
        let mut h = harness(&clock);
        h.control_tx.send(ControlMsg::Start).expect("control channel");
        h.driver.step();
        play_through_count_in(&mut h, &clock);
        clock.advance(250.0);
        h.input_tx.send(RawInputMsg::Index(2)).expect("input channel");
        h.driver.wait_input(Duration::from_millis(5));
        let input = h.driver.engine().state().input;
        assert_eq!(input.map(|i| i.token), Some(Token::Right));
        assert_eq!(input.map(|i| i.at), Some(clock.now()));
    }
}

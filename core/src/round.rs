//! 回合引擎：预备拍、节拍推进、加速、失误计数与结束判定
//!
//! 引擎本身不持有时钟，由驱动方以 `tick(now)` 推进；所有状态变更都在
//! `tick` / 命令调用内同步完成，产生的事件缓存在引擎内，由驱动方取走。

use std::vec::Drain;

use tracing::{debug, info};

use crate::clock::Millis;
use crate::cue::CueQueue;
use crate::judge::{BufferedInput, JudgeOutcome};
use crate::rules::Rules;
use crate::sequence::SequenceGenerator;
use crate::tempo::TempoModel;
use crate::token::Token;

/// 引擎阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// 尚未开始
    Idle,
    /// 预备拍
    CountIn,
    /// 游戏中
    Playing,
    /// 暂停
    Paused,
    /// 已结束
    GameOver,
}

impl Phase {
    /// 回合是否在进行（含暂停）
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::CountIn | Self::Playing | Self::Paused)
    }

    /// 该阶段下提示音是否应当发声
    #[must_use]
    pub const fn is_audible(self) -> bool {
        matches!(self, Self::CountIn | Self::Playing)
    }
}

/// 引擎向表现层发出的事件
#[derive(Debug, Clone, PartialEq)]
pub enum RoundEvent {
    /// 序列或当前拍变化
    SequenceChanged {
        /// 当前序列
        sequence: Vec<Token>,
        /// 当前拍（预备拍期间为 `None`）
        current: Option<usize>,
    },
    /// 一拍判定完成
    BeatJudged {
        /// 拍索引
        index: usize,
        /// 判定结果
        outcome: JudgeOutcome,
    },
    /// 统计变化
    StatsChanged {
        /// 已完成周数
        round: u32,
        /// 失误数
        miss: u32,
        /// 当前 BPM
        bpm: f64,
    },
    /// 预备拍计数
    CountInTick {
        /// 剩余拍数
        remaining: u32,
    },
    /// 当前拍进度 `[0, 1]`
    Progress(f64),
    /// 游戏结束
    GameOver {
        /// 最终完成周数
        final_round: u32,
    },
    /// 已排队一个提示音
    CueScheduled {
        /// 是否为重音
        accented: bool,
        /// 触发时刻
        fire_at: Millis,
    },
    /// 排队的提示音到期（已过滤失效的）
    CueFired {
        /// 是否为重音
        accented: bool,
    },
    /// 接受了一次输入
    InputAccepted(Token),
    /// 阶段变化
    PhaseChanged(Phase),
}

/// 回合状态
#[derive(Debug, Clone, PartialEq)]
pub struct RoundState {
    /// 当前拍索引（预备拍期间为 `None`）
    pub beat_index: Option<usize>,
    /// 当前拍起点
    pub beat_start_at: Millis,
    /// 是否接受输入
    pub awaiting_input: bool,
    /// 当拍已记录的输入（每拍至多一个）
    pub input: Option<BufferedInput>,
    /// 已完成周数
    pub round_count: u32,
    /// 失误数
    pub miss_count: u32,
    /// 剩余预备拍
    pub count_in_left: u32,
}

impl RoundState {
    /// 初始状态
    const fn fresh(now: Millis, count_in_left: u32) -> Self {
        Self {
            beat_index: None,
            beat_start_at: now,
            awaiting_input: false,
            input: None,
            round_count: 0,
            miss_count: 0,
            count_in_left,
        }
    }

    /// 当拍是否已收到输入
    #[must_use]
    pub const fn received_input(&self) -> bool {
        self.input.is_some()
    }
}

/// 回合引擎
pub struct RoundEngine {
    /// 规则参数
    rules: Rules,
    /// 当前阶段
    phase: Phase,
    /// 回合状态
    state: RoundState,
    /// 速度模型
    tempo: TempoModel,
    /// 序列生成器
    generator: SequenceGenerator,
    /// 当前序列
    sequence: Vec<Token>,
    /// 提示音队列
    cues: CueQueue,
    /// 上一次 tick 的时间
    last_tick: Option<Millis>,
    /// 待取走的事件
    events: Vec<RoundEvent>,
}

impl RoundEngine {
    /// 创建引擎
    #[must_use]
    pub fn new(rules: Rules, generator: SequenceGenerator) -> Self {
        let mut generator = generator;
        let sequence = generator.generate();
        Self {
            rules,
            phase: Phase::Idle,
            state: RoundState::fresh(0.0, rules.count_in_beats),
            tempo: TempoModel::new(rules.initial_bpm, rules.bpm_step, rules.max_bpm),
            generator,
            sequence,
            cues: CueQueue::default(),
            last_tick: None,
            events: Vec::new(),
        }
    }

    /// 以固定种子创建
    #[must_use]
    pub fn with_seed(rules: Rules, seed: u64) -> Self {
        Self::new(rules, SequenceGenerator::from_seed(seed, rules.random_head))
    }

    /// 规则参数
    #[must_use]
    pub const fn rules(&self) -> &Rules {
        &self.rules
    }

    /// 当前阶段
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// 回合状态
    #[must_use]
    pub const fn state(&self) -> &RoundState {
        &self.state
    }

    /// 当前序列
    #[must_use]
    pub fn sequence(&self) -> &[Token] {
        &self.sequence
    }

    /// 当前 BPM
    #[must_use]
    pub const fn bpm(&self) -> f64 {
        self.tempo.current_bpm()
    }

    /// 当前拍长
    #[must_use]
    pub fn beat_interval_ms(&self) -> Millis {
        self.tempo.beat_interval_ms()
    }

    /// 提示音队列
    #[must_use]
    pub const fn cues(&self) -> &CueQueue {
        &self.cues
    }

    /// 取走累计的事件
    pub fn drain_events(&mut self) -> Drain<'_, RoundEvent> {
        self.events.drain(..)
    }

    /// 当前拍进度，预备留白期间为 0
    #[must_use]
    pub fn progress(&self, now: Millis) -> f64 {
        if self.phase == Phase::Paused {
            return 0.0;
        }
        (self.elapsed(now) / self.beat_interval_ms()).clamp(0.0, 1.0)
    }

    /// 开始新回合；回合进行中时忽略
    pub fn start(&mut self, now: Millis) {
        if self.phase.is_running() {
            debug!(phase = ?self.phase, "回合进行中，忽略开始请求");
            return;
        }
        self.begin(now);
    }

    /// 丢弃当前回合并重新开始
    pub fn restart(&mut self, now: Millis) {
        self.begin(now);
    }

    /// 暂停（仅游戏中有效）
    pub fn pause(&mut self) {
        if self.phase == Phase::Playing {
            self.set_phase(Phase::Paused);
        }
    }

    /// 从暂停恢复，沿用原有拍起点
    pub fn resume(&mut self) {
        if self.phase == Phase::Paused {
            self.set_phase(Phase::Playing);
        }
    }

    /// 记录一次输入
    ///
    /// 仅在游戏中、正在等待输入且当拍尚未记录时接受；否则静默忽略。
    /// 返回是否被接受。
    pub fn record_input(&mut self, token: Token, at: Millis) -> bool {
        if self.phase != Phase::Playing
            || !self.state.awaiting_input
            || self.state.received_input()
        {
            debug!(?token, phase = ?self.phase, "忽略输入");
            return false;
        }
        self.state.input = Some(BufferedInput { token, at });
        self.events.push(RoundEvent::InputAccepted(token));
        true
    }

    /// 以记号索引记录输入，非法索引被忽略
    pub fn record_input_index(&mut self, index: usize, at: Millis) -> bool {
        Token::from_index(index).is_some_and(|token| self.record_input(token, at))
    }

    /// 推进一次调度
    ///
    /// 时间戳不晚于上一次 tick 时不做任何事。每次 tick 至多推进一拍。
    pub fn tick(&mut self, now: Millis) {
        if let Some(last) = self.last_tick
            && now <= last
        {
            return;
        }
        self.last_tick = Some(now);
        self.fire_due_cues(now);
        match self.phase {
            Phase::Idle | Phase::GameOver => {}
            Phase::Paused => self.events.push(RoundEvent::Progress(0.0)),
            Phase::CountIn => {
                self.tick_count_in(now);
                self.events.push(RoundEvent::Progress(self.progress(now)));
            }
            Phase::Playing => {
                if self.elapsed(now) >= self.beat_interval_ms() {
                    self.advance_beat(now);
                }
                if self.phase == Phase::Playing {
                    self.events.push(RoundEvent::Progress(self.progress(now)));
                }
            }
        }
    }

    /// 当前拍已过时间（不为负）
    fn elapsed(&self, now: Millis) -> Millis {
        (now - self.state.beat_start_at).max(0.0)
    }

    /// 重置全部回合状态并进入预备拍
    fn begin(&mut self, now: Millis) {
        self.cues.invalidate();
        self.tempo.reset();
        self.sequence = self.generator.generate();
        self.state = RoundState::fresh(now, self.rules.count_in_beats);
        self.last_tick = Some(now);
        info!(bpm = self.bpm(), "回合开始");
        self.set_phase(Phase::CountIn);
        self.push_stats();
        self.push_sequence();
        self.events.push(RoundEvent::CountInTick {
            remaining: self.state.count_in_left,
        });
        if self.state.count_in_left == 0 {
            self.enter_playing(now);
        } else {
            self.schedule_cue(false, now);
        }
    }

    /// 预备拍推进
    fn tick_count_in(&mut self, now: Millis) {
        if self.elapsed(now) < self.beat_interval_ms() {
            return;
        }
        self.state.count_in_left = self.state.count_in_left.saturating_sub(1);
        self.state.beat_start_at = now;
        self.events.push(RoundEvent::CountInTick {
            remaining: self.state.count_in_left,
        });
        if self.state.count_in_left == 0 {
            self.enter_playing(now);
        } else {
            // 最后一个预备拍为重音
            self.schedule_cue(self.state.count_in_left == 1, now);
        }
    }

    /// 预备拍结束，进入第一拍
    fn enter_playing(&mut self, now: Millis) {
        self.state.beat_index = Some(0);
        self.state.awaiting_input = true;
        self.state.input = None;
        self.set_phase(Phase::Playing);
        self.push_sequence();
        self.schedule_cue(false, now);
    }

    /// 拍末：判定、计数、推进到下一拍或下一周
    fn advance_beat(&mut self, now: Millis) {
        let Some(index) = self.state.beat_index else {
            return;
        };
        let Some(&expected) = self.sequence.get(index) else {
            return;
        };
        let interval = self.beat_interval_ms();
        let judge = self.rules.judge;
        let outcome = judge.judge(expected, self.state.input, self.state.beat_start_at, interval);
        debug!(
            index,
            ?expected,
            ?outcome,
            delta = self
                .state
                .input
                .map(|i| judge.timing_delta(i.at, self.state.beat_start_at, interval)),
            "拍判定"
        );

        if outcome == JudgeOutcome::Miss {
            self.state.miss_count += 1;
            self.push_stats();
            if self.state.miss_count >= self.rules.max_miss {
                self.events.push(RoundEvent::BeatJudged { index, outcome });
                self.game_over();
                return;
            }
        }
        self.events.push(RoundEvent::BeatJudged { index, outcome });

        let next = index + 1;
        self.state.input = None;
        self.state.awaiting_input = true;
        self.state.beat_start_at = now;

        if next >= self.sequence.len() {
            self.state.round_count += 1;
            self.tempo.advance_loop();
            self.sequence = self.generator.generate();
            self.state.beat_index = Some(0);
            self.state.beat_start_at = now + self.rules.lead_in_ms;
            info!(
                round = self.state.round_count,
                bpm = self.bpm(),
                "完成一周"
            );
            self.push_stats();
            self.push_sequence();
            // 新一周的首拍不用重音
            self.schedule_cue(false, now);
        } else {
            self.state.beat_index = Some(next);
            self.push_sequence();
            let is_last = next + 1 == self.sequence.len();
            self.schedule_cue(is_last, now);
        }
    }

    /// 进入结束状态
    fn game_over(&mut self) {
        self.state.awaiting_input = false;
        self.set_phase(Phase::GameOver);
        info!(final_round = self.state.round_count, "游戏结束");
        self.events.push(RoundEvent::GameOver {
            final_round: self.state.round_count,
        });
    }

    /// 将提示音对齐到判定目标时刻排队
    fn schedule_cue(&mut self, accented: bool, now: Millis) {
        let target = self
            .rules
            .judge
            .target_time(self.state.beat_start_at, self.beat_interval_ms());
        let cue = self.cues.schedule(accented, target.max(now));
        self.events.push(RoundEvent::CueScheduled {
            accented,
            fire_at: cue.fire_at,
        });
    }

    /// 触发到期的提示音
    fn fire_due_cues(&mut self, now: Millis) {
        for cue in self.cues.take_due(now, self.phase.is_audible()) {
            self.events.push(RoundEvent::CueFired {
                accented: cue.accented,
            });
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase == phase {
            return;
        }
        debug!(from = ?self.phase, to = ?phase, "阶段切换");
        self.phase = phase;
        self.events.push(RoundEvent::PhaseChanged(phase));
    }

    fn push_stats(&mut self) {
        self.events.push(RoundEvent::StatsChanged {
            round: self.state.round_count,
            miss: self.state.miss_count,
            bpm: self.bpm(),
        });
    }

    fn push_sequence(&mut self) {
        self.events.push(RoundEvent::SequenceChanged {
            sequence: self.sequence.clone(),
            current: self.state.beat_index,
        });
    }
}

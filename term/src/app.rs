//! 终端界面状态与绘制

use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::Result;
use ratatui::{
    DefaultTerminal, Frame,
    crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    layout::{Alignment, Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Clear, Gauge, Paragraph},
};
use tracing::warn;

use utatsumi::loops::{ControlMsg, RawInputMsg, RawKeyCode, ViewMsg};
use utatsumi::{JudgeOutcome, Phase, RoundEvent, Token};

use crate::key_code_name;

/// 界面刷新与按键轮询间隔
const FRAME: Duration = Duration::from_millis(16);
/// 判定徽标显示时长
const BADGE_TTL: Duration = Duration::from_millis(800);
/// 失误闪烁时长
const MISS_FLASH: Duration = Duration::from_millis(200);

/// 单格判定徽标
#[derive(Debug, Clone, Copy)]
struct Badge {
    outcome: JudgeOutcome,
    shown_at: Instant,
}

/// 表现层看到的回合状态，仅由 [`ViewMsg`] 驱动
#[derive(Debug, Clone)]
pub struct Board {
    sequence: Vec<Token>,
    current: Option<usize>,
    badges: Vec<Option<Badge>>,
    round: u32,
    miss: u32,
    max_miss: u32,
    bpm: f64,
    count_in: u32,
    progress: f64,
    phase: Phase,
    final_round: Option<u32>,
    miss_flash_at: Option<Instant>,
    closed: bool,
}

impl Board {
    /// 创建空白状态
    #[must_use]
    pub const fn new(max_miss: u32) -> Self {
        Self {
            sequence: Vec::new(),
            current: None,
            badges: Vec::new(),
            round: 0,
            miss: 0,
            max_miss,
            bpm: 0.0,
            count_in: 0,
            progress: 0.0,
            phase: Phase::Idle,
            final_round: None,
            miss_flash_at: None,
            closed: false,
        }
    }

    /// 应用一条表现层消息
    pub fn apply(&mut self, msg: ViewMsg, now: Instant) {
        let event = match msg {
            ViewMsg::Round(event) => event,
            ViewMsg::Closed => {
                self.closed = true;
                return;
            }
        };
        match event {
            RoundEvent::SequenceChanged { sequence, current } => {
                let wrapped = matches!((self.current, current), (Some(a), Some(b)) if b < a);
                if wrapped || sequence != self.sequence {
                    self.badges = vec![None; sequence.len()];
                }
                self.sequence = sequence;
                self.current = current;
            }
            RoundEvent::BeatJudged { index, outcome } => {
                if outcome == JudgeOutcome::Miss {
                    self.miss_flash_at = Some(now);
                }
                if let Some(slot) = self.badges.get_mut(index) {
                    *slot = Some(Badge {
                        outcome,
                        shown_at: now,
                    });
                }
            }
            RoundEvent::StatsChanged { round, miss, bpm } => {
                self.round = round;
                self.miss = miss;
                self.bpm = bpm;
            }
            RoundEvent::CountInTick { remaining } => self.count_in = remaining,
            RoundEvent::Progress(p) => self.progress = p.clamp(0.0, 1.0),
            RoundEvent::GameOver { final_round } => self.final_round = Some(final_round),
            RoundEvent::PhaseChanged(phase) => {
                if phase == Phase::CountIn {
                    self.final_round = None;
                    self.badges.iter_mut().for_each(|b| *b = None);
                }
                self.phase = phase;
            }
            RoundEvent::CueScheduled { .. }
            | RoundEvent::CueFired { .. }
            | RoundEvent::InputAccepted(_) => {}
        }
    }

    /// 当前阶段
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// 主循环是否已退出
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// 当前序列
    #[must_use]
    pub fn sequence(&self) -> &[Token] {
        &self.sequence
    }

    /// 当前拍
    #[must_use]
    pub const fn current(&self) -> Option<usize> {
        self.current
    }

    /// 最终周数（仅结束后）
    #[must_use]
    pub const fn final_round(&self) -> Option<u32> {
        self.final_round
    }

    /// 第 `index` 格在 `now` 时仍可见的判定
    #[must_use]
    pub fn badge(&self, index: usize, now: Instant) -> Option<JudgeOutcome> {
        let badge = self.badges.get(index).copied().flatten()?;
        (now.saturating_duration_since(badge.shown_at) < BADGE_TTL).then_some(badge.outcome)
    }

    /// 是否处于失误闪烁中
    #[must_use]
    pub fn is_flashing(&self, now: Instant) -> bool {
        self.miss_flash_at
            .is_some_and(|at| now.saturating_duration_since(at) < MISS_FLASH)
    }

    /// 预备拍期间显示的数字；剩余 0 拍时显示 1
    #[must_use]
    pub fn count_in_label(&self) -> Option<u32> {
        (self.phase == Phase::CountIn).then_some(self.count_in.max(1))
    }

    /// 绘制整个界面
    fn draw(&self, frame: &mut Frame<'_>, now: Instant) {
        let [title, hud, cells, progress, hints] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(2),
            Constraint::Length(5),
            Constraint::Length(3),
            Constraint::Length(2),
        ])
        .flex(Flex::Center)
        .areas(frame.area());

        frame.render_widget(
            Line::from("うー・たつ・みー").bold().alignment(Alignment::Center),
            title,
        );
        frame.render_widget(self.hud_line(), hud);
        self.draw_cells(frame, cells, now);
        self.draw_progress(frame, progress);
        frame.render_widget(
            Line::from("↑←→ 入力   Enter 開始   r リスタート   p 一時停止   q 終了")
                .dim()
                .alignment(Alignment::Center),
            hints,
        );
        self.draw_overlay(frame);
    }

    fn hud_line(&self) -> Line<'static> {
        Line::from(vec![
            "ROUND ".dim(),
            Span::from(self.round.to_string()).bold(),
            "   MISS ".dim(),
            Span::styled(
                format!("{}/{}", self.miss, self.max_miss),
                if self.miss > 0 {
                    Style::new().fg(Color::Red).add_modifier(Modifier::BOLD)
                } else {
                    Style::new().add_modifier(Modifier::BOLD)
                },
            ),
            "   BPM ".dim(),
            Span::from(format!("{:.0}", self.bpm)).bold(),
        ])
        .alignment(Alignment::Center)
    }

    fn draw_cells(&self, frame: &mut Frame<'_>, area: Rect, now: Instant) {
        let n = u32::try_from(self.sequence.len()).unwrap_or(1).max(1);
        if self.is_flashing(now) {
            frame.render_widget(Block::new().bg(Color::Red), area);
        }
        let slots = Layout::horizontal(vec![Constraint::Ratio(1, n); self.sequence.len()])
            .horizontal_margin(1)
            .split(area);
        for (i, (token, slot)) in self.sequence.iter().zip(slots.iter()).enumerate() {
            let is_current = self.current == Some(i) && self.phase != Phase::CountIn;
            let block = if is_current {
                Block::bordered()
                    .border_style(Style::new().fg(Color::Yellow).add_modifier(Modifier::BOLD))
            } else {
                Block::bordered().dim()
            };
            let badge = match self.badge(i, now) {
                Some(JudgeOutcome::Perfect) => "PERFECT".fg(Color::Green).bold(),
                Some(JudgeOutcome::Ok) => "OK".fg(Color::Cyan).bold(),
                Some(JudgeOutcome::Miss) => "MISS".fg(Color::Red).bold(),
                None => Span::raw(""),
            };
            let text = Text::from(vec![
                Line::from(token.glyph()).bold(),
                Line::from(token.key_label()).dim(),
                Line::from(badge),
            ]);
            frame.render_widget(
                Paragraph::new(text)
                    .alignment(Alignment::Center)
                    .block(block),
                *slot,
            );
        }
    }

    fn draw_progress(&self, frame: &mut Frame<'_>, area: Rect) {
        if let Some(count) = self.count_in_label() {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    count.to_string(),
                    Style::new().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ))
                    .alignment(Alignment::Center)
                    .block(Block::bordered().title("COUNT")),
                area,
            );
            return;
        }
        frame.render_widget(
            Gauge::default()
                .block(Block::bordered())
                .gauge_style(Style::new().fg(Color::Magenta))
                .ratio(self.progress)
                .label(""),
            area,
        );
    }

    fn draw_overlay(&self, frame: &mut Frame<'_>) {
        let lines = match self.phase {
            Phase::GameOver => vec![
                Line::from("GAME OVER").fg(Color::Red).bold(),
                Line::from(format!("到達ラウンド {}", self.final_round.unwrap_or(self.round))),
                Line::from("Enter でリトライ").dim(),
            ],
            Phase::Paused => vec![
                Line::from("PAUSED").bold(),
                Line::from("p で再開").dim(),
            ],
            Phase::Idle => vec![Line::from("Enter で開始").bold()],
            Phase::CountIn | Phase::Playing => return,
        };
        let height = u16::try_from(lines.len()).unwrap_or(1).saturating_add(2);
        let popup = centered(frame.area(), 28, height);
        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(lines)
                .alignment(Alignment::Center)
                .block(Block::bordered()),
            popup,
        );
    }
}

/// 在 `area` 中居中取出一块区域
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    let [cell] = Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .areas(row);
    cell
}

/// 终端应用：界面状态与各通道端点
pub(crate) struct App {
    /// 界面状态
    board: Board,
    /// 表现层消息接收端
    view_rx: mpsc::Receiver<ViewMsg>,
    /// 控制消息发送端
    control_tx: mpsc::SyncSender<ControlMsg>,
    /// 原始输入发送端
    input_tx: mpsc::SyncSender<RawInputMsg>,
}

impl App {
    pub(crate) const fn new(
        view_rx: mpsc::Receiver<ViewMsg>,
        control_tx: mpsc::SyncSender<ControlMsg>,
        input_tx: mpsc::SyncSender<RawInputMsg>,
        max_miss: u32,
    ) -> Self {
        Self {
            board: Board::new(max_miss),
            view_rx,
            control_tx,
            input_tx,
        }
    }

    /// 界面主循环：取消息、绘制、轮询按键
    pub(crate) fn run(mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();
            loop {
                match self.view_rx.try_recv() {
                    Ok(msg) => self.board.apply(msg, now),
                    Err(mpsc::TryRecvError::Empty) => break,
                    Err(mpsc::TryRecvError::Disconnected) => {
                        self.board.apply(ViewMsg::Closed, now);
                        break;
                    }
                }
            }
            if self.board.is_closed() {
                break;
            }
            terminal.draw(|frame| self.board.draw(frame, now))?;
            if event::poll(FRAME)? && self.kbd()? {
                break;
            }
        }
        Ok(())
    }

    /// 处理一个终端事件，返回是否应退出
    fn kbd(&self) -> Result<bool> {
        let Event::Key(KeyEvent {
            code,
            kind: KeyEventKind::Press,
            ..
        }) = event::read()?
        else {
            return Ok(false);
        };
        let control = match code {
            KeyCode::Esc | KeyCode::Char('q') => {
                let _ = self.control_tx.try_send(ControlMsg::Quit);
                return Ok(true);
            }
            KeyCode::Enter => Some(ControlMsg::Start),
            KeyCode::Char('r') => Some(ControlMsg::Restart),
            KeyCode::Char('p') => Some(ControlMsg::TogglePause),
            _ => None,
        };
        if let Some(msg) = control {
            return Ok(match self.control_tx.try_send(msg) {
                Ok(()) => false,
                Err(mpsc::TrySendError::Full(msg)) => {
                    warn!(?msg, "控制消息积压，已丢弃");
                    false
                }
                Err(mpsc::TrySendError::Disconnected(_)) => true,
            });
        }
        if let Some(name) = key_code_name(code) {
            let raw = RawInputMsg::Key(RawKeyCode(name));
            if let Err(mpsc::TrySendError::Disconnected(_)) = self.input_tx.try_send(raw) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

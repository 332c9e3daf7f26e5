//! # UTATSUMI - 终端平台实现
//!
//! 提供基于 ratatui 的终端界面与键盘事件分发

mod app;

pub use app::Board;

use std::sync::mpsc;

use anyhow::Result;
use ratatui::crossterm::event::KeyCode;

use utatsumi::loops::{ControlMsg, RawInputMsg, ViewMsg};

/// 将终端按键转换为配置文件使用的按键代码字符串
///
/// 方向键为 `ArrowUp` 等，字母键为 `KeyA` 等，数字键为 `Digit1` 等。
/// 无对应名称的按键返回 `None`。
#[must_use]
pub fn key_code_name(code: KeyCode) -> Option<String> {
    let name = match code {
        KeyCode::Up => "ArrowUp".to_owned(),
        KeyCode::Down => "ArrowDown".to_owned(),
        KeyCode::Left => "ArrowLeft".to_owned(),
        KeyCode::Right => "ArrowRight".to_owned(),
        KeyCode::Char(' ') => "Space".to_owned(),
        KeyCode::Char(c) if c.is_ascii_alphabetic() => format!("Key{}", c.to_ascii_uppercase()),
        KeyCode::Char(c) if c.is_ascii_digit() => format!("Digit{c}"),
        _ => return None,
    };
    Some(name)
}

/// 运行终端界面直到退出
///
/// # Errors
///
/// - 终端读写失败
pub fn run(
    view_rx: mpsc::Receiver<ViewMsg>,
    control_tx: mpsc::SyncSender<ControlMsg>,
    input_tx: mpsc::SyncSender<RawInputMsg>,
    max_miss: u32,
) -> Result<()> {
    let mut terminal = ratatui::init();
    let result = app::App::new(view_rx, control_tx, input_tx, max_miss).run(&mut terminal);
    ratatui::restore();
    result
}

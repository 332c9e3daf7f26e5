//! 事件循环模块入口
//!
//! 提供三个子模块：
//! - `audio`：提示音与语音播放循环
//! - `key_map`：按键映射模块
//! - `main_loop`：节拍推进与事件分发循环

pub mod audio;
pub mod key_map;
pub mod main_loop;

use crate::round::RoundEvent;
use crate::token::Token;

/// 控制主循环的消息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMsg {
    /// 开始（回合进行中时忽略）
    Start,
    /// 丢弃当前回合并重新开始
    Restart,
    /// 暂停
    Pause,
    /// 恢复
    Resume,
    /// 在暂停与游戏中切换
    TogglePause,
    /// 退出主循环
    Quit,
}

/// 原始按键代码（平台无关表示）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawKeyCode(pub String);

/// 原始输入消息（从前端传递到 core）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawInputMsg {
    /// 键盘按下
    Key(RawKeyCode),
    /// 直接按下某个记号索引（屏幕按钮等）
    Index(usize),
}

/// 输入事件消息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMsg {
    /// 按下某个记号
    Press(Token),
}

/// 表现层消息
#[derive(Debug, Clone, PartialEq)]
pub enum ViewMsg {
    /// 引擎事件
    Round(RoundEvent),
    /// 主循环已退出
    Closed,
}

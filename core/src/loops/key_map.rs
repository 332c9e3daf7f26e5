//! 按键映射：将原始按键代码转换为记号
//!
//! 负责维护配置的键位映射关系，并将原始输入事件转换为游戏逻辑输入。

use std::collections::HashMap;

use crate::loops::{InputMsg, RawInputMsg, RawKeyCode};
use crate::token::Token;

/// 按键映射器
pub struct KeyMap {
    /// 按键代码字符串到记号的映射
    map: HashMap<String, Token>,
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::new(vec![
            ("ArrowUp".into(), Token::Up),
            ("ArrowLeft".into(), Token::Left),
            ("ArrowRight".into(), Token::Right),
        ])
    }
}

impl KeyMap {
    /// 从（按键代码, 记号）列表创建映射器
    ///
    /// 同一按键出现多次时以后者为准。
    #[must_use]
    pub fn new(bindings: Vec<(String, Token)>) -> Self {
        Self {
            map: bindings.into_iter().collect(),
        }
    }

    /// 将原始输入消息转换为语义化输入消息
    ///
    /// 未映射的按键、越界的记号索引返回 `None`
    #[must_use]
    pub fn convert(&self, raw_msg: RawInputMsg) -> Option<InputMsg> {
        match raw_msg {
            RawInputMsg::Key(RawKeyCode(key_str)) => {
                self.map.get(&key_str).copied().map(InputMsg::Press)
            }
            RawInputMsg::Index(idx) => Token::from_index(idx).map(InputMsg::Press),
        }
    }
}

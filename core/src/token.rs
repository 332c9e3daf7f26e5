//! 节拍记号：うー / たつ / みー
//!
//! 三个记号分别绑定 ↑ / ← / → 三个输入，并各自带有显示字形与语音提示标识。

/// 节拍记号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    /// うー（索引 0，↑）
    Up,
    /// たつ（索引 1，←）
    Left,
    /// みー（索引 2，→）
    Right,
}

impl Token {
    /// 全部记号（按索引顺序）
    pub const ALL: [Self; 3] = [Self::Up, Self::Left, Self::Right];

    /// 由索引构造记号，超出 `0..3` 时返回 `None`
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Up),
            1 => Some(Self::Left),
            2 => Some(Self::Right),
            _ => None,
        }
    }

    /// 记号索引
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Up => 0,
            Self::Left => 1,
            Self::Right => 2,
        }
    }

    /// 显示字形
    #[must_use]
    pub const fn glyph(self) -> &'static str {
        match self {
            Self::Up => "うー",
            Self::Left => "たつ",
            Self::Right => "みー",
        }
    }

    /// 按键标签
    #[must_use]
    pub const fn key_label(self) -> &'static str {
        match self {
            Self::Up => "↑",
            Self::Left => "←",
            Self::Right => "→",
        }
    }

    /// 语音提示标识（对应语音文件名）
    #[must_use]
    pub const fn cue_id(self) -> &'static str {
        match self {
            Self::Up => "u",
            Self::Left => "tatsu",
            Self::Right => "mi",
        }
    }
}

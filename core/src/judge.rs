//! 判定：以拍末前的固定偏移为目标时刻，按偏差分级
//!
//! - 目标时刻 = 拍起点 + 拍长 − `target_from_end_ms`
//! - 无输入或记号不符 → MISS
//! - `|偏差| ≤ perfect_ms` → PERFECT，`≤ ok_ms` → OK，否则 MISS

use crate::clock::Millis;
use crate::token::Token;

/// 判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JudgeOutcome {
    /// 完美
    Perfect,
    /// 合格
    Ok,
    /// 失误
    Miss,
}

impl JudgeOutcome {
    /// 显示标签
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Perfect => "PERFECT",
            Self::Ok => "OK",
            Self::Miss => "MISS",
        }
    }
}

/// 当拍缓存的输入
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferedInput {
    /// 按下的记号
    pub token: Token,
    /// 按下时刻
    pub at: Millis,
}

/// 判定窗口参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JudgeWindows {
    /// 目标时刻相对拍末提前的量
    pub target_from_end_ms: Millis,
    /// PERFECT 窗口（±）
    pub perfect_ms: Millis,
    /// OK 窗口（±）
    pub ok_ms: Millis,
}

impl Default for JudgeWindows {
    fn default() -> Self {
        Self {
            target_from_end_ms: 60.0,
            perfect_ms: 90.0,
            ok_ms: 180.0,
        }
    }
}

impl JudgeWindows {
    /// 判定目标时刻
    #[must_use]
    pub fn target_time(&self, beat_start_at: Millis, beat_interval_ms: Millis) -> Millis {
        beat_start_at + beat_interval_ms - self.target_from_end_ms
    }

    /// 输入相对目标时刻的偏差（负值为提前，正值为滞后）
    #[must_use]
    pub fn timing_delta(
        &self,
        input_at: Millis,
        beat_start_at: Millis,
        beat_interval_ms: Millis,
    ) -> Millis {
        input_at - self.target_time(beat_start_at, beat_interval_ms)
    }

    /// 按偏差分级
    #[must_use]
    pub fn classify(&self, delta: Millis) -> JudgeOutcome {
        let abs_delta = delta.abs();
        if abs_delta <= self.perfect_ms {
            JudgeOutcome::Perfect
        } else if abs_delta <= self.ok_ms {
            JudgeOutcome::Ok
        } else {
            JudgeOutcome::Miss
        }
    }

    /// 判定一拍
    #[must_use]
    pub fn judge(
        &self,
        expected: Token,
        input: Option<BufferedInput>,
        beat_start_at: Millis,
        beat_interval_ms: Millis,
    ) -> JudgeOutcome {
        let Some(input) = input else {
            return JudgeOutcome::Miss;
        };
        if input.token != expected {
            return JudgeOutcome::Miss;
        }
        self.classify(self.timing_delta(input.at, beat_start_at, beat_interval_ms))
    }
}

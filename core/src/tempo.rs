//! 速度模型：BPM 与拍长换算，每周递增直至上限

use crate::clock::Millis;
use crate::rules::MS_PER_MINUTE;

/// 速度模型
#[derive(Debug, Clone, PartialEq)]
pub struct TempoModel {
    /// 初始 BPM
    initial: f64,
    /// 每周增量
    step: f64,
    /// 上限
    max: f64,
    /// 当前 BPM
    bpm: f64,
}

impl TempoModel {
    /// 创建速度模型，初始值不会超过上限
    #[must_use]
    pub fn new(initial: f64, step: f64, max: f64) -> Self {
        let initial = initial.min(max);
        Self {
            initial,
            step,
            max,
            bpm: initial,
        }
    }

    /// 当前 BPM
    #[must_use]
    pub const fn current_bpm(&self) -> f64 {
        self.bpm
    }

    /// 一拍的时长（毫秒），总是由当前 BPM 推导
    #[must_use]
    pub fn beat_interval_ms(&self) -> Millis {
        MS_PER_MINUTE / self.bpm
    }

    /// 完成一周后加速
    pub fn advance_loop(&mut self) {
        self.bpm = (self.bpm + self.step).min(self.max);
    }

    /// 回到初始 BPM
    pub const fn reset(&mut self) {
        self.bpm = self.initial;
    }
}

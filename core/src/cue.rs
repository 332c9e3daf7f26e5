//! 提示音调度：一次性延迟任务，按纪元（epoch）失效
//!
//! 每个排队的提示音记录入队时的纪元；开始 / 重开时纪元递增，
//! 旧纪元的提示音在到期时被丢弃而不会发声。

use crate::clock::Millis;

/// 已排队的提示音
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledCue {
    /// 是否为重音
    pub accented: bool,
    /// 触发时刻
    pub fire_at: Millis,
    /// 入队时的纪元
    pub epoch: u64,
}

/// 提示音队列
#[derive(Debug, Default)]
pub struct CueQueue {
    /// 当前纪元
    epoch: u64,
    /// 等待触发的提示音
    pending: Vec<ScheduledCue>,
}

impl CueQueue {
    /// 当前纪元
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// 等待中的提示音数量（含已失效但尚未到期的）
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// 排队一个提示音
    pub fn schedule(&mut self, accented: bool, fire_at: Millis) -> ScheduledCue {
        let cue = ScheduledCue {
            accented,
            fire_at,
            epoch: self.epoch,
        };
        self.pending.push(cue);
        cue
    }

    /// 使此前排队的全部提示音失效
    pub const fn invalidate(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// 取出到期的提示音
    ///
    /// 到期但纪元过期、或 `audible` 为假时直接丢弃；返回值按触发时刻排序。
    pub fn take_due(&mut self, now: Millis, audible: bool) -> Vec<ScheduledCue> {
        let epoch = self.epoch;
        let mut due = Vec::new();
        self.pending.retain(|cue| {
            if cue.fire_at > now {
                return true;
            }
            if audible && cue.epoch == epoch {
                due.push(*cue);
            }
            false
        });
        due.sort_by(|a, b| a.fire_at.total_cmp(&b.fire_at));
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_only_when_due() {
        let mut queue = CueQueue::default();
        queue.schedule(false, 100.0);
        queue.schedule(true, 200.0);
        assert!(queue.take_due(50.0, true).is_empty());
        let due = queue.take_due(150.0, true);
        assert_eq!(due.len(), 1);
        assert!(!due.iter().any(|c| c.accented));
        let due = queue.take_due(250.0, true);
        assert_eq!(due.len(), 1);
        assert!(due.iter().all(|c| c.accented));
        assert_eq!(queue.pending_len(), 0);
    }

    #[test]
    fn stale_epoch_is_suppressed() {
        let mut queue = CueQueue::default();
        queue.schedule(true, 100.0);
        queue.invalidate();
        queue.schedule(false, 100.0);
        let due = queue.take_due(100.0, true);
        assert_eq!(due.len(), 1);
        assert_eq!(due.first().map(|c| c.epoch), Some(queue.epoch()));
    }

    #[test]
    fn inaudible_due_cues_are_dropped() {
        let mut queue = CueQueue::default();
        queue.schedule(false, 10.0);
        assert!(queue.take_due(20.0, false).is_empty());
        assert_eq!(queue.pending_len(), 0);
    }
}

//! 时钟源：为每次调度 tick 提供单调时间戳（毫秒）

use std::cell::Cell;

use gametime::{TimeSpan, TimeStamp};

/// 以毫秒表示的时间戳 / 时长
pub type Millis = f64;

/// 将 `TimeSpan` 换算为毫秒
#[must_use]
pub fn span_ms(span: TimeSpan) -> Millis {
    span.as_nanos() as f64 / 1_000_000.0
}

/// 时钟源接口
pub trait ClockSource {
    /// 当前单调时间（毫秒）
    fn now(&self) -> Millis;
}

/// 系统时钟：以创建时刻为原点
pub struct SystemClock {
    /// 原点
    origin: TimeStamp,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    /// 以当前时刻为原点创建时钟
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: TimeStamp::now(),
        }
    }
}

impl ClockSource for SystemClock {
    fn now(&self) -> Millis {
        let elapsed = TimeStamp::now()
            .checked_elapsed_since(self.origin)
            .unwrap_or(TimeSpan::ZERO);
        span_ms(elapsed).max(0.0)
    }
}

/// 手动时钟：由调用方推进，用于测试与回放
#[derive(Debug, Default)]
pub struct ManualClock {
    /// 当前时间
    now: Cell<Millis>,
}

impl ManualClock {
    /// 以指定时间创建
    #[must_use]
    pub const fn at(now: Millis) -> Self {
        Self {
            now: Cell::new(now),
        }
    }

    /// 设置当前时间
    pub fn set(&self, now: Millis) {
        self.now.set(now);
    }

    /// 向前推进
    pub fn advance(&self, by: Millis) {
        self.now.set(self.now.get() + by);
    }
}

impl ClockSource for ManualClock {
    fn now(&self) -> Millis {
        self.now.get()
    }
}

impl<C: ClockSource + ?Sized> ClockSource for &C {
    fn now(&self) -> Millis {
        (**self).now()
    }
}

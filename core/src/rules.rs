//! 游戏规则参数
//!
//! 所有常量均在此给出默认值，测试与配置文件可以覆盖。

use crate::clock::Millis;
use crate::judge::JudgeWindows;

/// 每分钟毫秒数
pub const MS_PER_MINUTE: Millis = 60_000.0;

/// 规则参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rules {
    /// 初始 BPM
    pub initial_bpm: f64,
    /// 每完成一周增加的 BPM
    pub bpm_step: f64,
    /// BPM 上限
    pub max_bpm: f64,
    /// 开始前的预备拍数
    pub count_in_beats: u32,
    /// 新一周首拍前的留白（毫秒）
    pub lead_in_ms: Millis,
    /// 允许的最大失误数，达到即结束
    pub max_miss: u32,
    /// 序列中随机部分的长度（其后固定接 うー・たつ・みー）
    pub random_head: usize,
    /// 判定窗口
    pub judge: JudgeWindows,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            initial_bpm: 90.0,
            bpm_step: 6.0,
            max_bpm: 220.0,
            count_in_beats: 4,
            lead_in_ms: 400.0,
            max_miss: 5,
            random_head: 4,
            judge: JudgeWindows::default(),
        }
    }
}

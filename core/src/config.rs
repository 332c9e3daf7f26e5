//! 系统配置定义与解析

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, ensure};
use serde::{Deserialize, Deserializer, de::Error as _};

use crate::clock::span_ms;
use crate::judge::JudgeWindows;
use crate::rules::Rules;
use crate::token::Token;

/// 系统运行时配置
#[derive(Deserialize, Clone)]
pub struct Sys {
    /// 键位映射配置
    pub keys: Keys,
    /// 速度配置
    pub tempo: Tempo,
    /// 回合配置
    pub round: Round,
    /// 判定配置
    pub judge: Judge,
    /// 音频配置
    pub audio: Audio,
}

/// 键位配置（原始按键代码）
#[derive(Deserialize, Clone)]
pub struct Keys {
    /// うー 对应的按键
    pub up: String,
    /// たつ 对应的按键
    pub left: String,
    /// みー 对应的按键
    pub right: String,
}

impl Keys {
    /// 按记号顺序列出（按键代码, 记号）
    #[must_use]
    pub fn bindings(&self) -> Vec<(String, Token)> {
        vec![
            (self.up.clone(), Token::Up),
            (self.left.clone(), Token::Left),
            (self.right.clone(), Token::Right),
        ]
    }
}

/// 速度配置
#[derive(Deserialize, Clone)]
pub struct Tempo {
    /// 初始 BPM
    pub initial_bpm: f64,
    /// 每周增量
    pub bpm_step: f64,
    /// 上限
    pub max_bpm: f64,
}

/// 回合配置
#[derive(Deserialize, Clone)]
pub struct Round {
    /// 预备拍数
    pub count_in_beats: u32,
    #[serde(rename = "lead_in_ms", deserialize_with = "de_timespan_ms")]
    /// 新一周首拍前的留白
    pub lead_in: gametime::TimeSpan,
    /// 最大失误数
    pub max_miss: u32,
    /// 序列随机部分长度
    pub random_head: usize,
}

/// 判定配置
#[derive(Deserialize, Clone)]
pub struct Judge {
    #[serde(rename = "target_from_end_ms", deserialize_with = "de_timespan_ms")]
    /// 判定目标相对拍末的提前量
    pub target_from_end: gametime::TimeSpan,
    #[serde(rename = "perfect_ms", deserialize_with = "de_timespan_ms")]
    /// PERFECT 窗口（±）
    pub perfect: gametime::TimeSpan,
    #[serde(rename = "ok_ms", deserialize_with = "de_timespan_ms")]
    /// OK 窗口（±）
    pub ok: gametime::TimeSpan,
}

impl Judge {
    /// 转换为判定窗口
    #[must_use]
    pub fn windows(&self) -> JudgeWindows {
        JudgeWindows {
            target_from_end_ms: span_ms(self.target_from_end),
            perfect_ms: span_ms(self.perfect),
            ok_ms: span_ms(self.ok),
        }
    }
}

/// 音频配置
#[derive(Deserialize, Clone)]
pub struct Audio {
    /// 是否启用声音
    pub enabled: bool,
    /// 语音文件目录（`<cue>.mp3`）
    pub voice_dir: PathBuf,
}

impl Audio {
    /// 各记号的语音文件路径
    #[must_use]
    pub fn voice_paths(&self) -> Vec<(Token, PathBuf)> {
        Token::ALL
            .iter()
            .map(|t| (*t, self.voice_dir.join(format!("{}.mp3", t.cue_id()))))
            .collect()
    }
}

impl Sys {
    /// 校验并转换为引擎规则
    ///
    /// # Errors
    ///
    /// - BPM 不为正、增量为负或上限低于初始值
    /// - OK 窗口窄于 PERFECT 窗口
    /// - 最大失误数为 0
    pub fn rules(&self) -> Result<Rules> {
        let tempo = &self.tempo;
        ensure!(
            tempo.initial_bpm.is_finite() && tempo.initial_bpm > 0.0,
            "initial_bpm 必须为正数：{}",
            tempo.initial_bpm
        );
        ensure!(
            tempo.bpm_step.is_finite() && tempo.bpm_step >= 0.0,
            "bpm_step 不能为负：{}",
            tempo.bpm_step
        );
        ensure!(
            tempo.max_bpm.is_finite() && tempo.max_bpm >= tempo.initial_bpm,
            "max_bpm（{}）不能低于 initial_bpm（{}）",
            tempo.max_bpm,
            tempo.initial_bpm
        );
        let judge = self.judge.windows();
        ensure!(
            judge.ok_ms >= judge.perfect_ms,
            "ok_ms（{}）不能小于 perfect_ms（{}）",
            judge.ok_ms,
            judge.perfect_ms
        );
        ensure!(self.round.max_miss > 0, "max_miss 必须大于 0");
        Ok(Rules {
            initial_bpm: tempo.initial_bpm,
            bpm_step: tempo.bpm_step,
            max_bpm: tempo.max_bpm,
            count_in_beats: self.round.count_in_beats,
            lead_in_ms: span_ms(self.round.lead_in),
            max_miss: self.round.max_miss,
            random_head: self.round.random_head,
            judge,
        })
    }
}

/// 从 TOML 字符串解析系统配置
///
/// # Errors
///
/// - TOML 解析失败
/// - 配置字段反序列化失败
pub fn parse_sys_str(s: &str) -> Result<Sys> {
    let cfg: Sys = toml::from_str(s)?;
    Ok(cfg)
}

/// 从指定路径加载系统配置（TOML）
///
/// # Errors
///
/// - 读取文件失败
/// - TOML 解析失败
/// - 配置字段反序列化失败
pub fn load_sys(path: &Path) -> Result<Sys> {
    let s = std::fs::read_to_string(path)?;
    parse_sys_str(&s)
}

/// 配置中时长字段的上限（1 小时）
const MAX_SPAN_MS: f64 = 3_600_000.0;

/// 反序列化毫秒为 `TimeSpan`，负数、非有限值与超过上限的值报错
fn de_timespan_ms<'de, D>(deserializer: D) -> Result<gametime::TimeSpan, D::Error>
where
    D: Deserializer<'de>,
{
    let ms = f64::deserialize(deserializer)?;
    if ms.is_nan() || ms < 0.0 || ms > MAX_SPAN_MS {
        return Err(D::Error::custom(format!(
            "毫秒数超出范围 [0, {MAX_SPAN_MS}]：{ms}"
        )));
    }
    let dur = Duration::try_from_secs_f64(ms / 1000.0).map_err(D::Error::custom)?;
    Ok(gametime::TimeSpan::from_duration(dur))
}

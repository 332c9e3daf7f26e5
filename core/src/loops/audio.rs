//! 音频播放循环
//!
//! - 合成节拍提示音（方波，重音更高更响）
//! - 预加载三个记号的语音，输入被接受时播放
//! - 无可用音频设备时静音运行，只消费消息

use std::{collections::HashMap, path::PathBuf, sync::mpsc};

use anyhow::Result;
use async_fs as afs;
use futures_lite::future;
use rodio::{Source, buffer::SamplesBuffer, decoder::Decoder, stream::OutputStream};
use tracing::{info, warn};

use crate::token::Token;

/// 提示音采样率
const CLICK_SAMPLE_RATE: u32 = 44_100;
/// 提示音总长（秒）
const CLICK_LEN_SECS: f32 = 0.09;
/// 起音时长（秒）
const CLICK_ATTACK_SECS: f32 = 0.005;
/// 衰减到静音的时刻（秒）
const CLICK_DECAY_END_SECS: f32 = 0.08;
/// 静音电平
const SILENT_GAIN: f32 = 0.0001;

/// 音频循环消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// 预加载语音文件
    PreloadVoices {
        /// 记号与对应文件路径
        files: Vec<(Token, PathBuf)>,
    },
    /// 播放节拍提示音
    Click {
        /// 是否为重音
        accent: bool,
    },
    /// 播放记号语音
    Voice(Token),
}

/// 将原始字节数据解码为可播放的采样缓冲
fn decode_bytes(bytes: Vec<u8>) -> Result<SamplesBuffer> {
    let decoder = Decoder::new(std::io::Cursor::new(bytes))?;
    let channels = decoder.channels();
    let sample_rate = decoder.sample_rate();
    let samples: Vec<f32> = decoder.collect();
    Ok(SamplesBuffer::new(channels, sample_rate, samples))
}

/// 合成提示音采样：方波 + 指数包络
#[must_use]
pub fn click_samples(accent: bool) -> Vec<f32> {
    let freq = if accent { 1280.0 } else { 980.0 };
    let peak: f32 = if accent { 0.18 } else { 0.12 };
    let rate = CLICK_SAMPLE_RATE as f32;
    let len = (CLICK_LEN_SECS * rate) as usize;
    (0..len)
        .map(|i| {
            let t = i as f32 / rate;
            let gain = if t < CLICK_ATTACK_SECS {
                exp_ramp(SILENT_GAIN, peak, t / CLICK_ATTACK_SECS)
            } else if t < CLICK_DECAY_END_SECS {
                let span = CLICK_DECAY_END_SECS - CLICK_ATTACK_SECS;
                exp_ramp(peak, SILENT_GAIN, (t - CLICK_ATTACK_SECS) / span)
            } else {
                0.0
            };
            let phase = (t * freq).fract();
            let square = if phase < 0.5 { 1.0 } else { -1.0 };
            square * gain
        })
        .collect()
}

/// 指数插值，`x` 取 `[0, 1]`
fn exp_ramp(from: f32, to: f32, x: f32) -> f32 {
    from * (to / from).powf(x.clamp(0.0, 1.0))
}

/// 音频后端与语音缓存
struct Audio {
    /// 音频输出流
    stream: OutputStream,
    /// 记号到已解码语音的缓存
    voices: HashMap<Token, SamplesBuffer>,
    /// 预生成的提示音（普通, 重音）
    clicks: [SamplesBuffer; 2],
}

impl Audio {
    /// 创建音频输出流并生成提示音
    fn new() -> Result<Self> {
        let stream = rodio::OutputStreamBuilder::open_default_stream()?;
        Ok(Self {
            stream,
            voices: HashMap::new(),
            clicks: [false, true]
                .map(|accent| SamplesBuffer::new(1, CLICK_SAMPLE_RATE, click_samples(accent))),
        })
    }

    /// 读取并解码全部语音，失败的条目仅告警
    fn preload(&mut self, files: Vec<(Token, PathBuf)>) {
        for (token, path) in files {
            let loaded = future::block_on(afs::read(&path))
                .map_err(anyhow::Error::from)
                .and_then(decode_bytes);
            match loaded {
                Ok(buffer) => {
                    self.voices.insert(token, buffer);
                }
                Err(e) => warn!(?token, path = %path.display(), "语音加载失败：{e}"),
            }
        }
        info!(loaded = self.voices.len(), "语音预加载完成");
    }

    fn play(&self, msg: Msg) {
        match msg {
            Msg::Click { accent } => {
                let [normal, accented] = &self.clicks;
                let buffer = if accent { accented } else { normal };
                self.stream.mixer().add(buffer.clone());
            }
            Msg::Voice(token) => {
                if let Some(buffer) = self.voices.get(&token) {
                    self.stream.mixer().add(buffer.clone());
                }
            }
            Msg::PreloadVoices { .. } => {}
        }
    }
}

/// 音频循环：预加载与播放
///
/// - 从 `rx` 接收预加载或播放请求，直到发送端全部断开
/// - 打开音频设备失败时静音消费消息，节拍与判定不受影响
pub fn run_audio_loop(rx: mpsc::Receiver<Msg>) {
    let mut audio = match Audio::new() {
        Ok(a) => Some(a),
        Err(e) => {
            warn!("无法打开音频设备，静音运行：{e}");
            None
        }
    };
    while let Ok(msg) = rx.recv() {
        let Some(audio) = audio.as_mut() else {
            continue;
        };
        match msg {
            Msg::PreloadVoices { files } => audio.preload(files),
            other => audio.play(other),
        }
    }
}

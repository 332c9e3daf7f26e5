//! # UTATSUMI 终端版主程序

use std::{path::PathBuf, sync::mpsc, thread};

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use utatsumi::{
    RoundEngine, SequenceGenerator, SystemClock,
    config::load_sys,
    logging,
    loops::{ControlMsg, RawInputMsg, ViewMsg, audio, key_map::KeyMap, main_loop},
};

#[derive(Parser)]
/// 命令行参数
struct ExecArgs {
    #[arg(long, default_value = "config_sys.toml")]
    /// 系统配置文件路径
    config: PathBuf,
    #[arg(long)]
    /// 固定随机种子（用于复现序列）
    seed: Option<u64>,
    #[arg(long)]
    /// 关闭声音
    mute: bool,
    #[arg(long, default_value = "utatsumi.log")]
    /// 日志文件路径（终端界面占用标准输出）
    log_file: PathBuf,
}

fn main() -> Result<()> {
    let args = ExecArgs::parse();
    logging::init_logging(Some(&args.log_file))?;
    let sys = load_sys(&args.config)?;
    let rules = sys.rules()?;
    info!(config = %args.config.display(), seed = ?args.seed, "启动");

    let (control_tx, control_rx) = mpsc::sync_channel::<ControlMsg>(4);
    let (view_tx, view_rx) = mpsc::sync_channel::<ViewMsg>(1024);
    let (raw_input_tx, raw_input_rx) = mpsc::sync_channel::<RawInputMsg>(64);

    let audio_enabled = sys.audio.enabled && !args.mute;
    let (audio_tx, audio_thread) = if audio_enabled {
        let (audio_tx, audio_rx) = mpsc::sync_channel::<audio::Msg>(64);
        let handle = thread::spawn(move || audio::run_audio_loop(audio_rx));
        if audio_tx
            .send(audio::Msg::PreloadVoices {
                files: sys.audio.voice_paths(),
            })
            .is_err()
        {
            warn!("音频循环已退出，静音运行");
        }
        (Some(audio_tx), Some(handle))
    } else {
        info!("声音已关闭");
        (None, None)
    };

    let generator = match args.seed {
        Some(seed) => SequenceGenerator::from_seed(seed, rules.random_head),
        None => SequenceGenerator::from_os_rng(rules.random_head),
    };
    let key_map = KeyMap::new(sys.keys.bindings());
    let driver = main_loop::Driver::new(
        RoundEngine::new(rules, generator),
        SystemClock::new(),
        key_map,
        control_rx,
        raw_input_rx,
        view_tx,
        audio_tx,
    );
    let main_thread = thread::spawn(move || main_loop::run(driver));

    let ui_result = utatsumi_term::run(view_rx, control_tx, raw_input_tx, rules.max_miss);

    if main_thread.join().is_err() {
        warn!("主循环线程异常退出");
    }
    if let Some(handle) = audio_thread
        && handle.join().is_err()
    {
        warn!("音频线程异常退出");
    }
    ui_result
}

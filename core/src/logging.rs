//! 日志系统初始化模块

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;

/// 初始化全局日志系统
///
/// 使用 `tracing-subscriber`，支持环境变量 `RUST_LOG` 控制日志级别。
/// 给出 `log_file` 时写入该文件（终端界面占用标准输出时使用），否则写到标准错误。
///
/// # 使用方式
///
/// ```bash
/// RUST_LOG=info cargo run          # info 及以上级别
/// RUST_LOG=debug cargo run         # debug 及以上级别
/// RUST_LOG=warn cargo run          # 仅警告和错误
/// ```
///
/// # Errors
///
/// - 创建日志文件失败
pub fn init_logging(log_file: Option<&Path>) -> Result<()> {
    use tracing_subscriber::fmt::time::FormatTime;
    use tracing_subscriber::{EnvFilter, fmt};

    // 自定义时间格式化器：只显示 HH:MM:SS.微秒
    struct CustomTime;

    impl FormatTime for CustomTime {
        fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
            let now = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default();

            let total_secs = now.as_secs();
            let micros = now.subsec_micros();

            let h = (total_secs / 3600) % 24;
            let m = (total_secs / 60) % 60;
            let s = total_secs % 60;

            write!(w, "{h:02}:{m:02}:{s:02}.{micros:06}")
        }
    }

    // 从环境变量 RUST_LOG 读取日志级别，默认为 info
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = fmt()
        .with_env_filter(env_filter)
        .with_target(true) // 显示模块路径
        .with_thread_ids(false) // 不显示线程 ID
        .with_file(false) // 不显示文件名
        .with_line_number(false) // 不显示行号
        .with_timer(CustomTime)
        .compact();

    match log_file {
        Some(path) => {
            let file = File::create(path)?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_ansi(true).with_writer(std::io::stderr).init(),
    }
    Ok(())
}

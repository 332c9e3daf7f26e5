//! UTATSUMI 节拍调度与判定引擎
//!
//! 一个循环的 7 拍序列（4 拍随机 + うー・たつ・みー）以逐周加快的速度呈现，
//! 玩家需要在每拍末尾附近的判定窗口内按下对应的键。

pub mod clock;
pub mod config;
pub mod cue;
pub mod judge;
pub mod logging;
pub mod loops;
pub mod round;
pub mod rules;
pub mod sequence;
pub mod tempo;
pub mod token;

pub use clock::{ClockSource, ManualClock, Millis, SystemClock};
pub use judge::{BufferedInput, JudgeOutcome, JudgeWindows};
pub use round::{Phase, RoundEngine, RoundEvent, RoundState};
pub use rules::Rules;
pub use sequence::SequenceGenerator;
pub use tempo::TempoModel;
pub use token::Token;

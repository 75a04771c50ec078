pub mod recorder;
pub mod replayer;

pub use recorder::{RecordedCall, RecordingExecutor};
pub use replayer::{CommandExecutor, CommandReplayer, ReplayStats};

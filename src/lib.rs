pub mod utils;
pub mod gpu;
pub mod ir;

pub use gpu::driver::types::Tracked;
pub use ir::{CommandExecutor, RecordedCall, RecordingExecutor, ReplayStats};

pub use gpu::*;

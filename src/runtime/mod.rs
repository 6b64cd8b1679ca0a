//! Runtime adapters and the pass loop.

pub mod run_loop;
#[cfg(feature = "tokio-runtime")]
pub mod tokio_delay;

pub use run_loop::{run_loop, LoopOptions};
#[cfg(feature = "tokio-runtime")]
pub use tokio_delay::TokioDelay;

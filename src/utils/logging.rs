//! tracing サブスクライバの初期化

use tracing_subscriber::EnvFilter;

use crate::error::{CaptureError, Result};

/// `RUST_LOG` があればそれを優先し、なければ `clip_capture=info`（verbose 時は debug）
pub fn init_tracing(verbose: bool) -> Result<()> {
    let default_directive = if verbose {
        "clip_capture=debug"
    } else {
        "clip_capture=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| CaptureError::ConfigError(format!("failed to init tracing: {e}")))
}

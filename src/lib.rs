pub mod application;
pub mod cli;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod shortcut;
pub mod utils {
    pub mod config;
    pub mod env;
    pub mod logging;
}

pub use error::{CaptureError, Result};

pub mod accessibility_sys;
pub mod copy_strategy;
pub mod ingest;
pub mod osascript;

pub use copy_strategy::{
    CopyStrategy, InjectedKeystrokeStrategy, MenuCopyStrategy, ScriptKeystrokeStrategy,
    default_strategies,
};
pub use ingest::HttpIngestClient;

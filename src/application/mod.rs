pub mod capture_engine;
pub mod capture_service;
pub mod dispatcher;
pub mod traits;

pub use capture_engine::{CaptureEngine, CaptureReport, SYSTEMIC_FAILURE_THRESHOLD};
pub use capture_service::{CaptureRequest, CaptureService, CaptureTimings};
pub use dispatcher::{DispatchOutcome, Dispatcher, SkipReason};
pub use traits::{IngestResponse, IngestSink};

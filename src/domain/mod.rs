pub mod clipboard;
pub mod hotkey;
pub mod markup;

pub use clipboard::{
    AttemptOutcome, CaptureAttempt, CaptureResult, ClipboardItem, ClipboardSnapshot,
    Representation, RepresentationKind,
};
pub use hotkey::{HotkeyCombo, KeyToken, Modifier, TerminalKey};

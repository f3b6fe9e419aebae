//! プロセス内メモリ上のクリップボード
//!
//! 実クリップボードにアクセスできない環境（ヘッドレス CI 等）や
//! 結合テストで、ネイティブ実装と同じ契約を持つバックエンドとして使う。

use std::sync::Mutex;

use super::ClipboardBackend;
use crate::domain::ClipboardSnapshot;
use crate::error::{CaptureError, Result};

#[derive(Debug, Default)]
struct State {
    snapshot: ClipboardSnapshot,
    revision: u64,
}

/// 全表現形式を保持できるインメモリクリップボード
#[derive(Debug, Default)]
pub struct InMemoryClipboard {
    state: Mutex<State>,
}

impl InMemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: ClipboardSnapshot) -> Self {
        Self {
            state: Mutex::new(State {
                snapshot,
                revision: 0,
            }),
        }
    }

    /// 外部アプリによる書き込みを模擬する（リビジョンが進む）
    pub fn write(&self, snapshot: ClipboardSnapshot) {
        if let Ok(mut state) = self.state.lock() {
            state.snapshot = snapshot;
            state.revision += 1;
        }
    }

    pub fn write_text(&self, text: &str) {
        self.write(ClipboardSnapshot::from_text(text));
    }

    /// 現在の内容
    pub fn current(&self) -> ClipboardSnapshot {
        self.state
            .lock()
            .map(|s| s.snapshot.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|e| CaptureError::ClipboardUnavailable(format!("poisoned: {e}")))
    }
}

impl ClipboardBackend for InMemoryClipboard {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn is_full_fidelity(&self) -> bool {
        true
    }

    fn revision(&self) -> Result<u64> {
        Ok(self.lock()?.revision)
    }

    fn snapshot(&self) -> Result<ClipboardSnapshot> {
        Ok(self.lock()?.snapshot.clone())
    }

    fn restore(&self, snapshot: Option<&ClipboardSnapshot>) -> Result<()> {
        let Some(snapshot) = snapshot else {
            return Ok(());
        };
        let mut state = self.lock()?;
        state.snapshot = snapshot.clone();
        state.revision += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ClipboardItem;
    use crate::domain::clipboard::{mime, uti};

    #[test]
    fn writes_bump_revision() {
        let clipboard = InMemoryClipboard::new();
        let before = clipboard.revision().unwrap();
        clipboard.write_text("hello");
        assert!(clipboard.revision().unwrap() > before);
    }

    #[test]
    fn snapshot_does_not_mutate() {
        let clipboard = InMemoryClipboard::new();
        clipboard.write_text("hello");
        let rev = clipboard.revision().unwrap();
        let _ = clipboard.snapshot().unwrap();
        assert_eq!(clipboard.revision().unwrap(), rev);
    }

    #[test]
    fn restore_rewrites_every_representation() {
        let original = ClipboardSnapshot::new(vec![
            ClipboardItem::new()
                .with(uti::PLAIN_TEXT, "old")
                .with(uti::RTF, r"{\rtf1 old}"),
            ClipboardItem::new().with(uti::PNG, vec![1, 2, 3]),
        ]);
        let clipboard = InMemoryClipboard::with_snapshot(original.clone());
        clipboard.write_text("new selection");

        clipboard.restore(Some(&original)).unwrap();
        assert_eq!(clipboard.current(), original);
    }

    #[test]
    fn restore_none_is_noop() {
        let clipboard = InMemoryClipboard::new();
        clipboard.write_text("keep");
        let rev = clipboard.revision().unwrap();
        clipboard.restore(None).unwrap();
        assert_eq!(clipboard.revision().unwrap(), rev);
        assert_eq!(clipboard.read_text().unwrap(), "keep");
    }

    #[test]
    fn restore_empty_clears() {
        let clipboard = InMemoryClipboard::new();
        clipboard.write_text("captured");
        clipboard.restore(Some(&ClipboardSnapshot::empty())).unwrap();
        assert!(clipboard.current().is_empty());
    }

    #[test]
    fn read_text_prefers_plain_text() {
        let clipboard = InMemoryClipboard::with_snapshot(ClipboardSnapshot::new(vec![
            ClipboardItem::new()
                .with(mime::HTML, "<b>hello</b>")
                .with(mime::PLAIN_TEXT, "hello"),
        ]));
        assert_eq!(clipboard.read_text().unwrap(), "hello");
    }
}

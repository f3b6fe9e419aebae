//! テキストのみのクリップボード（arboard）
//!
//! 複数表現形式の API が無い / 使えない環境向けの劣化モード。
//! - 保存・復元はプレーンテキストのみ（リッチな内容は失われる）
//! - リビジョンは内容の比較から合成するため、同一テキストの再コピーは検出できない

use std::sync::Mutex;

use arboard::Clipboard;

use super::ClipboardBackend;
use crate::domain::ClipboardSnapshot;
use crate::error::{CaptureError, Result};

/// 内容比較で合成するリビジョンカウンタ
#[derive(Debug, Default)]
struct ContentRevision {
    counter: u64,
    /// 最後に観測した内容（`None` は未観測）
    last_seen: Option<Option<String>>,
}

impl ContentRevision {
    fn observe(&mut self, current: Option<String>) -> u64 {
        match &self.last_seen {
            Some(previous) if *previous == current => {}
            Some(_) => {
                self.counter += 1;
                self.last_seen = Some(current);
            }
            None => self.last_seen = Some(current),
        }
        self.counter
    }
}

struct Inner {
    clipboard: Clipboard,
    revision: ContentRevision,
}

impl Inner {
    fn current_text(&mut self) -> Result<Option<String>> {
        match self.clipboard.get_text() {
            Ok(text) => Ok(Some(text)),
            // テキスト以外（画像など）や空のクリップボード
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(e) => Err(CaptureError::ClipboardRead(e.to_string())),
        }
    }
}

/// arboard によるテキストのみのバックエンド
pub struct TextOnlyClipboard {
    inner: Mutex<Inner>,
}

impl TextOnlyClipboard {
    pub fn new() -> Result<Self> {
        let clipboard =
            Clipboard::new().map_err(|e| CaptureError::ClipboardUnavailable(e.to_string()))?;
        Ok(Self {
            inner: Mutex::new(Inner {
                clipboard,
                revision: ContentRevision::default(),
            }),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|e| CaptureError::ClipboardUnavailable(format!("poisoned: {e}")))
    }
}

impl ClipboardBackend for TextOnlyClipboard {
    fn name(&self) -> &'static str {
        "text-only"
    }

    fn is_full_fidelity(&self) -> bool {
        false
    }

    fn revision(&self) -> Result<u64> {
        let mut inner = self.lock()?;
        let current = inner.current_text()?;
        Ok(inner.revision.observe(current))
    }

    fn snapshot(&self) -> Result<ClipboardSnapshot> {
        let mut inner = self.lock()?;
        Ok(match inner.current_text()? {
            Some(text) => ClipboardSnapshot::from_text(&text),
            None => ClipboardSnapshot::empty(),
        })
    }

    fn restore(&self, snapshot: Option<&ClipboardSnapshot>) -> Result<()> {
        let Some(snapshot) = snapshot else {
            return Ok(());
        };
        let mut inner = self.lock()?;
        let target = snapshot.plain_text();
        // 内容が既に一致していれば書き戻さない（テキスト以外の内容を消さないため）
        if inner.current_text()? == target {
            return Ok(());
        }
        match target {
            Some(text) => inner
                .clipboard
                .set_text(text)
                .map_err(|e| CaptureError::ClipboardWrite(e.to_string())),
            None => inner
                .clipboard
                .clear()
                .map_err(|e| CaptureError::ClipboardWrite(e.to_string())),
        }
    }

    fn read_text(&self) -> Result<String> {
        let mut inner = self.lock()?;
        Ok(inner.current_text()?.unwrap_or_default())
    }
}

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use clip_capture::application::{IngestResponse, IngestSink};
use clip_capture::domain::clipboard::uti;
use clip_capture::domain::{ClipboardItem, ClipboardSnapshot};
use clip_capture::error::{CaptureError, Result};
use clip_capture::infrastructure::clipboard::InMemoryClipboard;
use clip_capture::infrastructure::external::CopyStrategy;

// CI環境で実行可能なテストを示すマーカー
#[cfg(feature = "ci-test")]
pub const CI_TEST_MODE: bool = true;

#[cfg(not(feature = "ci-test"))]
pub const CI_TEST_MODE: bool = false;

/// 複数エントリ・複数表現形式を持つ「ユーザーの元のクリップボード」
pub fn old_clipboard() -> ClipboardSnapshot {
    ClipboardSnapshot::new(vec![
        ClipboardItem::new()
            .with(uti::PLAIN_TEXT, "old clipboard value")
            .with(uti::HTML, "<b>old clipboard value</b>")
            .with(uti::RTF, r"{\rtf1\ansi old clipboard value}"),
        ClipboardItem::new().with(uti::PNG, vec![0x89, b'P', b'N', b'G']),
    ])
}

/// 前面アプリの選択をクリップボードへコピーする戦略
pub struct CopiesSelection {
    pub clipboard: Arc<InMemoryClipboard>,
    pub selection: &'static str,
    pub calls: Arc<AtomicUsize>,
}

impl CopiesSelection {
    pub fn new(clipboard: &Arc<InMemoryClipboard>, selection: &'static str) -> Self {
        Self {
            clipboard: clipboard.clone(),
            selection,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl CopyStrategy for CopiesSelection {
    fn name(&self) -> &'static str {
        "copies-selection"
    }

    fn attempt_copy(&self) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.clipboard.write_text(self.selection);
        Ok(true)
    }
}

/// 要求は送れるが、前面アプリに選択がない
pub struct NoSelection(pub &'static str);

impl CopyStrategy for NoSelection {
    fn name(&self) -> &'static str {
        self.0
    }

    fn attempt_copy(&self) -> Result<bool> {
        Ok(true)
    }
}

/// 戦略自体が失敗する
pub struct Failing(pub &'static str);

impl CopyStrategy for Failing {
    fn name(&self) -> &'static str {
        self.0
    }

    fn attempt_copy(&self) -> Result<bool> {
        Err(CaptureError::strategy(self.0, "not permitted"))
    }
}

/// 送信内容を記録するシンク
#[derive(Default)]
pub struct RecordingSink {
    pub sent: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl IngestSink for RecordingSink {
    async fn post_text(&self, text: &str) -> Result<IngestResponse> {
        let mut sent = self.sent.lock().unwrap();
        sent.push(text.to_string());
        Ok(IngestResponse {
            ok: true,
            id: Some(serde_json::json!(sent.len())),
            error: None,
        })
    }
}

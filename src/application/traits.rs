//! Application層の抽象化トレイト定義
//! 外部依存を抽象化し、テスト可能な構造を提供します

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Result;

/// 取り込み API の応答 `{"ok": bool, "id": any?, "error": string?}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IngestResponse {
    pub ok: bool,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

/// キャプチャしたテキストの送信先の抽象化
#[async_trait]
pub trait IngestSink: Send + Sync {
    /// テキストを送信する。`ok: false` の応答は `TransportFailed` として返す
    async fn post_text(&self, text: &str) -> Result<IngestResponse>;
}

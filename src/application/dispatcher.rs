//! キャプチャ結果の送信
//!
//! 送信失敗は記録して捨てる。再送はしない。

use std::sync::Arc;

use crate::application::traits::IngestSink;
use crate::domain::CaptureResult;

/// 送信しなかった理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// クリップボードが変化しなかった（選択なし）
    Unchanged,
    /// 変化はあったがテキストが空白のみ
    EmptyText,
}

/// 送信結果
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Skipped(SkipReason),
    Delivered { id: Option<serde_json::Value> },
    Failed(String),
}

pub struct Dispatcher {
    sink: Arc<dyn IngestSink>,
    max_text_bytes: Option<usize>,
}

impl Dispatcher {
    pub fn new(sink: Arc<dyn IngestSink>) -> Self {
        Self {
            sink,
            max_text_bytes: None,
        }
    }

    /// サイズ上限。超過しても送信はする（切り詰め・拒否は受け手の責任）
    pub fn with_max_text_bytes(mut self, max_text_bytes: Option<usize>) -> Self {
        self.max_text_bytes = max_text_bytes;
        self
    }

    pub async fn send(&self, result: &CaptureResult) -> DispatchOutcome {
        if !result.is_dispatchable() {
            return if result.changed {
                tracing::info!("captured selection contained no text; not sending");
                DispatchOutcome::Skipped(SkipReason::EmptyText)
            } else {
                tracing::debug!("no selection captured; nothing to send");
                DispatchOutcome::Skipped(SkipReason::Unchanged)
            };
        }

        let len = result.text.len();
        if let Some(limit) = self.max_text_bytes {
            if len > limit {
                tracing::warn!(
                    text_bytes = len,
                    limit_bytes = limit,
                    "captured text exceeds size ceiling; sending anyway"
                );
            }
        }

        match self.sink.post_text(&result.text).await {
            Ok(response) => {
                match &response.id {
                    Some(id) => tracing::info!(id = %id, text_bytes = len, "capture delivered"),
                    None => tracing::info!(text_bytes = len, "capture delivered"),
                }
                DispatchOutcome::Delivered { id: response.id }
            }
            Err(e) => {
                e.log("failed to deliver capture");
                DispatchOutcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::traits::IngestResponse;
    use crate::error::{CaptureError, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<String>>,
        fail_with: Option<String>,
    }

    #[async_trait]
    impl IngestSink for RecordingSink {
        async fn post_text(&self, text: &str) -> Result<IngestResponse> {
            self.sent.lock().unwrap().push(text.to_string());
            match &self.fail_with {
                Some(reason) => Err(CaptureError::TransportFailed(reason.clone())),
                None => Ok(IngestResponse {
                    ok: true,
                    id: Some(serde_json::json!(1)),
                    error: None,
                }),
            }
        }
    }

    #[tokio::test]
    async fn unchanged_result_is_never_sent() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = Dispatcher::new(sink.clone());

        let outcome = dispatcher.send(&CaptureResult::unchanged()).await;
        assert_eq!(outcome, DispatchOutcome::Skipped(SkipReason::Unchanged));
        assert!(sink.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn whitespace_only_text_is_not_sent() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = Dispatcher::new(sink.clone());

        let outcome = dispatcher
            .send(&CaptureResult::captured(" \n\t".to_string()))
            .await;
        assert_eq!(outcome, DispatchOutcome::Skipped(SkipReason::EmptyText));
        assert!(sink.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn captured_text_is_delivered_verbatim() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = Dispatcher::new(sink.clone());

        let outcome = dispatcher
            .send(&CaptureResult::captured("draft text".to_string()))
            .await;
        assert_eq!(
            outcome,
            DispatchOutcome::Delivered {
                id: Some(serde_json::json!(1))
            }
        );
        assert_eq!(*sink.sent.lock().unwrap(), vec!["draft text".to_string()]);
    }

    #[tokio::test]
    async fn oversized_text_is_still_sent() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = Dispatcher::new(sink.clone()).with_max_text_bytes(Some(4));

        let outcome = dispatcher
            .send(&CaptureResult::captured("longer than four".to_string()))
            .await;
        assert!(matches!(outcome, DispatchOutcome::Delivered { .. }));
        assert_eq!(sink.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn transport_failure_is_reported_not_raised() {
        let sink = Arc::new(RecordingSink {
            fail_with: Some("connection refused".to_string()),
            ..Default::default()
        });
        let dispatcher = Dispatcher::new(sink.clone());

        let outcome = dispatcher
            .send(&CaptureResult::captured("text".to_string()))
            .await;
        match outcome {
            DispatchOutcome::Failed(reason) => assert!(reason.contains("connection refused")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}

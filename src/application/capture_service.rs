//! キャプチャセッションの管理
//!
//! # 責任
//! - 同時に1セッションだけ走らせる（実行中のトリガーは無視）
//! - キャプチャをブロッキングスレッドで実行し、結果を送信する
//!
//! `trigger` はキーイベントのコールバックから呼ばれても
//! ブロックしないように、フラグの更新とチャンネル送信だけを行う。

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::application::capture_engine::CaptureEngine;
use crate::application::dispatcher::{DispatchOutcome, Dispatcher};
use crate::error::{CaptureError, Result};

/// キャプチャの待機時間設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTimings {
    pub settle_delay: Duration,
    pub attempt_timeout: Duration,
}

/// ワーカーへのキャプチャ要求
#[derive(Debug)]
pub struct CaptureRequest {
    pub requested_at: Instant,
}

pub struct CaptureService {
    engine: Arc<CaptureEngine>,
    dispatcher: Arc<Dispatcher>,
    timings: CaptureTimings,
    busy: Arc<AtomicBool>,
    tx: mpsc::UnboundedSender<CaptureRequest>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<CaptureRequest>>>,
}

impl CaptureService {
    pub fn new(
        engine: Arc<CaptureEngine>,
        dispatcher: Arc<Dispatcher>,
        timings: CaptureTimings,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            engine,
            dispatcher,
            timings,
            busy: Arc::new(AtomicBool::new(false)),
            tx,
            rx: Mutex::new(Some(rx)),
        }
    }

    /// キャプチャセッションを開始する
    ///
    /// 既にセッションが実行中なら何もせず `false` を返す（キューイングしない）。
    pub fn trigger(&self) -> bool {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::info!("capture already in progress; trigger ignored");
            return false;
        }

        let request = CaptureRequest {
            requested_at: Instant::now(),
        };
        if self.tx.send(request).is_err() {
            self.busy.store(false, Ordering::SeqCst);
            tracing::warn!("capture worker is not running; trigger dropped");
            return false;
        }
        tracing::info!("capture triggered");
        true
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// ワーカータスクを起動する。2回目以降はエラー
    pub fn spawn_worker(&self) -> Result<JoinHandle<()>> {
        let mut rx = self
            .rx
            .lock()
            .map_err(|e| CaptureError::SystemError(format!("poisoned: {e}")))?
            .take()
            .ok_or_else(|| CaptureError::SystemError("capture worker already started".into()))?;

        let engine = self.engine.clone();
        let dispatcher = self.dispatcher.clone();
        let busy = self.busy.clone();
        let timings = self.timings;

        Ok(tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                // パニックしても次のトリガーを受け付けられるようにする
                let _session = scopeguard::guard(busy.clone(), |busy| {
                    busy.store(false, Ordering::SeqCst);
                });
                run_session(&engine, &dispatcher, timings, request).await;
            }
            tracing::debug!("capture worker stopped");
        }))
    }
}

async fn run_session(
    engine: &Arc<CaptureEngine>,
    dispatcher: &Dispatcher,
    timings: CaptureTimings,
    request: CaptureRequest,
) -> Option<DispatchOutcome> {
    let capture_engine = engine.clone();
    let result = match tokio::task::spawn_blocking(move || {
        capture_engine.capture(timings.settle_delay, timings.attempt_timeout)
    })
    .await
    {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, "capture task failed");
            return None;
        }
    };

    tracing::info!(
        changed = result.changed,
        text_len = result.text.chars().count(),
        elapsed_ms = request.requested_at.elapsed().as_millis() as u64,
        "capture finished"
    );

    Some(dispatcher.send(&result).await)
}

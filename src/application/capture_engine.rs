//! 選択テキストのキャプチャエンジン
//!
//! # 責任
//! - クリップボード全体の保存
//! - コピー戦略を優先順に試し、リビジョン変化を監視
//! - テキストの取り出し
//! - どの経路で抜けても保存内容を書き戻す
//!
//! 同期 API。キーイベントスレッドや非同期ランタイムからは
//! `spawn_blocking` 経由で呼び出すこと。

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use scopeguard::ScopeGuard;

use crate::domain::{AttemptOutcome, CaptureAttempt, CaptureResult, ClipboardSnapshot};
use crate::error::Result;
use crate::infrastructure::clipboard::ClipboardBackend;
use crate::infrastructure::external::CopyStrategy;

/// 全戦略がエラーになったキャプチャがこの回数続いたら error ログに昇格する
pub const SYSTEMIC_FAILURE_THRESHOLD: u32 = 3;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// 1回のキャプチャの詳細（診断用）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureReport {
    pub result: CaptureResult,
    pub attempts: Vec<CaptureAttempt>,
    /// スナップショットを取得できたか
    pub snapshot_taken: bool,
    /// 書き戻しに成功したか
    pub restored: bool,
    pub elapsed: Duration,
}

/// キャプチャエンジン
pub struct CaptureEngine {
    backend: Arc<dyn ClipboardBackend>,
    strategies: Vec<Box<dyn CopyStrategy>>,
    poll_interval: Duration,
    log_frontmost_app: bool,
    /// snapshot → 戦略 → restore を1つの臨界区間にする
    session: Mutex<()>,
    consecutive_errored: AtomicU32,
}

impl CaptureEngine {
    pub fn new(backend: Arc<dyn ClipboardBackend>, strategies: Vec<Box<dyn CopyStrategy>>) -> Self {
        Self {
            backend,
            strategies,
            poll_interval: DEFAULT_POLL_INTERVAL,
            log_frontmost_app: false,
            session: Mutex::new(()),
            consecutive_errored: AtomicU32::new(0),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(Duration::from_millis(1));
        self
    }

    /// 戦略を試す前に前面アプリ名をログに残す（macOS のみ有効）
    pub fn with_frontmost_app_logging(mut self, enabled: bool) -> Self {
        self.log_frontmost_app = enabled;
        self
    }

    pub fn backend(&self) -> &Arc<dyn ClipboardBackend> {
        &self.backend
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// 選択テキストをキャプチャする
    ///
    /// 失敗はすべて内部で回収され、結果は `CaptureResult` の2値のみ。
    pub fn capture(&self, settle_delay: Duration, attempt_timeout: Duration) -> CaptureResult {
        self.capture_with_report(settle_delay, attempt_timeout).result
    }

    /// `capture` と同じ処理を行い、試行の詳細も返す
    pub fn capture_with_report(
        &self,
        settle_delay: Duration,
        attempt_timeout: Duration,
    ) -> CaptureReport {
        // 前回のキャプチャがパニックしていても臨界区間は使い続ける
        let _session = self
            .session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let started = Instant::now();

        thread::sleep(settle_delay);

        let before = match self.backend.snapshot() {
            Ok(snapshot) => {
                tracing::debug!(
                    backend = self.backend.name(),
                    items = snapshot.items().len(),
                    total_size_bytes = snapshot.total_size_bytes(),
                    "clipboard snapshot taken"
                );
                Some(snapshot)
            }
            Err(e) => {
                e.log("clipboard snapshot failed; it will not be restored");
                None
            }
        };
        let snapshot_taken = before.is_some();

        // パニック経路でも必ず書き戻す
        let guard = scopeguard::guard(before, |before| {
            self.restore(before.as_ref());
        });

        let (result, attempts) = self.run_attempts(attempt_timeout);

        let before = ScopeGuard::into_inner(guard);
        let restored = self.restore(before.as_ref());

        self.track_systemic_failure(&attempts);

        CaptureReport {
            result,
            attempts,
            snapshot_taken,
            restored,
            elapsed: started.elapsed(),
        }
    }

    fn run_attempts(&self, attempt_timeout: Duration) -> (CaptureResult, Vec<CaptureAttempt>) {
        let mut attempts = Vec::with_capacity(self.strategies.len());

        let before_revision = match self.backend.revision() {
            Ok(revision) => revision,
            Err(e) => {
                // 変化を検出できないため戦略は実行しない
                e.log("clipboard revision unavailable; skipping copy strategies");
                return (CaptureResult::unchanged(), attempts);
            }
        };

        self.log_frontmost_app();

        let mut changed = false;
        for strategy in &self.strategies {
            let attempt_started = Instant::now();
            let outcome = self.attempt(strategy.as_ref(), before_revision, attempt_timeout);
            let elapsed = attempt_started.elapsed();
            tracing::debug!(
                strategy = strategy.name(),
                outcome = ?outcome,
                elapsed_ms = elapsed.as_millis() as u64,
                "copy attempt finished"
            );

            changed = outcome == AttemptOutcome::Changed;
            attempts.push(CaptureAttempt {
                strategy: strategy.name(),
                outcome,
                elapsed,
            });
            if changed {
                break;
            }
        }

        // 失敗を報告した戦略が実際にはコピーしていた場合の取りこぼし
        if !changed {
            changed = matches!(self.backend.revision(), Ok(r) if r != before_revision);
        }

        if !changed {
            return (CaptureResult::unchanged(), attempts);
        }

        let text = match self.backend.read_text() {
            Ok(text) => text,
            Err(e) => {
                e.log("failed to read captured text");
                String::new()
            }
        };
        (CaptureResult::captured(text), attempts)
    }

    fn attempt(
        &self,
        strategy: &dyn CopyStrategy,
        before_revision: u64,
        timeout: Duration,
    ) -> AttemptOutcome {
        match catch_unwind(AssertUnwindSafe(|| strategy.attempt_copy())) {
            Ok(Ok(true)) => match self.wait_for_change(before_revision, timeout) {
                Ok(true) => AttemptOutcome::Changed,
                Ok(false) => AttemptOutcome::Unchanged,
                Err(e) => {
                    e.log("clipboard revision poll failed");
                    AttemptOutcome::Errored(e.to_string())
                }
            },
            Ok(Ok(false)) => AttemptOutcome::Unchanged,
            Ok(Err(e)) => {
                e.log(&format!("copy strategy `{}` failed", strategy.name()));
                AttemptOutcome::Errored(e.to_string())
            }
            Err(_) => {
                tracing::warn!(strategy = strategy.name(), "copy strategy panicked");
                AttemptOutcome::Errored("strategy panicked".to_string())
            }
        }
    }

    /// リビジョンが変わるかタイムアウトするまでポーリングする
    fn wait_for_change(&self, before_revision: u64, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.backend.revision()? != before_revision {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            thread::sleep(self.poll_interval.min(deadline - now));
        }
    }

    fn restore(&self, before: Option<&ClipboardSnapshot>) -> bool {
        match self.backend.restore(before) {
            Ok(()) => true,
            Err(e) => {
                e.log("failed to restore clipboard");
                false
            }
        }
    }

    fn track_systemic_failure(&self, attempts: &[CaptureAttempt]) {
        let all_errored = !attempts.is_empty()
            && attempts
                .iter()
                .all(|a| matches!(a.outcome, AttemptOutcome::Errored(_)));
        if !all_errored {
            self.consecutive_errored.store(0, Ordering::SeqCst);
            return;
        }

        let count = self.consecutive_errored.fetch_add(1, Ordering::SeqCst) + 1;
        if count >= SYSTEMIC_FAILURE_THRESHOLD {
            tracing::error!(
                consecutive = count,
                "every copy strategy failed on consecutive captures; check accessibility permission"
            );
        }
    }

    /// 全戦略がエラーになったキャプチャの連続回数
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_errored.load(Ordering::SeqCst)
    }

    fn log_frontmost_app(&self) {
        #[cfg(target_os = "macos")]
        if self.log_frontmost_app {
            let app = crate::infrastructure::external::osascript::frontmost_app_name();
            tracing::info!(app = %app, "capturing selection");
        }
        #[cfg(not(target_os = "macos"))]
        let _ = self.log_frontmost_app;
    }
}

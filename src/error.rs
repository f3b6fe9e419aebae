//! 統一エラーハンドリング
//!
//! clip_capture 全体で使用するエラー型を定義します。
//! キャプチャ中に発生したエラーはほぼ全てローカルで回収されるため、
//! ここでは「どのレベルでログに残すか」の判定もあわせて提供します。

use thiserror::Error;

/// clip_capture 全体で使用する統一エラー型
#[derive(Debug, Error)]
pub enum CaptureError {
    // ========================================
    // 設定関連エラー（起動時のみ致命的）
    // ========================================
    #[error("Invalid hotkey `{spec}`: {reason}")]
    InvalidHotkey { spec: String, reason: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // ========================================
    // クリップボード関連エラー
    // ========================================
    #[error("Clipboard unavailable: {0}")]
    ClipboardUnavailable(String),

    #[error("Clipboard read failed: {0}")]
    ClipboardRead(String),

    #[error("Clipboard write failed: {0}")]
    ClipboardWrite(String),

    // ========================================
    // コピー戦略エラー（次の戦略へフォールスルー）
    // ========================================
    #[error("Copy strategy `{strategy}` failed: {reason}")]
    StrategyFailed {
        strategy: &'static str,
        reason: String,
    },

    #[error("Copy strategy `{0}` is not supported on this platform")]
    StrategyUnsupported(&'static str),

    // ========================================
    // 送信関連エラー
    // ========================================
    #[error("Ingestion transport failed: {0}")]
    TransportFailed(String),

    // ========================================
    // ホットキー関連エラー
    // ========================================
    #[error("Hotkey listener failed: {0}")]
    HotkeyListenerFailed(String),

    #[error("System error: {0}")]
    SystemError(String),
}

/// 統一Result型エイリアス
pub type Result<T> = std::result::Result<T, CaptureError>;

impl CaptureError {
    /// 戦略失敗エラーを作成するヘルパー
    pub fn strategy(strategy: &'static str, reason: impl Into<String>) -> Self {
        CaptureError::StrategyFailed {
            strategy,
            reason: reason.into(),
        }
    }

    /// 起動時に致命的となるエラーか
    pub fn is_fatal_at_startup(&self) -> bool {
        matches!(
            self,
            CaptureError::InvalidHotkey { .. }
                | CaptureError::ConfigError(_)
                | CaptureError::HotkeyListenerFailed(_)
        )
    }

    /// エラーの重要度レベルを取得（握りつぶす際のログレベル選択に使用）
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CaptureError::InvalidHotkey { .. }
            | CaptureError::ConfigError(_)
            | CaptureError::HotkeyListenerFailed(_) => ErrorSeverity::Error,

            CaptureError::ClipboardUnavailable(_)
            | CaptureError::ClipboardWrite(_)
            | CaptureError::StrategyFailed { .. }
            | CaptureError::TransportFailed(_)
            | CaptureError::SystemError(_) => ErrorSeverity::Warning,

            CaptureError::ClipboardRead(_) => ErrorSeverity::Info,

            // 非対応プラットフォームでは毎回発生するためノイズにしない
            CaptureError::StrategyUnsupported(_) => ErrorSeverity::Debug,
        }
    }

    /// 重要度に応じたレベルでエラーを記録する
    pub fn log(&self, context: &str) {
        match self.severity() {
            ErrorSeverity::Debug => tracing::debug!(error = %self, "{context}"),
            ErrorSeverity::Info => tracing::info!(error = %self, "{context}"),
            ErrorSeverity::Warning => tracing::warn!(error = %self, "{context}"),
            ErrorSeverity::Error => tracing::error!(error = %self, "{context}"),
        }
    }
}

/// エラーの重要度レベル
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

//! グローバルホットキー処理のメインサービス
//! キーイベントの監視を専用スレッドで走らせ、発火を通知チャンネルへ流す

use std::time::Duration;

use tokio::sync::mpsc;

pub mod combo_detector;
pub mod key_handler;

pub use combo_detector::{ComboDetector, ComboState};
pub use key_handler::{HotkeyEvent, KeyHandler};

use crate::domain::HotkeyCombo;
use crate::error::{CaptureError, Result};

/// ホットキー監視の管理を行うサービス
pub struct HotkeyService {
    enabled: bool,
    key_handler: Option<tokio::task::JoinHandle<Result<()>>>,
}

impl HotkeyService {
    pub fn new() -> Self {
        Self {
            enabled: false,
            key_handler: None,
        }
    }

    /// 監視を開始する
    ///
    /// # Arguments
    /// * `combo` - 起動時に検証済みのホットキー
    /// * `release_settle` - 完全解放後の再アーム待ち
    /// * `sender` - 発火通知の送信先
    pub fn start(
        &mut self,
        combo: HotkeyCombo,
        release_settle: Duration,
        sender: mpsc::UnboundedSender<HotkeyEvent>,
    ) -> Result<()> {
        if self.enabled {
            return Err(CaptureError::HotkeyListenerFailed(
                "HotkeyService is already enabled".to_string(),
            ));
        }
        if sender.is_closed() {
            return Err(CaptureError::HotkeyListenerFailed(
                "hotkey event channel is closed".to_string(),
            ));
        }

        let key_handler = KeyHandler::new(ComboDetector::new(combo, release_settle), sender);
        let handle = tokio::task::spawn_blocking(move || key_handler.start_listen());

        self.key_handler = Some(handle);
        self.enabled = true;
        Ok(())
    }

    /// 監視タスクが終了していればその結果を返す（起動失敗の検出用）
    pub async fn wait_for_exit(&mut self) -> Result<()> {
        let Some(handle) = self.key_handler.take() else {
            return Ok(());
        };
        self.enabled = false;
        match handle.await {
            Ok(result) => result,
            Err(e) => Err(CaptureError::HotkeyListenerFailed(e.to_string())),
        }
    }

    /// 監視を停止する
    ///
    /// rdev::listen は中断できないため、タスクを切り離して終了を待たない。
    pub async fn stop(&mut self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        if let Some(handle) = self.key_handler.take() {
            handle.abort();
            match tokio::time::timeout(Duration::from_millis(1000), handle).await {
                Ok(_) => tracing::debug!("key listener task completed"),
                Err(_) => tracing::debug!("key listener task detached (timeout)"),
            }
        }

        self.enabled = false;
        tracing::info!("hotkey service stopped");
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for HotkeyService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hotkey_service_new() {
        let service = HotkeyService::new();
        assert!(!service.is_enabled());
    }

    #[tokio::test]
    async fn test_stop_when_not_started() {
        let mut service = HotkeyService::default();
        assert!(service.stop().await.is_ok());
        assert!(!service.is_enabled());
    }

    #[tokio::test]
    async fn test_closed_channel_is_rejected() {
        let mut service = HotkeyService::new();
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        let combo = HotkeyCombo::parse("cmd+shift+v").unwrap();
        let result = service.start(combo, Duration::from_millis(150), tx);
        assert!(matches!(result, Err(CaptureError::HotkeyListenerFailed(_))));
        assert!(!service.is_enabled());
    }

    #[tokio::test]
    #[ignore] // 実際の rdev::listen を使用するため手動テストのみ
    async fn test_double_start_error() {
        let mut service = HotkeyService::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let combo = HotkeyCombo::parse("cmd+shift+v").unwrap();

        service
            .start(combo.clone(), Duration::from_millis(150), tx.clone())
            .unwrap();
        let second = service.start(combo, Duration::from_millis(150), tx);
        assert!(matches!(second, Err(CaptureError::HotkeyListenerFailed(msg)) if msg.contains("already enabled")));

        let _ = service.stop().await;
    }
}

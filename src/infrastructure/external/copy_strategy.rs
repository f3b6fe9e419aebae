//! 前面アプリにコピーを要求する手段の集合
//!
//! 優先順位は固定:
//! 1. メニュー（編集 → コピー）をアクセシビリティ経由で押す
//! 2. OS のスクリプト機構でコピーのキーストロークを送る
//! 3. enigo で低レベルのキーイベントを注入する
//!
//! どの戦略も単独で失敗し得る。失敗はエンジン側で記録され、次の戦略へ進む。

#[cfg(target_os = "linux")]
use std::process::Command;
use std::thread;
use std::time::Duration;

use enigo::{
    Direction::{Click, Press, Release},
    Enigo, Key, Keyboard, Settings,
};

#[cfg(target_os = "macos")]
use super::osascript::{KEYSTROKE_COPY_SCRIPT, MENU_COPY_SCRIPT, describe_failure, run_osascript};
use crate::error::{CaptureError, Result};

/// コピー要求の1手段
pub trait CopyStrategy: Send + Sync {
    /// ログ・レポート用の識別名
    fn name(&self) -> &'static str;

    /// 前面アプリにコピーを要求する
    ///
    /// * `Ok(true)` – 要求を送出できた（エンジンはリビジョン変化を待つ）
    /// * `Ok(false)` – 何も送出しなかった（待たずに次へ）
    /// * `Err(_)` – 失敗（待たずに次へ）
    fn attempt_copy(&self) -> Result<bool>;
}

/// 既定の戦略列（優先順）
pub fn default_strategies() -> Vec<Box<dyn CopyStrategy>> {
    vec![
        Box::new(MenuCopyStrategy),
        Box::new(ScriptKeystrokeStrategy),
        Box::new(InjectedKeystrokeStrategy::default()),
    ]
}

// ────────────────────────────────────────────────────────────

/// System Events で「編集 → コピー」を押す
#[derive(Debug, Default, Clone, Copy)]
pub struct MenuCopyStrategy;

impl CopyStrategy for MenuCopyStrategy {
    fn name(&self) -> &'static str {
        "menu-copy"
    }

    #[cfg(target_os = "macos")]
    fn attempt_copy(&self) -> Result<bool> {
        let output = run_osascript(MENU_COPY_SCRIPT.to_string())
            .map_err(|e| CaptureError::strategy(self.name(), e.to_string()))?;
        if output.status.success() {
            Ok(true)
        } else {
            // メニューが無い / 無効なアプリでは頻繁に起きる
            Err(CaptureError::strategy(self.name(), describe_failure(&output)))
        }
    }

    #[cfg(not(target_os = "macos"))]
    fn attempt_copy(&self) -> Result<bool> {
        Err(CaptureError::StrategyUnsupported(self.name()))
    }
}

// ────────────────────────────────────────────────────────────

/// OS のスクリプト機構でコピーキーを送る（macOS: osascript / Linux: xdotool）
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptKeystrokeStrategy;

impl CopyStrategy for ScriptKeystrokeStrategy {
    fn name(&self) -> &'static str {
        "script-keystroke"
    }

    #[cfg(target_os = "macos")]
    fn attempt_copy(&self) -> Result<bool> {
        let output = run_osascript(KEYSTROKE_COPY_SCRIPT.to_string())
            .map_err(|e| CaptureError::strategy(self.name(), e.to_string()))?;
        if output.status.success() {
            Ok(true)
        } else {
            Err(CaptureError::strategy(self.name(), describe_failure(&output)))
        }
    }

    #[cfg(target_os = "linux")]
    fn attempt_copy(&self) -> Result<bool> {
        let output = match Command::new("xdotool")
            .args(["key", "--clearmodifiers", "ctrl+c"])
            .output()
        {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CaptureError::StrategyUnsupported(self.name()));
            }
            Err(e) => return Err(CaptureError::strategy(self.name(), e.to_string())),
        };
        if output.status.success() {
            Ok(true)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(CaptureError::strategy(
                self.name(),
                format!("xdotool exited with {}: {stderr}", output.status),
            ))
        }
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    fn attempt_copy(&self) -> Result<bool> {
        Err(CaptureError::StrategyUnsupported(self.name()))
    }
}

// ────────────────────────────────────────────────────────────

/// enigo による低レベルキー注入
#[derive(Debug, Clone, Copy)]
pub struct InjectedKeystrokeStrategy {
    /// 修飾キー押下とキー送出の間隔
    key_gap: Duration,
}

impl Default for InjectedKeystrokeStrategy {
    fn default() -> Self {
        Self {
            key_gap: Duration::from_millis(15),
        }
    }
}

impl InjectedKeystrokeStrategy {
    /// プラットフォームのコピー修飾キー
    fn copy_modifier() -> Key {
        if cfg!(target_os = "macos") {
            Key::Meta
        } else {
            Key::Control
        }
    }

    fn send_copy(&self, enigo: &mut Enigo) -> std::result::Result<(), enigo::InputError> {
        // ホットキーの修飾キーが残っていると別ショートカットになるため解放（念のため）
        let _ = enigo.key(Key::Shift, Release);
        let _ = enigo.key(Key::Alt, Release);

        let modifier = Self::copy_modifier();
        enigo.key(modifier, Press)?;
        thread::sleep(self.key_gap);
        let clicked = enigo.key(Key::Unicode('c'), Click);
        thread::sleep(self.key_gap);
        // 押下に成功した修飾キーは必ず離す
        let released = enigo.key(modifier, Release);
        clicked?;
        released
    }
}

impl CopyStrategy for InjectedKeystrokeStrategy {
    fn name(&self) -> &'static str {
        "injected-keystroke"
    }

    fn attempt_copy(&self) -> Result<bool> {
        #[allow(unused_mut)]
        let mut settings = Settings::default();
        #[cfg(target_os = "macos")]
        {
            settings.mac_delay = 20;
        }

        let mut enigo = Enigo::new(&settings)
            .map_err(|e| CaptureError::strategy(self.name(), format!("init failed: {e}")))?;
        self.send_copy(&mut enigo)
            .map_err(|e| CaptureError::strategy(self.name(), e.to_string()))?;
        Ok(true)
    }
}

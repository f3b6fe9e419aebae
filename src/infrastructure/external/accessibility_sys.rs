//! macOS アクセシビリティ権限の確認
//!
//! キー入力の監視・合成には「アクセシビリティ」権限が必要。
//! 未許可でも起動は続行し、警告ログと `check` コマンドで知らせる。

/// 権限状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessibilityStatus {
    Granted,
    Denied,
    /// macOS 以外（確認手段なし）
    NotApplicable,
}

impl AccessibilityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessibilityStatus::Granted => "granted",
            AccessibilityStatus::Denied => "denied",
            AccessibilityStatus::NotApplicable => "n/a",
        }
    }
}

#[cfg(target_os = "macos")]
mod ffi {
    use core_foundation_sys::base::Boolean;

    #[link(name = "ApplicationServices", kind = "framework")]
    unsafe extern "C" {
        pub fn AXIsProcessTrusted() -> Boolean;
    }
}

/// 現在のプロセスが信頼されているかを返す（プロンプトは出さない）
pub fn accessibility_status() -> AccessibilityStatus {
    // CI環境では常に Granted を返してテストを継続可能にする
    #[cfg(feature = "ci-test")]
    {
        return AccessibilityStatus::Granted;
    }

    #[cfg(all(not(feature = "ci-test"), target_os = "macos"))]
    {
        let trusted = unsafe { ffi::AXIsProcessTrusted() } != 0;
        if trusted {
            AccessibilityStatus::Granted
        } else {
            AccessibilityStatus::Denied
        }
    }

    #[cfg(all(not(feature = "ci-test"), not(target_os = "macos")))]
    {
        AccessibilityStatus::NotApplicable
    }
}

/// 未許可なら警告を出す
pub fn warn_if_untrusted() {
    if accessibility_status() == AccessibilityStatus::Denied {
        tracing::warn!(
            "accessibility permission is not granted; hotkey detection and copy strategies may fail \
             (System Settings → Privacy & Security → Accessibility)"
        );
    }
}

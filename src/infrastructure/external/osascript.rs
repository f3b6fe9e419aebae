//! osascript 実行ユーティリティ（System Events 経由の操作）。
#![cfg_attr(not(target_os = "macos"), allow(dead_code))]
use std::process::{Command, Output};
#[cfg(test)]
use std::sync::OnceLock;

#[cfg(test)]
type OsaScriptRunner = Box<dyn Fn(String) -> std::io::Result<Output> + Send + Sync>;

#[cfg(test)]
static TEST_OSASCRIPT_RUNNER: OnceLock<OsaScriptRunner> = OnceLock::new();

#[cfg(test)]
pub(crate) fn set_test_osascript_runner(
    runner: impl Fn(String) -> std::io::Result<Output> + Send + Sync + 'static,
) {
    let _ = TEST_OSASCRIPT_RUNNER.set(Box::new(runner));
}

pub(crate) fn run_osascript(script: String) -> std::io::Result<Output> {
    #[cfg(test)]
    if let Some(runner) = TEST_OSASCRIPT_RUNNER.get() {
        return runner(script);
    }
    Command::new("osascript").arg("-e").arg(script).output()
}

/// 前面アプリの「編集 → コピー」メニューを押す
pub(crate) const MENU_COPY_SCRIPT: &str = r#"
tell application "System Events"
    set frontApp to first application process whose frontmost is true
    tell frontApp
        click menu item "Copy" of menu 1 of menu bar item "Edit" of menu bar 1
    end tell
end tell
"#;

/// Cmd+C を送る
pub(crate) const KEYSTROKE_COPY_SCRIPT: &str =
    r#"tell application "System Events" to keystroke "c" using command down"#;

const FRONTMOST_APP_SCRIPT: &str =
    r#"tell application "System Events" to get name of first application process whose frontmost is true"#;

/// 終了コードと stderr からエラー文字列を組み立てる
pub(crate) fn describe_failure(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("osascript exited with {}", output.status)
    } else {
        stderr.to_string()
    }
}

/// 前面アプリ名を取得する。取得できない場合は `"Unknown"`
pub fn frontmost_app_name() -> String {
    match run_osascript(FRONTMOST_APP_SCRIPT.to_string()) {
        Ok(output) if output.status.success() => {
            let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if name.is_empty() {
                "Unknown".to_string()
            } else {
                name
            }
        }
        Ok(output) => {
            tracing::debug!(reason = %describe_failure(&output), "frontmost app lookup failed");
            "Unknown".to_string()
        }
        Err(e) => {
            tracing::debug!(error = %e, "failed to execute osascript");
            "Unknown".to_string()
        }
    }
}

/// テスト用の共通スタブ。OnceLock のため最初の登録のみ有効になる
///
/// * 前面アプリ問い合わせ → `TextEdit`
/// * メニューのクリック → 成功
/// * それ以外（キーストローク） → 権限エラー
#[cfg(all(test, unix))]
pub(crate) fn install_fake_runner() {
    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;

    set_test_osascript_runner(|script| {
        if script.contains("click menu item") {
            Ok(Output {
                status: ExitStatus::from_raw(0),
                stdout: Vec::new(),
                stderr: Vec::new(),
            })
        } else if script.contains("frontmost is true") {
            Ok(Output {
                status: ExitStatus::from_raw(0),
                stdout: b"TextEdit\n".to_vec(),
                stderr: Vec::new(),
            })
        } else {
            Ok(Output {
                status: ExitStatus::from_raw(1 << 8),
                stdout: Vec::new(),
                stderr: b"execution error: not allowed\n".to_vec(),
            })
        }
    });
}

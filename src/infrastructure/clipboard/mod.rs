use crate::domain::ClipboardSnapshot;
use crate::error::Result;
use crate::utils::config::{BackendPreference, EnvConfig};

#[cfg(target_os = "macos")]
pub mod macos;
pub mod memory;
pub mod text_only;

#[cfg(target_os = "macos")]
pub use macos::MacPasteboard;
pub use memory::InMemoryClipboard;
pub use text_only::TextOnlyClipboard;

/// システムクリップボード抽象。
/// プロセス内ではこのトレイト経由でのみクリップボードに触れる。
pub trait ClipboardBackend: Send + Sync {
    /// ログ用の識別名。
    fn name(&self) -> &'static str;

    /// 全エントリ・全表現形式を保存 / 復元できるか。
    /// `false` の場合はプレーンテキストのみ（復元は非可逆）。
    fn is_full_fidelity(&self) -> bool;

    /// クリップボードが変更されるたびに増加する値。
    /// OS が提供しない場合は内容の比較で合成する（弱い信号）。
    fn revision(&self) -> Result<u64>;

    /// 現在のクリップボード全体を読み取る。クリップボードを変更してはならない。
    fn snapshot(&self) -> Result<ClipboardSnapshot>;

    /// クリップボードを消去し、スナップショットの内容を書き戻す。
    ///
    /// * `None` – スナップショット取得に失敗していた場合。何もしない
    /// * 空のスナップショット – 消去のみ
    fn restore(&self, snapshot: Option<&ClipboardSnapshot>) -> Result<()>;

    /// 優先順位（プレーンテキスト → HTML → RTF → 空）に従ってテキストを取り出す。
    fn read_text(&self) -> Result<String> {
        Ok(self.snapshot()?.extract_text())
    }
}

/// 起動時にプラットフォームと設定からバックエンドを選ぶ。
pub fn select_backend(config: &EnvConfig) -> Result<Box<dyn ClipboardBackend>> {
    if config.backend == BackendPreference::Auto {
        #[cfg(target_os = "macos")]
        {
            match MacPasteboard::new() {
                Ok(pasteboard) => {
                    tracing::info!("clipboard backend: native pasteboard (full fidelity)");
                    return Ok(Box::new(pasteboard));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "native pasteboard unavailable; falling back to text-only");
                }
            }
        }
    }

    let clipboard = TextOnlyClipboard::new()?;
    tracing::info!("clipboard backend: text-only (rich content is not preserved on restore)");
    Ok(Box::new(clipboard))
}

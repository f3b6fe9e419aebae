//! 環境変数からの設定読み込み
//!
//! プロセス起動時に一度だけ構築し、以降は `Arc<EnvConfig>` として各サービスに渡す。
//! 値の検証はここで行い、不正な値は起動時の `ConfigError` として扱う。

use std::time::Duration;

use crate::domain::HotkeyCombo;
use crate::error::{CaptureError, Result};

pub const DEFAULT_HOTKEY: &str = "cmd+shift+v";
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:4545";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_SETTLE_MS: u64 = 120;
pub const DEFAULT_ATTEMPT_TIMEOUT_MS: u64 = 1000;
pub const DEFAULT_POLL_MS: u64 = 20;
pub const DEFAULT_RELEASE_SETTLE_MS: u64 = 150;

/// クリップボードバックエンドの選択方針
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendPreference {
    /// ネイティブ（全表現形式）が使えればそれを使う
    #[default]
    Auto,
    /// テキストのみのフォールバックを強制
    TextOnly,
}

impl BackendPreference {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "auto" | "native" => Ok(BackendPreference::Auto),
            "text" | "text-only" | "text_only" => Ok(BackendPreference::TextOnly),
            other => Err(CaptureError::ConfigError(format!(
                "CLIP_CAPTURE_BACKEND must be `auto` or `text`, got `{other}`"
            ))),
        }
    }
}

/// 環境変数設定
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// ホットキー定義（`HOTKEY`）
    pub hotkey: String,
    /// 取り込み API のベース URL
    pub api_url: String,
    /// 送信タイムアウト
    pub http_timeout: Duration,
    /// キャプチャ前の待機時間
    pub settle_delay: Duration,
    /// 1戦略あたりの待機上限
    pub attempt_timeout: Duration,
    /// リビジョン監視の間隔
    pub poll_interval: Duration,
    /// ホットキー完全解放後の再アーム待ち
    pub release_settle: Duration,
    /// 送信テキストのサイズ上限（超過は警告のみ）
    pub max_text_bytes: Option<usize>,
    pub backend: BackendPreference,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            hotkey: DEFAULT_HOTKEY.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_MS),
            attempt_timeout: Duration::from_millis(DEFAULT_ATTEMPT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_MS),
            release_settle: Duration::from_millis(DEFAULT_RELEASE_SETTLE_MS),
            max_text_bytes: None,
            backend: BackendPreference::Auto,
        }
    }
}

impl EnvConfig {
    /// プロセス環境変数から設定を構築
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意のキー参照関数から設定を構築（テストで環境変数を汚さないため）
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = EnvConfig::default();

        if let Some(hotkey) = lookup("HOTKEY").filter(|v| !v.trim().is_empty()) {
            config.hotkey = hotkey;
        }
        if let Some(url) = lookup("CLIP_CAPTURE_API_URL").filter(|v| !v.trim().is_empty()) {
            config.api_url = url.trim().to_string();
        }
        if let Some(secs) = parse_positive_u64(&lookup, "CLIP_CAPTURE_HTTP_TIMEOUT_SECS")? {
            config.http_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_u64(&lookup, "CLIP_CAPTURE_SETTLE_MS")? {
            config.settle_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_u64(&lookup, "CLIP_CAPTURE_ATTEMPT_TIMEOUT_MS")? {
            config.attempt_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_positive_u64(&lookup, "CLIP_CAPTURE_POLL_MS")? {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_u64(&lookup, "CLIP_CAPTURE_RELEASE_SETTLE_MS")? {
            config.release_settle = Duration::from_millis(ms);
        }
        if let Some(bytes) = parse_u64(&lookup, "CLIP_CAPTURE_MAX_BYTES")? {
            config.max_text_bytes = Some(bytes as usize);
        }
        if let Some(backend) = lookup("CLIP_CAPTURE_BACKEND") {
            config.backend = BackendPreference::parse(&backend)?;
        }

        // ホットキーは起動時に検証しておく（トリガー時ではなく）
        config.hotkey_combo()?;
        Ok(config)
    }

    /// ホットキー文字列を解析
    pub fn hotkey_combo(&self) -> Result<HotkeyCombo> {
        HotkeyCombo::parse(&self.hotkey)
    }

    /// キャプチャ送信先 (`<base>/add`)
    pub fn ingest_url(&self) -> String {
        format!("{}/add", self.api_url.trim_end_matches('/'))
    }

    /// ヘルスチェック先 (`<base>/`)
    pub fn health_url(&self) -> String {
        format!("{}/", self.api_url.trim_end_matches('/'))
    }
}

/// 0 だと動作しなくなる値（タイムアウト・ポーリング間隔）
fn parse_positive_u64(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<u64>> {
    match parse_u64(lookup, key)? {
        Some(0) => Err(CaptureError::ConfigError(format!(
            "{key} must be greater than 0"
        ))),
        value => Ok(value),
    }
}

fn parse_u64(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<u64>> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw.trim().parse::<u64>().map(Some).map_err(|_| {
            CaptureError::ConfigError(format!("{key} must be a non-negative integer, got `{raw}`"))
        }),
    }
}

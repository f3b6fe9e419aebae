use clap::{Parser, Subcommand};

use crate::utils::config::{BackendPreference, EnvConfig};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Capture the selected text with a global hotkey and send it to the ingestion API"
)]
pub struct Cli {
    /// debug ログを有効化（RUST_LOG が優先）
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// ホットキー（例: `cmd+shift+v`）。HOTKEY より優先
    #[arg(long, global = true)]
    pub hotkey: Option<String>,

    /// 取り込み API のベース URL。CLIP_CAPTURE_API_URL より優先
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// テキストのみのクリップボードを強制
    #[arg(long, global = true)]
    pub text_only: bool,

    #[command(subcommand)]
    pub cmd: Option<Cmd>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Cmd {
    /// ホットキーを監視し続ける（既定）
    Listen,
    /// 1回だけキャプチャして試行結果を表示
    Once {
        /// キャプチャ開始までの待機（前面アプリを切り替える時間）
        #[arg(long, default_value_t = 3000)]
        delay_ms: u64,
        /// 取り込み API に送信しない
        #[arg(long)]
        no_send: bool,
    },
    /// 設定・権限・取り込み API の疎通を確認
    Check,
}

impl Cli {
    /// CLI フラグで環境変数の設定を上書きする
    pub fn apply_overrides(&self, config: &mut EnvConfig) -> crate::error::Result<()> {
        if let Some(hotkey) = &self.hotkey {
            config.hotkey = hotkey.clone();
            config.hotkey_combo()?;
        }
        if let Some(url) = &self.api_url {
            config.api_url = url.trim().to_string();
        }
        if self.text_only {
            config.backend = BackendPreference::TextOnly;
        }
        Ok(())
    }

    pub fn command(&self) -> Cmd {
        self.cmd.clone().unwrap_or(Cmd::Listen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listen_is_the_default_command() {
        let cli = Cli::try_parse_from(["clip_capture"]).unwrap();
        assert_eq!(cli.command(), Cmd::Listen);
    }

    #[test]
    fn once_accepts_delay_and_no_send() {
        let cli =
            Cli::try_parse_from(["clip_capture", "once", "--delay-ms", "500", "--no-send"]).unwrap();
        assert_eq!(
            cli.command(),
            Cmd::Once {
                delay_ms: 500,
                no_send: true
            }
        );
    }

    #[test]
    fn flags_override_environment() {
        let cli = Cli::try_parse_from([
            "clip_capture",
            "--hotkey",
            "ctrl+alt+c",
            "--api-url",
            "http://localhost:9999",
            "--text-only",
            "check",
        ])
        .unwrap();
        let mut config = EnvConfig::default();
        cli.apply_overrides(&mut config).unwrap();

        assert_eq!(config.hotkey, "ctrl+alt+c");
        assert_eq!(config.ingest_url(), "http://localhost:9999/add");
        assert_eq!(config.backend, BackendPreference::TextOnly);
    }

    #[test]
    fn invalid_hotkey_flag_is_rejected() {
        let cli = Cli::try_parse_from(["clip_capture", "--hotkey", "cmd+shift"]).unwrap();
        let mut config = EnvConfig::default();
        assert!(cli.apply_overrides(&mut config).is_err());
    }
}

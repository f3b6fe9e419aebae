use std::path::Path;

/// Environment loading helpers.
///
/// Loads environment variables from `.env` if present, or from the file
/// specified by the `CLIP_CAPTURE_ENV_PATH` environment variable. Any errors
/// during loading are ignored.
pub fn load_env() {
    match std::env::var("CLIP_CAPTURE_ENV_PATH") {
        Ok(path) => load_env_from(Some(Path::new(&path))),
        Err(_) => load_env_from(None),
    }
}

/// 指定ファイル（なければカレントの `.env`）を読み込む。既存の環境変数は上書きしない
pub fn load_env_from(path: Option<&Path>) {
    match path {
        Some(path) => {
            dotenvy::from_path(path).ok();
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }
}

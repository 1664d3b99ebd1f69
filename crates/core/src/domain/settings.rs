use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::AppError;
use super::types::{Quality, Style};

pub const ENV_API_URL: &str = "FILMGEN_API_URL";
pub const ENV_POLL_INTERVAL_MS: &str = "FILMGEN_POLL_INTERVAL_MS";

/// クライアント設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// 生成サービスのベースURL（末尾の /api まで含む）
    pub api_base_url: String,
    /// ステータス取得の間隔
    pub poll_interval_ms: u64,
    /// HTTPリクエストのタイムアウト
    pub request_timeout_secs: u64,
    /// 一括ダウンロード時のオープン間隔（index 倍）
    pub download_stagger_ms: u64,
    /// ポーリング回数の上限（None = 無制限）
    pub max_poll_attempts: Option<u32>,
    pub default_style: Style,
    pub default_quality: Quality,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8001/api".to_string(),
            poll_interval_ms: 2000,
            request_timeout_secs: 30,
            download_stagger_ms: 100,
            max_poll_attempts: None,
            default_style: Style::Cinematic,
            default_quality: Quality::Medium,
        }
    }
}

impl ClientSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn download_stagger(&self) -> Duration {
        Duration::from_millis(self.download_stagger_ms)
    }

    /// `<config_dir>/filmgen/settings.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("filmgen").join("settings.json"))
    }

    /// JSONファイルから読み込む（欠けた項目はデフォルト値）
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            AppError::config(format!("設定ファイルを読めません {}: {e}", path.display()))
        })?;
        serde_json::from_str(&json).map_err(|e| {
            AppError::config(format!("設定ファイルの形式が不正です {}: {e}", path.display()))
        })
    }

    /// 明示パス → デフォルトパス（存在する場合）→ デフォルト値 の順で解決し、
    /// 最後に環境変数で上書きする
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, AppError> {
        let mut settings = match explicit {
            Some(path) => Self::load(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::load(&path)?,
                None => Self::default(),
            },
        };
        settings.apply_env_overrides(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), AppError> {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_POLL_INTERVAL_MS) {
            self.poll_interval_ms = raw.trim().parse().map_err(|_| {
                AppError::config(format!("{ENV_POLL_INTERVAL_MS} は整数で指定してください: {raw}"))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.api_base_url.trim().is_empty() {
            return Err(AppError::config("api_base_url が空です"));
        }
        if self.poll_interval_ms == 0 {
            return Err(AppError::config("poll_interval_ms は 1 以上にしてください"));
        }
        if self.max_poll_attempts == Some(0) {
            return Err(AppError::config("max_poll_attempts は 1 以上にしてください"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let s = ClientSettings::default();
        assert_eq!(s.poll_interval(), Duration::from_millis(2000));
        assert_eq!(s.download_stagger(), Duration::from_millis(100));
        assert!(s.max_poll_attempts.is_none());
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let s: ClientSettings =
            serde_json::from_str(r#"{"api_base_url":"https://films.example.com/api","default_quality":"high"}"#)
                .unwrap();
        assert_eq!(s.api_base_url, "https://films.example.com/api");
        assert_eq!(s.default_quality, Quality::High);
        assert_eq!(s.poll_interval_ms, 2000);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_API_URL, "http://10.0.0.5:9000/api"),
            (ENV_POLL_INTERVAL_MS, "500"),
        ]
        .into_iter()
        .collect();

        let mut s = ClientSettings::default();
        s.apply_env_overrides(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(s.api_base_url, "http://10.0.0.5:9000/api");
        assert_eq!(s.poll_interval_ms, 500);
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let mut s = ClientSettings::default();
        let err = s
            .apply_env_overrides(|k| (k == ENV_POLL_INTERVAL_MS).then(|| "soon".to_string()))
            .unwrap_err();
        assert_eq!(err.code, crate::domain::error::ErrorCode::Config);
    }

    #[test]
    fn test_validate() {
        let mut s = ClientSettings::default();
        s.poll_interval_ms = 0;
        assert!(s.validate().is_err());

        let mut s = ClientSettings::default();
        s.max_poll_attempts = Some(0);
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = ClientSettings::load(Path::new("/nonexistent/filmgen.json")).unwrap_err();
        assert_eq!(err.code, crate::domain::error::ErrorCode::Config);
    }
}

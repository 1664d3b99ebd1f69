mod system;

pub use system::SystemOpener;

/// URLオープンのエラー
#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error("Opener not available: {0}")]
    NotAvailable(String),
    #[error("Open failed: {0}")]
    Failed(String),
}

/// URLを外部で開く trait（ブラウザ・プレイヤー等）
pub trait UrlOpener: Send + Sync {
    fn open(&self, url: &str) -> Result<(), OpenError>;
    fn name(&self) -> &str;
}

/// LogOpener: 開かずにログに出すだけ（ヘッドレス環境用）
pub struct LogOpener;

impl UrlOpener for LogOpener {
    fn open(&self, url: &str) -> Result<(), OpenError> {
        log::info!("open: {url}");
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

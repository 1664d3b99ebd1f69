use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::infra::opener::UrlOpener;

/// 一括ダウンロードの結果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DownloadReport {
    pub requested: usize,
    pub opened: usize,
    pub failed: Vec<String>,
}

/// バックグラウンドで進行中の一括ダウンロード
pub struct DownloadBatch {
    handle: JoinHandle<DownloadReport>,
}

impl DownloadBatch {
    /// 全URLを開き終えるまで待つ
    pub async fn wait(self) -> DownloadReport {
        match self.handle.await {
            Ok(report) => report,
            Err(e) => {
                log::error!("download task aborted: {e}");
                DownloadReport::default()
            }
        }
    }
}

/// URLを開始時刻から index × stagger の時点で順に開く。
/// 失敗はログに残すだけで残りは続行する。
pub fn spawn_downloads(
    opener: Arc<dyn UrlOpener>,
    urls: Vec<String>,
    stagger: Duration,
) -> DownloadBatch {
    let handle = tokio::spawn(async move {
        let mut report = DownloadReport {
            requested: urls.len(),
            ..Default::default()
        };

        let origin = tokio::time::Instant::now();
        for (index, url) in urls.into_iter().enumerate() {
            tokio::time::sleep_until(origin + stagger * index as u32).await;
            match opener.open(&url) {
                Ok(()) => {
                    log::debug!("download {} opened via {}", index + 1, opener.name());
                    report.opened += 1;
                }
                Err(e) => {
                    log::warn!("download {} failed ({url}): {e}", index + 1);
                    report.failed.push(url);
                }
            }
        }

        log::info!(
            "downloads: {}/{} opened",
            report.opened,
            report.requested
        );
        report
    });

    DownloadBatch { handle }
}

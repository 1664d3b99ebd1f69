use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::watch;

use crate::domain::cost::{self, CostEstimate};
use crate::domain::error::AppError;
use crate::domain::job::{JobId, JobSnapshot, JobStatus};
use crate::domain::scene::{collect_download_targets, is_playable, SceneSelection};
use crate::domain::settings::ClientSettings;
use crate::domain::stage::{
    estimated_time_remaining, format_duration, format_remaining, stage_label, step_states,
    StepStatus,
};
use crate::domain::types::{Quality, Style};
use crate::infra::metrics::{Metrics, MetricsSummary};
use crate::infra::opener::UrlOpener;
use crate::infra::service::{GenerationService, ServiceInfo};
use crate::usecase::download::{spawn_downloads, DownloadBatch};
use crate::usecase::job_poller::JobPoller;

/// 進捗パネル表示用のビュー
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressView {
    pub progress: u8,
    pub label: &'static str,
    pub steps: Vec<StepStatus>,
    pub elapsed_display: String,
    pub eta: Option<String>,
    pub is_generating: bool,
}

/// アプリケーションサービス（シェルが1つだけ保持する）
pub struct AppService {
    poller: JobPoller,
    selection: Mutex<SceneSelection>,
    service: Arc<dyn GenerationService>,
    opener: Arc<dyn UrlOpener>,
    metrics: Arc<Metrics>,
    settings: ClientSettings,
}

impl AppService {
    pub fn new(
        service: Arc<dyn GenerationService>,
        opener: Arc<dyn UrlOpener>,
        settings: ClientSettings,
    ) -> Self {
        let metrics = Arc::new(Metrics::new());
        log::info!(
            "AppService: service={}, opener={}, poll={}ms",
            service.name(),
            opener.name(),
            settings.poll_interval_ms
        );
        Self {
            poller: JobPoller::new(service.clone(), metrics.clone(), &settings),
            selection: Mutex::new(SceneSelection::new()),
            service,
            opener,
            metrics,
            settings,
        }
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    // ==================== Job ====================

    /// 生成ジョブを送信する。前のジョブのポーリングは止まる
    pub async fn generate(
        &self,
        screenplay: &str,
        style: Style,
        quality: Quality,
    ) -> Result<JobId, AppError> {
        let job_id = self.poller.submit(screenplay, style, quality).await?;
        self.selection.lock().unwrap().clear();
        Ok(job_id)
    }

    pub fn cancel(&self) -> bool {
        self.poller.cancel()
    }

    pub fn snapshot(&self) -> JobSnapshot {
        self.poller.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<JobSnapshot> {
        self.poller.subscribe()
    }

    pub async fn wait_settled(&self) -> JobSnapshot {
        self.poller.wait_settled().await
    }

    /// 失敗したジョブのエラー（ユーザー表示用）
    pub fn job_error(&self) -> Option<AppError> {
        let snapshot = self.poller.snapshot();
        if snapshot.status != Some(JobStatus::Failed) {
            return None;
        }
        snapshot.error_message.map(AppError::job_failed)
    }

    // ==================== Progress ====================

    pub fn progress_view(&self) -> ProgressView {
        let snapshot = self.poller.snapshot();
        let elapsed = self.poller.elapsed();

        let elapsed_display = match snapshot.generation_duration_secs {
            Some(secs) => format_duration(Some(secs)),
            None => format_duration(elapsed.map(|d| d.as_secs_f64())),
        };
        let eta = if snapshot.is_generating {
            elapsed
                .and_then(|e| estimated_time_remaining(e, snapshot.progress))
                .map(format_remaining)
        } else {
            None
        };

        ProgressView {
            progress: snapshot.progress,
            label: stage_label(snapshot.progress),
            steps: step_states(snapshot.progress),
            elapsed_display,
            eta,
            is_generating: snapshot.is_generating,
        }
    }

    // ==================== Cost ====================

    pub fn estimate_cost(&self, screenplay: &str, quality: Quality) -> Option<CostEstimate> {
        cost::estimate(screenplay, quality)
    }

    // ==================== Scenes ====================

    /// シーンを選択し、再生可能ならプレイヤーに渡すURLを返す
    pub fn select_scene(&self, scene_number: u32) -> Result<Option<String>, AppError> {
        let snapshot = self.poller.snapshot();
        let scene = snapshot
            .scenes
            .iter()
            .find(|s| s.scene_number == scene_number)
            .ok_or_else(|| AppError::validation(format!("Scene {scene_number} not found")))?;

        let mut selection = self.selection.lock().unwrap();
        let url = selection.select(scene).map(str::to_string);
        if url.is_none() {
            log::info!("scene {scene_number} has no playable video");
        }
        Ok(url)
    }

    pub fn selection(&self) -> SceneSelection {
        self.selection.lock().unwrap().clone()
    }

    /// 再生可能なシーンのサービス側ダウンロードURL
    pub fn scene_download_url(&self, scene_number: u32) -> Option<String> {
        let snapshot = self.poller.snapshot();
        let job_id = snapshot.job_id.as_ref()?;
        snapshot
            .scenes
            .iter()
            .find(|s| s.scene_number == scene_number)
            .filter(|s| is_playable(s))?;
        self.service.scene_download_url(job_id, scene_number)
    }

    pub fn download_targets(&self) -> Vec<String> {
        collect_download_targets(&self.poller.snapshot().scenes)
    }

    /// 再生可能な全シーンをずらしながら開く
    pub fn download_all(&self) -> DownloadBatch {
        let targets = self.download_targets();
        if targets.is_empty() {
            log::info!("no playable scenes to download");
        }
        spawn_downloads(
            self.opener.clone(),
            targets,
            self.settings.download_stagger(),
        )
    }

    // ==================== Service / Metrics ====================

    pub async fn service_info(&self) -> Result<ServiceInfo, AppError> {
        self.service.info().await.map_err(|e| {
            log::warn!("service info unavailable: {e}");
            AppError::internal(format!("Generation service unavailable: {e}"))
        })
    }

    pub fn get_metrics(&self) -> MetricsSummary {
        self.metrics.summary()
    }
}

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{
    GenerationService, ServiceError, ServiceFeatures, ServiceInfo, StartRequest, StartResponse,
};
use crate::domain::job::{JobId, JobStatus, JobStatusReport, SceneListing};
use crate::domain::types::{ExportInfo, Quality, Scene, STORAGE_DIRECT_STREAMING};

/// NoopGenerationService: 実サービス無しで動くオフライン実装。
/// ステータス取得のたびに進捗を進め、デモ用プレースホルダのシーンを返す。
pub struct NoopGenerationService {
    step: u8,
    jobs: Mutex<HashMap<JobId, NoopJob>>,
}

struct NoopJob {
    progress: u8,
    quality: Quality,
    scenes: Vec<Scene>,
}

impl NoopGenerationService {
    pub fn new() -> Self {
        Self::with_step(20)
    }

    /// 1回のステータス取得で進む進捗量
    pub fn with_step(step: u8) -> Self {
        Self {
            step: step.clamp(1, 100),
            jobs: Mutex::new(HashMap::new()),
        }
    }

    fn export_info(job: &NoopJob) -> ExportInfo {
        ExportInfo {
            storage_type: STORAGE_DIRECT_STREAMING.to_string(),
            resolution: job.quality.resolution_label(),
            total_file_size_bytes: 0,
            download_urls: vec![],
            scene_videos: vec![],
            format: Some("MP4".to_string()),
            total_scenes: Some(job.scenes.len() as u32),
            total_duration: None,
            cloud_storage_enabled: false,
        }
    }
}

impl Default for NoopGenerationService {
    fn default() -> Self {
        Self::new()
    }
}

/// 見出し行（INT./EXT.）ごとにデモシーンを組み立てる
fn demo_scenes(screenplay: &str) -> Vec<Scene> {
    let mut scenes: Vec<Scene> = Vec::new();

    for line in screenplay.lines().map(str::trim) {
        let prefix = line.get(..4).unwrap_or("");
        let scene_type = if prefix.eq_ignore_ascii_case("INT.") {
            "INTERIOR"
        } else if prefix.eq_ignore_ascii_case("EXT.") {
            "EXTERIOR"
        } else {
            if let Some(scene) = scenes.last_mut() {
                let is_cue =
                    !line.is_empty() && line.chars().count() < 30 && line == line.to_uppercase();
                if is_cue && !scene.characters.iter().any(|c| c == line) {
                    scene.characters.push(line.to_string());
                }
            }
            continue;
        };

        let n = scenes.len() as u32 + 1;
        let location = line[4..].split(" - ").next().unwrap_or("").trim();
        scenes.push(Scene {
            scene_number: n,
            scene_type: scene_type.to_string(),
            location: if location.is_empty() { "Unknown".to_string() } else { location.to_string() },
            characters: vec![],
            dialogs: vec![],
            video_url: Some(format!("placeholder_scene_{n}.mp4")),
            file_size_bytes: None,
            generation_time_secs: None,
            is_demo: true,
        });
    }

    if scenes.is_empty() {
        scenes.push(Scene {
            scene_number: 1,
            scene_type: "INTERIOR".to_string(),
            location: "Unknown".to_string(),
            characters: vec![],
            dialogs: vec![],
            video_url: Some("placeholder_scene_1.mp4".to_string()),
            file_size_bytes: None,
            generation_time_secs: None,
            is_demo: true,
        });
    }

    scenes
}

#[async_trait]
impl GenerationService for NoopGenerationService {
    async fn start(&self, request: StartRequest) -> Result<StartResponse, ServiceError> {
        let job_id = JobId::new(uuid::Uuid::new_v4().to_string());
        let job = NoopJob {
            progress: 0,
            quality: request.quality,
            scenes: demo_scenes(&request.screenplay),
        };
        self.jobs.lock().unwrap().insert(job_id.clone(), job);
        log::info!("[noop] job {job_id} accepted ({} style)", request.style.as_str());

        Ok(StartResponse {
            job_id,
            status: Some("processing".to_string()),
            message: None,
        })
    }

    async fn get_status(&self, job_id: &JobId) -> Result<JobStatusReport, ServiceError> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs.get_mut(job_id).ok_or_else(|| ServiceError::Http {
            status: 404,
            body: "Job not found".to_string(),
        })?;

        job.progress = job.progress.saturating_add(self.step).min(100);
        let done = job.progress >= 100;

        Ok(JobStatusReport {
            status: if done { JobStatus::Completed } else { JobStatus::Processing },
            progress: job.progress as i64,
            error: None,
            export_info: done.then(|| Self::export_info(job)),
            generation_duration: None,
        })
    }

    async fn get_scenes(&self, job_id: &JobId) -> Result<SceneListing, ServiceError> {
        let jobs = self.jobs.lock().unwrap();
        let job = jobs.get(job_id).ok_or_else(|| ServiceError::Http {
            status: 404,
            body: "Job not found".to_string(),
        })?;

        Ok(SceneListing {
            scenes: job.scenes.clone(),
            export_info: Some(Self::export_info(job)),
        })
    }

    async fn info(&self) -> Result<ServiceInfo, ServiceError> {
        Ok(ServiceInfo {
            message: "Offline demo service".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            status: "operational".to_string(),
            features: ServiceFeatures {
                direct_streaming: false,
                cloud_storage: false,
                demo_mode: true,
                quality_settings: Quality::ALL.iter().map(|q| q.as_str().to_string()).collect(),
                styles: crate::domain::types::Style::ALL
                    .iter()
                    .map(|s| s.as_str().to_string())
                    .collect(),
            },
        })
    }

    fn name(&self) -> &str {
        "noop"
    }
}

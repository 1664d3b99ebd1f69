pub mod http;
mod noop;

pub use http::HttpGenerationService;
pub use noop::NoopGenerationService;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::job::{JobId, JobStatusReport, SceneListing};
use crate::domain::types::{Quality, Style};

/// 生成サービスのエラー（ポーリング中は一時エラーとして扱われる）
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Request timeout")]
    Timeout,
    #[error("Service returned {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Response decode error: {0}")]
    Decode(String),
}

/// start の要求
#[derive(Debug, Clone, Serialize)]
pub struct StartRequest {
    pub screenplay: String,
    pub style: Style,
    pub quality: Quality,
}

/// start の応答
#[derive(Debug, Clone, Deserialize)]
pub struct StartResponse {
    pub job_id: JobId,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// サービスのルートエンドポイントが返す情報
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub features: ServiceFeatures,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceFeatures {
    #[serde(default)]
    pub direct_streaming: bool,
    #[serde(default)]
    pub cloud_storage: bool,
    #[serde(default)]
    pub demo_mode: bool,
    #[serde(default)]
    pub quality_settings: Vec<String>,
    #[serde(default)]
    pub styles: Vec<String>,
}

/// 生成サービス trait（HTTP実装とオフライン実装がある）
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn start(&self, request: StartRequest) -> Result<StartResponse, ServiceError>;

    async fn get_status(&self, job_id: &JobId) -> Result<JobStatusReport, ServiceError>;

    async fn get_scenes(&self, job_id: &JobId) -> Result<SceneListing, ServiceError>;

    async fn info(&self) -> Result<ServiceInfo, ServiceError>;

    /// シーン単体のダウンロードURL（サービス側でリダイレクトされる）。無ければ None
    fn scene_download_url(&self, _job_id: &JobId, _scene_number: u32) -> Option<String> {
        None
    }

    fn name(&self) -> &str;
}

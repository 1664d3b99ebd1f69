use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::{GenerationService, ServiceError, ServiceInfo, StartRequest, StartResponse};
use crate::domain::job::{JobId, JobStatusReport, SceneListing};
use crate::domain::settings::ClientSettings;

/// HTTP(JSON) で生成サービスに接続する実装
pub struct HttpGenerationService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGenerationService {
    pub fn new(settings: &ClientSettings) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| ServiceError::Transport(format!("HTTP client init failed: {e}")))?;

        Ok(Self {
            client,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ServiceError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Http { status, body });
        }

        response
            .json()
            .await
            .map_err(|e| ServiceError::Decode(e.to_string()))
    }
}

fn transport_error(e: reqwest::Error) -> ServiceError {
    if e.is_timeout() {
        ServiceError::Timeout
    } else {
        ServiceError::Transport(format!("HTTP request failed: {e}"))
    }
}

#[async_trait]
impl GenerationService for HttpGenerationService {
    async fn start(&self, request: StartRequest) -> Result<StartResponse, ServiceError> {
        let response = self
            .client
            .post(self.url("/generate-film"))
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        Self::read_json(response).await
    }

    async fn get_status(&self, job_id: &JobId) -> Result<JobStatusReport, ServiceError> {
        let response = self
            .client
            .get(self.url(&format!("/job/{job_id}")))
            .send()
            .await
            .map_err(transport_error)?;

        Self::read_json(response).await
    }

    async fn get_scenes(&self, job_id: &JobId) -> Result<SceneListing, ServiceError> {
        let response = self
            .client
            .get(self.url(&format!("/job/{job_id}/scenes")))
            .send()
            .await
            .map_err(transport_error)?;

        Self::read_json(response).await
    }

    async fn info(&self) -> Result<ServiceInfo, ServiceError> {
        let response = self
            .client
            .get(self.url("/"))
            .send()
            .await
            .map_err(transport_error)?;

        Self::read_json(response).await
    }

    fn scene_download_url(&self, job_id: &JobId, scene_number: u32) -> Option<String> {
        Some(self.url(&format!("/job/{job_id}/download/{scene_number}")))
    }

    fn name(&self) -> &str {
        "http"
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::AppError;
use super::types::{ExportInfo, Scene};

/// サービスが failed を返したがエラー文言が無い場合の表示
pub const DEFAULT_FAILURE_MESSAGE: &str = "Unknown error";

/// 生成サービスが払い出すジョブID（中身は不透明）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// ジョブ状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    /// サービスが未知の状態文字列を返した場合（非終端として扱う）
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }
}

/// get-status の応答
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusReport {
    pub status: JobStatus,
    #[serde(default)]
    pub progress: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_info: Option<ExportInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_duration: Option<f64>,
}

impl JobStatusReport {
    pub fn clamped_progress(&self) -> u8 {
        self.progress.clamp(0, 100) as u8
    }
}

/// get-scenes の応答
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneListing {
    #[serde(default)]
    pub scenes: Vec<Scene>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_info: Option<ExportInfo>,
}

/// ポーリングサイクルのタグ。応答はこのタグが現行と一致する場合のみ反映される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTag {
    pub job_id: JobId,
    pub cycle: u64,
}

/// ステータス応答を反映した結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    /// 別ジョブ・旧サイクル・終端済みの応答なので破棄した
    Stale,
    /// 非終端。ポーリング継続
    Continue,
    /// 完了。続けてシーン一覧を取得する
    Completed,
    /// 失敗。サイクル終了
    Failed,
}

/// プレゼンテーション層へ公開する読み取りモデル
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JobSnapshot {
    pub job_id: Option<JobId>,
    pub status: Option<JobStatus>,
    pub progress: u8,
    pub error_message: Option<String>,
    pub generation_duration_secs: Option<f64>,
    pub scenes: Vec<Scene>,
    pub export_info: Option<ExportInfo>,
    pub is_generating: bool,
    pub cycle_active: bool,
    pub started_at: Option<String>,
}

/// 現在ジョブのスロット。JobPoller だけが変更する。
///
/// 送信のたびに `cycle` が進み、古いサイクルに属する応答は全て破棄される。
#[derive(Debug, Default)]
pub struct JobState {
    cycle: u64,
    job_id: Option<JobId>,
    status: Option<JobStatus>,
    progress: u8,
    error_message: Option<String>,
    generation_duration_secs: Option<f64>,
    scenes: Vec<Scene>,
    export_info: Option<ExportInfo>,
    is_generating: bool,
    cycle_active: bool,
    started_at: Option<DateTime<Utc>>,
}

impl JobState {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_current(&self, tag: &PollTag) -> bool {
        self.cycle == tag.cycle && self.job_id.as_ref() == Some(&tag.job_id)
    }

    /// 新規送信: 状態を初期化し、新しいサイクル番号を返す
    pub fn begin_submission(&mut self, now: DateTime<Utc>) -> u64 {
        self.cycle += 1;
        self.job_id = None;
        self.status = None;
        self.progress = 0;
        self.error_message = None;
        self.generation_duration_secs = None;
        self.scenes.clear();
        self.export_info = None;
        self.is_generating = true;
        self.cycle_active = true;
        self.started_at = Some(now);
        self.cycle
    }

    /// start 呼び出しが返したジョブIDを紐づける
    pub fn attach_job(&mut self, cycle: u64, job_id: JobId) -> Result<PollTag, AppError> {
        if cycle != self.cycle {
            return Err(AppError::superseded(format!(
                "job {job_id} was superseded by a newer submission"
            )));
        }
        self.job_id = Some(job_id.clone());
        Ok(PollTag { job_id, cycle })
    }

    /// start 呼び出しが失敗した
    pub fn abort_submission(&mut self, cycle: u64) {
        if cycle == self.cycle {
            self.is_generating = false;
            self.cycle_active = false;
        }
    }

    pub fn apply_status(&mut self, tag: &PollTag, report: &JobStatusReport) -> StatusOutcome {
        if !self.is_current(tag) {
            return StatusOutcome::Stale;
        }
        if self.status.is_some_and(|s| s.is_terminal()) {
            return StatusOutcome::Stale;
        }

        let reported = report.clamped_progress();
        if reported < self.progress {
            log::debug!(
                "job {}: progress regression ignored ({} -> {reported})",
                tag.job_id,
                self.progress
            );
        }
        self.progress = self.progress.max(reported);
        self.status = Some(report.status);

        match report.status {
            JobStatus::Completed => {
                self.is_generating = false;
                if report.generation_duration.is_some() {
                    self.generation_duration_secs = report.generation_duration;
                }
                if report.export_info.is_some() {
                    self.export_info = report.export_info.clone();
                }
                StatusOutcome::Completed
            }
            JobStatus::Failed => {
                self.is_generating = false;
                self.cycle_active = false;
                self.error_message = Some(
                    report
                        .error
                        .clone()
                        .filter(|e| !e.trim().is_empty())
                        .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string()),
                );
                StatusOutcome::Failed
            }
            _ => StatusOutcome::Continue,
        }
    }

    /// シーン一覧を反映する。タグ不一致なら false
    pub fn apply_scenes(&mut self, tag: &PollTag, listing: SceneListing) -> bool {
        if !self.is_current(tag) {
            return false;
        }
        self.scenes = listing.scenes;
        if listing.export_info.is_some() {
            self.export_info = listing.export_info;
        }
        true
    }

    /// サイクルが自然終了した（シーン取得後、または取得失敗後）
    pub fn finish_cycle(&mut self, tag: &PollTag) {
        if self.is_current(tag) {
            self.cycle_active = false;
        }
    }

    /// 試行回数上限に達した
    pub fn give_up(&mut self, tag: &PollTag, message: impl Into<String>) -> bool {
        if !self.is_current(tag) {
            return false;
        }
        self.status = Some(JobStatus::Failed);
        self.error_message = Some(message.into());
        self.is_generating = false;
        self.cycle_active = false;
        true
    }

    /// ユーザーによるキャンセル。以降の応答は全て旧サイクル扱いになる
    pub fn cancel(&mut self) -> bool {
        let was_active = self.cycle_active;
        self.cycle += 1;
        self.is_generating = false;
        self.cycle_active = false;
        was_active
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            job_id: self.job_id.clone(),
            status: self.status,
            progress: self.progress,
            error_message: self.error_message.clone(),
            generation_duration_secs: self.generation_duration_secs,
            scenes: self.scenes.clone(),
            export_info: self.export_info.clone(),
            is_generating: self.is_generating,
            cycle_active: self.cycle_active,
            started_at: self.started_at.map(|t| t.to_rfc3339()),
        }
    }
}

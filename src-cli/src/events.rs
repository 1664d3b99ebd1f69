use serde::Serialize;

/// イベント名定数
pub const JOB_PROGRESS: &str = "job_progress";
pub const JOB_COMPLETED: &str = "job_completed";
pub const JOB_FAILED: &str = "job_failed";
pub const ERROR: &str = "error";

#[derive(Serialize)]
struct EventLine<'a, S: Serialize> {
    event: &'a str,
    payload: S,
}

/// 統一イベント送信関数（1行1イベントのJSONを標準出力へ）
pub fn emit_event<S: Serialize>(event_name: &str, payload: S) {
    let line = EventLine {
        event: event_name,
        payload,
    };
    match serde_json::to_string(&line) {
        Ok(json) => println!("{json}"),
        Err(e) => log::error!("イベント送信失敗 [{event_name}]: {e}"),
    }
}

/// job_progress ペイロード
#[derive(Debug, Clone, Serialize)]
pub struct JobProgressPayload {
    pub job_id: String,
    pub status: String,
    pub progress: u8,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta: Option<String>,
}

/// job_completed ペイロード
#[derive(Debug, Clone, Serialize)]
pub struct JobCompletedPayload {
    pub job_id: String,
    pub scenes: usize,
    pub duration: String,
    pub total_file_size: String,
    pub download_urls: Vec<String>,
    pub demo_mode: bool,
    pub direct_streaming: bool,
}

/// job_failed ペイロード
#[derive(Debug, Clone, Serialize)]
pub struct JobFailedPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    pub message: String,
}

/// error ペイロード
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub recoverable: bool,
}

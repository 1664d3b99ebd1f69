use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::domain::error::AppError;
use crate::domain::job::{JobId, JobSnapshot, JobState, PollTag, StatusOutcome};
use crate::domain::settings::ClientSettings;
use crate::domain::types::{Quality, Style};
use crate::infra::metrics::Metrics;
use crate::infra::service::{GenerationService, StartRequest};

pub const GAVE_UP_MESSAGE: &str = "Gave up waiting for the generation service";

/// ジョブポーラー: 1ジョブを送信から終端状態、シーン一覧取得まで駆動する
///
/// 現在ジョブのスロットは常に1つ。新しい送信は進行中のサイクルを止めてから始まる。
pub struct JobPoller {
    shared: Arc<Shared>,
}

struct Shared {
    service: Arc<dyn GenerationService>,
    metrics: Arc<Metrics>,
    interval: Duration,
    max_attempts: Option<u32>,
    slot: Mutex<Slot>,
    snapshot_tx: watch::Sender<JobSnapshot>,
}

struct Slot {
    state: JobState,
    started: Option<Instant>,
    cycle: Option<CycleHandle>,
}

/// 実行中のポーリングタスク
struct CycleHandle {
    cancel_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl CycleHandle {
    fn stop(mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
        self.handle.abort();
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap()
    }

    /// 状態を変更し、変更後のスナップショットを配信する
    fn update<R>(&self, f: impl FnOnce(&mut JobState) -> R) -> R {
        let mut slot = self.lock();
        let result = f(&mut slot.state);
        self.snapshot_tx.send_replace(slot.state.snapshot());
        result
    }
}

impl JobPoller {
    pub fn new(
        service: Arc<dyn GenerationService>,
        metrics: Arc<Metrics>,
        settings: &ClientSettings,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(JobSnapshot::default());
        Self {
            shared: Arc::new(Shared {
                service,
                metrics,
                interval: settings.poll_interval(),
                max_attempts: settings.max_poll_attempts,
                slot: Mutex::new(Slot {
                    state: JobState::new(),
                    started: None,
                    cycle: None,
                }),
                snapshot_tx,
            }),
        }
    }

    /// 脚本を送信してポーリングを開始する
    pub async fn submit(
        &self,
        screenplay: &str,
        style: Style,
        quality: Quality,
    ) -> Result<JobId, AppError> {
        if screenplay.trim().is_empty() {
            return Err(AppError::validation("Please enter a screenplay"));
        }

        let cycle = {
            let mut slot = self.shared.lock();
            if let Some(previous) = slot.cycle.take() {
                log::info!("前回のポーリングサイクルを停止します");
                previous.stop();
            }
            let cycle = slot.state.begin_submission(chrono::Utc::now());
            slot.started = Some(Instant::now());
            self.shared.snapshot_tx.send_replace(slot.state.snapshot());
            cycle
        };
        self.shared.metrics.inc_jobs_submitted();

        let request = StartRequest {
            screenplay: screenplay.to_string(),
            style,
            quality,
        };
        let started = Instant::now();
        let result = self.shared.service.start(request).await;
        self.shared
            .metrics
            .record_latency("start", started.elapsed().as_millis() as u64);

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                log::error!("生成の開始に失敗しました: {e}");
                self.shared.update(|s| s.abort_submission(cycle));
                return Err(AppError::submission("Failed to start generation"));
            }
        };

        let mut slot = self.shared.lock();
        let tag = slot.state.attach_job(cycle, response.job_id)?;
        self.shared.snapshot_tx.send_replace(slot.state.snapshot());

        let (cancel_tx, cancel_rx) = oneshot::channel();
        let handle = tokio::spawn(run_cycle(self.shared.clone(), tag.clone(), cancel_rx));
        if let Some(stale) = slot.cycle.replace(CycleHandle {
            cancel_tx: Some(cancel_tx),
            handle,
        }) {
            stale.stop();
        }

        log::info!(
            "job {} started ({}, {})",
            tag.job_id,
            style.as_str(),
            quality.as_str()
        );
        Ok(tag.job_id)
    }

    /// 進行中のサイクルを止める。止めたものがあれば true
    pub fn cancel(&self) -> bool {
        let mut slot = self.shared.lock();
        if let Some(cycle) = slot.cycle.take() {
            cycle.stop();
        }
        let was_active = slot.state.cancel();
        self.shared.snapshot_tx.send_replace(slot.state.snapshot());
        drop(slot);

        if was_active {
            self.shared.metrics.inc_jobs_cancelled();
            log::info!("ポーリングをキャンセルしました");
        }
        was_active
    }

    pub fn snapshot(&self) -> JobSnapshot {
        self.shared.lock().state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<JobSnapshot> {
        self.shared.snapshot_tx.subscribe()
    }

    /// 送信からの経過時間
    pub fn elapsed(&self) -> Option<Duration> {
        self.shared.lock().started.map(|t| t.elapsed())
    }

    /// サイクルが終わる（シーン取得済み・失敗・キャンセル）まで待つ
    pub async fn wait_settled(&self) -> JobSnapshot {
        let mut rx = self.subscribe();
        let settled = rx.wait_for(|s| !s.cycle_active).await.map(|s| s.clone());
        match settled {
            Ok(snapshot) => snapshot,
            Err(_) => self.snapshot(),
        }
    }
}

impl Drop for JobPoller {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.shared.slot.lock() {
            if let Some(cycle) = slot.cycle.take() {
                cycle.stop();
            }
        }
    }
}

async fn run_cycle(shared: Arc<Shared>, tag: PollTag, mut cancel_rx: oneshot::Receiver<()>) {
    let mut ticker = tokio::time::interval_at(Instant::now() + shared.interval, shared.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut attempts: u32 = 0;

    loop {
        tokio::select! {
            _ = &mut cancel_rx => {
                log::debug!("job {}: cycle cancelled", tag.job_id);
                return;
            }
            _ = ticker.tick() => {}
        }

        attempts += 1;
        shared.metrics.inc_status_polls();
        let started = Instant::now();
        let result = shared.service.get_status(&tag.job_id).await;
        shared
            .metrics
            .record_latency("status", started.elapsed().as_millis() as u64);

        match result {
            Ok(report) => match shared.update(|s| s.apply_status(&tag, &report)) {
                StatusOutcome::Continue => {}
                StatusOutcome::Stale => {
                    shared.metrics.inc_stale_responses();
                    log::debug!("job {}: stale status response discarded", tag.job_id);
                    return;
                }
                StatusOutcome::Failed => {
                    shared.metrics.inc_jobs_failed();
                    log::warn!(
                        "job {} failed: {}",
                        tag.job_id,
                        report.error.as_deref().unwrap_or("-")
                    );
                    return;
                }
                StatusOutcome::Completed => {
                    shared.metrics.inc_jobs_completed();
                    log::info!("job {} completed", tag.job_id);
                    fetch_scenes(&shared, &tag).await;
                    return;
                }
            },
            Err(e) => {
                // 一時エラーは記録のみ。次のtickで再試行する
                shared.metrics.inc_transient_errors();
                log::warn!("job {}: status poll failed: {e}", tag.job_id);
            }
        }

        if shared.max_attempts.is_some_and(|max| attempts >= max) {
            if shared.update(|s| s.give_up(&tag, GAVE_UP_MESSAGE)) {
                shared.metrics.inc_jobs_failed();
                log::warn!("job {}: gave up after {attempts} polls", tag.job_id);
            }
            return;
        }
    }
}

async fn fetch_scenes(shared: &Shared, tag: &PollTag) {
    let started = Instant::now();
    let result = shared.service.get_scenes(&tag.job_id).await;
    shared
        .metrics
        .record_latency("scenes", started.elapsed().as_millis() as u64);

    match result {
        Ok(listing) => {
            let count = listing.scenes.len();
            if shared.update(|s| s.apply_scenes(tag, listing)) {
                log::info!("job {}: {count} scenes received", tag.job_id);
            } else {
                shared.metrics.inc_stale_responses();
            }
        }
        Err(e) => {
            shared.metrics.inc_transient_errors();
            log::warn!("job {}: scene fetch failed: {e}", tag.job_id);
        }
    }

    shared.update(|s| s.finish_cycle(tag));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, VecDeque};

    use async_trait::async_trait;

    use crate::domain::error::ErrorCode;
    use crate::domain::job::{JobStatus, JobStatusReport, SceneListing};
    use crate::domain::types::{ExportInfo, Scene};
    use crate::infra::service::{ServiceError, ServiceInfo, StartResponse};

    /// ジョブIDごとに応答を台本化したフェイクサービス
    #[derive(Default)]
    struct ScriptedService {
        start_ids: Mutex<VecDeque<(String, Duration)>>,
        fail_start: bool,
        fail_scenes: bool,
        statuses: Mutex<HashMap<String, VecDeque<Result<JobStatusReport, ServiceError>>>>,
        status_delay: Mutex<HashMap<String, Duration>>,
        scenes: Mutex<HashMap<String, SceneListing>>,
        status_calls: Mutex<HashMap<String, u32>>,
        start_calls: Mutex<u32>,
        scene_calls: Mutex<u32>,
    }

    impl ScriptedService {
        fn job(self, id: &str, statuses: Vec<Result<JobStatusReport, ServiceError>>) -> Self {
            self.start_ids
                .lock()
                .unwrap()
                .push_back((id.to_string(), Duration::ZERO));
            self.statuses
                .lock()
                .unwrap()
                .insert(id.to_string(), statuses.into_iter().collect());
            self
        }

        fn start_delay(self, id: &str, delay: Duration) -> Self {
            for entry in self.start_ids.lock().unwrap().iter_mut() {
                if entry.0 == id {
                    entry.1 = delay;
                }
            }
            self
        }

        fn status_delay(self, id: &str, delay: Duration) -> Self {
            self.status_delay.lock().unwrap().insert(id.to_string(), delay);
            self
        }

        fn scenes(self, id: &str, listing: SceneListing) -> Self {
            self.scenes.lock().unwrap().insert(id.to_string(), listing);
            self
        }

        fn status_calls(&self, id: &str) -> u32 {
            self.status_calls.lock().unwrap().get(id).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl GenerationService for ScriptedService {
        async fn start(&self, _request: StartRequest) -> Result<StartResponse, ServiceError> {
            *self.start_calls.lock().unwrap() += 1;
            if self.fail_start {
                return Err(ServiceError::Transport("connection refused".to_string()));
            }
            let next = self.start_ids.lock().unwrap().pop_front();
            let (id, delay) = next.ok_or_else(|| ServiceError::Decode("no job".to_string()))?;
            tokio::time::sleep(delay).await;
            Ok(StartResponse {
                job_id: JobId::new(id),
                status: None,
                message: None,
            })
        }

        async fn get_status(&self, job_id: &JobId) -> Result<JobStatusReport, ServiceError> {
            *self
                .status_calls
                .lock()
                .unwrap()
                .entry(job_id.to_string())
                .or_default() += 1;
            let delay = self.status_delay.lock().unwrap().get(job_id.as_str()).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let next = self
                .statuses
                .lock()
                .unwrap()
                .get_mut(job_id.as_str())
                .and_then(|q| q.pop_front());
            next.unwrap_or_else(|| Ok(report(JobStatus::Processing, 10)))
        }

        async fn get_scenes(&self, job_id: &JobId) -> Result<SceneListing, ServiceError> {
            *self.scene_calls.lock().unwrap() += 1;
            if self.fail_scenes {
                return Err(ServiceError::Timeout);
            }
            Ok(self
                .scenes
                .lock()
                .unwrap()
                .get(job_id.as_str())
                .cloned()
                .unwrap_or_default())
        }

        async fn info(&self) -> Result<ServiceInfo, ServiceError> {
            Err(ServiceError::Http { status: 404, body: String::new() })
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn report(status: JobStatus, progress: i64) -> JobStatusReport {
        JobStatusReport {
            status,
            progress,
            error: None,
            export_info: None,
            generation_duration: None,
        }
    }

    fn export_info() -> ExportInfo {
        ExportInfo {
            storage_type: "replicate_urls".to_string(),
            resolution: "1024x576".to_string(),
            total_file_size_bytes: 6_291_456,
            download_urls: vec!["https://cdn/1.mp4".to_string()],
            scene_videos: vec![],
            format: Some("MP4".to_string()),
            total_scenes: Some(3),
            total_duration: None,
            cloud_storage_enabled: false,
        }
    }

    fn scene(n: u32) -> Scene {
        Scene {
            scene_number: n,
            scene_type: "INTERIOR".to_string(),
            location: "STUDIO".to_string(),
            characters: vec![],
            dialogs: vec![],
            video_url: Some(format!("https://cdn/{n}.mp4")),
            file_size_bytes: Some(2_097_152),
            generation_time_secs: Some(4.2),
            is_demo: false,
        }
    }

    fn listing(n: u32) -> SceneListing {
        SceneListing {
            scenes: (1..=n).map(scene).collect(),
            export_info: None,
        }
    }

    fn poller(service: Arc<ScriptedService>) -> (JobPoller, Arc<Metrics>) {
        poller_with(service, ClientSettings::default())
    }

    fn poller_with(
        service: Arc<ScriptedService>,
        settings: ClientSettings,
    ) -> (JobPoller, Arc<Metrics>) {
        let metrics = Arc::new(Metrics::new());
        (JobPoller::new(service, metrics.clone(), &settings), metrics)
    }

    const SCRIPT: &str = "INT. STUDIO - DAY\n\nANNA\nAction!\n";

    #[tokio::test(start_paused = true)]
    async fn test_submit_rejects_empty_screenplay() {
        let service = Arc::new(ScriptedService::default());
        let (poller, _) = poller(service.clone());

        let err = poller.submit("   \n", Style::Cinematic, Quality::Medium).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Validation);
        assert_eq!(*service.start_calls.lock().unwrap(), 0);
        assert!(!poller.snapshot().is_generating);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_job_fetches_scenes() {
        let mut done = report(JobStatus::Completed, 100);
        done.export_info = Some(export_info());
        done.generation_duration = Some(61.5);
        let service = Arc::new(
            ScriptedService::default()
                .job("job-1", vec![Ok(report(JobStatus::Processing, 40)), Ok(done)])
                .scenes("job-1", listing(3)),
        );
        let (poller, metrics) = poller(service.clone());

        let job_id = poller.submit(SCRIPT, Style::Noir, Quality::High).await.unwrap();
        assert_eq!(job_id.as_str(), "job-1");
        assert!(poller.snapshot().is_generating);

        let snap = poller.wait_settled().await;
        assert_eq!(snap.status, Some(JobStatus::Completed));
        assert_eq!(snap.progress, 100);
        assert_eq!(snap.scenes.len(), 3);
        assert_eq!(snap.export_info, Some(export_info()));
        assert_eq!(snap.generation_duration_secs, Some(61.5));
        assert!(!snap.is_generating);

        // 終端後はポーリングしない
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(service.status_calls("job-1"), 2);
        assert_eq!(*service.scene_calls.lock().unwrap(), 1);
        assert_eq!(metrics.summary().jobs_completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scene_listing_export_info_overrides() {
        let mut done = report(JobStatus::Completed, 100);
        done.export_info = Some(export_info());
        let mut from_scenes = export_info();
        from_scenes.storage_type = "s3".to_string();
        let service = Arc::new(
            ScriptedService::default()
                .job("job-1", vec![Ok(done)])
                .scenes(
                    "job-1",
                    SceneListing {
                        scenes: vec![scene(1)],
                        export_info: Some(from_scenes.clone()),
                    },
                ),
        );
        let (poller, _) = poller(service);

        poller.submit(SCRIPT, Style::Cinematic, Quality::Medium).await.unwrap();
        let snap = poller.wait_settled().await;
        assert_eq!(snap.export_info, Some(from_scenes));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scene_fetch_failure_keeps_job_completed() {
        let service = Arc::new(ScriptedService {
            fail_scenes: true,
            ..ScriptedService::default().job("job-1", vec![Ok(report(JobStatus::Completed, 100))])
        });
        let (poller, metrics) = poller(service.clone());

        poller.submit(SCRIPT, Style::Cinematic, Quality::Medium).await.unwrap();
        let snap = poller.wait_settled().await;

        assert_eq!(snap.status, Some(JobStatus::Completed));
        assert!(snap.scenes.is_empty());
        assert!(snap.error_message.is_none());
        assert!(!snap.is_generating);
        assert!(!snap.cycle_active);
        assert_eq!(metrics.summary().transient_errors, 1);
        assert_eq!(*service.scene_calls.lock().unwrap(), 1);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(service.status_calls("job-1"), 1);
        assert_eq!(*service.scene_calls.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_job_exposes_error() {
        let mut failed = report(JobStatus::Failed, 30);
        failed.error = Some("quota exceeded".to_string());
        let service = Arc::new(ScriptedService::default().job("job-1", vec![Ok(failed)]));
        let (poller, metrics) = poller(service.clone());

        poller.submit(SCRIPT, Style::Horror, Quality::Low).await.unwrap();
        let snap = poller.wait_settled().await;

        assert_eq!(snap.error_message.as_deref(), Some("quota exceeded"));
        assert!(!snap.is_generating);
        assert!(snap.scenes.is_empty());
        assert_eq!(*service.scene_calls.lock().unwrap(), 0);
        assert_eq!(metrics.summary().jobs_failed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_poll_waits_one_interval() {
        let service = Arc::new(ScriptedService::default().job("job-1", vec![]));
        let (poller, _) = poller(service.clone());

        poller.submit(SCRIPT, Style::Cinematic, Quality::Medium).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1999)).await;
        assert_eq!(service.status_calls("job-1"), 0);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(service.status_calls("job-1"), 1);
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(service.status_calls("job-1"), 2);
        poller.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_keep_polling() {
        let service = Arc::new(ScriptedService::default().job(
            "job-1",
            vec![
                Err(ServiceError::Transport("reset by peer".to_string())),
                Err(ServiceError::Timeout),
                Ok(report(JobStatus::Processing, 60)),
                Err(ServiceError::Http { status: 502, body: "bad gateway".to_string() }),
                Ok(report(JobStatus::Completed, 100)),
            ],
        ));
        let (poller, metrics) = poller(service.clone());

        poller.submit(SCRIPT, Style::Anime, Quality::Ultra).await.unwrap();
        let snap = poller.wait_settled().await;

        assert_eq!(snap.status, Some(JobStatus::Completed));
        assert!(snap.error_message.is_none());
        assert_eq!(service.status_calls("job-1"), 5);
        assert_eq!(metrics.summary().transient_errors, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submission_error() {
        let service = Arc::new(ScriptedService {
            fail_start: true,
            ..Default::default()
        });
        let (poller, _) = poller(service);

        let err = poller.submit(SCRIPT, Style::Cinematic, Quality::Medium).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Submission);
        let snap = poller.snapshot();
        assert!(!snap.is_generating);
        assert!(!snap.cycle_active);
        assert!(snap.job_id.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resubmit_supersedes_previous_cycle() {
        let service = Arc::new(
            ScriptedService::default()
                .job("job-a", vec![])
                .job(
                    "job-b",
                    vec![
                        Ok(report(JobStatus::Processing, 50)),
                        Ok(report(JobStatus::Completed, 100)),
                    ],
                )
                .scenes("job-a", listing(5))
                .scenes("job-b", listing(2)),
        );
        let (poller, _) = poller(service.clone());

        poller.submit(SCRIPT, Style::Cinematic, Quality::Medium).await.unwrap();
        tokio::time::sleep(Duration::from_millis(4500)).await;
        let a_calls = service.status_calls("job-a");
        assert_eq!(a_calls, 2);

        poller.submit(SCRIPT, Style::Fantasy, Quality::High).await.unwrap();
        let snap = poller.wait_settled().await;
        tokio::time::sleep(Duration::from_secs(20)).await;

        assert_eq!(service.status_calls("job-a"), a_calls);
        assert_eq!(snap.job_id, Some(JobId::new("job-b")));
        assert_eq!(snap.scenes.len(), 2);
        assert_eq!(poller.snapshot(), snap);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_response_from_superseded_job_is_ignored() {
        let service = Arc::new(
            ScriptedService::default()
                .job("job-a", vec![Ok(report(JobStatus::Completed, 100))])
                .status_delay("job-a", Duration::from_secs(5))
                .scenes("job-a", listing(4))
                .job(
                    "job-b",
                    vec![
                        Ok(report(JobStatus::Processing, 20)),
                        Ok(report(JobStatus::Processing, 30)),
                        Ok(report(JobStatus::Processing, 40)),
                        Ok(report(JobStatus::Processing, 50)),
                    ],
                ),
        );
        let (poller, _) = poller(service.clone());

        poller.submit(SCRIPT, Style::Cinematic, Quality::Medium).await.unwrap();
        // job-a のステータス要求が応答待ちの間に再送信する
        tokio::time::sleep(Duration::from_millis(3000)).await;
        assert_eq!(service.status_calls("job-a"), 1);
        poller.submit(SCRIPT, Style::Cinematic, Quality::Medium).await.unwrap();

        tokio::time::sleep(Duration::from_secs(7)).await;
        let snap = poller.snapshot();
        assert_eq!(snap.job_id, Some(JobId::new("job-b")));
        assert_eq!(snap.status, Some(JobStatus::Processing));
        assert!(snap.scenes.is_empty());
        assert!(snap.is_generating);
        poller.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_superseded_while_starting() {
        let service = Arc::new(
            ScriptedService::default()
                .job("job-a", vec![Ok(report(JobStatus::Completed, 100))])
                .start_delay("job-a", Duration::from_secs(3))
                .job("job-b", vec![Ok(report(JobStatus::Completed, 100))])
                .scenes("job-b", listing(1)),
        );
        let (poller, _) = poller(service.clone());

        let (first, second) = tokio::join!(
            poller.submit(SCRIPT, Style::Cinematic, Quality::Medium),
            async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                poller.submit(SCRIPT, Style::Noir, Quality::Medium).await
            }
        );

        assert_eq!(first.unwrap_err().code, ErrorCode::Superseded);
        assert_eq!(second.unwrap().as_str(), "job-b");

        let snap = poller.wait_settled().await;
        assert_eq!(snap.job_id, Some(JobId::new("job-b")));
        assert_eq!(snap.scenes.len(), 1);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(service.status_calls("job-a"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_polling() {
        let service = Arc::new(ScriptedService::default().job("job-1", vec![]));
        let (poller, metrics) = poller(service.clone());

        poller.submit(SCRIPT, Style::Cinematic, Quality::Medium).await.unwrap();
        tokio::time::sleep(Duration::from_millis(4500)).await;
        assert!(poller.cancel());
        let calls = service.status_calls("job-1");

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(service.status_calls("job-1"), calls);

        let snap = poller.wait_settled().await;
        assert!(!snap.is_generating);
        assert_eq!(snap.progress, 10);
        assert!(!poller.cancel());
        assert_eq!(metrics.summary().jobs_cancelled, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_poll_attempts_gives_up() {
        let service = Arc::new(ScriptedService::default().job("job-1", vec![]));
        let settings = ClientSettings {
            max_poll_attempts: Some(3),
            ..Default::default()
        };
        let (poller, _) = poller_with(service.clone(), settings);

        poller.submit(SCRIPT, Style::Cinematic, Quality::Medium).await.unwrap();
        let snap = poller.wait_settled().await;

        assert_eq!(service.status_calls("job-1"), 3);
        assert_eq!(snap.status, Some(JobStatus::Failed));
        assert_eq!(snap.error_message.as_deref(), Some(GAVE_UP_MESSAGE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_progress() {
        let service = Arc::new(
            ScriptedService::default()
                .job(
                    "job-1",
                    vec![
                        Ok(report(JobStatus::Queued, 0)),
                        Ok(report(JobStatus::Processing, 35)),
                        Ok(report(JobStatus::Completed, 100)),
                    ],
                )
                .scenes("job-1", listing(1)),
        );
        let (poller, _) = poller(service);
        let mut rx = poller.subscribe();

        poller.submit(SCRIPT, Style::Cinematic, Quality::Medium).await.unwrap();
        let mid = rx.wait_for(|s| s.progress == 35).await.map(|s| s.clone()).unwrap();
        assert!(mid.is_generating);
        assert_eq!(mid.status, Some(JobStatus::Processing));

        let done = rx.wait_for(|s| !s.cycle_active).await.map(|s| s.clone()).unwrap();
        assert_eq!(done.scenes.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_tracks_submission() {
        let service = Arc::new(ScriptedService::default().job("job-1", vec![]));
        let (poller, _) = poller(service);
        assert!(poller.elapsed().is_none());

        poller.submit(SCRIPT, Style::Cinematic, Quality::Medium).await.unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(poller.elapsed().unwrap() >= Duration::from_secs(3));
        poller.cancel();
    }
}

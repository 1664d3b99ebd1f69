use std::path::{Path, PathBuf};

use fg_core::domain::error::AppError;
use fg_core::domain::job::{JobSnapshot, JobStatus, DEFAULT_FAILURE_MESSAGE};
use fg_core::domain::scene::{format_file_size, has_demo_scenes};
use fg_core::domain::stage::format_duration;
use fg_core::domain::types::{Quality, Style};
use fg_core::usecase::app_service::AppService;

use crate::events::{
    self, ErrorPayload, JobCompletedPayload, JobFailedPayload, JobProgressPayload, ERROR,
    JOB_COMPLETED, JOB_FAILED, JOB_PROGRESS,
};

/// コマンドエラー型
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("{0}")]
    App(#[from] AppError),
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Serialize(#[from] serde_json::Error),
}

impl CommandError {
    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            Self::App(e) => ErrorPayload {
                code: e.code.as_str().to_string(),
                message: e.message.clone(),
                recoverable: e.recoverable,
            },
            other => ErrorPayload {
                code: "E_INTERNAL".to_string(),
                message: other.to_string(),
                recoverable: false,
            },
        }
    }

    /// エラーを出力する（--json ならイベント行）
    pub fn report(&self, json: bool) {
        if json {
            events::emit_event(ERROR, self.to_payload());
        } else {
            eprintln!("error: {self}");
        }
    }
}

pub type CmdResult<T> = Result<T, CommandError>;

fn read_screenplay(path: &Path) -> CmdResult<String> {
    std::fs::read_to_string(path).map_err(|source| CommandError::Read {
        path: path.to_path_buf(),
        source,
    })
}

// --- Commands ---

pub fn estimate(service: &AppService, path: &Path, quality: Quality, json: bool) -> CmdResult<()> {
    let screenplay = read_screenplay(path)?;
    let Some(estimate) = service.estimate_cost(&screenplay, quality) else {
        return Err(AppError::validation("Please enter a screenplay").into());
    };

    if json {
        println!("{}", serde_json::to_string(&estimate)?);
    } else {
        println!("Quality:        {} ({})", quality.as_str(), quality.resolution_label());
        println!("Scenes:         {}", estimate.scene_count);
        println!("Dialogue chars: {}", estimate.dialog_char_count);
        println!("Video:          ${:.2}", estimate.video_cost);
        println!("Voice:          ${:.3}", estimate.tts_cost);
        println!("Total:          ${:.2}", estimate.total_cost);
    }
    Ok(())
}

pub struct GenerateArgs {
    pub path: PathBuf,
    pub style: Option<Style>,
    pub quality: Option<Quality>,
    pub download: bool,
    pub json: bool,
}

pub async fn generate(service: &AppService, args: GenerateArgs) -> CmdResult<()> {
    let screenplay = read_screenplay(&args.path)?;
    let style = args.style.unwrap_or(service.settings().default_style);
    let quality = args.quality.unwrap_or(service.settings().default_quality);

    if let Some(estimate) = service.estimate_cost(&screenplay, quality) {
        log::info!(
            "estimated cost ${:.2} for {} scenes",
            estimate.total_cost,
            estimate.scene_count
        );
    }

    let job_id = service.generate(&screenplay, style, quality).await?;
    if !args.json {
        println!("Job {job_id} submitted ({}, {})", style.display_name(), quality.as_str());
    }

    let mut rx = service.subscribe();
    let mut last_progress: Option<u8> = None;
    let snapshot = loop {
        let snapshot = rx.borrow_and_update().clone();
        if !snapshot.cycle_active {
            break snapshot;
        }
        if snapshot.is_generating && last_progress != Some(snapshot.progress) {
            last_progress = Some(snapshot.progress);
            print_progress(service, &snapshot, args.json);
        }

        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break service.snapshot();
                }
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("interrupted, cancelling job {job_id}");
                service.cancel();
                break service.snapshot();
            }
        }
    };

    match snapshot.status {
        Some(JobStatus::Completed) => print_completed(service, &snapshot, args.json),
        Some(JobStatus::Failed) => {
            let error = service
                .job_error()
                .unwrap_or_else(|| AppError::job_failed(DEFAULT_FAILURE_MESSAGE));
            if args.json {
                events::emit_event(
                    JOB_FAILED,
                    JobFailedPayload {
                        job_id: snapshot.job_id.as_ref().map(|id| id.to_string()),
                        message: error.message.clone(),
                    },
                );
            }
            return Err(error.into());
        }
        _ => {
            if !args.json {
                println!("Job {job_id} cancelled");
            }
            return Ok(());
        }
    }

    if args.download {
        let report = service.download_all().wait().await;
        if !args.json {
            println!("Opened {}/{} downloads", report.opened, report.requested);
        }
    }
    Ok(())
}

fn print_progress(service: &AppService, snapshot: &JobSnapshot, json: bool) {
    let view = service.progress_view();
    if json {
        events::emit_event(
            JOB_PROGRESS,
            JobProgressPayload {
                job_id: snapshot
                    .job_id
                    .as_ref()
                    .map(|id| id.to_string())
                    .unwrap_or_default(),
                status: snapshot
                    .status
                    .map(|s| s.as_str().to_string())
                    .unwrap_or_else(|| "submitting".to_string()),
                progress: view.progress,
                label: view.label.to_string(),
                eta: view.eta,
            },
        );
    } else {
        let eta = view
            .eta
            .map(|eta| format!(", ~{eta} remaining"))
            .unwrap_or_default();
        println!(
            "[{:>3}%] {} ({} elapsed{eta})",
            view.progress, view.label, view.elapsed_display
        );
    }
}

fn completed_payload(service: &AppService, snapshot: &JobSnapshot) -> JobCompletedPayload {
    let total_size = snapshot
        .export_info
        .as_ref()
        .map(|info| info.total_file_size_bytes)
        .filter(|bytes| *bytes > 0);
    JobCompletedPayload {
        job_id: snapshot
            .job_id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_default(),
        scenes: snapshot.scenes.len(),
        duration: format_duration(snapshot.generation_duration_secs),
        total_file_size: format_file_size(total_size),
        download_urls: service.download_targets(),
        demo_mode: has_demo_scenes(&snapshot.scenes),
        direct_streaming: snapshot
            .export_info
            .as_ref()
            .is_some_and(|info| info.is_direct_streaming()),
    }
}

fn print_completed(service: &AppService, snapshot: &JobSnapshot, json: bool) {
    let payload = completed_payload(service, snapshot);
    if json {
        events::emit_event(JOB_COMPLETED, payload);
        return;
    }

    println!(
        "Completed: {} scenes in {} ({})",
        payload.scenes, payload.duration, payload.total_file_size
    );
    if payload.demo_mode {
        println!("Demo mode: scenes are placeholders and cannot be played");
    }
    if payload.direct_streaming {
        println!("Direct streaming: videos are served straight from the generation provider");
    }
    for scene in &snapshot.scenes {
        println!(
            "  #{:<3} {:<9} {:<24} {:>9}  {}",
            scene.scene_number,
            scene.scene_type,
            scene.location,
            format_file_size(scene.file_size_bytes),
            scene.video_url.as_deref().unwrap_or("-")
        );
        if let Some(url) = service.scene_download_url(scene.scene_number) {
            println!("       download: {url}");
        }
    }
}

pub async fn info(service: &AppService, json: bool) -> CmdResult<()> {
    let info = service.service_info().await?;
    if json {
        println!("{}", serde_json::to_string(&info)?);
        return Ok(());
    }

    println!("{} v{} ({})", info.message, info.version, info.status);
    println!("  direct streaming: {}", info.features.direct_streaming);
    println!("  cloud storage:    {}", info.features.cloud_storage);
    println!("  demo mode:        {}", info.features.demo_mode);
    println!("  styles:           {}", info.features.styles.join(", "));
    println!("  quality:          {}", info.features.quality_settings.join(", "));
    Ok(())
}

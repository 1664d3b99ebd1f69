use std::time::Duration;

use serde::Serialize;

/// 進捗帯域 [lower, upper)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub lower: u8,
    pub upper: u8,
    /// 進捗メッセージ
    pub label: &'static str,
    /// チェックリスト上のステップ名
    pub step: &'static str,
}

pub const COMPLETED_LABEL: &str = "Completed!";

pub const STAGES: [Stage; 10] = [
    Stage { lower: 0, upper: 10, label: "Initializing...", step: "Parsing" },
    Stage { lower: 10, upper: 20, label: "Analyzing screenplay...", step: "Building scenes" },
    Stage { lower: 20, upper: 30, label: "Building scenes...", step: "Characters" },
    Stage { lower: 30, upper: 40, label: "Extracting characters...", step: "Camera" },
    Stage { lower: 40, upper: 50, label: "Setting up cameras...", step: "Lighting" },
    Stage { lower: 50, upper: 60, label: "Configuring lighting...", step: "Sound" },
    Stage { lower: 60, upper: 70, label: "Creating sound design...", step: "Voices" },
    Stage { lower: 70, upper: 80, label: "Generating AI voices...", step: "Rendering" },
    Stage { lower: 80, upper: 90, label: "Rendering videos...", step: "Timeline" },
    Stage { lower: 90, upper: 100, label: "Assembling timeline and exporting...", step: "Export" },
];

/// 進捗率 → 表示ラベル。先頭から評価し最初に一致した帯域を採用する
pub fn stage_label(progress: u8) -> &'static str {
    STAGES
        .iter()
        .find(|s| progress >= s.lower && progress < s.upper)
        .map(|s| s.label)
        .unwrap_or(COMPLETED_LABEL)
}

/// チェックリストの各ステップ状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Pending,
    Active,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepStatus {
    pub step: &'static str,
    pub state: StepState,
}

pub fn step_states(progress: u8) -> Vec<StepStatus> {
    STAGES
        .iter()
        .map(|s| {
            let state = if progress >= s.upper {
                StepState::Complete
            } else if progress >= s.lower {
                StepState::Active
            } else {
                StepState::Pending
            };
            StepStatus { step: s.step, state }
        })
        .collect()
}

/// 観測レートからの線形外挿。progress == 0 では推定できない
pub fn estimated_time_remaining(elapsed: Duration, progress: u8) -> Option<Duration> {
    if progress == 0 {
        return None;
    }
    let progress = progress.min(100) as f64;
    let remaining = elapsed.as_secs_f64() / progress * (100.0 - progress);
    Some(Duration::from_secs_f64(remaining))
}

/// 残り時間表示（"42s" / "3min"）
pub fn format_remaining(remaining: Duration) -> String {
    let secs = remaining.as_secs_f64();
    if secs < 60.0 {
        format!("{}s", secs.ceil() as u64)
    } else {
        format!("{}min", (secs / 60.0).ceil() as u64)
    }
}

/// 経過時間表示（"12.3s" / "2m 5s"）
pub fn format_duration(seconds: Option<f64>) -> String {
    let seconds = match seconds {
        Some(s) if s > 0.0 => s,
        _ => return "0s".to_string(),
    };
    if seconds < 60.0 {
        format!("{seconds:.1}s")
    } else {
        let minutes = (seconds / 60.0).floor() as u64;
        let secs = (seconds % 60.0).floor() as u64;
        format!("{minutes}m {secs}s")
    }
}

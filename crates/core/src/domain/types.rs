use serde::{Deserialize, Serialize};

/// 映像スタイル
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    #[default]
    Cinematic,
    Realistic,
    Animated,
    Noir,
    Scifi,
    Horror,
    Fantasy,
    Documentary,
    Anime,
}

impl Style {
    pub const ALL: [Style; 9] = [
        Style::Cinematic,
        Style::Realistic,
        Style::Animated,
        Style::Noir,
        Style::Scifi,
        Style::Horror,
        Style::Fantasy,
        Style::Documentary,
        Style::Anime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cinematic => "cinematic",
            Self::Realistic => "realistic",
            Self::Animated => "animated",
            Self::Noir => "noir",
            Self::Scifi => "scifi",
            Self::Horror => "horror",
            Self::Fantasy => "fantasy",
            Self::Documentary => "documentary",
            Self::Anime => "anime",
        }
    }

    /// 表示名
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Cinematic => "Cinematic",
            Self::Realistic => "Realistic",
            Self::Animated => "Animated",
            Self::Noir => "Film Noir",
            Self::Scifi => "Sci-Fi",
            Self::Horror => "Horror",
            Self::Fantasy => "Fantasy",
            Self::Documentary => "Documentary",
            Self::Anime => "Anime",
        }
    }
}

impl std::str::FromStr for Style {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|style| style.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown style: {s}"))
    }
}

/// 品質ティア（解像度と1シーンあたりの動画単価が紐づく）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    Low,
    #[default]
    Medium,
    High,
    Ultra,
}

impl Quality {
    pub const ALL: [Quality; 4] = [Quality::Low, Quality::Medium, Quality::High, Quality::Ultra];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Ultra => "ultra",
        }
    }

    /// (幅, 高さ)
    pub fn resolution(&self) -> (u32, u32) {
        match self {
            Self::Low => (768, 432),
            Self::Medium => (1024, 576),
            Self::High => (1280, 720),
            Self::Ultra => (1920, 1080),
        }
    }

    /// "1280x720" 形式
    pub fn resolution_label(&self) -> String {
        let (w, h) = self.resolution();
        format!("{w}x{h}")
    }

    /// 1シーンあたりの動画生成単価（USD）
    pub fn video_cost_per_scene(&self) -> f64 {
        match self {
            Self::Low => 0.01,
            Self::Medium => 0.03,
            Self::High => 0.06,
            Self::Ultra => 0.10,
        }
    }

    /// 未知のティア名は Medium として扱う
    pub fn from_tier_lossy(tier: &str) -> Self {
        tier.parse().unwrap_or_default()
    }
}

impl std::str::FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|q| q.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown quality tier: {s}"))
    }
}

/// セリフ1件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dialog {
    pub character: String,
    #[serde(default)]
    pub text: String,
}

/// 生成済みシーン（受信後は不変）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub scene_number: u32,
    #[serde(rename = "type")]
    pub scene_type: String,
    pub location: String,
    #[serde(default)]
    pub characters: Vec<String>,
    #[serde(default)]
    pub dialogs: Vec<Dialog>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, rename = "file_size", skip_serializing_if = "Option::is_none")]
    pub file_size_bytes: Option<u64>,
    #[serde(default, rename = "generation_time", skip_serializing_if = "Option::is_none")]
    pub generation_time_secs: Option<f64>,
    #[serde(default)]
    pub is_demo: bool,
}

/// エクスポート情報に含まれるシーン動画
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneVideo {
    pub scene_number: u32,
    pub video_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

/// プロバイダURLから直接ストリーミングされる場合の storage_type
pub const STORAGE_DIRECT_STREAMING: &str = "replicate_urls";

/// 完了ジョブのエクスポート情報
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportInfo {
    pub storage_type: String,
    pub resolution: String,
    #[serde(default, rename = "total_file_size")]
    pub total_file_size_bytes: u64,
    #[serde(default)]
    pub download_urls: Vec<String>,
    #[serde(default)]
    pub scene_videos: Vec<SceneVideo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_scenes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<f64>,
    #[serde(default)]
    pub cloud_storage_enabled: bool,
}

impl ExportInfo {
    pub fn is_direct_streaming(&self) -> bool {
        self.storage_type == STORAGE_DIRECT_STREAMING
    }
}

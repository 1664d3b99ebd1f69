use serde::Serialize;

use super::types::Scene;

/// デモモードのプレースホルダURLの接頭辞
pub const PLACEHOLDER_PREFIX: &str = "placeholder";

/// 再生・ダウンロード可能か
pub fn is_playable(scene: &Scene) -> bool {
    playable_url(scene).is_some()
}

pub fn playable_url(scene: &Scene) -> Option<&str> {
    scene
        .video_url
        .as_deref()
        .filter(|url| !url.is_empty() && !url.starts_with(PLACEHOLDER_PREFIX))
}

/// 再生可能なシーンのURLを元の順序で返す
pub fn collect_download_targets(scenes: &[Scene]) -> Vec<String> {
    scenes
        .iter()
        .filter_map(playable_url)
        .map(str::to_string)
        .collect()
}

pub fn has_demo_scenes(scenes: &[Scene]) -> bool {
    scenes.iter().any(|s| s.is_demo)
}

/// ファイルサイズ表示
pub fn format_file_size(bytes: Option<u64>) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    match bytes {
        None | Some(0) => "N/A".to_string(),
        Some(b) if b < KB => format!("{b} B"),
        Some(b) if b < MB => format!("{:.1} KB", b as f64 / KB as f64),
        Some(b) if b < GB => format!("{:.1} MB", b as f64 / MB as f64),
        Some(b) => format!("{:.2} GB", b as f64 / GB as f64),
    }
}

/// 現在選択中のシーンとプレイヤーに渡しているURL
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SceneSelection {
    selected_scene: Option<u32>,
    player_url: Option<String>,
}

impl SceneSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// シーンを選択する。
    ///
    /// 再生可能ならプレイヤーのURLを差し替えてそれを返す。
    /// 再生不可なら表示上の選択だけを更新し、プレイヤーには触れない。
    pub fn select(&mut self, scene: &Scene) -> Option<&str> {
        self.selected_scene = Some(scene.scene_number);
        match playable_url(scene) {
            Some(url) => {
                self.player_url = Some(url.to_string());
                self.player_url.as_deref()
            }
            None => None,
        }
    }

    pub fn selected_scene(&self) -> Option<u32> {
        self.selected_scene
    }

    pub fn player_url(&self) -> Option<&str> {
        self.player_url.as_deref()
    }

    pub fn clear(&mut self) {
        self.selected_scene = None;
        self.player_url = None;
    }
}

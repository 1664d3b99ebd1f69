use serde::Serialize;

use super::types::Quality;

/// TTS 単価（USD / 1000文字）
pub const TTS_COST_PER_1K_CHARS: f64 = 0.015;

/// キャラクター名キューとみなす最大長（この長さ未満）
const CHARACTER_CUE_MAX_LEN: usize = 30;

/// 脚本テキストから導出するコスト見積もり（非正式・保存しない）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostEstimate {
    pub scene_count: u32,
    pub dialog_char_count: usize,
    pub video_cost: f64,
    pub tts_cost: f64,
    pub total_cost: f64,
}

/// 見積もりを計算する。空白のみのテキストでは None
pub fn estimate(screenplay: &str, quality: Quality) -> Option<CostEstimate> {
    if screenplay.trim().is_empty() {
        return None;
    }

    let scene_count = count_scene_headings(screenplay).max(1);
    let dialog_char_count = count_dialog_chars(screenplay);

    let video_cost = scene_count as f64 * quality.video_cost_per_scene();
    let tts_cost = dialog_char_count as f64 / 1000.0 * TTS_COST_PER_1K_CHARS;

    Some(CostEstimate {
        scene_count,
        dialog_char_count,
        video_cost,
        tts_cost,
        total_cost: video_cost + tts_cost,
    })
}

/// ティア名で見積もる。未知のティアは medium 単価
pub fn estimate_for_tier(screenplay: &str, tier: &str) -> Option<CostEstimate> {
    estimate(screenplay, Quality::from_tier_lossy(tier))
}

/// "INT." / "EXT." の出現数（大文字小文字無視、単語境界から始まるもののみ）
pub fn count_scene_headings(text: &str) -> u32 {
    let bytes = text.as_bytes();
    let mut count = 0;
    let mut i = 0;

    while i + 4 <= bytes.len() {
        let window = &bytes[i..i + 4];
        let is_heading =
            window.eq_ignore_ascii_case(b"INT.") || window.eq_ignore_ascii_case(b"EXT.");
        if is_heading && (i == 0 || !is_word_byte(bytes[i - 1])) {
            count += 1;
            i += 4;
        } else {
            i += 1;
        }
    }

    count
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// セリフ文字数を行単位で数える
///
/// 短い全大文字行でセリフモードに入り、空行で抜ける。
/// セリフモード中の "(" で始まらない行の文字数（trim後）を加算する。
pub fn count_dialog_chars(text: &str) -> usize {
    let mut total = 0;
    let mut in_dialog = false;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            in_dialog = false;
        } else if is_character_cue(trimmed) {
            in_dialog = true;
        } else if in_dialog && !trimmed.starts_with('(') {
            total += trimmed.chars().count();
        }
    }

    total
}

fn is_character_cue(trimmed: &str) -> bool {
    trimmed.chars().count() < CHARACTER_CUE_MAX_LEN && trimmed == trimmed.to_uppercase()
}

//! Table formatting utilities for CLI output.

use std::path::Path;

use danmu_core::VoicePair;

/// Truncate to at most `max_chars` characters, ending in "..." when cut.
///
/// # Examples
///
/// ```rust
/// use danmu_cli::presentation::truncate_string;
///
/// assert_eq!(truncate_string("Hello", 10), "Hello");
/// assert_eq!(truncate_string("Hello World", 8), "Hello...");
/// ```
pub fn truncate_string(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Print a horizontal separator line.
pub fn print_separator(width: usize) {
    println!("{}", "-".repeat(width));
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// One row of the `voices` table; `*` marks the active voice.
pub fn format_voice_row(pair: &VoicePair, active: bool) -> String {
    let marker = if active { '*' } else { ' ' };
    format!(
        "{marker} {:<16} {:<28} {:<28} {}",
        truncate_string(&pair.name, 16),
        truncate_string(&file_name(&pair.gpt_weight_path), 28),
        truncate_string(&file_name(&pair.sovits_weight_path), 28),
        file_name(&pair.reference_audio_path),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate_string("今天天气很好", 6), "今天天气很好");
        assert_eq!(truncate_string("今天天气很好啊", 6), "今天天...");
    }

    #[test]
    fn test_voice_row_marks_active() {
        let pair = VoicePair {
            name: "alice".to_string(),
            gpt_weight_path: PathBuf::from("/w/GPT_weights_v2/alice-e10.ckpt"),
            sovits_weight_path: PathBuf::from("/w/SoVITS_weights_v2/alice_e8.pth"),
            reference_audio_path: PathBuf::from("/ref/alice/clip.wav"),
        };
        let row = format_voice_row(&pair, true);
        assert!(row.starts_with("* alice "));
        assert!(row.contains("alice-e10.ckpt"));
        assert!(row.ends_with("clip.wav"));
        assert!(format_voice_row(&pair, false).starts_with("  alice"));
    }
}

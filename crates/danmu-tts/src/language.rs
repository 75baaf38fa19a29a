//! Target-language selection for synthesis requests.

/// Language tag that lets the synthesis server detect the language itself.
pub const AUTO_LANG: &str = "auto";

/// Whether `text` contains Hiragana (U+3040..U+309F) or Katakana
/// (U+30A0..U+30FF).
pub fn contains_kana(text: &str) -> bool {
    text.chars()
        .any(|c| matches!(c, '\u{3040}'..='\u{309F}' | '\u{30A0}'..='\u{30FF}'))
}

/// Pick the `text_lang` for a synthesis request.
///
/// Kana forces [`AUTO_LANG`] so mixed Japanese text is not read with a
/// Chinese model; otherwise the configured target language is used.
pub fn target_language<'a>(text: &str, configured: &'a str) -> &'a str {
    if contains_kana(text) {
        AUTO_LANG
    } else {
        configured
    }
}

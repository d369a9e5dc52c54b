use anyhow::{anyhow, Result};
use isolang::Language;
use once_cell::sync::Lazy;
use regex::Regex;

// @const: Script-range matchers for dominant-language detection
static CHINESE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\u{4e00}-\u{9fff}]").unwrap());
static LATIN_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-zA-Z]").unwrap());
static KANA_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\u{3040}-\u{309f}\u{30a0}-\u{30ff}]").unwrap());
static HANGUL_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\u{ac00}-\u{d7af}]").unwrap());

/// Language utilities for ISO language code handling.
///
/// Validation and English names come from the isolang tables; the
/// per-backend code maps cover the small set of languages the providers
/// accept in a non-standard spelling. Unmapped codes pass through
/// unchanged so new languages degrade gracefully.
/// Validate that a code is a known ISO 639-1 or 639-3 language code
pub fn validate_language_code(code: &str) -> Result<()> {
    let normalized = code.trim().to_lowercase();

    if normalized.len() == 2 && Language::from_639_1(&normalized).is_some() {
        return Ok(());
    }
    if normalized.len() == 3 && Language::from_639_3(&normalized).is_some() {
        return Ok(());
    }

    Err(anyhow!("Invalid language code: {}", code))
}

/// English display name for a language code, the code itself if unknown
pub fn get_language_name(code: &str) -> String {
    let normalized = code.trim().to_lowercase();

    let lang = match normalized.len() {
        2 => Language::from_639_1(&normalized),
        3 => Language::from_639_3(&normalized),
        _ => None,
    };

    match lang {
        Some(l) => l.to_name().to_string(),
        None => code.to_string(),
    }
}

/// Language code as accepted by the bulk translation endpoint.
/// Unmapped codes pass through unchanged.
pub fn bulk_lang_code(code: &str) -> String {
    match code {
        "zh" => "zh-CN".to_string(),
        "es" => "es-ES".to_string(),
        other => other.to_string(),
    }
}

/// Human language name used when prompting a chat-completion provider.
/// Unmapped codes pass through unchanged.
pub fn chat_lang_name(code: &str) -> String {
    match code {
        "en" => "English".to_string(),
        "zh" => "Chinese".to_string(),
        "ja" => "Japanese".to_string(),
        "ko" => "Korean".to_string(),
        "fr" => "French".to_string(),
        "de" => "German".to_string(),
        "es" => "Spanish".to_string(),
        "ru" => "Russian".to_string(),
        "ar" => "Arabic".to_string(),
        other => other.to_string(),
    }
}

/// A detected dominant language: ISO code plus display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedLanguage {
    /// ISO 639-1 code, or "auto" for mixed/unknown content
    pub code: String,
    /// Display name
    pub name: String,
}

/// Detect the dominant language of a text by script-range ratios.
///
/// CJK ideographs or Latin letters above 30% of all characters win;
/// kana or hangul above 20% win; anything else reports "auto".
pub fn detect_dominant_language(text: &str) -> DetectedLanguage {
    let total = text.chars().count();
    if total == 0 {
        return DetectedLanguage { code: "auto".to_string(), name: "Mixed/Unknown".to_string() };
    }

    let chinese = CHINESE_CHARS.find_iter(text).count();
    let latin = LATIN_CHARS.find_iter(text).count();
    let kana = KANA_CHARS.find_iter(text).count();
    let hangul = HANGUL_CHARS.find_iter(text).count();

    let total = total as f64;
    if chinese as f64 > total * 0.3 {
        DetectedLanguage { code: "zh".to_string(), name: "Chinese".to_string() }
    } else if latin as f64 > total * 0.3 {
        DetectedLanguage { code: "en".to_string(), name: "English".to_string() }
    } else if kana as f64 > total * 0.2 {
        DetectedLanguage { code: "ja".to_string(), name: "Japanese".to_string() }
    } else if hangul as f64 > total * 0.2 {
        DetectedLanguage { code: "ko".to_string(), name: "Korean".to_string() }
    } else {
        DetectedLanguage { code: "auto".to_string(), name: "Mixed/Unknown".to_string() }
    }
}

use std::str::FromStr;

use pdflingo::app_config::{Config, TranslateRequest, TranslationProvider};

fn request_with_concurrency(concurrency: Option<usize>) -> TranslateRequest {
    TranslateRequest {
        provider: TranslationProvider::Bulk,
        api_key: None,
        source_lang: "auto".to_string(),
        target_lang: "en".to_string(),
        task_id: "test".to_string(),
        concurrency,
        font_candidates: Vec::new(),
    }
}

#[test]
fn test_provider_from_str_accepts_known_names() {
    assert_eq!(TranslationProvider::from_str("bulk").unwrap(), TranslationProvider::Bulk);
    assert_eq!(TranslationProvider::from_str("free").unwrap(), TranslationProvider::Bulk);
    assert_eq!(TranslationProvider::from_str("DeepSeek").unwrap(), TranslationProvider::DeepSeek);
    assert_eq!(TranslationProvider::from_str("GPT").unwrap(), TranslationProvider::Gpt);
    assert!(TranslationProvider::from_str("nonsense").is_err());
}

#[test]
fn test_provider_display_round_trips() {
    for provider in [
        TranslationProvider::Bulk,
        TranslationProvider::DeepSeek,
        TranslationProvider::Zhipu,
        TranslationProvider::OpenRouter,
        TranslationProvider::Kimi,
        TranslationProvider::Gpt,
    ] {
        let parsed = TranslationProvider::from_str(&provider.to_string()).unwrap();
        assert_eq!(parsed, provider);
    }
}

#[test]
fn test_only_bulk_needs_no_api_key() {
    assert!(!TranslationProvider::Bulk.requires_api_key());
    assert!(TranslationProvider::DeepSeek.requires_api_key());
    assert!(TranslationProvider::Kimi.requires_api_key());
}

#[test]
fn test_concurrency_defaults_to_four_when_absent() {
    assert_eq!(request_with_concurrency(None).concurrency_or_default(), 4);
}

#[test]
fn test_concurrency_defaults_to_four_when_unusable() {
    assert_eq!(request_with_concurrency(Some(0)).concurrency_or_default(), 4);
}

#[test]
fn test_concurrency_uses_caller_value() {
    assert_eq!(request_with_concurrency(Some(9)).concurrency_or_default(), 9);
}

#[test]
fn test_default_config_is_valid() {
    let config = Config::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.source_language, "auto");
    assert_eq!(config.translation.concurrency, 4);
}

#[test]
fn test_config_rejects_unknown_target_language() {
    let mut config = Config::default();
    config.target_language = "qq".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_requires_key_for_paid_provider() {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::DeepSeek;
    assert!(config.validate().is_err());

    config.translation.api_key = "sk-test".to_string();
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_json_round_trip() {
    let config = Config::default();
    let json = serde_json::to_string(&config).unwrap();
    let parsed: Config = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.target_language, config.target_language);
    assert_eq!(parsed.translation.provider, config.translation.provider);
}

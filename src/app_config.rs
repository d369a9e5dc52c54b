use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::PathBuf;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO 639-1, or "auto")
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language code (ISO 639-1)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: Free bulk translation endpoint, no credential required
    #[default]
    Bulk,
    // @provider: DeepSeek chat completions
    DeepSeek,
    // @provider: Zhipu GLM chat completions
    Zhipu,
    // @provider: DeepSeek routed through OpenRouter
    OpenRouter,
    // @provider: Moonshot Kimi routed through OpenRouter
    Kimi,
    // @provider: GPT routed through OpenRouter
    Gpt,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Bulk => "Bulk (free)",
            Self::DeepSeek => "DeepSeek",
            Self::Zhipu => "Zhipu",
            Self::OpenRouter => "OpenRouter",
            Self::Kimi => "Kimi",
            Self::Gpt => "GPT",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Bulk => "bulk".to_string(),
            Self::DeepSeek => "deepseek".to_string(),
            Self::Zhipu => "zhipu".to_string(),
            Self::OpenRouter => "openrouter".to_string(),
            Self::Kimi => "kimi".to_string(),
            Self::Gpt => "gpt".to_string(),
        }
    }

    /// Whether the provider requires an API credential
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Self::Bulk)
    }
}

// Implement Display trait for TranslationProvider
impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

// Implement FromStr trait for TranslationProvider
impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "bulk" | "free" => Ok(Self::Bulk),
            "deepseek" => Ok(Self::DeepSeek),
            "zhipu" => Ok(Self::Zhipu),
            "openrouter" => Ok(Self::OpenRouter),
            "kimi" => Ok(Self::Kimi),
            "gpt" => Ok(Self::Gpt),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Translation settings shared by every provider
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Selected provider
    #[serde(default)]
    pub provider: TranslationProvider,

    /// API key for paid providers
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Number of simultaneously active translation workers
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Candidate font files for output text, tried in order.
    /// The first entry should be CJK-capable.
    #[serde(default = "default_font_candidates")]
    pub font_candidates: Vec<PathBuf>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            api_key: String::new(),
            concurrency: default_concurrency(),
            font_candidates: default_font_candidates(),
        }
    }
}

/// Log level configuration
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_language: default_source_language(),
            target_language: default_target_language(),
            translation: TranslationConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.source_language != "auto" {
            crate::language_utils::validate_language_code(&self.source_language)
                .map_err(|e| anyhow!("Invalid source language: {}", e))?;
        }

        crate::language_utils::validate_language_code(&self.target_language)
            .map_err(|e| anyhow!("Invalid target language: {}", e))?;

        if self.translation.concurrency == 0 {
            return Err(anyhow!("Concurrency must be at least 1"));
        }

        if self.translation.provider.requires_api_key() && self.translation.api_key.is_empty() {
            return Err(anyhow!(
                "Provider {} requires an API key",
                self.translation.provider.display_name()
            ));
        }

        Ok(())
    }
}

/// A single translation request as accepted at the task-submission boundary
#[derive(Debug, Clone)]
pub struct TranslateRequest {
    /// Selected provider
    pub provider: TranslationProvider,

    /// Optional API credential
    pub api_key: Option<String>,

    /// Source language code, "auto" to detect
    pub source_lang: String,

    /// Target language code
    pub target_lang: String,

    /// Caller-supplied task identifier
    pub task_id: String,

    /// Requested worker count; normalized through `concurrency_or_default`
    pub concurrency: Option<usize>,

    /// Candidate font files for the reconstructed output
    pub font_candidates: Vec<PathBuf>,
}

impl TranslateRequest {
    /// Effective concurrency: the caller's value when it is a usable
    /// number, otherwise the default of 4.
    pub fn concurrency_or_default(&self) -> usize {
        match self.concurrency {
            Some(n) if n >= 1 => n,
            _ => default_concurrency(),
        }
    }
}

fn default_source_language() -> String {
    "auto".to_string()
}

fn default_target_language() -> String {
    "en".to_string()
}

pub(crate) fn default_concurrency() -> usize {
    4
}

fn default_font_candidates() -> Vec<PathBuf> {
    vec![
        // CJK-capable candidates first
        PathBuf::from("/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc"),
        PathBuf::from("/usr/share/fonts/truetype/noto/NotoSansCJK-Regular.ttc"),
        PathBuf::from("/usr/share/fonts/truetype/wqy/wqy-zenhei.ttc"),
        PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"),
    ]
}

// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::too_many_arguments)]

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::app_config::{Config, TranslateRequest, TranslationProvider};
use crate::app_controller::{Controller, OutputMode};
use crate::events::{Event, EventLogLevel};
use crate::registry::TaskRegistry;

mod app_config;
mod app_controller;
mod errors;
mod events;
mod file_utils;
mod language_utils;
mod pdf;
mod pricing;
mod providers;
mod registry;
mod translation;

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliProvider {
    Bulk,
    DeepSeek,
    Zhipu,
    OpenRouter,
    Kimi,
    Gpt,
}

impl From<CliProvider> for TranslationProvider {
    fn from(cli_provider: CliProvider) -> Self {
        match cli_provider {
            CliProvider::Bulk => TranslationProvider::Bulk,
            CliProvider::DeepSeek => TranslationProvider::DeepSeek,
            CliProvider::Zhipu => TranslationProvider::Zhipu,
            CliProvider::OpenRouter => TranslationProvider::OpenRouter,
            CliProvider::Kimi => TranslationProvider::Kimi,
            CliProvider::Gpt => TranslationProvider::Gpt,
        }
    }
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Input PDF file
    #[arg(value_name = "INPUT_PDF")]
    input_path: PathBuf,

    /// Output directory (defaults to the input file's directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Translation provider to use
    #[arg(short, long, value_enum, default_value = "bulk")]
    provider: CliProvider,

    /// API key for paid providers
    #[arg(short = 'k', long, env = "PDFLINGO_API_KEY")]
    api_key: Option<String>,

    /// Source language code (e.g., 'en', 'zh', or 'auto')
    #[arg(short, long, default_value = "auto")]
    source_language: String,

    /// Target language code (e.g., 'en', 'zh', 'fr')
    #[arg(short, long, default_value = "en")]
    target_language: String,

    /// Number of concurrent translation workers
    #[arg(short, long)]
    concurrency: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a PDF into a layout-preserving translated PDF
    Translate(TranslateArgs),

    /// Extract a PDF's text, translate it, and write a .txt file
    ToText(TranslateArgs),

    /// Analyze a PDF: pages, counts, language, projected duration
    Analyze {
        /// Input PDF file
        #[arg(value_name = "INPUT_PDF")]
        input_path: PathBuf,
    },
}

/// pdflingo - layout-preserving PDF translation
///
/// Translates the text of a PDF document into another language while
/// keeping images, positions, and page geometry intact.
#[derive(Parser, Debug)]
#[command(name = "pdflingo")]
#[command(version = "0.3.0")]
#[command(about = "Layout-preserving PDF translation with pluggable AI providers")]
#[command(long_about = "pdflingo translates PDF documents while preserving their visual layout.

EXAMPLES:
    pdflingo translate paper.pdf                       # Free bulk backend, auto -> en
    pdflingo translate -t zh paper.pdf                 # Translate into Chinese
    pdflingo translate -p deepseek -k KEY paper.pdf    # Paid provider
    pdflingo to-text -t en paper.pdf                   # Plain-text output
    pdflingo analyze paper.pdf                         # Pre-flight analysis

SUPPORTED PROVIDERS:
    bulk        - Free bulk translation endpoint (default, no API key)
    deep-seek   - DeepSeek chat API (requires API key)
    zhipu       - Zhipu GLM chat API (requires API key)
    open-router - DeepSeek via OpenRouter (requires API key)
    kimi        - Moonshot Kimi via OpenRouter (requires API key)
    gpt         - GPT via OpenRouter (requires API key)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// CLI Wrapper for log levels to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LevelFilter {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LevelFilter::Error,
            CliLogLevel::Warn => LevelFilter::Warn,
            CliLogLevel::Info => LevelFilter::Info,
            CliLogLevel::Debug => LevelFilter::Debug,
            CliLogLevel::Trace => LevelFilter::Trace,
        }
    }
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S%.3f");
            let mut stderr = std::io::stderr();

            let color = match record.level() {
                Level::Error => "\x1B[1;31m",
                Level::Warn => "\x1B[1;33m",
                Level::Info => "\x1B[1;32m",
                Level::Debug => "\x1B[1;36m",
                Level::Trace => "\x1B[1;35m",
            };
            let _ = writeln!(stderr, "{}{} {}\x1B[0m", color, now, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CommandLineOptions::parse();

    let level = cli.log_level.map(LevelFilter::from).unwrap_or(LevelFilter::Info);
    CustomLogger::init(level)?;

    match cli.command {
        Commands::Analyze { input_path } => run_analyze(&input_path),
        Commands::Translate(args) => run_translate(args, OutputMode::Pdf).await,
        Commands::ToText(args) => run_translate(args, OutputMode::PlainText).await,
    }
}

fn run_analyze(input_path: &Path) -> Result<()> {
    let controller = Controller::new()?;
    let analysis = controller
        .analyze(input_path)
        .with_context(|| format!("Failed to analyze {:?}", input_path))?;

    println!("Pages:            {}", analysis.total_pages);
    println!("Characters:       {}", analysis.char_count);
    println!("Words:            {}", analysis.word_count);
    println!("Dominant language: {} ({})", analysis.detected.name, analysis.detected.code);
    println!("Estimated tokens:  {}", analysis.total_tokens);
    println!("Projected duration: {}", analysis.estimated_time_display());

    Ok(())
}

async fn run_translate(args: TranslateArgs, mode: OutputMode) -> Result<()> {
    if !args.input_path.is_file() {
        return Err(anyhow!("Input file does not exist: {:?}", args.input_path));
    }

    let provider: TranslationProvider = args.provider.into();
    if provider.requires_api_key() && args.api_key.as_deref().unwrap_or("").is_empty() {
        return Err(anyhow!(
            "Provider {} requires an API key (-k or PDFLINGO_API_KEY)",
            provider.display_name()
        ));
    }

    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| args.input_path.parent().unwrap_or(Path::new(".")).to_path_buf());
    let extension = match mode {
        OutputMode::Pdf => "pdf",
        OutputMode::PlainText => "txt",
    };
    let output_path =
        file_utils::FileManager::output_path(&args.input_path, &output_dir, extension);

    let config = Config::default();
    let request = TranslateRequest {
        provider,
        api_key: args.api_key.clone(),
        source_lang: args.source_language.clone(),
        target_lang: args.target_language.clone(),
        task_id: String::new(),
        concurrency: args.concurrency,
        font_candidates: config.translation.font_candidates.clone(),
    };

    let controller = Controller::new()?;
    let registry = TaskRegistry::global();
    let task_id = controller.spawn_translation(
        registry,
        args.input_path.clone(),
        output_path.clone(),
        request,
        mode,
    );

    let outcome = drain_events(registry, &task_id).await;
    registry.remove(&task_id);

    match outcome {
        Some(Event::Completed { output_file }) => {
            println!("Done: {}", output_file);
            Ok(())
        }
        Some(Event::Cancelled) => Err(anyhow!("Translation was cancelled")),
        Some(Event::Error { error }) => Err(anyhow!("Translation failed: {}", error)),
        _ => Err(anyhow!("Translation ended without a terminal event")),
    }
}

/// Drain the task's event stream into the terminal, rendering progress
/// with a progress bar. Returns the terminal event.
async fn drain_events(registry: &TaskRegistry, task_id: &str) -> Option<Event> {
    let mut stream = registry.take_stream(task_id).ok()?;

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    loop {
        match stream.next_event().await {
            Some(Event::Log { message, level }) => {
                let line = match level {
                    EventLogLevel::Error => format!("\x1B[31m{}\x1B[0m", message),
                    EventLogLevel::Warn => format!("\x1B[33m{}\x1B[0m", message),
                    EventLogLevel::Success => format!("\x1B[32m{}\x1B[0m", message),
                    EventLogLevel::Info => message,
                };
                bar.println(line);
            }
            Some(Event::Progress { current, total, message, .. }) => {
                bar.set_length(total as u64);
                bar.set_position(current as u64);
                bar.set_message(message);
            }
            Some(Event::Heartbeat) => {}
            Some(terminal) if terminal.is_terminal() => {
                bar.finish_and_clear();
                return Some(terminal);
            }
            Some(_) => {}
            None => {
                bar.finish_and_clear();
                return None;
            }
        }
    }
}

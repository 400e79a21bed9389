// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::too_many_arguments)]

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use once_cell::sync::OnceCell;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use crate::app_config::{Config, FileFormat};
use crate::engine::Engine;
use crate::file_utils::FileManager;

mod adapters;
mod app_config;
mod cache;
mod classify;
mod console;
mod control;
mod credentials;
mod engine;
mod errors;
mod file_utils;
mod providers;
mod rate_limit;
mod remote;
mod runner;
mod stats;
mod translation;

/// CLI wrapper for FileFormat to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliFileFormat {
    Csv,
    Json,
    Po,
    Srt,
}

impl From<CliFileFormat> for FileFormat {
    fn from(cli_format: CliFileFormat) -> Self {
        match cli_format {
            CliFileFormat::Csv => FileFormat::Csv,
            CliFileFormat::Json => FileFormat::Json,
            CliFileFormat::Po => FileFormat::Po,
            CliFileFormat::Srt => FileFormat::Srt,
        }
    }
}

/// CLI wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate files under a path (default command)
    Translate(TranslateArgs),

    /// Generate shell completions for traduko
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Input file or directory to translate
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Output directory; defaults to a sibling named <input>_translated
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Input format to process
    #[arg(short, long, value_enum)]
    format: Option<CliFileFormat>,

    /// Model name used for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Source language (e.g. 'English')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language (e.g. 'Italian')
    #[arg(short, long)]
    target_language: Option<String>,

    /// API key, repeatable; tried before the keys from the key file
    #[arg(short = 'k', long = "api-key", value_name = "KEY")]
    api_keys: Vec<String>,

    /// File with one API key per line
    #[arg(long)]
    key_file: Option<String>,

    /// Maximum entries per remote batch
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Reuse translations already present in the output tree
    #[arg(short, long)]
    resume: bool,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// Traduko - batch file translation with AI
///
/// Translates the text of structured files (CSV, JSON, gettext PO, SRT)
/// with a remote model while preserving structure, markup and codes.
#[derive(Parser, Debug)]
#[command(name = "traduko")]
#[command(version = "1.0.0")]
#[command(about = "AI-powered batch file translation")]
#[command(long_about = "Traduko translates the translatable text of structured files (CSV, JSON, gettext PO and SRT subtitles) with a remote AI model, leaving identifiers, placeholders and markup untouched.

EXAMPLES:
    traduko strings.csv                          # Translate one file using conf.json
    traduko -f json -t Spanish assets/           # Translate a JSON tree into Spanish
    traduko -r assets/ -o assets_es/             # Resume into an existing output tree
    traduko -k <key> -m gemini-2.0-flash data/   # Explicit key and model
    traduko --log-level debug assets/            # Verbose run
    traduko completions bash > traduko.bash      # Generate bash completions

CONSOLE:
    While a run is active the terminal accepts commands: pause, resume,
    skip file, skip api, add api <key>, exhausted, stats, save cache,
    stop. Type help for the list.

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a
    different config file with --config-path. If the config file doesn't
    exist, a default one is created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input file or directory to translate
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    /// Output directory; defaults to a sibling named <input>_translated
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Input format to process
    #[arg(short, long, value_enum)]
    format: Option<CliFileFormat>,

    /// Model name used for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Source language (e.g. 'English')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language (e.g. 'Italian')
    #[arg(short, long)]
    target_language: Option<String>,

    /// API key, repeatable; tried before the keys from the key file
    #[arg(short = 'k', long = "api-key", value_name = "KEY")]
    api_keys: Vec<String>,

    /// File with one API key per line
    #[arg(long)]
    key_file: Option<String>,

    /// Maximum entries per remote batch
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Reuse translations already present in the output tree
    #[arg(short, long)]
    resume: bool,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// Run log destination, set once after the config is loaded
static LOG_FILE: OnceCell<PathBuf> = OnceCell::new();

struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let now = chrono::Local::now().format("%H:%M:%S.%3f");
        let emoji = Self::get_emoji_for_level(record.level());
        let color = Self::get_color_for_level(record.level());

        let mut stderr = std::io::stderr();
        let _ = writeln!(stderr, "{}{} {} {}\x1B[0m", color, now, emoji, record.args());

        if let Some(path) = LOG_FILE.get() {
            let _ = FileManager::append_to_log_file(
                path,
                &format!("{} {}", record.level(), record.args()),
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default.
    // The level is updated after the config is loaded if needed.
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "traduko", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Translate(args)) => run_translate(args).await,
        None => {
            // Default behavior, top-level args without a subcommand
            let input_path = cli.input_path.ok_or_else(|| {
                anyhow!("INPUT_PATH is required when no subcommand is specified")
            })?;

            let translate_args = TranslateArgs {
                input_path,
                output: cli.output,
                format: cli.format,
                model: cli.model,
                source_language: cli.source_language,
                target_language: cli.target_language,
                api_keys: cli.api_keys,
                key_file: cli.key_file,
                batch_size: cli.batch_size,
                resume: cli.resume,
                config_path: cli.config_path,
                log_level: cli.log_level,
            };
            run_translate(translate_args).await
        }
    }
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        let config_log_level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(config_log_level.to_level_filter());
    }

    // Load or create configuration
    let config_path = &options.config_path;
    let mut config = if FileManager::file_exists(config_path) {
        Config::from_file(config_path)
            .with_context(|| format!("Failed to load config file: {}", config_path))?
    } else {
        warn!(
            "Config file not found at '{}', creating default config.",
            config_path
        );
        let config = Config::default();
        config
            .save(config_path)
            .with_context(|| format!("Failed to write default config to: {}", config_path))?;
        config
    };

    // Override config with CLI options if provided
    if let Some(format) = options.format {
        config.files.format = format.into();
    }
    if let Some(model) = &options.model {
        config.provider.model = model.clone();
    }
    if let Some(source_lang) = &options.source_language {
        config.source_language = source_lang.clone();
    }
    if let Some(target_lang) = &options.target_language {
        config.target_language = target_lang.clone();
    }
    if !options.api_keys.is_empty() {
        // CLI keys go ahead of the configured ones
        let mut keys = options.api_keys.clone();
        keys.extend(config.api.keys.iter().cloned());
        config.api.keys = keys;
    }
    if let Some(key_file) = &options.key_file {
        config.api.key_file = key_file.clone();
    }
    if let Some(batch_size) = options.batch_size {
        config.batch.max_entries = batch_size;
    }
    if options.resume {
        config.files.resume = true;
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    // Validate the configuration after loading and overriding
    config.validate().context("Configuration validation failed")?;

    // If log level was not set via command line, take it from the config
    if options.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }
    if let Some(file) = &config.log_file {
        let _ = LOG_FILE.set(PathBuf::from(file));
    }

    let engine = Arc::new(Engine::new(config)?);

    // First interrupt stops after the current file is saved, a second
    // one aborts the process
    {
        let control = engine.control.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping after the current file is saved (press again to abort now)");
                control.request_stop();
            }
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(130);
            }
        });
    }

    let _console = console::spawn(engine.clone());

    runner::run(engine, &options.input_path, options.output.as_deref()).await
}

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::Path;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Language translated from, embedded verbatim in prompts
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Language translated into
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Project name given to the model as background
    #[serde(default)]
    pub project_name: String,

    /// Extra instruction appended to every prompt
    #[serde(default)]
    pub prompt_context: Option<String>,

    /// Full replacement for the single-entry prompt; must contain `{text}`
    #[serde(default)]
    pub custom_prompt: Option<String>,

    /// Terms copied through untranslated
    #[serde(default)]
    pub no_translate: Vec<String>,

    /// Inline glossary pairs (term, mandated translation)
    #[serde(default)]
    pub glossary_terms: Vec<(String, String)>,

    /// CSV file of glossary pairs, merged into `glossary_terms` at startup
    #[serde(default)]
    pub glossary_file: Option<String>,

    /// Remote model settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Credentials, rate limiting and retry settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Batch sizing settings
    #[serde(default)]
    pub batch: BatchConfig,

    /// Translation cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Per-file context generation settings
    #[serde(default)]
    pub context: ContextConfig,

    /// Input format and adapter settings
    #[serde(default)]
    pub files: FilesConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Optional run log, appended to this file
    #[serde(default)]
    pub log_file: Option<String>,
}

/// Input file format
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    #[default]
    Csv,
    Json,
    Po,
    Srt,
}

impl FileFormat {
    /// File extension matched during discovery
    pub fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Po => "po",
            Self::Srt => "srt",
        }
    }
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl std::str::FromStr for FileFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "po" => Ok(Self::Po),
            "srt" => Ok(Self::Srt),
            _ => Err(anyhow!("Invalid file format: {} (expected csv, json, po or srt)", s)),
        }
    }
}

/// Remote model settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Service base URL; empty uses the provider default
    #[serde(default)]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Sampling temperature, provider default when unset
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            endpoint: String::new(),
            timeout_secs: default_timeout_secs(),
            temperature: None,
        }
    }
}

/// Credentials, rate limiting and retry settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ApiConfig {
    /// Keys given directly; CLI keys land here first
    #[serde(default)]
    pub keys: Vec<String>,

    /// Key file with one key per line, merged after the inline keys
    #[serde(default = "default_key_file")]
    pub key_file: String,

    /// Requests per minute across all credentials; unset disables limiting
    #[serde(default)]
    pub rpm_limit: Option<u32>,

    /// Attempts per credential before rotating or giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First backoff delay in seconds, doubled per attempt
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,

    /// Backoff ceiling in seconds
    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: u64,

    /// Rotate to the next credential instead of waiting out a full window
    #[serde(default = "default_true")]
    pub rotate_on_rate_limit: bool,

    /// Rotate once after a failure streak before giving up on a call
    #[serde(default = "default_true")]
    pub rotate_on_error: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            key_file: default_key_file(),
            rpm_limit: None,
            max_attempts: default_max_attempts(),
            backoff_base_secs: default_backoff_base_secs(),
            backoff_max_secs: default_backoff_max_secs(),
            rotate_on_rate_limit: true,
            rotate_on_error: true,
        }
    }
}

/// Batch sizing settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BatchConfig {
    /// Maximum entries per batch
    #[serde(default = "default_batch_max_entries")]
    pub max_entries: usize,

    /// Estimated token ceiling per batch
    #[serde(default = "default_token_budget")]
    pub token_budget: usize,

    /// Characters per token used for the estimate
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: f32,

    /// Recent (source, translation) pairs carried into following prompts
    #[serde(default = "default_recent_pairs")]
    pub recent_pairs: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_entries: default_batch_max_entries(),
            token_budget: default_token_budget(),
            chars_per_token: default_chars_per_token(),
            recent_pairs: default_recent_pairs(),
        }
    }
}

/// Translation cache settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    /// Persist the cache across runs
    #[serde(default = "default_true")]
    pub persistent: bool,

    /// Cache file path
    #[serde(default = "default_cache_file")]
    pub file: String,

    /// Seconds between opportunistic autosaves
    #[serde(default = "default_autosave_secs")]
    pub autosave_secs: u64,

    /// Fall back to near-identical cached source texts on a miss
    #[serde(default)]
    pub fuzzy_match: bool,

    /// Minimum similarity for a fuzzy hit
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            persistent: true,
            file: default_cache_file(),
            autosave_secs: default_autosave_secs(),
            fuzzy_match: false,
            fuzzy_threshold: default_fuzzy_threshold(),
        }
    }
}

/// Per-file context generation settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ContextConfig {
    /// Ask the model for a short file description before translating
    #[serde(default)]
    pub enabled: bool,

    /// Entries sampled for the description
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,

    /// Sample every candidate instead of the first `sample_size`
    #[serde(default)]
    pub full_sample: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sample_size: default_sample_size(),
            full_sample: false,
        }
    }
}

/// Input format and adapter settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FilesConfig {
    /// Format processed in this run
    #[serde(default)]
    pub format: FileFormat,

    /// Reuse translations found in an existing output tree
    #[serde(default)]
    pub resume: bool,

    /// CSV column holding the source text (0-based)
    #[serde(default)]
    pub csv_translate_column: usize,

    /// CSV column receiving the translation; the same column overwrites in place
    #[serde(default = "default_csv_output_column")]
    pub csv_output_column: usize,

    /// CSV field delimiter
    #[serde(default = "default_csv_delimiter")]
    pub csv_delimiter: char,

    /// Treat the first CSV row as a header and leave it alone
    #[serde(default = "default_true")]
    pub csv_has_header: bool,

    /// JSON keys whose string values are translated
    #[serde(default)]
    pub json_keys: Vec<String>,

    /// Match `json_keys` against the full dotted path instead of the key name
    #[serde(default)]
    pub json_match_full_path: bool,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            format: FileFormat::default(),
            resume: false,
            csv_translate_column: 0,
            csv_output_column: default_csv_output_column(),
            csv_delimiter: default_csv_delimiter(),
            csv_has_header: true,
            json_keys: Vec::new(),
            json_match_full_path: false,
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(anyhow!("Invalid log level: {}", s)),
        }
    }
}

fn default_source_language() -> String {
    "English".to_string()
}

fn default_target_language() -> String {
    "Italian".to_string()
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_key_file() -> String {
    "api_key.txt".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_secs() -> u64 {
    2
}

fn default_backoff_max_secs() -> u64 {
    60
}

fn default_batch_max_entries() -> usize {
    30
}

fn default_token_budget() -> usize {
    3000
}

fn default_chars_per_token() -> f32 {
    3.5
}

fn default_recent_pairs() -> usize {
    5
}

fn default_cache_file() -> String {
    "traduko_cache.json".to_string()
}

fn default_autosave_secs() -> u64 {
    600
}

fn default_fuzzy_threshold() -> f32 {
    0.9
}

fn default_sample_size() -> usize {
    15
}

fn default_csv_output_column() -> usize {
    1
}

fn default_csv_delimiter() -> char {
    ','
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load a configuration file, rejecting unparseable content
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            anyhow!("Failed to read config file {:?}: {}", path.as_ref(), e)
        })?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {:?}: {}", path.as_ref(), e))?;
        Ok(config)
    }

    /// Write this configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)
            .map_err(|e| anyhow!("Failed to write config file {:?}: {}", path.as_ref(), e))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.source_language.trim().is_empty() || self.target_language.trim().is_empty() {
            return Err(anyhow!("Source and target languages must not be empty"));
        }
        if let Some(custom) = &self.custom_prompt {
            if !custom.contains("{text}") {
                return Err(anyhow!("custom_prompt must contain the {{text}} placeholder"));
            }
        }
        if self.files.format == FileFormat::Json && self.files.json_keys.is_empty() {
            return Err(anyhow!(
                "JSON input requires files.json_keys: the keys whose values are translated"
            ));
        }
        if !self.files.csv_delimiter.is_ascii() {
            return Err(anyhow!("CSV delimiter must be a single ASCII character"));
        }
        if self.batch.max_entries == 0 {
            return Err(anyhow!("batch.max_entries must be at least 1"));
        }
        if self.batch.chars_per_token <= 0.0 {
            return Err(anyhow!("batch.chars_per_token must be positive"));
        }
        if self.api.max_attempts == 0 {
            return Err(anyhow!("api.max_attempts must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.cache.fuzzy_threshold) {
            return Err(anyhow!("cache.fuzzy_threshold must be between 0 and 1"));
        }
        if let Some(temperature) = self.provider.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(anyhow!("provider.temperature must be between 0 and 2"));
            }
        }
        Ok(())
    }

    /// Scope element appended to cache keys so translations made with a
    /// different project or instruction never collide. Empty settings
    /// keep the plain three-element key.
    pub fn cache_context(&self) -> Option<String> {
        let project = self.project_name.trim();
        let instruction = self
            .prompt_context
            .as_deref()
            .map(str::trim)
            .unwrap_or_default();
        if project.is_empty() && instruction.is_empty() {
            return None;
        }
        Some(format!("{}::{}", project, instruction))
    }

    /// Fuzzy threshold in the form the cache takes it
    pub fn fuzzy_threshold(&self) -> Option<f32> {
        self.cache.fuzzy_match.then_some(self.cache.fuzzy_threshold)
    }

    /// Baseline configuration used by the test suites: no disk cache,
    /// no context generation, no rate limit.
    pub fn for_tests() -> Self {
        let mut config = Self::default();
        config.cache.persistent = false;
        config.context.enabled = false;
        config.api.rpm_limit = None;
        config
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            project_name: String::new(),
            prompt_context: None,
            custom_prompt: None,
            no_translate: Vec::new(),
            glossary_terms: Vec::new(),
            glossary_file: None,
            provider: ProviderConfig::default(),
            api: ApiConfig::default(),
            batch: BatchConfig::default(),
            cache: CacheConfig::default(),
            context: ContextConfig::default(),
            files: FilesConfig::default(),
            log_level: LogLevel::default(),
            log_file: None,
        }
    }
}

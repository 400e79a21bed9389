/*!
 * Run-scoped wiring.
 *
 * The engine owns every shared service of one translation run: the
 * credential pool, the rate limiter, the cache, the remote caller and
 * the batch translator, all built from one validated configuration.
 * Nothing here is global; the coordinator and the operator console get
 * what they need from an `Arc<Engine>`.
 */

use anyhow::{Context, Result};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::Config;
use crate::cache::TranslationCache;
use crate::control::RunControl;
use crate::credentials::CredentialPool;
use crate::file_utils::FileManager;
use crate::providers::gemini::Gemini;
use crate::providers::Provider;
use crate::rate_limit::RateLimiter;
use crate::remote::{RemoteCaller, RetryPolicy};
use crate::stats::RunStats;
use crate::translation::batch::BatchTranslator;
use crate::translation::prompts::PromptBuilder;

pub struct Engine {
    pub config: Config,
    pub control: Arc<RunControl>,
    pub stats: Arc<RunStats>,
    pub pool: Arc<CredentialPool>,
    pub cache: TranslationCache,
    pub caller: RemoteCaller,
    pub translator: BatchTranslator,
    pub prompts: PromptBuilder,
}

impl Engine {
    /// Build the engine with the provider named by the configuration
    pub fn new(config: Config) -> Result<Self> {
        let provider: Arc<dyn Provider> = Arc::new(Gemini::new(
            config.provider.model.clone(),
            config.provider.endpoint.clone(),
            Duration::from_secs(config.provider.timeout_secs),
        ));
        Self::with_provider(config, provider)
    }

    /// Build the engine around an explicit provider. This is the seam
    /// the integration tests use to run the whole pipeline offline.
    pub fn with_provider(mut config: Config, provider: Arc<dyn Provider>) -> Result<Self> {
        merge_glossary_file(&mut config)?;

        let pool = Arc::new(CredentialPool::from_keys(gather_keys(&config)?)?);
        let control = RunControl::new();
        let stats = Arc::new(RunStats::new());

        // The in-run cache is always active; `persistent` only gates
        // the disk round trip
        let cache = TranslationCache::new(
            true,
            config.fuzzy_threshold(),
            Duration::from_secs(config.cache.autosave_secs),
        );
        if config.cache.persistent {
            cache.load(Path::new(&config.cache.file));
        }

        info!(
            "Provider: {} (model '{}', {} -> {})",
            provider.name(),
            config.provider.model,
            config.source_language,
            config.target_language
        );

        let limiter = Arc::new(RateLimiter::new(config.api.rpm_limit));
        let policy = RetryPolicy {
            max_attempts: config.api.max_attempts,
            backoff_base: Duration::from_secs(config.api.backoff_base_secs),
            backoff_max: Duration::from_secs(config.api.backoff_max_secs),
        };
        let caller = RemoteCaller::new(
            provider,
            Arc::clone(&pool),
            limiter,
            Arc::clone(&control),
            Arc::clone(&stats),
            policy,
            config.api.rotate_on_rate_limit,
            config.api.rotate_on_error,
        );

        let translator = BatchTranslator::new(
            &config,
            caller.clone(),
            cache.clone(),
            Arc::clone(&control),
            Arc::clone(&stats),
        );
        let prompts = PromptBuilder::new(&config);

        Ok(Self {
            config,
            control,
            stats,
            pool,
            cache,
            caller,
            translator,
            prompts,
        })
    }

    pub fn cache_path(&self) -> PathBuf {
        PathBuf::from(&self.config.cache.file)
    }

    /// Persist the cache now, autosave timers aside. A no-op when
    /// persistence is disabled.
    pub fn save_cache(&self) -> Result<()> {
        if !self.config.cache.persistent {
            return Ok(());
        }
        self.cache.save(&self.cache_path())
    }

    /// Current run summary for the console and the end-of-run report
    pub fn render_stats(&self) -> String {
        self.stats.render(&self.cache.stats(), &self.pool.snapshot())
    }
}

/// CLI keys first, then one key per line from the key file. The pool
/// trims, drops empties and keeps first occurrences.
fn gather_keys(config: &Config) -> Result<Vec<String>> {
    let mut keys = config.api.keys.clone();
    let path = Path::new(&config.api.key_file);
    if !config.api.key_file.is_empty() && path.exists() {
        let content = FileManager::read_to_string(path)?;
        keys.extend(content.lines().map(str::to_string));
        info!("Loaded API keys from {}", config.api.key_file);
    } else if keys.is_empty() {
        warn!(
            "Key file '{}' not found and no keys were given in the configuration",
            config.api.key_file
        );
    }
    Ok(keys)
}

/// Append `term,translation` rows from the configured glossary CSV to
/// the inline glossary. A configured but unreadable file is an error;
/// no configured file is fine.
fn merge_glossary_file(config: &mut Config) -> Result<()> {
    let Some(path) = config.glossary_file.clone() else {
        return Ok(());
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(&path)
        .with_context(|| format!("Failed to open glossary file: {}", path))?;

    let mut added = 0;
    for record in reader.records() {
        let record = record.with_context(|| format!("Failed to read glossary row in {}", path))?;
        let (Some(term), Some(translation)) = (record.get(0), record.get(1)) else {
            continue;
        };
        if term.trim().is_empty() {
            continue;
        }
        config
            .glossary_terms
            .push((term.trim().to_string(), translation.trim().to_string()));
        added += 1;
    }
    info!("Loaded {} glossary terms from {}", added, path);
    Ok(())
}

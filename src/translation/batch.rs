/*!
 * Batch translation pipeline.
 *
 * Resolves every entry of a file exactly once: do-not-translate terms
 * and non-prose strings are written back as-is, cache hits are reused,
 * and only what remains goes to the remote model in token-bounded
 * batches using a positional JSON-array protocol. A failed batch falls
 * back to one single-string call per entry so one bad response never
 * loses a whole batch.
 */

use log::{debug, error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

use crate::adapters::TranslationEntry;
use crate::app_config::Config;
use crate::cache::TranslationCache;
use crate::classify::is_translatable;
use crate::control::RunControl;
use crate::errors::RemoteError;
use crate::providers::GenerationRequest;
use crate::remote::RemoteCaller;
use crate::stats::RunStats;
use crate::translation::prompts::PromptBuilder;

/// Markdown code fence some models wrap JSON answers in
static FENCE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^```json\s*|\s*```$").unwrap());

/// Translates the entries of one file against a shared cache and a
/// remote caller. Construction is cheap, one per run is enough.
pub struct BatchTranslator {
    caller: RemoteCaller,
    cache: TranslationCache,
    prompts: PromptBuilder,
    control: Arc<RunControl>,
    stats: Arc<RunStats>,

    /// System instruction shared by every request of the run
    system: String,
    temperature: Option<f32>,

    source_language: String,
    target_language: String,
    /// Static context element of the cache key, None when the run has
    /// neither a project name nor a prompt context
    cache_context: Option<String>,
    no_translate: Vec<String>,

    max_entries: usize,
    token_budget: usize,
    chars_per_token: f32,
    recent_capacity: usize,
}

impl BatchTranslator {
    pub fn new(
        config: &Config,
        caller: RemoteCaller,
        cache: TranslationCache,
        control: Arc<RunControl>,
        stats: Arc<RunStats>,
    ) -> Self {
        let prompts = PromptBuilder::new(config);
        let system = prompts.system_instruction();
        Self {
            caller,
            cache,
            prompts,
            control,
            stats,
            system,
            temperature: config.provider.temperature,
            source_language: config.source_language.clone(),
            target_language: config.target_language.clone(),
            cache_context: config.cache_context(),
            no_translate: config.no_translate.clone(),
            max_entries: config.batch.max_entries.max(1),
            token_budget: config.batch.token_budget,
            chars_per_token: config.batch.chars_per_token,
            recent_capacity: config.batch.recent_pairs,
        }
    }

    /// Resolve every entry of one file. Entries that cannot be resolved
    /// (fallback failure, abort mid-file) are dropped unresolved, so the
    /// document keeps their original text and a later resume run can
    /// pick them up again.
    ///
    /// `on_progress` receives the number of entries settled since the
    /// last invocation, resolved and failed alike.
    pub async fn translate_all<F>(
        &self,
        entries: Vec<TranslationEntry>,
        file_context: Option<&str>,
        on_progress: F,
    ) -> Result<(), RemoteError>
    where
        F: Fn(u64),
    {
        let total = entries.len();
        let mut pending = Vec::new();
        let mut settled = 0u64;

        for entry in entries {
            if self.is_no_translate_term(entry.source()) {
                debug!("Do-not-translate term: '{}'", entry.source());
                entry.resolve_with_original();
                settled += 1;
                continue;
            }
            if !is_translatable(entry.source()) {
                entry.resolve_with_original();
                settled += 1;
                continue;
            }
            if let Some(hit) = self.cache.get(
                entry.source(),
                &self.source_language,
                &self.target_language,
                self.cache_context.as_deref(),
            ) {
                entry.resolve(hit);
                settled += 1;
                continue;
            }
            pending.push(entry);
        }
        if settled > 0 {
            on_progress(settled);
        }
        if pending.is_empty() {
            debug!("All {} entries resolved locally, no remote calls needed", total);
            return Ok(());
        }

        info!(
            "{} of {} entries need the remote model ({} resolved locally)",
            pending.len(),
            total,
            total - pending.len()
        );

        let mut recent: Vec<(String, String)> = Vec::new();
        for batch in self.partition(pending) {
            self.control.checkpoint().await?;

            let sources: Vec<String> =
                batch.iter().map(|entry| entry.source().to_string()).collect();
            let prompt = self.prompts.batch_prompt(&sources, file_context, &recent);

            let response = match self.caller.call(&self.request(prompt)).await {
                Ok(response) => Some(response),
                Err(e) if e.aborts_file() => return Err(e),
                Err(e) => {
                    warn!("Batch of {} failed ({}), falling back to single calls", batch.len(), e);
                    None
                }
            };

            let translations =
                response.and_then(|r| parse_batch_response(&r, batch.len()));
            match translations {
                Some(translations) => {
                    for (entry, translation) in batch.into_iter().zip(translations) {
                        self.settle(entry, translation, &mut recent);
                    }
                    self.stats.add_entries_translated(sources.len() as u64);
                    on_progress(sources.len() as u64);
                }
                None => {
                    self.fallback(batch, file_context, &mut recent, &on_progress)
                        .await?;
                }
            }
        }
        Ok(())
    }

    /// One single-string call per entry of a failed batch. Individual
    /// failures are logged and counted, never fatal for the file.
    async fn fallback<F>(
        &self,
        batch: Vec<TranslationEntry>,
        file_context: Option<&str>,
        recent: &mut Vec<(String, String)>,
        on_progress: &F,
    ) -> Result<(), RemoteError>
    where
        F: Fn(u64),
    {
        for entry in batch {
            self.control.checkpoint().await?;

            let prompt = self
                .prompts
                .single_prompt(entry.source(), file_context, recent);
            match self.caller.call(&self.request(prompt)).await {
                Ok(response) => {
                    self.settle(entry, response.trim().to_string(), recent);
                    self.stats.add_entries_translated(1);
                }
                Err(e) if e.aborts_file() => return Err(e),
                Err(e) => {
                    error!("Could not translate '{}': {}", entry.source(), e);
                    self.stats.add_entry_failed();
                }
            }
            on_progress(1);
        }
        Ok(())
    }

    /// Cache the finished translation, write it through the sink and
    /// feed the consistency window.
    fn settle(
        &self,
        entry: TranslationEntry,
        translation: String,
        recent: &mut Vec<(String, String)>,
    ) {
        self.cache.store(
            entry.source(),
            &self.source_language,
            &self.target_language,
            self.cache_context.as_deref(),
            &translation,
        );
        if self.recent_capacity > 0 {
            recent.push((entry.source().to_string(), translation.clone()));
            if recent.len() > self.recent_capacity {
                recent.remove(0);
            }
        }
        entry.resolve(translation);
    }

    /// Split pending entries into batches. A batch closes before adding
    /// the entry that would exceed the entry or token limit, so an
    /// oversized single entry travels alone.
    fn partition(&self, pending: Vec<TranslationEntry>) -> Vec<Vec<TranslationEntry>> {
        let mut batches = Vec::new();
        let mut current: Vec<TranslationEntry> = Vec::new();
        let mut current_tokens = 0usize;

        for entry in pending {
            let tokens = self.estimate_tokens(entry.source());
            if !current.is_empty()
                && (current.len() >= self.max_entries
                    || current_tokens + tokens > self.token_budget)
            {
                batches.push(std::mem::take(&mut current));
                current_tokens = 0;
            }
            current_tokens += tokens;
            current.push(entry);
        }
        if !current.is_empty() {
            batches.push(current);
        }
        batches
    }

    fn estimate_tokens(&self, text: &str) -> usize {
        (text.chars().count() as f32 / self.chars_per_token).ceil() as usize
    }

    fn is_no_translate_term(&self, text: &str) -> bool {
        let trimmed = text.trim();
        self.no_translate.iter().any(|term| term == trimmed)
    }

    fn request(&self, prompt: String) -> GenerationRequest {
        let mut request = GenerationRequest::new(prompt).system(self.system.clone());
        if let Some(temperature) = self.temperature {
            request = request.temperature(temperature);
        }
        request
    }
}

/// Strip Markdown fences and parse the positional answer array. Answers
/// with the wrong length are rejected, order is the only correlation
/// the protocol has.
fn parse_batch_response(response: &str, expected: usize) -> Option<Vec<String>> {
    let cleaned = FENCE_REGEX.replace_all(response.trim(), "");
    let translations: Vec<String> = serde_json::from_str(cleaned.trim()).ok()?;
    if translations.len() == expected {
        Some(translations)
    } else {
        warn!(
            "Batch answer length mismatch: expected {}, got {}",
            expected,
            translations.len()
        );
        None
    }
}

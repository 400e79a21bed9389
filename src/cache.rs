/*!
 * Persistent translation cache.
 *
 * Stores finished translations keyed by source text, language pair and
 * the optional static prompt context. On disk the cache is one flat
 * JSON object whose keys are the JSON-encoded arrays
 * `["text","src","tgt"]` or `["text","src","tgt","context"]`; this
 * encoding is the stable interchange format and other tools may read
 * it. Raw string keys (prefixed `context::`) carry per-file generated
 * context descriptions so they survive across runs.
 *
 * Lookup is exact first; when a fuzzy threshold is configured, a miss
 * scans entries sharing the same language pair and context and accepts
 * the most similar source text at or above the threshold.
 */

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};

/// Cache key combining source text, language pair and optional static
/// prompt context. The encoded form is the on-disk key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Source text to translate
    pub source_text: String,

    /// Source language
    pub source_language: String,

    /// Target language
    pub target_language: String,

    /// Static prompt context, when one participates in the key
    pub context: Option<String>,
}

impl CacheKey {
    /// Create a new cache key
    pub fn new(
        source_text: &str,
        source_language: &str,
        target_language: &str,
        context: Option<&str>,
    ) -> Self {
        Self {
            source_text: source_text.to_string(),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            context: context.map(|c| c.to_string()),
        }
    }

    /// Stable on-disk encoding: a JSON array of 3 or 4 strings
    pub fn encode(&self) -> String {
        let mut parts = vec![
            self.source_text.as_str(),
            self.source_language.as_str(),
            self.target_language.as_str(),
        ];
        if let Some(context) = &self.context {
            parts.push(context.as_str());
        }
        // A string array cannot fail to serialize
        serde_json::to_string(&parts).unwrap_or_default()
    }

    /// Parse an on-disk key back into its parts. Returns None for keys
    /// that are not 3/4-element string arrays (raw keys land here).
    pub fn decode(raw: &str) -> Option<Self> {
        let parts: Vec<String> = serde_json::from_str(raw).ok()?;
        match parts.len() {
            3 | 4 => {
                let mut parts = parts.into_iter();
                Some(Self {
                    source_text: parts.next()?,
                    source_language: parts.next()?,
                    target_language: parts.next()?,
                    context: parts.next(),
                })
            }
            _ => None,
        }
    }

    /// Same language pair and static context, source text aside
    fn same_scope(&self, other: &CacheKey) -> bool {
        self.source_language == other.source_language
            && self.target_language == other.target_language
            && self.context == other.context
    }
}

/// Counters exposed to the stats display
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub exact_hits: usize,
    pub fuzzy_hits: usize,
    pub misses: usize,
}

impl CacheStats {
    pub fn hits(&self) -> usize {
        self.exact_hits + self.fuzzy_hits
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits() + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits() as f64 / total as f64
        }
    }
}

/// Translation cache shared by every worker of a run
pub struct TranslationCache {
    /// Decoded translation entries
    entries: Arc<RwLock<HashMap<CacheKey, String>>>,

    /// Raw-key entries (file contexts, foreign keys found on disk)
    extra: Arc<RwLock<HashMap<String, String>>>,

    /// Hit/miss counters
    stats: Arc<RwLock<CacheStats>>,

    /// Instant of the last successful save, drives autosave
    last_save: Arc<Mutex<Instant>>,

    /// Whether lookups and stores are active
    enabled: bool,

    /// Similarity floor for the fuzzy pass, None disables it
    fuzzy_threshold: Option<f32>,

    /// Minimum time between periodic saves
    autosave_interval: Duration,
}

impl TranslationCache {
    pub fn new(enabled: bool, fuzzy_threshold: Option<f32>, autosave_interval: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            extra: Arc::new(RwLock::new(HashMap::new())),
            stats: Arc::new(RwLock::new(CacheStats::default())),
            last_save: Arc::new(Mutex::new(Instant::now())),
            enabled,
            fuzzy_threshold: fuzzy_threshold.map(|t| t.clamp(0.0, 1.0)),
            autosave_interval,
        }
    }

    /// Look up a translation. Exact match on the encoded key first,
    /// then the optional fuzzy pass over the same language pair.
    pub fn get(
        &self,
        source_text: &str,
        source_language: &str,
        target_language: &str,
        context: Option<&str>,
    ) -> Option<String> {
        if !self.enabled {
            return None;
        }

        let key = CacheKey::new(source_text, source_language, target_language, context);
        {
            let entries = self.entries.read();
            if let Some(translation) = entries.get(&key) {
                self.stats.write().exact_hits += 1;
                debug!(
                    "Cache hit for '{}' ({} -> {})",
                    truncate_text(source_text, 30),
                    source_language,
                    target_language
                );
                return Some(translation.clone());
            }
        }

        if let Some(threshold) = self.fuzzy_threshold {
            if let Some(translation) = self.fuzzy_get(&key, threshold) {
                self.stats.write().fuzzy_hits += 1;
                return Some(translation);
            }
        }

        self.stats.write().misses += 1;
        debug!(
            "Cache miss for '{}' ({} -> {})",
            truncate_text(source_text, 30),
            source_language,
            target_language
        );
        None
    }

    /// O(n) scan over entries in the same scope, keeping the most
    /// similar source text at or above the threshold. Acceptable for
    /// the cache sizes of this domain, but a known scalability ceiling.
    fn fuzzy_get(&self, key: &CacheKey, threshold: f32) -> Option<String> {
        let entries = self.entries.read();
        let mut best: Option<(f32, &String)> = None;
        for (candidate, translation) in entries.iter() {
            if !candidate.same_scope(key) {
                continue;
            }
            let score = similarity(&key.source_text, &candidate.source_text);
            if score >= threshold && best.map_or(true, |(b, _)| score > b) {
                best = Some((score, translation));
            }
        }
        best.map(|(score, translation)| {
            debug!(
                "Fuzzy cache hit ({:.0}%) for '{}'",
                score * 100.0,
                truncate_text(&key.source_text, 30)
            );
            translation.clone()
        })
    }

    /// Store a finished translation
    pub fn store(
        &self,
        source_text: &str,
        source_language: &str,
        target_language: &str,
        context: Option<&str>,
        translation: &str,
    ) {
        if !self.enabled {
            return;
        }
        let key = CacheKey::new(source_text, source_language, target_language, context);
        self.entries.write().insert(key, translation.to_string());
        debug!(
            "Cached translation for '{}' ({} -> {})",
            truncate_text(source_text, 30),
            source_language,
            target_language
        );
    }

    /// Fetch a raw-key entry (file context descriptions)
    pub fn get_raw(&self, key: &str) -> Option<String> {
        if !self.enabled {
            return None;
        }
        self.extra.read().get(key).cloned()
    }

    /// Store a raw-key entry
    pub fn store_raw(&self, key: &str, value: &str) {
        if !self.enabled {
            return;
        }
        self.extra.write().insert(key.to_string(), value.to_string());
    }

    /// Load the cache file. Missing or corrupt files degrade to an
    /// empty cache; this can log but never fails the run.
    pub fn load(&self, path: &Path) -> usize {
        if !self.enabled {
            return 0;
        }
        *self.last_save.lock() = Instant::now();

        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("Cache file {} not found, starting empty", path.display());
                return 0;
            }
            Err(e) => {
                warn!("Could not read cache file {}: {}", path.display(), e);
                return 0;
            }
        };

        let parsed: HashMap<String, String> = match serde_json::from_str(&raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(
                    "Cache file {} is corrupt ({}), starting empty",
                    path.display(),
                    e
                );
                return 0;
            }
        };

        let mut entries = self.entries.write();
        let mut extra = self.extra.write();
        for (raw_key, value) in parsed {
            match CacheKey::decode(&raw_key) {
                Some(key) => {
                    entries.insert(key, value);
                }
                None => {
                    extra.insert(raw_key, value);
                }
            }
        }
        let count = entries.len() + extra.len();
        info!("Loaded {} cache entries from {}", count, path.display());
        count
    }

    /// Write the whole cache to disk as pretty-printed JSON. An empty
    /// cache skips the write.
    pub fn save(&self, path: &Path) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let merged = self.merged_map();
        if merged.is_empty() {
            debug!("Cache save skipped, nothing to persist");
            return Ok(());
        }

        let serialized = serde_json::to_string_pretty(&merged)
            .context("serializing translation cache")?;
        std::fs::write(path, serialized)
            .with_context(|| format!("writing cache file {}", path.display()))?;
        *self.last_save.lock() = Instant::now();
        info!("Saved {} cache entries to {}", merged.len(), path.display());
        Ok(())
    }

    /// Save when the autosave interval elapsed since the last save.
    /// Returns whether a save happened.
    pub fn maybe_autosave(&self, path: &Path) -> Result<bool> {
        if !self.enabled {
            return Ok(false);
        }
        let due = self.last_save.lock().elapsed() >= self.autosave_interval;
        if !due {
            return Ok(false);
        }
        debug!("Periodic cache save triggered");
        self.save(path)?;
        Ok(true)
    }

    fn merged_map(&self) -> HashMap<String, String> {
        let entries = self.entries.read();
        let extra = self.extra.read();
        let mut merged = HashMap::with_capacity(entries.len() + extra.len());
        for (key, value) in entries.iter() {
            merged.insert(key.encode(), value.clone());
        }
        for (key, value) in extra.iter() {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        *self.stats.read()
    }

    /// Clear the cache
    pub fn clear(&self) {
        self.entries.write().clear();
        self.extra.write().clear();
        *self.stats.write() = CacheStats::default();
        debug!("Translation cache cleared");
    }

    /// Number of entries, raw keys included
    pub fn len(&self) -> usize {
        self.entries.read().len() + self.extra.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Clone for TranslationCache {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            extra: self.extra.clone(),
            stats: self.stats.clone(),
            last_save: self.last_save.clone(),
            enabled: self.enabled,
            fuzzy_threshold: self.fuzzy_threshold,
            autosave_interval: self.autosave_interval,
        }
    }
}

/// Similarity between two strings in 0.0..=1.0, case-insensitive
/// normalized Levenshtein distance.
pub fn similarity(a: &str, b: &str) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let a_lower = a.to_lowercase();
    let b_lower = b.to_lowercase();

    let distance = levenshtein_distance(&a_lower, &b_lower);
    let max_len = a_lower.chars().count().max(b_lower.chars().count());

    1.0 - (distance as f32 / max_len as f32)
}

/// Levenshtein distance with the two-row optimization
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let a_len = a_chars.len();
    let b_len = b_chars.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev_row: Vec<usize> = (0..=b_len).collect();
    let mut curr_row: Vec<usize> = vec![0; b_len + 1];

    for i in 1..=a_len {
        curr_row[0] = i;

        for j in 1..=b_len {
            let cost = if a_chars[i - 1] == b_chars[j - 1] { 0 } else { 1 };

            curr_row[j] = (prev_row[j] + 1)
                .min(curr_row[j - 1] + 1)
                .min(prev_row[j - 1] + cost);
        }

        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b_len]
}

/// Truncate text to a maximum length with ellipsis
fn truncate_text(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_length).collect();
        format!("{}...", truncated)
    }
}

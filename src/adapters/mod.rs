/*!
 * File adapters: format-specific extraction of translatable entries and
 * re-serialization of the (possibly partially) translated document.
 *
 * Every adapter yields `TranslationEntry` values whose sink writes the
 * final text back into the adapter's in-memory document. The document
 * always serializes, translated or not: entries never resolved keep
 * their original text, so an aborted run still produces a usable file
 * and a resumed run can pick up where it stopped.
 */

pub mod csv;
pub mod json;
pub mod po;
pub mod srt;

use anyhow::Result;
use std::path::Path;

use crate::app_config::{Config, FileFormat};
use crate::classify::is_translatable;

/// Receives the final translation of one entry and writes it into the
/// owning document. Consumed on delivery; an entry is resolved once.
pub trait Sink: Send {
    fn accept(self: Box<Self>, translated: String);
}

/// One translatable unit extracted from a document
pub struct TranslationEntry {
    source: String,
    sink: Box<dyn Sink>,
}

impl TranslationEntry {
    pub fn new(source: impl Into<String>, sink: Box<dyn Sink>) -> Self {
        Self {
            source: source.into(),
            sink,
        }
    }

    /// Source text awaiting translation
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Deliver the final text for this entry
    pub fn resolve(self, translated: String) {
        self.sink.accept(translated);
    }

    /// Write the original text back unchanged
    pub fn resolve_with_original(self) {
        let original = self.source.clone();
        self.sink.accept(original);
    }
}

impl std::fmt::Debug for TranslationEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationEntry")
            .field("source", &self.source)
            .finish()
    }
}

/// A loaded document of one supported format
pub trait FileAdapter: Send + Sync {
    /// Entries still pending translation, in document order
    fn entries(&self) -> Vec<TranslationEntry>;

    /// Translatable source strings for context generation; `None` samples
    /// every candidate
    fn sample(&self, limit: Option<usize>) -> Vec<String>;

    /// Copy finished translations over from an existing output file and
    /// drop those entries from the pending set. Returns how many entries
    /// were satisfied.
    fn apply_resume(&mut self, existing: &Path) -> Result<usize>;

    /// Serialize the document, regardless of how many entries resolved
    fn save(&self, path: &Path) -> Result<()>;

    /// Candidate entries in the document, resolved or not
    fn candidate_count(&self) -> usize;
}

/// Load the adapter matching the configured format
pub fn load(path: &Path, config: &Config) -> Result<Box<dyn FileAdapter>> {
    let adapter: Box<dyn FileAdapter> = match config.files.format {
        FileFormat::Csv => Box::new(csv::CsvAdapter::load(path, &config.files)?),
        FileFormat::Json => Box::new(json::JsonAdapter::load(path, &config.files)?),
        FileFormat::Po => Box::new(po::PoAdapter::load(path)?),
        FileFormat::Srt => Box::new(srt::SrtAdapter::load(path)?),
    };
    Ok(adapter)
}

/// Shared sampling filter: translatable texts only, up to the limit
pub(crate) fn sample_texts<'a, I>(texts: I, limit: Option<usize>) -> Vec<String>
where
    I: Iterator<Item = &'a str>,
{
    let translatable = texts.filter(|t| is_translatable(t)).map(str::to_string);
    match limit {
        Some(limit) => translatable.take(limit).collect(),
        None => translatable.collect(),
    }
}

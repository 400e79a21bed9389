/*!
 * JSON adapter: walks the document tree and translates string values
 * whose key (or full dotted path, in full-path mode) is in the
 * configured key set. Everything else round-trips untouched.
 */

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use crate::adapters::{sample_texts, FileAdapter, Sink, TranslationEntry};
use crate::app_config::FilesConfig;
use crate::file_utils::FileManager;

/// One step into the document, either an object key or an array index
#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Key(String),
    Index(usize),
}

#[derive(Debug, Clone)]
struct Candidate {
    path: Vec<Segment>,
    source: String,
}

pub struct JsonAdapter {
    doc: Arc<Mutex<Value>>,
    candidates: Vec<Candidate>,
    done: Vec<bool>,
}

/// Replaces the string value at a fixed path
struct ValueSink {
    doc: Arc<Mutex<Value>>,
    path: Vec<Segment>,
}

impl Sink for ValueSink {
    fn accept(self: Box<Self>, translated: String) {
        let mut doc = self.doc.lock();
        if let Some(slot) = navigate(&mut doc, &self.path) {
            *slot = Value::String(translated);
        }
    }
}

impl JsonAdapter {
    pub fn load(path: &Path, options: &FilesConfig) -> Result<Self> {
        let content = FileManager::read_to_string(path)?;
        let doc: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON file: {:?}", path))?;

        let keys: HashSet<&str> = options.json_keys.iter().map(String::as_str).collect();
        let mut candidates = Vec::new();
        collect(
            &doc,
            &mut Vec::new(),
            &keys,
            options.json_match_full_path,
            &mut candidates,
        );

        let len = candidates.len();
        Ok(Self {
            doc: Arc::new(Mutex::new(doc)),
            candidates,
            done: vec![false; len],
        })
    }
}

/// Renders a path as "a.b[2].c", the shape the full-path mode matches on
fn display_path(path: &[Segment]) -> String {
    let mut rendered = String::new();
    for segment in path {
        match segment {
            Segment::Key(key) => {
                if !rendered.is_empty() {
                    rendered.push('.');
                }
                rendered.push_str(key);
            }
            Segment::Index(index) => {
                rendered.push('[');
                rendered.push_str(&index.to_string());
                rendered.push(']');
            }
        }
    }
    rendered
}

fn collect(
    value: &Value,
    path: &mut Vec<Segment>,
    keys: &HashSet<&str>,
    match_full_path: bool,
    out: &mut Vec<Candidate>,
) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                path.push(Segment::Key(key.clone()));
                if let Value::String(text) = child {
                    // Full-path mode replaces key matching, it does not extend it
                    let matched = if match_full_path {
                        keys.contains(display_path(path).as_str())
                    } else {
                        keys.contains(key.as_str())
                    };
                    if matched {
                        out.push(Candidate {
                            path: path.clone(),
                            source: text.clone(),
                        });
                    }
                } else {
                    collect(child, path, keys, match_full_path, out);
                }
                path.pop();
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                path.push(Segment::Index(index));
                collect(child, path, keys, match_full_path, out);
                path.pop();
            }
        }
        _ => {}
    }
}

fn navigate<'a>(doc: &'a mut Value, path: &[Segment]) -> Option<&'a mut Value> {
    let mut current = doc;
    for segment in path {
        current = match segment {
            Segment::Key(key) => current.get_mut(key.as_str())?,
            Segment::Index(index) => current.get_mut(*index)?,
        };
    }
    Some(current)
}

fn lookup<'a>(doc: &'a Value, path: &[Segment]) -> Option<&'a Value> {
    let mut current = doc;
    for segment in path {
        current = match segment {
            Segment::Key(key) => current.get(key.as_str())?,
            Segment::Index(index) => current.get(*index)?,
        };
    }
    Some(current)
}

impl FileAdapter for JsonAdapter {
    fn entries(&self) -> Vec<TranslationEntry> {
        self.candidates
            .iter()
            .zip(self.done.iter())
            .filter(|(_, done)| !**done)
            .map(|(candidate, _)| {
                let sink = ValueSink {
                    doc: Arc::clone(&self.doc),
                    path: candidate.path.clone(),
                };
                TranslationEntry::new(candidate.source.clone(), Box::new(sink))
            })
            .collect()
    }

    fn sample(&self, limit: Option<usize>) -> Vec<String> {
        sample_texts(self.candidates.iter().map(|c| c.source.as_str()), limit)
    }

    fn apply_resume(&mut self, existing: &Path) -> Result<usize> {
        let content = FileManager::read_to_string(existing)?;
        let previous: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse existing output: {:?}", existing))?;

        let mut doc = self.doc.lock();
        let mut satisfied = 0;
        for (index, candidate) in self.candidates.iter().enumerate() {
            let Some(Value::String(translated)) = lookup(&previous, &candidate.path) else {
                continue;
            };
            if translated.trim().is_empty() || *translated == candidate.source {
                continue;
            }
            if let Some(slot) = navigate(&mut doc, &candidate.path) {
                *slot = Value::String(translated.clone());
                self.done[index] = true;
                satisfied += 1;
            }
        }
        Ok(satisfied)
    }

    fn save(&self, path: &Path) -> Result<()> {
        let doc = self.doc.lock();
        let content = serde_json::to_string_pretty(&*doc)
            .with_context(|| format!("Failed to serialize JSON for {:?}", path))?;
        FileManager::write_to_file(path, &content)
    }

    fn candidate_count(&self) -> usize {
        self.candidates.len()
    }
}

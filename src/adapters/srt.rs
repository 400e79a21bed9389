/*!
 * SRT adapter: parses subtitle cues, translates cue text and leaves
 * sequence numbers and timing lines exactly as they were read.
 */

use anyhow::{anyhow, Result};
use log::warn;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::adapters::{sample_texts, FileAdapter, Sink, TranslationEntry};
use crate::file_utils::FileManager;

/// Accepts both `,` and `.` millisecond separators and short hour fields
static TIMING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{1,2}:\d{2}:\d{2}[,.]\d{1,3}\s*-->\s*\d{1,2}:\d{2}:\d{2}[,.]\d{1,3}")
        .unwrap()
});

/// One subtitle cue. The timing line is kept verbatim so the output
/// preserves whatever separator style the input used.
#[derive(Debug, Clone, PartialEq)]
pub struct SrtCue {
    pub seq: usize,
    pub timing: String,
    pub text: String,
}

impl fmt::Display for SrtCue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}\n{}\n", self.seq, self.timing, self.text)
    }
}

pub struct SrtAdapter {
    cues: Arc<Mutex<Vec<SrtCue>>>,
    done: Vec<bool>,
}

struct CueSink {
    cues: Arc<Mutex<Vec<SrtCue>>>,
    pos: usize,
}

impl Sink for CueSink {
    fn accept(self: Box<Self>, translated: String) {
        let mut cues = self.cues.lock();
        if let Some(cue) = cues.get_mut(self.pos) {
            cue.text = translated;
        }
    }
}

pub fn parse_srt_string(content: &str) -> Result<Vec<SrtCue>> {
    let mut cues = Vec::new();
    let mut current_seq: Option<usize> = None;
    let mut current_timing: Option<String> = None;
    let mut current_text = String::new();
    let mut line_count = 0;

    for line in content.lines() {
        line_count += 1;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            if let (Some(seq), Some(timing)) = (current_seq, current_timing.take()) {
                if current_text.is_empty() {
                    warn!("Skipping empty subtitle cue {}", seq);
                } else {
                    cues.push(SrtCue {
                        seq,
                        timing,
                        text: std::mem::take(&mut current_text),
                    });
                }
                current_seq = None;
            }
            continue;
        }

        // Sequence number only opens a new cue
        if current_seq.is_none() && current_text.is_empty() {
            if let Ok(num) = trimmed.parse::<usize>() {
                current_seq = Some(num);
                continue;
            }
        }

        if current_seq.is_some() && current_timing.is_none() && TIMING_REGEX.is_match(trimmed) {
            current_timing = Some(trimmed.to_string());
            continue;
        }

        if current_seq.is_some() && current_timing.is_some() {
            if !current_text.is_empty() {
                current_text.push('\n');
            }
            current_text.push_str(trimmed);
        } else {
            warn!(
                "Unexpected text at line {} before sequence number or timing: {}",
                line_count, trimmed
            );
        }
    }

    if let (Some(seq), Some(timing)) = (current_seq, current_timing) {
        if !current_text.is_empty() {
            cues.push(SrtCue {
                seq,
                timing,
                text: current_text,
            });
        }
    }

    if cues.is_empty() {
        return Err(anyhow!("No valid subtitle cues were found in the SRT content"));
    }
    Ok(cues)
}

fn render(cues: &[SrtCue]) -> String {
    cues.iter()
        .map(|cue| cue.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

impl SrtAdapter {
    pub fn load(path: &Path) -> Result<Self> {
        let content = FileManager::read_to_string(path)?;
        let cues = parse_srt_string(&content)?;
        let len = cues.len();
        Ok(Self {
            cues: Arc::new(Mutex::new(cues)),
            done: vec![false; len],
        })
    }
}

impl FileAdapter for SrtAdapter {
    fn entries(&self) -> Vec<TranslationEntry> {
        let cues = self.cues.lock();
        cues.iter()
            .enumerate()
            .filter(|(index, _)| !self.done[*index])
            .map(|(index, cue)| {
                let sink = CueSink {
                    cues: Arc::clone(&self.cues),
                    pos: index,
                };
                TranslationEntry::new(cue.text.clone(), Box::new(sink))
            })
            .collect()
    }

    fn sample(&self, limit: Option<usize>) -> Vec<String> {
        let cues = self.cues.lock();
        sample_texts(cues.iter().map(|cue| cue.text.as_str()), limit)
    }

    fn apply_resume(&mut self, existing: &Path) -> Result<usize> {
        let content = FileManager::read_to_string(existing)?;
        let previous = parse_srt_string(&content)?;
        let by_seq: HashMap<usize, &str> = previous
            .iter()
            .map(|cue| (cue.seq, cue.text.as_str()))
            .collect();

        let mut cues = self.cues.lock();
        let mut satisfied = 0;
        for (index, cue) in cues.iter_mut().enumerate() {
            let Some(translated) = by_seq.get(&cue.seq) else {
                continue;
            };
            if !translated.trim().is_empty() && *translated != cue.text {
                cue.text = translated.to_string();
                self.done[index] = true;
                satisfied += 1;
            }
        }
        Ok(satisfied)
    }

    fn save(&self, path: &Path) -> Result<()> {
        let cues = self.cues.lock();
        FileManager::write_to_file(path, &render(&cues))
    }

    fn candidate_count(&self) -> usize {
        let cues = self.cues.lock();
        cues.len()
    }
}

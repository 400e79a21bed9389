/*!
 * PO (gettext) adapter. A line-based parser keeps every source line:
 * comments, plural blocks and unknown keywords pass through verbatim,
 * while `msgid` / `msgstr` / `msgctxt` are re-serialized from parsed
 * values so translations can be written into them.
 */

use anyhow::Result;
use log::warn;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

use crate::adapters::{sample_texts, FileAdapter, Sink, TranslationEntry};
use crate::classify::is_translatable_context;
use crate::file_utils::FileManager;

/// One gettext unit, header included
#[derive(Debug, Clone, Default, PartialEq)]
struct PoUnit {
    comments: Vec<String>,
    msgctxt: Option<String>,
    msgid: String,
    msgstr: String,
    has_msgid: bool,
    has_msgstr: bool,
    /// Verbatim lines this parser does not model (plural forms mostly)
    extra: Vec<String>,
}

impl PoUnit {
    fn is_empty(&self) -> bool {
        !self.has_msgid
            && self.msgctxt.is_none()
            && self.comments.is_empty()
            && self.extra.is_empty()
    }
}

/// Which slot of the unit a translation lands in
#[derive(Debug, Clone, Copy, PartialEq)]
enum PoSlot {
    Message,
    Context,
}

#[derive(Debug, Clone)]
struct PoCandidate {
    unit: usize,
    slot: PoSlot,
    source: String,
}

pub struct PoAdapter {
    units: Arc<Mutex<Vec<PoUnit>>>,
    candidates: Vec<PoCandidate>,
    done: Vec<bool>,
}

struct PoSink {
    units: Arc<Mutex<Vec<PoUnit>>>,
    unit: usize,
    slot: PoSlot,
}

impl Sink for PoSink {
    fn accept(self: Box<Self>, translated: String) {
        let mut units = self.units.lock();
        if let Some(unit) = units.get_mut(self.unit) {
            match self.slot {
                PoSlot::Message => unit.msgstr = translated,
                PoSlot::Context => unit.msgctxt = Some(translated),
            }
        }
    }
}

/// Parser position inside the current unit
#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    None,
    Ctxt,
    Id,
    Str,
    Extra,
}

fn flush(units: &mut Vec<PoUnit>, current: &mut PoUnit, field: &mut Field) {
    if !current.is_empty() {
        units.push(std::mem::take(current));
    }
    *field = Field::None;
}

fn parse_po(content: &str) -> Vec<PoUnit> {
    let mut units = Vec::new();
    let mut current = PoUnit::default();
    let mut field = Field::None;

    for line in content.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            flush(&mut units, &mut current, &mut field);
            continue;
        }
        if trimmed.starts_with('#') {
            // A comment after an entry body opens the next unit
            if current.has_msgid {
                flush(&mut units, &mut current, &mut field);
            }
            current.comments.push(line.to_string());
            continue;
        }
        // Plural machinery stays verbatim, continuations included
        if trimmed.starts_with("msgid_plural") || trimmed.starts_with("msgstr[") {
            current.extra.push(line.to_string());
            field = Field::Extra;
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("msgctxt") {
            if current.has_msgid || current.msgctxt.is_some() {
                flush(&mut units, &mut current, &mut field);
            }
            current.msgctxt = Some(po_unquote(rest).unwrap_or_default());
            field = Field::Ctxt;
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("msgid") {
            if current.has_msgid {
                flush(&mut units, &mut current, &mut field);
            }
            current.msgid = po_unquote(rest).unwrap_or_default();
            current.has_msgid = true;
            field = Field::Id;
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("msgstr") {
            current.msgstr = po_unquote(rest).unwrap_or_default();
            current.has_msgstr = true;
            field = Field::Str;
            continue;
        }
        if trimmed.starts_with('"') {
            match field {
                Field::Ctxt => {
                    if let (Some(ctxt), Some(cont)) = (current.msgctxt.as_mut(), po_unquote(trimmed))
                    {
                        ctxt.push_str(&cont);
                    }
                }
                Field::Id => {
                    if let Some(cont) = po_unquote(trimmed) {
                        current.msgid.push_str(&cont);
                    }
                }
                Field::Str => {
                    if let Some(cont) = po_unquote(trimmed) {
                        current.msgstr.push_str(&cont);
                    }
                }
                Field::Extra | Field::None => current.extra.push(line.to_string()),
            }
            continue;
        }
        // Unknown keyword, keep the line as-is
        current.extra.push(line.to_string());
        field = Field::Extra;
    }
    flush(&mut units, &mut current, &mut field);
    units
}

fn po_unquote(segment: &str) -> Option<String> {
    let start = segment.find('"')?;
    let end = segment.rfind('"')?;
    if end <= start {
        return None;
    }
    let inner = &segment[start + 1..end];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    Some(out)
}

fn po_quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

/// Writes `keyword "value"`, splitting multiline values in the usual
/// gettext shape (`msgid ""` followed by one quoted segment per line)
fn push_field(out: &mut String, keyword: &str, value: &str) {
    if value.contains('\n') {
        out.push_str(keyword);
        out.push_str(" \"\"\n");
        for segment in value.split_inclusive('\n') {
            out.push('"');
            out.push_str(&po_quote(segment));
            out.push_str("\"\n");
        }
    } else {
        out.push_str(keyword);
        out.push_str(" \"");
        out.push_str(&po_quote(value));
        out.push_str("\"\n");
    }
}

fn render(units: &[PoUnit]) -> String {
    let mut out = String::new();
    for (index, unit) in units.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        for comment in &unit.comments {
            out.push_str(comment);
            out.push('\n');
        }
        if let Some(ctxt) = &unit.msgctxt {
            push_field(&mut out, "msgctxt", ctxt);
        }
        if unit.has_msgid {
            push_field(&mut out, "msgid", &unit.msgid);
        }
        if unit.has_msgstr {
            push_field(&mut out, "msgstr", &unit.msgstr);
        }
        for line in &unit.extra {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

impl PoAdapter {
    pub fn load(path: &Path) -> Result<Self> {
        let content = FileManager::read_to_string(path)?;
        let units = parse_po(&content);

        let mut candidates = Vec::new();
        for (index, unit) in units.iter().enumerate() {
            // The header (empty msgid) is metadata, skip it
            if !unit.has_msgid || unit.msgid.is_empty() {
                continue;
            }
            if let Some(ctxt) = &unit.msgctxt {
                if is_translatable_context(ctxt) {
                    candidates.push(PoCandidate {
                        unit: index,
                        slot: PoSlot::Context,
                        source: ctxt.clone(),
                    });
                }
            }
            // Plural entries have no plain msgstr and pass through verbatim
            if unit.has_msgstr {
                candidates.push(PoCandidate {
                    unit: index,
                    slot: PoSlot::Message,
                    source: unit.msgid.clone(),
                });
            }
        }

        let len = candidates.len();
        Ok(Self {
            units: Arc::new(Mutex::new(units)),
            candidates,
            done: vec![false; len],
        })
    }
}

impl FileAdapter for PoAdapter {
    fn entries(&self) -> Vec<TranslationEntry> {
        self.candidates
            .iter()
            .zip(self.done.iter())
            .filter(|(_, done)| !**done)
            .map(|(candidate, _)| {
                let sink = PoSink {
                    units: Arc::clone(&self.units),
                    unit: candidate.unit,
                    slot: candidate.slot,
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
        let previous = parse_po(&content);
        let mut units = self.units.lock();
        if previous.len() != units.len() {
            warn!(
                "Resume skipped for {:?}: entry count changed ({} then, {} now)",
                existing,
                previous.len(),
                units.len()
            );
            return Ok(0);
        }

        let mut satisfied = 0;
        for (index, candidate) in self.candidates.iter().enumerate() {
            let prev = &previous[candidate.unit];
            match candidate.slot {
                PoSlot::Message => {
                    if !prev.msgstr.trim().is_empty() && prev.msgstr != candidate.source {
                        units[candidate.unit].msgstr = prev.msgstr.clone();
                        self.done[index] = true;
                        satisfied += 1;
                    }
                }
                PoSlot::Context => {
                    if let Some(ctxt) = &prev.msgctxt {
                        if !ctxt.trim().is_empty() && *ctxt != candidate.source {
                            units[candidate.unit].msgctxt = Some(ctxt.clone());
                            self.done[index] = true;
                            satisfied += 1;
                        }
                    }
                }
            }
        }
        Ok(satisfied)
    }

    fn save(&self, path: &Path) -> Result<()> {
        let units = self.units.lock();
        FileManager::write_to_file(path, &render(&units))
    }

    fn candidate_count(&self) -> usize {
        self.candidates.len()
    }
}

/*!
 * CSV adapter: translates one configured column into another (or the
 * same) column. Rows and columns outside the configured pair pass
 * through untouched, including the optional header row.
 */

use anyhow::{anyhow, Context, Result};
use log::warn;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

use crate::adapters::{sample_texts, FileAdapter, Sink, TranslationEntry};
use crate::app_config::FilesConfig;
use crate::file_utils::FileManager;

/// Shared row table; sinks write cells while the adapter keeps the shape
type Rows = Arc<Mutex<Vec<Vec<String>>>>;

pub struct CsvAdapter {
    rows: Rows,
    delimiter: u8,
    has_header: bool,
    translate_col: usize,
    output_col: usize,
    /// Row indexes satisfied by a resumed output file
    done: Vec<bool>,
}

/// Writes one translated cell, padding the row when the output column
/// does not exist yet
struct CellSink {
    rows: Rows,
    row: usize,
    col: usize,
}

impl Sink for CellSink {
    fn accept(self: Box<Self>, translated: String) {
        let mut rows = self.rows.lock();
        if let Some(row) = rows.get_mut(self.row) {
            while row.len() <= self.col {
                row.push(String::new());
            }
            row[self.col] = translated;
        }
    }
}

impl CsvAdapter {
    pub fn load(path: &Path, options: &FilesConfig) -> Result<Self> {
        let delimiter = options.csv_delimiter as u8;
        let rows = read_rows(path, delimiter)?;
        let len = rows.len();
        Ok(Self {
            rows: Arc::new(Mutex::new(rows)),
            delimiter,
            has_header: options.csv_has_header,
            translate_col: options.csv_translate_column,
            output_col: options.csv_output_column,
            done: vec![false; len],
        })
    }

    /// First row index holding data rather than the header
    fn data_start(&self) -> usize {
        usize::from(self.has_header)
    }

    fn is_candidate(&self, index: usize, row: &[String]) -> bool {
        index >= self.data_start()
            && row
                .get(self.translate_col)
                .is_some_and(|cell| !cell.trim().is_empty())
    }
}

fn read_rows(path: &Path, delimiter: u8) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file: {:?}", path))?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("Failed to read CSV row in {:?}", path))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

impl FileAdapter for CsvAdapter {
    fn entries(&self) -> Vec<TranslationEntry> {
        let rows = self.rows.lock();
        let mut entries = Vec::new();
        for (index, row) in rows.iter().enumerate() {
            if self.done[index] || !self.is_candidate(index, row) {
                continue;
            }
            let sink = CellSink {
                rows: Arc::clone(&self.rows),
                row: index,
                col: self.output_col,
            };
            entries.push(TranslationEntry::new(
                row[self.translate_col].clone(),
                Box::new(sink),
            ));
        }
        entries
    }

    fn sample(&self, limit: Option<usize>) -> Vec<String> {
        let rows = self.rows.lock();
        let texts = rows
            .iter()
            .enumerate()
            .filter(|(index, row)| self.is_candidate(*index, row))
            .map(|(_, row)| row[self.translate_col].as_str());
        sample_texts(texts, limit)
    }

    fn apply_resume(&mut self, existing: &Path) -> Result<usize> {
        let previous = read_rows(existing, self.delimiter)?;
        let mut rows = self.rows.lock();
        if previous.len() != rows.len() {
            warn!(
                "Resume skipped for {:?}: row count changed ({} then, {} now)",
                existing,
                previous.len(),
                rows.len()
            );
            return Ok(0);
        }

        let mut satisfied = 0;
        for (index, row) in rows.iter_mut().enumerate() {
            if !(index >= usize::from(self.has_header)
                && row
                    .get(self.translate_col)
                    .is_some_and(|cell| !cell.trim().is_empty()))
            {
                continue;
            }
            let translated = previous[index]
                .get(self.output_col)
                .map(String::as_str)
                .unwrap_or_default();
            if !translated.trim().is_empty() && translated != row[self.translate_col] {
                while row.len() <= self.output_col {
                    row.push(String::new());
                }
                row[self.output_col] = translated.to_string();
                self.done[index] = true;
                satisfied += 1;
            }
        }
        Ok(satisfied)
    }

    fn save(&self, path: &Path) -> Result<()> {
        let rows = self.rows.lock();
        let mut buffer = Vec::new();
        {
            let mut writer = csv::WriterBuilder::new()
                .delimiter(self.delimiter)
                .flexible(true)
                .from_writer(&mut buffer);
            for row in rows.iter() {
                writer
                    .write_record(row)
                    .with_context(|| format!("Failed to serialize CSV row for {:?}", path))?;
            }
            writer.flush()?;
        }
        let content = String::from_utf8(buffer)
            .map_err(|_| anyhow!("CSV output for {:?} was not valid UTF-8", path))?;
        FileManager::write_to_file(path, &content)
    }

    fn candidate_count(&self) -> usize {
        let rows = self.rows.lock();
        rows.iter()
            .enumerate()
            .filter(|(index, row)| self.is_candidate(*index, row))
            .count()
    }
}

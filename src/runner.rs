/*!
 * Run coordinator.
 *
 * Discovers input files, mirrors the directory shape under the output
 * root and drives each file through load, optional context generation,
 * resume filtering, batch translation and save. Saving is
 * unconditional: whatever interrupted a file, the document is written
 * with originals in every slot a sink never filled, so a later resumed
 * run picks up exactly where this one ended.
 */

use anyhow::{bail, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::adapters::{self, FileAdapter};
use crate::app_config::Config;
use crate::control::Interrupt;
use crate::engine::Engine;
use crate::errors::RemoteError;
use crate::file_utils::FileManager;
use crate::providers::GenerationRequest;

/// Per-file verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileVerdict {
    Done,
    Skipped,
    Failed,
}

/// Why the run ended before the last file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunHalt {
    Stopped,
    CredentialsExhausted,
}

struct FileOutcome {
    verdict: FileVerdict,
    halt: Option<RunHalt>,
}

/// Input files plus the mirrored output layout of one run
pub struct RunPlan {
    pub files: Vec<PathBuf>,
    pub input_root: PathBuf,
    pub output_root: PathBuf,
}

impl RunPlan {
    /// Enumerate input files (sorted, by the configured format's
    /// extension) and decide the output root. A single-file input is
    /// taken as-is, extension aside.
    pub fn discover(config: &Config, input: &Path, output: Option<&Path>) -> Result<Self> {
        if !input.exists() {
            bail!("Input path {:?} does not exist", input);
        }

        let (input_root, files) = if input.is_file() {
            let root = input
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."))
                .to_path_buf();
            (root, vec![input.to_path_buf()])
        } else {
            let mut files =
                FileManager::find_files(input, &[config.files.format.extension()])?;
            files.sort();
            (input.to_path_buf(), files)
        };

        let output_root = match output {
            Some(path) => path.to_path_buf(),
            None => default_output_root(&input_root),
        };
        Ok(Self {
            files,
            input_root,
            output_root,
        })
    }

    /// Mirrored output path for one input file
    pub fn output_path(&self, file: &Path) -> PathBuf {
        let relative = file
            .strip_prefix(&self.input_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| {
                PathBuf::from(file.file_name().unwrap_or(file.as_os_str()))
            });
        self.output_root.join(relative)
    }
}

/// Sibling directory named after the input root
fn default_output_root(input_root: &Path) -> PathBuf {
    let name = input_root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());
    input_root.with_file_name(format!("{}_translated", name))
}

/// Translate everything under `input`. Stop requests and credential
/// exhaustion end the run early; both leave every started file saved.
pub async fn run(engine: Arc<Engine>, input: &Path, output: Option<&Path>) -> Result<()> {
    let plan = RunPlan::discover(&engine.config, input, output)?;
    if plan.files.is_empty() {
        warn!(
            "No .{} files found under {:?}",
            engine.config.files.format.extension(),
            input
        );
        return Ok(());
    }
    info!(
        "{} file(s) to translate, output root {:?}",
        plan.files.len(),
        plan.output_root
    );

    let multi = MultiProgress::new();
    let folder_bar = multi.add(ProgressBar::new(plan.files.len() as u64));
    folder_bar.set_style(bar_style("files"));

    for file in &plan.files {
        if engine.control.stop_requested() {
            info!("Stop honored, leaving the remaining files untouched");
            break;
        }
        folder_bar.set_message(display_name(file));

        let outcome = process_file(&engine, file, &plan.output_path(file), &multi).await;
        match outcome.verdict {
            FileVerdict::Done => engine.stats.add_file_done(),
            FileVerdict::Skipped => engine.stats.add_file_skipped(),
            FileVerdict::Failed => engine.stats.add_file_failed(),
        }
        folder_bar.inc(1);

        match outcome.halt {
            None => {}
            Some(RunHalt::Stopped) => {
                info!("Stop honored after saving the current file");
                break;
            }
            Some(RunHalt::CredentialsExhausted) => {
                error!("All API credentials exhausted, abandoning the remaining files");
                break;
            }
        }
    }
    folder_bar.finish_and_clear();

    info!("{}", engine.render_stats());
    Ok(())
}

async fn process_file(
    engine: &Engine,
    input: &Path,
    output: &Path,
    multi: &MultiProgress,
) -> FileOutcome {
    // A skip pressed between files applies to the file about to start
    match engine.control.checkpoint().await {
        Ok(()) => {}
        Err(Interrupt::SkipFile) => {
            info!("Skipping {:?} before it started", input);
            return FileOutcome {
                verdict: FileVerdict::Skipped,
                halt: None,
            };
        }
        Err(Interrupt::Stopped) => {
            return FileOutcome {
                verdict: FileVerdict::Skipped,
                halt: Some(RunHalt::Stopped),
            };
        }
    }

    info!("Processing {:?}", input);
    let mut adapter = match adapters::load(input, &engine.config) {
        Ok(adapter) => adapter,
        Err(e) => {
            error!("Could not load {:?}: {:#}", input, e);
            return FileOutcome {
                verdict: FileVerdict::Failed,
                halt: None,
            };
        }
    };
    info!("{} candidate entries", adapter.candidate_count());

    if engine.config.files.resume && output.exists() {
        match adapter.apply_resume(output) {
            Ok(0) => {}
            Ok(n) => info!("Resume: {} entries already translated in {:?}", n, output),
            Err(e) => warn!("Resume not applied for {:?}: {:#}", output, e),
        }
    }

    let entries = adapter.entries();
    let mut verdict = FileVerdict::Done;
    let mut halt = None;

    if entries.is_empty() {
        info!("Nothing to translate in {:?}, copying through", input);
    } else {
        let file_context = match generate_context(engine, input, adapter.as_ref()).await {
            Ok(context) => context,
            Err(e) => {
                // Aborted during the context call; the save below still runs
                (verdict, halt) = abort_outcome(&e);
                save_and_persist(engine, adapter.as_ref(), output, &mut verdict);
                return FileOutcome { verdict, halt };
            }
        };

        let bar = multi.add(ProgressBar::new(entries.len() as u64));
        bar.set_style(bar_style("entries"));
        bar.set_message(display_name(input));

        let pb = bar.clone();
        let cache = engine.cache.clone();
        let cache_path = engine.cache_path();
        let persistent = engine.config.cache.persistent;
        let result = engine
            .translator
            .translate_all(entries, file_context.as_deref(), move |settled| {
                pb.inc(settled);
                if !persistent {
                    return;
                }
                if let Err(e) = cache.maybe_autosave(&cache_path) {
                    warn!("Periodic cache save failed: {:#}", e);
                }
            })
            .await;
        bar.finish_and_clear();

        if let Err(e) = result {
            (verdict, halt) = abort_outcome(&e);
        }
    }

    save_and_persist(engine, adapter.as_ref(), output, &mut verdict);
    FileOutcome { verdict, halt }
}

/// Map an abort out of the translation phase to a verdict and halt
fn abort_outcome(error: &RemoteError) -> (FileVerdict, Option<RunHalt>) {
    match error {
        RemoteError::Interrupted(Interrupt::SkipFile) => {
            info!("File skipped on request");
            (FileVerdict::Skipped, None)
        }
        RemoteError::Interrupted(Interrupt::Stopped) => {
            (FileVerdict::Skipped, Some(RunHalt::Stopped))
        }
        RemoteError::CredentialsExhausted => {
            (FileVerdict::Failed, Some(RunHalt::CredentialsExhausted))
        }
        other => {
            // Non-abort errors are settled inside the batch translator
            error!("Translation phase failed: {}", other);
            (FileVerdict::Failed, None)
        }
    }
}

/// Unconditional per-file save plus the post-file cache write
fn save_and_persist(
    engine: &Engine,
    adapter: &dyn FileAdapter,
    output: &Path,
    verdict: &mut FileVerdict,
) {
    match adapter.save(output) {
        Ok(()) => info!("Saved {:?}", output),
        Err(e) => {
            error!("Could not save {:?}: {:#}", output, e);
            *verdict = FileVerdict::Failed;
        }
    }
    if let Err(e) = engine.save_cache() {
        warn!("Cache save failed: {:#}", e);
    }
}

/// Generate (or reuse) the one-paragraph file context. Only abort-class
/// errors escape; ordinary failures degrade to no context.
async fn generate_context(
    engine: &Engine,
    input: &Path,
    adapter: &dyn FileAdapter,
) -> Result<Option<String>, RemoteError> {
    let settings = &engine.config.context;
    if !settings.enabled {
        return Ok(None);
    }

    let limit = if settings.full_sample {
        None
    } else {
        Some(settings.sample_size)
    };
    let sample = adapter.sample(limit);
    if sample.is_empty() {
        return Ok(None);
    }

    let key = context_cache_key(&engine.config, input);
    if let Some(cached) = engine.cache.get_raw(&key) {
        info!("File context reused from cache for {:?}", input);
        return Ok(Some(cached));
    }

    info!(
        "Generating file context for {:?} from {} sample line(s)",
        input,
        sample.len()
    );
    let prompt = engine.prompts.context_prompt(&sample.join("\n"));
    match engine.caller.call(&GenerationRequest::new(prompt)).await {
        Ok(response) => {
            let context = response.trim().to_string();
            engine.cache.store_raw(&key, &context);
            info!("File context: {}", context);
            Ok(Some(context))
        }
        Err(e) if e.aborts_file() => Err(e),
        Err(e) => {
            warn!(
                "Context generation failed ({}), continuing without file context",
                e
            );
            Ok(None)
        }
    }
}

/// Raw cache key of a generated file context. Scoped by file name,
/// project and static instruction so a changed setup regenerates.
fn context_cache_key(config: &Config, input: &Path) -> String {
    let file_name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut key = format!(
        "context::{}::{}::{}",
        file_name,
        config.project_name,
        config.prompt_context.as_deref().unwrap_or_default()
    );
    if config.context.full_sample {
        key.push_str("::full");
    }
    key
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn bar_style(unit: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(&format!(
            "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{msg}}",
            unit
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░")
}

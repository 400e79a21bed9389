/*!
 * Common test utilities for the traduko test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use traduko::app_config::{Config, FileFormat};
use traduko::engine::Engine;
use traduko::providers::mock::MockProvider;

/// Routes log output through the test harness. Honors RUST_LOG; safe
/// to call from every test, only the first call installs the logger.
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content, making parent
/// directories as needed
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Baseline configuration for one input format: no disk cache, no
/// context generation, no rate limit, one test credential
pub fn test_config(format: FileFormat) -> Config {
    let mut config = Config::for_tests();
    config.files.format = format;
    config.api.keys = vec!["test-key-0001".to_string()];
    config.api.key_file = String::new();
    config
}

/// CSV variant of the baseline config with explicit column layout:
/// source text in column 0, translation into column 1, with a header
pub fn csv_config() -> Config {
    let mut config = test_config(FileFormat::Csv);
    config.files.csv_translate_column = 0;
    config.files.csv_output_column = 1;
    config.files.csv_has_header = true;
    config
}

/// Engine wired to a mock provider. The returned probe shares its call
/// counters with the provider the engine holds.
pub fn engine_with(config: Config, provider: MockProvider) -> (Arc<Engine>, MockProvider) {
    let probe = provider.clone();
    let engine = Engine::with_provider(config, Arc::new(provider))
        .expect("engine construction with a mock provider should succeed");
    (Arc::new(engine), probe)
}

/// The translation the working mock produces for a source text
pub fn translated(text: &str) -> String {
    MockProvider::expected_translation(text)
}

/*!
 * Stop, pause, skip and console signals observed through whole runs
 */

use anyhow::Result;
use std::fs;
use std::time::{Duration, Instant};

use traduko::console;
use traduko::providers::mock::{MockBehavior, MockProvider};
use traduko::runner;

use crate::common;

#[tokio::test]
async fn test_run_stopBeforeStart_shouldLeaveEverythingUntouched() -> Result<()> {
    let temp = common::create_temp_dir()?;
    let input = temp.path().join("texts");
    let output = temp.path().join("out");
    common::create_test_file(&input, "a.csv", "source,translation\nHello,\n")?;

    let (engine, probe) = common::engine_with(common::csv_config(), MockProvider::working());
    engine.control.request_stop();
    runner::run(engine.clone(), &input, Some(&output)).await?;

    assert_eq!(probe.calls(), 0);
    assert_eq!(engine.stats.files_done(), 0);
    assert!(!output.exists());
    Ok(())
}

#[tokio::test]
async fn test_run_pendingSkipFile_shouldSkipFirstFileOnly() -> Result<()> {
    let temp = common::create_temp_dir()?;
    let input = temp.path().join("texts");
    let output = temp.path().join("out");
    common::create_test_file(&input, "a.csv", "source,translation\nHello,\n")?;
    common::create_test_file(&input, "b.csv", "source,translation\nGoodbye,\n")?;

    let (engine, probe) = common::engine_with(common::csv_config(), MockProvider::working());
    engine.control.request_skip_file();
    runner::run(engine.clone(), &input, Some(&output)).await?;

    // The one-shot skip lands on the first file, before it is loaded
    assert_eq!(engine.stats.files_skipped(), 1);
    assert_eq!(engine.stats.files_done(), 1);
    assert_eq!(probe.calls(), 1);
    assert!(!output.join("a.csv").exists());
    assert!(output.join("b.csv").exists());
    Ok(())
}

#[tokio::test]
async fn test_run_stopDuringBackoff_shouldSaveFileAndEndPromptly() -> Result<()> {
    common::init_test_logging();
    let temp = common::create_temp_dir()?;
    let input = temp.path().join("texts");
    let output = temp.path().join("out");
    let original = "source,translation\nHello,\n";
    common::create_test_file(&input, "a.csv", original)?;

    // A failure streak with a long backoff keeps the worker sleeping
    let mut config = common::csv_config();
    config.api.backoff_base_secs = 60;

    let (engine, probe) = common::engine_with(config, MockProvider::failing());
    {
        let control = engine.control.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            control.request_stop();
        });
    }

    let started = Instant::now();
    runner::run(engine.clone(), &input, Some(&output)).await?;

    // The backoff sleep was cut short at a checkpoint, far below 60s
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(probe.calls(), 1);
    assert_eq!(engine.stats.files_skipped(), 1);

    // The aborted file is still written, originals in the open slots
    assert_eq!(fs::read_to_string(output.join("a.csv"))?, original);
    Ok(())
}

#[tokio::test]
async fn test_run_pause_shouldHoldUntilResumed() -> Result<()> {
    common::init_test_logging();
    let temp = common::create_temp_dir()?;
    let input = temp.path().join("texts");
    let output = temp.path().join("out");
    common::create_test_file(&input, "a.csv", "source,translation\nHello,\n")?;

    let (engine, probe) = common::engine_with(common::csv_config(), MockProvider::working());
    engine.control.request_pause();

    let task = {
        let engine = engine.clone();
        let input = input.clone();
        let output = output.clone();
        tokio::spawn(async move { runner::run(engine, &input, Some(&output)).await })
    };

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(!task.is_finished());
    assert_eq!(probe.calls(), 0);

    engine.control.resume();
    task.await??;

    assert_eq!(engine.stats.files_done(), 1);
    assert!(output.join("a.csv").exists());
    Ok(())
}

#[tokio::test]
async fn test_run_pendingSkipCredential_shouldRotateBeforeFirstCall() -> Result<()> {
    let temp = common::create_temp_dir()?;
    let input = temp.path().join("texts");
    let output = temp.path().join("out");
    common::create_test_file(&input, "a.csv", "source,translation\nHello,\n")?;

    let mut config = common::csv_config();
    config.api.keys = vec!["test-key-0001".to_string(), "test-key-0002".to_string()];

    let (engine, probe) = common::engine_with(config, MockProvider::working());
    engine.control.request_skip_credential();
    runner::run(engine.clone(), &input, Some(&output)).await?;

    assert_eq!(probe.keys_seen(), vec!["test-key-0002"]);
    assert_eq!(engine.stats.files_done(), 1);
    Ok(())
}

#[tokio::test]
async fn test_dispatch_saveCache_shouldWriteCacheFile() -> Result<()> {
    let temp = common::create_temp_dir()?;
    let cache_file = temp.path().join("memory.json");

    let mut config = common::csv_config();
    config.cache.persistent = true;
    config.cache.file = cache_file.to_string_lossy().into_owned();

    let (engine, _) = common::engine_with(config, MockProvider::working());
    engine.cache.store("Hello", "English", "Italian", None, "Ciao");

    assert!(!console::dispatch(&engine, "save cache"));
    assert!(cache_file.exists());
    let written = fs::read_to_string(&cache_file)?;
    assert!(written.contains("Ciao"));
    Ok(())
}

#[tokio::test]
async fn test_run_afterExhaustedCommand_shouldFailFast() -> Result<()> {
    let temp = common::create_temp_dir()?;
    let input = temp.path().join("texts");
    let output = temp.path().join("out");
    common::create_test_file(&input, "a.csv", "source,translation\nHello,\n")?;

    let (engine, probe) = common::engine_with(
        common::csv_config(),
        MockProvider::new(MockBehavior::RejectAll),
    );

    // The operator blacklists the only credential; the pool reports the
    // exhaustion but stays on the dead key
    assert!(!console::dispatch(&engine, "exhausted"));
    assert_eq!(engine.pool.usable_count(), 0);

    runner::run(engine.clone(), &input, Some(&output)).await?;
    assert_eq!(probe.calls(), 1);
    assert_eq!(engine.stats.files_failed(), 1);
    Ok(())
}

/*!
 * End-to-end CSV translation runs against the mock provider
 */

use anyhow::Result;
use std::fs;

use traduko::providers::mock::MockProvider;
use traduko::runner;

use crate::common;

#[tokio::test]
async fn test_run_csvTree_shouldMirrorLayoutAndTranslate() -> Result<()> {
    let temp = common::create_temp_dir()?;
    let input = temp.path().join("texts");
    let output = temp.path().join("out");

    common::create_test_file(
        &input,
        "menu.csv",
        "source,translation\nHello,\nGoodbye,\n123,\n",
    )?;
    common::create_test_file(
        &input,
        "sub/dialog.csv",
        "source,translation\nWelcome back,\n",
    )?;

    let (engine, probe) = common::engine_with(common::csv_config(), MockProvider::working());
    runner::run(engine.clone(), &input, Some(&output)).await?;

    // The output tree mirrors the input layout
    let menu = fs::read_to_string(output.join("menu.csv"))?;
    assert_eq!(
        menu,
        format!(
            "source,translation\nHello,{}\nGoodbye,{}\n123,123\n",
            common::translated("Hello"),
            common::translated("Goodbye")
        )
    );
    let dialog = fs::read_to_string(output.join("sub/dialog.csv"))?;
    assert_eq!(
        dialog,
        format!(
            "source,translation\nWelcome back,{}\n",
            common::translated("Welcome back")
        )
    );

    // One batch per file; the numeric row never reached the remote
    assert_eq!(probe.calls(), 2);
    assert_eq!(engine.stats.files_done(), 2);
    assert_eq!(engine.stats.entries_translated(), 3);
    assert_eq!(engine.stats.files_failed(), 0);

    Ok(())
}

#[tokio::test]
async fn test_run_secondPassWithPersistentCache_shouldMakeNoRemoteCalls() -> Result<()> {
    let temp = common::create_temp_dir()?;
    let input = temp.path().join("texts");
    common::create_test_file(&input, "a.csv", "source,translation\nHello,\nGoodbye,\n")?;

    let mut config = common::csv_config();
    config.cache.persistent = true;
    config.cache.file = temp
        .path()
        .join("memory.json")
        .to_string_lossy()
        .into_owned();

    // First pass translates remotely and persists the cache
    let output1 = temp.path().join("out1");
    let (engine1, probe1) = common::engine_with(config.clone(), MockProvider::working());
    runner::run(engine1, &input, Some(&output1)).await?;
    assert_eq!(probe1.calls(), 1);

    // Second pass resolves everything from the persisted cache
    let output2 = temp.path().join("out2");
    let (engine2, probe2) = common::engine_with(config, MockProvider::working());
    runner::run(engine2.clone(), &input, Some(&output2)).await?;

    assert_eq!(probe2.calls(), 0);
    assert_eq!(engine2.cache.stats().exact_hits, 2);
    assert_eq!(
        fs::read_to_string(output1.join("a.csv"))?,
        fs::read_to_string(output2.join("a.csv"))?
    );

    Ok(())
}

#[tokio::test]
async fn test_run_resume_shouldKeepExistingTranslations() -> Result<()> {
    let temp = common::create_temp_dir()?;
    let input = temp.path().join("texts");
    let output = temp.path().join("out");
    common::create_test_file(&input, "a.csv", "source,translation\nHello,\nGoodbye,\n")?;

    // A previous run already translated the first row
    common::create_test_file(&output, "a.csv", "source,translation\nHello,Ciao\nGoodbye,\n")?;

    let mut config = common::csv_config();
    config.files.resume = true;

    let (engine, probe) = common::engine_with(config, MockProvider::working());
    runner::run(engine, &input, Some(&output)).await?;

    let content = fs::read_to_string(output.join("a.csv"))?;
    assert_eq!(
        content,
        format!(
            "source,translation\nHello,Ciao\nGoodbye,{}\n",
            common::translated("Goodbye")
        )
    );
    // Only the unresolved row went out
    assert_eq!(probe.calls(), 1);

    Ok(())
}

#[test]
fn test_run_fileWithoutCandidates_shouldCopyThroughAsDone() -> Result<()> {
    let temp = common::create_temp_dir()?;
    let input = temp.path().join("texts");
    let output = temp.path().join("out");
    common::create_test_file(&input, "empty.csv", "source,translation\n")?;

    let (engine, probe) = common::engine_with(common::csv_config(), MockProvider::working());
    tokio_test::block_on(async { runner::run(engine.clone(), &input, Some(&output)).await })?;

    assert_eq!(
        fs::read_to_string(output.join("empty.csv"))?,
        "source,translation\n"
    );
    assert_eq!(probe.calls(), 0);
    assert_eq!(engine.stats.files_done(), 1);

    Ok(())
}

#[tokio::test]
async fn test_run_withContextEnabled_shouldGenerateOnceAndReuse() -> Result<()> {
    let temp = common::create_temp_dir()?;
    let input = temp.path().join("texts");
    common::create_test_file(&input, "a.csv", "source,translation\nHello,\nGoodbye,\n")?;

    let mut config = common::csv_config();
    config.context.enabled = true;
    config.cache.persistent = true;
    config.cache.file = temp
        .path()
        .join("memory.json")
        .to_string_lossy()
        .into_owned();

    // First pass: one context call plus one batch call
    let output1 = temp.path().join("out1");
    let (engine1, probe1) = common::engine_with(config.clone(), MockProvider::working());
    runner::run(engine1, &input, Some(&output1)).await?;
    assert_eq!(probe1.calls(), 2);

    let content = fs::read_to_string(output1.join("a.csv"))?;
    assert!(content.contains(&common::translated("Hello")));

    // Second pass: context and translations both come from the cache
    let output2 = temp.path().join("out2");
    let (engine2, probe2) = common::engine_with(config, MockProvider::working());
    runner::run(engine2, &input, Some(&output2)).await?;
    assert_eq!(probe2.calls(), 0);

    Ok(())
}

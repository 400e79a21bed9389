/*!
 * End-to-end runs over the JSON, PO and SRT adapters
 */

use anyhow::Result;
use serde_json::Value;
use std::fs;

use traduko::app_config::FileFormat;
use traduko::providers::mock::MockProvider;
use traduko::runner;

use crate::common;

#[tokio::test]
async fn test_run_jsonTree_shouldTranslateConfiguredKeys() -> Result<()> {
    let temp = common::create_temp_dir()?;
    let input = temp.path().join("texts");
    let output = temp.path().join("out");
    common::create_test_file(
        &input,
        "strings.json",
        r#"{
            "menu": { "title": "New game", "depth": 3 },
            "items": [ { "name": "Iron sword", "id": "itm_01" } ],
            "note": "internal"
        }"#,
    )?;

    let mut config = common::test_config(FileFormat::Json);
    config.files.json_keys = vec!["title".to_string(), "name".to_string()];

    let (engine, probe) = common::engine_with(config, MockProvider::working());
    runner::run(engine, &input, Some(&output)).await?;

    let written: Value =
        serde_json::from_str(&fs::read_to_string(output.join("strings.json"))?)?;
    assert_eq!(written["menu"]["title"], common::translated("New game"));
    assert_eq!(written["items"][0]["name"], common::translated("Iron sword"));
    // Everything outside the key set survives untouched
    assert_eq!(written["menu"]["depth"], 3);
    assert_eq!(written["items"][0]["id"], "itm_01");
    assert_eq!(written["note"], "internal");
    assert_eq!(probe.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_run_jsonFullPath_shouldMatchExactPathsOnly() -> Result<()> {
    let temp = common::create_temp_dir()?;
    let input = temp.path().join("texts");
    let output = temp.path().join("out");
    common::create_test_file(
        &input,
        "strings.json",
        r#"{ "menu": { "title": "Start" }, "popup": { "title": "Confirm" } }"#,
    )?;

    let mut config = common::test_config(FileFormat::Json);
    config.files.json_keys = vec!["menu.title".to_string()];
    config.files.json_match_full_path = true;

    let (engine, _) = common::engine_with(config, MockProvider::working());
    runner::run(engine, &input, Some(&output)).await?;

    let written: Value =
        serde_json::from_str(&fs::read_to_string(output.join("strings.json"))?)?;
    assert_eq!(written["menu"]["title"], common::translated("Start"));
    assert_eq!(written["popup"]["title"], "Confirm");
    Ok(())
}

#[tokio::test]
async fn test_run_poFile_shouldFillMsgstrAndKeepStructure() -> Result<()> {
    let temp = common::create_temp_dir()?;
    let input = temp.path().join("texts");
    let output = temp.path().join("out");
    common::create_test_file(
        &input,
        "game.po",
        r#"# Game menu strings
msgid ""
msgstr ""
"Project-Id-Version: demo\n"

msgid "New game"
msgstr ""

msgid "{PLAYER}"
msgstr ""

msgid "One file"
msgid_plural "%d files"
msgstr[0] ""
msgstr[1] ""
"#,
    )?;

    let (engine, probe) =
        common::engine_with(common::test_config(FileFormat::Po), MockProvider::working());
    runner::run(engine, &input, Some(&output)).await?;

    let written = fs::read_to_string(output.join("game.po"))?;
    // Only the prose msgid reached the remote
    assert_eq!(probe.calls(), 1);
    assert!(written.contains(&format!("msgstr \"{}\"", common::translated("New game"))));
    // The placeholder is copied through, not translated
    assert!(written.contains("msgstr \"{PLAYER}\""));
    // Header and plural machinery survive verbatim
    assert!(written.contains(r#""Project-Id-Version: demo\n""#));
    assert!(written.contains(r#"msgid_plural "%d files""#));
    assert!(written.contains(r#"msgstr[1] """#));
    Ok(())
}

#[tokio::test]
async fn test_run_poResume_shouldOnlyTranslateMissingEntries() -> Result<()> {
    let temp = common::create_temp_dir()?;
    let input = temp.path().join("texts");
    let output = temp.path().join("out");
    common::create_test_file(
        &input,
        "game.po",
        "msgid \"New game\"\nmsgstr \"\"\n\nmsgid \"Load game\"\nmsgstr \"\"\n",
    )?;
    // A previous run already translated the first unit
    common::create_test_file(
        &output,
        "game.po",
        "msgid \"New game\"\nmsgstr \"Nuova partita\"\n\nmsgid \"Load game\"\nmsgstr \"\"\n",
    )?;

    let mut config = common::test_config(FileFormat::Po);
    config.files.resume = true;

    let (engine, probe) = common::engine_with(config, MockProvider::working());
    runner::run(engine, &input, Some(&output)).await?;

    let written = fs::read_to_string(output.join("game.po"))?;
    assert!(written.contains("msgstr \"Nuova partita\""));
    assert!(written.contains(&format!("msgstr \"{}\"", common::translated("Load game"))));
    assert_eq!(probe.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_run_srtFile_shouldTranslateCuesAndKeepTiming() -> Result<()> {
    let temp = common::create_temp_dir()?;
    let input = temp.path().join("texts");
    let output = temp.path().join("out");
    common::create_test_file(
        &input,
        "episode.srt",
        "1\n00:00:01,000 --> 00:00:02,500\nHello there\n\n2\n00:00:03,000 --> 00:00:04,000\nGeneral Kenobi\nYou are a bold one\n\n3\n00:00:05,000 --> 00:00:06,000\n42\n",
    )?;

    let (engine, probe) =
        common::engine_with(common::test_config(FileFormat::Srt), MockProvider::working());
    runner::run(engine, &input, Some(&output)).await?;

    // One batch for the two prose cues; the numeric cue stays local
    assert_eq!(probe.calls(), 1);
    assert_eq!(
        fs::read_to_string(output.join("episode.srt"))?,
        format!(
            "1\n00:00:01,000 --> 00:00:02,500\n{}\n\n2\n00:00:03,000 --> 00:00:04,000\n{}\n\n3\n00:00:05,000 --> 00:00:06,000\n42\n",
            common::translated("Hello there"),
            common::translated("General Kenobi\nYou are a bold one")
        )
    );
    Ok(())
}

#[tokio::test]
async fn test_run_formatFilter_shouldIgnoreOtherExtensions() -> Result<()> {
    let temp = common::create_temp_dir()?;
    let input = temp.path().join("texts");
    let output = temp.path().join("out");
    common::create_test_file(
        &input,
        "episode.srt",
        "1\n00:00:01,000 --> 00:00:02,000\nHello\n",
    )?;
    common::create_test_file(&input, "game.po", "msgid \"Hello\"\nmsgstr \"\"\n")?;

    let (engine, probe) =
        common::engine_with(common::test_config(FileFormat::Srt), MockProvider::working());
    runner::run(engine.clone(), &input, Some(&output)).await?;

    assert_eq!(engine.stats.files_done(), 1);
    assert_eq!(probe.calls(), 1);
    assert!(output.join("episode.srt").exists());
    assert!(!output.join("game.po").exists());
    Ok(())
}

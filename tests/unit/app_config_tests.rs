/*!
 * Tests for configuration loading, validation and derived settings
 */

use std::str::FromStr;

use traduko::app_config::{Config, FileFormat, LogLevel};

#[test]
fn test_saveThenLoad_shouldRoundTripSettings() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conf.json");

    let mut config = Config::default();
    config.source_language = "Japanese".to_string();
    config.target_language = "English".to_string();
    config.project_name = "Moonlight RPG".to_string();
    config.no_translate = vec!["HP".to_string(), "MP".to_string()];
    config.files.format = FileFormat::Po;
    config.api.rpm_limit = Some(12);
    config.batch.max_entries = 10;
    config.cache.fuzzy_match = true;

    config.save(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded.source_language, "Japanese");
    assert_eq!(loaded.project_name, "Moonlight RPG");
    assert_eq!(loaded.no_translate, vec!["HP", "MP"]);
    assert_eq!(loaded.files.format, FileFormat::Po);
    assert_eq!(loaded.api.rpm_limit, Some(12));
    assert_eq!(loaded.batch.max_entries, 10);
    assert_eq!(loaded.fuzzy_threshold(), Some(0.9));
}

#[test]
fn test_fromFile_missingFile_shouldFail() {
    assert!(Config::from_file("/no/such/conf.json").is_err());
}

#[test]
fn test_fromFile_malformedJson_shouldFail() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conf.json");
    std::fs::write(&path, "{ this is not json").unwrap();
    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_fromFile_unknownFields_shouldBeIgnored() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conf.json");
    std::fs::write(
        &path,
        r#"{ "target_language": "French", "some_future_setting": true }"#,
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.target_language, "French");
}

#[test]
fn test_validate_outOfRangeValues_shouldFail() {
    let mut config = Config::default();
    config.cache.fuzzy_threshold = 1.5;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.provider.temperature = Some(3.0);
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.batch.max_entries = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.batch.chars_per_token = 0.0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.api.max_attempts = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_emptyLanguages_shouldFail() {
    let mut config = Config::default();
    config.target_language = "  ".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_fuzzyThreshold_shouldFollowToggle() {
    let mut config = Config::default();
    assert_eq!(config.fuzzy_threshold(), None);

    config.cache.fuzzy_match = true;
    config.cache.fuzzy_threshold = 0.8;
    assert_eq!(config.fuzzy_threshold(), Some(0.8));
}

#[test]
fn test_cacheContext_shouldJoinProjectAndInstruction() {
    let mut config = Config::default();
    config.project_name = "Moonlight RPG".to_string();
    config.prompt_context = Some("keep it casual".to_string());
    assert_eq!(
        config.cache_context().as_deref(),
        Some("Moonlight RPG::keep it casual")
    );
}

#[test]
fn test_logLevel_fromStr_shouldMapToFilter() {
    let level = LogLevel::from_str("debug").unwrap();
    assert_eq!(level, LogLevel::Debug);
    assert_eq!(level.to_level_filter(), log::LevelFilter::Debug);
    assert!(LogLevel::from_str("chatty").is_err());
}

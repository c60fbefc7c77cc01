//! Loading configuration from disk

use ems_console::{ConfigError, ConsoleConfig};
use ems_reference::{RacePolicy, SearchOutcome, Seed};
use ems_resolver::RecordId;
use ems_test_utils::{area_option, area_resolver};
use std::io::Write;

#[test]
fn loads_file_and_validates() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[resolver]
base_url = "https://ems.example.org/api"
timeout_secs = 10

[reference]
race_policy = "reject_stale"
"#
    )
    .unwrap();

    let config = ConsoleConfig::from_file(file.path()).unwrap();
    config.validate().unwrap();

    assert_eq!(config.resolver.timeout_secs, 10);
    assert_eq!(config.reference.race_policy, RacePolicy::RejectStale);
    assert_eq!(config.reference.open_threshold, 9);
}

#[test]
fn missing_file_is_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ConsoleConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn invalid_values_fail_load() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[resolver]\nbase_url = \"ems.example.org\"").unwrap();

    let err = ConsoleConfig::from_file(file.path())
        .and_then(|config| config.validate())
        .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[tokio::test]
async fn reference_section_drives_filter_fields() {
    let config = ConsoleConfig::from_toml_str(
        r#"
[reference]
open_threshold = 1
max_options = 3
"#,
    )
    .unwrap();

    let seeded = config.reference_field(area_resolver()).build();
    seeded.initialize(area_option("a2"));
    assert_eq!(seeded.on_open().await, SearchOutcome::Skipped);
    assert_eq!(seeded.render(), vec![(RecordId::from("a2"), "Hill Ward".to_string())]);

    let empty = config.reference_field(area_resolver()).build();
    empty.initialize(Seed::None);
    assert!(matches!(empty.on_open().await, SearchOutcome::Merged { received: 5, .. }));
    assert_eq!(empty.len(), 5, "current matches are never evicted");

    empty.on_query_change("hill").await;
    assert_eq!(empty.len(), 3);
    assert_eq!(empty.matches(), vec![(RecordId::from("a2"), "Hill Ward".to_string())]);
}

//! Integration tests for loading locator profiles from YAML.
//!
//! Profiles are how operators adapt to markup changes without a rebuild, so
//! these exercise the public loading API the server and CLI use.

use std::path::PathBuf;

use mapscout_scraper::{Field, LocatorProfile, LocatorProfileError, PostProcess};

const MINIMAL_PROFILE: &str = r#"
search_input: '//input[@id="searchboxinput"]'
listing: '//a[contains(@href, "/maps/place")]'
detail_ready: '//h1'
fields:
  - field: name
    rule: { kind: identity }
    strategies:
      - locator: '//h1'
  - field: schedule
    rule: { kind: first_match_join }
    reveal: '//div[contains(@class, "OMl5r")]'
    strategies:
      - locator: '//table//tr'
      - locator: '//span[@class="status"]'
        separator: ' '
  - field: review_count
    rule: { kind: numeric_parse }
    strategies:
      - locator: '//span[@aria-label]'
"#;

fn write_temp(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("mapscout-{}-{name}", std::process::id()));
    std::fs::write(&path, contents).expect("write temp profile");
    path
}

#[test]
fn minimal_profile_parses_with_defaults() {
    let profile = LocatorProfile::from_yaml(MINIMAL_PROFILE).expect("valid profile");

    assert!(profile.end_of_list.is_none());
    assert_eq!(profile.fields.len(), 3);

    let schedule = profile.field(Field::Schedule).expect("schedule spec");
    assert_eq!(
        schedule.rule,
        PostProcess::FirstMatchJoin {
            separator: "; ".to_string()
        }
    );
    assert_eq!(schedule.strategies[0].separator, None);
    assert_eq!(schedule.strategies[1].separator.as_deref(), Some(" "));
    assert!(schedule.reveal.is_some());
}

#[test]
fn load_reads_profile_from_disk() {
    let path = write_temp("profile.yaml", MINIMAL_PROFILE);
    let profile = LocatorProfile::load(&path).expect("load profile");
    std::fs::remove_file(&path).ok();

    assert_eq!(profile.detail_ready.as_str(), "//h1");
}

#[test]
fn load_or_default_falls_back_to_google_maps() {
    let profile = LocatorProfile::load_or_default(None).expect("default profile");
    assert_eq!(profile, LocatorProfile::google_maps());
}

#[test]
fn missing_file_is_an_io_error() {
    let path = std::env::temp_dir().join("mapscout-does-not-exist.yaml");
    let err = LocatorProfile::load(&path).unwrap_err();
    assert!(matches!(err, LocatorProfileError::Io { .. }), "got: {err:?}");
}

#[test]
fn malformed_yaml_is_a_parse_error() {
    let err = LocatorProfile::from_yaml("search_input: [unterminated").unwrap_err();
    assert!(matches!(err, LocatorProfileError::Parse(_)), "got: {err:?}");
}

#[test]
fn unknown_rule_kind_is_a_parse_error() {
    let yaml = MINIMAL_PROFILE.replace("kind: numeric_parse", "kind: guess");
    let err = LocatorProfile::from_yaml(&yaml).unwrap_err();
    assert!(matches!(err, LocatorProfileError::Parse(_)), "got: {err:?}");
}

#[test]
fn profile_without_name_field_is_invalid() {
    let yaml = MINIMAL_PROFILE.replace("field: name", "field: intro");
    let err = LocatorProfile::from_yaml(&yaml).unwrap_err();
    assert!(
        matches!(err, LocatorProfileError::Invalid(ref msg) if msg.contains("name")),
        "got: {err:?}"
    );
}

#[test]
fn field_without_strategies_is_invalid() {
    let yaml = r#"
search_input: '//input'
listing: '//a'
detail_ready: '//h1'
fields:
  - field: name
    rule: { kind: identity }
    strategies: []
"#;
    let err = LocatorProfile::from_yaml(yaml).unwrap_err();
    assert!(
        matches!(err, LocatorProfileError::Invalid(ref msg) if msg.contains("no locator strategies")),
        "got: {err:?}"
    );
}

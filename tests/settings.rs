//! Persisted settings tests.

use subalign::align::AlignConfig;
use subalign::settings::AlignSettings;

// ── Loading ────────────────────────────────────────────────────────

#[test]
fn missing_file_yields_defaults() {
    let directory = tempfile::tempdir().unwrap();
    let settings = AlignSettings::load(directory.path().join("missing.json"));
    assert_eq!(settings, AlignSettings::default());
}

#[test]
fn malformed_file_yields_defaults() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("settings.json");
    std::fs::write(&path, "{ not json").unwrap();

    let settings = AlignSettings::load(&path);
    assert_eq!(settings, AlignSettings::default());
}

#[test]
fn partial_document_fills_in_defaults() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("settings.json");
    std::fs::write(&path, r#"{"tolerance": 9}"#).unwrap();

    let settings = AlignSettings::load(&path);
    assert_eq!(settings.tolerance, 9);
    assert_eq!(settings.max_backward, AlignSettings::default().max_backward);
    assert_eq!(settings.max_forward, AlignSettings::default().max_forward);
}

// ── Round trip ─────────────────────────────────────────────────────

#[test]
fn saved_settings_load_back_unchanged() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("settings.json");

    let settings = AlignSettings {
        tolerance: 12,
        max_backward: 500,
        max_forward: 250,
    };
    settings.save(&path).unwrap();

    assert_eq!(AlignSettings::load(&path), settings);
}

// ── Validation boundary ────────────────────────────────────────────

#[test]
fn out_of_range_persisted_tolerance_fails_validation_and_stays_on_disk() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("settings.json");

    // A tolerance of 300 persisted by some earlier (or hand-edited)
    // session.
    let stale = AlignSettings {
        tolerance: 300,
        max_backward: 0,
        max_forward: 0,
    };
    stale.save(&path).unwrap();
    let on_disk = std::fs::read_to_string(&path).unwrap();

    // The session loads it, validation rejects it before any frame work,
    // and nothing is written back.
    let loaded = AlignSettings::load(&path);
    let error = AlignConfig::from_settings(&loaded).unwrap_err();
    assert!(error.is_configuration());

    assert_eq!(std::fs::read_to_string(&path).unwrap(), on_disk);
}

#[test]
fn valid_persisted_settings_produce_a_config() {
    let settings = AlignSettings {
        tolerance: 0,
        max_backward: 0,
        max_forward: 120,
    };
    let config = AlignConfig::from_settings(&settings).unwrap();
    assert_eq!(config.tolerance, 0);
    assert_eq!(config.window.max_backward, 0);
    assert_eq!(config.window.max_forward, 120);
}

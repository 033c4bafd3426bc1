//! Tests for TOML configuration loading and CLI overrides.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use bagtrack::cli::{Cli, resolve_config};
use bagtrack::config::{BackendKind, CONFIG_ENV, Config};
use bagtrack_core::{
    BagId, CheckpointStage, ExpectedDuration, NewBag, NewCheckpoint, RiskLevel, TrackerError,
};
use chrono::{TimeDelta, TimeZone, Utc};
use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Mutex;

/// Serializes tests that read or write `BAGTRACK_CONFIG`.
static CONFIG_ENV_MUTEX: Mutex<()> = Mutex::new(());

struct EnvGuard {
    _guard: std::sync::MutexGuard<'static, ()>,
}

impl EnvGuard {
    fn lock() -> Self {
        let guard = CONFIG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        // SAFETY: Tests touching the variable run sequentially under CONFIG_ENV_MUTEX.
        unsafe { std::env::remove_var(CONFIG_ENV) };
        Self { _guard: guard }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        // SAFETY: Tests touching the variable run sequentially under CONFIG_ENV_MUTEX.
        unsafe { std::env::remove_var(CONFIG_ENV) };
    }
}

fn write_config(dir: &tempfile::TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("bagtrack.toml");
    std::fs::write(&path, content).unwrap();
    path
}

const FULL_CONFIG: &str = r#"
[server]
host = "0.0.0.0"
port = 9090

[storage]
backend = "memory"

[risk]
variable_ceiling_minutes = 240
medium_multiplier = 3
high_multiplier = 5

[[transitions]]
from = "TRANSFER"
to = "LOADING"
minutes = 25

[[transitions]]
from = "checkin"
to = "security-check"
variable = true
"#;

// =============================================================================
// FILE LOADING
// =============================================================================

#[test]
fn test_full_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, FULL_CONFIG);

    let config = Config::from_file(&path).unwrap();

    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.storage.backend, BackendKind::Memory);
    assert_eq!(config.thresholds().variable_ceiling_minutes, 240);

    let table = config.transition_table().unwrap();
    assert_eq!(
        table.lookup(CheckpointStage::Transfer, CheckpointStage::Loading),
        ExpectedDuration::Fixed(25)
    );
    assert_eq!(
        table.lookup(CheckpointStage::Checkin, CheckpointStage::SecurityCheck),
        ExpectedDuration::Variable
    );
    // Untouched defaults survive.
    assert_eq!(
        table.lookup(CheckpointStage::Arrival, CheckpointStage::Claimed),
        ExpectedDuration::Fixed(30)
    );
}

#[test]
fn test_missing_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = Config::from_file(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(TrackerError::ConfigError(_))));
}

#[test]
fn test_unknown_key_rejected() {
    let result = Config::from_toml_str("[server]\nhostname = \"x\"\n");
    assert!(matches!(result, Err(TrackerError::ConfigError(_))));
}

#[test]
fn test_unknown_stage_in_transition_rejected() {
    let toml = "[[transitions]]\nfrom = \"CHECKIN\"\nto = \"BOARDING\"\nminutes = 5\n";
    let err = Config::from_toml_str(toml).unwrap_err();
    assert!(err.to_string().contains("BOARDING"));
}

#[test]
fn test_zero_minutes_rejected() {
    let toml = "[[transitions]]\nfrom = \"CHECKIN\"\nto = \"SECURITY_CHECK\"\nminutes = 0\n";
    assert!(Config::from_toml_str(toml).is_err());
}

// =============================================================================
// CONFIGURED DERIVATION
// =============================================================================

#[test]
fn test_configured_thresholds_reach_the_tracker() {
    let config = Config::from_toml_str(FULL_CONFIG).unwrap();
    let mut tracker = config.open_tracker().unwrap();
    assert!(!tracker.is_persistent());

    let t0 = Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).single().unwrap();
    let bag = tracker.register_bag(NewBag::with_tag("CF000001"), t0).unwrap();
    tracker
        .scan(
            NewCheckpoint::new(bag.id.clone(), CheckpointStage::Transfer).scanned_at(t0),
            t0,
        )
        .unwrap();

    // 60 minutes against a 25 minute transition: 2.4x, below the configured
    // medium multiplier of 3.
    let status = tracker
        .bag_status(&bag.id, t0 + TimeDelta::minutes(60))
        .unwrap();
    assert_eq!(status.operational_state.risk_level, RiskLevel::Low);

    // 130 minutes: 5.2x, above the configured high multiplier.
    let status = tracker
        .bag_status(&bag.id, t0 + TimeDelta::minutes(130))
        .unwrap();
    assert_eq!(status.operational_state.risk_level, RiskLevel::High);
}

#[test]
fn test_redb_backend_opens_database_path() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("bags.redb");
    let toml = format!("[storage]\nbackend = \"redb\"\ndatabase = {:?}\n", db);

    let config = Config::from_toml_str(&toml).unwrap();
    let tracker = config.open_tracker().unwrap();

    assert!(tracker.is_persistent());
    assert!(db.exists());
    assert!(matches!(
        tracker.get_bag(&BagId::new("none")),
        Err(TrackerError::BagNotFound(_))
    ));
}

// =============================================================================
// RESOLUTION AND CLI OVERRIDES
// =============================================================================

#[test]
fn test_load_without_path_gives_defaults() {
    let _guard = EnvGuard::lock();
    let config = Config::load(None).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_env_variable_selects_file() {
    let _guard = EnvGuard::lock();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, FULL_CONFIG);
    // SAFETY: Tests touching the variable run sequentially under CONFIG_ENV_MUTEX.
    unsafe { std::env::set_var(CONFIG_ENV, &path) };

    let config = Config::load(None).unwrap();
    assert_eq!(config.server.port, 9090);
}

#[test]
fn test_cli_flags_override_file() {
    let _guard = EnvGuard::lock();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, FULL_CONFIG);
    let db = dir.path().join("override.redb");

    let args: Vec<OsString> = vec![
        "bagtrack".into(),
        "--config".into(),
        path.into_os_string(),
        "--backend".into(),
        "redb".into(),
        "--database".into(),
        db.clone().into_os_string(),
        "checkpoints".into(),
    ];
    let cli = Cli::try_parse_from(args).unwrap();

    let config = resolve_config(&cli).unwrap();
    assert_eq!(config.storage.backend, BackendKind::Redb);
    assert_eq!(config.storage.database, db);
    assert_eq!(config.server.port, 9090);
}

#[test]
fn test_cli_bad_backend_rejected() {
    let _guard = EnvGuard::lock();
    let cli = Cli::try_parse_from(["bagtrack", "--backend", "sqlite", "checkpoints"]).unwrap();
    assert!(matches!(
        resolve_config(&cli),
        Err(TrackerError::ConfigError(_))
    ));
}

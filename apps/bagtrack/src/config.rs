//! Configuration loading from TOML files.
//!
//! The config file is selected via:
//! 1. `--config <path>` on the command line
//! 2. the `BAGTRACK_CONFIG` environment variable
//! 3. none: built-in defaults
//!
//! Command-line flags (`--database`, `--backend`, `--host`, `--port`) are
//! applied on top of whatever was loaded.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [storage]
//! backend = "redb"
//! database = "/var/lib/bagtrack/bags.redb"
//!
//! [risk]
//! variable_ceiling_minutes = 180
//! medium_multiplier = 2
//! high_multiplier = 3
//!
//! [[transitions]]
//! from = "TRANSFER"
//! to = "LOADING"
//! minutes = 25
//! ```

use bagtrack_core::{
    CheckpointStage, ExpectedDuration, RiskThresholds, StateDeriver, Tracker, TrackerError,
    TransitionTable,
};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "BAGTRACK_CONFIG";

// =============================================================================
// SECTIONS
// =============================================================================

/// Storage backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Volatile, lost on exit.
    Memory,
    #[default]
    Redb,
}

impl BackendKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Memory => "memory",
            BackendKind::Redb => "redb",
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "redb" => Ok(BackendKind::Redb),
            other => Err(TrackerError::ConfigError(format!(
                "unknown backend '{}' (expected memory or redb)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default = "default_database")]
    pub database: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            database: default_database(),
        }
    }
}

fn default_database() -> PathBuf {
    PathBuf::from("bagtrack.redb")
}

/// Risk thresholds; defaults match the compiled-in primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RiskConfig {
    #[serde(default = "default_ceiling")]
    pub variable_ceiling_minutes: u32,
    #[serde(default = "default_medium")]
    pub medium_multiplier: u32,
    #[serde(default = "default_high")]
    pub high_multiplier: u32,
}

impl Default for RiskConfig {
    fn default() -> Self {
        let defaults = RiskThresholds::default();
        Self {
            variable_ceiling_minutes: defaults.variable_ceiling_minutes,
            medium_multiplier: defaults.medium_multiplier,
            high_multiplier: defaults.high_multiplier,
        }
    }
}

fn default_ceiling() -> u32 {
    RiskThresholds::default().variable_ceiling_minutes
}

fn default_medium() -> u32 {
    RiskThresholds::default().medium_multiplier
}

fn default_high() -> u32 {
    RiskThresholds::default().high_multiplier
}

/// Override of one expected transition duration.
///
/// Exactly one of `minutes` or `variable = true` must be given.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransitionOverride {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub minutes: Option<u32>,
    #[serde(default)]
    pub variable: bool,
}

impl TransitionOverride {
    fn resolve(&self) -> Result<(CheckpointStage, CheckpointStage, ExpectedDuration), TrackerError> {
        let context = |e: TrackerError| {
            TrackerError::ConfigError(format!("transition {} -> {}: {}", self.from, self.to, e))
        };
        let from: CheckpointStage = self.from.parse().map_err(context)?;
        let to: CheckpointStage = self.to.parse().map_err(context)?;

        let duration = match (self.minutes, self.variable) {
            (Some(0), false) => {
                return Err(TrackerError::ConfigError(format!(
                    "transition {} -> {}: minutes must be positive",
                    self.from, self.to
                )));
            }
            (Some(m), false) => ExpectedDuration::Fixed(m),
            (None, true) => ExpectedDuration::Variable,
            _ => {
                return Err(TrackerError::ConfigError(format!(
                    "transition {} -> {}: set exactly one of minutes or variable",
                    self.from, self.to
                )));
            }
        };
        Ok((from, to, duration))
    }
}

// =============================================================================
// CONFIG
// =============================================================================

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub transitions: Vec<TransitionOverride>,
}

impl Config {
    /// Config file path from the command line, else `BAGTRACK_CONFIG`.
    pub fn resolve_path(cli_path: Option<&Path>) -> Option<PathBuf> {
        cli_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, TrackerError> {
        let config: Config =
            toml::from_str(content).map_err(|e| TrackerError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TrackerError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            TrackerError::ConfigError(format!(
                "failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            TrackerError::ConfigError(msg) => {
                TrackerError::ConfigError(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Load the resolved config file, or defaults when none is selected.
    ///
    /// A file that is selected but unreadable or invalid is an error.
    pub fn load(cli_path: Option<&Path>) -> Result<Self, TrackerError> {
        match Self::resolve_path(cli_path) {
            Some(path) => {
                let config = Self::from_file(&path)?;
                tracing::info!(path = %path.display(), "Loaded configuration");
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    /// Check thresholds and transition overrides.
    pub fn validate(&self) -> Result<(), TrackerError> {
        let risk = &self.risk;
        if risk.variable_ceiling_minutes == 0 {
            return Err(TrackerError::ConfigError(
                "risk.variable_ceiling_minutes must be positive".to_string(),
            ));
        }
        if risk.medium_multiplier == 0 || risk.medium_multiplier >= risk.high_multiplier {
            return Err(TrackerError::ConfigError(format!(
                "risk multipliers must satisfy 0 < medium < high (got {} and {})",
                risk.medium_multiplier, risk.high_multiplier
            )));
        }
        for transition in &self.transitions {
            transition.resolve()?;
        }
        Ok(())
    }

    #[must_use]
    pub fn thresholds(&self) -> RiskThresholds {
        RiskThresholds::new(
            self.risk.variable_ceiling_minutes,
            self.risk.medium_multiplier,
            self.risk.high_multiplier,
        )
    }

    /// Default transition table with the configured overrides applied.
    pub fn transition_table(&self) -> Result<TransitionTable, TrackerError> {
        let mut table = TransitionTable::new();
        for transition in &self.transitions {
            let (from, to, duration) = transition.resolve()?;
            table.set(from, to, duration);
        }
        Ok(table)
    }

    pub fn deriver(&self) -> Result<StateDeriver, TrackerError> {
        Ok(StateDeriver::with_config(
            self.transition_table()?,
            self.thresholds(),
        ))
    }

    /// Open the configured store with the configured deriver.
    pub fn open_tracker(&self) -> Result<Tracker, TrackerError> {
        let tracker = match self.storage.backend {
            BackendKind::Memory => Tracker::new(),
            BackendKind::Redb => Tracker::with_redb(&self.storage.database)?,
        };
        Ok(tracker.with_deriver(self.deriver()?))
    }
}

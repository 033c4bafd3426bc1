//! # Bagtrack CLI Module
//!
//! This module implements the CLI interface for Bagtrack.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `init` - Initialize a new database
//! - `register` - Register a bag
//! - `scan` - Record a checkpoint scan
//! - `auto-scan` - Record a scan with an inferred checkpoint
//! - `status` - Show a bag's derived operational state
//! - `history` - Show a bag's scan history
//! - `checkpoints` - List checkpoint stages
//! - `scanner` - Manage scanner devices (add, list, show, deactivate)

mod commands;

use crate::config::{BackendKind, Config};
use bagtrack_core::TrackerError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Bagtrack - baggage checkpoint tracker
///
/// Records checkpoint scans and derives where each bag is, what should
/// happen next and whether it is running late.
#[derive(Parser, Debug)]
#[command(name = "bagtrack")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the redb database (overrides the config file)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend: "memory" or "redb" (overrides the config file)
    #[arg(short = 'B', long, global = true)]
    pub backend: Option<String>,

    /// Path to a TOML config file (default: $BAGTRACK_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },

    /// Register a bag
    Register {
        /// Bag tag number
        #[arg(short, long)]
        tag: String,

        /// Passenger name
        #[arg(long)]
        passenger: Option<String>,

        /// Flight number
        #[arg(short, long)]
        flight: Option<String>,

        /// Origin airport
        #[arg(long)]
        origin: Option<String>,

        /// Destination airport
        #[arg(long)]
        destination: Option<String>,
    },

    /// Record a checkpoint scan
    Scan {
        /// Bag ID
        bag_id: String,

        /// Checkpoint stage (e.g. CHECKIN, security-check)
        checkpoint: String,

        /// Scan location
        #[arg(short, long)]
        location: Option<String>,

        /// Free-text status note
        #[arg(short, long)]
        note: Option<String>,

        /// Scanner that recorded the scan
        #[arg(short, long)]
        scanner: Option<String>,
    },

    /// Record a scan whose checkpoint is inferred
    AutoScan {
        /// Bag ID
        bag_id: String,

        /// Scanner whose checkpoint should be used
        #[arg(short, long)]
        scanner_id: Option<String>,

        /// Scan location
        #[arg(short, long)]
        location: Option<String>,
    },

    /// Show a bag's derived operational state
    Status {
        /// Bag ID
        bag_id: String,
    },

    /// Show a bag's scan history
    History {
        /// Bag ID
        bag_id: String,
    },

    /// List checkpoint stages in sequence order
    Checkpoints,

    /// Manage scanner devices
    #[command(subcommand)]
    Scanner(ScannerCommands),
}

/// Scanner management commands.
#[derive(Subcommand, Debug)]
pub enum ScannerCommands {
    /// Register a scanner
    Add {
        /// Scanner name
        #[arg(short, long)]
        name: String,

        /// Physical location
        #[arg(short, long)]
        location: String,

        /// Checkpoint stage the scanner records
        #[arg(short, long)]
        checkpoint: String,

        /// Device type (barcode, qr, rfid, manual)
        #[arg(short = 't', long, default_value = "barcode")]
        device_type: String,
    },

    /// List scanners
    List {
        /// Include inactive scanners
        #[arg(short, long)]
        all: bool,
    },

    /// Show a scanner
    Show {
        /// Scanner ID
        scanner_id: String,
    },

    /// Deactivate a scanner
    Deactivate {
        /// Scanner ID
        scanner_id: String,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Load the config file and apply the global CLI overrides.
pub fn resolve_config(cli: &Cli) -> Result<Config, TrackerError> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(backend) = &cli.backend {
        config.storage.backend = backend.parse::<BackendKind>()?;
    }
    if let Some(database) = &cli.database {
        config.storage.database.clone_from(database);
    }
    Ok(config)
}

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), TrackerError> {
    let mut config = resolve_config(&cli)?;
    let json_mode = cli.json_mode;

    if cli.verbose {
        tracing::info!(
            backend = config.storage.backend.as_str(),
            database = %config.storage.database.display(),
            "Resolved storage"
        );
    }

    match cli.command {
        Some(Commands::Server { host, port }) => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            cmd_server(&config).await
        }
        Some(Commands::Init { force }) => cmd_init(&config, force),
        Some(Commands::Register {
            tag,
            passenger,
            flight,
            origin,
            destination,
        }) => cmd_register(
            &config,
            json_mode,
            RegisterArgs {
                tag,
                passenger,
                flight,
                origin,
                destination,
            },
        ),
        Some(Commands::Scan {
            bag_id,
            checkpoint,
            location,
            note,
            scanner,
        }) => cmd_scan(
            &config,
            json_mode,
            ScanArgs {
                bag_id,
                checkpoint,
                location,
                note,
                scanner,
            },
        ),
        Some(Commands::AutoScan {
            bag_id,
            scanner_id,
            location,
        }) => cmd_auto_scan(&config, json_mode, &bag_id, scanner_id, location),
        Some(Commands::Status { bag_id }) => cmd_status(&config, json_mode, &bag_id),
        Some(Commands::History { bag_id }) => cmd_history(&config, json_mode, &bag_id),
        Some(Commands::Checkpoints) => cmd_checkpoints(&config, json_mode),
        Some(Commands::Scanner(command)) => cmd_scanner(&config, json_mode, command),
        None => {
            // No subcommand - list checkpoints by default
            cmd_checkpoints(&config, json_mode)
        }
    }
}

//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//!
//! Every command opens the configured store, performs one operation and
//! prints the result as text, or as pretty JSON in `--json-mode`.

use super::ScannerCommands;
use crate::api;
use crate::config::{BackendKind, Config};
use bagtrack_core::{
    AutoScanRequest, BagId, BagStatus, CheckpointEvent, CheckpointStage, DeviceType, NewBag,
    NewCheckpoint, NewScanner, Scanner, ScannerId, Tracker, TrackerError,
};
use chrono::Utc;
use serde::Serialize;

// =============================================================================
// ARGUMENT BUNDLES
// =============================================================================

/// Arguments of `register`.
#[derive(Debug, Clone)]
pub struct RegisterArgs {
    pub tag: String,
    pub passenger: Option<String>,
    pub flight: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
}

/// Arguments of `scan`.
#[derive(Debug, Clone)]
pub struct ScanArgs {
    pub bag_id: String,
    pub checkpoint: String,
    pub location: Option<String>,
    pub note: Option<String>,
    pub scanner: Option<String>,
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(config: &Config) -> Result<(), TrackerError> {
    let tracker = config.open_tracker()?;
    let host = &config.server.host;
    let port = config.server.port;

    println!("Bagtrack Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", host);
    println!("  Port:     {}", port);
    println!("  Backend:  {}", config.storage.backend.as_str());
    if config.storage.backend == BackendKind::Redb {
        println!("  Database: {:?}", config.storage.database);
    }
    println!();
    println!("Endpoints:");
    println!("  GET  /health                 - Health check");
    println!("  GET  /checkpoints            - Checkpoint stages");
    println!("  POST /registerBag            - Register a bag");
    println!("  POST /scanCheckpoint         - Record a scan");
    println!("  GET  /getStatus/{{bag_id}}     - Bag status");
    println!("  POST /scan/auto              - Auto scan");
    println!("  POST /scan/batch             - Batch scan");
    println!("  GET  /scanners               - List scanners");
    println!("  POST /scanners               - Register a scanner");
    println!("  GET  /scanners/{{scanner_id}}  - Scanner detail");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, tracker).await
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new empty database.
pub fn cmd_init(config: &Config, force: bool) -> Result<(), TrackerError> {
    if config.storage.backend == BackendKind::Memory {
        println!("Memory backend needs no initialization");
        return Ok(());
    }

    let db_path = &config.storage.database;
    if db_path.exists() {
        if !force {
            return Err(TrackerError::InvalidInput(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(db_path)
            .map_err(|e| TrackerError::IoError(format!("Remove {:?}: {}", db_path, e)))?;
    }

    let _tracker = Tracker::with_redb(db_path)?;
    println!("Initialized new redb database at {:?}", db_path);
    Ok(())
}

// =============================================================================
// BAG COMMANDS
// =============================================================================

/// Register a bag.
pub fn cmd_register(config: &Config, json_mode: bool, args: RegisterArgs) -> Result<(), TrackerError> {
    let mut tracker = config.open_tracker()?;
    let new_bag = NewBag {
        tag_number: args.tag,
        passenger_name: args.passenger,
        flight_number: args.flight,
        origin: args.origin,
        destination: args.destination,
    };
    let bag = tracker.register_bag(new_bag, Utc::now())?;

    if json_mode {
        print_json(&bag);
        return Ok(());
    }

    println!("Registered bag {}", bag.id);
    println!("  Tag:    {}", bag.tag_number);
    if let Some(flight) = &bag.flight_number {
        println!("  Flight: {}", flight);
    }
    Ok(())
}

/// Show a bag's derived operational state.
pub fn cmd_status(config: &Config, json_mode: bool, bag_id: &str) -> Result<(), TrackerError> {
    let tracker = config.open_tracker()?;
    let status = tracker.bag_status(&BagId::new(bag_id), Utc::now())?;

    if json_mode {
        print_json(&status);
        return Ok(());
    }

    print_status(&status);
    Ok(())
}

fn print_status(status: &BagStatus) {
    let state = &status.operational_state;

    println!("Bag Status");
    println!("==========");
    println!("Bag:      {}", status.bag.id);
    println!("Tag:      {}", status.bag.tag_number);
    if let Some(flight) = &status.bag.flight_number {
        println!("Flight:   {}", flight);
    }
    println!();
    println!("Status:   {} ({})", state.status_label, state.operational_status.as_str());
    println!("Risk:     {}", state.risk_level.as_str());
    println!("Current:  {}", stage_or_dash(state.current_stage));
    println!("Next:     {}", stage_or_dash(state.expected_next_stage));
    match state.time_since_last_scan_minutes {
        Some(minutes) => println!("Elapsed:  {:.1} min", minutes),
        None => println!("Elapsed:  -"),
    }
    if state.is_delayed {
        println!("DELAYED");
    }
    println!();

    let completed: Vec<&str> = state.completed_stages.iter().map(|s| s.as_str()).collect();
    println!("Completed: {}", if completed.is_empty() { "-".to_string() } else { completed.join(" > ") });
}

/// Show a bag's scan history.
pub fn cmd_history(config: &Config, json_mode: bool, bag_id: &str) -> Result<(), TrackerError> {
    let tracker = config.open_tracker()?;
    let history = tracker.history(&BagId::new(bag_id))?;

    if json_mode {
        print_json(&history);
        return Ok(());
    }

    if history.is_empty() {
        println!("No scans recorded for {}", bag_id);
        return Ok(());
    }
    for event in &history {
        print_event(event);
    }
    Ok(())
}

// =============================================================================
// SCAN COMMANDS
// =============================================================================

/// Record a checkpoint scan.
pub fn cmd_scan(config: &Config, json_mode: bool, args: ScanArgs) -> Result<(), TrackerError> {
    let checkpoint = NewCheckpoint {
        bag_id: BagId::new(args.bag_id),
        checkpoint: args.checkpoint.parse()?,
        location: args.location,
        status_note: args.note,
        scanner_id: args.scanner.map(ScannerId::new),
        scanned_at: None,
    };

    let mut tracker = config.open_tracker()?;
    let event = tracker.scan(checkpoint, Utc::now())?;

    if json_mode {
        print_json(&event);
        return Ok(());
    }
    print!("Recorded ");
    print_event(&event);
    Ok(())
}

/// Record a scan whose checkpoint is inferred from the scanner or history.
pub fn cmd_auto_scan(
    config: &Config,
    json_mode: bool,
    bag_id: &str,
    scanner_id: Option<String>,
    location: Option<String>,
) -> Result<(), TrackerError> {
    let request = AutoScanRequest {
        bag_id: BagId::new(bag_id),
        scanner_id: scanner_id.map(ScannerId::new),
        location,
    };

    let mut tracker = config.open_tracker()?;
    let event = tracker.auto_scan(request, Utc::now())?;

    if json_mode {
        print_json(&event);
        return Ok(());
    }
    print!("Recorded ");
    print_event(&event);
    Ok(())
}

fn print_event(event: &CheckpointEvent) {
    let mut line = format!(
        "{}  {}",
        event.scanned_at.format("%Y-%m-%d %H:%M:%S"),
        event.checkpoint
    );
    if let Some(location) = &event.location {
        line.push_str(&format!("  @ {}", location));
    }
    if let Some(note) = &event.status_note {
        line.push_str(&format!("  ({})", note));
    }
    println!("{}", line);
}

// =============================================================================
// CHECKPOINTS COMMAND
// =============================================================================

/// List checkpoint stages with the expected time to the following stage.
pub fn cmd_checkpoints(config: &Config, json_mode: bool) -> Result<(), TrackerError> {
    let table = config.transition_table()?;
    let stages = CheckpointStage::ALL;

    if json_mode {
        let output: Vec<serde_json::Value> = stages
            .iter()
            .map(|stage| {
                serde_json::json!({
                    "stage": stage,
                    "display_name": stage.display_name(),
                    "terminal": stage.is_terminal(),
                })
            })
            .collect();
        print_json(&output);
        return Ok(());
    }

    println!("Checkpoint Stages");
    println!("=================");
    for stage in stages {
        let next = if stage.is_terminal() {
            "terminal".to_string()
        } else {
            match stage.next_sequential() {
                Some(next) => match table.lookup(stage, next).as_delta() {
                    Some(delta) => format!("{} min to {}", delta.num_minutes(), next),
                    None => format!("variable to {}", next),
                },
                None => "-".to_string(),
            }
        };
        println!("{:>2}. {:<22} {}", stage.index(), stage.as_str(), next);
    }
    Ok(())
}

// =============================================================================
// SCANNER COMMANDS
// =============================================================================

/// Dispatch a scanner subcommand.
pub fn cmd_scanner(
    config: &Config,
    json_mode: bool,
    command: ScannerCommands,
) -> Result<(), TrackerError> {
    let mut tracker = config.open_tracker()?;

    match command {
        ScannerCommands::Add {
            name,
            location,
            checkpoint,
            device_type,
        } => {
            let new_scanner = NewScanner {
                name,
                location,
                checkpoint: checkpoint.parse()?,
                device_type: device_type.parse::<DeviceType>()?,
            };
            let scanner = tracker.register_scanner(new_scanner, Utc::now())?;
            if json_mode {
                print_json(&scanner);
            } else {
                println!("Registered scanner {}", scanner.id);
                print_scanner(&scanner);
            }
        }
        ScannerCommands::List { all } => {
            let scanners = tracker.list_scanners(!all)?;
            if json_mode {
                print_json(&scanners);
            } else if scanners.is_empty() {
                println!("No scanners registered");
            } else {
                for scanner in &scanners {
                    print_scanner(scanner);
                }
            }
        }
        ScannerCommands::Show { scanner_id } => {
            let scanner = tracker.get_scanner(&ScannerId::new(scanner_id))?;
            if json_mode {
                print_json(&scanner);
            } else {
                print_scanner(&scanner);
            }
        }
        ScannerCommands::Deactivate { scanner_id } => {
            let scanner = tracker.set_scanner_active(&ScannerId::new(scanner_id), false)?;
            if json_mode {
                print_json(&scanner);
            } else {
                println!("Deactivated scanner {}", scanner.id);
            }
        }
    }
    Ok(())
}

fn print_scanner(scanner: &Scanner) {
    println!(
        "{}  {:<20} {:<22} {:<8} {}{}",
        scanner.id,
        scanner.name,
        scanner.checkpoint,
        scanner.device_type.as_str(),
        scanner.location,
        if scanner.is_active { "" } else { "  [inactive]" }
    );
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn stage_or_dash(stage: Option<CheckpointStage>) -> &'static str {
    stage.map_or("-", CheckpointStage::as_str)
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

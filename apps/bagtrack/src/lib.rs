//! # Bagtrack
//!
//! HTTP API, CLI and configuration around `bagtrack-core`.

pub mod api;
pub mod cli;
pub mod config;

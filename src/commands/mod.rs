//! Command implementations for the CLI
//!
//! - demo: Emit synthetic telemetry through the pipeline
//! - config: Configuration display and validation

pub mod config;
pub mod demo;

//! Cadence Daemon
//!
//! Headless host for the playback core. It queues tracks given on the
//! command line, drives a clock-only engine and takes operator commands
//! from stdin, persisting history and statistics through `cadence-storage`.

pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod player;

pub use commands::{parse_track, Command};
pub use config::DaemonConfig;
pub use engine::{local_collaborators, EngineClock, SilentEngine};
pub use error::{DaemonError, Result};
pub use player::{Daemon, Flow, LogPublisher};

//! Cadence - Playback Orchestration
//!
//! Owns the current playback state, mediates play/pause/seek/skip intents
//! against a platform audio engine and focus arbiter, and fans every track
//! change out into ordered, asynchronous persistence side effects.
//!
//! This crate provides:
//! - Playback state machine with immutable snapshots
//! - Orchestrator façade driving engine, focus, route-change and host lifecycle
//! - Sequential event pipeline (last played, most played, history, favorites)
//! - Debounced, latest-wins queue broadcaster
//!
//! # Architecture
//!
//! `cadence-playback` never renders audio or touches a database:
//! - The engine, focus arbiter, route-change notifier and host lifecycle are
//!   traits implemented by the host (see [`collaborators`])
//! - Persistence goes through the gateway traits in `cadence-core`
//! - Background work runs on the tokio runtime carried by [`SessionContext`]
//!
//! # Example
//!
//! ```rust
//! use cadence_playback::{PlaybackStateMachine, PlaybackState, QueuePosition};
//!
//! let mut machine = PlaybackStateMachine::new(1.0).unwrap();
//! machine.prepare(42, 1_500);
//! let snapshot = machine.toggle_skip_actions(QueuePosition::new(0, 3));
//!
//! assert_eq!(snapshot.state, PlaybackState::Preparing);
//! assert!(!snapshot.can_skip_previous);
//! assert!(snapshot.can_skip_next);
//! ```

pub mod collaborators;
mod error;
mod events;
mod orchestrator;
mod pipeline;
mod queue_broadcaster;
mod session;
mod state;
pub mod types;

// Public exports
pub use collaborators::{
    AudioEngine, AudioFocus, EngineError, EngineResult, HostLifecycle, NoisyReceiver,
    PlayerCollaborators, PublishError, QueuePublisher, QueueWatcher,
};
pub use error::{PlaybackError, Result};
pub use events::{PlaybackEvent, PlayerListener};
pub use orchestrator::PlaybackOrchestrator;
pub use pipeline::{EventPipeline, ShutdownMode};
pub use queue_broadcaster::QueueBroadcaster;
pub use session::{PlaybackSession, SessionContext};
pub use state::{skip_actions, PlaybackStateMachine, SharedPlayerState};
pub use types::{
    MediaEntity, PlaybackConfig, PlaybackSnapshot, PlaybackState, PlayerTrack, QueueEntry,
    QueuePosition, QueueUpdate, SkipDirection, SkipType,
};

//! Playback state machine
//!
//! Owns the authoritative [`PlaybackSnapshot`]. Every transition replaces
//! the snapshot as a whole; readers only ever see immutable copies.

use crate::error::{PlaybackError, Result};
use crate::types::{PlaybackSnapshot, PlaybackState, QueuePosition, SkipDirection};
use cadence_core::TrackId;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

/// Skip availability for a track at `index` in a queue of `len` tracks
///
/// Returns `(can_skip_previous, can_skip_next)`.
pub fn skip_actions(len: usize, index: usize) -> (bool, bool) {
    let can_skip_previous = len > 0 && index > 0;
    let can_skip_next = index.saturating_add(1) < len;
    (can_skip_previous, can_skip_next)
}

/// Validate a speed multiplier
pub(crate) fn check_speed(speed: f32) -> Result<f32> {
    if speed.is_finite() && speed > 0.0 {
        Ok(speed)
    } else {
        Err(PlaybackError::InvalidSpeed(speed))
    }
}

/// Transition logic over a single snapshot
///
/// Not thread-safe by itself. The orchestrator is its only writer; the
/// queue broadcaster only touches active slot bookkeeping through
/// [`SharedPlayerState`].
#[derive(Debug, Clone)]
pub struct PlaybackStateMachine {
    snapshot: PlaybackSnapshot,
}

impl PlaybackStateMachine {
    /// Create an idle machine with the given initial speed
    pub fn new(speed: f32) -> Result<Self> {
        Ok(Self {
            snapshot: PlaybackSnapshot {
                speed: check_speed(speed)?,
                ..PlaybackSnapshot::default()
            },
        })
    }

    pub fn snapshot(&self) -> &PlaybackSnapshot {
        &self.snapshot
    }

    /// Load `track_id` at `bookmark_ms`
    ///
    /// Moves to `Preparing`, clears any pending skip and resets the skip
    /// flags until the queue position is known. No side effects.
    pub fn prepare(&mut self, track_id: TrackId, bookmark_ms: u64) -> PlaybackSnapshot {
        self.snapshot = PlaybackSnapshot {
            state: PlaybackState::Preparing,
            track_id: Some(track_id),
            bookmark_ms,
            duration_ms: 0,
            can_skip_previous: false,
            can_skip_next: false,
            pending_skip: None,
            ..self.snapshot.clone()
        };
        self.snapshot.clone()
    }

    /// General transition
    ///
    /// A `track_id` loads that track and resolves any pending skip. The
    /// bookmark is clamped to the known track duration.
    ///
    /// # Errors
    /// * `InvalidTransition` - `Preparing` requested while no track was ever loaded
    /// * `InvalidSpeed` - `speed` is not a finite positive multiplier
    pub fn update(
        &mut self,
        state: PlaybackState,
        bookmark_ms: u64,
        track_id: Option<TrackId>,
        speed: Option<f32>,
    ) -> Result<PlaybackSnapshot> {
        if state == PlaybackState::Preparing
            && track_id.is_none()
            && self.snapshot.track_id.is_none()
        {
            return Err(PlaybackError::invalid_transition(
                "cannot enter Preparing before a track was prepared",
            ));
        }
        let speed = speed.map(check_speed).transpose()?;

        let mut next = self.snapshot.clone();
        next.state = state;
        if let Some(track_id) = track_id {
            if next.track_id != Some(track_id) {
                next.duration_ms = 0;
            }
            next.track_id = Some(track_id);
            next.pending_skip = None;
        }
        if let Some(speed) = speed {
            next.speed = speed;
        }
        next.bookmark_ms = clamp_bookmark(bookmark_ms, next.duration_ms);

        self.snapshot = next;
        Ok(self.snapshot.clone())
    }

    /// Record a skip intent
    ///
    /// The loaded track does not change until a later prepare or update
    /// supplies the resolved track.
    pub fn skip_to(&mut self, forward: bool) -> PlaybackSnapshot {
        self.snapshot.pending_skip = Some(if forward {
            SkipDirection::Next
        } else {
            SkipDirection::Previous
        });
        self.snapshot.clone()
    }

    /// Recompute skip flags from the queue position
    pub fn toggle_skip_actions(&mut self, position: QueuePosition) -> PlaybackSnapshot {
        let (previous, next) = skip_actions(position.len, position.index);
        self.snapshot.can_skip_previous = previous;
        self.snapshot.can_skip_next = next;
        self.snapshot.clone()
    }

    /// Record the loaded track's duration, clamping the bookmark to it
    pub fn set_track_duration(&mut self, duration_ms: u64) -> PlaybackSnapshot {
        self.snapshot.duration_ms = duration_ms;
        self.snapshot.bookmark_ms = clamp_bookmark(self.snapshot.bookmark_ms, duration_ms);
        self.snapshot.clone()
    }

    /// Change speed without touching play state
    pub fn set_speed(&mut self, speed: f32) -> Result<PlaybackSnapshot> {
        self.snapshot.speed = check_speed(speed)?;
        Ok(self.snapshot.clone())
    }

    /// Active slot bookkeeping after a queue publication
    ///
    /// Skip flags follow the new slot so they match the published queue.
    pub fn update_active_queue_slot(&mut self, slot: usize, queue_len: usize) -> PlaybackSnapshot {
        self.snapshot.active_queue_slot = Some(slot);
        let (previous, next) = skip_actions(queue_len, slot);
        self.snapshot.can_skip_previous = previous;
        self.snapshot.can_skip_next = next;
        self.snapshot.clone()
    }

    /// Record the track a published queue marks as active
    ///
    /// A different track invalidates the known duration.
    pub fn set_active_track(&mut self, track_id: TrackId) -> PlaybackSnapshot {
        if self.snapshot.track_id != Some(track_id) {
            self.snapshot.track_id = Some(track_id);
            self.snapshot.duration_ms = 0;
        }
        self.snapshot.clone()
    }

    /// Halt after an engine failure; the track stays recorded
    pub fn halt(&mut self) -> PlaybackSnapshot {
        self.snapshot.state = PlaybackState::Idle;
        self.snapshot.pending_skip = None;
        self.snapshot.clone()
    }
}

fn clamp_bookmark(bookmark_ms: u64, duration_ms: u64) -> u64 {
    if duration_ms > 0 {
        bookmark_ms.min(duration_ms)
    } else {
        bookmark_ms
    }
}

/// State machine shared between the orchestrator and the queue broadcaster
///
/// Transitions hold the lock only while the closure runs and then publish
/// the resulting snapshot to subscribers.
#[derive(Debug, Clone)]
pub struct SharedPlayerState {
    machine: Arc<Mutex<PlaybackStateMachine>>,
    snapshots: Arc<watch::Sender<PlaybackSnapshot>>,
}

impl SharedPlayerState {
    pub fn new(machine: PlaybackStateMachine) -> Self {
        let (snapshots, _) = watch::channel(machine.snapshot().clone());
        Self {
            machine: Arc::new(Mutex::new(machine)),
            snapshots: Arc::new(snapshots),
        }
    }

    /// Apply a transition and publish the snapshot it leaves behind
    pub fn transition<T>(&self, f: impl FnOnce(&mut PlaybackStateMachine) -> T) -> T {
        let mut machine = self.machine.lock().unwrap_or_else(PoisonError::into_inner);
        let out = f(&mut machine);
        let snapshot = machine.snapshot().clone();
        drop(machine);

        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
        out
    }

    /// Copy of the current snapshot
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.machine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
            .clone()
    }

    /// Receiver that observes every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshots.subscribe()
    }
}

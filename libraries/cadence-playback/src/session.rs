//! Playback session wiring
//!
//! A [`SessionContext`] carries everything session-scoped (runtime handle,
//! cancellation, persistence gateways, configuration) and is passed to
//! every component explicitly. [`PlaybackSession`] assembles the
//! orchestrator, the event pipeline and the queue broadcaster around it.

use crate::collaborators::{PlayerCollaborators, QueuePublisher, QueueWatcher};
use crate::error::Result;
use crate::orchestrator::PlaybackOrchestrator;
use crate::pipeline::{EventPipeline, ShutdownMode};
use crate::queue_broadcaster::QueueBroadcaster;
use crate::state::{check_speed, PlaybackStateMachine, SharedPlayerState};
use crate::types::{PlaybackConfig, PlaybackSnapshot, QueueUpdate};
use cadence_core::Gateways;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Session-scoped dependencies shared by all playback components
#[derive(Debug, Clone)]
pub struct SessionContext {
    runtime: Handle,
    cancel: CancellationToken,
    gateways: Gateways,
    config: PlaybackConfig,
}

impl SessionContext {
    pub fn new(runtime: Handle, gateways: Gateways, config: PlaybackConfig) -> Self {
        Self {
            runtime,
            cancel: CancellationToken::new(),
            gateways,
            config,
        }
    }

    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    /// Token cancelled at session teardown; components derive child tokens
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn gateways(&self) -> &Gateways {
        &self.gateways
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Cancel every component spawned from this context
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// A running playback session
pub struct PlaybackSession {
    context: SessionContext,
    orchestrator: PlaybackOrchestrator,
    pipeline: Arc<EventPipeline>,
    broadcaster: QueueBroadcaster,
}

impl PlaybackSession {
    /// Wire up a session
    ///
    /// The saved playback speed is restored from preferences when present
    /// and valid; otherwise the configured default applies.
    pub async fn start(
        context: SessionContext,
        collaborators: PlayerCollaborators,
        publisher: Arc<dyn QueuePublisher>,
        watchers: Vec<Arc<dyn QueueWatcher>>,
    ) -> Result<Self> {
        let default_speed = context.config().default_speed;
        let speed = match context.gateways().preferences.playback_speed().await {
            Ok(Some(saved)) if check_speed(saved).is_ok() => saved,
            Ok(Some(saved)) => {
                warn!(saved, "Ignoring invalid saved playback speed");
                default_speed
            }
            Ok(None) => default_speed,
            Err(e) => {
                warn!(error = %e, "Failed to load playback speed");
                default_speed
            }
        };

        let state = SharedPlayerState::new(PlaybackStateMachine::new(speed)?);
        let mut orchestrator = PlaybackOrchestrator::with_state(collaborators, state.clone());

        let pipeline = EventPipeline::spawn(&context);
        orchestrator.add_listener(pipeline.clone());

        let broadcaster = QueueBroadcaster::spawn(&context, state, publisher, watchers);

        info!(speed, "Playback session started");
        Ok(Self {
            context,
            orchestrator,
            pipeline,
            broadcaster,
        })
    }

    pub fn orchestrator(&self) -> &PlaybackOrchestrator {
        &self.orchestrator
    }

    /// Mutable access for playback intents
    pub fn orchestrator_mut(&mut self) -> &mut PlaybackOrchestrator {
        &mut self.orchestrator
    }

    pub fn pipeline(&self) -> &Arc<EventPipeline> {
        &self.pipeline
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.orchestrator.snapshot()
    }

    /// Forward a queue replacement to the broadcaster
    pub fn on_next(&self, update: QueueUpdate) -> Result<()> {
        self.broadcaster.on_next(update)
    }

    /// Change speed and persist it; a failed write is logged only
    pub async fn set_playback_speed(&mut self, speed: f32) -> Result<()> {
        self.orchestrator.set_playback_speed(speed)?;
        if let Err(e) = self
            .context
            .gateways()
            .preferences
            .set_playback_speed(speed)
            .await
        {
            warn!(speed, error = %e, "Failed to save playback speed");
        }
        Ok(())
    }

    /// Wait for queued side effects to land
    pub async fn flush(&self) -> Result<()> {
        self.pipeline.flush().await
    }

    /// Tear the session down
    ///
    /// The orchestrator is released first so no new events arrive, then
    /// the broadcaster and the pipeline stop.
    pub async fn shutdown(mut self, mode: ShutdownMode) {
        self.orchestrator.release();
        self.orchestrator.stop_host();
        self.broadcaster.shutdown().await;
        self.pipeline.shutdown(mode).await;
        self.context.cancel();
        debug!(?mode, "Playback session shut down");
    }
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("orchestrator", &self.orchestrator)
            .field("pipeline", &self.pipeline)
            .field("broadcaster", &self.broadcaster)
            .finish_non_exhaustive()
    }
}

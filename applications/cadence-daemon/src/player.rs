//! Queue-driven player loop on top of a playback session

use crate::commands::{Command, HELP};
use crate::config::DaemonConfig;
use crate::engine::{local_collaborators, EngineClock};
use crate::error::{DaemonError, Result};
use cadence_core::{FavoriteState, FavoriteType, Gateways, PreferencesGateway};
use cadence_playback::{
    MediaEntity, PlaybackError, PlaybackSession, PlaybackSnapshot, PlayerTrack, PublishError,
    QueueEntry, QueuePosition, QueuePublisher, QueueUpdate, SessionContext, ShutdownMode,
    SkipType,
};
use cadence_storage::SqliteLibrary;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

/// What the input loop should do after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Publishes the queue to the log
#[derive(Debug, Default)]
pub struct LogPublisher;

impl QueuePublisher for LogPublisher {
    fn publish_queue(&self, queue: &[QueueEntry]) -> std::result::Result<(), PublishError> {
        info!(entries = queue.len(), "Queue published");
        for entry in queue {
            debug!(
                position = entry.position_in_queue,
                track_id = entry.track_id,
                title = %entry.title,
                "Queue entry"
            );
        }
        Ok(())
    }
}

/// Headless player: a fixed queue, one session, and the engine clock
pub struct Daemon {
    session: PlaybackSession,
    library: Arc<SqliteLibrary>,
    queue: Vec<MediaEntity>,
    index: usize,
    clock: EngineClock,
    restart_threshold_ms: u64,
}

impl Daemon {
    /// Start a session over `library` and prepare the queue
    ///
    /// When the last loaded track is part of the queue, it is prepared
    /// again so `play` picks up where the previous run stopped.
    pub async fn start(
        config: &DaemonConfig,
        library: Arc<SqliteLibrary>,
        queue: Vec<MediaEntity>,
    ) -> Result<Self> {
        let context = SessionContext::new(
            Handle::current(),
            Gateways::from_store(library.clone()),
            config.playback.clone(),
        );
        let clock = EngineClock::default();
        let session = PlaybackSession::start(
            context,
            local_collaborators(clock.clone()),
            Arc::new(LogPublisher),
            Vec::new(),
        )
        .await?;

        let index = match library.last_metadata().await {
            Ok(Some(last)) => queue.iter().position(|track| track.id == last.id).unwrap_or(0),
            Ok(None) => 0,
            Err(e) => {
                warn!(error = %e, "Failed to load last metadata");
                0
            }
        };

        let mut daemon = Self {
            session,
            library,
            queue,
            index,
            clock,
            restart_threshold_ms: config.player.restart_threshold_ms,
        };

        if !daemon.queue.is_empty() {
            daemon.publish_queue(true)?;
            let track = daemon.track_at(daemon.index);
            match daemon.session.orchestrator_mut().on_prepare(&track) {
                Ok(()) => info!(index = daemon.index, track_id = track.entity.id, "Queue prepared"),
                // Reported by the orchestrator; the operator can pick another track
                Err(PlaybackError::EngineFailure(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(daemon)
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.session.snapshot()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn clock(&self) -> &EngineClock {
        &self.clock
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    /// Apply one operator command
    ///
    /// Engine failures are reported and playback continues with the next
    /// intent; other playback errors are returned.
    pub async fn handle(&mut self, command: Command) -> Result<Flow> {
        let result = self.dispatch(command).await;
        match result {
            Err(DaemonError::Playback(PlaybackError::EngineFailure(e))) => {
                error!(error = %e, "Engine failure");
                Ok(Flow::Continue)
            }
            other => other,
        }
    }

    async fn dispatch(&mut self, command: Command) -> Result<Flow> {
        let step = self.session.context().config().seek_step_seconds;
        match command {
            Command::Play(index) => {
                let index = index.unwrap_or(self.index);
                self.play_at(index, SkipType::None)?;
            }
            Command::Pause => self.session.orchestrator_mut().on_pause(false, false)?,
            Command::Resume => self.session.orchestrator_mut().on_resume()?,
            Command::Seek(seconds) => self
                .session
                .orchestrator_mut()
                .on_seek(seconds.saturating_mul(1_000))?,
            Command::Forward(seconds) => self
                .session
                .orchestrator_mut()
                .on_forward_by(seconds.unwrap_or(step))?,
            Command::Replay(seconds) => self
                .session
                .orchestrator_mut()
                .on_replay_by(seconds.unwrap_or(step))?,
            Command::Next => self.skip_next(SkipType::SkipNext)?,
            Command::Previous => self.skip_previous()?,
            Command::Speed(speed) => self.session.set_playback_speed(speed).await?,
            Command::Volume(volume) => self.session.orchestrator_mut().set_volume(volume),
            Command::Favorite => self.toggle_favorite().await?,
            Command::Status => println!("{}", self.status_line()),
            Command::Help => println!("{HELP}"),
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    /// Advance when the engine clock reaches the end of the track
    pub fn tick(&mut self) -> Result<()> {
        if !self.clock.finished() {
            return Ok(());
        }
        if self.index + 1 < self.queue.len() {
            debug!(index = self.index, "Track ended, advancing");
            let result = self.skip_next(SkipType::TrackEnded);
            if result.is_err() {
                // Keep the failed track from being reported as ended again
                self.clock.stop();
            }
            result
        } else {
            info!("End of queue");
            self.session.orchestrator_mut().on_pause(true, true)?;
            Ok(())
        }
    }

    fn skip_next(&mut self, skip: SkipType) -> Result<()> {
        if self.index + 1 >= self.queue.len() {
            return Err(DaemonError::Command("already at the last track".to_string()));
        }
        self.play_at(self.index + 1, skip)
    }

    fn skip_previous(&mut self) -> Result<()> {
        if self.clock.position_ms() > self.restart_threshold_ms || self.index == 0 {
            self.session.orchestrator_mut().on_seek(0)?;
            return Ok(());
        }
        self.play_at(self.index - 1, SkipType::SkipPrevious)
    }

    fn play_at(&mut self, index: usize, skip: SkipType) -> Result<()> {
        if index >= self.queue.len() {
            return Err(DaemonError::Command(format!(
                "no track at {index} (queue has {})",
                self.queue.len()
            )));
        }
        let mut track = self.track_at(index);
        // Resuming the prepared track keeps its bookmark
        if index == self.index && skip == SkipType::None {
            track.bookmark_ms = self.session.snapshot().bookmark_ms;
        }

        let orchestrator = self.session.orchestrator_mut();
        match skip {
            SkipType::None => orchestrator.on_play(&track)?,
            skip => orchestrator.on_play_next(&track, skip)?,
        }
        self.index = index;
        self.publish_queue(skip == SkipType::None)?;
        Ok(())
    }

    async fn toggle_favorite(&mut self) -> Result<()> {
        let Some(track) = self.queue.get(self.index) else {
            return Err(DaemonError::Command("queue is empty".to_string()));
        };
        let kind = FavoriteType::for_item(track.is_podcast);
        let now_favorite = self.library.toggle_favorite(track.id, kind).await?;
        info!(track_id = track.id, now_favorite, "Favorite toggled");
        Ok(())
    }

    fn track_at(&self, index: usize) -> PlayerTrack {
        PlayerTrack {
            entity: self.queue[index].clone(),
            bookmark_ms: 0,
            position: QueuePosition::new(index, self.queue.len()),
        }
    }

    fn publish_queue(&self, immediate: bool) -> Result<()> {
        let queue = self
            .queue
            .iter()
            .enumerate()
            .map(|(position, track)| QueueEntry {
                track_id: track.id,
                title: track.title.clone(),
                artist: track.artist.clone(),
                position_in_queue: position,
            })
            .collect();
        self.session.on_next(QueueUpdate {
            active_id: self.index,
            queue,
            immediate,
        })?;
        Ok(())
    }

    pub fn status_line(&self) -> String {
        let snapshot = self.session.snapshot();
        let favorite = self
            .library
            .favorite_state()
            .filter(|record| Some(record.track_id) == snapshot.track_id)
            .map_or("?", |record| match record.state {
                FavoriteState::Favorite => "yes",
                FavoriteState::NotFavorite => "no",
            });
        format!(
            "{:?} track={} pos={}/{}ms speed={} slot={}/{} favorite={}",
            snapshot.state,
            snapshot.track_id.map_or_else(|| "-".to_string(), |id| id.to_string()),
            self.clock.position_ms(),
            snapshot.duration_ms,
            snapshot.speed,
            snapshot.active_queue_slot.map_or(0, |slot| slot + 1),
            self.queue.len(),
            favorite,
        )
    }

    /// Flush pending side effects and end the session
    pub async fn shutdown(self) {
        if let Err(e) = self.session.flush().await {
            warn!(error = %e, "Flush before shutdown failed");
        }
        self.session.shutdown(ShutdownMode::Drain).await;
        info!("Daemon stopped");
    }
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Daemon")
            .field("session", &self.session)
            .field("index", &self.index)
            .field("queue_len", &self.queue.len())
            .finish_non_exhaustive()
    }
}

//! Daemon integration tests
//!
//! Run a full daemon against a REAL `SQLite` file in a temporary directory.

use cadence_core::FavoriteState;
use cadence_daemon::{parse_track, Command, Daemon, DaemonConfig, Flow};
use cadence_playback::{MediaEntity, PlaybackState};
use cadence_storage::{history, settings, SqliteLibrary};
use std::sync::Arc;
use tempfile::TempDir;

struct Harness {
    config: DaemonConfig,
    db_url: String,
    _temp_dir: TempDir,
}

impl Harness {
    fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_url = format!("sqlite://{}", temp_dir.path().join("daemon.db").display());
        let mut config = DaemonConfig::default();
        config.storage.database_url = db_url.clone();
        Self {
            config,
            db_url,
            _temp_dir: temp_dir,
        }
    }

    async fn library(&self) -> Arc<SqliteLibrary> {
        Arc::new(
            SqliteLibrary::open(&self.db_url, self.config.library.clone())
                .await
                .expect("Failed to open library"),
        )
    }

    async fn daemon(&self, library: Arc<SqliteLibrary>) -> Daemon {
        Daemon::start(&self.config, library, album_queue())
            .await
            .expect("Failed to start daemon")
    }
}

fn album_queue() -> Vec<MediaEntity> {
    ["ALBUMS/42|1@60", "ALBUMS/42|2@60", "ALBUMS/42|3@60"]
        .iter()
        .map(|arg| parse_track(arg, 180).unwrap())
        .collect()
}

#[tokio::test]
async fn start_prepares_the_first_track() {
    let harness = Harness::new();
    let daemon = harness.daemon(harness.library().await).await;

    let snapshot = daemon.snapshot();
    assert_eq!(snapshot.state, PlaybackState::Preparing);
    assert_eq!(snapshot.track_id, Some(1));
    assert_eq!(snapshot.duration_ms, 60_000);
    assert!(!snapshot.can_skip_previous);
    assert!(snapshot.can_skip_next);

    daemon.shutdown().await;
}

#[tokio::test]
async fn playing_and_skipping_records_history() {
    let harness = Harness::new();
    let library = harness.library().await;
    let mut daemon = harness.daemon(library.clone()).await;

    daemon.handle(Command::Play(None)).await.unwrap();
    daemon.handle(Command::Next).await.unwrap();
    daemon.handle(Command::Next).await.unwrap();
    assert!(daemon.handle(Command::Next).await.is_err());

    let snapshot = daemon.snapshot();
    assert_eq!(snapshot.state, PlaybackState::Playing);
    assert_eq!(snapshot.track_id, Some(3));
    assert!(!snapshot.can_skip_next);
    assert_eq!(daemon.index(), 2);

    daemon.session().flush().await.unwrap();
    for id in 1..=3 {
        assert_eq!(history::play_count(library.pool(), id).await.unwrap(), 1);
    }
    let last = settings::last_metadata(library.pool()).await.unwrap();
    assert_eq!(last.map(|m| m.id), Some(3));

    daemon.shutdown().await;
}

#[tokio::test]
async fn previous_restarts_track_past_threshold() {
    let harness = Harness::new();
    let mut daemon = harness.daemon(harness.library().await).await;

    daemon.handle(Command::Play(Some(1))).await.unwrap();
    daemon.handle(Command::Seek(20)).await.unwrap();
    daemon.handle(Command::Previous).await.unwrap();
    assert_eq!(daemon.snapshot().track_id, Some(2));
    assert!(daemon.clock().position_ms() < 20_000);

    daemon.handle(Command::Previous).await.unwrap();
    assert_eq!(daemon.snapshot().track_id, Some(1));
    assert_eq!(daemon.index(), 0);

    daemon.shutdown().await;
}

#[tokio::test]
async fn track_end_advances_the_queue() {
    let harness = Harness::new();
    let mut daemon = harness.daemon(harness.library().await).await;

    daemon.handle(Command::Play(None)).await.unwrap();
    daemon.tick().unwrap();
    assert_eq!(daemon.snapshot().track_id, Some(1));

    daemon.handle(Command::Seek(60)).await.unwrap();
    daemon.tick().unwrap();

    let snapshot = daemon.snapshot();
    assert_eq!(snapshot.track_id, Some(2));
    assert_eq!(snapshot.state, PlaybackState::Playing);
    assert_eq!(daemon.index(), 1);

    daemon.shutdown().await;
}

#[tokio::test]
async fn end_of_queue_pauses() {
    let harness = Harness::new();
    let mut daemon = harness.daemon(harness.library().await).await;

    daemon.handle(Command::Play(Some(2))).await.unwrap();
    daemon.handle(Command::Seek(60)).await.unwrap();
    daemon.tick().unwrap();

    assert_eq!(daemon.snapshot().state, PlaybackState::Paused);
    assert!(!daemon.clock().is_running());

    daemon.shutdown().await;
}

#[tokio::test]
async fn restart_resumes_the_last_track() {
    let harness = Harness::new();

    let mut daemon = harness.daemon(harness.library().await).await;
    daemon.handle(Command::Play(Some(1))).await.unwrap();
    daemon.shutdown().await;

    let daemon = harness.daemon(harness.library().await).await;
    assert_eq!(daemon.index(), 1);
    assert_eq!(daemon.snapshot().track_id, Some(2));
    daemon.shutdown().await;
}

#[tokio::test]
async fn speed_is_persisted_across_runs() {
    let harness = Harness::new();

    let mut daemon = harness.daemon(harness.library().await).await;
    daemon.handle(Command::Speed(1.5)).await.unwrap();
    assert!(daemon.handle(Command::Speed(0.0)).await.is_err());
    daemon.shutdown().await;

    let daemon = harness.daemon(harness.library().await).await;
    assert_eq!(daemon.snapshot().speed, 1.5);
    daemon.shutdown().await;
}

#[tokio::test]
async fn favorite_toggle_is_reflected_in_state() {
    let harness = Harness::new();
    let library = harness.library().await;
    let mut daemon = harness.daemon(library.clone()).await;
    daemon.session().flush().await.unwrap();
    assert_eq!(
        library.favorite_state().map(|record| record.state),
        Some(FavoriteState::NotFavorite)
    );

    daemon.handle(Command::Favorite).await.unwrap();

    assert_eq!(
        library.favorite_state().map(|record| record.state),
        Some(FavoriteState::Favorite)
    );
    assert!(daemon.status_line().contains("favorite=yes"));

    daemon.shutdown().await;
}

#[tokio::test]
async fn engine_failure_is_reported_and_playback_continues() {
    let harness = Harness::new();
    let queue = vec![
        parse_track("ALBUMS/42|1@0", 180).unwrap(),
        parse_track("ALBUMS/42|2@60", 180).unwrap(),
    ];
    let mut daemon = Daemon::start(&harness.config, harness.library().await, queue)
        .await
        .unwrap();
    assert_eq!(daemon.snapshot().state, PlaybackState::Idle);
    assert!(daemon.handle(Command::Play(None)).await.is_ok());
    assert_eq!(daemon.snapshot().state, PlaybackState::Idle);
    daemon.shutdown().await;

    let queue = vec![
        parse_track("ALBUMS/42|2@60", 180).unwrap(),
        parse_track("ALBUMS/42|1@0", 180).unwrap(),
    ];
    let mut daemon = Daemon::start(&harness.config, harness.library().await, queue)
        .await
        .unwrap();
    daemon.handle(Command::Play(None)).await.unwrap();

    assert_eq!(daemon.handle(Command::Next).await.unwrap(), Flow::Continue);
    assert_eq!(daemon.snapshot().state, PlaybackState::Idle);

    daemon.handle(Command::Play(Some(0))).await.unwrap();
    assert_eq!(daemon.snapshot().state, PlaybackState::Playing);

    daemon.shutdown().await;
}

//! Queue broadcaster
//!
//! Republishes the current queue to external observers. Requests go
//! through a single-slot, latest-wins mailbox: a new request overwrites
//! whatever is waiting, so a superseded queue is never dispatched.
//!
//! Non-immediate updates wait for the debounce interval; a newer update
//! arriving inside the window restarts it. Immediate updates dispatch at
//! once.

use crate::collaborators::{QueuePublisher, QueueWatcher};
use crate::error::{PlaybackError, Result};
use crate::session::SessionContext;
use crate::state::SharedPlayerState;
use crate::types::QueueUpdate;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Default)]
struct Mailbox {
    slot: Mutex<Option<QueueUpdate>>,
    notify: Notify,
}

impl Mailbox {
    fn put(&self, update: QueueUpdate) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(update);
        self.notify.notify_one();
    }

    fn take(&self) -> Option<QueueUpdate> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// Receivers of a dispatched queue
struct Outlets {
    publisher: Arc<dyn QueuePublisher>,
    watchers: Vec<Arc<dyn QueueWatcher>>,
    state: SharedPlayerState,
}

impl Outlets {
    fn dispatch(&self, update: &QueueUpdate) {
        debug!(
            active_id = update.active_id,
            len = update.queue.len(),
            "Dispatching queue"
        );

        // A failed publication never blocks later updates
        if let Err(e) = self.publisher.publish_queue(&update.queue) {
            warn!(error = %e, "Failed to publish queue");
        }
        for watcher in &self.watchers {
            watcher.on_queue_changed();
        }
        let len = update.queue.len();
        let active_track = update.active_entry().map(|entry| entry.track_id);
        self.state.transition(|sm| {
            if let Some(track_id) = active_track {
                sm.set_active_track(track_id);
            }
            sm.update_active_queue_slot(update.active_id, len)
        });
    }
}

pub struct QueueBroadcaster {
    mailbox: Arc<Mailbox>,
    cancel: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl QueueBroadcaster {
    /// Start the dispatch worker on the session runtime
    pub fn spawn(
        context: &SessionContext,
        state: SharedPlayerState,
        publisher: Arc<dyn QueuePublisher>,
        watchers: Vec<Arc<dyn QueueWatcher>>,
    ) -> Self {
        let mailbox = Arc::new(Mailbox::default());
        let cancel = context.cancel_token().child_token();
        let debounce = Duration::from_millis(context.config().queue_debounce_ms);
        let outlets = Outlets {
            publisher,
            watchers,
            state,
        };

        let worker = context.runtime().spawn(run(
            mailbox.clone(),
            outlets,
            debounce,
            cancel.clone(),
        ));

        Self {
            mailbox,
            cancel,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Replace the pending queue update
    pub fn on_next(&self, update: QueueUpdate) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(PlaybackError::SessionClosed);
        }
        self.mailbox.put(update);
        Ok(())
    }

    /// Stop the worker; a pending update is discarded
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            let _ = worker.await;
        }
    }
}

impl Drop for QueueBroadcaster {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for QueueBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueBroadcaster")
            .field("shut_down", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

async fn run(
    mailbox: Arc<Mailbox>,
    outlets: Outlets,
    debounce: Duration,
    cancel: CancellationToken,
) {
    loop {
        let Some(mut update) = next_update(&mailbox, &cancel).await else {
            break;
        };

        while !update.immediate {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                () = mailbox.notify.notified() => {
                    if let Some(newer) = mailbox.take() {
                        update = newer;
                    }
                }
                () = tokio::time::sleep(debounce) => {
                    // A request that raced the timer wins and restarts the window
                    match mailbox.take() {
                        Some(newer) => update = newer,
                        None => break,
                    }
                }
            }
        }

        outlets.dispatch(&update);
    }
    debug!("Queue broadcaster stopped");
}

async fn next_update(mailbox: &Mailbox, cancel: &CancellationToken) -> Option<QueueUpdate> {
    loop {
        if let Some(update) = mailbox.take() {
            return Some(update);
        }
        tokio::select! {
            biased;
            () = cancel.cancelled() => return None,
            () = mailbox.notify.notified() => {}
        }
    }
}

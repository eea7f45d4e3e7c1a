//! Background reload loop for list and table views.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use super::Fetch;
use crate::db::Database;

/// Reloads the patient list on a fixed interval until dropped.
///
/// The first fetch happens immediately. Later ticks compare the database
/// revision and skip the reload when nothing was written, reset, or altered
/// through the console since the last successful fetch.
pub struct Poller {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    /// Start polling, handing every fetch to `sink`.
    pub fn spawn<F>(db: Arc<Mutex<Database>>, interval: Duration, mut sink: F) -> std::io::Result<Self>
    where
        F: FnMut(Fetch) + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("patient-poller".into())
            .spawn(move || {
                let mut seen_revision = None;
                loop {
                    if let Some(fetch) = poll_once(&db, &mut seen_revision) {
                        sink(fetch);
                    }
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("patient poller stopped");
            })?;

        Ok(Self {
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Stop polling and wait for the loop to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("patient poller panicked");
            }
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// One tick. `None` means nothing changed since the last successful fetch.
fn poll_once(db: &Mutex<Database>, seen_revision: &mut Option<i64>) -> Option<Fetch> {
    let db = match db.lock() {
        Ok(db) => db,
        Err(e) => {
            warn!("patient database lock poisoned");
            *seen_revision = None;
            let message = format!("Lock poisoned: {}", e);
            let db = e.into_inner();
            return Some(Fetch::failed(&db, message));
        }
    };

    let revision = db.revision().ok();
    if revision.is_some() && revision == *seen_revision {
        return None;
    }

    let fetch = Fetch::run(&db);
    match &fetch.result {
        Ok(_) => *seen_revision = revision,
        Err(message) => {
            warn!(error = %message, "patient poll failed");
            *seen_revision = None;
        }
    }
    Some(fetch)
}

//! Quantum writer: construction, submission, shutdown.
//!
//! One writer owns one quantum file, named by the checkpoint transaction id
//! that opened it. Producers on arbitrary threads call `submit`; a single
//! worker thread performs every disk write and every flush-gated delivery.
//! `submit` never blocks the caller on disk I/O.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::message::{Mailbox, Message};
use crate::observability::Logger;

use super::errors::{QuantumError, QuantumResult};
use super::scheduler::SyncScheduler;
use super::window::MappedWindow;
use super::worker::{WorkItem, Worker};
use super::{DurabilityMode, QuantumConfig, QuantumState};

/// Append-only writer for one commit quantum.
///
/// Construction failures are bootstrap errors: the writer either starts
/// with a mapped window, a running worker and a running sync scheduler, or
/// not at all.
#[derive(Debug)]
pub struct QuantumWriter {
    checkpoint_id: u64,
    path: PathBuf,
    mode: DurabilityMode,
    state: QuantumState,
    delete_requested: bool,
    submit_tx: Option<Sender<WorkItem>>,
    scheduler: Option<SyncScheduler>,
    worker: Option<JoinHandle<QuantumResult<()>>>,
}

impl QuantumWriter {
    /// Creates the quantum file `<checkpoint_id>.log` under `dir`, maps the
    /// first window at offset 0, and starts the worker and sync scheduler.
    ///
    /// # Errors
    ///
    /// `QUANTA_BOOTSTRAP_FAILED` if the directory or file cannot be
    /// created, the first window cannot be mapped, or a thread cannot be
    /// spawned. Not recoverable locally.
    pub fn create(dir: &Path, checkpoint_id: u64, config: QuantumConfig) -> QuantumResult<Self> {
        fs::create_dir_all(dir).map_err(|e| {
            QuantumError::bootstrap(
                format!("failed to create quantum directory {}", dir.display()),
                e,
            )
        })?;

        let path = dir.join(format!("{checkpoint_id}.log"));
        let file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| {
                QuantumError::bootstrap(
                    format!("failed to create quantum file {}", path.display()),
                    e,
                )
            })?;

        // The file's existence must survive a crash along with its contents.
        File::open(dir)
            .and_then(|d| d.sync_all())
            .map_err(|e| {
                QuantumError::bootstrap(
                    format!("failed to sync quantum directory {}", dir.display()),
                    e,
                )
            })?;

        let window = MappedWindow::map(&file, 0, config.window_capacity).map_err(|e| {
            QuantumError::bootstrap(
                format!("failed to map first window of {}", path.display()),
                e,
            )
        })?;

        let sync_pending = Arc::new(AtomicBool::new(false));
        let (submit_tx, submit_rx) = mpsc::channel();

        let worker = Worker::new(
            file,
            window,
            config.window_capacity,
            config.mode,
            Arc::clone(&sync_pending),
            path.clone(),
        );
        let worker_handle = thread::Builder::new()
            .name(format!("quantum-worker-{checkpoint_id}"))
            .spawn(move || worker.run(submit_rx))
            .map_err(|e| QuantumError::bootstrap("failed to spawn worker thread", e))?;

        let scheduler = match SyncScheduler::start(
            config.flush_interval,
            submit_tx.clone(),
            sync_pending,
        ) {
            Ok(scheduler) => scheduler,
            Err(e) => {
                // Tear the worker back down before reporting.
                drop(submit_tx);
                let _ = worker_handle.join();
                return Err(QuantumError::bootstrap(
                    "failed to spawn sync scheduler thread",
                    e,
                ));
            }
        };

        let id = checkpoint_id.to_string();
        let path_str = path.display().to_string();
        Logger::info(
            "QUANTA_OPENED",
            &[
                ("checkpoint_id", id.as_str()),
                ("mode", mode_str(config.mode)),
                ("path", path_str.as_str()),
            ],
        );

        Ok(Self {
            checkpoint_id,
            path,
            mode: config.mode,
            state: QuantumState::Active,
            delete_requested: false,
            submit_tx: Some(submit_tx),
            scheduler: Some(scheduler),
            worker: Some(worker_handle),
        })
    }

    /// Submits one message for logging and eventual delivery.
    ///
    /// Always enqueues the message for the worker to serialize. Then,
    /// independently of queuing: in fire-and-forget mode, and for
    /// heartbeats in *either* mode, the message is delivered to
    /// `destination` before this call returns. Heartbeats encode no state
    /// that must survive a crash, and gating them on a flush would stall
    /// liveness detection.
    ///
    /// Never blocks on disk I/O. Submissions after `close` are dropped with
    /// a warning.
    pub fn submit(&self, message: Arc<dyn Message>, destination: Arc<dyn Mailbox>) {
        let Some(submit_tx) = &self.submit_tx else {
            self.log_dropped_submission(destination.id());
            return;
        };

        let deliver_now = self.mode == DurabilityMode::FireAndForget || message.is_heartbeat();

        let queued = submit_tx
            .send(WorkItem::Data {
                message: Arc::clone(&message),
                destination: Arc::clone(&destination),
            })
            .is_ok();
        if !queued {
            self.log_dropped_submission(destination.id());
            return;
        }

        if deliver_now {
            destination.deliver(message);
        }
    }

    /// Shuts the writer down, draining everything already submitted.
    ///
    /// Stops the sync scheduler, injects one final sync marker so every
    /// queued envelope is flushed and every pending delivery fires, then
    /// waits for the worker to exit. Idempotent: calling `close` on an
    /// already-closed writer is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the first `QUANTA_SYNC_FAILED` the worker recorded, if any.
    /// Close-time I/O failures beyond that are logged and swallowed.
    pub fn close(&mut self) -> QuantumResult<()> {
        if self.state != QuantumState::Active {
            return Ok(());
        }
        self.state = QuantumState::Closing;

        // No more timer-driven markers once this returns.
        if let Some(mut scheduler) = self.scheduler.take() {
            scheduler.stop();
        }

        if let Some(submit_tx) = self.submit_tx.take() {
            // Final marker: flush everything already queued and fire all
            // pending deliveries. A send failure means the worker is
            // already gone; the join below reports on it.
            let _ = submit_tx.send(WorkItem::Sync);
        }

        let result = match self.worker.take() {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                Err(QuantumError::close(
                    "worker thread panicked during shutdown",
                    io::Error::new(io::ErrorKind::Other, "worker panic"),
                ))
            }),
            None => Ok(()),
        };

        self.state = QuantumState::Closed;

        if self.delete_requested {
            self.remove_file();
        }

        result
    }

    /// Marks the quantum file for removal once this writer reaches
    /// `Closed`. Does not affect an open writer's ability to keep writing.
    /// If the writer is already closed, the file is removed immediately.
    pub fn delete(&mut self) {
        let path_str = self.path.display().to_string();
        Logger::info("QUANTA_DELETE_REQUESTED", &[("path", path_str.as_str())]);

        if self.state == QuantumState::Closed {
            self.remove_file();
        } else {
            self.delete_requested = true;
        }
    }

    /// Path of the quantum file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Checkpoint transaction id that opened this quantum.
    pub fn checkpoint_id(&self) -> u64 {
        self.checkpoint_id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> QuantumState {
        self.state
    }

    fn remove_file(&mut self) {
        self.delete_requested = false;
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != io::ErrorKind::NotFound {
                let path_str = self.path.display().to_string();
                let source = err.to_string();
                Logger::warn(
                    "QUANTA_DELETE_FAILED",
                    &[("path", path_str.as_str()), ("source", source.as_str())],
                );
            }
        }
    }

    fn log_dropped_submission(&self, destination_id: u32) {
        let destination = destination_id.to_string();
        let path_str = self.path.display().to_string();
        Logger::warn(
            "QUANTA_SUBMIT_AFTER_CLOSE",
            &[
                ("destination", destination.as_str()),
                ("path", path_str.as_str()),
            ],
        );
    }
}

impl Drop for QuantumWriter {
    fn drop(&mut self) {
        if self.state == QuantumState::Active {
            let _ = self.close();
        }
    }
}

fn mode_str(mode: DurabilityMode) -> &'static str {
    match mode {
        DurabilityMode::FireAndForget => "fire_and_forget",
        DurabilityMode::WaitForCommit => "wait_for_commit",
    }
}

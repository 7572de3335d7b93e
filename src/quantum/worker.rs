//! Worker loop: single-threaded serialization and sync orchestration.
//!
//! One worker thread per quantum writer performs all disk writes and all
//! flush-gated delivery callbacks. The mapped window and the pending
//! delivery list are owned by this thread alone, so neither needs a lock.
//!
//! Error tolerance: a single envelope that fails to encode or write is
//! logged and skipped; one bad message does not stop the log. A failed
//! force is different: the pending batch is withheld in full (never
//! partially delivered), the failure is logged at FATAL, and the first such
//! error is reported from `close`.

use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;

use crate::message::{Mailbox, Message};
use crate::observability::Logger;

use super::envelope::Envelope;
use super::errors::{QuantumError, QuantumResult};
use super::window::MappedWindow;
use super::DurabilityMode;

/// One item on the submission queue.
pub(crate) enum WorkItem {
    /// A message to serialize into the log.
    Data {
        /// The message itself; also handed to `destination` on delivery.
        message: Arc<dyn Message>,
        /// Where to deliver once the durability requirement is satisfied.
        destination: Arc<dyn Mailbox>,
    },
    /// Force the live window to stable storage and drain the pending list.
    /// Not logged; carries no destination.
    Sync,
}

/// A message written to the window but not yet confirmed durable.
struct PendingEntry {
    message: Arc<dyn Message>,
    destination: Arc<dyn Mailbox>,
}

/// State owned by the worker thread.
pub(crate) struct Worker {
    file: File,
    window: MappedWindow,
    window_capacity: usize,
    mode: DurabilityMode,
    pending: Vec<PendingEntry>,
    sync_pending: Arc<AtomicBool>,
    sync_error: Option<QuantumError>,
    path: PathBuf,
}

impl Worker {
    pub fn new(
        file: File,
        window: MappedWindow,
        window_capacity: usize,
        mode: DurabilityMode,
        sync_pending: Arc<AtomicBool>,
        path: PathBuf,
    ) -> Self {
        Self {
            file,
            window,
            window_capacity,
            mode,
            pending: Vec::new(),
            sync_pending,
            sync_error: None,
            path,
        }
    }

    /// Drains the submission queue until every sender is gone, then performs
    /// close-time cleanup and reports the first sync failure, if any.
    pub fn run(mut self, queue: Receiver<WorkItem>) -> QuantumResult<()> {
        while let Ok(item) = queue.recv() {
            match item {
                WorkItem::Data {
                    message,
                    destination,
                } => self.write_envelope(message, destination),
                WorkItem::Sync => self.service_sync(),
            }
        }
        self.finish()
    }

    /// Serializes one envelope into the live window, rotating first if the
    /// write would not fit. Failures are logged and the envelope skipped.
    fn write_envelope(&mut self, message: Arc<dyn Message>, destination: Arc<dyn Mailbox>) {
        let destination_id = destination.id();

        let payload = match message.encode() {
            Ok(payload) => payload,
            Err(err) => {
                self.log_append_failure(destination_id, "encode", &err);
                return;
            }
        };

        let envelope = match Envelope::new(destination_id, payload) {
            Ok(envelope) => envelope,
            Err(err) => {
                self.log_append_failure(destination_id, "frame", &err);
                return;
            }
        };

        let frame = envelope.encode();
        if self.window.try_write(&frame).is_err() {
            // Remaining capacity is insufficient: force the old window and
            // open the next one before writing.
            if let Err(err) = self.rotate() {
                self.log_append_failure(destination_id, "rotate", &err);
                return;
            }
            if self.window.try_write(&frame).is_err() {
                let err = io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!(
                        "envelope of {} bytes exceeds window capacity {}",
                        frame.len(),
                        self.window_capacity
                    ),
                );
                self.log_append_failure(destination_id, "write", &err);
                return;
            }
        }

        // Heartbeats and fire-and-forget messages were already delivered at
        // submission time; only flush-gated messages wait here.
        if self.mode == DurabilityMode::WaitForCommit && !message.is_heartbeat() {
            self.pending.push(PendingEntry {
                message,
                destination,
            });
        }
    }

    /// Forces the old window and maps the next one, anchored at the old
    /// window's written end so the byte stream stays contiguous.
    fn rotate(&mut self) -> io::Result<()> {
        self.window.force()?;
        let next_base = self.window.logical_end();
        self.window = MappedWindow::map(&self.file, next_base, self.window_capacity)?;

        let base = next_base.to_string();
        let path = self.path_str();
        Logger::info(
            "QUANTA_WINDOW_ROTATED",
            &[("base_offset", base.as_str()), ("path", path.as_str())],
        );
        Ok(())
    }

    /// Services one sync marker: force, then deliver the whole pending batch
    /// in FIFO order, or none of it if the force failed.
    fn service_sync(&mut self) {
        match self.window.force() {
            Ok(()) => {
                for entry in self.pending.drain(..) {
                    entry.destination.deliver(entry.message);
                }
            }
            Err(err) => {
                let withheld = self.pending.len();
                self.pending.clear();

                let withheld_str = withheld.to_string();
                let source = err.to_string();
                let path = self.path_str();
                Logger::fatal(
                    "QUANTA_SYNC_FAILED",
                    &[
                        ("path", path.as_str()),
                        ("source", source.as_str()),
                        ("withheld_deliveries", withheld_str.as_str()),
                    ],
                );
                if self.sync_error.is_none() {
                    self.sync_error = Some(QuantumError::sync(
                        format!(
                            "force to stable storage failed, {withheld} pending deliveries withheld"
                        ),
                        err,
                    ));
                }
            }
        }
        self.sync_pending.store(false, Ordering::Release);
    }

    /// Close-time cleanup. The final sync marker has already been serviced;
    /// what remains is trimming the sparse window tail so the file ends at
    /// the last envelope. Errors here are logged, not returned; ordering
    /// was already guaranteed.
    fn finish(self) -> QuantumResult<()> {
        let Worker {
            file,
            window,
            sync_error,
            path,
            ..
        } = self;

        let logical_end = window.logical_end();
        // Unmap before shrinking the file.
        drop(window);

        let path_str = path.display().to_string();
        let trim = file
            .set_len(logical_end)
            .and_then(|()| file.sync_all());
        if let Err(err) = trim {
            let source = err.to_string();
            Logger::error(
                "QUANTA_CLOSE_FAILED",
                &[("path", path_str.as_str()), ("source", source.as_str())],
            );
        }

        let length = logical_end.to_string();
        Logger::info(
            "QUANTA_CLOSED",
            &[("length", length.as_str()), ("path", path_str.as_str())],
        );

        match sync_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn log_append_failure(&self, destination_id: u32, stage: &str, err: &io::Error) {
        let destination = destination_id.to_string();
        let source = err.to_string();
        let path = self.path_str();
        Logger::error(
            "QUANTA_APPEND_FAILED",
            &[
                ("destination", destination.as_str()),
                ("path", path.as_str()),
                ("source", source.as_str()),
                ("stage", stage),
            ],
        );
    }

    fn path_str(&self) -> String {
        self.path.display().to_string()
    }
}

//! Periodic sync trigger.
//!
//! A dedicated timer thread injects a `SyncMarker` into the submission
//! queue every flush interval, never bypassing the queue, so a sync always
//! covers everything submitted before it and nothing submitted after. The
//! shared atomic guard keeps at most one sync request outstanding: a tick
//! that finds the previous marker unserviced injects nothing.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::worker::WorkItem;

/// Timer thread handle. Stopping is idempotent and performed on drop.
#[derive(Debug)]
pub(crate) struct SyncScheduler {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl SyncScheduler {
    /// Starts the timer thread.
    ///
    /// `sync_pending` is the re-entrancy guard shared with the worker: set
    /// here when a marker is injected, cleared by the worker when the marker
    /// is serviced.
    pub fn start(
        interval: Duration,
        queue: Sender<WorkItem>,
        sync_pending: Arc<AtomicBool>,
    ) -> io::Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("quantum-sync".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let injected = sync_pending
                            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                            .is_ok();
                        if injected && queue.send(WorkItem::Sync).is_err() {
                            // Worker side of the queue is gone; nothing left
                            // to schedule.
                            break;
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Stops the timer thread and waits for it to exit. No further markers
    /// are injected once this returns.
    pub fn stop(&mut self) {
        self.stop_tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::Receiver;
    use std::time::Instant;

    fn drain_markers(queue: &Receiver<WorkItem>) -> usize {
        let mut count = 0;
        while let Ok(item) = queue.try_recv() {
            assert!(matches!(item, WorkItem::Sync));
            count += 1;
        }
        count
    }

    #[test]
    fn injects_a_marker_each_interval_when_serviced() {
        let (tx, rx) = mpsc::channel();
        let guard = Arc::new(AtomicBool::new(false));
        let mut scheduler =
            SyncScheduler::start(Duration::from_millis(10), tx, Arc::clone(&guard)).unwrap();

        // Service each marker as the worker would: clear the guard after
        // receiving it.
        let mut seen = 0;
        let deadline = Instant::now() + Duration::from_secs(5);
        while seen < 3 && Instant::now() < deadline {
            if rx.recv_timeout(Duration::from_millis(100)).is_ok() {
                seen += 1;
                guard.store(false, Ordering::Release);
            }
        }
        scheduler.stop();
        assert_eq!(seen, 3);
    }

    #[test]
    fn outstanding_marker_suppresses_further_injection() {
        let (tx, rx) = mpsc::channel();
        let guard = Arc::new(AtomicBool::new(false));
        let mut scheduler =
            SyncScheduler::start(Duration::from_millis(5), tx, Arc::clone(&guard)).unwrap();

        // Never clear the guard: however many ticks elapse, exactly one
        // marker may be queued.
        thread::sleep(Duration::from_millis(100));
        scheduler.stop();

        assert_eq!(drain_markers(&rx), 1);
        assert!(guard.load(Ordering::Acquire));
    }

    #[test]
    fn stop_is_idempotent() {
        let (tx, _rx) = mpsc::channel();
        let guard = Arc::new(AtomicBool::new(false));
        let mut scheduler =
            SyncScheduler::start(Duration::from_millis(5), tx, guard).unwrap();

        scheduler.stop();
        scheduler.stop();
    }

    #[test]
    fn scheduler_exits_when_queue_disconnects() {
        let (tx, rx) = mpsc::channel();
        let guard = Arc::new(AtomicBool::new(false));
        let mut scheduler =
            SyncScheduler::start(Duration::from_millis(5), tx, Arc::clone(&guard)).unwrap();

        drop(rx);
        // First tick injects into a disconnected queue and the thread exits
        // on its own; stop() then just joins it.
        thread::sleep(Duration::from_millis(50));
        scheduler.stop();
    }
}

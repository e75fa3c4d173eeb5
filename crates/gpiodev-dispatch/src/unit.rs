//! One open unit and its worker loop.
//!
//! Each unit owns exactly one worker thread. Producers (BeginIO, abort,
//! resolve, close) send owned [`WorkerMessage`]s through a bounded channel;
//! the worker's blocking receive is the only suspension point in the loop.
//! Within one unit, requests are serviced in enqueue order.
//!
//! Worker states: `Starting -> Live -> Stopped`. The spawning thread
//! blocks on a start rendezvous until the worker signals `Live`; there is
//! no timeout, so an unresponsive worker stalls `open` indefinitely
//! (accepted risk, matching the rest of the lifecycle contract).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread::JoinHandle;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use gpiodev_core::{CallerContext, LineChip, RequestRecord, Status, Ticket, UnitHandle};

use crate::dispatch::{self, LineSet};
use crate::error::{DeviceError, Result};
use crate::pending::PendingSet;

/// Message carried by a unit's work queue.
pub enum WorkerMessage {
    /// Fresh work to dispatch.
    Work {
        record: RequestRecord,
        ctx: Arc<dyn CallerContext>,
    },
    /// Synthetic completion for a pending request that was marked ready
    /// (abort or external resolution). Kept distinct from `Work` so the
    /// worker's transitions stay explicit.
    Completion { ticket: Ticket },
    /// Stop sentinel; the worker exits after servicing it.
    Stop,
}

/// One open logical device instance.
pub struct Unit {
    slot: usize,
    unit: u32,
    handle: UnitHandle,
    exclusive: bool,
    open: AtomicBool,
    pending: PendingSet,
    lines: LineSet,
    queue: mpsc::Sender<WorkerMessage>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_running: AtomicBool,
}

impl Unit {
    /// Claim resources and start the worker, blocking until it is live.
    ///
    /// Fails with `OpenFailed` if the thread cannot be spawned or exits
    /// before signalling.
    pub(crate) fn start(
        slot: usize,
        unit: u32,
        handle: UnitHandle,
        exclusive: bool,
        chip: Arc<dyn LineChip>,
        queue_depth: usize,
        consumer: String,
    ) -> Result<Arc<Self>> {
        let (tx, rx) = mpsc::channel(queue_depth);
        let this = Arc::new(Self {
            slot,
            unit,
            handle,
            exclusive,
            open: AtomicBool::new(true),
            pending: PendingSet::new(),
            lines: LineSet::new(chip, consumer),
            queue: tx,
            worker: Mutex::new(None),
            worker_running: AtomicBool::new(false),
        });

        let (ready_tx, ready_rx) = std_mpsc::channel();
        let worker_unit = Arc::clone(&this);
        let joiner = std::thread::Builder::new()
            .name(format!("gpiodev-unit{}", slot))
            .spawn(move || worker_loop(worker_unit, rx, ready_tx))
            .map_err(|e| DeviceError::OpenFailed {
                message: format!("failed to spawn worker: {}", e),
            })?;
        *this.worker.lock() = Some(joiner);

        // Rendezvous: block until the worker signals Live. An error here
        // means the thread died before signalling.
        ready_rx.recv().map_err(|_| DeviceError::OpenFailed {
            message: "worker exited before signalling live".to_string(),
        })?;

        Ok(this)
    }

    /// Caller-visible handle (the unit's unique id).
    pub fn handle(&self) -> UnitHandle {
        self.handle
    }

    /// Physical unit number this instance is bound to.
    pub fn unit(&self) -> u32 {
        self.unit
    }

    /// Slot index in the unit table.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Whether the unit was opened exclusively.
    pub fn is_exclusive(&self) -> bool {
        self.exclusive
    }

    /// Whether the unit is still open.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Whether the worker thread is live.
    pub fn worker_running(&self) -> bool {
        self.worker_running.load(Ordering::SeqCst)
    }

    /// Number of in-flight deferred requests.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Tickets of all in-flight deferred requests.
    pub fn pending_tickets(&self) -> Vec<Ticket> {
        self.pending.tickets()
    }

    pub(crate) fn lines(&self) -> &LineSet {
        &self.lines
    }

    /// Hand a record to the worker.
    pub(crate) fn enqueue(&self, record: RequestRecord, ctx: Arc<dyn CallerContext>) -> Result<()> {
        self.queue
            .blocking_send(WorkerMessage::Work { record, ctx })
            .map_err(|_| DeviceError::QueueClosed)
    }

    /// Cancel a pending request.
    ///
    /// Race-free with normal completion: the entry is marked ready here,
    /// but only the worker completes and removes it, and it does so at
    /// most once. An unknown ticket is a protocol violation, logged and
    /// ignored.
    pub fn abort(&self, ticket: Ticket) -> Result<()> {
        self.inject(ticket, Status::Aborted)
    }

    /// Complete a pending request from an external resolving event
    /// (e.g., the edge a `Wait` was armed for).
    pub fn resolve(&self, ticket: Ticket, status: Status) -> Result<()> {
        self.inject(ticket, status)
    }

    fn inject(&self, ticket: Ticket, status: Status) -> Result<()> {
        if !self.pending.find_and_mark_ready(ticket, status) {
            warn!(
                unit = self.unit,
                ticket = %ticket,
                "no pending request for ticket"
            );
            return Ok(());
        }
        debug!(unit = self.unit, ticket = %ticket, %status, "completion injected");
        self.queue
            .blocking_send(WorkerMessage::Completion { ticket })
            .map_err(|_| DeviceError::QueueClosed)
    }

    /// Mark closed and send the stop sentinel.
    ///
    /// Returns as soon as the sentinel is enqueued; the worker tears down
    /// asynchronously. Use [`Unit::join`] to wait for it.
    pub(crate) fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        if self.queue.blocking_send(WorkerMessage::Stop).is_err() {
            warn!(unit = self.unit, "stop sent to already-closed queue");
        }
    }

    /// Wait for the worker's stopped acknowledgment.
    pub(crate) fn join(&self) {
        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                warn!(unit = self.unit, slot = self.slot, "worker panicked");
            }
        }
    }

    fn finish_ready(&self, ticket: Ticket) {
        // The entry's terminal status was stamped when it was marked ready.
        if let Some((record, ctx)) = self.pending.remove(ticket) {
            debug!(unit = self.unit, ticket = %ticket, status = %record.status, "deferred request complete");
            ctx.complete(record);
        }
    }
}

fn worker_loop(
    unit: Arc<Unit>,
    mut rx: mpsc::Receiver<WorkerMessage>,
    ready: std_mpsc::Sender<()>,
) {
    unit.worker_running.store(true, Ordering::SeqCst);
    debug!(unit = unit.unit, slot = unit.slot, "worker live");
    let _ = ready.send(());

    // A closed channel is treated like the stop sentinel.
    while let Some(message) = rx.blocking_recv() {
        match message {
            WorkerMessage::Stop => break,
            WorkerMessage::Completion { ticket } => unit.finish_ready(ticket),
            WorkerMessage::Work { mut record, ctx } => {
                let disposition = dispatch::execute(&record, unit.lines(), ctx.as_ref());
                if disposition.deferred {
                    unit.pending.insert(record, ctx);
                } else {
                    record.status = disposition.status;
                    record.actual = disposition.actual;
                    ctx.complete(record);
                }
            }
        }
    }

    unit.worker_running.store(false, Ordering::SeqCst);
    info!(unit = unit.unit, slot = unit.slot, "worker stopped");
}

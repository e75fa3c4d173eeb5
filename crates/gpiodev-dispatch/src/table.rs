//! The unit table and lifecycle controller.
//!
//! A fixed-capacity pool of [`Unit`]s. Slots are claimed on open and
//! released on close; the table-wide lock is held only for the
//! claim/release/lookup instant, never across backend acquisition or
//! worker startup. Handles are unique ids assigned monotonically at open,
//! so a stale handle from a previous open can never alias a new unit and
//! a lookup miss is a normal outcome, not a fault.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use gpiodev_core::{
    CallerContext, GpioBackend, RequestRecord, Status, Ticket, UnitHandle, REQUEST_LEN_MIN,
};

use crate::config::DispatcherConfig;
use crate::dispatch;
use crate::error::{DeviceError, Result};
use crate::unit::Unit;

enum SlotState {
    Free,
    /// Claimed by an in-progress open; holds enough for the exclusivity
    /// check so a racing open of the same unit sees it.
    Reserved {
        unit: u32,
        exclusive: bool,
    },
    Open(Arc<Unit>),
}

/// Fixed-capacity pool of open units and the dispatcher's entry points.
pub struct UnitTable {
    backend: Arc<dyn GpioBackend>,
    config: DispatcherConfig,
    slots: Mutex<Vec<SlotState>>,
    next_id: AtomicU32,
}

impl UnitTable {
    /// Create a table over a backend with a validated configuration.
    pub fn new(backend: Arc<dyn GpioBackend>, config: DispatcherConfig) -> Result<Self> {
        config.validate()?;
        let slots = (0..config.max_units).map(|_| SlotState::Free).collect();
        Ok(Self {
            backend,
            config,
            slots: Mutex::new(slots),
            next_id: AtomicU32::new(0),
        })
    }

    /// Table capacity.
    pub fn capacity(&self) -> usize {
        self.config.max_units
    }

    /// Number of currently open units.
    pub fn open_count(&self) -> usize {
        self.slots
            .lock()
            .iter()
            .filter(|s| matches!(s, SlotState::Open(_)))
            .count()
    }

    /// Open a unit.
    ///
    /// `request_len` is the caller's request buffer length, validated
    /// against [`REQUEST_LEN_MIN`]. Blocks until the unit's worker signals
    /// it is live. Fails with `UnitBusy` if an open entry for the same
    /// physical unit holds the exclusive flag, and `OpenFailed` if the
    /// pool is full or the backend chip cannot be acquired.
    pub fn open(&self, unit: u32, exclusive: bool, request_len: usize) -> Result<UnitHandle> {
        if request_len < REQUEST_LEN_MIN {
            return Err(DeviceError::BadLength {
                len: request_len,
                min: REQUEST_LEN_MIN,
            });
        }

        let slot = {
            let mut slots = self.slots.lock();
            for state in slots.iter() {
                let held_exclusive = match state {
                    SlotState::Open(u) => u.unit() == unit && u.is_exclusive(),
                    SlotState::Reserved {
                        unit: reserved,
                        exclusive: true,
                    } => *reserved == unit,
                    _ => false,
                };
                if held_exclusive {
                    return Err(DeviceError::UnitBusy { unit });
                }
            }
            let Some(idx) = slots.iter().position(|s| matches!(s, SlotState::Free)) else {
                return Err(DeviceError::OpenFailed {
                    message: "unit table full".to_string(),
                });
            };
            slots[idx] = SlotState::Reserved { unit, exclusive };
            idx
        };

        match self.open_slot(slot, unit, exclusive) {
            Ok(opened) => {
                let handle = opened.handle();
                self.slots.lock()[slot] = SlotState::Open(opened);
                info!(unit, slot, handle = %handle, exclusive, "opened unit");
                Ok(handle)
            }
            Err(e) => {
                self.slots.lock()[slot] = SlotState::Free;
                warn!(unit, slot, error = %e, "open failed");
                Err(e)
            }
        }
    }

    fn open_slot(&self, slot: usize, unit: u32, exclusive: bool) -> Result<Arc<Unit>> {
        let chip = self
            .backend
            .open_chip(&self.config.chip)
            .map_err(|e| DeviceError::OpenFailed {
                message: e.to_string(),
            })?;
        let handle = UnitHandle(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        Unit::start(
            slot,
            unit,
            handle,
            exclusive,
            chip,
            self.config.queue_depth,
            self.config.consumer.clone(),
        )
    }

    /// Find the open unit for a handle. A miss is a normal stale-handle
    /// outcome.
    pub fn lookup(&self, handle: UnitHandle) -> Option<Arc<Unit>> {
        self.slots.lock().iter().find_map(|state| match state {
            SlotState::Open(u) if u.handle() == handle => Some(Arc::clone(u)),
            _ => None,
        })
    }

    /// Close a unit.
    ///
    /// Releases the slot and sends the stop sentinel; returns as soon as
    /// the sentinel is enqueued, without joining the worker. Closing a
    /// stale handle is a no-op.
    pub fn close(&self, handle: UnitHandle) {
        let unit = {
            let mut slots = self.slots.lock();
            let Some(idx) = slots.iter().position(
                |s| matches!(s, SlotState::Open(u) if u.handle() == handle),
            ) else {
                warn!(handle = %handle, "close on stale handle");
                return;
            };
            match std::mem::replace(&mut slots[idx], SlotState::Free) {
                SlotState::Open(u) => u,
                other => {
                    slots[idx] = other;
                    return;
                }
            }
        };
        unit.close();
        info!(unit = unit.unit(), handle = %handle, "closed unit");
    }

    /// Forcibly close every open unit, draining pending work first.
    ///
    /// For each unit: abort every pending request, close, then wait for
    /// the worker's stopped acknowledgment before the slot is considered
    /// clear. Not safe to call concurrently with `open` on the same slot.
    pub fn reset(&self) {
        let units: Vec<Arc<Unit>> = {
            let mut slots = self.slots.lock();
            slots
                .iter_mut()
                .filter_map(|state| {
                    if matches!(state, SlotState::Open(_)) {
                        match std::mem::replace(state, SlotState::Free) {
                            SlotState::Open(u) => Some(u),
                            _ => None,
                        }
                    } else {
                        None
                    }
                })
                .collect()
        };

        for unit in units {
            for ticket in unit.pending_tickets() {
                if let Err(e) = unit.abort(ticket) {
                    warn!(unit = unit.unit(), ticket = %ticket, error = %e, "abort during reset failed");
                }
            }
            unit.close();
            unit.join();
            if unit.pending_len() != 0 {
                warn!(
                    unit = unit.unit(),
                    pending = unit.pending_len(),
                    "pending registry not drained at reset"
                );
            }
        }
    }

    /// Whole-subsystem teardown; equivalent to [`UnitTable::reset`].
    pub fn shutdown(&self) {
        info!("shutting down dispatcher");
        self.reset();
    }

    /// BeginIO entry point: execute a request on the quick path or hand
    /// it to the unit's worker.
    ///
    /// Completion is always signalled through the caller context, exactly
    /// once: inline (before this returns) for quick-eligible requests with
    /// the quick flag, from the worker thread otherwise. A stale handle
    /// completes the record immediately with `OpenFailed`.
    pub fn begin_io(&self, mut record: RequestRecord, ctx: Arc<dyn CallerContext>) -> Result<()> {
        let Some(unit) = self.lookup(record.unit_handle) else {
            warn!(handle = %record.unit_handle, "begin_io on stale handle");
            record.status = Status::OpenFailed;
            ctx.complete(record);
            return Ok(());
        };

        // Copy the caller's payload area into the record.
        if let Err(e) = ctx.read_payload(&mut record.payload) {
            warn!(handle = %record.unit_handle, error = %e, "payload copy-in failed");
            record.status = Status::BadLength;
            ctx.complete(record);
            return Ok(());
        }

        if record.quick && dispatch::can_quick(record.command) {
            let disposition = dispatch::execute(&record, unit.lines(), ctx.as_ref());
            if disposition.deferred {
                warn!(
                    unit = unit.unit(),
                    command = record.command,
                    "quick-eligible command tried to defer"
                );
            }
            record.status = disposition.status;
            record.actual = disposition.actual;
            ctx.complete(record);
            return Ok(());
        }

        record.quick = false;
        ctx.set_background();
        unit.enqueue(record, ctx)
    }

    /// Cancel a pending request on a unit.
    pub fn abort(&self, handle: UnitHandle, ticket: Ticket) -> Result<()> {
        let unit = self
            .lookup(handle)
            .ok_or(DeviceError::StaleHandle(handle))?;
        unit.abort(ticket)
    }

    /// Complete a pending request from an external resolving event.
    pub fn resolve(&self, handle: UnitHandle, ticket: Ticket, status: Status) -> Result<()> {
        let unit = self
            .lookup(handle)
            .ok_or(DeviceError::StaleHandle(handle))?;
        unit.resolve(ticket, status)
    }
}

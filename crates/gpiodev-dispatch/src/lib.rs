//! Asynchronous GPIO command dispatcher.
//!
//! This crate is the request lifecycle and concurrency engine behind a
//! GPIO device: callers submit [`RequestRecord`]s through
//! [`UnitTable::begin_io`]; commands that can complete synchronously do so
//! on the caller's thread (the quick path), everything else is handed to
//! the owning unit's dedicated worker thread over a bounded queue. `Wait`
//! commands stay parked in a per-unit pending registry until an external
//! event resolves them or they are aborted.
//!
//! # Architecture
//!
//! ```text
//!  caller ──▶ UnitTable::begin_io ──┬─▶ dispatch (quick path)
//!                                   │
//!                                   └─▶ bounded queue ──▶ worker loop
//!                                            ▲                │
//!             abort / resolve ── Completion ─┘        dispatch │ pending
//!                                                     registry ▼
//! ```
//!
//! Guarantees:
//!
//! - at most one worker thread per unit, started before `open` returns
//!   (rendezvous) and joined by `reset`
//! - exactly one terminal completion per request, signalled through the
//!   injected [`CallerContext`]
//! - per-unit FIFO service order for queued requests
//! - cancellation from any thread without races against normal
//!   completion: abort marks the pending entry ready and re-injects a
//!   completion message, so both paths funnel through the worker
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use gpiodev_core::{RequestRecord, Ticket, CMD_CONFIGURE, REQUEST_LEN_MIN};
//! use gpiodev_dispatch::{DispatcherConfig, UnitTable};
//! use gpiodev_mock::{MockBackend, MockCaller};
//!
//! # fn example() -> anyhow::Result<()> {
//! let table = UnitTable::new(Arc::new(MockBackend::new()), DispatcherConfig::default())?;
//! let handle = table.open(0, false, REQUEST_LEN_MIN)?;
//!
//! // Configure channel 4 as an output, synchronously.
//! let ctx = Arc::new(MockCaller::with_payload(&[4, 1, 0]));
//! let record = RequestRecord::new(handle, CMD_CONFIGURE, Ticket(1)).with_quick();
//! table.begin_io(record, ctx)?;
//!
//! table.reset();
//! # Ok(())
//! # }
//! ```
//!
//! [`RequestRecord`]: gpiodev_core::RequestRecord
//! [`CallerContext`]: gpiodev_core::CallerContext

pub mod config;
pub mod dispatch;
pub mod error;
pub mod pending;
pub mod table;
pub mod unit;

pub use config::DispatcherConfig;
pub use dispatch::{can_quick, execute, Disposition, LineSet};
pub use error::{DeviceError, Result};
pub use pending::PendingSet;
pub use table::UnitTable;
pub use unit::{Unit, WorkerMessage};

//! Mock line backend and caller context for gpiodev testing.
//!
//! Everything here is hardware-free and deterministic:
//!
//! - [`MockBackend`] hands out shared in-memory [`MockChip`]s by name
//! - [`MockLine`] tracks level, direction and requesting consumer, and
//!   rejects unconfigured access the way a real character-device backend
//!   would
//! - [`MockCaller`] owns a payload buffer and records every completion, so
//!   tests can assert the "exactly one terminal status" invariant directly
//!
//! Fault injection follows the pattern of toggling a failure flag on the
//! object under test ([`MockChip::set_fail_get_line`],
//! [`MockLine::set_fail_io`], [`MockBackend::set_fail_open`]).

pub mod caller;
pub mod chip;

pub use caller::{Completion, MockCaller};
pub use chip::{MockBackend, MockChip, MockLine};

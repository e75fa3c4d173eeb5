//! Core types and boundary traits for the gpiodev command dispatcher.
//!
//! This crate defines the vocabulary shared between the dispatcher engine
//! and its external collaborators:
//!
//! - [`RequestRecord`] - the unit of work passed between caller and
//!   dispatcher, with its command codes and payload layouts
//! - [`Status`] - the completion status byte reported back to the caller
//! - [`CallerContext`] - capability trait over the caller's request buffer
//!   and completion signalling
//! - [`GpioBackend`] / [`LineChip`] / [`Line`] - capability traits over the
//!   physical line backend
//! - [`BackendError`] - error type for backend and caller-buffer faults
//!
//! The engine itself lives in the `gpiodev-dispatch` crate; a hardware-free
//! backend and caller for tests live in `gpiodev-mock`.

pub mod backend;
pub mod caller;
pub mod error;
pub mod request;
pub mod status;

pub use backend::{GpioBackend, Level, Line, LineChip};
pub use caller::CallerContext;
pub use error::{BackendError, BackendResult};
pub use request::{
    Command, DeviceDescriptor, RequestRecord, Ticket, UnitHandle, CMD_CONFIGURE, CMD_QUERY,
    CMD_READ, CMD_WAIT, CMD_WRITE, PAYLOAD_CHANNEL, PAYLOAD_DIRECTION, PAYLOAD_PULL,
    PAYLOAD_SIZE, PAYLOAD_TRIGGER, PAYLOAD_VALUE, REQUEST_LEN_MIN,
};
pub use request::{Direction, Pull, Trigger};
pub use status::Status;

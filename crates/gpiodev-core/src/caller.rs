//! Capability trait over the caller context.
//!
//! The dispatcher core is host-agnostic: everything it needs from the
//! entity that delivered a request is expressed as the four operations of
//! [`CallerContext`]. A production host backs this with its own request
//! buffers and completion signalling; tests use the mock caller from
//! `gpiodev-mock`.

use crate::error::BackendResult;
use crate::request::RequestRecord;

/// Access to one caller request's payload area and completion signal.
///
/// One context instance accompanies one request record through the
/// dispatcher. Implementations must tolerate calls from both the caller's
/// thread (quick path) and the unit's worker thread (deferred path).
pub trait CallerContext: Send + Sync {
    /// Copy the request's payload area into `buf` (copy-in at BeginIO).
    ///
    /// Copies `min(buf.len(), payload area size)` bytes.
    fn read_payload(&self, buf: &mut [u8]) -> BackendResult<()>;

    /// Write command output bytes at the given payload offset.
    fn write_payload(&self, offset: usize, data: &[u8]) -> BackendResult<()>;

    /// Signal that this request is complete.
    ///
    /// Ownership of the record transfers back to the caller; the core
    /// never touches the record after this call. Called exactly once per
    /// request.
    fn complete(&self, record: RequestRecord);

    /// Mark that processing left the calling thread (deferred path).
    fn set_background(&self);

    /// Whether processing left the calling thread.
    fn is_background(&self) -> bool;
}

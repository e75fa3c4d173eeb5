//! The request record and its command codes and payload layouts.
//!
//! A [`RequestRecord`] is the in-core representation of one caller-issued
//! command. The caller context copies the payload area in at BeginIO and
//! the dispatcher writes command output back through the context, so the
//! record itself can move freely between threads.
//!
//! # Payload layouts
//!
//! All offsets are relative to the start of the payload area:
//!
//! | Command   | Layout                                                  |
//! |-----------|---------------------------------------------------------|
//! | Read      | `[0]` channel, `[1]` value (out)                        |
//! | Write     | `[0]` channel, `[1]` value                              |
//! | Wait      | `[0]` channel, `[1]` trigger edge                       |
//! | Configure | `[0]` channel, `[1]` direction, `[2]` pull mode         |
//! | Query     | 16-byte device descriptor (out)                         |

use std::fmt;

use crate::status::Status;

/// Read the level of a configured line.
pub const CMD_READ: u16 = 1;
/// Set the level of a configured line.
pub const CMD_WRITE: u16 = 2;
/// Wait for an edge on a line; always completes asynchronously.
pub const CMD_WAIT: u16 = 3;
/// Configure a line's direction and pull mode.
pub const CMD_CONFIGURE: u16 = 4;
/// Query static device capability metadata.
pub const CMD_QUERY: u16 = 5;

/// Size of the payload area carried in every request record.
pub const PAYLOAD_SIZE: usize = 16;

/// Minimum caller request buffer length accepted by `open`.
///
/// Callers built against an older, shorter request layout are rejected
/// with `BadLength` instead of being allowed to corrupt memory.
pub const REQUEST_LEN_MIN: usize = 48;

/// Payload offset of the channel byte (all commands).
pub const PAYLOAD_CHANNEL: usize = 0;
/// Payload offset of the value byte (`Read` out, `Write` in).
pub const PAYLOAD_VALUE: usize = 1;
/// Payload offset of the trigger edge byte (`Wait`).
pub const PAYLOAD_TRIGGER: usize = 1;
/// Payload offset of the direction byte (`Configure`).
pub const PAYLOAD_DIRECTION: usize = 1;
/// Payload offset of the pull-mode byte (`Configure`).
pub const PAYLOAD_PULL: usize = 2;

/// A decoded command code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Read,
    Write,
    Wait,
    Configure,
    Query,
}

impl Command {
    /// Decode a raw command code. Unknown codes return `None` and are
    /// reported to the caller as [`Status::NoCommand`].
    pub fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            CMD_READ => Some(Self::Read),
            CMD_WRITE => Some(Self::Write),
            CMD_WAIT => Some(Self::Wait),
            CMD_CONFIGURE => Some(Self::Configure),
            CMD_QUERY => Some(Self::Query),
            _ => None,
        }
    }

    /// Raw wire code for this command.
    pub fn to_raw(self) -> u16 {
        match self {
            Self::Read => CMD_READ,
            Self::Write => CMD_WRITE,
            Self::Wait => CMD_WAIT,
            Self::Configure => CMD_CONFIGURE,
            Self::Query => CMD_QUERY,
        }
    }
}

/// Line direction requested by `Configure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    /// Decode the direction byte of a `Configure` payload.
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Input),
            1 => Some(Self::Output),
            _ => None,
        }
    }
}

/// Pull mode requested by `Configure`.
///
/// Pull modes other than `None` are accepted but have no effect on
/// backends that cannot express them; the dispatcher logs the omission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    None,
    Up,
    Down,
}

impl Pull {
    /// Decode the pull-mode byte of a `Configure` payload.
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::None),
            1 => Some(Self::Up),
            2 => Some(Self::Down),
            _ => None,
        }
    }
}

/// Trigger edge requested by `Wait`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Rising,
    Falling,
}

impl Trigger {
    /// Decode the trigger byte of a `Wait` payload.
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Rising),
            1 => Some(Self::Falling),
            _ => None,
        }
    }
}

/// Opaque caller-supplied correlation token for a request.
///
/// The core never dereferences or interprets a ticket; it only compares
/// tickets for equality. Reusing a ticket while a request with the same
/// ticket is still pending is a caller contract violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(pub u64);

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Caller-visible handle of an open unit.
///
/// Handles are the unit's monotonically assigned unique id, so a handle
/// from a previous open can never alias a newly opened unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitHandle(pub u32);

impl fmt::Display for UnitHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One caller-issued command in flight.
///
/// Ownership follows the request: the enqueuing side owns the record until
/// it is handed to the worker, the worker (or the pending registry) owns it
/// until completion, and [`CallerContext::complete`](crate::CallerContext::complete)
/// transfers it back to the caller. Exactly one terminal status is reached
/// per record.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    /// Handle of the owning unit.
    pub unit_handle: UnitHandle,
    /// Raw command code; decoded by the dispatch routine.
    pub command: u16,
    /// Command payload, copied in from the caller at BeginIO.
    pub payload: [u8; PAYLOAD_SIZE],
    /// Terminal status, valid once the record completes.
    pub status: Status,
    /// Bytes produced by the command.
    pub actual: u32,
    /// Caller correlation token.
    pub ticket: Ticket,
    /// Caller asked for synchronous (quick) completion.
    pub quick: bool,
}

impl RequestRecord {
    /// Create a record for the given command with an empty payload.
    pub fn new(unit_handle: UnitHandle, command: u16, ticket: Ticket) -> Self {
        Self {
            unit_handle,
            command,
            payload: [0; PAYLOAD_SIZE],
            status: Status::Ok,
            actual: 0,
            ticket,
            quick: false,
        }
    }

    /// Request quick (synchronous) completion where the command allows it.
    pub fn with_quick(mut self) -> Self {
        self.quick = true;
        self
    }

    /// Channel byte of the payload.
    pub fn channel(&self) -> u8 {
        self.payload[PAYLOAD_CHANNEL]
    }
}

/// Static capability metadata returned by `Query`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Device class identifier.
    pub device_type: u16,
    /// Interface version.
    pub version: u16,
    /// Interface revision.
    pub revision: u16,
    /// Bitmask of supported command codes (bit n set = code n supported).
    pub commands: u32,
}

impl DeviceDescriptor {
    /// Descriptor for this dispatcher core.
    pub fn current() -> Self {
        Self {
            device_type: 0,
            version: 1,
            revision: 0,
            commands: (1 << CMD_READ)
                | (1 << CMD_WRITE)
                | (1 << CMD_WAIT)
                | (1 << CMD_CONFIGURE)
                | (1 << CMD_QUERY),
        }
    }

    /// Encode into the 16-byte wire layout written to the payload area.
    ///
    /// Layout: `[0..4]` descriptor size, `[4..6]` device type, `[6..8]`
    /// version, `[8..10]` revision, `[10..14]` supported-command mask,
    /// `[14..16]` reserved.
    pub fn encode(&self) -> [u8; PAYLOAD_SIZE] {
        let mut out = [0u8; PAYLOAD_SIZE];
        out[0..4].copy_from_slice(&(PAYLOAD_SIZE as u32).to_le_bytes());
        out[4..6].copy_from_slice(&self.device_type.to_le_bytes());
        out[6..8].copy_from_slice(&self.version.to_le_bytes());
        out[8..10].copy_from_slice(&self.revision.to_le_bytes());
        out[10..14].copy_from_slice(&self.commands.to_le_bytes());
        out
    }

    /// True if the given raw command code is advertised as supported.
    pub fn supports(&self, command: u16) -> bool {
        command < 32 && self.commands & (1 << command) != 0
    }
}

//! Wire protocol of the simmer cooker.
//!
//! Everything that crosses the 2400-baud wireless link lives here: the
//! 8-byte status and command records, the hex line framing, the response
//! parser for the module's `AOK`/`ERR`/`CMD` replies, and the link
//! supervisor that paces status notifications and escalates to a module
//! reboot when the peer stops answering.
//!
//! The crate is `no_std` and free of I/O and clocks, so the firmware and the
//! host-side tests share the exact same code paths.
#![no_std]

mod frame;
mod link;
mod record;

pub use frame::{
    encode_status_line, parse_command_line, parse_response, FrameError, LineBuffer, Response,
};
pub use link::{LinkAction, LinkSupervisor};
pub use record::{encode_remaining, CommandRecord, Opcode, StatusCode, StatusRecord};

/// Service id of the command ingest service (`WV` frames).
pub const COMMAND_SERVICE: &str = "001B";
/// Service id of the status notification service (`SHW` frames).
pub const STATUS_SERVICE: &str = "001D";

//! RFCOMM Control Channel
//!
//! Opens the per-device RFCOMM channel the daemon exposes and writes the two
//! canned AT indicator sequences that move a call's audio to or from the host.
//!
//! Delivery is best effort: [`send_sequence`] logs failures and never reports
//! them to the caller, so session state is never affected by the remote end.

use std::fs::File;
use std::io::Write;
use std::os::fd::OwnedFd;

use tracing::{debug, info, warn};

use crate::bus::{BusContext, BusTransport, RFCOMM_INTERFACE};
use crate::error::{CommandDeliveryError, Error};

/// Indicator updates announcing an incoming call that is answered at once
const TRANSFER_CALL: [&str; 3] = ["\r\n+CIEV:1,1\r\n", "\r\n+CIEV:5,5\r\n", "\r\n+CIEV:2,1\r\n"];

/// Indicator updates announcing the call has ended
const TERMINATE_CALL: [&str; 3] = ["\r\n+CIEV:2,0\r\n", "\r\n+CIEV:5,0\r\n", "\r\n+CIEV:1,0\r\n"];

/// Which call event to signal over RFCOMM
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallSignal {
    /// First stream of the device started
    Transfer,
    /// Last stream of the device stopped
    Terminate,
}

impl CallSignal {
    /// Commands of this signal, in send order
    #[must_use]
    pub const fn commands(self) -> &'static [&'static str] {
        match self {
            Self::Transfer => &TRANSFER_CALL,
            Self::Terminate => &TERMINATE_CALL,
        }
    }
}

/// Open the RFCOMM channel at `control_path`
///
/// The reply must carry exactly one file descriptor. The caller owns it.
pub fn open_control_channel<B: BusTransport>(
    bus: &BusContext<B>,
    control_path: &str,
) -> Result<OwnedFd, Error> {
    let reply = bus.call(control_path, RFCOMM_INTERFACE, "Open")?;
    let fd = reply.into_single_fd()?;
    debug!(path = %control_path, "Opened RFCOMM channel");
    Ok(fd)
}

/// Write every command of `signal` to the channel at `control_path`
///
/// Each command goes out in a single write; a short write stops the sequence.
/// The channel is closed on return.
pub fn deliver_sequence<B: BusTransport>(
    bus: &BusContext<B>,
    control_path: &str,
    signal: CallSignal,
) -> Result<(), CommandDeliveryError> {
    let fd = open_control_channel(bus, control_path).map_err(CommandDeliveryError::Open)?;
    write_commands(&mut File::from(fd), signal)
}

/// Write the commands of `signal`, one `write` call each
fn write_commands<W: Write>(channel: &mut W, signal: CallSignal) -> Result<(), CommandDeliveryError> {
    for (index, command) in signal.commands().iter().enumerate() {
        let written = channel
            .write(command.as_bytes())
            .map_err(|source| CommandDeliveryError::Write { index, source })?;
        if written != command.len() {
            return Err(CommandDeliveryError::ShortWrite {
                index,
                written,
                expected: command.len(),
            });
        }
    }
    Ok(())
}

/// Deliver `signal`, logging instead of failing
pub fn send_sequence<B: BusTransport>(bus: &BusContext<B>, control_path: &str, signal: CallSignal) {
    match deliver_sequence(bus, control_path, signal) {
        Ok(()) => info!(path = %control_path, signal = ?signal, "Sent RFCOMM call sequence"),
        Err(e) => warn!(path = %control_path, signal = ?signal, error = %e, "RFCOMM call sequence not delivered"),
    }
}

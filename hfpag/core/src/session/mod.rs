//! Call Session Coordination
//!
//! An HFP device exposes two PCMs, playback and capture, usually opened by
//! unrelated processes. [`HfpSession`] makes sure that only the first stream
//! to start sends the call transfer sequence and only the last stream to stop
//! sends the call terminate sequence.
//!
//! # State Machine
//!
//! ```text
//!   ┌──────┐        begin()         ┌────────┐
//!   │ Idle │ ─────────────────────▶ │ Active │
//!   └──────┘  mutex, share flag,    └────────┘
//!      ▲      sole holder sends         │
//!      │      transfer                  │
//!      │                                │
//!      └─────────────── end() ──────────┘
//!         mutex, try flag, sole holder
//!         sends terminate and unlinks
//! ```
//!
//! `end()` on an idle session is a no-op.
//!
//! Coordination state lives entirely in the device's [`LockFile`]; no state
//! is shared in memory between sessions.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::address::BluetoothAddress;
use crate::bus::{BusContext, BusTransport};
use crate::error::Error;
use crate::rfcomm::{send_sequence, CallSignal};

mod lock_file;

pub use lock_file::{default_lock_dir, LockFile, LockHandle};

/// Prefix of every BlueZ device object path
const BLUEZ_PREFIX: &str = "/org/bluez/";

/// Shortest device path that can name a device (`/org/bluez/hciN/dev_XX_…`)
const MIN_DEVICE_PATH_LEN: usize = 37;

/// Whether a session currently holds its lock file
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No descriptor held
    Idle,
    /// Descriptor held, flag shared
    Active,
}

/// Map a BlueZ device path to the daemon's RFCOMM object path
///
/// `/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF` becomes
/// `/org/bluealsa/hci0/dev_AA_BB_CC_DD_EE_FF/rfcomm`.
pub fn control_path_for(device_path: &str) -> Result<String, Error> {
    if device_path.len() < MIN_DEVICE_PATH_LEN {
        return Err(Error::InvalidDevicePath(device_path.to_string()));
    }
    let device = device_path
        .strip_prefix(BLUEZ_PREFIX)
        .ok_or_else(|| Error::InvalidDevicePath(device_path.to_string()))?;
    Ok(format!("/org/bluealsa/{device}/rfcomm"))
}

/// One stream's participation in a device's call session
#[derive(Debug)]
pub struct HfpSession {
    control_path: String,
    lock_file: LockFile,
    lock: Option<LockHandle>,
}

impl HfpSession {
    /// Session for the device at `device_path`, locking in `lock_dir`
    pub fn new(
        device_path: &str,
        address: &BluetoothAddress,
        lock_dir: &Path,
    ) -> Result<Self, Error> {
        Self::with_lock_file(device_path, LockFile::for_device(lock_dir, address))
    }

    /// Session using an explicit lock file
    pub fn with_lock_file(device_path: &str, lock_file: LockFile) -> Result<Self, Error> {
        let control_path = control_path_for(device_path)?;
        debug!(control = %control_path, lock = ?lock_file.path(), "Created HFP session");
        Ok(Self {
            control_path,
            lock_file,
            lock: None,
        })
    }

    /// RFCOMM object path of the device
    #[must_use]
    pub fn control_path(&self) -> &str {
        &self.control_path
    }

    /// Lock file shared with the device's other streams
    #[must_use]
    pub fn lock_file(&self) -> &LockFile {
        &self.lock_file
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.lock.is_some() {
            SessionState::Active
        } else {
            SessionState::Idle
        }
    }

    /// Whether the session holds its lock file
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.lock.is_some()
    }

    /// Join the device's call session
    ///
    /// The first stream to join sends the transfer sequence. On error the
    /// session stays idle and nothing is held.
    pub fn begin<B: BusTransport>(&mut self, bus: &BusContext<B>) -> Result<(), Error> {
        self.begin_with(bus, |_| {})
    }

    pub(crate) fn begin_with<B, F>(&mut self, bus: &BusContext<B>, before_lock: F) -> Result<(), Error>
    where
        B: BusTransport,
        F: FnMut(&Path),
    {
        let handle = self.lock_file.acquire_mutex_with(before_lock)?;
        handle.share_flag()?;

        if handle.try_exclusive_flag()? {
            info!(control = %self.control_path, "First stream of device, transferring call");
            send_sequence(bus, &self.control_path, CallSignal::Transfer);
            if let Err(e) = handle.downgrade_flag() {
                warn!(lock = ?handle.path(), error = %e, "Unable to share session flag");
            }
        }

        handle.unlock_mutex()?;
        self.lock = Some(handle);
        Ok(())
    }

    /// Leave the device's call session
    ///
    /// The last stream to leave sends the terminate sequence and deletes the
    /// lock file. The descriptor is closed whatever the outcome. A no-op on an
    /// idle session.
    pub fn end<B: BusTransport>(&mut self, bus: &BusContext<B>) -> Result<(), Error> {
        let Some(handle) = self.lock.take() else {
            return Ok(());
        };
        let result = self.leave(&handle, bus);
        drop(handle);
        debug!(control = %self.control_path, "Released session lock file");
        result
    }

    fn leave<B: BusTransport>(&self, handle: &LockHandle, bus: &BusContext<B>) -> Result<(), Error> {
        handle.lock_mutex()?;
        if handle.try_exclusive_flag()? {
            info!(control = %self.control_path, "Last stream of device, terminating call");
            send_sequence(bus, &self.control_path, CallSignal::Terminate);
            if let Err(e) = self.lock_file.remove() {
                warn!(error = %e, "Unable to remove lock file");
            }
        }
        Ok(())
    }
}

impl Drop for HfpSession {
    fn drop(&mut self) {
        if self.lock.is_some() {
            debug!(control = %self.control_path, "Dropping active session, releasing locks");
        }
    }
}

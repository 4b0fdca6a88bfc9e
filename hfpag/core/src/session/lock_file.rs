//! Session Lock File
//!
//! One lock file per remote device, shared by every stream of that device.
//! Two single-byte ranges carry the coordination state:
//!
//! ```text
//!   offset 0   mutex   exclusive, held only while changing session state
//!   offset 1   flag    shared by every active stream; an exclusive upgrade
//!                      succeeds only for the sole remaining holder
//! ```
//!
//! All locks are Linux open file description (OFD) locks. Unlike POSIX
//! record locks they belong to the descriptor, so two streams in the same
//! process still exclude each other, and closing the descriptor releases
//! everything it holds.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;
use std::os::unix::fs::{MetadataExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg};
use nix::unistd::{access, AccessFlags};
use tracing::{debug, warn};

use crate::address::BluetoothAddress;
use crate::error::Error;

/// Byte offset of the mutex lock
const MUTEX_OFFSET: libc::off_t = 0;

/// Byte offset of the in-use flag lock
const FLAG_OFFSET: libc::off_t = 1;

/// Preferred lock directory, shared by every user session on the host
const SHARED_MEMORY_DIR: &str = "/dev/shm";

/// Directory lock files are created in when none is configured
///
/// `/dev/shm` when it is readable and writable, else the XDG runtime
/// directory, else `$TMPDIR`, else `/tmp`.
#[must_use]
pub fn default_lock_dir() -> PathBuf {
    let shm = Path::new(SHARED_MEMORY_DIR);
    if access(shm, AccessFlags::R_OK | AccessFlags::W_OK).is_ok() {
        return shm.to_path_buf();
    }
    dirs::runtime_dir()
        .or_else(|| std::env::var_os("TMPDIR").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("/tmp"))
}

// =============================================================================
// Lock File
// =============================================================================

/// Location of a device's lock file and how hard to try to open it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockFile {
    path: PathBuf,
    max_attempts: u32,
}

impl LockFile {
    /// Attempts made before giving up on a lock file that keeps being replaced
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

    /// Lock file at an explicit path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Lock file for `address` inside `dir` (`bahfpagAABBCCDDEEFF.lock`)
    #[must_use]
    pub fn for_device(dir: &Path, address: &BluetoothAddress) -> Self {
        Self::new(dir.join(format!("bahfpag{}.lock", address.to_hex_compact())))
    }

    /// Override the retry bound
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Path of the lock file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open (creating if needed) the lock file and take the mutex
    ///
    /// Blocks until the mutex is free. If the file was unlinked or replaced
    /// while waiting, the stale descriptor is closed and the open is retried.
    pub fn acquire_mutex(&self) -> Result<LockHandle, Error> {
        self.acquire_mutex_with(|_| {})
    }

    /// [`acquire_mutex`](Self::acquire_mutex) with a hook run between the
    /// open and the mutex wait of every attempt
    pub(crate) fn acquire_mutex_with<F>(&self, mut before_lock: F) -> Result<LockHandle, Error>
    where
        F: FnMut(&Path),
    {
        for attempt in 1..=self.max_attempts {
            let file = self.open()?;
            before_lock(&self.path);

            let handle = LockHandle {
                file,
                path: self.path.clone(),
            };
            handle.lock_mutex()?;

            if self.is_current(&handle.file)? {
                debug!(path = ?self.path, attempt, "Acquired session mutex");
                return Ok(handle);
            }
            warn!(path = ?self.path, attempt, "Lock file replaced while waiting, retrying");
        }

        Err(Error::LockRaceExhausted {
            path: self.path.clone(),
            attempts: self.max_attempts,
        })
    }

    /// Delete the lock file
    pub fn remove(&self) -> Result<(), Error> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::lock_file(&self.path, e)),
        }
    }

    fn open(&self) -> Result<File, Error> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .mode(0o600)
            .open(&self.path)
            .map_err(|e| Error::lock_file(&self.path, e))
    }

    /// Whether `file` is still the file the path names
    fn is_current(&self, file: &File) -> Result<bool, Error> {
        let held = file
            .metadata()
            .map_err(|e| Error::lock_file(&self.path, e))?;
        match fs::metadata(&self.path) {
            Ok(current) => Ok(held.ino() == current.ino() && held.dev() == current.dev()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::lock_file(&self.path, e)),
        }
    }
}

// =============================================================================
// Lock Handle
// =============================================================================

/// An open lock file descriptor
///
/// Dropping the handle closes the descriptor and releases every lock on it.
#[derive(Debug)]
pub struct LockHandle {
    file: File,
    path: PathBuf,
}

impl LockHandle {
    /// Wait for the mutex
    pub fn lock_mutex(&self) -> Result<(), Error> {
        self.set_lock(libc::F_WRLCK, MUTEX_OFFSET, true)
            .map_err(|e| Error::lock_file(&self.path, e))
    }

    /// Release the mutex
    pub fn unlock_mutex(&self) -> Result<(), Error> {
        self.set_lock(libc::F_UNLCK, MUTEX_OFFSET, false)
            .map_err(|e| Error::lock_file(&self.path, e))
    }

    /// Take the flag in shared mode, waiting for an exclusive holder to leave
    pub fn share_flag(&self) -> Result<(), Error> {
        self.set_lock(libc::F_RDLCK, FLAG_OFFSET, true)
            .map_err(|e| Error::lock_file(&self.path, e))
    }

    /// Try to hold the flag exclusively
    ///
    /// Returns `Ok(false)` when another descriptor shares the flag.
    pub fn try_exclusive_flag(&self) -> Result<bool, Error> {
        match self.set_lock(libc::F_WRLCK, FLAG_OFFSET, false) {
            Ok(()) => Ok(true),
            Err(Errno::EAGAIN | Errno::EACCES) => Ok(false),
            Err(e) => Err(Error::lock_file(&self.path, e)),
        }
    }

    /// Turn an exclusive flag back into a shared one
    pub fn downgrade_flag(&self) -> Result<(), Error> {
        self.set_lock(libc::F_RDLCK, FLAG_OFFSET, false)
            .map_err(|e| Error::lock_file(&self.path, e))
    }

    /// Path the descriptor was opened from
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn set_lock(&self, kind: libc::c_int, start: libc::off_t, wait: bool) -> Result<(), Errno> {
        let mut lock: libc::flock = unsafe { std::mem::zeroed() };
        lock.l_type = kind as libc::c_short;
        lock.l_whence = libc::SEEK_SET as libc::c_short;
        lock.l_start = start;
        lock.l_len = 1;

        loop {
            let arg = if wait {
                FcntlArg::F_OFD_SETLKW(&lock)
            } else {
                FcntlArg::F_OFD_SETLK(&lock)
            };
            match fcntl(self.file.as_raw_fd(), arg) {
                Ok(_) => return Ok(()),
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

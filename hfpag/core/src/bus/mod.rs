//! Bus Transport
//!
//! The request/reply seam between the core and a D-Bus connection.
//!
//! The core only ever issues argument-less method calls and reads the reply
//! as a tree of [`Value`]s, so the trait is deliberately narrow:
//! - [`BusTransport`]: blocking `call` returning a [`Reply`]
//! - [`BusContext`]: a transport bound to one BlueALSA service name
//!
//! Two implementations ship with the crate:
//! - [`memory::InMemoryBus`]: an in-process object tree used by tests and embedders
//! - `system::SystemBus` (feature `system-bus`): the system bus via `zbus`

use std::sync::Arc;

use thiserror::Error;

use crate::error::DecodeError;

pub mod memory;
#[cfg(feature = "system-bus")]
pub mod system;
mod value;

pub use memory::{InMemoryBus, PcmObject};
pub use value::{Value, ValueKind};

// =============================================================================
// Well-known Names
// =============================================================================

/// Default BlueALSA service name
pub const DEFAULT_SERVICE: &str = "org.bluealsa";

/// Root object path of the BlueALSA object manager
pub const BLUEALSA_ROOT: &str = "/org/bluealsa";

/// Object manager interface
pub const OBJECT_MANAGER_INTERFACE: &str = "org.freedesktop.DBus.ObjectManager";

/// Properties interface
pub const PROPERTIES_INTERFACE: &str = "org.freedesktop.DBus.Properties";

/// BlueALSA PCM interface
pub const PCM_INTERFACE: &str = "org.bluealsa.PCM1";

/// BlueALSA RFCOMM interface
pub const RFCOMM_INTERFACE: &str = "org.bluealsa.RFCOMM1";

/// Standard error names a transport may report
pub mod error_names {
    /// Generic failure
    pub const FAILED: &str = "org.freedesktop.DBus.Error.Failed";
    /// Destination is not on the bus
    pub const SERVICE_UNKNOWN: &str = "org.freedesktop.DBus.Error.ServiceUnknown";
    /// Object does not exist
    pub const UNKNOWN_OBJECT: &str = "org.freedesktop.DBus.Error.UnknownObject";
    /// Method does not exist on the interface
    pub const UNKNOWN_METHOD: &str = "org.freedesktop.DBus.Error.UnknownMethod";
    /// Arguments or reply body of the wrong type
    pub const INVALID_ARGS: &str = "org.freedesktop.DBus.Error.InvalidArgs";
}

// =============================================================================
// Calls and Replies
// =============================================================================

/// One argument-less method call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MethodCall<'a> {
    /// Bus name of the receiving service
    pub destination: &'a str,
    /// Object path
    pub path: &'a str,
    /// Interface name
    pub interface: &'a str,
    /// Method name
    pub method: &'a str,
}

/// Arguments of a method return
#[derive(Debug, Default)]
pub struct Reply {
    args: Vec<Value>,
}

impl Reply {
    /// Build a reply from its arguments
    #[must_use]
    pub fn new(args: Vec<Value>) -> Self {
        Self { args }
    }

    /// Signature of the whole reply
    #[must_use]
    pub fn signature(&self) -> String {
        self.args.iter().map(Value::signature).collect()
    }

    /// First argument, or `Malformed` when the reply carries none
    ///
    /// `expected` is the signature the caller requires, used for the error.
    pub fn first(&self, expected: &'static str) -> Result<&Value, DecodeError> {
        self.args.first().ok_or(DecodeError::Malformed {
            expected,
            found: String::new(),
        })
    }

    /// Consume a reply that must be exactly one file descriptor
    pub fn into_single_fd(self) -> Result<std::os::fd::OwnedFd, DecodeError> {
        let found = self.signature();
        let mut args = self.args.into_iter();
        match (args.next(), args.next()) {
            (Some(Value::UnixFd(fd)), None) => Ok(fd),
            _ => Err(DecodeError::Malformed {
                expected: "h",
                found,
            }),
        }
    }
}

/// A call failed on the transport or was answered with an error
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{name}: {message}")]
pub struct BusError {
    /// D-Bus error name
    pub name: String,
    /// Human readable detail
    pub message: String,
}

impl BusError {
    /// Build an error with an explicit name
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Build a generic `org.freedesktop.DBus.Error.Failed` error
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(error_names::FAILED, message)
    }
}

// =============================================================================
// Transport Trait
// =============================================================================

/// Blocking request/reply access to a message bus
///
/// Implementations must never terminate the host process when the bus
/// connection drops; a dead connection is reported as a [`BusError`].
pub trait BusTransport {
    /// Issue a method call and wait for its reply
    fn call(&self, call: &MethodCall<'_>) -> Result<Reply, BusError>;
}

impl<T: BusTransport + ?Sized> BusTransport for &T {
    fn call(&self, call: &MethodCall<'_>) -> Result<Reply, BusError> {
        (**self).call(call)
    }
}

impl<T: BusTransport + ?Sized> BusTransport for Arc<T> {
    fn call(&self, call: &MethodCall<'_>) -> Result<Reply, BusError> {
        (**self).call(call)
    }
}

impl<T: BusTransport + ?Sized> BusTransport for Box<T> {
    fn call(&self, call: &MethodCall<'_>) -> Result<Reply, BusError> {
        (**self).call(call)
    }
}

/// A transport bound to one BlueALSA service
#[derive(Debug)]
pub struct BusContext<B> {
    transport: B,
    service: String,
}

impl<B: BusTransport> BusContext<B> {
    /// Bind a transport to a service name
    pub fn new(transport: B, service: impl Into<String>) -> Self {
        Self {
            transport,
            service: service.into(),
        }
    }

    /// Bind a transport to the default `org.bluealsa` service
    pub fn with_default_service(transport: B) -> Self {
        Self::new(transport, DEFAULT_SERVICE)
    }

    /// Service name calls are addressed to
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Call `interface.method` on `path` of the bound service
    pub fn call(&self, path: &str, interface: &str, method: &str) -> Result<Reply, BusError> {
        self.transport.call(&MethodCall {
            destination: &self.service,
            path,
            interface,
            method,
        })
    }
}

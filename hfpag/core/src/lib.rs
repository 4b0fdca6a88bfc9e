//! hfpag Core - BlueALSA HFP-AG Call Session Coordination
//!
//! When a host acts as a Bluetooth hands-free audio gateway, the remote
//! device only routes voice audio while it believes a call is in progress.
//! This crate discovers the PCMs a BlueALSA daemon exposes over D-Bus and
//! coordinates, across every stream of one device, a single "call transfer"
//! when the first stream starts and a single "call terminate" when the last
//! one stops.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     Audio framework / CLI                        │
//! │        install ─ hw_params ─ hw_free ─ close   (HfpagHook)       │
//! └───────────────┬──────────────────────────────┬───────────────────┘
//!                 │                              │
//!   ┌─────────────▼─────────────┐   ┌────────────▼───────────────┐
//!   │         endpoint          │   │          session           │
//!   │  enumerate ▸ decode ▸     │   │  HfpSession  ◀── LockFile  │
//!   │  select                   │   │  begin / end   (OFD locks) │
//!   └─────────────┬─────────────┘   └────────────┬───────────────┘
//!                 │                              │
//!                 │                  ┌───────────▼───────────────┐
//!                 │                  │          rfcomm           │
//!                 │                  │  open ▸ +CIEV sequences   │
//!                 │                  └───────────┬───────────────┘
//! ┌───────────────▼──────────────────────────────▼───────────────────┐
//! │                      bus (BusTransport)                          │
//! │        InMemoryBus          │        SystemBus (zbus)            │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`BusTransport`]: blocking request/reply seam to the message bus
//! - [`EndpointDescriptor`]: one PCM as reported by the daemon
//! - [`HfpSession`]: one stream's participation in a device's call session
//! - [`LockFile`]: the per-device lock file coordinating sessions
//! - [`HfpagHook`]: the stream lifecycle driving a session
//!
//! # Quick Start
//!
//! ```ignore
//! use hfpag_core::{HfpagHook, HookConfig, StreamDirection};
//! use hfpag_core::bus::system::SystemBus;
//!
//! let bus = SystemBus::connect()?;
//! let config = HookConfig::from_env()?;
//! let mut hook = HfpagHook::install(bus, &config, StreamDirection::Playback)?;
//!
//! hook.hw_params();   // first stream of the device: call transferred
//! // ... stream audio ...
//! hook.hw_free();     // last stream of the device: call terminated
//! hook.close();
//! ```
//!
//! # Module Overview
//!
//! - [`address`]: Bluetooth device addresses
//! - [`bus`]: bus transport trait, value tree, in-memory and system buses
//! - [`config`]: hook configuration (TOML file + environment)
//! - [`decode`]: dictionary walker over bus value trees
//! - [`endpoint`]: PCM enumeration and selection
//! - [`error`]: error types
//! - [`hook`]: stream lifecycle
//! - [`rfcomm`]: control channel and AT command sequences
//! - [`session`]: lock file based call session coordination

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod address;
pub mod bus;
pub mod config;
pub mod decode;
pub mod endpoint;
pub mod error;
pub mod hook;
pub mod rfcomm;
pub mod session;

// Re-exports for convenience
pub use address::{AddressParseError, BluetoothAddress};
pub use bus::{BusContext, BusError, BusTransport, InMemoryBus, MethodCall, PcmObject, Reply, Value, ValueKind};
pub use endpoint::{
    decode_managed_objects, enumerate, find_endpoint, select, Direction, EndpointDescriptor,
    TransportKind, TransportMask,
};
pub use error::{CommandDeliveryError, DecodeError, Error};
pub use hook::{HfpagHook, StreamDirection};
pub use rfcomm::{open_control_channel, send_sequence, CallSignal};
pub use session::{control_path_for, default_lock_dir, HfpSession, LockFile, LockHandle, SessionState};

// Config exports
pub use config::{load_config, load_config_with, ConfigError, HookConfig, HookToml};

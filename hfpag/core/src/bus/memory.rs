//! In-Memory Bus
//!
//! A [`BusTransport`] that serves a programmable BlueALSA object tree from
//! inside the process.
//!
//! # Architecture
//!
//! ```text
//!                        InMemoryBus
//!          ┌──────────────────────────────────────────┐
//!          │ objects: Vec<ManagedObject>  (ordered)    │
//!          │ channels: HashMap<path, ControlChannel>   │
//!          │   - wrapped in Mutex<>                    │
//!          └───────┬───────────────────────┬───────────┘
//!                  │                       │
//!       GetManagedObjects            RFCOMM1.Open
//!       a{oa{sa{sv}}} tree           UnixStream::pair()
//!                                    local end → caller
//!                                    peer end  → retained
//! ```
//!
//! The peer end of every opened control channel is retained so tests can
//! read back exactly what was written with [`InMemoryBus::transcript`].

use std::collections::HashMap;
use std::io::{ErrorKind, Read};
use std::os::fd::OwnedFd;
use std::os::unix::net::UnixStream;

use parking_lot::Mutex;
use tracing::debug;

use super::{
    error_names, BusError, BusTransport, MethodCall, Reply, Value, BLUEALSA_ROOT,
    DEFAULT_SERVICE, OBJECT_MANAGER_INTERFACE, PCM_INTERFACE, PROPERTIES_INTERFACE,
    RFCOMM_INTERFACE,
};

/// Properties of one PCM object served by [`InMemoryBus`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PcmObject {
    /// Object path of the PCM
    pub path: String,
    /// Object path of the owning BlueZ device
    pub device_path: String,
    /// `Transport` property, as the daemon reports it
    pub transport: String,
    /// `Mode` property
    pub mode: String,
    /// `Sequence` property
    pub sequence: u32,
}

impl PcmObject {
    /// Describe a PCM object
    pub fn new(
        path: impl Into<String>,
        device_path: impl Into<String>,
        transport: impl Into<String>,
        mode: impl Into<String>,
        sequence: u32,
    ) -> Self {
        Self {
            path: path.into(),
            device_path: device_path.into(),
            transport: transport.into(),
            mode: mode.into(),
            sequence,
        }
    }

    fn properties(&self) -> Value {
        Value::Array(vec![
            Value::entry(
                Value::from("Device"),
                Value::variant(Value::object_path(self.device_path.as_str())),
            ),
            Value::entry(
                Value::from("Sequence"),
                Value::variant(Value::U32(self.sequence)),
            ),
            Value::entry(
                Value::from("Transport"),
                Value::variant(Value::from(self.transport.as_str())),
            ),
            Value::entry(
                Value::from("Mode"),
                Value::variant(Value::from(self.mode.as_str())),
            ),
            Value::entry(Value::from("Format"), Value::variant(Value::U16(0x8210))),
            Value::entry(Value::from("Channels"), Value::variant(Value::Byte(1))),
            Value::entry(Value::from("Sampling"), Value::variant(Value::U32(8000))),
            Value::entry(Value::from("Codec"), Value::variant(Value::from("CVSD"))),
            Value::entry(Value::from("SoftVolume"), Value::variant(Value::Bool(false))),
        ])
    }
}

#[derive(Debug)]
enum ManagedObject {
    Pcm(PcmObject),
    Rfcomm(String),
}

impl ManagedObject {
    fn path(&self) -> &str {
        match self {
            Self::Pcm(pcm) => &pcm.path,
            Self::Rfcomm(path) => path,
        }
    }

    fn to_value(&self) -> Value {
        let interfaces = match self {
            Self::Pcm(pcm) => vec![
                Value::entry(Value::from(PCM_INTERFACE), pcm.properties()),
                Value::entry(Value::from(PROPERTIES_INTERFACE), Value::Array(Vec::new())),
            ],
            Self::Rfcomm(_) => vec![Value::entry(
                Value::from(RFCOMM_INTERFACE),
                Value::Array(vec![
                    Value::entry(Value::from("Transport"), Value::variant(Value::from("HFP-AG"))),
                    Value::entry(Value::from("Features"), Value::variant(Value::U32(0))),
                ]),
            )],
        };
        Value::entry(Value::object_path(self.path()), Value::Array(interfaces))
    }
}

#[derive(Debug)]
struct ControlChannel {
    available: bool,
    opened: usize,
    peers: Vec<UnixStream>,
    received: Vec<u8>,
}

impl ControlChannel {
    fn new() -> Self {
        Self {
            available: true,
            opened: 0,
            peers: Vec::new(),
            received: Vec::new(),
        }
    }

    /// Move everything currently readable from the peers into `received`
    fn drain(&mut self) {
        let mut buf = [0u8; 256];
        self.peers.retain_mut(|peer| {
            if peer.set_nonblocking(true).is_err() {
                return false;
            }
            loop {
                match peer.read(&mut buf) {
                    Ok(0) => return false,
                    Ok(n) => self.received.extend_from_slice(&buf[..n]),
                    Err(e) if e.kind() == ErrorKind::Interrupted => {}
                    Err(_) => return true,
                }
            }
        });
    }
}

#[derive(Debug, Default)]
struct State {
    objects: Vec<ManagedObject>,
    channels: HashMap<String, ControlChannel>,
    disconnected: bool,
}

/// In-process BlueALSA service
#[derive(Debug)]
pub struct InMemoryBus {
    service: String,
    state: Mutex<State>,
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBus {
    /// Empty bus answering as `org.bluealsa`
    #[must_use]
    pub fn new() -> Self {
        Self::with_service(DEFAULT_SERVICE)
    }

    /// Empty bus answering as `service`
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            state: Mutex::new(State::default()),
        }
    }

    /// Publish a PCM object
    pub fn add_pcm(&self, pcm: PcmObject) {
        self.state.lock().objects.push(ManagedObject::Pcm(pcm));
    }

    /// Publish an RFCOMM control object at `path`
    pub fn add_rfcomm(&self, path: impl Into<String>) {
        let path = path.into();
        let mut state = self.state.lock();
        state.channels.insert(path.clone(), ControlChannel::new());
        state.objects.push(ManagedObject::Rfcomm(path));
    }

    /// Make `Open` on an RFCOMM object fail (or succeed again)
    pub fn set_rfcomm_available(&self, path: &str, available: bool) {
        if let Some(channel) = self.state.lock().channels.get_mut(path) {
            channel.available = available;
        }
    }

    /// Simulate a dropped connection: every call fails while set
    pub fn set_disconnected(&self, disconnected: bool) {
        self.state.lock().disconnected = disconnected;
    }

    /// Number of successful `Open` calls on an RFCOMM object
    #[must_use]
    pub fn opened_channels(&self, path: &str) -> usize {
        self.state
            .lock()
            .channels
            .get(path)
            .map_or(0, |channel| channel.opened)
    }

    /// Everything written to the control channels of `path` so far
    #[must_use]
    pub fn transcript(&self, path: &str) -> String {
        let mut state = self.state.lock();
        match state.channels.get_mut(path) {
            Some(channel) => {
                channel.drain();
                String::from_utf8_lossy(&channel.received).into_owned()
            }
            None => String::new(),
        }
    }

    fn managed_objects(&self) -> Reply {
        let state = self.state.lock();
        let objects = state.objects.iter().map(ManagedObject::to_value).collect();
        Reply::new(vec![Value::Array(objects)])
    }

    fn open_rfcomm(&self, path: &str) -> Result<Reply, BusError> {
        let mut state = self.state.lock();
        let channel = state.channels.get_mut(path).ok_or_else(|| {
            BusError::new(error_names::UNKNOWN_OBJECT, format!("No such object: {path}"))
        })?;
        if !channel.available {
            return Err(BusError::failed("RFCOMM link not available"));
        }

        let (local, peer) =
            UnixStream::pair().map_err(|e| BusError::failed(format!("socketpair: {e}")))?;
        channel.opened += 1;
        channel.peers.push(peer);
        debug!(path = %path, opened = channel.opened, "Opened in-memory RFCOMM channel");

        Ok(Reply::new(vec![Value::UnixFd(OwnedFd::from(local))]))
    }
}

impl BusTransport for InMemoryBus {
    fn call(&self, call: &MethodCall<'_>) -> Result<Reply, BusError> {
        if self.state.lock().disconnected {
            return Err(BusError::failed("Connection is closed"));
        }
        if call.destination != self.service {
            return Err(BusError::new(
                error_names::SERVICE_UNKNOWN,
                format!("The name {} was not provided by any .service files", call.destination),
            ));
        }

        match (call.interface, call.method) {
            (OBJECT_MANAGER_INTERFACE, "GetManagedObjects") if call.path == BLUEALSA_ROOT => {
                Ok(self.managed_objects())
            }
            (RFCOMM_INTERFACE, "Open") => self.open_rfcomm(call.path),
            _ => Err(BusError::new(
                error_names::UNKNOWN_METHOD,
                format!(
                    "No such method '{}' in interface '{}' at object path '{}'",
                    call.method, call.interface, call.path
                ),
            )),
        }
    }
}

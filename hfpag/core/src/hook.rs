//! PCM Hook Lifecycle
//!
//! [`HfpagHook`] ties one host audio stream to its device's call session.
//! The audio framework drives it through four events:
//!
//! | Event       | Action                                                |
//! |-------------|-------------------------------------------------------|
//! | install     | enumerate PCMs, select the device's SCO PCM           |
//! | hw_params   | join the call session                                 |
//! | hw_free     | leave the call session, if joined                     |
//! | close       | drop the session, releasing any held lock             |
//!
//! A SCO PCM that is not an HFP audio gateway gets an inert hook: the stream
//! opens normally and no call is ever signaled. Failures during `hw_params`
//! and `hw_free` are logged and never reach the audio path.

use std::fmt;

use tracing::{debug, warn};

use crate::bus::{BusContext, BusTransport};
use crate::config::HookConfig;
use crate::endpoint::{find_endpoint, Direction, EndpointDescriptor, TransportKind, TransportMask};
use crate::error::Error;
use crate::session::HfpSession;

/// Direction of the host stream the hook is attached to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamDirection {
    /// Host plays audio to the remote device
    Playback,
    /// Host records audio from the remote device
    Capture,
}

impl StreamDirection {
    /// Direction of the daemon PCM serving this stream
    #[must_use]
    pub const fn pcm_direction(self) -> Direction {
        match self {
            Self::Playback => Direction::Sink,
            Self::Capture => Direction::Source,
        }
    }
}

impl fmt::Display for StreamDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Playback => write!(f, "playback"),
            Self::Capture => write!(f, "capture"),
        }
    }
}

/// Call session hook for one stream
#[derive(Debug)]
pub struct HfpagHook<B: BusTransport> {
    bus: BusContext<B>,
    pcm: EndpointDescriptor,
    session: Option<HfpSession>,
    session_started: bool,
}

impl<B: BusTransport> HfpagHook<B> {
    /// Attach to the SCO PCM of `config.device` serving `stream`
    ///
    /// Only an HFP-AG PCM gets a call session; any other SCO transport yields
    /// a hook whose events do nothing.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] when no SCO PCM of that device and direction exists
    /// - bus, decode and device path errors from the lookup
    pub fn install(transport: B, config: &HookConfig, stream: StreamDirection) -> Result<Self, Error> {
        let bus = BusContext::new(transport, config.service.as_str());
        let pcm = find_endpoint(&bus, &config.device, TransportMask::SCO, stream.pcm_direction())?;

        let session = if pcm.transport_kind == TransportKind::HfpAg {
            let session = HfpSession::new(&pcm.device_path, &pcm.device_address, &config.lock_dir())?;
            debug!(pcm = %pcm.path, stream = %stream, "Installed HFP-AG hook");
            Some(session)
        } else {
            debug!(
                pcm = %pcm.path,
                transport = %pcm.transport_kind,
                "Not an HFP audio gateway, call signaling disabled"
            );
            None
        };

        Ok(Self {
            bus,
            pcm,
            session,
            session_started: false,
        })
    }

    /// Stream parameters were accepted: join the call session
    pub fn hw_params(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.begin(&self.bus) {
            Ok(()) => self.session_started = true,
            Err(e) => warn!(pcm = %self.pcm.path, error = %e, "Unable to begin call session"),
        }
    }

    /// Stream parameters were released: leave the call session
    pub fn hw_free(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !self.session_started {
            return;
        }
        self.session_started = false;
        if let Err(e) = session.end(&self.bus) {
            warn!(pcm = %self.pcm.path, error = %e, "Unable to end call session");
        }
    }

    /// Detach from the stream
    pub fn close(self) {
        debug!(pcm = %self.pcm.path, started = self.session_started, "Closing HFP-AG hook");
    }

    /// PCM the hook is attached to
    #[must_use]
    pub fn pcm(&self) -> &EndpointDescriptor {
        &self.pcm
    }

    /// The stream's call session, `None` for a PCM that is not an HFP gateway
    #[must_use]
    pub fn session(&self) -> Option<&HfpSession> {
        self.session.as_ref()
    }

    /// Whether `hw_params` joined the session and `hw_free` has not left it
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.session_started
    }
}

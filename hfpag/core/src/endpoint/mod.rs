//! PCM Endpoints
//!
//! Typed descriptions of the PCMs a BlueALSA daemon exposes, how they are
//! decoded from a managed-objects reply, and how one is picked for a hook.
//!
//! - [`enumerate()`]: list every PCM the daemon currently serves
//! - [`select()`]: pick one PCM by address, transport mask and direction
//! - [`find_endpoint`]: both, in one call

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use crate::address::BluetoothAddress;

mod enumerate;
mod properties;
mod select;

pub use enumerate::{decode_managed_objects, enumerate};
pub use properties::decode_properties;
pub use select::{find_endpoint, select};

// =============================================================================
// Transport
// =============================================================================

/// Bluetooth profile and role of a PCM
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// No recognized transport
    #[default]
    None,
    /// A2DP source
    A2dpSource,
    /// A2DP sink
    A2dpSink,
    /// HFP audio gateway
    HfpAg,
    /// HFP hands-free
    HfpHf,
    /// HSP audio gateway
    HspAg,
    /// HSP headset
    HspHs,
}

impl TransportKind {
    /// Recognized kinds with their match text, in match priority order
    const PATTERNS: [(&'static str, TransportKind); 6] = [
        ("A2DP-source", Self::A2dpSource),
        ("A2DP-sink", Self::A2dpSink),
        ("HFP-AG", Self::HfpAg),
        ("HFP-HF", Self::HfpHf),
        ("HSP-AG", Self::HspAg),
        ("HSP-HS", Self::HspHs),
    ];

    /// Classify the daemon's `Transport` property
    ///
    /// The property carries a codec suffix (`"HFP-AG (mSBC)"`), so this is a
    /// containment test; the first pattern found wins.
    #[must_use]
    pub fn from_property(value: &str) -> Self {
        Self::PATTERNS
            .iter()
            .find(|(pattern, _)| value.contains(pattern))
            .map_or(Self::None, |(_, kind)| *kind)
    }

    /// Mask bit for this kind (empty for `None`)
    #[must_use]
    pub const fn mask(self) -> TransportMask {
        match self {
            Self::None => TransportMask::NONE,
            Self::A2dpSource => TransportMask::A2DP_SOURCE,
            Self::A2dpSink => TransportMask::A2DP_SINK,
            Self::HfpAg => TransportMask::HFP_AG,
            Self::HfpHf => TransportMask::HFP_HF,
            Self::HspAg => TransportMask::HSP_AG,
            Self::HspHs => TransportMask::HSP_HS,
        }
    }

    /// Daemon spelling of this kind
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::A2dpSource => "A2DP-source",
            Self::A2dpSink => "A2DP-sink",
            Self::HfpAg => "HFP-AG",
            Self::HfpHf => "HFP-HF",
            Self::HspAg => "HSP-AG",
            Self::HspHs => "HSP-HS",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Set of transport kinds
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TransportMask(u32);

impl TransportMask {
    /// Empty set
    pub const NONE: Self = Self(0);
    /// A2DP source
    pub const A2DP_SOURCE: Self = Self(1 << 0);
    /// A2DP sink
    pub const A2DP_SINK: Self = Self(1 << 1);
    /// HFP audio gateway
    pub const HFP_AG: Self = Self(1 << 2);
    /// HFP hands-free
    pub const HFP_HF: Self = Self(1 << 3);
    /// HSP audio gateway
    pub const HSP_AG: Self = Self(1 << 4);
    /// HSP headset
    pub const HSP_HS: Self = Self(1 << 5);

    /// Any A2DP role
    pub const A2DP: Self = Self(Self::A2DP_SOURCE.0 | Self::A2DP_SINK.0);
    /// Any HFP role
    pub const HFP: Self = Self(Self::HFP_AG.0 | Self::HFP_HF.0);
    /// Any HSP role
    pub const HSP: Self = Self(Self::HSP_AG.0 | Self::HSP_HS.0);
    /// Any SCO (voice) transport
    pub const SCO: Self = Self(Self::HFP.0 | Self::HSP.0);
    /// Any audio gateway role
    pub const AG: Self = Self(Self::HFP_AG.0 | Self::HSP_AG.0);
    /// Every transport
    pub const ALL: Self = Self(Self::A2DP.0 | Self::SCO.0);

    /// Raw bits
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether `kind` is in the set (`None` never is)
    #[must_use]
    pub const fn contains(self, kind: TransportKind) -> bool {
        self.0 & kind.mask().0 != 0
    }
}

impl BitOr for TransportMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for TransportMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl From<TransportKind> for TransportMask {
    fn from(kind: TransportKind) -> Self {
        kind.mask()
    }
}

// =============================================================================
// Direction
// =============================================================================

/// Audio direction of a PCM, from the daemon's point of view
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Audio flows out of the daemon (capture on the host)
    Source,
    /// Audio flows into the daemon (playback on the host)
    Sink,
}

impl Direction {
    /// Parse the daemon's `Mode` property; anything else is unknown
    #[must_use]
    pub fn from_mode(mode: &str) -> Option<Self> {
        match mode {
            "source" => Some(Self::Source),
            "sink" => Some(Self::Sink),
            _ => None,
        }
    }

    /// Daemon spelling
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Sink => "sink",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// =============================================================================
// Descriptor
// =============================================================================

/// One PCM as reported by the daemon
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EndpointDescriptor {
    /// Object path of the PCM
    pub path: String,
    /// Address of the remote device (all-zero when the device path has none)
    pub device_address: BluetoothAddress,
    /// Object path of the owning device
    pub device_path: String,
    /// Profile and role
    pub transport_kind: TransportKind,
    /// Direction, unset when the daemon reported an unknown mode
    pub direction: Option<Direction>,
    /// Creation counter assigned by the daemon
    pub sequence: u32,
}

impl EndpointDescriptor {
    /// Whether this PCM satisfies a selection
    #[must_use]
    pub fn matches(&self, mask: TransportMask, direction: Direction) -> bool {
        mask.contains(self.transport_kind) && self.direction == Some(direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_from_property() {
        assert_eq!(TransportKind::from_property("HFP-AG"), TransportKind::HfpAg);
        assert_eq!(TransportKind::from_property("HFP-AG (mSBC)"), TransportKind::HfpAg);
        assert_eq!(TransportKind::from_property("A2DP-sink"), TransportKind::A2dpSink);
        assert_eq!(TransportKind::from_property("HSP-HS"), TransportKind::HspHs);
        assert_eq!(TransportKind::from_property("LE-Audio"), TransportKind::None);
        assert_eq!(TransportKind::from_property(""), TransportKind::None);
    }

    #[test]
    fn test_transport_first_pattern_wins() {
        assert_eq!(
            TransportKind::from_property("HSP-AG HFP-AG"),
            TransportKind::HfpAg
        );
    }

    #[test]
    fn test_mask_composition() {
        assert_eq!(TransportMask::SCO.bits(), 0b11_1100);
        assert_eq!(TransportMask::A2DP.bits(), 0b11);
        assert_eq!(TransportMask::AG.bits(), 0b01_0100);
        assert_eq!(
            TransportMask::HFP_AG | TransportMask::HSP_AG,
            TransportMask::AG
        );

        assert!(TransportMask::SCO.contains(TransportKind::HfpAg));
        assert!(!TransportMask::SCO.contains(TransportKind::A2dpSink));
        assert!(!TransportMask::ALL.contains(TransportKind::None));
    }

    #[test]
    fn test_direction_from_mode() {
        assert_eq!(Direction::from_mode("source"), Some(Direction::Source));
        assert_eq!(Direction::from_mode("sink"), Some(Direction::Sink));
        assert_eq!(Direction::from_mode("Sink"), None);
        assert_eq!(Direction::from_mode(""), None);
    }

    #[test]
    fn test_descriptor_matches() {
        let pcm = EndpointDescriptor {
            transport_kind: TransportKind::HfpAg,
            direction: Some(Direction::Sink),
            ..Default::default()
        };
        assert!(pcm.matches(TransportMask::SCO, Direction::Sink));
        assert!(!pcm.matches(TransportMask::SCO, Direction::Source));
        assert!(!pcm.matches(TransportMask::A2DP, Direction::Sink));

        let unknown = EndpointDescriptor {
            transport_kind: TransportKind::HfpAg,
            direction: None,
            ..Default::default()
        };
        assert!(!unknown.matches(TransportMask::ALL, Direction::Sink));
    }
}

//! PCM selection

use tracing::debug;

use super::{enumerate, Direction, EndpointDescriptor, TransportMask};
use crate::address::BluetoothAddress;
use crate::bus::{BusContext, BusTransport};
use crate::error::Error;

/// Pick one PCM
///
/// With a concrete `address` the first PCM of that device matching `mask` and
/// `direction` is returned. With [`BluetoothAddress::ANY`] the matching PCM
/// with the highest sequence number wins, later entries winning ties.
pub fn select<'a>(
    endpoints: &'a [EndpointDescriptor],
    address: &BluetoothAddress,
    mask: TransportMask,
    direction: Direction,
) -> Result<&'a EndpointDescriptor, Error> {
    let mut candidates = endpoints.iter().filter(|pcm| pcm.matches(mask, direction));

    let selected = if address.is_any() {
        candidates.fold(None, |best: Option<&EndpointDescriptor>, pcm| match best {
            Some(best) if pcm.sequence < best.sequence => Some(best),
            _ => Some(pcm),
        })
    } else {
        candidates.find(|pcm| pcm.device_address == *address)
    };

    selected.ok_or(Error::NotFound)
}

/// Enumerate the daemon's PCMs and select one
pub fn find_endpoint<B: BusTransport>(
    bus: &BusContext<B>,
    address: &BluetoothAddress,
    mask: TransportMask,
    direction: Direction,
) -> Result<EndpointDescriptor, Error> {
    let endpoints = enumerate(bus)?;
    let pcm = select(&endpoints, address, mask, direction)?;
    debug!(
        path = %pcm.path,
        device = %pcm.device_address,
        transport = %pcm.transport_kind,
        sequence = pcm.sequence,
        "Selected PCM"
    );
    Ok(pcm.clone())
}

//! PCM property decoding

use super::{Direction, EndpointDescriptor, TransportKind};
use crate::address::BluetoothAddress;
use crate::bus::Value;
use crate::decode::for_each_property;
use crate::error::DecodeError;

/// Decode the `org.bluealsa.PCM1` property dictionary of the object at `path`
///
/// Unknown keys are skipped. A recognized key whose variant holds the wrong
/// type fails the whole decode with [`DecodeError::UnexpectedType`].
pub fn decode_properties(path: &str, props: &Value) -> Result<EndpointDescriptor, DecodeError> {
    let mut pcm = EndpointDescriptor {
        path: path.to_string(),
        ..EndpointDescriptor::default()
    };

    for_each_property(props, |key, value| {
        let value = value.as_variant().map_err(|e| e.for_key(key))?;
        apply_property(&mut pcm, key, value).map_err(|e| e.for_key(key))
    })?;

    Ok(pcm)
}

fn apply_property(pcm: &mut EndpointDescriptor, key: &str, value: &Value) -> Result<(), DecodeError> {
    match key {
        "Device" => {
            let device = value.as_object_path()?;
            pcm.device_address = BluetoothAddress::from_device_path(device).unwrap_or_default();
            pcm.device_path = device.to_string();
        }
        "Sequence" => pcm.sequence = value.as_u32()?,
        "Transport" => pcm.transport_kind = TransportKind::from_property(value.as_str()?),
        "Mode" => pcm.direction = Direction::from_mode(value.as_str()?),
        _ => {}
    }
    Ok(())
}

//! PCM enumeration via `GetManagedObjects`

use tracing::debug;

use super::{decode_properties, EndpointDescriptor, TransportKind};
use crate::bus::{
    BusContext, BusTransport, Reply, Value, ValueKind, BLUEALSA_ROOT, OBJECT_MANAGER_INTERFACE,
    PCM_INTERFACE,
};
use crate::decode::dict_entries;
use crate::error::{DecodeError, Error};

const MANAGED_OBJECTS_SIGNATURE: &str = "a{oa{sa{sv}}}";
const INTERFACES_SIGNATURE: &str = "a{sa{sv}}";

/// List every PCM the daemon serves
///
/// Objects without the PCM interface and PCMs without a recognized transport
/// are skipped. Any decode failure fails the whole call.
pub fn enumerate<B: BusTransport>(bus: &BusContext<B>) -> Result<Vec<EndpointDescriptor>, Error> {
    let reply = bus.call(BLUEALSA_ROOT, OBJECT_MANAGER_INTERFACE, "GetManagedObjects")?;
    let pcms = decode_managed_objects(&reply)?;
    debug!(service = %bus.service(), count = pcms.len(), "Enumerated PCMs");
    Ok(pcms)
}

/// Decode a `GetManagedObjects` reply into PCM descriptors
pub fn decode_managed_objects(reply: &Reply) -> Result<Vec<EndpointDescriptor>, DecodeError> {
    let objects = reply.first(MANAGED_OBJECTS_SIGNATURE)?;
    let mut pcms = Vec::new();

    for object in dict_entries(objects, MANAGED_OBJECTS_SIGNATURE, ValueKind::ObjectPath)? {
        let (path, interfaces) = object?;
        if let Some(pcm) = decode_object(path, interfaces)? {
            if pcm.transport_kind != TransportKind::None {
                pcms.push(pcm);
            }
        }
    }

    Ok(pcms)
}

fn decode_object(path: &str, interfaces: &Value) -> Result<Option<EndpointDescriptor>, DecodeError> {
    for interface in dict_entries(interfaces, INTERFACES_SIGNATURE, ValueKind::String)? {
        let (name, props) = interface?;
        if name == PCM_INTERFACE {
            return decode_properties(path, props).map(Some);
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::Direction;
    use pretty_assertions::assert_eq;

    fn prop(key: &str, value: Value) -> Value {
        Value::entry(Value::from(key), Value::variant(value))
    }

    fn pcm_object(path: &str, transport: &str, mode: &str, sequence: u32) -> Value {
        Value::entry(
            Value::object_path(path),
            Value::Array(vec![Value::entry(
                Value::from(PCM_INTERFACE),
                Value::Array(vec![
                    prop("Device", Value::object_path("/org/bluez/hci0/dev_12_34_56_78_9A_BC")),
                    prop("Sequence", Value::U32(sequence)),
                    prop("Transport", Value::from(transport)),
                    prop("Mode", Value::from(mode)),
                ]),
            )]),
        )
    }

    #[test]
    fn test_decodes_pcm_objects_in_order() {
        let reply = Reply::new(vec![Value::Array(vec![
            pcm_object("/org/bluealsa/hci0/dev_12_34_56_78_9A_BC/hfpag/sink", "HFP-AG", "sink", 2),
            pcm_object("/org/bluealsa/hci0/dev_12_34_56_78_9A_BC/hfpag/source", "HFP-AG", "source", 1),
        ])]);

        let pcms = decode_managed_objects(&reply).unwrap();
        let summary: Vec<(&str, Option<Direction>, u32)> = pcms
            .iter()
            .map(|p| (p.path.as_str(), p.direction, p.sequence))
            .collect();
        assert_eq!(
            summary,
            [
                ("/org/bluealsa/hci0/dev_12_34_56_78_9A_BC/hfpag/sink", Some(Direction::Sink), 2),
                ("/org/bluealsa/hci0/dev_12_34_56_78_9A_BC/hfpag/source", Some(Direction::Source), 1),
            ]
        );
    }

    #[test]
    fn test_skips_objects_without_pcm_interface() {
        let reply = Reply::new(vec![Value::Array(vec![
            Value::entry(
                Value::object_path("/org/bluealsa/hci0/dev_12_34_56_78_9A_BC/rfcomm"),
                Value::Array(vec![Value::entry(
                    Value::from("org.bluealsa.RFCOMM1"),
                    Value::Array(vec![prop("Transport", Value::from("HFP-AG"))]),
                )]),
            ),
            pcm_object("/org/bluealsa/hci0/dev_12_34_56_78_9A_BC/a2dpsrc/sink", "A2DP-source", "sink", 5),
        ])]);

        let pcms = decode_managed_objects(&reply).unwrap();
        assert_eq!(pcms.len(), 1);
        assert_eq!(pcms[0].transport_kind, TransportKind::A2dpSource);
    }

    #[test]
    fn test_drops_unrecognized_transport() {
        let reply = Reply::new(vec![Value::Array(vec![
            pcm_object("/org/bluealsa/hci0/dev_12_34_56_78_9A_BC/le/sink", "LE-Audio", "sink", 1),
        ])]);
        assert!(decode_managed_objects(&reply).unwrap().is_empty());
    }

    #[test]
    fn test_empty_reply_is_malformed() {
        let err = decode_managed_objects(&Reply::default()).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { .. }));
    }

    #[test]
    fn test_bad_variant_voids_whole_list() {
        let bad = Value::entry(
            Value::object_path("/org/bluealsa/hci0/dev_12_34_56_78_9A_BC/hfpag/source"),
            Value::Array(vec![Value::entry(
                Value::from(PCM_INTERFACE),
                Value::Array(vec![prop("Sequence", Value::from("one"))]),
            )]),
        );
        let reply = Reply::new(vec![Value::Array(vec![
            pcm_object("/org/bluealsa/hci0/dev_12_34_56_78_9A_BC/hfpag/sink", "HFP-AG", "sink", 2),
            bad,
        ])]);

        let err = decode_managed_objects(&reply).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnexpectedType {
                key: "Sequence".to_string(),
                expected: ValueKind::UInt32,
                actual: ValueKind::String,
            }
        );
    }

    #[test]
    fn test_object_that_is_not_a_dict_is_malformed() {
        let reply = Reply::new(vec![Value::from("a{oa{sa{sv}}}")]);
        assert!(matches!(
            decode_managed_objects(&reply),
            Err(DecodeError::Malformed { .. })
        ));

        let reply = Reply::new(vec![Value::Array(vec![Value::entry(
            Value::object_path("/org/bluealsa/x"),
            Value::from(3u32),
        )])]);
        assert_eq!(
            decode_managed_objects(&reply).unwrap_err(),
            DecodeError::Malformed {
                expected: INTERFACES_SIGNATURE,
                found: "u".to_string(),
            }
        );
    }

    #[test]
    fn test_wrong_key_kinds_are_malformed() {
        let string_object_key = Reply::new(vec![Value::Array(vec![Value::entry(
            Value::from("/org/bluealsa/hci0/dev_12_34_56_78_9A_BC/hfpag/sink"),
            Value::Array(vec![Value::entry(
                Value::from(PCM_INTERFACE),
                Value::Array(vec![prop("Transport", Value::from("HFP-AG"))]),
            )]),
        )])]);
        assert_eq!(
            decode_managed_objects(&string_object_key).unwrap_err(),
            DecodeError::Malformed {
                expected: MANAGED_OBJECTS_SIGNATURE,
                found: "{sa{sa{sv}}}".to_string(),
            }
        );

        let path_interface_key = Reply::new(vec![Value::Array(vec![Value::entry(
            Value::object_path("/org/bluealsa/hci0/dev_12_34_56_78_9A_BC/hfpag/sink"),
            Value::Array(vec![Value::entry(
                Value::object_path("/org/bluealsa/PCM1"),
                Value::Array(vec![prop("Transport", Value::from("HFP-AG"))]),
            )]),
        )])]);
        assert!(matches!(
            decode_managed_objects(&path_interface_key),
            Err(DecodeError::Malformed { expected: INTERFACES_SIGNATURE, .. })
        ));

        let path_property_key = Reply::new(vec![Value::Array(vec![Value::entry(
            Value::object_path("/org/bluealsa/hci0/dev_12_34_56_78_9A_BC/hfpag/sink"),
            Value::Array(vec![Value::entry(
                Value::from(PCM_INTERFACE),
                Value::Array(vec![Value::entry(
                    Value::object_path("/Transport"),
                    Value::variant(Value::from("HFP-AG")),
                )]),
            )]),
        )])]);
        assert!(matches!(
            decode_managed_objects(&path_property_key),
            Err(DecodeError::Malformed { expected: "a{sv}", .. })
        ));
    }
}

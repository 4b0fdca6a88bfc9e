//! System Bus Transport
//!
//! [`BusTransport`] over the D-Bus system bus using the blocking `zbus` API.
//!
//! Replies are converted into [`Value`] trees. Dictionaries are read through
//! [`OrderedDict`] so entries keep the order the daemon sent them in, which
//! the endpoint selector depends on.
//!
//! Calls carry no timeout of their own. A daemon that never answers blocks
//! the caller indefinitely, and since the transfer commands are sent while
//! the session mutex is held, every other stream of that device waits too.
//! Property values of kinds the selector never reads (dictionaries, file
//! descriptors) are refused with `InvalidArgs` instead of being coerced.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use tracing::debug;
use zbus::blocking::Connection;
use zbus::zvariant::{self, OwnedObjectPath, OwnedValue, Signature, Type};

use super::{error_names, BusError, BusTransport, MethodCall, Reply, Value};

type ManagedObjects =
    OrderedDict<OwnedObjectPath, OrderedDict<String, OrderedDict<String, OwnedValue>>>;

const MANAGED_OBJECTS_SIGNATURE: &str = "a{oa{sa{sv}}}";
const FD_SIGNATURE: &str = "h";

/// Connection to the system bus
#[derive(Debug, Clone)]
pub struct SystemBus {
    connection: Connection,
}

impl SystemBus {
    /// Connect to the system bus
    pub fn connect() -> Result<Self, BusError> {
        let connection = Connection::system().map_err(bus_error)?;
        debug!("Connected to system bus");
        Ok(Self { connection })
    }
}

impl BusTransport for SystemBus {
    fn call(&self, call: &MethodCall<'_>) -> Result<Reply, BusError> {
        let reply = self
            .connection
            .call_method(
                Some(call.destination),
                call.path,
                Some(call.interface),
                call.method,
                &(),
            )
            .map_err(bus_error)?;

        let signature = reply
            .header()
            .signature()
            .map(|s| s.as_str().to_owned())
            .unwrap_or_default();
        let body = reply.body();

        match signature.as_str() {
            "" => Ok(Reply::default()),
            MANAGED_OBJECTS_SIGNATURE => {
                let objects: ManagedObjects = body.deserialize().map_err(bus_error)?;
                Ok(Reply::new(vec![managed_objects_value(objects)?]))
            }
            FD_SIGNATURE => {
                let fd: zvariant::OwnedFd = body.deserialize().map_err(bus_error)?;
                Ok(Reply::new(vec![Value::UnixFd(fd.into())]))
            }
            other => Err(BusError::failed(format!(
                "Unsupported reply signature '{other}' from {}.{}",
                call.interface, call.method
            ))),
        }
    }
}

fn bus_error(err: zbus::Error) -> BusError {
    match err {
        zbus::Error::MethodError(name, detail, _) => {
            BusError::new(name.as_str(), detail.unwrap_or_default())
        }
        other => BusError::new(error_names::FAILED, other.to_string()),
    }
}

// =============================================================================
// Reply Conversion
// =============================================================================

fn managed_objects_value(objects: ManagedObjects) -> Result<Value, BusError> {
    let mut entries = Vec::with_capacity(objects.0.len());
    for (path, interfaces) in objects.0 {
        let mut ifaces = Vec::with_capacity(interfaces.0.len());
        for (name, props) in interfaces.0 {
            let props = props
                .0
                .into_iter()
                .map(|(key, value)| {
                    convert(&value).map(|v| Value::entry(Value::Str(key), Value::variant(v)))
                })
                .collect::<Result<Vec<_>, _>>()?;
            ifaces.push(Value::entry(Value::Str(name), Value::Array(props)));
        }
        entries.push(Value::entry(Value::object_path(path.as_str()), Value::Array(ifaces)));
    }
    Ok(Value::Array(entries))
}

/// Convert one property value
///
/// Dictionaries and descriptors are refused rather than approximated.
fn convert(value: &zvariant::Value<'_>) -> Result<Value, BusError> {
    let value = match value {
        zvariant::Value::U8(v) => Value::Byte(*v),
        zvariant::Value::Bool(v) => Value::Bool(*v),
        zvariant::Value::I16(v) => Value::I16(*v),
        zvariant::Value::U16(v) => Value::U16(*v),
        zvariant::Value::I32(v) => Value::I32(*v),
        zvariant::Value::U32(v) => Value::U32(*v),
        zvariant::Value::I64(v) => Value::I64(*v),
        zvariant::Value::U64(v) => Value::U64(*v),
        zvariant::Value::F64(v) => Value::F64(*v),
        zvariant::Value::Str(v) => Value::Str(v.as_str().to_owned()),
        zvariant::Value::ObjectPath(v) => Value::ObjectPath(v.as_str().to_owned()),
        zvariant::Value::Signature(v) => Value::Signature(v.as_str().to_owned()),
        zvariant::Value::Value(v) => Value::variant(convert(v)?),
        zvariant::Value::Array(v) => Value::Array(v.iter().map(convert).collect::<Result<_, _>>()?),
        zvariant::Value::Structure(v) => {
            Value::Struct(v.fields().iter().map(convert).collect::<Result<_, _>>()?)
        }
        other => {
            return Err(BusError::new(
                error_names::INVALID_ARGS,
                format!("Unsupported property value of type '{}'", other.value_signature()),
            ))
        }
    };
    Ok(value)
}

// =============================================================================
// Order-preserving Dictionary
// =============================================================================

/// A D-Bus dictionary read as a list of entries in wire order
#[derive(Debug)]
pub struct OrderedDict<K, V>(pub Vec<(K, V)>);

impl<K: Type, V: Type> Type for OrderedDict<K, V> {
    fn signature() -> Signature<'static> {
        Signature::from_string_unchecked(format!("a{{{}{}}}", K::signature(), V::signature()))
    }
}

impl<'de, K, V> Deserialize<'de> for OrderedDict<K, V>
where
    K: Deserialize<'de>,
    V: Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor<K, V>(PhantomData<(K, V)>);

        impl<'de, K, V> Visitor<'de> for EntriesVisitor<K, V>
        where
            K: Deserialize<'de>,
            V: Deserialize<'de>,
        {
            type Value = OrderedDict<K, V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a D-Bus dictionary")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry()? {
                    entries.push(entry);
                }
                Ok(OrderedDict(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordered_dict_signature() {
        assert_eq!(
            ManagedObjects::signature().as_str(),
            MANAGED_OBJECTS_SIGNATURE
        );
    }

    #[test]
    fn test_convert_scalars() {
        assert_eq!(
            convert(&zvariant::Value::from("HFP-AG")).unwrap().as_str().unwrap(),
            "HFP-AG"
        );
        assert_eq!(convert(&zvariant::Value::from(7u32)).unwrap().as_u32().unwrap(), 7);
        let path = zvariant::ObjectPath::try_from("/org/bluez/hci0").unwrap();
        assert_eq!(
            convert(&zvariant::Value::from(path)).unwrap().as_object_path().unwrap(),
            "/org/bluez/hci0"
        );
    }

    #[test]
    fn test_convert_refuses_dictionaries() {
        let mut map = std::collections::HashMap::new();
        map.insert("Volume".to_string(), 127u32);
        let err = convert(&zvariant::Value::from(map)).unwrap_err();
        assert_eq!(err.name, error_names::INVALID_ARGS);
        assert!(err.message.contains("a{su}"));
    }

    #[test]
    fn test_convert_nested_arrays() {
        let value = convert(&zvariant::Value::from(vec![1u16, 2u16])).unwrap();
        assert_eq!(value.signature(), "aq");
    }

    #[test]
    fn test_other_errors_map_to_failed() {
        let err = bus_error(zbus::Error::Failure("gone".to_string()));
        assert_eq!(err.name, error_names::FAILED);
    }
}

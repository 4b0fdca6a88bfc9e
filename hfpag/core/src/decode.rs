//! Variant Tree Decoder
//!
//! Walks one `a{s…}` node of a bus reply and yields its `(key, value)` pairs
//! in wire order.
//!
//! Two traversal styles share one implementation:
//! - pull: [`dict_entries`] returns a [`DictEntries`] iterator
//! - push: [`for_each_property`] invokes a callback per entry and stops at the
//!   first error the callback returns
//!
//! A node that is not an array of two-element dict entries keyed by the
//! expected kind (string, or object path for the managed objects level) is
//! [`DecodeError::Malformed`]. Value types are the caller's business.

use crate::bus::{Value, ValueKind};
use crate::error::DecodeError;

/// Signature of a property dictionary
pub const PROPERTIES_SIGNATURE: &str = "a{sv}";

/// Pull-style traversal of a dictionary node
#[derive(Debug)]
pub struct DictEntries<'a> {
    entries: std::slice::Iter<'a, Value>,
    expected: &'static str,
    key: ValueKind,
}

impl<'a> Iterator for DictEntries<'a> {
    type Item = Result<(&'a str, &'a Value), DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.entries.next()?;
        Some(self.decode_entry(entry))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl<'a> DictEntries<'a> {
    fn decode_entry(&self, entry: &'a Value) -> Result<(&'a str, &'a Value), DecodeError> {
        let malformed = || DecodeError::Malformed {
            expected: self.expected,
            found: entry.signature(),
        };
        let (key, value) = entry.as_dict_entry().map_err(|_| malformed())?;
        let key = match (key, self.key) {
            (Value::Str(s), ValueKind::String) | (Value::ObjectPath(s), ValueKind::ObjectPath) => {
                s.as_str()
            }
            _ => return Err(malformed()),
        };
        Ok((key, value))
    }
}

/// Iterate the entries of a dictionary node
///
/// `expected` is the full signature of the node, reported when it is not an
/// array. Every key must be of kind `key`: [`ValueKind::ObjectPath`] for
/// `a{oa{sa{sv}}}`, [`ValueKind::String`] for `a{sa{sv}}` and `a{sv}`.
pub fn dict_entries<'a>(
    node: &'a Value,
    expected: &'static str,
    key: ValueKind,
) -> Result<DictEntries<'a>, DecodeError> {
    let entries = node.as_array().map_err(|_| DecodeError::Malformed {
        expected,
        found: node.signature(),
    })?;
    Ok(DictEntries {
        entries: entries.iter(),
        expected,
        key,
    })
}

/// Iterate a property dictionary (`a{sv}`)
pub fn property_entries(node: &Value) -> Result<DictEntries<'_>, DecodeError> {
    dict_entries(node, PROPERTIES_SIGNATURE, ValueKind::String)
}

/// Invoke `f` once per property entry, in order
///
/// The first error, whether from the walker or from `f`, aborts the walk and
/// is returned unchanged.
pub fn for_each_property<F>(node: &Value, mut f: F) -> Result<(), DecodeError>
where
    F: FnMut(&str, &Value) -> Result<(), DecodeError>,
{
    for entry in property_entries(node)? {
        let (key, value) = entry?;
        f(key, value)?;
    }
    Ok(())
}

//! Bus Value Tree
//!
//! Self-describing values carried in bus replies. Every node knows its wire
//! type, and the typed accessors fail with [`DecodeError::TypeMismatch`]
//! instead of coercing.

use std::fmt;
use std::os::fd::OwnedFd;

use crate::error::DecodeError;

/// Wire type of a [`Value`]
///
/// Displayed as the D-Bus signature code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// `y`
    Byte,
    /// `b`
    Boolean,
    /// `n`
    Int16,
    /// `q`
    UInt16,
    /// `i`
    Int32,
    /// `u`
    UInt32,
    /// `x`
    Int64,
    /// `t`
    UInt64,
    /// `d`
    Double,
    /// `s`
    String,
    /// `o`
    ObjectPath,
    /// `g`
    Signature,
    /// `h`
    UnixFd,
    /// `a`
    Array,
    /// `r`
    Struct,
    /// `e`
    DictEntry,
    /// `v`
    Variant,
}

impl ValueKind {
    /// D-Bus signature code for this type
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::Byte => 'y',
            Self::Boolean => 'b',
            Self::Int16 => 'n',
            Self::UInt16 => 'q',
            Self::Int32 => 'i',
            Self::UInt32 => 'u',
            Self::Int64 => 'x',
            Self::UInt64 => 't',
            Self::Double => 'd',
            Self::String => 's',
            Self::ObjectPath => 'o',
            Self::Signature => 'g',
            Self::UnixFd => 'h',
            Self::Array => 'a',
            Self::Struct => 'r',
            Self::DictEntry => 'e',
            Self::Variant => 'v',
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// One node of a decoded bus message
#[derive(Debug)]
pub enum Value {
    /// Unsigned byte
    Byte(u8),
    /// Boolean
    Bool(bool),
    /// Signed 16-bit integer
    I16(i16),
    /// Unsigned 16-bit integer
    U16(u16),
    /// Signed 32-bit integer
    I32(i32),
    /// Unsigned 32-bit integer
    U32(u32),
    /// Signed 64-bit integer
    I64(i64),
    /// Unsigned 64-bit integer
    U64(u64),
    /// IEEE 754 double
    F64(f64),
    /// UTF-8 string
    Str(String),
    /// Object path
    ObjectPath(String),
    /// Type signature
    Signature(String),
    /// Unix file descriptor passed with the message
    UnixFd(OwnedFd),
    /// Array of values (dictionaries are arrays of [`Value::DictEntry`])
    Array(Vec<Value>),
    /// Structure
    Struct(Vec<Value>),
    /// Key/value pair inside a dictionary
    DictEntry(Box<Value>, Box<Value>),
    /// Variant wrapping a value of any type
    Variant(Box<Value>),
}

impl Value {
    /// Build a dictionary entry
    pub fn entry(key: Value, value: Value) -> Self {
        Self::DictEntry(Box::new(key), Box::new(value))
    }

    /// Wrap a value in a variant
    pub fn variant(value: Value) -> Self {
        Self::Variant(Box::new(value))
    }

    /// Build an object path value
    pub fn object_path(value: impl Into<String>) -> Self {
        Self::ObjectPath(value.into())
    }

    /// Wire type of this value
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Byte(_) => ValueKind::Byte,
            Self::Bool(_) => ValueKind::Boolean,
            Self::I16(_) => ValueKind::Int16,
            Self::U16(_) => ValueKind::UInt16,
            Self::I32(_) => ValueKind::Int32,
            Self::U32(_) => ValueKind::UInt32,
            Self::I64(_) => ValueKind::Int64,
            Self::U64(_) => ValueKind::UInt64,
            Self::F64(_) => ValueKind::Double,
            Self::Str(_) => ValueKind::String,
            Self::ObjectPath(_) => ValueKind::ObjectPath,
            Self::Signature(_) => ValueKind::Signature,
            Self::UnixFd(_) => ValueKind::UnixFd,
            Self::Array(_) => ValueKind::Array,
            Self::Struct(_) => ValueKind::Struct,
            Self::DictEntry(..) => ValueKind::DictEntry,
            Self::Variant(_) => ValueKind::Variant,
        }
    }

    /// Signature of this value, as far as it can be inferred
    ///
    /// Empty arrays carry no element type and render as `a`.
    #[must_use]
    pub fn signature(&self) -> String {
        match self {
            Self::Array(items) => match items.first() {
                Some(Self::DictEntry(key, value)) => {
                    format!("a{{{}{}}}", key.signature(), value.signature())
                }
                Some(first) => format!("a{}", first.signature()),
                None => "a".to_string(),
            },
            Self::Struct(fields) => {
                let inner: String = fields.iter().map(Self::signature).collect();
                format!("({inner})")
            }
            Self::DictEntry(key, value) => format!("{{{}{}}}", key.signature(), value.signature()),
            other => other.kind().code().to_string(),
        }
    }

    fn mismatch(&self, expected: ValueKind) -> DecodeError {
        DecodeError::TypeMismatch {
            expected,
            actual: self.kind(),
        }
    }

    /// Borrow a string value
    pub fn as_str(&self) -> Result<&str, DecodeError> {
        match self {
            Self::Str(s) => Ok(s),
            other => Err(other.mismatch(ValueKind::String)),
        }
    }

    /// Borrow an object path value
    pub fn as_object_path(&self) -> Result<&str, DecodeError> {
        match self {
            Self::ObjectPath(p) => Ok(p),
            other => Err(other.mismatch(ValueKind::ObjectPath)),
        }
    }

    /// Read an unsigned 32-bit value
    pub fn as_u32(&self) -> Result<u32, DecodeError> {
        match self {
            Self::U32(n) => Ok(*n),
            other => Err(other.mismatch(ValueKind::UInt32)),
        }
    }

    /// Read a boolean value
    pub fn as_bool(&self) -> Result<bool, DecodeError> {
        match self {
            Self::Bool(b) => Ok(*b),
            other => Err(other.mismatch(ValueKind::Boolean)),
        }
    }

    /// Borrow the elements of an array
    pub fn as_array(&self) -> Result<&[Value], DecodeError> {
        match self {
            Self::Array(items) => Ok(items),
            other => Err(other.mismatch(ValueKind::Array)),
        }
    }

    /// Borrow the key and value of a dictionary entry
    pub fn as_dict_entry(&self) -> Result<(&Value, &Value), DecodeError> {
        match self {
            Self::DictEntry(key, value) => Ok((key, value)),
            other => Err(other.mismatch(ValueKind::DictEntry)),
        }
    }

    /// Borrow the value inside a variant
    pub fn as_variant(&self) -> Result<&Value, DecodeError> {
        match self {
            Self::Variant(inner) => Ok(inner),
            other => Err(other.mismatch(ValueKind::Variant)),
        }
    }

    /// Take ownership of a passed file descriptor
    pub fn into_fd(self) -> Result<OwnedFd, DecodeError> {
        match self {
            Self::UnixFd(fd) => Ok(fd),
            other => Err(other.mismatch(ValueKind::UnixFd)),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::U32(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

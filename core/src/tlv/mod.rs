//! Decoded TLV elements (A.2) and the schema traits used by command bindings.
//!
//! The byte-level codec lives outside this crate. Commands receive their
//! arguments as an element tree and hand back an element tree; the traits here
//! turn those trees into typed requests and responses.

use core::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagControl {
    Anonymous,
    ContextSpecific(u8),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TlvField {
    pub tag: TagControl,
    pub value: TlvElement,
}

/// A single decoded element. Containers own their children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TlvElement {
    Null,
    Boolean(bool),
    Unsigned(u64),
    Signed(i64),
    String(String),
    ByteString(Bytes),
    Structure(Vec<TlvField>),
    Array(Vec<TlvElement>),
}

impl TlvElement {
    pub const fn type_name(&self) -> &'static str {
        match self {
            TlvElement::Null => "null",
            TlvElement::Boolean(_) => "boolean",
            TlvElement::Unsigned(_) => "unsigned integer",
            TlvElement::Signed(_) => "signed integer",
            TlvElement::String(_) => "utf8 string",
            TlvElement::ByteString(_) => "octet string",
            TlvElement::Structure(_) => "structure",
            TlvElement::Array(_) => "array",
        }
    }

    pub const fn empty_struct() -> Self {
        TlvElement::Structure(Vec::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, TlvElement::Null)
    }
}

impl fmt::Display for TlvElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TlvElement::Null => write!(f, "null"),
            TlvElement::Boolean(value) => write!(f, "{value}"),
            TlvElement::Unsigned(value) => write!(f, "{value}"),
            TlvElement::Signed(value) => write!(f, "{value}"),
            TlvElement::String(value) => write!(f, "{value:?}"),
            TlvElement::ByteString(value) => write!(f, "0x{}", hex::encode(value)),
            TlvElement::Structure(fields) => {
                write!(f, "{{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match field.tag {
                        TagControl::Anonymous => write!(f, "{}", field.value)?,
                        TagControl::ContextSpecific(tag) => write!(f, "{tag}: {}", field.value)?,
                    }
                }
                write!(f, "}}")
            }
            TlvElement::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("missing mandatory field with tag {0}")]
    MissingField(u8),
    #[error("expected {expected}, found {found}")]
    UnexpectedType {
        expected: &'static str,
        found: &'static str,
    },
    #[error("value {value} does not fit into {target}")]
    OutOfRange { value: i128, target: &'static str },
}

/// Request schema: turns a decoded element into a typed value.
pub trait FromTlv: Sized {
    fn from_tlv(element: &TlvElement) -> Result<Self, DecodeError>;
}

/// Response schema: turns a typed value into an element.
pub trait ToTlv {
    fn to_tlv(&self) -> TlvElement;
}

macro_rules! unsigned_tlv {
    ($($t:ty),+) => {
        $(
            impl FromTlv for $t {
                fn from_tlv(element: &TlvElement) -> Result<Self, DecodeError> {
                    match element {
                        TlvElement::Unsigned(value) => <$t>::try_from(*value).map_err(|_| {
                            DecodeError::OutOfRange {
                                value: *value as i128,
                                target: stringify!($t),
                            }
                        }),
                        other => Err(DecodeError::UnexpectedType {
                            expected: "unsigned integer",
                            found: other.type_name(),
                        }),
                    }
                }
            }

            impl ToTlv for $t {
                fn to_tlv(&self) -> TlvElement {
                    TlvElement::Unsigned(*self as u64)
                }
            }
        )+
    };
}

macro_rules! signed_tlv {
    ($($t:ty),+) => {
        $(
            impl FromTlv for $t {
                fn from_tlv(element: &TlvElement) -> Result<Self, DecodeError> {
                    match element {
                        TlvElement::Signed(value) => <$t>::try_from(*value).map_err(|_| {
                            DecodeError::OutOfRange {
                                value: *value as i128,
                                target: stringify!($t),
                            }
                        }),
                        // Encoders pick the shortest form, so non-negative values
                        // may arrive as unsigned.
                        TlvElement::Unsigned(value) => <$t>::try_from(*value).map_err(|_| {
                            DecodeError::OutOfRange {
                                value: *value as i128,
                                target: stringify!($t),
                            }
                        }),
                        other => Err(DecodeError::UnexpectedType {
                            expected: "signed integer",
                            found: other.type_name(),
                        }),
                    }
                }
            }

            impl ToTlv for $t {
                fn to_tlv(&self) -> TlvElement {
                    TlvElement::Signed(*self as i64)
                }
            }
        )+
    };
}

unsigned_tlv!(u8, u16, u32, u64);
signed_tlv!(i8, i16, i32, i64);

impl FromTlv for bool {
    fn from_tlv(element: &TlvElement) -> Result<Self, DecodeError> {
        match element {
            TlvElement::Boolean(value) => Ok(*value),
            other => Err(DecodeError::UnexpectedType {
                expected: "boolean",
                found: other.type_name(),
            }),
        }
    }
}

impl ToTlv for bool {
    fn to_tlv(&self) -> TlvElement {
        TlvElement::Boolean(*self)
    }
}

impl FromTlv for String {
    fn from_tlv(element: &TlvElement) -> Result<Self, DecodeError> {
        match element {
            TlvElement::String(value) => Ok(value.clone()),
            other => Err(DecodeError::UnexpectedType {
                expected: "utf8 string",
                found: other.type_name(),
            }),
        }
    }
}

impl ToTlv for String {
    fn to_tlv(&self) -> TlvElement {
        TlvElement::String(self.clone())
    }
}

impl ToTlv for str {
    fn to_tlv(&self) -> TlvElement {
        TlvElement::String(self.to_owned())
    }
}

impl FromTlv for TlvElement {
    fn from_tlv(element: &TlvElement) -> Result<Self, DecodeError> {
        Ok(element.clone())
    }
}

impl ToTlv for TlvElement {
    fn to_tlv(&self) -> TlvElement {
        self.clone()
    }
}

impl<T: FromTlv> FromTlv for Vec<T> {
    fn from_tlv(element: &TlvElement) -> Result<Self, DecodeError> {
        match element {
            TlvElement::Array(items) => items.iter().map(T::from_tlv).collect(),
            other => Err(DecodeError::UnexpectedType {
                expected: "array",
                found: other.type_name(),
            }),
        }
    }
}

impl<T: ToTlv> ToTlv for Vec<T> {
    fn to_tlv(&self) -> TlvElement {
        TlvElement::Array(self.iter().map(ToTlv::to_tlv).collect())
    }
}

/// Nullable values encode `None` as null.
impl<T: ToTlv> ToTlv for Option<T> {
    fn to_tlv(&self) -> TlvElement {
        match self {
            Some(value) => value.to_tlv(),
            None => TlvElement::Null,
        }
    }
}

/// Commands without fields carry an empty structure.
impl FromTlv for () {
    fn from_tlv(element: &TlvElement) -> Result<Self, DecodeError> {
        match element {
            TlvElement::Structure(_) => Ok(()),
            other => Err(DecodeError::UnexpectedType {
                expected: "structure",
                found: other.type_name(),
            }),
        }
    }
}

impl ToTlv for () {
    fn to_tlv(&self) -> TlvElement {
        TlvElement::empty_struct()
    }
}

/// Reads context-tagged fields out of a structure.
pub struct StructReader<'a> {
    fields: &'a [TlvField],
}

impl<'a> StructReader<'a> {
    pub fn new(element: &'a TlvElement) -> Result<Self, DecodeError> {
        match element {
            TlvElement::Structure(fields) => Ok(Self { fields }),
            other => Err(DecodeError::UnexpectedType {
                expected: "structure",
                found: other.type_name(),
            }),
        }
    }

    fn find(&self, tag: u8) -> Option<&'a TlvElement> {
        self.fields
            .iter()
            .find(|field| field.tag == TagControl::ContextSpecific(tag))
            .map(|field| &field.value)
    }

    /// A mandatory field.
    pub fn field<T: FromTlv>(&self, tag: u8) -> Result<T, DecodeError> {
        let element = self.find(tag).ok_or(DecodeError::MissingField(tag))?;
        T::from_tlv(element)
    }

    /// An optional or nullable field. Absent and null both decode to `None`.
    pub fn optional<T: FromTlv>(&self, tag: u8) -> Result<Option<T>, DecodeError> {
        match self.find(tag) {
            None | Some(TlvElement::Null) => Ok(None),
            Some(element) => T::from_tlv(element).map(Some),
        }
    }
}

/// Builds a structure out of context-tagged fields, in insertion order.
#[derive(Debug, Default)]
pub struct StructBuilder {
    fields: Vec<TlvField>,
}

impl StructBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field<T: ToTlv + ?Sized>(mut self, tag: u8, value: &T) -> Self {
        self.fields.push(TlvField {
            tag: TagControl::ContextSpecific(tag),
            value: value.to_tlv(),
        });
        self
    }

    /// Skips the field entirely when `value` is `None`.
    pub fn optional<T: ToTlv>(self, tag: u8, value: Option<&T>) -> Self {
        match value {
            Some(value) => self.field(tag, value),
            None => self,
        }
    }

    pub fn build(self) -> TlvElement {
        TlvElement::Structure(self.fields)
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn test_narrowing_is_bounds_checked() {
        assert_eq!(u8::from_tlv(&TlvElement::Unsigned(255)), Ok(255));
        assert_eq!(
            u8::from_tlv(&TlvElement::Unsigned(256)),
            Err(DecodeError::OutOfRange {
                value: 256,
                target: "u8"
            })
        );
        assert_eq!(i16::from_tlv(&TlvElement::Unsigned(12)), Ok(12));
        assert!(matches!(
            u16::from_tlv(&TlvElement::Boolean(true)),
            Err(DecodeError::UnexpectedType { .. })
        ));
    }

    #[test]
    fn test_struct_reader() {
        let element = StructBuilder::new()
            .field(0, &1u16)
            .field(1, "kitchen")
            .field(2, &TlvElement::Null)
            .build();
        let reader = StructReader::new(&element).unwrap();
        assert_eq!(reader.field::<u16>(0).unwrap(), 1);
        assert_eq!(reader.field::<String>(1).unwrap(), "kitchen");
        assert_eq!(reader.optional::<u16>(2).unwrap(), None);
        assert_eq!(reader.optional::<u16>(3).unwrap(), None);
        assert_eq!(reader.field::<u16>(3), Err(DecodeError::MissingField(3)));
    }

    #[test]
    fn test_display() {
        let element = StructBuilder::new()
            .field(0, &vec![1u8, 2])
            .field(1, &TlvElement::ByteString(Bytes::from_static(&hex!("cafe"))))
            .build();
        assert_eq!(element.to_string(), "{0: [1, 2], 1: 0xcafe}");
    }
}

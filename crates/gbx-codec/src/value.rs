//! Structured value tree produced by the codec.
//!
//! Every decoded chunk is a [`Mapping`] of named fields. Fields are either
//! nested mappings, sequences, or scalar [`Leaf`] values. Each leaf keeps a
//! [`RawCopy`] of the exact bytes it was decoded from, so a byte inspector can
//! show and patch the original encoding of any field.

use std::fmt;

use gbx_common::BinaryReader;

use crate::path::Segment;
use crate::{Error, Result};

/// A decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Named fields in declaration order.
    Mapping(Mapping),
    /// Homogeneous list of values.
    Sequence(Vec<Value>),
    /// A typed scalar with its raw bytes.
    Scalar(Leaf),
}

impl Value {
    /// Shorthand for a scalar value without a raw copy.
    pub fn scalar(scalar: Scalar) -> Self {
        Value::Scalar(Leaf::new(scalar))
    }

    /// Get the mapping if this is one.
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Get the sequence items if this is one.
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Get the leaf if this is a scalar.
    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            Value::Scalar(leaf) => Some(leaf),
            _ => None,
        }
    }

    /// Get the scalar if this is one.
    pub fn as_scalar(&self) -> Option<&Scalar> {
        self.as_leaf().map(|leaf| &leaf.scalar)
    }

    /// Follow a path of keys and indices below this value.
    pub fn get_path(&self, path: &[Segment]) -> Option<&Value> {
        let Some((first, rest)) = path.split_first() else {
            return Some(self);
        };
        let next = match (self, first) {
            (Value::Mapping(m), Segment::Key(key)) => m.get(key)?,
            (Value::Sequence(items), Segment::Index(i)) => items.get(*i)?,
            _ => return None,
        };
        next.get_path(rest)
    }

    /// Mutable variant of [`Value::get_path`].
    pub fn get_path_mut(&mut self, path: &[Segment]) -> Option<&mut Value> {
        let Some((first, rest)) = path.split_first() else {
            return Some(self);
        };
        let next = match (self, first) {
            (Value::Mapping(m), Segment::Key(key)) => m.get_mut(key)?,
            (Value::Sequence(items), Segment::Index(i)) => items.get_mut(*i)?,
            _ => return None,
        };
        next.get_path_mut(rest)
    }
}

/// Ordered key/value fields of a decoded struct.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mapping {
    entries: Vec<(String, Value)>,
}

impl Mapping {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a field, keeping the original position on replace.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Scalar stored under `key`, if any.
    pub fn scalar(&self, key: &str) -> Option<&Scalar> {
        self.get(key).and_then(Value::as_scalar)
    }

    /// Follow a path whose first segment is one of this mapping's keys.
    pub fn get_path(&self, path: &[Segment]) -> Option<&Value> {
        match path.split_first()? {
            (Segment::Key(key), rest) => self.get(key)?.get_path(rest),
            (Segment::Index(_), _) => None,
        }
    }

    pub fn get_path_mut(&mut self, path: &[Segment]) -> Option<&mut Value> {
        match path.split_first()? {
            (Segment::Key(key), rest) => self.get_mut(key)?.get_path_mut(rest),
            (Segment::Index(_), _) => None,
        }
    }

    /// Iterate fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Exact bytes a value was decoded from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCopy {
    /// Offset of the bytes within the decoded section (header or body).
    pub offset: usize,
    /// The bytes themselves.
    pub bytes: Vec<u8>,
}

impl RawCopy {
    pub fn new(offset: usize, bytes: &[u8]) -> Self {
        Self {
            offset,
            bytes: bytes.to_vec(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A lookback-string ("id") value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookbackId {
    /// `0xFFFFFFFF`.
    Empty,
    /// Numeric collection id.
    Number(u32),
    /// Interned string.
    Name(String),
}

impl fmt::Display for LookbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookbackId::Empty => Ok(()),
            LookbackId::Number(n) => write!(f, "#{}", n),
            LookbackId::Name(name) => f.write_str(name),
        }
    }
}

/// A typed scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    I32(i32),
    F32(f32),
    String(String),
    Id(LookbackId),
    /// Length-prefixed opaque bytes.
    Bytes(Vec<u8>),
    /// Local node index, `None` for the null reference.
    NodeRef(Option<u32>),
}

impl Scalar {
    /// Declared type name shown next to the value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Bool(_) => "bool",
            Scalar::U8(_) => "u8",
            Scalar::U16(_) => "u16",
            Scalar::U32(_) => "u32",
            Scalar::I32(_) => "i32",
            Scalar::F32(_) => "f32",
            Scalar::String(_) => "str",
            Scalar::Id(_) => "id",
            Scalar::Bytes(_) => "bytes",
            Scalar::NodeRef(_) => "node",
        }
    }

    /// Whether this is a raw byte span.
    pub fn is_bytes(&self) -> bool {
        matches!(self, Scalar::Bytes(_))
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Scalar::U8(v) => Some(u32::from(*v)),
            Scalar::U16(v) => Some(u32::from(*v)),
            Scalar::U32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            Scalar::Id(LookbackId::Name(s)) => Some(s),
            Scalar::Id(LookbackId::Empty) => Some(""),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_node_ref(&self) -> Option<Option<u32>> {
        match self {
            Scalar::NodeRef(r) => Some(*r),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(v) => write!(f, "{}", v),
            Scalar::U8(v) => write!(f, "{}", v),
            Scalar::U16(v) => write!(f, "{}", v),
            Scalar::U32(v) => write!(f, "{}", v),
            Scalar::I32(v) => write!(f, "{}", v),
            Scalar::F32(v) => write!(f, "{}", v),
            Scalar::String(v) => write!(f, "{:?}", v),
            Scalar::Id(v) => write!(f, "{:?}", v.to_string()),
            Scalar::Bytes(v) => {
                write!(f, "[{} bytes]", v.len())?;
                for b in v.iter().take(16) {
                    write!(f, " {:02X}", b)?;
                }
                if v.len() > 16 {
                    f.write_str(" ..")?;
                }
                Ok(())
            }
            Scalar::NodeRef(Some(i)) => write!(f, "Node({})", i),
            Scalar::NodeRef(None) => f.write_str("Node(null)"),
        }
    }
}

/// A scalar together with the bytes it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    pub scalar: Scalar,
    pub raw: RawCopy,
}

impl Leaf {
    /// A leaf built in memory; its raw copy is filled in by the next decode.
    pub fn new(scalar: Scalar) -> Self {
        Self {
            scalar,
            raw: RawCopy::default(),
        }
    }

    /// Bytes a byte inspector should show for this leaf.
    ///
    /// For byte blobs this is the payload, for everything else the raw copy.
    pub fn inspect_bytes(&self) -> &[u8] {
        match &self.scalar {
            Scalar::Bytes(payload) => payload,
            _ => &self.raw.bytes,
        }
    }

    /// Patch `new_bytes` into the leaf at `offset` and re-derive the scalar.
    ///
    /// Offsets are relative to [`Leaf::inspect_bytes`]. Edits never change the
    /// length of the field. Lookback ids and node references depend on stream
    /// context and cannot be edited byte-wise.
    pub fn apply_bytes(&mut self, offset: usize, new_bytes: &[u8]) -> Result<()> {
        let end = offset
            .checked_add(new_bytes.len())
            .ok_or(Error::EditOutOfRange {
                offset,
                len: new_bytes.len(),
                size: self.inspect_bytes().len(),
            })?;

        if let Scalar::Bytes(payload) = &mut self.scalar {
            if end > payload.len() {
                return Err(Error::EditOutOfRange {
                    offset,
                    len: new_bytes.len(),
                    size: payload.len(),
                });
            }
            payload[offset..end].copy_from_slice(new_bytes);
            // raw copy is the length prefix followed by the payload
            if self.raw.bytes.len() == payload.len() + 4 {
                self.raw.bytes[4 + offset..4 + end].copy_from_slice(new_bytes);
            }
            return Ok(());
        }

        if matches!(self.scalar, Scalar::Id(_) | Scalar::NodeRef(_)) {
            return Err(Error::NotByteEditable(self.scalar.type_name()));
        }
        if end > self.raw.bytes.len() {
            return Err(Error::EditOutOfRange {
                offset,
                len: new_bytes.len(),
                size: self.raw.bytes.len(),
            });
        }

        let mut patched = self.raw.bytes.clone();
        patched[offset..end].copy_from_slice(new_bytes);
        let mut reader = BinaryReader::new(&patched);
        let scalar = match &self.scalar {
            Scalar::Bool(_) => Scalar::Bool(reader.read_bool()?),
            Scalar::U8(_) => Scalar::U8(reader.read_u8()?),
            Scalar::U16(_) => Scalar::U16(reader.read_u16()?),
            Scalar::U32(_) => Scalar::U32(reader.read_u32()?),
            Scalar::I32(_) => Scalar::I32(reader.read_i32()?),
            Scalar::F32(_) => Scalar::F32(reader.read_f32()?),
            Scalar::String(_) => Scalar::String(reader.read_string()?.to_owned()),
            Scalar::Id(_) | Scalar::NodeRef(_) | Scalar::Bytes(_) => {
                return Err(Error::NotByteEditable(self.scalar.type_name()))
            }
        };
        if !reader.is_empty() {
            return Err(Error::EditChangesLength(self.scalar.type_name()));
        }

        self.scalar = scalar;
        self.raw.bytes = patched;
        Ok(())
    }
}

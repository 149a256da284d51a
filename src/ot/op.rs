//! Typed text ops and their JSON wire encoding
//!
//! The wire protocol encodes a text mutation as `{"$t": [...]}` where each
//! list element is either a bare string (insert characters), `{"$t": n}`
//! (insert tombstones), `{"$s": n}` (skip) or `{"$d": n}` (delete). The
//! closed enums here replace the stringly-tagged objects of that encoding;
//! every consumer matches exhaustively.

use crate::error::{OtError, Result};
use serde::de::Error as DeError;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// One typed op within a text mutation.
///
/// Skip and delete counts are in *raw* units: live and buried characters
/// both occupy one unit of an op's address space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextOp {
    /// Insert the given characters as live text
    InsertChars(String),
    /// Reinsert characters that are already known deleted (replay/merge)
    InsertTombs(usize),
    /// Advance over raw units without changing them
    Skip(usize),
    /// Bury live characters within the next raw units
    Delete(usize),
}

impl TextOp {
    /// Length of the op in units (characters for inserts)
    pub fn len(&self) -> usize {
        match self {
            TextOp::InsertChars(s) => s.chars().count(),
            TextOp::InsertTombs(n) | TextOp::Skip(n) | TextOp::Delete(n) => *n,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True for both insert kinds: ops that create new positions instead of
    /// consuming existing ones
    pub fn is_insert(&self) -> bool {
        matches!(self, TextOp::InsertChars(_) | TextOp::InsertTombs(_))
    }

    /// Decode a single wire element. `null` handling is the caller's job.
    pub fn from_value(value: &Value) -> Result<TextOp> {
        if let Some(s) = value.as_str() {
            return Ok(TextOp::InsertChars(s.to_string()));
        }
        if let Some(map) = value.as_object() {
            if let Some(n) = map.get("$t").and_then(Value::as_u64) {
                return Ok(TextOp::InsertTombs(n as usize));
            }
            if let Some(n) = map.get("$s").and_then(Value::as_u64) {
                return Ok(TextOp::Skip(n as usize));
            }
            if let Some(n) = map.get("$d").and_then(Value::as_u64) {
                return Ok(TextOp::Delete(n as usize));
            }
        }
        Err(OtError::UnsupportedOperation(value.to_string()))
    }
}

impl Serialize for TextOp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            TextOp::InsertChars(s) => serializer.serialize_str(s),
            TextOp::InsertTombs(n) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("$t", n)?;
                map.end()
            }
            TextOp::Skip(n) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("$s", n)?;
                map.end()
            }
            TextOp::Delete(n) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("$d", n)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for TextOp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        TextOp::from_value(&value).map_err(D::Error::custom)
    }
}

/// A complete operation against one field of one entity.
///
/// The only kind this core executes is a text mutation; the enum stays open
/// for exhaustive matching at every consumer. Wire form: `{"$t": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Text(Vec<TextOp>),
}

impl Operation {
    /// The empty operation: applies as a no-op
    pub fn empty() -> Self {
        Operation::Text(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        let Operation::Text(ops) = self;
        ops.is_empty()
    }

    /// The op list of a text operation
    pub fn text_ops(&self) -> &[TextOp] {
        let Operation::Text(ops) = self;
        ops
    }

    /// Decode from a wire value. `null` elements, empty strings and
    /// zero-count ops in the list are dropped (the protocol treats them as
    /// absent); anything else unrecognized is an error.
    pub fn from_value(value: &Value) -> Result<Operation> {
        let list = value
            .as_object()
            .and_then(|map| map.get("$t"))
            .and_then(Value::as_array)
            .ok_or_else(|| OtError::UnsupportedOperation(value.to_string()))?;
        let mut ops = Vec::with_capacity(list.len());
        for item in list {
            if item.is_null() {
                continue;
            }
            let op = TextOp::from_value(item)?;
            if op.is_empty() {
                continue;
            }
            ops.push(op);
        }
        Ok(Operation::Text(ops))
    }
}

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let Operation::Text(ops) = self;
        struct OpList<'a>(&'a [TextOp]);
        impl Serialize for OpList<'_> {
            fn serialize<S: Serializer>(
                &self,
                serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
                for op in self.0 {
                    seq.serialize_element(op)?;
                }
                seq.end()
            }
        }
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("$t", &OpList(ops))?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for Operation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Operation::from_value(&value).map_err(D::Error::custom)
    }
}

//! Typed value access
//!
//! Conversions from a validated data region to byte, integer, float and
//! text values.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::FrameError;

/// Representation requested from a data region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Data bytes as received
    Raw,
    /// First data byte
    Byte,
    /// All bytes folded big-endian into a signed integer
    Integer,
    /// Four bytes as an IEEE-754 single in native byte order
    Float,
    /// One character per byte
    Text,
}

/// A value extracted from a response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Data bytes as received
    Raw(Vec<u8>),
    /// First data byte
    Byte(u8),
    /// Big-endian fold of the data bytes
    Integer(i64),
    /// Native-order single
    Float(f32),
    /// Latin-1 text
    Text(String),
}

impl Value {
    /// Decode `data` as `kind`
    pub fn decode(kind: ValueKind, data: &[u8]) -> Result<Self, FrameError> {
        Ok(match kind {
            ValueKind::Raw => Value::Raw(data.to_vec()),
            ValueKind::Byte => Value::Byte(first_byte(data)?),
            ValueKind::Integer => Value::Integer(fold_integer(data)),
            ValueKind::Float => Value::Float(native_f32(data)?),
            ValueKind::Text => Value::Text(latin1_text(data)),
        })
    }

    /// Get as integer, returning None for other kinds
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            Value::Byte(b) => Some(*b as i64),
            _ => None,
        }
    }

    /// Get as float, returning None for other kinds
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Raw(bytes) => {
                let hex: Vec<String> = bytes.iter().map(|b| format!("{:02X}", b)).collect();
                write!(f, "{}", hex.join(" "))
            }
            Value::Byte(b) => write!(f, "{}", b),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

/// First byte of the data region
pub fn first_byte(data: &[u8]) -> Result<u8, FrameError> {
    data.first().copied().ok_or(FrameError::NoData)
}

/// `value = (value << 8) | byte` for every byte, in order.
///
/// Regions longer than eight bytes keep only the last eight.
pub fn fold_integer(data: &[u8]) -> i64 {
    data.iter().fold(0i64, |v, &b| (v << 8) | b as i64)
}

/// First four bytes as an `f32` in the host's byte order
pub fn native_f32(data: &[u8]) -> Result<f32, FrameError> {
    let bytes: [u8; 4] = data
        .get(..4)
        .and_then(|s| s.try_into().ok())
        .ok_or(FrameError::DataTooShort {
            needed: 4,
            available: data.len(),
        })?;
    Ok(f32::from_ne_bytes(bytes))
}

/// Each byte as one character (ISO-8859-1)
pub fn latin1_text(data: &[u8]) -> String {
    data.iter().map(|&b| b as char).collect()
}

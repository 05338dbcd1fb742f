//! Datatype tags, attribute values and dataset declarations

use crate::chunk::Extent;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of an attribute or a dataset element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Datatype {
    Char,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Bool,
    String,
    VecInt64,
    VecUInt64,
    VecFloat64,
    VecString,
    Undefined,
}

impl Datatype {
    /// Size in bytes of one dataset element, `None` for non-scalar types
    pub fn element_size(&self) -> Option<usize> {
        match self {
            Datatype::Char | Datatype::Int8 | Datatype::UInt8 | Datatype::Bool => Some(1),
            Datatype::Int16 | Datatype::UInt16 => Some(2),
            Datatype::Int32 | Datatype::UInt32 | Datatype::Float32 => Some(4),
            Datatype::Int64 | Datatype::UInt64 | Datatype::Float64 => Some(8),
            Datatype::String
            | Datatype::VecInt64
            | Datatype::VecUInt64
            | Datatype::VecFloat64
            | Datatype::VecString
            | Datatype::Undefined => None,
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Value of an attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    IntVec(Vec<i64>),
    UIntVec(Vec<u64>),
    FloatVec(Vec<f64>),
    StringVec(Vec<String>),
}

impl AttributeValue {
    /// Encode a scalar value as one dataset element of type `dtype`
    ///
    /// Returns `None` if the value cannot be represented in that type.
    pub fn to_element_bytes(&self, dtype: Datatype) -> Option<Vec<u8>> {
        let bytes = match (self, dtype) {
            (AttributeValue::Bool(b), Datatype::Bool) => vec![u8::from(*b)],
            (AttributeValue::Int(v), Datatype::Int8) => i8::try_from(*v).ok()?.to_le_bytes().to_vec(),
            (AttributeValue::Int(v), Datatype::Int16) => i16::try_from(*v).ok()?.to_le_bytes().to_vec(),
            (AttributeValue::Int(v), Datatype::Int32) => i32::try_from(*v).ok()?.to_le_bytes().to_vec(),
            (AttributeValue::Int(v), Datatype::Int64) => v.to_le_bytes().to_vec(),
            (AttributeValue::UInt(v), Datatype::Char | Datatype::UInt8) => {
                u8::try_from(*v).ok()?.to_le_bytes().to_vec()
            }
            (AttributeValue::UInt(v), Datatype::UInt16) => u16::try_from(*v).ok()?.to_le_bytes().to_vec(),
            (AttributeValue::UInt(v), Datatype::UInt32) => u32::try_from(*v).ok()?.to_le_bytes().to_vec(),
            (AttributeValue::UInt(v), Datatype::UInt64) => v.to_le_bytes().to_vec(),
            (AttributeValue::Float(v), Datatype::Float32) => (*v as f32).to_le_bytes().to_vec(),
            (AttributeValue::Float(v), Datatype::Float64) => v.to_le_bytes().to_vec(),
            _ => return None,
        };
        Some(bytes)
    }
}

/// Attribute value together with its declared type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub value: AttributeValue,
    pub dtype: Datatype,
}

impl Attribute {
    /// Create a typed attribute
    pub fn new(value: AttributeValue, dtype: Datatype) -> Self {
        Self { value, dtype }
    }

    /// String attribute
    pub fn string(s: impl Into<String>) -> Self {
        Self::new(AttributeValue::String(s.into()), Datatype::String)
    }

    /// 64-bit float attribute
    pub fn float(v: f64) -> Self {
        Self::new(AttributeValue::Float(v), Datatype::Float64)
    }

    /// 64-bit unsigned attribute
    pub fn uint(v: u64) -> Self {
        Self::new(AttributeValue::UInt(v), Datatype::UInt64)
    }
}

/// Declaration of a dataset: element type and global extent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub dtype: Datatype,
    pub extent: Extent,
}

impl Dataset {
    /// Create a dataset declaration
    pub fn new(dtype: Datatype, extent: Extent) -> Self {
        Self { dtype, extent }
    }

    /// Whether the dataset holds no elements
    pub fn is_empty(&self) -> bool {
        self.extent.contains(&0)
    }
}

//! Type descriptors and zero-value synthesis
//!
//! Rust has no runtime reflection, so every type that can appear in a record
//! describes itself through [`Describe`]. The resulting [`FieldType`] tree is
//! what schema derivation walks, and [`zero_value`] turns it into the
//! placeholder value stored in each field constraint.

use bson::{oid::ObjectId, Bson, Document};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Shape of a field as seen by the schema layer
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Bool,
    Int32,
    Int64,
    UInt64,
    Double,
    String,
    ObjectId,
    DateTime,
    /// Growable sequence (`Vec`, `VecDeque`, sets)
    Seq(Box<FieldType>),
    /// Associative container, key type then value type
    Map(Box<FieldType>, Box<FieldType>),
    /// Fixed-size array; not modeled beyond its element type
    Array(Box<FieldType>, usize),
    Record(RecordRef),
    /// `Option`, `Box`, `Rc`, `Arc`
    Pointer(Box<FieldType>),
    /// Distinct named scalar over a primitive
    Named { name: &'static str, underlying: Box<FieldType> },
    /// Dynamic value (`Bson`)
    Any,
}

impl FieldType {
    /// Strip pointer wrappers
    pub fn unwrap_pointer(&self) -> &FieldType {
        match self {
            FieldType::Pointer(inner) => inner.unwrap_pointer(),
            other => other,
        }
    }

    pub fn is_record(&self) -> bool {
        matches!(self, FieldType::Record(_))
    }

    fn is_string_like(&self) -> bool {
        match self {
            FieldType::String => true,
            FieldType::Named { underlying, .. } => underlying.is_string_like(),
            _ => false,
        }
    }

    /// Whether `value` could have been produced by serializing this type
    pub fn admits(&self, value: &Bson) -> bool {
        match (self, value) {
            (FieldType::Any, _) => true,
            (FieldType::Pointer(_), Bson::Null) => true,
            (FieldType::Pointer(inner), v) => inner.admits(v),
            (FieldType::Named { underlying, .. }, v) => underlying.admits(v),
            (FieldType::Bool, Bson::Boolean(_)) => true,
            (FieldType::Int32 | FieldType::Int64 | FieldType::UInt64, v) => {
                matches!(v, Bson::Int32(_) | Bson::Int64(_))
            }
            (FieldType::Double, v) => as_f64(v).is_some(),
            (FieldType::String, Bson::String(_)) => true,
            (FieldType::ObjectId, Bson::ObjectId(_)) => true,
            (FieldType::DateTime, Bson::DateTime(_)) => true,
            (FieldType::Seq(elem), Bson::Array(items)) => items.iter().all(|i| elem.admits(i)),
            (FieldType::Array(elem, len), Bson::Array(items)) => {
                items.len() == *len && items.iter().all(|i| elem.admits(i))
            }
            (FieldType::Map(_, value_ty), Bson::Document(doc)) => {
                doc.values().all(|v| value_ty.admits(v))
            }
            (FieldType::Record(_), Bson::Document(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Bool => f.write_str("bool"),
            FieldType::Int32 => f.write_str("int32"),
            FieldType::Int64 => f.write_str("int64"),
            FieldType::UInt64 => f.write_str("uint64"),
            FieldType::Double => f.write_str("double"),
            FieldType::String => f.write_str("string"),
            FieldType::ObjectId => f.write_str("objectId"),
            FieldType::DateTime => f.write_str("datetime"),
            FieldType::Seq(elem) => write!(f, "[]{}", elem),
            FieldType::Map(k, v) => write!(f, "map[{}]{}", k, v),
            FieldType::Array(elem, n) => write!(f, "[{}]{}", n, elem),
            FieldType::Record(r) => f.write_str(r.name()),
            FieldType::Pointer(inner) => write!(f, "*{}", inner),
            FieldType::Named { name, .. } => f.write_str(name),
            FieldType::Any => f.write_str("any"),
        }
    }
}

/// Lazy handle to a record's descriptor
///
/// Holding a function instead of the descriptor keeps self-referential
/// records finite.
#[derive(Clone, Copy)]
pub struct RecordRef {
    name: &'static str,
    descriptor: fn() -> RecordDescriptor,
}

impl RecordRef {
    pub const fn new(name: &'static str, descriptor: fn() -> RecordDescriptor) -> Self {
        Self { name, descriptor }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn descriptor(&self) -> RecordDescriptor {
        (self.descriptor)()
    }
}

impl fmt::Debug for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RecordRef").field(&self.name).finish()
    }
}

impl PartialEq for RecordRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// Declared fields of a record, in declaration order
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDescriptor {
    pub name: &'static str,
    pub fields: Vec<FieldDescriptor>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Rust identifier
    pub ident: &'static str,
    /// `#[serde(rename = "...")]`
    pub rename: Option<&'static str>,
    /// Raw `#[schema("...")]` text
    pub tag: &'static str,
    pub public: bool,
    /// `#[serde(skip)]` and friends
    pub skipped: bool,
    /// `#[serde(flatten)]`
    pub flatten: bool,
    pub ty: FieldType,
}

impl FieldDescriptor {
    /// Name the field is stored under
    pub fn storage_name(&self) -> &'static str {
        self.rename.unwrap_or(self.ident)
    }
}

/// Types that can describe their own shape
pub trait Describe {
    fn field_type() -> FieldType;
}

macro_rules! describe_as {
    ($variant:ident => $($t:ty),+) => {
        $(impl Describe for $t {
            fn field_type() -> FieldType {
                FieldType::$variant
            }
        })+
    };
}

describe_as!(Bool => bool);
describe_as!(Int32 => i8, i16, i32, u8, u16);
describe_as!(Int64 => i64, u32, isize);
describe_as!(UInt64 => u64, usize);
describe_as!(Double => f32, f64);
describe_as!(String => String, char, &'static str);
describe_as!(ObjectId => ObjectId);
describe_as!(DateTime => bson::DateTime);
describe_as!(Any => Bson);

impl Describe for Document {
    fn field_type() -> FieldType {
        FieldType::Map(Box::new(FieldType::String), Box::new(FieldType::Any))
    }
}

macro_rules! describe_seq {
    ($($t:ident),+) => {
        $(impl<T: Describe> Describe for $t<T> {
            fn field_type() -> FieldType {
                FieldType::Seq(Box::new(T::field_type()))
            }
        })+
    };
}

describe_seq!(Vec, VecDeque, HashSet, BTreeSet);

macro_rules! describe_pointer {
    ($($t:ident),+) => {
        $(impl<T: Describe> Describe for $t<T> {
            fn field_type() -> FieldType {
                FieldType::Pointer(Box::new(T::field_type()))
            }
        })+
    };
}

describe_pointer!(Option, Box, Rc, Arc);

impl<K: Describe, V: Describe> Describe for HashMap<K, V> {
    fn field_type() -> FieldType {
        FieldType::Map(Box::new(K::field_type()), Box::new(V::field_type()))
    }
}

impl<K: Describe, V: Describe> Describe for BTreeMap<K, V> {
    fn field_type() -> FieldType {
        FieldType::Map(Box::new(K::field_type()), Box::new(V::field_type()))
    }
}

impl<T: Describe, const N: usize> Describe for [T; N] {
    fn field_type() -> FieldType {
        FieldType::Array(Box::new(T::field_type()), N)
    }
}

/// Synthesize the zero value for a field type
pub fn zero_value(ty: &FieldType) -> Bson {
    let mut path = Vec::new();
    zero_on_path(ty, &mut path)
}

fn zero_on_path(ty: &FieldType, path: &mut Vec<&'static str>) -> Bson {
    match ty {
        FieldType::Bool => Bson::Boolean(false),
        FieldType::Int32 => Bson::Int32(0),
        FieldType::Int64 | FieldType::UInt64 => Bson::Int64(0),
        FieldType::Double => Bson::Double(0.0),
        FieldType::String => Bson::String(String::new()),
        FieldType::ObjectId => Bson::ObjectId(ObjectId::from_bytes([0; 12])),
        FieldType::DateTime => Bson::DateTime(bson::DateTime::from_millis(0)),
        FieldType::Seq(_) => Bson::Array(Vec::new()),
        FieldType::Map(key, value) => {
            if key.is_string_like() {
                Bson::Document(Document::new())
            } else {
                log::debug!("no zero value for map[{}]{}, using null", key, value);
                Bson::Null
            }
        }
        FieldType::Array(..) | FieldType::Pointer(_) | FieldType::Any => Bson::Null,
        FieldType::Named { underlying, .. } => zero_on_path(underlying, path),
        FieldType::Record(record) => {
            let mut doc = Document::new();
            if !path.contains(&record.name()) {
                path.push(record.name());
                record_zero_into(*record, path, &mut doc);
                path.pop();
            }
            Bson::Document(doc)
        }
    }
}

fn record_zero_into(record: RecordRef, path: &mut Vec<&'static str>, doc: &mut Document) {
    for field in record.descriptor().fields {
        if field.skipped {
            continue;
        }
        match (&field.ty, field.flatten) {
            (FieldType::Record(inner), true) => {
                if !path.contains(&inner.name()) {
                    path.push(inner.name());
                    record_zero_into(*inner, path, doc);
                    path.pop();
                }
            }
            _ => {
                doc.insert(field.storage_name(), zero_on_path(&field.ty, path));
            }
        }
    }
}

/// Whether `value` equals the zero value of its own type
pub fn is_zero(value: &Bson) -> bool {
    match value {
        Bson::Null | Bson::Undefined => true,
        Bson::Boolean(b) => !b,
        Bson::Int32(n) => *n == 0,
        Bson::Int64(n) => *n == 0,
        Bson::Double(n) => *n == 0.0,
        Bson::String(s) => s.is_empty(),
        Bson::Array(items) => items.is_empty(),
        Bson::Document(doc) => doc.values().all(is_zero),
        Bson::ObjectId(oid) => oid.bytes() == [0; 12],
        Bson::DateTime(dt) => dt.timestamp_millis() == 0,
        _ => false,
    }
}

pub fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

pub fn as_i64(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(n) => Some(i64::from(*n)),
        Bson::Int64(n) => Some(*n),
        _ => None,
    }
}

/// Deep equality that treats numbers of different widths as equal
pub fn values_equal(a: &Bson, b: &Bson) -> bool {
    if let (Some(x), Some(y)) = (as_i64(a), as_i64(b)) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) {
        return x == y;
    }
    match (a, b) {
        (Bson::Array(xs), Bson::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Bson::Document(x), Bson::Document(y)) => {
            x.len() == y.len()
                && x.iter().all(|(k, v)| y.get(k).is_some_and(|w| values_equal(v, w)))
        }
        _ => a == b,
    }
}

//! Field shapes and the dynamic values that flow through the codec.
//!
//! A record's layout is a list of [`FieldDescriptor`]s, each carrying a
//! [`Shape`]. The codec walks shapes to decide how a [`Value`] is laid out on
//! the wire, so encode and decode share one dispatch.

use std::any::TypeId;
use std::fmt;

/// Fixed-size scalar kinds supported on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    U8,
    I8,
    Bool,
    I16,
    U16,
    /// One UTF-16 code unit (one byte with the `narrow-chars` feature).
    Char,
    I32,
    U32,
    F32,
    I64,
    U64,
    F64,
}

impl ScalarKind {
    /// Encoded width in bytes.
    pub const fn size(self) -> usize {
        match self {
            ScalarKind::U8 | ScalarKind::I8 | ScalarKind::Bool => 1,
            ScalarKind::Char => crate::framing::CHAR_UNIT_SIZE,
            ScalarKind::I16 | ScalarKind::U16 => 2,
            ScalarKind::I32 | ScalarKind::U32 | ScalarKind::F32 => 4,
            ScalarKind::I64 | ScalarKind::U64 | ScalarKind::F64 => 8,
        }
    }
}

/// A reference to a nested record type, resolved by the registry.
#[derive(Clone, Copy)]
pub struct RecordRef {
    type_id: TypeId,
    name: &'static str,
    layout: fn() -> Vec<FieldDescriptor>,
}

impl RecordRef {
    /// Reference the record type `R`.
    pub fn of<R: crate::traits::Record>() -> Self {
        Self {
            type_id: TypeId::of::<R>(),
            name: R::NAME,
            layout: R::layout,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn layout(&self) -> Vec<FieldDescriptor> {
        (self.layout)()
    }
}

impl fmt::Debug for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RecordRef").field(&self.name).finish()
    }
}

impl PartialEq for RecordRef {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for RecordRef {}

/// The classification of a field used to select encode/decode logic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    Scalar(ScalarKind),
    /// 2-byte signed unit count (`-1` = null) followed by character units.
    String,
    /// 2-byte signed element count (`-1` = null) followed by the elements.
    Array(Box<Shape>),
    /// Fields of another record, back to back, with no prefix.
    Record(RecordRef),
    /// An unconstrained element type. Accepted in a layout, rejected at encode.
    Dynamic,
}

impl Shape {
    pub fn array_of(element: Shape) -> Self {
        Shape::Array(Box::new(element))
    }

    /// Short human-readable form used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Shape::Scalar(kind) => format!("{kind:?}"),
            Shape::String => "string".to_string(),
            Shape::Array(element) => format!("array of {}", element.describe()),
            Shape::Record(record) => format!("record {}", record.name()),
            Shape::Dynamic => "dynamic".to_string(),
        }
    }
}

/// One retained field of a record, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name. Only used for diagnostics.
    pub name: &'static str,
    pub shape: Shape,
}

impl FieldDescriptor {
    pub fn new(name: &'static str, shape: Shape) -> Self {
        Self { name, shape }
    }
}

/// A field value in wire terms.
///
/// `Str(None)` and `Array(None)` are the null string and null array, encoded
/// with a `-1` length prefix.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    U8(u8),
    I8(i8),
    Bool(bool),
    I16(i16),
    U16(u16),
    /// A single character unit.
    Char(u16),
    I32(i32),
    U32(u32),
    F32(f32),
    I64(i64),
    U64(u64),
    F64(f64),
    Str(Option<String>),
    Array(Option<Vec<Value>>),
    Record(Vec<Value>),
}

impl Value {
    /// Name of the variant, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::U8(_) => "U8",
            Value::I8(_) => "I8",
            Value::Bool(_) => "Bool",
            Value::I16(_) => "I16",
            Value::U16(_) => "U16",
            Value::Char(_) => "Char",
            Value::I32(_) => "I32",
            Value::U32(_) => "U32",
            Value::F32(_) => "F32",
            Value::I64(_) => "I64",
            Value::U64(_) => "U64",
            Value::F64(_) => "F64",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Record(_) => "record",
        }
    }
}

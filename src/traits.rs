//! Core traits for the msgsock library.
//!
//! Types opt in to the wire format by implementing [`Record`] (and
//! [`Message`] for top-level types). The [`record!`](crate::record) and
//! [`message!`](crate::message) macros write these impls; hand-written impls
//! are fine as long as `layout`, `to_values` and `from_values` agree on the
//! field order.

use crate::error::{Error, Result};
use crate::registry::Visibility;
use crate::shape::{FieldDescriptor, RecordRef, ScalarKind, Shape, Value};
use std::any::TypeId;

/// A type that can appear as a field of a record.
pub trait Field: Sized {
    /// The wire shape of this type, or `None` if it is not supported.
    ///
    /// Fields whose shape is `None` are left out of the record's layout and
    /// never reach the wire.
    fn shape() -> Option<Shape>;

    /// Converts the field into its wire value.
    fn to_value(&self) -> Result<Value>;

    /// Rebuilds the field from a decoded value. `field` names the field for
    /// diagnostics.
    fn from_value(value: Value, field: &'static str) -> Result<Self>;

    /// The value of a field that was left out of the layout.
    fn absent(field: &'static str) -> Result<Self> {
        Err(Error::unsupported(field, "field has no wire shape"))
    }
}

/// A fixed-layout record type: a message or a record nested inside one.
pub trait Record: Sized + Send + 'static {
    /// Type name, used in diagnostics and logs.
    const NAME: &'static str;

    /// The retained fields in declaration order.
    fn layout() -> Vec<FieldDescriptor>;

    /// The values of the retained fields, in `layout()` order.
    fn to_values(&self) -> Result<Vec<Value>>;

    /// Rebuilds the record from values in `layout()` order.
    fn from_values(values: Vec<Value>) -> Result<Self>;
}

/// A record that can be sent on its own as a top-level frame.
pub trait Message: Record {
    /// Explicitly requested discriminator. Auto-assigned when `None`.
    const DISCRIMINATOR: Option<u8> = None;

    /// Visibility class consulted by the registry's visibility filter.
    const VISIBILITY: Visibility = Visibility::Public;
}

/// Object-safe view of an outgoing message, used by the send path so that
/// messages of different types can share one queue.
pub trait Outbound: Send {
    fn message_type(&self) -> TypeId;

    fn message_name(&self) -> &'static str;

    fn field_values(&self) -> Result<Vec<Value>>;
}

impl<M: Message> Outbound for M {
    fn message_type(&self) -> TypeId {
        TypeId::of::<M>()
    }

    fn message_name(&self) -> &'static str {
        M::NAME
    }

    fn field_values(&self) -> Result<Vec<Value>> {
        self.to_values()
    }
}

impl Outbound for Box<dyn Outbound> {
    fn message_type(&self) -> TypeId {
        (**self).message_type()
    }

    fn message_name(&self) -> &'static str {
        (**self).message_name()
    }

    fn field_values(&self) -> Result<Vec<Value>> {
        (**self).field_values()
    }
}

/// Marks a field that never goes on the wire.
///
/// The field is dropped from the layout and comes back as `T::default()` on
/// the receiving side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Skip<T>(pub T);

impl<T: Default> Field for Skip<T> {
    fn shape() -> Option<Shape> {
        None
    }

    fn to_value(&self) -> Result<Value> {
        Err(Error::unsupported("<skipped>", "skipped fields have no wire value"))
    }

    fn from_value(_value: Value, field: &'static str) -> Result<Self> {
        Err(Error::unsupported(field, "skipped fields have no wire value"))
    }

    fn absent(_field: &'static str) -> Result<Self> {
        Ok(Skip(T::default()))
    }
}

fn mismatch(field: &'static str, expected: &str, got: &Value) -> Error {
    Error::unsupported(
        field,
        format!("expected {expected} value, got {}", got.kind_name()),
    )
}

macro_rules! scalar_field {
    ($ty:ty, $kind:ident) => {
        impl Field for $ty {
            fn shape() -> Option<Shape> {
                Some(Shape::Scalar(ScalarKind::$kind))
            }

            fn to_value(&self) -> Result<Value> {
                Ok(Value::$kind(*self))
            }

            fn from_value(value: Value, field: &'static str) -> Result<Self> {
                match value {
                    Value::$kind(v) => Ok(v),
                    other => Err(mismatch(field, stringify!($kind), &other)),
                }
            }
        }
    };
}

scalar_field!(u8, U8);
scalar_field!(i8, I8);
scalar_field!(bool, Bool);
scalar_field!(i16, I16);
scalar_field!(u16, U16);
scalar_field!(i32, I32);
scalar_field!(u32, U32);
scalar_field!(f32, F32);
scalar_field!(i64, I64);
scalar_field!(u64, U64);
scalar_field!(f64, F64);

/// A `char` travels as one UTF-16 code unit, so only BMP characters fit.
impl Field for char {
    fn shape() -> Option<Shape> {
        Some(Shape::Scalar(ScalarKind::Char))
    }

    fn to_value(&self) -> Result<Value> {
        let mut units = [0u16; 2];
        match self.encode_utf16(&mut units) {
            [unit] => Ok(Value::Char(*unit)),
            _ => Err(Error::UnrepresentableChar(*self)),
        }
    }

    fn from_value(value: Value, field: &'static str) -> Result<Self> {
        match value {
            Value::Char(unit) => {
                char::from_u32(u32::from(unit)).ok_or(Error::InvalidUtf16 { field })
            }
            other => Err(mismatch(field, "Char", &other)),
        }
    }
}

impl Field for String {
    fn shape() -> Option<Shape> {
        Some(Shape::String)
    }

    fn to_value(&self) -> Result<Value> {
        Ok(Value::Str(Some(self.clone())))
    }

    fn from_value(value: Value, field: &'static str) -> Result<Self> {
        match value {
            Value::Str(Some(s)) => Ok(s),
            Value::Str(None) => Err(Error::UnexpectedNull { field }),
            other => Err(mismatch(field, "string", &other)),
        }
    }
}

impl Field for Option<String> {
    fn shape() -> Option<Shape> {
        Some(Shape::String)
    }

    fn to_value(&self) -> Result<Value> {
        Ok(Value::Str(self.clone()))
    }

    fn from_value(value: Value, field: &'static str) -> Result<Self> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(mismatch(field, "string", &other)),
        }
    }
}

fn array_values<T: Field>(items: &[T]) -> Result<Vec<Value>> {
    items.iter().map(Field::to_value).collect()
}

fn array_items<T: Field>(values: Vec<Value>, field: &'static str) -> Result<Vec<T>> {
    values
        .into_iter()
        .map(|value| T::from_value(value, field))
        .collect()
}

impl<T: Field> Field for Vec<T> {
    fn shape() -> Option<Shape> {
        T::shape().map(Shape::array_of)
    }

    fn to_value(&self) -> Result<Value> {
        Ok(Value::Array(Some(array_values(self)?)))
    }

    fn from_value(value: Value, field: &'static str) -> Result<Self> {
        match value {
            Value::Array(Some(values)) => array_items(values, field),
            Value::Array(None) => Err(Error::UnexpectedNull { field }),
            other => Err(mismatch(field, "array", &other)),
        }
    }

    /// Arrays of an unsupported element type come back empty.
    fn absent(_field: &'static str) -> Result<Self> {
        Ok(Vec::new())
    }
}

impl<T: Field> Field for Option<Vec<T>> {
    fn shape() -> Option<Shape> {
        T::shape().map(Shape::array_of)
    }

    fn to_value(&self) -> Result<Value> {
        match self {
            Some(items) => Ok(Value::Array(Some(array_values(items)?))),
            None => Ok(Value::Array(None)),
        }
    }

    fn from_value(value: Value, field: &'static str) -> Result<Self> {
        match value {
            Value::Array(Some(values)) => array_items(values, field).map(Some),
            Value::Array(None) => Ok(None),
            other => Err(mismatch(field, "array", &other)),
        }
    }

    fn absent(_field: &'static str) -> Result<Self> {
        Ok(None)
    }
}

/// An untyped value. Its shape is unconstrained, so the codec refuses to
/// encode arrays of it.
impl Field for Value {
    fn shape() -> Option<Shape> {
        Some(Shape::Dynamic)
    }

    fn to_value(&self) -> Result<Value> {
        Ok(self.clone())
    }

    fn from_value(value: Value, _field: &'static str) -> Result<Self> {
        Ok(value)
    }
}

/// Shape of a nested record field of type `R`.
pub fn record_shape<R: Record>() -> Option<Shape> {
    Some(Shape::Record(RecordRef::of::<R>()))
}

/// Unwraps a nested record value into `R`.
pub fn record_from_value<R: Record>(value: Value, field: &'static str) -> Result<R> {
    match value {
        Value::Record(values) => R::from_values(values),
        other => Err(mismatch(field, "record", &other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_of_unsupported_is_unsupported() {
        assert_eq!(<Vec<Skip<u8>> as Field>::shape(), None);
        assert_eq!(
            <Vec<Vec<u16>> as Field>::shape(),
            Some(Shape::array_of(Shape::array_of(Shape::Scalar(
                ScalarKind::U16
            ))))
        );
    }

    #[test]
    fn arrays_of_unsupported_elements_restore_empty() {
        assert_eq!(Vec::<Skip<u8>>::absent("junk").unwrap(), Vec::new());
        assert_eq!(Option::<Vec<Skip<u8>>>::absent("junk").unwrap(), None);
    }

    #[test]
    fn non_bmp_char_is_rejected() {
        assert!(matches!(
            '🦀'.to_value(),
            Err(Error::UnrepresentableChar('🦀'))
        ));
        assert_eq!('\\'.to_value().unwrap(), Value::Char(0x5C));
    }

    #[test]
    fn lone_surrogate_does_not_decode_as_char() {
        let result = char::from_value(Value::Char(0xD800), "c");
        assert!(matches!(result, Err(Error::InvalidUtf16 { field: "c" })));
    }

    #[test]
    fn null_string_needs_option() {
        assert!(matches!(
            String::from_value(Value::Str(None), "author"),
            Err(Error::UnexpectedNull { field: "author" })
        ));
        assert_eq!(
            Option::<String>::from_value(Value::Str(None), "author").unwrap(),
            None
        );
    }

    #[test]
    fn null_array_round_trips_through_option() {
        let none: Option<Vec<f64>> = None;
        assert_eq!(none.to_value().unwrap(), Value::Array(None));
        let back = Option::<Vec<f64>>::from_value(Value::Array(None), "a").unwrap();
        assert_eq!(back, None);
    }

    #[test]
    fn skip_restores_default() {
        let skipped = Skip::<u32>::absent("cache").unwrap();
        assert_eq!(skipped, Skip(0));
    }

    #[test]
    fn scalar_type_mismatch_is_reported() {
        let err = u32::from_value(Value::U64(1), "index").unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedFieldShape { field: "index", .. }
        ));
    }
}

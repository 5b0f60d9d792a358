//! Declarative registration macros.
//!
//! `record!` declares a struct usable as a nested record; `message!` also
//! makes it a top-level [`Message`](crate::Message). Options go in brackets
//! after the type name:
//!
//! ```rust
//! use msgsock::{message, record, Visibility};
//!
//! record! {
//!     #[derive(Debug, Clone, PartialEq, Default)]
//!     pub struct Vector {
//!         pub x: f32,
//!         pub y: f32,
//!         pub z: f32,
//!     }
//! }
//!
//! message! {
//!     #[derive(Debug, Clone, PartialEq)]
//!     pub struct Moved [id = 7, visibility = Visibility::Internal] {
//!         pub entity: u32,
//!         pub to: Vector,
//!     }
//! }
//! ```

use crate::error::{Error, Result};
use crate::shape::{FieldDescriptor, Value};
use crate::traits::Field;

#[doc(hidden)]
pub fn describe_field<T: Field>(fields: &mut Vec<FieldDescriptor>, name: &'static str) {
    if let Some(shape) = T::shape() {
        fields.push(FieldDescriptor::new(name, shape));
    }
}

#[doc(hidden)]
pub fn push_field<T: Field>(values: &mut Vec<Value>, field: &T) -> Result<()> {
    if T::shape().is_some() {
        values.push(field.to_value()?);
    }
    Ok(())
}

#[doc(hidden)]
pub fn take_field<T: Field>(
    values: &mut impl Iterator<Item = Value>,
    name: &'static str,
) -> Result<T> {
    if T::shape().is_none() {
        return T::absent(name);
    }
    match values.next() {
        Some(value) => T::from_value(value, name),
        None => Err(Error::malformed(format!("missing value for field `{name}`"))),
    }
}

#[doc(hidden)]
pub fn finish_record(
    mut values: impl Iterator<Item = Value>,
    record: &'static str,
) -> Result<()> {
    match values.next() {
        None => Ok(()),
        Some(_) => Err(Error::malformed(format!(
            "too many values for record {record}"
        ))),
    }
}

/// Declares a struct and implements [`Record`](crate::Record) and
/// [`Field`](crate::Field) for it.
///
/// Fields whose type has no wire shape (for example [`Skip<T>`](crate::Skip))
/// are kept in the struct but left out of the layout.
#[macro_export]
macro_rules! record {
    (@impl $name:ident { $( $field:ident : $ty:ty ),* }) => {
        impl $crate::Record for $name {
            const NAME: &'static str = stringify!($name);

            #[allow(unused_mut)]
            fn layout() -> ::std::vec::Vec<$crate::FieldDescriptor> {
                let mut fields = ::std::vec::Vec::new();
                $( $crate::macros::describe_field::<$ty>(&mut fields, stringify!($field)); )*
                fields
            }

            #[allow(unused_mut)]
            fn to_values(&self) -> $crate::Result<::std::vec::Vec<$crate::Value>> {
                let mut values = ::std::vec::Vec::new();
                $( $crate::macros::push_field::<$ty>(&mut values, &self.$field)?; )*
                Ok(values)
            }

            #[allow(unused_mut)]
            fn from_values(values: ::std::vec::Vec<$crate::Value>) -> $crate::Result<Self> {
                let mut values = values.into_iter();
                let record = Self {
                    $( $field: $crate::macros::take_field::<$ty>(&mut values, stringify!($field))?, )*
                };
                $crate::macros::finish_record(values, stringify!($name))?;
                Ok(record)
            }
        }

        impl $crate::Field for $name {
            fn shape() -> ::std::option::Option<$crate::Shape> {
                $crate::traits::record_shape::<Self>()
            }

            fn to_value(&self) -> $crate::Result<$crate::Value> {
                Ok($crate::Value::Record($crate::Record::to_values(self)?))
            }

            fn from_value(value: $crate::Value, field: &'static str) -> $crate::Result<Self> {
                $crate::traits::record_from_value(value, field)
            }
        }
    };

    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $(#[$field_meta])* $field_vis $field: $ty, )*
        }

        $crate::record!(@impl $name { $( $field : $ty ),* });
    };
}

/// Declares a top-level message: everything [`record!`] does plus a
/// [`Message`](crate::Message) impl.
///
/// Supported options: `id = <u8>` for an explicit discriminator and
/// `visibility = <Visibility>` for the registry's visibility filter.
#[macro_export]
macro_rules! message {
    (@option id = $id:expr) => {
        const DISCRIMINATOR: ::std::option::Option<u8> = ::std::option::Option::Some($id);
    };

    (@option visibility = $visibility:expr) => {
        const VISIBILITY: $crate::Visibility = $visibility;
    };

    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident $( [ $( $opt:ident = $val:expr ),+ $(,)? ] )? {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $crate::record! {
            $(#[$meta])*
            $vis struct $name {
                $( $(#[$field_meta])* $field_vis $field : $ty ),*
            }
        }

        impl $crate::Message for $name {
            $( $( $crate::message!(@option $opt = $val); )+ )?
        }
    };
}

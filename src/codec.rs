//! The binary codec: record values to and from frames.
//!
//! Everything is big-endian. Integers and floats use their two's-complement or
//! IEEE-754 bit patterns, booleans one byte, strings and arrays a 2-byte
//! signed count (`-1` for null) followed by their elements, and nested records
//! their fields back to back with no prefix. Only the outer frame carries a
//! discriminator.

use crate::error::{Error, Result};
use crate::framing::{FrameHeader, FRAME_HEADER_SIZE, MAX_PAYLOAD_LEN, NULL_LENGTH};
use crate::registry::{MessageDescriptor, Registry};
use crate::shape::{ScalarKind, Shape, Value};
use crate::traits::{Message, Outbound};
use std::any::Any;
use std::fmt;

/// A decoded message whose concrete type is known only to the registry.
pub struct AnyMessage {
    discriminator: u8,
    name: &'static str,
    inner: Box<dyn Any + Send>,
}

impl AnyMessage {
    pub fn discriminator(&self) -> u8 {
        self.discriminator
    }

    /// Name of the message type.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is<M: Message>(&self) -> bool {
        self.inner.is::<M>()
    }

    pub fn downcast_ref<M: Message>(&self) -> Option<&M> {
        self.inner.downcast_ref::<M>()
    }

    /// Recovers the concrete message, or gives `self` back if it is another type.
    pub fn downcast<M: Message>(self) -> std::result::Result<M, Self> {
        let Self {
            discriminator,
            name,
            inner,
        } = self;
        match inner.downcast::<M>() {
            Ok(message) => Ok(*message),
            Err(inner) => Err(Self {
                discriminator,
                name,
                inner,
            }),
        }
    }
}

impl fmt::Debug for AnyMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyMessage")
            .field("discriminator", &self.discriminator)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Not enough bytes are buffered to finish the frame starting at `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncompleteFrame {
    /// Where the frame starts in the source buffer.
    pub offset: usize,
    /// Bytes present from `offset` to the end of the source buffer.
    pub available: usize,
    /// The payload length from the header, or `None` if the header itself is
    /// incomplete.
    pub declared_payload_len: Option<u16>,
}

impl IncompleteFrame {
    /// The declared payload length, with `-1` standing for "not known yet".
    pub fn declared_len(&self) -> i32 {
        self.declared_payload_len.map_or(-1, i32::from)
    }
}

/// Outcome of [`read_message`].
#[derive(Debug)]
pub enum Decoded {
    /// A full frame was decoded; `consumed` is `3 + payload_length`.
    Message { message: AnyMessage, consumed: usize },
    /// More bytes are needed. This is the normal outcome at a read boundary.
    Incomplete(IncompleteFrame),
}

/// Appends the frame for `message` to `dst` and returns its size.
///
/// On error `dst` is left as it was.
pub fn write_message(registry: &Registry, message: &dyn Outbound, dst: &mut Vec<u8>) -> Result<usize> {
    let descriptor = registry
        .by_type(message.message_type())
        .ok_or(Error::UnknownType(message.message_name()))?;
    let discriminator = descriptor
        .discriminator()
        .ok_or(Error::UnknownType(message.message_name()))?;
    let values = message.field_values()?;

    let start = dst.len();
    dst.extend_from_slice(&FrameHeader::new(discriminator, 0).encode());
    if let Err(e) = Encoder::new(registry, dst).write_fields(descriptor, &values) {
        dst.truncate(start);
        return Err(e);
    }

    let payload_len = dst.len() - start - FRAME_HEADER_SIZE;
    if payload_len > MAX_PAYLOAD_LEN {
        dst.truncate(start);
        return Err(Error::PayloadTooLarge {
            size: payload_len,
            max: MAX_PAYLOAD_LEN,
        });
    }
    dst[start + 1..start + FRAME_HEADER_SIZE].copy_from_slice(&(payload_len as u16).to_be_bytes());
    Ok(dst.len() - start)
}

/// Encodes `message` into a fresh buffer.
pub fn encode<M: Message>(registry: &Registry, message: &M) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write_message(registry, message, &mut out)?;
    Ok(out)
}

/// Decodes the frame starting at `offset` in `source`.
///
/// Every byte from `offset` to the end of `source` counts as available. The
/// frame is complete once `available >= 3 + payload_length`.
pub fn read_message(registry: &Registry, source: &[u8], offset: usize) -> Result<Decoded> {
    let bytes = source.get(offset..).unwrap_or_default();
    let available = bytes.len();
    let incomplete = |declared_payload_len| {
        Ok(Decoded::Incomplete(IncompleteFrame {
            offset,
            available,
            declared_payload_len,
        }))
    };

    let Some(header) = FrameHeader::peek(bytes) else {
        return incomplete(None);
    };
    let descriptor = registry
        .by_discriminator(header.discriminator)
        .ok_or(Error::UnknownDiscriminator(header.discriminator))?;
    if available < header.frame_len() {
        return incomplete(Some(header.payload_len));
    }

    let payload = &bytes[FRAME_HEADER_SIZE..header.frame_len()];
    let mut decoder = Decoder::new(registry, payload);
    let values = decoder.read_fields(descriptor)?;
    if decoder.pos != payload.len() {
        return Err(Error::malformed(format!(
            "{} declared {} payload bytes but its fields used {}",
            descriptor.name(),
            payload.len(),
            decoder.pos
        )));
    }

    let decode = descriptor
        .decoder()
        .ok_or(Error::UnknownDiscriminator(header.discriminator))?;
    Ok(Decoded::Message {
        message: AnyMessage {
            discriminator: header.discriminator,
            name: descriptor.name(),
            inner: decode(values)?,
        },
        consumed: header.frame_len(),
    })
}

/// Most array elements one frame may hold, summed over all of its arrays.
/// Elements of nonzero width can never exceed this; it only binds arrays of
/// empty records.
const MAX_FRAME_ELEMENTS: usize = MAX_PAYLOAD_LEN;

struct Encoder<'a> {
    registry: &'a Registry,
    dst: &'a mut Vec<u8>,
    elements: usize,
}

impl<'a> Encoder<'a> {
    fn new(registry: &'a Registry, dst: &'a mut Vec<u8>) -> Self {
        Self {
            registry,
            dst,
            elements: 0,
        }
    }

    fn write_fields(&mut self, descriptor: &MessageDescriptor, values: &[Value]) -> Result<()> {
        let fields = descriptor.fields();
        if fields.len() != values.len() {
            return Err(Error::unsupported(
                descriptor.name(),
                format!("expected {} field values, got {}", fields.len(), values.len()),
            ));
        }
        for (field, value) in fields.iter().zip(values) {
            self.write_value(&field.shape, value, field.name)?;
        }
        Ok(())
    }

    fn write_value(&mut self, shape: &Shape, value: &Value, field: &'static str) -> Result<()> {
        match (shape, value) {
            (Shape::Scalar(kind), value) => self.write_scalar(*kind, value, field),
            (Shape::String, Value::Str(None)) => self.put_i16(NULL_LENGTH),
            (Shape::String, Value::Str(Some(s))) => {
                self.put_len(s.encode_utf16().count(), field)?;
                s.encode_utf16().try_for_each(|unit| self.put_char_unit(unit))
            }
            (Shape::Array(_), Value::Array(None)) => self.put_i16(NULL_LENGTH),
            (Shape::Array(element), Value::Array(Some(items))) => {
                if **element == Shape::Dynamic {
                    return Err(Error::unsupported(
                        field,
                        "arrays of unconstrained element type cannot be encoded",
                    ));
                }
                self.put_len(items.len(), field)?;
                self.elements += items.len();
                if self.elements > MAX_FRAME_ELEMENTS {
                    return Err(Error::LengthOverflow {
                        field,
                        len: self.elements,
                        max: MAX_FRAME_ELEMENTS,
                    });
                }
                items
                    .iter()
                    .try_for_each(|item| self.write_value(element, item, field))
            }
            (Shape::Record(record), Value::Record(values)) => {
                let descriptor = self
                    .registry
                    .by_type(record.type_id())
                    .ok_or(Error::UnknownType(record.name()))?;
                self.write_fields(descriptor, values)
            }
            (Shape::Dynamic, _) => Err(Error::unsupported(
                field,
                "unconstrained field type cannot be encoded",
            )),
            (shape, value) => Err(Error::unsupported(
                field,
                format!("{} value does not fit {}", value.kind_name(), shape.describe()),
            )),
        }
    }

    fn write_scalar(&mut self, kind: ScalarKind, value: &Value, field: &'static str) -> Result<()> {
        match (kind, value) {
            (ScalarKind::U8, Value::U8(v)) => self.dst.push(*v),
            (ScalarKind::I8, Value::I8(v)) => self.dst.extend_from_slice(&v.to_be_bytes()),
            (ScalarKind::Bool, Value::Bool(v)) => self.dst.push(u8::from(*v)),
            (ScalarKind::I16, Value::I16(v)) => self.dst.extend_from_slice(&v.to_be_bytes()),
            (ScalarKind::U16, Value::U16(v)) => self.dst.extend_from_slice(&v.to_be_bytes()),
            (ScalarKind::Char, Value::Char(unit)) => self.put_char_unit(*unit)?,
            (ScalarKind::I32, Value::I32(v)) => self.dst.extend_from_slice(&v.to_be_bytes()),
            (ScalarKind::U32, Value::U32(v)) => self.dst.extend_from_slice(&v.to_be_bytes()),
            (ScalarKind::F32, Value::F32(v)) => self.dst.extend_from_slice(&v.to_be_bytes()),
            (ScalarKind::I64, Value::I64(v)) => self.dst.extend_from_slice(&v.to_be_bytes()),
            (ScalarKind::U64, Value::U64(v)) => self.dst.extend_from_slice(&v.to_be_bytes()),
            (ScalarKind::F64, Value::F64(v)) => self.dst.extend_from_slice(&v.to_be_bytes()),
            (kind, value) => {
                return Err(Error::unsupported(
                    field,
                    format!("{} value does not fit {kind:?}", value.kind_name()),
                ))
            }
        }
        Ok(())
    }

    fn put_i16(&mut self, v: i16) -> Result<()> {
        self.dst.extend_from_slice(&v.to_be_bytes());
        Ok(())
    }

    fn put_len(&mut self, len: usize, field: &'static str) -> Result<()> {
        let len = i16::try_from(len).map_err(|_| Error::LengthOverflow {
            field,
            len,
            max: i16::MAX as usize,
        })?;
        self.put_i16(len)
    }

    #[cfg(not(feature = "narrow-chars"))]
    fn put_char_unit(&mut self, unit: u16) -> Result<()> {
        self.dst.extend_from_slice(&unit.to_be_bytes());
        Ok(())
    }

    #[cfg(feature = "narrow-chars")]
    fn put_char_unit(&mut self, unit: u16) -> Result<()> {
        let byte = u8::try_from(unit).map_err(|_| {
            Error::UnrepresentableChar(
                char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER),
            )
        })?;
        self.dst.push(byte);
        Ok(())
    }
}

struct Decoder<'a> {
    registry: &'a Registry,
    buf: &'a [u8],
    pos: usize,
    elements: usize,
}

impl<'a> Decoder<'a> {
    fn new(registry: &'a Registry, buf: &'a [u8]) -> Self {
        Self {
            registry,
            buf,
            pos: 0,
            elements: 0,
        }
    }

    fn take<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N]> {
        let end = self.pos + N;
        let bytes = self.buf.get(self.pos..end).ok_or_else(|| {
            Error::malformed(format!(
                "field `{field}` runs past the end of the payload at byte {}",
                self.pos
            ))
        })?;
        self.pos = end;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn read_fields(&mut self, descriptor: &MessageDescriptor) -> Result<Vec<Value>> {
        descriptor
            .fields()
            .iter()
            .map(|field| self.read_value(&field.shape, field.name))
            .collect()
    }

    fn read_value(&mut self, shape: &Shape, field: &'static str) -> Result<Value> {
        match shape {
            Shape::Scalar(kind) => self.read_scalar(*kind, field),
            Shape::String => {
                let Some(len) = self.read_len(field)? else {
                    return Ok(Value::Str(None));
                };
                let units = (0..len)
                    .map(|_| self.read_char_unit(field))
                    .collect::<Result<Vec<u16>>>()?;
                String::from_utf16(&units)
                    .map(|s| Value::Str(Some(s)))
                    .map_err(|_| Error::InvalidUtf16 { field })
            }
            Shape::Array(element) => {
                let Some(len) = self.read_len(field)? else {
                    return Ok(Value::Array(None));
                };
                self.elements += len;
                if self.elements > MAX_FRAME_ELEMENTS {
                    return Err(Error::malformed(format!(
                        "field `{field}` brings the frame past {MAX_FRAME_ELEMENTS} array elements"
                    )));
                }
                let items = (0..len)
                    .map(|_| self.read_value(element, field))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::Array(Some(items)))
            }
            Shape::Record(record) => {
                let descriptor = self
                    .registry
                    .by_type(record.type_id())
                    .ok_or(Error::UnknownType(record.name()))?;
                Ok(Value::Record(self.read_fields(descriptor)?))
            }
            Shape::Dynamic => Err(Error::unsupported(
                field,
                "unconstrained field type cannot be decoded",
            )),
        }
    }

    fn read_scalar(&mut self, kind: ScalarKind, field: &'static str) -> Result<Value> {
        Ok(match kind {
            ScalarKind::U8 => Value::U8(u8::from_be_bytes(self.take(field)?)),
            ScalarKind::I8 => Value::I8(i8::from_be_bytes(self.take(field)?)),
            ScalarKind::Bool => Value::Bool(self.take::<1>(field)?[0] != 0),
            ScalarKind::I16 => Value::I16(i16::from_be_bytes(self.take(field)?)),
            ScalarKind::U16 => Value::U16(u16::from_be_bytes(self.take(field)?)),
            ScalarKind::Char => Value::Char(self.read_char_unit(field)?),
            ScalarKind::I32 => Value::I32(i32::from_be_bytes(self.take(field)?)),
            ScalarKind::U32 => Value::U32(u32::from_be_bytes(self.take(field)?)),
            ScalarKind::F32 => Value::F32(f32::from_be_bytes(self.take(field)?)),
            ScalarKind::I64 => Value::I64(i64::from_be_bytes(self.take(field)?)),
            ScalarKind::U64 => Value::U64(u64::from_be_bytes(self.take(field)?)),
            ScalarKind::F64 => Value::F64(f64::from_be_bytes(self.take(field)?)),
        })
    }

    /// Reads a 2-byte signed count; `None` for the null marker.
    fn read_len(&mut self, field: &'static str) -> Result<Option<usize>> {
        match i16::from_be_bytes(self.take(field)?) {
            NULL_LENGTH => Ok(None),
            len if len < 0 => Err(Error::malformed(format!(
                "field `{field}` has negative length {len}"
            ))),
            len => Ok(Some(len as usize)),
        }
    }

    #[cfg(not(feature = "narrow-chars"))]
    fn read_char_unit(&mut self, field: &'static str) -> Result<u16> {
        Ok(u16::from_be_bytes(self.take(field)?))
    }

    #[cfg(feature = "narrow-chars")]
    fn read_char_unit(&mut self, field: &'static str) -> Result<u16> {
        Ok(u16::from(self.take::<1>(field)?[0]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryBuilder;

    crate::message! {
        #[derive(Debug, Clone, PartialEq)]
        struct Hello [id = 0] {
            id: u64,
            author: String,
            body: String,
        }
    }

    crate::message! {
        #[derive(Debug, Clone, PartialEq)]
        struct Samples [id = 1] {
            values: Option<Vec<f64>>,
            note: Option<String>,
        }
    }

    crate::message! {
        #[derive(Debug, Clone, PartialEq)]
        struct Loose [id = 2] {
            items: Vec<Value>,
        }
    }

    crate::message! {
        #[derive(Debug, Clone, PartialEq)]
        struct Flag [id = 3] {
            on: bool,
        }
    }

    fn registry() -> Registry {
        RegistryBuilder::new()
            .register::<Hello>()
            .register::<Samples>()
            .register::<Loose>()
            .register::<Flag>()
            .build()
            .unwrap()
    }

    fn decode_one<M: Message>(registry: &Registry, bytes: &[u8]) -> (M, usize) {
        match read_message(registry, bytes, 0).unwrap() {
            Decoded::Message { message, consumed } => (message.downcast::<M>().unwrap(), consumed),
            Decoded::Incomplete(frame) => panic!("unexpected incomplete frame: {frame:?}"),
        }
    }

    #[cfg(not(feature = "narrow-chars"))]
    #[test]
    fn hello_frame_layout() {
        let registry = registry();
        let hello = Hello {
            id: 0,
            author: "Cloudy".into(),
            body: "hi".into(),
        };
        let bytes = encode(&registry, &hello).unwrap();
        let mut expected = vec![0x00, 0x00, 0x1C];
        expected.extend_from_slice(&[0; 8]);
        expected.extend_from_slice(&[0x00, 0x06]);
        for c in "Cloudy".bytes() {
            expected.extend_from_slice(&[0x00, c]);
        }
        expected.extend_from_slice(&[0x00, 0x02, 0x00, b'h', 0x00, b'i']);
        assert_eq!(bytes, expected);

        let (back, consumed) = decode_one::<Hello>(&registry, &bytes);
        assert_eq!(back, hello);
        assert_eq!(consumed, bytes.len());
    }

    #[test]
    fn two_bytes_are_not_a_header() {
        let registry = registry();
        let buf = [0x00, 0x00, 0x00];
        match read_message(&registry, &buf[..2], 0).unwrap() {
            Decoded::Incomplete(frame) => {
                assert_eq!(frame.declared_len(), -1);
                assert_eq!(frame.available, 2);
            }
            other => panic!("expected incomplete frame, got {other:?}"),
        }
    }

    #[test]
    fn short_payload_reports_declared_length() {
        let registry = registry();
        let bytes = encode(
            &registry,
            &Hello {
                id: 7,
                author: "a".into(),
                body: "b".into(),
            },
        )
        .unwrap();
        let mut padded = vec![0xAA; 4];
        padded.extend_from_slice(&bytes[..bytes.len() - 1]);
        match read_message(&registry, &padded, 4).unwrap() {
            Decoded::Incomplete(frame) => {
                assert_eq!(frame.offset, 4);
                assert_eq!(frame.available, bytes.len() - 1);
                assert_eq!(frame.declared_payload_len, Some((bytes.len() - 3) as u16));
            }
            other => panic!("expected incomplete frame, got {other:?}"),
        }
    }

    #[test]
    fn null_array_keeps_its_marker() {
        let registry = registry();
        let samples = Samples {
            values: None,
            note: None,
        };
        let bytes = encode(&registry, &samples).unwrap();
        assert_eq!(bytes, [0x01, 0x00, 0x04, 0xFF, 0xFF, 0xFF, 0xFF]);
        let (back, _) = decode_one::<Samples>(&registry, &bytes);
        assert_eq!(back, samples);
        assert_eq!(encode(&registry, &back).unwrap(), bytes);
    }

    #[test]
    fn empty_array_is_not_null() {
        let registry = registry();
        let samples = Samples {
            values: Some(vec![]),
            note: Some(String::new()),
        };
        let bytes = encode(&registry, &samples).unwrap();
        assert_eq!(&bytes[3..], [0x00, 0x00, 0x00, 0x00]);
        let (back, _) = decode_one::<Samples>(&registry, &bytes);
        assert_eq!(back, samples);
    }

    #[test]
    fn unknown_discriminator_is_an_error() {
        let registry = registry();
        let result = read_message(&registry, &[0x42, 0x00, 0x00], 0);
        assert!(matches!(result, Err(Error::UnknownDiscriminator(0x42))));
    }

    #[test]
    fn unregistered_type_is_an_error() {
        let registry = RegistryBuilder::new().register::<Hello>().build().unwrap();
        let mut out = vec![1, 2, 3];
        let result = write_message(&registry, &Flag { on: true }, &mut out);
        assert!(matches!(result, Err(Error::UnknownType("Flag"))));
        assert_eq!(out, [1, 2, 3]);
    }

    #[test]
    fn unconstrained_arrays_are_rejected() {
        let registry = registry();
        let loose = Loose {
            items: vec![Value::U8(1)],
        };
        let result = encode(&registry, &loose);
        assert!(matches!(
            result,
            Err(Error::UnsupportedFieldShape { field: "items", .. })
        ));
    }

    #[test]
    fn any_nonzero_byte_is_true() {
        let registry = registry();
        let (flag, _) = decode_one::<Flag>(&registry, &[0x03, 0x00, 0x01, 0x7F]);
        assert!(flag.on);
        assert_eq!(encode(&registry, &flag).unwrap(), [0x03, 0x00, 0x01, 0x01]);
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let registry = registry();
        let samples = Samples {
            values: Some(vec![1.0; 9000]),
            note: None,
        };
        let result = encode(&registry, &samples);
        assert!(matches!(result, Err(Error::PayloadTooLarge { .. })));
    }

    #[test]
    fn element_count_is_bounded_by_i16() {
        let registry = registry();
        let samples = Samples {
            values: Some(vec![0.0; i16::MAX as usize + 1]),
            note: None,
        };
        let result = encode(&registry, &samples);
        assert!(matches!(
            result,
            Err(Error::LengthOverflow { field: "values", .. })
        ));
    }

    #[test]
    fn payload_length_must_match_fields() {
        let registry = registry();
        // Flag declares 2 payload bytes but its single bool uses one.
        let result = read_message(&registry, &[0x03, 0x00, 0x02, 0x01, 0x00], 0);
        assert!(matches!(result, Err(Error::MalformedFrame { .. })));
        // And a string count that overruns the payload.
        let result = read_message(&registry, &[0x01, 0x00, 0x04, 0xFF, 0xFF, 0x00, 0x05], 0);
        assert!(matches!(result, Err(Error::MalformedFrame { .. })));
    }

    #[test]
    fn frames_decode_back_to_back() {
        let registry = registry();
        let mut buf = Vec::new();
        write_message(&registry, &Flag { on: true }, &mut buf).unwrap();
        write_message(&registry, &Flag { on: false }, &mut buf).unwrap();
        let Decoded::Message { message, consumed } = read_message(&registry, &buf, 0).unwrap() else {
            panic!("expected a message");
        };
        assert_eq!(message.downcast_ref::<Flag>(), Some(&Flag { on: true }));
        let Decoded::Message { message, .. } = read_message(&registry, &buf, consumed).unwrap() else {
            panic!("expected a message");
        };
        assert!(message.is::<Flag>());
        assert!(!message.is::<Hello>());
        assert_eq!(message.name(), "Flag");
        assert_eq!(message.discriminator(), 3);
    }

    crate::record! {
        #[derive(Debug, Clone, PartialEq)]
        struct Empty {}
    }

    crate::message! {
        #[derive(Debug, Clone, PartialEq)]
        struct Grid [id = 4] {
            cells: Vec<Vec<Empty>>,
        }
    }

    fn grid_registry() -> Registry {
        RegistryBuilder::new().register::<Grid>().build().unwrap()
    }

    #[test]
    fn arrays_of_empty_records_round_trip() {
        let registry = grid_registry();
        let grid = Grid {
            cells: vec![vec![Empty {}; 5], Vec::new(), vec![Empty {}; 2]],
        };
        let bytes = encode(&registry, &grid).unwrap();
        assert_eq!(bytes, [4, 0, 8, 0, 3, 0, 5, 0, 0, 0, 2]);
        let (back, _) = decode_one::<Grid>(&registry, &bytes);
        assert_eq!(back, grid);
    }

    #[test]
    fn element_count_is_bounded_per_frame() {
        let registry = grid_registry();
        // 32000 inner arrays each claiming 32767 empty records.
        let mut frame = vec![0x04, 0x00, 0x00, 0x7D, 0x00];
        for _ in 0..32000 {
            frame.extend_from_slice(&[0x7F, 0xFF]);
        }
        let len = (frame.len() - FRAME_HEADER_SIZE) as u16;
        frame[1..3].copy_from_slice(&len.to_be_bytes());
        let result = read_message(&registry, &frame, 0);
        assert!(matches!(result, Err(Error::MalformedFrame { .. })));

        let grid = Grid {
            cells: vec![vec![Empty {}; 30000]; 3],
        };
        let mut out = Vec::new();
        let result = write_message(&registry, &grid, &mut out);
        assert!(matches!(
            result,
            Err(Error::LengthOverflow { field: "cells", max: 65535, .. })
        ));
        assert!(out.is_empty());
    }
}

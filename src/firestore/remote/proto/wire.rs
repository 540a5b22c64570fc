//! Protobuf binary wire primitives.
//!
//! Just enough of the encoding to read and write the Firestore v1 messages this layer exchanges:
//! varints, 64/32-bit fixed values and length-delimited fields. Unknown fields are skipped on
//! decode, as protobuf requires.

use bytes::{BufMut, Bytes, BytesMut};

use crate::firestore::error::{data_loss, FirestoreResult};

/// Deepest chain of embedded messages accepted on decode.
pub const MAX_NESTING_DEPTH: u32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WireType {
    Varint,
    Fixed64,
    LengthDelimited,
    StartGroup,
    EndGroup,
    Fixed32,
}

impl WireType {
    fn from_raw(raw: u64) -> FirestoreResult<Self> {
        match raw {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::LengthDelimited),
            3 => Ok(WireType::StartGroup),
            4 => Ok(WireType::EndGroup),
            5 => Ok(WireType::Fixed32),
            other => Err(data_loss(format!(
                "Input proto bytes cannot be parsed (invalid wire type {other})"
            ))),
        }
    }

    fn as_raw(self) -> u64 {
        match self {
            WireType::Varint => 0,
            WireType::Fixed64 => 1,
            WireType::LengthDelimited => 2,
            WireType::StartGroup => 3,
            WireType::EndGroup => 4,
            WireType::Fixed32 => 5,
        }
    }
}

/// A protobuf message that can be written to and read from the binary wire format.
pub trait Message: Default + Sized {
    /// Writes every populated field of the message.
    fn encode_fields(&self, writer: &mut ProtoWriter);

    /// Consumes one field; unknown fields must be skipped with [`ProtoReader::skip`].
    fn merge_field(
        &mut self,
        field: u32,
        wire_type: WireType,
        reader: &mut ProtoReader<'_>,
    ) -> FirestoreResult<()>;

    fn encode_to_bytes(&self) -> Bytes {
        let mut writer = ProtoWriter::new();
        self.encode_fields(&mut writer);
        writer.into_bytes()
    }

    fn decode(buf: &[u8]) -> FirestoreResult<Self> {
        Self::decode_nested(buf, 0)
    }

    /// Decodes a message embedded `depth` levels below the top-level one.
    fn decode_nested(buf: &[u8], depth: u32) -> FirestoreResult<Self> {
        if depth > MAX_NESTING_DEPTH {
            return Err(data_loss(
                "Input proto bytes cannot be parsed (message nesting too deep)",
            ));
        }
        let mut message = Self::default();
        let mut reader = ProtoReader::nested(buf, depth);
        while let Some((field, wire_type)) = reader.next_field()? {
            message.merge_field(field, wire_type, &mut reader)?;
        }
        Ok(message)
    }
}

/// Appends encoded fields to an owned, growable buffer.
#[derive(Debug, Default)]
pub struct ProtoWriter {
    buf: BytesMut,
}

impl ProtoWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    fn put_varint(&mut self, mut value: u64) {
        loop {
            let mut byte = (value & 0x7F) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80;
            }
            self.buf.put_u8(byte);
            if value == 0 {
                break;
            }
        }
    }

    fn put_tag(&mut self, field: u32, wire_type: WireType) {
        self.put_varint((u64::from(field) << 3) | wire_type.as_raw());
    }

    pub fn write_varint(&mut self, field: u32, value: u64) {
        self.put_tag(field, WireType::Varint);
        self.put_varint(value);
    }

    pub fn write_int64(&mut self, field: u32, value: i64) {
        self.write_varint(field, value as u64);
    }

    pub fn write_int32(&mut self, field: u32, value: i32) {
        // Negative int32 values are sign-extended to ten bytes.
        self.write_varint(field, i64::from(value) as u64);
    }

    pub fn write_bool(&mut self, field: u32, value: bool) {
        self.write_varint(field, u64::from(value));
    }

    pub fn write_double(&mut self, field: u32, value: f64) {
        self.put_tag(field, WireType::Fixed64);
        self.buf.put_u64_le(value.to_bits());
    }

    pub fn write_bytes(&mut self, field: u32, value: &[u8]) {
        self.put_tag(field, WireType::LengthDelimited);
        self.put_varint(value.len() as u64);
        self.buf.extend_from_slice(value);
    }

    pub fn write_string(&mut self, field: u32, value: &str) {
        self.write_bytes(field, value.as_bytes());
    }

    pub fn write_message<M: Message>(&mut self, field: u32, message: &M) {
        let mut nested = ProtoWriter::new();
        message.encode_fields(&mut nested);
        self.write_bytes(field, &nested.buf);
    }

    // proto3 scalars at their default value are omitted from the wire.

    pub fn write_int64_if_set(&mut self, field: u32, value: i64) {
        if value != 0 {
            self.write_int64(field, value);
        }
    }

    pub fn write_int32_if_set(&mut self, field: u32, value: i32) {
        if value != 0 {
            self.write_int32(field, value);
        }
    }

    pub fn write_bool_if_set(&mut self, field: u32, value: bool) {
        if value {
            self.write_bool(field, value);
        }
    }

    pub fn write_double_if_set(&mut self, field: u32, value: f64) {
        if value.to_bits() != 0 {
            self.write_double(field, value);
        }
    }

    pub fn write_string_if_set(&mut self, field: u32, value: &str) {
        if !value.is_empty() {
            self.write_string(field, value);
        }
    }

    pub fn write_bytes_if_set(&mut self, field: u32, value: &[u8]) {
        if !value.is_empty() {
            self.write_bytes(field, value);
        }
    }
}

/// Reads fields from a borrowed buffer. Every failure is a `DataLoss` error.
#[derive(Debug)]
pub struct ProtoReader<'a> {
    buf: &'a [u8],
    depth: u32,
}

impl<'a> ProtoReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self::nested(buf, 0)
    }

    fn nested(buf: &'a [u8], depth: u32) -> Self {
        Self { buf, depth }
    }

    /// Returns the next field header, or `None` once the buffer is exhausted.
    pub fn next_field(&mut self) -> FirestoreResult<Option<(u32, WireType)>> {
        if self.buf.is_empty() {
            return Ok(None);
        }
        let tag = self.take_varint()?;
        let wire_type = WireType::from_raw(tag & 0x07)?;
        let field = u32::try_from(tag >> 3)
            .map_err(|_| data_loss("Input proto bytes cannot be parsed (field number overflow)"))?;
        if field == 0 {
            return Err(data_loss("Input proto bytes cannot be parsed (field number 0)"));
        }
        Ok(Some((field, wire_type)))
    }

    fn take_varint(&mut self) -> FirestoreResult<u64> {
        let mut result: u64 = 0;
        let mut shift = 0;
        loop {
            let (&byte, rest) = self
                .buf
                .split_first()
                .ok_or_else(|| data_loss("Input proto bytes cannot be parsed (truncated varint)"))?;
            self.buf = rest;
            if shift == 63 && byte > 1 {
                return Err(data_loss("Input proto bytes cannot be parsed (varint overflow)"));
            }
            result |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
            if shift > 63 {
                return Err(data_loss("Input proto bytes cannot be parsed (varint overflow)"));
            }
        }
    }

    fn take(&mut self, len: usize) -> FirestoreResult<&'a [u8]> {
        if self.buf.len() < len {
            return Err(data_loss(format!(
                "Input proto bytes cannot be parsed (needed {len} bytes, {} remain)",
                self.buf.len()
            )));
        }
        let (head, rest) = self.buf.split_at(len);
        self.buf = rest;
        Ok(head)
    }

    fn expect(actual: WireType, expected: WireType) -> FirestoreResult<()> {
        if actual != expected {
            return Err(data_loss(format!(
                "Input proto bytes cannot be parsed (expected wire type {expected:?}, found {actual:?})"
            )));
        }
        Ok(())
    }

    pub fn read_varint(&mut self, wire_type: WireType) -> FirestoreResult<u64> {
        Self::expect(wire_type, WireType::Varint)?;
        self.take_varint()
    }

    pub fn read_int64(&mut self, wire_type: WireType) -> FirestoreResult<i64> {
        self.read_varint(wire_type).map(|value| value as i64)
    }

    pub fn read_int32(&mut self, wire_type: WireType) -> FirestoreResult<i32> {
        // Truncation matches protobuf's int32 semantics.
        self.read_varint(wire_type).map(|value| value as i32)
    }

    pub fn read_double(&mut self, wire_type: WireType) -> FirestoreResult<f64> {
        Self::expect(wire_type, WireType::Fixed64)?;
        let raw = self.take(8)?;
        let mut bits = [0u8; 8];
        bits.copy_from_slice(raw);
        Ok(f64::from_bits(u64::from_le_bytes(bits)))
    }

    pub fn read_bytes(&mut self, wire_type: WireType) -> FirestoreResult<&'a [u8]> {
        Self::expect(wire_type, WireType::LengthDelimited)?;
        let len = self.take_varint()?;
        let len = usize::try_from(len)
            .map_err(|_| data_loss("Input proto bytes cannot be parsed (length overflow)"))?;
        self.take(len)
    }

    pub fn read_string(&mut self, wire_type: WireType) -> FirestoreResult<String> {
        let raw = self.read_bytes(wire_type)?;
        String::from_utf8(raw.to_vec())
            .map_err(|_| data_loss("Input proto bytes cannot be parsed (invalid UTF-8 string)"))
    }

    pub fn read_message<M: Message>(&mut self, wire_type: WireType) -> FirestoreResult<M> {
        let raw = self.read_bytes(wire_type)?;
        M::decode_nested(raw, self.depth + 1)
    }

    /// Skips over a field this reader does not model.
    pub fn skip(&mut self, wire_type: WireType) -> FirestoreResult<()> {
        match wire_type {
            WireType::Varint => self.take_varint().map(|_| ()),
            WireType::Fixed64 => self.take(8).map(|_| ()),
            WireType::Fixed32 => self.take(4).map(|_| ()),
            WireType::LengthDelimited => self.read_bytes(wire_type).map(|_| ()),
            WireType::StartGroup | WireType::EndGroup => Err(data_loss(
                "Input proto bytes cannot be parsed (groups are not supported)",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Sample {
        number: i64,
        small: i32,
        name: String,
    }

    impl Message for Sample {
        fn encode_fields(&self, writer: &mut ProtoWriter) {
            writer.write_int64_if_set(1, self.number);
            writer.write_int32_if_set(2, self.small);
            writer.write_string_if_set(3, &self.name);
        }

        fn merge_field(
            &mut self,
            field: u32,
            wire_type: WireType,
            reader: &mut ProtoReader<'_>,
        ) -> FirestoreResult<()> {
            match field {
                1 => self.number = reader.read_int64(wire_type)?,
                2 => self.small = reader.read_int32(wire_type)?,
                3 => self.name = reader.read_string(wire_type)?,
                _ => reader.skip(wire_type)?,
            }
            Ok(())
        }
    }

    #[test]
    fn encodes_known_bytes() {
        let sample = Sample {
            number: 150,
            small: 0,
            name: "hi".to_string(),
        };
        assert_eq!(
            sample.encode_to_bytes().as_ref(),
            &[0x08, 0x96, 0x01, 0x1a, 0x02, b'h', b'i']
        );
    }

    #[test]
    fn negative_values_survive() {
        let sample = Sample {
            number: -1,
            small: -2,
            name: String::new(),
        };
        let bytes = sample.encode_to_bytes();
        // tag + ten varint bytes for each negative field
        assert_eq!(bytes.len(), 22);
        assert_eq!(Sample::decode(&bytes).unwrap(), sample);
    }

    #[test]
    fn skips_unknown_fields() {
        let mut writer = ProtoWriter::new();
        writer.write_double(9, 1.5);
        writer.write_string(10, "ignored");
        writer.write_int64(1, 7);
        let decoded = Sample::decode(&writer.into_bytes()).unwrap();
        assert_eq!(decoded.number, 7);
    }

    #[test]
    fn truncated_input_is_data_loss() {
        let err = Sample::decode(&[0x1a, 0x05, b'a']).unwrap_err();
        assert_eq!(err.code_str(), "firestore/data-loss");
        let err = Sample::decode(&[0x08, 0x80]).unwrap_err();
        assert_eq!(err.code_str(), "firestore/data-loss");
    }

    #[derive(Debug, Default)]
    struct Chain {
        next: Option<Box<Chain>>,
    }

    impl Message for Chain {
        fn encode_fields(&self, writer: &mut ProtoWriter) {
            if let Some(next) = &self.next {
                writer.write_message(1, next.as_ref());
            }
        }

        fn merge_field(
            &mut self,
            field: u32,
            wire_type: WireType,
            reader: &mut ProtoReader<'_>,
        ) -> FirestoreResult<()> {
            match field {
                1 => self.next = Some(Box::new(reader.read_message(wire_type)?)),
                _ => reader.skip(wire_type)?,
            }
            Ok(())
        }
    }

    /// `levels` embedded messages, built from the inside out.
    fn chain_bytes(levels: usize) -> Vec<u8> {
        let mut bytes = Vec::new();
        for _ in 0..levels {
            let mut writer = ProtoWriter::new();
            writer.write_bytes(1, &bytes);
            bytes = writer.into_bytes().to_vec();
        }
        bytes
    }

    #[test]
    fn nesting_up_to_the_limit_decodes() {
        let chain = Chain::decode(&chain_bytes(MAX_NESTING_DEPTH as usize)).unwrap();
        let mut depth = 0;
        let mut current = &chain;
        while let Some(next) = &current.next {
            depth += 1;
            current = next;
        }
        assert_eq!(depth, MAX_NESTING_DEPTH);
    }

    #[test]
    fn nesting_past_the_limit_is_data_loss() {
        let err = Chain::decode(&chain_bytes(MAX_NESTING_DEPTH as usize + 1)).unwrap_err();
        assert_eq!(err.code_str(), "firestore/data-loss");
        assert!(err.message().contains("nesting too deep"));
    }

    #[test]
    fn mismatched_wire_type_is_data_loss() {
        // field 3 sent as a varint
        let err = Sample::decode(&[0x18, 0x01]).unwrap_err();
        assert_eq!(err.code_str(), "firestore/data-loss");
    }
}

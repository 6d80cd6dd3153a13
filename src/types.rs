//! AMQP field types and the wire primitives they are built from.
//!
//! The value tag set matches what RabbitMQ actually sends and accepts.

use crate::error::{Error, Result};

use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;

pub type Boolean = bool;
pub type ShortUInt = u16;
pub type LongUInt = u32;
pub type LongLongUInt = u64;
pub type ShortString = String;
pub type LongString = String;
pub type Timestamp = u64;
pub type FieldTable = BTreeMap<ShortString, AMQPValue>;
pub type FieldArray = Vec<AMQPValue>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecimalValue {
    pub scale: u8,
    pub value: LongUInt,
}

/// A value in an AMQP field table or field array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AMQPValue {
    Boolean(Boolean),
    ShortShortInt(i8),
    ShortShortUInt(u8),
    ShortInt(i16),
    ShortUInt(ShortUInt),
    LongInt(i32),
    LongUInt(LongUInt),
    LongLongInt(i64),
    LongLongUInt(LongLongUInt),
    Float(f32),
    Double(f64),
    DecimalValue(DecimalValue),
    ShortString(ShortString),
    LongString(LongString),
    Timestamp(Timestamp),
    Void,
    FieldArray(FieldArray),
    FieldTable(FieldTable),
}

impl From<bool> for AMQPValue {
    fn from(v: bool) -> Self {
        AMQPValue::Boolean(v)
    }
}

impl From<&str> for AMQPValue {
    fn from(v: &str) -> Self {
        AMQPValue::LongString(v.to_string())
    }
}

impl From<String> for AMQPValue {
    fn from(v: String) -> Self {
        AMQPValue::LongString(v)
    }
}

impl From<FieldTable> for AMQPValue {
    fn from(v: FieldTable) -> Self {
        AMQPValue::FieldTable(v)
    }
}

/// Sequential reader over a single frame payload.
///
/// Running out of bytes mid-payload is a framing error: the envelope already
/// told us the payload was complete.
pub(crate) struct ByteReader<'buffer> {
    data: &'buffer [u8],
}

macro_rules! reader_primitive {
    ($name:ident, $ty:ty, $len:expr) => {
        pub(crate) fn $name(&mut self) -> Result<$ty> {
            if self.data.len() < $len {
                return Err(Error::MalformedFrame("truncated payload"));
            }
            let mut buffer = [0u8; $len];
            buffer.copy_from_slice(&self.data[..$len]);
            self.data = &self.data[$len..];
            Ok(<$ty>::from_be_bytes(buffer))
        }
    };
}

impl<'buffer> ByteReader<'buffer> {
    pub(crate) fn new(data: &'buffer [u8]) -> ByteReader<'buffer> {
        Self { data }
    }

    reader_primitive!(read_u8, u8, 1);
    reader_primitive!(read_i8, i8, 1);
    reader_primitive!(read_u16, u16, 2);
    reader_primitive!(read_i16, i16, 2);
    reader_primitive!(read_u32, u32, 4);
    reader_primitive!(read_i32, i32, 4);
    reader_primitive!(read_u64, u64, 8);
    reader_primitive!(read_i64, i64, 8);
    reader_primitive!(read_f32, f32, 4);
    reader_primitive!(read_f64, f64, 8);

    pub(crate) fn read_bytes(&mut self, length: usize) -> Result<&'buffer [u8]> {
        if self.data.len() < length {
            return Err(Error::MalformedFrame("truncated payload"));
        }
        let (taken, rest) = self.data.split_at(length);
        self.data = rest;
        Ok(taken)
    }

    pub(crate) fn read_short_string(&mut self) -> Result<ShortString> {
        let length = self.read_u8()? as usize;
        let bytes = self.read_bytes(length)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| Error::MalformedFrame("invalid utf-8 string"))
    }

    pub(crate) fn read_long_string(&mut self) -> Result<LongString> {
        let length = self.read_u32()? as usize;
        let bytes = self.read_bytes(length)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| Error::MalformedFrame("invalid utf-8 string"))
    }

    pub(crate) fn read_table(&mut self) -> Result<FieldTable> {
        let mut bytes_to_read = self.read_u32()? as usize;
        let mut table = FieldTable::new();

        while bytes_to_read > 0 {
            let bytes_before = self.bytes_available();
            let key = self.read_short_string()?;
            let value = self.read_value()?;
            table.insert(key, value);
            let consumed = bytes_before - self.bytes_available();
            if consumed > bytes_to_read {
                return Err(Error::MalformedFrame("field table overruns its length"));
            }
            bytes_to_read -= consumed;
        }

        Ok(table)
    }

    pub(crate) fn read_array(&mut self) -> Result<FieldArray> {
        let mut bytes_to_read = self.read_u32()? as usize;
        let mut array = FieldArray::new();

        while bytes_to_read > 0 {
            let bytes_before = self.bytes_available();
            array.push(self.read_value()?);
            let consumed = bytes_before - self.bytes_available();
            if consumed > bytes_to_read {
                return Err(Error::MalformedFrame("field array overruns its length"));
            }
            bytes_to_read -= consumed;
        }

        Ok(array)
    }

    pub(crate) fn read_value(&mut self) -> Result<AMQPValue> {
        match self.read_u8()? {
            b't' => Ok(AMQPValue::Boolean(self.read_u8()? > 0)),
            b'b' => Ok(AMQPValue::ShortShortInt(self.read_i8()?)),
            b'B' => Ok(AMQPValue::ShortShortUInt(self.read_u8()?)),
            b'U' => Ok(AMQPValue::ShortInt(self.read_i16()?)),
            b'u' => Ok(AMQPValue::ShortUInt(self.read_u16()?)),
            b'I' => Ok(AMQPValue::LongInt(self.read_i32()?)),
            b'i' => Ok(AMQPValue::LongUInt(self.read_u32()?)),
            b'L' => Ok(AMQPValue::LongLongInt(self.read_i64()?)),
            b'l' => Ok(AMQPValue::LongLongUInt(self.read_u64()?)),
            b'f' => Ok(AMQPValue::Float(self.read_f32()?)),
            b'd' => Ok(AMQPValue::Double(self.read_f64()?)),
            b'D' => Ok(AMQPValue::DecimalValue(DecimalValue {
                scale: self.read_u8()?,
                value: self.read_u32()?,
            })),
            b's' => Ok(AMQPValue::ShortString(self.read_short_string()?)),
            b'S' => Ok(AMQPValue::LongString(self.read_long_string()?)),
            b'T' => Ok(AMQPValue::Timestamp(self.read_u64()?)),
            b'V' => Ok(AMQPValue::Void),
            b'F' => Ok(AMQPValue::FieldTable(self.read_table()?)),
            b'A' => Ok(AMQPValue::FieldArray(self.read_array()?)),
            _ => Err(Error::MalformedFrame("unknown field value type")),
        }
    }

    pub(crate) fn bytes_available(&self) -> usize {
        self.data.len()
    }
}

macro_rules! writer_primitive {
    ($name:ident, $ty:ty) => {
        pub(crate) fn $name(buffer: &mut Vec<u8>, value: $ty) {
            buffer.extend_from_slice(&value.to_be_bytes());
        }
    };
}

writer_primitive!(write_u8, u8);
writer_primitive!(write_i8, i8);
writer_primitive!(write_u16, u16);
writer_primitive!(write_i16, i16);
writer_primitive!(write_u32, u32);
writer_primitive!(write_i32, i32);
writer_primitive!(write_u64, u64);
writer_primitive!(write_i64, i64);
writer_primitive!(write_f32, f32);
writer_primitive!(write_f64, f64);

pub(crate) fn write_bytes(buffer: &mut Vec<u8>, value: &[u8]) {
    buffer.extend_from_slice(value);
}

pub(crate) fn write_short_string(buffer: &mut Vec<u8>, value: &str) -> Result<()> {
    if value.len() > u8::max_value() as usize {
        return Err(Error::MalformedFrame("short string longer than 255 bytes"));
    }
    write_u8(buffer, value.len() as u8);
    write_bytes(buffer, value.as_bytes());
    Ok(())
}

pub(crate) fn write_long_string(buffer: &mut Vec<u8>, value: &str) -> Result<()> {
    write_u32(buffer, value.len() as u32);
    write_bytes(buffer, value.as_bytes());
    Ok(())
}

pub(crate) fn write_table(buffer: &mut Vec<u8>, table: &FieldTable) -> Result<()> {
    let mut tmp = Vec::new();
    for (key, value) in table {
        write_short_string(&mut tmp, key)?;
        write_value(&mut tmp, value)?;
    }
    write_u32(buffer, tmp.len() as u32);
    write_bytes(buffer, &tmp);
    Ok(())
}

pub(crate) fn write_array(buffer: &mut Vec<u8>, array: &[AMQPValue]) -> Result<()> {
    let mut tmp = Vec::new();
    for value in array {
        write_value(&mut tmp, value)?;
    }
    write_u32(buffer, tmp.len() as u32);
    write_bytes(buffer, &tmp);
    Ok(())
}

pub(crate) fn write_value(buffer: &mut Vec<u8>, value: &AMQPValue) -> Result<()> {
    match value {
        AMQPValue::Boolean(v) => {
            write_u8(buffer, b't');
            write_u8(buffer, *v as u8);
        }
        AMQPValue::ShortShortInt(v) => {
            write_u8(buffer, b'b');
            write_i8(buffer, *v);
        }
        AMQPValue::ShortShortUInt(v) => {
            write_u8(buffer, b'B');
            write_u8(buffer, *v);
        }
        AMQPValue::ShortInt(v) => {
            write_u8(buffer, b'U');
            write_i16(buffer, *v);
        }
        AMQPValue::ShortUInt(v) => {
            write_u8(buffer, b'u');
            write_u16(buffer, *v);
        }
        AMQPValue::LongInt(v) => {
            write_u8(buffer, b'I');
            write_i32(buffer, *v);
        }
        AMQPValue::LongUInt(v) => {
            write_u8(buffer, b'i');
            write_u32(buffer, *v);
        }
        AMQPValue::LongLongInt(v) => {
            write_u8(buffer, b'L');
            write_i64(buffer, *v);
        }
        AMQPValue::LongLongUInt(v) => {
            write_u8(buffer, b'l');
            write_u64(buffer, *v);
        }
        AMQPValue::Float(v) => {
            write_u8(buffer, b'f');
            write_f32(buffer, *v);
        }
        AMQPValue::Double(v) => {
            write_u8(buffer, b'd');
            write_f64(buffer, *v);
        }
        AMQPValue::DecimalValue(v) => {
            write_u8(buffer, b'D');
            write_u8(buffer, v.scale);
            write_u32(buffer, v.value);
        }
        AMQPValue::ShortString(v) => {
            write_u8(buffer, b's');
            write_short_string(buffer, v)?;
        }
        AMQPValue::LongString(v) => {
            write_u8(buffer, b'S');
            write_long_string(buffer, v)?;
        }
        AMQPValue::Timestamp(v) => {
            write_u8(buffer, b'T');
            write_u64(buffer, *v);
        }
        AMQPValue::Void => {
            write_u8(buffer, b'V');
        }
        AMQPValue::FieldTable(v) => {
            write_u8(buffer, b'F');
            write_table(buffer, v)?;
        }
        AMQPValue::FieldArray(v) => {
            write_u8(buffer, b'A');
            write_array(buffer, v)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(value: AMQPValue) {
        let mut buffer = Vec::new();
        write_value(&mut buffer, &value).unwrap();
        let mut reader = ByteReader::new(&buffer);
        assert_eq!(reader.read_value().unwrap(), value);
        assert_eq!(reader.bytes_available(), 0);
    }

    #[test]
    fn value_roundtrips() {
        roundtrip(AMQPValue::Boolean(true));
        roundtrip(AMQPValue::ShortShortInt(-4));
        roundtrip(AMQPValue::ShortShortUInt(255));
        roundtrip(AMQPValue::ShortInt(-1000));
        roundtrip(AMQPValue::ShortUInt(1000));
        roundtrip(AMQPValue::LongInt(-70_000));
        roundtrip(AMQPValue::LongUInt(70_000));
        roundtrip(AMQPValue::LongLongInt(-5_000_000_000));
        roundtrip(AMQPValue::LongLongUInt(5_000_000_000));
        roundtrip(AMQPValue::Float(1.5));
        roundtrip(AMQPValue::Double(-2.25));
        roundtrip(AMQPValue::DecimalValue(DecimalValue { scale: 2, value: 12345 }));
        roundtrip(AMQPValue::ShortString("tag".to_string()));
        roundtrip(AMQPValue::LongString("payload".to_string()));
        roundtrip(AMQPValue::Timestamp(1234567890));
        roundtrip(AMQPValue::Void);
    }

    #[test]
    fn nested_table_roundtrips() {
        let mut inner = FieldTable::new();
        inner.insert("x-match".to_string(), AMQPValue::LongString("all".to_string()));
        let mut table = FieldTable::new();
        table.insert("arguments".to_string(), AMQPValue::FieldTable(inner));
        table.insert(
            "values".to_string(),
            AMQPValue::FieldArray(vec![AMQPValue::LongInt(1), AMQPValue::Boolean(false)]),
        );

        let mut buffer = Vec::new();
        write_table(&mut buffer, &table).unwrap();
        let mut reader = ByteReader::new(&buffer);
        assert_eq!(reader.read_table().unwrap(), table);
    }

    #[test]
    fn short_string_length_is_bounded() {
        let mut buffer = Vec::new();
        let long = "x".repeat(256);
        assert!(write_short_string(&mut buffer, &long).is_err());
    }

    #[test]
    fn truncated_payload_is_malformed() {
        let mut reader = ByteReader::new(&[0x00]);
        assert!(reader.read_u16().is_err());
    }
}

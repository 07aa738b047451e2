//! PLAIN encoding
//!
//! Fixed-width types are stored little-endian back to back, booleans are
//! bit-packed LSB first, and byte arrays carry a 4-byte little-endian length
//! in front of each value.

use bytes::Bytes;
use ordered_float::OrderedFloat;

use crate::bits;
use crate::schema::PhysicalType;
use crate::{ParquetError, Result, Value};

#[derive(Debug)]
pub struct PlainDecoder {
    physical_type: PhysicalType,
    data: Bytes,
    pos: usize,
    // Bit cursor for booleans, which share bytes
    bit_pos: usize,
}

impl PlainDecoder {
    pub fn new(physical_type: PhysicalType) -> Self {
        Self {
            physical_type,
            data: Bytes::new(),
            pos: 0,
            bit_pos: 0,
        }
    }

    pub fn init(&mut self, data: Bytes) {
        self.data = data;
        self.pos = 0;
        self.bit_pos = 0;
    }

    pub fn decode_values(&mut self, dest: &mut [Value]) -> Result<usize> {
        for (i, slot) in dest.iter_mut().enumerate() {
            match self.next_value()? {
                Some(value) => *slot = value,
                None => {
                    return Err(ParquetError::truncated(
                        format!("plain {} values", self.physical_type),
                        dest.len(),
                        i,
                    ))
                }
            }
        }
        Ok(dest.len())
    }

    fn take(&mut self, len: usize) -> Option<Bytes> {
        let end = self.pos.checked_add(len)?;
        if end > self.data.len() {
            return None;
        }
        let out = self.data.slice(self.pos..end);
        self.pos = end;
        Some(out)
    }

    fn take_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&bytes);
        Some(out)
    }

    fn next_value(&mut self) -> Result<Option<Value>> {
        let value = match self.physical_type {
            PhysicalType::Boolean => {
                let byte = self.bit_pos / 8;
                if byte >= self.data.len() {
                    return Ok(None);
                }
                let bit = (self.data[byte] >> (self.bit_pos % 8)) & 1;
                self.bit_pos += 1;
                Some(Value::Boolean(bit == 1))
            }
            PhysicalType::Int32 => self.take_array().map(|b| Value::Int32(i32::from_le_bytes(b))),
            PhysicalType::Int64 => self.take_array().map(|b| Value::Int64(i64::from_le_bytes(b))),
            PhysicalType::Int96 => self.take_array::<12>().map(|b| {
                Value::Int96([
                    u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
                    u32::from_le_bytes([b[4], b[5], b[6], b[7]]),
                    u32::from_le_bytes([b[8], b[9], b[10], b[11]]),
                ])
            }),
            PhysicalType::Float => self
                .take_array()
                .map(|b| Value::Float(OrderedFloat(f32::from_le_bytes(b)))),
            PhysicalType::Double => self
                .take_array()
                .map(|b| Value::Double(OrderedFloat(f64::from_le_bytes(b)))),
            PhysicalType::ByteArray => {
                let Some(len) = self.take_array::<4>() else {
                    return Ok(None);
                };
                let len = u32::from_le_bytes(len) as usize;
                match self.take(len) {
                    Some(bytes) => Some(Value::ByteArray(bytes)),
                    None => {
                        return Err(ParquetError::truncated(
                            "byte array value",
                            len,
                            self.data.len() - self.pos,
                        ))
                    }
                }
            }
            PhysicalType::FixedLenByteArray(len) => self.take(len).map(Value::FixedLenByteArray),
        };
        Ok(value)
    }
}

#[derive(Debug)]
pub struct PlainEncoder {
    physical_type: PhysicalType,
    buf: Vec<u8>,
    bools: Vec<u32>,
}

impl PlainEncoder {
    pub fn new(physical_type: PhysicalType) -> Self {
        Self {
            physical_type,
            buf: Vec::new(),
            bools: Vec::new(),
        }
    }

    pub fn encode_values(&mut self, values: &[Value]) -> Result<()> {
        values.iter().try_for_each(|v| self.put(v))
    }

    pub fn put(&mut self, value: &Value) -> Result<()> {
        if !value.matches(self.physical_type) {
            return Err(ParquetError::invalid_argument(format!(
                "cannot store {} in a {} column",
                value.type_name(),
                self.physical_type
            )));
        }

        match value {
            Value::Boolean(b) => self.bools.push(*b as u32),
            Value::Int32(v) => self.buf.extend_from_slice(&v.to_le_bytes()),
            Value::Int64(v) => self.buf.extend_from_slice(&v.to_le_bytes()),
            Value::Int96(words) => {
                for word in words {
                    self.buf.extend_from_slice(&word.to_le_bytes());
                }
            }
            Value::Float(v) => self.buf.extend_from_slice(&v.0.to_le_bytes()),
            Value::Double(v) => self.buf.extend_from_slice(&v.0.to_le_bytes()),
            Value::ByteArray(bytes) => {
                let len = u32::try_from(bytes.len()).map_err(|_| {
                    ParquetError::invalid_argument(format!(
                        "byte array of {} bytes is too long",
                        bytes.len()
                    ))
                })?;
                self.buf.extend_from_slice(&len.to_le_bytes());
                self.buf.extend_from_slice(bytes);
            }
            Value::FixedLenByteArray(bytes) => self.buf.extend_from_slice(bytes),
            Value::Null => unreachable!("null never matches a physical type"),
        }
        Ok(())
    }

    pub fn finish(mut self) -> Vec<u8> {
        if self.physical_type == PhysicalType::Boolean {
            bits::pack_bits(&self.bools, 1, &mut self.buf);
        }
        self.buf
    }
}

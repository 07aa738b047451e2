//! Dictionary-indexed values (PLAIN_DICTIONARY and RLE_DICTIONARY)
//!
//! A data page stores one byte holding the index bit width followed by a
//! hybrid-encoded index stream. The dictionary itself lives in a separate
//! dictionary page owned by the column chunk.

use std::sync::Arc;

use bytes::Bytes;
use indexmap::IndexSet;

use super::plain::{PlainDecoder, PlainEncoder};
use crate::bits;
use crate::hybrid::{HybridDecoder, HybridEncoder};
use crate::schema::PhysicalType;
use crate::{ParquetError, Result, Value};

/// Insertion-ordered set of distinct values; a value's position is its index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dictionary {
    physical_type: PhysicalType,
    values: IndexSet<Value>,
}

impl Dictionary {
    pub fn new(physical_type: PhysicalType) -> Self {
        Self {
            physical_type,
            values: IndexSet::new(),
        }
    }

    /// Builds a dictionary from already-distinct values.
    pub fn from_values(physical_type: PhysicalType, values: Vec<Value>) -> Result<Self> {
        let mut dictionary = Self::new(physical_type);
        for value in values {
            dictionary.check_type(&value)?;
            let (index, inserted) = dictionary.values.insert_full(value);
            if !inserted {
                return Err(ParquetError::dictionary(format!(
                    "duplicate dictionary entry at index {}",
                    index
                )));
            }
        }
        Ok(dictionary)
    }

    /// Decodes a PLAIN-encoded dictionary page body.
    pub fn decode_plain(
        physical_type: PhysicalType,
        data: Bytes,
        num_values: usize,
    ) -> Result<Self> {
        let mut decoder = PlainDecoder::new(physical_type);
        decoder.init(data);
        let mut values = vec![Value::Null; num_values];
        decoder.decode_values(&mut values)?;
        Self::from_values(physical_type, values)
    }

    /// PLAIN-encodes the entries, the body of a dictionary page.
    pub fn encode_plain(&self) -> Result<Vec<u8>> {
        let mut encoder = PlainEncoder::new(self.physical_type);
        for value in &self.values {
            encoder.put(value)?;
        }
        Ok(encoder.finish())
    }

    /// Returns the index of `value`, adding it if it is new.
    pub fn insert(&mut self, value: &Value) -> Result<u32> {
        let index = match self.values.get_index_of(value) {
            Some(index) => index,
            None => {
                self.check_type(value)?;
                self.values.insert_full(value.clone()).0
            }
        };
        u32::try_from(index)
            .map_err(|_| ParquetError::dictionary("dictionary exceeds u32::MAX entries"))
    }

    pub fn get(&self, index: u32) -> Option<&Value> {
        self.values.get_index(index as usize)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn physical_type(&self) -> PhysicalType {
        self.physical_type
    }

    /// Bit width needed for indices into this dictionary.
    pub fn index_bit_width(&self) -> u8 {
        bits::bit_width(self.len().saturating_sub(1) as u32)
    }

    fn check_type(&self, value: &Value) -> Result<()> {
        if value.matches(self.physical_type) {
            Ok(())
        } else {
            Err(ParquetError::invalid_argument(format!(
                "cannot store {} in a {} dictionary",
                value.type_name(),
                self.physical_type
            )))
        }
    }
}

#[derive(Debug)]
pub struct DictionaryDecoder {
    dictionary: Arc<Dictionary>,
    indices: Option<HybridDecoder>,
}

impl DictionaryDecoder {
    pub fn new(dictionary: Arc<Dictionary>) -> Self {
        Self {
            dictionary,
            indices: None,
        }
    }

    pub fn init(&mut self, data: Bytes) -> Result<()> {
        self.indices = match data.first() {
            Some(&bit_width) => Some(HybridDecoder::new(bit_width, data.slice(1..))?),
            // A page without values has no bit width byte either
            None => None,
        };
        Ok(())
    }

    pub fn decode_values(&mut self, dest: &mut [Value]) -> Result<usize> {
        let expected = dest.len();
        for (i, slot) in dest.iter_mut().enumerate() {
            let index = match self.indices.as_mut() {
                Some(indices) => indices.next_value()?,
                None => None,
            };
            let Some(index) = index else {
                return Err(ParquetError::truncated("dictionary indices", expected, i));
            };
            let value = self.dictionary.get(index).ok_or_else(|| {
                ParquetError::dictionary(format!(
                    "index {} out of range for dictionary of {} entries",
                    index,
                    self.dictionary.len()
                ))
            })?;
            *slot = value.clone();
        }
        Ok(expected)
    }
}

/// Interns values into a caller-owned dictionary and records their indices.
#[derive(Debug)]
pub struct DictionaryEncoder<'a> {
    dictionary: &'a mut Dictionary,
    indices: Vec<u32>,
}

impl<'a> DictionaryEncoder<'a> {
    pub fn new(dictionary: &'a mut Dictionary) -> Self {
        Self {
            dictionary,
            indices: Vec::new(),
        }
    }

    pub fn encode_values(&mut self, values: &[Value]) -> Result<()> {
        for value in values {
            let index = self.dictionary.insert(value)?;
            self.indices.push(index);
        }
        Ok(())
    }

    pub fn finish(self) -> Result<Vec<u8>> {
        let bit_width = self.dictionary.index_bit_width();
        let mut encoder = HybridEncoder::new(bit_width)?;
        encoder.put_all(&self.indices)?;
        let body = encoder.finish()?;

        let mut out = Vec::with_capacity(1 + body.len());
        out.push(bit_width);
        out.extend_from_slice(&body);
        Ok(out)
    }
}

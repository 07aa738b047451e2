//! RLE encoding for BOOLEAN values: a 4-byte length prefix followed by a
//! hybrid block of bit width 1.

use bytes::Bytes;

use crate::hybrid::{HybridDecoder, HybridEncoder};
use crate::levels::{self, LEVELS_LENGTH_PREFIX};
use crate::{ParquetError, Result, Value};

#[derive(Debug, Default)]
pub struct RleBooleanDecoder {
    inner: Option<HybridDecoder>,
}

impl RleBooleanDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init(&mut self, data: Bytes) -> Result<()> {
        let (block, _) = levels::split_v1_levels(&data)?;
        self.inner = Some(HybridDecoder::new(1, block)?);
        Ok(())
    }

    pub fn decode_values(&mut self, dest: &mut [Value]) -> Result<usize> {
        let expected = dest.len();
        for (i, slot) in dest.iter_mut().enumerate() {
            let bit = match self.inner.as_mut() {
                Some(decoder) => decoder.next_value()?,
                None => None,
            };
            match bit {
                Some(bit) => *slot = Value::Boolean(bit == 1),
                None => return Err(ParquetError::truncated("rle booleans", expected, i)),
            }
        }
        Ok(expected)
    }
}

#[derive(Debug)]
pub struct RleBooleanEncoder {
    inner: HybridEncoder,
}

impl RleBooleanEncoder {
    pub fn new() -> Result<Self> {
        Ok(Self {
            inner: HybridEncoder::new(1)?,
        })
    }

    pub fn encode_values(&mut self, values: &[Value]) -> Result<()> {
        for value in values {
            match value {
                Value::Boolean(b) => self.inner.put(*b as u32)?,
                other => {
                    return Err(ParquetError::invalid_argument(format!(
                        "cannot store {} in a BOOLEAN column",
                        other.type_name()
                    )))
                }
            }
        }
        Ok(())
    }

    pub fn finish(self) -> Result<Vec<u8>> {
        let block = self.inner.finish()?;
        let mut out = Vec::with_capacity(LEVELS_LENGTH_PREFIX + block.len());
        out.extend_from_slice(&(block.len() as u32).to_le_bytes());
        out.extend_from_slice(&block);
        Ok(out)
    }
}

//! Definition and repetition level codecs
//!
//! Levels are hybrid-encoded at the bit width of the column's max level. A
//! column whose max level is 0 stores no level data at all: the decoder hands
//! out zeros without touching its input.

use bytes::Bytes;
use parquet::basic::Encoding;

use crate::bits;
use crate::hybrid::{HybridDecoder, HybridEncoder};
use crate::{ParquetError, Result};

/// Size of the little-endian length prefix in front of V1 level blocks.
pub const LEVELS_LENGTH_PREFIX: usize = 4;

fn level_bit_width(max_level: i16) -> Result<u8> {
    if max_level < 0 {
        return Err(ParquetError::invalid_argument(format!(
            "negative max level {}",
            max_level
        )));
    }
    Ok(bits::bit_width(max_level as u32))
}

/// Encodes one level at a time into a hybrid block.
#[derive(Debug)]
pub struct LevelEncoder {
    max_level: i16,
    inner: HybridEncoder,
}

impl LevelEncoder {
    pub fn new(max_level: i16) -> Result<Self> {
        let inner = HybridEncoder::new(level_bit_width(max_level)?)?;
        Ok(Self { max_level, inner })
    }

    pub fn max_level(&self) -> i16 {
        self.max_level
    }

    pub fn emit(&mut self, level: i16) -> Result<()> {
        if level < 0 || level > self.max_level {
            return Err(ParquetError::level_overflow(level, self.max_level));
        }
        self.inner.put(level as u32)
    }

    pub fn finish(self) -> Result<Vec<u8>> {
        self.inner.finish()
    }
}

/// Encodes `levels` as a bare hybrid block, the layout used by V2 pages.
pub fn encode_levels(levels: &[i16], max_level: i16) -> Result<Vec<u8>> {
    let mut encoder = LevelEncoder::new(max_level)?;
    for &level in levels {
        encoder.emit(level)?;
    }
    encoder.finish()
}

/// Encodes `levels` behind a 4-byte length prefix, the layout used by V1 pages.
pub fn encode_levels_v1(levels: &[i16], max_level: i16) -> Result<Vec<u8>> {
    let block = encode_levels(levels, max_level)?;
    let len = u32::try_from(block.len()).map_err(|_| {
        ParquetError::invalid_argument(format!("level block of {} bytes", block.len()))
    })?;
    let mut out = Vec::with_capacity(LEVELS_LENGTH_PREFIX + block.len());
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&block);
    Ok(out)
}

/// Splits one length-prefixed V1 level block off the front of `data`.
///
/// Returns the block and the number of bytes consumed, prefix included.
pub fn split_v1_levels(data: &Bytes) -> Result<(Bytes, usize)> {
    if data.len() < LEVELS_LENGTH_PREFIX {
        return Err(ParquetError::truncated(
            "level block length prefix",
            LEVELS_LENGTH_PREFIX,
            data.len(),
        ));
    }
    let len = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
    let end = LEVELS_LENGTH_PREFIX + len;
    if end > data.len() {
        return Err(ParquetError::truncated(
            "level block",
            len,
            data.len() - LEVELS_LENGTH_PREFIX,
        ));
    }
    Ok((data.slice(LEVELS_LENGTH_PREFIX..end), end))
}

/// Decodes levels one at a time from a hybrid block.
#[derive(Debug)]
pub struct LevelDecoder {
    max_level: i16,
    inner: Option<HybridDecoder>,
}

impl LevelDecoder {
    /// Creates a decoder for `encoding`; only the hybrid RLE encoding is
    /// accepted for levels.
    pub fn for_encoding(encoding: Encoding, max_level: i16) -> Result<Self> {
        match encoding {
            Encoding::RLE => Self::new(max_level),
            other => Err(ParquetError::unsupported_encoding(other, "levels")),
        }
    }

    pub fn new(max_level: i16) -> Result<Self> {
        level_bit_width(max_level)?;
        Ok(Self {
            max_level,
            inner: None,
        })
    }

    pub fn max_level(&self) -> i16 {
        self.max_level
    }

    /// Binds the decoder to a bare hybrid block.
    pub fn init(&mut self, data: Bytes) -> Result<()> {
        if self.max_level == 0 {
            return Ok(());
        }
        let bit_width = level_bit_width(self.max_level)?;
        self.inner = Some(HybridDecoder::new(bit_width, data)?);
        Ok(())
    }

    pub fn next_level(&mut self) -> Result<i16> {
        if self.max_level == 0 {
            return Ok(0);
        }
        let value = match self.inner.as_mut() {
            Some(decoder) => decoder.next_value()?,
            None => None,
        };
        match value {
            Some(level) if level <= self.max_level as u32 => Ok(level as i16),
            Some(level) => Err(ParquetError::level_overflow(level, self.max_level)),
            None => Err(ParquetError::truncated("level data exhausted", 1, 0)),
        }
    }

    /// Fills `out` with the next `out.len()` levels.
    pub fn decode(&mut self, out: &mut [i16]) -> Result<()> {
        if self.max_level == 0 {
            out.fill(0);
            return Ok(());
        }
        let expected = out.len();
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.next_level().map_err(|e| match e {
                ParquetError::TruncatedInput { context, .. } => {
                    ParquetError::truncated(context, expected, i)
                }
                other => other,
            })?;
        }
        Ok(())
    }
}

//! RLE / bit-packing hybrid encoding
//!
//! The grammar, from the format's encoding documentation:
//!
//! ```text
//! encoded-data   := <run>*
//! run            := <bit-packed-run> | <rle-run>
//! bit-packed-run := varint(<group-count> << 1 | 1) <values packed at bit-width, LSB first>
//! rle-run        := varint(<repeat-count> << 1)    <value in ceil(bit-width / 8) bytes>
//! ```
//!
//! A bit-packed run always covers a whole number of groups of 8 values; the
//! encoder pads the final group with zeros and the decoder only hands out as
//! many values as the caller asks for.

use bytes::Bytes;
use log::trace;

use crate::bits::{self, MAX_BIT_WIDTH};
use crate::{ParquetError, Result};

/// Largest number of 8-value groups in one bit-packed run, so the run header
/// always fits in a single varint byte.
const MAX_GROUPS_PER_BIT_PACKED_RUN: usize = 63;

/// Appends an RLE run of `value` repeated `count` times.
pub fn encode_rle_run(value: u32, count: usize, bit_width: u8, out: &mut Vec<u8>) -> Result<()> {
    if count == 0 {
        return Err(ParquetError::invalid_argument("RLE run must not be empty"));
    }
    bits::write_uleb128((count as u64) << 1, out);
    bits::encode_rle_value(value, bits::byte_width(bit_width), out)
}

/// Appends one bit-packed run holding `values`.
///
/// `values` must be a non-empty multiple of 8; callers pad the last group.
pub fn encode_bit_packed_run(values: &[u32], bit_width: u8, out: &mut Vec<u8>) -> Result<()> {
    if values.is_empty() || values.len() % 8 != 0 {
        return Err(ParquetError::invalid_argument(format!(
            "bit-packed run needs a positive multiple of 8 values, got {}",
            values.len()
        )));
    }
    let groups = values.len() / 8;
    bits::write_uleb128(((groups as u64) << 1) | 1, out);
    bits::pack_bits(values, bit_width, out);
    Ok(())
}

fn check_bit_width(bit_width: u8) -> Result<()> {
    if bit_width > MAX_BIT_WIDTH {
        return Err(ParquetError::invalid_argument(format!(
            "bit width {} exceeds {}",
            bit_width, MAX_BIT_WIDTH
        )));
    }
    Ok(())
}

/// Streaming hybrid encoder.
///
/// Values are buffered 8 at a time. Once 8 equal values are seen in a row the
/// encoder switches to an RLE run; anything else is collected into bit-packed
/// groups.
#[derive(Debug)]
pub struct HybridEncoder {
    bit_width: u8,
    out: Vec<u8>,

    // The group of up to 8 values not yet assigned to a run
    buffered: [u32; 8],
    num_buffered: usize,

    // Value currently being repeated and how many times in a row it was seen
    current_value: u32,
    repeat_count: usize,

    // Whole groups waiting to be written as one bit-packed run
    literals: Vec<u32>,
}

impl HybridEncoder {
    pub fn new(bit_width: u8) -> Result<Self> {
        check_bit_width(bit_width)?;
        Ok(Self {
            bit_width,
            out: Vec::new(),
            buffered: [0; 8],
            num_buffered: 0,
            current_value: 0,
            repeat_count: 0,
            literals: Vec::new(),
        })
    }

    pub fn bit_width(&self) -> u8 {
        self.bit_width
    }

    /// Encodes `value`, which must fit in the encoder's bit width.
    pub fn put(&mut self, value: u32) -> Result<()> {
        if self.bit_width < 32 && value >> self.bit_width != 0 {
            return Err(ParquetError::invalid_argument(format!(
                "value {} does not fit in {} bits",
                value, self.bit_width
            )));
        }

        if self.repeat_count > 0 && self.current_value == value {
            self.repeat_count += 1;
            if self.repeat_count > 8 {
                // Continuation of an RLE run, nothing to buffer
                return Ok(());
            }
        } else {
            if self.repeat_count >= 8 {
                self.flush_rle_run()?;
            }
            self.repeat_count = 1;
            self.current_value = value;
        }

        self.buffered[self.num_buffered] = value;
        self.num_buffered += 1;
        if self.num_buffered == 8 {
            self.flush_buffered()?;
        }
        Ok(())
    }

    pub fn put_all(&mut self, values: &[u32]) -> Result<()> {
        values.iter().try_for_each(|&v| self.put(v))
    }

    /// Flushes every pending run and returns the encoded bytes.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        if !self.literals.is_empty() || self.repeat_count > 0 || self.num_buffered > 0 {
            let all_repeat = self.literals.is_empty()
                && (self.repeat_count == self.num_buffered || self.num_buffered == 0);
            if self.repeat_count > 0 && all_repeat {
                self.flush_rle_run()?;
            } else {
                if self.num_buffered > 0 {
                    self.buffered[self.num_buffered..].fill(0);
                    self.literals.extend_from_slice(&self.buffered);
                    self.num_buffered = 0;
                }
                self.flush_bit_packed_run()?;
            }
        }
        Ok(self.out)
    }

    fn flush_buffered(&mut self) -> Result<()> {
        if self.repeat_count >= 8 {
            // The whole group repeats current_value; it becomes the head of an RLE run
            self.num_buffered = 0;
            if !self.literals.is_empty() {
                self.flush_bit_packed_run()?;
            }
            return Ok(());
        }

        self.literals.extend_from_slice(&self.buffered);
        self.num_buffered = 0;
        self.repeat_count = 0;
        if self.literals.len() / 8 >= MAX_GROUPS_PER_BIT_PACKED_RUN {
            self.flush_bit_packed_run()?;
        }
        Ok(())
    }

    fn flush_rle_run(&mut self) -> Result<()> {
        encode_rle_run(
            self.current_value,
            self.repeat_count,
            self.bit_width,
            &mut self.out,
        )?;
        self.num_buffered = 0;
        self.repeat_count = 0;
        Ok(())
    }

    fn flush_bit_packed_run(&mut self) -> Result<()> {
        encode_bit_packed_run(&self.literals, self.bit_width, &mut self.out)?;
        self.literals.clear();
        Ok(())
    }
}

/// Encodes `values` as one hybrid block.
pub fn encode(values: &[u32], bit_width: u8) -> Result<Vec<u8>> {
    let mut encoder = HybridEncoder::new(bit_width)?;
    encoder.put_all(values)?;
    encoder.finish()
}

/// Pull-style hybrid decoder over an in-memory block.
#[derive(Debug)]
pub struct HybridDecoder {
    bit_width: u8,
    data: Bytes,
    pos: usize,

    // Remaining repeats of rle_value in the current RLE run
    rle_left: usize,
    rle_value: u32,

    // Unpacked values of the current bit-packed run
    unpacked: Vec<u32>,
    unpacked_pos: usize,
}

impl HybridDecoder {
    pub fn new(bit_width: u8, data: Bytes) -> Result<Self> {
        check_bit_width(bit_width)?;
        Ok(Self {
            bit_width,
            data,
            pos: 0,
            rle_left: 0,
            rle_value: 0,
            unpacked: Vec::new(),
            unpacked_pos: 0,
        })
    }

    pub fn bit_width(&self) -> u8 {
        self.bit_width
    }

    /// Number of bytes of the block consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns the next value, or `None` once the block is exhausted.
    pub fn next_value(&mut self) -> Result<Option<u32>> {
        loop {
            if self.rle_left > 0 {
                self.rle_left -= 1;
                return Ok(Some(self.rle_value));
            }
            if self.unpacked_pos < self.unpacked.len() {
                let value = self.unpacked[self.unpacked_pos];
                self.unpacked_pos += 1;
                return Ok(Some(value));
            }
            if !self.load_run()? {
                return Ok(None);
            }
        }
    }

    /// Fills `out` completely or fails with [`ParquetError::TruncatedInput`].
    pub fn decode(&mut self, out: &mut [u32]) -> Result<()> {
        for (i, slot) in out.iter_mut().enumerate() {
            match self.next_value()? {
                Some(value) => *slot = value,
                None => {
                    return Err(ParquetError::truncated(
                        "hybrid block exhausted",
                        out.len(),
                        i,
                    ))
                }
            }
        }
        Ok(())
    }

    fn load_run(&mut self) -> Result<bool> {
        let Some(header) = bits::read_uleb128(&self.data, &mut self.pos)? else {
            return Ok(false);
        };

        if header & 1 == 1 {
            let groups = (header >> 1) as usize;
            if groups == 0 {
                return Err(ParquetError::malformed_run(
                    "bit-packed run header declares zero groups",
                ));
            }
            let count = groups.checked_mul(8).ok_or_else(|| {
                ParquetError::malformed_run(format!("bit-packed run of {} groups", groups))
            })?;
            if self.bit_width == 0 {
                // Zero-width values occupy no bytes
                self.rle_left = count;
                self.rle_value = 0;
                return Ok(true);
            }

            let needed = groups.saturating_mul(self.bit_width as usize);
            let start = self.pos;
            let end = start.saturating_add(needed).min(self.data.len());

            // Some writers truncate the final run; keep whatever whole values are present
            self.unpacked.clear();
            self.unpacked_pos = 0;
            let unpacked = bits::unpack_bits(
                &self.data[start..end],
                self.bit_width,
                count,
                &mut self.unpacked,
            );
            self.pos = end;
            trace!(
                "bit-packed run: {} groups, {} values available, width {}",
                groups,
                unpacked,
                self.bit_width
            );
            if unpacked == 0 {
                return Err(ParquetError::truncated("bit-packed run", needed, end - start));
            }
        } else {
            let count = (header >> 1) as usize;
            if count == 0 {
                return Err(ParquetError::malformed_run("RLE run header declares zero values"));
            }
            let width = bits::byte_width(self.bit_width);
            let end = self.pos + width;
            if end > self.data.len() {
                return Err(ParquetError::truncated(
                    "RLE run value",
                    width,
                    self.data.len() - self.pos,
                ));
            }
            let value = bits::decode_rle_value(&self.data[self.pos..end])?;
            if self.bit_width < 32 && value >> self.bit_width != 0 {
                return Err(ParquetError::level_overflow(
                    value,
                    (1u64 << self.bit_width) as i64 - 1,
                ));
            }
            self.pos = end;
            self.rle_left = count;
            self.rle_value = value;
            trace!("rle run: {} x {}", count, value);
        }
        Ok(true)
    }
}

/// Decodes exactly `count` values from a hybrid block.
pub fn decode(data: Bytes, bit_width: u8, count: usize) -> Result<Vec<u32>> {
    let mut decoder = HybridDecoder::new(bit_width, data)?;
    let mut out = vec![0; count];
    decoder.decode(&mut out)?;
    Ok(out)
}

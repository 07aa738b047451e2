//! Bit and byte primitives shared by the hybrid codec and the page framing
//!
//! Everything here is a pure transform over explicit buffers, except
//! [`write_full`] and [`read_full`] which wrap a sink or source and turn
//! partial transfers into typed errors.

use std::io::{ErrorKind, Read, Write};

use crate::{ParquetError, Result};

/// Largest bit width the hybrid codec accepts.
pub const MAX_BIT_WIDTH: u8 = 32;

/// Number of bits needed to represent `max_value`. Zero for zero.
#[inline]
pub fn bit_width(max_value: u32) -> u8 {
    (32 - max_value.leading_zeros()) as u8
}

/// Number of bytes used by an RLE run value of `bit_width` bits.
#[inline]
pub fn byte_width(bit_width: u8) -> usize {
    (bit_width as usize).div_ceil(8)
}

/// Decodes a little-endian integer stored in a 0–4 byte window.
pub fn decode_rle_value(bytes: &[u8]) -> Result<u32> {
    match bytes.len() {
        0 => Ok(0),
        1 => Ok(bytes[0] as u32),
        2 => Ok(u16::from_le_bytes([bytes[0], bytes[1]]) as u32),
        3 => Ok(bytes[0] as u32 | (bytes[1] as u32) << 8 | (bytes[2] as u32) << 16),
        4 => Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
        n => Err(ParquetError::invalid_argument(format!(
            "fixed-width value window must be at most 4 bytes, got {}",
            n
        ))),
    }
}

/// Appends `value` as a little-endian integer of exactly `width` bytes.
pub fn encode_rle_value(value: u32, width: usize, out: &mut Vec<u8>) -> Result<()> {
    if width > 4 {
        return Err(ParquetError::invalid_argument(format!(
            "fixed-width value window must be at most 4 bytes, got {}",
            width
        )));
    }
    if width < 4 && value >> (width * 8) != 0 {
        return Err(ParquetError::invalid_argument(format!(
            "value {} does not fit in {} bytes",
            value, width
        )));
    }
    out.extend_from_slice(&value.to_le_bytes()[..width]);
    Ok(())
}

/// Appends `value` as an unsigned LEB128 varint.
pub fn write_uleb128(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Reads an unsigned LEB128 varint from `data[*pos..]`, advancing `pos`.
///
/// Returns `Ok(None)` when `pos` is already at the end of `data`.
pub fn read_uleb128(data: &[u8], pos: &mut usize) -> Result<Option<u64>> {
    if *pos >= data.len() {
        return Ok(None);
    }

    let mut result = 0u64;
    let mut shift = 0u32;
    loop {
        let Some(&byte) = data.get(*pos) else {
            return Err(ParquetError::malformed_run("varint ends past the buffer"));
        };
        *pos += 1;
        if shift >= 64 || (shift == 63 && byte > 1) {
            return Err(ParquetError::malformed_run("varint overflows 64 bits"));
        }
        result |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(Some(result));
        }
        shift += 7;
    }
}

/// Packs `values` at `bit_width` bits each, least significant bit first.
///
/// The output is padded with zero bits up to the next byte boundary.
pub fn pack_bits(values: &[u32], bit_width: u8, out: &mut Vec<u8>) {
    if bit_width == 0 {
        return;
    }

    let mut acc = 0u64;
    let mut acc_bits = 0u32;
    for &value in values {
        let masked = if bit_width == 32 {
            value as u64
        } else {
            (value & ((1u32 << bit_width) - 1)) as u64
        };
        acc |= masked << acc_bits;
        acc_bits += bit_width as u32;
        while acc_bits >= 8 {
            out.push(acc as u8);
            acc >>= 8;
            acc_bits -= 8;
        }
    }
    if acc_bits > 0 {
        out.push(acc as u8);
    }
}

/// Unpacks up to `count` values of `bit_width` bits from `data`.
///
/// Stops early if `data` runs out of whole values; the caller compares the
/// returned count against what it needed.
pub fn unpack_bits(data: &[u8], bit_width: u8, count: usize, out: &mut Vec<u32>) -> usize {
    if bit_width == 0 {
        out.extend(std::iter::repeat(0).take(count));
        return count;
    }

    let available = data.len() * 8 / bit_width as usize;
    let count = count.min(available);
    let mask = if bit_width == 32 {
        u32::MAX as u64
    } else {
        (1u64 << bit_width) - 1
    };

    let mut bit_pos = 0usize;
    for _ in 0..count {
        let byte_idx = bit_pos / 8;
        let shift = bit_pos % 8;
        // A 32-bit value shifted by up to 7 bits spans at most 5 bytes
        let mut window = 0u64;
        for (i, &byte) in data[byte_idx..].iter().take(5).enumerate() {
            window |= (byte as u64) << (i * 8);
        }
        out.push(((window >> shift) & mask) as u32);
        bit_pos += bit_width as usize;
    }
    count
}

/// Writes all of `buf` to `sink`, failing with [`ParquetError::ShortWrite`]
/// when the sink stops accepting bytes.
pub fn write_full<W: Write + ?Sized>(sink: &mut W, buf: &[u8]) -> Result<()> {
    let mut written = 0;
    while written < buf.len() {
        match sink.write(&buf[written..]) {
            Ok(0) => {
                return Err(ParquetError::ShortWrite {
                    expected: buf.len(),
                    written,
                })
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Reads exactly `len` bytes from `source`, failing with
/// [`ParquetError::TruncatedInput`] when the source ends first.
pub fn read_full<R: Read + ?Sized>(source: &mut R, len: usize, context: &str) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    let mut filled = 0;
    while filled < len {
        match source.read(&mut buf[filled..]) {
            Ok(0) => return Err(ParquetError::truncated(context, len, filled)),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_width() {
        assert_eq!(bit_width(0), 0);
        assert_eq!(bit_width(1), 1);
        assert_eq!(bit_width(2), 2);
        assert_eq!(bit_width(3), 2);
        assert_eq!(bit_width(7), 3);
        assert_eq!(bit_width(8), 4);
        assert_eq!(bit_width(u32::MAX), 32);
    }

    #[test]
    fn test_rle_value_windows() {
        for width in 0..=4 {
            let value = if width == 0 {
                0
            } else {
                (u64::MAX >> (64 - width * 8)) as u32
            };
            let mut out = Vec::new();
            encode_rle_value(value, width, &mut out).unwrap();
            assert_eq!(out.len(), width);
            assert_eq!(decode_rle_value(&out).unwrap(), value);
        }

        let mut out = Vec::new();
        encode_rle_value(0x0001_0203, 3, &mut out).unwrap();
        assert_eq!(out, vec![0x03, 0x02, 0x01]);
    }

    #[test]
    fn test_rle_value_rejects_bad_width() {
        assert!(decode_rle_value(&[0; 5]).is_err());

        let mut out = Vec::new();
        assert!(encode_rle_value(256, 1, &mut out).is_err());
        assert!(encode_rle_value(1, 5, &mut out).is_err());
    }

    #[test]
    fn test_uleb128() {
        let mut out = Vec::new();
        write_uleb128(3, &mut out);
        write_uleb128(300, &mut out);
        write_uleb128(u32::MAX as u64, &mut out);
        assert_eq!(&out[..3], &[0x03, 0xac, 0x02]);

        let mut pos = 0;
        assert_eq!(read_uleb128(&out, &mut pos).unwrap(), Some(3));
        assert_eq!(read_uleb128(&out, &mut pos).unwrap(), Some(300));
        assert_eq!(read_uleb128(&out, &mut pos).unwrap(), Some(u32::MAX as u64));
        assert_eq!(read_uleb128(&out, &mut pos).unwrap(), None);
    }

    #[test]
    fn test_uleb128_truncated() {
        let mut pos = 0;
        let err = read_uleb128(&[0x80, 0x80], &mut pos).unwrap_err();
        assert!(matches!(err, ParquetError::MalformedRun(_)));
    }

    #[test]
    fn test_pack_bits_lsb_first() {
        let mut out = Vec::new();
        pack_bits(&[1, 1, 1, 1, 1, 1, 1, 1], 1, &mut out);
        assert_eq!(out, vec![0xff]);

        // 0..8 at 3 bits: the canonical example from the format documentation
        let mut out = Vec::new();
        pack_bits(&[0, 1, 2, 3, 4, 5, 6, 7], 3, &mut out);
        assert_eq!(out, vec![0b1000_1000, 0b1100_0110, 0b1111_1010]);

        let mut values = Vec::new();
        assert_eq!(unpack_bits(&out, 3, 8, &mut values), 8);
        assert_eq!(values, vec![0, 1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_unpack_bits_wide_and_short() {
        let input = vec![u32::MAX, 0, 0x8000_0001, 12345];
        let mut packed = Vec::new();
        pack_bits(&input, 32, &mut packed);
        assert_eq!(packed.len(), 16);

        let mut values = Vec::new();
        assert_eq!(unpack_bits(&packed, 32, 4, &mut values), 4);
        assert_eq!(values, input);

        // Only two whole 5-bit values fit in 10 bits
        let mut values = Vec::new();
        assert_eq!(unpack_bits(&[0xff, 0x03], 5, 8, &mut values), 3);
        assert_eq!(values, vec![31, 31, 0]);
    }

    struct ClosedSink {
        accept: usize,
    }

    impl Write for ClosedSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let n = buf.len().min(self.accept);
            self.accept -= n;
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_full() {
        let mut sink = Vec::new();
        write_full(&mut sink, b"abc").unwrap();
        assert_eq!(sink, b"abc");

        let mut sink = ClosedSink { accept: 2 };
        let err = write_full(&mut sink, b"abcd").unwrap_err();
        assert!(matches!(
            err,
            ParquetError::ShortWrite {
                expected: 4,
                written: 2
            }
        ));
    }

    #[test]
    fn test_read_full() {
        let mut source: &[u8] = b"abcdef";
        assert_eq!(read_full(&mut source, 4, "page").unwrap(), b"abcd");

        let err = read_full(&mut source, 4, "page").unwrap_err();
        assert!(matches!(
            err,
            ParquetError::TruncatedInput {
                expected: 4,
                actual: 2,
                ..
            }
        ));
    }
}

//! Compression boundary
//!
//! Codecs come from `parquet::compression`; this module only adds the
//! passthrough for UNCOMPRESSED and the declared-size check on the way back.

use log::trace;
use parquet::basic::Compression;
use parquet::compression::{create_codec, Codec, CodecOptionsBuilder};

use crate::{ParquetError, Result};

fn codec_for(compression: Compression) -> Result<Option<Box<dyn Codec>>> {
    let options = CodecOptionsBuilder::default().build();
    create_codec(compression, &options).map_err(|e| {
        ParquetError::compression(format!("cannot create {:?} codec: {}", compression, e))
    })
}

/// Compresses `data` with `compression`.
pub fn compress_block(data: &[u8], compression: Compression) -> Result<Vec<u8>> {
    let Some(mut codec) = codec_for(compression)? else {
        return Ok(data.to_vec());
    };

    let mut out = Vec::new();
    codec
        .compress(data, &mut out)
        .map_err(|e| ParquetError::compression(format!("{:?} compress: {}", compression, e)))?;
    trace!(
        "compressed {} bytes to {} with {:?}",
        data.len(),
        out.len(),
        compression
    );
    Ok(out)
}

/// Decompresses `data`, which must expand to exactly `uncompressed_size`
/// bytes.
pub fn decompress_block(
    data: &[u8],
    compression: Compression,
    uncompressed_size: usize,
) -> Result<Vec<u8>> {
    let (out, written) = match codec_for(compression)? {
        None => (data.to_vec(), data.len()),
        Some(mut codec) => {
            let mut out = Vec::with_capacity(uncompressed_size);
            let written = codec
                .decompress(data, &mut out, Some(uncompressed_size))
                .map_err(|e| {
                    ParquetError::compression(format!("{:?} decompress: {}", compression, e))
                })?;
            (out, written)
        }
    };

    // Some codecs size the output from the hint, so trust the reported count
    if written != uncompressed_size || out.len() != uncompressed_size {
        return Err(ParquetError::compression(format!(
            "{:?} block expanded to {} bytes, header declares {}",
            compression, written, uncompressed_size
        )));
    }
    Ok(out)
}

//! Page header protocol binding
//!
//! Headers are the `parquet::format` structs moved over the thrift compact
//! protocol, so they are byte-compatible with any Parquet implementation.

use std::io::{Read, Write};

use parquet::basic::Encoding;
use parquet::format::{self, PageHeader, PageType};
use parquet::thrift::TSerializable;
use thrift::protocol::{TCompactInputProtocol, TCompactOutputProtocol, TOutputProtocol};

use crate::bits;
use crate::{ParquetError, Result};

/// Reads one compact-protocol page header from the front of `source`.
pub fn read_page_header<R: Read + ?Sized>(source: &mut R) -> Result<PageHeader> {
    let mut prot = TCompactInputProtocol::new(source);
    Ok(PageHeader::read_from_in_protocol(&mut prot)?)
}

/// Writes `header` to `sink`, returning the number of bytes written.
pub fn write_page_header<W: Write + ?Sized>(header: &PageHeader, sink: &mut W) -> Result<usize> {
    let mut buf = Vec::new();
    {
        let mut prot = TCompactOutputProtocol::new(&mut buf);
        header.write_to_out_protocol(&mut prot)?;
        prot.flush()?;
    }
    bits::write_full(sink, &buf)?;
    Ok(buf.len())
}

/// Short name of a page type for messages.
pub fn page_type_name(page_type: PageType) -> &'static str {
    match page_type {
        PageType::DATA_PAGE => "DATA_PAGE",
        PageType::INDEX_PAGE => "INDEX_PAGE",
        PageType::DICTIONARY_PAGE => "DICTIONARY_PAGE",
        PageType::DATA_PAGE_V2 => "DATA_PAGE_V2",
        _ => "UNKNOWN",
    }
}

/// Maps an encoding id from a header onto [`Encoding`].
///
/// Ids the format does not define are a malformed header rather than an
/// unsupported encoding.
#[allow(deprecated)]
pub fn encoding_from_thrift(encoding: format::Encoding) -> Result<Encoding> {
    Ok(match encoding {
        format::Encoding::PLAIN => Encoding::PLAIN,
        format::Encoding::PLAIN_DICTIONARY => Encoding::PLAIN_DICTIONARY,
        format::Encoding::RLE => Encoding::RLE,
        format::Encoding::BIT_PACKED => Encoding::BIT_PACKED,
        format::Encoding::DELTA_BINARY_PACKED => Encoding::DELTA_BINARY_PACKED,
        format::Encoding::DELTA_LENGTH_BYTE_ARRAY => Encoding::DELTA_LENGTH_BYTE_ARRAY,
        format::Encoding::DELTA_BYTE_ARRAY => Encoding::DELTA_BYTE_ARRAY,
        format::Encoding::RLE_DICTIONARY => Encoding::RLE_DICTIONARY,
        format::Encoding::BYTE_STREAM_SPLIT => Encoding::BYTE_STREAM_SPLIT,
        other => {
            return Err(ParquetError::malformed_header(format!(
                "unknown encoding id {}",
                other.0
            )))
        }
    })
}

#[allow(deprecated)]
pub fn encoding_to_thrift(encoding: Encoding) -> format::Encoding {
    match encoding {
        Encoding::PLAIN => format::Encoding::PLAIN,
        Encoding::PLAIN_DICTIONARY => format::Encoding::PLAIN_DICTIONARY,
        Encoding::RLE => format::Encoding::RLE,
        Encoding::BIT_PACKED => format::Encoding::BIT_PACKED,
        Encoding::DELTA_BINARY_PACKED => format::Encoding::DELTA_BINARY_PACKED,
        Encoding::DELTA_LENGTH_BYTE_ARRAY => format::Encoding::DELTA_LENGTH_BYTE_ARRAY,
        Encoding::DELTA_BYTE_ARRAY => format::Encoding::DELTA_BYTE_ARRAY,
        Encoding::RLE_DICTIONARY => format::Encoding::RLE_DICTIONARY,
        Encoding::BYTE_STREAM_SPLIT => format::Encoding::BYTE_STREAM_SPLIT,
    }
}

/// Converts a declared size or count to `usize`, rejecting negatives.
pub(crate) fn non_negative(value: i32, field: &str) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| ParquetError::malformed_header(format!("negative {}: {}", field, value)))
}

//! Value codec registry
//!
//! The set of value encodings is fixed by the format, so decoders and
//! encoders are closed enums selected by encoding id and physical type.
//! Anything outside the supported set fails with
//! [`ParquetError::UnsupportedEncoding`].

mod dictionary;
mod plain;
mod rle;

use std::sync::Arc;

use bytes::Bytes;
use parquet::basic::Encoding;

pub use dictionary::{Dictionary, DictionaryDecoder, DictionaryEncoder};
pub use plain::{PlainDecoder, PlainEncoder};
pub use rle::{RleBooleanDecoder, RleBooleanEncoder};

use crate::schema::PhysicalType;
use crate::{ParquetError, Result, Value};

/// A value decoder bound to one page's value bytes
#[derive(Debug)]
pub enum ValuesDecoder {
    Plain(PlainDecoder),
    Dictionary(DictionaryDecoder),
    RleBoolean(RleBooleanDecoder),
}

impl ValuesDecoder {
    /// Binds the decoder to the page's value section.
    pub fn init(&mut self, data: Bytes) -> Result<()> {
        match self {
            ValuesDecoder::Plain(d) => {
                d.init(data);
                Ok(())
            }
            ValuesDecoder::Dictionary(d) => d.init(data),
            ValuesDecoder::RleBoolean(d) => d.init(data),
        }
    }

    /// Fills every slot of `dest`, returning the number of values produced.
    ///
    /// Callers size `dest` to the number of non-null values, not the page's
    /// total value count.
    pub fn decode_values(&mut self, dest: &mut [Value]) -> Result<usize> {
        match self {
            ValuesDecoder::Plain(d) => d.decode_values(dest),
            ValuesDecoder::Dictionary(d) => d.decode_values(dest),
            ValuesDecoder::RleBoolean(d) => d.decode_values(dest),
        }
    }
}

/// Creates value decoders for one column, keyed by the page's encoding id
#[derive(Debug, Clone)]
pub struct ValuesDecoderFactory {
    physical_type: PhysicalType,
    dictionary: Option<Arc<Dictionary>>,
}

impl ValuesDecoderFactory {
    pub fn new(physical_type: PhysicalType) -> Self {
        Self {
            physical_type,
            dictionary: None,
        }
    }

    /// Supplies the column chunk's dictionary for dictionary-encoded pages.
    pub fn with_dictionary(mut self, dictionary: Arc<Dictionary>) -> Self {
        self.dictionary = Some(dictionary);
        self
    }

    pub fn physical_type(&self) -> PhysicalType {
        self.physical_type
    }

    pub fn decoder(&self, encoding: Encoding) -> Result<ValuesDecoder> {
        get_values_decoder(encoding, self.physical_type, self.dictionary.clone())
    }
}

/// Selects the value decoder for `encoding` and `physical_type`.
pub fn get_values_decoder(
    encoding: Encoding,
    physical_type: PhysicalType,
    dictionary: Option<Arc<Dictionary>>,
) -> Result<ValuesDecoder> {
    match encoding {
        Encoding::PLAIN => Ok(ValuesDecoder::Plain(PlainDecoder::new(physical_type))),
        Encoding::PLAIN_DICTIONARY | Encoding::RLE_DICTIONARY => {
            let dictionary = dictionary.ok_or_else(|| {
                ParquetError::dictionary(format!(
                    "{:?} page without a dictionary for {} column",
                    encoding, physical_type
                ))
            })?;
            if dictionary.physical_type() != physical_type {
                return Err(ParquetError::dictionary(format!(
                    "dictionary holds {} values but the column is {}",
                    dictionary.physical_type(),
                    physical_type
                )));
            }
            Ok(ValuesDecoder::Dictionary(DictionaryDecoder::new(dictionary)))
        }
        Encoding::RLE if physical_type == PhysicalType::Boolean => {
            Ok(ValuesDecoder::RleBoolean(RleBooleanDecoder::new()))
        }
        other => Err(ParquetError::unsupported_encoding(
            other,
            physical_type.to_string(),
        )),
    }
}

/// A value encoder producing one page's value bytes
#[derive(Debug)]
pub enum ValuesEncoder<'a> {
    Plain(PlainEncoder),
    Dictionary(DictionaryEncoder<'a>),
    RleBoolean(RleBooleanEncoder),
}

impl ValuesEncoder<'_> {
    pub fn encode_values(&mut self, values: &[Value]) -> Result<()> {
        match self {
            ValuesEncoder::Plain(e) => e.encode_values(values),
            ValuesEncoder::Dictionary(e) => e.encode_values(values),
            ValuesEncoder::RleBoolean(e) => e.encode_values(values),
        }
    }

    pub fn finish(self) -> Result<Vec<u8>> {
        match self {
            ValuesEncoder::Plain(e) => Ok(e.finish()),
            ValuesEncoder::Dictionary(e) => e.finish(),
            ValuesEncoder::RleBoolean(e) => e.finish(),
        }
    }
}

/// Selects the value encoder for `encoding` and `physical_type`.
///
/// Dictionary encodings intern values into `dictionary`, which the caller
/// later writes out as the column chunk's dictionary page.
pub fn get_values_encoder(
    encoding: Encoding,
    physical_type: PhysicalType,
    dictionary: Option<&mut Dictionary>,
) -> Result<ValuesEncoder<'_>> {
    match encoding {
        Encoding::PLAIN => Ok(ValuesEncoder::Plain(PlainEncoder::new(physical_type))),
        Encoding::PLAIN_DICTIONARY | Encoding::RLE_DICTIONARY => {
            let dictionary = dictionary.ok_or_else(|| {
                ParquetError::dictionary(format!(
                    "{:?} output requested without a dictionary for {} column",
                    encoding, physical_type
                ))
            })?;
            if dictionary.physical_type() != physical_type {
                return Err(ParquetError::dictionary(format!(
                    "dictionary holds {} values but the column is {}",
                    dictionary.physical_type(),
                    physical_type
                )));
            }
            Ok(ValuesEncoder::Dictionary(DictionaryEncoder::new(dictionary)))
        }
        Encoding::RLE if physical_type == PhysicalType::Boolean => {
            Ok(ValuesEncoder::RleBoolean(RleBooleanEncoder::new()?))
        }
        other => Err(ParquetError::unsupported_encoding(
            other,
            physical_type.to_string(),
        )),
    }
}

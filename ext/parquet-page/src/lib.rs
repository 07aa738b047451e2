//! Data page codec for the Parquet columnar format
//!
//! `parquet-page` reads and writes individual column data pages, both the
//! V1 layout (levels and values compressed together) and the V2 layout
//! (raw levels, compressed values). File footers, row groups and schema
//! trees are left to the caller; page headers and compression codecs come
//! from the `parquet` crate.
//!
//! # Key Components
//!
//! - **Levels**: definition and repetition levels
//!   - Hybrid RLE/bit-packed codec in [`hybrid`], level wrappers in [`levels`]
//!   - Columns with a max level of 0 store no level bytes at all
//!
//! - **Values**: closed registry of value codecs in [`encoding`]
//!   - PLAIN for every physical type
//!   - PLAIN_DICTIONARY / RLE_DICTIONARY against a caller-owned [`Dictionary`]
//!   - RLE for booleans
//!
//! - **Reader**: [`DataPageReader`] frames one page and streams
//!   `(levels, values)` batches out of it, only decoding non-null values
//!
//! - **Writer**: [`WriterBuilder`] configures a [`DataPageWriter`] that
//!   emits one header plus body per call
//!
//! # Example Usage
//!
//! ```no_run
//! use parquet::basic::Compression;
//! use parquet_page::{
//!     ColumnDescriptor, DataPageReader, PageData, PhysicalType, Repetition, Value,
//!     ValuesDecoderFactory, WriterBuilder,
//! };
//!
//! # fn main() -> parquet_page::Result<()> {
//! let column = ColumnDescriptor::flat("score", PhysicalType::Int32, Repetition::Optional);
//! let writer = WriterBuilder::new().build(column.clone())?;
//!
//! let values = vec![Value::from(10), Value::from(30)];
//! let mut page = Vec::new();
//! writer.write(&mut page, PageData::new(&values).with_def_levels(&[1, 0, 1]), None)?;
//!
//! let mut reader = DataPageReader::open(
//!     &mut page.as_slice(),
//!     column,
//!     ValuesDecoderFactory::new(PhysicalType::Int32),
//!     Compression::SNAPPY,
//! )?;
//! let mut dest = vec![Value::Null; 3];
//! let batch = reader.read_values(&mut dest)?;
//! assert_eq!(batch.def_levels, Some(vec![1, 0, 1]));
//! # Ok(())
//! # }
//! ```

pub mod bits;
pub mod compression;
pub mod encoding;
pub mod error;
pub mod header;
pub mod hybrid;
pub mod levels;
pub mod reader;
pub mod schema;
pub mod value;
pub mod writer;

pub use encoding::{Dictionary, ValuesDecoder, ValuesDecoderFactory, ValuesEncoder};
pub use error::{ErrorContext, ParquetError, Result};
pub use reader::{DataPageReader, DataPageReaderV1, DataPageReaderV2, PageState, ReadBatch};
pub use schema::{ColumnDescriptor, PhysicalType, Repetition};
pub use value::{spread_nulls, Value};
pub use writer::{
    DataPageWriter, DataPageWriterV1, DataPageWriterV2, PageData, PageVersion, WriterBuilder,
    WrittenPage,
};

//! Data page readers
//!
//! A reader is built per page: bind it to the column's decoder factories
//! with `init`, frame one page with `read`, then pull values out with
//! `read_values` until it reports zero.
//!
//! The two page versions differ only in framing. V1 compresses repetition
//! levels, definition levels and values as one block, each level block
//! behind a 4-byte length prefix. V2 stores the level blocks raw after the
//! header and compresses only the values.

use std::io::Read;

use bytes::Bytes;
use log::debug;
use parquet::basic::{Compression, Encoding};
use parquet::format::{PageHeader, PageType};

use crate::compression::decompress_block;
use crate::encoding::{ValuesDecoder, ValuesDecoderFactory};
use crate::header::{self, encoding_from_thrift, non_negative, page_type_name};
use crate::levels::{split_v1_levels, LevelDecoder};
use crate::schema::ColumnDescriptor;
use crate::{bits, ErrorContext, ParquetError, Result, Value};

/// Lifecycle of a page reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Uninitialized,
    LevelDecodersBound,
    ValueDecoderBound,
    Streaming,
    Exhausted,
}

/// One batch returned by `read_values`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReadBatch {
    /// Level slots consumed, nulls included; zero once the page is exhausted
    pub count: usize,
    /// Values written to the front of the destination slice
    pub non_null: usize,
    /// `None` when the column's max definition level is 0
    pub def_levels: Option<Vec<i16>>,
    /// `None` when the column's max repetition level is 0
    pub rep_levels: Option<Vec<i16>>,
}

impl ReadBatch {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Decoder state shared by both page versions once framing is done
#[derive(Debug)]
struct PageDecoders {
    column: ColumnDescriptor,
    state: PageState,
    values_factory: Option<ValuesDecoderFactory>,
    def_levels: Option<LevelDecoder>,
    rep_levels: Option<LevelDecoder>,
    values: Option<ValuesDecoder>,
    num_values: usize,
    position: usize,
}

impl PageDecoders {
    fn new(column: ColumnDescriptor) -> Self {
        Self {
            column,
            state: PageState::Uninitialized,
            values_factory: None,
            def_levels: None,
            rep_levels: None,
            values: None,
            num_values: 0,
            position: 0,
        }
    }

    fn init(&mut self, values_factory: ValuesDecoderFactory) -> Result<()> {
        if self.state != PageState::Uninitialized {
            return Err(ParquetError::invalid_state(format!(
                "page reader for {} already initialized",
                self.column.flat_name()
            )));
        }
        if values_factory.physical_type() != self.column.physical_type() {
            return Err(ParquetError::invalid_argument(format!(
                "value decoders for {} cannot read {} column {}",
                values_factory.physical_type(),
                self.column.physical_type(),
                self.column.flat_name()
            )));
        }
        self.def_levels = Some(LevelDecoder::new(self.column.max_definition_level())?);
        self.rep_levels = Some(LevelDecoder::new(self.column.max_repetition_level())?);
        self.values_factory = Some(values_factory);
        self.position = 0;
        self.state = PageState::LevelDecodersBound;
        Ok(())
    }

    /// Checks the reader is ready to frame a page and builds its value decoder.
    fn begin_page(&mut self, encoding: Encoding) -> Result<ValuesDecoder> {
        if self.state != PageState::LevelDecodersBound {
            return Err(ParquetError::invalid_state(format!(
                "cannot read a page in state {:?}; call init first, once per page",
                self.state
            )));
        }
        let factory = self
            .values_factory
            .as_ref()
            .ok_or_else(|| ParquetError::invalid_state("value decoder factory not bound"))?;
        factory.decoder(encoding)
    }

    fn level_decoders(&mut self) -> Result<(&mut LevelDecoder, &mut LevelDecoder)> {
        match (self.rep_levels.as_mut(), self.def_levels.as_mut()) {
            (Some(rep), Some(def)) => Ok((rep, def)),
            _ => Err(ParquetError::invalid_state("level decoders not bound")),
        }
    }

    fn bind_values(&mut self, mut values: ValuesDecoder, data: Bytes, num_values: usize) -> Result<()> {
        values.init(data)?;
        self.values = Some(values);
        self.num_values = num_values;
        self.position = 0;
        self.state = PageState::ValueDecoderBound;
        Ok(())
    }

    fn read_values(&mut self, dest: &mut [Value]) -> Result<ReadBatch> {
        match self.state {
            PageState::ValueDecoderBound | PageState::Streaming => {}
            PageState::Exhausted => return Ok(ReadBatch::default()),
            other => {
                return Err(ParquetError::invalid_state(format!(
                    "cannot read values in state {:?}",
                    other
                )))
            }
        }

        let size = dest.len().min(self.num_values - self.position);
        if size == 0 {
            if self.position == self.num_values {
                self.state = PageState::Exhausted;
            }
            return Ok(ReadBatch::default());
        }

        let max_def = self.column.max_definition_level();
        let max_rep = self.column.max_repetition_level();
        let (rep_decoder, def_decoder) = self.level_decoders()?;

        let mut def_levels = vec![0i16; size];
        def_decoder
            .decode(&mut def_levels)
            .context("read definition levels failed")?;
        let mut rep_levels = vec![0i16; size];
        rep_decoder
            .decode(&mut rep_levels)
            .context("read repetition levels failed")?;

        let non_null = def_levels.iter().filter(|&&level| level == max_def).count();
        if non_null > 0 {
            let values = self
                .values
                .as_mut()
                .ok_or_else(|| ParquetError::invalid_state("value decoder not bound"))?;
            values
                .decode_values(&mut dest[..non_null])
                .with_context(|| format!("read {} values from page failed", non_null))?;
        }

        self.position += size;
        self.state = if self.position == self.num_values {
            PageState::Exhausted
        } else {
            PageState::Streaming
        };

        Ok(ReadBatch {
            count: size,
            non_null,
            def_levels: (max_def > 0).then_some(def_levels),
            rep_levels: (max_rep > 0).then_some(rep_levels),
        })
    }
}

fn expect_page_type(header: &PageHeader, expected: PageType) -> Result<()> {
    if header.type_ != expected {
        return Err(ParquetError::malformed_header(format!(
            "expected {} page, got {}",
            page_type_name(expected),
            page_type_name(header.type_)
        )));
    }
    Ok(())
}

/// Reader for `DATA_PAGE` pages
#[derive(Debug)]
pub struct DataPageReaderV1 {
    inner: PageDecoders,
}

impl DataPageReaderV1 {
    pub fn new(column: ColumnDescriptor) -> Self {
        Self {
            inner: PageDecoders::new(column),
        }
    }

    /// Binds the level decoders and the value decoder factory.
    pub fn init(&mut self, values: ValuesDecoderFactory) -> Result<()> {
        self.inner.init(values)
    }

    /// Reads the page body that follows `header` in `source`.
    pub fn read<R: Read + ?Sized>(
        &mut self,
        source: &mut R,
        header: &PageHeader,
        codec: Compression,
    ) -> Result<()> {
        expect_page_type(header, PageType::DATA_PAGE)?;
        let page = header
            .data_page_header
            .as_ref()
            .ok_or_else(|| ParquetError::malformed_header("DATA_PAGE without data_page_header"))?;

        let num_values = non_negative(page.num_values, "num_values")?;
        let compressed_size = non_negative(header.compressed_page_size, "compressed_page_size")?;
        let uncompressed_size =
            non_negative(header.uncompressed_page_size, "uncompressed_page_size")?;
        let def_encoding = encoding_from_thrift(page.definition_level_encoding)?;
        let rep_encoding = encoding_from_thrift(page.repetition_level_encoding)?;
        let encoding = encoding_from_thrift(page.encoding)?;

        let column = &self.inner.column;
        let def_decoder = LevelDecoder::for_encoding(def_encoding, column.max_definition_level())?;
        let rep_decoder = LevelDecoder::for_encoding(rep_encoding, column.max_repetition_level())?;
        let emits_def = column.emits_definition_levels();
        let emits_rep = column.emits_repetition_levels();
        let values = self.inner.begin_page(encoding)?;
        self.inner.def_levels = Some(def_decoder);
        self.inner.rep_levels = Some(rep_decoder);

        let raw = bits::read_full(source, compressed_size, "data page")?;
        let data = Bytes::from(decompress_block(&raw, codec, uncompressed_size)?);

        let mut offset = 0;
        let (rep_decoder, def_decoder) = self.inner.level_decoders()?;
        if emits_rep {
            let (block, used) = split_v1_levels(&data.slice(offset..))
                .context("read repetition levels failed")?;
            rep_decoder.init(block)?;
            offset += used;
        }
        if emits_def {
            let (block, used) = split_v1_levels(&data.slice(offset..))
                .context("read definition levels failed")?;
            def_decoder.init(block)?;
            offset += used;
        }

        debug!(
            "read V1 page for {}: {} values, {:?}, {} bytes ({} compressed), {} level bytes",
            self.inner.column.flat_name(),
            num_values,
            encoding,
            uncompressed_size,
            compressed_size,
            offset
        );
        self.inner
            .bind_values(values, data.slice(offset..), num_values)
    }

    /// Decodes up to `dest.len()` level slots, writing the non-null values
    /// to the front of `dest`.
    pub fn read_values(&mut self, dest: &mut [Value]) -> Result<ReadBatch> {
        self.inner.read_values(dest)
    }

    pub fn num_values(&self) -> usize {
        self.inner.num_values
    }

    pub fn state(&self) -> PageState {
        self.inner.state
    }
}

/// Reader for `DATA_PAGE_V2` pages
#[derive(Debug)]
pub struct DataPageReaderV2 {
    inner: PageDecoders,
    num_nulls: usize,
    num_rows: usize,
}

impl DataPageReaderV2 {
    pub fn new(column: ColumnDescriptor) -> Self {
        Self {
            inner: PageDecoders::new(column),
            num_nulls: 0,
            num_rows: 0,
        }
    }

    /// Binds the level decoders and the value decoder factory. V2 levels are
    /// always hybrid encoded.
    pub fn init(&mut self, values: ValuesDecoderFactory) -> Result<()> {
        self.inner.init(values)
    }

    /// Reads the page body that follows `header` in `source`.
    ///
    /// The header's page sizes include the level bytes; only the remainder
    /// goes through `codec`.
    pub fn read<R: Read + ?Sized>(
        &mut self,
        source: &mut R,
        header: &PageHeader,
        codec: Compression,
    ) -> Result<()> {
        expect_page_type(header, PageType::DATA_PAGE_V2)?;
        let page = header.data_page_header_v2.as_ref().ok_or_else(|| {
            ParquetError::malformed_header("DATA_PAGE_V2 without data_page_header_v2")
        })?;

        let num_values = non_negative(page.num_values, "num_values")?;
        let num_nulls = non_negative(page.num_nulls, "num_nulls")?;
        let num_rows = non_negative(page.num_rows, "num_rows")?;
        let rep_len = non_negative(
            page.repetition_levels_byte_length,
            "repetition_levels_byte_length",
        )?;
        let def_len = non_negative(
            page.definition_levels_byte_length,
            "definition_levels_byte_length",
        )?;
        let levels_size = rep_len + def_len;

        let compressed_size = non_negative(header.compressed_page_size, "compressed_page_size")?;
        let uncompressed_size =
            non_negative(header.uncompressed_page_size, "uncompressed_page_size")?;
        if compressed_size < levels_size || uncompressed_size < levels_size {
            return Err(ParquetError::malformed_header(format!(
                "page sizes ({} compressed, {} uncompressed) smaller than {} level bytes",
                compressed_size, uncompressed_size, levels_size
            )));
        }
        if num_nulls > num_values {
            return Err(ParquetError::malformed_header(format!(
                "{} nulls in a page of {} values",
                num_nulls, num_values
            )));
        }

        let encoding = encoding_from_thrift(page.encoding)?;
        let values = self.inner.begin_page(encoding)?;

        let levels = Bytes::from(bits::read_full(source, levels_size, "page levels")?);
        let (rep_decoder, def_decoder) = self.inner.level_decoders()?;
        rep_decoder
            .init(levels.slice(..rep_len))
            .context("read repetition levels failed")?;
        def_decoder
            .init(levels.slice(rep_len..))
            .context("read definition levels failed")?;

        let codec = match page.is_compressed {
            Some(false) => Compression::UNCOMPRESSED,
            _ => codec,
        };
        let raw = bits::read_full(source, compressed_size - levels_size, "page values")?;
        let data = decompress_block(&raw, codec, uncompressed_size - levels_size)?;

        debug!(
            "read V2 page for {}: {} values ({} nulls, {} rows), {:?}, {} level bytes, {} value bytes",
            self.inner.column.flat_name(),
            num_values,
            num_nulls,
            num_rows,
            encoding,
            levels_size,
            data.len()
        );
        self.num_nulls = num_nulls;
        self.num_rows = num_rows;
        self.inner.bind_values(values, Bytes::from(data), num_values)
    }

    /// Decodes up to `dest.len()` level slots, writing the non-null values
    /// to the front of `dest`.
    pub fn read_values(&mut self, dest: &mut [Value]) -> Result<ReadBatch> {
        self.inner.read_values(dest)
    }

    pub fn num_values(&self) -> usize {
        self.inner.num_values
    }

    /// Null count declared by the header
    pub fn num_nulls(&self) -> usize {
        self.num_nulls
    }

    /// Row count declared by the header
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn state(&self) -> PageState {
        self.inner.state
    }
}

/// A data page reader of either version, chosen from the page header
#[derive(Debug)]
pub enum DataPageReader {
    V1(DataPageReaderV1),
    V2(DataPageReaderV2),
}

impl DataPageReader {
    /// Picks the reader matching `page_type`.
    pub fn for_page_type(page_type: PageType, column: ColumnDescriptor) -> Result<Self> {
        match page_type {
            PageType::DATA_PAGE => Ok(DataPageReader::V1(DataPageReaderV1::new(column))),
            PageType::DATA_PAGE_V2 => Ok(DataPageReader::V2(DataPageReaderV2::new(column))),
            other => Err(ParquetError::malformed_header(format!(
                "{} is not a data page",
                page_type_name(other)
            ))),
        }
    }

    /// Reads the next page header from `source` and frames the page behind
    /// it, leaving `source` positioned at the following page.
    pub fn open<R: Read + ?Sized>(
        source: &mut R,
        column: ColumnDescriptor,
        values: ValuesDecoderFactory,
        codec: Compression,
    ) -> Result<Self> {
        let header = header::read_page_header(source)?;
        let mut reader = Self::for_page_type(header.type_, column)?;
        reader.init(values)?;
        reader.read(source, &header, codec)?;
        Ok(reader)
    }

    pub fn init(&mut self, values: ValuesDecoderFactory) -> Result<()> {
        match self {
            DataPageReader::V1(r) => r.init(values),
            DataPageReader::V2(r) => r.init(values),
        }
    }

    pub fn read<R: Read + ?Sized>(
        &mut self,
        source: &mut R,
        header: &PageHeader,
        codec: Compression,
    ) -> Result<()> {
        match self {
            DataPageReader::V1(r) => r.read(source, header, codec),
            DataPageReader::V2(r) => r.read(source, header, codec),
        }
    }

    pub fn read_values(&mut self, dest: &mut [Value]) -> Result<ReadBatch> {
        match self {
            DataPageReader::V1(r) => r.read_values(dest),
            DataPageReader::V2(r) => r.read_values(dest),
        }
    }

    pub fn num_values(&self) -> usize {
        match self {
            DataPageReader::V1(r) => r.num_values(),
            DataPageReader::V2(r) => r.num_values(),
        }
    }

    pub fn state(&self) -> PageState {
        match self {
            DataPageReader::V1(r) => r.state(),
            DataPageReader::V2(r) => r.state(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::encoding_to_thrift;
    use crate::levels::{encode_levels, encode_levels_v1};
    use crate::schema::{PhysicalType, Repetition};
    use parquet::format::{DataPageHeader, DataPageHeaderV2};
    use std::io::Cursor;

    fn plain_int32(values: &[i32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn v1_header(num_values: i32, size: usize) -> PageHeader {
        PageHeader {
            type_: PageType::DATA_PAGE,
            uncompressed_page_size: size as i32,
            compressed_page_size: size as i32,
            crc: None,
            data_page_header: Some(DataPageHeader {
                num_values,
                encoding: encoding_to_thrift(Encoding::PLAIN),
                definition_level_encoding: encoding_to_thrift(Encoding::RLE),
                repetition_level_encoding: encoding_to_thrift(Encoding::RLE),
                statistics: None,
            }),
            index_page_header: None,
            dictionary_page_header: None,
            data_page_header_v2: None,
        }
    }

    fn v2_header(num_values: i32, rep_len: usize, def_len: usize, values_len: usize) -> PageHeader {
        let total = (rep_len + def_len + values_len) as i32;
        PageHeader {
            type_: PageType::DATA_PAGE_V2,
            uncompressed_page_size: total,
            compressed_page_size: total,
            crc: None,
            data_page_header: None,
            index_page_header: None,
            dictionary_page_header: None,
            data_page_header_v2: Some(DataPageHeaderV2 {
                num_values,
                num_nulls: 0,
                num_rows: num_values,
                encoding: encoding_to_thrift(Encoding::PLAIN),
                definition_levels_byte_length: def_len as i32,
                repetition_levels_byte_length: rep_len as i32,
                is_compressed: Some(false),
                statistics: None,
            }),
        }
    }

    fn optional_int32() -> ColumnDescriptor {
        ColumnDescriptor::flat("v", PhysicalType::Int32, Repetition::Optional)
    }

    #[test]
    fn test_v1_optional_column_in_batches() {
        let mut body = encode_levels_v1(&[0, 1, 1, 0, 1], 1).unwrap();
        body.extend(plain_int32(&[10, 20, 30]));
        let header = v1_header(5, body.len());

        let mut reader = DataPageReaderV1::new(optional_int32());
        assert_eq!(reader.state(), PageState::Uninitialized);
        reader
            .init(ValuesDecoderFactory::new(PhysicalType::Int32))
            .unwrap();
        assert_eq!(reader.state(), PageState::LevelDecodersBound);
        reader
            .read(&mut Cursor::new(body), &header, Compression::UNCOMPRESSED)
            .unwrap();
        assert_eq!(reader.state(), PageState::ValueDecoderBound);

        let mut dest = vec![Value::Null; 3];
        let batch = reader.read_values(&mut dest).unwrap();
        assert_eq!(batch.count, 3);
        assert_eq!(batch.non_null, 2);
        assert_eq!(batch.def_levels, Some(vec![0, 1, 1]));
        assert_eq!(batch.rep_levels, None);
        assert_eq!(&dest[..2], &[Value::Int32(10), Value::Int32(20)]);
        assert_eq!(reader.state(), PageState::Streaming);

        let batch = reader.read_values(&mut dest).unwrap();
        assert_eq!(batch.count, 2);
        assert_eq!(batch.def_levels, Some(vec![0, 1]));
        assert_eq!(dest[0], Value::Int32(30));
        assert_eq!(reader.state(), PageState::Exhausted);

        // exhaustion is sticky and not an error
        for _ in 0..2 {
            assert!(reader.read_values(&mut dest).unwrap().is_empty());
        }
    }

    #[test]
    fn test_v2_levels_are_raw() {
        let rep = encode_levels(&[0, 1, 0], 1).unwrap();
        let def = encode_levels(&[1, 1, 1], 1).unwrap();
        let values = plain_int32(&[7, 8, 9]);
        let header = v2_header(3, rep.len(), def.len(), values.len());
        let mut body = rep.clone();
        body.extend(&def);
        body.extend(&values);

        let column = ColumnDescriptor::flat("v", PhysicalType::Int32, Repetition::Repeated);
        let mut reader = DataPageReaderV2::new(column);
        reader
            .init(ValuesDecoderFactory::new(PhysicalType::Int32))
            .unwrap();
        // codec is ignored when the header says the values are not compressed
        reader
            .read(&mut Cursor::new(body), &header, Compression::SNAPPY)
            .unwrap();

        let mut dest = vec![Value::Null; 8];
        let batch = reader.read_values(&mut dest).unwrap();
        assert_eq!(batch.count, 3);
        assert_eq!(batch.rep_levels, Some(vec![0, 1, 0]));
        assert_eq!(batch.def_levels, Some(vec![1, 1, 1]));
        assert_eq!(&dest[..3], &[Value::Int32(7), Value::Int32(8), Value::Int32(9)]);
    }

    #[test]
    fn test_state_misuse() {
        let mut reader = DataPageReaderV1::new(optional_int32());
        let mut dest = vec![Value::Null; 1];
        assert!(matches!(
            reader.read_values(&mut dest),
            Err(ParquetError::InvalidState(_))
        ));

        let header = v1_header(0, 0);
        let err = reader
            .read(&mut Cursor::new(Vec::new()), &header, Compression::UNCOMPRESSED)
            .unwrap_err();
        assert!(matches!(err, ParquetError::InvalidState(_)));

        reader
            .init(ValuesDecoderFactory::new(PhysicalType::Int32))
            .unwrap();
        assert!(matches!(
            reader.init(ValuesDecoderFactory::new(PhysicalType::Int32)),
            Err(ParquetError::InvalidState(_))
        ));
    }

    #[test]
    fn test_factory_type_must_match_column() {
        let mut reader = DataPageReaderV1::new(optional_int32());
        let err = reader
            .init(ValuesDecoderFactory::new(PhysicalType::Int64))
            .unwrap_err();
        assert!(matches!(err, ParquetError::InvalidArgument(_)));
    }

    #[test]
    fn test_malformed_headers() {
        let mut reader = DataPageReaderV2::new(optional_int32());
        reader
            .init(ValuesDecoderFactory::new(PhysicalType::Int32))
            .unwrap();

        let mut header = v2_header(3, 2, 2, 4);
        header.data_page_header_v2.as_mut().unwrap().definition_levels_byte_length = -1;
        let err = reader
            .read(&mut Cursor::new(vec![0; 16]), &header, Compression::UNCOMPRESSED)
            .unwrap_err();
        assert!(matches!(err, ParquetError::MalformedHeader(_)));

        let mut header = v2_header(3, 2, 2, 4);
        header.data_page_header_v2.as_mut().unwrap().num_values = -3;
        let err = reader
            .read(&mut Cursor::new(vec![0; 16]), &header, Compression::UNCOMPRESSED)
            .unwrap_err();
        assert!(matches!(err, ParquetError::MalformedHeader(_)));

        let mut header = v2_header(3, 2, 2, 4);
        header.data_page_header_v2 = None;
        let err = reader
            .read(&mut Cursor::new(vec![0; 16]), &header, Compression::UNCOMPRESSED)
            .unwrap_err();
        assert!(matches!(err, ParquetError::MalformedHeader(_)));

        let mut header = v2_header(3, 2, 2, 4);
        header.compressed_page_size = 3;
        let err = reader
            .read(&mut Cursor::new(vec![0; 16]), &header, Compression::UNCOMPRESSED)
            .unwrap_err();
        assert!(matches!(err, ParquetError::MalformedHeader(_)));
    }

    #[test]
    fn test_truncated_body() {
        let mut body = encode_levels_v1(&[1, 1], 1).unwrap();
        body.extend(plain_int32(&[1, 2]));
        let header = v1_header(2, body.len());
        body.truncate(body.len() - 1);

        let mut reader = DataPageReaderV1::new(optional_int32());
        reader
            .init(ValuesDecoderFactory::new(PhysicalType::Int32))
            .unwrap();
        let err = reader
            .read(&mut Cursor::new(body), &header, Compression::UNCOMPRESSED)
            .unwrap_err();
        assert!(matches!(err, ParquetError::TruncatedInput { .. }));
    }

    #[test]
    fn test_dispatch_on_page_type() {
        let column = optional_int32();
        assert!(matches!(
            DataPageReader::for_page_type(PageType::DATA_PAGE, column.clone()),
            Ok(DataPageReader::V1(_))
        ));
        assert!(matches!(
            DataPageReader::for_page_type(PageType::DATA_PAGE_V2, column.clone()),
            Ok(DataPageReader::V2(_))
        ));
        assert!(matches!(
            DataPageReader::for_page_type(PageType::DICTIONARY_PAGE, column),
            Err(ParquetError::MalformedHeader(_))
        ));
    }
}

//! Data page writing

use std::borrow::Cow;
use std::io::Write;

use log::debug;
use parquet::basic::{Compression, Encoding};
use parquet::format::{DataPageHeader, DataPageHeaderV2, PageHeader, PageType};

use crate::compression::compress_block;
use crate::encoding::{get_values_encoder, Dictionary};
use crate::header::{encoding_to_thrift, write_page_header};
use crate::levels::{encode_levels, encode_levels_v1};
use crate::schema::ColumnDescriptor;
use crate::{bits, ParquetError, Result, Value};

/// Data page layout version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageVersion {
    #[default]
    V1,
    V2,
}

/// Builder for creating a configured page writer
#[derive(Debug, Clone)]
pub struct WriterBuilder {
    compression: Compression,
    page_version: PageVersion,
    dictionary: bool,
    encoding: Encoding,
}

impl Default for WriterBuilder {
    fn default() -> Self {
        Self {
            compression: Compression::SNAPPY,
            page_version: PageVersion::V1,
            dictionary: false,
            encoding: Encoding::PLAIN,
        }
    }
}

impl WriterBuilder {
    /// Create a new WriterBuilder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the compression algorithm
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Set the data page layout
    pub fn with_page_version(mut self, version: PageVersion) -> Self {
        self.page_version = version;
        self
    }

    /// Write dictionary indices instead of values (forces RLE_DICTIONARY)
    pub fn with_dictionary(mut self, enabled: bool) -> Self {
        self.dictionary = enabled;
        self
    }

    /// Set the value encoding used when dictionary output is off
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Build a page writer for `column` with the configured settings
    pub fn build(self, column: ColumnDescriptor) -> Result<DataPageWriter> {
        let options = PageOptions {
            compression: self.compression,
            encoding: self.encoding,
            dictionary: self.dictionary,
        };
        options.validate(&column)?;

        Ok(match self.page_version {
            PageVersion::V1 => DataPageWriter::V1(DataPageWriterV1 { column, options }),
            PageVersion::V2 => DataPageWriter::V2(DataPageWriterV2 { column, options }),
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct PageOptions {
    compression: Compression,
    encoding: Encoding,
    dictionary: bool,
}

impl PageOptions {
    fn value_encoding(&self) -> Encoding {
        if self.dictionary {
            Encoding::RLE_DICTIONARY
        } else {
            self.encoding
        }
    }

    /// Rejects encodings the column cannot be written with before any page is.
    fn validate(&self, column: &ColumnDescriptor) -> Result<()> {
        let mut scratch = Dictionary::new(column.physical_type());
        let dictionary = self.dictionary.then_some(&mut scratch);
        get_values_encoder(self.value_encoding(), column.physical_type(), dictionary)?;
        Ok(())
    }
}

/// Buffered data for one page of a column
///
/// `values` holds only the non-null values, in order. Level arrays are
/// optional for levels whose max is 0.
#[derive(Debug, Clone, Copy)]
pub struct PageData<'a> {
    values: &'a [Value],
    def_levels: Option<&'a [i16]>,
    rep_levels: Option<&'a [i16]>,
}

impl<'a> PageData<'a> {
    pub fn new(values: &'a [Value]) -> Self {
        Self {
            values,
            def_levels: None,
            rep_levels: None,
        }
    }

    pub fn with_def_levels(mut self, levels: &'a [i16]) -> Self {
        self.def_levels = Some(levels);
        self
    }

    pub fn with_rep_levels(mut self, levels: &'a [i16]) -> Self {
        self.rep_levels = Some(levels);
        self
    }
}

/// Sizes and counts of a page that has been written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrittenPage {
    /// Page body bytes after compression, level bytes included
    pub compressed_size: usize,
    /// Page body bytes before compression, level bytes included
    pub uncompressed_size: usize,
    /// Serialized page header bytes
    pub header_size: usize,
    pub num_values: usize,
    pub num_nulls: usize,
    pub num_rows: usize,
}

impl WrittenPage {
    /// Total bytes the page occupies in the sink
    pub fn total_size(&self) -> usize {
        self.header_size + self.compressed_size
    }
}

/// Page contents checked against the column, levels materialized
struct CheckedPage<'a> {
    values: &'a [Value],
    def_levels: Cow<'a, [i16]>,
    rep_levels: Cow<'a, [i16]>,
    num_values: usize,
    num_nulls: usize,
    num_rows: usize,
}

impl<'a> CheckedPage<'a> {
    fn new(column: &ColumnDescriptor, page: PageData<'a>) -> Result<Self> {
        let max_def = column.max_definition_level();
        let max_rep = column.max_repetition_level();
        let name = column.flat_name();

        if max_def > 0 && page.def_levels.is_none() {
            return Err(ParquetError::invalid_argument(format!(
                "column {} needs definition levels (max level {})",
                name, max_def
            )));
        }
        if max_rep > 0 && page.rep_levels.is_none() {
            return Err(ParquetError::invalid_argument(format!(
                "column {} needs repetition levels (max level {})",
                name, max_rep
            )));
        }

        let num_values = page
            .def_levels
            .or(page.rep_levels)
            .map_or(page.values.len(), <[i16]>::len);
        for (kind, levels) in [("definition", page.def_levels), ("repetition", page.rep_levels)] {
            if let Some(levels) = levels {
                if levels.len() != num_values {
                    return Err(ParquetError::invalid_argument(format!(
                        "column {} has {} {} levels for {} values",
                        name,
                        levels.len(),
                        kind,
                        num_values
                    )));
                }
            }
        }

        let def_levels = match page.def_levels {
            Some(levels) => Cow::Borrowed(levels),
            None => Cow::Owned(vec![0; num_values]),
        };
        let rep_levels = match page.rep_levels {
            Some(levels) => Cow::Borrowed(levels),
            None => Cow::Owned(vec![0; num_values]),
        };

        let non_null = def_levels.iter().filter(|&&level| level == max_def).count();
        if non_null != page.values.len() {
            return Err(ParquetError::invalid_argument(format!(
                "column {} has {} non-null levels but {} values",
                name,
                non_null,
                page.values.len()
            )));
        }
        let num_rows = match page.rep_levels {
            Some(levels) => levels.iter().filter(|&&level| level == 0).count(),
            None => num_values,
        };

        Ok(Self {
            values: page.values,
            def_levels,
            rep_levels,
            num_values,
            num_nulls: num_values - non_null,
            num_rows,
        })
    }

    fn encode_values(
        &self,
        column: &ColumnDescriptor,
        encoding: Encoding,
        dictionary: Option<&mut Dictionary>,
    ) -> Result<Vec<u8>> {
        let mut encoder = get_values_encoder(encoding, column.physical_type(), dictionary)?;
        encoder.encode_values(self.values)?;
        encoder.finish()
    }
}

fn header_i32(value: usize, field: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| {
        ParquetError::invalid_argument(format!("{} of {} does not fit a page header", field, value))
    })
}

/// Writer for `DATA_PAGE` pages
#[derive(Debug, Clone)]
pub struct DataPageWriterV1 {
    column: ColumnDescriptor,
    options: PageOptions,
}

impl DataPageWriterV1 {
    /// Creates a PLAIN writer without dictionary output.
    pub fn new(column: ColumnDescriptor, compression: Compression) -> Self {
        Self {
            column,
            options: PageOptions {
                compression,
                encoding: Encoding::PLAIN,
                dictionary: false,
            },
        }
    }

    pub fn column(&self) -> &ColumnDescriptor {
        &self.column
    }

    /// Writes one page: header, then a single compressed block holding
    /// repetition levels, definition levels and values.
    ///
    /// `dictionary` collects the distinct values when dictionary output is on.
    pub fn write<W: Write + ?Sized>(
        &self,
        sink: &mut W,
        page: PageData<'_>,
        dictionary: Option<&mut Dictionary>,
    ) -> Result<WrittenPage> {
        let column = &self.column;
        let checked = CheckedPage::new(column, page)?;
        let encoding = self.options.value_encoding();

        let mut body = Vec::new();
        if column.emits_repetition_levels() {
            body.extend(encode_levels_v1(
                &checked.rep_levels,
                column.max_repetition_level(),
            )?);
        }
        if column.emits_definition_levels() {
            body.extend(encode_levels_v1(
                &checked.def_levels,
                column.max_definition_level(),
            )?);
        }
        let levels_size = body.len();
        body.extend(checked.encode_values(column, encoding, dictionary)?);

        let compressed = compress_block(&body, self.options.compression)?;
        let header = PageHeader {
            type_: PageType::DATA_PAGE,
            uncompressed_page_size: header_i32(body.len(), "uncompressed_page_size")?,
            compressed_page_size: header_i32(compressed.len(), "compressed_page_size")?,
            crc: None,
            data_page_header: Some(DataPageHeader {
                num_values: header_i32(checked.num_values, "num_values")?,
                encoding: encoding_to_thrift(encoding),
                definition_level_encoding: encoding_to_thrift(Encoding::RLE),
                repetition_level_encoding: encoding_to_thrift(Encoding::RLE),
                statistics: None,
            }),
            index_page_header: None,
            dictionary_page_header: None,
            data_page_header_v2: None,
        };

        let header_size = write_page_header(&header, sink)?;
        bits::write_full(sink, &compressed)?;

        debug!(
            "wrote V1 page for {}: {} values ({} nulls), {:?}, {} level bytes, {} -> {} bytes with {:?}",
            column.flat_name(),
            checked.num_values,
            checked.num_nulls,
            encoding,
            levels_size,
            body.len(),
            compressed.len(),
            self.options.compression
        );

        Ok(WrittenPage {
            compressed_size: compressed.len(),
            uncompressed_size: body.len(),
            header_size,
            num_values: checked.num_values,
            num_nulls: checked.num_nulls,
            num_rows: checked.num_rows,
        })
    }
}

/// Writer for `DATA_PAGE_V2` pages
#[derive(Debug, Clone)]
pub struct DataPageWriterV2 {
    column: ColumnDescriptor,
    options: PageOptions,
}

impl DataPageWriterV2 {
    /// Creates a PLAIN writer without dictionary output.
    pub fn new(column: ColumnDescriptor, compression: Compression) -> Self {
        Self {
            column,
            options: PageOptions {
                compression,
                encoding: Encoding::PLAIN,
                dictionary: false,
            },
        }
    }

    pub fn column(&self) -> &ColumnDescriptor {
        &self.column
    }

    /// Writes one page: header, raw repetition levels, raw definition
    /// levels, then the compressed values.
    ///
    /// Header page sizes and the returned sizes both include the level bytes.
    pub fn write<W: Write + ?Sized>(
        &self,
        sink: &mut W,
        page: PageData<'_>,
        dictionary: Option<&mut Dictionary>,
    ) -> Result<WrittenPage> {
        let column = &self.column;
        let checked = CheckedPage::new(column, page)?;
        let encoding = self.options.value_encoding();

        let rep = if column.emits_repetition_levels() {
            encode_levels(&checked.rep_levels, column.max_repetition_level())?
        } else {
            Vec::new()
        };
        let def = if column.emits_definition_levels() {
            encode_levels(&checked.def_levels, column.max_definition_level())?
        } else {
            Vec::new()
        };
        let levels_size = rep.len() + def.len();

        let values = checked.encode_values(column, encoding, dictionary)?;
        let compressed = compress_block(&values, self.options.compression)?;
        let compressed_size = levels_size + compressed.len();
        let uncompressed_size = levels_size + values.len();

        let header = PageHeader {
            type_: PageType::DATA_PAGE_V2,
            uncompressed_page_size: header_i32(uncompressed_size, "uncompressed_page_size")?,
            compressed_page_size: header_i32(compressed_size, "compressed_page_size")?,
            crc: None,
            data_page_header: None,
            index_page_header: None,
            dictionary_page_header: None,
            data_page_header_v2: Some(DataPageHeaderV2 {
                num_values: header_i32(checked.num_values, "num_values")?,
                num_nulls: header_i32(checked.num_nulls, "num_nulls")?,
                num_rows: header_i32(checked.num_rows, "num_rows")?,
                encoding: encoding_to_thrift(encoding),
                definition_levels_byte_length: header_i32(def.len(), "definition level bytes")?,
                repetition_levels_byte_length: header_i32(rep.len(), "repetition level bytes")?,
                is_compressed: Some(self.options.compression != Compression::UNCOMPRESSED),
                statistics: None,
            }),
        };

        let header_size = write_page_header(&header, sink)?;
        bits::write_full(sink, &rep)?;
        bits::write_full(sink, &def)?;
        bits::write_full(sink, &compressed)?;

        debug!(
            "wrote V2 page for {}: {} values ({} nulls, {} rows), {:?}, {} level bytes, {} -> {} value bytes with {:?}",
            column.flat_name(),
            checked.num_values,
            checked.num_nulls,
            checked.num_rows,
            encoding,
            levels_size,
            values.len(),
            compressed.len(),
            self.options.compression
        );

        Ok(WrittenPage {
            compressed_size,
            uncompressed_size,
            header_size,
            num_values: checked.num_values,
            num_nulls: checked.num_nulls,
            num_rows: checked.num_rows,
        })
    }
}

/// A page writer of either version, as produced by [`WriterBuilder`]
#[derive(Debug, Clone)]
pub enum DataPageWriter {
    V1(DataPageWriterV1),
    V2(DataPageWriterV2),
}

impl DataPageWriter {
    pub fn write<W: Write + ?Sized>(
        &self,
        sink: &mut W,
        page: PageData<'_>,
        dictionary: Option<&mut Dictionary>,
    ) -> Result<WrittenPage> {
        match self {
            DataPageWriter::V1(w) => w.write(sink, page, dictionary),
            DataPageWriter::V2(w) => w.write(sink, page, dictionary),
        }
    }

    pub fn page_version(&self) -> PageVersion {
        match self {
            DataPageWriter::V1(_) => PageVersion::V1,
            DataPageWriter::V2(_) => PageVersion::V2,
        }
    }

    pub fn column(&self) -> &ColumnDescriptor {
        match self {
            DataPageWriter::V1(w) => w.column(),
            DataPageWriter::V2(w) => w.column(),
        }
    }

    /// The value encoding pages are written with
    pub fn encoding(&self) -> Encoding {
        match self {
            DataPageWriter::V1(w) => w.options.value_encoding(),
            DataPageWriter::V2(w) => w.options.value_encoding(),
        }
    }

    pub fn compression(&self) -> Compression {
        match self {
            DataPageWriter::V1(w) => w.options.compression,
            DataPageWriter::V2(w) => w.options.compression,
        }
    }
}

#![allow(dead_code)]

use parquet::basic::Compression;
use parquet_page::encoding::Dictionary;
use parquet_page::*;
use rand::Rng;
use std::sync::Arc;

/// Flat optional INT64 column
pub fn optional_int64() -> ColumnDescriptor {
    ColumnDescriptor::flat("value", PhysicalType::Int64, Repetition::Optional)
}

/// `doc.links.url`: optional struct, repeated list, required leaf
pub fn nested_byte_array() -> ColumnDescriptor {
    ColumnDescriptor::from_path(
        &[
            ("doc", Repetition::Optional),
            ("links", Repetition::Repeated),
            ("url", Repetition::Required),
        ],
        PhysicalType::ByteArray,
    )
    .unwrap()
}

/// Random levels in `[0, max_level]`; a fraction are forced to the max so
/// pages are not mostly null.
pub fn random_levels<R: Rng>(rng: &mut R, len: usize, max_level: i16) -> Vec<i16> {
    (0..len)
        .map(|_| {
            if rng.random_bool(0.5) {
                max_level
            } else {
                rng.random_range(0..=max_level)
            }
        })
        .collect()
}

/// Random repetition levels whose first entry starts a record
pub fn random_rep_levels<R: Rng>(rng: &mut R, len: usize, max_level: i16) -> Vec<i16> {
    let mut levels = random_levels(rng, len, max_level);
    if let Some(first) = levels.first_mut() {
        *first = 0;
    }
    levels
}

/// Generates one value per non-null definition level
pub fn values_for_levels(
    physical_type: PhysicalType,
    def_levels: &[i16],
    max_def: i16,
) -> Vec<Value> {
    def_levels
        .iter()
        .filter(|&&level| level == max_def)
        .enumerate()
        .map(|(i, _)| sample_value(physical_type, i))
        .collect()
}

/// Deterministic value of the given type, with a small set of repeats so
/// dictionary pages stay small
pub fn sample_value(physical_type: PhysicalType, i: usize) -> Value {
    match physical_type {
        PhysicalType::Boolean => Value::Boolean(i % 3 == 0),
        PhysicalType::Int32 => Value::Int32((i % 50) as i32 - 25),
        PhysicalType::Int64 => Value::Int64((i as i64 % 97) * 1_000_003),
        PhysicalType::Int96 => Value::Int96([i as u32, 0, 2_440_588]),
        PhysicalType::Float => Value::from((i % 13) as f32 * 0.5),
        PhysicalType::Double => Value::from((i % 29) as f64 * 1.25),
        PhysicalType::ByteArray => Value::from(format!("https://example.com/{}", i % 40).as_str()),
        PhysicalType::FixedLenByteArray(len) => {
            Value::FixedLenByteArray(bytes::Bytes::from(vec![(i % 251) as u8; len]))
        }
    }
}

/// Everything `read_all` pulled out of one page
#[derive(Debug, Default, PartialEq)]
pub struct PageContents {
    pub values: Vec<Value>,
    pub def_levels: Option<Vec<i16>>,
    pub rep_levels: Option<Vec<i16>>,
    pub batches: usize,
}

/// Drains `reader` in batches of `batch_size` level slots.
pub fn read_all(reader: &mut DataPageReader, batch_size: usize) -> Result<PageContents> {
    let mut contents = PageContents::default();
    let mut dest = vec![Value::Null; batch_size];
    loop {
        let batch = reader.read_values(&mut dest)?;
        if batch.is_empty() {
            break;
        }
        contents.batches += 1;
        contents.values.extend_from_slice(&dest[..batch.non_null]);
        if let Some(levels) = batch.def_levels {
            contents.def_levels.get_or_insert_with(Vec::new).extend(levels);
        }
        if let Some(levels) = batch.rep_levels {
            contents.rep_levels.get_or_insert_with(Vec::new).extend(levels);
        }
    }
    assert_eq!(reader.state(), PageState::Exhausted);
    Ok(contents)
}

/// Writes one page with `writer` and reads it straight back.
pub fn roundtrip_page(
    writer: &DataPageWriter,
    page: PageData<'_>,
    batch_size: usize,
) -> Result<(WrittenPage, PageContents)> {
    let column = writer.column().clone();
    let physical_type = column.physical_type();

    let mut dictionary = Dictionary::new(physical_type);
    let mut sink = Vec::new();
    let written = writer.write(&mut sink, page, Some(&mut dictionary))?;
    assert_eq!(written.total_size(), sink.len());

    let factory = ValuesDecoderFactory::new(physical_type).with_dictionary(Arc::new(dictionary));
    let mut source = sink.as_slice();
    let mut reader = DataPageReader::open(&mut source, column, factory, writer.compression())?;
    assert!(source.is_empty(), "page left {} unread bytes", source.len());
    let contents = read_all(&mut reader, batch_size)?;
    Ok((written, contents))
}

/// Codecs exercised by the round-trip tests
pub fn test_compressions() -> Vec<Compression> {
    vec![
        Compression::UNCOMPRESSED,
        Compression::SNAPPY,
        Compression::GZIP(Default::default()),
        Compression::LZ4_RAW,
        Compression::ZSTD(Default::default()),
    ]
}

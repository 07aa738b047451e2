use parquet::basic::Encoding;
use thiserror::Error;

/// Core error type for page encoding and decoding
#[derive(Error, Debug)]
pub enum ParquetError {
    /// IO errors from the underlying byte source or sink
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors raised by the compact protocol while moving a page header
    #[error("Thrift error: {0}")]
    Thrift(#[from] thrift::Error),

    /// Missing or contradictory header variant, negative declared sizes
    #[error("Malformed page header: {0}")]
    MalformedHeader(String),

    /// Fewer bytes were available than the page declared
    #[error("Truncated input: {context}, expected {expected} but got {actual}")]
    TruncatedInput {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// Unknown or unsupported encoding id for the column's physical type
    #[error("Unsupported encoding {encoding:?} for {physical_type}")]
    UnsupportedEncoding {
        encoding: Encoding,
        physical_type: String,
    },

    /// A decoded or encoded level does not fit in the column's max level
    #[error("Level {level} exceeds max level {max_level}")]
    LevelOverflow { level: i64, max_level: i64 },

    /// Codec failure or decompressed size mismatch
    #[error("Compression failure: {0}")]
    CompressionFailure(String),

    /// The sink accepted fewer bytes than requested
    #[error("Short write: need to write {expected} bytes, wrote {written}")]
    ShortWrite { expected: usize, written: usize },

    /// Corrupt run header or varint inside a hybrid-encoded block
    #[error("Malformed run: {0}")]
    MalformedRun(String),

    /// Missing dictionary or dictionary index out of range
    #[error("Dictionary error: {0}")]
    Dictionary(String),

    /// Caller-supplied buffers that disagree with the column
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Page reader or writer used out of order
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Another error with additional context attached
    #[error("{message}: {source}")]
    Context {
        message: String,
        #[source]
        source: Box<ParquetError>,
    },
}

/// Result type alias for page operations
pub type Result<T> = std::result::Result<T, ParquetError>;

impl ParquetError {
    /// Create a new malformed header error
    pub fn malformed_header<S: Into<String>>(msg: S) -> Self {
        ParquetError::MalformedHeader(msg.into())
    }

    /// Create a new truncated input error
    pub fn truncated<S: Into<String>>(context: S, expected: usize, actual: usize) -> Self {
        ParquetError::TruncatedInput {
            context: context.into(),
            expected,
            actual,
        }
    }

    /// Create a new unsupported encoding error
    pub fn unsupported_encoding<S: Into<String>>(encoding: Encoding, physical_type: S) -> Self {
        ParquetError::UnsupportedEncoding {
            encoding,
            physical_type: physical_type.into(),
        }
    }

    /// Create a new level overflow error
    pub fn level_overflow(level: impl Into<i64>, max_level: impl Into<i64>) -> Self {
        ParquetError::LevelOverflow {
            level: level.into(),
            max_level: max_level.into(),
        }
    }

    /// Create a new compression failure
    pub fn compression<S: Into<String>>(msg: S) -> Self {
        ParquetError::CompressionFailure(msg.into())
    }

    /// Create a new malformed run error
    pub fn malformed_run<S: Into<String>>(msg: S) -> Self {
        ParquetError::MalformedRun(msg.into())
    }

    /// Create a new dictionary error
    pub fn dictionary<S: Into<String>>(msg: S) -> Self {
        ParquetError::Dictionary(msg.into())
    }

    /// Create a new invalid argument error
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        ParquetError::InvalidArgument(msg.into())
    }

    /// Create a new invalid state error
    pub fn invalid_state<S: Into<String>>(msg: S) -> Self {
        ParquetError::InvalidState(msg.into())
    }

    /// The innermost error once all context layers are peeled off
    pub fn root_cause(&self) -> &ParquetError {
        match self {
            ParquetError::Context { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Extension trait to add context to errors
pub trait ErrorContext<T> {
    /// Add context to an error
    fn context<S: Into<String>>(self, ctx: S) -> Result<T>;

    /// Add context with a closure that's only called on error
    fn with_context<S: Into<String>, F: FnOnce() -> S>(self, f: F) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<ParquetError>,
{
    fn context<S: Into<String>>(self, ctx: S) -> Result<T> {
        self.map_err(|e| ParquetError::Context {
            message: ctx.into(),
            source: Box::new(e.into()),
        })
    }

    fn with_context<S: Into<String>, F: FnOnce() -> S>(self, f: F) -> Result<T> {
        self.map_err(|e| ParquetError::Context {
            message: f().into(),
            source: Box::new(e.into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ParquetError::malformed_header("null DataPageHeaderV2");
        assert_eq!(
            err.to_string(),
            "Malformed page header: null DataPageHeaderV2"
        );

        let err = ParquetError::truncated("read levels", 10, 4);
        assert_eq!(
            err.to_string(),
            "Truncated input: read levels, expected 10 but got 4"
        );

        let err = ParquetError::ShortWrite {
            expected: 8,
            written: 3,
        };
        assert!(err.to_string().contains("need to write 8 bytes, wrote 3"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: ParquetError = io_err.into();
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_error_context() {
        fn failing_operation() -> Result<()> {
            Err(ParquetError::level_overflow(3, 1))
        }

        let result = failing_operation().context("read definition levels failed");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("read definition levels failed"));
        assert!(matches!(
            err.root_cause(),
            ParquetError::LevelOverflow {
                level: 3,
                max_level: 1
            }
        ));
    }

    #[test]
    fn test_error_with_context() {
        fn failing_operation() -> Result<()> {
            Err(ParquetError::compression("size mismatch"))
        }

        let page = 7;
        let result = failing_operation()
            .with_context(|| format!("page {}", page))
            .context("column chunk");

        let err = result.unwrap_err();
        assert_eq!(
            err.to_string(),
            "column chunk: page 7: Compression failure: size mismatch"
        );
        assert!(matches!(
            err.root_cause(),
            ParquetError::CompressionFailure(_)
        ));
    }
}

use std::fmt;

use crate::{ParquetError, Result};

/// Physical storage types of column values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicalType {
    Boolean,
    Int32,
    Int64,
    Int96,
    Float,
    Double,
    ByteArray,
    /// Fixed-length byte array with the given length in bytes
    FixedLenByteArray(usize),
}

/// Represents how values are repeated in Parquet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repetition {
    /// Field must have exactly one value
    Required,
    /// Field can have 0 or 1 value
    Optional,
    /// Field can have 0 or more values
    Repeated,
}

impl PhysicalType {
    /// Get the type name for display
    pub fn type_name(&self) -> &'static str {
        match self {
            PhysicalType::Boolean => "BOOLEAN",
            PhysicalType::Int32 => "INT32",
            PhysicalType::Int64 => "INT64",
            PhysicalType::Int96 => "INT96",
            PhysicalType::Float => "FLOAT",
            PhysicalType::Double => "DOUBLE",
            PhysicalType::ByteArray => "BYTE_ARRAY",
            PhysicalType::FixedLenByteArray(_) => "FIXED_LEN_BYTE_ARRAY",
        }
    }
}

impl fmt::Display for PhysicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhysicalType::FixedLenByteArray(len) => write!(f, "FIXED_LEN_BYTE_ARRAY({})", len),
            other => f.write_str(other.type_name()),
        }
    }
}

/// Everything the page codecs need to know about one leaf column
///
/// Built by the schema layer; the page readers and writers only consume it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    flat_name: String,
    physical_type: PhysicalType,
    repetition: Repetition,
    max_definition_level: i16,
    max_repetition_level: i16,
}

fn flat_levels(repetition: Repetition) -> (i16, i16) {
    match repetition {
        Repetition::Required => (0, 0),
        Repetition::Optional => (1, 0),
        Repetition::Repeated => (1, 1),
    }
}

impl ColumnDescriptor {
    pub fn new(
        flat_name: impl Into<String>,
        physical_type: PhysicalType,
        repetition: Repetition,
        max_definition_level: i16,
        max_repetition_level: i16,
    ) -> Result<Self> {
        let flat_name = flat_name.into();
        if max_definition_level < 0 || max_repetition_level < 0 {
            return Err(ParquetError::invalid_argument(format!(
                "column {} has negative max levels ({}, {})",
                flat_name, max_definition_level, max_repetition_level
            )));
        }
        if max_repetition_level > max_definition_level {
            return Err(ParquetError::invalid_argument(format!(
                "column {} has max repetition level {} above max definition level {}",
                flat_name, max_repetition_level, max_definition_level
            )));
        }
        // A top-level column's levels follow from its repetition alone
        if !flat_name.contains('.')
            && (max_definition_level, max_repetition_level) != flat_levels(repetition)
        {
            return Err(ParquetError::invalid_argument(format!(
                "top-level {:?} column {} cannot have max levels ({}, {})",
                repetition, flat_name, max_definition_level, max_repetition_level
            )));
        }
        if matches!(physical_type, PhysicalType::FixedLenByteArray(0)) {
            return Err(ParquetError::invalid_argument(format!(
                "column {} is a zero-length fixed byte array",
                flat_name
            )));
        }
        Ok(Self {
            flat_name,
            physical_type,
            repetition,
            max_definition_level,
            max_repetition_level,
        })
    }

    /// Top-level, non-nested column
    pub fn flat(name: impl Into<String>, physical_type: PhysicalType, repetition: Repetition) -> Self {
        let (max_def, max_rep) = flat_levels(repetition);
        Self {
            flat_name: name.into(),
            physical_type,
            repetition,
            max_definition_level: max_def,
            max_repetition_level: max_rep,
        }
    }

    /// Builds a leaf descriptor from its path of `(name, repetition)` pairs,
    /// root-most first. The leaf's own repetition is the last entry.
    pub fn from_path(path: &[(&str, Repetition)], physical_type: PhysicalType) -> Result<Self> {
        let Some(&(_, leaf_repetition)) = path.last() else {
            return Err(ParquetError::invalid_argument("column path is empty"));
        };

        let mut max_def = 0i16;
        let mut max_rep = 0i16;
        for (_, repetition) in path {
            match repetition {
                Repetition::Required => {}
                Repetition::Optional => max_def += 1,
                Repetition::Repeated => {
                    max_def += 1;
                    max_rep += 1;
                }
            }
        }

        let flat_name = path
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(".");
        Self::new(flat_name, physical_type, leaf_repetition, max_def, max_rep)
    }

    pub fn flat_name(&self) -> &str {
        &self.flat_name
    }

    pub fn physical_type(&self) -> PhysicalType {
        self.physical_type
    }

    pub fn repetition(&self) -> Repetition {
        self.repetition
    }

    pub fn max_definition_level(&self) -> i16 {
        self.max_definition_level
    }

    pub fn max_repetition_level(&self) -> i16 {
        self.max_repetition_level
    }

    /// A column is nested when its flat name is a dotted path.
    pub fn is_nested(&self) -> bool {
        self.flat_name.contains('.')
    }

    /// Whether pages of this column carry definition levels.
    pub fn emits_definition_levels(&self) -> bool {
        self.is_nested() || self.repetition != Repetition::Required
    }

    /// Whether pages of this column carry repetition levels.
    pub fn emits_repetition_levels(&self) -> bool {
        self.is_nested() || self.repetition == Repetition::Repeated
    }
}

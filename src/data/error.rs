//! Error types returned when constructing or validating data.
use arrow::datatypes::DataType;
use itertools::Itertools;
use thiserror::Error;

/// Errors that can occur when constructing or validating frames and fields.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// There is a datatype mismatch in a field.
    ///
    /// This can happen when calling [`Field::set_values`][crate::data::Field::set_values]
    /// with an array whose datatype does not match the existing array.
    #[error(
        "Data type mismatch in field {} (existing: {existing:?}, new: {new:?})",
        field
    )]
    DataTypeMismatch {
        /// The existing datatype of the field.
        existing: DataType,
        /// The datatype of the new data.
        new: DataType,
        /// The name of the field.
        field: String,
    },

    /// Occurs when a frame had mismatched field lengths while checking.
    #[error(
        "Frame field length mismatch: {}",
        .lengths.iter().map(|x| format!("{} ({})", x.0, x.1)).join(", ")
    )]
    FieldLengthMismatch {
        /// The names and lengths of the fields in the `Frame`.
        lengths: Vec<(String, usize)>,
    },

    /// A field was created using an Arrow array with an unsupported datatype.
    #[error("Unsupported Arrow data type: {0:?}")]
    UnsupportedArrowDataType(DataType),
}

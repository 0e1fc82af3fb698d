//! Data types used throughout the pipeline.
//!
//! Note that several of the types in this module are marked as `#[non_exhaustive]`
//! and cannot be constructed using struct expressions, because fields may be
//! added at any time. Instead, use the constructor (if available) or create a
//! mutable default value using `Default::default()` and modify any fields.
//!
//! For example:
//!
//! ```
//! use panel_query_runner::{
//!     data::{DataTopic, Frame, Metadata},
//!     prelude::*,
//! };
//!
//! let mut metadata = Metadata::default();
//! metadata.data_topic = Some(DataTopic::Annotations);
//!
//! let frame = Frame::new("exemplars")
//!     .with_field([1_u32, 2, 3].into_field("x"))
//!     .with_metadata(metadata);
//! # assert_eq!(frame.meta.unwrap().data_topic, Some(DataTopic::Annotations));
//! ```

mod error;
mod field;
mod field_type;
mod frame;

pub use error::Error;
pub use field::*;
pub use field_type::{FieldType, IntoFieldType};
pub use frame::*;

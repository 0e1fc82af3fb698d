//! Frames: ordered collections of fields, with optional metadata.
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::skip_serializing_none;

use crate::data::{field::Field, Error};

/// A structured, two-dimensional data frame.
///
/// `Frame`s can be created manually using [`Frame::new`] if desired.
/// Alternatively, the [`IntoFrame`] trait (and its reciprocal, [`FromFields`])
/// provide a convenient way to create a frame from an iterator of [`Field`]s.
///
/// A frame may be in an intermediate state whilst being constructed (for
/// example, its field lengths may differ); [`Frame::check`] validates that
/// the frame is well formed before it is handed on through the pipeline.
///
/// # Examples
///
/// Creating a frame using [`Frame::new`]:
///
/// ```rust
/// use panel_query_runner::{data::Frame, prelude::*};
///
/// let field = [1_u32, 2, 3].into_field("x");
/// let frame = Frame::new("new")
///     .with_field(field);
/// ```
///
/// Using the [`IntoFrame`] trait:
///
/// ```rust
/// use panel_query_runner::prelude::*;
///
/// let frame = [
///     [1_u32, 2, 3].into_field("x"),
///     ["a", "b", "c"].into_field("y"),
/// ]
/// .into_frame("super convenient");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    /// The name of this frame.
    pub name: String,

    /// Optional metadata describing this frame.
    ///
    /// This can include custom metadata.
    pub meta: Option<Metadata>,

    /// The identifier of the query that produced this frame, if any.
    pub ref_id: Option<String>,

    /// The fields of this frame.
    ///
    /// The data in all fields must be of the same length, but may have different types.
    fields: Vec<Field>,
}

impl Frame {
    /// Create a new, empty `Frame` with no fields and no metadata.
    ///
    /// # Example
    ///
    /// ```rust
    /// use panel_query_runner::data::Frame;
    ///
    /// let frame = Frame::new("frame");
    /// assert_eq!(&frame.name, "frame");
    /// ```
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: vec![],
            meta: None,
            ref_id: None,
        }
    }

    /// Add a field to this frame.
    ///
    /// This is similar to [`Frame::with_field`] but takes the frame by mutable reference.
    pub fn add_field(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// Get an immutable reference to the `Field`s of this `Frame`.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Get a mutable reference to the `Field`s of this `Frame`.
    pub fn fields_mut(&mut self) -> &mut [Field] {
        &mut self.fields
    }

    /// Check that this frame is well formed.
    ///
    /// # Errors
    ///
    /// Returns an error if the fields of `self` do not all have the same length.
    ///
    /// # Example
    ///
    /// ```rust
    /// use panel_query_runner::prelude::*;
    ///
    /// assert!(
    ///     [
    ///         [1_u32, 2, 3].into_field("x"),
    ///         ["a", "b", "c"].into_field("y"),
    ///     ]
    ///     .into_frame("frame")
    ///     .check()
    ///     .is_ok()
    /// );
    ///
    /// assert!(
    ///     [
    ///         [1_u32, 2, 3, 4].into_field("x"),
    ///         ["a", "b", "c"].into_field("y"),
    ///     ]
    ///     .into_frame("frame")
    ///     .check()
    ///     .is_err()
    /// );
    /// ```
    pub fn check(&self) -> Result<(), Error> {
        if self.fields.iter().map(|x| x.values.len()).all_equal() {
            Ok(())
        } else {
            Err(Error::FieldLengthMismatch {
                lengths: self
                    .fields
                    .iter()
                    .map(|x| (x.name.to_string(), x.values.len()))
                    .collect(),
            })
        }
    }

    /// Return a new frame with the given name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Return a new frame with the given metadata.
    ///
    /// # Example
    ///
    /// ```rust
    /// use panel_query_runner::data::{DataTopic, Frame, Metadata};
    ///
    /// let mut metadata = Metadata::default();
    /// metadata.data_topic = Some(DataTopic::Annotations);
    /// let frame = Frame::new("frame").with_metadata(metadata);
    /// assert_eq!(frame.meta.unwrap().data_topic, Some(DataTopic::Annotations));
    /// ```
    #[must_use]
    pub fn with_metadata(mut self, metadata: impl Into<Option<Metadata>>) -> Self {
        self.meta = metadata.into();
        self
    }

    /// Return a new frame with the given query identifier.
    #[must_use]
    pub fn with_ref_id(mut self, ref_id: impl Into<String>) -> Self {
        self.ref_id = Some(ref_id.into());
        self
    }

    /// Return a new frame with an added field.
    #[must_use]
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Return a new frame with added fields.
    #[must_use]
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// The topic this frame's results are attached to, if any.
    ///
    /// Returns [`DataTopic::Annotations`] for frames which should be rendered
    /// as annotations rather than as series data.
    #[must_use]
    pub fn data_topic(&self) -> Option<DataTopic> {
        self.meta.as_ref().and_then(|m| m.data_topic)
    }
}

impl std::ops::Index<usize> for Frame {
    type Output = Field;
    fn index(&self, index: usize) -> &Self::Output {
        &self.fields()[index]
    }
}

impl std::ops::IndexMut<usize> for Frame {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.fields_mut()[index]
    }
}

/// Convenience trait for converting iterators of [`Field`]s into a [`Frame`].
#[cfg_attr(docsrs, doc(notable_trait))]
pub trait IntoFrame {
    /// Create a [`Frame`] with the given name from `self`.
    fn into_frame(self, name: impl Into<String>) -> Frame;
}

impl<T> IntoFrame for T
where
    T: IntoIterator<Item = Field>,
{
    fn into_frame(self, name: impl Into<String>) -> Frame {
        Frame {
            name: name.into(),
            fields: self.into_iter().collect(),
            meta: None,
            ref_id: None,
        }
    }
}

/// Convenience trait for creating a [`Frame`] from an iterator of [`Field`]s.
///
/// This is the inverse of [`IntoFrame`] and is defined for all implementors of that trait.
#[cfg_attr(docsrs, doc(notable_trait))]
pub trait FromFields<T: IntoFrame> {
    /// Create a [`Frame`] with the given name from `fields`.
    fn from_fields(name: impl Into<String>, fields: T) -> Frame;
}

impl<T: IntoFrame> FromFields<T> for Frame {
    fn from_fields(name: impl Into<String>, fields: T) -> Frame {
        fields.into_frame(name)
    }
}

/// The topic a frame's results are attached to.
///
/// This is a runtime-only classification: it tells the pipeline how the frame
/// should be routed (for example, annotation frames are delivered separately
/// from series data), and is never persisted as part of a saved query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum DataTopic {
    /// The frame contains annotation events rather than series data.
    Annotations,
}

/// Metadata about a [`Frame`].
#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Metadata {
    /// The topic the frame's results are attached to.
    #[serde(default)]
    pub data_topic: Option<DataTopic>,

    /// A browsable path on the datasource.
    #[serde(default)]
    pub path: Option<String>,

    /// Custom datasource specific values.
    #[serde(default)]
    pub custom: Option<Map<String, Value>>,

    /// Additional information about the data in the frame that can be displayed in the UI.
    #[serde(default)]
    pub notices: Option<Vec<Notice>>,

    /// The raw query sent to the underlying system after all macros and templating have been applied.
    #[serde(default)]
    pub executed_query_string: Option<String>,
}

/// A notification to be displayed in the UI alongside a frame.
#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Notice {
    /// The severity level of this notice.
    #[serde(default)]
    pub severity: Option<Severity>,

    /// Freeform descriptive text to display on the notice.
    pub text: String,

    /// An optional link to display in the UI.
    ///
    /// Can be an absolute URL or a path relative to the UI's root URL.
    #[serde(default)]
    pub link: Option<String>,
}

impl Notice {
    /// Create a new `Notice` with the given text.
    pub fn new(text: String) -> Self {
        Self {
            text,
            severity: None,
            link: None,
        }
    }
}

/// The severity level of a notice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub enum Severity {
    /// Informational severity.
    Info,
    /// Warning severity.
    Warning,
    /// Error severity.
    Error,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::prelude::*;

    #[test]
    fn check_accepts_equal_length_fields() {
        let frame = [
            [1_u32, 2, 3].into_field("x"),
            ["a", "b", "c"].into_field("y"),
        ]
        .into_frame("frame");
        assert!(frame.check().is_ok());
    }

    #[test]
    fn check_rejects_mismatched_field_lengths() {
        let frame = [
            [1_u32, 2].into_field("x"),
            ["a", "b", "c"].into_field("y"),
        ]
        .into_frame("frame");
        assert!(frame.check().is_err());
    }

    #[test]
    fn data_topic_is_read_from_metadata() {
        let mut meta = Metadata::default();
        meta.data_topic = Some(DataTopic::Annotations);
        let frame = Frame::new("events").with_metadata(meta);
        assert_eq!(frame.data_topic(), Some(DataTopic::Annotations));
        assert_eq!(Frame::new("plain").data_topic(), None);
    }
}

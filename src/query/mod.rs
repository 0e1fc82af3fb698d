//! The query model and request descriptors.
//!
//! A [`DataQuery`] is the persisted description of one named query within a
//! panel. At run time a set of queries is combined with a [`TimeRange`] and
//! some [`ScopedVars`] into a [`DataQueryRequest`] — the immutable descriptor
//! dispatched to a datasource — via [`build_request`].
//!
//! The [`interval`] submodule computes the suggested sampling interval for a
//! request, and [`template`] performs scoped-variable interpolation on
//! strings such as a minimum-interval override.
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::skip_serializing_none;

use crate::data::DataTopic;

pub mod interval;
mod request;
pub mod template;

pub use request::{build_request, CoreApp, DataQueryRequest, QueryRunnerOptions};

/// A named, datasource-scoped query.
///
/// These are the common properties available to all queries in all
/// datasources; datasource-specific properties travel in the flattened
/// [`other`][DataQuery::other] map.
///
/// # Example
///
/// ```rust
/// use panel_query_runner::query::DataQuery;
///
/// let query = DataQuery::new("A");
/// assert_eq!(query.ref_id, "A");
/// assert!(query.datasource.is_none());
/// ```
#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQuery {
    /// The unique identifier of the query within one run's query set.
    ///
    /// Conventionally an uppercase letter sequence: `A` - `Z`, then `AA`, ...
    pub ref_id: String,

    /// True if the query is disabled and should not be executed.
    #[serde(default)]
    pub hide: Option<bool>,

    /// Unique, guid-like string, used in explore mode.
    #[serde(default)]
    pub key: Option<String>,

    /// An identifier for the flavor of the query.
    #[serde(default)]
    pub query_type: Option<String>,

    /// The topic results of this query should be attached to.
    ///
    /// This is a runtime-only classification and is never persisted.
    #[serde(skip)]
    pub data_topic: Option<DataTopic>,

    /// The name of the datasource this query should be executed against.
    ///
    /// For mixed-datasource runs the selected datasource is on the query
    /// level; otherwise this is filled in with the run's resolved datasource
    /// before dispatch.
    #[serde(default)]
    pub datasource: Option<String>,

    /// Datasource-specific query properties.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl DataQuery {
    /// Create a new query with the given reference id.
    pub fn new(ref_id: impl Into<String>) -> Self {
        Self {
            ref_id: ref_id.into(),
            ..Default::default()
        }
    }
}

/// A mapping of template variable names to interpolation values, specific to
/// one run context.
pub type ScopedVars = HashMap<String, ScopedVar>;

/// A single template variable value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScopedVar {
    /// The display text of the variable.
    pub text: String,
    /// The value substituted during interpolation.
    pub value: Value,
}

impl ScopedVar {
    /// Create a new scoped variable whose value is the given text.
    ///
    /// # Example
    ///
    /// ```rust
    /// use panel_query_runner::query::ScopedVar;
    ///
    /// let var = ScopedVar::new("30s");
    /// assert_eq!(var.text, "30s");
    /// ```
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            value: Value::String(text.clone()),
            text,
        }
    }
}

/// The time range for a query run.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeRange {
    /// The start time of the query.
    pub from: DateTime<Utc>,
    /// The end time of the query.
    pub to: DateTime<Utc>,
    /// The raw, possibly relative, expression this range was computed from.
    pub raw: RawTimeRange,
}

impl TimeRange {
    /// Create an absolute time range.
    ///
    /// The raw expression is derived from the absolute timestamps; use
    /// [`TimeRange::with_raw`] to preserve a relative expression such as
    /// `now-6h`.
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from,
            to,
            raw: RawTimeRange {
                from: from.to_rfc3339(),
                to: to.to_rfc3339(),
            },
        }
    }

    /// Return a new range with the given raw expression.
    #[must_use]
    pub fn with_raw(mut self, raw: RawTimeRange) -> Self {
        self.raw = raw;
        self
    }

    /// The width of this range in milliseconds.
    ///
    /// Inverted ranges are clamped to zero.
    pub fn span_ms(&self) -> u64 {
        (self.to - self.from).num_milliseconds().max(0) as u64
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH, DateTime::<Utc>::UNIX_EPOCH)
    }
}

/// The textual expression a [`TimeRange`] was computed from, e.g. `now-6h` to `now`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTimeRange {
    /// The raw start expression.
    pub from: String,
    /// The raw end expression.
    pub to: String,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn data_topic_is_not_serialized() {
        let mut query = DataQuery::new("A");
        query.data_topic = Some(DataTopic::Annotations);
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json, serde_json::json!({"refId": "A"}));
    }

    #[test]
    fn datasource_specific_properties_are_flattened() {
        let json = serde_json::json!({
            "refId": "B",
            "queryType": "range",
            "expr": "up",
        });
        let query: DataQuery = serde_json::from_value(json).unwrap();
        assert_eq!(query.ref_id, "B");
        assert_eq!(query.query_type.as_deref(), Some("range"));
        assert_eq!(query.other["expr"], "up");
    }

    #[test]
    fn span_clamps_inverted_ranges() {
        let to = Utc::now();
        let from = to + chrono::Duration::hours(1);
        assert_eq!(TimeRange::new(from, to).span_ms(), 0);
    }
}

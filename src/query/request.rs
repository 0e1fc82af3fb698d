//! Request descriptors: the immutable record dispatched to a datasource.
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    datasource::DatasourceRef,
    query::{DataQuery, ScopedVars, TimeRange},
};

/// The context from which a query run originates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum CoreApp {
    /// A dashboard panel.
    Dashboard,
    /// The explore view.
    Explore,
    /// The panel editor.
    PanelEditor,
    /// A standalone panel viewer.
    PanelViewer,
    /// The origin of the run is not known.
    Unknown,
}

/// The caller-supplied configuration for one query execution.
///
/// Options are immutable once passed to
/// [`QueryRunner::run`][crate::runner::QueryRunner::run]; the query list is
/// cloned into the request descriptor so later mutation by the caller cannot
/// affect an in-flight request.
#[derive(Clone, Debug, Default)]
pub struct QueryRunnerOptions {
    /// The queries to execute.
    pub queries: Vec<DataQuery>,
    /// The timezone to interpret the time range in, e.g. `browser` or `utc`.
    pub timezone: String,
    /// The datasource to execute against.
    pub datasource: DatasourceRef,
    /// The id of the panel on whose behalf the run is made.
    pub panel_id: Option<i64>,
    /// The id of the dashboard on whose behalf the run is made.
    pub dashboard_id: Option<i64>,
    /// The application context of the run.
    ///
    /// Defaults to [`CoreApp::Unknown`] when absent.
    pub app: Option<CoreApp>,
    /// The time range of the run.
    pub time_range: TimeRange,
    /// Display text describing the time range, if any.
    pub time_info: Option<String>,
    /// How long results may be served from a cache.
    pub cache_timeout: Option<String>,
    /// The maximum number of data points a time series query should return.
    pub max_data_points: u64,
    /// A lower bound for the computed interval.
    ///
    /// Interpolated against the scoped variables before use; when absent the
    /// datasource's declared native interval is used instead.
    pub min_interval: Option<String>,
    /// Template variables scoped to this run.
    pub scoped_vars: ScopedVars,
}

/// The fully-resolved, immutable record sent to a datasource.
///
/// Created once per run invocation by [`build_request`] and never mutated
/// after dispatch. The interval fields are left empty by the builder and are
/// filled in by the coordinator once the datasource's native interval is
/// known.
#[derive(Clone, Debug)]
pub struct DataQueryRequest {
    /// The application context of the run.
    pub app: CoreApp,
    /// A unique identifier for this request.
    pub request_id: String,
    /// The timezone the time range is interpreted in.
    pub timezone: String,
    /// The id of the panel on whose behalf the run is made.
    pub panel_id: Option<i64>,
    /// The id of the dashboard on whose behalf the run is made.
    pub dashboard_id: Option<i64>,
    /// The resolved time range.
    pub range: TimeRange,
    /// Display text describing the time range, if any.
    pub time_info: Option<String>,
    /// The suggested sampling interval, as a duration string such as `30s`.
    pub interval: String,
    /// The suggested sampling interval, in milliseconds.
    pub interval_ms: u64,
    /// The queries to execute, tagged with a datasource name before dispatch.
    pub targets: Vec<DataQuery>,
    /// The maximum number of data points a time series query should return.
    pub max_data_points: u64,
    /// Template variables scoped to this run.
    ///
    /// The coordinator augments these with the computed `__interval` and
    /// `__interval_ms` variables before dispatch.
    pub scoped_vars: ScopedVars,
    /// How long results may be served from a cache.
    pub cache_timeout: Option<String>,
    /// When execution of this request started.
    pub start_time: DateTime<Utc>,
}

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(100);

/// Get a request id distinct from all others handed out by this process.
pub(crate) fn next_request_id() -> String {
    format!("Q{}", NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
}

/// Assemble a request descriptor from run options.
///
/// The query list is deep-copied so later mutation of the caller's list
/// cannot affect an in-flight request. The interval fields are zero/empty
/// pending computation by the coordinator.
///
/// # Example
///
/// ```rust
/// use panel_query_runner::query::{build_request, CoreApp, DataQuery, QueryRunnerOptions};
///
/// let options = QueryRunnerOptions {
///     queries: vec![DataQuery::new("A")],
///     timezone: "utc".to_string(),
///     max_data_points: 1000,
///     ..Default::default()
/// };
/// let request = build_request(&options);
/// assert_eq!(request.app, CoreApp::Unknown);
/// assert_eq!(request.interval, "");
/// assert_eq!(request.interval_ms, 0);
/// ```
pub fn build_request(options: &QueryRunnerOptions) -> DataQueryRequest {
    DataQueryRequest {
        app: options.app.unwrap_or(CoreApp::Unknown),
        request_id: next_request_id(),
        timezone: options.timezone.clone(),
        panel_id: options.panel_id,
        dashboard_id: options.dashboard_id,
        range: options.time_range.clone(),
        time_info: options.time_info.clone(),
        interval: String::new(),
        interval_ms: 0,
        targets: options.queries.clone(),
        max_data_points: options.max_data_points,
        scoped_vars: options.scoped_vars.clone(),
        cache_timeout: options.cache_timeout.clone(),
        start_time: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn request_ids_are_unique() {
        let a = next_request_id();
        let b = next_request_id();
        assert!(a.starts_with('Q'));
        assert!(b.starts_with('Q'));
        assert_ne!(a, b);
    }

    #[test]
    fn builder_applies_defaults() {
        let options = QueryRunnerOptions {
            queries: vec![DataQuery::new("A"), DataQuery::new("B")],
            ..Default::default()
        };
        let request = build_request(&options);
        assert_eq!(request.app, CoreApp::Unknown);
        assert!(request.scoped_vars.is_empty());
        assert_eq!(request.interval, "");
        assert_eq!(request.interval_ms, 0);
        assert_eq!(request.targets, options.queries);
    }

    #[test]
    fn builder_copies_the_query_list() {
        let mut options = QueryRunnerOptions {
            queries: vec![DataQuery::new("A")],
            ..Default::default()
        };
        let request = build_request(&options);
        options.queries[0].ref_id = "Z".to_string();
        assert_eq!(request.targets[0].ref_id, "A");
    }
}

//! Result snapshots delivered to panel subscribers.
use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use thiserror::Error;

use crate::{
    data::Frame,
    query::{DataQueryRequest, TimeRange},
};

/// The lifecycle state of a result snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadingState {
    /// Execution has not begun.
    NotStarted,
    /// A request is in flight and no (complete) results have arrived yet.
    Loading,
    /// Partial results have arrived and more are expected.
    Streaming,
    /// Execution finished successfully.
    Done,
    /// Execution failed; details are in the snapshot's error.
    Error,
}

/// An error reported by a datasource for a query.
///
/// These travel inside result snapshots rather than being thrown: subscribers
/// only ever observe well-formed snapshots whose state is
/// [`LoadingState::Error`].
#[skip_serializing_none]
#[derive(Clone, Debug, Error, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct DataQueryError {
    /// A human readable description of the failure.
    pub message: String,
    /// The query the error corresponds to, when attributable.
    #[serde(default)]
    pub ref_id: Option<String>,
}

impl DataQueryError {
    /// Create a new error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ref_id: None,
        }
    }

    /// Return a new error attributed to the given query.
    #[must_use]
    pub fn with_ref_id(mut self, ref_id: impl Into<String>) -> Self {
        self.ref_id = Some(ref_id.into());
        self
    }
}

/// Timing information recorded while post-processing a snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Timings {
    /// Time spent normalizing the snapshot's frames.
    pub data_processing_time: Duration,
}

/// A normalized result snapshot, as delivered to panel subscribers.
///
/// One snapshot exists as the "last result" of a
/// [`QueryRunner`][crate::runner::QueryRunner], superseded each time a new
/// snapshot arrives; subscribers receive their own clones and must treat them
/// as read-only.
#[derive(Clone, Debug)]
pub struct PanelData {
    /// Where execution of the run currently stands.
    pub state: LoadingState,
    /// The series data returned by the run so far.
    pub series: Vec<Frame>,
    /// Annotation frames, separated from the series data.
    pub annotations: Option<Vec<Frame>>,
    /// The error which put the snapshot in [`LoadingState::Error`], if any.
    pub error: Option<DataQueryError>,
    /// The request this snapshot is a result of.
    pub request: Option<Arc<DataQueryRequest>>,
    /// The time range the results cover.
    pub time_range: TimeRange,
    /// Monotonically non-decreasing counter, incremented whenever the shape
    /// of `series` differs from the previous snapshot's.
    ///
    /// `None` only before the first emission of a runner's lifetime.
    pub structure_rev: Option<u64>,
    /// Timing information recorded while normalizing this snapshot.
    pub timings: Option<Timings>,
}

impl PanelData {
    /// Create an empty snapshot in the given state.
    pub fn new(state: LoadingState, time_range: TimeRange) -> Self {
        Self {
            state,
            series: vec![],
            annotations: None,
            error: None,
            request: None,
            time_range,
            structure_rev: None,
            timings: None,
        }
    }
}

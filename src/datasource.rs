//! Traits connecting the pipeline to concrete datasources.
//!
//! A [`DataSourceApi`] is the query-execution entry point of one datasource
//! instance. Datasources are looked up through a [`DataSourceResolver`] — the
//! registry seam — unless the caller already holds an instance, in which case
//! [`DatasourceRef::Instance`] passes it through untouched.
use std::{fmt, pin::Pin, sync::Arc};

use async_trait::async_trait;
use futures_core::Stream;
use thiserror::Error;

use crate::{
    data::Frame,
    panel::{DataQueryError, LoadingState},
    query::{DataQueryRequest, ScopedVars},
};

/// One batch of results from a datasource.
///
/// A datasource emits zero or more of these per request; batches with the
/// same [`key`][DataQueryResponse::key] supersede each other, so a streaming
/// datasource can refresh one query's results without resending the rest.
#[derive(Clone, Debug, Default)]
pub struct DataQueryResponse {
    /// The frames returned in this batch.
    pub data: Vec<Frame>,
    /// Identifies which part of the request this batch replaces.
    ///
    /// Defaults to the first frame's `ref_id`, or `A`.
    pub key: Option<String>,
    /// The lifecycle state this batch leaves the run in.
    ///
    /// Defaults to [`LoadingState::Done`]; streaming datasources should set
    /// [`LoadingState::Streaming`] on intermediate batches.
    pub state: Option<LoadingState>,
    /// An error produced alongside (possibly partial) data.
    pub error: Option<DataQueryError>,
}

/// Type alias for a pinned, boxed stream of query response batches.
pub type BoxDataStream = Pin<Box<dyn Stream<Item = Result<DataQueryResponse, DataQueryError>> + Send>>;

/// A query-executing datasource instance.
///
/// Implementations fetch data from some external system. The returned stream
/// is the cancellation boundary: when the pipeline drops it, the
/// implementation must stop emitting and abandon any outstanding work.
pub trait DataSourceApi: Send + Sync {
    /// The display name of this datasource instance.
    fn name(&self) -> &str;

    /// The declared native collection interval of this datasource, if any.
    ///
    /// Used as the lower bound for computed sampling intervals when the
    /// caller supplies no explicit minimum.
    fn interval(&self) -> Option<&str> {
        None
    }

    /// Begin executing the queries in `request`.
    ///
    /// Emits zero or more response batches over time; the final batch (if the
    /// work completes) should carry a terminal lifecycle state. Errors are
    /// reported either per batch or by yielding an `Err`, which terminates
    /// the run.
    fn query(&self, request: Arc<DataQueryRequest>) -> BoxDataStream;
}

/// A registry which resolves datasource names to concrete instances.
#[async_trait]
pub trait DataSourceResolver: Send + Sync {
    /// Resolve `name` to a datasource instance.
    ///
    /// `None` requests the default datasource. The scoped variables are
    /// provided so registries can interpolate templated datasource names.
    async fn resolve(
        &self,
        name: Option<&str>,
        scoped_vars: &ScopedVars,
    ) -> Result<Arc<dyn DataSourceApi>, ResolveError>;
}

/// An error which can occur when resolving a datasource.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResolveError {
    /// No datasource with the requested name exists.
    #[error("datasource {name:?} was not found")]
    NotFound {
        /// The name that could not be resolved.
        name: Option<String>,
    },
    /// The registry failed for a reason other than an unknown name.
    #[error("error resolving datasource: {message}")]
    Internal {
        /// A description of the failure.
        message: String,
    },
}

/// The datasource a run should execute against.
///
/// Runs normally refer to a datasource by name and have it resolved through
/// the registry; callers which already hold an instance (explore flows, mixed
/// datasource fan-out) can pass it through directly.
#[derive(Clone)]
pub enum DatasourceRef {
    /// Resolve through the registry; `None` selects the default datasource.
    ByName(Option<String>),
    /// Use this already-resolved instance directly.
    Instance(Arc<dyn DataSourceApi>),
}

impl Default for DatasourceRef {
    fn default() -> Self {
        Self::ByName(None)
    }
}

impl DatasourceRef {
    /// Refer to a datasource by name.
    pub fn by_name(name: impl Into<String>) -> Self {
        Self::ByName(Some(name.into()))
    }
}

impl fmt::Debug for DatasourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByName(name) => f.debug_tuple("ByName").field(name).finish(),
            Self::Instance(ds) => f.debug_tuple("Instance").field(&ds.name()).finish(),
        }
    }
}

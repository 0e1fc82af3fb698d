/*! Query execution and result streaming for dashboard panels.

This crate implements the pipeline that sits between a dashboard panel and a
data-fetching datasource: it builds query requests, drives their execution,
normalizes the returned results, and republishes them to any number of
observers as a continuously updated stream. It is divided into five modules:

- [`data`] contains the fundamental data structures used throughout the
  pipeline, such as [`Frame`][data::Frame]s, [`Field`][data::Field]s, and
  their associated metadata.
- [`panel`] contains the [`PanelData`][panel::PanelData] result snapshot
  delivered to subscribers, along with its lifecycle state.
- [`query`] contains the query model and request descriptors, plus the
  interval calculation and template interpolation used while preparing a
  request.
- [`datasource`] contains the traits that connect the pipeline to concrete
  datasource implementations and to the registry that resolves them.
- [`runner`] contains the [`QueryRunner`][runner::QueryRunner], which
  coordinates execution: it guarantees at most one in-flight request,
  detects structural changes between successive result batches, and keeps
  late subscribers supplied with the most recent snapshot.

The [`prelude`] contains some useful unambiguous traits which are helpful
when creating some structures, particularly [`Frame`][data::Frame]s and
[`Field`][data::Field]s.

# Example

```rust,no_run
use std::sync::Arc;

use futures_util::StreamExt;
use panel_query_runner::{
    datasource::DataSourceResolver,
    query::{DataQuery, TimeRange},
    runner::{QueryRunner, QueryRunnerOptions},
};

# async fn example(resolver: Arc<dyn DataSourceResolver>, time_range: TimeRange) {
let mut runner = QueryRunner::new(resolver);
let mut panel_data = runner.get();
runner.run(QueryRunnerOptions {
    queries: vec![DataQuery::new("A")],
    timezone: "utc".to_string(),
    time_range,
    max_data_points: 1000,
    ..Default::default()
});
while let Some(data) = panel_data.next().await {
    println!("{:?} ({} series)", data.state, data.series.len());
}
# }
```
*/
#![cfg_attr(docsrs, feature(doc_notable_trait))]
#![deny(missing_docs)]

/// Re-export of the arrow crate depended on by this crate.
///
/// We recommend that you use this re-export rather than depending on arrow
/// directly to ensure compatibility; otherwise, rustc/cargo may emit mysterious
/// error messages.
pub use arrow;

pub mod data;
pub mod datasource;
pub mod panel;
pub mod query;
pub mod runner;

/// Contains useful helper traits for constructing [`Field`][data::Field]s and [`Frame`][data::Frame]s.
pub mod prelude {
    pub use crate::data::{ArrayIntoField, FromFields, IntoField, IntoFrame, IntoOptField};
}

/*! The run coordinator.

A [`QueryRunner`] owns the execution pipeline for one panel: it builds a
request from [`QueryRunnerOptions`], resolves the target datasource, drives
execution, and republishes every normalized snapshot to all subscribers of
[`QueryRunner::get`].

Guarantees:

- at most one execution is in flight per runner at any time — starting a new
  run releases the previous execution before anything else happens;
- subscribers only ever observe well-formed [`PanelData`] snapshots, never
  raw errors from the pipeline;
- a subscriber attaching after an emission immediately receives the most
  recent snapshot, without re-triggering execution.

# Example

```rust,no_run
use std::sync::Arc;

use futures_util::StreamExt;
use panel_query_runner::{
    datasource::{DataSourceResolver, DatasourceRef},
    query::{DataQuery, TimeRange},
    runner::{QueryRunner, QueryRunnerOptions},
};

# async fn example(resolver: Arc<dyn DataSourceResolver>, time_range: TimeRange) {
let mut runner = QueryRunner::new(resolver);
let mut subscription = runner.get();
runner.run(QueryRunnerOptions {
    queries: vec![DataQuery::new("A"), DataQuery::new("B")],
    timezone: "browser".to_string(),
    datasource: DatasourceRef::by_name("prometheus"),
    time_range,
    max_data_points: 1000,
    min_interval: Some("15s".to_string()),
    ..Default::default()
});
while let Some(data) = subscription.next().await {
    println!("{:?} rev {:?}", data.state, data.structure_rev);
}
# }
```
*/
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, PoisonError,
};

use futures_util::StreamExt;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::{
    datasource::{DataSourceApi, DataSourceResolver, DatasourceRef, ResolveError},
    panel::{LoadingState, PanelData},
    query::{build_request, interval, template, ScopedVar, ScopedVars},
};

mod compare;
mod process;
mod replay;
mod run_request;

pub use crate::query::QueryRunnerOptions;
pub use compare::{compare_array_values, compare_frame_structures};
pub use process::preprocess_panel_data;
pub use replay::{ReplayStream, ReplaySubject};
pub use run_request::run_request;

/// Coordinates query execution for one panel.
///
/// See the [module docs][self] for an overview and example.
pub struct QueryRunner {
    subject: ReplaySubject<PanelData>,
    subscription: Option<JoinHandle<()>>,
    last_result: Arc<Mutex<Option<PanelData>>>,
    resolver: Arc<dyn DataSourceResolver>,
    generation: Arc<AtomicU64>,
    destroyed: bool,
}

impl QueryRunner {
    /// Create a runner which resolves datasources through `resolver`.
    pub fn new(resolver: Arc<dyn DataSourceResolver>) -> Self {
        Self {
            subject: ReplaySubject::new(),
            subscription: None,
            last_result: Arc::new(Mutex::new(None)),
            resolver,
            generation: Arc::new(AtomicU64::new(0)),
            destroyed: false,
        }
    }

    /// Subscribe to this runner's result stream.
    ///
    /// The returned stream immediately yields the most recently emitted
    /// snapshot, if there is one, and then every future snapshot. Attaching a
    /// subscriber never triggers execution.
    pub fn get(&self) -> ReplayStream<PanelData> {
        self.subject.subscribe()
    }

    /// Start a new execution, cancelling any execution already in flight.
    ///
    /// The previous execution (if any) is released before the new one begins,
    /// so at most one execution is ever active and late results from a
    /// superseded run are never delivered to subscribers.
    ///
    /// Datasource resolution failures are logged and abandon the run without
    /// emitting; the previous snapshot remains visible to subscribers.
    /// Execution failures surface as snapshots in [`LoadingState::Error`].
    ///
    /// Must be called from within a Tokio runtime. Calling `run` on a
    /// destroyed runner is a programmer error; it logs and does nothing.
    pub fn run(&mut self, options: QueryRunnerOptions) {
        if self.destroyed {
            tracing::error!("run() called on a destroyed QueryRunner; ignoring");
            return;
        }
        if let Some(subscription) = self.subscription.take() {
            subscription.abort();
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let publisher = Publisher {
            subject: self.subject.clone(),
            last_result: Arc::clone(&self.last_result),
            current: Arc::clone(&self.generation),
            generation,
        };

        let mut request = build_request(&options);
        let resolver = Arc::clone(&self.resolver);
        let QueryRunnerOptions {
            datasource,
            time_range,
            max_data_points,
            min_interval,
            ..
        } = options;

        self.subscription = Some(tokio::spawn(async move {
            let datasource =
                match resolve_datasource(resolver.as_ref(), &datasource, &request.scoped_vars)
                    .await
                {
                    Ok(datasource) => datasource,
                    Err(error) => {
                        tracing::error!(%error, request_id = %request.request_id, "failed to resolve datasource");
                        return;
                    }
                };

            // Attach the datasource name to each query that has no explicit
            // override of its own.
            for query in &mut request.targets {
                if query.datasource.is_none() {
                    query.datasource = Some(datasource.name().to_string());
                }
            }

            let lower_limit = match &min_interval {
                Some(min_interval) => Some(template::replace(min_interval, &request.scoped_vars)),
                None => datasource.interval().map(str::to_string),
            };
            let values = match interval::calculate_interval(
                &time_range,
                max_data_points,
                lower_limit.as_deref(),
            ) {
                Ok(values) => values,
                Err(error) => {
                    tracing::error!(%error, request_id = %request.request_id, "failed to compute query interval");
                    return;
                }
            };

            // Shallow copy of the scoped vars, plus the built-in interval
            // variables; the caller's mapping is left untouched.
            let mut scoped_vars = request.scoped_vars.clone();
            scoped_vars.insert(
                "__interval".to_string(),
                ScopedVar::new(values.interval.clone()),
            );
            scoped_vars.insert(
                "__interval_ms".to_string(),
                ScopedVar {
                    text: values.interval_ms.to_string(),
                    value: Value::from(values.interval_ms),
                },
            );
            request.scoped_vars = scoped_vars;
            request.interval = values.interval;
            request.interval_ms = values.interval_ms;

            let mut results = Box::pin(run_request::run_request(datasource, request));
            while let Some(data) = results.next().await {
                publisher.publish(data);
            }
        }));
    }

    /// Cancel any in-flight execution.
    ///
    /// A no-op when idle. If the last emitted snapshot was still loading,
    /// a copy with its state forced to [`LoadingState::Done`] is republished
    /// so subscribers are not left believing a fetch is in progress; no other
    /// field is altered.
    pub fn cancel(&mut self) {
        let Some(subscription) = self.subscription.take() else {
            return;
        };
        subscription.abort();
        self.generation.fetch_add(1, Ordering::SeqCst);

        let done = {
            let last_result = lock(&self.last_result);
            last_result
                .as_ref()
                .filter(|last| last.state == LoadingState::Loading)
                .map(|last| {
                    let mut done = last.clone();
                    done.state = LoadingState::Done;
                    done
                })
        };
        if let Some(done) = done {
            self.subject.next(done);
        }
    }

    /// Tear the runner down.
    ///
    /// The output stream completes (late subscribers observe only
    /// end-of-stream), any in-flight execution is released, and the runner
    /// becomes unusable: subsequent [`run`][QueryRunner::run] calls are
    /// rejected.
    pub fn destroy(&mut self) {
        self.subject.complete();
        if let Some(subscription) = self.subscription.take() {
            subscription.abort();
        }
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.destroyed = true;
    }
}

impl Drop for QueryRunner {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.abort();
        }
    }
}

async fn resolve_datasource(
    resolver: &dyn DataSourceResolver,
    datasource: &DatasourceRef,
    scoped_vars: &ScopedVars,
) -> Result<Arc<dyn DataSourceApi>, ResolveError> {
    match datasource {
        DatasourceRef::Instance(datasource) => Ok(Arc::clone(datasource)),
        DatasourceRef::ByName(name) => resolver.resolve(name.as_deref(), scoped_vars).await,
    }
}

/// Delivers snapshots from one execution to the runner's subscribers.
///
/// Holds the generation it was created for; once the runner moves on
/// (another run, a cancel, destruction) publishing becomes a no-op, so an
/// execution that is mid-poll while being superseded cannot clobber the
/// stream.
struct Publisher {
    subject: ReplaySubject<PanelData>,
    last_result: Arc<Mutex<Option<PanelData>>>,
    current: Arc<AtomicU64>,
    generation: u64,
}

impl Publisher {
    fn publish(&self, data: PanelData) {
        let mut last_result = lock(&self.last_result);
        if self.current.load(Ordering::SeqCst) != self.generation {
            return;
        }

        let mut results = process::preprocess_panel_data(data, last_result.as_ref());

        // Indicate whether the structure has changed since the last emission.
        let mut structure_rev = 1;
        if let Some(previous_rev) = last_result.as_ref().and_then(|last| last.structure_rev) {
            structure_rev = previous_rev;
            let previous = last_result.as_ref().map(|last| last.series.as_slice());
            let same_structure = compare::compare_array_values(
                &results.series,
                previous.unwrap_or_default(),
                compare::compare_frame_structures,
            );
            if !same_structure {
                structure_rev += 1;
            }
        }
        results.structure_rev = Some(structure_rev);

        *last_result = Some(results.clone());
        drop(last_result);
        self.subject.next(results);
    }
}

fn lock(
    last_result: &Mutex<Option<PanelData>>,
) -> std::sync::MutexGuard<'_, Option<PanelData>> {
    last_result.lock().unwrap_or_else(PoisonError::into_inner)
}

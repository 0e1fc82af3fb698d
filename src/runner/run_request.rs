//! Driving a datasource's query execution.
use std::{collections::BTreeMap, sync::Arc};

use futures_core::Stream;
use futures_util::{future, stream, StreamExt};

use crate::{
    data::Frame,
    datasource::{DataQueryResponse, DataSourceApi},
    panel::{LoadingState, PanelData},
    query::DataQueryRequest,
};

/// Accumulated execution state for one request.
struct RunningQueryState {
    packets: BTreeMap<String, DataQueryResponse>,
    panel_data: PanelData,
    errored: bool,
}

/// Execute `request` against `datasource`, emitting a result snapshot for
/// every response batch.
///
/// The first emission is always a `Loading` snapshot with no data, produced
/// before the datasource has answered. Batches with the same key supersede
/// each other in the accumulated state; each emission combines all batches
/// received so far, in key order. A batch-level error marks the snapshot with
/// [`LoadingState::Error`]; an error yielded by the datasource stream itself
/// additionally terminates execution.
///
/// Dropping the returned stream drops the datasource stream, which is how
/// cancellation reaches the datasource.
pub fn run_request(
    datasource: Arc<dyn DataSourceApi>,
    request: DataQueryRequest,
) -> impl Stream<Item = PanelData> + Send {
    let request = Arc::new(request);
    let mut initial = PanelData::new(LoadingState::Loading, request.range.clone());
    initial.request = Some(Arc::clone(&request));

    tracing::debug!(
        request_id = %request.request_id,
        datasource = %datasource.name(),
        queries = request.targets.len(),
        "executing query request"
    );

    let state = RunningQueryState {
        packets: BTreeMap::new(),
        panel_data: initial.clone(),
        errored: false,
    };
    let responses = datasource.query(Arc::clone(&request));
    let updates = responses.scan(state, move |state, packet| {
        if state.errored {
            return future::ready(None);
        }
        let data = match packet {
            Ok(packet) => process_response_packet(packet, state, &request),
            Err(error) => {
                tracing::debug!(
                    request_id = %request.request_id,
                    %error,
                    "query execution failed"
                );
                state.errored = true;
                let mut results = state.panel_data.clone();
                results.state = LoadingState::Error;
                results.error = Some(error);
                state.panel_data = results.clone();
                results
            }
        };
        future::ready(Some(data))
    });
    stream::once(future::ready(initial)).chain(updates)
}

fn process_response_packet(
    packet: DataQueryResponse,
    state: &mut RunningQueryState,
    request: &Arc<DataQueryRequest>,
) -> PanelData {
    let key = packet
        .key
        .clone()
        .or_else(|| packet.data.first().and_then(|frame| frame.ref_id.clone()))
        .unwrap_or_else(|| "A".to_string());
    let loading_state = if packet.error.is_some() {
        LoadingState::Error
    } else {
        packet.state.unwrap_or(LoadingState::Done)
    };
    state.packets.insert(key, packet);

    let series: Vec<Frame> = state
        .packets
        .values()
        .flat_map(|packet| packet.data.iter().cloned())
        .collect();
    let error = state
        .packets
        .values()
        .find_map(|packet| packet.error.clone());

    let mut results = PanelData::new(loading_state, request.range.clone());
    results.series = series;
    results.error = error;
    results.request = Some(Arc::clone(request));
    state.panel_data = results.clone();
    results
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        datasource::BoxDataStream,
        panel::DataQueryError,
        prelude::*,
        query::{build_request, QueryRunnerOptions},
    };

    struct ScriptedDataSource {
        packets: std::sync::Mutex<Vec<Result<DataQueryResponse, DataQueryError>>>,
    }

    impl ScriptedDataSource {
        fn new(packets: Vec<Result<DataQueryResponse, DataQueryError>>) -> Arc<Self> {
            Arc::new(Self {
                packets: std::sync::Mutex::new(packets),
            })
        }
    }

    impl DataSourceApi for ScriptedDataSource {
        fn name(&self) -> &str {
            "scripted"
        }

        fn query(&self, _request: Arc<DataQueryRequest>) -> BoxDataStream {
            let packets = std::mem::take(&mut *self.packets.lock().unwrap());
            Box::pin(futures::stream::iter(packets))
        }
    }

    fn response(key: &str, frame_name: &str) -> DataQueryResponse {
        DataQueryResponse {
            data: vec![[[1_u32, 2].into_field("x")].into_frame(frame_name)],
            key: Some(key.to_string()),
            state: None,
            error: None,
        }
    }

    fn request() -> DataQueryRequest {
        build_request(&QueryRunnerOptions::default())
    }

    #[tokio::test]
    async fn emits_an_initial_loading_snapshot() {
        let datasource = ScriptedDataSource::new(vec![]);
        let emissions: Vec<_> = run_request(datasource, request()).collect().await;
        assert_eq!(emissions.len(), 1);
        assert_eq!(emissions[0].state, LoadingState::Loading);
        assert!(emissions[0].series.is_empty());
        assert!(emissions[0].request.is_some());
    }

    #[tokio::test]
    async fn combines_packets_by_key() {
        let datasource = ScriptedDataSource::new(vec![
            Ok(response("A", "first")),
            Ok(response("B", "second")),
            // Replaces the first packet under key "A".
            Ok(response("A", "third")),
        ]);
        let emissions: Vec<_> = run_request(datasource, request()).collect().await;
        assert_eq!(emissions.len(), 4);
        assert_eq!(emissions[1].series.len(), 1);
        assert_eq!(emissions[2].series.len(), 2);
        let names: Vec<_> = emissions[3].series.iter().map(|f| f.name.clone()).collect();
        assert_eq!(names, vec!["third".to_string(), "second".to_string()]);
        assert_eq!(emissions[3].state, LoadingState::Done);
    }

    #[tokio::test]
    async fn packet_state_overrides_the_default() {
        let mut streaming = response("A", "partial");
        streaming.state = Some(LoadingState::Streaming);
        let datasource = ScriptedDataSource::new(vec![Ok(streaming), Ok(response("A", "full"))]);
        let emissions: Vec<_> = run_request(datasource, request()).collect().await;
        assert_eq!(emissions[1].state, LoadingState::Streaming);
        assert_eq!(emissions[2].state, LoadingState::Done);
    }

    #[tokio::test]
    async fn packet_errors_mark_the_snapshot() {
        let mut failed = response("A", "partial");
        failed.error = Some(DataQueryError::new("query timed out").with_ref_id("A"));
        let datasource = ScriptedDataSource::new(vec![Ok(failed)]);
        let emissions: Vec<_> = run_request(datasource, request()).collect().await;
        assert_eq!(emissions[1].state, LoadingState::Error);
        assert_eq!(
            emissions[1].error.as_ref().unwrap().message,
            "query timed out"
        );
    }

    #[tokio::test]
    async fn stream_errors_terminate_execution() {
        let datasource = ScriptedDataSource::new(vec![
            Ok(response("A", "first")),
            Err(DataQueryError::new("connection reset")),
            // Never observed: the error ends the stream.
            Ok(response("B", "second")),
        ]);
        let emissions: Vec<_> = run_request(datasource, request()).collect().await;
        assert_eq!(emissions.len(), 3);
        let last = emissions.last().unwrap();
        assert_eq!(last.state, LoadingState::Error);
        assert_eq!(last.error.as_ref().unwrap().message, "connection reset");
        // The partial results remain attached to the error snapshot.
        assert_eq!(last.series.len(), 1);
    }
}

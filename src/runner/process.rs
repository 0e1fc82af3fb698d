//! Normalization of raw result snapshots.
use std::time::Instant;

use crate::{
    data::{DataTopic, Frame},
    panel::{LoadingState, PanelData, Timings},
};

/// Normalize a raw snapshot into the canonical shape delivered to subscribers.
///
/// Loading snapshots with no data yet inherit the previous snapshot's series
/// and annotations, so a panel keeps showing its old data while a refresh is
/// in flight. For all other snapshots, every frame is validated; frames that
/// fail validation are dropped with a warning rather than failing the run,
/// and frames tagged with [`DataTopic::Annotations`] are separated out of the
/// series into the annotations collection. The time spent is recorded in the
/// snapshot's timings.
///
/// This function never fails: malformed input degrades to an empty series.
pub fn preprocess_panel_data(data: PanelData, last_result: Option<&PanelData>) -> PanelData {
    // While loading, keep whatever the panel was already showing.
    if data.state == LoadingState::Loading && data.series.is_empty() {
        let Some(last_result) = last_result else {
            return data;
        };
        let mut results = data;
        results.series = last_result.series.clone();
        results.annotations = last_result.annotations.clone();
        results.state = LoadingState::Loading;
        return results;
    }

    let started = Instant::now();
    let mut results = data;
    let mut series = Vec::with_capacity(results.series.len());
    let mut annotations: Vec<Frame> = results
        .annotations
        .take()
        .unwrap_or_default()
        .into_iter()
        .filter(well_formed)
        .collect();
    for frame in results.series.drain(..) {
        if !well_formed(&frame) {
            continue;
        }
        match frame.data_topic() {
            Some(DataTopic::Annotations) => annotations.push(frame),
            _ => series.push(frame),
        }
    }
    results.series = series;
    results.annotations = (!annotations.is_empty()).then_some(annotations);
    results.timings = Some(Timings {
        data_processing_time: started.elapsed(),
    });
    results
}

fn well_formed(frame: &Frame) -> bool {
    match frame.check() {
        Ok(()) => true,
        Err(error) => {
            tracing::warn!(frame = %frame.name, %error, "dropping malformed frame from results");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        data::Metadata,
        prelude::*,
        query::TimeRange,
    };

    fn snapshot(state: LoadingState, series: Vec<Frame>) -> PanelData {
        let mut data = PanelData::new(state, TimeRange::default());
        data.series = series;
        data
    }

    fn annotation_frame(name: &str) -> Frame {
        let mut meta = Metadata::default();
        meta.data_topic = Some(DataTopic::Annotations);
        [[1_u32, 2].into_field("time")]
            .into_frame(name)
            .with_metadata(meta)
    }

    #[test]
    fn empty_loading_snapshot_inherits_previous_results() {
        let mut previous = snapshot(
            LoadingState::Done,
            vec![[[1_u32, 2].into_field("x")].into_frame("old")],
        );
        previous.annotations = Some(vec![annotation_frame("events")]);

        let results = preprocess_panel_data(
            snapshot(LoadingState::Loading, vec![]),
            Some(&previous),
        );
        assert_eq!(results.state, LoadingState::Loading);
        assert_eq!(results.series, previous.series);
        assert_eq!(results.annotations, previous.annotations);
    }

    #[test]
    fn empty_loading_snapshot_without_history_is_unchanged() {
        let results = preprocess_panel_data(snapshot(LoadingState::Loading, vec![]), None);
        assert_eq!(results.state, LoadingState::Loading);
        assert!(results.series.is_empty());
        assert!(results.timings.is_none());
    }

    #[test]
    fn annotation_frames_are_separated_from_series() {
        let results = preprocess_panel_data(
            snapshot(
                LoadingState::Done,
                vec![
                    [[1_u32, 2].into_field("x")].into_frame("data"),
                    annotation_frame("events"),
                ],
            ),
            None,
        );
        assert_eq!(results.series.len(), 1);
        assert_eq!(results.series[0].name, "data");
        let annotations = results.annotations.unwrap();
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].name, "events");
    }

    #[test]
    fn malformed_frames_are_dropped() {
        let malformed = [
            [1_u32, 2, 3].into_field("x"),
            ["a", "b"].into_field("y"),
        ]
        .into_frame("broken");
        let results = preprocess_panel_data(
            snapshot(
                LoadingState::Done,
                vec![malformed, [[1_u32].into_field("x")].into_frame("fine")],
            ),
            None,
        );
        assert_eq!(results.series.len(), 1);
        assert_eq!(results.series[0].name, "fine");
    }

    #[test]
    fn processing_time_is_recorded() {
        let results = preprocess_panel_data(snapshot(LoadingState::Done, vec![]), None);
        assert!(results.timings.is_some());
    }
}

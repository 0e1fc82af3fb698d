//! Structural comparison of successive result batches.
//!
//! Downstream consumers (field option mappers, panel renderers) can often
//! reuse expensive work when only the values of a result set changed. The
//! comparisons here decide whether a new batch must instead be treated as a
//! structural change; they feed the `structure_rev` counter on
//! [`PanelData`][crate::panel::PanelData].
use crate::data::Frame;

/// Compare two sequences pairwise with the given predicate.
///
/// Returns `true` iff the sequences have the same length and `predicate`
/// holds for every corresponding pair.
pub fn compare_array_values<T>(a: &[T], b: &[T], predicate: impl Fn(&T, &T) -> bool) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| predicate(x, y))
}

/// Check whether two frames have the same structure.
///
/// Two frames are structurally identical iff they have the same field count
/// and each corresponding pair of fields has the same name and data type.
/// Values, labels and display configuration are not considered; field
/// reordering counts as a structural change.
///
/// # Example
///
/// ```rust
/// use panel_query_runner::{prelude::*, runner::compare_frame_structures};
///
/// let a = [[1_u32, 2].into_field("x")].into_frame("a");
/// let b = [[7_u32, 8].into_field("x")].into_frame("b");
/// let c = [[1.0_f64, 2.0].into_field("x")].into_frame("c");
///
/// assert!(compare_frame_structures(&a, &b));
/// assert!(!compare_frame_structures(&a, &c));
/// ```
pub fn compare_frame_structures(a: &Frame, b: &Frame) -> bool {
    compare_array_values(a.fields(), b.fields(), |x, y| {
        x.name == y.name && x.data_type() == y.data_type()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;

    fn frame(fields: Vec<crate::data::Field>) -> Frame {
        fields.into_frame("test")
    }

    #[test]
    fn identical_shapes_compare_equal() {
        let a = frame(vec![
            [1_u32, 2].into_field("time"),
            ["a", "b"].into_field("value"),
        ]);
        let b = frame(vec![
            [3_u32, 4].into_field("time"),
            ["c", "d"].into_field("value"),
        ]);
        assert!(compare_frame_structures(&a, &b));
    }

    #[test]
    fn field_count_difference_is_structural() {
        let a = frame(vec![[1_u32, 2].into_field("x")]);
        let b = frame(vec![
            [1_u32, 2].into_field("x"),
            [1_u32, 2].into_field("y"),
        ]);
        assert!(!compare_frame_structures(&a, &b));
    }

    #[test]
    fn field_rename_is_structural() {
        let a = frame(vec![[1_u32, 2].into_field("x")]);
        let b = frame(vec![[1_u32, 2].into_field("y")]);
        assert!(!compare_frame_structures(&a, &b));
    }

    #[test]
    fn field_reorder_is_structural() {
        let a = frame(vec![
            [1_u32, 2].into_field("x"),
            ["a", "b"].into_field("y"),
        ]);
        let b = frame(vec![
            ["a", "b"].into_field("y"),
            [1_u32, 2].into_field("x"),
        ]);
        assert!(!compare_frame_structures(&a, &b));
    }

    #[test]
    fn type_change_is_structural() {
        let a = frame(vec![[1_u32, 2].into_field("x")]);
        let b = frame(vec![[1.0_f64, 2.0].into_field("x")]);
        assert!(!compare_frame_structures(&a, &b));
    }

    #[test]
    fn sequences_of_unequal_length_differ() {
        let a = frame(vec![[1_u32].into_field("x")]);
        assert!(!compare_array_values(
            &[a.clone()],
            &[a.clone(), a],
            compare_frame_structures
        ));
        let empty: [Frame; 0] = [];
        assert!(compare_array_values(&empty, &empty, compare_frame_structures));
    }
}

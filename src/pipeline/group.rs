//! Spatial grouping: chain a page's image boxes into composite figures.
//!
//! Multi-panel figures are often embedded as several images placed side by
//! side. Boxes are visited in reading order (top edge, then left edge) and
//! each one is compared with the **last** member of the group being built:
//!
//! * same row: `|box.top − last.top| < row`
//! * close   : `box.left − last.right < gap`
//!
//! Both must hold to extend the group; otherwise the group is closed and the
//! box starts a new one. Only an upper bound is placed on the gap, so
//! touching or overlapping boxes always join. Because each box is compared
//! with its predecessor only, membership chains: A–B close and B–C close
//! puts A, B and C in one group even when A and C are far apart. Existing
//! caption maps were produced with this rule and depend on it.

use crate::config::{DEFAULT_GAP_TOLERANCE, DEFAULT_ROW_TOLERANCE};
use crate::geometry::{BoundingBox, MergedRegion};
use std::cmp::Ordering;
use tracing::debug;

/// Row and gap tolerances for [`group_boxes`], in page points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupingTolerances {
    pub row: f64,
    pub gap: f64,
}

impl Default for GroupingTolerances {
    fn default() -> Self {
        Self {
            row: DEFAULT_ROW_TOLERANCE,
            gap: DEFAULT_GAP_TOLERANCE,
        }
    }
}

/// The boxes of one logical figure, in the order they were chained.
///
/// Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageGroup {
    first: BoundingBox,
    rest: Vec<BoundingBox>,
}

impl ImageGroup {
    fn start(first: BoundingBox) -> Self {
        Self {
            first,
            rest: Vec::new(),
        }
    }

    fn last(&self) -> &BoundingBox {
        self.rest.last().unwrap_or(&self.first)
    }

    fn accepts(&self, bbox: &BoundingBox, tol: GroupingTolerances) -> bool {
        let last = self.last();
        let same_row = (bbox.top() - last.top()).abs() < tol.row;
        let close_enough = bbox.left() - last.right() < tol.gap;
        same_row && close_enough
    }

    /// Members in chaining order.
    pub fn boxes(&self) -> impl Iterator<Item = &BoundingBox> {
        std::iter::once(&self.first).chain(self.rest.iter())
    }

    pub fn len(&self) -> usize {
        1 + self.rest.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Bounding rectangle of every member.
    pub fn merged_region(&self) -> MergedRegion {
        self.rest
            .iter()
            .fold(MergedRegion::of(&self.first), |acc, b| acc.expanded_to(b))
    }
}

/// Partition `boxes` into figure groups.
///
/// Every input box lands in exactly one group; groups come out in reading
/// order. The input slice is not modified.
pub fn group_boxes(boxes: &[BoundingBox], tol: GroupingTolerances) -> Vec<ImageGroup> {
    let mut sorted = boxes.to_vec();
    sorted.sort_by(|a, b| {
        let (a_top, a_left) = a.reading_order_key();
        let (b_top, b_left) = b.reading_order_key();
        cmp_f64(a_top, b_top).then_with(|| cmp_f64(a_left, b_left))
    });

    let mut groups = Vec::new();
    let mut current: Option<ImageGroup> = None;

    for bbox in sorted {
        match current.as_mut() {
            Some(group) if group.accepts(&bbox, tol) => group.rest.push(bbox),
            _ => {
                if let Some(done) = current.replace(ImageGroup::start(bbox)) {
                    groups.push(done);
                }
            }
        }
    }
    groups.extend(current);

    debug!("Grouped {} boxes into {} figures", boxes.len(), groups.len());
    groups
}

// Numeric comparison where -0.0 == 0.0; the collector has already dropped
// non-finite boxes.
fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn bbox(left: f64, top: f64, right: f64, bottom: f64) -> BoundingBox {
        BoundingBox::new(left, top, right, bottom)
    }

    fn lefts(group: &ImageGroup) -> Vec<f64> {
        group.boxes().map(|b| b.left()).collect()
    }

    #[test]
    fn side_by_side_panels_form_one_group() {
        let boxes = [bbox(50.0, 100.0, 250.0, 300.0), bbox(260.0, 100.0, 460.0, 300.0)];
        let groups = group_boxes(&boxes, GroupingTolerances::default());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(
            groups[0].merged_region(),
            MergedRegion {
                left: 50.0,
                top: 100.0,
                right: 460.0,
                bottom: 300.0
            }
        );
    }

    #[test]
    fn far_apart_on_same_row_are_separate() {
        let boxes = [bbox(0.0, 100.0, 100.0, 200.0), bbox(400.0, 100.0, 500.0, 200.0)];
        let groups = group_boxes(&boxes, GroupingTolerances::default());
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn gap_equal_to_tolerance_is_excluded() {
        // left − right == 100 exactly: strict `<` keeps them apart.
        let boxes = [bbox(0.0, 0.0, 100.0, 50.0), bbox(200.0, 0.0, 300.0, 50.0)];
        assert_eq!(group_boxes(&boxes, GroupingTolerances::default()).len(), 2);

        let boxes = [bbox(0.0, 0.0, 100.0, 50.0), bbox(199.9, 0.0, 300.0, 50.0)];
        assert_eq!(group_boxes(&boxes, GroupingTolerances::default()).len(), 1);
    }

    #[test]
    fn row_difference_equal_to_tolerance_is_excluded() {
        let boxes = [bbox(0.0, 0.0, 100.0, 50.0), bbox(110.0, 80.0, 200.0, 150.0)];
        assert_eq!(group_boxes(&boxes, GroupingTolerances::default()).len(), 2);

        let boxes = [bbox(0.0, 0.0, 100.0, 50.0), bbox(110.0, 79.0, 200.0, 150.0)];
        assert_eq!(group_boxes(&boxes, GroupingTolerances::default()).len(), 1);
    }

    #[test]
    fn overlapping_boxes_always_join() {
        let boxes = [bbox(0.0, 0.0, 300.0, 100.0), bbox(50.0, 10.0, 120.0, 60.0)];
        assert_eq!(group_boxes(&boxes, GroupingTolerances::default()).len(), 1);
    }

    #[test]
    fn membership_chains_through_intermediate_boxes() {
        // 1–2 close, 2–3 close, 1–3 far apart.
        let boxes = [
            bbox(0.0, 0.0, 100.0, 100.0),
            bbox(150.0, 0.0, 250.0, 100.0),
            bbox(300.0, 0.0, 400.0, 100.0),
        ];
        let groups = group_boxes(&boxes, GroupingTolerances::default());
        assert_eq!(groups.len(), 1);
        assert_eq!(lefts(&groups[0]), vec![0.0, 150.0, 300.0]);
    }

    #[test]
    fn chain_compares_with_last_member_row_too() {
        // Each step drifts 60 down: within 80 of the previous, 120 from the first.
        let boxes = [
            bbox(0.0, 0.0, 100.0, 50.0),
            bbox(110.0, 60.0, 200.0, 110.0),
            bbox(210.0, 120.0, 300.0, 170.0),
        ];
        assert_eq!(group_boxes(&boxes, GroupingTolerances::default()).len(), 1);
    }

    #[test]
    fn stray_box_forms_its_own_group() {
        let boxes = [
            bbox(0.0, 0.0, 100.0, 100.0),
            bbox(120.0, 0.0, 220.0, 100.0),
            bbox(0.0, 500.0, 100.0, 600.0),
        ];
        let groups = group_boxes(&boxes, GroupingTolerances::default());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].len(), 1);
    }

    #[test]
    fn input_order_does_not_matter() {
        let a = bbox(0.0, 0.0, 100.0, 100.0);
        let b = bbox(120.0, 0.0, 220.0, 100.0);
        let c = bbox(0.0, 300.0, 100.0, 400.0);
        let forward = group_boxes(&[a, b, c], GroupingTolerances::default());
        let backward = group_boxes(&[c, b, a], GroupingTolerances::default());
        assert_eq!(forward, backward);
        assert_eq!(lefts(&forward[0]), vec![0.0, 120.0]);
    }

    #[test]
    fn sort_uses_rounded_top_then_left() {
        // Tops 10.4 and 9.6 both round to 10, so left decides the order.
        let right_first = bbox(150.0, 9.6, 250.0, 100.0);
        let left_second = bbox(0.0, 10.4, 100.0, 100.0);
        let groups = group_boxes(&[right_first, left_second], GroupingTolerances::default());
        assert_eq!(groups.len(), 1);
        assert_eq!(lefts(&groups[0]), vec![0.0, 150.0]);
    }

    #[test]
    fn empty_input_yields_no_groups() {
        assert!(group_boxes(&[], GroupingTolerances::default()).is_empty());
    }

    #[test]
    fn custom_tolerances_apply() {
        let boxes = [bbox(0.0, 0.0, 100.0, 50.0), bbox(130.0, 0.0, 200.0, 50.0)];
        let tight = GroupingTolerances { row: 80.0, gap: 20.0 };
        assert_eq!(group_boxes(&boxes, tight).len(), 2);
    }

    fn boxes_strategy() -> impl Strategy<Value = Vec<BoundingBox>> {
        prop::collection::vec(
            (0.0..600.0f64, 0.0..800.0f64, 1.0..200.0f64, 1.0..200.0f64)
                .prop_map(|(x, y, w, h)| BoundingBox::new(x, y, x + w, y + h)),
            1..25,
        )
    }

    fn key(b: &BoundingBox) -> [u64; 4] {
        [
            b.left().to_bits(),
            b.top().to_bits(),
            b.right().to_bits(),
            b.bottom().to_bits(),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_every_box_in_exactly_one_group(boxes in boxes_strategy()) {
            let groups = group_boxes(&boxes, GroupingTolerances::default());
            prop_assert!(groups.iter().all(|g| g.len() >= 1));

            let mut seen: Vec<[u64; 4]> = groups.iter().flat_map(|g| g.boxes().map(key)).collect();
            let mut expected: Vec<[u64; 4]> = boxes.iter().map(key).collect();
            seen.sort_unstable();
            expected.sort_unstable();
            prop_assert_eq!(seen, expected);
        }

        #[test]
        fn prop_grouping_is_deterministic(boxes in boxes_strategy()) {
            let first = group_boxes(&boxes, GroupingTolerances::default());
            let second = group_boxes(&boxes, GroupingTolerances::default());
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_consecutive_members_satisfy_predicate(boxes in boxes_strategy()) {
            let tol = GroupingTolerances::default();
            for group in group_boxes(&boxes, tol) {
                let members: Vec<&BoundingBox> = group.boxes().collect();
                for pair in members.windows(2) {
                    prop_assert!((pair[1].top() - pair[0].top()).abs() < tol.row);
                    prop_assert!(pair[1].left() - pair[0].right() < tol.gap);
                }
            }
        }

        #[test]
        fn prop_merged_region_is_min_max(boxes in boxes_strategy()) {
            for group in group_boxes(&boxes, GroupingTolerances::default()) {
                let members: Vec<BoundingBox> = group.boxes().copied().collect();
                prop_assert_eq!(Some(group.merged_region()), MergedRegion::enclosing(&members));
            }
        }
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Corner normalization: put four unordered points into canonical
// top-left, top-right, bottom-right, bottom-left order.

use std::cmp::Ordering;

use scanwerk_core::{CornerSet, Point};

/// Order four points as TL, TR, BR, BL.
///
/// The two points with the smallest y form the top pair; the smaller x of
/// that pair is top-left. Of the bottom pair, the larger x is bottom-right.
/// Ties are broken on the other axis, so the result is the same for every
/// permutation of the input.
pub fn normalize_corners(points: [Point; 4]) -> CornerSet {
    let mut sorted = points;
    sorted.sort_by(by_y_then_x);

    let (top, bottom) = sorted.split_at_mut(2);
    top.sort_by(by_x_then_y);
    bottom.sort_by(by_x_then_y);

    CornerSet::new([top[0], top[1], bottom[1], bottom[0]])
}

/// Same as [`normalize_corners`], for `(x, y)` tuples.
pub fn normalize_tuples(points: [(f32, f32); 4]) -> CornerSet {
    normalize_corners(points.map(Point::from))
}

fn by_y_then_x(a: &Point, b: &Point) -> Ordering {
    a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x))
}

fn by_x_then_y(a: &Point, b: &Point) -> Ordering {
    a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// All 24 orderings of four items.
    fn permutations(points: [Point; 4]) -> Vec<[Point; 4]> {
        let mut out = Vec::with_capacity(24);
        for a in 0..4 {
            for b in 0..4 {
                for c in 0..4 {
                    for d in 0..4 {
                        let idx = [a, b, c, d];
                        let distinct = (0..4).all(|i| (i + 1..4).all(|j| idx[i] != idx[j]));
                        if distinct {
                            out.push(idx.map(|i| points[i]));
                        }
                    }
                }
            }
        }
        out
    }

    #[test]
    fn shuffled_rectangle_is_ordered() {
        let corners = normalize_tuples([(300.0, 400.0), (10.0, 20.0), (10.0, 400.0), (300.0, 20.0)]);
        assert_eq!(
            corners.to_tuples(),
            [(10.0, 20.0), (300.0, 20.0), (300.0, 400.0), (10.0, 400.0)]
        );
    }

    #[test]
    fn tilted_quad_is_ordered() {
        let corners = normalize_tuples([(60.0, 380.0), (330.0, 90.0), (80.0, 60.0), (300.0, 420.0)]);
        assert_eq!(corners.top_left(), Point::new(80.0, 60.0));
        assert_eq!(corners.top_right(), Point::new(330.0, 90.0));
        assert_eq!(corners.bottom_right(), Point::new(300.0, 420.0));
        assert_eq!(corners.bottom_left(), Point::new(60.0, 380.0));
    }

    #[test]
    fn diamond_with_tied_rows_is_stable() {
        // Left and right vertices share a y coordinate.
        let diamond = [
            Point::new(50.0, 0.0),
            Point::new(100.0, 50.0),
            Point::new(50.0, 100.0),
            Point::new(0.0, 50.0),
        ];
        let expected = normalize_corners(diamond);
        for perm in permutations(diamond) {
            assert_eq!(normalize_corners(perm), expected);
        }
        assert_eq!(expected.top_left(), Point::new(0.0, 50.0));
        assert_eq!(expected.top_right(), Point::new(50.0, 0.0));
    }

    #[test]
    fn permutations_helper_yields_all_orderings() {
        let pts = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(3.0, 0.0),
        ];
        assert_eq!(permutations(pts).len(), 24);
    }

    proptest! {
        #[test]
        fn order_is_independent_of_input_permutation(
            raw in prop::array::uniform4((0.0f32..2000.0, 0.0f32..2000.0))
        ) {
            let points = raw.map(Point::from);
            let expected = normalize_corners(points);
            for perm in permutations(points) {
                prop_assert_eq!(normalize_corners(perm), expected);
            }
        }

        #[test]
        fn top_pair_is_above_bottom_pair(
            raw in prop::array::uniform4((0.0f32..2000.0, 0.0f32..2000.0))
        ) {
            let c = normalize_tuples(raw);
            let top_max = c.top_left().y.max(c.top_right().y);
            let bottom_min = c.bottom_left().y.min(c.bottom_right().y);
            prop_assert!(top_max <= bottom_min);
            prop_assert!(c.top_left().x <= c.top_right().x);
            prop_assert!(c.bottom_left().x <= c.bottom_right().x);
        }
    }
}

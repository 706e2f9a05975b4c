// polarplot/toolpath/src/connecting.rs
//
// Copyright © 2026 The Polarplot Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Connected infill: crossing pairs of consecutive scan rows are stitched
//! into long continuous fills instead of disconnected strokes.
//!
//! Each fill under construction remembers which artwork path it is currently
//! following and where on that path's parameter circle it last touched it.
//! On the next row it grabs the crossing pair whose member on that same path
//! is parametrically closest in its direction of travel. If no pair
//! qualifies, because the boundary ran out or another region's crossings
//! took over, the fill is complete.

use crate::scanline::scan_line_crossings;
use fxhash::FxHashMap;
use polarplot_content::path::Path;
use polarplot_content::quadtree::{PathId, SegmentIntersection};
use polarplot_geometry::util::wrap;
use polarplot_geometry::vector::Vector2D;

type CrossingPair = (SegmentIntersection, SegmentIntersection);

struct Fill {
    path: Path,
    /// The artwork path the fill is currently walking along.
    followed: PathId,
    /// Where on that path's global parameter it last connected.
    time: f64,
    /// Whether the next connection is taken on the right member of a pair.
    direction_right: bool,
}

impl Fill {
    fn seed(pair: &CrossingPair, zigzag: bool) -> Fill {
        let (ref left, ref right) = *pair;
        Fill {
            path: Path::from_points(&[left.point, right.point]),
            followed: right.segment.path_id,
            time: right.time_in_path,
            direction_right: !zigzag,
        }
    }

    /// Parameter distance from the fill's last touch point to a crossing,
    /// wrapping around the parameter circle in the direction of travel.
    fn distance_to(&self, crossing: &SegmentIntersection) -> f64 {
        if self.direction_right {
            wrap(crossing.time_in_path - self.time, 1.0)
        } else {
            wrap(self.time - crossing.time_in_path, 1.0)
        }
    }

    /// The qualifying pair with the closest member on the followed path, if
    /// any. Earlier pairs win ties.
    fn closest_pair(&self, pairs: &[CrossingPair]) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (pair_index, (left, right)) in pairs.iter().enumerate() {
            for &crossing in [left, right].iter() {
                if crossing.segment.path_id != self.followed {
                    continue;
                }
                let distance = self.distance_to(crossing);
                if best.map_or(true, |(_, b)| distance < b) {
                    best = Some((pair_index, distance));
                }
            }
        }
        best
    }

    fn extend(&mut self, pair: &CrossingPair, zigzag: bool) {
        let (connection, continuation) = if self.direction_right {
            (&pair.1, &pair.0)
        } else {
            (&pair.0, &pair.1)
        };
        let end = self.path.end();
        self.path.push_line(end, connection.point);
        self.path.push_line(connection.point, continuation.point);

        // Rect fills make a U-turn each row; zig-zag fills keep sweeping the
        // same way, so the row connector runs diagonally.
        if !zigzag {
            self.direction_right = !self.direction_right;
        }
        self.followed = continuation.segment.path_id;
        self.time = continuation.time_in_path;
    }
}

fn connecting_lines(
    paths: &[Path],
    canvas_size: Vector2D,
    line_step: f64,
    angle: f64,
    zigzag: bool,
) -> Vec<Path> {
    let mut finished = vec![];
    let mut fills: Vec<Fill> = vec![];

    for line in scan_line_crossings(paths, canvas_size, line_step, angle) {
        let pairs = line.pairs();

        // Every live fill bids for its closest continuation pair.
        let mut claims: FxHashMap<usize, Vec<(usize, f64)>> = FxHashMap::default();
        let mut done = vec![false; fills.len()];
        for (fill_index, fill) in fills.iter().enumerate() {
            match fill.closest_pair(&pairs) {
                Some((pair_index, distance)) => {
                    claims.entry(pair_index).or_insert_with(Vec::new).push((fill_index, distance))
                }
                None => done[fill_index] = true,
            }
        }

        // Disputed pairs go to the closest bidder; the losers are complete.
        let mut pair_used = vec![false; pairs.len()];
        for pair_index in 0..pairs.len() {
            let claimants = match claims.get(&pair_index) {
                Some(claimants) => claimants,
                None => continue,
            };
            let mut winner = claimants[0];
            for &claim in &claimants[1..] {
                if claim.1 < winner.1 {
                    winner = claim;
                }
            }
            for &(fill_index, _) in claimants {
                if fill_index != winner.0 {
                    done[fill_index] = true;
                }
            }
            fills[winner.0].extend(&pairs[pair_index], zigzag);
            pair_used[pair_index] = true;
        }

        let mut kept = Vec::with_capacity(fills.len());
        for (fill_index, fill) in fills.into_iter().enumerate() {
            if done[fill_index] {
                finished.push(fill.path);
            } else {
                kept.push(fill);
            }
        }
        fills = kept;

        // Pairs nobody continued into start fresh fills.
        for (pair_index, pair) in pairs.iter().enumerate() {
            if !pair_used[pair_index] {
                fills.push(Fill::seed(pair, zigzag));
            }
        }
    }

    // Flush out the last ones.
    finished.extend(fills.into_iter().map(|fill| fill.path));
    finished
}

/// Connected infill with diagonal row connectors.
pub fn zigzag_lines(
    paths: &[Path],
    canvas_size: Vector2D,
    line_step: f64,
    angle: f64,
) -> Vec<Path> {
    connecting_lines(paths, canvas_size, line_step, angle, true)
}

/// Connected infill with orthogonal U-turn row connectors.
pub fn rect_lines(
    paths: &[Path],
    canvas_size: Vector2D,
    line_step: f64,
    angle: f64,
) -> Vec<Path> {
    connecting_lines(paths, canvas_size, line_step, angle, false)
}

#[cfg(test)]
mod tests {
    use super::{rect_lines, zigzag_lines};
    use polarplot_content::path::Path;
    use polarplot_geometry::rect::RectD;
    use polarplot_geometry::vector::vec2d;

    #[test]
    fn rect_fill_of_two_disjoint_squares() {
        let left = Path::from_rect(RectD::new(vec2d(0.0, 0.0), vec2d(40.0, 40.0)));
        let right = Path::from_rect(RectD::new(vec2d(50.0, 0.0), vec2d(40.0, 40.0)));
        let fills = rect_lines(&[left, right], vec2d(100.0, 50.0), 10.0, 0.0);

        // One connected fill per square, and nothing bridges the gap.
        assert_eq!(fills.len(), 2);
        for fill in &fills {
            let bounds = fill.bounds();
            let in_left = bounds.max_x() <= 40.0 + 1e-6;
            let in_right = bounds.min_x() >= 50.0 - 1e-6;
            assert!(in_left || in_right, "fill crosses the gap: {:?}", bounds);
            // Rows plus connectors: at least the summed row lengths.
            assert!(fill.total_length() >= 3.0 * 40.0);
        }
    }

    #[test]
    fn zigzag_fill_is_one_path_sweeping_one_way() {
        let square = Path::from_rect(RectD::new(vec2d(0.0, 0.0), vec2d(40.0, 40.0)));
        let fills = zigzag_lines(&[square], vec2d(50.0, 50.0), 10.0, 0.0);
        assert_eq!(fills.len(), 1);

        // Even segments are rows drawn left to right; odd segments are the
        // diagonal connectors going back left.
        let fill = &fills[0];
        for (index, segment) in fill.segments().iter().enumerate() {
            let dx = segment.to().x() - segment.from().x();
            if index % 2 == 0 {
                assert!(dx > 0.0, "row segment {} reversed", index);
            } else {
                assert!(dx < 0.0, "connector {} not diagonal", index);
            }
        }
    }

    #[test]
    fn rect_fill_alternates_row_direction() {
        let square = Path::from_rect(RectD::new(vec2d(0.0, 0.0), vec2d(40.0, 40.0)));
        let fills = rect_lines(&[square], vec2d(50.0, 50.0), 10.0, 0.0);
        assert_eq!(fills.len(), 1);

        let fill = &fills[0];
        // Rows are the long horizontal segments; connectors are short.
        let rows: Vec<f64> = fill
            .segments()
            .iter()
            .filter(|s| (s.to().x() - s.from().x()).abs() > 20.0)
            .map(|s| s.to().x() - s.from().x())
            .collect();
        assert!(rows.len() >= 3);
        for window in rows.windows(2) {
            assert!(
                window[0].signum() != window[1].signum(),
                "consecutive rows sweep the same way: {:?}",
                rows
            );
        }
    }
}

// polarplot/toolpath/src/scanline.rs
//
// Copyright © 2026 The Polarplot Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The scan-line scaffold shared by the infill algorithms: rotate the
//! artwork, index it in a quadtree, and gather the crossings of a family of
//! horizontal lines with it.

use log::warn;
use polarplot_content::path::Path;
use polarplot_content::quadtree::{QuadTree, SegmentIntersection};
use polarplot_geometry::rect::RectD;
use polarplot_geometry::util::deg_to_rad;
use polarplot_geometry::vector::{vec2d, Vector2D};
use rayon::prelude::*;

/// Tolerance handed to the path intersector for parameter-range slack.
const INTERSECT_TOLERANCE: f64 = 1e-9;

/// Quadtree leaf capacity. A tuning knob.
const QUADTREE_CAPACITY: usize = 20;

/// How often a scan line that hits an odd number of crossings (a vertex
/// graze) is nudged down one unit before we give up on evening it out.
const MAX_PERTURBATIONS: u32 = 8;

/// The crossings of one scan line, sorted by x.
pub struct ScanLine {
    pub y: f64,
    pub crossings: Vec<SegmentIntersection>,
}

impl ScanLine {
    /// Left-to-right crossing pairs. A trailing unpaired crossing (possible
    /// only when the perturbation retries ran out) is dropped.
    pub fn pairs(&self) -> Vec<(SegmentIntersection, SegmentIntersection)> {
        if self.crossings.len() % 2 != 0 {
            warn!(
                "scan line y={} kept an odd crossing count ({}); dropping the tail",
                self.y,
                self.crossings.len()
            );
        }
        self.crossings
            .chunks_exact(2)
            .map(|pair| (pair[0], pair[1]))
            .collect()
    }
}

/// Rotates `paths` by `angle` degrees about the canvas center, then collects
/// the crossings of every scan line in `y ∈ [−2H, 2H)` stepping `line_step`.
///
/// The generous y range and the oversized quadtree boundary accommodate
/// bounding boxes that rotate outside the canvas. Lines are processed in
/// parallel; the returned list is in ascending y order.
pub fn scan_line_crossings(
    paths: &[Path],
    canvas_size: Vector2D,
    line_step: f64,
    angle: f64,
) -> Vec<ScanLine> {
    if line_step <= 0.0 {
        warn!("non-positive scan line step {}; no infill generated", line_step);
        return vec![];
    }

    let center = canvas_size * 0.5;
    let rotated: Vec<Path> = paths
        .iter()
        .map(|path| path.rotated(deg_to_rad(angle), center))
        .collect();

    let (width, height) = (canvas_size.x(), canvas_size.y());
    let mut tree = QuadTree::new(
        RectD::new(
            vec2d(-width * 2.0, -height * 2.0),
            vec2d(width * 4.0, height * 4.0),
        ),
        QUADTREE_CAPACITY,
    );
    for (path_id, path) in rotated.iter().enumerate() {
        tree.insert_path(path, path_id);
    }

    let mut heights = vec![];
    let mut y = -height * 2.0;
    while y < height * 2.0 {
        heights.push(y);
        y += line_step;
    }

    heights
        .into_par_iter()
        .map(|y| scan_one_line(&tree, width, y))
        .collect()
}

fn scan_one_line(tree: &QuadTree, width: f64, y: f64) -> ScanLine {
    let mut crossings = vec![];
    for attempt in 0..=MAX_PERTURBATIONS {
        // Nudge down a unit on each retry to slide off path vertices.
        let probe_y = y - attempt as f64;
        let line = Path::from_points(&[vec2d(-width, probe_y), vec2d(width * 2.0, probe_y)]);
        crossings = tree.intersect(&line, INTERSECT_TOLERANCE);
        if crossings.len() % 2 == 0 {
            break;
        }
    }

    // Crossings are reported at the nominal height even when the probe was
    // perturbed, so rows stay evenly spaced.
    for crossing in &mut crossings {
        crossing.point = vec2d(crossing.point.x(), y);
    }
    crossings.sort_by(|a, b| a.point.x().partial_cmp(&b.point.x()).unwrap());
    ScanLine { y, crossings }
}

#[cfg(test)]
mod tests {
    use super::scan_line_crossings;
    use polarplot_content::path::Path;
    use polarplot_geometry::rect::RectD;
    use polarplot_geometry::vector::vec2d;

    #[test]
    fn crossings_are_even_and_sorted() {
        let square = Path::from_rect(RectD::new(vec2d(0.0, 0.0), vec2d(100.0, 100.0)));
        let lines = scan_line_crossings(&[square], vec2d(100.0, 100.0), 25.0, 0.0);
        for line in &lines {
            assert_eq!(line.crossings.len() % 2, 0, "odd count at y={}", line.y);
            for window in line.crossings.windows(2) {
                assert!(window[0].point.x() <= window[1].point.x());
            }
        }
        let populated: Vec<f64> =
            lines.iter().filter(|l| !l.crossings.is_empty()).map(|l| l.y).collect();
        // Interior rows are always present; rows grazing the horizontal
        // edges may or may not report vertex crossings.
        for y in &[25.0, 50.0, 75.0] {
            assert!(populated.contains(y), "missing row y={}", y);
        }
        for y in &populated {
            assert!((0.0..=100.0).contains(y), "stray row y={}", y);
        }
    }

    #[test]
    fn rotation_moves_crossings() {
        // A thin horizontal bar produces no interior crossings at most
        // heights until it is rotated upright.
        let bar = Path::from_rect(RectD::new(vec2d(10.0, 48.0), vec2d(80.0, 4.0)));
        let flat = scan_line_crossings(&[bar.clone()], vec2d(100.0, 100.0), 10.0, 0.0);
        let upright = scan_line_crossings(&[bar], vec2d(100.0, 100.0), 10.0, 90.0);
        let count = |lines: &[super::ScanLine]| {
            lines.iter().map(|l| l.crossings.len()).sum::<usize>()
        };
        assert!(count(&upright) > count(&flat));
    }
}

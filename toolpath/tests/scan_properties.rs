// polarplot/toolpath/tests/scan_properties.rs
//
// Copyright © 2026 The Polarplot Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Universal properties of the scan-line machinery, checked over random
//! rectangle arrangements.

use polarplot_content::path::Path;
use polarplot_content::quadtree::QuadTree;
use polarplot_geometry::rect::RectD;
use polarplot_geometry::vector::vec2d;
use polarplot_toolpath::scanline::scan_line_crossings;
use quickcheck::{quickcheck, TestResult};

/// Random axis-aligned rectangles on an integer grid.
fn build_paths(rects: &[(u8, u8, u8, u8)]) -> Vec<Path> {
    rects
        .iter()
        .map(|&(x, y, w, h)| {
            Path::from_rect(RectD::new(
                vec2d(f64::from(x % 100), f64::from(y % 100)),
                vec2d(f64::from(1 + w % 40), f64::from(1 + h % 40)),
            ))
        })
        .collect()
}

quickcheck! {
    /// The quadtree finds exactly the crossings brute force finds, and
    /// every closed path is crossed an even number of times.
    fn quadtree_matches_brute_force(rects: Vec<(u8, u8, u8, u8)>, scan: u8) -> TestResult {
        if rects.is_empty() || rects.len() > 10 {
            return TestResult::discard();
        }
        let paths = build_paths(&rects);
        // Half-integer heights avoid vertex grazing, so counts are exact.
        let scan_y = f64::from(scan % 150) + 0.5;
        let scan_path = Path::from_points(&[vec2d(-500.0, scan_y), vec2d(1000.0, scan_y)]);

        // A tiny capacity forces deep splits and duplicated entries.
        let mut tree = QuadTree::new(
            RectD::new(vec2d(-1000.0, -1000.0), vec2d(2000.0, 2000.0)),
            4,
        );
        for (path_id, path) in paths.iter().enumerate() {
            tree.insert_path(path, path_id);
        }

        let crossings = tree.intersect(&scan_path, 1e-9);
        let mut tree_xs: Vec<f64> = crossings.iter().map(|c| c.point.x()).collect();
        tree_xs.sort_by(|a, b| a.partial_cmp(b).unwrap());

        let mut brute_xs: Vec<f64> = paths
            .iter()
            .flat_map(|path| {
                path.intersect(&scan_path, 1e-9)
                    .into_iter()
                    .map(move |c| path.point(c.on_self.time).x())
            })
            .collect();
        brute_xs.sort_by(|a, b| a.partial_cmp(b).unwrap());

        if tree_xs.len() != brute_xs.len() {
            return TestResult::failed();
        }
        if !tree_xs.iter().zip(&brute_xs).all(|(a, b)| (a - b).abs() < 1e-6) {
            return TestResult::failed();
        }

        for path_id in 0..paths.len() {
            let count = crossings.iter().filter(|c| c.segment.path_id == path_id).count();
            if count % 2 != 0 {
                return TestResult::failed();
            }
        }
        TestResult::passed()
    }

    /// Every populated scan row carries an even, x-sorted crossing list.
    fn scan_rows_are_even_and_sorted(rects: Vec<(u8, u8, u8, u8)>, step: u8) -> TestResult {
        if rects.is_empty() || rects.len() > 8 {
            return TestResult::discard();
        }
        let paths = build_paths(&rects);
        let line_step = f64::from(1 + step % 20);
        for line in scan_line_crossings(&paths, vec2d(150.0, 150.0), line_step, 0.0) {
            if line.crossings.len() % 2 != 0 {
                return TestResult::failed();
            }
            for window in line.crossings.windows(2) {
                if window[0].point.x() > window[1].point.x() {
                    return TestResult::failed();
                }
            }
        }
        TestResult::passed()
    }
}

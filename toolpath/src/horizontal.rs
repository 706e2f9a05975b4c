// polarplot/toolpath/src/horizontal.rs
//
// Copyright © 2026 The Polarplot Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The simplest infill: one short horizontal stroke per crossing pair,
//! emitted row by row from top to bottom.

use crate::scanline::scan_line_crossings;
use polarplot_content::path::Path;
use polarplot_geometry::vector::Vector2D;

/// Fills the interiors of `paths` with disconnected horizontal strokes.
pub fn horizontal_lines(
    paths: &[Path],
    canvas_size: Vector2D,
    line_step: f64,
    angle: f64,
) -> Vec<Path> {
    let mut fills = vec![];
    for line in scan_line_crossings(paths, canvas_size, line_step, angle) {
        for (left, right) in line.pairs() {
            fills.push(Path::from_points(&[left.point, right.point]));
        }
    }
    fills
}

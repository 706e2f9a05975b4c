// polarplot/toolpath/src/boundary.rs
//
// Copyright © 2026 The Polarplot Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The outline of the drawable region.
//!
//! The machine's base sits in the upper-right corner of the full canvas, so
//! the drawable region is the canvas rectangle with that corner cut out.

use polarplot_content::path::Path;
use polarplot_geometry::vector::{vec2d, Vector2D};

/// Builds the closed outline of the drawable region.
///
/// `full_canvas_size` is the whole reachable area, `canvas_size` the
/// drawable part, and `base_size` the footprint of the plotter base in the
/// upper-right corner.
pub fn boundary_path(
    full_canvas_size: Vector2D,
    canvas_size: Vector2D,
    base_size: Vector2D,
) -> Path {
    let x_offset = full_canvas_size.x() - canvas_size.x();

    let canvas_top_left = vec2d(x_offset, 0.0);
    let base_top_left = vec2d(full_canvas_size.x() - base_size.x(), 0.0);
    let base_bottom_left = vec2d(full_canvas_size.x() - base_size.x(), base_size.y());
    let base_bottom_right = vec2d(full_canvas_size.x(), base_size.y());
    let canvas_bottom_right = vec2d(full_canvas_size.x(), canvas_size.y());
    let canvas_bottom_left = vec2d(x_offset, canvas_size.y());

    Path::from_points(&[
        canvas_top_left,
        base_top_left,
        base_bottom_left,
        base_bottom_right,
        canvas_bottom_right,
        canvas_bottom_left,
        canvas_top_left,
    ])
}

#[cfg(test)]
mod tests {
    use super::boundary_path;
    use polarplot_geometry::vector::vec2d;

    #[test]
    fn boundary_is_closed_and_cut() {
        let path = boundary_path(vec2d(600.0, 600.0), vec2d(500.0, 500.0), vec2d(120.0, 80.0));
        assert!(path.is_closed());
        assert_eq!(path.len(), 6);
        // The base corner is excluded from the outline's interior: the
        // outline passes through the base's lower-left corner.
        let corner = vec2d(480.0, 80.0);
        assert!(path
            .segments()
            .iter()
            .any(|s| (s.to() - corner).length() < 1e-9 || (s.from() - corner).length() < 1e-9));
    }
}

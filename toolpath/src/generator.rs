// polarplot/toolpath/src/generator.rs
//
// Copyright © 2026 The Polarplot Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The point-stream generator: applies infill, ordering, rotation, scaling
//! and translation to the artwork and flattens it into a lazy stream of
//! points with explicit path markers.

use crate::connecting::{rect_lines, zigzag_lines};
use crate::horizontal::horizontal_lines;
use crate::sort::{sort_paths, PathsortAlgorithm, SortPaths, SortedPath};
use polarplot_content::path::Path;
use polarplot_geometry::util::deg_to_rad;
use polarplot_geometry::vector::{vec2d, Vector2D};
use serde::{Deserialize, Serialize};

/// Default sampling density: points per millimeter of scaled path length.
const DEFAULT_POINTS_PER_MM: f64 = 15.0;

/// The available infill algorithms, named as they appear in job
/// descriptions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolpathAlgorithm {
    /// Draw the artwork outlines as-is.
    None,
    /// Disconnected horizontal strokes.
    Lines,
    /// Connected fill with diagonal row connectors.
    Zigzag,
    /// Connected fill with orthogonal U-turns.
    Rectlines,
}

impl Default for ToolpathAlgorithm {
    fn default() -> ToolpathAlgorithm {
        ToolpathAlgorithm::None
    }
}

/// Infill configuration from the job description.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct ToolpathConfig {
    #[serde(default)]
    pub algorithm: ToolpathAlgorithm,
    /// Vertical distance between scan lines, in mm.
    #[serde(default = "default_line_step")]
    pub line_step: f64,
    /// Rotation of the scan-line family, in degrees.
    #[serde(default)]
    pub angle: f64,
}

fn default_line_step() -> f64 {
    10.0
}

impl Default for ToolpathConfig {
    fn default() -> ToolpathConfig {
        ToolpathConfig {
            algorithm: ToolpathAlgorithm::None,
            line_step: default_line_step(),
            angle: 0.0,
        }
    }
}

/// Path-ordering configuration from the job description.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize)]
pub struct PathsortConfig {
    #[serde(default)]
    pub algorithm: PathsortAlgorithm,
    /// The pen position ordering starts from.
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

/// One element of the point stream.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointCommand {
    /// The pen should pass through this world-space point.
    Point(Vector2D),
    /// The current path is closed; the consumer may want to return to its
    /// first point.
    ClosePath,
    /// The current path is finished.
    PathEnd,
    /// No more paths follow.
    DrawingEnd,
}

/// Owns the artwork and the knobs, and produces the point stream.
pub struct PathGenerator {
    paths: Vec<Path>,
    canvas_size: Vector2D,
    offset: Vector2D,
    render_scale: f64,
    render_size: Vector2D,
    rotation: f64,
    points_per_mm: f64,
    toolpath: ToolpathConfig,
    pathsort: PathsortConfig,
}

impl PathGenerator {
    pub fn new(canvas_size: Vector2D) -> PathGenerator {
        PathGenerator {
            paths: vec![],
            canvas_size,
            offset: Vector2D::zero(),
            render_scale: 1.0,
            render_size: Vector2D::zero(),
            rotation: 0.0,
            points_per_mm: DEFAULT_POINTS_PER_MM,
            toolpath: ToolpathConfig::default(),
            pathsort: PathsortConfig::default(),
        }
    }

    pub fn add_paths<I>(&mut self, paths: I)
    where
        I: IntoIterator<Item = Path>,
    {
        self.paths.extend(paths);
    }

    #[inline]
    pub fn canvas_size(&self) -> Vector2D {
        self.canvas_size
    }

    /// Translation applied to every emitted point, in mm.
    pub fn set_offset(&mut self, offset: Vector2D) {
        self.offset = offset;
    }

    pub fn set_render_scale(&mut self, render_scale: f64) {
        self.render_scale = render_scale;
    }

    /// The virtual canvas size in mm; when non-zero the render scale is
    /// multiplied so the artwork canvas covers it.
    pub fn set_render_size(&mut self, render_size: Vector2D) {
        self.render_size = render_size;
    }

    /// Artwork rotation in degrees about the canvas center.
    pub fn set_rotation(&mut self, rotation: f64) {
        self.rotation = rotation;
    }

    /// Overrides the sampling density (points per scaled mm).
    pub fn set_points_per_mm(&mut self, points_per_mm: f64) {
        self.points_per_mm = points_per_mm;
    }

    pub fn set_toolpath_config(&mut self, toolpath: ToolpathConfig) {
        self.toolpath = toolpath;
    }

    pub fn set_pathsort_config(&mut self, pathsort: PathsortConfig) {
        self.pathsort = pathsort;
    }

    fn effective_scale(&self) -> f64 {
        let mut render_scale = self.render_scale;
        if self.render_size != Vector2D::zero() {
            let scale_width = self.render_size.x() / self.canvas_size.x();
            let scale_height = self.render_size.y() / self.canvas_size.y();
            render_scale *= scale_width.max(scale_height);
        }
        render_scale
    }

    /// Produces the lazy command stream: for each path its sample points,
    /// a close marker if the path was closed, and an end marker; then a
    /// final drawing-end marker.
    pub fn generate_points(&self) -> PointStream {
        let mut paths = self.paths.clone();

        match self.toolpath.algorithm {
            ToolpathAlgorithm::None => {}
            ToolpathAlgorithm::Lines => {
                paths = horizontal_lines(
                    &paths,
                    self.canvas_size,
                    self.toolpath.line_step,
                    self.toolpath.angle,
                )
            }
            ToolpathAlgorithm::Zigzag => {
                paths = zigzag_lines(
                    &paths,
                    self.canvas_size,
                    self.toolpath.line_step,
                    self.toolpath.angle,
                )
            }
            ToolpathAlgorithm::Rectlines => {
                paths = rect_lines(
                    &paths,
                    self.canvas_size,
                    self.toolpath.line_step,
                    self.toolpath.angle,
                )
            }
        }

        let source = if self.pathsort.algorithm != PathsortAlgorithm::None {
            Source::Sorted(sort_paths(
                vec2d(self.pathsort.x, self.pathsort.y),
                paths,
                self.canvas_size,
                self.pathsort.algorithm,
            ))
        } else {
            Source::Fixed(
                paths
                    .into_iter()
                    .map(SortedPath::Path)
                    .collect::<Vec<_>>()
                    .into_iter(),
            )
        };

        PointStream {
            source,
            center: self.canvas_size * 0.5,
            rotation: deg_to_rad(self.rotation - self.toolpath.angle),
            scale: self.effective_scale(),
            offset: self.offset,
            points_per_mm: self.points_per_mm,
            current: None,
            drained: false,
        }
    }
}

enum Source {
    Sorted(SortPaths),
    Fixed(std::vec::IntoIter<SortedPath>),
}

impl Source {
    fn next_path(&mut self) -> Option<SortedPath> {
        match *self {
            Source::Sorted(ref mut sorted) => sorted.next(),
            Source::Fixed(ref mut fixed) => fixed.next(),
        }
    }
}

struct CurrentPath {
    path: SortedPath,
    total: usize,
    index: usize,
    closed: bool,
    close_emitted: bool,
}

/// The lazy command stream returned by [`PathGenerator::generate_points`].
pub struct PointStream {
    source: Source,
    center: Vector2D,
    rotation: f64,
    scale: f64,
    offset: Vector2D,
    points_per_mm: f64,
    current: Option<CurrentPath>,
    drained: bool,
}

impl Iterator for PointStream {
    type Item = PointCommand;

    fn next(&mut self) -> Option<PointCommand> {
        loop {
            if let Some(ref mut current) = self.current {
                if current.index <= current.total {
                    let time = if current.total == 0 {
                        0.0
                    } else {
                        current.index as f64 / current.total as f64
                    };
                    current.index += 1;
                    let point = current.path.point(time) * self.scale + self.offset;
                    return Some(PointCommand::Point(point));
                }
                if current.closed && !current.close_emitted {
                    current.close_emitted = true;
                    return Some(PointCommand::ClosePath);
                }
                self.current = None;
                return Some(PointCommand::PathEnd);
            }

            match self.source.next_path() {
                Some(path) => {
                    let closed = path.is_closed();
                    // Rotation preserves length, so sample counts can be
                    // taken before rotating.
                    let total =
                        (path.total_length() * self.scale * self.points_per_mm).ceil() as usize;
                    let path = path.rotated(self.rotation, self.center);
                    self.current =
                        Some(CurrentPath { path, total, index: 0, closed, close_emitted: false });
                }
                None => {
                    if self.drained {
                        return None;
                    }
                    self.drained = true;
                    return Some(PointCommand::DrawingEnd);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PathGenerator, PathsortConfig, PointCommand, ToolpathAlgorithm, ToolpathConfig};
    use crate::sort::PathsortAlgorithm;
    use polarplot_content::path::Path;
    use polarplot_geometry::rect::RectD;
    use polarplot_geometry::vector::vec2d;

    fn commands(generator: &PathGenerator) -> Vec<PointCommand> {
        generator.generate_points().collect()
    }

    /// The stream must match `(Point+ ClosePath? PathEnd)* DrawingEnd`.
    fn check_framing(commands: &[PointCommand]) -> usize {
        let mut paths = 0;
        let mut index = 0;
        while index < commands.len() && matches!(commands[index], PointCommand::Point(_)) {
            while matches!(commands.get(index), Some(PointCommand::Point(_))) {
                index += 1;
            }
            if matches!(commands.get(index), Some(PointCommand::ClosePath)) {
                index += 1;
            }
            assert!(
                matches!(commands.get(index), Some(PointCommand::PathEnd)),
                "path not terminated at {}",
                index
            );
            index += 1;
            paths += 1;
        }
        assert!(matches!(commands.get(index), Some(PointCommand::DrawingEnd)));
        assert_eq!(index + 1, commands.len(), "trailing commands");
        paths
    }

    #[test]
    fn framing_with_open_and_closed_paths() {
        let mut generator = PathGenerator::new(vec2d(100.0, 100.0));
        generator.add_paths(vec![
            Path::from_rect(RectD::new(vec2d(10.0, 10.0), vec2d(20.0, 20.0))),
            Path::from_points(&[vec2d(50.0, 50.0), vec2d(80.0, 50.0)]),
        ]);
        let commands = commands(&generator);
        assert_eq!(check_framing(&commands), 2);
        assert_eq!(
            commands.iter().filter(|c| matches!(c, PointCommand::ClosePath)).count(),
            1
        );
    }

    #[test]
    fn zero_length_path_yields_single_point() {
        let mut generator = PathGenerator::new(vec2d(100.0, 100.0));
        generator.add_paths(vec![Path::from_points(&[vec2d(5.0, 5.0), vec2d(5.0, 5.0)])]);
        generator.set_offset(vec2d(1.0, 2.0));
        let commands = commands(&generator);
        assert_eq!(commands[0], PointCommand::Point(vec2d(6.0, 7.0)));
        assert!(matches!(commands[1], PointCommand::ClosePath));
        assert!(matches!(commands[2], PointCommand::PathEnd));
    }

    #[test]
    fn render_size_scales_up() {
        let mut generator = PathGenerator::new(vec2d(100.0, 100.0));
        generator.add_paths(vec![Path::from_points(&[vec2d(0.0, 0.0), vec2d(100.0, 0.0)])]);
        generator.set_render_size(vec2d(200.0, 50.0));
        let commands = commands(&generator);
        let last_point = commands
            .iter()
            .filter_map(|c| match c {
                PointCommand::Point(p) => Some(*p),
                _ => None,
            })
            .last()
            .unwrap();
        // max(200/100, 50/100) = 2.
        assert!((last_point - vec2d(200.0, 0.0)).length() < 1e-9);
    }

    #[test]
    fn infill_and_sort_compose() {
        let mut generator = PathGenerator::new(vec2d(100.0, 100.0));
        generator.add_paths(vec![Path::from_rect(RectD::new(
            vec2d(10.0, 10.0),
            vec2d(40.0, 40.0),
        ))]);
        generator.set_toolpath_config(ToolpathConfig {
            algorithm: ToolpathAlgorithm::Lines,
            line_step: 10.0,
            angle: 0.0,
        });
        generator.set_pathsort_config(PathsortConfig {
            algorithm: PathsortAlgorithm::ClosestPath,
            x: 0.0,
            y: 0.0,
        });
        let commands = commands(&generator);
        assert!(check_framing(&commands) >= 3);
    }

    #[test]
    fn algorithm_names_deserialize() {
        let config: ToolpathConfig =
            serde_json::from_str(r#"{"algorithm": "rectlines", "line_step": 5, "angle": 45}"#)
                .unwrap();
        assert_eq!(config.algorithm, ToolpathAlgorithm::Rectlines);
        let sort: PathsortConfig = serde_json::from_str(
            r#"{"algorithm": "closest_path_with_start_anywhere", "x": 1.5, "y": 2.5}"#,
        )
        .unwrap();
        assert_eq!(sort.algorithm, PathsortAlgorithm::ClosestPathWithStartAnywhere);
    }
}

// polarplot/toolpath/src/sort.rs
//
// Copyright © 2026 The Polarplot Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Travel-minimizing path ordering.
//!
//! Four selection strategies, all with the same shape: given the pen's last
//! position and the paths not yet drawn, pick the next one. `sort_paths`
//! turns a strategy into a lazy sequence.

use log::warn;
use polarplot_content::path::{ClosedPath, Path};
use polarplot_geometry::rect::RectD;
use polarplot_geometry::transform2d::Transform2D;
use polarplot_geometry::vector::{vec2d, Vector2D};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Parameter step used when sampling along closed paths and along the radar
/// circle.
const SAMPLE_STEP: f64 = 0.05;

/// How much the radar disc grows between sweeps, in world units.
const RADAR_STEP: f64 = 2.0;

/// The available ordering strategies, named as they appear in job
/// descriptions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathsortAlgorithm {
    /// Keep the input order.
    None,
    /// Pick the path whose start point is nearest.
    ClosestPath,
    /// Pick the path whose nearest endpoint is nearest, reversing it when
    /// that endpoint is its end.
    ClosestPathWithReverse,
    /// Like `ClosestPathWithReverse`, but closed paths may be entered at any
    /// sampled parameter.
    ClosestPathWithStartAnywhere,
    /// Sweep a growing disc and pick the first path whose bounding box it
    /// touches.
    RadarScan,
}

impl Default for PathsortAlgorithm {
    fn default() -> PathsortAlgorithm {
        PathsortAlgorithm::None
    }
}

/// A path as chosen by the sorter: either the original (possibly reversed)
/// path, or a closed path entered at a new start parameter.
#[derive(Clone, Debug)]
pub enum SortedPath {
    Path(Path),
    Restarted(ClosedPath),
}

impl SortedPath {
    pub fn point(&self, time: f64) -> Vector2D {
        match *self {
            SortedPath::Path(ref path) => path.point(time),
            SortedPath::Restarted(ref view) => view.point(time),
        }
    }

    pub fn total_length(&self) -> f64 {
        match *self {
            SortedPath::Path(ref path) => path.total_length(),
            SortedPath::Restarted(ref view) => view.total_length(),
        }
    }

    pub fn is_closed(&self) -> bool {
        match *self {
            SortedPath::Path(ref path) => path.is_closed(),
            SortedPath::Restarted(_) => true,
        }
    }

    pub fn rotated(&self, theta: f64, origin: Vector2D) -> SortedPath {
        match *self {
            SortedPath::Path(ref path) => SortedPath::Path(path.rotated(theta, origin)),
            SortedPath::Restarted(ref view) => SortedPath::Restarted(ClosedPath::new(
                view.inner().rotated(theta, origin),
                view.offset(),
            )),
        }
    }

    pub fn transformed(&self, transform: &Transform2D) -> SortedPath {
        match *self {
            SortedPath::Path(ref path) => SortedPath::Path(path.transformed(transform)),
            SortedPath::Restarted(ref view) => SortedPath::Restarted(ClosedPath::new(
                view.inner().transformed(transform),
                view.offset(),
            )),
        }
    }
}

/// Lazily yields paths in the order chosen by `algorithm`, starting from
/// `start_point`. After each yield the reference point moves to the end of
/// the yielded path.
pub fn sort_paths(
    start_point: Vector2D,
    paths: Vec<Path>,
    canvas_size: Vector2D,
    algorithm: PathsortAlgorithm,
) -> SortPaths {
    SortPaths { last_point: start_point, remaining: paths, canvas_size, algorithm }
}

/// The lazy sequence returned by [`sort_paths`].
pub struct SortPaths {
    last_point: Vector2D,
    remaining: Vec<Path>,
    canvas_size: Vector2D,
    algorithm: PathsortAlgorithm,
}

impl Iterator for SortPaths {
    type Item = SortedPath;

    fn next(&mut self) -> Option<SortedPath> {
        if self.remaining.is_empty() {
            return None;
        }
        let chosen = match self.algorithm {
            PathsortAlgorithm::None => SortedPath::Path(self.remaining.remove(0)),
            PathsortAlgorithm::ClosestPath => take_closest_start(self.last_point, &mut self.remaining),
            PathsortAlgorithm::ClosestPathWithReverse => {
                take_closest_endpoint(self.last_point, &mut self.remaining)
            }
            PathsortAlgorithm::ClosestPathWithStartAnywhere => {
                take_closest_anywhere(self.last_point, &mut self.remaining)
            }
            PathsortAlgorithm::RadarScan => {
                match take_radar_scan(self.last_point, &mut self.remaining, self.canvas_size) {
                    Some(path) => path,
                    None => {
                        // The disc swallowed the canvas without touching
                        // anything the sampling could see; don't drop work.
                        warn!("radar scan exhausted; falling back to closest start");
                        take_closest_start(self.last_point, &mut self.remaining)
                    }
                }
            }
        };
        self.last_point = chosen.point(1.0);
        Some(chosen)
    }
}

fn take_closest_start(last_point: Vector2D, paths: &mut Vec<Path>) -> SortedPath {
    let mut closest = 0;
    let mut closest_distance = f64::INFINITY;
    for (index, path) in paths.iter().enumerate() {
        let distance = last_point.distance_to(path.point(0.0));
        if distance < closest_distance {
            closest_distance = distance;
            closest = index;
        }
    }
    SortedPath::Path(paths.remove(closest))
}

fn take_closest_endpoint(last_point: Vector2D, paths: &mut Vec<Path>) -> SortedPath {
    let mut closest = 0;
    let mut closest_distance = f64::INFINITY;
    let mut reverse = false;
    for (index, path) in paths.iter().enumerate() {
        let start_distance = last_point.distance_to(path.start());
        let end_distance = last_point.distance_to(path.end());
        let distance = start_distance.min(end_distance);
        if distance < closest_distance {
            closest_distance = distance;
            closest = index;
            reverse = end_distance < start_distance;
        }
    }
    let path = paths.remove(closest);
    SortedPath::Path(if reverse { path.reversed() } else { path })
}

fn take_closest_anywhere(last_point: Vector2D, paths: &mut Vec<Path>) -> SortedPath {
    enum Entry {
        Endpoint { reverse: bool },
        Anywhere { offset: f64 },
    }

    let mut closest = 0;
    let mut closest_distance = f64::INFINITY;
    let mut entry = Entry::Endpoint { reverse: false };
    for (index, path) in paths.iter().enumerate() {
        if path.is_closed() {
            let (offset, distance) = closest_sample(last_point, path);
            if distance < closest_distance {
                closest_distance = distance;
                closest = index;
                entry = Entry::Anywhere { offset };
            }
        } else {
            let start_distance = last_point.distance_to(path.start());
            let end_distance = last_point.distance_to(path.end());
            let distance = start_distance.min(end_distance);
            if distance < closest_distance {
                closest_distance = distance;
                closest = index;
                entry = Entry::Endpoint { reverse: end_distance < start_distance };
            }
        }
    }

    let path = paths.remove(closest);
    match entry {
        Entry::Endpoint { reverse: true } => SortedPath::Path(path.reversed()),
        Entry::Endpoint { reverse: false } => SortedPath::Path(path),
        Entry::Anywhere { offset } => SortedPath::Restarted(ClosedPath::new(path, offset)),
    }
}

/// The sampled parameter on `path` nearest to `point`, and its distance.
fn closest_sample(point: Vector2D, path: &Path) -> (f64, f64) {
    let samples = (1.0 / SAMPLE_STEP).round() as usize;
    let mut closest_time = 0.0;
    let mut closest_distance = f64::INFINITY;
    for step in 0..=samples {
        let time = (step as f64 * SAMPLE_STEP).min(1.0);
        let distance = point.distance_to(path.point(time));
        if distance < closest_distance {
            closest_distance = distance;
            closest_time = time;
        }
    }
    (closest_time, closest_distance)
}

fn take_radar_scan(
    last_point: Vector2D,
    paths: &mut Vec<Path>,
    canvas_size: Vector2D,
) -> Option<SortedPath> {
    let mut radius = RADAR_STEP;
    while !disc_contains_canvas(last_point, radius, canvas_size) {
        for index in 0..paths.len() {
            if circle_touches_bounds(last_point, radius, paths[index].bounds()) {
                return Some(SortedPath::Path(paths.remove(index)));
            }
        }
        radius += RADAR_STEP;
    }
    None
}

fn disc_contains_canvas(center: Vector2D, radius: f64, canvas_size: Vector2D) -> bool {
    let corners = [
        vec2d(0.0, 0.0),
        vec2d(canvas_size.x(), 0.0),
        vec2d(0.0, canvas_size.y()),
        vec2d(canvas_size.x(), canvas_size.y()),
    ];
    corners.iter().all(|&corner| center.distance_to(corner) <= radius)
}

/// Whether any sampled point of the circle falls strictly inside the box.
fn circle_touches_bounds(center: Vector2D, radius: f64, bounds: RectD) -> bool {
    let samples = (1.0 / SAMPLE_STEP).round() as usize;
    for step in 0..=samples {
        let angle = 2.0 * PI * (step as f64 * SAMPLE_STEP).min(1.0);
        let point = center + vec2d(angle.cos(), angle.sin()) * radius;
        if point.x() > bounds.min_x()
            && point.x() < bounds.max_x()
            && point.y() > bounds.min_y()
            && point.y() < bounds.max_y()
        {
            return true;
        }
    }
    false
}

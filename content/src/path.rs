// polarplot/content/src/path.rs
//
// Copyright © 2026 The Polarplot Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Planar paths: ordered runs of line and cubic segments with an arc-length
//! proportional global parametrization.

use crate::segment::Segment;
use log::warn;
use polarplot_geometry::line_segment::LineSegment2D;
use polarplot_geometry::rect::RectD;
use polarplot_geometry::transform2d::Transform2D;
use polarplot_geometry::util::{self, EPSILON};
use polarplot_geometry::vector::Vector2D;

/// An ordered, non-empty run of segments.
///
/// The global parameter `T ∈ [0, 1]` is distributed across segments in
/// proportion to their arc lengths: segment `i` covers
/// `[len[0..i] / total, len[0..i+1] / total]` and is traversed linearly in
/// its own local parameter inside that band.
#[derive(Clone, Debug)]
pub struct Path {
    segments: Vec<Segment>,
    /// Cumulative arc length through the end of each segment.
    lengths: Vec<f64>,
    bounds: RectD,
}

/// A position on a path: the global time, plus the segment it falls in and
/// the local time within that segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathTime {
    /// The global path parameter in [0, 1].
    pub time: f64,
    /// The index of the segment the position falls in.
    pub segment: usize,
    /// The local parameter within that segment, in [0, 1].
    pub segment_time: f64,
}

/// A crossing of two paths, located on both of them.
#[derive(Clone, Copy, Debug)]
pub struct PathIntersection {
    pub on_self: PathTime,
    pub on_other: PathTime,
}

impl Path {
    #[inline]
    pub fn new() -> Path {
        Path { segments: vec![], lengths: vec![], bounds: RectD::default() }
    }

    pub fn from_segments<I>(segments: I) -> Path
    where
        I: IntoIterator<Item = Segment>,
    {
        let mut path = Path::new();
        for segment in segments {
            path.push_segment(segment);
        }
        path
    }

    /// A polyline through the given points, in order.
    pub fn from_points(points: &[Vector2D]) -> Path {
        let mut path = Path::new();
        for window in points.windows(2) {
            path.push_line(window[0], window[1]);
        }
        path
    }

    /// A closed path tracing the given axis-aligned rectangle.
    pub fn from_rect(rect: RectD) -> Path {
        Path::from_points(&[
            rect.origin(),
            rect.upper_right(),
            rect.lower_right(),
            rect.lower_left(),
            rect.origin(),
        ])
    }

    pub fn push_segment(&mut self, segment: Segment) {
        let length = segment.arc_length();
        let total = self.total_length() + length;
        if self.segments.is_empty() {
            self.bounds = segment.bounds();
        } else {
            self.bounds = self.bounds.union_rect(segment.bounds());
        }
        self.segments.push(segment);
        self.lengths.push(total);
    }

    #[inline]
    pub fn push_line(&mut self, from: Vector2D, to: Vector2D) {
        self.push_segment(Segment::line(LineSegment2D::new(from, to)));
    }

    #[inline]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Total arc length of the path.
    #[inline]
    pub fn total_length(&self) -> f64 {
        self.lengths.last().copied().unwrap_or(0.0)
    }

    /// The dimensions of an axis-aligned box that encloses the entire path.
    #[inline]
    pub fn bounds(&self) -> RectD {
        self.bounds
    }

    /// The first point of the path.
    #[inline]
    pub fn start(&self) -> Vector2D {
        self.segments.first().map(|s| s.from()).unwrap_or_default()
    }

    /// The last point of the path.
    #[inline]
    pub fn end(&self) -> Vector2D {
        self.segments.last().map(|s| s.to()).unwrap_or_default()
    }

    /// Returns true if the last point lies on the first point, within
    /// tolerance.
    #[inline]
    pub fn is_closed(&self) -> bool {
        !self.is_empty() && self.start().distance_to(self.end()) <= EPSILON
    }

    /// The global parameter band `[T0, T1]` covered by the given segment.
    pub fn time_band(&self, segment_index: usize) -> (f64, f64) {
        let total = self.total_length();
        if total == 0.0 {
            return (0.0, 0.0);
        }
        let before = if segment_index == 0 { 0.0 } else { self.lengths[segment_index - 1] };
        (before / total, self.lengths[segment_index] / total)
    }

    /// Converts a local segment parameter to the global path parameter, the
    /// inverse of the band lookup done by `point`.
    pub fn segment_time_to_time(&self, segment_index: usize, t: f64) -> f64 {
        let (band_start, band_end) = self.time_band(segment_index);
        util::lerp(band_start, band_end, t)
    }

    /// Locates the global parameter: which segment it falls in and where.
    pub fn time_to_segment_time(&self, time: f64) -> PathTime {
        let time = time.max(0.0).min(1.0);
        let total = self.total_length();
        if total == 0.0 || self.segments.is_empty() {
            return PathTime { time, segment: 0, segment_time: 0.0 };
        }
        let target = time * total;
        let mut segment = self
            .lengths
            .iter()
            .position(|&cum| cum >= target)
            .unwrap_or(self.segments.len() - 1);
        // Skip over zero-length segments at the boundary.
        while segment + 1 < self.segments.len() && segment_length(&self.lengths, segment) == 0.0 {
            segment += 1;
        }
        let before = if segment == 0 { 0.0 } else { self.lengths[segment - 1] };
        let length = segment_length(&self.lengths, segment);
        let segment_time = if length == 0.0 { 0.0 } else { ((target - before) / length).max(0.0).min(1.0) };
        PathTime { time, segment, segment_time }
    }

    /// The point at global parameter `T ∈ [0, 1]`.
    ///
    /// A zero-length path reports its start point for every `T`.
    pub fn point(&self, time: f64) -> Vector2D {
        if self.segments.is_empty() {
            return Vector2D::zero();
        }
        if self.total_length() == 0.0 {
            return self.segments[0].sample(0.0);
        }
        let location = self.time_to_segment_time(time);
        self.segments[location.segment].sample(location.segment_time)
    }

    /// Returns this path with segment order and segment directions reversed.
    pub fn reversed(&self) -> Path {
        Path::from_segments(self.segments.iter().rev().map(Segment::reversed))
    }

    /// Applies the given affine transform to every control point.
    pub fn transformed(&self, transform: &Transform2D) -> Path {
        Path::from_segments(self.segments.iter().map(|s| s.transform(transform)))
    }

    /// Returns this path rotated by `theta` radians about `origin`.
    pub fn rotated(&self, theta: f64, origin: Vector2D) -> Path {
        self.transformed(&Transform2D::from_rotation_about(theta, origin))
    }

    /// All crossings between this path and a collision path made of line
    /// segments.
    ///
    /// Collision segments that are not lines are skipped with a warning;
    /// `tol` is the slack allowed when accepting roots at the ends of the
    /// parameter ranges.
    pub fn intersect(&self, other: &Path, tol: f64) -> Vec<PathIntersection> {
        let mut crossings = vec![];
        for (other_index, other_segment) in other.segments.iter().enumerate() {
            if !other_segment.is_line() {
                warn!("skipping curved collision segment {} in path intersection", other_index);
                continue;
            }
            let line = other_segment.baseline;
            let line_length = line.length();
            if line_length == 0.0 {
                continue;
            }
            // Rotate ourselves into the frame in which the collision segment
            // is horizontal, then intersect against a horizontal line.
            let to_horizontal =
                Transform2D::from_rotation_about(-line.vector().angle(), line.from());
            let scan_y = line.from().y();
            let scan_x = line.from().x();
            for (self_index, self_segment) in self.segments.iter().enumerate() {
                let segment = self_segment.transform(&to_horizontal);
                for t in segment.solve_t_for_y(scan_y) {
                    let s = (segment.sample(t).x() - scan_x) / line_length;
                    if s < -tol || s > 1.0 + tol {
                        continue;
                    }
                    let s = s.max(0.0).min(1.0);
                    crossings.push(PathIntersection {
                        on_self: PathTime {
                            time: self.segment_time_to_time(self_index, t),
                            segment: self_index,
                            segment_time: t,
                        },
                        on_other: PathTime {
                            time: other.segment_time_to_time(other_index, s),
                            segment: other_index,
                            segment_time: s,
                        },
                    });
                }
            }
        }
        crossings
    }
}

impl Default for Path {
    fn default() -> Path {
        Path::new()
    }
}

#[inline]
fn segment_length(lengths: &[f64], index: usize) -> f64 {
    let before = if index == 0 { 0.0 } else { lengths[index - 1] };
    lengths[index] - before
}

/// A closed path viewed with its parametrization rotated so that `offset`
/// maps to zero. The underlying path is not modified.
#[derive(Clone, Debug)]
pub struct ClosedPath {
    path: Path,
    offset: f64,
}

impl ClosedPath {
    #[inline]
    pub fn new(path: Path, offset: f64) -> ClosedPath {
        ClosedPath { path, offset }
    }

    /// The point at `u`, sampled at `(u + offset) mod 1` on the underlying
    /// path.
    #[inline]
    pub fn point(&self, u: f64) -> Vector2D {
        self.path.point(util::wrap(u + self.offset, 1.0))
    }

    #[inline]
    pub fn total_length(&self) -> f64 {
        self.path.total_length()
    }

    #[inline]
    pub fn bounds(&self) -> RectD {
        self.path.bounds()
    }

    #[inline]
    pub fn inner(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn offset(&self) -> f64 {
        self.offset
    }
}

// polarplot/content/src/quadtree.rs
//
// Copyright © 2026 The Polarplot Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A duplicating quadtree over path segments.
//!
//! Entries are bucketed by bounding box. Once a node splits, a new entry is
//! pushed into *every* child whose boundary overlaps its (expanded) box, so
//! an entry may live in several leaves at once and queries deduplicate. The
//! index is a duplicating quadtree, not a disjoint partition.

use crate::path::{Path, PathIntersection};
use crate::segment::Segment;
use fxhash::FxHashSet;
use polarplot_geometry::rect::RectD;
use polarplot_geometry::util;
use polarplot_geometry::vector::{vec2d, Vector2D};
use std::iter;

/// How far entry and query boxes are grown on every side before overlap
/// tests.
const BBOX_EXPANSION: f64 = 5.0;

/// Identifies the original path an indexed segment belongs to.
pub type PathId = usize;

/// A segment paired with provenance: the path it belongs to, its index in
/// that path, and the global-parameter band it covers there.
#[derive(Clone, Copy, Debug)]
pub struct PathSegment {
    pub segment: Segment,
    pub path_id: PathId,
    pub segment_index: usize,
    time_band: (f64, f64),
}

impl PathSegment {
    /// Maps a local parameter within this segment to the global parameter of
    /// the owning path.
    #[inline]
    pub fn time_in_path(&self, t: f64) -> f64 {
        util::lerp(self.time_band.0, self.time_band.1, t)
    }

    #[inline]
    fn key(&self) -> (PathId, usize) {
        (self.path_id, self.segment_index)
    }
}

/// One crossing found by a quadtree probe, with full provenance.
#[derive(Clone, Copy, Debug)]
pub struct SegmentIntersection {
    /// The crossing point.
    pub point: Vector2D,
    /// The indexed segment the crossing lies on.
    pub segment: PathSegment,
    /// The local parameter of the crossing within that segment.
    pub time_in_segment: f64,
    /// The global parameter of the crossing in the segment's original path.
    pub time_in_path: f64,
}

/// The quadtree itself.
pub struct QuadTree {
    boundary: RectD,
    capacity: usize,
    entries: Vec<PathSegment>,
    children: Option<Box<[QuadTree; 4]>>,
}

impl QuadTree {
    pub fn new(boundary: RectD, capacity: usize) -> QuadTree {
        QuadTree { boundary, capacity, entries: vec![], children: None }
    }

    #[inline]
    pub fn boundary(&self) -> RectD {
        self.boundary
    }

    /// Indexes every segment of `path` under the given id.
    pub fn insert_path(&mut self, path: &Path, path_id: PathId) {
        for (segment_index, segment) in path.segments().iter().enumerate() {
            self.insert_segment(PathSegment {
                segment: *segment,
                path_id,
                segment_index,
                time_band: path.time_band(segment_index),
            });
        }
    }

    /// Indexes a single segment. Entries whose expanded box misses this
    /// node's boundary are dropped.
    pub fn insert_segment(&mut self, entry: PathSegment) {
        if !self.boundary.intersects(entry.segment.bounds().dilate(BBOX_EXPANSION)) {
            return;
        }
        if self.entries.len() < self.capacity {
            self.entries.push(entry);
            return;
        }
        if self.children.is_none() {
            self.split();
        }
        for child in self.children.as_mut().unwrap().iter_mut() {
            child.insert_segment(entry);
        }
    }

    fn split(&mut self) {
        let origin = self.boundary.origin();
        let half = self.boundary.size() * 0.5;
        let capacity = self.capacity;
        let quadrant = move |dx: f64, dy: f64| {
            QuadTree::new(
                RectD::new(origin + vec2d(half.x() * dx, half.y() * dy), half),
                capacity,
            )
        };
        self.children = Some(Box::new([
            quadrant(0.0, 0.0),
            quadrant(1.0, 0.0),
            quadrant(0.0, 1.0),
            quadrant(1.0, 1.0),
        ]));
    }

    /// All indexed segments that may overlap `area`. The node-level test is
    /// deliberately coarse: every entry of a node whose boundary overlaps
    /// the area is returned.
    pub fn query_area(&self, area: RectD) -> Vec<PathSegment> {
        let mut seen = FxHashSet::default();
        let mut found = vec![];
        self.query_area_into(area, &mut seen, &mut found);
        found
    }

    fn query_area_into(
        &self,
        area: RectD,
        seen: &mut FxHashSet<(PathId, usize)>,
        found: &mut Vec<PathSegment>,
    ) {
        if !self.boundary.intersects(area) {
            return;
        }
        for entry in &self.entries {
            if seen.insert(entry.key()) {
                found.push(*entry);
            }
        }
        if let Some(ref children) = self.children {
            for child in children.iter() {
                child.query_area_into(area, seen, found);
            }
        }
    }

    /// All crossings of indexed segments with the given collision path.
    ///
    /// Candidates are gathered per collision segment by box overlap, then
    /// each candidate is intersected against the *whole* collision path.
    /// Degenerate candidates are skipped, never fatal.
    pub fn intersect(&self, collision_path: &Path, tol: f64) -> Vec<SegmentIntersection> {
        let mut seen = FxHashSet::default();
        let mut candidates = vec![];
        for segment in collision_path.segments() {
            self.query_area_into(
                segment.bounds().dilate(BBOX_EXPANSION),
                &mut seen,
                &mut candidates,
            );
        }

        let mut crossings = vec![];
        for entry in candidates {
            let probe = Path::from_segments(iter::once(entry.segment));
            for crossing in probe.intersect(collision_path, tol) {
                let PathIntersection { on_self, .. } = crossing;
                crossings.push(SegmentIntersection {
                    point: entry.segment.sample(on_self.segment_time),
                    segment: entry,
                    time_in_segment: on_self.segment_time,
                    time_in_path: entry.time_in_path(on_self.segment_time),
                });
            }
        }
        crossings
    }
}

// polarplot/content/src/segment.rs
//
// Copyright © 2026 The Polarplot Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Single line or cubic Bézier curve segments.

use arrayvec::ArrayVec;
use polarplot_geometry::line_segment::LineSegment2D;
use polarplot_geometry::rect::RectD;
use polarplot_geometry::transform2d::Transform2D;
use polarplot_geometry::vector::Vector2D;

/// Relative error tolerance for adaptive arc-length computation.
const LENGTH_TOLERANCE: f64 = 1e-6;
const LENGTH_MAX_DEPTH: u32 = 24;

/// Slack allowed when accepting parametric roots just outside [0, 1].
const ROOT_SLACK: f64 = 1e-9;

/// A single line or cubic Bézier curve segment, with explicit start and end
/// points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    /// The start and end points of the curve.
    pub baseline: LineSegment2D,
    /// The two control points. Ignored if this segment is a line.
    pub ctrl: LineSegment2D,
    /// Whether this segment is a line or a cubic Bézier curve.
    pub kind: SegmentKind,
}

/// The type of segment this is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentKind {
    /// A line segment.
    Line,
    /// A cubic Bézier curve.
    Cubic,
}

impl Segment {
    /// Returns a segment representing a straight line.
    #[inline]
    pub fn line(line: LineSegment2D) -> Segment {
        Segment {
            baseline: line,
            ctrl: LineSegment2D::default(),
            kind: SegmentKind::Line,
        }
    }

    /// Returns a segment representing a cubic Bézier curve.
    #[inline]
    pub fn cubic(baseline: LineSegment2D, ctrl: LineSegment2D) -> Segment {
        Segment { baseline, ctrl, kind: SegmentKind::Cubic }
    }

    #[inline]
    pub fn is_line(&self) -> bool {
        self.kind == SegmentKind::Line
    }

    #[inline]
    pub fn is_cubic(&self) -> bool {
        self.kind == SegmentKind::Cubic
    }

    /// The start point of the segment.
    #[inline]
    pub fn from(&self) -> Vector2D {
        self.baseline.from()
    }

    /// The end point of the segment.
    #[inline]
    pub fn to(&self) -> Vector2D {
        self.baseline.to()
    }

    /// Returns the position of the point on this line or curve with the
    /// given parametric t value in [0, 1].
    pub fn sample(&self, t: f64) -> Vector2D {
        match self.kind {
            SegmentKind::Line => self.baseline.sample(t),
            SegmentKind::Cubic => {
                let (p0, p1) = (self.baseline.from(), self.ctrl.from());
                let (p2, p3) = (self.ctrl.to(), self.baseline.to());
                let u = 1.0 - t;
                p0 * (u * u * u)
                    + p1 * (3.0 * u * u * t)
                    + p2 * (3.0 * u * t * t)
                    + p3 * (t * t * t)
            }
        }
    }

    /// Divides this segment into two at the given parametric t value using
    /// de Casteljau subdivision.
    pub fn split(&self, t: f64) -> (Segment, Segment) {
        match self.kind {
            SegmentKind::Line => {
                let (before, after) = self.baseline.split(t);
                (Segment::line(before), Segment::line(after))
            }
            SegmentKind::Cubic => {
                let (p0, p1) = (self.baseline.from(), self.ctrl.from());
                let (p2, p3) = (self.ctrl.to(), self.baseline.to());
                let p01 = p0.lerp(p1, t);
                let p12 = p1.lerp(p2, t);
                let p23 = p2.lerp(p3, t);
                let p012 = p01.lerp(p12, t);
                let p123 = p12.lerp(p23, t);
                let p0123 = p012.lerp(p123, t);
                (
                    Segment::cubic(
                        LineSegment2D::new(p0, p0123),
                        LineSegment2D::new(p01, p012),
                    ),
                    Segment::cubic(
                        LineSegment2D::new(p0123, p3),
                        LineSegment2D::new(p123, p23),
                    ),
                )
            }
        }
    }

    /// Returns this segment with endpoints and control points reversed.
    #[inline]
    pub fn reversed(&self) -> Segment {
        Segment {
            baseline: self.baseline.reversed(),
            ctrl: self.ctrl.reversed(),
            kind: self.kind,
        }
    }

    /// Applies the given affine transform to this segment and returns it.
    #[inline]
    pub fn transform(&self, transform: &Transform2D) -> Segment {
        Segment {
            baseline: *transform * self.baseline,
            ctrl: *transform * self.ctrl,
            kind: self.kind,
        }
    }

    /// The axis-aligned bounding box of the control hull, which encloses the
    /// curve itself.
    pub fn bounds(&self) -> RectD {
        let bounds = self.baseline.bounds();
        match self.kind {
            SegmentKind::Line => bounds,
            SegmentKind::Cubic => bounds
                .union_point(self.ctrl.from())
                .union_point(self.ctrl.to()),
        }
    }

    /// The arc length of the segment. Cubic lengths are computed by adaptive
    /// subdivision until the relative error drops below 1e-6.
    pub fn arc_length(&self) -> f64 {
        match self.kind {
            SegmentKind::Line => self.baseline.length(),
            SegmentKind::Cubic => cubic_length(self, 0),
        }
    }

    /// All parametric roots in [0, 1] at which the segment crosses the
    /// horizontal line at the given y coordinate.
    ///
    /// A horizontal line segment crosses nowhere (the degenerate coincident
    /// case is the caller's problem); a cubic yields up to three roots.
    pub fn solve_t_for_y(&self, y: f64) -> ArrayVec<[f64; 3]> {
        let mut roots = ArrayVec::new();
        match self.kind {
            SegmentKind::Line => {
                let (y0, y1) = (self.baseline.from().y(), self.baseline.to().y());
                if y0 == y1 {
                    return roots;
                }
                let t = self.baseline.solve_t_for_y(y);
                if t >= -ROOT_SLACK && t <= 1.0 + ROOT_SLACK {
                    roots.push(clamp_unit(t));
                }
            }
            SegmentKind::Cubic => {
                let (y0, y1) = (self.baseline.from().y(), self.ctrl.from().y());
                let (y2, y3) = (self.ctrl.to().y(), self.baseline.to().y());
                let a = -y0 + 3.0 * y1 - 3.0 * y2 + y3;
                let b = 3.0 * y0 - 6.0 * y1 + 3.0 * y2;
                let c = -3.0 * y0 + 3.0 * y1;
                let d = y0 - y;
                for t in solve_cubic(a, b, c, d) {
                    let t = polish_root(a, b, c, d, t);
                    if t >= -ROOT_SLACK && t <= 1.0 + ROOT_SLACK {
                        let t = clamp_unit(t);
                        if !roots.iter().any(|&r| (r - t).abs() < 1e-9) {
                            roots.push(t);
                        }
                    }
                }
            }
        }
        roots
    }
}

#[inline]
fn clamp_unit(t: f64) -> f64 {
    t.max(0.0).min(1.0)
}

fn cubic_length(segment: &Segment, depth: u32) -> f64 {
    let (p0, p1) = (segment.baseline.from(), segment.ctrl.from());
    let (p2, p3) = (segment.ctrl.to(), segment.baseline.to());
    let chord = (p3 - p0).length();
    let polygon =
        (p1 - p0).length() + (p2 - p1).length() + (p3 - p2).length();
    if polygon - chord <= LENGTH_TOLERANCE * polygon || depth >= LENGTH_MAX_DEPTH {
        // Gravesen's estimate, exact in the limit.
        return (2.0 * chord + polygon) / 3.0;
    }
    let (before, after) = segment.split(0.5);
    cubic_length(&before, depth + 1) + cubic_length(&after, depth + 1)
}

/// Real roots of `a·t³ + b·t² + c·t + d = 0`, in no particular order.
///
/// Degenerate leading coefficients fall back to the quadratic and linear
/// cases.
pub fn solve_cubic(a: f64, b: f64, c: f64, d: f64) -> ArrayVec<[f64; 3]> {
    let mut roots = ArrayVec::new();
    let scale = a.abs().max(b.abs()).max(c.abs()).max(d.abs());
    if scale == 0.0 {
        return roots;
    }

    if a.abs() <= scale * 1e-12 {
        solve_quadratic(b, c, d, &mut roots);
        return roots;
    }

    // Depressed cubic u³ + p·u + q, with t = u − b/(3a).
    let (bn, cn, dn) = (b / a, c / a, d / a);
    let shift = bn / 3.0;
    let p = cn - bn * bn / 3.0;
    let q = 2.0 * bn * bn * bn / 27.0 - bn * cn / 3.0 + dn;
    let half_q = q / 2.0;
    let third_p = p / 3.0;
    let discriminant = half_q * half_q + third_p * third_p * third_p;

    if discriminant > 1e-14 {
        let sqrt_disc = discriminant.sqrt();
        let u = (-half_q + sqrt_disc).cbrt() + (-half_q - sqrt_disc).cbrt();
        roots.push(u - shift);
    } else if discriminant >= -1e-14 {
        let u = (-half_q).cbrt();
        roots.push(2.0 * u - shift);
        roots.push(-u - shift);
    } else {
        // Three distinct real roots; use the trigonometric form.
        let r = (-third_p * third_p * third_p).sqrt();
        let phi = (-half_q / r).max(-1.0).min(1.0).acos();
        let m = 2.0 * (-third_p).sqrt();
        for k in 0..3 {
            let u = m * ((phi + 2.0 * std::f64::consts::PI * k as f64) / 3.0).cos();
            roots.push(u - shift);
        }
    }
    roots
}

fn solve_quadratic(a: f64, b: f64, c: f64, roots: &mut ArrayVec<[f64; 3]>) {
    let scale = a.abs().max(b.abs()).max(c.abs());
    if a.abs() <= scale * 1e-12 {
        if b != 0.0 {
            roots.push(-c / b);
        }
        return;
    }
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return;
    }
    // Citardauq form to avoid cancellation.
    let sqrt_disc = if b < 0.0 { -discriminant.sqrt() } else { discriminant.sqrt() };
    let q = -0.5 * (b + sqrt_disc);
    if q != 0.0 {
        roots.push(c / q);
    }
    roots.push(q / a);
}

fn polish_root(a: f64, b: f64, c: f64, d: f64, mut t: f64) -> f64 {
    for _ in 0..3 {
        let f = ((a * t + b) * t + c) * t + d;
        let df = (3.0 * a * t + 2.0 * b) * t + c;
        if df == 0.0 {
            break;
        }
        t -= f / df;
    }
    t
}

#[cfg(test)]
mod tests {
    use super::{solve_cubic, Segment};
    use polarplot_geometry::line_segment::LineSegment2D;
    use polarplot_geometry::vector::vec2d;
    use quickcheck::{quickcheck, TestResult};

    quickcheck! {
        /// Every root reported for a random cubic actually lies on the
        /// scan height.
        fn cubic_roots_lie_on_the_line(
            coords: (i8, i8, i8, i8), xs: (i8, i8, i8, i8), y: i8
        ) -> TestResult {
            let (y0, y1, y2, y3) = coords;
            let (x0, x1, x2, x3) = xs;
            let seg = Segment::cubic(
                LineSegment2D::new(
                    vec2d(f64::from(x0), f64::from(y0)),
                    vec2d(f64::from(x3), f64::from(y3)),
                ),
                LineSegment2D::new(
                    vec2d(f64::from(x1), f64::from(y1)),
                    vec2d(f64::from(x2), f64::from(y2)),
                ),
            );
            let y = f64::from(y) + 0.25;
            for t in seg.solve_t_for_y(y) {
                if (seg.sample(t).y() - y).abs() > 1e-6 {
                    return TestResult::failed();
                }
            }
            TestResult::passed()
        }
    }

    fn arch() -> Segment {
        // A symmetric arch rising from y=0 to y≈0.75 and back.
        Segment::cubic(
            LineSegment2D::new(vec2d(0.0, 0.0), vec2d(10.0, 0.0)),
            LineSegment2D::new(vec2d(0.0, 1.0), vec2d(10.0, 1.0)),
        )
    }

    #[test]
    fn line_root() {
        let seg = Segment::line(LineSegment2D::new(vec2d(0.0, 0.0), vec2d(2.0, 10.0)));
        let roots = seg.solve_t_for_y(5.0);
        assert_eq!(roots.len(), 1);
        assert!((seg.sample(roots[0]).y() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn horizontal_line_has_no_roots() {
        let seg = Segment::line(LineSegment2D::new(vec2d(0.0, 3.0), vec2d(5.0, 3.0)));
        assert!(seg.solve_t_for_y(3.0).is_empty());
    }

    #[test]
    fn cubic_arch_crossings() {
        let seg = arch();
        let roots = seg.solve_t_for_y(0.5);
        assert_eq!(roots.len(), 2);
        for t in roots {
            assert!((seg.sample(t).y() - 0.5).abs() < 1e-9);
        }
    }

    #[test]
    fn cubic_length_of_degenerate_line() {
        // Control points collinear with the baseline: length equals the chord.
        let seg = Segment::cubic(
            LineSegment2D::new(vec2d(0.0, 0.0), vec2d(9.0, 0.0)),
            LineSegment2D::new(vec2d(3.0, 0.0), vec2d(6.0, 0.0)),
        );
        assert!((seg.arc_length() - 9.0).abs() < 1e-6);
    }

    #[test]
    fn solve_cubic_three_roots() {
        // (t-1)(t-2)(t-3) = t³ - 6t² + 11t - 6
        let mut roots: Vec<f64> = solve_cubic(1.0, -6.0, 11.0, -6.0).into_iter().collect();
        roots.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(roots.len(), 3);
        for (root, expected) in roots.iter().zip(&[1.0, 2.0, 3.0]) {
            assert!((root - expected).abs() < 1e-7);
        }
    }
}

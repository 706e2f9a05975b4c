// polarplot/geometry/src/transform2d.rs
//
// Copyright © 2026 The Polarplot Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! 2D affine transforms.

use crate::line_segment::LineSegment2D;
use crate::vector::{vec2d, Vector2D};
use std::ops::Mul;

/// A 2x2 matrix in row-major order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix2x2D {
    m11: f64,
    m12: f64,
    m21: f64,
    m22: f64,
}

impl Default for Matrix2x2D {
    #[inline]
    fn default() -> Matrix2x2D {
        Matrix2x2D::from_scale(Vector2D::splat(1.0))
    }
}

impl Matrix2x2D {
    #[inline]
    pub fn row_major(m11: f64, m12: f64, m21: f64, m22: f64) -> Matrix2x2D {
        Matrix2x2D { m11, m12, m21, m22 }
    }

    #[inline]
    pub fn from_scale(scale: Vector2D) -> Matrix2x2D {
        Matrix2x2D::row_major(scale.x(), 0.0, 0.0, scale.y())
    }

    /// A counterclockwise rotation by `theta` radians (in the y-down
    /// coordinate system this turns clockwise on screen).
    #[inline]
    pub fn from_rotation(theta: f64) -> Matrix2x2D {
        let (sin, cos) = theta.sin_cos();
        Matrix2x2D::row_major(cos, -sin, sin, cos)
    }

    #[inline]
    pub fn post_mul(&self, other: &Matrix2x2D) -> Matrix2x2D {
        Matrix2x2D::row_major(
            self.m11 * other.m11 + self.m12 * other.m21,
            self.m11 * other.m12 + self.m12 * other.m22,
            self.m21 * other.m11 + self.m22 * other.m21,
            self.m21 * other.m12 + self.m22 * other.m22,
        )
    }

    #[inline]
    pub fn transform_point(&self, point: Vector2D) -> Vector2D {
        vec2d(
            self.m11 * point.x() + self.m12 * point.y(),
            self.m21 * point.x() + self.m22 * point.y(),
        )
    }

    #[inline]
    pub fn det(&self) -> f64 {
        self.m11 * self.m22 - self.m12 * self.m21
    }
}

/// An affine transform: a linear map followed by a translation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Transform2D {
    pub matrix: Matrix2x2D,
    pub vector: Vector2D,
}

impl Transform2D {
    #[inline]
    pub fn from_scale(scale: Vector2D) -> Transform2D {
        Transform2D {
            matrix: Matrix2x2D::from_scale(scale),
            vector: Vector2D::zero(),
        }
    }

    #[inline]
    pub fn from_rotation(theta: f64) -> Transform2D {
        Transform2D {
            matrix: Matrix2x2D::from_rotation(theta),
            vector: Vector2D::zero(),
        }
    }

    #[inline]
    pub fn from_translation(vector: Vector2D) -> Transform2D {
        Transform2D { matrix: Matrix2x2D::default(), vector }
    }

    /// A rotation by `theta` radians about an arbitrary origin.
    pub fn from_rotation_about(theta: f64, origin: Vector2D) -> Transform2D {
        Transform2D::from_translation(origin)
            .post_mul(&Transform2D::from_rotation(theta))
            .post_mul(&Transform2D::from_translation(-origin))
    }

    /// Composition: the resulting transform applies `other` first, then
    /// `self`.
    #[inline]
    pub fn post_mul(&self, other: &Transform2D) -> Transform2D {
        Transform2D {
            matrix: self.matrix.post_mul(&other.matrix),
            vector: self.matrix.transform_point(other.vector) + self.vector,
        }
    }

    #[inline]
    pub fn is_identity(&self) -> bool {
        *self == Transform2D::default()
    }
}

impl Mul<Vector2D> for Transform2D {
    type Output = Vector2D;
    #[inline]
    fn mul(self, point: Vector2D) -> Vector2D {
        self.matrix.transform_point(point) + self.vector
    }
}

impl Mul<LineSegment2D> for Transform2D {
    type Output = LineSegment2D;
    #[inline]
    fn mul(self, segment: LineSegment2D) -> LineSegment2D {
        LineSegment2D::new(self * segment.from(), self * segment.to())
    }
}

impl Mul<Transform2D> for Transform2D {
    type Output = Transform2D;
    #[inline]
    fn mul(self, other: Transform2D) -> Transform2D {
        self.post_mul(&other)
    }
}

#[cfg(test)]
mod tests {
    use super::Transform2D;
    use crate::vector::vec2d;

    #[test]
    fn rotation_about_origin_fixes_origin() {
        let origin = vec2d(50.0, 50.0);
        let transform = Transform2D::from_rotation_about(1.234, origin);
        let rotated = transform * origin;
        assert!((rotated - origin).length() < 1e-9);
    }

    #[test]
    fn quarter_turn() {
        let transform = Transform2D::from_rotation(std::f64::consts::FRAC_PI_2);
        let p = transform * vec2d(1.0, 0.0);
        assert!((p - vec2d(0.0, 1.0)).length() < 1e-12);
    }
}

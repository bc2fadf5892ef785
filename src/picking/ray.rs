use nalgebra::{Matrix4, Point3, Vector3, Vector4};

use crate::core::geo::Point;
use crate::models::mesh::Aabb;

const EPSILON: f64 = 1e-12;

/// Canvas size in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub width: f64,
    pub height: f64,
}

impl ScreenRect {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Normalized device coordinates of a canvas point, y pointing up.
    pub fn to_ndc(&self, point: Point) -> (f64, f64) {
        let x = point.x / self.width * 2.0 - 1.0;
        let y = -(point.y / self.height * 2.0 - 1.0);
        (x, y)
    }
}

/// Half-line with a unit-length direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3<f64>,
    pub direction: Vector3<f64>,
}

impl Ray {
    pub fn new(origin: Point3<f64>, direction: Vector3<f64>) -> Option<Self> {
        let direction = direction.try_normalize(EPSILON)?;
        Some(Self { origin, direction })
    }

    /// Ray through `point` in the space `projection` maps to clip space.
    ///
    /// The near and far clip planes are unprojected through the inverse and
    /// the ray runs from the near point towards the far one. `None` when the
    /// projection is singular.
    pub fn from_screen(point: Point, canvas: ScreenRect, projection: &Matrix4<f64>) -> Option<Self> {
        if canvas.is_empty() {
            return None;
        }
        let inverse = projection.try_inverse()?;
        let (x, y) = canvas.to_ndc(point);

        let unproject = |z: f64| -> Option<Point3<f64>> {
            let clip = inverse * Vector4::new(x, y, z, 1.0);
            if clip.w.abs() < EPSILON {
                return None;
            }
            Some(Point3::new(clip.x / clip.w, clip.y / clip.w, clip.z / clip.w))
        };

        let near = unproject(-1.0)?;
        let far = unproject(1.0)?;
        Self::new(near, far - near)
    }

    pub fn at(&self, t: f64) -> Point3<f64> {
        self.origin + self.direction * t
    }

    /// Entry distance into `bounds` (0 when starting inside), slab method.
    pub fn intersect_aabb(&self, bounds: &Aabb) -> Option<f64> {
        if bounds.is_empty() {
            return None;
        }
        let mut t_min = 0.0_f64;
        let mut t_max = f64::INFINITY;

        for axis in 0..3 {
            let o = self.origin[axis];
            let d = self.direction[axis];
            let (min, max) = (bounds.min[axis], bounds.max[axis]);

            if d.abs() < EPSILON {
                if o < min || o > max {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / d;
            let mut t1 = (min - o) * inv;
            let mut t2 = (max - o) * inv;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_max < t_min {
                return None;
            }
        }
        Some(t_min)
    }

    /// Möller–Trumbore, hitting both faces.
    pub fn intersect_triangle(&self, [a, b, c]: &[Point3<f64>; 3]) -> Option<f64> {
        let e1 = b - a;
        let e2 = c - a;
        let p = self.direction.cross(&e2);
        let det = e1.dot(&p);
        if det.abs() < EPSILON {
            return None;
        }

        let inv_det = 1.0 / det;
        let s = self.origin - a;
        let u = s.dot(&p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(&e1);
        let v = self.direction.dot(&q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = e2.dot(&q) * inv_det;
        (t > EPSILON).then_some(t)
    }
}

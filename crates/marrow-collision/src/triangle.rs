//! Collision triangles and their exact intersection tests
//!
//! A triangle stores vertex indices into the shared vertex array, its plane
//! (normal and distance), and a precomputed barycentric basis so the per-ray
//! work is a handful of dot products.

use crate::aabb::Aabb;
use crate::obb::Obb;
use crate::shapes::{Ray, Sphere};
use glam::Vec3;

/// Default outward tolerance on the barycentric edge tests. A little slack
/// keeps rays from slipping through the seams between adjacent triangles.
pub const DEFAULT_COLL_DELTA: f32 = 0.01;

#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub a: u32,
    pub b: u32,
    pub c: u32,
    /// Unit plane normal.
    pub normal: Vec3,
    /// Plane distance along the normal.
    pub distance: f32,
    /// Edge basis (B - A, C - A) and its dot products, set by `calc_basis`.
    pub u: Vec3,
    pub v: Vec3,
    pub uu: f32,
    pub vv: f32,
    pub uv: f32,
    pub di: f32,
}

impl Triangle {
    pub fn new(a: u32, b: u32, c: u32, normal: Vec3, distance: f32) -> Self {
        Self {
            a,
            b,
            c,
            normal,
            distance,
            u: Vec3::ZERO,
            v: Vec3::ZERO,
            uu: 0.0,
            vv: 0.0,
            uv: 0.0,
            di: 0.0,
        }
    }

    /// Precompute the barycentric edge basis. Returns false when the basis
    /// determinant is too close to zero — such a triangle would divide by
    /// zero in every later test and must be rejected at build time.
    #[must_use]
    pub fn calc_basis(&mut self, vertices: &[Vec3]) -> bool {
        self.u = vertices[self.b as usize] - vertices[self.a as usize];
        self.v = vertices[self.c as usize] - vertices[self.a as usize];
        self.uu = self.u.length_squared();
        self.vv = self.v.length_squared();
        self.uv = self.u.dot(self.v);
        let d = self.uv * self.uv - self.uu * self.vv;
        if d.abs() < 1e-10 {
            return false;
        }
        self.di = 1.0 / d;
        true
    }

    /// Ray test against the front face only.
    ///
    /// Rejects rays parallel to or facing away from the plane, and origins
    /// below it. `best` bounds the search on entry and is shrunk to the hit
    /// distance on success, so a traversal naturally narrows in on the
    /// nearest hit. `coll_min`/`coll_max` widen the edge tests slightly
    /// (see [`DEFAULT_COLL_DELTA`]).
    pub fn intersects_ray(
        &self,
        vertices: &[Vec3],
        ray: &Ray,
        best: &mut f32,
        coll_min: f32,
        coll_max: f32,
    ) -> bool {
        let p = vertices[self.a as usize];
        let w0 = ray.origin - p;
        let b = self.normal.dot(ray.direction);
        if -b < 1e-10 {
            // ray is in the plane, or pointing at the triangle's backside
            return false;
        }
        let a = self.normal.dot(w0);
        if a < 0.0 {
            // ray starts below the triangle
            return false;
        }
        let r = -a / b;
        if r > *best {
            // triangle too far away
            return false;
        }
        let hit = ray.origin + ray.direction * r;
        let w = hit - p;
        let uw = self.u.dot(w);
        let vw = self.v.dot(w);
        let s = (self.uv * vw - self.vv * uw) * self.di;
        if s < coll_min || s > coll_max {
            return false;
        }
        let t = (self.uv * uw - self.uu * vw) * self.di;
        if t < coll_min || (s + t) > coll_max {
            return false;
        }
        *best = r;
        true
    }

    /// Separating-axis test against an axis-aligned box.
    pub fn intersects_aabb(&self, vertices: &[Vec3], aabb: &Aabb) -> bool {
        let bc = aabb.center();
        let va = vertices[self.a as usize] - bc;
        let vb = vertices[self.b as usize] - bc;
        let vc = vertices[self.c as usize] - bc;
        self.aabb_intersects(va, vb, vc, aabb)
    }

    /// The shared body of the AABB and OBB tests. Vertices come in relative
    /// to the box center.
    fn aabb_intersects(&self, va: Vec3, vb: Vec3, vc: Vec3, aabb: &Aabb) -> bool {
        // triangle culled by a box face?
        let hd = aabb.half_dim();
        for axis in 0..3 {
            if va[axis] >= hd[axis] && vb[axis] >= hd[axis] && vc[axis] >= hd[axis] {
                return false;
            }
            if -va[axis] >= hd[axis] && -vb[axis] >= hd[axis] && -vc[axis] >= hd[axis] {
                return false;
            }
        }

        // box culled by the triangle plane? (all eight corners on one side)
        let side = self.normal.dot(aabb.corner(0)) < self.distance;
        let mut culled = true;
        for i in 1..8 {
            let below = self.normal.dot(aabb.corner(i)) < self.distance;
            if below != side {
                culled = false;
                break;
            }
        }
        if culled {
            return false;
        }

        // the nine cross axes between triangle edges and box edges
        for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
            if axis_separates(va, vb, vc, axis, hd)
                || axis_separates(vb, vc, va, axis, hd)
                || axis_separates(vc, va, vb, axis, hd)
            {
                return false;
            }
        }

        true
    }

    /// Sphere test: plane reject, then an inside fast path on the projected
    /// center, then the clamped closest point on each edge.
    pub fn intersects_sphere(&self, vertices: &[Vec3], sphere: &Sphere) -> bool {
        let sd = sphere.center.dot(self.normal);
        if sd < self.distance - sphere.radius || sd > self.distance + sphere.radius {
            return false;
        }
        // sphere center projected onto the triangle plane
        let pc = sphere.center + self.normal * (self.distance - sd);

        let a = vertices[self.a as usize];
        let b = vertices[self.b as usize];
        let c = vertices[self.c as usize];
        let ba = b - a;
        let cb = c - b;
        let ac = a - c;
        // edge parameter of the projected center along each wound edge
        let vba = ba.dot(pc - a) / ba.length_squared();
        let vcb = cb.dot(pc - b) / cb.length_squared();
        let vac = ac.dot(pc - c) / ac.length_squared();
        // the edges are wound, so one parameter flips sign
        if vba >= 0.0 && (1.0 - vac) >= 0.0 && vba + (1.0 - vac) <= 1.0 {
            return true;
        }

        let r2 = sphere.radius * sphere.radius;
        for (start, edge, t) in [(a, ba, vba), (b, cb, vcb), (c, ac, vac)] {
            let closest = start + edge * t.clamp(0.0, 1.0);
            if (closest - sphere.center).length_squared() <= r2 {
                return true;
            }
        }
        false
    }

    /// OBB test: move the triangle into the box's local frame and reuse the
    /// AABB test against an origin-centered box of the same half-extents.
    pub fn intersects_obb(&self, vertices: &[Vec3], obb: &Obb) -> bool {
        let va = obb.to_local(vertices[self.a as usize] - obb.pos);
        let vb = obb.to_local(vertices[self.b as usize] - obb.pos);
        let vc = obb.to_local(vertices[self.c as usize] - obb.pos);
        let local = Aabb::new(-obb.half_dim, obb.half_dim);
        self.aabb_intersects(va, vb, vc, &local)
    }
}

/// Test one candidate separating axis (a triangle edge crossed with a box
/// principal axis) for the SAT. Returns true when the axis separates.
fn axis_separates(va: Vec3, vb: Vec3, vc: Vec3, axis: Vec3, half_dim: Vec3) -> bool {
    let edge = vb - va;
    let separating = axis.cross(edge);
    if separating == Vec3::ZERO {
        return false;
    }
    let mut ta = separating.dot(va);
    let mut tb = separating.dot(vb);
    let mut tc = separating.dot(vc);
    // sort so ta is the minimum and tc the maximum
    if ta > tb {
        std::mem::swap(&mut ta, &mut tb);
    }
    if tb > tc {
        std::mem::swap(&mut tb, &mut tc);
    }
    if ta > tb {
        std::mem::swap(&mut ta, &mut tb);
    }
    // the box's extent along the axis, via the closest corner
    let x = (half_dim.x * separating.x).abs()
        + (half_dim.y * separating.y).abs()
        + (half_dim.z * separating.z).abs();
    ta >= x || tc <= -x
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    /// A unit right triangle in the XY plane with its normal on +Z:
    /// A = origin, B = +X, C = +Y (stored wound so the cross points up).
    fn xy_triangle() -> (Vec<Vec3>, Triangle) {
        let vertices = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let mut tri = Triangle::new(0, 1, 2, Vec3::Z, 0.0);
        assert!(tri.calc_basis(&vertices));
        (vertices, tri)
    }

    fn down_ray(x: f32, y: f32) -> Ray {
        Ray::new(Vec3::new(x, y, 1.0), Vec3::new(0.0, 0.0, -1.0))
    }

    #[test]
    fn degenerate_basis_is_rejected() {
        let vertices = vec![Vec3::ZERO, Vec3::X, Vec3::X * 2.0];
        let mut tri = Triangle::new(0, 1, 2, Vec3::Z, 0.0);
        assert!(!tri.calc_basis(&vertices));
    }

    #[test]
    fn ray_through_interior_hits_and_reports_distance() {
        let (vertices, tri) = xy_triangle();
        let mut best = 100.0;
        assert!(tri.intersects_ray(&vertices, &down_ray(0.25, 0.25), &mut best, -0.01, 1.01));
        assert!((best - 1.0).abs() < 1e-5);
    }

    #[test]
    fn ray_just_outside_tolerance_misses() {
        let (vertices, tri) = xy_triangle();
        let mut best = 100.0;
        // within the seam tolerance past the edge: still a hit
        assert!(tri.intersects_ray(&vertices, &down_ray(-0.005, 0.25), &mut best, -0.01, 1.01));
        // beyond it: a miss
        let mut best = 100.0;
        assert!(!tri.intersects_ray(&vertices, &down_ray(-0.05, 0.25), &mut best, -0.01, 1.01));
    }

    #[test]
    fn backfacing_ray_is_rejected() {
        let (vertices, tri) = xy_triangle();
        let from_below = Ray::new(Vec3::new(0.25, 0.25, -1.0), Vec3::new(0.0, 0.0, 1.0));
        let mut best = 100.0;
        assert!(!tri.intersects_ray(&vertices, &from_below, &mut best, -0.01, 1.01));
    }

    #[test]
    fn origin_below_plane_is_rejected() {
        let (vertices, tri) = xy_triangle();
        let below = Ray::new(Vec3::new(0.25, 0.25, -1.0), Vec3::new(0.0, 0.0, -1.0));
        let mut best = 100.0;
        assert!(!tri.intersects_ray(&vertices, &below, &mut best, -0.01, 1.01));
    }

    #[test]
    fn farther_hit_does_not_widen_a_shrunk_best() {
        let (vertices, tri) = xy_triangle();
        let mut best = 0.5;
        // the hit would be at distance 1.0, past the current best
        assert!(!tri.intersects_ray(&vertices, &down_ray(0.25, 0.25), &mut best, -0.01, 1.01));
        assert_eq!(best, 0.5);
    }

    #[test]
    fn aabb_containing_triangle_intersects() {
        let (vertices, tri) = xy_triangle();
        let big = Aabb::new(Vec3::splat(-2.0), Vec3::splat(2.0));
        assert!(tri.intersects_aabb(&vertices, &big));
    }

    #[test]
    fn aabb_outside_on_one_axis_is_rejected() {
        let (vertices, tri) = xy_triangle();
        let off_x = Aabb::new(Vec3::new(5.0, -1.0, -1.0), Vec3::new(6.0, 1.0, 1.0));
        assert!(!tri.intersects_aabb(&vertices, &off_x));
        let off_z = Aabb::new(Vec3::new(-1.0, -1.0, 2.0), Vec3::new(1.0, 1.0, 3.0));
        assert!(!tri.intersects_aabb(&vertices, &off_z));
    }

    #[test]
    fn aabb_beside_the_hypotenuse_is_separated_by_a_cross_axis() {
        let (vertices, tri) = xy_triangle();
        // a thin box straddling the plane, past the hypotenuse but inside
        // the triangle's X and Y extents
        let beside = Aabb::new(Vec3::new(0.7, 0.7, -0.1), Vec3::new(0.95, 0.95, 0.1));
        assert!(!tri.intersects_aabb(&vertices, &beside));
    }

    #[test]
    fn box_entirely_above_the_plane_is_rejected() {
        let (vertices, tri) = xy_triangle();
        let above = Aabb::new(Vec3::new(0.0, 0.0, 0.5), Vec3::new(1.0, 1.0, 1.5));
        assert!(!tri.intersects_aabb(&vertices, &above));
    }

    #[test]
    fn sphere_touching_interior_intersects() {
        let (vertices, tri) = xy_triangle();
        let s = Sphere::new(Vec3::new(0.25, 0.25, 0.3), 0.5);
        assert!(tri.intersects_sphere(&vertices, &s));
    }

    #[test]
    fn sphere_off_the_plane_is_rejected() {
        let (vertices, tri) = xy_triangle();
        let s = Sphere::new(Vec3::new(0.25, 0.25, 2.0), 0.5);
        assert!(!tri.intersects_sphere(&vertices, &s));
    }

    #[test]
    fn sphere_near_an_edge_uses_the_clamped_closest_point() {
        let (vertices, tri) = xy_triangle();
        // projected center is off the triangle, but the edge comes close
        let near_edge = Sphere::new(Vec3::new(0.5, -0.2, 0.0), 0.3);
        assert!(tri.intersects_sphere(&vertices, &near_edge));
        let past_corner = Sphere::new(Vec3::new(1.5, -0.2, 0.0), 0.3);
        assert!(!tri.intersects_sphere(&vertices, &past_corner));
    }

    #[test]
    fn obb_test_matches_rotated_box() {
        let (vertices, tri) = xy_triangle();
        // a thin slab rotated to lie along the hypotenuse, overlapping it
        let obb = Obb::new(
            Vec3::new(1.0, 0.1, 0.1),
            Vec3::new(0.5, 0.5, 0.0),
            Quat::from_rotation_z(-std::f32::consts::FRAC_PI_4),
        );
        assert!(tri.intersects_obb(&vertices, &obb));
        // the same slab lifted well above the plane
        let lifted = Obb::new(
            Vec3::new(1.0, 0.1, 0.1),
            Vec3::new(0.5, 0.5, 1.0),
            Quat::from_rotation_z(-std::f32::consts::FRAC_PI_4),
        );
        assert!(!tri.intersects_obb(&vertices, &lifted));
    }
}

//! Building a `CollisionContent` from raw mesh geometry
//!
//! Meshes are appended one at a time (with a bake transform), then `build`
//! partitions the gathered triangles into a loose octree. The partition works
//! in place on an index permutation: each node claims a contiguous range of
//! the triangle array, large triangles are kept at the node that first fits
//! them, and the rest are split into octants by bounding-sphere center. No
//! triangle is ever duplicated.

use crate::aabb::Aabb;
use crate::content::{CollisionContent, TreeNode};
use crate::shapes::Sphere;
use crate::triangle::Triangle;
use glam::{Mat4, Vec3};
use marrow_core::{MarrowError, Result};

/// Triangles with a bounding sphere at least this fraction of a node's
/// diagonal stay at that node instead of descending further.
pub const DEFAULT_EXPANSION_FACTOR: f32 = 0.25;

/// Cells holding this many triangles or fewer become leaves.
const LEAF_TRIANGLES: usize = 4;

/// Accumulates mesh geometry and builds the octree.
pub struct CollisionBuilder {
    vertices: Vec<Vec3>,
    triangles: Vec<Triangle>,
    spheres: Vec<Sphere>,
    bounds: Option<Aabb>,
    expansion_factor: f32,
    swap_winding: bool,
    down_facing: usize,
}

impl Default for CollisionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CollisionBuilder {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            triangles: Vec::new(),
            spheres: Vec::new(),
            bounds: None,
            expansion_factor: DEFAULT_EXPANSION_FACTOR,
            swap_winding: false,
            down_facing: 0,
        }
    }

    /// How far bounding boxes inflate in each direction, as a fraction of
    /// the cell diagonal.
    pub fn expansion_factor(mut self, factor: f32) -> Self {
        self.expansion_factor = factor;
        self
    }

    /// Flip triangle winding for meshes authored with the opposite
    /// handedness.
    pub fn swap_winding(mut self, swap: bool) -> Self {
        self.swap_winding = swap;
        self
    }

    /// Append one mesh's geometry, baking `transform` into the vertices.
    /// `indices` is a flat triangle list; a trailing partial triple is
    /// ignored.
    pub fn append_mesh(&mut self, positions: &[Vec3], indices: &[u32], transform: Mat4) {
        let v_base = self.vertices.len() as u32;
        for &p in positions {
            let vt = transform.transform_point3(p);
            match &mut self.bounds {
                Some(bounds) => bounds.include(vt),
                None => self.bounds = Some(Aabb::new(vt, vt)),
            }
            self.vertices.push(vt);
        }
        let (tb, tc) = if self.swap_winding { (1, 2) } else { (2, 1) };
        for tri in indices.chunks_exact(3) {
            let a = tri[0] + v_base;
            let b = tri[tb] + v_base;
            let c = tri[tc] + v_base;
            self.append_triangle(a, b, c);
        }
    }

    fn append_triangle(&mut self, a: u32, b: u32, c: u32) {
        let va = self.vertices[a as usize];
        let vb = self.vertices[b as usize];
        let vc = self.vertices[c as usize];

        let raw_normal = (vb - va).cross(vc - vb);
        if raw_normal.y < 0.0 {
            self.down_facing += 1;
        }
        let normal = if raw_normal.length_squared() > 1e-10 {
            raw_normal.normalize()
        } else {
            log::warn!(
                "triangle {} has a near-zero normal; substituting an axis",
                self.triangles.len()
            );
            // any axis will do for a degenerate sliver
            if raw_normal.x > 0.0 {
                Vec3::X
            } else if raw_normal.x < 0.0 {
                -Vec3::X
            } else if raw_normal.z > 0.0 {
                Vec3::Z
            } else if raw_normal.z < 0.0 {
                -Vec3::Z
            } else if raw_normal.y < 0.0 {
                -Vec3::Y
            } else {
                Vec3::Y
            }
        };

        // Bounding sphere, first guess: centered on the midpoint of the
        // longest edge. Exact for right and blunt triangles.
        let la = (vb - va).length();
        let lb = (vc - vb).length();
        let lc = (va - vc).length();
        let center = if la > lb {
            if la > lc {
                (vb + va) * 0.5
            } else {
                (va + vc) * 0.5
            }
        } else if lb > lc {
            (vc + vb) * 0.5
        } else {
            (va + vc) * 0.5
        };
        // an edge midpoint lies on the plane, so it gives the plane distance
        let distance = normal.dot(center);
        let radius = (va - center)
            .length()
            .max((vb - center).length())
            .max((vc - center).length());
        let mut sphere = Sphere::new(center, radius);

        // For a sharp triangle the circumcenter sits inside; a candidate
        // biased toward the vertex opposite the shortest edge can beat the
        // edge-midpoint guess.
        let alt = if la < lb {
            if la < lc {
                (vc * 2.0 + vb + va) * 0.25
            } else {
                (vb * 2.0 + vc + va) * 0.25
            }
        } else if lb < lc {
            (va * 2.0 + vb + vc) * 0.25
        } else {
            (vb * 2.0 + vc + va) * 0.25
        };
        let alt_radius = (va - alt)
            .length()
            .max((vb - alt).length())
            .max((vc - alt).length());
        if alt_radius < sphere.radius {
            sphere = Sphere::new(alt, alt_radius);
        }

        self.triangles.push(Triangle::new(a, b, c, normal, distance));
        self.spheres.push(sphere);
    }

    /// Partition the gathered triangles into the octree and produce the
    /// finished, query-ready structure.
    ///
    /// Fails if any triangle's barycentric basis is degenerate — later
    /// queries would divide by zero, so the asset is rejected outright.
    pub fn build(self) -> Result<CollisionContent> {
        // the world cell is cubical: take the longest axis
        let raw_bounds = self.bounds.unwrap_or(Aabb::new(Vec3::ZERO, Vec3::ZERO));
        let center = raw_bounds.center();
        let half = raw_bounds.half_dim();
        let extent = half.x.max(half.y).max(half.z);
        let bounds = Aabb::new(center - Vec3::splat(extent), center + Vec3::splat(extent));

        let mut order: Vec<u32> = (0..self.triangles.len() as u32).collect();
        let mut nodes = Vec::new();
        build_nodes(
            &mut order,
            0,
            self.triangles.len(),
            &mut nodes,
            bounds,
            &self.spheres,
            self.expansion_factor,
        );

        // lay the triangles out in partition order, then finish their bases
        let mut triangles: Vec<Triangle> =
            order.iter().map(|&i| self.triangles[i as usize]).collect();
        for (index, triangle) in triangles.iter_mut().enumerate() {
            if !triangle.calc_basis(&self.vertices) {
                return Err(MarrowError::DegenerateTriangle {
                    index,
                    detail: format!(
                        "vertices {:?} {:?} {:?}",
                        self.vertices[triangle.a as usize],
                        self.vertices[triangle.b as usize],
                        self.vertices[triangle.c as usize],
                    ),
                });
            }
        }

        if self.down_facing * 2 > triangles.len() {
            log::warn!(
                "{} of {} triangles have down-facing normals",
                self.down_facing,
                triangles.len()
            );
        }
        log::info!(
            "built collision content with {} triangles, {} vertices, {} cells",
            triangles.len(),
            self.vertices.len(),
            nodes.len()
        );

        Ok(CollisionContent::from_parts(
            self.vertices,
            triangles,
            nodes,
            bounds,
        ))
    }
}

/// Recursively build the node for `order[lo..hi]`, splitting into up to
/// eight children. The index array is rearranged in place; each node ends up
/// owning a contiguous range.
fn build_nodes(
    order: &mut [u32],
    lo: usize,
    hi: usize,
    nodes: &mut Vec<TreeNode>,
    bounds: Aabb,
    spheres: &[Sphere],
    expansion_factor: f32,
) {
    let mut node = TreeNode {
        tri_start: lo as u32,
        expansion: (bounds.hi - bounds.lo).length() * expansion_factor,
        ..TreeNode::default()
    };

    // triangles too large for a child cell stay here, swapped to the front
    let mut lo = lo;
    for i in lo..hi {
        if spheres[order[i] as usize].radius >= node.expansion {
            order.swap(i, lo);
            lo += 1;
        }
    }
    node.tri_end = lo as u32;

    let index = nodes.len();
    nodes.push(node);

    let lb = bounds.lo;
    let ub = bounds.hi;
    let cb = lb + (ub - lb) * 0.5;
    if hi > lo + LEAF_TRIANGLES {
        // three-way axis split: X, then Y inside each half, then Z inside
        // each quarter
        let mid_x = partition(order, lo, hi, spheres, 0, cb.x);
        let mid_x_lo = partition(order, lo, mid_x, spheres, 1, cb.y);
        let mid_x_hi = partition(order, mid_x, hi, spheres, 1, cb.y);
        let m00 = partition(order, lo, mid_x_lo, spheres, 2, cb.z);
        let m01 = partition(order, mid_x_lo, mid_x, spheres, 2, cb.z);
        let m10 = partition(order, mid_x, mid_x_hi, spheres, 2, cb.z);
        let m11 = partition(order, mid_x_hi, hi, spheres, 2, cb.z);

        let ranges = [
            (lo, m00),
            (m00, mid_x_lo),
            (mid_x_lo, m01),
            (m01, mid_x),
            (mid_x, m10),
            (m10, mid_x_hi),
            (mid_x_hi, m11),
            (m11, hi),
        ];
        for (octant, &(start, end)) in ranges.iter().enumerate() {
            if start < end {
                nodes[index].children[octant] = nodes.len() as u32;
                let cell = bounds.octant(cb, octant);
                build_nodes(order, start, end, nodes, cell, spheres, expansion_factor);
            }
        }
    } else {
        // few enough to keep them all right here
        nodes[index].tri_end = hi as u32;
    }
}

/// Two-pointer in-place partition of `order[lo..hi]` on whether a triangle's
/// bounding-sphere center sits below the split plane. Returns the index of
/// the first "high" element. Inspired by the QuickSort partition step.
fn partition(
    order: &mut [u32],
    lo: usize,
    hi: usize,
    spheres: &[Sphere],
    axis: usize,
    split: f32,
) -> usize {
    let ilo = lo;
    let ihi = hi;
    let mut lo = lo;
    let mut hi = hi;
    while lo < hi && lo < ihi && hi > ilo {
        // when lo and hi - 1 alias, one of the first two branches runs and
        // steps out of the loop
        if spheres[order[lo] as usize].center[axis] < split {
            lo += 1;
        } else if spheres[order[hi - 1] as usize].center[axis] >= split {
            hi -= 1;
        } else {
            // lo points at a high element and hi - 1 at a low one
            debug_assert!(lo < hi - 1);
            order.swap(lo, hi - 1);
            lo += 1;
            hi -= 1;
        }
    }
    debug_assert_eq!(lo, hi);
    lo
}

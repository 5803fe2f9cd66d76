//! The collision query engine: a flat loose octree over a triangle soup
//!
//! Every query walks the same tree with a shape-specific tester: a cheap,
//! deliberately conservative cell test (`overlaps`) decides which children to
//! visit, and an exact triangle test (`intersects`) decides what lands in the
//! result list. Testers are plain value types dispatched by monomorphization,
//! so the per-node cost carries no virtual calls.

use crate::aabb::Aabb;
use crate::obb::Obb;
use crate::shapes::{Ray, Sphere};
use crate::triangle::{Triangle, DEFAULT_COLL_DELTA};
use glam::Vec3;

/// One cell of the octree. Node 0 is the root; a child index of 0 means "no
/// child" (the root can never be its own child). `expansion` is the loose
/// slack this node was built with — traversal widens the child cell tests by
/// it, since triangles too large for the children are stored here.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeNode {
    pub expansion: f32,
    pub tri_start: u32,
    pub tri_end: u32,
    /// Children by octant; bit 2 = high X half, bit 1 = high Y, bit 0 = high Z.
    pub children: [u32; 8],
}

/// Static triangle-soup collision structure: shared vertex and triangle
/// arrays, the octree nodes, and the (always cubical) world bounds.
///
/// Built once by [`crate::builder::CollisionBuilder`] and read-only
/// afterwards, except for the reusable result buffer — concurrent queries
/// need separate `CollisionContent` clones or external result storage.
#[derive(Debug, Clone)]
pub struct CollisionContent {
    pub(crate) vertices: Vec<Vec3>,
    pub(crate) triangles: Vec<Triangle>,
    pub(crate) nodes: Vec<TreeNode>,
    pub(crate) bounds: Aabb,
    coll_min: f32,
    coll_max: f32,
    results: Vec<u32>,
}

trait Tester {
    /// Conservative cell acceptance against an (expanded) axis-aligned box.
    fn overlaps(&mut self, bounds: &Aabb, expand: f32) -> bool;
    /// Exact triangle test.
    fn intersects(&mut self, triangle: &Triangle, content: &CollisionContent) -> bool;
}

struct RayTester {
    ray: Ray,
    /// Shrinks as hits are found, so later triangles must beat the nearest
    /// hit so far.
    best: f32,
}

impl Tester for RayTester {
    fn overlaps(&mut self, bounds: &Aabb, expand: f32) -> bool {
        let mut d = self.best;
        bounds.intersects_ray(&self.ray, &mut d, expand)
    }

    fn intersects(&mut self, triangle: &Triangle, content: &CollisionContent) -> bool {
        triangle.intersects_ray(
            &content.vertices,
            &self.ray,
            &mut self.best,
            content.coll_min,
            content.coll_max,
        )
    }
}

struct AabbTester {
    aabb: Aabb,
}

impl Tester for AabbTester {
    fn overlaps(&mut self, bounds: &Aabb, expand: f32) -> bool {
        bounds.overlaps(&self.aabb, expand)
    }

    fn intersects(&mut self, triangle: &Triangle, content: &CollisionContent) -> bool {
        triangle.intersects_aabb(&content.vertices, &self.aabb)
    }
}

struct ObbTester {
    obb: Obb,
}

impl Tester for ObbTester {
    fn overlaps(&mut self, bounds: &Aabb, expand: f32) -> bool {
        self.obb.overlaps(bounds, expand)
    }

    fn intersects(&mut self, triangle: &Triangle, content: &CollisionContent) -> bool {
        triangle.intersects_obb(&content.vertices, &self.obb)
    }
}

struct SphereTester {
    sphere: Sphere,
}

impl Tester for SphereTester {
    fn overlaps(&mut self, bounds: &Aabb, expand: f32) -> bool {
        bounds.overlaps_sphere(&self.sphere, expand)
    }

    fn intersects(&mut self, triangle: &Triangle, content: &CollisionContent) -> bool {
        triangle.intersects_sphere(&content.vertices, &self.sphere)
    }
}

impl CollisionContent {
    pub(crate) fn from_parts(
        vertices: Vec<Vec3>,
        triangles: Vec<Triangle>,
        nodes: Vec<TreeNode>,
        bounds: Aabb,
    ) -> Self {
        Self {
            vertices,
            triangles,
            nodes,
            bounds,
            coll_min: -DEFAULT_COLL_DELTA,
            coll_max: 1.0 + DEFAULT_COLL_DELTA,
            results: Vec::new(),
        }
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// World bounds of the whole structure, always a cube.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Outward tolerance on the ray/triangle edge tests.
    pub fn coll_delta(&self) -> f32 {
        -self.coll_min
    }

    pub fn set_coll_delta(&mut self, delta: f32) {
        self.coll_min = -delta;
        self.coll_max = 1.0 + delta;
    }

    /// All triangles a ray hits within `max_distance`, front faces only.
    ///
    /// The search distance shrinks as hits are found, so the *last* index in
    /// the result is the nearest hit.
    pub fn collect_ray(&mut self, ray: Ray, max_distance: f32) -> &[u32] {
        self.collect(RayTester {
            ray,
            best: max_distance,
        })
    }

    /// All triangles intersecting an axis-aligned box.
    pub fn collect_aabb(&mut self, aabb: Aabb) -> &[u32] {
        self.collect(AabbTester { aabb })
    }

    /// All triangles intersecting an oriented box.
    pub fn collect_obb(&mut self, obb: Obb) -> &[u32] {
        self.collect(ObbTester { obb })
    }

    /// All triangles intersecting a sphere.
    pub fn collect_sphere(&mut self, sphere: Sphere) -> &[u32] {
        self.collect(SphereTester { sphere })
    }

    fn collect<T: Tester>(&mut self, mut tester: T) -> &[u32] {
        let mut out = std::mem::take(&mut self.results);
        out.clear();
        if !self.nodes.is_empty() && tester.overlaps(&self.bounds, 0.0) {
            let bounds = self.bounds;
            self.traverse(0, &bounds, &mut tester, &mut out);
        }
        self.results = out;
        &self.results
    }

    fn traverse<T: Tester>(&self, index: usize, bounds: &Aabb, tester: &mut T, out: &mut Vec<u32>) {
        let node = self.nodes[index];
        for i in node.tri_start..node.tri_end {
            if tester.intersects(&self.triangles[i as usize], self) {
                out.push(i);
            }
        }
        let center = bounds.center();
        for (octant, &child) in node.children.iter().enumerate() {
            if child == 0 {
                continue;
            }
            let cell = bounds.octant(center, octant);
            // this node's expansion, not the child's: triangles pushed down
            // were only guaranteed smaller than this node's slack, so they
            // can overhang the child cell by up to that much
            if tester.overlaps(&cell, node.expansion) {
                self.traverse(child as usize, &cell, tester, out);
            }
        }
    }
}

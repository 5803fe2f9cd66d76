//! Static collision queries for the Marrow engine
//!
//! Triangle meshes are baked once into a [`CollisionContent`] — a flat
//! triangle soup partitioned by a loose octree — and then queried any number
//! of times with rays, axis-aligned boxes, oriented boxes, or spheres. Cell
//! tests are conservative and cheap; the triangles that come back all passed
//! the exact per-shape test.

pub mod aabb;
pub mod builder;
pub mod content;
pub mod obb;
pub mod shapes;
pub mod triangle;

pub use aabb::Aabb;
pub use builder::CollisionBuilder;
pub use content::{CollisionContent, TreeNode};
pub use obb::Obb;
pub use shapes::{Ray, Sphere};
pub use triangle::Triangle;

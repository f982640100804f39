//! Primitive collections and their per-ray intersectors.

pub mod spheres;
pub mod trimesh;

pub use spheres::{SphereIntersector, SphereSet};
pub use trimesh::{TriangleIntersector, TriangleMesh};

//! A crate which exports rays, axis-aligned bounding boxes, and a binned-SAH
//! bounding volume hierarchy together with watertight primitive intersectors.
//!
//! ## About
//!
//! This crate answers closest-hit and any-hit ray queries against scenes made
//! of triangle meshes and analytic spheres. A BVH (Bounding Volume Hierarchy)
//! is built once per primitive collection, which reduces the per-ray
//! intersection complexity from O(n) to O(log2(n)). The triangle kernel is
//! watertight, so rays grazing a shared edge never leak between neighboring
//! triangles.
//!
//! Geometry arrays are borrowed, not copied. The caller keeps ownership of
//! vertex, face, center and radius buffers and must keep them alive for the
//! lifetime of the [`Scene`].
//!
//! ## Example
//!
//! ```
//! use nalgebra::{Point3, Vector3};
//! use raycast::ray::{Ray, RayHit};
//! use raycast::scene::Scene;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let faces = vec![[0u32, 1, 2]];
//!
//! let mut scene = Scene::new();
//! let geom_id = scene.add_mesh(&vertices, &faces);
//! assert_eq!(geom_id, 0);
//! assert!(scene.commit());
//!
//! let ray = Ray::new(Point3::new(0.25, 0.25, 1.0), Vector3::new(0.0, 0.0, -1.0));
//! let mut rayhit = RayHit::default();
//! assert!(scene.intersect1(&ray, &mut rayhit));
//! assert!((rayhit.hit_distance - 1.0f64).abs() < 1e-12);
//! ```
//!
//! [`Scene`]: scene/struct.Scene.html

use nalgebra::{ClosedAddAssign, ClosedDivAssign, ClosedMulAssign, ClosedSubAssign, SimdPartialOrd};
use num::traits::FloatConst;
use num::{Float, FromPrimitive, Signed, ToPrimitive};

pub mod aabb;
pub mod bvh;
pub mod collection;
pub mod primitives;
pub mod ray;
pub mod scene;

#[cfg(test)]
mod testbase;

/// Sentinel id returned by [`Scene`] mutators on precondition violations and
/// carried by [`RayHit`] fields before a hit is committed.
///
/// [`Scene`]: scene/struct.Scene.html
/// [`RayHit`]: ray/struct.RayHit.html
pub const INVALID_ID: u32 = u32::MAX;

/// The scalar type the crate is monomorphized over.
///
/// Bundles the nalgebra operator bounds with the `num` float capabilities the
/// kernels need. Implemented by `f32` and `f64`; per-ray code never goes
/// through dynamic dispatch.
pub trait RtValue:
    nalgebra::Scalar
    + Copy
    + ClosedAddAssign
    + ClosedSubAssign
    + ClosedMulAssign
    + ClosedDivAssign
    + SimdPartialOrd
    + Float
    + FloatConst
    + FromPrimitive
    + ToPrimitive
    + Signed
    + std::fmt::Display
    + Send
    + Sync
    + 'static
{
}

impl<T> RtValue for T where
    T: nalgebra::Scalar
        + Copy
        + ClosedAddAssign
        + ClosedSubAssign
        + ClosedMulAssign
        + ClosedDivAssign
        + SimdPartialOrd
        + Float
        + FloatConst
        + FromPrimitive
        + ToPrimitive
        + Signed
        + std::fmt::Display
        + Send
        + Sync
        + 'static
{
}

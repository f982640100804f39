//! Common utilities shared by unit tests.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::aabb::Aabb;
use crate::collection::{PrimitiveCollection, RayIntersector};
use crate::ray::{Ray, RayHit};
use crate::INVALID_ID;

/// Scalar used by the tests.
pub type TVal = f64;

/// A vector represented as a tuple.
pub type TupleVec = (TVal, TVal, TVal);

pub type TPoint3 = nalgebra::Point3<TVal>;
pub type TVector3 = nalgebra::Vector3<TVal>;
pub type TAabb3 = crate::aabb::Aabb<TVal>;
pub type TRay3 = crate::ray::Ray<TVal>;

/// Generate a [`TupleVec`] for [`proptest::strategy::Strategy`] from -10e10
/// to 10e10. A small enough range to prevent most fp errors from breaking
/// tests.
pub fn tuplevec_small_strategy() -> impl Strategy<Value = TupleVec> {
    (
        -10e10_f64..10e10_f64,
        -10e10_f64..10e10_f64,
        -10e10_f64..10e10_f64,
    )
}

/// Convert a [`TupleVec`] to a [`TPoint3`].
pub fn tuple_to_point(tpl: &TupleVec) -> TPoint3 {
    TPoint3::new(tpl.0, tpl.1, tpl.2)
}

/// Convert a [`TupleVec`] to a [`TVector3`].
pub fn tuple_to_vector(tpl: &TupleVec) -> TVector3 {
    TVector3::new(tpl.0, tpl.1, tpl.2)
}

/// A primitive collection of unit boxes centered on the given points.
pub struct UnitBoxes {
    pub centers: Vec<TPoint3>,
}

impl UnitBoxes {
    fn aabb(&self, prim_id: u32) -> TAabb3 {
        let pos = self.centers[prim_id as usize];
        Aabb::with_bounds(
            pos + TVector3::new(-0.5, -0.5, -0.5),
            pos + TVector3::new(0.5, 0.5, 0.5),
        )
    }
}

impl PrimitiveCollection<TVal> for UnitBoxes {
    fn len(&self) -> usize {
        self.centers.len()
    }

    fn bounding_box(&self, prim_id: u32) -> TAabb3 {
        self.aabb(prim_id)
    }

    fn center(&self, prim_id: u32) -> TPoint3 {
        self.centers[prim_id as usize]
    }
}

/// Wraps positions into a [`UnitBoxes`] collection.
pub fn unit_boxes_at(centers: &[TPoint3]) -> UnitBoxes {
    UnitBoxes {
        centers: centers.to_vec(),
    }
}

/// Generate 21 unit boxes along the x axis centered on whole numbers
/// (-10, -9, ..., 10).
pub fn generate_aligned_boxes() -> UnitBoxes {
    unit_boxes_at(
        &(-10..11)
            .map(|x| TPoint3::new(x as TVal, 0.0, 0.0))
            .collect::<Vec<_>>(),
    )
}

/// Joint bounds of the listed primitives.
pub fn collection_bounds<C: PrimitiveCollection<TVal>>(collection: &C, indices: &[u32]) -> TAabb3 {
    let mut bounds = Aabb::empty();
    for &prim_id in indices {
        bounds.join_mut(&collection.bounding_box(prim_id));
    }
    bounds
}

/// Slab intersector over [`UnitBoxes`], recording the nearest box entry
/// distance. Lets traversal tests run without triangle or sphere kernels.
pub struct UnitBoxIntersector<'a> {
    boxes: &'a UnitBoxes,
    ray: Ray<TVal>,
    t: TVal,
    prim_id: u32,
}

impl<'a> UnitBoxIntersector<'a> {
    pub fn new(boxes: &'a UnitBoxes, ray: &Ray<TVal>) -> UnitBoxIntersector<'a> {
        UnitBoxIntersector {
            boxes,
            ray: *ray,
            t: ray.t_max,
            prim_id: INVALID_ID,
        }
    }
}

impl RayIntersector<TVal> for UnitBoxIntersector<'_> {
    fn intersect(&mut self, prim_id: u32) -> bool {
        let aabb = self.boxes.aabb(prim_id);

        let mut t_near = self.ray.t_min;
        let mut t_far = self.t;
        for i in 0..3 {
            let (near_plane, far_plane) = if self.ray.direction_sign[i] {
                (aabb.max[i], aabb.min[i])
            } else {
                (aabb.min[i], aabb.max[i])
            };
            t_near = t_near.max((near_plane - self.ray.origin[i]) * self.ray.direction_inv[i]);
            t_far = t_far.min((far_plane - self.ray.origin[i]) * self.ray.direction_inv[i]);
        }
        if t_near > t_far {
            return false;
        }

        self.t = t_near.max(self.ray.t_min);
        self.prim_id = prim_id;
        true
    }

    fn distance(&self) -> TVal {
        self.t
    }

    fn finalize(&self, hit: bool, rayhit: &mut RayHit<TVal>) {
        if hit {
            rayhit.hit_distance = self.t;
            rayhit.uv = nalgebra::Vector2::zeros();
            rayhit.prim_id = self.prim_id;
        }
    }
}

/// The unit quad split into two triangles along its diagonal.
pub fn quad_vertices_and_faces() -> (Vec<TPoint3>, Vec<[u32; 3]>) {
    (
        vec![
            TPoint3::new(0.0, 0.0, 0.0),
            TPoint3::new(1.0, 0.0, 0.0),
            TPoint3::new(0.0, 1.0, 0.0),
            TPoint3::new(1.0, 1.0, 0.0),
        ],
        vec![[0, 1, 2], [1, 3, 2]],
    )
}

/// A deterministic soup of `count` small triangles scattered in a cube of
/// side 20 around the origin.
pub fn triangle_soup(seed: u64, count: usize) -> (Vec<TPoint3>, Vec<[u32; 3]>) {
    let mut seed_bytes = [0u8; 32];
    seed_bytes[..8].copy_from_slice(&seed.to_le_bytes());
    let mut rng = StdRng::from_seed(seed_bytes);

    let mut vertices = Vec::with_capacity(count * 3);
    let mut faces = Vec::with_capacity(count);
    for i in 0..count {
        let base = TPoint3::new(
            rng.gen_range(-10.0..10.0),
            rng.gen_range(-10.0..10.0),
            rng.gen_range(-10.0..10.0),
        );
        let jitter = |rng: &mut StdRng| {
            TVector3::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            )
        };
        vertices.push(base);
        vertices.push(base + jitter(&mut rng));
        vertices.push(base + jitter(&mut rng));
        let v = (i * 3) as u32;
        faces.push([v, v + 1, v + 2]);
    }
    (vertices, faces)
}

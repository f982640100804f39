//! Analytic sphere sets and their ray intersector.

use nalgebra::{Point3, Vector2, Vector3};

use crate::aabb::Aabb;
use crate::bvh::TraceOptions;
use crate::collection::{PrimitiveCollection, RayIntersector};
use crate::ray::{Ray, RayHit};
use crate::{RtValue, INVALID_ID};

/// A set of spheres as two borrowed, parallel arrays of centers and radii.
#[derive(Debug, Clone, Copy)]
pub struct SphereSet<'a, T: RtValue> {
    centers: &'a [Point3<T>],
    radii: &'a [T],
}

impl<'a, T: RtValue> SphereSet<'a, T> {
    /// Creates a sphere set view over `centers` and `radii`.
    ///
    /// The arrays must have equal length.
    pub fn new(centers: &'a [Point3<T>], radii: &'a [T]) -> SphereSet<'a, T> {
        debug_assert_eq!(centers.len(), radii.len());
        SphereSet { centers, radii }
    }
}

impl<T: RtValue> PrimitiveCollection<T> for SphereSet<'_, T> {
    fn len(&self) -> usize {
        self.centers.len()
    }

    fn bounding_box(&self, prim_id: u32) -> Aabb<T> {
        let center = self.centers[prim_id as usize];
        let half = Vector3::repeat(self.radii[prim_id as usize]);
        Aabb::with_bounds(center - half, center + half)
    }

    fn center(&self, prim_id: u32) -> Point3<T> {
        self.centers[prim_id as usize]
    }
}

/// Analytic ray/sphere intersector solving the half-b quadratic.
pub struct SphereIntersector<'a, T: RtValue> {
    spheres: SphereSet<'a, T>,

    origin: Point3<T>,
    direction: Vector3<T>,

    t_min: T,
    prim_ids_range: (u32, u32),
    skip_prim_id: u32,

    t: T,
    uv: Vector2<T>,
    prim_id: u32,
}

impl<'a, T: RtValue> SphereIntersector<'a, T> {
    /// Prepares an intersector for one ray. Called once per query.
    pub fn new(
        spheres: &SphereSet<'a, T>,
        ray: &Ray<T>,
        trace_options: &TraceOptions,
    ) -> SphereIntersector<'a, T> {
        SphereIntersector {
            spheres: *spheres,
            origin: ray.origin,
            direction: ray.direction,
            t_min: ray.t_min,
            prim_ids_range: trace_options.prim_ids_range,
            skip_prim_id: trace_options.skip_prim_id,
            t: ray.t_max,
            uv: Vector2::zeros(),
            prim_id: INVALID_ID,
        }
    }
}

impl<T: RtValue> RayIntersector<T> for SphereIntersector<'_, T> {
    fn intersect(&mut self, prim_id: u32) -> bool {
        if prim_id < self.prim_ids_range.0 || prim_id >= self.prim_ids_range.1 {
            return false;
        }
        if prim_id == self.skip_prim_id {
            return false;
        }

        let center = self.spheres.centers[prim_id as usize];
        let radius = self.spheres.radii[prim_id as usize];

        let oc = self.origin - center;
        let a = self.direction.dot(&self.direction);
        let half_b = oc.dot(&self.direction);
        let c = oc.dot(&oc) - radius * radius;

        let discriminant = half_b * half_b - a * c;
        if discriminant < T::zero() {
            return false;
        }
        let sqrt_d = discriminant.sqrt();

        // Prefer the near root; fall back to the far one when the origin is
        // inside the sphere or the near root is behind `t_min`.
        let mut t = (-half_b - sqrt_d) / a;
        if t < self.t_min {
            t = (-half_b + sqrt_d) / a;
        }
        if t < self.t_min || t >= self.t {
            return false;
        }

        let hit_point = self.origin + self.direction * t;
        let normal = (hit_point - center) / radius;

        let two = T::one() + T::one();
        let theta = (-normal.y).acos();
        let phi = (-normal.z).atan2(normal.x) + T::PI();

        self.t = t;
        self.uv = Vector2::new(phi / (two * T::PI()), theta / T::PI());
        self.prim_id = prim_id;
        true
    }

    fn distance(&self) -> T {
        self.t
    }

    fn finalize(&self, hit: bool, rayhit: &mut RayHit<T>) {
        if hit {
            rayhit.hit_distance = self.t;
            rayhit.uv = self.uv;
            rayhit.prim_id = self.prim_id;
        }
    }
}

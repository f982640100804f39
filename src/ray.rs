//! Rays, hit records, and the slab intersection test against axis aligned
//! bounding boxes.

use nalgebra::{Point3, Vector2, Vector3};

use crate::aabb::Aabb;
use crate::{RtValue, INVALID_ID};

/// A ray with cached reciprocal direction data and a query interval.
#[derive(Debug, Clone, Copy)]
pub struct Ray<T: RtValue> {
    /// The ray origin.
    pub origin: Point3<T>,

    /// The ray direction. Not required to be unit length; reported hit
    /// distances are parametric in this direction.
    pub direction: Vector3<T>,

    /// Componentwise reciprocal of `direction`. Cached for [`Aabb`]
    /// intersections. Invariant: `direction_inv[i] * direction[i] == 1`.
    ///
    /// [`Aabb`]: ../aabb/struct.Aabb.html
    pub direction_inv: Vector3<T>,

    /// `true` where the direction component is negative. Selects the near and
    /// far slab planes and orders child visits during traversal.
    pub direction_sign: [bool; 3],

    /// Lower bound of the accepted hit interval.
    pub t_min: T,

    /// Upper bound of the accepted hit interval.
    pub t_max: T,

    /// When set, traversal terminates on the first accepted hit instead of
    /// searching for the closest one.
    pub any_hit: bool,
}

impl<T: RtValue> Ray<T> {
    /// Creates a new [`Ray`] accepting hits anywhere in `[0, +inf)`.
    ///
    /// # Examples
    /// ```
    /// use nalgebra::{Point3, Vector3};
    /// use raycast::ray::Ray;
    ///
    /// let origin = Point3::new(0.0, 0.0, 0.0);
    /// let direction = Vector3::new(1.0, 0.0, 0.0);
    /// let ray = Ray::new(origin, direction);
    ///
    /// assert_eq!(ray.origin, origin);
    /// assert_eq!(ray.direction, direction);
    /// assert_eq!(ray.direction_inv.x, 1.0);
    /// ```
    pub fn new(origin: Point3<T>, direction: Vector3<T>) -> Ray<T> {
        Ray::with_interval(origin, direction, T::zero(), T::infinity())
    }

    /// Creates a new [`Ray`] accepting hits in `[t_min, t_max]`.
    pub fn with_interval(origin: Point3<T>, direction: Vector3<T>, t_min: T, t_max: T) -> Ray<T> {
        Ray {
            origin,
            direction,
            direction_inv: direction.map(|x| T::one() / x),
            direction_sign: [
                direction[0] < T::zero(),
                direction[1] < T::zero(),
                direction[2] < T::zero(),
            ],
            t_min,
            t_max,
            any_hit: false,
        }
    }

    /// Tests the intersection of this [`Ray`] with an [`Aabb`] over the
    /// parametric interval `[t_min, t_max]` using the ordered slab test.
    ///
    /// The far plane distance is widened by `1 + 4 * epsilon`, which keeps
    /// rays grazing a box face from slipping between touching boxes.
    ///
    /// # Examples
    /// ```
    /// use nalgebra::{Point3, Vector3};
    /// use raycast::aabb::Aabb;
    /// use raycast::ray::Ray;
    ///
    /// let ray = Ray::new(Point3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
    /// let aabb = Aabb::with_bounds(Point3::new(99.9, -1.0, -1.0), Point3::new(100.1, 1.0, 1.0));
    ///
    /// assert!(ray.intersects_aabb(&aabb, ray.t_min, ray.t_max));
    /// ```
    ///
    /// [`Aabb`]: ../aabb/struct.Aabb.html
    pub fn intersects_aabb(&self, aabb: &Aabb<T>, t_min: T, t_max: T) -> bool {
        let four = T::one() + T::one() + T::one() + T::one();
        let widen = T::one() + four * T::epsilon();

        let mut t_near = t_min;
        let mut t_far = t_max;

        for i in 0..3 {
            let (near_plane, far_plane) = if self.direction_sign[i] {
                (aabb.max[i], aabb.min[i])
            } else {
                (aabb.min[i], aabb.max[i])
            };

            // 0 * inf produces NaN here; min/max then keep the other operand,
            // which treats an in-plane ray as inside the slab.
            let near = (near_plane - self.origin[i]) * self.direction_inv[i];
            let far = (far_plane - self.origin[i]) * self.direction_inv[i] * widen;

            t_near = t_near.max(near);
            t_far = t_far.min(far);
        }

        t_near <= t_far
    }
}

/// The result of a ray query.
///
/// Starts out with an infinite `hit_distance` and sentinel ids. Intersection
/// code overwrites all four fields on a hit and leaves the record untouched on
/// a miss.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit<T: RtValue> {
    /// Parametric distance from the ray origin to the hit point.
    pub hit_distance: T,

    /// Surface parameters of the hit.
    pub uv: Vector2<T>,

    /// Index of the primitive that was hit, within its collection.
    pub prim_id: u32,

    /// Id of the geometry the primitive belongs to.
    pub geom_id: u32,
}

impl<T: RtValue> Default for RayHit<T> {
    fn default() -> RayHit<T> {
        RayHit {
            hit_distance: T::infinity(),
            uv: Vector2::zeros(),
            prim_id: INVALID_ID,
            geom_id: INVALID_ID,
        }
    }
}

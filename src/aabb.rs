//! Axis aligned bounding boxes.

use nalgebra::{Point3, Vector3};

use crate::RtValue;

/// An axis aligned bounding box given by its minimum and maximum corner.
///
/// The empty box carries `+inf` minima and `-inf` maxima, so growing it by any
/// point or box yields that operand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb<T: RtValue> {
    /// Minimum coordinates.
    pub min: Point3<T>,

    /// Maximum coordinates.
    pub max: Point3<T>,
}

impl<T: RtValue> Aabb<T> {
    /// Creates a new [`Aabb`] with the given bounds.
    pub fn with_bounds(min: Point3<T>, max: Point3<T>) -> Aabb<T> {
        Aabb { min, max }
    }

    /// Creates a new empty [`Aabb`].
    pub fn empty() -> Aabb<T> {
        Aabb {
            min: Point3::new(T::infinity(), T::infinity(), T::infinity()),
            max: Point3::new(T::neg_infinity(), T::neg_infinity(), T::neg_infinity()),
        }
    }

    /// Creates an [`Aabb`] containing all of space.
    pub fn infinite() -> Aabb<T> {
        Aabb {
            min: Point3::new(T::neg_infinity(), T::neg_infinity(), T::neg_infinity()),
            max: Point3::new(T::infinity(), T::infinity(), T::infinity()),
        }
    }

    /// Grows this [`Aabb`] in place to contain the point `p`.
    pub fn grow_mut(&mut self, p: &Point3<T>) {
        for i in 0..3 {
            self.min[i] = self.min[i].min(p[i]);
            self.max[i] = self.max[i].max(p[i]);
        }
    }

    /// Returns this [`Aabb`] grown to contain the point `p`.
    pub fn grow(mut self, p: &Point3<T>) -> Aabb<T> {
        self.grow_mut(p);
        self
    }

    /// Widens this [`Aabb`] in place to the union with `other`.
    pub fn join_mut(&mut self, other: &Aabb<T>) {
        for i in 0..3 {
            self.min[i] = self.min[i].min(other.min[i]);
            self.max[i] = self.max[i].max(other.max[i]);
        }
    }

    /// Returns the union of this [`Aabb`] and `other`.
    pub fn join(&self, other: &Aabb<T>) -> Aabb<T> {
        let mut result = *self;
        result.join_mut(other);
        result
    }

    /// Returns the extent of this [`Aabb`] in all three dimensions.
    ///
    /// Negative for the empty box.
    pub fn size(&self) -> Vector3<T> {
        self.max - self.min
    }

    /// Returns the center point of the [`Aabb`].
    pub fn center(&self) -> Point3<T> {
        self.min + self.size() / (T::one() + T::one())
    }

    /// Returns the total surface area of this [`Aabb`].
    pub fn surface_area(&self) -> T {
        let d = self.size().abs();
        (T::one() + T::one()) * (d[0] * d[1] + d[1] * d[2] + d[2] * d[0])
    }

    /// Returns true if the point is inside the [`Aabb`].
    pub fn contains(&self, p: &Point3<T>) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] && p[i] <= self.max[i])
    }

    /// Returns true if `other` lies inside this [`Aabb`], allowing `epsilon`
    /// slack on every face.
    pub fn approx_contains_aabb_eps(&self, other: &Aabb<T>, epsilon: T) -> bool {
        (0..3).all(|i| {
            other.min[i] - self.min[i] > -epsilon && self.max[i] - other.max[i] > -epsilon
        })
    }

    /// Returns the index of the axis with the largest extent.
    pub fn largest_axis(&self) -> usize {
        self.size().imax()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::testbase::{tuple_to_point, tuplevec_small_strategy, TAabb3};

    #[test]
    fn test_surface_area() {
        let aabb = TAabb3::with_bounds(
            tuple_to_point(&(0.0, 0.0, 0.0)),
            tuple_to_point(&(1.0, 2.0, 3.0)),
        );
        assert_eq!(aabb.surface_area(), 22.0);
    }

    #[test]
    fn test_largest_axis() {
        let aabb = TAabb3::with_bounds(
            tuple_to_point(&(0.0, 0.0, 0.0)),
            tuple_to_point(&(1.0, 5.0, 3.0)),
        );
        assert_eq!(aabb.largest_axis(), 1);
    }

    proptest! {
        // An empty aabb contains nothing.
        #[test]
        fn test_empty_contains_nothing(tpl in tuplevec_small_strategy()) {
            let p = tuple_to_point(&tpl);
            let aabb = TAabb3::empty();
            assert!(!aabb.contains(&p));
        }

        // An aabb spanned by two points always contains its center.
        #[test]
        fn test_aabb_contains_center(a in tuplevec_small_strategy(),
                                     b in tuplevec_small_strategy()) {
            let aabb = TAabb3::empty()
                .grow(&tuple_to_point(&a))
                .grow(&tuple_to_point(&b));
            assert!(aabb.contains(&aabb.center()));
        }

        // The union of two point sets contains all the points.
        #[test]
        fn test_join_two_aabbs(a in prop::array::uniform5(tuplevec_small_strategy()),
                               b in prop::array::uniform5(tuplevec_small_strategy())) {
            let points: Vec<_> = a.iter().chain(b.iter()).map(tuple_to_point).collect();

            let aabb1 = points[..5]
                .iter()
                .fold(TAabb3::empty(), |aabb, p| aabb.grow(p));
            let aabb2 = points[5..]
                .iter()
                .fold(TAabb3::empty(), |aabb, p| aabb.grow(p));
            let joint = aabb1.join(&aabb2);

            assert!(points[..5].iter().all(|p| aabb1.contains(p)));
            assert!(points[5..].iter().all(|p| aabb2.contains(p)));
            assert!(points.iter().all(|p| joint.contains(p)));
        }

        // Growing by a point can only widen a box.
        #[test]
        fn test_grow_is_monotone(a in tuplevec_small_strategy(),
                                 b in tuplevec_small_strategy(),
                                 c in tuplevec_small_strategy()) {
            let aabb = TAabb3::empty()
                .grow(&tuple_to_point(&a))
                .grow(&tuple_to_point(&b));
            let grown = aabb.grow(&tuple_to_point(&c));
            assert!(grown.approx_contains_aabb_eps(&aabb, f64::EPSILON));
        }
    }
}

//! Triangle meshes and the watertight ray/triangle intersector.

use nalgebra::{Point3, Vector2, Vector3};

use crate::aabb::Aabb;
use crate::bvh::TraceOptions;
use crate::collection::{PrimitiveCollection, RayIntersector};
use crate::ray::{Ray, RayHit};
use crate::{RtValue, INVALID_ID};

/// A triangle mesh as two borrowed, parallel arrays: vertex positions and
/// per-face index triples into them. The mesh never copies the caller's
/// buffers.
#[derive(Debug, Clone, Copy)]
pub struct TriangleMesh<'a, T: RtValue> {
    vertices: &'a [Point3<T>],
    faces: &'a [[u32; 3]],
}

impl<'a, T: RtValue> TriangleMesh<'a, T> {
    /// Creates a mesh view over `vertices` and `faces`.
    pub fn new(vertices: &'a [Point3<T>], faces: &'a [[u32; 3]]) -> TriangleMesh<'a, T> {
        TriangleMesh { vertices, faces }
    }

    /// The corner positions of face `prim_id`.
    #[inline]
    fn triangle(&self, prim_id: u32) -> [Point3<T>; 3] {
        let face = self.faces[prim_id as usize];
        [
            self.vertices[face[0] as usize],
            self.vertices[face[1] as usize],
            self.vertices[face[2] as usize],
        ]
    }

    /// The vertex buffer this mesh borrows.
    pub fn vertices(&self) -> &'a [Point3<T>] {
        self.vertices
    }

    /// The face buffer this mesh borrows.
    pub fn faces(&self) -> &'a [[u32; 3]] {
        self.faces
    }
}

impl<T: RtValue> PrimitiveCollection<T> for TriangleMesh<'_, T> {
    fn len(&self) -> usize {
        self.faces.len()
    }

    fn bounding_box(&self, prim_id: u32) -> Aabb<T> {
        let [p0, p1, p2] = self.triangle(prim_id);
        Aabb::empty().grow(&p0).grow(&p1).grow(&p2)
    }

    fn center(&self, prim_id: u32) -> Point3<T> {
        let [p0, p1, p2] = self.triangle(prim_id);
        let three = T::from_u32(3).unwrap();
        Point3::from((p0.coords + p1.coords + p2.coords) / three)
    }
}

/// Watertight ray/triangle intersector in the style of Woop et al.
///
/// Construction shears the world so the ray direction becomes the +z axis of
/// a local frame; each candidate triangle is projected into that frame, where
/// the 2D signed edge areas `U`, `V`, `W` decide containment. Edge areas that
/// come out exactly zero are recomputed in double precision, which is what
/// keeps rays along shared edges from slipping between both neighbors.
pub struct TriangleIntersector<'a, T: RtValue> {
    mesh: TriangleMesh<'a, T>,

    origin: Point3<T>,
    /// Shear coefficients of the ray-aligned frame.
    shear: Vector3<T>,
    /// Permutation of the world axes; `k[2]` is the dominant direction axis.
    k: [usize; 3],

    t_min: T,
    prim_ids_range: (u32, u32),
    skip_prim_id: u32,
    cull_back_face: bool,

    t: T,
    uv: Vector2<T>,
    prim_id: u32,
}

impl<'a, T: RtValue> TriangleIntersector<'a, T> {
    /// Prepares an intersector for one ray. Called once per query.
    pub fn new(
        mesh: &TriangleMesh<'a, T>,
        ray: &Ray<T>,
        trace_options: &TraceOptions,
    ) -> TriangleIntersector<'a, T> {
        let kz = ray.direction.iamax();
        let (kx, ky) = if ray.direction[kz] >= T::zero() {
            ((kz + 1) % 3, (kz + 2) % 3)
        } else {
            ((kz + 2) % 3, (kz + 1) % 3)
        };

        let shear = Vector3::new(
            ray.direction[kx] / ray.direction[kz],
            ray.direction[ky] / ray.direction[kz],
            T::one() / ray.direction[kz],
        );

        TriangleIntersector {
            mesh: *mesh,
            origin: ray.origin,
            shear,
            k: [kx, ky, kz],
            t_min: ray.t_min,
            prim_ids_range: trace_options.prim_ids_range,
            skip_prim_id: trace_options.skip_prim_id,
            cull_back_face: trace_options.cull_back_face,
            t: ray.t_max,
            uv: Vector2::zeros(),
            prim_id: INVALID_ID,
        }
    }
}

impl<T: RtValue> RayIntersector<T> for TriangleIntersector<'_, T> {
    fn intersect(&mut self, prim_id: u32) -> bool {
        if prim_id < self.prim_ids_range.0 || prim_id >= self.prim_ids_range.1 {
            return false;
        }
        if prim_id == self.skip_prim_id {
            return false;
        }

        let [kx, ky, kz] = self.k;
        let [p0, p1, p2] = self.mesh.triangle(prim_id);
        let a = p0 - self.origin;
        let b = p1 - self.origin;
        let c = p2 - self.origin;

        let ax = a[kx] - self.shear.x * a[kz];
        let ay = a[ky] - self.shear.y * a[kz];
        let bx = b[kx] - self.shear.x * b[kz];
        let by = b[ky] - self.shear.y * b[kz];
        let cx = c[kx] - self.shear.x * c[kz];
        let cy = c[ky] - self.shear.y * c[kz];

        let mut u = cx * by - cy * bx;
        let mut v = ax * cy - ay * cx;
        let mut w = bx * ay - by * ax;

        // An edge area of exactly zero means the ray passes through an edge
        // or vertex in this precision. Recompute the areas in f64 so both
        // triangles sharing the edge agree on the sign.
        if u == T::zero() || v == T::zero() || w == T::zero() {
            let wide = |lhs: T, rhs: T| lhs.to_f64().unwrap() * rhs.to_f64().unwrap();
            u = T::from_f64(wide(cx, by) - wide(cy, bx)).unwrap();
            v = T::from_f64(wide(ax, cy) - wide(ay, cx)).unwrap();
            w = T::from_f64(wide(bx, ay) - wide(by, ax)).unwrap();
        }

        // A hit requires a uniform sign across all three edge areas.
        let any_negative = u < T::zero() || v < T::zero() || w < T::zero();
        let any_positive = u > T::zero() || v > T::zero() || w > T::zero();
        if any_negative && any_positive {
            return false;
        }
        if any_negative && self.cull_back_face {
            return false;
        }

        let det = u + v + w;
        if det == T::zero() {
            return false;
        }

        let az = self.shear.z * a[kz];
        let bz = self.shear.z * b[kz];
        let cz = self.shear.z * c[kz];
        let rcp_det = T::one() / det;
        let t = (u * az + v * bz + w * cz) * rcp_det;

        if t > self.t || t < self.t_min {
            return false;
        }

        self.t = t;
        // Moeller-Trumbore convention: interp(p) = (1-u-v)*p0 + u*p1 + v*p2.
        self.uv = Vector2::new(v * rcp_det, w * rcp_det);
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

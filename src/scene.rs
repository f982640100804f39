//! The scene aggregator: one BVH per primitive class, a shared commit
//! lifecycle, and single-ray queries fanned out across the classes.

use log::debug;
use nalgebra::Point3;

use crate::bvh::{BuildOptions, Bvh, TraceOptions};
use crate::collection::{PrimitiveCollection, RayIntersector};
use crate::primitives::{SphereIntersector, SphereSet, TriangleIntersector, TriangleMesh};
use crate::ray::{Ray, RayHit};
use crate::{RtValue, INVALID_ID};

struct Geometry<C, T: RtValue> {
    collection: C,
    geom_id: u32,
    bvh: Option<Bvh<T>>,
}

/// A scene owning one BVH per primitive class.
///
/// The lifecycle is: add geometry, [`commit`], then query. Each `add_*` call
/// returns a monotonically increasing geometry id, or [`INVALID_ID`] once the
/// scene is committed or when the class slot is already taken. Before
/// [`commit`] no query is valid; after it the scene is immutable and can be
/// shared freely across threads.
///
/// All geometry buffers are borrowed and must outlive the scene.
///
/// [`commit`]: #method.commit
/// [`INVALID_ID`]: ../constant.INVALID_ID.html
pub struct Scene<'a, T: RtValue> {
    /// Options applied to every BVH built by [`commit`].
    ///
    /// [`commit`]: #method.commit
    pub build_options: BuildOptions,

    /// Options applied to every query.
    pub trace_options: TraceOptions,

    triangles: Option<Geometry<TriangleMesh<'a, T>, T>>,
    spheres: Option<Geometry<SphereSet<'a, T>, T>>,
    committed: bool,
    geometries: u32,
}

impl<'a, T: RtValue> Scene<'a, T> {
    /// Creates an empty scene with default options.
    pub fn new() -> Scene<'a, T> {
        Scene::with_options(BuildOptions::default(), TraceOptions::default())
    }

    /// Creates an empty scene with the given options.
    pub fn with_options(build_options: BuildOptions, trace_options: TraceOptions) -> Scene<'a, T> {
        Scene {
            build_options,
            trace_options,
            triangles: None,
            spheres: None,
            committed: false,
            geometries: 0,
        }
    }

    /// Adds a triangle mesh to the scene and returns its geometry id.
    ///
    /// Returns [`INVALID_ID`] when the scene is already committed, when a
    /// mesh is already present, or when a face indexes past the vertex
    /// buffer.
    ///
    /// [`INVALID_ID`]: ../constant.INVALID_ID.html
    pub fn add_mesh(&mut self, vertices: &'a [Point3<T>], faces: &'a [[u32; 3]]) -> u32 {
        if self.committed || self.triangles.is_some() {
            return INVALID_ID;
        }
        if faces
            .iter()
            .any(|face| face.iter().any(|&v| v as usize >= vertices.len()))
        {
            return INVALID_ID;
        }
        debug_assert!(
            vertices
                .iter()
                .all(|v| v.coords.iter().all(|c| c.is_finite())),
            "non-finite vertex coordinates"
        );

        let geom_id = self.next_geom_id();
        self.triangles = Some(Geometry {
            collection: TriangleMesh::new(vertices, faces),
            geom_id,
            bvh: None,
        });
        geom_id
    }

    /// Adds a set of spheres to the scene and returns its geometry id.
    ///
    /// Returns [`INVALID_ID`] when the scene is already committed, when
    /// spheres are already present, or when the center and radius arrays
    /// disagree in length.
    ///
    /// [`INVALID_ID`]: ../constant.INVALID_ID.html
    pub fn add_spheres(&mut self, centers: &'a [Point3<T>], radii: &'a [T]) -> u32 {
        if self.committed || self.spheres.is_some() {
            return INVALID_ID;
        }
        if centers.len() != radii.len() {
            return INVALID_ID;
        }
        debug_assert!(
            radii.iter().all(|r| r.is_finite() && *r >= T::zero()),
            "invalid sphere radius"
        );

        let geom_id = self.next_geom_id();
        self.spheres = Some(Geometry {
            collection: SphereSet::new(centers, radii),
            geom_id,
            bvh: None,
        });
        geom_id
    }

    fn next_geom_id(&mut self) -> u32 {
        let id = self.geometries;
        self.geometries += 1;
        id
    }

    /// Builds the BVH of every present primitive class and freezes the
    /// scene. Idempotent: repeated calls leave the trees unchanged.
    ///
    /// Returns `false` for a scene without geometry, which stays queryable
    /// and misses everything.
    pub fn commit(&mut self) -> bool {
        if !self.committed {
            if let Some(triangles) = &mut self.triangles {
                let bvh = Bvh::build(&triangles.collection, &self.build_options);
                debug!(
                    "committed {} triangles into {} bvh nodes",
                    triangles.collection.len(),
                    bvh.nodes.len()
                );
                triangles.bvh = Some(bvh);
            }
            if let Some(spheres) = &mut self.spheres {
                let bvh = Bvh::build(&spheres.collection, &self.build_options);
                debug!(
                    "committed {} spheres into {} bvh nodes",
                    spheres.collection.len(),
                    bvh.nodes.len()
                );
                spheres.bvh = Some(bvh);
            }
            self.committed = true;
        }
        self.triangles.is_some() || self.spheres.is_some()
    }

    /// Whether [`commit`] has run.
    ///
    /// [`commit`]: #method.commit
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Traces one ray against every primitive class and keeps the closest
    /// hit.
    ///
    /// On a hit, writes all fields of `rayhit` and returns `true`. On a miss
    /// the record is left untouched. Querying an uncommitted scene is a
    /// caller error; it asserts in debug builds and misses in release
    /// builds.
    pub fn intersect1(&self, ray: &Ray<T>, rayhit: &mut RayHit<T>) -> bool {
        debug_assert!(self.committed, "intersect1 on an uncommitted scene");
        if !self.committed {
            return false;
        }

        let mut best = RayHit::default();
        let mut hit = false;

        if let Some(triangles) = &self.triangles {
            if let Some(bvh) = &triangles.bvh {
                let mut intersector =
                    TriangleIntersector::new(&triangles.collection, ray, &self.trace_options);
                if bvh.traverse(ray, &mut intersector) {
                    let mut class_hit = RayHit::default();
                    intersector.finalize(true, &mut class_hit);
                    class_hit.geom_id = triangles.geom_id;
                    if class_hit.hit_distance < best.hit_distance {
                        best = class_hit;
                        hit = true;
                    }
                }
            }
        }

        if let Some(spheres) = &self.spheres {
            if let Some(bvh) = &spheres.bvh {
                let mut intersector =
                    SphereIntersector::new(&spheres.collection, ray, &self.trace_options);
                if bvh.traverse(ray, &mut intersector) {
                    let mut class_hit = RayHit::default();
                    intersector.finalize(true, &mut class_hit);
                    class_hit.geom_id = spheres.geom_id;
                    if class_hit.hit_distance < best.hit_distance {
                        best = class_hit;
                        hit = true;
                    }
                }
            }
        }

        if hit {
            *rayhit = best;
        }
        hit
    }
}

impl<T: RtValue> Default for Scene<'_, T> {
    fn default() -> Self {
        Scene::new()
    }
}

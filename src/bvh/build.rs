//! Top-down binned-SAH construction of the node pool.

use log::trace;

use crate::aabb::Aabb;
use crate::bvh::bin::find_best_split_binned;
use crate::bvh::options::BuildOptions;
use crate::collection::PrimitiveCollection;
use crate::RtValue;

/// Hard cap on the recursion depth. [`BuildOptions::max_tree_depth`] is
/// clamped to it so the fixed traversal stack can never overflow.
///
/// [`BuildOptions::max_tree_depth`]: struct.BuildOptions.html
pub(crate) const MAX_TREE_DEPTH: u32 = 62;

/// Subtrees above this primitive count are forked onto the task pool when a
/// parallel build is requested.
#[cfg(feature = "rayon")]
const PARALLEL_CUTOFF: usize = 1024;

/// A node of the [`Bvh`]. Inner nodes reference their children by pool index;
/// leaves reference a contiguous run of the tree's `primitive_indices`.
///
/// [`Bvh`]: struct.Bvh.html
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BvhNode<T: RtValue> {
    /// Leaf node.
    Leaf {
        /// Box enclosing every primitive reachable from this node.
        aabb: Aabb<T>,

        /// Offset of the leaf's first entry in `primitive_indices`.
        first: u32,

        /// Number of primitives in the leaf.
        count: u32,
    },
    /// Inner node.
    Inner {
        /// Box enclosing every primitive reachable from this node.
        aabb: Aabb<T>,

        /// Axis the range was split on. Orders child visits per ray sign.
        axis: usize,

        /// Pool index of the child on the lower side of the cut.
        child_l: u32,

        /// Pool index of the child on the upper side of the cut.
        child_r: u32,
    },
}

impl<T: RtValue> BvhNode<T> {
    /// The box enclosing everything reachable from this node.
    pub fn aabb(&self) -> &Aabb<T> {
        match self {
            BvhNode::Leaf { aabb, .. } | BvhNode::Inner { aabb, .. } => aabb,
        }
    }

    /// Shifts child pool indices by `base` when a subtree arena is spliced
    /// into its parent's pool. Leaves address `primitive_indices` globally
    /// and need no relocation.
    fn offset_children(self, base: u32) -> BvhNode<T> {
        match self {
            BvhNode::Inner {
                aabb,
                axis,
                child_l,
                child_r,
            } => BvhNode::Inner {
                aabb,
                axis,
                child_l: child_l + base,
                child_r: child_r + base,
            },
            leaf => leaf,
        }
    }
}

/// The [`Bvh`] data structure: a flat node pool with the root at index 0 and
/// the permutation of primitive ids the build partitioned in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Bvh<T: RtValue> {
    /// The list of nodes; `nodes[0]` is the root of a non-empty tree.
    pub nodes: Vec<BvhNode<T>>,

    /// A permutation of `0..collection.len()`. Each leaf owns one contiguous
    /// slice of it.
    pub primitive_indices: Vec<u32>,
}

impl<T: RtValue> Bvh<T> {
    /// Builds a [`Bvh`] over `collection` with the given options.
    ///
    /// The resulting tree is identical whether or not the build was
    /// parallelized: forked subtrees are assembled in task-local arenas and
    /// spliced back with a relocation pass, so node numbering does not depend
    /// on task interleaving.
    pub fn build<C: PrimitiveCollection<T>>(collection: &C, options: &BuildOptions) -> Bvh<T> {
        let n = collection.len();
        let mut primitive_indices: Vec<u32> = (0..n as u32).collect();

        if n == 0 {
            return Bvh {
                nodes: Vec::new(),
                primitive_indices,
            };
        }

        let max_depth = options.max_tree_depth.min(MAX_TREE_DEPTH);
        let nodes = build_range(
            collection,
            &mut primitive_indices,
            0,
            0,
            max_depth,
            options,
        );
        trace!(
            "built bvh with {} nodes over {} primitives",
            nodes.len(),
            n
        );

        Bvh {
            nodes,
            primitive_indices,
        }
    }

    /// Returns true when the tree holds no primitives.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Checks structural soundness: the node pool is fully connected with no
    /// sharing, child boxes lie inside their parents, and the leaves cover
    /// every primitive of `collection` exactly once.
    pub fn is_consistent<C: PrimitiveCollection<T>>(&self, collection: &C) -> bool {
        if self.nodes.is_empty() {
            return self.primitive_indices.is_empty() && collection.is_empty();
        }
        if self.primitive_indices.len() != collection.len() {
            return false;
        }

        let mut visited = 0usize;
        let mut coverage = vec![0u32; collection.len()];
        let sound = self.consistent_subtree(
            0,
            &Aabb::infinite(),
            &mut visited,
            &mut coverage,
            collection,
        );

        sound && visited == self.nodes.len() && coverage.iter().all(|&c| c == 1)
    }

    /// Assert version of [`is_consistent`].
    ///
    /// [`is_consistent`]: #method.is_consistent
    pub fn assert_consistent<C: PrimitiveCollection<T>>(&self, collection: &C) {
        assert!(self.is_consistent(collection), "inconsistent bvh");
    }

    fn consistent_subtree<C: PrimitiveCollection<T>>(
        &self,
        node_index: usize,
        outer: &Aabb<T>,
        visited: &mut usize,
        coverage: &mut [u32],
        collection: &C,
    ) -> bool {
        *visited += 1;
        match self.nodes[node_index] {
            BvhNode::Inner {
                ref aabb,
                child_l,
                child_r,
                ..
            } => {
                outer.approx_contains_aabb_eps(aabb, T::epsilon())
                    && self.consistent_subtree(child_l as usize, aabb, visited, coverage, collection)
                    && self.consistent_subtree(child_r as usize, aabb, visited, coverage, collection)
            }
            BvhNode::Leaf {
                ref aabb,
                first,
                count,
            } => {
                let first = first as usize;
                let Some(slice) = self.primitive_indices.get(first..first + count as usize) else {
                    return false;
                };
                outer.approx_contains_aabb_eps(aabb, T::epsilon())
                    && slice.iter().all(|&prim_id| {
                        let Some(seen) = coverage.get_mut(prim_id as usize) else {
                            return false;
                        };
                        *seen += 1;
                        aabb.approx_contains_aabb_eps(
                            &collection.bounding_box(prim_id),
                            T::epsilon(),
                        )
                    })
            }
        }
    }
}

/// Builds the subtree over `indices` into a fresh arena whose root sits at
/// local index 0. `offset` is the global position of `indices[0]` within the
/// tree's `primitive_indices`.
fn build_range<T: RtValue, C: PrimitiveCollection<T>>(
    collection: &C,
    indices: &mut [u32],
    offset: u32,
    depth: u32,
    max_depth: u32,
    options: &BuildOptions,
) -> Vec<BvhNode<T>> {
    let mut aabb = Aabb::empty();
    for &prim_id in indices.iter() {
        aabb.join_mut(&collection.bounding_box(prim_id));
    }

    let size = aabb.size();
    let degenerate = !(size[0] > T::zero() || size[1] > T::zero() || size[2] > T::zero());

    if indices.len() <= options.min_leaf_primitives.max(1) || depth >= max_depth || degenerate {
        return vec![BvhNode::Leaf {
            aabb,
            first: offset,
            count: indices.len() as u32,
        }];
    }

    let (axis, pos) = find_best_split_binned(collection, indices, &aabb, options.bin_size.max(2));

    let mut mid = partition_in_place(indices, |prim_id| collection.center(prim_id)[axis] < pos);
    if mid == 0 || mid == indices.len() {
        // All centers fell on one side of the cut. Split the range down the
        // middle instead.
        mid = indices.len() / 2;
    }

    let (left, right) = indices.split_at_mut(mid);
    let (l_nodes, r_nodes) = build_children(
        collection,
        left,
        right,
        offset,
        depth + 1,
        max_depth,
        options,
    );

    let child_l = 1u32;
    let child_r = 1 + l_nodes.len() as u32;
    let mut nodes = Vec::with_capacity(1 + l_nodes.len() + r_nodes.len());
    nodes.push(BvhNode::Inner {
        aabb,
        axis,
        child_l,
        child_r,
    });
    nodes.extend(l_nodes.into_iter().map(|n| n.offset_children(child_l)));
    nodes.extend(r_nodes.into_iter().map(|n| n.offset_children(child_r)));
    nodes
}

#[cfg(feature = "rayon")]
fn build_children<T: RtValue, C: PrimitiveCollection<T>>(
    collection: &C,
    left: &mut [u32],
    right: &mut [u32],
    offset: u32,
    depth: u32,
    max_depth: u32,
    options: &BuildOptions,
) -> (Vec<BvhNode<T>>, Vec<BvhNode<T>>) {
    let right_offset = offset + left.len() as u32;
    if options.parallel && left.len() + right.len() > PARALLEL_CUTOFF {
        rayon::join(
            || build_range(collection, left, offset, depth, max_depth, options),
            || build_range(collection, right, right_offset, depth, max_depth, options),
        )
    } else {
        (
            build_range(collection, left, offset, depth, max_depth, options),
            build_range(collection, right, right_offset, depth, max_depth, options),
        )
    }
}

#[cfg(not(feature = "rayon"))]
fn build_children<T: RtValue, C: PrimitiveCollection<T>>(
    collection: &C,
    left: &mut [u32],
    right: &mut [u32],
    offset: u32,
    depth: u32,
    max_depth: u32,
    options: &BuildOptions,
) -> (Vec<BvhNode<T>>, Vec<BvhNode<T>>) {
    let right_offset = offset + left.len() as u32;
    (
        build_range(collection, left, offset, depth, max_depth, options),
        build_range(collection, right, right_offset, depth, max_depth, options),
    )
}

/// Moves the entries satisfying `pred` to the front of `indices`, preserving
/// their relative order, and returns how many there are.
fn partition_in_place(indices: &mut [u32], pred: impl Fn(u32) -> bool) -> usize {
    let mut mid = 0;
    for i in 0..indices.len() {
        if pred(indices[i]) {
            indices.swap(i, mid);
            mid += 1;
        }
    }
    mid
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{partition_in_place, Bvh, BvhNode};
    use crate::bvh::BuildOptions;
    use crate::collection::PrimitiveCollection;
    use crate::testbase::{
        collection_bounds, generate_aligned_boxes, tuple_to_point, tuplevec_small_strategy,
        unit_boxes_at, TPoint3,
    };

    #[test]
    fn test_partition_in_place() {
        let mut indices = vec![3u32, 0, 5, 2, 4, 1];
        let mid = partition_in_place(&mut indices, |i| i % 2 == 0);
        assert_eq!(mid, 3);
        // The matching prefix keeps its relative order.
        assert_eq!(&indices[..mid], &[0, 2, 4]);
        let mut rest = indices[mid..].to_vec();
        rest.sort_unstable();
        assert_eq!(rest, vec![1, 3, 5]);
    }

    #[test]
    fn test_build_empty() {
        let boxes = unit_boxes_at(&[]);
        let bvh = Bvh::build(&boxes, &BuildOptions::default());
        assert!(bvh.is_empty());
        assert!(bvh.is_consistent(&boxes));
    }

    #[test]
    fn test_build_single_primitive() {
        let boxes = unit_boxes_at(&[TPoint3::new(1.0, 2.0, 3.0)]);
        let bvh = Bvh::build(&boxes, &BuildOptions::default());
        assert_eq!(bvh.nodes.len(), 1);
        assert!(matches!(bvh.nodes[0], BvhNode::Leaf { count: 1, .. }));
        bvh.assert_consistent(&boxes);
    }

    #[test]
    fn test_build_covers_all_primitives() {
        let boxes = generate_aligned_boxes();
        let bvh = Bvh::build(&boxes, &BuildOptions::default());
        bvh.assert_consistent(&boxes);

        // The root box equals the collection bounds.
        let indices: Vec<u32> = (0..boxes.len() as u32).collect();
        assert_eq!(*bvh.nodes[0].aabb(), collection_bounds(&boxes, &indices));
    }

    #[test]
    fn test_leaf_size_respects_options() {
        let boxes = generate_aligned_boxes();
        let options = BuildOptions {
            min_leaf_primitives: 2,
            ..BuildOptions::default()
        };
        let bvh = Bvh::build(&boxes, &options);
        for node in &bvh.nodes {
            if let BvhNode::Leaf { count, .. } = node {
                assert!(*count <= 2);
            }
        }
    }

    #[test]
    fn test_zero_depth_yields_single_leaf() {
        let boxes = generate_aligned_boxes();
        let options = BuildOptions {
            max_tree_depth: 0,
            ..BuildOptions::default()
        };
        let bvh = Bvh::build(&boxes, &options);
        assert_eq!(bvh.nodes.len(), 1);
        assert!(matches!(
            bvh.nodes[0],
            BvhNode::Leaf { count, .. } if count as usize == boxes.len()
        ));
    }

    #[test]
    fn test_coincident_primitives_build() {
        // Identical centers defeat the SAH cut; the median fallback and the
        // degenerate-range leaf rule must still terminate the recursion.
        let boxes = unit_boxes_at(&[TPoint3::new(0.5, 0.5, 0.5); 33]);
        let bvh = Bvh::build(&boxes, &BuildOptions::default());
        bvh.assert_consistent(&boxes);
    }

    proptest! {
        // Builds over arbitrary point sets are structurally sound.
        #[test]
        fn test_arbitrary_build_is_consistent(points in prop::collection::vec(
            tuplevec_small_strategy(), 1..64)) {
            let centers: Vec<_> = points.iter().map(tuple_to_point).collect();
            let boxes = unit_boxes_at(&centers);
            let bvh = Bvh::build(&boxes, &BuildOptions::default());
            prop_assert!(bvh.is_consistent(&boxes));
        }
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_parallel_build_matches_sequential() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::from_seed([7; 32]);
        let centers: Vec<TPoint3> = (0..4096)
            .map(|_| {
                TPoint3::new(
                    rng.gen_range(-100.0..100.0),
                    rng.gen_range(-100.0..100.0),
                    rng.gen_range(-100.0..100.0),
                )
            })
            .collect();
        let boxes = unit_boxes_at(&centers);

        let sequential = Bvh::build(&boxes, &BuildOptions::default());
        let parallel = Bvh::build(
            &boxes,
            &BuildOptions {
                parallel: true,
                ..BuildOptions::default()
            },
        );

        assert_eq!(sequential, parallel);
    }
}

//! Stack-based front-to-back traversal.

use crate::bvh::build::{Bvh, BvhNode, MAX_TREE_DEPTH};
use crate::collection::RayIntersector;
use crate::ray::Ray;
use crate::RtValue;

/// Capacity of the fixed traversal stack. At most one sibling is parked per
/// tree level, so `MAX_TREE_DEPTH` plus slack can never overflow it.
const STACK_SIZE: usize = MAX_TREE_DEPTH as usize + 2;

impl<T: RtValue> Bvh<T> {
    /// Traverses the tree for `ray`, feeding leaf primitives to
    /// `intersector`, which accumulates the closest accepted hit.
    ///
    /// Inner nodes are slab-tested against the interval from `ray.t_min` to
    /// the intersector's current closest distance, so committed hits shrink
    /// the volume that still gets visited. Children are visited near side
    /// first along the split axis. With `ray.any_hit` set, traversal unwinds
    /// on the first accepted primitive.
    ///
    /// Returns whether any primitive was hit. Use
    /// [`RayIntersector::finalize`] to extract the hit record.
    ///
    /// [`RayIntersector::finalize`]: ../collection/trait.RayIntersector.html#tymethod.finalize
    pub fn traverse<I: RayIntersector<T>>(&self, ray: &Ray<T>, intersector: &mut I) -> bool {
        if self.nodes.is_empty() {
            return false;
        }

        let mut stack = [0u32; STACK_SIZE];
        let mut stack_size = 1usize;
        let mut hit = false;

        while stack_size > 0 {
            stack_size -= 1;
            let node_index = stack[stack_size];

            match self.nodes[node_index as usize] {
                BvhNode::Inner {
                    ref aabb,
                    axis,
                    child_l,
                    child_r,
                } => {
                    if !ray.intersects_aabb(aabb, ray.t_min, intersector.distance()) {
                        continue;
                    }
                    // Push the far child first so the near one is popped
                    // first.
                    let (near, far) = if ray.direction_sign[axis] {
                        (child_r, child_l)
                    } else {
                        (child_l, child_r)
                    };
                    stack[stack_size] = far;
                    stack[stack_size + 1] = near;
                    stack_size += 2;
                }
                BvhNode::Leaf { first, count, .. } => {
                    let first = first as usize;
                    for &prim_id in &self.primitive_indices[first..first + count as usize] {
                        if intersector.intersect(prim_id) {
                            hit = true;
                            if ray.any_hit {
                                return true;
                            }
                        }
                    }
                }
            }
        }

        hit
    }
}

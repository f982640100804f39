//! SAH bin buffer and binned split selection.

use nalgebra::Vector3;

use crate::aabb::Aabb;
use crate::collection::PrimitiveCollection;
use crate::RtValue;

/// One SAH bin: the running box and count of the primitives whose centers
/// fall into it, plus the partial cost written by the right-to-left sweep.
#[derive(Debug, Clone, Copy)]
struct Bin<T: RtValue> {
    aabb: Aabb<T>,
    count: u32,
    cost: T,
}

impl<T: RtValue> Bin<T> {
    fn empty() -> Bin<T> {
        Bin {
            aabb: Aabb::empty(),
            count: 0,
            cost: T::zero(),
        }
    }
}

/// A contiguous buffer of `3 * size` bins, addressed as
/// `bins[axis * size + idx]`.
struct BinBuffer<T: RtValue> {
    bins: Vec<Bin<T>>,
    size: usize,
}

impl<T: RtValue> BinBuffer<T> {
    fn new(size: usize) -> BinBuffer<T> {
        BinBuffer {
            bins: vec![Bin::empty(); 3 * size],
            size,
        }
    }

    fn bin(&self, axis: usize, idx: usize) -> &Bin<T> {
        &self.bins[axis * self.size + idx]
    }

    fn bin_mut(&mut self, axis: usize, idx: usize) -> &mut Bin<T> {
        &mut self.bins[axis * self.size + idx]
    }

    /// Assigns every primitive of `indices` to one bin per non-degenerate
    /// axis, widening the bin by the primitive's full box, not just its
    /// center.
    fn sort_into_bins<C: PrimitiveCollection<T>>(
        &mut self,
        collection: &C,
        indices: &[u32],
        bounds: &Aabb<T>,
    ) {
        let size = bounds.size();
        let mut inv_size: Vector3<T> = Vector3::zeros();
        for axis in 0..3 {
            if size[axis] > T::zero() {
                inv_size[axis] = T::one() / size[axis];
            }
        }

        let scale = T::from_usize(self.size - 1).unwrap();
        for &prim_id in indices {
            let prim_aabb = collection.bounding_box(prim_id);
            let center = collection.center(prim_id);

            for axis in 0..3 {
                if !(inv_size[axis] > T::zero()) {
                    continue;
                }
                let normalized = (center[axis] - bounds.min[axis]) * inv_size[axis] * scale;
                // Centers marginally below the range minimum map to bin 0.
                let idx = normalized.to_usize().unwrap_or(0).min(self.size - 1);

                let bin = self.bin_mut(axis, idx);
                bin.count += 1;
                bin.aabb.join_mut(&prim_aabb);
            }
        }
    }
}

/// Finds the cheapest binned SAH split of `indices` inside `bounds`.
///
/// Returns the split axis and the world-space cut position; primitives whose
/// center lies strictly below the cut on that axis belong to the left side.
/// On an axis without extent no primitive is binned and the axis keeps an
/// infinite cost, so it can never win. If every axis is degenerate the
/// returned cut produces an empty partition, which the builder resolves with
/// its median fallback.
pub(crate) fn find_best_split_binned<T: RtValue, C: PrimitiveCollection<T>>(
    collection: &C,
    indices: &[u32],
    bounds: &Aabb<T>,
    bin_size: usize,
) -> (usize, T) {
    let mut bins = BinBuffer::new(bin_size);
    bins.sort_into_bins(collection, indices, bounds);

    let size = bounds.size();
    let mut min_cost = [T::infinity(); 3];
    let mut cut_pos = [T::zero(); 3];

    for axis in 0..3 {
        if !(size[axis] > T::zero()) {
            cut_pos[axis] = bounds.min[axis];
            continue;
        }

        // Sweep right to left, storing in each bin the cost of placing the
        // split immediately to its left.
        let mut count: u32 = 0;
        let mut acc = Aabb::empty();
        for i in (1..bin_size).rev() {
            let bin = bins.bin_mut(axis, i);
            acc.join_mut(&bin.aabb);
            count += bin.count;
            bin.cost = T::from_u32(count).unwrap() * acc.surface_area();
        }

        // Sweep left to right, combining the left-hand cost with the
        // precomputed right-hand cost of the next bin. Candidates with an
        // empty side produce a non-finite cost and fail the comparison.
        let mut count: u32 = 0;
        let mut acc = Aabb::empty();
        let mut min_bin = 1;
        for i in 0..bin_size - 1 {
            let next_cost = bins.bin(axis, i + 1).cost;
            let bin = bins.bin(axis, i);
            acc.join_mut(&bin.aabb);
            count += bin.count;

            let cost = T::from_u32(count).unwrap() * acc.surface_area() + next_cost;
            if cost < min_cost[axis] {
                min_cost[axis] = cost;
                // First bin of the right partition.
                min_bin = i + 1;
            }
        }

        cut_pos[axis] = bounds.min[axis]
            + T::from_usize(min_bin).unwrap() * (size[axis] / T::from_usize(bin_size).unwrap());
    }

    let mut best_axis = 0;
    if min_cost[0] > min_cost[1] {
        best_axis = 1;
    }
    if min_cost[best_axis] > min_cost[2] {
        best_axis = 2;
    }

    (best_axis, cut_pos[best_axis])
}

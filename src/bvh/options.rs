//! Build- and trace-time configuration.

use crate::INVALID_ID;

/// Parameters controlling BVH construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Number of SAH bins per axis. More bins give tighter splits and a
    /// slower build.
    pub bin_size: usize,

    /// Index ranges at or below this size become leaves.
    pub min_leaf_primitives: usize,

    /// Hard recursion cap. Clamped to the traversal stack capacity.
    pub max_tree_depth: u32,

    /// Fork subtree builds above a primitive-count cutoff. Requires the
    /// `rayon` cargo feature; without it builds stay sequential.
    pub parallel: bool,
}

impl Default for BuildOptions {
    fn default() -> BuildOptions {
        BuildOptions {
            bin_size: 64,
            min_leaf_primitives: 4,
            max_tree_depth: 32,
            parallel: false,
        }
    }
}

/// Parameters controlling a single trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceOptions {
    /// Half-open primitive id range `[lo, hi)` eligible for intersection.
    pub prim_ids_range: (u32, u32),

    /// Primitive id excluded from intersection. Suppresses self-intersection
    /// of secondary rays leaving a surface.
    pub skip_prim_id: u32,

    /// Reject triangles hit from the back side.
    pub cull_back_face: bool,
}

impl Default for TraceOptions {
    fn default() -> TraceOptions {
        TraceOptions {
            prim_ids_range: (0, INVALID_ID),
            skip_prim_id: INVALID_ID,
            cull_back_face: false,
        }
    }
}

// trace.rs — box and point sweeps through a BSP tree

use q2cm_shared::{
    angles_to_axis, dot_product, rotate_point, transpose_axis, vector_compare, vector_empty,
    vector_lerp, vector_subtract, Contents, Trace, Vec3, NULL_SURFACE,
};

use crate::cmodel::CollisionModel;
use crate::tree::{HeadNode, HullTree, TreeView};

/// 1/32 epsilon to keep floating point happy
pub const DIST_EPSILON: f32 = 0.03125;

/// Leafs collected around a position test.
const POSITION_TEST_LEAFS: usize = 1024;

// ============================================================
// Sweep state
// ============================================================
// Brush testing stays sequential: the checkcount stamp skips brushes
// already clipped in another leaf, and the early exit on fraction 0
// depends on every earlier brush result.
// ============================================================

struct TraceWork<'a> {
    tree: TreeView<'a>,
    checks: &'a mut [u32],
    checkcount: u32,
    contents: Contents,
    start: Vec3,
    end: Vec3,
    /// box corner for each plane signbits value
    offsets: [Vec3; 8],
    extents: Vec3,
    is_point: bool,
    allsolid_bug: bool,
    brush_traces: u32,
    trace: Trace,
}

impl<'a> TraceWork<'a> {
    /// Brush numbers in a leaf not yet tested by this sweep.
    fn take_unchecked(&mut self, brush: usize) -> bool {
        if self.checks[brush] == self.checkcount {
            return false;
        }
        self.checks[brush] = self.checkcount;
        true
    }

    fn clip_box_to_brush(&mut self, brush_idx: usize) {
        let tree = self.tree;
        let brush = &tree.brushes[brush_idx];
        if brush.num_sides == 0 {
            return;
        }
        self.brush_traces += 1;

        let mut enterfrac: f32 = -1.0;
        let mut leavefrac: f32 = 1.0;
        let mut clipside: Option<usize> = None;
        let mut getout = false;
        let mut startout = false;

        for side_idx in brush.first_side..brush.first_side + brush.num_sides {
            let plane = &tree.planes[tree.brush_sides[side_idx].plane];

            let dist = if self.is_point {
                plane.dist
            } else {
                // push the plane out for the box corner nearest it
                plane.dist - dot_product(&self.offsets[plane.signbits as usize], &plane.normal)
            };

            let d1 = dot_product(&self.start, &plane.normal) - dist;
            let d2 = dot_product(&self.end, &plane.normal) - dist;

            if d2 > 0.0 {
                getout = true; // endpoint is not in solid
            }
            if d1 > 0.0 {
                startout = true;
            }

            // completely in front of face, no intersection with the brush
            if d1 > 0.0 && (d2 >= DIST_EPSILON || d2 >= d1) {
                return;
            }
            if d1 <= 0.0 && d2 <= 0.0 {
                continue;
            }

            if d1 > d2 {
                // enter
                let f = ((d1 - DIST_EPSILON) / (d1 - d2)).max(0.0);
                if f > enterfrac {
                    enterfrac = f;
                    clipside = Some(side_idx);
                }
            } else {
                // leave
                let f = ((d1 + DIST_EPSILON) / (d1 - d2)).min(1.0);
                if f < leavefrac {
                    leavefrac = f;
                }
            }
        }

        if !startout {
            // original point was inside brush
            self.trace.startsolid = true;
            if !getout {
                self.trace.allsolid = true;
                if !self.allsolid_bug {
                    self.trace.fraction = 0.0;
                    self.trace.contents = brush.contents;
                }
            }
            return;
        }

        if enterfrac < leavefrac && enterfrac > -1.0 && enterfrac < self.trace.fraction {
            if let Some(side_idx) = clipside {
                let side = &tree.brush_sides[side_idx];
                self.trace.fraction = enterfrac;
                self.trace.plane = tree.planes[side.plane];
                self.trace.surface = side
                    .surface
                    .and_then(|s| tree.surfaces.get(s).copied())
                    .unwrap_or(NULL_SURFACE);
                self.trace.contents = brush.contents;
            }
        }
    }

    fn test_box_in_brush(&mut self, brush_idx: usize) {
        let tree = self.tree;
        let brush = &tree.brushes[brush_idx];
        if brush.num_sides == 0 {
            return;
        }

        for side_idx in brush.first_side..brush.first_side + brush.num_sides {
            let plane = &tree.planes[tree.brush_sides[side_idx].plane];
            let dist =
                plane.dist - dot_product(&self.offsets[plane.signbits as usize], &plane.normal);
            let d1 = dot_product(&self.start, &plane.normal) - dist;

            // completely in front of face, no intersection
            if d1 > 0.0 {
                return;
            }
        }

        // inside this brush
        self.trace.startsolid = true;
        self.trace.allsolid = true;
        self.trace.fraction = 0.0;
        self.trace.contents = brush.contents;
    }

    fn trace_to_leaf(&mut self, leaf_idx: usize) {
        let tree = self.tree;
        let leaf = &tree.leafs[leaf_idx];
        if !leaf.contents.intersects(self.contents) {
            return;
        }
        for &brush in &tree.leaf_brushes[leaf.first_leaf_brush..leaf.first_leaf_brush + leaf.num_leaf_brushes] {
            if !self.take_unchecked(brush) {
                continue; // already checked this brush in another leaf
            }
            if !tree.brushes[brush].contents.intersects(self.contents) {
                continue;
            }
            self.clip_box_to_brush(brush);
            if self.trace.fraction == 0.0 {
                return;
            }
        }
    }

    fn test_in_leaf(&mut self, leaf_idx: usize) {
        let tree = self.tree;
        let leaf = &tree.leafs[leaf_idx];
        if !leaf.contents.intersects(self.contents) {
            return;
        }
        for &brush in &tree.leaf_brushes[leaf.first_leaf_brush..leaf.first_leaf_brush + leaf.num_leaf_brushes] {
            if !self.take_unchecked(brush) {
                continue;
            }
            if !tree.brushes[brush].contents.intersects(self.contents) {
                continue;
            }
            self.test_box_in_brush(brush);
            if self.trace.fraction == 0.0 {
                return;
            }
        }
    }

    fn recursive_hull_check(&mut self, mut num: i32, p1f: f32, p2f: f32, p1: &Vec3, p2: &Vec3) {
        if self.trace.fraction <= p1f {
            return; // already hit something nearer
        }

        let tree = self.tree;
        let (node, t1, t2, offset) = loop {
            if num < 0 {
                self.trace_to_leaf((-1 - num) as usize);
                return;
            }

            let node = &tree.nodes[num as usize];
            let plane = tree.plane(node);

            // point distances to the splitting plane and the box's reach
            let (t1, t2, offset) = if plane.is_axial() {
                let t = plane.plane_type as usize;
                (p1[t] - plane.dist, p2[t] - plane.dist, self.extents[t])
            } else {
                let offset = if self.is_point {
                    0.0
                } else {
                    (self.extents[0] * plane.normal[0]).abs()
                        + (self.extents[1] * plane.normal[1]).abs()
                        + (self.extents[2] * plane.normal[2]).abs()
                };
                (plane.diff(p1), plane.diff(p2), offset)
            };

            // see which sides we need to consider
            if t1 >= offset && t2 >= offset {
                num = node.children[0];
                continue;
            }
            if t1 < -offset && t2 < -offset {
                num = node.children[1];
                continue;
            }
            break (node, t1, t2, offset);
        };

        // put the crosspoint DIST_EPSILON pixels on the near side
        let (side, frac, frac2) = if t1 < t2 {
            let idist = 1.0 / (t1 - t2);
            (
                1usize,
                (t1 - offset + DIST_EPSILON) * idist,
                (t1 + offset + DIST_EPSILON) * idist,
            )
        } else if t1 > t2 {
            let idist = 1.0 / (t1 - t2);
            (
                0usize,
                (t1 + offset + DIST_EPSILON) * idist,
                (t1 - offset - DIST_EPSILON) * idist,
            )
        } else {
            (0usize, 1.0, 0.0)
        };
        let frac = frac.clamp(0.0, 1.0);
        let frac2 = frac2.clamp(0.0, 1.0);

        // move up to the node
        let midf = p1f + (p2f - p1f) * frac;
        let mid = vector_lerp(p1, p2, frac);
        self.recursive_hull_check(node.children[side], p1f, midf, p1, &mid);

        // go past the node
        let midf2 = p1f + (p2f - p1f) * frac2;
        let mid2 = vector_lerp(p1, p2, frac2);
        self.recursive_hull_check(node.children[side ^ 1], midf2, p2f, &mid2, p2);
    }
}

/// Sweeps a box through `tree` from `root`, which must be valid.
/// Returns the trace and the number of brushes clipped.
#[allow(clippy::too_many_arguments)]
pub(crate) fn trace_tree(
    tree: TreeView<'_>,
    checks: &mut [u32],
    checkcount: u32,
    root: i32,
    start: &Vec3,
    end: &Vec3,
    mins: &Vec3,
    maxs: &Vec3,
    brushmask: Contents,
    allsolid_bug: bool,
) -> (Trace, u32) {
    let mut offsets = [[0.0f32; 3]; 8];
    for (i, corner) in offsets.iter_mut().enumerate() {
        for j in 0..3 {
            corner[j] = if (i >> j) & 1 != 0 { maxs[j] } else { mins[j] };
        }
    }

    let mut work = TraceWork {
        tree,
        checks,
        checkcount,
        contents: brushmask,
        start: *start,
        end: *end,
        offsets,
        extents: [0.0; 3],
        is_point: false,
        allsolid_bug,
        brush_traces: 0,
        trace: Trace::default(),
    };

    // position test special case
    if vector_compare(start, end) {
        if vector_empty(mins) && vector_empty(maxs) {
            // a point on a splitting plane belongs to the leaf point
            // descent picks, so only that leaf's brushes are tested
            work.test_in_leaf(tree.point_leaf(start, root));
            work.trace.endpos = *start;
            return (work.trace, work.brush_traces);
        }

        let mut c1 = [0.0f32; 3];
        let mut c2 = [0.0f32; 3];
        for i in 0..3 {
            c1[i] = start[i] + mins[i] - 1.0;
            c2[i] = start[i] + maxs[i] + 1.0;
        }
        let mut leafs = Vec::new();
        let mut touched = Contents::empty();
        let mut top_node = -1;
        tree.box_leafs_r(
            root,
            &c1,
            &c2,
            POSITION_TEST_LEAFS,
            &mut leafs,
            &mut touched,
            &mut top_node,
        );
        for leaf in leafs {
            work.test_in_leaf(leaf);
            if work.trace.allsolid {
                break;
            }
        }
        work.trace.endpos = *start;
        return (work.trace, work.brush_traces);
    }

    // point special case
    if vector_empty(mins) && vector_empty(maxs) {
        work.is_point = true;
    } else {
        for i in 0..3 {
            work.extents[i] = (-mins[i]).max(maxs[i]);
        }
    }

    // general sweeping through the tree
    work.recursive_hull_check(root, 0.0, 1.0, start, end);

    work.trace.endpos = if work.trace.fraction == 1.0 {
        *end
    } else {
        vector_lerp(start, end, work.trace.fraction)
    };
    (work.trace, work.brush_traces)
}

// ============================================================
// CollisionModel: trace family
// ============================================================

impl CollisionModel {
    /// Sweeps a box from `start` to `end` through the tree under
    /// `headnode`, stopping at brushes whose contents meet `brushmask`.
    /// `mins` and `maxs` both zero make it a point trace.
    pub fn box_trace(
        &mut self,
        start: &Vec3,
        end: &Vec3,
        mins: &Vec3,
        maxs: &Vec3,
        headnode: HeadNode,
        brushmask: Contents,
    ) -> Trace {
        self.checkcount = self.checkcount.wrapping_add(1);
        self.stats.traces += 1;
        let checkcount = self.checkcount;
        let allsolid_bug = self.config.allsolid_bug;

        let (tree, checks) = match headnode.tree {
            HullTree::World => match self.cache.as_deref() {
                Some(map) => (map.view(), self.world_checks.as_mut_slice()),
                None => return unobstructed(end),
            },
            HullTree::Box => self.box_hull.view_and_checks(),
            HullTree::Octagon => self.octagon_hull.view_and_checks(),
        };
        if !tree.is_valid(headnode.num) {
            return unobstructed(end);
        }

        let (trace, clipped) = trace_tree(
            tree,
            checks,
            checkcount,
            headnode.num,
            start,
            end,
            mins,
            maxs,
            brushmask,
            allsolid_bug,
        );
        self.stats.brush_traces += u64::from(clipped);
        trace
    }

    /// Sweep against a brush model placed at `origin` and rotated by
    /// `angles`. Hull head nodes are never rotated.
    #[allow(clippy::too_many_arguments)]
    pub fn transformed_box_trace(
        &mut self,
        start: &Vec3,
        end: &Vec3,
        mins: &Vec3,
        maxs: &Vec3,
        headnode: HeadNode,
        brushmask: Contents,
        origin: &Vec3,
        angles: &Vec3,
    ) -> Trace {
        if vector_empty(origin) && vector_empty(angles) {
            return self.box_trace(start, end, mins, maxs, headnode, brushmask);
        }

        // subtract origin offset
        let mut start_l = vector_subtract(start, origin);
        let mut end_l = vector_subtract(end, origin);

        // rotate start and end into the model's frame of reference
        let axis = (headnode.tree == HullTree::World && !vector_empty(angles))
            .then(|| angles_to_axis(angles));
        if let Some(axis) = &axis {
            start_l = rotate_point(&start_l, axis);
            end_l = rotate_point(&end_l, axis);
        }

        let mut trace = self.box_trace(&start_l, &end_l, mins, maxs, headnode, brushmask);

        // rotate plane normal back into the world's frame
        if let Some(axis) = &axis {
            if trace.fraction != 1.0 {
                trace.plane.normal = rotate_point(&trace.plane.normal, &transpose_axis(axis));
                trace.plane.set_type();
                trace.plane.set_signbits();
            }
        }

        trace.plane.dist += dot_product(&trace.plane.normal, origin);
        trace.endpos = vector_lerp(start, end, trace.fraction);
        trace
    }
}

fn unobstructed(end: &Vec3) -> Trace {
    Trace {
        endpos: *end,
        ..Trace::default()
    }
}

/// Merge an entity's trace into the accumulated one, keeping the nearer hit.
pub fn clip_entity(dst: &mut Trace, src: &Trace, ent_index: i32) {
    dst.allsolid |= src.allsolid;
    dst.startsolid |= src.startsolid;
    if src.fraction < dst.fraction {
        dst.fraction = src.fraction;
        dst.endpos = src.endpos;
        dst.plane = src.plane;
        dst.surface = src.surface;
        dst.contents |= src.contents;
        dst.ent_index = ent_index;
    }
}

// ============================================================
// Tests
// ============================================================

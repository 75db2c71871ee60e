// hull.rs — tiny synthetic BSP trees for bounding volumes
//
// An entity's bounding box is turned into a six plane tree so that
// entity-vs-entity clipping runs through exactly the same sweep code as
// entity-vs-world. The octagon hull adds four vertical bevels that cut
// the box's corners. Each hull is a scratch buffer: setting new bounds
// invalidates whatever the previous call described.

use std::f32::consts::FRAC_1_SQRT_2;

use q2cm_shared::{dot_product, CPlane, Contents, Trace, Vec3};

use crate::map::{CBrush, CBrushSide, CLeaf, CNode, NULL_LEAF};
use crate::trace::trace_tree;
use crate::tree::TreeView;

pub const EMPTY_LEAF: usize = 0;
pub const HULL_LEAF: usize = 1;

const BOX_NODES: usize = 6;
const OCTAGON_NODES: usize = 10;

/// Contents given to hulls built without any.
pub const DEFAULT_HULL_CONTENTS: Contents = Contents::MONSTER;

/// Chains `nodes` so each peels off one plane's outside into the empty
/// leaf, ending in the hull leaf. Node i splits on plane i*2; the brush
/// side uses the outward facing plane of the pair.
fn link_hull(nodes: &mut [CNode], sides: &mut [CBrushSide]) {
    let count = nodes.len();
    for i in 0..count {
        // the six box faces alternate max/min, bevels all face outward
        let side = if i < BOX_NODES { i & 1 } else { 0 };

        sides[i] = CBrushSide {
            plane: i * 2 + side,
            surface: None,
        };

        let node = &mut nodes[i];
        node.plane = i * 2;
        node.children[side] = -1 - EMPTY_LEAF as i32;
        node.children[side ^ 1] = if i + 1 != count {
            (i + 1) as i32
        } else {
            -1 - HULL_LEAF as i32
        };
    }
}

/// Axial plane pairs for the six box faces: +axis at index i*2, -axis at i*2+1.
fn box_planes(planes: &mut [CPlane]) {
    for i in 0..BOX_NODES {
        let axis = i >> 1;
        let mut normal = [0.0f32; 3];
        normal[axis] = 1.0;
        planes[i * 2] = CPlane::new(normal, 0.0);
        normal[axis] = -1.0;
        planes[i * 2 + 1] = CPlane::new(normal, 0.0);
    }
}

fn hull_leafs(contents: Contents) -> [CLeaf; 2] {
    [
        NULL_LEAF,
        CLeaf {
            contents,
            first_leaf_brush: 0,
            num_leaf_brushes: 1,
            ..NULL_LEAF
        },
    ]
}

fn set_box_dists(planes: &mut [CPlane], mins: &Vec3, maxs: &Vec3) {
    let faces = [maxs[0], mins[0], maxs[1], mins[1], maxs[2], mins[2]];
    for (i, &d) in faces.iter().enumerate() {
        planes[i * 2].dist = d;
        planes[i * 2 + 1].dist = -d;
    }
}

fn resolve_contents(contents: Contents) -> Contents {
    if contents.is_empty() {
        DEFAULT_HULL_CONTENTS
    } else {
        contents
    }
}

// ============================================================
// Box hull
// ============================================================

#[derive(Debug, Clone)]
pub struct BoxHull {
    pub(crate) planes: [CPlane; BOX_NODES * 2],
    pub(crate) nodes: [CNode; BOX_NODES],
    pub(crate) leafs: [CLeaf; 2],
    pub(crate) leaf_brushes: [usize; 1],
    pub(crate) brushes: [CBrush; 1],
    pub(crate) sides: [CBrushSide; BOX_NODES],
    checks: [u32; 1],
    checkcount: u32,
}

impl BoxHull {
    pub fn new() -> Self {
        let mut hull = Self {
            planes: [CPlane::default(); BOX_NODES * 2],
            nodes: [CNode::default(); BOX_NODES],
            leafs: hull_leafs(DEFAULT_HULL_CONTENTS),
            leaf_brushes: [0],
            brushes: [CBrush {
                contents: DEFAULT_HULL_CONTENTS,
                first_side: 0,
                num_sides: BOX_NODES,
            }],
            sides: [CBrushSide::default(); BOX_NODES],
            checks: [0],
            checkcount: 0,
        };
        box_planes(&mut hull.planes);
        link_hull(&mut hull.nodes, &mut hull.sides);
        hull
    }

    /// Rebuild for new bounds. Empty contents become MONSTER.
    pub fn set_bounds(&mut self, mins: &Vec3, maxs: &Vec3, contents: Contents) {
        let contents = resolve_contents(contents);
        self.leafs[HULL_LEAF].contents = contents;
        self.brushes[0].contents = contents;
        set_box_dists(&mut self.planes, mins, maxs);
        for node in &mut self.nodes {
            node.mins = *mins;
            node.maxs = *maxs;
        }
    }

    pub fn contents(&self) -> Contents {
        self.brushes[0].contents
    }

    pub fn planes(&self) -> &[CPlane] {
        &self.planes
    }

    pub fn nodes(&self) -> &[CNode] {
        &self.nodes
    }

    /// Sweep against this hull alone, for callers holding their own scratch.
    pub fn trace(
        &mut self,
        start: &Vec3,
        end: &Vec3,
        mins: &Vec3,
        maxs: &Vec3,
        brushmask: Contents,
    ) -> Trace {
        self.checkcount = self.checkcount.wrapping_add(1);
        let checkcount = self.checkcount;
        let (tree, checks) = self.view_and_checks();
        trace_tree(tree, checks, checkcount, 0, start, end, mins, maxs, brushmask, false).0
    }

    pub fn point_contents(&self, p: &Vec3) -> Contents {
        let tree = self.view();
        tree.leafs[tree.point_leaf(p, 0)].contents
    }

    pub(crate) fn view(&self) -> TreeView<'_> {
        TreeView {
            planes: &self.planes,
            nodes: &self.nodes,
            leafs: &self.leafs,
            leaf_brushes: &self.leaf_brushes,
            brushes: &self.brushes,
            brush_sides: &self.sides,
            surfaces: &[],
        }
    }

    pub(crate) fn view_and_checks(&mut self) -> (TreeView<'_>, &mut [u32]) {
        (
            TreeView {
                planes: &self.planes,
                nodes: &self.nodes,
                leafs: &self.leafs,
                leaf_brushes: &self.leaf_brushes,
                brushes: &self.brushes,
                brush_sides: &self.sides,
                surfaces: &[],
            },
            &mut self.checks,
        )
    }
}

impl Default for BoxHull {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================
// Octagon hull
// ============================================================

/// Bevel directions in the XY plane, one per vertical box edge.
const BEVEL_SIGNS: [(f32, f32); 4] = [(1.0, 1.0), (-1.0, 1.0), (-1.0, -1.0), (1.0, -1.0)];

#[derive(Debug, Clone)]
pub struct OctagonHull {
    pub(crate) planes: [CPlane; OCTAGON_NODES * 2],
    pub(crate) nodes: [CNode; OCTAGON_NODES],
    pub(crate) leafs: [CLeaf; 2],
    pub(crate) leaf_brushes: [usize; 1],
    pub(crate) brushes: [CBrush; 1],
    pub(crate) sides: [CBrushSide; OCTAGON_NODES],
    checks: [u32; 1],
    checkcount: u32,
}

impl OctagonHull {
    pub fn new() -> Self {
        let mut hull = Self {
            planes: [CPlane::default(); OCTAGON_NODES * 2],
            nodes: [CNode::default(); OCTAGON_NODES],
            leafs: hull_leafs(DEFAULT_HULL_CONTENTS),
            leaf_brushes: [0],
            brushes: [CBrush {
                contents: DEFAULT_HULL_CONTENTS,
                first_side: 0,
                num_sides: OCTAGON_NODES,
            }],
            sides: [CBrushSide::default(); OCTAGON_NODES],
            checks: [0],
            checkcount: 0,
        };
        box_planes(&mut hull.planes);
        for (k, &(sx, sy)) in BEVEL_SIGNS.iter().enumerate() {
            let normal = [sx * FRAC_1_SQRT_2, sy * FRAC_1_SQRT_2, 0.0];
            let i = BOX_NODES + k;
            hull.planes[i * 2] = CPlane::new(normal, 0.0);
            hull.planes[i * 2 + 1] = CPlane::new([-normal[0], -normal[1], 0.0], 0.0);
        }
        link_hull(&mut hull.nodes, &mut hull.sides);
        hull
    }

    /// Rebuild for new bounds. The bevels leave a regular octagon for a
    /// square footprint and trim proportionally less off thin boxes.
    pub fn set_bounds(&mut self, mins: &Vec3, maxs: &Vec3, contents: Contents) {
        let contents = resolve_contents(contents);
        self.leafs[HULL_LEAF].contents = contents;
        self.brushes[0].contents = contents;
        set_box_dists(&mut self.planes, mins, maxs);

        let center = [
            (mins[0] + maxs[0]) * 0.5,
            (mins[1] + maxs[1]) * 0.5,
            (mins[2] + maxs[2]) * 0.5,
        ];
        let hx = (maxs[0] - mins[0]) * 0.5;
        let hy = (maxs[1] - mins[1]) * 0.5;
        // corner triangle leg, 2 - sqrt(2) of the short half-extent
        let leg = (2.0 - std::f32::consts::SQRT_2) * hx.min(hy);
        let offset = (hx + hy - leg) * FRAC_1_SQRT_2;

        for k in 0..BEVEL_SIGNS.len() {
            let i = BOX_NODES + k;
            let d = offset + dot_product(&self.planes[i * 2].normal, &center);
            self.planes[i * 2].dist = d;
            self.planes[i * 2 + 1].dist = -d;
        }

        for node in &mut self.nodes {
            node.mins = *mins;
            node.maxs = *maxs;
        }
    }

    pub fn contents(&self) -> Contents {
        self.brushes[0].contents
    }

    pub fn planes(&self) -> &[CPlane] {
        &self.planes
    }

    pub fn trace(
        &mut self,
        start: &Vec3,
        end: &Vec3,
        mins: &Vec3,
        maxs: &Vec3,
        brushmask: Contents,
    ) -> Trace {
        self.checkcount = self.checkcount.wrapping_add(1);
        let checkcount = self.checkcount;
        let (tree, checks) = self.view_and_checks();
        trace_tree(tree, checks, checkcount, 0, start, end, mins, maxs, brushmask, false).0
    }

    pub fn point_contents(&self, p: &Vec3) -> Contents {
        let tree = self.view();
        tree.leafs[tree.point_leaf(p, 0)].contents
    }

    pub(crate) fn view(&self) -> TreeView<'_> {
        TreeView {
            planes: &self.planes,
            nodes: &self.nodes,
            leafs: &self.leafs,
            leaf_brushes: &self.leaf_brushes,
            brushes: &self.brushes,
            brush_sides: &self.sides,
            surfaces: &[],
        }
    }

    pub(crate) fn view_and_checks(&mut self) -> (TreeView<'_>, &mut [u32]) {
        (
            TreeView {
                planes: &self.planes,
                nodes: &self.nodes,
                leafs: &self.leafs,
                leaf_brushes: &self.leaf_brushes,
                brushes: &self.brushes,
                brush_sides: &self.sides,
                surfaces: &[],
            },
            &mut self.checks,
        )
    }
}

impl Default for OctagonHull {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use q2cm_shared::{MASK_ALL, MASK_SOLID, NULL_SURFACE};

    #[test]
    fn test_box_hull_plane_setup() {
        let mut hull = BoxHull::new();
        hull.set_bounds(&[-1.0, -2.0, -3.0], &[4.0, 5.0, 6.0], Contents::SOLID);
        let dists: Vec<f32> = hull.planes().iter().map(|p| p.dist).collect();
        assert_eq!(
            dists,
            vec![4.0, -4.0, -1.0, 1.0, 5.0, -5.0, -2.0, 2.0, 6.0, -6.0, -3.0, 3.0]
        );
        for i in 0..6 {
            let axis = i >> 1;
            let pos = &hull.planes()[i * 2];
            let neg = &hull.planes()[i * 2 + 1];
            assert_eq!(pos.plane_type as usize, axis);
            assert_eq!(pos.normal[axis], 1.0);
            assert_eq!(neg.normal[axis], -1.0);
            assert_eq!(neg.signbits, 1 << axis);
            assert!(!neg.is_axial());
        }
    }

    #[test]
    fn test_box_hull_topology() {
        let hull = BoxHull::new();
        let nodes = hull.nodes();
        assert_eq!(nodes[0].children, [-1, 1]);
        assert_eq!(nodes[1].children, [2, -1]);
        assert_eq!(nodes[5].children, [-2, -1]);
        assert_eq!(hull.sides[1].plane, 3);
        assert_eq!(hull.sides[4].plane, 8);
    }

    #[test]
    fn test_empty_contents_default_to_monster() {
        // gameplay code relies on content-less boxes still blocking monsters
        let mut hull = BoxHull::new();
        hull.set_bounds(&[-8.0; 3], &[8.0; 3], Contents::empty());
        assert_eq!(hull.contents(), Contents::MONSTER);
        assert_eq!(hull.point_contents(&[0.0; 3]), Contents::MONSTER);

        let mut oct = OctagonHull::new();
        oct.set_bounds(&[-8.0; 3], &[8.0; 3], Contents::empty());
        assert_eq!(oct.contents(), Contents::MONSTER);
    }

    #[test]
    fn test_box_hull_rebuild_is_deterministic() {
        let mut a = BoxHull::new();
        let mut b = BoxHull::new();
        a.set_bounds(&[-16.0, -16.0, -24.0], &[16.0, 16.0, 32.0], Contents::SOLID);
        a.set_bounds(&[-16.0, -16.0, -24.0], &[16.0, 16.0, 32.0], Contents::SOLID);
        b.set_bounds(&[-16.0, -16.0, -24.0], &[16.0, 16.0, 32.0], Contents::SOLID);
        assert_eq!(a.planes, b.planes);
        assert_eq!(a.nodes, b.nodes);
        assert_eq!(a.leafs, b.leafs);
        assert_eq!(a.sides, b.sides);
    }

    #[test]
    fn test_box_hull_point_contents() {
        let mut hull = BoxHull::new();
        hull.set_bounds(&[-8.0; 3], &[8.0; 3], Contents::SOLID);
        assert_eq!(hull.point_contents(&[7.0, -7.0, 0.0]), Contents::SOLID);
        assert!(hull.point_contents(&[9.0, 0.0, 0.0]).is_empty());
        assert!(hull.point_contents(&[0.0, 0.0, -8.5]).is_empty());
    }

    #[test]
    fn test_standalone_hull_trace() {
        let mut hull = BoxHull::new();
        hull.set_bounds(&[-8.0; 3], &[8.0; 3], Contents::SOLID);
        let tr = hull.trace(&[-100.0, 0.0, 0.0], &[100.0, 0.0, 0.0], &[0.0; 3], &[0.0; 3], MASK_SOLID);
        assert!(tr.fraction < 1.0);
        assert_eq!(tr.plane.normal, [-1.0, 0.0, 0.0]);
        assert!((tr.endpos[0] + 8.0).abs() < 0.1);
        assert_eq!(tr.surface, NULL_SURFACE);
        assert_eq!(tr.contents, Contents::SOLID);
    }

    #[test]
    fn test_octagon_cuts_corners() {
        let mut oct = OctagonHull::new();
        oct.set_bounds(&[-16.0, -16.0, -16.0], &[16.0, 16.0, 16.0], Contents::SOLID);
        // box corner region is outside the octagon
        assert!(oct.point_contents(&[15.0, 15.0, 0.0]).is_empty());
        // faces are untouched
        assert_eq!(oct.point_contents(&[15.0, 0.0, 0.0]), Contents::SOLID);
        assert_eq!(oct.point_contents(&[0.0, -15.0, 10.0]), Contents::SOLID);
        // bevels sit at the same distance as the faces for a square footprint
        let d = 15.9 * FRAC_1_SQRT_2;
        assert_eq!(oct.point_contents(&[-d, d, 0.0]), Contents::SOLID);
    }

    #[test]
    fn test_octagon_offset_center() {
        let mut oct = OctagonHull::new();
        oct.set_bounds(&[84.0, -16.0, 0.0], &[116.0, 16.0, 32.0], Contents::SOLID);
        assert_eq!(oct.point_contents(&[100.0, 0.0, 16.0]), Contents::SOLID);
        assert!(oct.point_contents(&[115.0, 15.0, 16.0]).is_empty());
        assert!(oct.point_contents(&[85.0, -15.0, 16.0]).is_empty());
    }

    #[test]
    fn test_octagon_diagonal_sweep_hits_bevel() {
        let mut oct = OctagonHull::new();
        oct.set_bounds(&[-16.0; 3], &[16.0; 3], Contents::SOLID);
        let tr = oct.trace(&[64.0, 64.0, 0.0], &[0.0, 0.0, 0.0], &[0.0; 3], &[0.0; 3], MASK_ALL);
        assert!(tr.fraction < 1.0);
        assert!((tr.plane.normal[0] - FRAC_1_SQRT_2).abs() < 1e-5);
        assert!((tr.plane.normal[1] - FRAC_1_SQRT_2).abs() < 1e-5);
        // stopped at the bevel, inside the square's corner
        assert!(tr.endpos[0] < 16.0 && tr.endpos[0] > 11.0);
    }
}

// tree.rs — node/leaf numbering, point and box descent through a BSP tree

use q2cm_shared::{box_on_plane_side, CPlane, CSurface, Contents, Vec3, SIDE_BACK, SIDE_FRONT};

use crate::cmodel::CollisionModel;
use crate::map::{CBrush, CBrushSide, CLeaf, CNode};

// ============================================================
// Handles
// ============================================================

/// Which tree a head node lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HullTree {
    World,
    /// the instance's scratch box hull
    Box,
    /// the instance's scratch octagon hull
    Octagon,
}

/// Root of a trace or contents query. `num` uses the child encoding:
/// >= 0 is a node, negative is leaf `-1 - num`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeadNode {
    pub tree: HullTree,
    pub num: i32,
}

impl HeadNode {
    pub const fn world(num: i32) -> Self {
        Self {
            tree: HullTree::World,
            num,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Null,
    Node(usize),
    /// only produced for number -1, the solid leaf 0
    Leaf(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeafRef {
    Null,
    Leaf(usize),
}

/// Result of a box-leafs walk.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BoxLeafs {
    pub leafs: Vec<usize>,
    /// first node where the box straddled the plane, -1 if none
    pub top_node: i32,
}

// ============================================================
// Tree view
// ============================================================

/// Borrowed arrays of one tree: the world map or a scratch hull.
#[derive(Clone, Copy)]
pub(crate) struct TreeView<'a> {
    pub planes: &'a [CPlane],
    pub nodes: &'a [CNode],
    pub leafs: &'a [CLeaf],
    pub leaf_brushes: &'a [usize],
    pub brushes: &'a [CBrush],
    pub brush_sides: &'a [CBrushSide],
    pub surfaces: &'a [CSurface],
}

impl<'a> TreeView<'a> {
    pub fn is_valid(&self, num: i32) -> bool {
        if num >= 0 {
            (num as usize) < self.nodes.len()
        } else {
            ((-1 - num) as usize) < self.leafs.len()
        }
    }

    #[inline]
    pub fn plane(&self, node: &CNode) -> &'a CPlane {
        &self.planes[node.plane]
    }

    /// Descends by point side only. `num` must be valid.
    pub fn point_leaf(&self, p: &Vec3, mut num: i32) -> usize {
        while num >= 0 {
            let node = &self.nodes[num as usize];
            let d = self.plane(node).diff(p);
            num = if d < 0.0 {
                node.children[1]
            } else {
                node.children[0]
            };
        }
        (-1 - num) as usize
    }

    /// Collects touched leafs into `list` up to `max_count`. `contents`
    /// gathers every touched leaf, listed or not.
    #[allow(clippy::too_many_arguments)]
    pub fn box_leafs_r(
        &self,
        mut num: i32,
        mins: &Vec3,
        maxs: &Vec3,
        max_count: usize,
        list: &mut Vec<usize>,
        contents: &mut Contents,
        top_node: &mut i32,
    ) {
        loop {
            if num < 0 {
                let leaf = (-1 - num) as usize;
                *contents |= self.leafs[leaf].contents;
                // capacity exhausted leaves a partial list
                if list.len() < max_count {
                    list.push(leaf);
                }
                return;
            }

            let node = &self.nodes[num as usize];
            match box_on_plane_side(mins, maxs, self.plane(node)) {
                SIDE_FRONT => num = node.children[0],
                SIDE_BACK => num = node.children[1],
                _ => {
                    // go down both
                    if *top_node == -1 {
                        *top_node = num;
                    }
                    self.box_leafs_r(node.children[0], mins, maxs, max_count, list, contents, top_node);
                    num = node.children[1];
                }
            }
        }
    }

    pub fn headnode_visible(&self, num: i32, visbits: &[u8]) -> bool {
        if num < 0 {
            let cluster = self.leafs[(-1 - num) as usize].cluster;
            if cluster == -1 {
                return false;
            }
            let byte = (cluster >> 3) as usize;
            return byte < visbits.len() && visbits[byte] & (1 << (cluster & 7)) != 0;
        }

        let node = &self.nodes[num as usize];
        self.headnode_visible(node.children[0], visbits)
            || self.headnode_visible(node.children[1], visbits)
    }
}

// ============================================================
// CollisionModel: numbering and tree walks
// ============================================================

impl CollisionModel {
    pub(crate) fn tree(&self, which: HullTree) -> Option<TreeView<'_>> {
        match which {
            HullTree::World => self.cache.as_deref().map(|m| m.view()),
            HullTree::Box => Some(self.box_hull.view()),
            HullTree::Octagon => Some(self.octagon_hull.view()),
        }
    }

    /// Tree and validated root for a head node, None for a null head node.
    pub(crate) fn resolve(&self, headnode: HeadNode) -> Option<(TreeView<'_>, i32)> {
        let tree = self.tree(headnode.tree)?;
        tree.is_valid(headnode.num).then_some((tree, headnode.num))
    }

    /// Head node of the world model.
    pub fn world_headnode(&self) -> HeadNode {
        let num = self
            .cache
            .as_deref()
            .and_then(|m| m.models.first())
            .map(|m| m.headnode)
            .unwrap_or(0);
        HeadNode::world(num)
    }

    pub fn node_for_number(&self, number: i32) -> NodeRef {
        let Some(map) = self.cache.as_deref() else {
            return NodeRef::Null;
        };
        if number == -1 {
            return NodeRef::Leaf(0);
        }
        if number < 0 || number as usize >= map.nodes.len() {
            tracing::warn!(number, "node_for_number: bad number");
            return NodeRef::Null;
        }
        NodeRef::Node(number as usize)
    }

    /// Null (and the solid leaf) map to -1.
    pub fn number_for_node(&self, node: NodeRef) -> i32 {
        match node {
            NodeRef::Node(n) if self.cache.is_some() => n as i32,
            _ => -1,
        }
    }

    pub fn leaf_for_number(&self, number: i32) -> LeafRef {
        match self.cache.as_deref() {
            Some(map) if number >= 0 && (number as usize) < map.leafs.len() => {
                LeafRef::Leaf(number as usize)
            }
            Some(_) => {
                tracing::warn!(number, "leaf_for_number: bad number");
                LeafRef::Null
            }
            None => LeafRef::Null,
        }
    }

    /// Null maps to 0.
    pub fn number_for_leaf(&self, leaf: LeafRef) -> i32 {
        match leaf {
            LeafRef::Leaf(n) if self.cache.is_some() => n as i32,
            _ => 0,
        }
    }

    /// Leaf data, the null leaf for `LeafRef::Null` or a stale index.
    pub fn leaf(&self, leaf: LeafRef) -> &CLeaf {
        match (leaf, self.cache.as_deref()) {
            (LeafRef::Leaf(n), Some(map)) => map.leafs.get(n).unwrap_or(&self.null_leaf),
            _ => &self.null_leaf,
        }
    }

    pub fn leaf_contents(&self, number: i32) -> Contents {
        self.leaf(self.leaf_for_number(number)).contents
    }

    pub fn leaf_cluster(&self, number: i32) -> i32 {
        self.leaf(self.leaf_for_number(number)).cluster
    }

    pub fn leaf_area(&self, number: i32) -> i32 {
        self.leaf(self.leaf_for_number(number)).area
    }

    /// World leaf containing `p`.
    pub fn point_leaf(&mut self, p: &Vec3) -> LeafRef {
        self.stats.point_contents += 1;
        match self.resolve(self.world_headnode()) {
            Some((tree, root)) => LeafRef::Leaf(tree.point_leaf(p, root)),
            None => LeafRef::Null,
        }
    }

    /// Leafs of the world tree touched by the box, starting from `headnode`
    /// (a world node number) or the world root.
    pub fn box_leafs(
        &self,
        mins: &Vec3,
        maxs: &Vec3,
        headnode: Option<i32>,
        max_count: usize,
    ) -> BoxLeafs {
        self.box_contents(mins, maxs, headnode, max_count).1
    }

    /// Like `box_leafs`, also returning the union of the touched leafs'
    /// contents. Leafs past `max_count` still count toward the union.
    pub fn box_contents(
        &self,
        mins: &Vec3,
        maxs: &Vec3,
        headnode: Option<i32>,
        max_count: usize,
    ) -> (Contents, BoxLeafs) {
        let mut contents = Contents::empty();
        let mut out = BoxLeafs {
            leafs: Vec::new(),
            top_node: -1,
        };
        let head = headnode.map(HeadNode::world).unwrap_or(self.world_headnode());
        if let Some((tree, root)) = self.resolve(head) {
            out.leafs.reserve(max_count.min(64));
            tree.box_leafs_r(
                root,
                mins,
                maxs,
                max_count,
                &mut out.leafs,
                &mut contents,
                &mut out.top_node,
            );
        }
        (contents, out)
    }

    /// True if any leaf under world node `num` has a cluster set in `visbits`.
    pub fn headnode_visible(&self, num: i32, visbits: &[u8]) -> bool {
        match self.resolve(HeadNode::world(num)) {
            Some((tree, root)) => tree.headnode_visible(root, visbits),
            None => false,
        }
    }

    pub fn null_leaf(&self) -> &CLeaf {
        &self.null_leaf
    }
}

// ============================================================
// Tests
// ============================================================

// contents.rs — point classification

use q2cm_shared::{angles_to_axis, rotate_point, vector_empty, vector_subtract, Contents, Vec3};

use crate::cmodel::CollisionModel;
use crate::tree::{HeadNode, HullTree};

impl CollisionModel {
    /// Contents of the leaf containing `p` under `headnode`. Empty when no
    /// map is loaded or the head node is out of range.
    pub fn point_contents(&mut self, p: &Vec3, headnode: HeadNode) -> Contents {
        self.stats.point_contents += 1;
        match self.resolve(headnode) {
            Some((tree, root)) => tree.leafs[tree.point_leaf(p, root)].contents,
            None => Contents::empty(),
        }
    }

    /// Handles offseting and rotation of the end points for moving and
    /// rotating entities.
    pub fn transformed_point_contents(
        &mut self,
        p: &Vec3,
        headnode: HeadNode,
        origin: &Vec3,
        angles: &Vec3,
    ) -> Contents {
        // subtract origin offset
        let mut p_l = vector_subtract(p, origin);

        // rotate start and end into the models frame of reference
        if headnode.tree == HullTree::World && !vector_empty(angles) {
            p_l = rotate_point(&p_l, &angles_to_axis(angles));
        }

        self.point_contents(&p_l, headnode)
    }
}

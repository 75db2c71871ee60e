// pvs.rs — cluster visibility rows and the fat PVS around a viewpoint

use q2cm_shared::Vec3;
use rayon::prelude::*;

use crate::cmodel::CollisionModel;
use crate::map::{BspMap, VisKind};
use crate::tree::LeafRef;

/// Leafs sampled around a viewpoint.
const FAT_PVS_LEAFS: usize = 64;

/// Half size of the box around a viewpoint.
const FAT_PVS_EXPAND: f32 = 8.0;

/// Rows wider than this are merged on the rayon pool.
const PARALLEL_MERGE_BYTES: usize = 256;

/// Expands one run-length compressed row: a nonzero byte is copied, a
/// zero is followed by a count of zero bytes.
fn decompress_vis(map: &BspMap, offset: usize, out: &mut [u8]) {
    let Some(vis) = map.vis.as_ref() else {
        out.fill(0xff);
        return;
    };

    let row = out.len();
    let data = &vis.data;
    let mut inp = offset;
    let mut outp = 0;

    while outp < row {
        let Some(&b) = data.get(inp) else {
            break;
        };
        if b != 0 {
            out[outp] = b;
            outp += 1;
            inp += 1;
            continue;
        }

        let Some(&count) = data.get(inp + 1) else {
            break;
        };
        inp += 2;
        let mut c = count as usize;
        if outp + c > row {
            c = row - outp;
            tracing::debug!(offset, "vis decompression overrun");
        }
        out[outp..outp + c].fill(0);
        outp += c;
    }
}

fn merge_row(dst: &mut [u8], src: &[u8]) {
    if dst.len() > PARALLEL_MERGE_BYTES {
        dst.par_iter_mut().zip(src.par_iter()).for_each(|(d, s)| *d |= *s);
    } else {
        dst.iter_mut().zip(src).for_each(|(d, s)| *d |= *s);
    }
}

impl CollisionModel {
    /// Bytes in one visibility row.
    pub fn vis_rowsize(&self) -> usize {
        (self.num_clusters() + 7) >> 3
    }

    /// Decompressed PVS or PHS row of `cluster`. Cluster -1 sees nothing,
    /// a map without visibility data sees everything.
    pub fn cluster_vis(&self, cluster: i32, kind: VisKind) -> Vec<u8> {
        let Some(map) = self.cache.as_deref() else {
            return Vec::new();
        };
        let mut row = vec![0u8; self.vis_rowsize()];

        let Some(vis) = map.vis.as_ref() else {
            row.fill(0xff);
            return row;
        };
        if cluster == -1 {
            return row;
        }
        if cluster < 0 || cluster as usize >= vis.num_clusters {
            tracing::debug!(cluster, "cluster_vis: bad cluster number");
            return row;
        }

        let offset = vis.bitofs[cluster as usize][kind as usize];
        decompress_vis(map, offset, &mut row);
        row
    }

    /// Union of the rows of every cluster touched by a small box around
    /// `org`. The viewer is interpolated between frames, so a single point
    /// can miss clusters that are about to come into view.
    pub fn fat_pvs(&self, org: &Vec3, kind: VisKind) -> Vec<u8> {
        let Some(map) = self.cache.as_deref() else {
            return vec![0u8; self.vis_rowsize()];
        };
        if map.vis.is_none() {
            return vec![0xff; self.vis_rowsize()];
        }

        let mins = org.map(|v| v - FAT_PVS_EXPAND);
        let maxs = org.map(|v| v + FAT_PVS_EXPAND);
        let found = self.box_leafs(&mins, &maxs, None, FAT_PVS_LEAFS);

        let mut clusters: Vec<i32> = Vec::with_capacity(found.leafs.len());
        for leaf in found.leafs {
            let cluster = self.leaf(LeafRef::Leaf(leaf)).cluster;
            if !clusters.contains(&cluster) {
                clusters.push(cluster);
            }
        }

        let mut mask = vec![0u8; self.vis_rowsize()];
        for cluster in clusters {
            merge_row(&mut mask, &self.cluster_vis(cluster, kind));
        }
        mask
    }
}

// ============================================================
// Viewpoint tracking
// ============================================================

/// Where a viewpoint currently sits in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewpoint {
    pub leaf: LeafRef,
    pub cluster: i32,
    pub area: i32,
}

/// Keeps the last cluster a viewer was inside, so stepping outside the
/// map for a frame does not blank the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PvsTracker {
    last_valid_cluster: i32,
}

impl PvsTracker {
    pub fn new() -> Self {
        Self {
            last_valid_cluster: -1,
        }
    }

    pub fn last_valid_cluster(&self) -> i32 {
        self.last_valid_cluster
    }

    /// Visibility mask for a viewer at `org` and where it was found.
    pub fn update(&mut self, cm: &mut CollisionModel, org: &Vec3) -> (Vec<u8>, Viewpoint) {
        let leaf = cm.point_leaf(org);
        let data = cm.leaf(leaf);
        let view = Viewpoint {
            leaf,
            cluster: data.cluster,
            area: data.area,
        };

        let mask = if view.cluster >= 0 {
            self.last_valid_cluster = view.cluster;
            cm.fat_pvs(org, VisKind::Pvs)
        } else {
            cm.cluster_vis(self.last_valid_cluster, VisKind::Pvs)
        };
        (mask, view)
    }
}

impl Default for PvsTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::VisData;
    use crate::testmap::{floor_map, loaded, three_area_map};

    #[test]
    fn test_cluster_rows() {
        let cm = loaded(three_area_map());
        assert_eq!(cm.vis_rowsize(), 1);
        assert_eq!(cm.cluster_vis(0, VisKind::Pvs), vec![0b011]);
        assert_eq!(cm.cluster_vis(2, VisKind::Pvs), vec![0b110]);
        assert_eq!(cm.cluster_vis(1, VisKind::Phs), vec![0b111]);
        assert_eq!(cm.cluster_vis(-1, VisKind::Pvs), vec![0]);
        assert_eq!(cm.cluster_vis(3, VisKind::Pvs), vec![0]);
    }

    #[test]
    fn test_without_vis_everything_is_visible() {
        let cm = loaded(floor_map());
        assert_eq!(cm.cluster_vis(0, VisKind::Pvs), vec![0xff]);
        assert_eq!(cm.cluster_vis(-1, VisKind::Pvs), vec![0xff]);
        assert_eq!(cm.fat_pvs(&[0.0, 0.0, 10.0], VisKind::Pvs), vec![0xff]);
    }

    #[test]
    fn test_no_map() {
        let cm = CollisionModel::new();
        assert!(cm.cluster_vis(0, VisKind::Pvs).is_empty());
        assert!(cm.fat_pvs(&[0.0; 3], VisKind::Pvs).is_empty());
    }

    #[test]
    fn test_run_length_zeros() {
        let mut data = three_area_map();
        // 20 clusters: 3 row bytes. row 0 = [0x01, 0, 0], row 1 overruns
        data.vis = Some(VisData {
            num_clusters: 20,
            bitofs: vec![[0, 0]; 20],
            data: vec![0x01, 0x00, 0x02, 0x00, 0x09],
        });
        data.vis.as_mut().unwrap().bitofs[1] = [3, 3];
        let cm = loaded(data);
        assert_eq!(cm.vis_rowsize(), 3);
        assert_eq!(cm.cluster_vis(0, VisKind::Pvs), vec![0x01, 0x00, 0x00]);
        assert_eq!(cm.cluster_vis(1, VisKind::Pvs), vec![0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_truncated_row_stays_zero() {
        let mut data = three_area_map();
        data.vis = Some(VisData {
            num_clusters: 20,
            bitofs: vec![[0, 0]; 20],
            data: vec![0x05, 0x07],
        });
        let cm = loaded(data);
        assert_eq!(cm.cluster_vis(0, VisKind::Pvs), vec![0x05, 0x07, 0x00]);
    }

    #[test]
    fn test_fat_pvs_unions_nearby_clusters() {
        let cm = loaded(three_area_map());
        // deep inside B only cluster 1 counts
        assert_eq!(cm.fat_pvs(&[50.0, 0.0, 0.0], VisKind::Pvs), vec![0b111]);
        // deep inside A
        assert_eq!(cm.fat_pvs(&[-50.0, 0.0, 0.0], VisKind::Pvs), vec![0b011]);
        // straddling the C/B wall picks up both rows
        assert_eq!(cm.fat_pvs(&[104.0, 0.0, 0.0], VisKind::Pvs), vec![0b111]);
    }

    #[test]
    fn test_merge_row_large() {
        let mut dst = vec![0b0101u8; 1024];
        let src = vec![0b1010u8; 1024];
        merge_row(&mut dst, &src);
        assert!(dst.iter().all(|&b| b == 0b1111));
    }

    #[test]
    fn test_tracker_falls_back_to_last_cluster() {
        let mut data = three_area_map();
        // carve a clusterless pocket: leaf A loses its cluster
        data.leafs[1].cluster = -1;
        let mut cm = loaded(data);
        let mut tracker = PvsTracker::new();

        // never valid yet: nothing visible
        let (mask, view) = tracker.update(&mut cm, &[-50.0, 0.0, 0.0]);
        assert_eq!(view.cluster, -1);
        assert_eq!(view.area, 1);
        assert_eq!(mask, vec![0]);

        let (mask, view) = tracker.update(&mut cm, &[150.0, 0.0, 0.0]);
        assert_eq!(view.cluster, 2);
        assert_eq!(view.leaf, LeafRef::Leaf(3));
        assert_eq!(mask, vec![0b110]);
        assert_eq!(tracker.last_valid_cluster(), 2);

        // back in the pocket, cluster 2's row is reused
        let (mask, _) = tracker.update(&mut cm, &[-50.0, 0.0, 0.0]);
        assert_eq!(mask, vec![0b110]);
    }
}

// map.rs — pre-parsed map geometry and load-time validation
//
// Byte level lump decoding happens elsewhere. A `BspMap` is built from
// already decoded arrays, checked once, and then shared read-only (via
// `Arc`) by every collision model instance that loads it.

use q2cm_shared::{CPlane, CSurface, Contents, Vec3};
use rayon::prelude::*;

use crate::entities::{parse_entity_string, Entity};
use crate::error::{CmError, CmResult};
use crate::tree::TreeView;

// ============================================================
// Limits
// ============================================================

pub const MAX_MAP_AREAS: usize = 256;
pub const MAX_MAP_AREAPORTALS: usize = 1024;
pub const MAX_MAP_PORTAL_BYTES: usize = MAX_MAP_AREAPORTALS / 8;

/// Element counts above which load-time passes run on the rayon pool.
const PARALLEL_LOAD_THRESHOLD: usize = 64;

// ============================================================
// Map elements
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CNode {
    pub plane: usize,
    /// >= 0 is a node number, negative is leaf `-1 - child`
    pub children: [i32; 2],
    pub mins: Vec3,
    pub maxs: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CLeaf {
    pub contents: Contents,
    /// -1 when the leaf is outside every cluster
    pub cluster: i32,
    pub area: i32,
    pub first_leaf_brush: usize,
    pub num_leaf_brushes: usize,
}

/// Leaf handed out when no map is loaded or a number is out of range.
pub const NULL_LEAF: CLeaf = CLeaf {
    contents: Contents::empty(),
    cluster: -1,
    area: 0,
    first_leaf_brush: 0,
    num_leaf_brushes: 0,
};

impl Default for CLeaf {
    fn default() -> Self {
        NULL_LEAF
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CBrush {
    pub contents: Contents,
    pub first_side: usize,
    pub num_sides: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CBrushSide {
    pub plane: usize,
    /// None for sides without a texture (null surface)
    pub surface: Option<usize>,
}

/// A brush model: the world is model 0, doors and platforms follow.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CModel {
    pub mins: Vec3,
    pub maxs: Vec3,
    pub origin: Vec3,
    pub headnode: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CArea {
    pub first_portal: usize,
    pub num_portals: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CAreaPortal {
    pub portal_num: usize,
    pub other_area: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisKind {
    /// potentially visible set
    Pvs = 0,
    /// potentially hearable set
    Phs = 1,
}

/// Run-length compressed cluster visibility.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VisData {
    pub num_clusters: usize,
    /// per cluster: [pvs offset, phs offset] into `data`
    pub bitofs: Vec<[usize; 2]>,
    pub data: Vec<u8>,
}

/// Decoded map arrays, as produced by the file loader.
#[derive(Debug, Clone, Default)]
pub struct BspMapData {
    pub name: String,
    pub checksum: u32,
    pub planes: Vec<CPlane>,
    pub nodes: Vec<CNode>,
    pub leafs: Vec<CLeaf>,
    pub leaf_brushes: Vec<usize>,
    pub brushes: Vec<CBrush>,
    pub brush_sides: Vec<CBrushSide>,
    pub surfaces: Vec<CSurface>,
    pub models: Vec<CModel>,
    pub areas: Vec<CArea>,
    pub area_portals: Vec<CAreaPortal>,
    pub vis: Option<VisData>,
    pub entity_string: String,
}

// ============================================================
// BspMap
// ============================================================

/// Validated, immutable map geometry.
#[derive(Debug)]
pub struct BspMap {
    name: String,
    checksum: u32,
    pub(crate) planes: Vec<CPlane>,
    pub(crate) nodes: Vec<CNode>,
    pub(crate) leafs: Vec<CLeaf>,
    pub(crate) leaf_brushes: Vec<usize>,
    pub(crate) brushes: Vec<CBrush>,
    pub(crate) brush_sides: Vec<CBrushSide>,
    pub(crate) surfaces: Vec<CSurface>,
    pub(crate) models: Vec<CModel>,
    pub(crate) areas: Vec<CArea>,
    pub(crate) area_portals: Vec<CAreaPortal>,
    pub(crate) vis: Option<VisData>,
    num_clusters: usize,
    num_portals: usize,
    entity_string: String,
    entities: Vec<Entity>,
}

impl BspMap {
    pub fn new(data: BspMapData) -> CmResult<Self> {
        let BspMapData {
            name,
            checksum,
            mut planes,
            nodes,
            leafs,
            leaf_brushes,
            brushes,
            brush_sides,
            surfaces,
            models,
            areas,
            area_portals,
            vis,
            entity_string,
        } = data;

        if models.is_empty() {
            return Err(CmError::NoModels);
        }
        if leafs.is_empty() {
            return Err(CmError::NoLeafs);
        }
        if areas.len() > MAX_MAP_AREAS {
            return Err(CmError::TooManyAreas(areas.len()));
        }

        // plane classification is recomputed, never trusted from the file
        let classify = |p: &mut CPlane| {
            p.set_type();
            p.set_signbits();
        };
        if planes.len() > PARALLEL_LOAD_THRESHOLD {
            planes.par_iter_mut().for_each(classify);
        } else {
            planes.iter_mut().for_each(classify);
        }

        // node children always sit after their parent, which keeps every
        // descent finite
        let check_child = |node: usize, child: i32| -> CmResult<()> {
            let ok = if child >= 0 {
                (child as usize) < nodes.len()
            } else {
                ((-1 - child) as usize) < leafs.len()
            };
            if !ok {
                return Err(CmError::ChildIndex { node, child });
            }
            if child >= 0 && child as usize <= node {
                return Err(CmError::ChildOrder { node, child });
            }
            Ok(())
        };
        let check_node = |(i, n): (usize, &CNode)| -> CmResult<()> {
            if n.plane >= planes.len() {
                return Err(CmError::PlaneIndex {
                    node: i,
                    plane: n.plane,
                });
            }
            check_child(i, n.children[0])?;
            check_child(i, n.children[1])
        };
        if nodes.len() > PARALLEL_LOAD_THRESHOLD {
            nodes.par_iter().enumerate().try_for_each(check_node)?;
        } else {
            nodes.iter().enumerate().try_for_each(check_node)?;
        }

        let check_leaf = |(i, l): (usize, &CLeaf)| -> CmResult<()> {
            if l.first_leaf_brush + l.num_leaf_brushes > leaf_brushes.len() {
                return Err(CmError::LeafBrushRange { leaf: i });
            }
            Ok(())
        };
        if leafs.len() > PARALLEL_LOAD_THRESHOLD {
            leafs.par_iter().enumerate().try_for_each(check_leaf)?;
        } else {
            leafs.iter().enumerate().try_for_each(check_leaf)?;
        }

        if let Some(&index) = leaf_brushes.iter().find(|&&b| b >= brushes.len()) {
            return Err(CmError::BrushIndex { index });
        }
        for (i, b) in brushes.iter().enumerate() {
            if b.first_side + b.num_sides > brush_sides.len() {
                return Err(CmError::BrushSideRange { brush: i });
            }
        }
        for (i, s) in brush_sides.iter().enumerate() {
            if s.plane >= planes.len() {
                return Err(CmError::SidePlane {
                    side: i,
                    plane: s.plane,
                });
            }
            if let Some(surface) = s.surface {
                if surface >= surfaces.len() {
                    return Err(CmError::SurfaceIndex { side: i, surface });
                }
            }
        }

        for (i, m) in models.iter().enumerate() {
            let ok = if m.headnode >= 0 {
                (m.headnode as usize) < nodes.len()
            } else {
                ((-1 - m.headnode) as usize) < leafs.len()
            };
            if !ok {
                return Err(CmError::ModelHeadnode {
                    model: i,
                    headnode: m.headnode,
                });
            }
        }

        let num_portals = check_area_portals(&areas, &area_portals)?;

        let num_clusters = match &vis {
            Some(v) => {
                check_vis(v)?;
                v.num_clusters
            }
            None => leafs
                .iter()
                .map(|l| l.cluster + 1)
                .max()
                .unwrap_or(0)
                .max(0) as usize,
        };

        let entities = parse_entity_string(&entity_string)?;

        tracing::info!(
            map = %name,
            nodes = nodes.len(),
            leafs = leafs.len(),
            brushes = brushes.len(),
            clusters = num_clusters,
            areas = areas.len(),
            portals = num_portals,
            entities = entities.len(),
            checksum,
            "map built"
        );

        Ok(Self {
            name,
            checksum,
            planes,
            nodes,
            leafs,
            leaf_brushes,
            brushes,
            brush_sides,
            surfaces,
            models,
            areas,
            area_portals,
            vis,
            num_clusters,
            num_portals,
            entity_string,
            entities,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    pub fn planes(&self) -> &[CPlane] {
        &self.planes
    }

    pub fn nodes(&self) -> &[CNode] {
        &self.nodes
    }

    pub fn leafs(&self) -> &[CLeaf] {
        &self.leafs
    }

    pub fn brushes(&self) -> &[CBrush] {
        &self.brushes
    }

    pub fn models(&self) -> &[CModel] {
        &self.models
    }

    /// Includes the unused area 0.
    pub fn num_areas(&self) -> usize {
        self.areas.len()
    }

    pub fn num_portals(&self) -> usize {
        self.num_portals
    }

    pub fn num_clusters(&self) -> usize {
        self.num_clusters
    }

    pub fn has_vis(&self) -> bool {
        self.vis.is_some()
    }

    /// Bytes in one decompressed visibility row.
    pub fn vis_rowsize(&self) -> usize {
        (self.num_clusters + 7) >> 3
    }

    pub fn entity_string(&self) -> &str {
        &self.entity_string
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub(crate) fn view(&self) -> TreeView<'_> {
        TreeView {
            planes: &self.planes,
            nodes: &self.nodes,
            leafs: &self.leafs,
            leaf_brushes: &self.leaf_brushes,
            brushes: &self.brushes,
            brush_sides: &self.brush_sides,
            surfaces: &self.surfaces,
        }
    }
}

/// Checks ranges and symmetry of the portal graph, returns the number of
/// portal state slots the map needs.
fn check_area_portals(areas: &[CArea], portals: &[CAreaPortal]) -> CmResult<usize> {
    let mut num_portals = 0;

    for (a, area) in areas.iter().enumerate() {
        if area.first_portal + area.num_portals > portals.len() {
            return Err(CmError::AreaPortalRange { area: a });
        }
    }

    for (a, area) in areas.iter().enumerate() {
        let own = &portals[area.first_portal..area.first_portal + area.num_portals];
        for p in own {
            if p.other_area >= areas.len() {
                return Err(CmError::AreaIndex {
                    portal: p.portal_num,
                    area: p.other_area,
                });
            }
            if p.portal_num >= MAX_MAP_AREAPORTALS {
                return Err(CmError::PortalNumber {
                    portal: p.portal_num,
                });
            }
            num_portals = num_portals.max(p.portal_num + 1);

            // connectivity must be symmetric, so every edge needs its twin
            let other = &areas[p.other_area];
            let back = &portals[other.first_portal..other.first_portal + other.num_portals];
            if !back
                .iter()
                .any(|q| q.portal_num == p.portal_num && q.other_area == a)
            {
                return Err(CmError::AsymmetricPortal {
                    portal: p.portal_num,
                    from: a,
                    to: p.other_area,
                });
            }
        }
    }

    Ok(num_portals)
}

fn check_vis(vis: &VisData) -> CmResult<()> {
    if vis.bitofs.len() != vis.num_clusters {
        return Err(CmError::VisClusterCount {
            got: vis.bitofs.len(),
            clusters: vis.num_clusters,
        });
    }
    for (cluster, ofs) in vis.bitofs.iter().enumerate() {
        for &offset in ofs {
            if offset >= vis.data.len() {
                return Err(CmError::VisOffset { cluster, offset });
            }
        }
    }
    Ok(())
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testmap::{floor_map, three_area_map};

    #[test]
    fn test_floor_map_builds() {
        let map = BspMap::new(floor_map()).unwrap();
        assert_eq!(map.nodes().len(), 1);
        assert_eq!(map.leafs().len(), 2);
        assert_eq!(map.planes()[0].plane_type, q2cm_shared::PLANE_Z);
    }

    #[test]
    fn test_planes_are_reclassified() {
        let mut data = floor_map();
        data.planes[0].plane_type = 5;
        data.planes[0].signbits = 7;
        let map = BspMap::new(data).unwrap();
        assert_eq!(map.planes()[0].plane_type, q2cm_shared::PLANE_Z);
        assert_eq!(map.planes()[0].signbits, 0);
    }

    #[test]
    fn test_missing_models_rejected() {
        let mut data = floor_map();
        data.models.clear();
        assert!(matches!(BspMap::new(data), Err(CmError::NoModels)));
    }

    #[test]
    fn test_bad_child_rejected() {
        let mut data = floor_map();
        data.nodes[0].children[0] = -10;
        assert!(matches!(
            BspMap::new(data),
            Err(CmError::ChildIndex { node: 0, child: -10 })
        ));
    }

    #[test]
    fn test_looping_child_rejected() {
        let mut data = floor_map();
        data.nodes[0].children[0] = 0;
        assert!(matches!(
            BspMap::new(data),
            Err(CmError::ChildOrder { node: 0, child: 0 })
        ));

        let mut data = three_area_map();
        data.nodes[1].children[1] = 0;
        assert!(matches!(
            BspMap::new(data),
            Err(CmError::ChildOrder { node: 1, child: 0 })
        ));
    }

    #[test]
    fn test_bad_plane_rejected() {
        let mut data = floor_map();
        data.nodes[0].plane = 3;
        assert!(matches!(BspMap::new(data), Err(CmError::PlaneIndex { .. })));
    }

    #[test]
    fn test_bad_brush_side_range_rejected() {
        let mut data = floor_map();
        data.brushes[0].num_sides = 4;
        assert!(matches!(
            BspMap::new(data),
            Err(CmError::BrushSideRange { brush: 0 })
        ));
    }

    #[test]
    fn test_asymmetric_portal_rejected() {
        let mut data = three_area_map();
        // area 2 forgets its way back to area 1
        data.area_portals[1].other_area = 3;
        assert!(matches!(
            BspMap::new(data),
            Err(CmError::AsymmetricPortal { .. })
        ));
    }

    #[test]
    fn test_portal_count_from_numbers() {
        let map = BspMap::new(three_area_map()).unwrap();
        assert_eq!(map.num_areas(), 4);
        assert_eq!(map.num_portals(), 2);
    }

    #[test]
    fn test_vis_offset_checked() {
        let mut data = three_area_map();
        if let Some(vis) = data.vis.as_mut() {
            vis.bitofs[0][0] = 999;
        }
        assert!(matches!(
            BspMap::new(data),
            Err(CmError::VisOffset { cluster: 0, offset: 999 })
        ));
    }

    #[test]
    fn test_bad_entity_string_rejected() {
        let mut data = floor_map();
        data.entity_string = "{ \"classname\" \"worldspawn\"".to_string();
        assert!(matches!(BspMap::new(data), Err(CmError::EntityString(_))));
    }

    #[test]
    fn test_large_map_uses_parallel_passes() {
        let mut data = floor_map();
        // pad with duplicate planes so classification runs on the pool
        for _ in 0..200 {
            data.planes.push(CPlane {
                normal: [0.0, -1.0, 0.0],
                dist: 8.0,
                ..Default::default()
            });
        }
        let map = BspMap::new(data).unwrap();
        assert!(map.planes()[1..]
            .iter()
            .all(|p| p.plane_type == q2cm_shared::PLANE_NON_AXIAL && p.signbits == 2));
    }
}

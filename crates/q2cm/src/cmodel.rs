// cmodel.rs — one collision model instance
//
// Geometry is shared behind an Arc, everything an instance mutates lives
// here: portal state, brush check stamps, the scratch hulls and counters.
// The server and the client each own one.

use std::sync::Arc;

use q2cm_shared::{Contents, Vec3};

use crate::config::CmConfig;
use crate::entities::{Entity, EntityPair};
use crate::error::CmResult;
use crate::hull::{BoxHull, OctagonHull};
use crate::map::{BspMap, BspMapData, CLeaf, CModel, NULL_LEAF};
use crate::tree::{HeadNode, HullTree};

/// Per instance query counters, reset on every load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CmStats {
    pub traces: u64,
    /// brushes actually clipped against
    pub brush_traces: u64,
    pub point_contents: u64,
}

#[derive(Debug)]
pub struct CollisionModel {
    pub(crate) cache: Option<Arc<BspMap>>,
    pub(crate) config: CmConfig,

    /// last checkcount that tested each world brush
    pub(crate) world_checks: Vec<u32>,
    pub(crate) checkcount: u32,

    pub(crate) box_hull: BoxHull,
    pub(crate) octagon_hull: OctagonHull,

    /// per area flood number, 0 for area 0 and unreached areas
    pub(crate) floodnums: Vec<i32>,
    pub(crate) portal_open: Vec<bool>,

    pub(crate) null_leaf: CLeaf,
    pub(crate) stats: CmStats,
}

impl CollisionModel {
    pub fn new() -> Self {
        Self {
            cache: None,
            config: CmConfig::default(),
            world_checks: Vec::new(),
            checkcount: 0,
            box_hull: BoxHull::new(),
            octagon_hull: OctagonHull::new(),
            floodnums: Vec::new(),
            portal_open: Vec::new(),
            null_leaf: NULL_LEAF,
            stats: CmStats::default(),
        }
    }

    pub fn with_config(config: CmConfig) -> Self {
        Self {
            config,
            ..Self::new()
        }
    }

    // ============================================================
    // Load / unload
    // ============================================================

    /// Attach already built geometry. Portals start closed.
    pub fn load_map(&mut self, map: Arc<BspMap>) {
        self.world_checks = vec![0; map.brushes.len()];
        self.checkcount = 0;
        self.portal_open = vec![false; map.num_portals()];
        self.floodnums = vec![0; map.num_areas()];
        self.stats = CmStats::default();

        tracing::info!(
            map = map.name(),
            models = map.models.len(),
            clusters = map.num_clusters(),
            "collision model loaded"
        );

        self.cache = Some(map);
        self.flood_area_connections();
    }

    /// Build and attach a map. On failure the instance is left unloaded.
    pub fn load_map_data(&mut self, data: BspMapData) -> CmResult<Arc<BspMap>> {
        match BspMap::new(data) {
            Ok(map) => {
                let map = Arc::new(map);
                self.load_map(Arc::clone(&map));
                Ok(map)
            }
            Err(e) => {
                tracing::warn!(error = %e, "map load failed");
                self.unload();
                Err(e)
            }
        }
    }

    pub fn unload(&mut self) {
        if let Some(map) = self.cache.take() {
            tracing::info!(map = map.name(), "collision model unloaded");
        }
        self.world_checks = Vec::new();
        self.portal_open = Vec::new();
        self.floodnums = Vec::new();
    }

    pub fn is_loaded(&self) -> bool {
        self.cache.is_some()
    }

    pub fn map(&self) -> Option<&Arc<BspMap>> {
        self.cache.as_ref()
    }

    pub fn config(&self) -> CmConfig {
        self.config
    }

    pub fn set_config(&mut self, config: CmConfig) {
        self.config = config;
    }

    pub fn stats(&self) -> CmStats {
        self.stats
    }

    // ============================================================
    // Synthetic hulls
    // ============================================================

    /// Rebuild the box hull around `mins`/`maxs`. Empty contents become
    /// MONSTER. The returned head node stays valid only until the next
    /// call on this instance.
    pub fn headnode_for_box(&mut self, mins: &Vec3, maxs: &Vec3, contents: Contents) -> HeadNode {
        self.box_hull.set_bounds(mins, maxs, contents);
        HeadNode {
            tree: HullTree::Box,
            num: 0,
        }
    }

    /// Same as `headnode_for_box` with the vertical edges bevelled.
    pub fn headnode_for_octagon(
        &mut self,
        mins: &Vec3,
        maxs: &Vec3,
        contents: Contents,
    ) -> HeadNode {
        self.octagon_hull.set_bounds(mins, maxs, contents);
        HeadNode {
            tree: HullTree::Octagon,
            num: 0,
        }
    }

    pub fn box_hull(&self) -> &BoxHull {
        &self.box_hull
    }

    pub fn octagon_hull(&self) -> &OctagonHull {
        &self.octagon_hull
    }

    // ============================================================
    // Models
    // ============================================================

    /// Looks up a brush model by its "*N" name. N must be at least 1.
    pub fn inline_model(&self, name: &str) -> Option<&CModel> {
        let num: usize = match name.strip_prefix('*').map(str::parse::<usize>) {
            Some(Ok(n)) => n,
            _ => {
                tracing::warn!(name, "inline_model: bad name");
                return None;
            }
        };
        if num < 1 {
            tracing::warn!(name, "inline_model: bad number");
            return None;
        }
        self.model(num)
    }

    pub fn model(&self, index: usize) -> Option<&CModel> {
        self.cache.as_deref()?.models.get(index)
    }

    pub fn num_inline_models(&self) -> usize {
        self.cache.as_deref().map(|m| m.models.len()).unwrap_or(0)
    }

    pub fn model_headnode(&self, index: usize) -> Option<HeadNode> {
        self.model(index).map(|m| HeadNode::world(m.headnode))
    }

    pub fn num_clusters(&self) -> usize {
        self.cache.as_deref().map(|m| m.num_clusters()).unwrap_or(0)
    }

    // ============================================================
    // Entities
    // ============================================================

    pub fn entity_string(&self) -> &str {
        self.cache.as_deref().map(|m| m.entity_string()).unwrap_or("")
    }

    pub fn entities(&self) -> &[Entity] {
        self.cache.as_deref().map(|m| m.entities()).unwrap_or(&[])
    }

    /// Value of `key` on entity `index`, or the null pair.
    pub fn entity_key_value(&self, index: usize, key: &str) -> &EntityPair {
        self.entities()
            .get(index)
            .map(|e| e.key_value(key))
            .unwrap_or(&crate::entities::NULL_ENTITY_PAIR)
    }
}

impl Default for CollisionModel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testmap::{floor_map, loaded, three_area_map};
    use q2cm_shared::MASK_SOLID;

    #[test]
    fn test_unloaded_instance_is_empty() {
        let cm = CollisionModel::new();
        assert!(!cm.is_loaded());
        assert_eq!(cm.num_inline_models(), 0);
        assert_eq!(cm.num_clusters(), 0);
        assert_eq!(cm.entity_string(), "");
        assert!(cm.entities().is_empty());
        assert!(cm.inline_model("*1").is_none());
        assert_eq!(cm.world_headnode(), HeadNode::world(0));
    }

    #[test]
    fn test_failed_load_leaves_instance_unloaded() {
        let mut cm = loaded(floor_map());
        let mut bad = floor_map();
        bad.models.clear();
        assert!(cm.load_map_data(bad).is_err());
        assert!(!cm.is_loaded());

        let tr = cm.box_trace(
            &[0.0, 0.0, 10.0],
            &[0.0, 0.0, -10.0],
            &[0.0; 3],
            &[0.0; 3],
            cm.world_headnode(),
            MASK_SOLID,
        );
        assert_eq!(tr.fraction, 1.0);
    }

    #[test]
    fn test_shared_geometry_between_instances() {
        let mut server = CollisionModel::new();
        let map = server.load_map_data(three_area_map()).unwrap();
        let mut client = CollisionModel::new();
        client.load_map(Arc::clone(&map));

        server.set_area_portal_state(0, true);
        assert!(server.areas_connected(1, 2));
        assert!(!client.areas_connected(1, 2));
    }

    #[test]
    fn test_load_resets_stats() {
        let mut cm = loaded(floor_map());
        let head = cm.world_headnode();
        cm.point_contents(&[0.0; 3], head);
        assert_eq!(cm.stats().point_contents, 1);
        cm.load_map_data(floor_map()).unwrap();
        assert_eq!(cm.stats(), CmStats::default());
    }

    #[test]
    fn test_inline_model_names() {
        let mut data = floor_map();
        data.models.push(CModel {
            headnode: -2,
            ..Default::default()
        });
        let cm = loaded(data);
        assert_eq!(cm.num_inline_models(), 2);
        assert_eq!(cm.inline_model("*1").map(|m| m.headnode), Some(-2));
        assert!(cm.inline_model("*0").is_none());
        assert!(cm.inline_model("*2").is_none());
        assert!(cm.inline_model("1").is_none());
        assert!(cm.inline_model("*x").is_none());
        assert_eq!(cm.model_headnode(1), Some(HeadNode::world(-2)));
    }

    #[test]
    fn test_hull_headnodes() {
        let mut cm = CollisionModel::new();
        let b = cm.headnode_for_box(&[-1.0; 3], &[1.0; 3], Contents::empty());
        assert_eq!(b.tree, HullTree::Box);
        assert_eq!(cm.box_hull().contents(), Contents::MONSTER);
        let o = cm.headnode_for_octagon(&[-1.0; 3], &[1.0; 3], Contents::SOLID);
        assert_eq!(o.tree, HullTree::Octagon);
        assert_eq!(cm.octagon_hull().contents(), Contents::SOLID);
    }

    #[test]
    fn test_entity_key_value() {
        let cm = loaded(floor_map());
        assert_eq!(cm.entity_key_value(0, "classname").string, "worldspawn");
        assert_eq!(
            cm.entity_key_value(1, "origin").vec3,
            [0.0, 0.0, 24.0]
        );
        assert!(cm.entity_key_value(9, "origin").nullable_string().is_none());
    }
}

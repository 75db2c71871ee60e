#![allow(clippy::too_many_arguments, clippy::float_cmp, clippy::needless_range_loop,
         clippy::manual_range_contains, clippy::comparison_chain, clippy::new_without_default)]

pub mod areaportal;
pub mod cmodel;
pub mod config;
pub mod contents;
pub mod entities;
pub mod error;
pub mod global;
pub mod hull;
pub mod map;
pub mod pvs;
pub mod trace;
pub mod tree;

#[cfg(test)]
mod testmap;

pub use cmodel::{CmStats, CollisionModel};
pub use config::CmConfig;
pub use entities::{parse_entity_string, Entity, EntityPair, EntityParsed, NULL_ENTITY_PAIR};
pub use error::{CmError, CmResult};
pub use global::{with_cm, cm_init, CmSlot};
pub use hull::{BoxHull, OctagonHull};
pub use map::{
    BspMap, BspMapData, CArea, CAreaPortal, CBrush, CBrushSide, CLeaf, CModel, CNode, VisData,
    VisKind, MAX_MAP_AREAPORTALS, MAX_MAP_AREAS, MAX_MAP_PORTAL_BYTES,
};
pub use pvs::{PvsTracker, Viewpoint};
pub use trace::{clip_entity, DIST_EPSILON};
pub use tree::{BoxLeafs, HeadNode, HullTree, LeafRef, NodeRef};

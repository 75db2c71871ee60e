// global.rs — process wide server and client collision models
//
// The server simulation and client prediction each own one instance.
// Both may load the same `Arc<BspMap>`; portal state, scratch hulls and
// counters stay separate.

use std::sync::Arc;

use parking_lot::Mutex;
use q2cm_shared::{Contents, Trace, Vec3};

use crate::cmodel::CollisionModel;
use crate::error::CmResult;
use crate::map::{BspMap, BspMapData, VisKind};
use crate::tree::HeadNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmSlot {
    Server,
    Client,
}

static SERVER_CM: Mutex<Option<CollisionModel>> = parking_lot::const_mutex(None);
static CLIENT_CM: Mutex<Option<CollisionModel>> = parking_lot::const_mutex(None);

fn slot_mutex(slot: CmSlot) -> &'static Mutex<Option<CollisionModel>> {
    match slot {
        CmSlot::Server => &SERVER_CM,
        CmSlot::Client => &CLIENT_CM,
    }
}

/// Installs a fresh, unloaded instance in `slot`.
pub fn cm_init(slot: CmSlot) {
    *slot_mutex(slot).lock() = Some(CollisionModel::new());
}

/// Drops the instance in `slot`.
pub fn cm_shutdown(slot: CmSlot) {
    *slot_mutex(slot).lock() = None;
}

/// Access a slot's instance with a closure. Returns None if not initialized.
pub fn with_cm<F, R>(slot: CmSlot, f: F) -> Option<R>
where
    F: FnOnce(&mut CollisionModel) -> R,
{
    slot_mutex(slot).lock().as_mut().map(f)
}

/// Builds `data` and loads it into `slot`, initializing the slot if needed.
pub fn cm_load_map(slot: CmSlot, data: BspMapData) -> CmResult<Arc<BspMap>> {
    let mut guard = slot_mutex(slot).lock();
    guard
        .get_or_insert_with(CollisionModel::new)
        .load_map_data(data)
}

/// Loads already built geometry, typically the one the other slot holds.
pub fn cm_share_map(slot: CmSlot, map: Arc<BspMap>) {
    let mut guard = slot_mutex(slot).lock();
    guard.get_or_insert_with(CollisionModel::new).load_map(map);
}

pub fn cm_map(slot: CmSlot) -> Option<Arc<BspMap>> {
    with_cm(slot, |c| c.map().cloned()).flatten()
}

pub fn cm_num_inline_models(slot: CmSlot) -> usize {
    with_cm(slot, |c| c.num_inline_models()).unwrap_or(0)
}

pub fn cm_num_clusters(slot: CmSlot) -> usize {
    with_cm(slot, |c| c.num_clusters()).unwrap_or(0)
}

pub fn cm_point_contents(slot: CmSlot, p: &Vec3, headnode: HeadNode) -> Contents {
    with_cm(slot, |c| c.point_contents(p, headnode)).unwrap_or_default()
}

pub fn cm_transformed_point_contents(
    slot: CmSlot,
    p: &Vec3,
    headnode: HeadNode,
    origin: &Vec3,
    angles: &Vec3,
) -> Contents {
    with_cm(slot, |c| c.transformed_point_contents(p, headnode, origin, angles)).unwrap_or_default()
}

pub fn cm_leaf_cluster(slot: CmSlot, number: i32) -> i32 {
    with_cm(slot, |c| c.leaf_cluster(number)).unwrap_or(-1)
}

pub fn cm_leaf_area(slot: CmSlot, number: i32) -> i32 {
    with_cm(slot, |c| c.leaf_area(number)).unwrap_or(0)
}

#[allow(clippy::too_many_arguments)]
pub fn cm_box_trace(
    slot: CmSlot,
    start: &Vec3,
    end: &Vec3,
    mins: &Vec3,
    maxs: &Vec3,
    headnode: HeadNode,
    brushmask: Contents,
) -> Trace {
    with_cm(slot, |c| c.box_trace(start, end, mins, maxs, headnode, brushmask)).unwrap_or(Trace {
        endpos: *end,
        ..Trace::default()
    })
}

/// Box hull head node in `slot`. The hull is rebuilt by the next call, so
/// trace against it before building another.
pub fn cm_headnode_for_box(slot: CmSlot, mins: &Vec3, maxs: &Vec3, contents: Contents) -> Option<HeadNode> {
    with_cm(slot, |c| c.headnode_for_box(mins, maxs, contents))
}

pub fn cm_box_leafs(slot: CmSlot, mins: &Vec3, maxs: &Vec3, max_count: usize) -> Vec<usize> {
    with_cm(slot, |c| c.box_leafs(mins, maxs, None, max_count).leafs).unwrap_or_default()
}

pub fn cm_set_area_portal_state(slot: CmSlot, portal: i32, open: bool) {
    with_cm(slot, |c| c.set_area_portal_state(portal, open));
}

pub fn cm_areas_connected(slot: CmSlot, area1: i32, area2: i32) -> bool {
    with_cm(slot, |c| c.areas_connected(area1, area2)).unwrap_or(false)
}

pub fn cm_area_bits_message(slot: CmSlot, area: i32) -> Vec<u8> {
    with_cm(slot, |c| c.area_bits_message(area)).unwrap_or_else(|| vec![1, 0xff])
}

pub fn cm_fat_pvs(slot: CmSlot, org: &Vec3, kind: VisKind) -> Vec<u8> {
    with_cm(slot, |c| c.fat_pvs(org, kind)).unwrap_or_default()
}

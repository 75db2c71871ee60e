// testmap.rs — tiny hand made maps shared by the unit tests

use q2cm_shared::{CPlane, CSurface, Contents, SurfFlags, Vec3};

use crate::cmodel::CollisionModel;
use crate::hull::BoxHull;
use crate::map::{
    BspMapData, CArea, CAreaPortal, CBrush, CBrushSide, CLeaf, CModel, CNode, VisData, NULL_LEAF,
};

/// Loads `data` into a fresh instance.
pub(crate) fn loaded(data: BspMapData) -> CollisionModel {
    let mut cm = CollisionModel::new();
    if let Err(e) = cm.load_map_data(data) {
        panic!("test map rejected: {e}");
    }
    cm
}

/// An infinite solid floor below z = 0.
pub(crate) fn floor_map() -> BspMapData {
    BspMapData {
        name: "maps/floor.bsp".to_string(),
        checksum: 0x1234,
        planes: vec![CPlane::new([0.0, 0.0, 1.0], 0.0)],
        nodes: vec![CNode {
            plane: 0,
            children: [-2, -1],
            mins: [-4096.0; 3],
            maxs: [4096.0; 3],
        }],
        leafs: vec![
            CLeaf {
                contents: Contents::SOLID,
                cluster: -1,
                area: 0,
                first_leaf_brush: 0,
                num_leaf_brushes: 1,
            },
            CLeaf {
                contents: Contents::empty(),
                cluster: 0,
                area: 1,
                first_leaf_brush: 0,
                num_leaf_brushes: 0,
            },
        ],
        leaf_brushes: vec![0],
        brushes: vec![CBrush {
            contents: Contents::SOLID,
            first_side: 0,
            num_sides: 1,
        }],
        brush_sides: vec![CBrushSide {
            plane: 0,
            surface: Some(0),
        }],
        surfaces: vec![CSurface::new("floor", SurfFlags::empty(), 0)],
        models: vec![CModel {
            mins: [-4096.0; 3],
            maxs: [4096.0; 3],
            origin: [0.0; 3],
            headnode: 0,
        }],
        areas: vec![CArea::default(), CArea::default()],
        area_portals: Vec::new(),
        vis: None,
        entity_string: concat!(
            "{\n\"classname\" \"worldspawn\"\n\"message\" \"Floor\"\n}\n",
            "{\n\"classname\" \"info_player_start\"\n\"origin\" \"0 0 24\"\n}\n",
        )
        .to_string(),
    }
}

/// Three rooms along x: A (x < 0, water), B (0..100), C (x > 100, mist).
/// Portal 0 joins A and B, portal 1 joins B and C; both start closed.
/// Each cluster sees its neighbours.
pub(crate) fn three_area_map() -> BspMapData {
    let room = |contents: Contents, cluster: i32, area: i32| CLeaf {
        contents,
        cluster,
        area,
        first_leaf_brush: 0,
        num_leaf_brushes: 0,
    };

    BspMapData {
        name: "maps/rooms.bsp".to_string(),
        checksum: 0xbeef,
        planes: vec![
            CPlane::new([1.0, 0.0, 0.0], 0.0),
            CPlane::new([1.0, 0.0, 0.0], 100.0),
        ],
        nodes: vec![
            CNode {
                plane: 0,
                children: [1, -2],
                ..Default::default()
            },
            CNode {
                plane: 1,
                children: [-4, -3],
                ..Default::default()
            },
        ],
        leafs: vec![
            room(Contents::SOLID, -1, 0),
            room(Contents::WATER, 0, 1),
            room(Contents::empty(), 1, 2),
            room(Contents::MIST, 2, 3),
        ],
        leaf_brushes: Vec::new(),
        brushes: Vec::new(),
        brush_sides: Vec::new(),
        surfaces: Vec::new(),
        models: vec![CModel::default()],
        areas: vec![
            CArea::default(),
            CArea {
                first_portal: 0,
                num_portals: 1,
            },
            CArea {
                first_portal: 1,
                num_portals: 2,
            },
            CArea {
                first_portal: 3,
                num_portals: 1,
            },
        ],
        area_portals: vec![
            CAreaPortal {
                portal_num: 0,
                other_area: 2,
            },
            CAreaPortal {
                portal_num: 0,
                other_area: 1,
            },
            CAreaPortal {
                portal_num: 1,
                other_area: 3,
            },
            CAreaPortal {
                portal_num: 1,
                other_area: 2,
            },
        ],
        vis: Some(VisData {
            num_clusters: 3,
            // rows: 0b011, 0b111, 0b110 (one byte each, shared tail)
            bitofs: vec![[0, 3], [1, 3], [2, 3]],
            data: vec![0b011, 0b111, 0b110, 0b111],
        }),
        entity_string: String::new(),
    }
}

/// A world that is one solid box, built from a box hull's own tree.
pub(crate) fn box_model_map(mins: Vec3, maxs: Vec3) -> BspMapData {
    let mut hull = BoxHull::new();
    hull.set_bounds(&mins, &maxs, Contents::SOLID);

    BspMapData {
        name: "maps/box.bsp".to_string(),
        checksum: 0,
        planes: hull.planes.to_vec(),
        nodes: hull.nodes.to_vec(),
        leafs: vec![NULL_LEAF, hull.leafs[1]],
        leaf_brushes: hull.leaf_brushes.to_vec(),
        brushes: hull.brushes.to_vec(),
        brush_sides: hull.sides.to_vec(),
        surfaces: Vec::new(),
        models: vec![CModel {
            mins,
            maxs,
            origin: [0.0; 3],
            headnode: 0,
        }],
        areas: Vec::new(),
        area_portals: Vec::new(),
        vis: None,
        entity_string: String::new(),
    }
}

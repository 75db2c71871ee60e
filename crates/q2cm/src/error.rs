// error.rs — map load failures
//
// Queries never fail: bad numbers fall back to sentinels and an unloaded
// model behaves like an empty map. Only building a map can be rejected.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CmError {
    #[error("map has no models")]
    NoModels,

    #[error("map has no leafs")]
    NoLeafs,

    #[error("node {node} references plane {plane}")]
    PlaneIndex { node: usize, plane: usize },

    #[error("brush side {side} references plane {plane}")]
    SidePlane { side: usize, plane: usize },

    #[error("node {node} has bad child {child}")]
    ChildIndex { node: usize, child: i32 },

    #[error("node {node} child {child} does not come after it")]
    ChildOrder { node: usize, child: i32 },

    #[error("leaf {leaf} brush range out of bounds")]
    LeafBrushRange { leaf: usize },

    #[error("leaf brush list references brush {index}")]
    BrushIndex { index: usize },

    #[error("brush {brush} side range out of bounds")]
    BrushSideRange { brush: usize },

    #[error("brush side {side} references surface {surface}")]
    SurfaceIndex { side: usize, surface: usize },

    #[error("model {model} has bad headnode {headnode}")]
    ModelHeadnode { model: usize, headnode: i32 },

    #[error("too many areas: {0}")]
    TooManyAreas(usize),

    #[error("area {area} portal range out of bounds")]
    AreaPortalRange { area: usize },

    #[error("area portal {portal} leads to bad area {area}")]
    AreaIndex { portal: usize, area: usize },

    #[error("area portal number {portal} too large")]
    PortalNumber { portal: usize },

    #[error("portal {portal} from area {from} to area {to} has no way back")]
    AsymmetricPortal { portal: usize, from: usize, to: usize },

    #[error("vis has {got} row offsets for {clusters} clusters")]
    VisClusterCount { got: usize, clusters: usize },

    #[error("cluster {cluster} vis offset {offset} out of bounds")]
    VisOffset { cluster: usize, offset: usize },

    #[error("entity string: {0}")]
    EntityString(String),
}

pub type CmResult<T> = Result<T, CmError>;

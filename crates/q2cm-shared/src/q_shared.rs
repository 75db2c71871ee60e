// q_shared.rs — vector math, planes, surfaces and trace results shared by
// the collision model and everything that queries it

use crate::contents::{Contents, SurfFlags};

// ============================================================
// Basic types
// ============================================================

pub type Vec3 = [f32; 3];

/// Rows are forward, left and up.
pub type Axis = [Vec3; 3];

pub const VEC3_ORIGIN: Vec3 = [0.0; 3];

// angle indexes
pub const PITCH: usize = 0; // up / down
pub const YAW: usize = 1; // left / right
pub const ROLL: usize = 2; // fall over

// ============================================================
// MATHLIB — Vector operations
// ============================================================

#[inline]
pub fn dot_product(a: &Vec3, b: &Vec3) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
pub fn vector_subtract(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub fn vector_add(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[inline]
pub fn vector_scale(v: &Vec3, scale: f32) -> Vec3 {
    [v[0] * scale, v[1] * scale, v[2] * scale]
}

#[inline]
pub fn vector_negate(v: &Vec3) -> Vec3 {
    [-v[0], -v[1], -v[2]]
}

/// `a + scale * b`
#[inline]
pub fn vector_ma(a: &Vec3, scale: f32, b: &Vec3) -> Vec3 {
    [a[0] + scale * b[0], a[1] + scale * b[1], a[2] + scale * b[2]]
}

#[inline]
pub fn vector_lerp(a: &Vec3, b: &Vec3, frac: f32) -> Vec3 {
    [
        a[0] + frac * (b[0] - a[0]),
        a[1] + frac * (b[1] - a[1]),
        a[2] + frac * (b[2] - a[2]),
    ]
}

#[inline]
pub fn vector_compare(a: &Vec3, b: &Vec3) -> bool {
    a[0] == b[0] && a[1] == b[1] && a[2] == b[2]
}

#[inline]
pub fn vector_empty(v: &Vec3) -> bool {
    v[0] == 0.0 && v[1] == 0.0 && v[2] == 0.0
}

pub fn vector_length(v: &Vec3) -> f32 {
    dot_product(v, v).sqrt()
}

// ============================================================
// Angle functions
// ============================================================

/// Returns (forward, right, up) for the given pitch/yaw/roll in degrees.
pub fn angle_vectors(angles: &Vec3) -> (Vec3, Vec3, Vec3) {
    let (sy, cy) = angles[YAW].to_radians().sin_cos();
    let (sp, cp) = angles[PITCH].to_radians().sin_cos();
    let (sr, cr) = angles[ROLL].to_radians().sin_cos();

    let forward = [cp * cy, cp * sy, -sp];
    let right = [
        -sr * sp * cy + -cr * -sy,
        -sr * sp * sy + -cr * cy,
        -sr * cp,
    ];
    let up = [cr * sp * cy + -sr * -sy, cr * sp * sy + -sr * cy, cr * cp];
    (forward, right, up)
}

pub fn angles_to_axis(angles: &Vec3) -> Axis {
    let (forward, right, up) = angle_vectors(angles);
    [forward, vector_negate(&right), up]
}

pub fn transpose_axis(axis: &Axis) -> Axis {
    let mut out = [[0.0f32; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            out[i][j] = axis[j][i];
        }
    }
    out
}

/// Expresses `p` in the frame whose rows are `axis`.
#[inline]
pub fn rotate_point(p: &Vec3, axis: &Axis) -> Vec3 {
    [
        dot_product(p, &axis[0]),
        dot_product(p, &axis[1]),
        dot_product(p, &axis[2]),
    ]
}

// ============================================================
// Plane
// ============================================================

pub const PLANE_X: u8 = 0;
pub const PLANE_Y: u8 = 1;
pub const PLANE_Z: u8 = 2;
pub const PLANE_NON_AXIAL: u8 = 6;

/// box_on_plane_side results
pub const SIDE_FRONT: i32 = 1;
pub const SIDE_BACK: i32 = 2;
pub const SIDE_CROSS: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CPlane {
    pub normal: Vec3,
    pub dist: f32,
    /// < 3 means the normal is a positive unit axis and `dist` can be
    /// compared against one coordinate directly.
    pub plane_type: u8,
    /// bit i set when normal[i] is negative
    pub signbits: u8,
}

impl CPlane {
    pub fn new(normal: Vec3, dist: f32) -> Self {
        let mut plane = Self {
            normal,
            dist,
            plane_type: PLANE_NON_AXIAL,
            signbits: 0,
        };
        plane.set_type();
        plane.set_signbits();
        plane
    }

    pub fn set_type(&mut self) {
        self.plane_type = if self.normal[0] == 1.0 {
            PLANE_X
        } else if self.normal[1] == 1.0 {
            PLANE_Y
        } else if self.normal[2] == 1.0 {
            PLANE_Z
        } else {
            PLANE_NON_AXIAL
        };
    }

    pub fn set_signbits(&mut self) {
        let mut bits = 0u8;
        for i in 0..3 {
            if self.normal[i] < 0.0 {
                bits |= 1 << i;
            }
        }
        self.signbits = bits;
    }

    #[inline]
    pub fn is_axial(&self) -> bool {
        self.plane_type < 3
    }

    /// Signed distance of `p` from the plane.
    #[inline]
    pub fn diff(&self, p: &Vec3) -> f32 {
        if self.is_axial() {
            p[self.plane_type as usize] - self.dist
        } else {
            dot_product(&self.normal, p) - self.dist
        }
    }
}

/// Returns SIDE_FRONT, SIDE_BACK or SIDE_CROSS for a box vs. plane test.
pub fn box_on_plane_side(emins: &Vec3, emaxs: &Vec3, p: &CPlane) -> i32 {
    // fast axial cases
    if p.is_axial() {
        let t = p.plane_type as usize;
        if p.dist <= emins[t] {
            return SIDE_FRONT;
        }
        if p.dist >= emaxs[t] {
            return SIDE_BACK;
        }
        return SIDE_CROSS;
    }

    // dist1 takes the corner furthest along the normal, dist2 the nearest
    let mut dist1 = 0.0f32;
    let mut dist2 = 0.0f32;
    for i in 0..3 {
        if p.signbits & (1 << i) != 0 {
            dist1 += p.normal[i] * emins[i];
            dist2 += p.normal[i] * emaxs[i];
        } else {
            dist1 += p.normal[i] * emaxs[i];
            dist2 += p.normal[i] * emins[i];
        }
    }

    let mut sides = 0;
    if dist1 >= p.dist {
        sides = SIDE_FRONT;
    }
    if dist2 < p.dist {
        sides |= SIDE_BACK;
    }
    sides
}

// ============================================================
// Surface
// ============================================================

pub const MAX_TEXNAME: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CSurface {
    pub name: [u8; MAX_TEXNAME],
    pub flags: SurfFlags,
    pub value: i32,
}

/// Surface reported by traces that hit nothing or a side with no texture.
pub const NULL_SURFACE: CSurface = CSurface {
    name: [0; MAX_TEXNAME],
    flags: SurfFlags::empty(),
    value: 0,
};

impl Default for CSurface {
    fn default() -> Self {
        NULL_SURFACE
    }
}

impl CSurface {
    /// Names longer than MAX_TEXNAME - 1 bytes are cut.
    pub fn new(name: &str, flags: SurfFlags, value: i32) -> Self {
        let mut buf = [0u8; MAX_TEXNAME];
        let mut len = name.len().min(MAX_TEXNAME - 1);
        while !name.is_char_boundary(len) {
            len -= 1;
        }
        buf[..len].copy_from_slice(&name.as_bytes()[..len]);
        Self {
            name: buf,
            flags,
            value,
        }
    }

    pub fn name(&self) -> &str {
        let len = self.name.iter().position(|&b| b == 0).unwrap_or(MAX_TEXNAME);
        std::str::from_utf8(&self.name[..len]).unwrap_or("")
    }

    pub fn is_null(&self) -> bool {
        *self == NULL_SURFACE
    }
}

// ============================================================
// Trace
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trace {
    /// the whole sweep was inside a solid brush
    pub allsolid: bool,
    /// the start point was inside a solid brush
    pub startsolid: bool,
    /// 1.0 = reached `end` without hitting anything
    pub fraction: f32,
    pub endpos: Vec3,
    /// only meaningful when fraction < 1.0
    pub plane: CPlane,
    pub surface: CSurface,
    pub contents: Contents,
    /// entity the trace was merged from, -1 for world/none
    pub ent_index: i32,
}

impl Default for Trace {
    fn default() -> Self {
        Self {
            allsolid: false,
            startsolid: false,
            fraction: 1.0,
            endpos: VEC3_ORIGIN,
            plane: CPlane::default(),
            surface: NULL_SURFACE,
            contents: Contents::empty(),
            ent_index: -1,
        }
    }
}

// ============================================================
// Tests
// ============================================================

// contents.rs — content and surface flag sets plus the standard trace masks

bitflags::bitflags! {
    /// What occupies a leaf or brush. Lower bits are visible contents,
    /// the rest are clip classes and entity classes.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Contents: u32 {
        const SOLID         = 1;
        const WINDOW        = 2;
        const AUX           = 4;
        const LAVA          = 8;
        const SLIME         = 16;
        const WATER         = 32;
        const MIST          = 64;

        const NO_WATERJUMP   = 1 << 13;
        const PROJECTILECLIP = 1 << 14;

        const AREAPORTAL    = 0x8000;
        const PLAYERCLIP    = 0x10000;
        const MONSTERCLIP   = 0x20000;

        const CURRENT_0     = 1 << 18;
        const CURRENT_90    = 1 << 19;
        const CURRENT_180   = 1 << 20;
        const CURRENT_270   = 1 << 21;
        const CURRENT_UP    = 1 << 22;
        const CURRENT_DOWN  = 1 << 23;

        const ORIGIN        = 1 << 24; // removed before bsping an entity
        const MONSTER       = 1 << 25; // should never be on a brush, only in game
        const DEADMONSTER   = 1 << 26;
        const DETAIL        = 1 << 27; // brushes to be added after vis leafs
        const TRANSLUCENT   = 1 << 28; // auto set if any surface has trans
        const LADDER        = 1 << 29;
        const PLAYER        = 1 << 30;
        const PROJECTILE    = 1 << 31;
    }
}

impl Contents {
    /// Converts a signed mask coming from game code. Negative masks match
    /// nothing, use `Contents::all()` to match everything.
    pub fn from_raw(raw: i32) -> Self {
        if raw < 0 {
            Self::empty()
        } else {
            Self::from_bits_retain(raw as u32)
        }
    }

    pub fn to_raw(self) -> i32 {
        self.bits() as i32
    }
}

// ============================================================
// Content masks
// ============================================================

pub const MASK_ALL: Contents = Contents::all();
pub const MASK_SOLID: Contents = Contents::SOLID.union(Contents::WINDOW);
pub const MASK_PLAYERSOLID: Contents = Contents::SOLID
    .union(Contents::PLAYERCLIP)
    .union(Contents::WINDOW)
    .union(Contents::MONSTER)
    .union(Contents::PLAYER);
pub const MASK_DEADSOLID: Contents = Contents::SOLID
    .union(Contents::PLAYERCLIP)
    .union(Contents::WINDOW);
pub const MASK_MONSTERSOLID: Contents = Contents::SOLID
    .union(Contents::MONSTERCLIP)
    .union(Contents::WINDOW)
    .union(Contents::MONSTER)
    .union(Contents::PLAYER);
pub const MASK_WATER: Contents = Contents::WATER
    .union(Contents::LAVA)
    .union(Contents::SLIME);
pub const MASK_OPAQUE: Contents = Contents::SOLID
    .union(Contents::SLIME)
    .union(Contents::LAVA);
pub const MASK_SHOT: Contents = Contents::SOLID
    .union(Contents::MONSTER)
    .union(Contents::PLAYER)
    .union(Contents::WINDOW)
    .union(Contents::DEADMONSTER);
pub const MASK_CURRENT: Contents = Contents::CURRENT_0
    .union(Contents::CURRENT_90)
    .union(Contents::CURRENT_180)
    .union(Contents::CURRENT_270)
    .union(Contents::CURRENT_UP)
    .union(Contents::CURRENT_DOWN);
pub const MASK_PROJECTILE: Contents = MASK_SHOT.union(Contents::PROJECTILECLIP);

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct SurfFlags: u32 {
        const LIGHT    = 0x1;  // value will hold the light strength
        const SLICK    = 0x2;  // effects game physics
        const SKY      = 0x4;  // don't draw, but add to skybox
        const WARP     = 0x8;  // turbulent water warp
        const TRANS33  = 0x10;
        const TRANS66  = 0x20;
        const FLOWING  = 0x40; // scroll towards angle
        const NODRAW   = 0x80; // don't bother referencing the texture
    }
}

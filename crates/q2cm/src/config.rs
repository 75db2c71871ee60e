// config.rs — runtime switches read from console variables

/// Behaviour switches for one collision model instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CmConfig {
    /// Treat every area as connected to every other.
    pub no_areas: bool,
    /// Leave `fraction` untouched when a sweep starts and ends inside the
    /// same brush, as the original game did.
    pub allsolid_bug: bool,
}

impl CmConfig {
    pub const NO_AREAS_CVAR: &'static str = "map_noareas";
    pub const ALLSOLID_BUG_CVAR: &'static str = "map_allsolid_bug";

    /// Build from a console variable lookup. Missing variables keep their
    /// defaults, any nonzero value switches the option on.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<f32>,
    {
        let defaults = Self::default();
        Self {
            no_areas: lookup(Self::NO_AREAS_CVAR)
                .map(|v| v != 0.0)
                .unwrap_or(defaults.no_areas),
            allsolid_bug: lookup(Self::ALLSOLID_BUG_CVAR)
                .map(|v| v != 0.0)
                .unwrap_or(defaults.allsolid_bug),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_off() {
        let c = CmConfig::from_lookup(|_| None);
        assert!(!c.no_areas);
        assert!(!c.allsolid_bug);
    }

    #[test]
    fn test_lookup_by_cvar_name() {
        let c = CmConfig::from_lookup(|name| match name {
            "map_noareas" => Some(1.0),
            "map_allsolid_bug" => Some(0.0),
            _ => None,
        });
        assert!(c.no_areas);
        assert!(!c.allsolid_bug);
    }
}

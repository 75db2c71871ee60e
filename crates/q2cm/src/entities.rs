// entities.rs — the map's entity dictionary
//
// Each pair keeps its raw string plus every typed value it parsed as, so
// game code can ask for an integer or a vector without reparsing.

use bitflags::bitflags;
use q2cm_shared::parse::{com_is_float, com_is_int, com_parse};

use crate::error::{CmError, CmResult};

pub const MAX_KEY: usize = 32;
pub const MAX_VALUE: usize = 1024;

bitflags! {
    /// Types a pair's value could be represented as.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EntityParsed: u32 {
        const STRING  = 1 << 0;
        const INTEGER = 1 << 1;
        const FLOAT   = 1 << 2;
        const VECTOR2 = 1 << 3;
        const VECTOR3 = 1 << 4;
        const VECTOR4 = 1 << 5;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityPair {
    pub key: String,
    pub string: String,
    pub parsed: EntityParsed,
    pub integer: i32,
    pub value: f32,
    pub vec2: [f32; 2],
    pub vec3: [f32; 3],
    pub vec4: [f32; 4],
}

/// Returned for every missing key; always valid.
pub static NULL_ENTITY_PAIR: EntityPair = EntityPair {
    key: String::new(),
    string: String::new(),
    parsed: EntityParsed::empty(),
    integer: 0,
    value: 0.0,
    vec2: [0.0; 2],
    vec3: [0.0; 3],
    vec4: [0.0; 4],
};

/// Longest prefix of `s` under `max` bytes that ends on a char boundary.
fn truncated(s: &str, max: usize) -> String {
    if s.len() < max {
        return s.to_string();
    }
    let mut end = max - 1;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

impl EntityPair {
    pub fn new(key: &str, value: &str) -> Self {
        let mut pair = Self {
            key: truncated(key, MAX_KEY),
            string: truncated(value, MAX_VALUE),
            ..NULL_ENTITY_PAIR.clone()
        };

        if !pair.string.is_empty() {
            pair.parsed |= EntityParsed::STRING;
        }
        if com_is_int(&pair.string) {
            if let Ok(i) = pair.string.parse::<i32>() {
                pair.integer = i;
                pair.parsed |= EntityParsed::INTEGER;
            }
        }
        if com_is_float(&pair.string) {
            if let Ok(f) = pair.string.parse::<f32>() {
                pair.value = f;
                pair.parsed |= EntityParsed::FLOAT;
            }
        }

        let mut v = [0.0f32; 4];
        let mut n = 0;
        for tok in pair.string.split_whitespace().take(4) {
            match tok.parse::<f32>() {
                Ok(f) => {
                    v[n] = f;
                    n += 1;
                }
                Err(_) => break,
            }
        }
        if n >= 2 {
            pair.vec2 = [v[0], v[1]];
            pair.vec3 = [v[0], v[1], 0.0];
            pair.vec4 = [v[0], v[1], 0.0, 0.0];
            pair.parsed |= EntityParsed::VECTOR2;
        }
        if n >= 3 {
            pair.vec3[2] = v[2];
            pair.vec4[2] = v[2];
            pair.parsed |= EntityParsed::VECTOR3;
        }
        if n == 4 {
            pair.vec4[3] = v[3];
            pair.parsed |= EntityParsed::VECTOR4;
        }

        pair
    }

    /// The value, or None when it is empty.
    pub fn nullable_string(&self) -> Option<&str> {
        self.parsed
            .contains(EntityParsed::STRING)
            .then_some(self.string.as_str())
    }

    pub fn is_null(&self) -> bool {
        std::ptr::eq(self, &NULL_ENTITY_PAIR)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Entity {
    /// in source order
    pairs: Vec<EntityPair>,
}

impl Entity {
    pub fn pairs(&self) -> &[EntityPair] {
        &self.pairs
    }

    /// Case insensitive lookup; a key defined twice resolves to the last.
    pub fn get(&self, key: &str) -> Option<&EntityPair> {
        self.pairs
            .iter()
            .rev()
            .find(|p| p.key.eq_ignore_ascii_case(key))
    }

    pub fn key_value(&self, key: &str) -> &EntityPair {
        self.get(key).unwrap_or(&NULL_ENTITY_PAIR)
    }

    pub fn classname(&self) -> Option<&str> {
        self.get("classname").map(|p| p.string.as_str())
    }
}

/// Splits an entity string into its `{ "key" "value" ... }` blocks.
pub fn parse_entity_string(mut data: &str) -> CmResult<Vec<Entity>> {
    let mut entities = Vec::new();

    // parse ents
    while let Some((token, rest)) = com_parse(data) {
        if token != "{" {
            return Err(CmError::EntityString(format!(
                "found {token} when expecting {{"
            )));
        }
        data = rest;

        let mut entity = Entity::default();
        loop {
            // parse key
            let Some((key, rest)) = com_parse(data) else {
                return Err(CmError::EntityString("EOF without closing brace".into()));
            };
            data = rest;
            if key == "}" {
                break;
            }

            // parse value
            let Some((value, rest)) = com_parse(data) else {
                return Err(CmError::EntityString("EOF without closing brace".into()));
            };
            data = rest;
            if value == "}" {
                return Err(CmError::EntityString("closing brace without data".into()));
            }

            entity.pairs.push(EntityPair::new(key, value));
        }
        entities.push(entity);
    }

    Ok(entities)
}

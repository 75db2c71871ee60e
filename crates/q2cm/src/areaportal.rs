// areaportal.rs — area connectivity through togglable portals
//
// Every state change refloods the whole graph. Areas number in the tens,
// so a full recount is cheaper than tracking what a portal toggle touched.

use crate::cmodel::CollisionModel;
use crate::map::MAX_MAP_PORTAL_BYTES;

impl CollisionModel {
    /// Recolours every area reachable through open portals with a shared
    /// flood number. Area 0 (outside the map) is never flooded.
    pub(crate) fn flood_area_connections(&mut self) {
        let Some(map) = self.cache.as_deref() else {
            return;
        };

        self.floodnums.clear();
        self.floodnums.resize(map.areas.len(), 0);

        let mut floodnum = 0;
        let mut stack = Vec::new();
        for first in 1..map.areas.len() {
            if self.floodnums[first] != 0 {
                continue;
            }
            floodnum += 1;
            self.floodnums[first] = floodnum;
            stack.push(first);

            while let Some(area) = stack.pop() {
                let a = &map.areas[area];
                for portal in &map.area_portals[a.first_portal..a.first_portal + a.num_portals] {
                    if !self.portal_open[portal.portal_num] {
                        continue;
                    }
                    let other = portal.other_area;
                    if self.floodnums[other] == 0 {
                        self.floodnums[other] = floodnum;
                        stack.push(other);
                    }
                }
            }
        }
    }

    pub fn set_area_portal_state(&mut self, portal: i32, open: bool) {
        if portal < 0 || portal as usize >= self.portal_open.len() {
            tracing::debug!(portal, "set_area_portal_state: bad portal number");
            return;
        }
        self.portal_open[portal as usize] = open;
        self.flood_area_connections();
    }

    pub fn get_area_portal_state(&self, portal: i32) -> bool {
        if portal < 0 || portal as usize >= self.portal_open.len() {
            tracing::debug!(portal, "get_area_portal_state: bad portal number");
            return false;
        }
        self.portal_open[portal as usize]
    }

    pub fn areas_connected(&self, area1: i32, area2: i32) -> bool {
        if self.cache.is_none() {
            return false;
        }
        if self.config.no_areas {
            return true;
        }
        if area1 < 1 || area2 < 1 {
            return false;
        }

        let count = self.floodnums.len();
        if area1 as usize >= count || area2 as usize >= count {
            tracing::warn!(area1, area2, "areas_connected: area out of range");
            return false;
        }
        self.floodnums[area1 as usize] == self.floodnums[area2 as usize]
    }

    /// One bit per area, set for every area connected to `area`. Area 0
    /// and `no_areas` mark everything visible.
    pub fn write_area_bits(&self, area: i32) -> Vec<u8> {
        if self.cache.is_none() {
            return Vec::new();
        }

        let count = self.floodnums.len();
        let bytes = (count + 7) >> 3;

        if self.config.no_areas || area == 0 {
            // for debugging, send everything
            return vec![0xff; bytes];
        }
        if area < 0 || area as usize >= count {
            tracing::warn!(area, "write_area_bits: area out of range");
            return vec![0xff; bytes];
        }

        let mut buffer = vec![0u8; bytes];
        let floodnum = self.floodnums[area as usize];
        for (i, &f) in self.floodnums.iter().enumerate() {
            if f == floodnum {
                buffer[i >> 3] |= 1 << (i & 7);
            }
        }
        buffer
    }

    /// Area bits prefixed with their length, as sent to clients.
    pub fn area_bits_message(&self, area: i32) -> Vec<u8> {
        let bits = self.write_area_bits(area);
        if bits.is_empty() {
            return vec![1, 0xff];
        }
        let mut msg = Vec::with_capacity(bits.len() + 1);
        msg.push(bits.len() as u8);
        msg.extend_from_slice(&bits);
        msg
    }

    /// Packed open/closed state of every portal, for savegames.
    pub fn write_portal_bits(&self) -> Vec<u8> {
        let count = self.portal_open.len().min(MAX_MAP_PORTAL_BYTES * 8);
        let mut buffer = vec![0u8; (count + 7) >> 3];
        for (i, &open) in self.portal_open[..count].iter().enumerate() {
            if open {
                buffer[i >> 3] |= 1 << (i & 7);
            }
        }
        buffer
    }

    /// Restores portal state saved by `write_portal_bits`. Portals the
    /// buffer does not cover are opened; an empty buffer opens all.
    pub fn set_portal_bits(&mut self, bytes: &[u8]) {
        let covered = self.portal_open.len().min(bytes.len() * 8);
        for (i, open) in self.portal_open.iter_mut().enumerate() {
            *open = i >= covered || bytes[i >> 3] & (1 << (i & 7)) != 0;
        }
        self.flood_area_connections();
    }
}

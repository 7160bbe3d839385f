//! Node state tables (spec §3): the beacon registry, range table, position
//! table, and current fix. Mutated only by the ingestion task per the
//! single-writer rule of spec §5; read freely elsewhere.

use std::collections::HashMap;

use serde::Deserialize;

/// A node's role within the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Active,
    Passive,
}

/// A geodetic position: latitude/longitude in degrees, depth in meters
/// (negative, below sea level).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
    pub depth: f64,
}

/// A registry entry. Passive entries are normally fully populated at
/// startup; active entries start unset and are never written here (the
/// solver's output lives in [`Fix`], not the registry).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeaconEntry {
    pub role: Role,
    pub position: Option<Position>,
}

/// The static mapping from node address to `{role, lat, lon, depth}`.
#[derive(Debug, Clone, Default)]
pub struct BeaconRegistry {
    entries: HashMap<u16, BeaconEntry>,
}

impl BeaconRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, addr: u16, entry: BeaconEntry) {
        self.entries.insert(addr, entry);
    }

    pub fn get(&self, addr: u16) -> Option<&BeaconEntry> {
        self.entries.get(&addr)
    }

    pub fn contains(&self, addr: u16) -> bool {
        self.entries.contains_key(&addr)
    }

    pub fn passive_addresses(&self) -> Vec<u16> {
        let mut v: Vec<u16> = self
            .entries
            .iter()
            .filter(|(_, e)| e.role == Role::Passive)
            .map(|(&addr, _)| addr)
            .collect();
        v.sort_unstable();
        v
    }

    pub fn active_addresses(&self) -> Vec<u16> {
        let mut v: Vec<u16> = self
            .entries
            .iter()
            .filter(|(_, e)| e.role == Role::Active)
            .map(|(&addr, _)| addr)
            .collect();
        v.sort_unstable();
        v
    }
}

/// Most recent measured slant range per passive beacon (spec §3). Entries
/// are overwritten in place and never expire.
#[derive(Debug, Clone, Default)]
pub struct RangeTable {
    ranges: HashMap<u16, f64>,
}

impl RangeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, addr: u16, range_m: f64) {
        self.ranges.insert(addr, range_m);
    }

    pub fn get(&self, addr: u16) -> Option<f64> {
        self.ranges.get(&addr).copied()
    }

    pub fn known_count(&self) -> usize {
        self.ranges.len()
    }

    pub fn snapshot(&self) -> HashMap<u16, f64> {
        self.ranges.clone()
    }
}

/// Last-known position per passive beacon (spec §3). For stationary
/// beacons this equals the configured value; a broadcast overwrites it.
#[derive(Debug, Clone, Default)]
pub struct PositionTable {
    positions: HashMap<u16, Position>,
}

impl PositionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, addr: u16, position: Position) {
        self.positions.insert(addr, position);
    }

    pub fn get(&self, addr: u16) -> Option<Position> {
        self.positions.get(&addr).copied()
    }

    pub fn snapshot(&self) -> HashMap<u16, Position> {
        self.positions.clone()
    }
}

/// The node's current best position estimate, or unset until the first
/// successful solve.
pub type Fix = Position;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_role_partitioning() {
        let mut reg = BeaconRegistry::new();
        reg.insert(
            17,
            BeaconEntry {
                role: Role::Passive,
                position: Some(Position {
                    lat: 1.0,
                    lon: 2.0,
                    depth: -5.0,
                }),
            },
        );
        reg.insert(
            42,
            BeaconEntry {
                role: Role::Active,
                position: None,
            },
        );
        assert_eq!(reg.passive_addresses(), vec![17]);
        assert_eq!(reg.active_addresses(), vec![42]);
        assert!(reg.contains(17));
        assert!(!reg.contains(99));
    }

    #[test]
    fn test_range_table_overwrite_in_place() {
        let mut table = RangeTable::new();
        table.update(17, 100.0);
        assert_eq!(table.get(17), Some(100.0));
        table.update(17, 150.0);
        assert_eq!(table.get(17), Some(150.0));
        assert_eq!(table.known_count(), 1);
    }

    #[test]
    fn test_range_table_stale_preferred_to_missing() {
        let mut table = RangeTable::new();
        table.update(17, 100.0);
        // no further update arrives; the stale value stays visible.
        assert_eq!(table.get(17), Some(100.0));
        assert_eq!(table.get(99), None);
    }

    #[test]
    fn test_position_table_roundtrip() {
        let mut table = PositionTable::new();
        let pos = Position {
            lat: 12.3,
            lon: -76.5,
            depth: -5.0,
        };
        table.update(17, pos);
        assert_eq!(table.get(17), Some(pos));
    }
}

//! Configuration surface (component C6, ambient stack — SPEC_FULL §12).
//!
//! Mirrors `mayara`'s `serde`-derived config structs and on-disk
//! `serde_json` loading. Configuration is external to the core per spec §1;
//! this module only defines the shape the node runtime consumes and the
//! startup-fatal validation spec §7 requires.

use std::collections::HashMap;
use std::io::Read;

use serde::Deserialize;

use crate::error::{BeaconError, Result};
use crate::solver::Coords;
use crate::tables::{BeaconEntry, BeaconRegistry, Position, PositionTable, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordsMode {
    Local,
    Latlon,
}

/// Numeric constants held immutable for the node's lifetime (spec §3).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub coords: CoordsMode,
    pub lat0: Option<f64>,
    pub lon0: Option<f64>,
    pub sound_speed: f64,
    pub range_rate: f64,
    pub repeat_rate: f64,
    pub broadcast_rate: f64,
    pub reply_timeout: f64,
    pub randomize: f64,
}

impl Settings {
    /// Build the solver's projection mode, validating the
    /// `coords == latlon ⇒ lat0/lon0 present` invariant (spec §7).
    pub fn coords(&self) -> Result<Coords> {
        match self.coords {
            CoordsMode::Local => Ok(Coords::Local),
            CoordsMode::Latlon => match (self.lat0, self.lon0) {
                (Some(lat0), Some(lon0)) => Ok(Coords::LatLon { lat0, lon0 }),
                _ => Err(BeaconError::ConfigInvalid(
                    "coords=latlon requires lat0 and lon0".to_string(),
                )),
            },
        }
    }
}

/// One entry of the `modems` table (spec §6).
#[derive(Debug, Clone, Deserialize)]
pub struct ModemEntry {
    pub mode: Role,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    #[serde(default)]
    pub serial_gps: Option<String>,
    #[serde(default)]
    pub serial_pressure: Option<String>,
}

/// The top-level declarative record read at startup (spec §6).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub settings: Settings,
    pub modems: HashMap<String, ModemEntry>,
}

impl Config {
    /// Parse a config record from JSON (the format the teacher pack uses
    /// for structured on-disk config).
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        serde_json::from_reader(reader)
            .map_err(|e| BeaconError::ConfigInvalid(format!("invalid config: {e}")))
    }

    /// Addresses parsed to `u16`, in ascending order, paired with their entry.
    pub fn addresses(&self) -> Result<Vec<(u16, &ModemEntry)>> {
        let mut out = Vec::with_capacity(self.modems.len());
        for (addr_str, entry) in &self.modems {
            let addr: u16 = addr_str.parse().map_err(|_| {
                BeaconError::ConfigInvalid(format!("modem address '{addr_str}' is not numeric"))
            })?;
            out.push((addr, entry));
        }
        out.sort_by_key(|(addr, _)| *addr);
        Ok(out)
    }

    /// Startup-fatal validation (spec §7): coords/origin consistency and
    /// that passive entries carry a usable position for the chosen mode.
    pub fn validate(&self) -> Result<()> {
        let coords = self.settings.coords()?;
        for (addr, entry) in self.addresses()? {
            if entry.mode == Role::Passive {
                match coords {
                    Coords::Local => {
                        if entry.x.is_none() || entry.y.is_none() {
                            return Err(BeaconError::ConfigInvalid(format!(
                                "passive modem {addr} missing x/y in local coords mode"
                            )));
                        }
                    }
                    Coords::LatLon { .. } => {
                        if entry.lat.is_none() || entry.lon.is_none() {
                            return Err(BeaconError::ConfigInvalid(format!(
                                "passive modem {addr} missing lat/lon in latlon coords mode"
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// The configured entry for `addr`, if any — used to find a node's own
    /// `serial_gps`/`serial_pressure` device paths at startup.
    pub fn modem(&self, addr: u16) -> Result<Option<&ModemEntry>> {
        Ok(self
            .addresses()?
            .into_iter()
            .find(|(a, _)| *a == addr)
            .map(|(_, entry)| entry))
    }

    /// Confirm `target` names a known modem (used when validating an
    /// operator-supplied ping/unicast target, e.g. `beacon timer <period> <target>`).
    pub fn validate_target(&self, target: u16) -> Result<()> {
        let known = self
            .addresses()?
            .into_iter()
            .any(|(addr, _)| addr == target);
        if known {
            Ok(())
        } else {
            Err(BeaconError::UnknownAddress(target))
        }
    }

    /// Build the beacon registry and position table from the configured
    /// modems, projecting `(x, y)` to `(lat, lon)` for passive entries
    /// configured in local coordinates (spec §3).
    pub fn build_tables(&self) -> Result<(BeaconRegistry, PositionTable)> {
        let coords = self.settings.coords()?;
        let projection = crate::solver::Projection::new(coords);

        let mut registry = BeaconRegistry::new();
        let mut positions = PositionTable::new();

        for (addr, entry) in self.addresses()? {
            let position = if entry.mode == Role::Passive {
                let (lat, lon) = match coords {
                    Coords::Local => {
                        let x = entry.x.ok_or_else(|| {
                            BeaconError::ConfigInvalid(format!("modem {addr} missing x"))
                        })?;
                        let y = entry.y.ok_or_else(|| {
                            BeaconError::ConfigInvalid(format!("modem {addr} missing y"))
                        })?;
                        projection.to_geodetic(x, y)
                    }
                    Coords::LatLon { .. } => {
                        let lat = entry.lat.ok_or_else(|| {
                            BeaconError::ConfigInvalid(format!("modem {addr} missing lat"))
                        })?;
                        let lon = entry.lon.ok_or_else(|| {
                            BeaconError::ConfigInvalid(format!("modem {addr} missing lon"))
                        })?;
                        (lat, lon)
                    }
                };
                let depth = entry.z.unwrap_or(0.0);
                let pos = Position { lat, lon, depth };
                positions.update(addr, pos);
                Some(pos)
            } else {
                None
            };

            registry.insert(
                addr,
                BeaconEntry {
                    role: entry.mode,
                    position,
                },
            );
        }

        Ok((registry, positions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "settings": {
                "coords": "local",
                "lat0": null,
                "lon0": null,
                "sound_speed": 1500.0,
                "range_rate": 2.0,
                "repeat_rate": 0.1,
                "broadcast_rate": 5.0,
                "reply_timeout": 1.0,
                "randomize": 0.5
            },
            "modems": {
                "1": {"mode": "passive", "x": 0.0, "y": 0.0, "z": -5.0},
                "2": {"mode": "passive", "x": 100.0, "y": 0.0, "z": -5.0},
                "42": {"mode": "active"}
            }
        }"#
    }

    #[test]
    fn test_parse_and_validate_local_config() {
        let config = Config::from_reader(sample_json().as_bytes()).unwrap();
        config.validate().unwrap();
        let addrs = config.addresses().unwrap();
        assert_eq!(addrs.len(), 3);
        assert_eq!(addrs[0].0, 1);
    }

    #[test]
    fn test_build_tables_projects_local_positions() {
        let config = Config::from_reader(sample_json().as_bytes()).unwrap();
        let (registry, positions) = config.build_tables().unwrap();
        assert!(registry.contains(1));
        assert!(registry.contains(42));
        assert_eq!(registry.passive_addresses(), vec![1, 2]);
        assert_eq!(registry.active_addresses(), vec![42]);
        let pos = positions.get(1).unwrap();
        assert!((pos.lat - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_latlon_requires_origin() {
        let json = r#"{
            "settings": {
                "coords": "latlon",
                "lat0": null,
                "lon0": null,
                "sound_speed": 1500.0,
                "range_rate": 2.0,
                "repeat_rate": 0.1,
                "broadcast_rate": 5.0,
                "reply_timeout": 1.0,
                "randomize": 0.5
            },
            "modems": {}
        }"#;
        let config = Config::from_reader(json.as_bytes()).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_target_rejects_unknown_address() {
        let config = Config::from_reader(sample_json().as_bytes()).unwrap();
        assert!(config.validate_target(1).is_ok());
        assert!(config.validate_target(999).is_err());
    }

    #[test]
    fn test_modem_lookup_by_address() {
        let config = Config::from_reader(sample_json().as_bytes()).unwrap();
        assert!(config.modem(42).unwrap().is_some());
        assert!(config.modem(999).unwrap().is_none());
    }
}

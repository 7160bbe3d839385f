//! Multilateration solver (component C4, spec §4.4).
//!
//! Converts geodetic `{lat, lon}` through an azimuthal-equidistant
//! projection into a local metric frame, solves a bounded nonlinear
//! least-squares problem for the node's position, and projects the result
//! back. The projection is implemented directly (spherical WGS84-mean-radius
//! approximation) since no geodesy crate is in the dependency stack; the
//! optimizer is a projected Levenberg-Marquardt iteration built on
//! `nalgebra`'s vector/matrix arithmetic (SPEC_FULL §20).

use std::collections::HashMap;

use nalgebra::{Matrix3, Vector3};

use crate::tables::Position;

/// Mean radius of the WGS84 ellipsoid, used for the spherical
/// azimuthal-equidistant approximation.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

const MAX_ITERATIONS: usize = 50;
const COST_TOLERANCE: f64 = 1e-4;
const DEPTH_MIN: f64 = -100.0;
const DEPTH_MAX: f64 = 0.0;

/// How passive-beacon positions (and this solver's local frame) relate to
/// geodetic coordinates (spec §4.4).
#[derive(Debug, Clone, Copy)]
pub enum Coords {
    /// Beacon positions are specified directly in local meters; the
    /// projection is centered at lat=0, lon=0.
    Local,
    /// Beacon positions are specified in lat/lon; the projection is
    /// centered at the configured origin.
    LatLon { lat0: f64, lon0: f64 },
}

/// An azimuthal-equidistant projection centered at a fixed origin.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    lat0_rad: f64,
    lon0_rad: f64,
}

impl Projection {
    pub fn new(coords: Coords) -> Self {
        let (lat0, lon0) = match coords {
            Coords::Local => (0.0, 0.0),
            Coords::LatLon { lat0, lon0 } => (lat0, lon0),
        };
        Self {
            lat0_rad: lat0.to_radians(),
            lon0_rad: lon0.to_radians(),
        }
    }

    /// Project a geodetic point to local meters `(x, y)`.
    pub fn to_local(&self, lat: f64, lon: f64) -> (f64, f64) {
        let phi = lat.to_radians();
        let lambda = lon.to_radians();
        let dlambda = lambda - self.lon0_rad;

        let cos_c = self.lat0_rad.sin() * phi.sin()
            + self.lat0_rad.cos() * phi.cos() * dlambda.cos();
        let c = cos_c.clamp(-1.0, 1.0).acos();

        if c.abs() < 1e-12 {
            return (0.0, 0.0);
        }

        let k = c / c.sin();
        let x = EARTH_RADIUS_M * k * phi.cos() * dlambda.sin();
        let y = EARTH_RADIUS_M
            * k
            * (self.lat0_rad.cos() * phi.sin() - self.lat0_rad.sin() * phi.cos() * dlambda.cos());
        (x, y)
    }

    /// Invert the projection: local meters `(x, y)` back to geodetic `(lat, lon)`.
    pub fn to_geodetic(&self, x: f64, y: f64) -> (f64, f64) {
        let rho = (x * x + y * y).sqrt();
        if rho < 1e-9 {
            return (self.lat0_rad.to_degrees(), self.lon0_rad.to_degrees());
        }

        let c = rho / EARTH_RADIUS_M;
        let (sin_c, cos_c) = c.sin_cos();

        let phi = (cos_c * self.lat0_rad.sin() + (y * sin_c * self.lat0_rad.cos()) / rho)
            .clamp(-1.0, 1.0)
            .asin();
        let lambda = self.lon0_rad
            + (x * sin_c)
                .atan2(rho * self.lat0_rad.cos() * cos_c - y * self.lat0_rad.sin() * sin_c);

        (phi.to_degrees(), lambda.to_degrees())
    }
}

/// True-range multilateration solver (spec §4.4).
pub struct Solver {
    projection: Projection,
}

impl Solver {
    pub fn new(coords: Coords) -> Self {
        Self {
            projection: Projection::new(coords),
        }
    }

    pub fn to_local(&self, lat: f64, lon: f64) -> (f64, f64) {
        self.projection.to_local(lat, lon)
    }

    pub fn to_geodetic(&self, x: f64, y: f64) -> (f64, f64) {
        self.projection.to_geodetic(x, y)
    }

    /// Estimate a position given passive-beacon positions and measured
    /// ranges. Addresses present in `ranges` but absent from `positions` (or
    /// vice versa) are dropped. `initial_guess`, if given, seeds the
    /// optimizer; otherwise the centroid of the retained beacons (with
    /// z = -10) is used.
    pub fn solve(
        &self,
        positions: &HashMap<u16, Position>,
        ranges: &HashMap<u16, f64>,
        initial_guess: Option<Position>,
    ) -> Position {
        let mut local_points = Vec::new();
        let mut dists = Vec::new();

        for (addr, range_m) in ranges {
            let Some(pos) = positions.get(addr) else {
                continue;
            };
            let (x, y) = self.projection.to_local(pos.lat, pos.lon);
            local_points.push(Vector3::new(x, y, pos.depth));
            dists.push(*range_m);
        }

        if local_points.is_empty() {
            return initial_guess.unwrap_or(Position {
                lat: 0.0,
                lon: 0.0,
                depth: -10.0,
            });
        }

        let x0 = match initial_guess {
            Some(pos) => {
                let (x, y) = self.projection.to_local(pos.lat, pos.lon);
                Vector3::new(x, y, pos.depth)
            }
            None => {
                let n = local_points.len() as f64;
                let sum = local_points
                    .iter()
                    .fold(Vector3::zeros(), |acc, p| acc + p);
                let centroid = sum / n;
                Vector3::new(centroid.x, centroid.y, -10.0)
            }
        };

        let x_star = levenberg_marquardt(x0, &local_points, &dists);
        let (lat, lon) = self.projection.to_geodetic(x_star.x, x_star.y);
        Position {
            lat,
            lon,
            depth: x_star.z,
        }
    }
}

fn residuals(x: &Vector3<f64>, points: &[Vector3<f64>], dists: &[f64]) -> Vec<f64> {
    points
        .iter()
        .zip(dists)
        .map(|(p, d)| (x - p).norm() - d)
        .collect()
}

fn rms(r: &[f64]) -> f64 {
    if r.is_empty() {
        return 0.0;
    }
    (r.iter().map(|v| v * v).sum::<f64>() / r.len() as f64).sqrt()
}

fn clamp_depth(mut x: Vector3<f64>) -> Vector3<f64> {
    x.z = x.z.clamp(DEPTH_MIN, DEPTH_MAX);
    x
}

/// Bounded projected Levenberg-Marquardt: standard LM normal-equations
/// step, each candidate clamped to the depth bound before acceptance
/// (spec §4.4, SPEC_FULL §20).
fn levenberg_marquardt(x0: Vector3<f64>, points: &[Vector3<f64>], dists: &[f64]) -> Vector3<f64> {
    let mut x = clamp_depth(x0);
    let initial_cost = rms(&residuals(&x, points, dists));
    let mut cost = initial_cost;
    let mut lambda = 1e-3;

    for _ in 0..MAX_ITERATIONS {
        let r = residuals(&x, points, dists);
        let mut jtj = Matrix3::zeros();
        let mut jtr = Vector3::zeros();
        for (p, ri) in points.iter().zip(r.iter()) {
            let d = x - p;
            let n = d.norm();
            let j = if n > 1e-9 { d / n } else { Vector3::zeros() };
            jtj += j * j.transpose();
            jtr += j * *ri;
        }

        let mut improved = false;
        let mut delta_cost = 0.0;

        for _ in 0..10 {
            let damped = jtj + Matrix3::from_diagonal(&jtj.diagonal()) * lambda;
            if let Some(inv) = damped.try_inverse() {
                let step = -(inv * jtr);
                let candidate = clamp_depth(x + step);
                let new_cost = rms(&residuals(&candidate, points, dists));
                if new_cost < cost {
                    delta_cost = (cost - new_cost).abs();
                    x = candidate;
                    cost = new_cost;
                    lambda *= 0.5;
                    improved = true;
                    break;
                }
            }
            lambda *= 2.0;
        }

        if !improved {
            break;
        }
        if delta_cost < COST_TOLERANCE {
            break;
        }
    }

    if cost > initial_cost {
        clamp_depth(x0)
    } else {
        x
    }
}

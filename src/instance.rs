//! Problem instances, radius configurations and their JSON loaders.
//!
//! Instance files are plain JSON objects with numeric arrays. Shapes are
//! checked when an instance is constructed, so a malformed file is rejected
//! before any model is built.

use std::fs;
use std::path::Path;

use nalgebra::DMatrix;
use serde::Deserialize;

use crate::error::{LocateError, LocateResult};

/// Double-standard instance: demand weights, distances and site capacities.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    demand: Vec<f64>,
    distances: DMatrix<f64>,
    locations: Vec<u32>,
}

impl Instance {
    /// Build an instance, validating that `distances` is `demand × locations`.
    pub fn new(demand: Vec<f64>, distances: DMatrix<f64>, locations: Vec<u32>) -> LocateResult<Self> {
        if distances.nrows() != demand.len() {
            return Err(LocateError::MalformedInstance(format!(
                "distances has {} rows but demand has {} entries",
                distances.nrows(),
                demand.len()
            )));
        }
        if distances.ncols() != locations.len() {
            return Err(LocateError::MalformedInstance(format!(
                "distances has {} columns but locations has {} entries",
                distances.ncols(),
                locations.len()
            )));
        }
        if let Some(i) = demand.iter().position(|&d| !d.is_finite() || d < 0.0) {
            return Err(LocateError::MalformedInstance(format!(
                "demand[{}] = {} is not a non-negative number",
                i, demand[i]
            )));
        }
        check_distances(&distances)?;

        Ok(Self {
            demand,
            distances,
            locations,
        })
    }

    /// Load from a JSON object with `demand`, `distances` and `locations` fields.
    pub fn from_json_file(path: impl AsRef<Path>) -> LocateResult<Self> {
        let raw: RawInstance = read_json(path)?;
        Self::from_raw(raw)
    }

    pub fn from_json_str(json: &str) -> LocateResult<Self> {
        Self::from_raw(serde_json::from_str(json)?)
    }

    fn from_raw(raw: RawInstance) -> LocateResult<Self> {
        let distances = matrix_from_rows(&raw.distances)?;
        let locations = raw
            .locations
            .iter()
            .enumerate()
            .map(|(j, &cap)| capacity_from_f64(j, cap))
            .collect::<LocateResult<Vec<u32>>>()?;
        Self::new(raw.demand, distances, locations)
    }

    pub fn demand(&self) -> &[f64] {
        &self.demand
    }

    pub fn distances(&self) -> &DMatrix<f64> {
        &self.distances
    }

    pub fn locations(&self) -> &[u32] {
        &self.locations
    }

    pub fn n_demand(&self) -> usize {
        self.demand.len()
    }

    pub fn n_sites(&self) -> usize {
        self.locations.len()
    }

    pub fn total_demand(&self) -> f64 {
        self.demand.iter().sum()
    }

    /// Total facility units the sites can hold.
    pub fn total_capacity(&self) -> u64 {
        self.locations.iter().map(|&c| c as u64).sum()
    }
}

/// Single-Model-One instance: per-site weights and customer-to-site distances.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOneInstance {
    lambda_coeff: Vec<f64>,
    distances: DMatrix<f64>,
}

impl ModelOneInstance {
    pub fn new(lambda_coeff: Vec<f64>, distances: DMatrix<f64>) -> LocateResult<Self> {
        if distances.ncols() != lambda_coeff.len() {
            return Err(LocateError::MalformedInstance(format!(
                "distances has {} columns but lambda_coeff has {} entries",
                distances.ncols(),
                lambda_coeff.len()
            )));
        }
        if let Some(j) = lambda_coeff.iter().position(|l| !l.is_finite()) {
            return Err(LocateError::MalformedInstance(format!(
                "lambda_coeff[{}] is not finite",
                j
            )));
        }
        check_distances(&distances)?;

        Ok(Self {
            lambda_coeff,
            distances,
        })
    }

    /// Load from a JSON object with `lambda_coeff` and `distances` fields.
    pub fn from_json_file(path: impl AsRef<Path>) -> LocateResult<Self> {
        let raw: RawModelOneInstance = read_json(path)?;
        Self::new(raw.lambda_coeff, matrix_from_rows(&raw.distances)?)
    }

    pub fn from_json_str(json: &str) -> LocateResult<Self> {
        let raw: RawModelOneInstance = serde_json::from_str(json)?;
        Self::new(raw.lambda_coeff, matrix_from_rows(&raw.distances)?)
    }

    pub fn lambda_coeff(&self) -> &[f64] {
        &self.lambda_coeff
    }

    pub fn distances(&self) -> &DMatrix<f64> {
        &self.distances
    }

    pub fn n_customers(&self) -> usize {
        self.distances.nrows()
    }

    pub fn n_sites(&self) -> usize {
        self.lambda_coeff.len()
    }
}

/// Load a bare `{"distances": [[...]]}` file, as used by the coupling model.
pub fn load_distances(path: impl AsRef<Path>) -> LocateResult<DMatrix<f64>> {
    let raw: RawDistances = read_json(path)?;
    let distances = matrix_from_rows(&raw.distances)?;
    check_distances(&distances)?;
    Ok(distances)
}

/// The two double-standard coverage radii.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelConfig {
    radius_small: f64,
    radius_large: f64,
}

impl ModelConfig {
    pub fn new(radius_small: f64, radius_large: f64) -> LocateResult<Self> {
        if !(radius_small.is_finite() && radius_large.is_finite()) {
            return Err(LocateError::InvalidParameter(format!(
                "radii must be finite, got ({}, {})",
                radius_small, radius_large
            )));
        }
        if radius_small < 0.0 || radius_small > radius_large {
            return Err(LocateError::InvalidParameter(format!(
                "expected 0 <= radius_small <= radius_large, got ({}, {})",
                radius_small, radius_large
            )));
        }
        Ok(Self {
            radius_small,
            radius_large,
        })
    }

    pub fn radius_small(&self) -> f64 {
        self.radius_small
    }

    pub fn radius_large(&self) -> f64 {
        self.radius_large
    }

    /// Key under which this configuration's results are logged.
    pub fn key(&self) -> (f64, f64) {
        (self.radius_small, self.radius_large)
    }
}

/// Load a JSON list of `[radius_small, radius_large]` pairs.
pub fn load_radius_pairs(path: impl AsRef<Path>) -> LocateResult<Vec<ModelConfig>> {
    let pairs: Vec<(f64, f64)> = read_json(path)?;
    pairs
        .into_iter()
        .map(|(small, large)| ModelConfig::new(small, large))
        .collect()
}

/// Load a JSON list of single radii.
pub fn load_radii(path: impl AsRef<Path>) -> LocateResult<Vec<f64>> {
    let radii: Vec<f64> = read_json(path)?;
    if let Some(r) = radii.iter().find(|r| !r.is_finite() || **r < 0.0) {
        return Err(LocateError::InvalidParameter(format!(
            "radius {} is not a non-negative number",
            r
        )));
    }
    Ok(radii)
}

#[derive(Debug, Deserialize)]
struct RawInstance {
    demand: Vec<f64>,
    distances: Vec<Vec<f64>>,
    locations: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct RawModelOneInstance {
    lambda_coeff: Vec<f64>,
    distances: Vec<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct RawDistances {
    distances: Vec<Vec<f64>>,
}

fn read_json<T: serde::de::DeserializeOwned>(path: impl AsRef<Path>) -> LocateResult<T> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Build a dense matrix from JSON rows, rejecting ragged input.
fn matrix_from_rows(rows: &[Vec<f64>]) -> LocateResult<DMatrix<f64>> {
    let n_cols = rows.first().map_or(0, |r| r.len());
    if let Some(i) = rows.iter().position(|r| r.len() != n_cols) {
        return Err(LocateError::MalformedInstance(format!(
            "distances row {} has {} entries, expected {}",
            i,
            rows[i].len(),
            n_cols
        )));
    }
    Ok(DMatrix::from_fn(rows.len(), n_cols, |i, j| rows[i][j]))
}

fn check_distances(distances: &DMatrix<f64>) -> LocateResult<()> {
    if distances.iter().any(|d| d.is_nan() || *d < 0.0) {
        return Err(LocateError::MalformedInstance(
            "distances must be non-negative numbers".to_string(),
        ));
    }
    Ok(())
}

fn capacity_from_f64(j: usize, cap: f64) -> LocateResult<u32> {
    if !cap.is_finite() || cap < 0.0 || cap.fract() != 0.0 || cap > u32::MAX as f64 {
        return Err(LocateError::MalformedInstance(format!(
            "locations[{}] = {} is not a non-negative integer",
            j, cap
        )));
    }
    Ok(cap as u32)
}

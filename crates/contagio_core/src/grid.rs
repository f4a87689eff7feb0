use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// An ordered, strictly increasing sequence of sample times (hours).
///
/// Every series in the crate is aligned to one of these. Construction
/// validates the ordering so the integrators and milestone detectors can
/// assume it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeGrid {
    times: Vec<f64>,
}

impl TimeGrid {
    /// Build a grid from raw sample times.
    pub fn new(times: Vec<f64>) -> Result<Self> {
        if times.len() < 2 {
            bail!("Time grid needs at least two samples, got {}.", times.len());
        }
        if times.iter().any(|t| !t.is_finite()) {
            bail!("Time grid contains a non-finite sample.");
        }
        if times.windows(2).any(|w| w[1] <= w[0]) {
            bail!("Time grid samples must be strictly increasing.");
        }
        Ok(Self { times })
    }

    /// `n` evenly spaced samples covering [t0, t1] inclusive.
    pub fn linspace(t0: f64, t1: f64, n: usize) -> Result<Self> {
        if n < 2 {
            bail!("linspace needs at least two samples, got {}.", n);
        }
        if !(t1 > t0) {
            bail!("linspace needs t1 > t0, got [{}, {}].", t0, t1);
        }
        let span = t1 - t0;
        let last = (n - 1) as f64;
        let times = (0..n).map(|k| t0 + span * (k as f64) / last).collect();
        Self::new(times)
    }

    /// Samples t0, t0 + dt, ... up to and including the first sample ≥ t1.
    ///
    /// Matches the inclusive-end convention the scenario horizons use
    /// (e.g. a 72 h horizon on a one-minute step).
    pub fn with_step(t0: f64, t1: f64, dt: f64) -> Result<Self> {
        if !(dt > 0.0) || !dt.is_finite() {
            bail!("Grid step must be positive and finite, got {}.", dt);
        }
        if !(t1 > t0) {
            bail!("with_step needs t1 > t0, got [{}, {}].", t0, t1);
        }
        let steps = ((t1 - t0) / dt).round() as usize;
        let mut times: Vec<f64> = (0..=steps).map(|k| t0 + dt * k as f64).collect();
        // Rounding can leave the horizon slightly uncovered.
        if *times.last().expect("grid is non-empty") < t1 - dt * 1e-9 {
            times.push(t1);
        }
        Self::new(times)
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn first(&self) -> f64 {
        self.times[0]
    }

    pub fn last(&self) -> f64 {
        self.times[self.times.len() - 1]
    }
}

/// Values sampled on a [`TimeGrid`], one per grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub name: String,
    pub values: Vec<f64>,
}

impl TimeSeries {
    pub fn new(name: impl Into<String>, grid: &TimeGrid, values: Vec<f64>) -> Result<Self> {
        if values.len() != grid.len() {
            bail!(
                "Series length {} does not match grid length {}.",
                values.len(),
                grid.len()
            );
        }
        Ok(Self {
            name: name.into(),
            values,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_err_contains<T: std::fmt::Debug>(result: Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn linspace_covers_endpoints() {
        let grid = TimeGrid::linspace(0.0, 1000.0, 1000).expect("grid should build");
        assert_eq!(grid.len(), 1000);
        assert_eq!(grid.first(), 0.0);
        assert_eq!(grid.last(), 1000.0);
    }

    #[test]
    fn with_step_is_inclusive() {
        let grid = TimeGrid::with_step(0.0, 1.0, 0.25).expect("grid should build");
        assert_eq!(grid.times(), &[0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn rejects_malformed_grids() {
        assert_err_contains(TimeGrid::new(vec![0.0]), "at least two");
        assert_err_contains(TimeGrid::new(vec![0.0, 0.0]), "strictly increasing");
        assert_err_contains(TimeGrid::new(vec![0.0, f64::NAN]), "non-finite");
        assert_err_contains(TimeGrid::linspace(1.0, 0.0, 10), "t1 > t0");
        assert_err_contains(TimeGrid::with_step(0.0, 1.0, 0.0), "positive");
    }

    #[test]
    fn series_length_must_match_grid() {
        let grid = TimeGrid::linspace(0.0, 1.0, 5).expect("grid should build");
        assert_err_contains(
            TimeSeries::new("s", &grid, vec![0.0; 4]),
            "does not match grid length",
        );
    }
}

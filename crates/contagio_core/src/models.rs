use crate::grid::TimeGrid;
use crate::traits::{RateLaw, VectorField};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Piecewise daily infection rate: `r_work` during the working window,
/// `r_off` for the rest of the day, repeating every `day_hours`.
///
/// t = 0 corresponds to the start of the working window (08:00).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WorkdayRate {
    /// Infections/hour while offices are staffed
    pub r_work: f64,
    /// Infections/hour off-hours
    pub r_off: f64,
    /// Length of the working window, hours from the start of the day
    pub work_hours: f64,
    /// Length of one day
    pub day_hours: f64,
}

impl Default for WorkdayRate {
    fn default() -> Self {
        Self {
            r_work: 3.0,
            r_off: 0.2,
            work_hours: 10.0,
            day_hours: 24.0,
        }
    }
}

impl WorkdayRate {
    pub fn validate(&self) -> Result<()> {
        if self.r_work < 0.0 || self.r_off < 0.0 {
            bail!("Workday rates must be non-negative.");
        }
        if !(self.day_hours > 0.0) {
            bail!("day_hours must be positive, got {}.", self.day_hours);
        }
        if self.work_hours < 0.0 || self.work_hours > self.day_hours {
            bail!(
                "work_hours must lie within one day, got {} of {}.",
                self.work_hours,
                self.day_hours
            );
        }
        Ok(())
    }

    /// The bare schedule r(t) sampled on a grid, for the schedule figure.
    pub fn schedule_over(&self, grid: &TimeGrid) -> Vec<f64> {
        grid.times().iter().map(|&t| self.rate(t, 0.0)).collect()
    }
}

impl RateLaw<f64> for WorkdayRate {
    fn rate(&self, t: f64, _i: f64) -> f64 {
        let tau = t.rem_euclid(self.day_hours);
        if tau <= self.work_hours {
            self.r_work
        } else {
            self.r_off
        }
    }
}

/// Exponentially decaying infection rate after a remediation campaign:
/// r(t) = r_peak * exp(-decay * t).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CampaignDecay {
    pub r_peak: f64,
    /// Temporal decay constant (1/h)
    pub decay: f64,
}

impl Default for CampaignDecay {
    fn default() -> Self {
        Self {
            r_peak: 6.0,
            decay: 0.2,
        }
    }
}

impl CampaignDecay {
    pub fn validate(&self) -> Result<()> {
        if self.r_peak < 0.0 {
            bail!("r_peak must be non-negative, got {}.", self.r_peak);
        }
        if self.decay < 0.0 {
            bail!("decay must be non-negative, got {}.", self.decay);
        }
        Ok(())
    }
}

impl RateLaw<f64> for CampaignDecay {
    fn rate(&self, t: f64, _i: f64) -> f64 {
        self.r_peak * (-self.decay * t).exp()
    }
}

/// State-dependent saturating rate r(I) = r0 / (1 + c*I).
///
/// With c < 0 the denominator can reach zero as I grows; the integrator
/// then reports a non-finite state rather than producing output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SaturatingRate {
    pub r0: f64,
    pub c: f64,
}

impl Default for SaturatingRate {
    fn default() -> Self {
        Self { r0: 3.0, c: 0.01 }
    }
}

impl SaturatingRate {
    pub fn validate(&self) -> Result<()> {
        if self.r0 < 0.0 {
            bail!("r0 must be non-negative, got {}.", self.r0);
        }
        Ok(())
    }
}

impl RateLaw<f64> for SaturatingRate {
    fn rate(&self, _t: f64, i: f64) -> f64 {
        self.r0 / (1.0 + self.c * i)
    }
}

/// Logistic growth with effective capacity K, evaluated in closed form:
/// I(t) = K / (1 + A*exp(-r*t)), A = (K - I0)/I0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Logistic {
    /// Growth rate (1/h)
    pub r: f64,
    /// Effective capacity
    pub k: f64,
}

impl Default for Logistic {
    fn default() -> Self {
        Self { r: 0.35, k: 300.0 }
    }
}

impl Logistic {
    pub fn validate(&self) -> Result<()> {
        if !(self.k > 0.0) {
            bail!("Logistic capacity K must be positive, got {}.", self.k);
        }
        if self.r < 0.0 {
            bail!("Logistic rate must be non-negative, got {}.", self.r);
        }
        Ok(())
    }

    pub fn evaluate(&self, i0: f64, grid: &TimeGrid) -> Result<Vec<f64>> {
        self.validate()?;
        if !(i0 > 0.0) {
            bail!(
                "Logistic evaluation needs a positive initial count, got {}.",
                i0
            );
        }
        let a = (self.k - i0) / i0;
        Ok(grid
            .times()
            .iter()
            .map(|&t| self.k / (1.0 + a * (-self.r * t).exp()))
            .collect())
    }
}

/// Population split and transition rates shared by the linear models and
/// the nonlinear SIR system.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SirParams {
    /// Total number of devices
    pub n: f64,
    pub s0: f64,
    pub i0: f64,
    pub r0: f64,
    /// Infection rate
    pub alpha: f64,
    /// Recovery rate
    pub beta: f64,
}

impl Default for SirParams {
    fn default() -> Self {
        Self {
            n: 1000.0,
            s0: 999.0,
            i0: 1.0,
            r0: 0.0,
            alpha: 0.003,
            beta: 0.05,
        }
    }
}

impl SirParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.n > 0.0) {
            bail!("Population must be positive, got {}.", self.n);
        }
        if self.s0 < 0.0 || self.i0 < 0.0 || self.r0 < 0.0 {
            bail!("Initial compartment counts must be non-negative.");
        }
        let total = self.s0 + self.i0 + self.r0;
        if (total - self.n).abs() > 1e-9 * self.n.max(1.0) {
            bail!(
                "Initial compartments must sum to the population: {} + {} + {} != {}.",
                self.s0,
                self.i0,
                self.r0,
                self.n
            );
        }
        if self.alpha < 0.0 || self.beta < 0.0 {
            bail!("Rates alpha and beta must be non-negative.");
        }
        Ok(())
    }

    /// Linear model A (no recovery): S(t) = S0*exp(-alpha*t),
    /// I(t) = I0 + S0*(1 - exp(-alpha*t)).
    pub fn linear_model_a(&self, grid: &TimeGrid) -> Result<(Vec<f64>, Vec<f64>)> {
        self.validate()?;
        let mut s = Vec::with_capacity(grid.len());
        let mut i = Vec::with_capacity(grid.len());
        for &t in grid.times() {
            let decay = (-self.alpha * t).exp();
            s.push(self.s0 * decay);
            i.push(self.i0 + self.s0 * (1.0 - decay));
        }
        Ok((s, i))
    }

    /// Linear model B (with recovery). R is obtained from the conservation
    /// law R = N - S - I, so S + I + R = N holds to rounding.
    ///
    /// beta = alpha makes the I(t) denominator singular and is rejected.
    pub fn linear_model_b(&self, grid: &TimeGrid) -> Result<(Vec<f64>, Vec<f64>, Vec<f64>)> {
        self.validate()?;
        let gap = self.beta - self.alpha;
        if gap.abs() < 1e-12 * self.alpha.max(self.beta).max(1.0) {
            bail!(
                "Model B is singular for beta = alpha (got alpha = {}, beta = {}).",
                self.alpha,
                self.beta
            );
        }
        let mix = self.alpha * self.s0 / gap;
        let mut s = Vec::with_capacity(grid.len());
        let mut i = Vec::with_capacity(grid.len());
        let mut r = Vec::with_capacity(grid.len());
        for &t in grid.times() {
            let ea = (-self.alpha * t).exp();
            let eb = (-self.beta * t).exp();
            let s_t = self.s0 * ea;
            let i_t = self.i0 * eb + mix * (ea - eb);
            s.push(s_t);
            i.push(i_t);
            r.push(self.n - s_t - i_t);
        }
        Ok((s, i, r))
    }

    /// The nonlinear SIR vector field for the adaptive integrator.
    pub fn field(&self) -> SirField {
        SirField {
            alpha: self.alpha,
            beta: self.beta,
        }
    }

    pub fn initial_state(&self) -> [f64; 3] {
        [self.s0, self.i0, self.r0]
    }
}

/// dS/dt = -alpha*S*I, dI/dt = alpha*S*I - beta*I, dR/dt = beta*I.
#[derive(Debug, Clone, Copy)]
pub struct SirField {
    pub alpha: f64,
    pub beta: f64,
}

impl VectorField<f64> for SirField {
    fn dimension(&self) -> usize {
        3
    }

    fn apply(&self, _t: f64, y: &[f64], out: &mut [f64]) {
        let (s, i) = (y[0], y[1]);
        out[0] = -self.alpha * s * i;
        out[1] = self.alpha * s * i - self.beta * i;
        out[2] = self.beta * i;
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
    fn workday_rate_repeats_daily() {
        let rate = WorkdayRate::default();
        assert_eq!(rate.rate(0.0, 0.0), 3.0);
        assert_eq!(rate.rate(10.0, 0.0), 3.0);
        assert_eq!(rate.rate(10.5, 0.0), 0.2);
        assert_eq!(rate.rate(23.9, 0.0), 0.2);
        // Same hour the next day
        assert_eq!(rate.rate(24.0 + 5.0, 0.0), 3.0);
        assert_eq!(rate.rate(48.0 + 12.0, 0.0), 0.2);
    }

    #[test]
    fn model_a_starts_at_initial_split_and_saturates() {
        let params = SirParams::default();
        let grid = TimeGrid::linspace(0.0, 2500.0, 1000).expect("grid");
        let (s, i) = params.linear_model_a(&grid).expect("model A");
        assert_eq!(s[0], 999.0);
        assert_eq!(i[0], 1.0);
        // Susceptibles decay toward zero, infections toward N.
        assert!(s.last().expect("non-empty") < &1.0);
        assert!(i.last().expect("non-empty") > &999.0);
        // S + I = N at every sample by construction of model A.
        for (sv, iv) in s.iter().zip(i.iter()) {
            assert!((sv + iv - 1000.0).abs() < 1e-9);
        }
    }

    #[test]
    fn model_b_conserves_population() {
        let params = SirParams::default();
        let grid = TimeGrid::linspace(0.0, 2500.0, 1000).expect("grid");
        let (s, i, r) = params.linear_model_b(&grid).expect("model B");
        for k in 0..grid.len() {
            assert!((s[k] + i[k] + r[k] - 1000.0).abs() < 1e-9);
        }
        assert_eq!(s[0], 999.0);
        assert!((i[0] - 1.0).abs() < 1e-12);
        assert!(r[0].abs() < 1e-12);
    }

    #[test]
    fn model_b_rejects_equal_rates() {
        let params = SirParams {
            beta: 0.003,
            ..SirParams::default()
        };
        let grid = TimeGrid::linspace(0.0, 10.0, 10).expect("grid");
        assert_err_contains(params.linear_model_b(&grid), "singular");
    }

    #[test]
    fn sir_params_reject_malformed_splits() {
        let grid = TimeGrid::linspace(0.0, 10.0, 10).expect("grid");
        let params = SirParams {
            n: -5.0,
            ..SirParams::default()
        };
        assert_err_contains(params.linear_model_a(&grid), "Population");

        let params = SirParams {
            s0: 500.0,
            ..SirParams::default()
        };
        assert_err_contains(params.linear_model_a(&grid), "sum to the population");
    }

    #[test]
    fn logistic_saturates_at_capacity() {
        let logistic = Logistic::default();
        let grid = TimeGrid::with_step(0.0, 72.0, 0.1).expect("grid");
        let values = logistic.evaluate(1.0, &grid).expect("logistic");
        assert!((values[0] - 1.0).abs() < 1e-12);
        let last = values.last().expect("non-empty");
        assert!(*last < 300.0);
        assert!((last - 300.0).abs() < 1.0);
        // Monotone growth for I0 < K.
        assert!(values.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn logistic_rejects_zero_start() {
        let logistic = Logistic::default();
        let grid = TimeGrid::linspace(0.0, 10.0, 10).expect("grid");
        assert_err_contains(logistic.evaluate(0.0, &grid), "positive initial count");
    }

    #[test]
    fn sir_field_derivatives_cancel() {
        let field = SirParams::default().field();
        let mut out = [0.0; 3];
        field.apply(0.0, &[999.0, 1.0, 0.0], &mut out);
        assert!((out[0] + out[1] + out[2]).abs() < 1e-12);
        assert!(out[0] < 0.0);
        assert!(out[2] >= 0.0);
    }
}

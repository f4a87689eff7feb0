use crate::grid::TimeGrid;
use crate::traits::{RateLaw, Scalar, Steppable, VectorField};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure modes of the integrators, kept distinct from configuration
/// errors so callers can tell a bad parameter set from a run that went
/// numerically bad mid-flight.
#[derive(Debug, Clone, Error)]
pub enum IntegrationError {
    #[error("state became non-finite at t = {t}")]
    NonFiniteState { t: f64 },
    #[error("step size underflow at t = {t} (h = {h}) with error tolerance unmet")]
    StepSizeTooSmall { t: f64, h: f64 },
    #[error("exceeded {max_steps} steps before reaching the end of the span")]
    MaxStepsExceeded { max_steps: u64 },
}

/// Classic Runge-Kutta 4th Order Solver
pub struct Rk4<T: Scalar> {
    k1: Vec<T>,
    k2: Vec<T>,
    k3: Vec<T>,
    k4: Vec<T>,
    tmp: Vec<T>,
}

impl<T: Scalar> Rk4<T> {
    pub fn new(dim: usize) -> Self {
        let z = T::from_f64(0.0).unwrap();
        Self {
            k1: vec![z; dim],
            k2: vec![z; dim],
            k3: vec![z; dim],
            k4: vec![z; dim],
            tmp: vec![z; dim],
        }
    }
}

impl<T: Scalar> Steppable<T> for Rk4<T> {
    fn step(&mut self, field: &impl VectorField<T>, t: &mut T, state: &mut [T], dt: T) {
        let half = T::from_f64(0.5).unwrap();
        let sixth = T::from_f64(1.0 / 6.0).unwrap();
        let two = T::from_f64(2.0).unwrap();

        let t0 = *t;

        // k1 = f(t, y)
        field.apply(t0, state, &mut self.k1);

        // k2 = f(t + dt/2, y + dt*k1/2)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k1[i] * half;
        }
        field.apply(t0 + dt * half, &self.tmp, &mut self.k2);

        // k3 = f(t + dt/2, y + dt*k2/2)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k2[i] * half;
        }
        field.apply(t0 + dt * half, &self.tmp, &mut self.k3);

        // k4 = f(t + dt, y + dt*k3)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k3[i];
        }
        field.apply(t0 + dt, &self.tmp, &mut self.k4);

        // y_next = y + dt/6 * (k1 + 2k2 + 2k3 + k4)
        for i in 0..state.len() {
            state[i] = state[i]
                + dt * sixth * (self.k1[i] + two * self.k2[i] + two * self.k3[i] + self.k4[i]);
        }

        *t = t0 + dt;
    }
}

/// Adapter presenting a scalar rate law as a one-dimensional vector field.
struct ScalarField<'a, T: Scalar, L: RateLaw<T>> {
    law: &'a L,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Scalar, L: RateLaw<T>> VectorField<T> for ScalarField<'_, T, L> {
    fn dimension(&self) -> usize {
        1
    }

    fn apply(&self, t: T, y: &[T], out: &mut [T]) {
        out[0] = self.law.rate(t, y[0]);
    }
}

/// Integrates the scalar ODE dI/dt = f(t, I) over a time grid with RK4.
///
/// The grid may be non-uniform; the step size is recomputed per interval.
/// The result has one value per grid point and starts at exactly `i0`.
/// A non-finite intermediate aborts with [`IntegrationError::NonFiniteState`]
/// instead of propagating into the output.
pub fn integrate_grid<L: RateLaw<f64>>(law: &L, i0: f64, grid: &TimeGrid) -> Result<Vec<f64>> {
    if !i0.is_finite() {
        bail!("Initial value must be finite, got {}.", i0);
    }

    let times = grid.times();
    let mut solver = Rk4::new(1);
    let field = ScalarField {
        law,
        _marker: std::marker::PhantomData,
    };

    let mut values = Vec::with_capacity(times.len());
    values.push(i0);

    let mut t = times[0];
    let mut state = [i0];
    for k in 1..times.len() {
        let h = times[k] - times[k - 1];
        solver.step(&field, &mut t, &mut state, h);
        if !state[0].is_finite() {
            return Err(IntegrationError::NonFiniteState { t: times[k] }.into());
        }
        values.push(state[0]);
    }

    Ok(values)
}

/// Relative/absolute error tolerances for the adaptive solver.
///
/// A step is accepted when max_i |err_i| / (atol + rtol*|y_i|) <= 1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Tolerances {
    pub rtol: f64,
    pub atol: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            rtol: 1e-6,
            atol: 1e-8,
        }
    }
}

impl Tolerances {
    fn validate(&self) -> Result<()> {
        if !self.rtol.is_finite() || self.rtol <= 0.0 {
            bail!("rtol must be positive and finite, got {}.", self.rtol);
        }
        if !self.atol.is_finite() || self.atol <= 0.0 {
            bail!("atol must be positive and finite, got {}.", self.atol);
        }
        Ok(())
    }
}

/// Step-size I-controller: h_new = safety * h * error^(-1/5).
#[derive(Debug, Clone)]
pub struct StepController {
    pub safety: f64,
    pub max_factor: f64,
    pub min_factor: f64,
}

impl Default for StepController {
    fn default() -> Self {
        Self {
            safety: 0.9,
            max_factor: 5.0,
            min_factor: 0.2,
        }
    }
}

impl StepController {
    fn compute_factor(&self, error: f64) -> f64 {
        if error == 0.0 {
            return self.max_factor;
        }
        // Exponent 1/(p+1) with p = 4, the order of the propagated solution.
        let factor = self.safety * error.powf(-0.2);
        factor.clamp(self.min_factor, self.max_factor)
    }
}

/// Integration statistics for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub fn_evals: u64,
    pub accepted_steps: u64,
    pub rejected_steps: u64,
}

/// Outcome of a single attempted RKF45 step.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Candidate state after the step (4th order solution)
    pub y: Vec<f64>,
    /// Time after the step
    pub t: f64,
    /// Normalized error estimate (<= 1.0 means accepted)
    pub error: f64,
    /// Suggested magnitude for the next step
    pub h_next: f64,
    pub accepted: bool,
}

/// Runge-Kutta-Fehlberg 4(5) integrator.
///
/// A 6-stage embedded pair: the 4th-order solution is propagated, the
/// embedded 5th-order solution supplies the error estimate driving the
/// step-size controller.
pub struct Rkf45 {
    pub tol: Tolerances,
    pub controller: StepController,
    pub h_min: f64,
    pub h_max: f64,
    pub max_steps: u64,
    pub stats: Stats,
    k1: Vec<f64>,
    k2: Vec<f64>,
    k3: Vec<f64>,
    k4: Vec<f64>,
    k5: Vec<f64>,
    k6: Vec<f64>,
    tmp: Vec<f64>,
}

impl Rkf45 {
    pub fn new(dim: usize, tol: Tolerances) -> Self {
        Self {
            tol,
            controller: StepController::default(),
            h_min: 1e-12,
            h_max: f64::INFINITY,
            max_steps: 1_000_000,
            stats: Stats::default(),
            k1: vec![0.0; dim],
            k2: vec![0.0; dim],
            k3: vec![0.0; dim],
            k4: vec![0.0; dim],
            k5: vec![0.0; dim],
            k6: vec![0.0; dim],
            tmp: vec![0.0; dim],
        }
    }

    /// Attempts one step of size h from (t, y).
    pub fn step(&mut self, field: &impl VectorField<f64>, t: f64, y: &[f64], h: f64) -> StepResult {
        // Fehlberg tableau
        let c2 = 0.25;
        let c3 = 3.0 / 8.0;
        let c4 = 12.0 / 13.0;
        let c5 = 1.0;
        let c6 = 0.5;

        let a21 = 0.25;

        let a31 = 3.0 / 32.0;
        let a32 = 9.0 / 32.0;

        let a41 = 1932.0 / 2197.0;
        let a42 = -7200.0 / 2197.0;
        let a43 = 7296.0 / 2197.0;

        let a51 = 439.0 / 216.0;
        let a52 = -8.0;
        let a53 = 3680.0 / 513.0;
        let a54 = -845.0 / 4104.0;

        let a61 = -8.0 / 27.0;
        let a62 = 2.0;
        let a63 = -3544.0 / 2565.0;
        let a64 = 1859.0 / 4104.0;
        let a65 = -11.0 / 40.0;

        // b coefficients (4th order, propagated)
        let b1 = 25.0 / 216.0;
        let b3 = 1408.0 / 2565.0;
        let b4 = 2197.0 / 4104.0;
        let b5 = -0.2;

        // e = b_hat - b (5th order minus 4th order), for the error estimate
        let e1 = 16.0 / 135.0 - b1;
        let e3 = 6656.0 / 12825.0 - b3;
        let e4 = 28561.0 / 56430.0 - b4;
        let e5 = -9.0 / 50.0 - b5;
        let e6 = 2.0 / 55.0;

        let dim = y.len();

        // k1
        field.apply(t, y, &mut self.k1);

        // k2
        for i in 0..dim {
            self.tmp[i] = y[i] + h * (a21 * self.k1[i]);
        }
        field.apply(t + c2 * h, &self.tmp, &mut self.k2);

        // k3
        for i in 0..dim {
            self.tmp[i] = y[i] + h * (a31 * self.k1[i] + a32 * self.k2[i]);
        }
        field.apply(t + c3 * h, &self.tmp, &mut self.k3);

        // k4
        for i in 0..dim {
            self.tmp[i] = y[i] + h * (a41 * self.k1[i] + a42 * self.k2[i] + a43 * self.k3[i]);
        }
        field.apply(t + c4 * h, &self.tmp, &mut self.k4);

        // k5
        for i in 0..dim {
            self.tmp[i] = y[i]
                + h * (a51 * self.k1[i] + a52 * self.k2[i] + a53 * self.k3[i] + a54 * self.k4[i]);
        }
        field.apply(t + c5 * h, &self.tmp, &mut self.k5);

        // k6
        for i in 0..dim {
            self.tmp[i] = y[i]
                + h * (a61 * self.k1[i]
                    + a62 * self.k2[i]
                    + a63 * self.k3[i]
                    + a64 * self.k4[i]
                    + a65 * self.k5[i]);
        }
        field.apply(t + c6 * h, &self.tmp, &mut self.k6);

        self.stats.fn_evals += 6;

        // 4th order solution and scaled error norm
        let mut y_next = vec![0.0; dim];
        let mut error: f64 = 0.0;
        for i in 0..dim {
            y_next[i] = y[i]
                + h * (b1 * self.k1[i] + b3 * self.k3[i] + b4 * self.k4[i] + b5 * self.k5[i]);

            let err_i = h
                * (e1 * self.k1[i]
                    + e3 * self.k3[i]
                    + e4 * self.k4[i]
                    + e5 * self.k5[i]
                    + e6 * self.k6[i]);
            let scale = self.tol.atol + self.tol.rtol * y_next[i].abs();
            error = error.max((err_i / scale).abs());
        }

        let accepted = error <= 1.0;
        if accepted {
            self.stats.accepted_steps += 1;
        } else {
            self.stats.rejected_steps += 1;
        }

        let factor = self.controller.compute_factor(error);
        let h_next = (h.abs() * factor).clamp(self.h_min, self.h_max);

        StepResult {
            y: y_next,
            t: t + h,
            error,
            h_next,
            accepted,
        }
    }

    /// Integrates dy/dt = f(t, y) and reports the state at exactly the
    /// grid's sample times.
    ///
    /// Steps adapt freely between samples but are clipped so every sample
    /// time is hit; the suggested step size carries across samples.
    pub fn solve_sampled(
        &mut self,
        field: &impl VectorField<f64>,
        y0: &[f64],
        grid: &TimeGrid,
    ) -> Result<Vec<Vec<f64>>> {
        self.tol.validate()?;
        if y0.len() != field.dimension() {
            bail!(
                "Initial state dimension {} does not match the field dimension {}.",
                y0.len(),
                field.dimension()
            );
        }
        if y0.len() != self.k1.len() {
            bail!(
                "Solver was built for dimension {}, got a state of dimension {}.",
                self.k1.len(),
                y0.len()
            );
        }
        for (i, &v) in y0.iter().enumerate() {
            if !v.is_finite() {
                bail!("y0[{}] is not finite.", i);
            }
        }

        let times = grid.times();
        let mut output = Vec::with_capacity(times.len());
        let mut y = y0.to_vec();
        let mut t = times[0];
        output.push(y.clone());

        let mut h = (times[1] - times[0]).min(self.h_max).max(self.h_min);
        let mut step_count = 0u64;

        for &target in &times[1..] {
            while target - t > self.h_min {
                let h_trial = h.min(target - t);
                let result = self.step(field, t, &y, h_trial);

                step_count += 1;
                if step_count > self.max_steps {
                    return Err(IntegrationError::MaxStepsExceeded {
                        max_steps: self.max_steps,
                    }
                    .into());
                }

                if result.accepted {
                    t = result.t;
                    y = result.y;
                    if !y.iter().all(|v| v.is_finite()) {
                        return Err(IntegrationError::NonFiniteState { t }.into());
                    }
                } else if result.h_next <= self.h_min {
                    return Err(IntegrationError::StepSizeTooSmall {
                        t,
                        h: result.h_next,
                    }
                    .into());
                }

                h = result.h_next;
            }
            // Land on the sample exactly; the remaining gap is below h_min.
            t = target;
            output.push(y.clone());
        }

        log::debug!(
            "rkf45: {} accepted / {} rejected steps, {} function evaluations",
            self.stats.accepted_steps,
            self.stats.rejected_steps,
            self.stats.fn_evals
        );

        Ok(output)
    }
}

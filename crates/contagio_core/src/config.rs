use crate::models::{CampaignDecay, Logistic, SaturatingRate, SirParams, WorkdayRate};
use crate::solvers::Tolerances;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Immutable configuration for a full scenario run.
///
/// One value of this struct drives every scenario; nothing reads
/// module-level state. Defaults reproduce the coursework constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub sir: SirParams,
    pub workday: WorkdayRate,
    pub campaign: CampaignDecay,
    pub saturating: SaturatingRate,
    pub logistic: Logistic,
    /// Margin defining "approximately zero" / "approximately at capacity"
    /// for milestone detection
    pub milestone_tol: f64,
    /// Fixed integration step in hours (one minute)
    pub step: f64,
    /// Horizon for the piecewise-linear run and the comparison (hours)
    pub linear_horizon: f64,
    /// Horizon for the decaying-campaign run
    pub campaign_horizon: f64,
    /// Horizon for the state-dependent run
    pub state_horizon: f64,
    /// Horizon for the logistic run
    pub logistic_horizon: f64,
    /// Samples for closed-form curves evaluated on an even grid
    pub curve_samples: usize,
    /// Horizon for the linear models A/B and the nonlinear SIR run
    pub sir_horizon: f64,
    /// Sample count for the SIR-family grids
    pub sir_samples: usize,
    /// Error tolerances for the adaptive SIR integration
    pub solver_tol: Tolerances,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            sir: SirParams::default(),
            workday: WorkdayRate::default(),
            campaign: CampaignDecay::default(),
            saturating: SaturatingRate::default(),
            logistic: Logistic::default(),
            milestone_tol: 1.0,
            step: 1.0 / 60.0,
            linear_horizon: 72.0,
            campaign_horizon: 48.0,
            state_horizon: 72.0,
            logistic_horizon: 72.0,
            curve_samples: 1000,
            sir_horizon: 2500.0,
            sir_samples: 1000,
            solver_tol: Tolerances::default(),
        }
    }
}

impl ScenarioConfig {
    pub fn validate(&self) -> Result<()> {
        self.sir.validate()?;
        self.workday.validate()?;
        self.campaign.validate()?;
        self.saturating.validate()?;
        self.logistic.validate()?;
        if !(self.milestone_tol > 0.0) {
            bail!(
                "Milestone tolerance must be positive, got {}.",
                self.milestone_tol
            );
        }
        if !(self.step > 0.0) {
            bail!("Integration step must be positive, got {}.", self.step);
        }
        for (name, horizon) in [
            ("linear_horizon", self.linear_horizon),
            ("campaign_horizon", self.campaign_horizon),
            ("state_horizon", self.state_horizon),
            ("logistic_horizon", self.logistic_horizon),
            ("sir_horizon", self.sir_horizon),
        ] {
            if !(horizon > 0.0) || !horizon.is_finite() {
                bail!("{} must be positive and finite, got {}.", name, horizon);
            }
        }
        if self.curve_samples < 2 || self.sir_samples < 2 {
            bail!("Sample counts must be at least 2.");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        ScenarioConfig::default()
            .validate()
            .expect("defaults must validate");
    }

    #[test]
    fn zero_step_is_rejected() {
        let config = ScenarioConfig {
            step: 0.0,
            ..ScenarioConfig::default()
        };
        let err = config.validate().expect_err("expected error");
        assert!(format!("{err}").contains("step"));
    }

    #[test]
    fn negative_population_is_rejected_before_any_run() {
        let config = ScenarioConfig {
            sir: SirParams {
                n: -1.0,
                s0: -2.0,
                i0: 1.0,
                r0: 0.0,
                alpha: 0.003,
                beta: 0.05,
            },
            ..ScenarioConfig::default()
        };
        assert!(config.validate().is_err());
    }
}

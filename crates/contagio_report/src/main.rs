mod render;

use anyhow::{Context, Result};
use contagio_core::analysis::{outbreak_threshold, ThresholdReport};
use contagio_core::config::ScenarioConfig;
use contagio_core::milestones::Milestone;
use contagio_core::scenario::{self, ScenarioResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

type ScenarioFn = fn(&ScenarioConfig) -> Result<ScenarioResult>;

const SCENARIOS: [(ScenarioFn, &str); 9] = [
    (
        scenario::workday_schedule,
        "Piecewise propagation rate over 24 h",
    ),
    (
        scenario::linear_piecewise,
        "Piecewise-linear model, 3 days",
    ),
    (
        scenario::campaign_decay,
        "I(t) under a decaying campaign rate",
    ),
    (
        scenario::state_dependent,
        "I(t) under the saturating rate r(I) = r0/(1+cI)",
    ),
    (scenario::logistic, "Logistic model, closed form"),
    (
        scenario::linear_vs_logistic,
        "Piecewise-linear vs logistic growth",
    ),
    (
        scenario::linear_model_a,
        "Model A: linear system without recovery",
    ),
    (
        scenario::linear_model_b,
        "Model B: linear system with recovery",
    ),
    (scenario::sir_nonlinear, "Nonlinear SIR model"),
];

/// Everything the run learned, dumped alongside the figures.
#[derive(Debug, Serialize)]
struct RunSummary {
    threshold: ThresholdReport,
    milestones: BTreeMap<String, Vec<Milestone>>,
}

fn main() -> Result<()> {
    {
        use env_logger::{Builder, Env};
        Builder::from_env(Env::default().default_filter_or("info")).init();
    }

    let config = ScenarioConfig::default();
    config.validate()?;

    let out_dir = Path::new("figs");
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let threshold = outbreak_threshold(&config.sir)?;
    log::info!(
        "outbreak threshold: R = {:.2}, initial growth rate {:.3}/h ({})",
        threshold.r_number,
        threshold.growth_rate,
        if threshold.epidemic {
            "epidemic"
        } else {
            "dies out"
        }
    );

    let mut milestones = BTreeMap::new();
    for (run, title) in SCENARIOS {
        let result = run(&config)?;
        let path = out_dir.join(format!("{}.png", result.name));
        render::render_scenario(&result, title, &path)?;
        log::info!(
            "{}: {} samples, {} milestones -> {}",
            result.name,
            result.grid.len(),
            result.milestones.len(),
            path.display()
        );
        for m in &result.milestones {
            log::info!("  {} at t = {:.1} h, value {:.1}", m.label, m.t, m.value);
        }
        milestones.insert(result.name.clone(), result.milestones);
    }

    let summary = RunSummary {
        threshold,
        milestones,
    };
    let summary_path = out_dir.join("milestones.json");
    let file = fs::File::create(&summary_path)
        .with_context(|| format!("Failed to create {}", summary_path.display()))?;
    serde_json::to_writer_pretty(file, &summary)
        .context("Failed to serialize the run summary")?;
    log::info!("summary -> {}", summary_path.display());

    Ok(())
}

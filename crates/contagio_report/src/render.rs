use anyhow::{Context, Result};
use contagio_core::scenario::ScenarioResult;
use plotters::prelude::*;
use std::path::Path;

const FIGURE_SIZE: (u32, u32) = (900, 500);

const SERIES_COLORS: [RGBColor; 4] = [
    RGBColor(32, 56, 100),
    RGBColor(255, 112, 67),
    RGBColor(0, 176, 80),
    RGBColor(128, 0, 128),
];

/// Renders one scenario's series and milestone markers to a PNG file.
pub fn render_scenario(result: &ScenarioResult, title: &str, path: &Path) -> Result<()> {
    let root = BitMapBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)
        .with_context(|| format!("Failed to clear {}", path.display()))?;

    let x_range = result.grid.first()..result.grid.last();
    let (y_min, y_max) = value_range(result);
    let pad = 0.05 * (y_max - y_min).max(1.0);

    let mut chart = ChartBuilder::on(&root)
        .margin(12)
        .caption(title, ("sans-serif", 22))
        .x_label_area_size(42)
        .y_label_area_size(56)
        .build_cartesian_2d(x_range, (y_min - pad)..(y_max + pad))
        .context("Failed to build chart axes")?;

    chart
        .configure_mesh()
        .x_desc("Time (hours)")
        .y_desc("Devices")
        .draw()
        .context("Failed to draw chart mesh")?;

    let times = result.grid.times();
    for (idx, series) in result.series.iter().enumerate() {
        let color = SERIES_COLORS[idx % SERIES_COLORS.len()];
        chart
            .draw_series(LineSeries::new(
                times.iter().zip(series.values.iter()).map(|(&t, &v)| (t, v)),
                &color,
            ))
            .with_context(|| format!("Failed to draw series {}", series.name))?
            .label(series.name.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 18, y)], color));
    }

    chart
        .draw_series(result.milestones.iter().map(|m| {
            EmptyElement::at((m.t, m.value))
                + Circle::new((0, 0), 4, ShapeStyle::from(&BLACK).filled())
                + Text::new(
                    format!("{} ({:.1} h, {:.0})", m.label, m.t, m.value),
                    (8, -10),
                    ("sans-serif", 13).into_font(),
                )
        }))
        .context("Failed to draw milestone markers")?;

    if result.series.len() > 1 {
        chart
            .configure_series_labels()
            .border_style(&BLACK)
            .background_style(&WHITE.mix(0.85))
            .draw()
            .context("Failed to draw legend")?;
    }

    root.present()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn value_range(result: &ScenarioResult) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for series in &result.series {
        for &v in &series.values {
            min = min.min(v);
            max = max.max(v);
        }
    }
    if !min.is_finite() || !max.is_finite() {
        (0.0, 1.0)
    } else {
        (min, max)
    }
}

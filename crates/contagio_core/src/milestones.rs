use crate::grid::TimeGrid;
use serde::{Deserialize, Serialize};

/// A detected time/value pair marking a notable event in a computed
/// series (peak, crossing, threshold approach).
///
/// Milestones are derived from a complete series in a single scan and are
/// never mutated afterwards. Detectors that find no qualifying sample
/// return nothing, so the set of milestones actually found is a subset of
/// the nominal event set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub label: String,
    pub index: usize,
    pub t: f64,
    pub value: f64,
}

impl Milestone {
    pub fn at(label: impl Into<String>, grid: &TimeGrid, series: &[f64], index: usize) -> Self {
        Self {
            label: label.into(),
            index,
            t: grid.times()[index],
            value: series[index],
        }
    }
}

/// Index of the maximum value, first occurrence on ties.
pub fn peak(series: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (k, &v) in series.iter().enumerate() {
        match best {
            Some((_, bv)) if v <= bv => {}
            _ => best = Some((k, v)),
        }
    }
    best.map(|(k, _)| k)
}

fn sign(x: f64) -> i8 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}

/// Indices where sign(a - b) changes between consecutive samples.
///
/// Every sign change is reported, in order; callers that only care about
/// the first intersection take `.first()`. The reported index is the
/// sample on the left of the change.
pub fn crossings(a: &[f64], b: &[f64]) -> Vec<usize> {
    let len = a.len().min(b.len());
    let mut found = Vec::new();
    for k in 0..len.saturating_sub(1) {
        let before = sign(a[k] - b[k]);
        let after = sign(a[k + 1] - b[k + 1]);
        if before != after {
            found.push(k);
        }
    }
    found
}

/// First index where the series drops below `bound`.
pub fn first_below(series: &[f64], bound: f64) -> Option<usize> {
    series.iter().position(|&v| v < bound)
}

/// First index where the series exceeds `bound`.
pub fn first_above(series: &[f64], bound: f64) -> Option<usize> {
    series.iter().position(|&v| v > bound)
}

/// Index minimizing |a - b| among samples where `a` exceeds `active_min`.
///
/// The restriction avoids trivial matches while both series still sit
/// near zero; the returned index is in the original (unrestricted) index
/// space. First occurrence on ties.
pub fn closest_approach(a: &[f64], b: &[f64], active_min: f64) -> Option<usize> {
    let len = a.len().min(b.len());
    let mut best: Option<(usize, f64)> = None;
    for k in 0..len {
        if a[k] <= active_min {
            continue;
        }
        let gap = (a[k] - b[k]).abs();
        match best {
            Some((_, bg)) if gap >= bg => {}
            _ => best = Some((k, gap)),
        }
    }
    best.map(|(k, _)| k)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_finds_single_interior_maximum() {
        let series = [0.0, 2.0, 7.5, 3.0, 1.0];
        assert_eq!(peak(&series), Some(2));
    }

    #[test]
    fn peak_reports_first_occurrence_on_ties() {
        let series = [1.0, 5.0, 3.0, 5.0, 0.0];
        assert_eq!(peak(&series), Some(1));
    }

    #[test]
    fn peak_of_empty_series_is_none() {
        assert_eq!(peak(&[]), None);
    }

    #[test]
    fn crossing_of_closing_lines_lands_at_the_intersection() {
        // S(t) = 100 - t and I(t) = t intersect at t = 50 where both
        // equal 50; the detected index must sit within one grid step.
        let grid = TimeGrid::linspace(0.0, 200.0, 201).expect("grid");
        let s: Vec<f64> = grid.times().iter().map(|&t| 100.0 - t).collect();
        let i: Vec<f64> = grid.times().iter().map(|&t| t).collect();

        let found = crossings(&s, &i);
        let k = *found.first().expect("a crossing is expected");
        let dt = grid.times()[1] - grid.times()[0];
        assert!((grid.times()[k] - 50.0).abs() <= dt);
        assert!((s[k] - 50.0).abs() <= dt);
    }

    #[test]
    fn all_crossings_are_reported_in_order() {
        // a - b changes sign three times.
        let a = [0.0, 2.0, 0.5, 2.0, 3.0];
        let b = [1.0; 5];
        assert_eq!(crossings(&a, &b), vec![0, 1, 2]);
    }

    #[test]
    fn monotone_series_produce_no_crossing() {
        let a = [5.0, 4.0, 3.0];
        let b = [0.0, 1.0, 2.0];
        assert!(crossings(&a, &b).is_empty());
    }

    #[test]
    fn threshold_detection_matches_grid_resolution() {
        // S(t) = 100*exp(-0.1 t) with tol = 1.0: at the first reported
        // index S < 1, and one sample earlier S >= 1.
        let grid = TimeGrid::with_step(0.0, 100.0, 0.5).expect("grid");
        let s: Vec<f64> = grid
            .times()
            .iter()
            .map(|&t| 100.0 * (-0.1 * t).exp())
            .collect();

        let k = first_below(&s, 1.0).expect("threshold should be reached");
        assert!(s[k] < 1.0);
        assert!(s[k - 1] >= 1.0);
    }

    #[test]
    fn threshold_never_reached_is_omitted() {
        let s = [10.0, 9.0, 8.0];
        assert_eq!(first_below(&s, 1.0), None);
        assert_eq!(first_above(&s, 50.0), None);
    }

    #[test]
    fn closest_approach_ignores_the_inactive_head() {
        // Both series start near zero; without the active-region
        // restriction the trivial index 0 would win.
        let r = [0.0, 0.5, 2.0, 5.0, 9.0];
        let i = [0.1, 4.0, 6.0, 5.5, 2.0];
        assert_eq!(closest_approach(&r, &i, 1.0), Some(3));
    }

    #[test]
    fn closest_approach_with_no_active_samples_is_omitted() {
        let r = [0.0, 0.1, 0.2];
        let i = [1.0, 1.0, 1.0];
        assert_eq!(closest_approach(&r, &i, 1.0), None);
    }

    #[test]
    fn milestone_records_time_and_value() {
        let grid = TimeGrid::linspace(0.0, 4.0, 5).expect("grid");
        let series = [0.0, 1.0, 4.0, 2.0, 1.0];
        let k = peak(&series).expect("peak");
        let m = Milestone::at("pico", &grid, &series, k);
        assert_eq!(m.index, 2);
        assert_eq!(m.t, 2.0);
        assert_eq!(m.value, 4.0);
    }
}

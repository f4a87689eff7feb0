use crate::models::SirParams;
use anyhow::{bail, Result};
use nalgebra::{Complex, DMatrix};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplexNumber {
    pub re: f64,
    pub im: f64,
}

impl From<Complex<f64>> for ComplexNumber {
    fn from(value: Complex<f64>) -> Self {
        Self {
            re: value.re,
            im: value.im,
        }
    }
}

/// Linearized outlook for an SIR parameter set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdReport {
    /// Basic reproduction number alpha*S0/beta
    pub r_number: f64,
    /// Initial exponential growth rate of I(t), alpha*S0 - beta
    pub growth_rate: f64,
    /// Whether the infection initially grows (r_number > 1)
    pub epidemic: bool,
    /// Row-major 3x3 Jacobian of the SIR field at the initial state
    pub jacobian: Vec<f64>,
    pub eigenvalues: Vec<ComplexNumber>,
}

/// Classifies whether an outbreak grows or dies out near t = 0.
///
/// The Jacobian of (-aSI, aSI - bI, bI) with respect to (S, I, R) is
/// evaluated at the initial split and its eigenvalues computed; the sign
/// of alpha*S0 - beta (equivalently, r_number vs 1) decides the verdict.
pub fn outbreak_threshold(params: &SirParams) -> Result<ThresholdReport> {
    params.validate()?;
    if !(params.beta > 0.0) {
        bail!(
            "Threshold analysis needs a positive recovery rate, got {}.",
            params.beta
        );
    }

    let (a, b) = (params.alpha, params.beta);
    let (s, i) = (params.s0, params.i0);

    #[rustfmt::skip]
    let jacobian = vec![
        -a * i, -a * s,      0.0,
         a * i,  a * s - b,  0.0,
         0.0,    b,          0.0,
    ];

    let matrix = DMatrix::from_row_slice(3, 3, &jacobian);
    let eigenvalues = matrix
        .complex_eigenvalues()
        .iter()
        .map(|&lambda| ComplexNumber::from(lambda))
        .collect();

    let r_number = a * s / b;
    let growth_rate = a * s - b;

    Ok(ThresholdReport {
        r_number,
        growth_rate,
        epidemic: r_number > 1.0,
        jacobian,
        eigenvalues,
    })
}

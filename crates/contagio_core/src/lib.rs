/// The `contagio_core` crate is the numeric engine for the Contagio
/// epidemic-propagation study: infection spread across a network of
/// computing devices.
///
/// Key components:
/// - **Traits**: `Scalar` (numeric type abstraction), `RateLaw` /
///   `VectorField` (scalar and vector ODE right-hand sides), `Steppable`
///   (solvers).
/// - **Solvers**: fixed-step RK4 over arbitrary time grids and an
///   adaptive RKF4(5) integrator sampled at requested times.
/// - **Models**: piecewise workday, campaign-decay, saturating and
///   logistic infection laws; linear models A/B and the nonlinear SIR
///   system.
/// - **Milestones**: peak, crossing, threshold-approach and
///   closest-approach detection over computed series.
/// - **Analysis**: outbreak-threshold classification via the SIR
///   Jacobian's eigenvalues.
/// - **Scenarios**: pure computation entry points consumed by the
///   report crate.
pub mod analysis;
pub mod config;
pub mod grid;
pub mod milestones;
pub mod models;
pub mod scenario;
pub mod solvers;
pub mod traits;

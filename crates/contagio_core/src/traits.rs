use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for types that can be used as scalars in the propagation models.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// A scalar rate law: the right-hand side of dI/dt = f(t, I).
///
/// Implementors are the single-compartment infection models (piecewise
/// workday rate, campaign decay, state-dependent saturation).
pub trait RateLaw<T: Scalar> {
    /// Evaluates the infection rate at time t and infected count i.
    fn rate(&self, t: T, i: T) -> T;
}

/// An n-dimensional vector field: the right-hand side of dy/dt = f(t, y).
///
/// t: current time
/// y: current state
/// out: buffer to write the derivative into
pub trait VectorField<T: Scalar> {
    /// Returns the dimension of the state space.
    fn dimension(&self) -> usize;

    /// Evaluates the vector field.
    fn apply(&self, t: T, y: &[T], out: &mut [T]);
}

/// A trait for solvers that can step a system forward.
pub trait Steppable<T: Scalar> {
    /// Performs one step of size dt.
    /// t: current time (updated after step)
    /// state: current state (updated after step)
    /// dt: step size
    fn step(&mut self, field: &impl VectorField<T>, t: &mut T, state: &mut [T], dt: T);
}

use crate::broadcast::Broadcast;
use crate::device::Device;
use crate::float::Float;

/// Performs one step of plain gradient descent.
///
/// # Formula
///
/// $$ var := var - \alpha \cdot \delta $$
///
/// # Arguments
///
/// - `d`: Device running the pass
/// - `var`: Parameters, updated in place
/// - `alpha`: Learning rate (size 1, broadcast)
/// - `delta`: Gradient, same length as `var`
pub fn apply_gradient_descent<D: Device, T: Float>(d: &D, var: &mut [T], alpha: &[T], delta: &[T]) {
    let alpha = Broadcast::new(alpha, delta.len());
    d.map(var, |i, v| v - alpha.at(i) * delta[i]);
}

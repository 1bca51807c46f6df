use crate::broadcast::Broadcast;
use crate::device::Device;
use crate::float::Float;

/// Performs one RMSProp step with momentum.
///
/// ```text
/// ms  := ms + (1 - rho) · (grad² - ms)
/// mom := mom · momentum + lr · grad / sqrt(ε + ms)
/// var := var - mom
/// ```
///
/// Each line reads the buffer written by the previous one.
#[allow(clippy::too_many_arguments)]
pub fn apply_rms_prop<D: Device, T: Float>(
    d: &D,
    var: &mut [T],
    ms: &mut [T],
    mom: &mut [T],
    lr: &[T],
    rho: &[T],
    momentum: &[T],
    epsilon: &[T],
    grad: &[T],
) {
    let n = grad.len();
    let one = T::one();
    let lr = Broadcast::new(lr, n);
    let rho = Broadcast::new(rho, n);
    let momentum = Broadcast::new(momentum, n);
    let eps = Broadcast::new(epsilon, n);

    d.map(ms, |i, s| s + (one - rho.at(i)) * (grad[i].square() - s));

    let ms = &*ms;
    d.map(mom, |i, p| p * momentum.at(i) + lr.at(i) * grad[i] / (eps.at(i) + ms[i]).sqrt());

    let mom = &*mom;
    d.map(var, |i, v| v - mom[i]);
}

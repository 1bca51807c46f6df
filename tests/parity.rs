//! Every rule must give the same answer on every backend and precision.

use briny_optim::approx::{approx_eq_within, ApproxEquality};
use briny_optim::backend::Backend;
use briny_optim::float::Float;
use briny_optim::ops::dispatch::*;
use briny_optim::tensors::Tensor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Larger than the parallel grain so rayon actually splits the work.
const N: usize = 10_000;
const COLS: usize = 40;

struct Inputs {
    var: Vec<f64>,
    grad: Vec<f64>,
    /// Strictly positive, used where a rule divides by its state.
    positive: Vec<f64>,
    signed: Vec<f64>,
}

impl Inputs {
    fn random(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut sample = |lo: f64, hi: f64| -> Vec<f64> {
            (0..N).map(|_| rng.random_range(lo..hi)).collect()
        };
        let var = sample(-2.0, 2.0);
        let grad = sample(0.1, 1.0)
            .into_iter()
            .zip(sample(-1.0, 1.0))
            .map(|(g, sign)| if sign < 0.0 { -g } else { g })
            .collect();
        let positive = sample(0.1, 1.0);
        let signed = sample(-0.5, 0.5);
        Self {
            var,
            grad,
            positive,
            signed,
        }
    }

    fn tensor<T: Float>(data: &[f64]) -> Tensor<T> {
        Tensor::new(vec![data.len()], data.iter().map(|&x| T::from_f64(x)).collect())
    }
}

fn s<T: Float>(x: f64) -> Tensor<T> {
    Tensor::scalar(T::from_f64(x))
}

/// Runs every rule once on `backend` and returns all updated buffers, as `f64`.
fn run_all<T: Float>(backend: Backend, inputs: &Inputs) -> Vec<(&'static str, Vec<f64>)> {
    let t = |data: &[f64]| Inputs::tensor::<T>(data);
    let grad = t(&inputs.grad);
    let mut out = Vec::new();
    let mut keep = |name: &'static str, t: &Tensor<T>| {
        out.push((name, t.data.iter().map(|x| x.into_f64()).collect::<Vec<_>>()));
    };

    let mut var = t(&inputs.var);
    apply_gradient_descent_on(backend, &mut var, &s(0.1), &grad).unwrap();
    keep("gradient_descent/var", &var);

    let (mut var, mut accum) = (t(&inputs.var), t(&inputs.positive));
    apply_adagrad_on(backend, &mut var, &mut accum, &s(0.1), &grad).unwrap();
    keep("adagrad/var", &var);
    keep("adagrad/accum", &accum);

    let (mut var, mut ag, mut au) = (t(&inputs.var), t(&inputs.signed), t(&inputs.positive));
    apply_adadelta_on(backend, &mut var, &mut ag, &mut au, &s(1.0), &s(0.95), &s(1e-6), &grad)
        .unwrap();
    keep("adadelta/var", &var);
    keep("adadelta/accum_grad", &ag);
    keep("adadelta/accum_update", &au);

    let (mut var, mut accum) = (t(&inputs.var), t(&inputs.signed));
    apply_momentum_on(backend, &mut var, &mut accum, &s(0.1), &grad, &s(0.9)).unwrap();
    keep("momentum/var", &var);
    keep("momentum/accum", &accum);

    let (mut var, mut m, mut v) = (t(&inputs.var), t(&inputs.signed), t(&inputs.positive));
    apply_adam_on(
        backend,
        &mut var,
        &mut m,
        &mut v,
        &s(0.729),
        &s(0.997),
        &s(0.01),
        &s(0.9),
        &s(0.999),
        &s(1e-8),
        &grad,
    )
    .unwrap();
    keep("adam/var", &var);
    keep("adam/m", &m);
    keep("adam/v", &v);

    let (mut var, mut ms, mut mom) = (t(&inputs.var), t(&inputs.positive), t(&inputs.signed));
    apply_rms_prop_on(
        backend,
        &mut var,
        &mut ms,
        &mut mom,
        &s(0.01),
        &s(0.9),
        &s(0.5),
        &s(1e-8),
        &grad,
    )
    .unwrap();
    keep("rms_prop/var", &var);
    keep("rms_prop/ms", &ms);
    keep("rms_prop/mom", &mom);

    let mut var = Tensor::new(vec![N / COLS, COLS], t(&inputs.var).data);
    apply_max_weight_col_norm_on(backend, &mut var, 100.0).unwrap();
    keep("max_weight_col_norm/var", &var);

    out
}

#[test]
fn test_sequential_and_parallel_are_bit_identical() {
    let inputs = Inputs::random(7);
    let seq = run_all::<f64>(Backend::Sequential, &inputs);
    let par = run_all::<f64>(Backend::Cpu, &inputs);
    for ((name, a), (_, b)) in seq.iter().zip(&par) {
        assert_eq!(a, b, "{name} differs between sequential and parallel");
    }

    let seq = run_all::<f32>(Backend::Sequential, &inputs);
    let par = run_all::<f32>(Backend::Cpu, &inputs);
    assert_eq!(seq, par);
}

#[test]
fn test_f32_and_f64_agree() {
    let inputs = Inputs::random(42);
    let single = run_all::<f32>(Backend::Cpu, &inputs);
    let double = run_all::<f64>(Backend::Cpu, &inputs);
    for ((name, a), (_, b)) in single.iter().zip(&double) {
        assert!(
            approx_eq_within(a, b, ApproxEquality::Relative),
            "{name}: float32 and float64 results diverge"
        );
    }
}

#[test]
fn test_column_norm_only_touches_large_columns() {
    let inputs = Inputs::random(3);
    let before = Tensor::new(vec![N / COLS, COLS], inputs.var.clone());
    let mut after = before.clone();
    apply_max_weight_col_norm_on(Backend::Cpu, &mut after, 100.0).unwrap();

    let rows = N / COLS;
    for j in 0..COLS {
        let sq: f64 = (0..rows).map(|r| before.data[r * COLS + j].powi(2)).sum();
        let scale = if sq > 100.0 { sq } else { 1.0 };
        for r in 0..rows {
            let k = r * COLS + j;
            assert!((after.data[k] - before.data[k] / scale).abs() < 1e-12);
        }
    }
}

#[cfg(feature = "wgpu")]
#[test]
fn test_gpu_matches_cpu() {
    let _ = env_logger::builder().is_test(true).try_init();
    if !briny_optim::ops::wgpu::is_available() {
        eprintln!("no GPU adapter, skipping");
        return;
    }

    let inputs = Inputs::random(11);
    let gpu = run_all::<f32>(Backend::Wgpu, &inputs);
    let cpu = run_all::<f32>(Backend::Sequential, &inputs);
    for ((name, a), (_, b)) in gpu.iter().zip(&cpu) {
        assert!(
            approx_eq_within(a, b, ApproxEquality::Relative),
            "{name}: GPU and CPU results diverge"
        );
    }
}

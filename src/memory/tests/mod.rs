mod unidirectional;

use ndarray::Array2;
use rand::SeedableRng;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;

/// 单特征列`[T, 1]`
fn column(values: &[f64]) -> Array2<f64> {
    Array2::from_shape_vec((values.len(), 1), values.to_vec()).unwrap()
}

/// 固定种子的随机矩阵，值在[-1, 1]
fn random_matrix(rows: usize, cols: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let dist = Uniform::from(-1.0..=1.0);
    Array2::from_shape_simple_fn((rows, cols), || dist.sample(&mut rng))
}

/// `Σ weights ⊙ output`，用作有限差分检查的标量损失，其对output的梯度即weights
fn weighted_sum(output: &Array2<f64>, weights: &Array2<f64>) -> f64 {
    (output * weights).sum()
}

/// 对`param`的每个元素做中心差分，与解析梯度`analytic`逐元素比较
fn check_finite_difference<F>(param: &Array2<f64>, analytic: &Array2<f64>, loss: F)
where
    F: Fn(&Array2<f64>) -> f64,
{
    const EPS: f64 = 1e-4;
    assert_eq!(param.shape(), analytic.shape());
    for ((idx, _), &expected) in param.indexed_iter().zip(analytic.iter()) {
        let mut plus = param.clone();
        plus[idx] += EPS;
        let mut minus = param.clone();
        minus[idx] -= EPS;
        let numeric = (loss(&plus) - loss(&minus)) / (2.0 * EPS);
        approx::assert_abs_diff_eq!(numeric, expected, epsilon = 1e-6);
    }
}

/// 逐元素近似比较两个同形状矩阵
fn assert_all_close<T>(actual: &Array2<T>, expected: &Array2<T>, epsilon: T)
where
    T: approx::AbsDiffEq<Epsilon = T> + std::fmt::Debug + Copy,
{
    assert_eq!(actual.shape(), expected.shape());
    for (&a, &e) in actual.iter().zip(expected.iter()) {
        approx::assert_abs_diff_eq!(a, e, epsilon = epsilon);
    }
}

use super::{assert_all_close, check_finite_difference, column, random_matrix, weighted_sum};
use crate::assert_err;
use crate::errors::FsmnError;
use crate::memory::{KernelConfig, MemoryKernel, uni_memory_backward, uni_memory_forward};
use ndarray::{Array2, array};

#[test_log::test]
fn test_uni_forward_boundary_example() {
    let hidden = column(&[1.0, 2.0, 3.0]);
    let filter = array![[0.5], [0.25]];
    let memory = uni_memory_forward(&hidden, &filter, &[0, 1, 2]).unwrap();
    assert_eq!(memory, column(&[1.0, 2.5, 4.25]));
}

#[test]
fn test_uni_forward_truncation_counts_terms() {
    // 全1输入 + 各行权重互不相同（1、10、100），结果的每一位直接对应使用了哪些回看项
    let hidden = Array2::<f64>::ones((5, 1));
    let filter = array![[1.0], [10.0], [100.0]];

    // position比N小：step = position
    let memory = uni_memory_forward(&hidden, &filter, &[0, 0, 1, 1, 2]).unwrap();
    assert_eq!(memory, column(&[1.0, 1.0, 2.0, 2.0, 12.0]));

    // position超过N：step被截断为N=3
    let memory = uni_memory_forward(&hidden, &filter, &[0, 1, 2, 3, 4]).unwrap();
    assert_eq!(memory, column(&[1.0, 2.0, 12.0, 112.0, 112.0]));
}

#[test]
fn test_uni_forward_zero_filter_is_identity() {
    let hidden = random_matrix(6, 4, 1);
    let filter = Array2::<f64>::zeros((3, 4));
    let memory = uni_memory_forward(&hidden, &filter, &[0, 1, 2, 3, 4, 5]).unwrap();
    assert_eq!(memory, hidden);
}

#[test]
fn test_uni_forward_without_lookback() {
    // N=0：无论position为何，memory都等于hidden
    let hidden = random_matrix(4, 3, 2);
    let filter = Array2::<f64>::zeros((0, 3));
    let memory = uni_memory_forward(&hidden, &filter, &[7, 7, 7, 7]).unwrap();
    assert_eq!(memory, hidden);

    let grads = uni_memory_backward(&hidden, &hidden, &filter, &[7, 7, 7, 7]).unwrap();
    assert_eq!(grads.dhidden, hidden);
    assert_eq!(grads.dfilter.shape(), &[0, 3]);
}

#[test]
fn test_uni_forward_empty_sequence() {
    let hidden = Array2::<f32>::zeros((0, 3));
    let filter = Array2::<f32>::ones((2, 3));
    let memory = uni_memory_forward(&hidden, &filter, &[]).unwrap();
    assert_eq!(memory.shape(), &[0, 3]);

    let grads = uni_memory_backward(&hidden, &hidden, &filter, &[]).unwrap();
    assert_eq!(grads.dhidden.shape(), &[0, 3]);
    assert_eq!(grads.dfilter, Array2::<f32>::zeros((2, 3)));
}

#[test]
fn test_uni_forward_accepts_views_and_f32() {
    let hidden = array![[1.0f32, 10.0], [2.0, 20.0], [3.0, 30.0]];
    let filter = array![[0.5f32, 0.1]];
    let memory = uni_memory_forward(&hidden.view(), &filter.view(), &[0, 1, 1]).unwrap();
    let expected = array![[1.0f32, 10.0], [2.5, 21.0], [4.0, 32.0]];
    assert_all_close(&memory, &expected, 1e-6);
}

#[test_log::test]
fn test_uni_backward_boundary_example() {
    let hidden = column(&[1.0, 2.0, 3.0]);
    let filter = array![[0.5], [0.25]];
    let dmemory = column(&[1.0, 1.0, 1.0]);
    let grads = uni_memory_backward(&dmemory, &hidden, &filter, &[0, 1, 2]).unwrap();
    // dhidden[0] = 1 + 0.5(来自r=1) + 0.25(来自r=2)，dhidden[1] = 1 + 0.5(来自r=2)
    assert_eq!(grads.dhidden, column(&[1.75, 1.5, 1.0]));
    // dfilter[0] = hidden[0] + hidden[1]，dfilter[1] = hidden[0]
    assert_eq!(grads.dfilter, column(&[3.0, 1.0]));
}

#[test]
fn test_uni_backward_matches_finite_difference() {
    let (t, d, n) = (7, 3, 3);
    let hidden = random_matrix(t, d, 10);
    let filter = random_matrix(n, d, 11);
    let weights = random_matrix(t, d, 12);
    let position = [0, 1, 1, 3, 2, 5, 6];

    let grads = uni_memory_backward(&weights, &hidden, &filter, &position).unwrap();

    check_finite_difference(&hidden, &grads.dhidden, |h| {
        weighted_sum(&uni_memory_forward(h, &filter, &position).unwrap(), &weights)
    });
    check_finite_difference(&filter, &grads.dfilter, |f| {
        weighted_sum(&uni_memory_forward(&hidden, f, &position).unwrap(), &weights)
    });
}

#[test]
fn test_uni_backward_is_linear_in_upstream() {
    let (t, d, n) = (6, 2, 2);
    let hidden = random_matrix(t, d, 20);
    let filter = random_matrix(n, d, 21);
    let dmemory_a = random_matrix(t, d, 22);
    let dmemory_b = random_matrix(t, d, 23);
    let position = [0, 1, 2, 3, 4, 5];

    let whole = uni_memory_backward(&(&dmemory_a + &dmemory_b), &hidden, &filter, &position)
        .unwrap();
    let a = uni_memory_backward(&dmemory_a, &hidden, &filter, &position).unwrap();
    let b = uni_memory_backward(&dmemory_b, &hidden, &filter, &position).unwrap();
    assert_all_close(&whole.dhidden, &(a.dhidden + b.dhidden), 1e-12);
    assert_all_close(&whole.dfilter, &(a.dfilter + b.dfilter), 1e-12);
}

#[test]
fn test_uni_serial_and_parallel_agree() {
    let (t, d, n) = (64, 80, 4);
    let hidden = random_matrix(t, d, 30);
    let filter = random_matrix(n, d, 31);
    let dmemory = random_matrix(t, d, 32);
    let position: Vec<usize> = (0..t).map(|r| r % 6).collect();

    let serial = MemoryKernel::new(KernelConfig::serial());
    let parallel = MemoryKernel::new(KernelConfig::always_parallel());

    assert_eq!(
        serial.uni_memory_forward(&hidden, &filter, &position).unwrap(),
        parallel.uni_memory_forward(&hidden, &filter, &position).unwrap()
    );
    assert_eq!(
        serial
            .uni_memory_backward(&dmemory, &hidden, &filter, &position)
            .unwrap(),
        parallel
            .uni_memory_backward(&dmemory, &hidden, &filter, &position)
            .unwrap()
    );
}

#[test]
fn test_uni_filter_column_mismatch() {
    let hidden = Array2::<f64>::zeros((3, 2));
    let filter = Array2::<f64>::zeros((2, 3));
    let result = uni_memory_forward(&hidden, &filter, &[0, 1, 2]);
    assert_err!(result, FsmnError::ShapeMismatch([2, 2], [2, 3]));

    let result = uni_memory_backward(&hidden, &hidden, &filter, &[0, 1, 2]);
    assert_err!(result, FsmnError::ShapeMismatch([2, 2], [2, 3]));
}

#[test]
fn test_uni_upstream_shape_mismatch() {
    let hidden = Array2::<f64>::zeros((3, 2));
    let dmemory = Array2::<f64>::zeros((2, 2));
    let filter = Array2::<f64>::zeros((1, 2));
    let result = uni_memory_backward(&dmemory, &hidden, &filter, &[0, 1, 1]);
    assert_err!(result, FsmnError::ShapeMismatch([3, 2], [2, 2]));
}

#[test]
fn test_uni_position_length_mismatch() {
    let hidden = Array2::<f64>::zeros((3, 2));
    let filter = Array2::<f64>::zeros((1, 2));
    let result = uni_memory_forward(&hidden, &filter, &[0, 1]);
    assert_err!(result, FsmnError::ShapeMismatch([3], [2]));
}

#[test]
fn test_uni_position_out_of_range() {
    let hidden = Array2::<f64>::zeros((3, 1));
    let filter = Array2::<f64>::zeros((2, 1));
    // r=1 处 min(2, 2) = 2 > 1，会读到hidden[-1]
    let result = uni_memory_forward(&hidden, &filter, &[0, 2, 2]);
    assert_err!(
        result,
        FsmnError::PositionOutOfRange {
            name: "position",
            row: 1,
            step: 2,
            max: 1
        }
    );
    let result = uni_memory_backward(&hidden, &hidden, &filter, &[0, 2, 2]);
    assert_err!(result, FsmnError::PositionOutOfRange { row: 1, .. });

    // 截断后不越界的超大position是合法的
    let filter = Array2::<f64>::zeros((1, 1));
    assert!(uni_memory_forward(&hidden, &filter, &[0, 9, 9]).is_ok());
}

#[test]
fn test_uni_non_finite_values_propagate() {
    let hidden = column(&[f64::NAN, 1.0, 2.0]);
    let filter = array![[1.0]];
    let memory = uni_memory_forward(&hidden, &filter, &[0, 1, 1]).unwrap();
    assert!(memory[[0, 0]].is_nan());
    assert!(memory[[1, 0]].is_nan());
    assert_eq!(memory[[2, 0]], 3.0);
}

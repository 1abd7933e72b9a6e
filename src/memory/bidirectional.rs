/*
 * @Date         : 2026-10-12
 * @Description  : 双向（回看 + 前看）记忆
 *
 * 前向：
 *   N1 = bfilter.rows - 1，N2 = ffilter.rows
 *   bstep = min(bposition[r], N1)，fstep = min(fposition[r], N2)
 *   memory[r,c] = hidden[r,c] + bfilter[0,c] * hidden[r,c]
 *               + Σ_{i<bstep} bfilter[i+1,c] * hidden[r-i-1,c]
 *               + Σ_{i<fstep} ffilter[i,c]   * hidden[r+i+1,c]
 *
 * 注意：当前步既以权重1直接加入，又由`bfilter`第0行单独加权一次。
 * 这是按 FSMN 论文的公式实现的（与单向版本沿用的 vFSMN 写法不同），不要“修正”成只加一次。
 * `ffilter`没有当前步行，第i行对应前看i+1步。
 */

use super::window::{check_position_len, lookahead_steps, lookback_steps};
use super::{MemoryKernel, check_filter, check_upstream};
use crate::errors::FsmnError;
use crate::utils::traits::float::MemoryFloat;
use log::{debug, trace};
use ndarray::{Array2, ArrayBase, ArrayViewMut1, Data, Ix2, Zip};

/// 双向记忆反向传播的结果
#[derive(Debug, Clone, PartialEq)]
pub struct BiMemoryGrads<T> {
    /// 对`hidden`的梯度，形状`T×D`
    pub dhidden: Array2<T>,
    /// 对`bfilter`的梯度，形状`(N1+1)×D`
    pub dbfilter: Array2<T>,
    /// 对`ffilter`的梯度，形状`N2×D`
    pub dffilter: Array2<T>,
}

/// 双向记忆的公共输入检查，返回每步的(回看步数, 前看步数)
fn bi_steps<S1: Data, S2: Data>(
    bfilter: &ArrayBase<S1, Ix2>,
    ffilter: &ArrayBase<S2, Ix2>,
    bposition: &[usize],
    fposition: &[usize],
    (t, d): (usize, usize),
) -> Result<(Vec<usize>, Vec<usize>), FsmnError> {
    if bfilter.nrows() == 0 {
        return Err(FsmnError::ShapeMismatch {
            expected: vec![1, d],
            got: bfilter.shape().to_vec(),
            message: "bfilter至少需要1行（第0行为当前步的权重）".to_string(),
        });
    }
    check_filter("bfilter", bfilter, d)?;
    check_filter("ffilter", ffilter, d)?;
    check_position_len("bposition", bposition, t)?;
    check_position_len("fposition", fposition, t)?;
    let bsteps = lookback_steps("bposition", bposition, bfilter.nrows() - 1)?;
    let fsteps = lookahead_steps("fposition", fposition, ffilter.nrows())?;
    Ok((bsteps, fsteps))
}

impl MemoryKernel {
    /// 双向记忆前向
    ///
    /// # 参数
    /// - `hidden`: 输入序列，形状`[T, D]`
    /// - `bfilter`: 当前步及回看权重，形状`[N1+1, D]`
    /// - `ffilter`: 前看权重，形状`[N2, D]`
    /// - `bposition`/`fposition`: 长度为`T`，每一步可回看/前看的深度
    pub fn bi_memory_forward<T, S1, S2, S3>(
        &self,
        hidden: &ArrayBase<S1, Ix2>,
        bfilter: &ArrayBase<S2, Ix2>,
        ffilter: &ArrayBase<S3, Ix2>,
        bposition: &[usize],
        fposition: &[usize],
    ) -> Result<Array2<T>, FsmnError>
    where
        T: MemoryFloat,
        S1: Data<Elem = T>,
        S2: Data<Elem = T>,
        S3: Data<Elem = T>,
    {
        let (t, d) = hidden.dim();
        let (bsteps, fsteps) = bi_steps(bfilter, ffilter, bposition, fposition, (t, d))?;
        debug!(
            "双向记忆前向：T={t}, D={d}, N1={}, N2={}",
            bfilter.nrows() - 1,
            ffilter.nrows()
        );

        let hidden = hidden.view();
        let bfilter = bfilter.view();
        let ffilter = ffilter.view();
        let mut memory = Array2::zeros((t, d));
        let element = |(r, c): (usize, usize), out: &mut T| {
            let current = hidden[[r, c]];
            let mut acc = current + bfilter[[0, c]] * current;
            for i in 0..bsteps[r] {
                acc += bfilter[[i + 1, c]] * hidden[[r - i - 1, c]];
            }
            for i in 0..fsteps[r] {
                acc += ffilter[[i, c]] * hidden[[r + i + 1, c]];
            }
            *out = acc;
        };

        let zip = Zip::indexed(&mut memory);
        if self.config.use_parallel(t * d) {
            trace!(
                "双向记忆前向：按元素并行，线程数={}",
                rayon::current_num_threads()
            );
            zip.par_for_each(element);
        } else {
            zip.for_each(element);
        }
        Ok(memory)
    }

    /// 双向记忆反向
    ///
    /// 与单向版本相同的散射累加方式，额外多出前看路径与`dffilter`：
    /// - dhidden[r,c] += (1 + bfilter[0,c]) * dmemory[r,c]
    /// - dhidden[r-i-1,c] += bfilter[i+1,c] * dmemory[r,c]，dhidden[r+i+1,c] += ffilter[i,c] * dmemory[r,c]
    /// - dbfilter[0,c] += hidden[r,c] * dmemory[r,c]
    /// - dbfilter[i+1,c] += hidden[r-i-1,c] * dmemory[r,c]，dffilter[i,c] += hidden[r+i+1,c] * dmemory[r,c]
    pub fn bi_memory_backward<T, S1, S2, S3, S4>(
        &self,
        dmemory: &ArrayBase<S1, Ix2>,
        hidden: &ArrayBase<S2, Ix2>,
        bfilter: &ArrayBase<S3, Ix2>,
        ffilter: &ArrayBase<S4, Ix2>,
        bposition: &[usize],
        fposition: &[usize],
    ) -> Result<BiMemoryGrads<T>, FsmnError>
    where
        T: MemoryFloat,
        S1: Data<Elem = T>,
        S2: Data<Elem = T>,
        S3: Data<Elem = T>,
        S4: Data<Elem = T>,
    {
        let (t, d) = hidden.dim();
        check_upstream(dmemory, hidden)?;
        let (bsteps, fsteps) = bi_steps(bfilter, ffilter, bposition, fposition, (t, d))?;
        debug!(
            "双向记忆反向：T={t}, D={d}, N1={}, N2={}",
            bfilter.nrows() - 1,
            ffilter.nrows()
        );

        let dmemory = dmemory.view();
        let hidden = hidden.view();
        let bfilter = bfilter.view();
        let ffilter = ffilter.view();
        let mut dhidden = Array2::zeros((t, d));
        let mut dbfilter = Array2::zeros(bfilter.raw_dim());
        let mut dffilter = Array2::zeros(ffilter.raw_dim());
        let column = |c: usize,
                      mut dh: ArrayViewMut1<T>,
                      mut dbf: ArrayViewMut1<T>,
                      mut dff: ArrayViewMut1<T>| {
            let one = T::one();
            for r in 0..t {
                let grad = dmemory[[r, c]];
                // 当前步：恒等项 + bfilter第0行加权项
                dh[r] += (one + bfilter[[0, c]]) * grad;
                dbf[0] += hidden[[r, c]] * grad;
                for i in 0..bsteps[r] {
                    dh[r - i - 1] += bfilter[[i + 1, c]] * grad;
                    dbf[i + 1] += hidden[[r - i - 1, c]] * grad;
                }
                for i in 0..fsteps[r] {
                    dh[r + i + 1] += ffilter[[i, c]] * grad;
                    dff[i] += hidden[[r + i + 1, c]] * grad;
                }
            }
        };

        let zip = Zip::indexed(dhidden.columns_mut())
            .and(dbfilter.columns_mut())
            .and(dffilter.columns_mut());
        if self.config.use_parallel(t * d) {
            trace!(
                "双向记忆反向：按特征列并行，线程数={}",
                rayon::current_num_threads()
            );
            zip.par_for_each(column);
        } else {
            zip.for_each(column);
        }
        Ok(BiMemoryGrads {
            dhidden,
            dbfilter,
            dffilter,
        })
    }
}

/// 以默认执行策略计算双向记忆前向，见[`MemoryKernel::bi_memory_forward`]
pub fn bi_memory_forward<T, S1, S2, S3>(
    hidden: &ArrayBase<S1, Ix2>,
    bfilter: &ArrayBase<S2, Ix2>,
    ffilter: &ArrayBase<S3, Ix2>,
    bposition: &[usize],
    fposition: &[usize],
) -> Result<Array2<T>, FsmnError>
where
    T: MemoryFloat,
    S1: Data<Elem = T>,
    S2: Data<Elem = T>,
    S3: Data<Elem = T>,
{
    MemoryKernel::default().bi_memory_forward(hidden, bfilter, ffilter, bposition, fposition)
}

/// 以默认执行策略计算双向记忆反向，见[`MemoryKernel::bi_memory_backward`]
pub fn bi_memory_backward<T, S1, S2, S3, S4>(
    dmemory: &ArrayBase<S1, Ix2>,
    hidden: &ArrayBase<S2, Ix2>,
    bfilter: &ArrayBase<S3, Ix2>,
    ffilter: &ArrayBase<S4, Ix2>,
    bposition: &[usize],
    fposition: &[usize],
) -> Result<BiMemoryGrads<T>, FsmnError>
where
    T: MemoryFloat,
    S1: Data<Elem = T>,
    S2: Data<Elem = T>,
    S3: Data<Elem = T>,
    S4: Data<Elem = T>,
{
    MemoryKernel::default().bi_memory_backward(dmemory, hidden, bfilter, ffilter, bposition, fposition)
}

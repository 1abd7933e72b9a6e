/*
 * @Date         : 2026-10-12
 * @Description  : 单向（因果、只回看）记忆
 *
 * 前向：
 *   step = min(position[r], N)
 *   memory[r,c] = hidden[r,c] + Σ_{i<step} filter[i,c] * hidden[r-i-1,c]
 * 当前步`hidden[r,c]`始终以权重1直接加入，滤波器第i行对应回看i+1步。
 */

use super::window::{check_position_len, lookback_steps};
use super::{MemoryKernel, check_filter, check_upstream};
use crate::errors::FsmnError;
use crate::utils::traits::float::MemoryFloat;
use log::{debug, trace};
use ndarray::{Array2, ArrayBase, ArrayViewMut1, Data, Ix2, Zip};

/// 单向记忆反向传播的结果
#[derive(Debug, Clone, PartialEq)]
pub struct UniMemoryGrads<T> {
    /// 对`hidden`的梯度，形状`T×D`
    pub dhidden: Array2<T>,
    /// 对`filter`的梯度，形状`N×D`
    pub dfilter: Array2<T>,
}

impl MemoryKernel {
    /// 单向记忆前向
    ///
    /// # 参数
    /// - `hidden`: 输入序列，形状`[T, D]`
    /// - `filter`: 回看权重，形状`[N, D]`
    /// - `position`: 长度为`T`，每一步可回看的深度
    ///
    /// # 返回
    /// 新分配的`memory`，形状`[T, D]`
    pub fn uni_memory_forward<T, S1, S2>(
        &self,
        hidden: &ArrayBase<S1, Ix2>,
        filter: &ArrayBase<S2, Ix2>,
        position: &[usize],
    ) -> Result<Array2<T>, FsmnError>
    where
        T: MemoryFloat,
        S1: Data<Elem = T>,
        S2: Data<Elem = T>,
    {
        let (t, d) = hidden.dim();
        let n = filter.nrows();
        check_filter("filter", filter, d)?;
        check_position_len("position", position, t)?;
        let steps = lookback_steps("position", position, n)?;
        debug!("单向记忆前向：T={t}, D={d}, N={n}");

        let hidden = hidden.view();
        let filter = filter.view();
        let mut memory = Array2::zeros((t, d));
        let element = |(r, c): (usize, usize), out: &mut T| {
            let mut acc = hidden[[r, c]];
            for i in 0..steps[r] {
                acc += filter[[i, c]] * hidden[[r - i - 1, c]];
            }
            *out = acc;
        };

        let zip = Zip::indexed(&mut memory);
        if self.config.use_parallel(t * d) {
            trace!("单向记忆前向：按元素并行，线程数={}", rayon::current_num_threads());
            zip.par_for_each(element);
        } else {
            zip.for_each(element);
        }
        Ok(memory)
    }

    /// 单向记忆反向
    ///
    /// 对于 memory = f(hidden, filter):
    /// - dhidden[r,c] += dmemory[r,c]，且对窗口内每个i：dhidden[r-i-1,c] += filter[i,c] * dmemory[r,c]
    /// - dfilter[i,c] += hidden[r-i-1,c] * dmemory[r,c]
    ///
    /// 同一列内的散射累加只由一个任务完成，因此只在特征维上并行。
    pub fn uni_memory_backward<T, S1, S2, S3>(
        &self,
        dmemory: &ArrayBase<S1, Ix2>,
        hidden: &ArrayBase<S2, Ix2>,
        filter: &ArrayBase<S3, Ix2>,
        position: &[usize],
    ) -> Result<UniMemoryGrads<T>, FsmnError>
    where
        T: MemoryFloat,
        S1: Data<Elem = T>,
        S2: Data<Elem = T>,
        S3: Data<Elem = T>,
    {
        let (t, d) = hidden.dim();
        let n = filter.nrows();
        check_upstream(dmemory, hidden)?;
        check_filter("filter", filter, d)?;
        check_position_len("position", position, t)?;
        let steps = lookback_steps("position", position, n)?;
        debug!("单向记忆反向：T={t}, D={d}, N={n}");

        let dmemory = dmemory.view();
        let hidden = hidden.view();
        let filter = filter.view();
        let mut dhidden = Array2::zeros((t, d));
        let mut dfilter = Array2::zeros((n, d));
        let column = |c: usize, mut dh: ArrayViewMut1<T>, mut df: ArrayViewMut1<T>| {
            for r in 0..t {
                let grad = dmemory[[r, c]];
                dh[r] += grad;
                for i in 0..steps[r] {
                    dh[r - i - 1] += filter[[i, c]] * grad;
                    df[i] += hidden[[r - i - 1, c]] * grad;
                }
            }
        };

        let zip = Zip::indexed(dhidden.columns_mut()).and(dfilter.columns_mut());
        if self.config.use_parallel(t * d) {
            trace!("单向记忆反向：按特征列并行，线程数={}", rayon::current_num_threads());
            zip.par_for_each(column);
        } else {
            zip.for_each(column);
        }
        Ok(UniMemoryGrads { dhidden, dfilter })
    }
}

/// 以默认执行策略计算单向记忆前向，见[`MemoryKernel::uni_memory_forward`]
pub fn uni_memory_forward<T, S1, S2>(
    hidden: &ArrayBase<S1, Ix2>,
    filter: &ArrayBase<S2, Ix2>,
    position: &[usize],
) -> Result<Array2<T>, FsmnError>
where
    T: MemoryFloat,
    S1: Data<Elem = T>,
    S2: Data<Elem = T>,
{
    MemoryKernel::default().uni_memory_forward(hidden, filter, position)
}

/// 以默认执行策略计算单向记忆反向，见[`MemoryKernel::uni_memory_backward`]
pub fn uni_memory_backward<T, S1, S2, S3>(
    dmemory: &ArrayBase<S1, Ix2>,
    hidden: &ArrayBase<S2, Ix2>,
    filter: &ArrayBase<S3, Ix2>,
    position: &[usize],
) -> Result<UniMemoryGrads<T>, FsmnError>
where
    T: MemoryFloat,
    S1: Data<Elem = T>,
    S2: Data<Elem = T>,
    S3: Data<Elem = T>,
{
    MemoryKernel::default().uni_memory_backward(dmemory, hidden, filter, position)
}

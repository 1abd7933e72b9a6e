/*
 * @Date         : 2026-10-12
 * @Description  : FSMN 记忆模块的计算核
 *
 * 包含两个结构平行的部分：
 * - 单向（只回看）记忆：`memory = f(hidden, filter, position)`
 * - 双向（回看 + 前看）记忆：`memory = f(hidden, bfilter, ffilter, bposition, fposition)`
 * 每个部分都有前向与反向两个纯函数，输出张量均为新分配且以0初始化。
 *
 * 并行策略：
 * - 前向：按(时间步, 特征)逐元素并行，元素之间无依赖
 * - 反向：只在特征维上并行，同一列内跨时间步的散射累加（scatter-add）串行完成
 */

mod bidirectional;
mod config;
mod unidirectional;
mod window;

#[cfg(test)]
mod tests;

pub use bidirectional::{BiMemoryGrads, bi_memory_backward, bi_memory_forward};
pub use config::{MemoryConfig, MemoryFilters, uniform_filter};
pub use unidirectional::{UniMemoryGrads, uni_memory_backward, uni_memory_forward};
pub use window::{SequencePositions, positions_from_lengths, truncated_step};

use crate::errors::FsmnError;
use ndarray::{ArrayBase, Data, Ix2};
use serde::{Deserialize, Serialize};

/// 计算核的执行策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// 是否允许使用 Rayon 并行
    pub parallel: bool,
    /// 元素数（`T*D`）达到该值才走并行路径
    pub parallel_threshold: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            parallel_threshold: 4096,
        }
    }
}

impl KernelConfig {
    /// 始终串行执行
    pub const fn serial() -> Self {
        Self {
            parallel: false,
            parallel_threshold: usize::MAX,
        }
    }

    /// 始终并行执行（不论输入多小）
    pub const fn always_parallel() -> Self {
        Self {
            parallel: true,
            parallel_threshold: 0,
        }
    }

    pub const fn use_parallel(&self, elements: usize) -> bool {
        self.parallel && elements >= self.parallel_threshold
    }

    pub fn to_json(&self) -> Result<String, FsmnError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, FsmnError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// 带执行策略的记忆计算核。
/// 本身不持有任何中间结果，同一个实例可在多个线程中同时使用。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryKernel {
    config: KernelConfig,
}

impl MemoryKernel {
    pub const fn new(config: KernelConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> &KernelConfig {
        &self.config
    }
}

/// 检查滤波器的列数是否等于`hidden`的特征维数`d`
fn check_filter<S: Data>(
    name: &str,
    filter: &ArrayBase<S, Ix2>,
    d: usize,
) -> Result<(), FsmnError> {
    if filter.ncols() != d {
        return Err(FsmnError::ShapeMismatch {
            expected: vec![filter.nrows(), d],
            got: filter.shape().to_vec(),
            message: format!("{name}的列数必须等于hidden的特征维数{d}"),
        });
    }
    Ok(())
}

/// 检查上游梯度`dmemory`与`hidden`形状是否一致
fn check_upstream<S1: Data, S2: Data>(
    dmemory: &ArrayBase<S1, Ix2>,
    hidden: &ArrayBase<S2, Ix2>,
) -> Result<(), FsmnError> {
    if dmemory.shape() != hidden.shape() {
        return Err(FsmnError::ShapeMismatch {
            expected: hidden.shape().to_vec(),
            got: dmemory.shape().to_vec(),
            message: "dmemory的形状必须与hidden一致".to_string(),
        });
    }
    Ok(())
}

//! # FSMN Memory
//!
//! `fsmn_memory`实现前馈序列记忆网络（FSMN）记忆模块的计算核：
//! 对序列中的每个时间步，按逐步可变长度的窗口，把当前步及前后若干步的隐状态加权求和。
//!
//! - 单向记忆（只回看）：[`uni_memory_forward`]、[`uni_memory_backward`]
//! - 双向记忆（回看 + 前看）：[`bi_memory_forward`]、[`bi_memory_backward`]
//!
//! 四个例程都是无状态的纯函数，可以在任意线程中直接调用；
//! 训练循环、自动微分图与层的注册都不在本库范围内，由调用方负责。

pub mod errors;
pub mod memory;
pub mod utils;

pub use errors::FsmnError;
pub use memory::{
    BiMemoryGrads, KernelConfig, MemoryConfig, MemoryFilters, MemoryKernel, SequencePositions,
    UniMemoryGrads, bi_memory_backward, bi_memory_forward, positions_from_lengths,
    truncated_step, uni_memory_backward, uni_memory_forward, uniform_filter,
};
pub use utils::traits::float::MemoryFloat;

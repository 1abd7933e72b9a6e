/*
 * @Date         : 2026-10-13
 * @Description  : 记忆模块的滤波器几何配置与随机初始化
 */

use crate::errors::FsmnError;
use crate::utils::traits::float::MemoryFloat;
use ndarray::Array2;
use rand::Rng;
use rand::distributions::uniform::SampleUniform;
use rand::distributions::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

/// 记忆模块的滤波器阶数配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// 回看阶数（单向为N，双向为N1）
    pub lookback_order: usize,
    /// 前看阶数N2，仅双向有效
    #[serde(default)]
    pub lookahead_order: usize,
    #[serde(default)]
    pub bidirectional: bool,
}

/// 按[`MemoryConfig`]初始化得到的滤波器
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MemoryFilters<T> {
    Unidirectional {
        filter: Array2<T>,
    },
    Bidirectional {
        bfilter: Array2<T>,
        ffilter: Array2<T>,
    },
}

impl MemoryConfig {
    pub const fn unidirectional(lookback_order: usize) -> Self {
        Self {
            lookback_order,
            lookahead_order: 0,
            bidirectional: false,
        }
    }

    pub const fn bidirectional(lookback_order: usize, lookahead_order: usize) -> Self {
        Self {
            lookback_order,
            lookahead_order,
            bidirectional: true,
        }
    }

    pub fn validate(&self) -> Result<(), FsmnError> {
        if !self.bidirectional && self.lookahead_order != 0 {
            return Err(FsmnError::Config(format!(
                "单向记忆不支持前看，lookahead_order须为0，实际为{}",
                self.lookahead_order
            )));
        }
        Ok(())
    }

    /// 特征维数为`dim`时各滤波器的形状。
    /// 单向：`[[N, D]]`；双向：`[[N1+1, D], [N2, D]]`（bfilter多出的第0行为当前步权重）
    pub fn filter_shapes(&self, dim: usize) -> Vec<[usize; 2]> {
        if self.bidirectional {
            vec![
                [self.lookback_order + 1, dim],
                [self.lookahead_order, dim],
            ]
        } else {
            vec![[self.lookback_order, dim]]
        }
    }

    /// 在`[min, max]`闭区间内均匀随机初始化全部滤波器
    pub fn init_filters<T, R>(
        &self,
        dim: usize,
        min: T,
        max: T,
        rng: &mut R,
    ) -> Result<MemoryFilters<T>, FsmnError>
    where
        T: MemoryFloat + SampleUniform,
        R: Rng + ?Sized,
    {
        self.validate()?;
        let filters = if self.bidirectional {
            MemoryFilters::Bidirectional {
                bfilter: uniform_filter(self.lookback_order + 1, dim, min, max, rng)?,
                ffilter: uniform_filter(self.lookahead_order, dim, min, max, rng)?,
            }
        } else {
            MemoryFilters::Unidirectional {
                filter: uniform_filter(self.lookback_order, dim, min, max, rng)?,
            }
        };
        Ok(filters)
    }

    pub fn to_json(&self) -> Result<String, FsmnError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 从 JSON 解析并校验配置
    pub fn from_json(json: &str) -> Result<Self, FsmnError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

/// 创建形状为`[rows, dim]`的随机滤波器，其值在`[min, max]`的闭区间
pub fn uniform_filter<T, R>(
    rows: usize,
    dim: usize,
    min: T,
    max: T,
    rng: &mut R,
) -> Result<Array2<T>, FsmnError>
where
    T: MemoryFloat + SampleUniform,
    R: Rng + ?Sized,
{
    if !(min.is_finite() && max.is_finite()) || min > max {
        return Err(FsmnError::Config(format!(
            "随机区间无效：min={min:?}、max={max:?}须为有限值且min≤max"
        )));
    }
    let dist = Uniform::from(min..=max);
    Ok(Array2::from_shape_simple_fn((rows, dim), || dist.sample(rng)))
}

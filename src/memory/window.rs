/*
 * @Date         : 2026-10-12
 * @Description  : 记忆窗口的截断规则与位置数组
 *
 * 前向与反向共用这里的截断逻辑：`step = min(position[r], N)`，
 * 同一组输入下二者逐行得到的窗口必须完全一致。
 */

use crate::errors::FsmnError;

/// 将名义阶数`order`截断到第`r`步实际可用的深度`position`
#[inline]
pub const fn truncated_step(position: usize, order: usize) -> usize {
    if position < order { position } else { order }
}

/// 检查位置数组长度是否等于时间步数`t`
pub(crate) fn check_position_len(
    name: &'static str,
    position: &[usize],
    t: usize,
) -> Result<(), FsmnError> {
    if position.len() != t {
        return Err(FsmnError::ShapeMismatch {
            expected: vec![t],
            got: vec![position.len()],
            message: format!("位置数组{name}的长度必须等于时间步数"),
        });
    }
    Ok(())
}

/// 计算每一步的回看步数，并保证`r - i - 1`不会小于0
pub(crate) fn lookback_steps(
    name: &'static str,
    position: &[usize],
    order: usize,
) -> Result<Vec<usize>, FsmnError> {
    position
        .iter()
        .enumerate()
        .map(|(r, &p)| {
            let step = truncated_step(p, order);
            if step > r {
                Err(FsmnError::PositionOutOfRange {
                    name,
                    row: r,
                    step,
                    max: r,
                })
            } else {
                Ok(step)
            }
        })
        .collect()
}

/// 计算每一步的前看步数，并保证`r + i + 1`不会超出`[0, T)`
pub(crate) fn lookahead_steps(
    name: &'static str,
    position: &[usize],
    order: usize,
) -> Result<Vec<usize>, FsmnError> {
    let t = position.len();
    position
        .iter()
        .enumerate()
        .map(|(r, &p)| {
            let step = truncated_step(p, order);
            let max = t - 1 - r;
            if step > max {
                Err(FsmnError::PositionOutOfRange {
                    name,
                    row: r,
                    step,
                    max,
                })
            } else {
                Ok(step)
            }
        })
        .collect()
}

/// 一批沿时间轴拼接的变长序列对应的位置数组
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SequencePositions {
    /// 每一步到所属序列开头的距离（可回看深度）
    pub bposition: Vec<usize>,
    /// 每一步到所属序列结尾的距离（可前看深度）
    pub fposition: Vec<usize>,
}

impl SequencePositions {
    /// 总时间步数，即各序列长度之和
    pub fn len(&self) -> usize {
        self.bposition.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bposition.is_empty()
    }
}

/// 由各序列长度生成位置数组。
/// 多条序列首尾拼接成一个`T×D`的`hidden`后，用这里的位置数组做截断，
/// 记忆窗口就不会跨越序列边界。长度为0的序列不占用任何时间步。
pub fn positions_from_lengths(lengths: &[usize]) -> SequencePositions {
    let total = lengths.iter().sum();
    let mut positions = SequencePositions {
        bposition: Vec::with_capacity(total),
        fposition: Vec::with_capacity(total),
    };
    for &len in lengths {
        positions.bposition.extend(0..len);
        positions.fposition.extend((0..len).rev());
    }
    positions
}

use thiserror::Error;

/// 记忆计算核的错误类型
///
/// 所有错误都在计算开始之前同步检出，出错时不会返回任何部分结果。
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FsmnError {
    // 张量形状
    #[error("形状不一致：期望{expected:?}，实际为{got:?}。{message}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
        message: String,
    },
    // 截断后的窗口仍越过序列边界
    #[error("{name}[{row}]截断后的步数{step}超出可用范围（须≤{max}）")]
    PositionOutOfRange {
        name: &'static str,
        row: usize,
        step: usize,
        max: usize,
    },
    #[error("记忆模块配置无效：{0}")]
    Config(String),
}

impl From<serde_json::Error> for FsmnError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

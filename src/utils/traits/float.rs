use num_traits::Float;
use std::fmt::Debug;
use std::ops::AddAssign;

/// 记忆计算核支持的浮点元素类型（`f32`、`f64`）。
/// 同一次调用中的所有张量必须使用同一种精度，不做隐式提升。
pub trait MemoryFloat: Float + AddAssign + Debug + Send + Sync + 'static {}

impl<T> MemoryFloat for T where T: Float + AddAssign + Debug + Send + Sync + 'static {}

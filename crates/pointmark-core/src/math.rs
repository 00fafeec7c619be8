//! 基础数学类型
//!
//! 核心库内部统一使用 f64，UI 边界处再转换为 egui 的 f32。

/// 二维点（容器像素坐标或归一化坐标）
pub type Point2 = nalgebra::Point2<f64>;

/// 二维向量（位移量）
pub type Vector2 = nalgebra::Vector2<f64>;

/// 浮点比较容差
pub const EPSILON: f64 = 1e-9;

/// 将值限制在归一化区间 [0, 1]
pub fn clamp01(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

//! 标记点数据模型

use serde::{Deserialize, Serialize};

/// 一个标记点
///
/// `x`/`y` 是相对于图片显示区域（去除留白后的矩形）的归一化坐标，
/// 与容器尺寸和画布缩放无关。`index` 是从 1 开始的显示编号，
/// 由 [`PointStore`](crate::store::PointStore) 维护，
/// 始终等于列表位置 + 1。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointAnnotation {
    /// 归一化 X 坐标，[0, 1]
    pub x: f64,
    /// 归一化 Y 坐标，[0, 1]
    pub y: f64,
    /// 显示编号（1-based，连续无空洞）
    pub index: u32,
}

impl PointAnnotation {
    pub fn new(x: f64, y: f64, index: u32) -> Self {
        Self { x, y, index }
    }

    /// 持久化数据是否合法：坐标有限且在 [0,1]，编号为正
    ///
    /// 用于反序列化时的防御性校验，非法条目直接丢弃。
    pub fn is_valid(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && (0.0..=1.0).contains(&self.x)
            && (0.0..=1.0).contains(&self.y)
            && self.index >= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity() {
        assert!(PointAnnotation::new(0.0, 1.0, 1).is_valid());
        assert!(!PointAnnotation::new(-0.1, 0.5, 1).is_valid());
        assert!(!PointAnnotation::new(0.5, 1.2, 1).is_valid());
        assert!(!PointAnnotation::new(f64::NAN, 0.5, 1).is_valid());
        assert!(!PointAnnotation::new(0.5, 0.5, 0).is_valid());
    }

    #[test]
    fn test_serde_wire_shape() {
        let p = PointAnnotation::new(0.25, 0.75, 3);
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#"{"x":0.25,"y":0.75,"index":3}"#);

        let back: PointAnnotation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}

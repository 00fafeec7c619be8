//! PointMark 核心库
//!
//! 提供标注编辑器的纯逻辑部分，不依赖任何GUI框架：
//! - `store`: 标记点列表（编号的唯一来源）
//! - `mapper`: 容器像素坐标与图片归一化坐标的双向换算
//! - `richtext`: 指令富文本树及其与纯文本格式的互转
//!
//! # 数据流
//!
//! 用户点击 → `DisplayGeometry::to_normalized` → `PointStore::add_point`
//! → `RichContent::insert_marker` → `RichContent::to_plain`（后端可见文本）。
//! 反向（加载工作流）：`PointStore::replace_all` + `RichContent::from_plain`。
//!
//! # 示例
//!
//! ```rust
//! use pointmark_core::prelude::*;
//!
//! let mut store = PointStore::new();
//! let index = store.add_point(0.5, 0.5);
//! assert_eq!(index, 1);
//! ```

pub mod mapper;
pub mod math;
pub mod point;
pub mod richtext;
pub mod store;

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::mapper::DisplayGeometry;
    pub use crate::math::{clamp01, Point2, Vector2, EPSILON};
    pub use crate::point::PointAnnotation;
    pub use crate::richtext::{RichContent, RichUnit, MARKER_TOKEN};
    pub use crate::store::PointStore;
}

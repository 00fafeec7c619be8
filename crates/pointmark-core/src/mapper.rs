//! 坐标换算
//!
//! 容器是固定逻辑尺寸的矩形，图片按 `object-fit: contain` 的方式
//! 等比缩放居中显示，纵横比不一致时上下或左右留白。
//! 标记点坐标归一化到图片的显示矩形而非容器，
//! 因此与容器尺寸、画布缩放均无关。

use crate::math::{Point2, Vector2};

/// 图片在容器内的显示矩形（推导值，每次渲染重算，从不持久化）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayGeometry {
    pub offset_x: f64,
    pub offset_y: f64,
    pub display_width: f64,
    pub display_height: f64,
}

impl DisplayGeometry {
    /// 由容器逻辑尺寸和图片自然尺寸计算显示矩形
    ///
    /// 任一尺寸非正时返回 `None`：图片自然尺寸未知（尚未加载完成
    /// 或加载失败）期间不存在合法几何，标记点因此不渲染。
    pub fn compute(
        container_w: f64,
        container_h: f64,
        natural_w: f64,
        natural_h: f64,
    ) -> Option<Self> {
        if container_w <= 0.0 || container_h <= 0.0 || natural_w <= 0.0 || natural_h <= 0.0 {
            return None;
        }

        let img_aspect = natural_w / natural_h;
        let container_aspect = container_w / container_h;

        let geometry = if img_aspect > container_aspect {
            // 宽度受限：左右贴边，上下留白
            let display_width = container_w;
            let display_height = container_w / img_aspect;
            Self {
                offset_x: 0.0,
                offset_y: (container_h - display_height) / 2.0,
                display_width,
                display_height,
            }
        } else {
            // 高度受限：上下贴边，左右留白
            let display_height = container_h;
            let display_width = container_h * img_aspect;
            Self {
                offset_x: (container_w - display_width) / 2.0,
                offset_y: 0.0,
                display_width,
                display_height,
            }
        };
        Some(geometry)
    }

    /// 容器像素点是否落在显示矩形内
    pub fn contains(&self, p: Point2) -> bool {
        p.x >= self.offset_x
            && p.x <= self.offset_x + self.display_width
            && p.y >= self.offset_y
            && p.y <= self.offset_y + self.display_height
    }

    /// 正向换算：容器像素 → 归一化坐标
    ///
    /// 落在显示矩形外时返回 `None`，调用方按无操作处理。
    pub fn to_normalized(&self, p: Point2) -> Option<Point2> {
        if !self.contains(p) {
            return None;
        }
        Some(Point2::new(
            (p.x - self.offset_x) / self.display_width,
            (p.y - self.offset_y) / self.display_height,
        ))
    }

    /// 反向换算：归一化坐标 → 容器像素（渲染与拖动用）
    pub fn to_container(&self, normalized: Point2) -> Point2 {
        Point2::new(
            self.offset_x + normalized.x * self.display_width,
            self.offset_y + normalized.y * self.display_height,
        )
    }

    /// 像素位移 → 归一化位移（拖动增量用）
    pub fn delta_to_normalized(&self, delta: Vector2) -> Vector2 {
        Vector2::new(delta.x / self.display_width, delta.y / self.display_height)
    }
}

/// 画布缩放校正系数
///
/// 容器可能被外层画布以不同于逻辑尺寸的实际尺寸渲染
/// （例如宿主视口整体缩放）。原始指针量除以该系数后
/// 才能进入上面的换算，标记点坐标因此与缩放级别解耦。
pub fn render_scale(
    rendered_w: f64,
    rendered_h: f64,
    logical_w: f64,
    logical_h: f64,
) -> (f64, f64) {
    (rendered_w / logical_w, rendered_h / logical_h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::EPSILON;

    /// 400×250 容器放 800×800 正方形图：高度受限，左右各留 75
    #[test]
    fn test_letterbox_square_in_wide_container() {
        let g = DisplayGeometry::compute(400.0, 250.0, 800.0, 800.0).unwrap();
        assert_eq!(g.display_width, 250.0);
        assert_eq!(g.display_height, 250.0);
        assert_eq!(g.offset_x, 75.0);
        assert_eq!(g.offset_y, 0.0);
    }

    /// 宽图在同一容器中：宽度受限，上下留白
    #[test]
    fn test_letterbox_wide_image() {
        let g = DisplayGeometry::compute(400.0, 250.0, 1000.0, 500.0).unwrap();
        assert_eq!(g.display_width, 400.0);
        assert_eq!(g.display_height, 200.0);
        assert_eq!(g.offset_x, 0.0);
        assert_eq!(g.offset_y, 25.0);
    }

    #[test]
    fn test_degenerate_dimensions_rejected() {
        assert!(DisplayGeometry::compute(400.0, 250.0, 0.0, 600.0).is_none());
        assert!(DisplayGeometry::compute(400.0, 250.0, 600.0, 0.0).is_none());
        assert!(DisplayGeometry::compute(0.0, 250.0, 600.0, 600.0).is_none());
    }

    #[test]
    fn test_click_center_maps_to_half() {
        let g = DisplayGeometry::compute(400.0, 250.0, 800.0, 800.0).unwrap();
        let n = g.to_normalized(Point2::new(200.0, 125.0)).unwrap();
        assert!((n.x - 0.5).abs() < EPSILON);
        assert!((n.y - 0.5).abs() < EPSILON);
    }

    #[test]
    fn test_click_outside_display_rect_rejected() {
        let g = DisplayGeometry::compute(400.0, 250.0, 800.0, 800.0).unwrap();
        // 左侧留白区域
        assert!(g.to_normalized(Point2::new(30.0, 100.0)).is_none());
        // 右侧留白区域
        assert!(g.to_normalized(Point2::new(390.0, 100.0)).is_none());
        // 边界恰好在矩形上算作命中
        assert!(g.to_normalized(Point2::new(75.0, 0.0)).is_some());
    }

    #[test]
    fn test_roundtrip_within_tolerance() {
        let g = DisplayGeometry::compute(400.0, 250.0, 1024.0, 768.0).unwrap();
        for &(x, y) in &[(0.0, 0.0), (0.25, 0.75), (0.5, 0.5), (1.0, 1.0), (0.123, 0.987)] {
            let px = g.to_container(Point2::new(x, y));
            let back = g.to_normalized(px).unwrap();
            assert!((back.x - x).abs() < EPSILON);
            assert!((back.y - y).abs() < EPSILON);
        }
    }

    #[test]
    fn test_delta_conversion() {
        let g = DisplayGeometry::compute(400.0, 250.0, 800.0, 800.0).unwrap();
        let d = g.delta_to_normalized(Vector2::new(25.0, 50.0));
        assert!((d.x - 0.1).abs() < EPSILON);
        assert!((d.y - 0.2).abs() < EPSILON);
    }

    #[test]
    fn test_render_scale() {
        // 容器以两倍大小渲染时，指针量需除以 2
        let (sx, sy) = render_scale(800.0, 500.0, 400.0, 250.0);
        assert_eq!((sx, sy), (2.0, 2.0));
    }
}

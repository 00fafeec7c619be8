//! 图片预览与标记渲染
//!
//! 固定逻辑尺寸 400×250 的容器，图片等比缩放居中（letterbox）。
//! 每帧从标记点列表整体重绘全部标记，立即模式天然就是
//! "全量替换，无增量 diff"，点的数量是十位数级别，正确性优先。
//!
//! 指针坐标先除以"实际渲染尺寸 / 逻辑尺寸"的比值再进入换算，
//! 外层画布缩放因此不影响归一化坐标。

use egui::{Align2, Color32, FontId, Pos2, Rect, Sense, Stroke, StrokeKind};
use pointmark_core::mapper::{render_scale, DisplayGeometry};
use pointmark_core::math::{Point2, Vector2};

use crate::editor::PointMarkEditor;
use crate::state::{DragState, ImageState};

/// 容器逻辑宽度
pub const CONTAINER_WIDTH: f32 = 400.0;
/// 容器逻辑高度
pub const CONTAINER_HEIGHT: f32 = 250.0;

/// 标记半径（逻辑像素，直径 22）
const MARKER_RADIUS: f64 = 11.0;

/// 绘制预览区并处理点击/拖动
pub fn show(ui: &mut egui::Ui, editor: &mut PointMarkEditor) {
    let (response, painter) = ui.allocate_painter(
        egui::vec2(CONTAINER_WIDTH, CONTAINER_HEIGHT),
        Sense::click_and_drag(),
    );
    let rect = response.rect;

    painter.rect_filled(rect, 4.0, Color32::from_rgb(26, 26, 26));
    painter.rect_stroke(
        rect,
        4.0,
        Stroke::new(1.0, Color32::from_rgb(51, 51, 51)),
        StrokeKind::Inside,
    );

    // 画布缩放校正：实际渲染框尺寸 / 逻辑容器尺寸
    let (sx, sy) = render_scale(
        rect.width() as f64,
        rect.height() as f64,
        CONTAINER_WIDTH as f64,
        CONTAINER_HEIGHT as f64,
    );

    let geometry = match &editor.image {
        ImageState::Ready { texture, natural } => {
            let geometry = DisplayGeometry::compute(
                CONTAINER_WIDTH as f64,
                CONTAINER_HEIGHT as f64,
                natural.0 as f64,
                natural.1 as f64,
            );
            if let Some(g) = geometry {
                let display_rect = Rect::from_min_size(
                    rect.min
                        + egui::vec2((g.offset_x * sx) as f32, (g.offset_y * sy) as f32),
                    egui::vec2(
                        (g.display_width * sx) as f32,
                        (g.display_height * sy) as f32,
                    ),
                );
                painter.image(
                    texture.id(),
                    display_rect,
                    Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    Color32::WHITE,
                );
            }
            geometry
        }
        ImageState::Empty => {
            placeholder(&painter, rect, "选择文件上传");
            None
        }
        ImageState::Loading => {
            placeholder(&painter, rect, "加载中...");
            None
        }
        ImageState::Failed => {
            placeholder(&painter, rect, "图片加载失败");
            None
        }
    };

    // 几何未知（图片未就绪）时标记隐藏，交互也全部停用
    let Some(geometry) = geometry else {
        if !ui.input(|i| i.pointer.primary_down()) {
            if matches!(editor.state.drag, DragState::Marker { .. }) {
                editor.end_drag();
            }
        }
        return;
    };

    // 屏幕坐标 ↔ 逻辑容器坐标
    let to_screen = |normalized: Point2| -> Pos2 {
        let c = geometry.to_container(normalized);
        rect.min + egui::vec2((c.x * sx) as f32, (c.y * sy) as f32)
    };
    let to_logical = |pos: Pos2| -> Point2 {
        Point2::new(
            (pos.x - rect.min.x) as f64 / sx,
            (pos.y - rect.min.y) as f64 / sy,
        )
    };

    let hit_radius = MARKER_RADIUS * sx.min(sy);
    let hit_marker = |store: &pointmark_core::store::PointStore, pos: Pos2| -> Option<usize> {
        // 后画的在上层，倒序命中
        store
            .as_slice()
            .iter()
            .enumerate()
            .rev()
            .find(|(_, p)| {
                let center = to_screen(Point2::new(p.x, p.y));
                (center - pos).length() as f64 <= hit_radius
            })
            .map(|(i, _)| i)
    };

    // ===== 交互 =====

    // 按下标记即选中
    if ui.input(|i| i.pointer.primary_pressed()) && response.hovered() {
        if let Some(pos) = response.interact_pointer_pos() {
            if let Some(position) = hit_marker(editor.store(), pos) {
                editor.select_marker(position);
            }
        }
    }

    // 拖动会话：按下标记开始，移动中就地更新坐标，抬起提交
    if response.drag_started_by(egui::PointerButton::Primary) {
        if let Some(pos) = response.interact_pointer_pos() {
            if let Some(position) = hit_marker(editor.store(), pos) {
                editor.begin_marker_drag(position);
            }
        }
    }

    if response.dragged_by(egui::PointerButton::Primary) {
        if matches!(editor.state.drag, DragState::Marker { .. }) {
            let delta = response.drag_delta();
            let logical = Vector2::new(delta.x as f64 / sx, delta.y as f64 / sy);
            editor.drag_marker_by(geometry.delta_to_normalized(logical));
        }
    }

    if response.drag_stopped_by(egui::PointerButton::Primary) {
        editor.end_drag();
    }

    // 指针已抬起但会话仍在：防御性清除，不留幽灵会话
    if !ui.input(|i| i.pointer.primary_down()) {
        if matches!(editor.state.drag, DragState::Marker { .. }) {
            editor.end_drag();
        }
    }

    // 点击空白处添加标记点：必须落在显示矩形内且不在已有标记上
    if response.clicked() {
        if let Some(pos) = response.interact_pointer_pos() {
            if hit_marker(editor.store(), pos).is_none() {
                if let Some(normalized) = geometry.to_normalized(to_logical(pos)) {
                    editor.add_point_at(normalized);
                }
            }
        }
    }

    // ===== 标记绘制 =====

    let marker_radius = hit_radius as f32;
    let font = FontId::proportional((12.0 * sx.min(sy)) as f32);
    for (i, point) in editor.store().iter().enumerate() {
        let center = to_screen(Point2::new(point.x, point.y));
        let selected = editor.state.selected == Some(i);

        painter.circle_filled(
            center,
            marker_radius,
            Color32::from_rgba_unmultiplied(30, 144, 255, 230),
        );
        // 选中用金色粗边框区分
        let ring = if selected {
            Stroke::new(3.0, Color32::from_rgb(255, 215, 0))
        } else {
            Stroke::new(2.0, Color32::from_rgba_unmultiplied(255, 255, 255, 230))
        };
        painter.circle_stroke(center, marker_radius, ring);

        painter.text(
            center,
            Align2::CENTER_CENTER,
            point.index.to_string(),
            font.clone(),
            Color32::WHITE,
        );
    }
}

fn placeholder(painter: &egui::Painter, rect: Rect, text: &str) {
    painter.text(
        rect.center(),
        Align2::CENTER_CENTER,
        text,
        FontId::proportional(14.0),
        Color32::from_gray(102),
    );
}

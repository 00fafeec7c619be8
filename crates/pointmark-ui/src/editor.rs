//! 编辑器组件
//!
//! 拥有标记点列表、富文本内容和全部瞬态状态，并实现宿主
//! 生命周期钩子：创建（`new`）、恢复（`on_configure`）、
//! 序列化（`on_serialize`）、尺寸（固定脚印，忽略宿主调整）。
//!
//! 每次修改后刷新两个宿主可见的输出通道：标记点 JSON 数组
//! 和指令纯文本，后端只消费这两样。

use egui::TextureHandle;
use pointmark_core::math::{Point2, Vector2};
use pointmark_core::richtext::RichContent;
use pointmark_core::store::PointStore;
use pointmark_file::PersistedState;

use crate::state::{DragState, EditorState, ImageState};
use crate::{image_panel, prompt_field};

/// 组件的固定视觉脚印（宽 × 高）
pub const FOOTPRINT: egui::Vec2 = egui::Vec2::new(420.0, 520.0);

/// 标注编辑器
pub struct PointMarkEditor {
    store: PointStore,
    rich: RichContent,
    pub state: EditorState,
    pub image: ImageState,

    /// 当前图片文件名（随工作流持久化；空串表示未选择）
    image_name: String,

    /// 待宿主处理的图片加载请求
    image_request: Option<String>,

    // 输出通道（每次修改后重新生成）
    points_json: String,
    instruction_text: String,
}

impl Default for PointMarkEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl PointMarkEditor {
    /// 宿主钩子：节点创建，空状态
    pub fn new() -> Self {
        let mut editor = Self {
            store: PointStore::new(),
            rich: RichContent::new(),
            state: EditorState::new(),
            image: ImageState::Empty,
            image_name: String::new(),
            image_request: None,
            points_json: String::new(),
            instruction_text: String::new(),
        };
        editor.refresh_outputs();
        editor
    }

    // ========== 宿主生命周期 ==========

    /// 宿主钩子：应用持久化状态（加载工作流时调用）
    ///
    /// 标记点走防御性校验路径，损坏条目丢弃并告警，从不让
    /// 初始化失败；富文本由纯文本重建；图片按名字重新请求，
    /// 标记要等自然尺寸就绪后才会渲染。
    pub fn on_configure(&mut self, persisted: PersistedState) {
        let total = persisted.points.len();
        let dropped = self.store.replace_all(persisted.points);
        if dropped > 0 {
            tracing::warn!(
                "Dropped {} of {} persisted points during restore",
                dropped,
                total
            );
        }

        self.rich = RichContent::from_plain(&persisted.instruction_text);
        self.state = EditorState::new();
        self.state.caret = self.rich.len();

        self.image = ImageState::Empty;
        self.image_name.clear();
        if !persisted.image_name.is_empty() {
            self.image_name = persisted.image_name.clone();
            self.image = ImageState::Loading;
            self.image_request = Some(persisted.image_name);
        }

        self.refresh_outputs();
        self.state.status_message = format!("已恢复 {} 个标记点", self.store.len());
    }

    /// 宿主钩子：序列化当前状态
    pub fn on_serialize(&self) -> PersistedState {
        PersistedState {
            points: self.store.as_slice().to_vec(),
            instruction_text: self.instruction_text.clone(),
            image_name: self.image_name.clone(),
        }
    }

    /// 宿主钩子：尺寸调整
    ///
    /// 组件固定自己的脚印，忽略宿主驱动的调整。
    pub fn on_resize(&mut self) -> egui::Vec2 {
        FOOTPRINT
    }

    // ========== 图片加载（异步边界） ==========

    /// 用户选择了新图片：旧标记全部清除，然后请求加载
    pub fn set_image(&mut self, name: &str) {
        if name.is_empty() {
            return;
        }
        self.clear_all();
        self.image_name = name.to_string();
        self.image = ImageState::Loading;
        self.image_request = Some(name.to_string());
        self.state.status_message = format!("加载图片: {}", name);
    }

    /// 宿主轮询待处理的加载请求
    pub fn take_image_request(&mut self) -> Option<String> {
        self.image_request.take()
    }

    /// 解码完成，纹理与自然尺寸就绪
    pub fn image_loaded(&mut self, texture: TextureHandle, natural: (u32, u32)) {
        self.image = ImageState::Ready { texture, natural };
        self.state.status_message = format!(
            "图片已加载 ({}x{})",
            natural.0, natural.1
        );
    }

    /// 解码或读取失败：占位提示，标记隐藏，列表保持不动
    pub fn image_failed(&mut self, message: &str) {
        tracing::error!("Image load failed ({}): {}", self.image_name, message);
        self.image = ImageState::Failed;
        self.state.status_message = "图片加载失败".to_string();
    }

    // ========== 标记点操作 ==========

    /// 在归一化坐标处添加标记点，并在光标处插入对应标签
    pub fn add_point_at(&mut self, normalized: Point2) {
        let index = self.store.add_point(normalized.x, normalized.y);

        let slot = self.state.field_focused.then_some(self.state.caret);
        let after = self.rich.insert_marker(slot, index);
        if self.state.field_focused {
            self.state.caret = after;
        }

        self.refresh_outputs();
        self.state.status_message = format!("已添加标记点 {}", index);
    }

    /// 选中标记（替换之前的选中）
    pub fn select_marker(&mut self, position: usize) {
        self.state.select(position);
    }

    /// 按下标记开始拖动会话；拖动总是选中该标记
    pub fn begin_marker_drag(&mut self, position: usize) {
        self.state.select(position);
        self.state.drag = DragState::Marker { position };
    }

    /// 拖动中：按归一化增量移动，坐标在列表里就地更新并截断到 [0,1]
    ///
    /// 编号永远不变。
    pub fn drag_marker_by(&mut self, delta: Vector2) {
        if let DragState::Marker { position } = self.state.drag {
            if let Some(point) = self.store.get(position) {
                let (x, y) = (point.x + delta.x, point.y + delta.y);
                self.store.update_position(position, x, y);
            }
        }
    }

    /// 指针抬起：结束会话并提交宿主可见状态
    ///
    /// 会话已失效时也照常执行（防御性清除）。
    pub fn end_drag(&mut self) {
        if self.state.drag != DragState::None {
            self.state.end_drag();
            self.refresh_outputs();
        }
    }

    /// 删除选中的标记点
    ///
    /// 移除对应标签、更高编号的标签随列表一起重新编号、
    /// 清除选中并重绘。无选中时静默忽略。
    pub fn delete_selected(&mut self) {
        let Some(position) = self.state.selected else {
            return;
        };
        let Some(point) = self.store.get(position) else {
            self.state.clear_selection();
            return;
        };
        let index = point.index;

        self.store.remove_point(position);
        self.rich.remove_marker_tags(index);
        self.rich.shift_marker_tags_above(index);

        self.state.clear_selection();
        self.state.caret = self.state.caret.min(self.rich.len());
        self.refresh_outputs();
        self.state.status_message = format!("已删除标记点 {}", index);
    }

    /// 清空全部标记点和标签（保留字面文本）
    pub fn clear_all(&mut self) {
        self.store.clear();
        self.rich.clear_marker_tags();
        self.state.clear_selection();
        self.state.end_drag();
        self.state.caret = self.state.caret.min(self.rich.len());
        self.refresh_outputs();
        self.state.status_message = "已清空标记".to_string();
    }

    // ========== 指令框编辑 ==========

    pub fn insert_text(&mut self, text: &str) {
        self.state.caret = self.rich.insert_text(self.state.caret, text);
        self.refresh_outputs();
    }

    pub fn insert_break(&mut self) {
        self.state.caret = self.rich.insert_break(self.state.caret);
        self.refresh_outputs();
    }

    pub fn delete_backward(&mut self) {
        self.state.caret = self.rich.delete_backward(self.state.caret);
        self.refresh_outputs();
    }

    pub fn delete_forward(&mut self) {
        self.rich.delete_forward(self.state.caret);
        self.refresh_outputs();
    }

    /// 标签拖放重排：移动单元，不触碰编号和标记点列表
    pub fn move_tag(&mut self, from_unit: usize, to_slot: usize) {
        use pointmark_core::richtext::RichUnit;
        if !matches!(self.rich.units().get(from_unit), Some(RichUnit::Marker(_))) {
            return;
        }
        let landed = self.rich.move_unit(from_unit, to_slot);
        self.state.caret = landed + 1;
        self.refresh_outputs();
    }

    pub fn set_caret(&mut self, slot: usize) {
        self.state.caret = slot.min(self.rich.len());
    }

    // ========== 输出通道与访问器 ==========

    /// 刷新两个宿主可见的输出通道
    fn refresh_outputs(&mut self) {
        self.points_json = match serde_json::to_string(self.store.as_slice()) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize points: {}", e);
                "[]".to_string()
            }
        };
        self.instruction_text = self.rich.to_plain();
    }

    /// 标记点列表的 JSON 数组（后端消费）
    pub fn points_json(&self) -> &str {
        &self.points_json
    }

    /// 指令纯文本（后端消费）
    pub fn instruction_text(&self) -> &str {
        &self.instruction_text
    }

    pub fn store(&self) -> &PointStore {
        &self.store
    }

    pub fn rich(&self) -> &RichContent {
        &self.rich
    }

    pub fn image_name(&self) -> &str {
        &self.image_name
    }

    // ========== 渲染 ==========

    /// 绘制整个组件：预览区、指令头行、输入框
    pub fn ui(&mut self, ui: &mut egui::Ui) {
        image_panel::show(ui, self);

        ui.add_space(6.0);
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("指令").size(12.0).color(egui::Color32::from_gray(170)));
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.small_button("清空").clicked() {
                    self.clear_all();
                }
                if ui.small_button("删除选中").clicked() {
                    self.delete_selected();
                }
            });
        });

        prompt_field::show(ui, self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pointmark_core::richtext::RichUnit;

    fn editor_with_points(n: usize) -> PointMarkEditor {
        let mut editor = PointMarkEditor::new();
        for i in 0..n {
            editor.add_point_at(Point2::new(0.1 * (i as f64 + 1.0), 0.5));
        }
        editor
    }

    #[test]
    fn test_add_point_syncs_tag_and_outputs() {
        let mut editor = PointMarkEditor::new();
        editor.add_point_at(Point2::new(0.5, 0.5));

        assert_eq!(editor.store().len(), 1);
        assert_eq!(editor.rich().marker_count(), 1);
        assert_eq!(editor.instruction_text(), "Marker1");
        assert!(editor.points_json().contains("\"index\":1"));
    }

    #[test]
    fn test_add_inserts_at_caret_when_focused() {
        let mut editor = PointMarkEditor::new();
        editor.state.field_focused = true;
        editor.insert_text("ab");
        editor.set_caret(1);

        editor.add_point_at(Point2::new(0.5, 0.5));
        assert_eq!(editor.instruction_text(), "aMarker1b");
        assert_eq!(editor.state.caret, 2);
    }

    #[test]
    fn test_delete_selected_renumbers_everything() {
        let mut editor = editor_with_points(3);
        editor.select_marker(1); // 编号 2

        editor.delete_selected();

        assert_eq!(editor.store().len(), 2);
        assert_eq!(editor.store().get(1).unwrap().index, 2);
        assert_eq!(editor.state.selected, None);
        // 残留标签：1 和原来的 3（已改编号为 2）
        assert_eq!(editor.instruction_text(), "Marker1Marker2");
    }

    #[test]
    fn test_delete_without_selection_is_noop() {
        let mut editor = editor_with_points(2);
        editor.delete_selected();
        assert_eq!(editor.store().len(), 2);
    }

    #[test]
    fn test_clear_all_keeps_literal_text() {
        let mut editor = editor_with_points(2);
        editor.state.field_focused = true;
        editor.insert_text(" hello");

        editor.clear_all();
        assert_eq!(editor.store().len(), 0);
        assert_eq!(editor.rich().marker_count(), 0);
        assert_eq!(editor.instruction_text(), "hello");
        assert_eq!(editor.state.selected, None);
    }

    #[test]
    fn test_drag_changes_coordinates_not_index() {
        let mut editor = editor_with_points(1);
        editor.begin_marker_drag(0);
        editor.drag_marker_by(Vector2::new(0.3, 2.0));
        editor.end_drag();

        let p = editor.store().get(0).unwrap();
        assert!((p.x - 0.4).abs() < 1e-9);
        assert_eq!(p.y, 1.0); // 截断到上界
        assert_eq!(p.index, 1);
        assert_eq!(editor.state.drag, DragState::None);
        assert_eq!(editor.state.selected, Some(0));
    }

    #[test]
    fn test_configure_restores_and_requests_image() {
        let mut editor = PointMarkEditor::new();
        let persisted = PersistedState {
            points: vec![
                pointmark_core::point::PointAnnotation::new(0.2, 0.3, 1),
                pointmark_core::point::PointAnnotation::new(5.0, 0.3, 2), // 损坏，丢弃
            ],
            instruction_text: "go Marker1 now".to_string(),
            image_name: "scene.png".to_string(),
        };

        editor.on_configure(persisted);

        assert_eq!(editor.store().len(), 1);
        assert_eq!(editor.rich().marker_count(), 1);
        assert_eq!(editor.take_image_request().as_deref(), Some("scene.png"));
        assert!(!editor.image.is_ready());

        let out = editor.on_serialize();
        assert_eq!(out.points.len(), 1);
        assert_eq!(out.instruction_text, "go Marker1 now");
        assert_eq!(out.image_name, "scene.png");
    }

    #[test]
    fn test_set_image_clears_previous_points() {
        let mut editor = editor_with_points(2);
        editor.set_image("next.png");

        assert_eq!(editor.store().len(), 0);
        assert_eq!(editor.rich().marker_count(), 0);
        assert_eq!(editor.image_name(), "next.png");
        assert_eq!(editor.take_image_request().as_deref(), Some("next.png"));
    }

    #[test]
    fn test_image_failure_leaves_store_untouched() {
        let mut editor = editor_with_points(2);
        editor.image_failed("decode error");

        assert_eq!(editor.store().len(), 2);
        assert!(!editor.image.is_ready());
    }

    #[test]
    fn test_move_tag_keeps_store_and_index() {
        let mut editor = PointMarkEditor::new();
        editor.state.field_focused = true;
        editor.insert_text("ab");
        editor.set_caret(2);
        editor.add_point_at(Point2::new(0.5, 0.5)); // "abM1"

        editor.move_tag(2, 0);
        assert_eq!(editor.instruction_text(), "Marker1ab");
        assert_eq!(editor.store().get(0).unwrap().index, 1);

        // 非标签单元不可移动
        assert!(matches!(editor.rich().units()[1], RichUnit::Char('a')));
        editor.move_tag(1, 3);
        assert_eq!(editor.instruction_text(), "Marker1ab");
    }
}

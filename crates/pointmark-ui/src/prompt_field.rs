//! 指令输入框
//!
//! 自绘的可编辑区域：自由文本与不可编辑的胶囊标签内联混排，
//! 软换行，光标按单元槽位寻址。获得焦点期间键盘/粘贴事件
//! 全部在此消费，不会漏给外壳的快捷键（原实现里的
//! stopPropagation 约定）；粘贴内容一律先还原为纯文本。
//!
//! 标签支持拖放到新的光标位置重排：只动位置，
//! 编号和标记点列表都不变。

use egui::{Align2, Color32, FontId, Pos2, Rect, Sense, Stroke, StrokeKind};
use pointmark_core::richtext::RichUnit;

use crate::editor::PointMarkEditor;
use crate::image_panel::CONTAINER_WIDTH;
use crate::state::DragState;

const FIELD_FONT_SIZE: f32 = 13.0;
const LINE_HEIGHT: f32 = 20.0;
const PAD: f32 = 8.0;
const FIELD_MIN_HEIGHT: f32 = 80.0;
const FIELD_MAX_HEIGHT: f32 = 120.0;
const TAG_HEIGHT: f32 = 16.0;
const TAG_PAD_X: f32 = 6.0;
const BREAK_WIDTH: f32 = 4.0;

/// 一个单元在输入框内的布局位置（相对字段左上角）
struct Cell {
    unit: usize,
    x: f32,
    y: f32,
    w: f32,
    row: usize,
}

struct FieldLayout {
    cells: Vec<Cell>,
    height: f32,
}

/// 绘制指令输入框并处理编辑与标签拖放
pub fn show(ui: &mut egui::Ui, editor: &mut PointMarkEditor) {
    egui::ScrollArea::vertical()
        .id_salt("prompt_field_scroll")
        .max_height(FIELD_MAX_HEIGHT)
        .auto_shrink([false, false])
        .show(ui, |ui| {
            let width = ui.available_width().min(CONTAINER_WIDTH);
            let units: Vec<RichUnit> = editor.rich().units().to_vec();
            let layout = layout_units(ui, &units, width);

            let height = (layout.height + PAD).max(FIELD_MIN_HEIGHT);
            let (response, painter) =
                ui.allocate_painter(egui::vec2(width, height), Sense::click_and_drag());
            let rect = response.rect;

            painter.rect_filled(rect, 4.0, Color32::from_rgb(42, 42, 42));
            painter.rect_stroke(
                rect,
                4.0,
                Stroke::new(1.0, Color32::from_rgb(68, 68, 68)),
                StrokeKind::Inside,
            );

            // ===== 焦点 =====

            if response.clicked() {
                editor.state.field_focused = true;
                if let Some(pos) = response.interact_pointer_pos() {
                    let slot = slot_at(&layout, &units, pos - rect.min);
                    editor.set_caret(slot);
                }
            }
            if response.clicked_elsewhere() {
                editor.state.field_focused = false;
            }

            // ===== 标签拖放重排 =====

            if response.drag_started_by(egui::PointerButton::Primary) {
                if let Some(pos) = response.interact_pointer_pos() {
                    if let Some(unit) = tag_at(&layout, &units, pos - rect.min) {
                        editor.state.drag = DragState::Tag { unit };
                    }
                }
            }

            if response.drag_stopped_by(egui::PointerButton::Primary) {
                if let DragState::Tag { unit } = editor.state.drag {
                    if let Some(pos) = response.interact_pointer_pos() {
                        if rect.contains(pos) {
                            let slot = slot_at(&layout, &units, pos - rect.min);
                            editor.move_tag(unit, slot);
                        }
                    }
                    editor.end_drag();
                }
            }

            // 指针已抬起但会话仍在：防御性清除
            if !ui.input(|i| i.pointer.primary_down()) {
                if matches!(editor.state.drag, DragState::Tag { .. }) {
                    editor.end_drag();
                }
            }

            // ===== 键盘与剪贴板（仅在焦点内，全部消费） =====

            if editor.state.field_focused {
                handle_events(ui, editor);
            }

            // ===== 绘制 =====

            if units.is_empty() && !editor.state.field_focused {
                painter.text(
                    rect.min + egui::vec2(PAD, PAD),
                    Align2::LEFT_TOP,
                    "在此输入指令，点击图片添加标记...",
                    FontId::proportional(FIELD_FONT_SIZE),
                    Color32::from_gray(110),
                );
            }

            paint_units(&painter, rect, &layout, &units, editor);

            // 光标
            if editor.state.field_focused {
                let pos = rect.min + caret_pos(&layout, editor.state.caret).to_vec2();
                painter.line_segment(
                    [
                        Pos2::new(pos.x, pos.y + 2.0),
                        Pos2::new(pos.x, pos.y + LINE_HEIGHT - 2.0),
                    ],
                    Stroke::new(1.0, Color32::from_gray(230)),
                );
            }

            // 拖动中的标签：落点光标提示 + 跟随指针的半透明胶囊
            if let DragState::Tag { unit } = editor.state.drag {
                if let Some(pos) = ui.input(|i| i.pointer.hover_pos()) {
                    if rect.contains(pos) {
                        let slot = slot_at(&layout, &units, pos - rect.min);
                        let cp = rect.min + caret_pos(&layout, slot).to_vec2();
                        painter.line_segment(
                            [
                                Pos2::new(cp.x, cp.y + 2.0),
                                Pos2::new(cp.x, cp.y + LINE_HEIGHT - 2.0),
                            ],
                            Stroke::new(2.0, Color32::from_rgb(255, 215, 0)),
                        );
                    }
                    if let Some(RichUnit::Marker(n)) = units.get(unit) {
                        paint_tag(&painter, pos, *n, 140, ui);
                    }
                }
            }
        });
}

/// 消费全部键盘/文本/剪贴板事件
///
/// 从输入队列里摘走这些事件再处理，外壳和其他控件在本帧
/// 看不到它们，可编辑区内的输入不向上冒泡。
fn handle_events(ui: &mut egui::Ui, editor: &mut PointMarkEditor) {
    let taken: Vec<egui::Event> = ui.input_mut(|input| {
        let mut taken = Vec::new();
        input.events.retain(|event| match event {
            egui::Event::Text(_)
            | egui::Event::Paste(_)
            | egui::Event::Copy
            | egui::Event::Cut
            | egui::Event::Key { .. } => {
                taken.push(event.clone());
                false
            }
            _ => true,
        });
        taken
    });

    for event in taken {
        match event {
            egui::Event::Text(text) => editor.insert_text(&text),
            // 粘贴一律还原为纯文本，外来格式不存活
            egui::Event::Paste(text) => editor.insert_text(&text),
            // 无选区模型：复制导出整段纯文本，剪切按复制处理
            egui::Event::Copy | egui::Event::Cut => {
                ui.ctx().copy_text(editor.instruction_text().to_string());
            }
            egui::Event::Key { key, pressed: true, .. } => match key {
                egui::Key::Backspace => editor.delete_backward(),
                egui::Key::Delete => editor.delete_forward(),
                egui::Key::Enter => editor.insert_break(),
                egui::Key::ArrowLeft => {
                    editor.set_caret(editor.state.caret.saturating_sub(1));
                }
                egui::Key::ArrowRight => {
                    editor.set_caret(editor.state.caret + 1);
                }
                egui::Key::Home => editor.set_caret(0),
                egui::Key::End => editor.set_caret(editor.rich().len()),
                egui::Key::Escape => editor.state.field_focused = false,
                _ => {}
            },
            _ => {}
        }
    }
}

/// 把单元序列排进给定宽度，软换行不产生换行单元
fn layout_units(ui: &egui::Ui, units: &[RichUnit], width: f32) -> FieldLayout {
    let font = FontId::proportional(FIELD_FONT_SIZE);
    let wrap_at = width - PAD;
    let mut cells = Vec::with_capacity(units.len());
    let mut x = PAD;
    let mut y = PAD;
    let mut row = 0usize;

    for (i, unit) in units.iter().enumerate() {
        let w = match unit {
            RichUnit::Char(ch) => ui.fonts_mut(|f| f.glyph_width(&font, *ch)),
            RichUnit::Marker(n) => tag_width(ui, *n),
            RichUnit::Break => BREAK_WIDTH,
        };

        if x + w > wrap_at && x > PAD {
            x = PAD;
            y += LINE_HEIGHT;
            row += 1;
        }

        cells.push(Cell { unit: i, x, y, w, row });

        match unit {
            RichUnit::Break => {
                x = PAD;
                y += LINE_HEIGHT;
                row += 1;
            }
            _ => x += w,
        }
    }

    FieldLayout {
        cells,
        height: y + LINE_HEIGHT,
    }
}

fn tag_width(ui: &egui::Ui, index: u32) -> f32 {
    let font = FontId::proportional(FIELD_FONT_SIZE - 2.0);
    let text_w: f32 = index
        .to_string()
        .chars()
        .map(|c| ui.fonts_mut(|f| f.glyph_width(&font, c)))
        .sum();
    text_w + TAG_PAD_X * 2.0
}

/// 光标槽位的字段内坐标（行左上角）
fn caret_pos(layout: &FieldLayout, slot: usize) -> Pos2 {
    if let Some(cell) = layout.cells.get(slot) {
        return Pos2::new(cell.x, cell.y);
    }
    match layout.cells.last() {
        Some(last) => Pos2::new(last.x + last.w, last.y),
        None => Pos2::new(PAD, PAD),
    }
}

/// 字段内坐标 → 最近的光标槽位
fn slot_at(layout: &FieldLayout, units: &[RichUnit], pos: egui::Vec2) -> usize {
    if layout.cells.is_empty() {
        return 0;
    }

    let max_row = layout.cells.last().map(|c| c.row).unwrap_or(0);
    let row = (((pos.y - PAD) / LINE_HEIGHT).floor().max(0.0) as usize).min(max_row);

    let mut end_slot = units.len();
    for cell in layout.cells.iter().filter(|c| c.row == row) {
        if pos.x < cell.x + cell.w / 2.0 {
            return cell.unit;
        }
        // 行尾落点：停在行尾换行之前，而不是下一行开头
        end_slot = if matches!(units[cell.unit], RichUnit::Break) {
            cell.unit
        } else {
            cell.unit + 1
        };
    }
    end_slot
}

/// 字段内坐标命中的标签单元（用于拖动起点）
fn tag_at(layout: &FieldLayout, units: &[RichUnit], pos: egui::Vec2) -> Option<usize> {
    layout
        .cells
        .iter()
        .find(|cell| {
            matches!(units[cell.unit], RichUnit::Marker(_))
                && pos.x >= cell.x
                && pos.x <= cell.x + cell.w
                && pos.y >= cell.y
                && pos.y <= cell.y + LINE_HEIGHT
        })
        .map(|cell| cell.unit)
}

fn paint_units(
    painter: &egui::Painter,
    rect: Rect,
    layout: &FieldLayout,
    units: &[RichUnit],
    editor: &PointMarkEditor,
) {
    let font = FontId::proportional(FIELD_FONT_SIZE);
    let dragging = match editor.state.drag {
        DragState::Tag { unit } => Some(unit),
        _ => None,
    };

    // 连续字符合并成串绘制，减少 text 调用
    let mut run = String::new();
    let mut run_start: Option<Pos2> = None;
    let mut flush = |run: &mut String, start: &mut Option<Pos2>| {
        if let Some(pos) = start.take() {
            if !run.is_empty() {
                painter.text(pos, Align2::LEFT_TOP, run.clone(), font.clone(), Color32::from_gray(235));
            }
        }
        run.clear();
    };

    let mut prev_row = usize::MAX;
    for cell in &layout.cells {
        let origin = rect.min + egui::vec2(cell.x, cell.y + 3.0);
        match units[cell.unit] {
            RichUnit::Char(ch) => {
                if cell.row != prev_row || run_start.is_none() {
                    flush(&mut run, &mut run_start);
                    run_start = Some(origin);
                }
                run.push(ch);
            }
            RichUnit::Marker(n) => {
                flush(&mut run, &mut run_start);
                // 被拖动的标签原位置画淡
                let alpha = if dragging == Some(cell.unit) { 90 } else { 255 };
                let center = rect.min
                    + egui::vec2(cell.x + cell.w / 2.0, cell.y + LINE_HEIGHT / 2.0);
                paint_tag_at(painter, center, cell.w, n, alpha);
            }
            RichUnit::Break => {
                flush(&mut run, &mut run_start);
            }
        }
        prev_row = cell.row;
    }
    flush(&mut run, &mut run_start);
}

/// 在指针位置画跟随的半透明胶囊
fn paint_tag(painter: &egui::Painter, pos: Pos2, index: u32, alpha: u8, ui: &egui::Ui) {
    let w = tag_width(ui, index);
    paint_tag_at(painter, pos, w, index, alpha);
}

fn paint_tag_at(painter: &egui::Painter, center: Pos2, w: f32, index: u32, alpha: u8) {
    let rect = Rect::from_center_size(center, egui::vec2(w, TAG_HEIGHT));
    painter.rect_filled(
        rect,
        TAG_HEIGHT / 2.0,
        Color32::from_rgba_unmultiplied(30, 144, 255, alpha),
    );
    painter.text(
        center,
        Align2::CENTER_CENTER,
        index.to_string(),
        FontId::proportional(FIELD_FONT_SIZE - 2.0),
        Color32::from_rgba_unmultiplied(255, 255, 255, alpha),
    );
}

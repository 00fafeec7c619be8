//! 编辑器瞬态状态
//!
//! 原实现把这些散落在宿主节点对象的若干可变字段上，
//! 这里收拢为一个显式的状态结构，全部不参与持久化。

/// 进行中的拖动会话
///
/// 显式值建模：开始/移动/结束三个迁移。指针抬起时无条件清除
/// （包括异常释放），不会把拖动状态泄漏到后续无关的点击里。
/// 同一时刻至多一个会话。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    None,
    /// 预览区里拖动标记点（按列表位置引用）
    Marker { position: usize },
    /// 指令框里拖动标签（按单元位置引用）
    Tag { unit: usize },
}

/// 图片加载状态
///
/// 加载是唯一的异步边界：自然尺寸未知期间不渲染标记，
/// 失败时回到占位状态而不是半初始化。
#[derive(Default)]
pub enum ImageState {
    /// 尚未选择图片
    #[default]
    Empty,
    /// 解码线程工作中
    Loading,
    /// 纹理与自然尺寸就绪，标记可以渲染
    Ready {
        texture: egui::TextureHandle,
        natural: (u32, u32),
    },
    /// 加载失败，显示占位提示，标记隐藏
    Failed,
}

impl ImageState {
    pub fn is_ready(&self) -> bool {
        matches!(self, ImageState::Ready { .. })
    }
}

/// 编辑器瞬态状态
#[derive(Debug, Default)]
pub struct EditorState {
    /// 选中的标记（列表位置），至多一个
    pub selected: Option<usize>,

    /// 当前拖动会话
    pub drag: DragState,

    /// 指令框光标槽位
    pub caret: usize,

    /// 指令框是否持有键盘焦点
    pub field_focused: bool,

    /// 状态栏消息
    pub status_message: String,
}

impl EditorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 选中一个标记（替换之前的选中）
    pub fn select(&mut self, position: usize) {
        self.selected = Some(position);
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// 结束拖动会话
    ///
    /// 无论会话是否仍然有效都执行，防御性清除。
    pub fn end_drag(&mut self) {
        self.drag = DragState::None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_selection() {
        let mut state = EditorState::new();
        state.select(0);
        state.select(2);
        assert_eq!(state.selected, Some(2));
        state.clear_selection();
        assert_eq!(state.selected, None);
    }

    #[test]
    fn test_end_drag_is_unconditional() {
        let mut state = EditorState::new();
        state.end_drag();
        assert_eq!(state.drag, DragState::None);

        state.drag = DragState::Marker { position: 1 };
        state.end_drag();
        assert_eq!(state.drag, DragState::None);
    }
}

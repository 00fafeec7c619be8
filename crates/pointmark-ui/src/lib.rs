//! PointMark 编辑器组件
//!
//! 把核心逻辑接到 egui 上：
//! - `editor`: 组件本体与宿主生命周期钩子
//! - `image_panel`: 图片预览 + 标记点渲染/交互
//! - `prompt_field`: 带内联标签的指令输入框
//! - `state`: 选中、拖动会话、光标等瞬态状态

pub mod editor;
pub mod image_panel;
pub mod prompt_field;
pub mod state;

pub use editor::PointMarkEditor;
pub use state::{DragState, EditorState, ImageState};

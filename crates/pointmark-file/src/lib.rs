//! PointMark 工作流状态持久化
//!
//! 负责编辑器状态（标记点、指令文本、图片名）在保存/重载
//! 周期中的存取。磁盘格式是带版本号的 JSON 信封，内层的
//! `node` 对象正是宿主序列化契约规定的形状。

pub mod error;
pub mod state;

pub use error::StateError;
pub use state::{load, save, PersistedState, WorkflowFile, FORMAT_VERSION};

//! 工作流状态文件（.json）
//!
//! 宿主契约规定保存/重载周期必须原样保留的形状：
//! `{ points, instructionText, imageName }`。磁盘上该对象包在
//! 一个带版本号和保存时间的信封里，加载时做版本门禁，
//! 坐标级别的校验则留给 `PointStore::replace_all` 的防御路径。

use crate::error::StateError;
use chrono::{DateTime, Utc};
use pointmark_core::point::PointAnnotation;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 当前文件格式版本
pub const FORMAT_VERSION: u32 = 1;

/// 宿主可见的持久化状态
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedState {
    /// 标记点列表，按显示编号排列
    pub points: Vec<PointAnnotation>,
    /// 指令纯文本（标签已折叠为 MarkerN 占位符）
    pub instruction_text: String,
    /// 图片文件名（宿主 input 目录内）
    pub image_name: String,
}

/// 磁盘信封
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowFile {
    /// 格式版本
    pub version: u32,
    /// 保存时间
    pub saved_at: DateTime<Utc>,
    /// 编辑器状态
    pub node: PersistedState,
}

/// 保存工作流状态到文件
pub fn save(state: &PersistedState, path: &Path) -> Result<(), StateError> {
    let file = WorkflowFile {
        version: FORMAT_VERSION,
        saved_at: Utc::now(),
        node: state.clone(),
    };
    let json = serde_json::to_string_pretty(&file)?;
    fs::write(path, json)?;

    tracing::info!(
        "Saved {} points, {} bytes of instruction text to {}",
        state.points.len(),
        state.instruction_text.len(),
        path.display()
    );

    Ok(())
}

/// 从文件加载工作流状态
///
/// 版本高于当前支持版本时报错；JSON 形状错误报错；
/// 单个标记点条目的坐标问题不在此处处理，那是编辑器
/// `replace_all` 的防御职责，永远不会让初始化失败。
pub fn load(path: &Path) -> Result<PersistedState, StateError> {
    let json = fs::read_to_string(path)?;
    let file: WorkflowFile = serde_json::from_str(&json)?;

    if file.version > FORMAT_VERSION {
        return Err(StateError::UnsupportedVersion(file.version));
    }

    tracing::info!(
        "Loaded {} points, image {:?} from {}",
        file.node.points.len(),
        file.node.image_name,
        path.display()
    );

    Ok(file.node)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_roundtrip() {
        let temp_dir = std::env::temp_dir();
        let file_path = temp_dir.join("test_pointmark_workflow.json");

        let state = PersistedState {
            points: vec![
                PointAnnotation::new(0.25, 0.5, 1),
                PointAnnotation::new(0.75, 0.1, 2),
            ],
            instruction_text: "Pick up Marker1 and move to Marker2".to_string(),
            image_name: "scene.png".to_string(),
        };

        save(&state, &file_path).expect("Failed to save");
        let loaded = load(&file_path).expect("Failed to load");

        assert_eq!(loaded, state);

        std::fs::remove_file(&file_path).ok();
    }

    #[test]
    fn test_wire_field_names_are_camel_case() {
        let state = PersistedState {
            points: vec![],
            instruction_text: "t".to_string(),
            image_name: "a.png".to_string(),
        };
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"instructionText\""));
        assert!(json.contains("\"imageName\""));
        assert!(json.contains("\"points\""));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        // 旧数据可能缺字段，缺省而不是报错
        let state: PersistedState = serde_json::from_str(r#"{"imageName":"x.png"}"#).unwrap();
        assert!(state.points.is_empty());
        assert!(state.instruction_text.is_empty());
        assert_eq!(state.image_name, "x.png");
    }

    #[test]
    fn test_invalid_json_is_error() {
        let temp_dir = std::env::temp_dir();
        let file_path = temp_dir.join("test_pointmark_invalid.json");
        std::fs::write(&file_path, "not json at all").expect("Failed to write");

        let result = load(&file_path);
        assert!(matches!(result, Err(StateError::Json(_))));

        std::fs::remove_file(&file_path).ok();
    }

    #[test]
    fn test_newer_version_rejected() {
        let temp_dir = std::env::temp_dir();
        let file_path = temp_dir.join("test_pointmark_future.json");
        let json = format!(
            r#"{{"version":{},"saved_at":"2026-01-01T00:00:00Z","node":{{}}}}"#,
            FORMAT_VERSION + 1
        );
        std::fs::write(&file_path, json).expect("Failed to write");

        let result = load(&file_path);
        assert!(matches!(result, Err(StateError::UnsupportedVersion(_))));

        std::fs::remove_file(&file_path).ok();
    }
}

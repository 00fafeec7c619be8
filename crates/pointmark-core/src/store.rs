//! 标记点列表
//!
//! 编号的唯一来源：任何修改操作完成后，`index` 恒等于列表位置 + 1，
//! 连续且无重复。渲染层和富文本同步层只按列表位置引用条目，
//! 不持有可变副本。

use crate::math::clamp01;
use crate::point::PointAnnotation;

/// 有序的标记点集合
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointStore {
    points: Vec<PointAnnotation>,
}

impl PointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&PointAnnotation> {
        self.points.get(position)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PointAnnotation> {
        self.points.iter()
    }

    pub fn as_slice(&self) -> &[PointAnnotation] {
        &self.points
    }

    /// 追加一个标记点，返回其编号（总是 len+1）
    ///
    /// 坐标被限制到 [0,1]。
    pub fn add_point(&mut self, x: f64, y: f64) -> u32 {
        let index = self.points.len() as u32 + 1;
        self.points
            .push(PointAnnotation::new(clamp01(x), clamp01(y), index));
        index
    }

    /// 按列表位置删除，之后的条目重新编号保持连续
    ///
    /// 位置越界时静默忽略。
    pub fn remove_point(&mut self, position: usize) {
        if position >= self.points.len() {
            return;
        }
        self.points.remove(position);
        self.renumber();
    }

    /// 清空列表
    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// 反序列化路径：整体替换
    ///
    /// 丢弃非法条目（坐标非有限/越界、编号为 0），其余按输入顺序
    /// 重新编号，持久化数据损坏时编辑器仍可初始化。
    /// 返回被丢弃的条目数，供调用方记录日志。
    pub fn replace_all(&mut self, points: Vec<PointAnnotation>) -> usize {
        let total = points.len();
        self.points = points.into_iter().filter(|p| p.is_valid()).collect();
        self.renumber();
        total - self.points.len()
    }

    /// 就地修改坐标（拖动时调用），限制到 [0,1]，不改变编号
    ///
    /// 位置越界时静默忽略。
    pub fn update_position(&mut self, position: usize, x: f64, y: f64) {
        if let Some(point) = self.points.get_mut(position) {
            point.x = clamp01(x);
            point.y = clamp01(y);
        }
    }

    fn renumber(&mut self) {
        for (i, point) in self.points.iter_mut().enumerate() {
            point.index = i as u32 + 1;
        }
    }
}

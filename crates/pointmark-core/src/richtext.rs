//! 指令富文本
//!
//! 可编辑区域的内容建模为显式的变体序列，而不是依赖某个
//! 实时控件树：自由文本、标记标签、换行三种单元。
//! 与纯文本格式的互转是纯函数，可独立测试。
//!
//! 纯文本格式是后端可见、随工作流持久化的形式：
//! 每个标签折叠为 `Marker` + 编号的占位符，换行保留为 `\n`。

/// 纯文本格式中标签占位符的前缀
///
/// 后端按该 ASCII 记号解析，界面上标签只显示编号本身。
pub const MARKER_TOKEN: &str = "Marker";

/// 富文本的原子单元
///
/// 光标槽位 = 单元序列中的边界位置（0..=len），
/// 标签和换行与单个字符一样占一个槽位宽度，删除时整体移除。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RichUnit {
    /// 一个字面字符
    Char(char),
    /// 标记标签，携带其指向的标记点编号
    Marker(u32),
    /// 换行（块级边界）
    Break,
}

/// 可编辑的富文本内容
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RichContent {
    units: Vec<RichUnit>,
}

impl RichContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn units(&self) -> &[RichUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn clear(&mut self) {
        self.units.clear();
    }

    fn clamp_slot(&self, slot: usize) -> usize {
        slot.min(self.units.len())
    }

    // ========== 编辑操作 ==========

    /// 在槽位处插入字面文本，返回插入后的光标槽位
    ///
    /// 文本中的 `\n` 转为换行单元，`\r` 丢弃。粘贴内容经由此路径
    /// 统一还原为纯文本加换行，外来格式无法存活。
    pub fn insert_text(&mut self, slot: usize, text: &str) -> usize {
        let mut at = self.clamp_slot(slot);
        for ch in text.chars() {
            match ch {
                '\r' => {}
                '\n' => {
                    self.units.insert(at, RichUnit::Break);
                    at += 1;
                }
                _ => {
                    self.units.insert(at, RichUnit::Char(ch));
                    at += 1;
                }
            }
        }
        at
    }

    /// 在槽位处插入换行，返回新光标槽位
    pub fn insert_break(&mut self, slot: usize) -> usize {
        let at = self.clamp_slot(slot);
        self.units.insert(at, RichUnit::Break);
        at + 1
    }

    /// 插入标记标签
    ///
    /// `slot` 为 `None` 时（光标不在输入框内）追加到末尾。
    /// 返回标签之后的光标槽位。
    pub fn insert_marker(&mut self, slot: Option<usize>, index: u32) -> usize {
        let at = match slot {
            Some(s) => self.clamp_slot(s),
            None => self.units.len(),
        };
        self.units.insert(at, RichUnit::Marker(index));
        at + 1
    }

    /// 删除槽位之前的一个单元（退格），返回新光标槽位
    pub fn delete_backward(&mut self, slot: usize) -> usize {
        let at = self.clamp_slot(slot);
        if at == 0 {
            return 0;
        }
        self.units.remove(at - 1);
        at - 1
    }

    /// 删除槽位之后的一个单元（Delete 键）
    pub fn delete_forward(&mut self, slot: usize) {
        let at = self.clamp_slot(slot);
        if at < self.units.len() {
            self.units.remove(at);
        }
    }

    /// 把一个单元移到新的槽位（标签拖放重排）
    ///
    /// 只移动位置，不改变单元内容，也不触碰标记点列表。
    /// 返回该单元落点的新位置。
    pub fn move_unit(&mut self, from: usize, to_slot: usize) -> usize {
        if from >= self.units.len() {
            return self.clamp_slot(to_slot);
        }
        let unit = self.units.remove(from);
        // 目标槽位以移除前的序列计量，移除点之后的槽位整体前移一位
        let mut at = to_slot;
        if at > from {
            at -= 1;
        }
        let at = at.min(self.units.len());
        self.units.insert(at, unit);
        at
    }

    // ========== 标签维护 ==========

    /// 删除所有指向该编号的标签
    pub fn remove_marker_tags(&mut self, index: u32) {
        self.units.retain(|u| *u != RichUnit::Marker(index));
    }

    /// 某编号被删除后，更高编号的标签整体减一，
    /// 与标记点列表的重新编号保持一致
    pub fn shift_marker_tags_above(&mut self, removed_index: u32) {
        for unit in &mut self.units {
            if let RichUnit::Marker(n) = unit {
                if *n > removed_index {
                    *n -= 1;
                }
            }
        }
    }

    /// 清除所有标签，保留字面文本（"清空"按钮的行为）
    pub fn clear_marker_tags(&mut self) {
        self.units.retain(|u| !matches!(u, RichUnit::Marker(_)));
    }

    /// 当前标签数量
    pub fn marker_count(&self) -> usize {
        self.units
            .iter()
            .filter(|u| matches!(u, RichUnit::Marker(_)))
            .count()
    }

    // ========== 纯文本互转 ==========

    /// 序列化：富文本 → 纯文本
    ///
    /// 深度优先走一遍序列：字符原样累加，标签折叠为 `MarkerN`，
    /// 换行贡献单个 `\n` 且不与已有结尾换行重复，结果去除首尾空白。
    pub fn to_plain(&self) -> String {
        let mut out = String::new();
        for unit in &self.units {
            match unit {
                RichUnit::Char(ch) => out.push(*ch),
                RichUnit::Marker(n) => {
                    out.push_str(MARKER_TOKEN);
                    out.push_str(&n.to_string());
                }
                RichUnit::Break => {
                    if !out.ends_with('\n') {
                        out.push('\n');
                    }
                }
            }
        }
        out.trim().to_string()
    }

    /// 反序列化：纯文本 → 富文本
    ///
    /// 扫描 `Marker` + 一个或多个数字的模式，匹配之间的字面文本
    /// 原样收录，`\n` 还原为换行单元。对 [`to_plain`] 产出的任何
    /// 字符串，本函数精确还原标签与文本的顺序。
    pub fn from_plain(text: &str) -> Self {
        let mut units = Vec::new();
        let mut rest = text;

        while !rest.is_empty() {
            if let Some((index, consumed)) = match_marker_token(rest) {
                units.push(RichUnit::Marker(index));
                rest = &rest[consumed..];
                continue;
            }
            let ch = rest.chars().next().unwrap();
            match ch {
                '\r' => {}
                '\n' => units.push(RichUnit::Break),
                _ => units.push(RichUnit::Char(ch)),
            }
            rest = &rest[ch.len_utf8()..];
        }

        Self { units }
    }
}

/// 尝试在字符串开头匹配 `MarkerN`
///
/// 命中时返回 (编号, 消耗的字节数)。`Marker` 后没有数字、
/// 或数字超出 u32 范围时按字面文本处理。
fn match_marker_token(s: &str) -> Option<(u32, usize)> {
    let tail = s.strip_prefix(MARKER_TOKEN)?;
    let digits: String = tail.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let index = digits.parse::<u32>().ok()?;
    Some((index, MARKER_TOKEN.len() + digits.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(units: Vec<RichUnit>) -> RichContent {
        let mut c = RichContent::new();
        for (i, u) in units.into_iter().enumerate() {
            match u {
                RichUnit::Char(ch) => {
                    c.insert_text(i, &ch.to_string());
                }
                RichUnit::Marker(n) => {
                    c.insert_marker(Some(i), n);
                }
                RichUnit::Break => {
                    c.insert_break(i);
                }
            }
        }
        c
    }

    fn text_units(s: &str) -> Vec<RichUnit> {
        s.chars().map(RichUnit::Char).collect()
    }

    #[test]
    fn test_serialize_interleaved_tags() {
        let mut units = text_units("Pick up ");
        units.push(RichUnit::Marker(1));
        units.extend(text_units(" and move to "));
        units.push(RichUnit::Marker(2));
        let c = content(units);

        assert_eq!(c.to_plain(), "Pick up Marker1 and move to Marker2");
    }

    #[test]
    fn test_roundtrip_reproduces_sequence() {
        let mut units = text_units("Pick up ");
        units.push(RichUnit::Marker(1));
        units.extend(text_units(" and move to "));
        units.push(RichUnit::Marker(2));
        let c = content(units);

        let back = RichContent::from_plain(&c.to_plain());
        assert_eq!(back.units(), c.units());
    }

    #[test]
    fn test_serialize_collapses_adjacent_breaks() {
        let mut c = RichContent::new();
        let mut at = c.insert_text(0, "a");
        at = c.insert_break(at);
        at = c.insert_break(at);
        c.insert_text(at, "b");

        assert_eq!(c.to_plain(), "a\nb");
    }

    #[test]
    fn test_serialize_trims_edges() {
        let mut c = RichContent::new();
        let mut at = c.insert_break(0);
        at = c.insert_text(at, "  hello  ");
        c.insert_break(at);

        assert_eq!(c.to_plain(), "hello");
    }

    #[test]
    fn test_deserialize_multidigit_and_literal_token() {
        let c = RichContent::from_plain("see Marker12, not Marker alone");
        let markers: Vec<u32> = c
            .units()
            .iter()
            .filter_map(|u| match u {
                RichUnit::Marker(n) => Some(*n),
                _ => None,
            })
            .collect();
        assert_eq!(markers, vec![12]);
        // "Marker alone" 没有数字，保持字面文本
        assert!(c.to_plain().contains("not Marker alone"));
    }

    #[test]
    fn test_deserialize_restores_breaks() {
        let c = RichContent::from_plain("line one\nMarker1\nline two");
        assert_eq!(c.to_plain(), "line one\nMarker1\nline two");
    }

    #[test]
    fn test_insert_marker_at_caret_and_append() {
        let mut c = RichContent::new();
        c.insert_text(0, "ab");

        // 光标在 a 和 b 之间
        let after = c.insert_marker(Some(1), 1);
        assert_eq!(after, 2);
        assert_eq!(c.to_plain(), "aMarker1b");

        // 无光标时追加末尾
        c.insert_marker(None, 2);
        assert_eq!(c.to_plain(), "aMarker1bMarker2");
    }

    #[test]
    fn test_delete_backward_removes_tag_atomically() {
        let mut c = RichContent::new();
        let at = c.insert_text(0, "x");
        let at = c.insert_marker(Some(at), 1);
        let at = c.delete_backward(at);
        assert_eq!(at, 1);
        assert_eq!(c.to_plain(), "x");
        assert_eq!(c.marker_count(), 0);
    }

    #[test]
    fn test_delete_flow_renumbers_tags() {
        // 三个标签 1,2,3，删除编号 2 对应的标记点
        let mut c = RichContent::new();
        let at = c.insert_marker(None, 1);
        let at = c.insert_marker(Some(at), 2);
        c.insert_marker(Some(at), 3);

        c.remove_marker_tags(2);
        c.shift_marker_tags_above(2);

        assert_eq!(c.to_plain(), "Marker1Marker2");
        assert_eq!(c.marker_count(), 2);
    }

    #[test]
    fn test_clear_tags_keeps_text() {
        let mut c = RichContent::new();
        let at = c.insert_text(0, "keep ");
        let at = c.insert_marker(Some(at), 1);
        c.insert_text(at, " this");

        c.clear_marker_tags();
        assert_eq!(c.to_plain(), "keep  this");
    }

    #[test]
    fn test_move_unit_keeps_index() {
        // "aMarker1b" 中把标签拖到开头
        let mut c = RichContent::new();
        let at = c.insert_text(0, "a");
        let at = c.insert_marker(Some(at), 1);
        c.insert_text(at, "b");

        let new_pos = c.move_unit(1, 0);
        assert_eq!(new_pos, 0);
        assert_eq!(c.to_plain(), "Marker1ab");

        // 再拖到末尾
        let new_pos = c.move_unit(0, 3);
        assert_eq!(new_pos, 2);
        assert_eq!(c.to_plain(), "abMarker1");
    }

    #[test]
    fn test_paste_is_reduced_to_plain_text() {
        let mut c = RichContent::new();
        c.insert_text(0, "one\r\ntwo");
        assert_eq!(c.to_plain(), "one\ntwo");
    }

    #[test]
    fn test_out_of_range_slots_are_clamped() {
        let mut c = RichContent::new();
        c.insert_text(99, "ab");
        assert_eq!(c.to_plain(), "ab");
        c.delete_forward(99);
        assert_eq!(c.to_plain(), "ab");
        assert_eq!(c.delete_backward(0), 0);
    }
}

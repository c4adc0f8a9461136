use crate::analyzer::{ScopeNode, ScopeTree};
use searchdata::EntryKind;
use std::collections::HashMap;

/// Mermaid 图生成器
pub struct MermaidGenerator {
    max_nodes: usize,
}

impl MermaidGenerator {
    pub fn new() -> Self {
        Self { max_nodes: 100 }
    }

    pub fn with_max_nodes(mut self, max: usize) -> Self {
        self.max_nodes = max;
        self
    }

    /// 生成作用域层级图 Mermaid 代码
    ///
    /// 节点 id 按序号分配 (`n0`, `n1`...), 名字只出现在标签里
    pub fn generate_scope_diagram(&self, tree: &ScopeTree) -> String {
        let mut lines = vec!["flowchart TD".to_string()];

        // 按成员数排序，取前 N 个
        let mut sorted: Vec<&ScopeNode> = tree.nodes().collect();
        sorted.sort_by(|a, b| {
            b.member_count()
                .cmp(&a.member_count())
                .then_with(|| a.name.cmp(&b.name))
        });
        sorted.truncate(self.max_nodes);

        let ids: HashMap<&str, usize> = sorted
            .iter()
            .enumerate()
            .map(|(idx, n)| (n.name.as_str(), idx))
            .collect();

        // 生成节点
        for (idx, node) in sorted.iter().enumerate() {
            lines.push(format!("    {}", Self::node_shape(idx, node)));
        }

        // 生成边
        for (idx, node) in sorted.iter().enumerate() {
            for child in &node.children {
                if let Some(child_idx) = ids.get(child.as_str()) {
                    lines.push(format!("    n{} --> n{}", idx, child_idx));
                }
            }
        }

        lines.join("\n")
    }

    fn node_shape(idx: usize, node: &ScopeNode) -> String {
        let label = Self::label(node);
        match node.kind {
            Some(EntryKind::Namespace) => format!("n{}[[\"{}\"]]", idx, label),
            Some(EntryKind::File) => format!("n{}([\"{}\"])", idx, label),
            None => format!("n{}{{{{\"{}\"}}}}", idx, label),
            Some(_) => format!("n{}[\"{}\"]", idx, label),
        }
    }

    #[doc(hidden)]
    pub fn label(node: &ScopeNode) -> String {
        let name = node.short_name().replace('"', "#quot;");
        match node.member_count() {
            0 => name,
            n => format!("{} ({})", name, n),
        }
    }
}

impl Default for MermaidGenerator {
    fn default() -> Self {
        Self::new()
    }
}

use searchdata::{EntryKind, SearchEntry};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// 成员的一处文档位置
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberRef {
    pub href: String,
    /// 反转义后的作用域标签, 多处记录时是完整签名
    pub signature: String,
}

/// compound 节点 (命名空间、类、文件...)
#[derive(Debug, Clone, Serialize)]
pub struct ScopeNode {
    /// 限定名: "HF::HartreeFock"
    pub name: String,
    /// 只作为父级出现、本身没有文档页时为 None
    pub kind: Option<EntryKind>,
    pub page: Option<String>,
    pub children: BTreeSet<String>,
    pub members: BTreeMap<String, Vec<MemberRef>>,
}

impl ScopeNode {
    fn new(name: &str, kind: Option<EntryKind>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            page: None,
            children: BTreeSet::new(),
            members: BTreeMap::new(),
        }
    }

    pub fn member_count(&self) -> usize {
        self.members.values().map(Vec::len).sum()
    }

    /// 最后一段名字
    pub fn short_name(&self) -> &str {
        match split_scope(&self.name) {
            Some((_, last)) => last,
            None => &self.name,
        }
    }
}

/// 同一 compound 内多处记录的成员
#[derive(Debug, Clone, Serialize)]
pub struct Overload {
    pub compound: String,
    pub member: String,
    pub count: usize,
}

/// 树的统计信息
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScopeStats {
    pub compounds_by_kind: BTreeMap<String, usize>,
    pub implicit_compounds: usize,
    pub members: usize,
}

/// 按顶层 `::` 拆出父级, 模板参数里的 `::` 不算
pub fn split_scope(name: &str) -> Option<(&str, &str)> {
    let bytes = name.as_bytes();
    let mut depth = 0i32;
    let mut split = None;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' | b'(' => depth += 1,
            b'>' | b')' => depth -= 1,
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                split = Some(i);
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    split.map(|pos| (&name[..pos], &name[pos + 2..]))
}

/// 能嵌套在命名空间/类中的 compound
fn is_nested_kind(kind: Option<EntryKind>) -> bool {
    matches!(
        kind,
        None | Some(EntryKind::Namespace)
            | Some(EntryKind::Class)
            | Some(EntryKind::Struct)
            | Some(EntryKind::Union)
            | Some(EntryKind::Interface)
    )
}

/// compound 作用域树
#[derive(Debug, Clone, Default)]
pub struct ScopeTree {
    nodes: BTreeMap<String, ScopeNode>,
}

impl ScopeTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从搜索条目构建
    ///
    /// compound 取自锚点页面名, 有片段的锚点挂为成员
    pub fn build(entries: &[SearchEntry]) -> Self {
        let mut tree = Self::new();
        for entry in entries {
            for anchor in &entry.anchors {
                let compound = anchor.compound();
                let compound_kind = anchor.compound_kind();
                tree.ensure_node(&compound, Some(compound_kind));

                let node = match tree.nodes.get_mut(&compound) {
                    Some(node) => node,
                    None => continue,
                };

                if anchor.fragment().is_some() {
                    node.members
                        .entry(entry.name.clone())
                        .or_default()
                        .push(MemberRef {
                            href: anchor.href.clone(),
                            signature: anchor.scope_text(),
                        });
                } else {
                    node.page = Some(anchor.page().to_string());
                }
            }
        }
        tree
    }

    /// 确保节点存在, 并补齐隐式父级
    fn ensure_node(&mut self, name: &str, kind: Option<EntryKind>) {
        if let Some(node) = self.nodes.get_mut(name) {
            if node.kind.is_none() {
                node.kind = kind;
            }
            return;
        }

        self.nodes.insert(name.to_string(), ScopeNode::new(name, kind));

        if !is_nested_kind(kind) {
            return;
        }
        if let Some((parent, _)) = split_scope(name) {
            if parent.is_empty() {
                return;
            }
            let parent = parent.to_string();
            self.ensure_node(&parent, None);
            if let Some(p) = self.nodes.get_mut(&parent) {
                p.children.insert(name.to_string());
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ScopeNode> {
        self.nodes.get(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ScopeNode> {
        self.nodes.values()
    }

    /// 没有父级的节点
    pub fn roots(&self) -> Vec<&ScopeNode> {
        self.nodes
            .values()
            .filter(|node| {
                !is_nested_kind(node.kind)
                    || split_scope(&node.name).map_or(true, |(parent, _)| !self.nodes.contains_key(parent))
            })
            .collect()
    }

    pub fn children(&self, name: &str) -> Vec<&ScopeNode> {
        self.nodes
            .get(name)
            .map(|node| {
                node.children
                    .iter()
                    .filter_map(|child| self.nodes.get(child))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn members(&self, name: &str) -> Option<&BTreeMap<String, Vec<MemberRef>>> {
        self.nodes.get(name).map(|node| &node.members)
    }

    /// 先序遍历, 返回 (深度, 节点)
    pub fn walk(&self, max_depth: usize) -> Vec<(usize, &ScopeNode)> {
        let mut result = Vec::new();
        for root in self.roots() {
            self.walk_node(root, 0, max_depth, &mut result);
        }
        result
    }

    fn walk_node<'a>(
        &'a self,
        node: &'a ScopeNode,
        depth: usize,
        max_depth: usize,
        result: &mut Vec<(usize, &'a ScopeNode)>,
    ) {
        if depth > max_depth {
            return;
        }
        result.push((depth, node));
        for child in self.children(&node.name) {
            self.walk_node(child, depth + 1, max_depth, result);
        }
    }

    /// 同一 compound 中记录多次的成员, 次数降序
    pub fn overloaded(&self) -> Vec<Overload> {
        let mut overloads: Vec<Overload> = self
            .nodes
            .values()
            .flat_map(|node| {
                node.members
                    .iter()
                    .filter(|(_, refs)| refs.len() > 1)
                    .map(move |(member, refs)| Overload {
                        compound: node.name.clone(),
                        member: member.clone(),
                        count: refs.len(),
                    })
            })
            .collect();
        overloads.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| (&a.compound, &a.member).cmp(&(&b.compound, &b.member)))
        });
        overloads
    }

    pub fn stats(&self) -> ScopeStats {
        let mut stats = ScopeStats::default();
        for node in self.nodes.values() {
            match node.kind {
                Some(kind) => {
                    *stats
                        .compounds_by_kind
                        .entry(kind.as_str().to_string())
                        .or_insert(0) += 1
                }
                None => stats.implicit_compounds += 1,
            }
            stats.members += node.member_count();
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use searchdata::{search_id, Anchor, LinkTarget};

    fn entry(name: &str, anchors: &[(&str, &str)]) -> SearchEntry {
        SearchEntry::new(
            search_id(name),
            name,
            anchors
                .iter()
                .map(|(href, scope)| Anchor::new(*href, LinkTarget::Parent, *scope))
                .collect(),
        )
    }

    fn sample() -> Vec<SearchEntry> {
        vec![
            entry("calc_vexFa", &[("../classHF_1_1HartreeFock.html#a09", "HF::HartreeFock")]),
            entry("calc_vdir_single", &[("../classHF_1_1HartreeFock.html#a03", "HF::HartreeFock")]),
            entry(
                "clear",
                &[
                    ("../classExternalField_1_1TDHF.html#a42", "ExternalField::TDHF::clear()"),
                    ("../classExternalField_1_1TDHF.html#a43", "ExternalField::TDHF::clear(int)"),
                    ("../classContinuumOrbitals.html#a18", "ContinuumOrbitals::clear()"),
                ],
            ),
            entry("Coulomb", &[("../namespaceCoulomb.html", "")]),
            entry("CorePolarisation", &[("../classExternalField_1_1CorePolarisation.html", "ExternalField")]),
            entry("funs.cpp", &[("../funs_8cpp.html", "")]),
            entry("main", &[("../funs_8cpp.html#a3c", "funs.cpp")]),
        ]
    }

    #[test]
    fn test_split_scope() {
        assert_eq!(split_scope("HF::HartreeFock"), Some(("HF", "HartreeFock")));
        assert_eq!(split_scope("a::b::c"), Some(("a::b", "c")));
        assert_eq!(split_scope("Vec< std::size_t >"), None);
        assert_eq!(split_scope("ns::Vec< std::size_t >"), Some(("ns", "Vec< std::size_t >")));
        assert_eq!(split_scope("plain"), None);
    }

    #[test]
    fn test_build_creates_implicit_parents() {
        let tree = ScopeTree::build(&sample());

        // HF 只作为父级出现
        let hf = tree.get("HF").unwrap();
        assert!(hf.kind.is_none());
        assert!(hf.children.contains("HF::HartreeFock"));

        let hartree = tree.get("HF::HartreeFock").unwrap();
        assert_eq!(hartree.kind, Some(EntryKind::Class));
        assert_eq!(hartree.members.len(), 2);
        assert_eq!(hartree.short_name(), "HartreeFock");
    }

    #[test]
    fn test_build_records_pages_and_files() {
        let tree = ScopeTree::build(&sample());

        let coulomb = tree.get("Coulomb").unwrap();
        assert_eq!(coulomb.kind, Some(EntryKind::Namespace));
        assert_eq!(coulomb.page.as_deref(), Some("../namespaceCoulomb.html"));

        let file = tree.get("funs.cpp").unwrap();
        assert_eq!(file.kind, Some(EntryKind::File));
        assert!(file.members.contains_key("main"));
    }

    #[test]
    fn test_roots_and_walk() {
        let tree = ScopeTree::build(&sample());
        let roots: Vec<_> = tree.roots().iter().map(|n| n.name.as_str()).collect();
        assert_eq!(roots, vec!["ContinuumOrbitals", "Coulomb", "ExternalField", "HF", "funs.cpp"]);

        let walked = tree.walk(10);
        assert_eq!(walked.len(), tree.len());
        let ext = walked.iter().position(|(_, n)| n.name == "ExternalField").unwrap();
        assert_eq!(walked[ext + 1].0, 1);

        let shallow = tree.walk(0);
        assert_eq!(shallow.len(), roots.len());
    }

    #[test]
    fn test_overloaded() {
        let tree = ScopeTree::build(&sample());
        let overloads = tree.overloaded();
        assert_eq!(overloads.len(), 1);
        assert_eq!(overloads[0].compound, "ExternalField::TDHF");
        assert_eq!(overloads[0].member, "clear");
        assert_eq!(overloads[0].count, 2);
    }

    #[test]
    fn test_stats() {
        let tree = ScopeTree::build(&sample());
        let stats = tree.stats();
        assert_eq!(stats.members, 6);
        assert_eq!(stats.implicit_compounds, 2);
        assert_eq!(stats.compounds_by_kind.get("class"), Some(&4));
        assert_eq!(stats.compounds_by_kind.get("namespace"), Some(&1));
        assert_eq!(stats.compounds_by_kind.get("file"), Some(&1));
    }
}

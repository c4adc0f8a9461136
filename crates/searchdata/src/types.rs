use serde::{Deserialize, Serialize};

use crate::escape::{split_compound_page, unescape_html};

/// 文档条目类型, 由锚点页面推断
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Namespace,
    Class,
    Struct,
    Union,
    Interface,
    File,
    Group,
    Page,
    Member,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Namespace => "namespace",
            Self::Class => "class",
            Self::Struct => "struct",
            Self::Union => "union",
            Self::Interface => "interface",
            Self::File => "file",
            Self::Group => "group",
            Self::Page => "page",
            Self::Member => "member",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "namespace" => Some(Self::Namespace),
            "class" => Some(Self::Class),
            "struct" => Some(Self::Struct),
            "union" => Some(Self::Union),
            "interface" => Some(Self::Interface),
            "file" => Some(Self::File),
            "group" => Some(Self::Group),
            "page" => Some(Self::Page),
            "member" => Some(Self::Member),
            _ => None,
        }
    }
}

/// 链接打开方式
///
/// 文件里的标志位: `1` 在父窗口打开 (站内文档), `0` 新窗口打开 (外部 tag 文件)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkTarget {
    Parent,
    Blank,
}

impl LinkTarget {
    pub fn from_flag(flag: i64) -> Option<Self> {
        match flag {
            1 => Some(Self::Parent),
            0 => Some(Self::Blank),
            _ => None,
        }
    }

    pub fn flag(&self) -> i64 {
        match self {
            Self::Parent => 1,
            Self::Blank => 0,
        }
    }
}

/// 文档锚点: 条目在站点中被记录的一处位置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    /// 相对 URL: `../classGrid.html#a9957c8...`
    pub href: String,
    pub target: LinkTarget,
    /// 显示用作用域, 保持文件中的 HTML 转义
    pub scope: String,
}

impl Anchor {
    pub fn new(href: impl Into<String>, target: LinkTarget, scope: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            target,
            scope: scope.into(),
        }
    }

    /// `#` 之前的页面部分
    pub fn page(&self) -> &str {
        self.href.split('#').next().unwrap_or(&self.href)
    }

    /// `#` 之后的片段
    pub fn fragment(&self) -> Option<&str> {
        self.href
            .split_once('#')
            .map(|(_, f)| f)
            .filter(|f| !f.is_empty())
    }

    /// 有片段即为成员, 否则按页面前缀判断
    pub fn kind(&self) -> EntryKind {
        if self.fragment().is_some() {
            EntryKind::Member
        } else {
            split_compound_page(self.page()).0
        }
    }

    /// 页面所属 compound 的限定名
    pub fn compound(&self) -> String {
        split_compound_page(self.page()).1
    }

    /// 页面所属 compound 的类型
    pub fn compound_kind(&self) -> EntryKind {
        split_compound_page(self.page()).0
    }

    pub fn scope_text(&self) -> String {
        unescape_html(&self.scope)
    }
}

/// 搜索条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchEntry {
    /// 转义后的搜索 id, 在同一索引内唯一
    pub id: String,
    /// 显示名
    pub name: String,
    pub anchors: Vec<Anchor>,
}

impl SearchEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>, anchors: Vec<Anchor>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            anchors,
        }
    }

    /// 多处记录 (重载或同名成员)
    pub fn is_overloaded(&self) -> bool {
        self.anchors.len() > 1
    }

    /// 每个锚点对应的限定名
    ///
    /// 单个锚点时作用域只是父级, 需要拼上名字; 多个锚点时作用域是完整签名
    pub fn qualified_names(&self) -> Vec<String> {
        if let [anchor] = self.anchors.as_slice() {
            let scope = anchor.scope_text();
            if scope.is_empty() {
                return vec![self.name.clone()];
            }
            return vec![format!("{}::{}", scope, self.name)];
        }

        self.anchors
            .iter()
            .map(|a| strip_signature(&a.scope_text()).to_string())
            .collect()
    }
}

/// 去掉签名中的参数列表
pub fn strip_signature(label: &str) -> &str {
    // operator() 的名字本身带括号, 找第一个不属于 operator 的 '('
    let search_from = label
        .find("operator")
        .map(|pos| pos + "operator".len())
        .map(|pos| if label[pos..].starts_with("()") { pos + 2 } else { pos })
        .unwrap_or(0);

    match label[search_from..].find('(') {
        Some(pos) => label[..search_from + pos].trim_end(),
        None => label.trim_end(),
    }
}

/// 一个搜索数据文件
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchData {
    /// 被赋值的变量名, 通常是 `searchData`
    pub variable: String,
    pub entries: Vec<SearchEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_anchor() -> Anchor {
        Anchor::new(
            "../classGrid.html#a9957c897ccc249f8c76770e513df38c6",
            LinkTarget::Parent,
            "Grid",
        )
    }

    #[test]
    fn test_anchor_parts() {
        let anchor = grid_anchor();
        assert_eq!(anchor.page(), "../classGrid.html");
        assert_eq!(anchor.fragment(), Some("a9957c897ccc249f8c76770e513df38c6"));
        assert_eq!(anchor.kind(), EntryKind::Member);
        assert_eq!(anchor.compound(), "Grid");
        assert_eq!(anchor.compound_kind(), EntryKind::Class);
    }

    #[test]
    fn test_anchor_compound_page() {
        let anchor = Anchor::new("../namespaceCoulomb.html", LinkTarget::Parent, "");
        assert_eq!(anchor.fragment(), None);
        assert_eq!(anchor.kind(), EntryKind::Namespace);
    }

    #[test]
    fn test_link_target_flag() {
        assert_eq!(LinkTarget::from_flag(1), Some(LinkTarget::Parent));
        assert_eq!(LinkTarget::from_flag(0), Some(LinkTarget::Blank));
        assert_eq!(LinkTarget::from_flag(2), None);
        assert_eq!(LinkTarget::Blank.flag(), 0);
    }

    #[test]
    fn test_qualified_names_single() {
        let entry = SearchEntry::new("calc_5fdu", "calc_du", vec![grid_anchor()]);
        assert_eq!(entry.qualified_names(), vec!["Grid::calc_du"]);
        assert!(!entry.is_overloaded());

        let ns = SearchEntry::new(
            "coulomb",
            "Coulomb",
            vec![Anchor::new("../namespaceCoulomb.html", LinkTarget::Parent, "")],
        );
        assert_eq!(ns.qualified_names(), vec!["Coulomb"]);
    }

    #[test]
    fn test_qualified_names_overloaded() {
        let entry = SearchEntry::new(
            "compare",
            "compare",
            vec![
                Anchor::new(
                    "../namespaceqip.html#aca2f",
                    LinkTarget::Parent,
                    "qip::compare(const std::vector&lt; T &gt; &amp;first)",
                ),
                Anchor::new(
                    "../classLinAlg_1_1SqMatrix.html#a01",
                    LinkTarget::Parent,
                    "LinAlg::SqMatrix::compare()",
                ),
            ],
        );
        assert!(entry.is_overloaded());
        assert_eq!(
            entry.qualified_names(),
            vec!["qip::compare", "LinAlg::SqMatrix::compare"]
        );
    }

    #[test]
    fn test_strip_signature_operator_call() {
        assert_eq!(strip_signature("Functor::operator()(double x) const"), "Functor::operator()");
        assert_eq!(strip_signature("a::b"), "a::b");
        assert_eq!(strip_signature("f (int)"), "f");
    }

    #[test]
    fn test_entry_json_shape() {
        let entry = SearchEntry::new("grid", "Grid", vec![grid_anchor()]);
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["anchors"][0]["target"], "parent");
        assert_eq!(value["anchors"][0]["scope"], "Grid");
        assert_eq!(serde_json::to_value(EntryKind::Namespace).unwrap(), "namespace");
    }

    #[test]
    fn test_entry_kind_round_trip_names() {
        for kind in [EntryKind::Namespace, EntryKind::File, EntryKind::Member] {
            assert_eq!(EntryKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(EntryKind::from_str("bogus"), None);
    }
}

//! 按 Doxygen 的排版输出搜索数据

use crate::types::{Anchor, SearchData};

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn write_anchor(anchor: &Anchor) -> String {
    format!(
        "[{},{},{}]",
        quote(&anchor.href),
        anchor.target.flag(),
        quote(&anchor.scope)
    )
}

/// 生成 `var searchData=[...];` 文本
pub fn write_search_data(data: &SearchData) -> String {
    let variable = if data.variable.is_empty() {
        "searchData"
    } else {
        &data.variable
    };

    let lines: Vec<String> = data
        .entries
        .iter()
        .map(|entry| {
            let anchors: Vec<String> = entry.anchors.iter().map(write_anchor).collect();
            let mut body = vec![quote(&entry.name)];
            body.extend(anchors);
            format!("  [{},[{}]]", quote(&entry.id), body.join(","))
        })
        .collect();

    format!("var {}=\n[\n{}\n];\n", variable, lines.join(",\n"))
}

//! 标识符与文件名转义
//!
//! Doxygen 在两处做转义: 搜索 id (`check_value` -> `check_5fvalue`)
//! 和 compound 页面文件名 (`HF::HartreeFock` -> `classHF_1_1HartreeFock.html`)

use crate::types::EntryKind;

/// 计算名字对应的搜索 id
///
/// 小写化, 保留 `[a-z0-9]`, 其余每个 UTF-8 字节写成 `_xx`
pub fn search_id(name: &str) -> String {
    let mut id = String::with_capacity(name.len());
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            id.push(c);
        } else {
            let mut buf = [0u8; 4];
            for b in c.encode_utf8(&mut buf).bytes() {
                id.push_str(&format!("_{:02x}", b));
            }
        }
    }
    id
}

/// 解码搜索 id, 返回小写名字
pub fn decode_search_id(id: &str) -> Option<String> {
    let bytes = id.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'_' {
            let hex = id.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// `_0x` 形式的两位转义
const WIDE_ESCAPES: &[(char, char)] = &[
    ('0', ','),
    ('1', ' '),
    ('2', '{'),
    ('3', '}'),
    ('4', '?'),
    ('5', '^'),
    ('6', '%'),
    ('7', '('),
    ('8', ')'),
    ('9', '+'),
    ('a', '='),
    ('b', '$'),
    ('c', '\\'),
    ('d', '@'),
    ('e', ']'),
    ('f', '['),
    ('g', '#'),
];

/// 还原 compound 文件名中的转义 (不含扩展名)
///
/// 无法识别的转义原样保留
pub fn decode_compound_name(stem: &str) -> String {
    let chars: Vec<char> = stem.chars().collect();
    let mut out = String::with_capacity(stem.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '_' || i + 1 >= chars.len() {
            out.push(chars[i]);
            i += 1;
            continue;
        }

        let decoded = match chars[i + 1] {
            '_' => Some('_'),
            '1' => Some(':'),
            '2' => Some('/'),
            '3' => Some('<'),
            '4' => Some('>'),
            '5' => Some('*'),
            '6' => Some('&'),
            '7' => Some('|'),
            '8' => Some('.'),
            '9' => Some('!'),
            '0' => {
                let wide = chars.get(i + 2).and_then(|c| {
                    WIDE_ESCAPES.iter().find(|(k, _)| k == c).map(|(_, v)| *v)
                });
                if let Some(c) = wide {
                    out.push(c);
                    i += 3;
                    continue;
                }
                None
            }
            _ => None,
        };

        match decoded {
            Some(c) => {
                out.push(c);
                i += 2;
            }
            None => {
                out.push('_');
                i += 1;
            }
        }
    }

    out
}

/// compound 页面前缀
const PAGE_PREFIXES: &[(&str, EntryKind)] = &[
    ("namespace", EntryKind::Namespace),
    ("class", EntryKind::Class),
    ("struct", EntryKind::Struct),
    ("union", EntryKind::Union),
    ("interface", EntryKind::Interface),
    ("group__", EntryKind::Group),
];

/// 从页面路径拆出 compound 类型和名字
///
/// `../classHF_1_1HartreeFock.html` -> `(Class, "HF::HartreeFock")`
pub fn split_compound_page(page: &str) -> (EntryKind, String) {
    let file = page.rsplit('/').next().unwrap_or(page);
    let stem = file
        .strip_suffix(".html")
        .or_else(|| file.strip_suffix(".htm"))
        .unwrap_or(file);

    for (prefix, kind) in PAGE_PREFIXES {
        if let Some(rest) = stem.strip_prefix(prefix) {
            if !rest.is_empty() {
                return (*kind, decode_compound_name(rest));
            }
        }
    }

    let name = decode_compound_name(stem);
    // 源文件页: funs_8cpp.html -> funs.cpp
    if stem.contains("_8") && name.contains('.') {
        (EntryKind::File, name)
    } else {
        (EntryKind::Page, name)
    }
}

/// 反转义 HTML 实体
///
/// 未知实体原样保留
pub fn unescape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];

        let decoded = tail.find(';').and_then(|semi| {
            let entity = &tail[1..semi];
            decode_entity(entity).map(|c| (c, semi + 1))
        });

        match decoded {
            Some((c, len)) => {
                out.push(c);
                rest = &tail[len..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let num = entity.strip_prefix('#')?;
            let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// HTML 转义, 与 Doxygen 输出一致
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_id_escapes_non_alnum() {
        assert_eq!(search_id("check_value"), "check_5fvalue");
        assert_eq!(search_id("calc_vexFa"), "calc_5fvexfa");
        assert_eq!(search_id("CorrelationPotential"), "correlationpotential");
        assert_eq!(search_id("operator()"), "operator_28_29");
        assert_eq!(search_id("c"), "c");
    }

    #[test]
    fn test_search_id_multibyte() {
        // U+00E9 -> c3 a9
        assert_eq!(search_id("é"), "_c3_a9");
    }

    #[test]
    fn test_decode_search_id() {
        assert_eq!(decode_search_id("check_5fvalue").as_deref(), Some("check_value"));
        assert_eq!(decode_search_id("_c3_a9").as_deref(), Some("é"));
        assert_eq!(decode_search_id("bad_5"), None);
        assert_eq!(decode_search_id("bad_zz"), None);
    }

    #[test]
    fn test_decode_compound_name() {
        assert_eq!(decode_compound_name("HF_1_1HartreeFock"), "HF::HartreeFock");
        assert_eq!(decode_compound_name("my__name"), "my_name");
        assert_eq!(decode_compound_name("Vec_3_01T_01_4"), "Vec< T >");
        assert_eq!(decode_compound_name("funs_8cpp"), "funs.cpp");
        assert_eq!(decode_compound_name("trailing_"), "trailing_");
    }

    #[test]
    fn test_split_compound_page() {
        assert_eq!(
            split_compound_page("../classHF_1_1HartreeFock.html"),
            (EntryKind::Class, "HF::HartreeFock".to_string())
        );
        assert_eq!(
            split_compound_page("../namespacePhysConst.html"),
            (EntryKind::Namespace, "PhysConst".to_string())
        );
        assert_eq!(
            split_compound_page("../structLinAlg_1_1View.html"),
            (EntryKind::Struct, "LinAlg::View".to_string())
        );
        assert_eq!(
            split_compound_page("../funs_8cpp.html"),
            (EntryKind::File, "funs.cpp".to_string())
        );
        assert_eq!(
            split_compound_page("../index.html"),
            (EntryKind::Page, "index".to_string())
        );
    }

    #[test]
    fn test_unescape_html() {
        assert_eq!(
            unescape_html("const std::vector&lt; T &gt; &amp;first"),
            "const std::vector< T > &first"
        );
        assert_eq!(unescape_html("&#39;a&#x27;"), "'a'");
        assert_eq!(unescape_html("a & b &unknown; c"), "a & b &unknown; c");
        assert_eq!(unescape_html("trailing &"), "trailing &");
    }

    #[test]
    fn test_escape_html_inverse() {
        let text = "std::vector< T > &first";
        assert_eq!(unescape_html(&escape_html(text)), text);
    }
}

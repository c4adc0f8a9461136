//! 搜索数据解析器
//!
//! Doxygen 输出的是 JS 字面量赋值, 这里只实现需要的子集:
//! 数组、对象、字符串、整数、注释和 `var x = ...;` 赋值

use thiserror::Error;

use crate::types::{Anchor, LinkTarget, SearchData, SearchEntry};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("{line}:{column}: unexpected character '{found}', expected {expected}")]
    Unexpected {
        line: usize,
        column: usize,
        found: char,
        expected: &'static str,
    },
    #[error("{line}:{column}: unterminated string")]
    UnterminatedString { line: usize, column: usize },
    #[error("unexpected end of input, expected {0}")]
    UnexpectedEnd(&'static str),
    #[error("{line}:{column}: integer out of range")]
    IntegerOverflow { line: usize, column: usize },
    #[error("no assignment to `{0}` found")]
    MissingVariable(String),
    #[error("no assignment found")]
    MissingAssignment,
    #[error("entry {index}: {reason}")]
    Shape { index: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// JS 字面量值
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsValue {
    Str(String),
    Int(i64),
    Array(Vec<JsValue>),
    /// 保持源码顺序的键值对
    Object(Vec<(String, JsValue)>),
}

impl JsValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[JsValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&[(String, JsValue)]> {
        match self {
            Self::Object(fields) => Some(fields),
            _ => None,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Int(_) => "integer",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }
}

struct Cursor<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            chars: src.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn unexpected(&self, found: char, expected: &'static str) -> ParseError {
        ParseError::Unexpected {
            line: self.line,
            column: self.column,
            found,
            expected,
        }
    }

    /// 跳过空白和注释
    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') => {
                    let mut lookahead = self.chars.clone();
                    lookahead.next();
                    match lookahead.peek() {
                        Some('/') => {
                            while let Some(c) = self.bump() {
                                if c == '\n' {
                                    break;
                                }
                            }
                        }
                        Some('*') => {
                            self.bump();
                            self.bump();
                            let mut prev = '\0';
                            loop {
                                match self.bump() {
                                    Some('/') if prev == '*' => break,
                                    Some(c) => prev = c,
                                    None => return Err(ParseError::UnexpectedEnd("end of comment")),
                                }
                            }
                        }
                        _ => return Ok(()),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn expect(&mut self, want: char, expected: &'static str) -> Result<()> {
        self.skip_trivia()?;
        match self.bump() {
            Some(c) if c == want => Ok(()),
            Some(c) => Err(self.unexpected(c, expected)),
            None => Err(ParseError::UnexpectedEnd(expected)),
        }
    }

    fn ident(&mut self) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                s.push(c);
                self.bump();
            } else {
                break;
            }
        }
        s
    }

    fn value(&mut self) -> Result<JsValue> {
        self.skip_trivia()?;
        match self.peek() {
            Some('[') => self.array(),
            Some('{') => self.object(),
            Some('\'') | Some('"') => self.string().map(JsValue::Str),
            Some(c) if c == '-' || c.is_ascii_digit() => self.integer(),
            Some(c) => Err(self.unexpected(c, "value")),
            None => Err(ParseError::UnexpectedEnd("value")),
        }
    }

    fn array(&mut self) -> Result<JsValue> {
        self.bump();
        let mut items = Vec::new();
        loop {
            self.skip_trivia()?;
            if self.peek() == Some(']') {
                self.bump();
                return Ok(JsValue::Array(items));
            }
            items.push(self.value()?);
            self.skip_trivia()?;
            match self.bump() {
                Some(',') => continue,
                Some(']') => return Ok(JsValue::Array(items)),
                Some(c) => return Err(self.unexpected(c, "',' or ']'")),
                None => return Err(ParseError::UnexpectedEnd("']'")),
            }
        }
    }

    fn object(&mut self) -> Result<JsValue> {
        self.bump();
        let mut fields = Vec::new();
        loop {
            self.skip_trivia()?;
            let key = match self.peek() {
                Some('}') => {
                    self.bump();
                    return Ok(JsValue::Object(fields));
                }
                Some('\'') | Some('"') => self.string()?,
                Some(c) if c.is_alphanumeric() || c == '_' || c == '$' => self.ident(),
                Some(c) => return Err(self.unexpected(c, "object key")),
                None => return Err(ParseError::UnexpectedEnd("'}'")),
            };
            self.expect(':', "':'")?;
            let value = self.value()?;
            fields.push((key, value));
            self.skip_trivia()?;
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(JsValue::Object(fields)),
                Some(c) => return Err(self.unexpected(c, "',' or '}'")),
                None => return Err(ParseError::UnexpectedEnd("'}'")),
            }
        }
    }

    fn string(&mut self) -> Result<String> {
        let (line, column) = (self.line, self.column);
        let quote = self.bump().ok_or(ParseError::UnexpectedEnd("string"))?;
        let mut s = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(s),
                Some('\\') => match self.bump() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('r') => s.push('\r'),
                    Some('u') => {
                        let hex: String = (0..4).filter_map(|_| self.bump()).collect();
                        let c = u32::from_str_radix(&hex, 16)
                            .ok()
                            .and_then(char::from_u32)
                            .ok_or(ParseError::UnterminatedString { line, column })?;
                        s.push(c);
                    }
                    Some(c) => s.push(c),
                    None => return Err(ParseError::UnterminatedString { line, column }),
                },
                Some('\n') | None => return Err(ParseError::UnterminatedString { line, column }),
                Some(c) => s.push(c),
            }
        }
    }

    fn integer(&mut self) -> Result<JsValue> {
        let (line, column) = (self.line, self.column);
        let mut digits = String::new();
        if self.peek() == Some('-') {
            digits.push('-');
            self.bump();
        }
        match self.peek() {
            Some(c) if c.is_ascii_digit() => {}
            Some(c) => return Err(self.unexpected(c, "integer")),
            None => return Err(ParseError::UnexpectedEnd("integer")),
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.bump();
            } else {
                break;
            }
        }
        digits
            .parse()
            .map(JsValue::Int)
            .map_err(|_| ParseError::IntegerOverflow { line, column })
    }

    /// 读取一条 `[var] name = value [;]`, 输入结束返回 None
    fn assignment(&mut self) -> Result<Option<(String, JsValue)>> {
        self.skip_trivia()?;
        if self.peek().is_none() {
            return Ok(None);
        }

        let mut name = self.ident();
        if matches!(name.as_str(), "var" | "let" | "const") {
            self.skip_trivia()?;
            name = self.ident();
        }
        if name.is_empty() {
            let c = self.peek().unwrap_or('\0');
            return Err(self.unexpected(c, "identifier"));
        }

        self.expect('=', "'='")?;
        let value = self.value()?;

        self.skip_trivia()?;
        if self.peek() == Some(';') {
            self.bump();
        }
        Ok(Some((name, value)))
    }
}

/// 解析文件中的全部赋值, 保持源码顺序
pub fn parse_assignments(src: &str) -> Result<Vec<(String, JsValue)>> {
    let mut cursor = Cursor::new(src);
    let mut assignments = Vec::new();
    while let Some(assignment) = cursor.assignment()? {
        assignments.push(assignment);
    }
    Ok(assignments)
}

/// 解析一个搜索数据文件
///
/// 取第一个赋值, 变量名不限
pub fn parse_search_data(src: &str) -> Result<SearchData> {
    let mut assignments = parse_assignments(src)?;
    if assignments.is_empty() {
        return Err(ParseError::MissingAssignment);
    }
    let (variable, value) = assignments.swap_remove(0);
    let entries = entries_from_value(&value)?;
    tracing::debug!("Parsed {} entries from `{}`", entries.len(), variable);
    Ok(SearchData { variable, entries })
}

/// 解析指定变量
pub fn parse_search_variable(src: &str, variable: &str) -> Result<SearchData> {
    let value = parse_assignments(src)?
        .into_iter()
        .find(|(name, _)| name == variable)
        .map(|(_, value)| value)
        .ok_or_else(|| ParseError::MissingVariable(variable.to_string()))?;
    Ok(SearchData {
        variable: variable.to_string(),
        entries: entries_from_value(&value)?,
    })
}

fn shape(index: usize, reason: impl Into<String>) -> ParseError {
    ParseError::Shape {
        index,
        reason: reason.into(),
    }
}

/// 将字面量转换为条目列表
///
/// 结构: `[id, [name, [href, flag, scope], ...]]`
pub fn entries_from_value(value: &JsValue) -> Result<Vec<SearchEntry>> {
    let items = value
        .as_array()
        .ok_or_else(|| shape(0, format!("expected top-level array, found {}", value.type_name())))?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| entry_from_value(index, item))
        .collect()
}

fn entry_from_value(index: usize, item: &JsValue) -> Result<SearchEntry> {
    let pair = match item.as_array() {
        Some(pair) if pair.len() == 2 => pair,
        _ => return Err(shape(index, "entry is not an [id, [...]] pair")),
    };

    let id = pair[0]
        .as_str()
        .ok_or_else(|| shape(index, "id is not a string"))?;
    let body = pair[1]
        .as_array()
        .ok_or_else(|| shape(index, "entry body is not an array"))?;

    let (name, anchors) = match body.split_first() {
        Some((name, anchors)) => (name, anchors),
        None => return Err(shape(index, "entry body is empty")),
    };
    let name = name
        .as_str()
        .ok_or_else(|| shape(index, "name is not a string"))?;

    let anchors = anchors
        .iter()
        .map(|a| anchor_from_value(index, a))
        .collect::<Result<Vec<_>>>()?;

    Ok(SearchEntry::new(id, name, anchors))
}

fn anchor_from_value(index: usize, value: &JsValue) -> Result<Anchor> {
    let triple = match value.as_array() {
        Some(t) if t.len() == 3 => t,
        _ => return Err(shape(index, "anchor is not an [href, flag, scope] triple")),
    };

    let href = triple[0]
        .as_str()
        .ok_or_else(|| shape(index, "anchor href is not a string"))?;
    let flag = triple[1]
        .as_int()
        .ok_or_else(|| shape(index, "anchor flag is not an integer"))?;
    let target = LinkTarget::from_flag(flag)
        .ok_or_else(|| shape(index, format!("anchor flag {} is not 0 or 1", flag)))?;
    let scope = triple[2]
        .as_str()
        .ok_or_else(|| shape(index, "anchor scope is not a string"))?;

    Ok(Anchor::new(href, target, scope))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"var searchData=
[
  ['c',['c',['../namespacePhysConst.html#af3948ef083a64b0a3ff75aa6e8ddf8e9',1,'PhysConst']]],
  ['checknan',['checkNaN',['../classLinAlg_1_1SqMatrix.html#aa72c',1,'LinAlg::SqMatrix::checkNaN()'],['../classLinAlg_1_1ComplexSqMatrix.html#a25d8',1,'LinAlg::ComplexSqMatrix::checkNaN()']]],
  ['coulomb',['Coulomb',['../namespaceCoulomb.html',1,'']]]
];
"#;

    #[test]
    fn test_parse_sample() {
        let data = parse_search_data(SAMPLE).unwrap();
        assert_eq!(data.variable, "searchData");
        assert_eq!(data.entries.len(), 3);

        let check = &data.entries[1];
        assert_eq!(check.id, "checknan");
        assert_eq!(check.name, "checkNaN");
        assert_eq!(check.anchors.len(), 2);
        assert_eq!(check.anchors[1].scope, "LinAlg::ComplexSqMatrix::checkNaN()");
        assert_eq!(check.anchors[0].target, LinkTarget::Parent);

        assert_eq!(data.entries[2].anchors[0].scope, "");
    }

    #[test]
    fn test_parse_comments_and_trailing_commas() {
        let src = "// generated\n/* block */ var x = [ ['a', ['A', ['a.html', 0, 'S'],],], ]";
        let data = parse_search_data(src).unwrap();
        assert_eq!(data.variable, "x");
        assert_eq!(data.entries[0].anchors[0].target, LinkTarget::Blank);
    }

    #[test]
    fn test_parse_string_escapes() {
        let src = r#"var s = [['q',['it\'s "x"',['p.html',1,'a\\b']]]];"#;
        let data = parse_search_data(src).unwrap();
        assert_eq!(data.entries[0].name, "it's \"x\"");
        assert_eq!(data.entries[0].anchors[0].scope, "a\\b");
    }

    #[test]
    fn test_parse_error_position() {
        let err = parse_search_data("var s = [\n  ['a', ?]\n];").unwrap_err();
        match err {
            ParseError::Unexpected { line, found, .. } => {
                assert_eq!(line, 2);
                assert_eq!(found, '?');
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_bare_minus_is_not_overflow() {
        let err = parse_search_data("var s = [['a',['A',['p.html',-x,'']]]];").unwrap_err();
        assert!(matches!(err, ParseError::Unexpected { found: 'x', expected: "integer", .. }));

        let err = parse_search_data("var s = [['a',['A',['p.html',-").unwrap_err();
        assert_eq!(err, ParseError::UnexpectedEnd("integer"));

        let err = parse_search_data("var s = [['a',['A',['p.html',99999999999999999999,'']]]];").unwrap_err();
        assert!(matches!(err, ParseError::IntegerOverflow { .. }));
    }

    #[test]
    fn test_parse_unterminated_string() {
        let err = parse_search_data("var s = ['abc").unwrap_err();
        assert!(matches!(err, ParseError::UnterminatedString { line: 1, .. }));
    }

    #[test]
    fn test_parse_shape_errors() {
        let err = parse_search_data("var s = [['a']];").unwrap_err();
        assert!(matches!(err, ParseError::Shape { index: 0, .. }));

        let err = parse_search_data("var s = [['a',['A',['p.html',2,'']]]];").unwrap_err();
        assert!(err.to_string().contains("not 0 or 1"));

        let err = parse_search_data("var s = [['a',['A',['p.html',1]]]];").unwrap_err();
        assert!(err.to_string().contains("triple"));
    }

    #[test]
    fn test_parse_empty_input() {
        assert_eq!(parse_search_data("  \n").unwrap_err(), ParseError::MissingAssignment);
    }

    #[test]
    fn test_parse_assignments_object() {
        let src = r#"
var indexSectionsWithContent =
{
  0: "abc",
  1: "c"
};
var indexSectionNames = { 0: "all", 1: "classes" };
"#;
        let assignments = parse_assignments(src).unwrap();
        assert_eq!(assignments.len(), 2);
        let fields = assignments[0].1.as_object().unwrap();
        assert_eq!(fields[0], ("0".to_string(), JsValue::Str("abc".to_string())));
        assert_eq!(assignments[1].0, "indexSectionNames");
    }

    #[test]
    fn test_parse_search_variable() {
        let src = "var other = [];\nvar searchData = [['a',['a',['a.html',1,'']]]];";
        let data = parse_search_variable(src, "searchData").unwrap();
        assert_eq!(data.entries.len(), 1);
        assert_eq!(
            parse_search_variable(src, "missing").unwrap_err(),
            ParseError::MissingVariable("missing".to_string())
        );
    }
}

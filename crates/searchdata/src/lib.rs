//! searchdata - Doxygen 搜索索引的数据模型与文件格式

mod escape;
mod parser;
mod sections;
mod types;
mod writer;

pub use escape::{
    decode_compound_name, decode_search_id, escape_html, search_id, split_compound_page,
    unescape_html,
};
pub use parser::{
    entries_from_value, parse_assignments, parse_search_data, parse_search_variable, JsValue,
    ParseError,
};
pub use sections::{Section, SectionIndex};
pub use types::{strip_signature, Anchor, EntryKind, LinkTarget, SearchData, SearchEntry};
pub use writer::write_search_data;

//! scope - 文档作用域分析
//!
//! 从搜索条目还原命名空间/类层级, 统计重载, 生成 Mermaid 图

mod analyzer;
mod mermaid;

pub use analyzer::{split_scope, MemberRef, Overload, ScopeNode, ScopeStats, ScopeTree};
pub use mermaid::MermaidGenerator;

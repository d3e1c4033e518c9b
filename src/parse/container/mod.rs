//! 多节点容器格式解析器：Clash YAML、SIP008 JSON、以及 Surge/Loon/QX 行语法。

pub mod clash;
pub mod line;
pub mod sip008;

//! 规范节点中间表示（§3 Data Model）。

pub mod node;

pub use node::*;

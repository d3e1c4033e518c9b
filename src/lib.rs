//! 订阅聚合与多协议转换库 (Subscription aggregator and protocol transcoder)。
//!
//! 数据流：detector → parser → normalizer → processor → emitter，聚合驱动
//! (`aggregate`) 把这条流水线接到并发抓取与派发层之上。

pub mod aggregate;
pub mod core;
pub mod detect;
pub mod dispatch;
pub mod emit;
pub mod ir;
pub mod model;
pub mod normalize;
pub mod parse;
pub mod process;
pub mod storage;
pub mod util;

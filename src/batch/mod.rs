//! # 批量转换模块
//!
//! 在根目录下收集数据目录并并行转换。
//!
//! ## 功能
//! - 收集包含全部输入文件的目录
//! - 并行处理
//! - 进度反馈与统计
//!
//! ## 依赖关系
//! - 被 `commands/batch.rs` 使用
//! - 使用 `rayon` 进行并行处理
//! - 使用 `indicatif` 显示进度

pub mod collector;
pub mod runner;

pub use collector::FolderCollector;
pub use runner::{BatchResult, BatchRunner, ProcessResult};

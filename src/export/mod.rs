//! # 导出模块
//!
//! 将组装好的数据集写为网页 JSON、能带 CSV 表和色散预览图。
//!
//! ## 子模块
//! - `json`: 紧凑 JSON（数字归一化与舍入）
//! - `band_table`: 能带 CSV 表
//! - `plot`: 色散曲线图
//!
//! ## 依赖关系
//! - 被 `commands/` 使用
//! - 使用 `models/dataset.rs`

pub mod band_table;
pub mod json;
pub mod plot;

pub use json::{write_json, JsonOptions};

//! # 声子数据处理模块
//!
//! 从解析结果组装网页可视化所需的声子数据集。
//!
//! ## 子模块
//! - `band_connection`: 基于本征矢重叠的能带连接
//! - `highsym`: 高对称点检测（几何 / 路径查找）
//! - `symmetry_path`: 高对称路径提供者
//! - `builder`: 组装流程
//!
//! ## 依赖关系
//! - 被 `commands/` 和 `batch/collector.rs` 使用
//! - 使用 `parsers/`, `models/`

pub mod band_connection;
pub mod builder;
pub mod highsym;
pub mod symmetry_path;

pub use builder::{ConversionReport, InputFiles, PhononBuilder};
pub use highsym::{LabelMerge, LabelStrategy};
pub use symmetry_path::{BuiltinPathTable, SeekpathJsonFile, SymmetryPathProvider};

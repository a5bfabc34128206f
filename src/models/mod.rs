//! # 数据模型模块
//!
//! 定义晶体结构、声子模式和最终数据集。
//!
//! ## 依赖关系
//! - 被 `parsers/`, `phonon/`, `export/` 和 `commands/` 使用
//! - 子模块: lattice, structure, elements, modes, dataset

pub mod dataset;
pub mod elements;
pub mod lattice;
pub mod modes;
pub mod structure;

pub use dataset::{HighSymmetryPoint, PhononDataset};
pub use lattice::Lattice;
pub use modes::ModeSet;
pub use structure::{Atom, Crystal};

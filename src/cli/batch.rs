//! # batch 子命令 CLI 定义
//!
//! 在根目录下查找所有声子计算目录并并行转换
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/batch.rs`

use super::convert::{parse_repetitions, LabelMode};
use clap::Args;
use std::path::PathBuf;

/// batch 子命令参数
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Root directory containing calculation folders
    pub root: PathBuf,

    /// Recurse into subdirectories
    #[arg(short, long, default_value_t = false)]
    pub recursive: bool,

    /// Glob pattern applied to folder names
    #[arg(short, long)]
    pub pattern: Option<String>,

    /// Number of parallel jobs (0 = all CPUs)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// High-symmetry point detection mode
    #[arg(short, long, value_enum, default_value_t = LabelMode::PathLookup)]
    pub mode: LabelMode,

    /// Round floats in the JSON output to N decimal places
    #[arg(long)]
    pub round: Option<u32>,

    /// Supercell repetitions shown by the viewer
    #[arg(long, default_value = "3,3,3", value_parser = parse_repetitions)]
    pub reps: [usize; 3],

    /// Overwrite existing JSON files
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,
}

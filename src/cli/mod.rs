//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `convert`: 单个计算目录转换为网页 JSON
//! - `batch`: 批量转换多个计算目录
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: convert, batch

pub mod batch;
pub mod convert;

use clap::{Parser, Subcommand};

/// phononweb - Quantum ESPRESSO 声子结果转换工具
#[derive(Parser)]
#[command(name = "phononweb")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(
    about = "Convert Quantum ESPRESSO phonon calculations to phonon website JSON",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Convert one folder (scf.in, scf.out, matdyn.modes) to JSON
    Convert(convert::ConvertArgs),

    /// Convert every calculation folder under a root directory
    Batch(batch::BatchArgs),
}

//! # phononweb - QE 声子计算结果转网页 JSON
//!
//! 读取 Quantum ESPRESSO 的 scf.in、scf.out 与 matdyn.modes，
//! 组装声子色散数据集并写出可视化网页使用的 JSON。
//!
//! ## 子命令
//! - `convert` - 转换单个计算目录
//! - `batch`   - 并行转换根目录下的所有计算目录
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── phonon/    (能带连接、高对称点、数据集组装)
//!   │     ├── parsers/   (QE 输入输出与结构格式解析)
//!   │     ├── export/    (JSON、CSV、色散图)
//!   │     ├── batch/     (目录收集与并行执行)
//!   │     └── models/    (数据模型)
//!   ├── utils/      (工具函数)
//!   └── error.rs    (错误处理)
//! ```

mod batch;
mod cli;
mod commands;
mod error;
mod export;
mod models;
mod parsers;
mod phonon;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}

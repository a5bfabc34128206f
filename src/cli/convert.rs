//! # convert 子命令 CLI 定义
//!
//! 将单个 QE 声子计算目录 (scf.in, scf.out, matdyn.modes) 转换为网页 JSON。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - `LabelMode` 同时被 `cli/batch.rs` 使用
//! - 参数传递给 `commands/convert.rs`

use clap::{Args, ValueEnum};
use std::path::PathBuf;

/// 高对称点标注方式
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum LabelMode {
    /// Match q-points against a high-symmetry path (seekpath JSON or builtin table)
    #[value(alias = "seekpath")]
    PathLookup,
    /// Detect path corners from collinearity, optionally with user labels
    #[value(alias = "collinear")]
    Geometric,
}

impl std::fmt::Display for LabelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LabelMode::PathLookup => write!(f, "path-lookup"),
            LabelMode::Geometric => write!(f, "geometric"),
        }
    }
}

/// convert 子命令参数
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Folder containing scf.in, scf.out and matdyn.modes
    #[arg(short, long)]
    pub folder: PathBuf,

    /// High-symmetry point detection mode
    #[arg(short, long, value_enum, default_value_t = LabelMode::PathLookup)]
    pub mode: LabelMode,

    /// Labels for the geometric corners (e.g. 'G,X,M,G')
    #[arg(short, long, value_delimiter = ',')]
    pub labels: Option<Vec<String>>,

    /// Round floats in the JSON output to N decimal places
    #[arg(short, long)]
    pub round: Option<u32>,

    /// Keep tiny values and integral floats as they are
    #[arg(long, default_value_t = false)]
    pub no_normalize: bool,

    /// Output JSON file (default: <folder>/<name>.json)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Dataset name (default: folder name)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Supercell repetitions shown by the viewer
    #[arg(long, default_value = "3,3,3", value_parser = parse_repetitions)]
    pub reps: [usize; 3],

    /// Keep the band order of matdyn.modes instead of connecting bands
    #[arg(long, default_value_t = false)]
    pub no_reorder: bool,

    /// Structure input file name inside the folder
    #[arg(long, default_value = "scf.in")]
    pub scf_in: String,

    /// SCF output file name inside the folder
    #[arg(long, default_value = "scf.out")]
    pub scf_out: String,

    /// Phonon modes file name inside the folder
    #[arg(long, default_value = "matdyn.modes")]
    pub modes: String,

    /// Structure file format (qeinp-qetools, vasp-ase, castep-ase)
    #[arg(long, default_value = "qeinp-qetools")]
    pub structure_format: String,

    /// Seekpath-style JSON path file (default: <folder>/seekpath.json if present)
    #[arg(long)]
    pub path_file: Option<PathBuf>,

    /// Also write the band table as CSV
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Also draw a dispersion preview (PNG, or SVG by extension)
    #[arg(long)]
    pub plot: Option<PathBuf>,
}

/// 解析 "3,3,3" 形式的重复次数
pub fn parse_repetitions(s: &str) -> Result<[usize; 3], String> {
    let values: Vec<usize> = s
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse::<usize>()
                .map_err(|_| format!("'{}' is not a positive integer", t))
        })
        .collect::<Result<_, _>>()?;

    match values.as_slice() {
        [a, b, c] if *a > 0 && *b > 0 && *c > 0 => Ok([*a, *b, *c]),
        [_, _, _] => Err("repetitions must be at least 1".to_string()),
        _ => Err(format!("expected three integers like '3,3,3', got '{}'", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repetitions() {
        assert_eq!(parse_repetitions("3,3,3").unwrap(), [3, 3, 3]);
        assert_eq!(parse_repetitions("2, 4, 1").unwrap(), [2, 4, 1]);
        assert!(parse_repetitions("3,3").is_err());
        assert!(parse_repetitions("0,1,1").is_err());
        assert!(parse_repetitions("a,1,1").is_err());
    }

    #[test]
    fn test_label_mode_aliases() {
        assert_eq!(LabelMode::from_str("seekpath", true).unwrap(), LabelMode::PathLookup);
        assert_eq!(LabelMode::from_str("collinear", true).unwrap(), LabelMode::Geometric);
        assert_eq!(LabelMode::Geometric.to_string(), "geometric");
    }
}

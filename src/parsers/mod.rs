//! # 解析器模块
//!
//! 提供 Quantum ESPRESSO 输入/输出、matdyn.modes 以及其他结构格式的解析器。
//! 结构读取器按格式标识选择，默认 `qeinp-qetools`。
//!
//! ## 依赖关系
//! - 被 `phonon/builder.rs` 使用
//! - 使用 `models/` 数据模型
//! - 子模块: pw_input, pw_output, matdyn, poscar, cell

pub mod cell;
pub mod matdyn;
pub mod poscar;
pub mod pw_input;
pub mod pw_output;

use crate::error::{PhononError, Result};
use crate::models::Crystal;
use std::path::Path;

/// 1 bohr 对应的 Å 数
pub const BOHR_IN_ANGSTROM: f64 = 0.52917720859;

/// 默认的结构格式标识
pub const DEFAULT_STRUCTURE_FORMAT: &str = "qeinp-qetools";

/// 结构文件读取器
pub trait StructureReader: Send + Sync {
    /// 格式标识
    fn format_id(&self) -> &'static str;

    /// 读取结构文件
    fn read(&self, path: &Path) -> Result<Crystal>;
}

/// pw.x 输入文件
pub struct PwInputReader;

/// VASP POSCAR
pub struct PoscarReader;

/// CASTEP .cell
pub struct CellReader;

impl StructureReader for PwInputReader {
    fn format_id(&self) -> &'static str {
        DEFAULT_STRUCTURE_FORMAT
    }

    fn read(&self, path: &Path) -> Result<Crystal> {
        pw_input::parse_pw_input_file(path)
    }
}

impl StructureReader for PoscarReader {
    fn format_id(&self) -> &'static str {
        "vasp-ase"
    }

    fn read(&self, path: &Path) -> Result<Crystal> {
        poscar::parse_poscar_file(path)
    }
}

impl StructureReader for CellReader {
    fn format_id(&self) -> &'static str {
        "castep-ase"
    }

    fn read(&self, path: &Path) -> Result<Crystal> {
        cell::parse_cell_file(path)
    }
}

/// 按格式标识选择结构读取器
pub fn reader_for_format(format: &str) -> Result<Box<dyn StructureReader>> {
    match format.to_lowercase().as_str() {
        "qeinp-qetools" | "qeinp" | "pw" => Ok(Box::new(PwInputReader)),
        "vasp-ase" | "poscar" => Ok(Box::new(PoscarReader)),
        "castep-ase" | "cell" => Ok(Box::new(CellReader)),
        _ => Err(PhononError::UnknownFormat(format.to_string())),
    }
}

/// 按格式标识读取结构文件
pub fn read_structure(path: &Path, format: &str) -> Result<Crystal> {
    reader_for_format(format)?.read(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_lookup() {
        assert_eq!(reader_for_format("qeinp-qetools").unwrap().format_id(), "qeinp-qetools");
        assert_eq!(reader_for_format("POSCAR").unwrap().format_id(), "vasp-ase");
        assert_eq!(reader_for_format("cell").unwrap().format_id(), "castep-ase");
    }

    #[test]
    fn test_unknown_format() {
        let err = reader_for_format("xyz").err().unwrap();
        assert!(matches!(err, PhononError::UnknownFormat(ref f) if f == "xyz"));
    }

    #[test]
    fn test_missing_structure_file() {
        let err = read_structure(Path::new("/nonexistent/scf.in"), DEFAULT_STRUCTURE_FORMAT)
            .unwrap_err();
        assert!(matches!(err, PhononError::FileReadError { .. }));
    }
}

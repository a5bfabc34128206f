//! # Quantum ESPRESSO pw.x 输出解析器
//!
//! 解析 scf.out，主要用于提取 alat。输入文件中的 alat 并不唯一确定
//! （ibrav = 0 时取第一个基矢长度，且不同 QE 版本行为不同），因此以输出为准。
//! 同时检查原子数与晶胞是否与输入结构一致。
//!
//! ## 依赖关系
//! - 被 `phonon/builder.rs` 使用
//! - 使用 `models/lattice.rs`

use super::BOHR_IN_ANGSTROM;
use crate::error::{PhononError, Result};
use crate::models::{Crystal, Lattice};
use std::fs;
use std::path::Path;

const FORMAT: &str = "pw.x output";

/// 晶胞比较容差（与输入结构逐元素比较）
const CELL_RTOL: f64 = 1.0e-4;
const CELL_ATOL: f64 = 1.0e-4;

/// scf.out 中提取的信息
#[derive(Debug, Clone)]
pub struct ScfOutput {
    /// alat (Å)
    pub alat: f64,
    /// 原子数
    pub natoms: usize,
    /// 晶胞 (Å)
    pub lattice: Lattice,
}

impl ScfOutput {
    /// 检查与输入结构是否一致
    pub fn validate_against(&self, crystal: &Crystal) -> Result<()> {
        if crystal.natoms() != self.natoms {
            return Err(PhononError::mismatch(
                "number of atoms between the SCF input and output files",
                crystal.natoms(),
                self.natoms,
            ));
        }

        if !crystal.lattice.allclose(&self.lattice, CELL_RTOL, CELL_ATOL) {
            return Err(PhononError::mismatch(
                "cell between the SCF input and output files",
                format!("{:?}", crystal.lattice.matrix),
                format!("{:?}", self.lattice.matrix),
            ));
        }

        Ok(())
    }
}

/// 解析 pw.x 输出文件
pub fn parse_pw_output_file(path: &Path) -> Result<ScfOutput> {
    let content = fs::read_to_string(path).map_err(|e| PhononError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_pw_output_content(&content, &path.display().to_string())
}

/// 从字符串内容解析 pw.x 输出
pub fn parse_pw_output_content(content: &str, source: &str) -> Result<ScfOutput> {
    let lines: Vec<&str> = content.lines().collect();
    let err = |line: Option<usize>, reason: String| PhononError::parse(FORMAT, source, line, reason);

    // "     lattice parameter (alat)  =      10.2000  a.u."
    let alat_lines: Vec<(usize, &str)> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.contains("lattice parameter (alat)") && l.contains("a.u."))
        .map(|(i, l)| (i, *l))
        .collect();
    let (alat_idx, alat_line) = match alat_lines.as_slice() {
        [] => return Err(err(None, "No lines with alat found in QE output file".to_string())),
        [single] => *single,
        _ => {
            return Err(err(
                None,
                "Multiple lines with alat found in QE output file... Maybe this is a vc-relax and not an SCF?"
                    .to_string(),
            ))
        }
    };
    let alat_bohr: f64 = alat_line
        .split_whitespace()
        .nth(4)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| err(Some(alat_idx + 1), format!("Invalid alat line '{}'", alat_line.trim())))?;
    if !(alat_bohr.is_finite() && alat_bohr > 0.0) {
        return Err(err(
            Some(alat_idx + 1),
            format!("alat must be positive, found {}", alat_bohr),
        ));
    }
    let alat = alat_bohr * BOHR_IN_ANGSTROM;

    // "     number of atoms/cell      =            2"
    let (nat_idx, nat_line) = lines
        .iter()
        .enumerate()
        .find(|(_, l)| l.contains("number of atoms/cell"))
        .ok_or_else(|| {
            err(None, "No lines with the number of atoms found in QE output file".to_string())
        })?;
    let natoms: usize = nat_line
        .split('=')
        .nth(1)
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| err(Some(nat_idx + 1), format!("Invalid atom count line '{}'", nat_line.trim())))?;

    // "     crystal axes: (cart. coord. in units of alat)"
    let axes_idx = lines
        .iter()
        .position(|l| l.contains("crystal axes") && l.contains("units of alat"))
        .ok_or_else(|| err(None, "Unable to find the crystal cell in the QE output file".to_string()))?;

    let mut matrix = [[0.0; 3]; 3];
    for (offset, row) in matrix.iter_mut().enumerate() {
        let idx = axes_idx + offset + 1;
        let line = lines
            .get(idx)
            .ok_or_else(|| err(Some(idx + 1), "Unexpected end of file in crystal axes".to_string()))?;
        let tag = format!("a({})", offset + 1);
        if !line.contains(&tag) {
            return Err(err(
                Some(idx + 1),
                format!("string '{}' not found when parsing cell from QE output", tag),
            ));
        }
        // "       a(1) = (   1.000000   0.000000   0.000000 )"
        let values: Vec<f64> = line
            .split('(')
            .nth(2)
            .and_then(|s| s.split(')').next())
            .map(|s| s.split_whitespace().filter_map(|v| v.parse().ok()).collect())
            .unwrap_or_default();
        if values.len() != 3 {
            return Err(err(
                Some(idx + 1),
                format!("Error while parsing cell from QE output: '{}'", line.trim()),
            ));
        }
        *row = [values[0] * alat, values[1] * alat, values[2] * alat];
    }

    Ok(ScfOutput {
        alat,
        natoms,
        lattice: Lattice::from_vectors(matrix),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Atom;

    const SCF_OUT: &str = r#"
     Program PWSCF v.6.4 starts on ...

     bravais-lattice index     =            2
     lattice parameter (alat)  =      10.2000  a.u.
     unit-cell volume          =     265.3020 (a.u.)^3
     number of atoms/cell      =            2
     number of atomic types    =            1

     celldm(1)=  10.200000  celldm(2)=   0.000000  celldm(3)=   0.000000

     crystal axes: (cart. coord. in units of alat)
               a(1) = (  -0.500000   0.000000   0.500000 )
               a(2) = (   0.000000   0.500000   0.500000 )
               a(3) = (  -0.500000   0.500000   0.000000 )
"#;

    fn silicon() -> Crystal {
        let a = 10.2 * BOHR_IN_ANGSTROM / 2.0;
        let lattice = Lattice::from_vectors([[-a, 0.0, a], [0.0, a, a], [-a, a, 0.0]]);
        Crystal::new("Si", lattice, vec![
            Atom::new(14, [0.0; 3]),
            Atom::new(14, [-0.25, 0.75, -0.25]),
        ])
    }

    #[test]
    fn test_parse_scf_output() {
        let out = parse_pw_output_content(SCF_OUT, "scf.out").unwrap();
        assert!((out.alat - 10.2 * BOHR_IN_ANGSTROM).abs() < 1e-12);
        assert_eq!(out.natoms, 2);
        assert!((out.lattice.matrix[0][0] + out.alat / 2.0).abs() < 1e-9);
        out.validate_against(&silicon()).unwrap();
    }

    #[test]
    fn test_missing_alat() {
        let content = SCF_OUT.replace("lattice parameter (alat)", "lattice parameter");
        let err = parse_pw_output_content(&content, "scf.out").unwrap_err();
        assert!(err.to_string().contains("No lines with alat"));
    }

    #[test]
    fn test_multiple_alat_lines() {
        let content = format!("{}\n     lattice parameter (alat)  =  10.3  a.u.\n", SCF_OUT);
        let err = parse_pw_output_content(&content, "scf.out").unwrap_err();
        assert!(err.to_string().contains("vc-relax"));
    }

    #[test]
    fn test_zero_alat() {
        let content = SCF_OUT.replace("10.2000  a.u.", "0.0000  a.u.");
        let err = parse_pw_output_content(&content, "scf.out").unwrap_err();
        assert!(matches!(err, PhononError::ParseError { line: Some(_), .. }));
        assert!(err.to_string().contains("alat must be positive"));
    }

    #[test]
    fn test_atom_count_mismatch() {
        let out = parse_pw_output_content(SCF_OUT, "scf.out").unwrap();
        let mut crystal = silicon();
        crystal.atoms.pop();
        let err = out.validate_against(&crystal).unwrap_err();
        assert!(matches!(err, PhononError::StructuralMismatch { .. }));
    }

    #[test]
    fn test_cell_mismatch() {
        let out = parse_pw_output_content(SCF_OUT, "scf.out").unwrap();
        let mut crystal = silicon();
        crystal.lattice.matrix[0][0] *= 1.01;
        let err = out.validate_against(&crystal).unwrap_err();
        assert!(err.to_string().contains("cell"));
    }

    #[test]
    fn test_broken_axes_line() {
        let content = SCF_OUT.replace("a(2) =", "b(2) =");
        let err = parse_pw_output_content(&content, "scf.out").unwrap_err();
        assert!(err.to_string().contains("'a(2)'"));
    }
}

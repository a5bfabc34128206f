//! # matdyn.modes 解析器
//!
//! 解析 matdyn.x 输出的本征值/本征矢文本。
//!
//! ## matdyn.modes 格式说明
//! ```text
//!      diagonalizing the dynamical matrix ...
//!
//!  q =       0.0000      0.0000      0.0000
//!  **************************************************************************
//!      freq (    1) =      -0.000000 [THz] =      -0.000000 [cm-1]
//!  ( -0.000000   0.000000  0.707107   0.000000  0.000000   0.000000 )
//!  ( ...natoms 行... )
//!      freq (    2) = ...
//!  **************************************************************************
//! ```
//!
//! 每个 q 点块固定占 `(natoms + 1) * nphonons + 5` 行，第一个块从第 3 行开始。
//! q 点以 2π/alat 为单位的笛卡尔坐标给出。解析要么完整成功，要么报错。
//!
//! ## 依赖关系
//! - 被 `phonon/builder.rs` 使用
//! - 使用 `models/modes.rs`, `models/lattice.rs`
//! - 使用 `regex`, `num-complex`

use crate::error::{PhononError, Result};
use crate::models::modes::{AtomDisplacement, Eigenvector};
use crate::models::{Lattice, ModeSet};
use num_complex::Complex64;
use regex::Regex;
use std::f64::consts::PI;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

const FORMAT: &str = "matdyn.modes";

/// 第一个 q 点行的下标（0 起）
const FIRST_QPOINT_LINE: usize = 2;

/// q 点标记
const QPOINT_MARKER: &str = "q = ";

/// "freq (    1)" 或 "omega( 1)"
static FREQ_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:freq|omega)\s*\(\s*(\d+)\s*\)").unwrap());

/// 等号后的数值，第二个即 cm⁻¹ 频率
static VALUE_AFTER_EQ: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"=\s+([+-]?\d+(?:\.\d+)?(?:[eE][-+]?\d+)?)").unwrap());

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[+-]?\d+(?:\.\d+)?(?:[eE][-+]?\d+)?").unwrap());

/// matdyn.modes 的解析结果
#[derive(Debug, Clone)]
pub struct MatdynModes {
    /// q 点（文件原生单位：2π/alat 笛卡尔）
    pub qpoints: Vec<[f64; 3]>,
    /// 本征值与本征矢
    pub modes: ModeSet,
}

impl MatdynModes {
    pub fn nqpoints(&self) -> usize {
        self.qpoints.len()
    }

    /// 将 q 点换算为约化坐标
    ///
    /// 先乘 2π/alat 得到 1/Å 的笛卡尔坐标，再用倒易晶格（含 2π）转为约化坐标。
    pub fn reduced_qpoints(&self, lattice: &Lattice, alat: f64) -> Result<Vec<[f64; 3]>> {
        let factor = 2.0 * PI / alat;
        let cartesian: Vec<[f64; 3]> = self
            .qpoints
            .iter()
            .map(|q| q.map(|x| x * factor))
            .collect();
        lattice.reciprocal()?.to_reduced(&cartesian)
    }
}

/// 解析 matdyn.modes 文件
pub fn parse_matdyn_file(path: &Path, expected_natoms: usize) -> Result<MatdynModes> {
    let content = fs::read_to_string(path).map_err(|e| PhononError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_matdyn_content(&content, &path.display().to_string(), expected_natoms)
}

/// 从字符串内容解析 matdyn.modes
///
/// `expected_natoms` 来自结构文件，与模式数推得的原子数不一致时报错。
pub fn parse_matdyn_content(
    content: &str,
    source: &str,
    expected_natoms: usize,
) -> Result<MatdynModes> {
    let err = |line: Option<usize>, reason: String| PhononError::parse(FORMAT, source, line, reason);

    // 模式数 = 最大的 freq 序号
    let nphonons = FREQ_HEADER
        .captures_iter(content)
        .filter_map(|cap| cap[1].parse::<usize>().ok())
        .max()
        .ok_or_else(|| {
            err(
                None,
                "Unable to find the lines with the frequencies in the matdyn.modes file. \
                 Please check that you uploaded the correct file!"
                    .to_string(),
            )
        })?;
    if nphonons % 3 != 0 {
        return Err(err(
            None,
            format!("Number of modes ({}) is not a multiple of 3", nphonons),
        ));
    }
    let natoms = nphonons / 3;

    if natoms != expected_natoms {
        return Err(PhononError::mismatch(
            "number of atoms between the SCF input file and the matdyn.modes file",
            expected_natoms,
            natoms,
        ));
    }

    let nqpoints = content.matches(QPOINT_MARKER).count();
    if nqpoints == 0 {
        return Err(err(None, "No q-point lines found".to_string()));
    }
    let lines: Vec<&str> = content.lines().collect();
    let line_at = |idx: usize| -> Result<&str> {
        lines
            .get(idx)
            .copied()
            .ok_or_else(|| err(Some(idx + 1), "Unexpected end of file".to_string()))
    };

    let block_len = (natoms + 1) * nphonons + 5;
    let mut qpoints = Vec::with_capacity(nqpoints);
    let mut eigenvalues = Vec::with_capacity(nqpoints);
    let mut eigenvectors = Vec::with_capacity(nqpoints);

    for k in 0..nqpoints {
        let q_idx = FIRST_QPOINT_LINE + k * block_len;
        qpoints.push(parse_qpoint_line(line_at(q_idx)?).map_err(|r| err(Some(q_idx + 1), r))?);

        let mut values = Vec::with_capacity(nphonons);
        let mut vectors: Vec<Eigenvector> = Vec::with_capacity(nphonons);
        for n in 0..nphonons {
            let eig_idx = q_idx + 2 + n * (natoms + 1);
            values.push(parse_frequency_line(line_at(eig_idx)?).map_err(|r| err(Some(eig_idx + 1), r))?);

            let mut vector = Vec::with_capacity(natoms);
            for i in 0..natoms {
                let vec_idx = eig_idx + 1 + i;
                vector.push(
                    parse_displacement_line(line_at(vec_idx)?)
                        .map_err(|r| err(Some(vec_idx + 1), r))?,
                );
            }
            vectors.push(vector);
        }
        eigenvalues.push(values);
        eigenvectors.push(vectors);
    }

    Ok(MatdynModes {
        qpoints,
        modes: ModeSet::new(eigenvalues, eigenvectors),
    })
}

/// " q =       0.0000      0.0000      0.5000"
fn parse_qpoint_line(line: &str) -> std::result::Result<[f64; 3], String> {
    let rest = line
        .split_once('=')
        .filter(|(head, _)| head.trim() == "q")
        .map(|(_, rest)| rest)
        .ok_or_else(|| format!("Expected a q-point line, found '{}'", line.trim()))?;

    let values: Vec<f64> = NUMBER
        .find_iter(rest)
        .map(|m| m.as_str().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| format!("Invalid q-point component: {}", e))?;
    match values.as_slice() {
        [x, y, z] => Ok([*x, *y, *z]),
        _ => Err(format!("Expected 3 q-point components, found {}", values.len())),
    }
}

/// "     freq (    1) =   0.173268 [THz] =   5.779601 [cm-1]"，取 cm⁻¹ 值
fn parse_frequency_line(line: &str) -> std::result::Result<f64, String> {
    if !FREQ_HEADER.is_match(line) {
        return Err(format!("Expected a frequency line, found '{}'", line.trim()));
    }
    let cap = VALUE_AFTER_EQ
        .captures_iter(line)
        .nth(1)
        .ok_or_else(|| format!("Missing frequency value in '{}'", line.trim()))?;
    cap[1]
        .parse()
        .map_err(|e| format!("Invalid frequency '{}': {}", &cap[1], e))
}

/// " ( -0.000000   0.000000  0.707107   0.000000  0.000000   0.000000 )"
fn parse_displacement_line(line: &str) -> std::result::Result<AtomDisplacement, String> {
    let z: Vec<f64> = NUMBER
        .find_iter(line)
        .take(6)
        .map(|m| m.as_str().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| format!("Invalid eigenvector component: {}", e))?;
    if z.len() < 6 {
        return Err(format!(
            "Expected 6 eigenvector components, found {} in '{}'",
            z.len(),
            line.trim()
        ));
    }
    Ok([
        Complex64::new(z[0], z[1]),
        Complex64::new(z[2], z[3]),
        Complex64::new(z[4], z[5]),
    ])
}

/// 生成 matdyn.modes 格式文本（测试与示例数据用）
#[cfg(test)]
pub(crate) fn render_modes(qpoints: &[[f64; 3]], modes: &ModeSet) -> String {
    let stars = " ".to_string() + &"*".repeat(74);
    let mut out = String::new();
    for (k, q) in qpoints.iter().enumerate() {
        out.push_str("     diagonalizing the dynamical matrix ...\n");
        out.push('\n');
        out.push_str(&format!(" q = {:12.4}{:12.4}{:12.4}\n", q[0], q[1], q[2]));
        out.push_str(&stars);
        out.push('\n');
        for (n, freq) in modes.eigenvalues[k].iter().enumerate() {
            out.push_str(&format!(
                "     freq ({:5}) = {:14.6} [THz] = {:14.6} [cm-1]\n",
                n + 1,
                freq / 33.35641,
                freq
            ));
            for atom in &modes.eigenvectors[k][n] {
                out.push_str(&format!(
                    " ( {:10.6} {:10.6} {:10.6} {:10.6} {:10.6} {:10.6} )\n",
                    atom[0].re, atom[0].im, atom[1].re, atom[1].im, atom[2].re, atom[2].im
                ));
            }
        }
        out.push_str(&stars);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_modes(nq: usize) -> ModeSet {
        // 2 个原子，6 个模式，本征矢为单位基
        let mut vectors = Vec::new();
        for n in 0..6 {
            let mut v = vec![[Complex64::new(0.0, 0.0); 3]; 2];
            v[n / 3][n % 3] = Complex64::new(1.0, 0.0);
            vectors.push(v);
        }
        ModeSet::new(
            vec![vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]; nq],
            vec![vectors; nq],
        )
    }

    #[test]
    fn test_parse_two_qpoints() {
        let qpoints = [[0.0, 0.0, 0.0], [0.5, 0.0, 0.0]];
        let text = render_modes(&qpoints, &unit_modes(2));
        let parsed = parse_matdyn_content(&text, "test", 2).unwrap();

        assert_eq!(parsed.nqpoints(), 2);
        assert_eq!(parsed.modes.nphonons(), 6);
        assert_eq!(parsed.modes.natoms(), 2);
        assert_eq!(parsed.qpoints[1], [0.5, 0.0, 0.0]);
        assert_eq!(parsed.modes.eigenvalues[1], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(parsed.modes.eigenvectors[1][4][1][1], Complex64::new(1.0, 0.0));
    }

    #[test]
    fn test_parse_negative_and_complex_values() {
        let text = "     diagonalizing the dynamical matrix ...\n\n\
 q =       0.0000      0.0000      0.0000\n \
**************************************************************************\n     \
freq (    1) =      -0.012345 [THz] =      -0.411796 [cm-1]\n \
( -0.577350   0.100000  0.577350  -0.200000  0.577350   0.000000 )\n     \
freq (    2) =       0.000000 [THz] =       0.000000 [cm-1]\n \
(  0.707107   0.000000 -0.707107   0.000000  0.000000   0.000000 )\n     \
freq (    3) =       1.000000 [THz] =      33.356410 [cm-1]\n \
(  0.000000   0.000000  0.000000   0.000000  1.000000   0.000000 )\n \
**************************************************************************\n";
        let parsed = parse_matdyn_content(text, "test", 1).unwrap();
        assert!((parsed.modes.eigenvalues[0][0] + 0.411796).abs() < 1e-12);
        assert!((parsed.modes.eigenvalues[0][2] - 33.35641).abs() < 1e-12);
        let v = parsed.modes.eigenvectors[0][0][0];
        assert_eq!(v[0], Complex64::new(-0.57735, 0.1));
        assert_eq!(v[1], Complex64::new(0.57735, -0.2));
    }

    #[test]
    fn test_no_frequency_lines() {
        let err = parse_matdyn_content("nothing here\n", "test", 1).unwrap_err();
        assert!(err.to_string().contains("Unable to find the lines with the frequencies"));
    }

    #[test]
    fn test_atom_count_mismatch() {
        let text = render_modes(&[[0.0; 3]], &unit_modes(1));
        let err = parse_matdyn_content(&text, "test", 3).unwrap_err();
        assert!(matches!(err, PhononError::StructuralMismatch { .. }));
    }

    #[test]
    fn test_frequencies_without_qpoint_lines() {
        let text = "     freq (    6) = 1.0 [THz] = 33.3 [cm-1]\n";
        let err = parse_matdyn_content(text, "test", 2).unwrap_err();
        assert!(err.to_string().contains("No q-point lines found"));
    }

    #[test]
    fn test_mode_count_not_multiple_of_three() {
        let zero = Complex64::new(0.0, 0.0);
        let modes = ModeSet::new(
            vec![(1..=7).map(f64::from).collect()],
            vec![vec![vec![[zero; 3]; 2]; 7]],
        );
        let text = render_modes(&[[0.0; 3]], &modes);
        let err = parse_matdyn_content(&text, "test", 2).unwrap_err();
        assert!(matches!(err, PhononError::ParseError { .. }));
        assert!(err.to_string().contains("not a multiple of 3"));
    }

    #[test]
    fn test_truncated_file() {
        let text = render_modes(&[[0.0; 3], [0.1, 0.0, 0.0]], &unit_modes(2));
        let cut: String = text.lines().take(20).map(|l| format!("{}\n", l)).collect();
        let err = parse_matdyn_content(&cut, "test", 2).unwrap_err();
        assert!(matches!(err, PhononError::ParseError { line: Some(_), .. }));
    }

    #[test]
    fn test_malformed_vector_line() {
        let text = render_modes(&[[0.0; 3]], &unit_modes(1));
        let broken = text.replacen("(   1.000000", "(   abc", 1);
        let err = parse_matdyn_content(&broken, "test", 2).unwrap_err();
        assert!(err.to_string().contains("Expected 6 eigenvector components"));
    }

    #[test]
    fn test_reduced_qpoints() {
        // 立方晶格 a = alat = 4 Å：2π/alat 单位的 (0.5, 0, 0) 即约化坐标 (0.5, 0, 0)
        let lattice = Lattice::from_vectors([[4.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 0.0, 4.0]]);
        let modes = MatdynModes {
            qpoints: vec![[0.5, 0.0, 0.0], [0.5, 0.5, 0.5]],
            modes: unit_modes(2),
        };
        let red = modes.reduced_qpoints(&lattice, 4.0).unwrap();
        assert!((red[0][0] - 0.5).abs() < 1e-12);
        assert!((red[1][2] - 0.5).abs() < 1e-12);
    }
}

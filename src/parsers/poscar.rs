//! # VASP POSCAR 格式解析器
//!
//! 解析 VASP POSCAR/CONTCAR 文件格式，作为 `vasp-ase` 结构读取器。
//!
//! ## POSCAR 格式说明
//! ```text
//! Comment line (structure name)
//! 1.0                    # scaling factor
//! a1 a2 a3               # lattice vector a
//! b1 b2 b3               # lattice vector b
//! c1 c2 c3               # lattice vector c
//! Element1 Element2 ...  # element symbols (VASP 5+)
//! n1 n2 ...              # number of atoms per element
//! Selective dynamics     # optional
//! Direct/Cartesian       # coordinate type
//! x1 y1 z1               # atom positions
//! ...
//! ```
//!
//! 声子数据需要原子序数，因此不接受缺少元素行的 VASP 4 格式。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/structure.rs`, `models/elements.rs`

use crate::error::{PhononError, Result};
use crate::models::elements;
use crate::models::{Atom, Crystal, Lattice};
use std::fs;
use std::path::Path;

const FORMAT: &str = "poscar";

/// 解析 POSCAR/CONTCAR 文件
pub fn parse_poscar_file(path: &Path) -> Result<Crystal> {
    let content = fs::read_to_string(path).map_err(|e| PhononError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_poscar_content(
        &content,
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown"),
    )
}

/// 从字符串内容解析 POSCAR 格式
pub fn parse_poscar_content(content: &str, default_name: &str) -> Result<Crystal> {
    let lines: Vec<&str> = content.lines().collect();
    let err = |line: Option<usize>, reason: String| {
        PhononError::parse(FORMAT, default_name, line, reason)
    };

    if lines.len() < 8 {
        return Err(err(None, "File too short".to_string()));
    }

    // Line 0: Comment/name
    let name = lines[0].trim().to_string();
    let name = if name.is_empty() {
        default_name.to_string()
    } else {
        name
    };

    // Line 1: Scaling factor
    let scale: f64 = lines[1]
        .trim()
        .parse()
        .map_err(|_| err(Some(2), format!("Invalid scaling factor '{}'", lines[1].trim())))?;

    // Lines 2-4: Lattice vectors
    let mut matrix = [[0.0; 3]; 3];
    for (i, row) in matrix.iter_mut().enumerate() {
        let parts: Vec<f64> = lines[2 + i]
            .split_whitespace()
            .filter_map(|s| s.parse().ok())
            .collect();
        if parts.len() < 3 {
            return Err(err(Some(3 + i), "Invalid lattice vector".to_string()));
        }
        *row = [parts[0] * scale, parts[1] * scale, parts[2] * scale];
    }
    let lattice = Lattice::from_vectors(matrix);

    // Line 5: Element symbols (VASP 5+)
    let symbols: Vec<&str> = lines[5].split_whitespace().collect();
    if symbols.first().map_or(true, |s| s.parse::<i64>().is_ok()) {
        return Err(err(
            Some(6),
            "Element symbols line is required to assign atomic numbers".to_string(),
        ));
    }
    let mut numbers = Vec::with_capacity(symbols.len());
    for symbol in &symbols {
        // "Fe_pv" 这类 POTCAR 标记只取下划线前部分
        let bare = symbol.split(['_', '/']).next().unwrap_or(symbol);
        let number = elements::atomic_number(&elements::capitalize(bare))
            .ok_or_else(|| err(Some(6), format!("Unknown element '{}'", symbol)))?;
        numbers.push(number);
    }

    let counts: Vec<usize> = lines[6]
        .split_whitespace()
        .map(|s| s.parse())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| err(Some(7), format!("Invalid atom counts '{}'", lines[6].trim())))?;
    if counts.len() != numbers.len() {
        return Err(err(
            Some(7),
            format!("{} element symbols but {} atom counts", numbers.len(), counts.len()),
        ));
    }

    // Check for "Selective dynamics" line
    let mut coord_line = 7;
    if lines.len() > coord_line
        && lines[coord_line]
            .trim()
            .to_lowercase()
            .starts_with('s')
    {
        coord_line += 1;
    }

    if lines.len() <= coord_line {
        return Err(err(None, "Missing coordinate type line".to_string()));
    }

    let coord_type = lines[coord_line].trim().to_lowercase();
    let is_cartesian = coord_type.starts_with('c') || coord_type.starts_with('k');

    // Parse atom positions
    let mut positions = Vec::new();
    let mut species = Vec::new();
    let mut line_idx = coord_line + 1;

    for (&number, &count) in numbers.iter().zip(counts.iter()) {
        for _ in 0..count {
            let line = lines
                .get(line_idx)
                .ok_or_else(|| err(Some(line_idx + 1), "Missing atom position".to_string()))?;
            let parts: Vec<f64> = line
                .split_whitespace()
                .take(3)
                .filter_map(|s| s.parse().ok())
                .collect();
            if parts.len() < 3 {
                return Err(err(
                    Some(line_idx + 1),
                    format!("Invalid atom position '{}'", line.trim()),
                ));
            }
            let position = [parts[0], parts[1], parts[2]];
            positions.push(if is_cartesian {
                position.map(|x| x * scale)
            } else {
                position
            });
            species.push(number);
            line_idx += 1;
        }
    }

    if is_cartesian {
        positions = lattice.to_reduced(&positions)?;
    }

    let atoms = species
        .into_iter()
        .zip(positions)
        .map(|(number, position)| Atom::new(number, position))
        .collect();

    let mut crystal = Crystal::new(name, lattice, atoms);
    crystal.source_format = Some(FORMAT.to_string());

    Ok(crystal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_poscar_vasp5() {
        let content = r#"NaCl
1.0
5.64 0.0 0.0
0.0 5.64 0.0
0.0 0.0 5.64
Na Cl
4 4
Direct
0.0 0.0 0.0
0.5 0.5 0.0
0.5 0.0 0.5
0.0 0.5 0.5
0.5 0.0 0.0
0.0 0.5 0.0
0.0 0.0 0.5
0.5 0.5 0.5
"#;
        let crystal = parse_poscar_content(content, "NaCl").unwrap();
        assert_eq!(crystal.name, "NaCl");
        assert_eq!(crystal.atoms.len(), 8);

        let na_count = crystal.atoms.iter().filter(|a| a.number == 11).count();
        let cl_count = crystal.atoms.iter().filter(|a| a.element == "Cl").count();
        assert_eq!(na_count, 4);
        assert_eq!(cl_count, 4);
    }

    #[test]
    fn test_parse_poscar_cartesian_with_scale() {
        let content = r#"Si
2.0
2.0 0.0 0.0
0.0 2.0 0.0
0.0 0.0 2.0
Si
2
Cartesian
0.0 0.0 0.0
1.0 1.0 1.0
"#;
        let crystal = parse_poscar_content(content, "Si").unwrap();
        let (a, _, _, _, _, _) = crystal.lattice.parameters();

        // 2.0 * 2.0 = 4.0
        assert!((a - 4.0).abs() < 0.01);
        assert!((crystal.atoms[1].position[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_parse_poscar_selective_dynamics() {
        let content = r#"Fe with selective
1.0
2.87 0.0 0.0
0.0 2.87 0.0
0.0 0.0 2.87
Fe_pv
2
Selective dynamics
Direct
0.0 0.0 0.0 T T T
0.5 0.5 0.5 F F F
"#;
        let crystal = parse_poscar_content(content, "Fe").unwrap();
        assert_eq!(crystal.atoms.len(), 2);
        assert_eq!(crystal.atoms[0].number, 26);
    }

    #[test]
    fn test_vasp4_rejected() {
        let content = "old\n1.0\n1 0 0\n0 1 0\n0 0 1\n1\nDirect\n0 0 0\n";
        let err = parse_poscar_content(content, "old").unwrap_err();
        assert!(err.to_string().contains("Element symbols line"));
    }

    #[test]
    fn test_missing_atoms() {
        let content = "x\n1.0\n1 0 0\n0 1 0\n0 0 1\nNa Cl\n1 1\nDirect\n0 0 0\n";
        let err = parse_poscar_content(content, "x").unwrap_err();
        assert!(matches!(err, PhononError::ParseError { line: Some(10), .. }));
    }
}

//! # CASTEP .cell 格式解析器
//!
//! 解析 CASTEP 输入文件 .cell 格式，作为 `castep-ase` 结构读取器。
//!
//! ## .cell 格式说明
//! ```text
//! %BLOCK LATTICE_CART
//! ang
//! a1 a2 a3
//! b1 b2 b3
//! c1 c2 c3
//! %ENDBLOCK LATTICE_CART
//!
//! %BLOCK POSITIONS_FRAC
//! Element x y z
//! ...
//! %ENDBLOCK POSITIONS_FRAC
//! ```
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/structure.rs`, `models/elements.rs`

use super::BOHR_IN_ANGSTROM;
use crate::error::{PhononError, Result};
use crate::models::elements;
use crate::models::{Atom, Crystal, Lattice};
use std::fs;
use std::path::Path;

const FORMAT: &str = "cell";

/// 解析 .cell 文件
pub fn parse_cell_file(path: &Path) -> Result<Crystal> {
    let content = fs::read_to_string(path).map_err(|e| PhononError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_cell_content(
        &content,
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown"),
    )
}

/// 从字符串内容解析 .cell 格式
pub fn parse_cell_content(content: &str, default_name: &str) -> Result<Crystal> {
    let lines: Vec<&str> = content.lines().collect();
    let err = |reason: String| PhononError::parse(FORMAT, default_name, None, reason);

    let lattice = if let Some(block) = find_block(&lines, "LATTICE_CART") {
        parse_lattice_cart(&block).map_err(err)?
    } else if let Some(block) = find_block(&lines, "LATTICE_ABC") {
        parse_lattice_abc(&block).map_err(err)?
    } else {
        return Err(err("Missing LATTICE_CART or LATTICE_ABC block".to_string()));
    };

    let atoms = if let Some(block) = find_block(&lines, "POSITIONS_FRAC") {
        let (numbers, positions) = parse_positions(&block).map_err(err)?;
        zip_atoms(numbers, positions)
    } else if let Some(block) = find_block(&lines, "POSITIONS_ABS") {
        let (numbers, positions) = parse_positions(&block).map_err(err)?;
        let scale = unit_scale(&block);
        let cartesian: Vec<[f64; 3]> = positions.iter().map(|p| p.map(|x| x * scale)).collect();
        zip_atoms(numbers, lattice.to_reduced(&cartesian)?)
    } else {
        return Err(err("Missing POSITIONS_FRAC or POSITIONS_ABS block".to_string()));
    };

    let mut crystal = Crystal::new(default_name, lattice, atoms);
    crystal.source_format = Some(FORMAT.to_string());

    Ok(crystal)
}

fn zip_atoms(numbers: Vec<u32>, positions: Vec<[f64; 3]>) -> Vec<Atom> {
    numbers
        .into_iter()
        .zip(positions)
        .map(|(n, p)| Atom::new(n, p))
        .collect()
}

/// 取出 %BLOCK XXX ... %ENDBLOCK XXX 之间的有效行（去掉注释和空行）
fn find_block<'a>(lines: &[&'a str], block_name: &str) -> Option<Vec<&'a str>> {
    let header = format!("%BLOCK {}", block_name);
    let start = lines
        .iter()
        .position(|l| l.trim().to_uppercase().starts_with(&header))?;

    Some(
        lines[start + 1..]
            .iter()
            .map(|l| l.trim())
            .take_while(|l| !l.to_uppercase().starts_with("%ENDBLOCK"))
            .filter(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with('!'))
            .collect(),
    )
}

/// 块首的单位行换算到 Å 的系数
fn unit_scale(block: &[&str]) -> f64 {
    match block.first().map(|l| l.to_lowercase()) {
        Some(u) if u == "bohr" || u == "a0" => BOHR_IN_ANGSTROM,
        Some(u) if u == "nm" => 10.0,
        _ => 1.0,
    }
}

fn is_unit_line(line: &str) -> bool {
    matches!(
        line.to_lowercase().as_str(),
        "ang" | "angstrom" | "bohr" | "a0" | "nm"
    )
}

/// 解析 LATTICE_CART 块
fn parse_lattice_cart(block: &[&str]) -> std::result::Result<Lattice, String> {
    let scale = unit_scale(block);
    let rows: Vec<[f64; 3]> = block
        .iter()
        .filter(|l| !is_unit_line(l))
        .filter_map(|l| {
            let parts: Vec<f64> = l.split_whitespace().filter_map(|s| s.parse().ok()).collect();
            (parts.len() >= 3).then(|| [parts[0] * scale, parts[1] * scale, parts[2] * scale])
        })
        .collect();

    match rows.as_slice() {
        [a, b, c, ..] => Ok(Lattice::from_vectors([*a, *b, *c])),
        _ => Err("Incomplete LATTICE_CART block".to_string()),
    }
}

/// 解析 LATTICE_ABC 块
fn parse_lattice_abc(block: &[&str]) -> std::result::Result<Lattice, String> {
    let scale = unit_scale(block);
    let params: Vec<f64> = block
        .iter()
        .filter(|l| !is_unit_line(l))
        .flat_map(|l| l.split_whitespace())
        .filter_map(|s| s.parse().ok())
        .collect();

    if params.len() < 6 {
        return Err("Incomplete LATTICE_ABC block (need a b c alpha beta gamma)".to_string());
    }

    Ok(Lattice::from_parameters(
        params[0] * scale,
        params[1] * scale,
        params[2] * scale,
        params[3],
        params[4],
        params[5],
    ))
}

/// 解析原子位置块，返回原子序数与坐标
fn parse_positions(block: &[&str]) -> std::result::Result<(Vec<u32>, Vec<[f64; 3]>), String> {
    let mut numbers = Vec::new();
    let mut positions = Vec::new();

    for line in block.iter().filter(|l| !is_unit_line(l)) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            return Err(format!("Invalid position line '{}'", line));
        }
        // "Fe:1" 之类的标记只取冒号前的元素
        let symbol = parts[0].split(':').next().unwrap_or(parts[0]);
        let number = elements::atomic_number(&elements::capitalize(symbol))
            .ok_or_else(|| format!("Unknown element '{}'", parts[0]))?;
        let coords: Vec<f64> = parts[1..4]
            .iter()
            .map(|s| s.parse())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| format!("Invalid position line '{}'", line))?;
        numbers.push(number);
        positions.push([coords[0], coords[1], coords[2]]);
    }

    Ok((numbers, positions))
}

//! # Quantum ESPRESSO pw.x 输入文件解析器
//!
//! 解析 scf.in 中的晶格、原子坐标与元素信息。
//!
//! ## pw.x 输入格式说明
//! ```text
//! &SYSTEM
//!   ibrav = 0, celldm(1) = 10.2, nat = 2, ntyp = 1
//! /
//! ATOMIC_SPECIES
//!  Si  28.086  Si.pbe-rrkj.UPF
//! ATOMIC_POSITIONS {alat|bohr|angstrom|crystal}
//!  Si 0.00 0.00 0.00
//!  Si 0.25 0.25 0.25
//! CELL_PARAMETERS {alat|bohr|angstrom}
//!  a1 a2 a3
//!  b1 b2 b3
//!  c1 c2 c3
//! ```
//!
//! 支持 ibrav = 0, 1, 2, 3, -3, 4, 6, 7, 8。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/structure.rs`, `models/elements.rs`
//! - 使用 `regex` 解析 namelist

use super::BOHR_IN_ANGSTROM;
use crate::error::{PhononError, Result};
use crate::models::elements::{self, capitalize};
use crate::models::{Atom, Crystal, Lattice};
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

const FORMAT: &str = "pw.x input";

/// 所有卡片名，用于确定卡片结束位置
const CARD_NAMES: [&str; 11] = [
    "ATOMIC_SPECIES",
    "ATOMIC_POSITIONS",
    "K_POINTS",
    "ADDITIONAL_K_POINTS",
    "CELL_PARAMETERS",
    "OCCUPATIONS",
    "CONSTRAINTS",
    "ATOMIC_VELOCITIES",
    "ATOMIC_FORCES",
    "SOLVENTS",
    "HUBBARD",
];

/// namelist 赋值：key = value
static ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)([a-z_][a-z0-9_]*(?:\(\s*\d+\s*\))?)\s*=\s*('[^']*'|"[^"]*"|[^,\s]+)"#)
        .unwrap()
});

/// 解析 pw.x 输入文件
pub fn parse_pw_input_file(path: &Path) -> Result<Crystal> {
    let content = fs::read_to_string(path).map_err(|e| PhononError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_pw_input_content(
        &content,
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown"),
    )
}

/// 从字符串内容解析 pw.x 输入
pub fn parse_pw_input_content(content: &str, default_name: &str) -> Result<Crystal> {
    let err = |reason: String| PhononError::parse(FORMAT, default_name, None, reason);

    let lines: Vec<String> = content.lines().map(strip_comment).collect();
    let system = parse_namelist(&lines, "system")
        .ok_or_else(|| err("Missing &SYSTEM namelist".to_string()))?;

    let ibrav = system
        .get("ibrav")
        .ok_or_else(|| err("Missing 'ibrav' in &SYSTEM".to_string()))
        .and_then(|v| parse_fortran_int(v).ok_or_else(|| err(format!("Invalid ibrav '{}'", v))))?;
    let nat = required_usize(&system, "nat").map_err(err)?;
    let ntyp = required_usize(&system, "ntyp").map_err(err)?;

    let params = CellParams::from_namelist(&system).map_err(err)?;
    let (lattice, alat) = build_lattice(ibrav, &params, &lines).map_err(err)?;

    let species = parse_species(&lines, ntyp).map_err(err)?;
    let (names, reduced) = parse_positions(&lines, nat, alat, &lattice).map_err(|e| match e {
        PositionError::Parse(reason) => err(reason),
        PositionError::Lattice(inner) => inner,
    })?;

    let mut atoms = Vec::with_capacity(nat);
    for (name, position) in names.iter().zip(reduced) {
        let pseudo = species
            .get(name)
            .ok_or_else(|| err(format!("Atom '{}' is not declared in ATOMIC_SPECIES", name)))?;
        let number = infer_atomic_number(name, pseudo).ok_or_else(|| {
            err(format!(
                "Unable to parse the chemical element either from the atom name '{}' or from the pseudo name '{}'",
                name, pseudo
            ))
        })?;
        atoms.push(Atom::new(number, position));
    }

    let mut crystal = Crystal::new(default_name, lattice, atoms);
    crystal.source_format = Some("qeinp".to_string());
    Ok(crystal)
}

// ─────────────────────────────────────────────────────────────
// namelist
// ─────────────────────────────────────────────────────────────

/// 去掉 '!' 或 '#' 之后的注释（引号内除外）
fn strip_comment(line: &str) -> String {
    let mut quote: Option<char> = None;
    for (i, ch) in line.char_indices() {
        match (quote, ch) {
            (None, '\'' | '"') => quote = Some(ch),
            (Some(q), c) if c == q => quote = None,
            (None, '!' | '#') => return line[..i].to_string(),
            _ => {}
        }
    }
    line.to_string()
}

/// 读取 &NAME ... / 之间的赋值，键统一为小写
fn parse_namelist(lines: &[String], name: &str) -> Option<HashMap<String, String>> {
    let header = format!("&{}", name);
    let start = lines
        .iter()
        .position(|l| l.trim().to_lowercase().starts_with(&header))?;

    let mut body = String::new();
    let first = lines[start].trim();
    body.push_str(&first[header.len().min(first.len())..]);
    body.push('\n');
    for line in &lines[start + 1..] {
        body.push_str(line);
        body.push('\n');
    }

    // 终止符 '/' 必须在引号之外
    let mut quote: Option<char> = None;
    let mut end = body.len();
    for (i, ch) in body.char_indices() {
        match (quote, ch) {
            (None, '\'' | '"') => quote = Some(ch),
            (Some(q), c) if c == q => quote = None,
            (None, '/') => {
                end = i;
                break;
            }
            _ => {}
        }
    }

    let map = ASSIGNMENT
        .captures_iter(&body[..end])
        .map(|cap| {
            let key: String = cap[1].to_lowercase().split_whitespace().collect();
            let value = cap[2].trim_matches(|c| c == '\'' || c == '"').to_string();
            (key, value)
        })
        .collect();
    Some(map)
}

/// 解析 Fortran 风格浮点数（支持 1.0d0）
pub(crate) fn parse_fortran_f64(s: &str) -> Option<f64> {
    s.trim()
        .trim_end_matches(',')
        .replace(['d', 'D'], "e")
        .parse()
        .ok()
}

fn parse_fortran_int(s: &str) -> Option<i64> {
    s.trim().trim_end_matches(',').parse().ok()
}

fn required_usize(map: &HashMap<String, String>, key: &str) -> std::result::Result<usize, String> {
    let raw = map
        .get(key)
        .ok_or_else(|| format!("Missing '{}' in &SYSTEM", key))?;
    parse_fortran_int(raw)
        .filter(|v| *v >= 0)
        .map(|v| v as usize)
        .ok_or_else(|| format!("Invalid value '{}' for '{}'", raw, key))
}

// ─────────────────────────────────────────────────────────────
// 晶格
// ─────────────────────────────────────────────────────────────

/// &SYSTEM 中的晶格参数
#[derive(Debug, Default)]
struct CellParams {
    celldm: [Option<f64>; 6],
    a: Option<f64>,
    b: Option<f64>,
    c: Option<f64>,
}

impl CellParams {
    fn from_namelist(map: &HashMap<String, String>) -> std::result::Result<Self, String> {
        let get = |key: &str| -> std::result::Result<Option<f64>, String> {
            match map.get(key) {
                Some(raw) => parse_fortran_f64(raw)
                    .map(Some)
                    .ok_or_else(|| format!("Invalid value '{}' for '{}'", raw, key)),
                None => Ok(None),
            }
        };

        let mut params = CellParams::default();
        for i in 0..6 {
            params.celldm[i] = get(&format!("celldm({})", i + 1))?;
        }
        params.a = get("a")?;
        params.b = get("b")?;
        params.c = get("c")?;

        if params.celldm[0].is_some() && params.a.is_some() {
            return Err("Both celldm(1) and A are specified".to_string());
        }
        Ok(params)
    }

    /// alat (Å)
    fn alat(&self) -> Option<f64> {
        self.celldm[0].map(|v| v * BOHR_IN_ANGSTROM).or(self.a)
    }

    /// b/a
    fn b_over_a(&self) -> Option<f64> {
        self.celldm[1].or_else(|| Some(self.b? / self.a?))
    }

    /// c/a
    fn c_over_a(&self) -> Option<f64> {
        self.celldm[2].or_else(|| Some(self.c? / self.a?))
    }
}

/// 构造晶格 (Å)，同时返回 alat (Å)
fn build_lattice(
    ibrav: i64,
    params: &CellParams,
    lines: &[String],
) -> std::result::Result<(Lattice, f64), String> {
    if ibrav == 0 {
        return lattice_from_card(params, lines);
    }

    let alat = params
        .alat()
        .ok_or_else(|| format!("ibrav = {} requires celldm(1) or A", ibrav))?;
    let need = |value: Option<f64>, what: &str| {
        value.ok_or_else(|| format!("ibrav = {} requires {}", ibrav, what))
    };

    let half = 0.5;
    let vectors = match ibrav {
        1 => [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        2 => [[-half, 0.0, half], [0.0, half, half], [-half, half, 0.0]],
        3 => [[half, half, half], [-half, half, half], [-half, -half, half]],
        -3 => [[-half, half, half], [half, -half, half], [half, half, -half]],
        4 => {
            let c = need(params.c_over_a(), "celldm(3) or C")?;
            [[1.0, 0.0, 0.0], [-0.5, 3f64.sqrt() / 2.0, 0.0], [0.0, 0.0, c]]
        }
        6 => {
            let c = need(params.c_over_a(), "celldm(3) or C")?;
            [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, c]]
        }
        7 => {
            let c = need(params.c_over_a(), "celldm(3) or C")?;
            [[half, -half, half * c], [half, half, half * c], [-half, -half, half * c]]
        }
        8 => {
            let b = need(params.b_over_a(), "celldm(2) or B")?;
            let c = need(params.c_over_a(), "celldm(3) or C")?;
            [[1.0, 0.0, 0.0], [0.0, b, 0.0], [0.0, 0.0, c]]
        }
        other => return Err(format!("Unsupported ibrav = {}", other)),
    };

    let matrix = vectors.map(|row| row.map(|x| x * alat));
    Ok((Lattice::from_vectors(matrix), alat))
}

/// ibrav = 0：从 CELL_PARAMETERS 卡片读取
fn lattice_from_card(
    params: &CellParams,
    lines: &[String],
) -> std::result::Result<(Lattice, f64), String> {
    let (unit, body) = find_card(lines, "CELL_PARAMETERS")
        .ok_or_else(|| "ibrav = 0 requires a CELL_PARAMETERS card".to_string())?;
    if body.len() < 3 {
        return Err("Incomplete CELL_PARAMETERS card".to_string());
    }

    let mut rows = [[0.0; 3]; 3];
    for (i, line) in body.iter().take(3).enumerate() {
        let values: Vec<f64> = line
            .split_whitespace()
            .take(3)
            .map(parse_fortran_f64)
            .collect::<Option<_>>()
            .filter(|v: &Vec<f64>| v.len() == 3)
            .ok_or_else(|| format!("Invalid lattice vector '{}'", line.trim()))?;
        rows[i] = [values[0], values[1], values[2]];
    }

    let explicit_alat = params.alat();
    let factor = match unit.as_str() {
        "alat" => explicit_alat.ok_or("CELL_PARAMETERS in alat units requires celldm(1) or A")?,
        "bohr" => BOHR_IN_ANGSTROM,
        "angstrom" => 1.0,
        // 无单位：有 alat 时按 alat，否则按 bohr
        "" => explicit_alat.unwrap_or(BOHR_IN_ANGSTROM),
        other => return Err(format!("Unknown CELL_PARAMETERS units '{}'", other)),
    };

    let matrix = rows.map(|row| row.map(|x| x * factor));
    let lattice = Lattice::from_vectors(matrix);
    // 未显式给出 alat 时取第一个基矢长度
    let alat = explicit_alat.unwrap_or_else(|| crate::models::lattice::norm(&matrix[0]));
    Ok((lattice, alat))
}

// ─────────────────────────────────────────────────────────────
// 卡片
// ─────────────────────────────────────────────────────────────

fn is_card_header(line: &str) -> bool {
    let upper = line.trim_start().to_uppercase();
    CARD_NAMES.iter().any(|c| {
        upper.starts_with(c)
            && upper[c.len()..]
                .chars()
                .next()
                .map_or(true, |ch| !(ch.is_alphanumeric() || ch == '_'))
    })
}

/// 找到卡片，返回 (小写单位, 非空内容行)
fn find_card<'a>(lines: &'a [String], name: &str) -> Option<(String, Vec<&'a str>)> {
    let start = lines.iter().position(|l| {
        let upper = l.trim_start().to_uppercase();
        upper.starts_with(name) && is_card_header(l)
    })?;

    let unit: String = lines[start].trim_start()[name.len()..]
        .chars()
        .filter(|c| !matches!(c, '{' | '}' | '(' | ')') && !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();

    let body = lines[start + 1..]
        .iter()
        .take_while(|l| !is_card_header(l) && !l.trim_start().starts_with('&'))
        .map(|l| l.as_str())
        .filter(|l| !l.trim().is_empty())
        .collect();

    Some((unit, body))
}

/// ATOMIC_SPECIES：原子名 -> 赝势文件名
fn parse_species(
    lines: &[String],
    ntyp: usize,
) -> std::result::Result<HashMap<String, String>, String> {
    let (_, body) =
        find_card(lines, "ATOMIC_SPECIES").ok_or_else(|| "Missing ATOMIC_SPECIES card".to_string())?;
    if body.len() < ntyp {
        return Err(format!(
            "ATOMIC_SPECIES lists {} species but ntyp = {}",
            body.len(),
            ntyp
        ));
    }

    body.iter()
        .take(ntyp)
        .map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 3 {
                return Err(format!("Invalid ATOMIC_SPECIES line '{}'", line.trim()));
            }
            Ok((parts[0].to_string(), parts[2].to_string()))
        })
        .collect()
}

enum PositionError {
    Parse(String),
    Lattice(PhononError),
}

impl From<String> for PositionError {
    fn from(reason: String) -> Self {
        PositionError::Parse(reason)
    }
}

/// ATOMIC_POSITIONS：返回原子名与约化坐标
fn parse_positions(
    lines: &[String],
    nat: usize,
    alat: f64,
    lattice: &Lattice,
) -> std::result::Result<(Vec<String>, Vec<[f64; 3]>), PositionError> {
    let (unit, body) = find_card(lines, "ATOMIC_POSITIONS")
        .ok_or_else(|| "Missing ATOMIC_POSITIONS card".to_string())?;
    if body.len() < nat {
        return Err(format!("ATOMIC_POSITIONS lists {} atoms but nat = {}", body.len(), nat).into());
    }

    let mut names = Vec::with_capacity(nat);
    let mut coords = Vec::with_capacity(nat);
    for line in body.iter().take(nat) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let xyz = parts
            .get(1..4)
            .and_then(|p| p.iter().map(|s| parse_fortran_f64(s)).collect::<Option<Vec<_>>>())
            .ok_or_else(|| format!("Invalid ATOMIC_POSITIONS line '{}'", line.trim()))?;
        names.push(parts[0].to_string());
        coords.push([xyz[0], xyz[1], xyz[2]]);
    }

    let factor = match unit.as_str() {
        "crystal" => return Ok((names, coords)),
        "alat" | "" => alat,
        "bohr" => BOHR_IN_ANGSTROM,
        "angstrom" => 1.0,
        other => return Err(format!("Unsupported ATOMIC_POSITIONS units '{}'", other).into()),
    };

    let cartesian: Vec<[f64; 3]> = coords.iter().map(|c| c.map(|x| x * factor)).collect();
    let reduced = lattice
        .to_reduced(&cartesian)
        .map_err(PositionError::Lattice)?;
    Ok((names, reduced))
}

// ─────────────────────────────────────────────────────────────
// 元素推断
// ─────────────────────────────────────────────────────────────

/// 从原子名与赝势文件名推断原子序数，两者都能解析时以赝势为准
pub fn infer_atomic_number(atom_name: &str, pseudo: &str) -> Option<u32> {
    let from_name: String = atom_name
        .chars()
        .filter(|c| c.is_alphabetic())
        .take(2)
        .collect();
    let from_name = elements::atomic_number(&capitalize(&from_name));

    let mut from_pseudo = pseudo;
    for sep in ['-', '.', '_'] {
        from_pseudo = from_pseudo.split(sep).next().unwrap_or(from_pseudo);
    }
    let from_pseudo = elements::atomic_number(&capitalize(from_pseudo));

    from_pseudo.or(from_name)
}

//! # 高对称路径提供者
//!
//! 路径查找模式需要布里渊区高对称点的标准坐标与标签。
//! 这里定义提供者接口以及两种实现：
//! - `SeekpathJsonFile`: 读取 seekpath `get_path` 输出的 JSON（`point_coords` + 可选 `path`）
//! - `BuiltinPathTable`: 根据晶格参数识别简单原胞（立方、四方、正交、六方）并给出标准点。
//!   只看晶格参数，不考虑原子基元：原子排布对称性更低的立方晶胞仍得到 cP 的点，
//!   此时应提供 seekpath JSON。
//!
//! 返回的原始 JSON 原样写入数据集的 `seekpath_data` 字段。
//!
//! ## 依赖关系
//! - 被 `phonon/highsym.rs` 和 `phonon/builder.rs` 使用
//! - 使用 `models/structure.rs`
//! - 使用 `serde_json`

use crate::error::{PhononError, Result};
use crate::models::Crystal;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// 晶格参数比较的相对容差
const PARAM_RTOL: f64 = 1.0e-4;
/// 角度容差（度）
const ANGLE_TOL: f64 = 1.0e-3;

/// 一条高对称路径
#[derive(Debug, Clone, PartialEq)]
pub struct SymmetryPath {
    /// (标签, 约化坐标)
    pub points: Vec<(String, [f64; 3])>,
    /// 路径段 (起点标签, 终点标签)
    pub segments: Vec<(String, String)>,
    /// 原始数据，写入 `seekpath_data`
    pub raw: Value,
}

impl SymmetryPath {
    /// 从 seekpath 风格的 JSON 值构建
    pub fn from_seekpath_value(raw: Value) -> Result<Self> {
        let coords = raw
            .get("point_coords")
            .and_then(Value::as_object)
            .ok_or_else(|| PhononError::PathLookup("missing 'point_coords' object".to_string()))?;

        let mut points = Vec::with_capacity(coords.len());
        for (label, value) in coords {
            let xyz: Vec<f64> = value
                .as_array()
                .map(|a| a.iter().filter_map(Value::as_f64).collect())
                .unwrap_or_default();
            if xyz.len() != 3 {
                return Err(PhononError::PathLookup(format!(
                    "point '{}' does not have 3 coordinates",
                    label
                )));
            }
            points.push((label.clone(), [xyz[0], xyz[1], xyz[2]]));
        }

        let segments = raw
            .get("path")
            .and_then(Value::as_array)
            .map(|segs| {
                segs.iter()
                    .filter_map(|s| {
                        let pair = s.as_array()?;
                        Some((
                            pair.first()?.as_str()?.to_string(),
                            pair.get(1)?.as_str()?.to_string(),
                        ))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(SymmetryPath {
            points,
            segments,
            raw,
        })
    }

    pub fn labels(&self) -> Vec<&str> {
        self.points.iter().map(|(l, _)| l.as_str()).collect()
    }
}

/// 高对称路径提供者
pub trait SymmetryPathProvider: Send + Sync {
    /// 提供者名称（用于日志）
    fn name(&self) -> String;

    /// 获取给定结构的高对称路径
    fn get_path(&self, crystal: &Crystal) -> Result<SymmetryPath>;

    /// 使用该提供者时需要提示用户的限制
    fn caveat(&self) -> Option<&'static str> {
        None
    }
}

/// 从 seekpath JSON 文件读取
#[derive(Debug, Clone)]
pub struct SeekpathJsonFile {
    path: PathBuf,
}

impl SeekpathJsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SeekpathJsonFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SymmetryPathProvider for SeekpathJsonFile {
    fn name(&self) -> String {
        format!("seekpath file {}", self.path.display())
    }

    fn get_path(&self, _crystal: &Crystal) -> Result<SymmetryPath> {
        let content = fs::read_to_string(&self.path).map_err(|e| PhononError::FileReadError {
            path: self.path.display().to_string(),
            source: e,
        })?;
        let raw: Value = serde_json::from_str(&content).map_err(|e| {
            PhononError::PathLookup(format!("{}: {}", self.path.display(), e))
        })?;
        SymmetryPath::from_seekpath_value(raw)
    }
}

/// 简单原胞的晶系
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatticeFamily {
    Cubic,
    Tetragonal,
    Orthorhombic,
    Hexagonal,
}

impl LatticeFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            LatticeFamily::Cubic => "cP",
            LatticeFamily::Tetragonal => "tP",
            LatticeFamily::Orthorhombic => "oP",
            LatticeFamily::Hexagonal => "hP",
        }
    }

    /// 由晶格参数识别，无法识别返回 None
    pub fn classify(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Option<Self> {
        let eq = |x: f64, y: f64| (x - y).abs() <= PARAM_RTOL * x.abs().max(y.abs());
        let right = |x: f64| (x - 90.0).abs() <= ANGLE_TOL;

        if !right(alpha) || !right(beta) {
            return None;
        }
        if (gamma - 120.0).abs() <= ANGLE_TOL && eq(a, b) {
            return Some(LatticeFamily::Hexagonal);
        }
        if !right(gamma) {
            return None;
        }
        match (eq(a, b), eq(b, c), eq(a, c)) {
            (true, true, _) => Some(LatticeFamily::Cubic),
            (true, false, _) => Some(LatticeFamily::Tetragonal),
            (false, false, false) => Some(LatticeFamily::Orthorhombic),
            // a == c 或 b == c 需要换轴，按四方处理会给出错误的点
            _ => None,
        }
    }

    /// 标准高对称点（倒易原胞约化坐标）
    fn points(&self) -> Vec<(&'static str, [f64; 3])> {
        match self {
            LatticeFamily::Cubic => vec![
                ("GAMMA", [0.0, 0.0, 0.0]),
                ("X", [0.0, 0.5, 0.0]),
                ("M", [0.5, 0.5, 0.0]),
                ("R", [0.5, 0.5, 0.5]),
            ],
            LatticeFamily::Tetragonal => vec![
                ("GAMMA", [0.0, 0.0, 0.0]),
                ("X", [0.0, 0.5, 0.0]),
                ("M", [0.5, 0.5, 0.0]),
                ("Z", [0.0, 0.0, 0.5]),
                ("R", [0.0, 0.5, 0.5]),
                ("A", [0.5, 0.5, 0.5]),
            ],
            LatticeFamily::Orthorhombic => vec![
                ("GAMMA", [0.0, 0.0, 0.0]),
                ("X", [0.5, 0.0, 0.0]),
                ("Y", [0.0, 0.5, 0.0]),
                ("Z", [0.0, 0.0, 0.5]),
                ("S", [0.5, 0.5, 0.0]),
                ("U", [0.5, 0.0, 0.5]),
                ("T", [0.0, 0.5, 0.5]),
                ("R", [0.5, 0.5, 0.5]),
            ],
            LatticeFamily::Hexagonal => vec![
                ("GAMMA", [0.0, 0.0, 0.0]),
                ("A", [0.0, 0.0, 0.5]),
                ("K", [1.0 / 3.0, 1.0 / 3.0, 0.0]),
                ("H", [1.0 / 3.0, 1.0 / 3.0, 0.5]),
                ("L", [0.5, 0.0, 0.5]),
                ("M", [0.5, 0.0, 0.0]),
            ],
        }
    }

    /// 标准路径段
    fn segments(&self) -> Vec<(&'static str, &'static str)> {
        match self {
            LatticeFamily::Cubic => vec![
                ("GAMMA", "X"),
                ("X", "M"),
                ("M", "GAMMA"),
                ("GAMMA", "R"),
                ("R", "X"),
                ("M", "R"),
            ],
            LatticeFamily::Tetragonal => vec![
                ("GAMMA", "X"),
                ("X", "M"),
                ("M", "GAMMA"),
                ("GAMMA", "Z"),
                ("Z", "R"),
                ("R", "A"),
                ("A", "Z"),
                ("X", "R"),
                ("M", "A"),
            ],
            LatticeFamily::Orthorhombic => vec![
                ("GAMMA", "X"),
                ("X", "S"),
                ("S", "Y"),
                ("Y", "GAMMA"),
                ("GAMMA", "Z"),
                ("Z", "U"),
                ("U", "R"),
                ("R", "T"),
                ("T", "Z"),
                ("Y", "T"),
                ("U", "X"),
                ("S", "R"),
            ],
            LatticeFamily::Hexagonal => vec![
                ("GAMMA", "M"),
                ("M", "K"),
                ("K", "GAMMA"),
                ("GAMMA", "A"),
                ("A", "L"),
                ("L", "H"),
                ("H", "A"),
                ("L", "M"),
                ("K", "H"),
            ],
        }
    }
}

/// 内置的简单晶系高对称点表
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinPathTable;

impl SymmetryPathProvider for BuiltinPathTable {
    fn name(&self) -> String {
        "builtin path table".to_string()
    }

    fn caveat(&self) -> Option<&'static str> {
        Some(
            "The builtin path table only looks at the lattice parameters and ignores the atomic basis. \
             Provide a seekpath JSON file (--path-file) if the structure has lower symmetry.",
        )
    }

    fn get_path(&self, crystal: &Crystal) -> Result<SymmetryPath> {
        let (a, b, c, alpha, beta, gamma) = crystal.lattice.parameters();
        let family = LatticeFamily::classify(a, b, c, alpha, beta, gamma).ok_or_else(|| {
            PhononError::PathLookup(format!(
                "no builtin path for cell a={:.4} b={:.4} c={:.4} alpha={:.2} beta={:.2} gamma={:.2}; \
                 provide a seekpath JSON file",
                a, b, c, alpha, beta, gamma
            ))
        })?;

        let mut coords = Map::new();
        for (label, xyz) in family.points() {
            coords.insert(label.to_string(), json!(xyz));
        }
        let raw = json!({
            "bravais_lattice": family.as_str(),
            "point_coords": coords,
            "path": family.segments(),
        });
        SymmetryPath::from_seekpath_value(raw)
    }
}

//! # 声子数据集
//!
//! 汇总结构、模式、路径距离与高对称点的最终记录，组装后不可变。
//! `to_record` 给出确定性的可序列化映射，字段与网页可视化端约定一致。
//!
//! ## 依赖关系
//! - 被 `phonon/builder.rs` 组装
//! - 被 `export/` 和 `commands/` 使用
//! - 使用 `serde`, `serde_json`

use super::lattice::Matrix3;
use super::modes::ModeSet;
use super::structure::Crystal;
use serde::Serialize;

/// 高对称点：q 点下标 + 标签（合并标签形如 "X|Y"）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighSymmetryPoint {
    pub index: usize,
    pub label: String,
}

impl HighSymmetryPoint {
    pub fn new(index: usize, label: impl Into<String>) -> Self {
        HighSymmetryPoint {
            index,
            label: label.into(),
        }
    }

    pub fn unlabeled(index: usize) -> Self {
        HighSymmetryPoint::new(index, "")
    }

    /// 是否由两个相邻标签合并而来
    pub fn is_merged(&self) -> bool {
        self.label.contains(LABEL_SEPARATOR)
    }
}

/// 合并标签的分隔符
pub const LABEL_SEPARATOR: char = '|';

/// 声子数据集
#[derive(Debug, Clone)]
pub struct PhononDataset {
    name: String,
    structure: Crystal,
    formula: String,
    qpoints: Vec<[f64; 3]>,
    modes: ModeSet,
    distances: Vec<f64>,
    highsym_qpts: Vec<HighSymmetryPoint>,
    repetitions: [usize; 3],
    alat: f64,
    seekpath_data: Option<serde_json::Value>,
}

/// 序列化视图，字段名即 JSON 键名
#[derive(Debug, Serialize)]
pub struct DatasetRecord<'a> {
    pub name: &'a str,
    pub natoms: usize,
    pub lattice: Matrix3,
    pub atom_types: Vec<String>,
    pub atom_numbers: Vec<u32>,
    pub formula: &'a str,
    pub qpoints: &'a [[f64; 3]],
    pub repetitions: [usize; 3],
    pub atom_pos_car: Vec<[f64; 3]>,
    pub atom_pos_red: Vec<[f64; 3]>,
    pub eigenvalues: &'a [Vec<f64>],
    pub distances: &'a [f64],
    pub highsym_qpts: Vec<(usize, &'a str)>,
    pub vectors: Vec<Vec<Vec<[[f64; 2]; 3]>>>,
    pub alat: f64,
    pub seekpath_data: Option<&'a serde_json::Value>,
}

impl PhononDataset {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        name: String,
        structure: Crystal,
        qpoints: Vec<[f64; 3]>,
        modes: ModeSet,
        distances: Vec<f64>,
        highsym_qpts: Vec<HighSymmetryPoint>,
        repetitions: [usize; 3],
        alat: f64,
        seekpath_data: Option<serde_json::Value>,
    ) -> Self {
        let formula = structure.formula();
        PhononDataset {
            name,
            structure,
            formula,
            qpoints,
            modes,
            distances,
            highsym_qpts,
            repetitions,
            alat,
            seekpath_data,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn structure(&self) -> &Crystal {
        &self.structure
    }

    pub fn formula(&self) -> &str {
        &self.formula
    }

    pub fn qpoints(&self) -> &[[f64; 3]] {
        &self.qpoints
    }

    pub fn modes(&self) -> &ModeSet {
        &self.modes
    }

    pub fn eigenvalues(&self) -> &[Vec<f64>] {
        &self.modes.eigenvalues
    }

    pub fn distances(&self) -> &[f64] {
        &self.distances
    }

    pub fn highsym_qpts(&self) -> &[HighSymmetryPoint] {
        &self.highsym_qpts
    }

    pub fn repetitions(&self) -> [usize; 3] {
        self.repetitions
    }

    /// alat (Å)
    pub fn alat(&self) -> f64 {
        self.alat
    }

    pub fn seekpath_data(&self) -> Option<&serde_json::Value> {
        self.seekpath_data.as_ref()
    }

    pub fn nqpoints(&self) -> usize {
        self.qpoints.len()
    }

    pub fn nphonons(&self) -> usize {
        self.modes.nphonons()
    }

    /// 高对称点下标对应的标签，非高对称点返回 None
    pub fn label_at(&self, index: usize) -> Option<&str> {
        self.highsym_qpts
            .iter()
            .find(|p| p.index == index)
            .map(|p| p.label.as_str())
    }

    /// 可序列化视图
    pub fn to_record(&self) -> DatasetRecord<'_> {
        DatasetRecord {
            name: &self.name,
            natoms: self.structure.natoms(),
            lattice: self.structure.lattice.matrix,
            atom_types: self.structure.symbols(),
            atom_numbers: self.structure.numbers(),
            formula: &self.formula,
            qpoints: &self.qpoints,
            repetitions: self.repetitions,
            atom_pos_car: self.structure.cartesian_positions(),
            atom_pos_red: self.structure.positions(),
            eigenvalues: &self.modes.eigenvalues,
            distances: &self.distances,
            highsym_qpts: self
                .highsym_qpts
                .iter()
                .map(|p| (p.index, p.label.as_str()))
                .collect(),
            vectors: self.modes.interleaved_vectors(),
            alat: self.alat,
            seekpath_data: self.seekpath_data.as_ref(),
        }
    }

    /// 转换为 JSON 值
    pub fn to_json_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self.to_record())
    }
}

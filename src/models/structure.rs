//! # 晶体结构数据模型
//!
//! 定义统一的晶体结构表示：晶格、原子约化坐标与原子序数。
//! 每个原子同时携带坐标和元素，因此坐标数与元素数恒相等。
//!
//! ## 依赖关系
//! - 被 `parsers/` 和 `phonon/` 使用
//! - 使用 `models/lattice.rs`, `models/elements.rs`

use super::elements;
use super::lattice::Lattice;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 原子信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    /// 元素符号
    pub element: String,

    /// 原子序数
    pub number: u32,

    /// 分数坐标 [x, y, z]
    pub position: [f64; 3],
}

impl Atom {
    /// 由原子序数创建，元素符号查表得到
    pub fn new(number: u32, position: [f64; 3]) -> Self {
        Atom {
            element: elements::chemical_symbol(number).unwrap_or("X").to_string(),
            number,
            position,
        }
    }
}

/// 晶体结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crystal {
    /// 结构名称
    pub name: String,

    /// 晶格 (Å)
    pub lattice: Lattice,

    /// 原子列表
    pub atoms: Vec<Atom>,

    /// 来源文件格式
    pub source_format: Option<String>,
}

impl Crystal {
    pub fn new(name: impl Into<String>, lattice: Lattice, atoms: Vec<Atom>) -> Self {
        Crystal {
            name: name.into(),
            lattice,
            atoms,
            source_format: None,
        }
    }

    pub fn natoms(&self) -> usize {
        self.atoms.len()
    }

    /// 约化坐标 (N x 3)
    pub fn positions(&self) -> Vec<[f64; 3]> {
        self.atoms.iter().map(|a| a.position).collect()
    }

    /// 笛卡尔坐标 (Å)
    pub fn cartesian_positions(&self) -> Vec<[f64; 3]> {
        self.lattice.to_cartesian(&self.positions())
    }

    pub fn numbers(&self) -> Vec<u32> {
        self.atoms.iter().map(|a| a.number).collect()
    }

    pub fn symbols(&self) -> Vec<String> {
        self.atoms.iter().map(|a| a.element.clone()).collect()
    }

    /// 计算化学式
    ///
    /// 元素按符号字母序排列，若存在 H 则移到最前，再若存在 C 则移到最前，
    /// 因此含碳氢的体系以 "CH" 开头。计数为 1 时省略。
    pub fn formula(&self) -> String {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for atom in &self.atoms {
            *counts.entry(atom.element.as_str()).or_insert(0) += 1;
        }

        let mut ordered: Vec<(&str, usize)> = counts.into_iter().collect();
        for front in ["H", "C"] {
            if let Some(idx) = ordered.iter().position(|(el, _)| *el == front) {
                let entry = ordered.remove(idx);
                ordered.insert(0, entry);
            }
        }

        ordered
            .into_iter()
            .map(|(el, count)| {
                if count == 1 {
                    el.to_string()
                } else {
                    format!("{}{}", el, count)
                }
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

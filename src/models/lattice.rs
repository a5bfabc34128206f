//! # 晶格与坐标变换
//!
//! 晶格矩阵、倒易晶格，以及笛卡尔坐标与约化（分数）坐标之间的转换。
//!
//! 约定：矩阵按行存储基矢，坐标为行向量，
//! `cartesian = reduced · basis`，`reduced = cartesian · basis⁻¹`。
//!
//! ## 依赖关系
//! - 被 `models/structure.rs`, `parsers/`, `phonon/` 使用
//! - 无外部模块依赖

use crate::error::{PhononError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// 3x3 矩阵，行向量为基矢
pub type Matrix3 = [[f64; 3]; 3];

/// 行列式低于此值视为奇异
const SINGULAR_TOLERANCE: f64 = 1e-10;

/// 晶格参数表示
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lattice {
    /// 晶格向量矩阵 (3x3)，行向量表示 a, b, c
    /// [[a1, a2, a3], [b1, b2, b3], [c1, c2, c3]]
    pub matrix: Matrix3,
}

impl Lattice {
    /// 从晶格参数 (a, b, c, alpha, beta, gamma) 创建晶格
    /// 角度单位：度
    pub fn from_parameters(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Self {
        let cos_alpha = alpha.to_radians().cos();
        let cos_beta = beta.to_radians().cos();
        let (sin_gamma, cos_gamma) = gamma.to_radians().sin_cos();

        let c1 = c * cos_beta;
        let c2 = c * (cos_alpha - cos_beta * cos_gamma) / sin_gamma;
        let c3 = (c * c - c1 * c1 - c2 * c2).sqrt();

        Lattice {
            matrix: [
                [a, 0.0, 0.0],
                [b * cos_gamma, b * sin_gamma, 0.0],
                [c1, c2, c3],
            ],
        }
    }

    /// 从晶格向量矩阵创建
    pub fn from_vectors(matrix: Matrix3) -> Self {
        Lattice { matrix }
    }

    /// 获取晶格参数 (a, b, c, alpha, beta, gamma)
    pub fn parameters(&self) -> (f64, f64, f64, f64, f64, f64) {
        let [a_vec, b_vec, c_vec] = self.matrix;
        let a = norm(&a_vec);
        let b = norm(&b_vec);
        let c = norm(&c_vec);

        let alpha = (dot(&b_vec, &c_vec) / (b * c)).acos().to_degrees();
        let beta = (dot(&a_vec, &c_vec) / (a * c)).acos().to_degrees();
        let gamma = (dot(&a_vec, &b_vec) / (a * b)).acos().to_degrees();

        (a, b, c, alpha, beta, gamma)
    }

    /// 晶格矩阵行列式（有符号体积）
    pub fn determinant(&self) -> f64 {
        determinant(&self.matrix)
    }

    /// 晶格矩阵的逆，奇异时返回 `DegenerateLattice`
    pub fn inverse(&self) -> Result<Matrix3> {
        inverse(&self.matrix)
    }

    /// 倒易晶格：2π·(cell⁻¹)ᵀ，满足 aᵢ·bⱼ = 2πδᵢⱼ
    pub fn reciprocal(&self) -> Result<Lattice> {
        let rec = self.reciprocal_crystallographic()?;
        Ok(Lattice::from_vectors(scale(&rec.matrix, 2.0 * PI)))
    }

    /// 不含 2π 因子的倒易晶格 (cell⁻¹)ᵀ，用于路径长度
    pub fn reciprocal_crystallographic(&self) -> Result<Lattice> {
        let inv = self.inverse()?;
        Ok(Lattice::from_vectors(transpose(&inv)))
    }

    /// 约化坐标 -> 笛卡尔坐标
    pub fn to_cartesian(&self, coords: &[[f64; 3]]) -> Vec<[f64; 3]> {
        to_cartesian(coords, &self.matrix)
    }

    /// 笛卡尔坐标 -> 约化坐标
    pub fn to_reduced(&self, coords: &[[f64; 3]]) -> Result<Vec<[f64; 3]>> {
        to_reduced(coords, &self.matrix)
    }

    /// 沿 q 点路径的累积距离（单位 1/Å，不含 2π）
    ///
    /// 第一个值恒为 0，之后单调不减。
    pub fn path_distances(&self, qpoints: &[[f64; 3]]) -> Result<Vec<f64>> {
        let rec = self.reciprocal_crystallographic()?;
        let cart = rec.to_cartesian(qpoints);

        let mut distances = Vec::with_capacity(cart.len());
        let mut distance = 0.0;
        for (k, q) in cart.iter().enumerate() {
            if k > 0 {
                distance += norm(&sub(q, &cart[k - 1]));
            }
            distances.push(distance);
        }
        Ok(distances)
    }

    /// 逐元素近似比较：|a - b| <= atol + rtol·|b|
    pub fn allclose(&self, other: &Lattice, rtol: f64, atol: f64) -> bool {
        self.matrix
            .iter()
            .flatten()
            .zip(other.matrix.iter().flatten())
            .all(|(a, b)| (a - b).abs() <= atol + rtol * b.abs())
    }
}

// ─────────────────────────────────────────────────────────────
// 向量与矩阵运算
// ─────────────────────────────────────────────────────────────

/// coords · basis
pub fn to_cartesian(coords: &[[f64; 3]], basis: &Matrix3) -> Vec<[f64; 3]> {
    coords.iter().map(|c| mat_vec(c, basis)).collect()
}

/// coords · basis⁻¹
pub fn to_reduced(coords: &[[f64; 3]], basis: &Matrix3) -> Result<Vec<[f64; 3]>> {
    let inv = inverse(basis)?;
    Ok(coords.iter().map(|c| mat_vec(c, &inv)).collect())
}

/// 行向量乘矩阵 v · m
fn mat_vec(v: &[f64; 3], m: &Matrix3) -> [f64; 3] {
    [
        v[0] * m[0][0] + v[1] * m[1][0] + v[2] * m[2][0],
        v[0] * m[0][1] + v[1] * m[1][1] + v[2] * m[2][1],
        v[0] * m[0][2] + v[1] * m[1][2] + v[2] * m[2][2],
    ]
}

pub fn determinant(m: &Matrix3) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

pub fn inverse(m: &Matrix3) -> Result<Matrix3> {
    let det = determinant(m);
    if det.abs() < SINGULAR_TOLERANCE {
        return Err(PhononError::DegenerateLattice { determinant: det });
    }

    Ok([
        [
            (m[1][1] * m[2][2] - m[1][2] * m[2][1]) / det,
            (m[0][2] * m[2][1] - m[0][1] * m[2][2]) / det,
            (m[0][1] * m[1][2] - m[0][2] * m[1][1]) / det,
        ],
        [
            (m[1][2] * m[2][0] - m[1][0] * m[2][2]) / det,
            (m[0][0] * m[2][2] - m[0][2] * m[2][0]) / det,
            (m[0][2] * m[1][0] - m[0][0] * m[1][2]) / det,
        ],
        [
            (m[1][0] * m[2][1] - m[1][1] * m[2][0]) / det,
            (m[0][1] * m[2][0] - m[0][0] * m[2][1]) / det,
            (m[0][0] * m[1][1] - m[0][1] * m[1][0]) / det,
        ],
    ])
}

pub fn transpose(m: &Matrix3) -> Matrix3 {
    [
        [m[0][0], m[1][0], m[2][0]],
        [m[0][1], m[1][1], m[2][1]],
        [m[0][2], m[1][2], m[2][2]],
    ]
}

pub fn scale(m: &Matrix3, factor: f64) -> Matrix3 {
    m.map(|row| row.map(|x| x * factor))
}

pub fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub fn sub(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub fn norm(v: &[f64; 3]) -> f64 {
    dot(v, v).sqrt()
}

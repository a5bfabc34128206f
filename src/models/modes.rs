//! # 声子模式数据
//!
//! 每个 q 点的本征值（频率，cm⁻¹）与复本征矢。
//! 内部保持真正的复数表示，只在序列化时展开为 [实部, 虚部] 对。
//!
//! ## 依赖关系
//! - 被 `parsers/matdyn.rs` 创建
//! - 被 `phonon/band_connection.rs`, `models/dataset.rs` 使用
//! - 使用 `num-complex`

use num_complex::Complex64;

/// 单个原子在三个方向上的位移分量
pub type AtomDisplacement = [Complex64; 3];

/// 一个模式的本征矢：natoms 个原子位移
pub type Eigenvector = Vec<AtomDisplacement>;

/// 全部 q 点的模式数据
///
/// - `eigenvalues`: [Nq][Nphonon]
/// - `eigenvectors`: [Nq][Nphonon][Natoms]，每个元素 3 个复分量
#[derive(Debug, Clone, PartialEq)]
pub struct ModeSet {
    pub eigenvalues: Vec<Vec<f64>>,
    pub eigenvectors: Vec<Vec<Eigenvector>>,
}

impl ModeSet {
    pub fn new(eigenvalues: Vec<Vec<f64>>, eigenvectors: Vec<Vec<Eigenvector>>) -> Self {
        ModeSet {
            eigenvalues,
            eigenvectors,
        }
    }

    pub fn nqpoints(&self) -> usize {
        self.eigenvalues.len()
    }

    pub fn nphonons(&self) -> usize {
        self.eigenvalues.first().map_or(0, |row| row.len())
    }

    pub fn natoms(&self) -> usize {
        self.eigenvectors
            .first()
            .and_then(|q| q.first())
            .map_or(0, |v| v.len())
    }

    /// 按给定顺序重排某个 q 点的模式：新位置 n 取原第 `order[n]` 个模式
    pub fn permuted(&self, k: usize, order: &[usize]) -> (Vec<f64>, Vec<Eigenvector>) {
        let values = order.iter().map(|&i| self.eigenvalues[k][i]).collect();
        let vectors = order.iter().map(|&i| self.eigenvectors[k][i].clone()).collect();
        (values, vectors)
    }

    /// 本征矢展开为 [Nq][Nphonon][Natoms][3][2] 的实数数组
    pub fn interleaved_vectors(&self) -> Vec<Vec<Vec<[[f64; 2]; 3]>>> {
        self.eigenvectors
            .iter()
            .map(|qpoint| {
                qpoint
                    .iter()
                    .map(|mode| {
                        mode.iter()
                            .map(|atom| atom.map(|z| [z.re, z.im]))
                            .collect()
                    })
                    .collect()
            })
            .collect()
    }
}

/// 两个本征矢的内积 ⟨a|b⟩ = Σ conj(a)·b，遍历全部原子与方向
pub fn inner_product(a: &[AtomDisplacement], b: &[AtomDisplacement]) -> Complex64 {
    a.iter()
        .zip(b.iter())
        .flat_map(|(da, db)| da.iter().zip(db.iter()))
        .map(|(x, y)| x.conj() * y)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn test_inner_product_conjugates_left() {
        let a = vec![[c(0.0, 1.0), c(0.0, 0.0), c(0.0, 0.0)]];
        let b = vec![[c(0.0, 1.0), c(0.0, 0.0), c(0.0, 0.0)]];
        let p = inner_product(&a, &b);
        assert!((p.re - 1.0).abs() < 1e-12);
        assert!(p.im.abs() < 1e-12);
    }

    #[test]
    fn test_shape_and_interleave() {
        let vec0 = vec![[c(1.0, -2.0), c(3.0, 4.0), c(5.0, 6.0)]];
        let modes = ModeSet::new(vec![vec![1.0, 2.0, 3.0]], vec![vec![vec0.clone(); 3]]);
        assert_eq!(modes.nqpoints(), 1);
        assert_eq!(modes.nphonons(), 3);
        assert_eq!(modes.natoms(), 1);

        let flat = modes.interleaved_vectors();
        assert_eq!(flat[0][2][0][0], [1.0, -2.0]);
        assert_eq!(flat[0][2][0][2], [5.0, 6.0]);
    }

    #[test]
    fn test_permuted() {
        let v = |x: f64| vec![[c(x, 0.0), c(0.0, 0.0), c(0.0, 0.0)]];
        let modes = ModeSet::new(vec![vec![10.0, 20.0, 30.0]], vec![vec![v(1.0), v(2.0), v(3.0)]]);
        let (values, vectors) = modes.permuted(0, &[2, 0, 1]);
        assert_eq!(values, vec![30.0, 10.0, 20.0]);
        assert_eq!(vectors[0][0][0].re, 3.0);
    }
}

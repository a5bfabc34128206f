//! # 能带连接
//!
//! 通过相邻 q 点本征矢的重叠，为每个 q 点重新排列模式，使同一下标的能带
//! 在整条路径上对应同一支声子。
//!
//! ## 算法概述
//! 1. 第一个 q 点的顺序为恒等排列
//! 2. 对之后的每个 q 点 k，计算重叠矩阵 M[i][j] = |⟨前一 q 点原始第 i 个本征矢 | 当前原始第 j 个本征矢⟩|
//! 3. 按行下标从大到小处理；每行在尚未被占用的列中选重叠最大者
//!    （列从大到小扫描，严格大于才替换，所以相等时取下标最大的列）
//! 4. 将本步映射与累计顺序复合，得到 q 点 k 的新顺序
//!
//! 贪心、单遍、不回溯，结果可复现但不保证全局最优。
//!
//! ## 依赖关系
//! - 被 `phonon/builder.rs` 调用
//! - 使用 `models/modes.rs`

use crate::models::modes::{inner_product, Eigenvector};
use crate::models::ModeSet;

/// 按能带连接重排全部 q 点的模式，返回新的 ModeSet
pub fn connect_bands(modes: &ModeSet) -> ModeSet {
    let orders = band_orders(modes);

    let mut eigenvalues = Vec::with_capacity(orders.len());
    let mut eigenvectors = Vec::with_capacity(orders.len());
    for (k, order) in orders.iter().enumerate() {
        let (values, vectors) = modes.permuted(k, order);
        eigenvalues.push(values);
        eigenvectors.push(vectors);
    }

    ModeSet::new(eigenvalues, eigenvectors)
}

/// 每个 q 点的模式顺序：`orders[k][n]` 是 q 点 k 重排后第 n 支所取的原始模式下标
pub fn band_orders(modes: &ModeSet) -> Vec<Vec<usize>> {
    let nq = modes.nqpoints();
    let mut orders = Vec::with_capacity(nq);
    if nq == 0 {
        return orders;
    }

    let mut order: Vec<usize> = (0..modes.nphonons()).collect();
    orders.push(order.clone());
    for k in 1..nq {
        order = estimate_connection(&modes.eigenvectors[k - 1], &modes.eigenvectors[k], &order);
        orders.push(order.clone());
    }
    orders
}

/// 单步连接：返回复合后的新顺序
pub fn estimate_connection(
    previous: &[Eigenvector],
    current: &[Eigenvector],
    previous_order: &[usize],
) -> Vec<usize> {
    let connection = greedy_match(&overlap_matrix(previous, current));
    previous_order.iter().map(|&i| connection[i]).collect()
}

/// |⟨previous[i] | current[j]⟩|
fn overlap_matrix(previous: &[Eigenvector], current: &[Eigenvector]) -> Vec<Vec<f64>> {
    previous
        .iter()
        .map(|a| current.iter().map(|b| inner_product(a, b).norm()).collect())
        .collect()
}

/// 贪心匹配：`connection[row]` 为该行选中的列
fn greedy_match(metric: &[Vec<f64>]) -> Vec<usize> {
    let n = metric.len();
    let mut connection = vec![0; n];
    let mut claimed = vec![false; n];

    for row in (0..n).rev() {
        let mut best: Option<(usize, f64)> = None;
        for col in (0..n).rev().filter(|&c| !claimed[c]) {
            let val = metric[row][col];
            match best {
                Some((_, max)) if val <= max => {}
                _ => best = Some((col, val)),
            }
        }
        // 行数等于列数，总有空闲列
        if let Some((col, _)) = best {
            connection[row] = col;
            claimed[col] = true;
        }
    }

    connection
}

//! # 高对称点检测
//!
//! 两种互斥策略：
//! - 几何模式：路径上不与前后 q 点共线的点视为高对称点，首末点总是包含；
//!   可按位置依次套用用户给出的标签
//! - 路径查找模式：与标准高对称点坐标逐一比较（距离 < 1e-5），
//!   相邻且标签不同的两个匹配合并为 "A|B"，并压缩其后的路径距离
//!
//! 共线判断只使用约化坐标的前两个分量（假定路径位于平面内）。
//!
//! ## 依赖关系
//! - 被 `phonon/builder.rs` 调用
//! - 使用 `phonon/symmetry_path.rs`, `models/dataset.rs`

use super::symmetry_path::{SymmetryPath, SymmetryPathProvider};
use crate::error::{PhononError, Result};
use crate::models::dataset::{HighSymmetryPoint, LABEL_SEPARATOR};
use crate::models::lattice::{norm, sub};
use crate::models::Crystal;

/// 共线判断的行列式容差
pub const COLLINEAR_TOL: f64 = 1.0e-5;

/// 与标准点匹配的距离容差
pub const MATCH_TOL: f64 = 1.0e-5;

/// 高对称点检测策略
pub enum LabelStrategy {
    /// 几何共线判断，可附带标签
    Geometric { labels: Option<Vec<String>> },
    /// 与外部高对称路径比较
    PathLookup(Box<dyn SymmetryPathProvider>),
}

impl LabelStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            LabelStrategy::Geometric { .. } => "geometric",
            LabelStrategy::PathLookup(_) => "path-lookup",
        }
    }
}

/// 一次标签合并的记录
#[derive(Debug, Clone, PartialEq)]
pub struct LabelMerge {
    /// 合并后的标签
    pub label: String,
    /// 较小的 q 点下标（合并点所在位置）
    pub first: usize,
    /// 被吸收的 q 点下标
    pub second: usize,
    /// 合并前两点间的路径距离
    pub gap: f64,
}

/// 检测结果
#[derive(Debug, Clone)]
pub struct HighSymmetryResult {
    pub points: Vec<HighSymmetryPoint>,
    /// 可能经过合并压缩的路径距离
    pub distances: Vec<f64>,
    pub merges: Vec<LabelMerge>,
    /// 路径查找模式下的原始路径数据
    pub seekpath_data: Option<serde_json::Value>,
}

/// 按策略检测高对称点（组装时只调用一次）
pub fn detect(
    strategy: &LabelStrategy,
    crystal: &Crystal,
    qpoints: &[[f64; 3]],
    distances: &[f64],
) -> Result<HighSymmetryResult> {
    match strategy {
        LabelStrategy::Geometric { labels } => Ok(HighSymmetryResult {
            points: detect_geometric(qpoints, labels.as_deref())?,
            distances: distances.to_vec(),
            merges: Vec::new(),
            seekpath_data: None,
        }),
        LabelStrategy::PathLookup(provider) => {
            let path = provider.get_path(crystal)?;
            let (points, distances, merges) = detect_from_path(qpoints, distances, &path);
            Ok(HighSymmetryResult {
                points,
                distances,
                merges,
                seekpath_data: Some(path.raw),
            })
        }
    }
}

/// 三点 (只取前两个分量) 是否共线
pub fn is_collinear(a: &[f64; 3], b: &[f64; 3], c: &[f64; 3]) -> bool {
    // det [[a0, a1, 1], [b0, b1, 1], [c0, c1, 1]]
    let det = a[0] * (b[1] - c[1]) - a[1] * (b[0] - c[0]) + (b[0] * c[1] - b[1] * c[0]);
    det.abs() <= COLLINEAR_TOL
}

/// 几何模式
///
/// 空标签列表与未提供标签等价。
pub fn detect_geometric(
    qpoints: &[[f64; 3]],
    labels: Option<&[String]>,
) -> Result<Vec<HighSymmetryPoint>> {
    let nq = qpoints.len();
    if nq == 0 {
        return Ok(Vec::new());
    }

    let mut indices = vec![0];
    for k in 1..nq.saturating_sub(1) {
        if !is_collinear(&qpoints[k - 1], &qpoints[k], &qpoints[k + 1]) {
            indices.push(k);
        }
    }
    if nq > 1 {
        indices.push(nq - 1);
    }

    match labels.filter(|l| !l.is_empty()) {
        Some(labels) if labels.len() != indices.len() => Err(PhononError::LabelCountMismatch {
            detected: indices.len(),
            supplied: labels.len(),
        }),
        Some(labels) => Ok(indices
            .into_iter()
            .zip(labels)
            .map(|(k, l)| HighSymmetryPoint::new(k, l.clone()))
            .collect()),
        None => Ok(indices.into_iter().map(HighSymmetryPoint::unlabeled).collect()),
    }
}

/// 标准化标签：GAMMA 写作 G
pub fn normalize_label(label: &str) -> String {
    label.replace("GAMMA", "G")
}

/// 逐个 q 点查找匹配的标准点，按输入顺序返回
pub fn match_path_points(qpoints: &[[f64; 3]], path: &SymmetryPath) -> Vec<HighSymmetryPoint> {
    qpoints
        .iter()
        .enumerate()
        .filter_map(|(k, q)| {
            path.points
                .iter()
                .find(|(_, coord)| norm(&sub(coord, q)) < MATCH_TOL)
                .map(|(label, _)| HighSymmetryPoint::new(k, normalize_label(label)))
        })
        .collect()
}

/// 合并相邻且标签不同的匹配点
pub fn merge_adjacent(
    matches: &[HighSymmetryPoint],
    distances: &[f64],
) -> (Vec<HighSymmetryPoint>, Vec<LabelMerge>) {
    let mut merged = Vec::with_capacity(matches.len());
    let mut merges = Vec::new();

    let mut i = 0;
    while i < matches.len() {
        if let Some(next) = matches.get(i + 1) {
            let current = &matches[i];
            if next.index == current.index + 1 && next.label != current.label {
                let label = format!("{}{}{}", current.label, LABEL_SEPARATOR, next.label);
                let gap = match (distances.get(current.index), distances.get(next.index)) {
                    (Some(a), Some(b)) => b - a,
                    _ => 0.0,
                };
                merges.push(LabelMerge {
                    label: label.clone(),
                    first: current.index,
                    second: next.index,
                    gap,
                });
                merged.push(HighSymmetryPoint::new(current.index, label));
                i += 2;
                continue;
            }
        }
        merged.push(matches[i].clone());
        i += 1;
    }

    (merged, merges)
}

/// 每次合并把第二个点及其之后的距离减去合并前的间隔
pub fn adjust_distances(distances: &[f64], merges: &[LabelMerge]) -> Vec<f64> {
    let mut adjusted = distances.to_vec();
    for merge in merges {
        for d in adjusted.iter_mut().skip(merge.second) {
            *d -= merge.gap;
        }
    }
    adjusted
}

/// 路径查找模式
///
/// 首末 q 点若既未匹配也未被合并吸收，则补一个无标签的点。
pub fn detect_from_path(
    qpoints: &[[f64; 3]],
    distances: &[f64],
    path: &SymmetryPath,
) -> (Vec<HighSymmetryPoint>, Vec<f64>, Vec<LabelMerge>) {
    let matches = match_path_points(qpoints, path);
    let (mut points, merges) = merge_adjacent(&matches, distances);
    let adjusted = adjust_distances(distances, &merges);

    let nq = qpoints.len();
    if nq > 0 {
        if points.first().map_or(true, |p| p.index != 0) {
            points.insert(0, HighSymmetryPoint::unlabeled(0));
        }
        let last = nq - 1;
        let covered = points.last().map_or(false, |p| {
            p.index == last || merges.iter().any(|m| m.second == last)
        });
        if !covered {
            points.push(HighSymmetryPoint::unlabeled(last));
        }
    }

    (points, adjusted, merges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn line_path() -> Vec<[f64; 3]> {
        // G -> X 直线，再转向 M
        vec![
            [0.0, 0.0, 0.0],
            [0.25, 0.0, 0.0],
            [0.5, 0.0, 0.0],
            [0.5, 0.25, 0.0],
            [0.5, 0.5, 0.0],
        ]
    }

    fn square_path() -> SymmetryPath {
        SymmetryPath::from_seekpath_value(json!({
            "point_coords": {"GAMMA": [0.0, 0.0, 0.0], "X": [0.5, 0.0, 0.0], "M": [0.5, 0.5, 0.0], "Y": [0.0, 0.5, 0.0]}
        }))
        .unwrap()
    }

    #[test]
    fn test_collinear() {
        assert!(is_collinear(&[0.0; 3], &[0.1, 0.1, 0.0], &[0.2, 0.2, 0.7]));
        assert!(!is_collinear(&[0.0; 3], &[0.1, 0.0, 0.0], &[0.1, 0.1, 0.0]));
    }

    #[test]
    fn test_geometric_detection() {
        let points = detect_geometric(&line_path(), None).unwrap();
        let idx: Vec<usize> = points.iter().map(|p| p.index).collect();
        assert_eq!(idx, vec![0, 2, 4]);
        assert!(points.iter().all(|p| p.label.is_empty()));
    }

    #[test]
    fn test_geometric_labels() {
        let l = labels(&["G", "X", "M"]);
        let points = detect_geometric(&line_path(), Some(l.as_slice())).unwrap();
        assert_eq!(points[1], HighSymmetryPoint::new(2, "X"));
    }

    #[test]
    fn test_geometric_empty_labels_mean_none() {
        let empty: Vec<String> = Vec::new();
        let points = detect_geometric(&line_path(), Some(empty.as_slice())).unwrap();
        assert_eq!(points.len(), 3);
    }

    #[test]
    fn test_geometric_label_count_mismatch() {
        let l = labels(&["G", "X"]);
        let err = detect_geometric(&line_path(), Some(l.as_slice())).unwrap_err();
        assert!(matches!(
            err,
            PhononError::LabelCountMismatch {
                detected: 3,
                supplied: 2
            }
        ));
    }

    #[test]
    fn test_geometric_single_qpoint() {
        let points = detect_geometric(&[[0.0; 3]], None).unwrap();
        assert_eq!(points, vec![HighSymmetryPoint::unlabeled(0)]);
    }

    #[test]
    fn test_path_lookup_matches() {
        let qpoints = line_path();
        let distances = vec![0.0, 1.0, 2.0, 3.0, 4.0];
        let (points, adjusted, merges) = detect_from_path(&qpoints, &distances, &square_path());
        assert_eq!(
            points,
            vec![
                HighSymmetryPoint::new(0, "G"),
                HighSymmetryPoint::new(2, "X"),
                HighSymmetryPoint::new(4, "M"),
            ]
        );
        assert_eq!(adjusted, distances);
        assert!(merges.is_empty());
    }

    #[test]
    fn test_path_lookup_merges_discontinuity() {
        // G -> X | Y -> G：X 与 Y 相邻
        let qpoints = vec![
            [0.0, 0.0, 0.0],
            [0.25, 0.0, 0.0],
            [0.5, 0.0, 0.0],
            [0.0, 0.5, 0.0],
            [0.0, 0.25, 0.0],
            [0.0, 0.0, 0.0],
        ];
        let distances = vec![0.0, 0.25, 0.5, 1.2, 1.45, 1.7];
        let (points, adjusted, merges) = detect_from_path(&qpoints, &distances, &square_path());

        assert_eq!(
            points,
            vec![
                HighSymmetryPoint::new(0, "G"),
                HighSymmetryPoint::new(2, "X|Y"),
                HighSymmetryPoint::new(5, "G"),
            ]
        );
        assert_eq!(merges.len(), 1);
        assert!((merges[0].gap - 0.7).abs() < 1e-12);

        let expected = [0.0, 0.25, 0.5, 0.5, 0.75, 1.0];
        for (a, b) in adjusted.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_same_labels_are_not_merged() {
        let matches = vec![HighSymmetryPoint::new(3, "G"), HighSymmetryPoint::new(4, "G")];
        let (merged, merges) = merge_adjacent(&matches, &[0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(merged.len(), 2);
        assert!(merges.is_empty());
    }

    #[test]
    fn test_unmatched_endpoints_are_added() {
        let qpoints = vec![[0.1, 0.0, 0.0], [0.5, 0.0, 0.0], [0.3, 0.3, 0.0]];
        let (points, _, _) = detect_from_path(&qpoints, &[0.0, 0.4, 0.8], &square_path());
        assert_eq!(
            points,
            vec![
                HighSymmetryPoint::unlabeled(0),
                HighSymmetryPoint::new(1, "X"),
                HighSymmetryPoint::unlabeled(2),
            ]
        );
    }

    #[test]
    fn test_last_point_absorbed_by_merge() {
        let qpoints = vec![[0.0, 0.0, 0.0], [0.25, 0.0, 0.0], [0.5, 0.0, 0.0], [0.0, 0.5, 0.0]];
        let (points, _, merges) = detect_from_path(&qpoints, &[0.0, 0.25, 0.5, 1.2], &square_path());
        assert_eq!(merges.len(), 1);
        assert_eq!(points.last().unwrap(), &HighSymmetryPoint::new(2, "X|Y"));
        assert_eq!(points.len(), 2);
    }
}

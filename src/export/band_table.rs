//! # 能带表导出
//!
//! 每个 q 点一行：下标、路径距离、约化坐标、高对称点标签，以及各支频率 (cm⁻¹)。
//!
//! ## 依赖关系
//! - 被 `commands/convert.rs` 调用
//! - 使用 `models/dataset.rs`
//! - 使用 `csv` 库写入 CSV 文件

use crate::error::{PhononError, Result};
use crate::models::PhononDataset;
use std::io::Write;
use std::path::Path;

/// 表头
pub fn header(nphonons: usize) -> Vec<String> {
    let mut columns: Vec<String> = ["index", "distance", "qx", "qy", "qz", "label"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    columns.extend((1..=nphonons).map(|n| format!("band_{}", n)));
    columns
}

/// 写入任意 writer
pub fn write_bands<W: Write>(dataset: &PhononDataset, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(header(dataset.nphonons()))?;

    for (k, q) in dataset.qpoints().iter().enumerate() {
        let mut record = vec![
            k.to_string(),
            format!("{:.6}", dataset.distances()[k]),
            format!("{:.6}", q[0]),
            format!("{:.6}", q[1]),
            format!("{:.6}", q[2]),
            dataset.label_at(k).unwrap_or_default().to_string(),
        ];
        record.extend(dataset.eigenvalues()[k].iter().map(|f| format!("{:.4}", f)));
        wtr.write_record(&record)?;
    }

    wtr.flush().map_err(|e| PhononError::Other(format!("CSV flush failed: {}", e)))?;
    Ok(())
}

/// 导出能带表为 CSV 文件
pub fn to_csv(dataset: &PhononDataset, output_path: &Path) -> Result<()> {
    let file = std::fs::File::create(output_path).map_err(|e| PhononError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })?;
    write_bands(dataset, file)
}

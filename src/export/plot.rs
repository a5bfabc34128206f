//! # 色散曲线预览图
//!
//! 使用 `plotters` 库绘制声子色散曲线：横轴为路径距离，纵轴为频率 (cm⁻¹)，
//! 高对称点处画竖线并标注标签。
//!
//! ## 功能
//! - 支持 PNG 和 SVG 输出（按扩展名选择）
//! - 合并标签 "X|Y" 原样显示
//!
//! ## 依赖关系
//! - 被 `commands/convert.rs` 调用
//! - 使用 `models/dataset.rs`
//! - 使用 `plotters` 渲染图表

use crate::error::{PhononError, Result};
use crate::models::PhononDataset;

use plotters::prelude::*;
use std::path::Path;

pub const DEFAULT_WIDTH: u32 = 1200;
pub const DEFAULT_HEIGHT: u32 = 800;

/// 生成色散曲线图，扩展名为 .svg 时输出 SVG，否则 PNG
pub fn generate_dispersion_plot(
    dataset: &PhononDataset,
    output_path: &Path,
    width: u32,
    height: u32,
) -> Result<()> {
    let use_svg = output_path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"));

    if use_svg {
        let root = SVGBackend::new(output_path, (width, height)).into_drawing_area();
        draw_dispersion_chart(&root, dataset)?;
        root.present()
            .map_err(|e| PhononError::PlotError(e.to_string()))?;
    } else {
        let root = BitMapBackend::new(output_path, (width, height)).into_drawing_area();
        draw_dispersion_chart(&root, dataset)?;
        root.present()
            .map_err(|e| PhononError::PlotError(e.to_string()))?;
    }
    Ok(())
}

/// 频率范围，上下各留 5% 空白
fn frequency_range(dataset: &PhononDataset) -> (f64, f64) {
    let (min, max) = dataset
        .eigenvalues()
        .iter()
        .flatten()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &f| (lo.min(f), hi.max(f)));
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let pad = ((max - min) * 0.05).max(1.0);
    (min.min(0.0) - pad, max + pad)
}

/// 绘制色散曲线的核心逻辑
fn draw_dispersion_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    dataset: &PhononDataset,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)
        .map_err(|e| PhononError::PlotError(format!("{:?}", e)))?;

    let distances = dataset.distances();
    let x_max = distances.last().copied().filter(|d| *d > 0.0).unwrap_or(1.0);
    let (y_min, y_max) = frequency_range(dataset);

    let mut chart = ChartBuilder::on(root)
        .caption(
            format!("{} phonon dispersion", dataset.formula()),
            ("sans-serif", 28).into_font(),
        )
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(0.0..x_max, y_min..y_max)
        .map_err(|e| PhononError::PlotError(format!("{:?}", e)))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_x_axis()
        .y_desc("Frequency (cm⁻¹)")
        .y_label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()
        .map_err(|e| PhononError::PlotError(format!("{:?}", e)))?;

    // 高对称点竖线与标签
    let label_style = ("sans-serif", 16).into_font().color(&BLACK);
    for point in dataset.highsym_qpts() {
        let Some(&x) = distances.get(point.index) else {
            continue;
        };
        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(x, y_min), (x, y_max)],
                BLACK.mix(0.4).stroke_width(1),
            )))
            .map_err(|e| PhononError::PlotError(format!("{:?}", e)))?;
        if !point.label.is_empty() {
            chart
                .draw_series(std::iter::once(Text::new(
                    point.label.clone(),
                    (x, y_min),
                    label_style.clone(),
                )))
                .map_err(|e| PhononError::PlotError(format!("{:?}", e)))?;
        }
    }

    // 每支能带一条曲线
    let line_color = RGBColor(0, 102, 204);
    for band in 0..dataset.nphonons() {
        chart
            .draw_series(LineSeries::new(
                distances
                    .iter()
                    .zip(dataset.eigenvalues())
                    .map(|(&d, values)| (d, values[band])),
                line_color.stroke_width(2),
            ))
            .map_err(|e| PhononError::PlotError(format!("{:?}", e)))?;
    }

    Ok(())
}

//! # convert 命令实现
//!
//! 把一个 QE 声子计算目录转换为网页 JSON。
//!
//! ## 功能
//! - 读取 scf.in / scf.out / matdyn.modes 并组装数据集
//! - 报告标签合并与高对称点表
//! - 写出 JSON，可选写出能带 CSV 和色散预览图
//!
//! ## 依赖关系
//! - 使用 `cli/convert.rs` 定义的参数
//! - 使用 `phonon/`, `export/`
//! - 使用 `utils/output.rs`, `utils/progress.rs`

use crate::cli::convert::{ConvertArgs, LabelMode};
use crate::error::Result;
use crate::export::{band_table, plot, write_json, JsonOptions};
use crate::models::PhononDataset;
use crate::phonon::{
    BuiltinPathTable, InputFiles, LabelMerge, LabelStrategy, PhononBuilder, SeekpathJsonFile,
};
use crate::utils::{output, progress};

use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};

/// 目录中默认查找的 seekpath 文件名
pub const SEEKPATH_FILE: &str = "seekpath.json";

/// 执行 convert 命令
pub fn execute(args: ConvertArgs) -> Result<()> {
    let builder = PhononBuilder::new(&args.folder)
        .files(InputFiles {
            scf_in: args.scf_in.clone(),
            scf_out: args.scf_out.clone(),
            modes: args.modes.clone(),
        })
        .structure_format(args.structure_format.clone())
        .name(args.name.clone())
        .repetitions(args.reps)
        .reorder(!args.no_reorder);

    output::print_header(&format!("Converting '{}'", builder.dataset_name()));
    builder.check_inputs()?;

    if args.mode == LabelMode::PathLookup && args.labels.is_some() {
        output::print_warning("--labels only applies to geometric mode. Ignoring --labels.");
    }

    let strategy = label_strategy(
        args.mode,
        args.labels.clone(),
        args.path_file.as_deref(),
        &args.folder,
    );
    if let LabelStrategy::PathLookup(provider) = &strategy {
        output::print_info(&format!("Using {}", provider.name()));
        if let Some(caveat) = provider.caveat() {
            output::print_warning(caveat);
        }
    }

    let spinner = progress::create_spinner("Reading phonon data...");
    let built = builder.build(&strategy);
    spinner.finish_and_clear();
    let report = built?;
    let dataset = &report.dataset;

    output::print_info(&format!(
        "{}: {} atoms, {} q-points, {} phonon branches",
        dataset.formula(),
        dataset.structure().natoms(),
        dataset.nqpoints(),
        dataset.nphonons()
    ));
    if report.reordered {
        output::print_success(&format!(
            "Connected {} bands across {} q-points",
            dataset.nphonons(),
            dataset.nqpoints()
        ));
    }

    for merge in &report.merges {
        output::print_warning(&merge_message(merge));
    }

    print_highsym_table(dataset);

    let json_path = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&args.folder, dataset.name()));
    let options = JsonOptions {
        normalize: !args.no_normalize,
        round: args.round,
    };
    write_json(dataset, &json_path, options)?;
    output::print_saved("JSON", &json_path);

    if let Some(csv_path) = &args.csv {
        band_table::to_csv(dataset, csv_path)?;
        output::print_saved("band table", csv_path);
    }

    if let Some(plot_path) = &args.plot {
        plot::generate_dispersion_plot(
            dataset,
            plot_path,
            plot::DEFAULT_WIDTH,
            plot::DEFAULT_HEIGHT,
        )?;
        output::print_saved("dispersion plot", plot_path);
    }

    output::print_done(&format!(
        "Converted '{}' with {} labels",
        dataset.name(),
        report.strategy
    ));

    Ok(())
}

/// 根据命令行选项构造标注策略
///
/// 路径查找模式下依次尝试：显式给出的路径文件、目录中的 `seekpath.json`、内置晶系表。
pub fn label_strategy(
    mode: LabelMode,
    labels: Option<Vec<String>>,
    path_file: Option<&Path>,
    folder: &Path,
) -> LabelStrategy {
    match mode {
        LabelMode::Geometric => LabelStrategy::Geometric { labels },
        LabelMode::PathLookup => {
            let local = folder.join(SEEKPATH_FILE);
            match path_file {
                Some(path) => LabelStrategy::PathLookup(Box::new(SeekpathJsonFile::new(path))),
                None if local.is_file() => {
                    LabelStrategy::PathLookup(Box::new(SeekpathJsonFile::new(local)))
                }
                None => LabelStrategy::PathLookup(Box::new(BuiltinPathTable)),
            }
        }
    }
}

/// 默认输出路径：<folder>/<name>.json
pub fn default_output(folder: &Path, name: &str) -> PathBuf {
    folder.join(format!("{}.json", name))
}

fn merge_message(merge: &LabelMerge) -> String {
    format!(
        "Merged '{}' at positions {} and {}; shifting by {:.6}",
        merge.label, merge.first, merge.second, -merge.gap
    )
}

#[derive(Tabled)]
struct HighSymRow {
    #[tabled(rename = "Index")]
    index: usize,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Distance")]
    distance: String,
    #[tabled(rename = "q (reduced)")]
    qpoint: String,
}

fn print_highsym_table(dataset: &PhononDataset) {
    let rows: Vec<HighSymRow> = dataset
        .highsym_qpts()
        .iter()
        .map(|p| {
            let q = dataset.qpoints()[p.index];
            HighSymRow {
                index: p.index,
                label: if p.label.is_empty() {
                    "-".to_string()
                } else {
                    p.label.clone()
                },
                distance: format!("{:.5}", dataset.distances()[p.index]),
                qpoint: format!("({:.4}, {:.4}, {:.4})", q[0], q[1], q[2]),
            }
        })
        .collect();

    if rows.is_empty() {
        return;
    }
    output::print_header(&format!("{} High-Symmetry Points", rows.len()));
    println!("{}", Table::new(&rows));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_label_strategy_selection() {
        let folder = std::env::temp_dir().join(format!("phononweb-strategy-{}", std::process::id()));
        fs::create_dir_all(&folder).unwrap();
        fs::remove_file(folder.join(SEEKPATH_FILE)).ok();

        let geometric = label_strategy(LabelMode::Geometric, None, None, &folder);
        assert_eq!(geometric.name(), "geometric");

        let LabelStrategy::PathLookup(builtin) =
            label_strategy(LabelMode::PathLookup, None, None, &folder)
        else {
            panic!("expected path lookup");
        };
        assert_eq!(builtin.name(), "builtin path table");

        fs::write(folder.join(SEEKPATH_FILE), "{}").unwrap();
        let LabelStrategy::PathLookup(local) =
            label_strategy(LabelMode::PathLookup, None, None, &folder)
        else {
            panic!("expected path lookup");
        };
        assert!(local.name().starts_with("seekpath file"));

        fs::remove_dir_all(&folder).ok();
    }

    #[test]
    fn test_merge_message() {
        let merge = LabelMerge {
            label: "X|U".to_string(),
            first: 10,
            second: 11,
            gap: 0.25,
        };
        assert_eq!(
            merge_message(&merge),
            "Merged 'X|U' at positions 10 and 11; shifting by -0.250000"
        );
    }

    #[test]
    fn test_default_output() {
        assert_eq!(
            default_output(Path::new("runs/Si"), "Si"),
            PathBuf::from("runs/Si/Si.json")
        );
    }
}

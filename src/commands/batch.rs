//! # batch 命令实现
//!
//! 收集根目录下的计算目录并并行转换为 JSON。
//! 每个目录独立转换，一个目录失败不影响其他目录。
//!
//! ## 依赖关系
//! - 使用 `cli/batch.rs` 定义的参数
//! - 使用 `batch/` 收集与并行执行
//! - 使用 `commands/convert.rs` 的策略选择

use super::convert::{default_output, label_strategy};
use crate::batch::{BatchResult, BatchRunner, FolderCollector, ProcessResult};
use crate::cli::batch::BatchArgs;
use crate::cli::convert::LabelMode;
use crate::error::{PhononError, Result};
use crate::export::{write_json, JsonOptions};
use crate::phonon::PhononBuilder;
use crate::utils::output;

use std::path::Path;
use tabled::{Table, Tabled};

/// 执行 batch 命令
pub fn execute(args: BatchArgs) -> Result<()> {
    output::print_header(&format!("Batch conversion ({} labels)", args.mode));

    let folders = FolderCollector::new(&args.root)
        .recursive(args.recursive)
        .with_pattern(args.pattern.as_deref())?
        .collect()?;

    if folders.is_empty() {
        output::print_warning(&format!(
            "No folder with scf.in, scf.out and matdyn.modes under {}",
            args.root.display()
        ));
        return Ok(());
    }

    let runner = BatchRunner::new(args.jobs);
    output::print_info(&format!(
        "Found {} folders, using {} parallel jobs",
        folders.len(),
        runner.jobs()
    ));

    let options = JsonOptions {
        normalize: true,
        round: args.round,
    };
    let result = runner.run(folders, |folder| {
        convert_folder(folder, args.mode, args.reps, options, args.overwrite)
    })?;

    print_summary(&result);

    for (folder, err) in &result.failures {
        output::print_error(&format!("{}: {}", folder, err));
    }

    output::print_done(&format!(
        "Converted {} of {} folder(s) ({} skipped, {} failed)",
        result.success,
        result.total(),
        result.skipped,
        result.failed
    ));

    if result.failed > 0 {
        return Err(PhononError::Other(format!(
            "{} folder(s) failed to convert",
            result.failed
        )));
    }
    Ok(())
}

/// 转换单个目录，所有错误都折叠为 `ProcessResult::Failed`
fn convert_folder(
    folder: &Path,
    mode: LabelMode,
    reps: [usize; 3],
    options: JsonOptions,
    overwrite: bool,
) -> ProcessResult {
    let display = folder.display().to_string();
    let builder = PhononBuilder::new(folder).repetitions(reps);
    let json_path = default_output(folder, &builder.dataset_name());

    if json_path.exists() && !overwrite {
        return ProcessResult::Skipped(display);
    }

    let strategy = label_strategy(mode, None, None, folder);
    let converted = builder
        .build(&strategy)
        .and_then(|report| write_json(&report.dataset, &json_path, options));

    match converted {
        Ok(()) => ProcessResult::Success(display, json_path.display().to_string()),
        Err(e) => ProcessResult::Failed(display, e.to_string()),
    }
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Folder")]
    folder: String,
    #[tabled(rename = "Output")]
    output: String,
}

fn print_summary(result: &BatchResult) {
    if result.outputs.is_empty() {
        return;
    }
    let rows: Vec<SummaryRow> = result
        .outputs
        .iter()
        .map(|(folder, json)| SummaryRow {
            folder: folder.clone(),
            output: json.clone(),
        })
        .collect();

    output::print_header(&format!("{} Converted Folders", rows.len()));
    println!("{}", Table::new(&rows));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_convert_folder_skips_existing_output() {
        let folder = std::env::temp_dir().join(format!("phononweb-batch-skip-{}", std::process::id()));
        fs::create_dir_all(&folder).unwrap();
        let name = PhononBuilder::new(&folder).dataset_name();
        fs::write(default_output(&folder, &name), "{}").unwrap();

        let result = convert_folder(
            &folder,
            LabelMode::Geometric,
            [3, 3, 3],
            JsonOptions::default(),
            false,
        );
        assert!(matches!(result, ProcessResult::Skipped(_)));

        fs::remove_dir_all(&folder).ok();
    }

    #[test]
    fn test_convert_folder_reports_missing_inputs() {
        let folder = std::env::temp_dir().join(format!("phononweb-batch-missing-{}", std::process::id()));
        fs::create_dir_all(&folder).unwrap();

        let result = convert_folder(
            &folder,
            LabelMode::Geometric,
            [3, 3, 3],
            JsonOptions::default(),
            true,
        );
        match result {
            ProcessResult::Failed(_, err) => assert!(err.contains("Missing file")),
            other => panic!("unexpected result: {:?}", other),
        }

        fs::remove_dir_all(&folder).ok();
    }
}

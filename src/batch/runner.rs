//! # 批量执行器
//!
//! 并行转换多个数据目录。每个目录的转换彼此独立、不共享可变状态；
//! 某个目录失败不影响其他目录。
//!
//! ## 功能
//! - 基于 rayon 的并行迭代
//! - 进度条显示
//! - 错误收集与汇总报告
//!
//! ## 依赖关系
//! - 被 `commands/batch.rs` 调用
//! - 使用 `utils/progress.rs` 创建进度条
//! - 使用 `rayon` 进行并行计算

use crate::error::{PhononError, Result};
use crate::utils::progress;

use rayon::prelude::*;
use std::path::PathBuf;

/// 单个目录处理结果
#[derive(Debug, Clone)]
pub enum ProcessResult {
    /// 处理成功 (目录, 输出文件)
    Success(String, String),
    /// 跳过（如输出已存在）
    Skipped(String),
    /// 处理失败 (目录, 错误信息)
    Failed(String, String),
}

/// 批量处理结果统计
#[derive(Debug, Default)]
pub struct BatchResult {
    /// 成功数量
    pub success: usize,
    /// 跳过数量
    pub skipped: usize,
    /// 失败数量
    pub failed: usize,
    /// 成功的 (目录, 输出文件)
    pub outputs: Vec<(String, String)>,
    /// 失败详情
    pub failures: Vec<(String, String)>,
}

impl BatchResult {
    /// 合并处理结果
    pub fn merge(&mut self, result: ProcessResult) {
        match result {
            ProcessResult::Success(folder, output) => {
                self.success += 1;
                self.outputs.push((folder, output));
            }
            ProcessResult::Skipped(_) => self.skipped += 1,
            ProcessResult::Failed(folder, err) => {
                self.failed += 1;
                self.failures.push((folder, err));
            }
        }
    }

    /// 总处理数量
    pub fn total(&self) -> usize {
        self.success + self.skipped + self.failed
    }
}

/// 批量执行器
pub struct BatchRunner {
    /// 并行作业数
    jobs: usize,
}

impl BatchRunner {
    /// 创建新的批量执行器，0 表示使用全部 CPU
    pub fn new(jobs: usize) -> Self {
        let jobs = if jobs == 0 { num_cpus::get() } else { jobs };
        Self { jobs }
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// 并行处理目录列表，结果顺序与输入一致
    pub fn run<F>(&self, folders: Vec<PathBuf>, processor: F) -> Result<BatchResult>
    where
        F: Fn(&PathBuf) -> ProcessResult + Sync + Send,
    {
        let pb = progress::create_progress_bar(folders.len() as u64, "Converting");

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .map_err(|e| PhononError::Other(format!("Failed to build thread pool: {}", e)))?;

        let results: Vec<ProcessResult> = pool.install(|| {
            folders
                .par_iter()
                .map(|folder| {
                    let result = processor(folder);
                    pb.inc(1);
                    result
                })
                .collect()
        });

        pb.finish_and_clear();

        let mut batch_result = BatchResult::default();
        for result in results {
            batch_result.merge(result);
        }

        Ok(batch_result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_collects_all_outcomes() {
        let folders: Vec<PathBuf> = ["a", "b", "c"].iter().map(PathBuf::from).collect();
        let result = BatchRunner::new(2)
            .run(folders, |f| match f.to_str() {
                Some("a") => ProcessResult::Success("a".into(), "a/a.json".into()),
                Some("b") => ProcessResult::Skipped("b".into()),
                _ => ProcessResult::Failed("c".into(), "boom".into()),
            })
            .unwrap();

        assert_eq!(result.total(), 3);
        assert_eq!(result.success, 1);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.failures, vec![("c".to_string(), "boom".to_string())]);
    }

    #[test]
    fn test_zero_jobs_uses_all_cpus() {
        assert_eq!(BatchRunner::new(0).jobs(), num_cpus::get());
    }
}

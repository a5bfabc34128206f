//! # 数据目录收集器
//!
//! 在根目录下查找包含全部三个输入文件（scf.in、scf.out、matdyn.modes）的目录。
//!
//! ## 功能
//! - 根目录本身也可以是数据目录
//! - 可选递归搜索
//! - 按目录名做 glob 过滤
//!
//! ## 依赖关系
//! - 被 `commands/batch.rs` 调用
//! - 使用 `walkdir` 遍历目录，`glob` 匹配目录名

use crate::error::{PhononError, Result};
use crate::phonon::InputFiles;
use glob::Pattern;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 数据目录收集器
pub struct FolderCollector {
    /// 根目录
    root: PathBuf,
    /// 目录名模式
    pattern: Option<Pattern>,
    /// 是否递归
    recursive: bool,
    /// 需要存在的输入文件
    files: InputFiles,
}

impl FolderCollector {
    /// 创建新的收集器
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            pattern: None,
            recursive: false,
            files: InputFiles::default(),
        }
    }

    /// 设置目录名匹配模式
    pub fn with_pattern(mut self, pattern: Option<&str>) -> Result<Self> {
        self.pattern = match pattern.map(str::trim).filter(|p| !p.is_empty()) {
            Some(p) => Some(Pattern::new(p).map_err(|e| {
                PhononError::InvalidArgument(format!("Invalid glob pattern '{}': {}", p, e))
            })?),
            None => None,
        };
        Ok(self)
    }

    /// 设置是否递归搜索
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn files(mut self, files: InputFiles) -> Self {
        self.files = files;
        self
    }

    /// 收集所有数据目录（按路径排序）
    pub fn collect(&self) -> Result<Vec<PathBuf>> {
        if !self.root.is_dir() {
            return Err(PhononError::DirectoryNotFound {
                path: self.root.display().to_string(),
            });
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };

        let mut folders: Vec<PathBuf> = WalkDir::new(&self.root)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
            .map(|e| e.into_path())
            .filter(|p| self.matches_pattern(p) && self.files.present_in(p))
            .collect();
        folders.sort();

        Ok(folders)
    }

    /// 目录名是否匹配模式
    fn matches_pattern(&self, path: &Path) -> bool {
        let Some(pattern) = &self.pattern else {
            return true;
        };
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| pattern.matches(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn make_tree(tag: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("phononweb-collect-{}-{}", tag, std::process::id()));
        for (dir, complete) in [("Si", true), ("GaAs", true), ("nested/MgO", true), ("broken", false)] {
            let path = root.join(dir);
            fs::create_dir_all(&path).unwrap();
            fs::write(path.join("scf.in"), "").unwrap();
            fs::write(path.join("scf.out"), "").unwrap();
            if complete {
                fs::write(path.join("matdyn.modes"), "").unwrap();
            }
        }
        root
    }

    fn names(folders: &[PathBuf]) -> Vec<String> {
        folders
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_collect_flat() {
        let root = make_tree("flat");
        let folders = FolderCollector::new(&root).collect().unwrap();
        assert_eq!(names(&folders), vec!["GaAs", "Si"]);
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_collect_recursive_with_pattern() {
        let root = make_tree("recursive");
        let folders = FolderCollector::new(&root)
            .recursive(true)
            .with_pattern(Some("*O"))
            .unwrap()
            .collect()
            .unwrap();
        assert_eq!(names(&folders), vec!["MgO"]);
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_invalid_pattern() {
        let err = FolderCollector::new(".").with_pattern(Some("[")).err().unwrap();
        assert!(matches!(err, PhononError::InvalidArgument(_)));
    }

    #[test]
    fn test_missing_root() {
        let err = FolderCollector::new("/nonexistent/root").collect().unwrap_err();
        assert!(matches!(err, PhononError::DirectoryNotFound { .. }));
    }
}

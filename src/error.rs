//! # 统一错误处理模块
//!
//! 定义 phononweb 的所有错误类型，使用 `thiserror` 派生。
//! 任何错误都会中止整个转换流程，不产生部分输出。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// phononweb 统一错误类型
#[derive(Error, Debug)]
pub enum PhononError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("Missing file: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} file: {path}{}\nReason: {reason}", line_suffix(.line))]
    ParseError {
        format: String,
        path: String,
        line: Option<usize>,
        reason: String,
    },

    #[error("Unknown structure format: {0}")]
    UnknownFormat(String),

    // ─────────────────────────────────────────────────────────────
    // 校验错误
    // ─────────────────────────────────────────────────────────────
    #[error("Mismatch in {what}: expected {expected}, found {found}")]
    StructuralMismatch {
        what: String,
        expected: String,
        found: String,
    },

    #[error(
        "Wrong number of q-point labels: found {detected} high symmetry qpoints but {supplied} labels"
    )]
    LabelCountMismatch { detected: usize, supplied: usize },

    #[error("Degenerate lattice: determinant {determinant:e} is too close to zero")]
    DegenerateLattice { determinant: f64 },

    // ─────────────────────────────────────────────────────────────
    // 外部协作者错误
    // ─────────────────────────────────────────────────────────────
    #[error("High-symmetry path lookup failed: {0}")]
    PathLookup(String),

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ─────────────────────────────────────────────────────────────
    // 导出错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Plot error: {0}")]
    PlotError(String),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

fn line_suffix(line: &Option<usize>) -> String {
    match line {
        Some(n) => format!(" (line {})", n),
        None => String::new(),
    }
}

impl PhononError {
    /// 构造解析错误的便捷方法
    pub fn parse(
        format: impl Into<String>,
        path: impl Into<String>,
        line: Option<usize>,
        reason: impl Into<String>,
    ) -> Self {
        PhononError::ParseError {
            format: format.into(),
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }

    /// 构造校验失败错误
    pub fn mismatch(
        what: impl Into<String>,
        expected: impl ToString,
        found: impl ToString,
    ) -> Self {
        PhononError::StructuralMismatch {
            what: what.into(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, PhononError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_message_with_line() {
        let err = PhononError::parse("matdyn.modes", "Si/matdyn.modes", Some(12), "bad token");
        let msg = err.to_string();
        assert!(msg.contains("(line 12)"));
        assert!(msg.contains("bad token"));
    }

    #[test]
    fn test_label_count_message() {
        let err = PhononError::LabelCountMismatch {
            detected: 4,
            supplied: 3,
        };
        assert!(err.to_string().contains("4 high symmetry qpoints but 3 labels"));
    }
}

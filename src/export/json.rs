//! # JSON 导出
//!
//! 将数据集写为网页可视化端读取的紧凑 JSON。
//!
//! ## 体积压缩
//! - 归一化：|x| < 1e-8 写为 0，-0.0 写为 0，整数值的浮点数写为整数
//! - 舍入：可选，保留 N 位小数（在归一化之后进行，舍入结果再归一化一次）
//!
//! ## 依赖关系
//! - 被 `commands/convert.rs` 和 `commands/batch.rs` 调用
//! - 使用 `models/dataset.rs`
//! - 使用 `serde_json`

use crate::error::{PhononError, Result};
use crate::models::PhononDataset;
use serde_json::{Number, Value};
use std::fs;
use std::path::Path;

/// 归一化时视为 0 的阈值
pub const ZERO_EPS: f64 = 1.0e-8;

/// JSON 输出选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonOptions {
    /// 是否归一化数字
    pub normalize: bool,
    /// 小数位数
    pub round: Option<u32>,
}

impl Default for JsonOptions {
    fn default() -> Self {
        JsonOptions {
            normalize: true,
            round: None,
        }
    }
}

/// 递归归一化数字
pub fn normalize_numbers(value: Value) -> Value {
    map_floats(value, &|x| {
        if x.abs() < ZERO_EPS {
            // 同时覆盖 -0.0
            Value::from(0)
        } else if x.fract() == 0.0 && x.abs() < i64::MAX as f64 {
            Value::from(x as i64)
        } else {
            float_value(x)
        }
    })
}

/// 递归舍入浮点数，整数保持不变
pub fn round_numbers(value: Value, decimals: u32) -> Value {
    let factor = 10f64.powi(decimals as i32);
    map_floats(value, &|x| float_value((x * factor).round() / factor))
}

fn float_value(x: f64) -> Value {
    Number::from_f64(x).map_or(Value::Null, Value::Number)
}

fn map_floats(value: Value, f: &dyn Fn(f64) -> Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(|v| map_floats(v, f)).collect()),
        Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, map_floats(v, f))).collect()),
        Value::Number(n) if n.is_f64() => n.as_f64().map_or(Value::Number(n), f),
        other => other,
    }
}

/// 按选项压缩 JSON 值中的数字
pub fn reduce_numbers(mut value: Value, options: JsonOptions) -> Value {
    if options.normalize {
        value = normalize_numbers(value);
    }
    if let Some(decimals) = options.round {
        value = round_numbers(value, decimals);
        if options.normalize {
            // 舍入会重新产生 -0.0 和整数值的浮点数
            value = normalize_numbers(value);
        }
    }
    value
}

/// 生成经过压缩处理的 JSON 值
pub fn dataset_to_value(dataset: &PhononDataset, options: JsonOptions) -> Result<Value> {
    Ok(reduce_numbers(dataset.to_json_value()?, options))
}

/// 写出紧凑 JSON，先完整序列化再一次写入
pub fn write_json(dataset: &PhononDataset, path: &Path, options: JsonOptions) -> Result<()> {
    let text = serde_json::to_string(&dataset_to_value(dataset, options)?)?;
    fs::write(path, text).map_err(|e| PhononError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}

//! 字面量解析
//!
//! 数值、版本号、文件大小三种类型各有两套解析：
//! 编译期解析规则中的字面量，失败即报错；运行期解析记录中的值，失败按 0 处理。

use crate::error::{Result, RuleError};
use std::cmp::Ordering;
use std::fmt;

/// 编译期数值解析
pub fn parse_number(s: &str) -> Result<f64> {
    s.parse::<f64>()
        .map_err(|e| RuleError::invalid_literal("数值", s, e))
}

/// 运行期数值解析，无法解析时为 0
pub fn to_number(s: &str) -> f64 {
    s.parse().unwrap_or(0.0)
}

/// 点分整数版本号，如 `1.2.3`、`v2.0`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version(Vec<i64>);

impl Version {
    /// 严格解析：每一段都必须是整数
    pub fn parse(s: &str) -> Result<Self> {
        strip_version_prefix(s)
            .split('.')
            .map(|seg| {
                seg.parse::<i64>()
                    .map_err(|e| RuleError::invalid_literal("版本号", s, e))
            })
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    /// 宽松解析：无法解析的段视为 0
    pub fn parse_lenient(s: &str) -> Self {
        Self(
            strip_version_prefix(s)
                .split('.')
                .map(|seg| seg.parse().unwrap_or(0))
                .collect(),
        )
    }

    pub fn segments(&self) -> &[i64] {
        &self.0
    }
}

fn strip_version_prefix(s: &str) -> &str {
    s.strip_prefix(['v', 'V']).unwrap_or(s)
}

impl Ord for Version {
    /// 较短的一方按 0 补齐后逐段比较
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        (0..len)
            .map(|i| {
                let a = self.0.get(i).copied().unwrap_or(0);
                let b = other.0.get(i).copied().unwrap_or(0);
                a.cmp(&b)
            })
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// 比较两个版本号字符串
///
/// `1.2.3.0.0` 与 `1.2.3` 相等，`v9.100` 小于 `V9.1000`。
pub fn version_compare(v1: &str, v2: &str) -> Ordering {
    Version::parse_lenient(v1).cmp(&Version::parse_lenient(v2))
}

/// 字节数，支持 B/KB/MB/GB/TB 单位（不区分大小写，1024 进制）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FileSize(pub u64);

impl FileSize {
    const KB: f64 = 1024.0;

    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| c.is_ascii_alphabetic())
            .unwrap_or(trimmed.len());
        let (magnitude, unit) = trimmed.split_at(split);

        let multiplier = match unit.to_ascii_lowercase().as_str() {
            "" | "b" => 1.0,
            "kb" => Self::KB,
            "mb" => Self::KB.powi(2),
            "gb" => Self::KB.powi(3),
            "tb" => Self::KB.powi(4),
            other => {
                return Err(RuleError::invalid_literal(
                    "文件大小",
                    s,
                    format!("未知的单位 '{}'", other),
                ));
            }
        };

        let n = magnitude
            .trim()
            .parse::<f64>()
            .map_err(|e| RuleError::invalid_literal("文件大小", s, e))?;
        if !n.is_finite() || n < 0.0 {
            return Err(RuleError::invalid_literal("文件大小", s, "必须是非负数"));
        }

        Ok(Self((n * multiplier) as u64))
    }

    pub fn parse_lenient(s: &str) -> Self {
        Self::parse(s).unwrap_or_default()
    }

    pub fn bytes(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}B", self.0)
    }
}

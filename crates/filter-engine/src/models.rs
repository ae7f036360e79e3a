//! 规则配置模型
//!
//! 这里只描述配置文档的形状，语义校验和编译在 `RuleEngine` 中完成。
//!
//! ```yaml
//! matchAll:
//!   - match: [key, in, 12, xy]
//!   - matchAny:
//!       - match: [key, notIn, 34, xy]
//!       - match: [version, ">=", 1.2.0]
//! responseOnMatch:
//!   hit: "{{key}}"
//! ```

use crate::error::{Result, RuleError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

/// 响应文档：有序的 key → 值映射，值可以是标量、数组或嵌套文档
pub type Document = Map<String, Value>;

/// 被求值的扁平记录
pub trait Record {
    fn field(&self, key: &str) -> Option<&str>;
}

impl<S: BuildHasher> Record for HashMap<String, String, S> {
    fn field(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

impl Record for BTreeMap<String, String> {
    fn field(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

/// 表达式配置，文档形式为 `[key, operator, value1, value2, ...]`
///
/// 每个元素都按字符串读取。YAML 中未加引号的标量保留原文，`[v, ">", 1.10]` 得到 `"1.10"`；
/// JSON 中的元素必须是字符串。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ExpressionConfig {
    pub key: String,
    pub operator: String,
    pub values: Vec<String>,
}

impl ExpressionConfig {
    pub fn new(
        key: impl Into<String>,
        operator: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            key: key.into(),
            operator: operator.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// 从数组形式构造，数组长度至少为 2
    pub fn from_parts(parts: Vec<String>) -> Result<Self> {
        let mut parts = parts.into_iter();
        match (parts.next(), parts.next()) {
            (Some(key), Some(operator)) => Ok(Self {
                key,
                operator,
                values: parts.collect(),
            }),
            _ => Err(RuleError::InvalidConfig(
                "表达式数组长度必须大于 1, 格式: [key, operator, values...]".to_string(),
            )),
        }
    }

    pub fn into_parts(self) -> Vec<String> {
        let mut parts = Vec::with_capacity(self.values.len() + 2);
        parts.push(self.key);
        parts.push(self.operator);
        parts.extend(self.values);
        parts
    }
}

impl TryFrom<Vec<String>> for ExpressionConfig {
    type Error = RuleError;

    fn try_from(parts: Vec<String>) -> Result<Self> {
        Self::from_parts(parts)
    }
}

impl From<ExpressionConfig> for Vec<String> {
    fn from(config: ExpressionConfig) -> Self {
        config.into_parts()
    }
}

/// 过滤器配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterConfig {
    /// 规则描述，不影响判断结果
    #[serde(rename = "desc", default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// 合并响应时对深层的 map 也执行数据合并
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub merge_response_recursively: bool,

    /// 无论是否匹配都返回
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub response_always: Document,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub response_on_match: Document,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub response_on_not_match: Document,

    /// 最基础的表达式
    #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
    pub match_expr: Option<ExpressionConfig>,

    /// 只包含一个过滤器，不匹配才算通过
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_match: Option<Box<FilterConfig>>,

    /// 每个都匹配才算通过
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_all: Vec<FilterConfig>,

    /// 任意一个匹配即通过
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_any: Vec<FilterConfig>,
}

impl FilterConfig {
    /// 树的最大深度（只有自身时为 1）
    pub fn depth(&self) -> usize {
        let children = self
            .not_match
            .iter()
            .map(|f| &**f)
            .chain(&self.match_all)
            .chain(&self.match_any)
            .map(FilterConfig::depth)
            .max()
            .unwrap_or(0);
        children + 1
    }
}

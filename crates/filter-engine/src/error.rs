//! 规则引擎错误类型
//!
//! 所有错误都发生在编译期（构造表达式、解析配置）；求值期不返回错误。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("未知的操作符: {0}")]
    UnknownOperator(String),

    #[error("参数数量错误: 期望 {expected} 个, 实际 {actual} 个")]
    ArgsSize { expected: usize, actual: usize },

    #[error("无效的{kind}字面量 '{value}': {reason}")]
    InvalidLiteral {
        kind: &'static str,
        value: String,
        reason: String,
    },

    #[error("无效的正则表达式: {0}")]
    InvalidRegex(#[from] regex::Error),

    #[error("表达式的 key 不能为空")]
    EmptyKey,

    #[error("配置格式错误: {0}")]
    InvalidConfig(String),

    #[error("JSON 序列化错误: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML 解析错误: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl RuleError {
    pub(crate) fn invalid_literal(
        kind: &'static str,
        value: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::InvalidLiteral {
            kind,
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RuleError>;

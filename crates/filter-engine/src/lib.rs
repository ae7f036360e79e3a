//! 过滤规则引擎
//!
//! 用 YAML / JSON 声明的布尔过滤树对扁平字符串记录求值，支持：
//! - 可注册的匹配操作符（集合、数值、版本号、正则、字符串、文件大小）
//! - 按字面量类型自动选择比较方式的符号操作符（`==` `!=` `>` `>=` `<` `<=`）
//! - 匹配结果附带的响应文档，支持占位符和模板函数
//! - 短路求值与穷举求值两种遍历方式

pub mod config;
pub mod engine;
pub mod error;
pub mod expression;
pub mod filter;
pub mod function;
pub mod literal;
pub mod matcher;
pub mod merge;
pub mod models;
pub mod observability;

pub use config::EngineConfig;
pub use engine::RuleEngine;
pub use error::{Result, RuleError};
pub use expression::Expression;
pub use filter::Filter;
pub use function::{Function, FunctionRegistry};
pub use literal::{FileSize, Version, version_compare};
pub use matcher::{DataSource, Matcher, MatcherFactory, MatcherRegistry, not};
pub use models::{Document, ExpressionConfig, FilterConfig, Record};
pub use observability::ObservabilityConfig;

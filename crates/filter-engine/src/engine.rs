//! 规则引擎上下文
//!
//! 持有匹配器注册表和函数注册表，负责把配置文档编译为 `Expression` / `Filter`。
//! 每个引擎实例拥有独立的注册表，测试之间互不影响。

use crate::config::EngineConfig;
use crate::error::{Result, RuleError};
use crate::expression::Expression;
use crate::filter::Filter;
use crate::function::{Function, FunctionRegistry};
use crate::matcher::{MatcherFactory, MatcherRegistry};
use crate::models::{ExpressionConfig, FilterConfig};
use std::sync::Arc;
use tracing::{debug, instrument};

/// 默认的过滤器最大嵌套深度
pub const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Clone)]
pub struct RuleEngine {
    matchers: Arc<MatcherRegistry>,
    functions: Arc<FunctionRegistry>,
    max_depth: usize,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self {
            matchers: Arc::new(MatcherRegistry::with_builtins()),
            functions: Arc::new(FunctionRegistry::with_builtins()),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            ..Self::new()
        }
    }

    pub fn matchers(&self) -> &MatcherRegistry {
        &self.matchers
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// 注册操作符，名称不区分大小写，已存在时覆盖
    ///
    /// 已编译的表达式继续使用编译时的工厂。
    pub fn register_matcher(&self, name: &str, factory: impl MatcherFactory + 'static) {
        self.matchers.register(name, factory);
    }

    /// 注册响应模板函数，名称不区分大小写
    pub fn register_function(&self, name: &str, function: impl Function + 'static) {
        self.functions.register(name, function);
    }

    pub fn new_expression(
        &self,
        key: impl Into<String>,
        operator: impl Into<String>,
        values: Vec<String>,
    ) -> Result<Expression> {
        Expression::new(&self.matchers, key, operator, values)
    }

    pub fn compile_expression(&self, config: &ExpressionConfig) -> Result<Expression> {
        Expression::from_config(&self.matchers, config)
    }

    /// 编译过滤器树
    #[instrument(skip(self, config), fields(desc = %config.description))]
    pub fn compile_filter(&self, config: &FilterConfig) -> Result<Filter> {
        let depth = config.depth();
        if depth > self.max_depth {
            return Err(RuleError::InvalidConfig(format!(
                "过滤器嵌套深度 {} 超过上限 {}",
                depth, self.max_depth
            )));
        }

        let filter = self.compile_node(config)?;
        debug!(depth, "过滤器已编译");
        Ok(filter)
    }

    fn compile_node(&self, config: &FilterConfig) -> Result<Filter> {
        let match_expr = config
            .match_expr
            .as_ref()
            .map(|c| self.compile_expression(c))
            .transpose()?;

        let not_match = config
            .not_match
            .as_deref()
            .map(|c| self.compile_node(c).map(Box::new))
            .transpose()?;

        let match_all = config
            .match_all
            .iter()
            .map(|c| self.compile_node(c))
            .collect::<Result<Vec<_>>>()?;

        let match_any = config
            .match_any
            .iter()
            .map(|c| self.compile_node(c))
            .collect::<Result<Vec<_>>>()?;

        Ok(Filter {
            description: config.description.clone(),
            merge_response_recursively: config.merge_response_recursively,
            response_always: config.response_always.clone(),
            response_on_match: config.response_on_match.clone(),
            response_on_not_match: config.response_on_not_match.clone(),
            match_expr,
            not_match,
            match_all,
            match_any,
            functions: self.functions.clone(),
        })
    }

    /// 从 JSON 文档编译过滤器
    pub fn filter_from_json(&self, json: &str) -> Result<Filter> {
        let config: FilterConfig = serde_json::from_str(json)?;
        self.compile_filter(&config)
    }

    /// 从 YAML 文档编译过滤器
    pub fn filter_from_yaml(&self, yaml: &str) -> Result<Filter> {
        let config: FilterConfig = serde_yaml::from_str(yaml)?;
        self.compile_filter(&config)
    }

    /// 从 `[key, operator, values...]` 形式的 JSON 编译表达式
    pub fn expression_from_json(&self, json: &str) -> Result<Expression> {
        let config: ExpressionConfig = serde_json::from_str(json)?;
        self.compile_expression(&config)
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{DataSource, Matcher};
    use serde_json::{Value, json};
    use std::collections::HashMap;

    struct Always(bool);

    impl Matcher for Always {
        fn description(&self) -> String {
            format!("always {}", self.0)
        }

        fn is_match(&self, _: &str) -> bool {
            self.0
        }
    }

    #[test]
    fn test_unknown_operator_at_compile_time() {
        let engine = RuleEngine::new();
        let err = engine
            .filter_from_json(r#"{"matchAll": [{"match": ["k", "fuzzy", "x"]}]}"#)
            .err()
            .unwrap();
        assert!(matches!(err, RuleError::UnknownOperator(op) if op == "fuzzy"));
    }

    #[test]
    fn test_shape_errors() {
        let engine = RuleEngine::new();
        assert!(matches!(
            engine.filter_from_json(r#"{"match": ["k"]}"#),
            Err(RuleError::Json(_))
        ));
        assert!(matches!(
            engine.filter_from_yaml("matchAll: 3"),
            Err(RuleError::Yaml(_))
        ));
        assert!(matches!(
            engine.expression_from_json(r#"{"key": "k"}"#),
            Err(RuleError::Json(_))
        ));
        // JSON 数字无法保留原文
        assert!(matches!(
            engine.filter_from_json(r#"{"match": ["v", "versionGreaterThan", 1.10]}"#),
            Err(RuleError::Json(_))
        ));
    }

    #[test]
    fn test_json_literals_keep_source_text() {
        let engine = RuleEngine::new();
        let exp = engine
            .expression_from_json(r#"["v", "versionGreaterThan", "1.10"]"#)
            .unwrap();
        assert_eq!(exp.values(), &["1.10".to_string()]);
        let record: HashMap<String, String> = [("v".to_string(), "1.5".to_string())].into();
        assert!(!exp.matches(&record));
    }

    #[test]
    fn test_max_depth() {
        let config = EngineConfig {
            max_depth: 2,
            ..Default::default()
        };
        let engine = RuleEngine::with_config(&config);
        assert!(engine.filter_from_json(r#"{"matchAll": [{}]}"#).is_ok());
        assert!(matches!(
            engine.filter_from_json(r#"{"matchAll": [{"notMatch": {}}]}"#),
            Err(RuleError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_registries_are_isolated() {
        let a = RuleEngine::new();
        let b = RuleEngine::new();
        a.register_matcher("always", |args: &[String], _: &[DataSource]| -> Result<Box<dyn Matcher>> {
            Ok(Box::new(Always(args.is_empty())) as Box<dyn Matcher>)
        });

        assert!(a.new_expression("k", "ALWAYS", vec![]).is_ok());
        assert!(matches!(
            b.new_expression("k", "always", vec![]),
            Err(RuleError::UnknownOperator(_))
        ));
    }

    #[test]
    fn test_custom_function_in_response() {
        let engine = RuleEngine::new();
        engine.register_function("Len", |_: Option<&Value>, arg: Value| {
            json!(arg.as_str().map_or(0, str::len))
        });

        let filter = engine
            .filter_from_yaml(
                r#"
responseOnMatch:
  length: "len({{name}})"
"#,
            )
            .unwrap();
        let record: HashMap<String, String> =
            [("name".to_string(), "filter".to_string())].into();
        let (ok, resp) = filter.filter_with_response(&record);
        assert!(ok);
        assert_eq!(resp.get("length"), Some(&json!(6)));
    }

    #[test]
    fn test_compiled_expression_keeps_factory() {
        let engine = RuleEngine::new();
        let exp = engine
            .new_expression("k", "in", vec!["a".to_string()])
            .unwrap();

        engine.register_matcher("in", |_: &[String], _: &[DataSource]| -> Result<Box<dyn Matcher>> {
            Ok(Box::new(Always(false)) as Box<dyn Matcher>)
        });

        let record: HashMap<String, String> = [("k".to_string(), "a".to_string())].into();
        assert!(exp.matches(&record));
        let fresh = engine
            .new_expression("k", "in", vec!["a".to_string()])
            .unwrap();
        assert!(!fresh.matches(&record));
    }
}

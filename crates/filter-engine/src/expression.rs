//! 表达式
//!
//! 把记录中的一个 key、一个操作符和若干字面量绑定在一起，构造时编译一次匹配器，之后可反复求值。

use crate::error::{Result, RuleError};
use crate::matcher::{DataSource, Matcher, MatcherFactory, MatcherRegistry};
use crate::models::{ExpressionConfig, Record};
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

#[derive(Clone)]
pub struct Expression {
    key: String,
    operator: String,
    /// 声明时的原始字面量，修改操作都以它为准
    values: Vec<String>,
    factory: Arc<dyn MatcherFactory>,
    matcher: Arc<dyn Matcher>,
}

impl Expression {
    /// 编译表达式
    ///
    /// key 为空、操作符未注册、或工厂拒绝字面量时返回错误。
    pub fn new(
        registry: &MatcherRegistry,
        key: impl Into<String>,
        operator: impl Into<String>,
        values: Vec<String>,
    ) -> Result<Self> {
        let key = key.into();
        let operator = operator.into();
        if key.is_empty() {
            return Err(RuleError::EmptyKey);
        }

        let factory = registry
            .get(&operator)
            .ok_or_else(|| RuleError::UnknownOperator(operator.clone()))?;
        let matcher = factory.build(&values, &[])?;

        Ok(Self {
            key,
            operator,
            values,
            factory,
            matcher: Arc::from(matcher),
        })
    }

    pub fn from_config(registry: &MatcherRegistry, config: &ExpressionConfig) -> Result<Self> {
        Self::new(
            registry,
            config.key.clone(),
            config.operator.clone(),
            config.values.clone(),
        )
    }

    /// 取 `record[key]` 交给匹配器判断，key 不存在时按空字符串处理
    pub fn matches<R: Record + ?Sized>(&self, record: &R) -> bool {
        let src = record.field(&self.key).unwrap_or_default();
        let matched = self.matcher.is_match(src);
        trace!(key = %self.key, operator = %self.operator, matched, "表达式求值");
        matched
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// 当前匹配器的描述
    pub fn description(&self) -> String {
        self.matcher.description()
    }

    /// 用新参数重新编译匹配器，不修改声明的 values
    ///
    /// 每个原始值经 `modifier` 展开后拼接成新的参数列表，只有确实发生变化时才重新编译。
    pub fn modify_values<F>(&mut self, mut modifier: F) -> Result<()>
    where
        F: FnMut(&str) -> Vec<String>,
    {
        if self.values.is_empty() {
            return Ok(());
        }

        let mut new_values = Vec::with_capacity(self.values.len());
        let mut updated = false;
        for v in &self.values {
            let vs = modifier(v);
            if !updated && (vs.len() != 1 || vs[0] != *v) {
                updated = true;
            }
            new_values.extend(vs);
        }

        if !updated {
            return Ok(());
        }

        let matcher = self.factory.build(&new_values, &[])?;
        self.matcher = Arc::from(matcher);
        trace!(key = %self.key, values = ?new_values, "表达式参数已更新");
        Ok(())
    }

    /// 由外部提供数据来源，不修改声明的 values
    ///
    /// `modifier` 为某个值返回数据源时，该值从字面量中移除，改为作为动态数据源传给工厂。
    pub fn modify_data_source<F>(&mut self, mut modifier: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<DataSource>,
    {
        if self.values.is_empty() {
            return Ok(());
        }

        let mut sources = Vec::new();
        let mut literals = Vec::new();
        for v in &self.values {
            match modifier(v) {
                Some(source) => sources.push(source),
                None => literals.push(v.clone()),
            }
        }

        if sources.is_empty() {
            return Ok(());
        }

        let matcher = self.factory.build(&literals, &sources)?;
        self.matcher = Arc::from(matcher);
        trace!(key = %self.key, sources = sources.len(), "表达式数据源已更新");
        Ok(())
    }

    pub fn to_config(&self) -> ExpressionConfig {
        ExpressionConfig {
            key: self.key.clone(),
            operator: self.operator.clone(),
            values: self.values.clone(),
        }
    }
}

impl Serialize for Expression {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_config().serialize(serializer)
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expression")
            .field("key", &self.key)
            .field("operator", &self.operator)
            .field("values", &self.values)
            .field("matcher", &self.matcher.description())
            .finish()
    }
}

/// JSON 数组形式，如 `["key","in","1"]`
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    fn registry() -> MatcherRegistry {
        MatcherRegistry::with_builtins()
    }

    fn record(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_new_expression_errors() {
        let r = registry();
        assert!(matches!(
            Expression::new(&r, "", "in", vec![]),
            Err(RuleError::EmptyKey)
        ));
        assert!(matches!(
            Expression::new(&r, "k", "almostEqual", vec![]),
            Err(RuleError::UnknownOperator(op)) if op == "almostEqual"
        ));
        assert!(matches!(
            Expression::new(&r, "k", "lessThan", vec![]),
            Err(RuleError::ArgsSize { .. })
        ));
        assert!(matches!(
            Expression::new(&r, "k", "regexMatch", strings(&["[z-a]"])),
            Err(RuleError::InvalidRegex(_))
        ));
    }

    #[test]
    fn test_operator_is_case_insensitive() {
        let exp = Expression::new(&registry(), "k", "NotIN", strings(&["a"])).unwrap();
        assert_eq!(exp.operator(), "NotIN");
        assert!(exp.matches(&record(&[("k", "b")])));
        assert!(!exp.matches(&record(&[("k", "a")])));
    }

    #[test]
    fn test_missing_key_reads_as_empty() {
        let exp = Expression::new(&registry(), "k", "in", strings(&[""])).unwrap();
        assert!(exp.matches(&record(&[])));

        let exp = Expression::new(&registry(), "k", "hasPrefix", strings(&["x"])).unwrap();
        assert!(!exp.matches(&record(&[])));
    }

    #[test]
    fn test_intelligent_routes() {
        let r = registry();
        let exp = Expression::new(&r, "version", ">", strings(&["1.2.0"])).unwrap();
        assert!(exp.matches(&record(&[("version", "1.2.3.4")])));

        let exp = Expression::new(&r, "size", ">", strings(&["2047MB"])).unwrap();
        assert!(exp.matches(&record(&[("size", "2GB")])));

        let exp = Expression::new(&r, "s", ">", strings(&["Aa"])).unwrap();
        assert!(exp.matches(&record(&[("s", "Ab")])));
    }

    #[test]
    fn test_modify_values_splits_literal() {
        let mut exp = Expression::new(&registry(), "key", "in", strings(&["1|2|3"])).unwrap();
        let data = record(&[("key", "2")]);
        assert!(!exp.matches(&data));

        exp.modify_values(|v| v.split('|').map(String::from).collect())
            .unwrap();
        assert!(exp.matches(&data));
        // 声明的 values 不变
        assert_eq!(exp.values(), &["1|2|3".to_string()]);
        assert_eq!(exp.to_string(), r#"["key","in","1|2|3"]"#);
    }

    #[test]
    fn test_modify_values_noop_and_failure() {
        let mut exp = Expression::new(&registry(), "n", "lessThan", strings(&["10"])).unwrap();
        exp.modify_values(|v| vec![v.to_string()]).unwrap();
        assert!(exp.matches(&record(&[("n", "5")])));

        let err = exp.modify_values(|v| vec![v.to_string(), v.to_string()]);
        assert!(matches!(err, Err(RuleError::ArgsSize { expected: 1, actual: 2 })));
        // 失败时保留原匹配器
        assert!(exp.matches(&record(&[("n", "5")])));

        let mut empty = Expression::new(&registry(), "n", "in", vec![]).unwrap();
        empty
            .modify_values(|_| panic!("modifier must not run for empty values"))
            .unwrap();
    }

    #[test]
    fn test_modify_data_source() {
        let mut exp =
            Expression::new(&registry(), "uid", "in", strings(&["$whitelist", "42"])).unwrap();
        let whitelist: Arc<HashSet<String>> =
            Arc::new(["7".to_string(), "8".to_string()].into_iter().collect());

        exp.modify_data_source(|v| {
            let set = whitelist.clone();
            (v == "$whitelist").then(|| Arc::new(move |_: &str| Some(set.clone())) as DataSource)
        })
        .unwrap();

        assert!(exp.matches(&record(&[("uid", "7")])));
        assert!(exp.matches(&record(&[("uid", "42")])));
        assert!(!exp.matches(&record(&[("uid", "$whitelist")])));
        assert_eq!(exp.values().len(), 2);
    }

    #[test]
    fn test_modify_data_source_without_sources_is_noop() {
        let mut exp = Expression::new(&registry(), "uid", "in", strings(&["1"])).unwrap();
        exp.modify_data_source(|_| None).unwrap();
        assert!(exp.matches(&record(&[("uid", "1")])));
    }

    #[test]
    fn test_round_trip_through_config() {
        let r = registry();
        let probes = ["", "1", "1.2.3", "1.10", "9", "abc", "2GB"];
        for (op, args) in [
            ("in", vec!["1", "abc"]),
            (">=", vec!["1.2.3"]),
            ("<", vec!["5"]),
            ("regexMatch", vec![r"^\d+$"]),
            ("sizeGreaterThan", vec!["1GB"]),
        ] {
            let exp = Expression::new(&r, "k", op, strings(&args)).unwrap();
            let json = serde_json::to_string(&exp).unwrap();
            let config: ExpressionConfig = serde_json::from_str(&json).unwrap();
            let parsed = Expression::from_config(&r, &config).unwrap();
            for p in probes {
                let data = record(&[("k", p)]);
                assert_eq!(exp.matches(&data), parsed.matches(&data), "{} on {:?}", op, p);
            }
        }
    }
}

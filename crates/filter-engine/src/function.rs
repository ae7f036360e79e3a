//! 响应模板函数
//!
//! 响应文档中形如 `name(arg)` 的字符串会调用注册的函数：
//! 第一个参数是累积结果中该 key 的当前值，第二个参数是已替换占位符的 `arg`，
//! 返回值写回该 key。函数自行处理错误情况，不向外返回错误。

use dashmap::DashMap;
use serde_json::{Number, Value};
use std::sync::Arc;
use tracing::debug;

pub trait Function: Send + Sync {
    fn call(&self, old: Option<&Value>, arg: Value) -> Value;
}

impl<F> Function for F
where
    F: Fn(Option<&Value>, Value) -> Value + Send + Sync,
{
    fn call(&self, old: Option<&Value>, arg: Value) -> Value {
        self(old, arg)
    }
}

/// 函数注册表，名称不区分大小写
pub struct FunctionRegistry {
    functions: DashMap<String, Arc<dyn Function>>,
}

impl FunctionRegistry {
    pub fn empty() -> Self {
        Self {
            functions: DashMap::new(),
        }
    }

    /// 内置 append / toString / toNumber
    pub fn with_builtins() -> Self {
        let registry = Self::empty();
        registry.register("append", append);
        registry.register("toString", to_string);
        registry.register("toNumber", to_number);
        registry
    }

    pub fn register(&self, name: &str, function: impl Function + 'static) {
        self.functions
            .insert(name.to_lowercase(), Arc::new(function));
        debug!(function = %name, "注册函数");
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.functions
            .get(&name.to_lowercase())
            .map(|f| f.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// 字符串拼接或数组追加，其他情况直接返回参数
pub fn append(old: Option<&Value>, arg: Value) -> Value {
    match old {
        Some(Value::String(s)) => Value::String(format!("{}{}", s, display(&arg))),
        Some(Value::Array(items)) => {
            let mut items = items.clone();
            items.push(arg);
            Value::Array(items)
        }
        _ => arg,
    }
}

pub fn to_string(_: Option<&Value>, arg: Value) -> Value {
    Value::String(display(&arg))
}

/// 转为浮点数，无法转换时为 0，布尔值 true/false 为 1/0
pub fn to_number(_: Option<&Value>, arg: Value) -> Value {
    let n = match &arg {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::Bool(b) => bool_to_f64(*b),
        Value::String(s) => s
            .parse::<f64>()
            .unwrap_or_else(|_| bool_to_f64(s == "true")),
        _ => 0.0,
    };
    Number::from_f64(n).map_or(Value::from(0.0), Value::Number)
}

fn bool_to_f64(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

/// 字符串原样输出，其他值输出 JSON 形式
pub(crate) fn display(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_append() {
        assert_eq!(append(Some(&json!("AA")), json!("BB")), json!("AABB"));
        assert_eq!(append(Some(&json!("n=")), json!(1)), json!("n=1"));
        assert_eq!(
            append(Some(&json!(["hello"])), json!("world")),
            json!(["hello", "world"])
        );
        assert_eq!(append(Some(&json!(12)), json!("x")), json!("x"));
        assert_eq!(append(None, json!("x")), json!("x"));
    }

    #[test]
    fn test_to_string() {
        assert_eq!(to_string(None, json!("a")), json!("a"));
        assert_eq!(to_string(None, json!(1.5)), json!("1.5"));
        assert_eq!(to_string(None, json!(true)), json!("true"));
    }

    #[test]
    fn test_to_number() {
        assert_eq!(to_number(None, json!("10.000")), json!(10.0));
        assert_eq!(to_number(None, json!("abc")), json!(0.0));
        assert_eq!(to_number(None, json!(true)), json!(1.0));
        assert_eq!(to_number(None, json!("false")), json!(0.0));
        assert_eq!(to_number(None, json!("true")), json!(1.0));
        assert_eq!(to_number(None, json!(3)), json!(3.0));
        assert_eq!(to_number(None, json!(null)), json!(0.0));
    }

    #[test]
    fn test_registry_case_insensitive() {
        let registry = FunctionRegistry::with_builtins();
        assert!(registry.contains("TONUMBER"));
        assert!(registry.get("ToString").is_some());
        assert!(registry.get("missing").is_none());

        registry.register("Upper", |_: Option<&Value>, arg: Value| {
            Value::String(display(&arg).to_uppercase())
        });
        let upper = registry.get("upper").unwrap();
        assert_eq!(upper.call(None, json!("abc")), json!("ABC"));
        assert_eq!(registry.len(), 4);
    }
}

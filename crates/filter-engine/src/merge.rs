//! 响应文档合并
//!
//! 源文档中的字符串值支持三种写法：
//! - 常量，原样写入
//! - `{{field}}`，替换为记录中的字段值，字段不存在时为空字符串
//! - `name(arg)`，`arg` 先做占位符替换，再与目标中该 key 的当前值一起传给注册的函数
//!
//! 源值为 null 或空字符串时删除目标中的 key。
//! 递归模式下嵌套文档逐层合并并保留目标中已有的其他 key；
//! 非递归模式下嵌套文档整体替换，其中的函数看不到旧值。

use crate::function::{Function, FunctionRegistry};
use crate::models::{Document, Record};
use serde_json::Value;
use std::sync::Arc;

pub struct Merger<'a> {
    functions: &'a FunctionRegistry,
    record: &'a dyn Record,
    recursive: bool,
}

impl<'a> Merger<'a> {
    pub fn new(functions: &'a FunctionRegistry, record: &'a dyn Record, recursive: bool) -> Self {
        Self {
            functions,
            record,
            recursive,
        }
    }

    /// 把 `from` 合并进 `target`
    pub fn merge(&self, target: &mut Document, from: &Document) {
        for (k, v) in from {
            match v {
                Value::Null => {
                    target.remove(k);
                }
                Value::String(s) if s.is_empty() => {
                    target.remove(k);
                }
                Value::String(s) => {
                    let resolved = match self.find_function(s) {
                        Some((function, arg)) => {
                            function.call(target.get(k), Value::String(self.placeholder(arg)))
                        }
                        None => Value::String(self.placeholder(s)),
                    };
                    target.insert(k.clone(), resolved);
                }
                Value::Array(items) => {
                    target.insert(k.clone(), Value::Array(self.copy_array(items)));
                }
                Value::Object(child) => {
                    if self.recursive {
                        let slot = target
                            .entry(k.clone())
                            .or_insert_with(|| Value::Object(Document::new()));
                        // 类型不同时换成新的 map 继续合并，子文档中可能还有函数需要解析
                        if !slot.is_object() {
                            *slot = Value::Object(Document::new());
                        }
                        if let Value::Object(existing) = slot {
                            self.merge(existing, child);
                        }
                    } else {
                        let mut fresh = Document::new();
                        self.merge(&mut fresh, child);
                        target.insert(k.clone(), Value::Object(fresh));
                    }
                }
                other => {
                    target.insert(k.clone(), other.clone());
                }
            }
        }
    }

    /// 数组元素逐个解析，其中的函数没有旧值
    fn copy_array(&self, items: &[Value]) -> Vec<Value> {
        items
            .iter()
            .map(|v| match v {
                Value::String(s) => match self.find_function(s) {
                    Some((function, arg)) => {
                        function.call(None, Value::String(self.placeholder(arg)))
                    }
                    None => Value::String(self.placeholder(s)),
                },
                Value::Array(nested) => Value::Array(self.copy_array(nested)),
                Value::Object(child) => {
                    let mut fresh = Document::new();
                    self.merge(&mut fresh, child);
                    Value::Object(fresh)
                }
                other => other.clone(),
            })
            .collect()
    }

    fn placeholder(&self, s: &str) -> String {
        match placeholder_field(s) {
            Some(field) => self.record.field(field).unwrap_or_default().to_string(),
            None => s.to_string(),
        }
    }

    fn find_function<'s>(&self, s: &'s str) -> Option<(Arc<dyn Function>, &'s str)> {
        let (name, arg) = parse_call(s)?;
        let function = self.functions.get(name)?;
        Some((function, arg))
    }
}

/// `{{field}}` 形式时返回 field
pub fn placeholder_field(s: &str) -> Option<&str> {
    s.strip_prefix("{{")?.strip_suffix("}}")
}

/// 解析 `name(arg)`，name 不能为空
pub fn parse_call(s: &str) -> Option<(&str, &str)> {
    let inner = s.strip_suffix(')')?;
    let begin = inner.find('(')?;
    if begin == 0 {
        return None;
    }
    Some((&inner[..begin], &inner[begin + 1..]))
}

//! 匹配器注册表
//!
//! 使用 DashMap 保存操作符名到工厂的映射，名称不区分大小写，重复注册会覆盖。

use super::builtin::{self, BUILTIN_OPERATORS};
use super::intelligent::{Comparison, IntelligentFactory};
use super::MatcherFactory;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct MatcherRegistry {
    factories: DashMap<String, Arc<dyn MatcherFactory>>,
}

impl MatcherRegistry {
    /// 创建空注册表
    pub fn empty() -> Self {
        Self {
            factories: DashMap::new(),
        }
    }

    /// 创建包含全部内置操作符与智能操作符的注册表
    pub fn with_builtins() -> Self {
        let registry = Self::empty();
        for name in BUILTIN_OPERATORS {
            if let Some(factory) = builtin::factory(name) {
                registry.factories.insert(name.to_lowercase(), factory);
            }
        }
        for cmp in Comparison::ALL {
            registry.factories.insert(
                cmp.symbol().to_string(),
                Arc::new(IntelligentFactory::new(cmp)),
            );
        }
        registry
    }

    /// 注册操作符，已存在时覆盖
    pub fn register(&self, name: &str, factory: impl MatcherFactory + 'static) {
        self.register_arc(name, Arc::new(factory));
    }

    pub fn register_arc(&self, name: &str, factory: Arc<dyn MatcherFactory>) {
        let key = name.to_lowercase();
        if self.factories.insert(key.clone(), factory).is_some() {
            if is_builtin(&key) {
                warn!(operator = %name, "覆盖内置操作符");
            } else {
                debug!(operator = %name, "覆盖操作符");
            }
        } else {
            debug!(operator = %name, "注册操作符");
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn MatcherFactory>> {
        self.factories
            .get(&name.to_lowercase())
            .map(|f| f.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_lowercase())
    }

    /// 已注册的操作符名（小写）
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Default for MatcherRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn is_builtin(lower: &str) -> bool {
    BUILTIN_OPERATORS
        .iter()
        .any(|op| op.eq_ignore_ascii_case(lower))
        || Comparison::ALL.iter().any(|c| c.symbol() == lower)
}

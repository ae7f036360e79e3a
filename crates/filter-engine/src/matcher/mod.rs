//! 匹配器
//!
//! `Matcher` 是对单个字符串值的布尔判断，由 `MatcherFactory` 根据规则中的字面量编译得到。
//! 编译完成后匹配器是无状态的，可以在多个线程中并发使用。

pub mod builtin;
pub mod intelligent;
pub mod registry;

use crate::error::Result;
use std::collections::HashSet;
use std::sync::Arc;

pub use intelligent::{Comparison, IntelligentFactory, LiteralKind};
pub use registry::MatcherRegistry;

/// 单值匹配器
#[cfg_attr(test, mockall::automock)]
pub trait Matcher: Send + Sync {
    fn description(&self) -> String;

    fn is_match(&self, src: &str) -> bool;
}

/// 动态数据源：根据待匹配的值返回候选集合
///
/// 用于让 `in` 这类集合匹配器从外部数据（如运行时白名单）中取值，而不是固定的字面量。
pub type DataSource = Arc<dyn Fn(&str) -> Option<Arc<HashSet<String>>> + Send + Sync>;

/// 匹配器工厂：把字面量参数（以及可选的动态数据源）编译成匹配器
pub trait MatcherFactory: Send + Sync {
    fn build(&self, args: &[String], sources: &[DataSource]) -> Result<Box<dyn Matcher>>;
}

impl<F> MatcherFactory for F
where
    F: Fn(&[String], &[DataSource]) -> Result<Box<dyn Matcher>> + Send + Sync,
{
    fn build(&self, args: &[String], sources: &[DataSource]) -> Result<Box<dyn Matcher>> {
        self(args, sources)
    }
}

/// 对工厂产出的匹配器取反
pub fn not<F: MatcherFactory>(inner: F) -> Not<F> {
    Not(inner)
}

pub struct Not<F>(F);

impl<F: MatcherFactory> MatcherFactory for Not<F> {
    fn build(&self, args: &[String], sources: &[DataSource]) -> Result<Box<dyn Matcher>> {
        let inner = self.0.build(args, sources)?;
        Ok(Box::new(NotMatcher(inner)))
    }
}

pub struct NotMatcher(Box<dyn Matcher>);

impl Matcher for NotMatcher {
    fn description(&self) -> String {
        format!("[NOT] {}", self.0.description())
    }

    fn is_match(&self, src: &str) -> bool {
        !self.0.is_match(src)
    }
}

/// 校验单参数工厂的参数数量
pub(crate) fn single_arg(args: &[String]) -> Result<&str> {
    match args {
        [arg] => Ok(arg.as_str()),
        _ => Err(crate::error::RuleError::ArgsSize {
            expected: 1,
            actual: args.len(),
        }),
    }
}

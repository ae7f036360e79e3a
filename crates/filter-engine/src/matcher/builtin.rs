//! 内置操作符
//!
//! | 操作符 | 参数数量 | 语义 |
//! |---|---|---|
//! | in / notIn | ≥0 | 集合包含；无参数时 in 永不匹配 |
//! | lessThan / notLessThan / greaterThan / notGreaterThan | 1 | 数值比较 |
//! | versionLessThan / versionNotLessThan / versionGreaterThan / versionNotGreaterThan | 1 | 版本号比较 |
//! | regexMatch / regexNotMatch | 1 | 正则匹配 |
//! | hasPrefix / hasSuffix / contains 及其 not 形式 | 1 | 字符串关系 |
//! | strLessThan / strNotLessThan / strGreaterThan / strNotGreaterThan | 1 | 字典序比较 |
//! | sizeLessThan / sizeNotLessThan / sizeGreaterThan / sizeNotGreaterThan | 1 | 文件大小比较 |

use super::{DataSource, Matcher, MatcherFactory, not, single_arg};
use crate::error::Result;
use crate::literal::{self, FileSize, Version};
use regex::Regex;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

/// 所有内置操作符名（不含智能操作符）
pub const BUILTIN_OPERATORS: &[&str] = &[
    "in",
    "notIn",
    "lessThan",
    "notLessThan",
    "greaterThan",
    "notGreaterThan",
    "versionLessThan",
    "versionNotLessThan",
    "versionGreaterThan",
    "versionNotGreaterThan",
    "regexMatch",
    "regexNotMatch",
    "hasPrefix",
    "notHasPrefix",
    "hasSuffix",
    "notHasSuffix",
    "contains",
    "notContains",
    "strLessThan",
    "strNotLessThan",
    "strGreaterThan",
    "strNotGreaterThan",
    "sizeLessThan",
    "sizeNotLessThan",
    "sizeGreaterThan",
    "sizeNotGreaterThan",
];

/// 按名称取内置工厂，名称区分大小写（与 `BUILTIN_OPERATORS` 一致）
pub fn factory(name: &str) -> Option<Arc<dyn MatcherFactory>> {
    let f: Arc<dyn MatcherFactory> = match name {
        "in" => Arc::new(InFactory),
        "notIn" => Arc::new(not(InFactory)),

        "lessThan" => Arc::new(less_than()),
        "notLessThan" => Arc::new(not(less_than())),
        "greaterThan" => Arc::new(greater_than()),
        "notGreaterThan" => Arc::new(not(greater_than())),

        "versionLessThan" => Arc::new(version_less_than()),
        "versionNotLessThan" => Arc::new(version_not_less_than()),
        "versionGreaterThan" => Arc::new(version_greater_than()),
        "versionNotGreaterThan" => Arc::new(version_not_greater_than()),

        "regexMatch" => Arc::new(RegexFactory),
        "regexNotMatch" => Arc::new(not(RegexFactory)),

        "hasPrefix" => Arc::new(has_prefix()),
        "notHasPrefix" => Arc::new(not(has_prefix())),
        "hasSuffix" => Arc::new(has_suffix()),
        "notHasSuffix" => Arc::new(not(has_suffix())),
        "contains" => Arc::new(contains()),
        "notContains" => Arc::new(not(contains())),

        "strLessThan" => Arc::new(str_less_than()),
        "strNotLessThan" => Arc::new(str_not_less_than()),
        "strGreaterThan" => Arc::new(str_greater_than()),
        "strNotGreaterThan" => Arc::new(str_not_greater_than()),

        "sizeLessThan" => Arc::new(size_less_than()),
        "sizeNotLessThan" => Arc::new(size_not_less_than()),
        "sizeGreaterThan" => Arc::new(size_greater_than()),
        "sizeNotGreaterThan" => Arc::new(size_not_greater_than()),

        _ => return None,
    };
    Some(f)
}

pub(crate) fn less_than() -> NumberFactory {
    NumberFactory::new("less than", |s, d| s < d)
}

pub(crate) fn greater_than() -> NumberFactory {
    NumberFactory::new("greater than", |s, d| s > d)
}

pub(crate) fn version_less_than() -> VersionFactory {
    VersionFactory::new("version less than", Ordering::is_lt)
}

pub(crate) fn version_not_less_than() -> VersionFactory {
    VersionFactory::new("version not less than", Ordering::is_ge)
}

pub(crate) fn version_greater_than() -> VersionFactory {
    VersionFactory::new("version greater than", Ordering::is_gt)
}

pub(crate) fn version_not_greater_than() -> VersionFactory {
    VersionFactory::new("version not greater than", Ordering::is_le)
}

pub(crate) fn str_less_than() -> StringFactory {
    StringFactory::new("string less than", |s, d| s < d)
}

pub(crate) fn str_not_less_than() -> StringFactory {
    StringFactory::new("string not less than", |s, d| s >= d)
}

pub(crate) fn str_greater_than() -> StringFactory {
    StringFactory::new("string greater than", |s, d| s > d)
}

pub(crate) fn str_not_greater_than() -> StringFactory {
    StringFactory::new("string not greater than", |s, d| s <= d)
}

pub(crate) fn size_less_than() -> SizeFactory {
    SizeFactory::new("size less than", |s, d| s < d)
}

pub(crate) fn size_not_less_than() -> SizeFactory {
    SizeFactory::new("size not less than", |s, d| s >= d)
}

pub(crate) fn size_greater_than() -> SizeFactory {
    SizeFactory::new("size greater than", |s, d| s > d)
}

pub(crate) fn size_not_greater_than() -> SizeFactory {
    SizeFactory::new("size not greater than", |s, d| s <= d)
}

fn has_prefix() -> StringFactory {
    StringFactory::new("has prefix", |s, d| s.starts_with(d))
}

fn has_suffix() -> StringFactory {
    StringFactory::new("has suffix", |s, d| s.ends_with(d))
}

fn contains() -> StringFactory {
    StringFactory::new("contains", |s, d| s.contains(d))
}

// ------in------

pub struct InFactory;

impl MatcherFactory for InFactory {
    fn build(&self, args: &[String], sources: &[DataSource]) -> Result<Box<dyn Matcher>> {
        // 允许空参数
        Ok(Box::new(InMatcher {
            data: args.iter().cloned().collect(),
            sources: sources.to_vec(),
        }))
    }
}

pub struct InMatcher {
    data: HashSet<String>,
    sources: Vec<DataSource>,
}

impl Matcher for InMatcher {
    fn description(&self) -> String {
        "in".to_string()
    }

    fn is_match(&self, src: &str) -> bool {
        let in_sources = self
            .sources
            .iter()
            .filter_map(|source| source(src))
            .any(|set| set.contains(src));
        in_sources || self.data.contains(src)
    }
}

// ------number------

pub struct NumberFactory {
    desc: &'static str,
    cmp: fn(f64, f64) -> bool,
}

impl NumberFactory {
    pub fn new(desc: &'static str, cmp: fn(f64, f64) -> bool) -> Self {
        Self { desc, cmp }
    }
}

impl MatcherFactory for NumberFactory {
    fn build(&self, args: &[String], _: &[DataSource]) -> Result<Box<dyn Matcher>> {
        let dst = literal::parse_number(single_arg(args)?)?;
        Ok(Box::new(NumberMatcher {
            desc: self.desc,
            dst,
            cmp: self.cmp,
        }))
    }
}

pub struct NumberMatcher {
    desc: &'static str,
    dst: f64,
    cmp: fn(f64, f64) -> bool,
}

impl Matcher for NumberMatcher {
    fn description(&self) -> String {
        self.desc.to_string()
    }

    fn is_match(&self, src: &str) -> bool {
        (self.cmp)(literal::to_number(src), self.dst)
    }
}

// ------version------

pub struct VersionFactory {
    desc: &'static str,
    accept: fn(Ordering) -> bool,
}

impl VersionFactory {
    pub fn new(desc: &'static str, accept: fn(Ordering) -> bool) -> Self {
        Self { desc, accept }
    }
}

impl MatcherFactory for VersionFactory {
    fn build(&self, args: &[String], _: &[DataSource]) -> Result<Box<dyn Matcher>> {
        let dst = Version::parse(single_arg(args)?)?;
        Ok(Box::new(VersionMatcher {
            desc: self.desc,
            dst,
            accept: self.accept,
        }))
    }
}

pub struct VersionMatcher {
    desc: &'static str,
    dst: Version,
    accept: fn(Ordering) -> bool,
}

impl Matcher for VersionMatcher {
    fn description(&self) -> String {
        self.desc.to_string()
    }

    fn is_match(&self, src: &str) -> bool {
        (self.accept)(Version::parse_lenient(src).cmp(&self.dst))
    }
}

// ------regex------

pub struct RegexFactory;

impl MatcherFactory for RegexFactory {
    fn build(&self, args: &[String], _: &[DataSource]) -> Result<Box<dyn Matcher>> {
        let regex = Regex::new(single_arg(args)?)?;
        Ok(Box::new(RegexMatcher { regex }))
    }
}

pub struct RegexMatcher {
    regex: Regex,
}

impl Matcher for RegexMatcher {
    fn description(&self) -> String {
        "regex match".to_string()
    }

    fn is_match(&self, src: &str) -> bool {
        self.regex.is_match(src)
    }
}

// ------string------

pub struct StringFactory {
    desc: &'static str,
    cmp: fn(&str, &str) -> bool,
}

impl StringFactory {
    pub fn new(desc: &'static str, cmp: fn(&str, &str) -> bool) -> Self {
        Self { desc, cmp }
    }
}

impl MatcherFactory for StringFactory {
    fn build(&self, args: &[String], _: &[DataSource]) -> Result<Box<dyn Matcher>> {
        Ok(Box::new(StringMatcher {
            desc: self.desc,
            dst: single_arg(args)?.to_string(),
            cmp: self.cmp,
        }))
    }
}

pub struct StringMatcher {
    desc: &'static str,
    dst: String,
    cmp: fn(&str, &str) -> bool,
}

impl Matcher for StringMatcher {
    fn description(&self) -> String {
        self.desc.to_string()
    }

    fn is_match(&self, src: &str) -> bool {
        (self.cmp)(src, &self.dst)
    }
}

// ------size------

pub struct SizeFactory {
    desc: &'static str,
    cmp: fn(FileSize, FileSize) -> bool,
}

impl SizeFactory {
    pub fn new(desc: &'static str, cmp: fn(FileSize, FileSize) -> bool) -> Self {
        Self { desc, cmp }
    }
}

impl MatcherFactory for SizeFactory {
    fn build(&self, args: &[String], _: &[DataSource]) -> Result<Box<dyn Matcher>> {
        let dst = FileSize::parse(single_arg(args)?)?;
        Ok(Box::new(SizeMatcher {
            desc: self.desc,
            dst,
            cmp: self.cmp,
        }))
    }
}

pub struct SizeMatcher {
    desc: &'static str,
    dst: FileSize,
    cmp: fn(FileSize, FileSize) -> bool,
}

impl Matcher for SizeMatcher {
    fn description(&self) -> String {
        self.desc.to_string()
    }

    fn is_match(&self, src: &str) -> bool {
        (self.cmp)(FileSize::parse_lenient(src), self.dst)
    }
}

//! 智能操作符
//!
//! 根据规则中的字面量推断比较类型，目标只能有 1 个：
//!
//! - `==`, `!=` 按字符串的 in / notIn 处理
//! - `>`, `>=`, `<`, `<=` 依次尝试：数值、版本号（点分整数，可带 v 前缀）、文件大小，
//!   都不是则按字符串字典序比较

use super::builtin::{self, InFactory};
use super::{DataSource, Matcher, MatcherFactory, not, single_arg};
use crate::error::Result;
use crate::literal::{FileSize, Version};
use std::sync::Arc;

/// 比较符号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Comparison {
    pub const ALL: [Comparison; 6] = [
        Comparison::Eq,
        Comparison::Ne,
        Comparison::Gt,
        Comparison::Ge,
        Comparison::Lt,
        Comparison::Le,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        }
    }
}

/// 字面量推断出的比较类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Number,
    Version,
    FileSize,
    String,
}

impl LiteralKind {
    /// 按 数值 > 版本号 > 文件大小 > 字符串 的优先级推断
    pub fn infer(literal: &str) -> Self {
        if literal.parse::<f64>().is_ok() {
            Self::Number
        } else if Version::parse(literal).is_ok() {
            Self::Version
        } else if FileSize::parse(literal).is_ok() {
            Self::FileSize
        } else {
            Self::String
        }
    }

    /// 该类型下比较符号对应的内置操作符名与工厂
    fn route(self, cmp: Comparison) -> (&'static str, Arc<dyn MatcherFactory>) {
        use Comparison::*;
        match (self, cmp) {
            (_, Eq) => ("in", Arc::new(InFactory)),
            (_, Ne) => ("notIn", Arc::new(not(InFactory))),
            (Self::Number, Gt) => ("greaterThan", Arc::new(builtin::greater_than())),
            (Self::Number, Ge) => ("notLessThan", Arc::new(not(builtin::less_than()))),
            (Self::Number, Lt) => ("lessThan", Arc::new(builtin::less_than())),
            (Self::Number, Le) => ("notGreaterThan", Arc::new(not(builtin::greater_than()))),
            (Self::Version, Gt) => ("versionGreaterThan", Arc::new(builtin::version_greater_than())),
            (Self::Version, Ge) => ("versionNotLessThan", Arc::new(builtin::version_not_less_than())),
            (Self::Version, Lt) => ("versionLessThan", Arc::new(builtin::version_less_than())),
            (Self::Version, Le) => (
                "versionNotGreaterThan",
                Arc::new(builtin::version_not_greater_than()),
            ),
            (Self::FileSize, Gt) => ("sizeGreaterThan", Arc::new(builtin::size_greater_than())),
            (Self::FileSize, Ge) => ("sizeNotLessThan", Arc::new(builtin::size_not_less_than())),
            (Self::FileSize, Lt) => ("sizeLessThan", Arc::new(builtin::size_less_than())),
            (Self::FileSize, Le) => ("sizeNotGreaterThan", Arc::new(builtin::size_not_greater_than())),
            (Self::String, Gt) => ("strGreaterThan", Arc::new(builtin::str_greater_than())),
            (Self::String, Ge) => ("strNotLessThan", Arc::new(builtin::str_not_less_than())),
            (Self::String, Lt) => ("strLessThan", Arc::new(builtin::str_less_than())),
            (Self::String, Le) => ("strNotGreaterThan", Arc::new(builtin::str_not_greater_than())),
        }
    }
}

/// 智能操作符工厂，始终路由到内置实现（不受注册表覆盖影响）
pub struct IntelligentFactory {
    cmp: Comparison,
}

impl IntelligentFactory {
    pub fn new(cmp: Comparison) -> Self {
        Self { cmp }
    }
}

impl MatcherFactory for IntelligentFactory {
    fn build(&self, args: &[String], sources: &[DataSource]) -> Result<Box<dyn Matcher>> {
        let kind = LiteralKind::infer(single_arg(args)?);
        let (operator, factory) = kind.route(self.cmp);
        tracing::trace!(symbol = self.cmp.symbol(), ?kind, operator, "智能操作符路由");
        factory.build(args, sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuleError;

    fn build(cmp: Comparison, literal: &str) -> Box<dyn Matcher> {
        IntelligentFactory::new(cmp)
            .build(&[literal.to_string()], &[])
            .unwrap()
    }

    #[test]
    fn test_infer_priority() {
        assert_eq!(LiteralKind::infer("42"), LiteralKind::Number);
        assert_eq!(LiteralKind::infer("1.5"), LiteralKind::Number);
        assert_eq!(LiteralKind::infer("1.2.0"), LiteralKind::Version);
        assert_eq!(LiteralKind::infer("v2"), LiteralKind::Version);
        assert_eq!(LiteralKind::infer("2047MB"), LiteralKind::FileSize);
        assert_eq!(LiteralKind::infer("Aa"), LiteralKind::String);
        assert_eq!(LiteralKind::infer(""), LiteralKind::String);
    }

    #[test]
    fn test_routes_by_literal_type() {
        assert_eq!(build(Comparison::Gt, "10").description(), "greater than");
        assert_eq!(build(Comparison::Ge, "10").description(), "[NOT] less than");
        assert_eq!(build(Comparison::Lt, "1.2.0").description(), "version less than");
        assert_eq!(build(Comparison::Le, "1KB").description(), "size not greater than");
        assert_eq!(build(Comparison::Gt, "Aa").description(), "string greater than");
        assert_eq!(build(Comparison::Eq, "x").description(), "in");
        assert_eq!(build(Comparison::Ne, "x").description(), "[NOT] in");
    }

    #[test]
    fn test_route_agrees_with_builtin_names() {
        let kinds = [
            LiteralKind::Number,
            LiteralKind::Version,
            LiteralKind::FileSize,
            LiteralKind::String,
        ];
        for kind in kinds {
            for cmp in Comparison::ALL {
                let (operator, factory) = kind.route(cmp);
                let literal = match kind {
                    LiteralKind::Number => "10",
                    LiteralKind::Version => "1.2.3",
                    LiteralKind::FileSize => "2KB",
                    LiteralKind::String => "m",
                };
                let args = [literal.to_string()];
                let routed = factory.build(&args, &[]).unwrap();
                let named = builtin::factory(operator)
                    .unwrap()
                    .build(&args, &[])
                    .unwrap();
                assert_eq!(routed.description(), named.description(), "{:?} {}", kind, operator);
                for probe in ["", "9", "10", "11", "1.2.4", "1KB", "4KB", "a", "z", "m"] {
                    assert_eq!(routed.is_match(probe), named.is_match(probe), "{} on {}", operator, probe);
                }
            }
        }
    }

    #[test]
    fn test_intelligent_matching() {
        assert!(build(Comparison::Gt, "1.2.0").is_match("1.2.3.4"));
        assert!(build(Comparison::Gt, "2047MB").is_match("2GB"));
        assert!(build(Comparison::Gt, "Aa").is_match("Ab"));
        assert!(build(Comparison::Le, "3").is_match("3"));
        assert!(build(Comparison::Eq, "x").is_match("x"));
        assert!(!build(Comparison::Ne, "x").is_match("x"));
    }

    #[test]
    fn test_requires_single_literal() {
        for cmp in Comparison::ALL {
            let err = IntelligentFactory::new(cmp).build(&[], &[]).err();
            assert!(
                matches!(err, Some(RuleError::ArgsSize { expected: 1, actual: 0 })),
                "{}",
                cmp.symbol()
            );
            let two = ["1".to_string(), "2".to_string()];
            assert!(IntelligentFactory::new(cmp).build(&two, &[]).is_err());
        }
    }
}

//! 过滤器
//!
//! 由表达式和子过滤器组成的 AND / OR / NOT 树，每个节点可以带三份响应文档：
//! `responseAlways`、`responseOnMatch`、`responseOnNotMatch`。
//!
//! 提供两种遍历方式，结果可能不同：
//!
//! - [`Filter::filter_with_response`]：短路求值。先合并 responseAlways，依次检查
//!   match、notMatch、matchAll、matchAny，任一不满足立即返回 false 并合并
//!   responseOnNotMatch；全部满足时合并 responseOnMatch。
//! - [`Filter::walk`]：穷举求值。matchAll 和 matchAny 的每个子节点都会被求值，
//!   目的是把所有能匹配的分支中的 responseOnMatch 都收集出来，即使整体结果为 false。
//!   只有匹配的节点合并 responseOnMatch，不合并 responseOnNotMatch。
//!
//! 例如记录 `{"key1": "1"}` 与
//!
//! ```yaml
//! matchAll:
//!   - match: [key1, in, 2]
//!     responseOnMatch: {xx: xx}
//!   - match: [key1, in, 1]
//!     responseOnMatch: {yy: yy}
//! ```
//!
//! `walk` 返回 `(false, {"yy": "yy"})`，不会因为第一个子节点不匹配而退出。

use crate::error::Result;
use crate::expression::Expression;
use crate::function::FunctionRegistry;
use crate::matcher::DataSource;
use crate::merge::Merger;
use crate::models::{Document, FilterConfig, Record};
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub struct Filter {
    pub(crate) description: String,
    pub(crate) merge_response_recursively: bool,
    pub(crate) response_always: Document,
    pub(crate) response_on_match: Document,
    pub(crate) response_on_not_match: Document,
    pub(crate) match_expr: Option<Expression>,
    pub(crate) not_match: Option<Box<Filter>>,
    pub(crate) match_all: Vec<Filter>,
    pub(crate) match_any: Vec<Filter>,
    pub(crate) functions: Arc<FunctionRegistry>,
}

/// 穷举求值的中间结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tri {
    Unknown,
    No,
    Yes,
}

impl Tri {
    /// 已经是 No 时保持 No
    fn and(self, ok: bool) -> Self {
        match (self, ok) {
            (Tri::No, _) | (_, false) => Tri::No,
            _ => Tri::Yes,
        }
    }
}

impl Filter {
    /// 匹配所有条件返回 true，未写任何条件的过滤器返回 true
    pub fn filter(&self, record: &dyn Record) -> bool {
        self.filter_with_response(record).0
    }

    /// 短路求值并返回响应文档
    pub fn filter_with_response(&self, record: &dyn Record) -> (bool, Document) {
        let merger = Merger::new(&self.functions, record, self.merge_response_recursively);
        let mut resp = Document::new();
        let ok = self.do_filter(record, &merger, &mut resp);
        (ok, resp)
    }

    /// 穷举求值并返回所有匹配分支的响应文档
    pub fn walk(&self, record: &dyn Record) -> (bool, Document) {
        let merger = Merger::new(&self.functions, record, self.merge_response_recursively);
        let mut resp = Document::new();
        let ok = self.walk_filter(record, &merger, &mut resp);
        (ok, resp)
    }

    fn do_filter(&self, record: &dyn Record, merger: &Merger<'_>, resp: &mut Document) -> bool {
        merger.merge(resp, &self.response_always);

        let ok = self.check(record, merger, resp);
        if ok {
            merger.merge(resp, &self.response_on_match);
        } else {
            merger.merge(resp, &self.response_on_not_match);
        }
        ok
    }

    fn check(&self, record: &dyn Record, merger: &Merger<'_>, resp: &mut Document) -> bool {
        if let Some(exp) = &self.match_expr
            && !exp.matches(record)
        {
            return false;
        }

        if let Some(sub) = &self.not_match
            && sub.do_filter(record, merger, resp)
        {
            return false;
        }

        if !self
            .match_all
            .iter()
            .all(|sub| sub.do_filter(record, merger, resp))
        {
            return false;
        }

        if !self.match_any.is_empty()
            && !self
                .match_any
                .iter()
                .any(|sub| sub.do_filter(record, merger, resp))
        {
            return false;
        }

        true
    }

    fn walk_filter(&self, record: &dyn Record, merger: &Merger<'_>, resp: &mut Document) -> bool {
        merger.merge(resp, &self.response_always);

        let mut res = Tri::Unknown;

        if let Some(sub) = &self.not_match {
            res = res.and(!sub.walk_filter(record, merger, resp));
        }

        if !self.match_all.is_empty() {
            let mut pass = true;
            for sub in &self.match_all {
                if !sub.walk_filter(record, merger, resp) {
                    pass = false;
                }
            }
            res = res.and(pass);
        }

        if !self.match_any.is_empty() {
            let mut pass = false;
            for sub in &self.match_any {
                if sub.walk_filter(record, merger, resp) {
                    pass = true;
                }
            }
            res = res.and(pass);
        }

        let ok = match (&self.match_expr, res) {
            (_, Tri::No) => false,
            (Some(exp), _) => exp.matches(record),
            (None, _) => true,
        };

        if ok {
            merger.merge(resp, &self.response_on_match);
        }
        ok
    }

    /// 修改树中所有表达式的参数，部分修改失败时不会回退
    pub fn modify_values<F>(&mut self, mut modifier: F) -> Result<()>
    where
        F: FnMut(&str) -> Vec<String>,
    {
        self.modify_values_dyn(&mut modifier)
    }

    fn modify_values_dyn(&mut self, modifier: &mut dyn FnMut(&str) -> Vec<String>) -> Result<()> {
        if let Some(exp) = &mut self.match_expr {
            exp.modify_values(&mut *modifier)?;
        }
        for sub in self.children_mut() {
            sub.modify_values_dyn(modifier)?;
        }
        Ok(())
    }

    /// 由外部为树中所有表达式提供数据来源
    pub fn modify_data_source<F>(&mut self, mut modifier: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<DataSource>,
    {
        self.modify_data_source_dyn(&mut modifier)
    }

    fn modify_data_source_dyn(
        &mut self,
        modifier: &mut dyn FnMut(&str) -> Option<DataSource>,
    ) -> Result<()> {
        if let Some(exp) = &mut self.match_expr {
            exp.modify_data_source(&mut *modifier)?;
        }
        for sub in self.children_mut() {
            sub.modify_data_source_dyn(modifier)?;
        }
        Ok(())
    }

    fn children_mut(&mut self) -> impl Iterator<Item = &mut Filter> {
        self.not_match
            .as_deref_mut()
            .into_iter()
            .chain(self.match_all.iter_mut())
            .chain(self.match_any.iter_mut())
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn match_expr(&self) -> Option<&Expression> {
        self.match_expr.as_ref()
    }

    pub fn not_match(&self) -> Option<&Filter> {
        self.not_match.as_deref()
    }

    pub fn match_all(&self) -> &[Filter] {
        &self.match_all
    }

    pub fn match_any(&self) -> &[Filter] {
        &self.match_any
    }

    /// 还原为配置形式
    pub fn to_config(&self) -> FilterConfig {
        FilterConfig {
            description: self.description.clone(),
            merge_response_recursively: self.merge_response_recursively,
            response_always: self.response_always.clone(),
            response_on_match: self.response_on_match.clone(),
            response_on_not_match: self.response_on_not_match.clone(),
            match_expr: self.match_expr.as_ref().map(Expression::to_config),
            not_match: self.not_match.as_ref().map(|f| Box::new(f.to_config())),
            match_all: self.match_all.iter().map(Filter::to_config).collect(),
            match_any: self.match_any.iter().map(Filter::to_config).collect(),
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("description", &self.description)
            .field("match", &self.match_expr)
            .field("not_match", &self.not_match)
            .field("match_all", &self.match_all)
            .field("match_any", &self.match_any)
            .finish_non_exhaustive()
    }
}

/// JSON 配置形式
impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(&self.to_config()).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

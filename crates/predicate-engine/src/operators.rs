//! 规则操作符定义
//!
//! 操作符表把符号映射到二元谓词。引擎构造时接管整张表，之后只读。

use crate::error::Result;
use crate::evaluator::ConditionEvaluator;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 未指定或找不到操作符时使用的符号
pub const FALLBACK_OPERATOR: &str = "=";

/// 二元谓词：`(字段值, 期望值) -> 是否匹配`
pub type OperatorFn = Arc<dyn Fn(&Value, &Value) -> Result<bool> + Send + Sync>;

/// 内置操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    // 比较
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,

    // 字符串
    Contains,
    StartsWith,
    EndsWith,
}

impl Operator {
    pub const ALL: [Operator; 9] = [
        Self::Eq,
        Self::Neq,
        Self::Gt,
        Self::Gte,
        Self::Lt,
        Self::Lte,
        Self::Contains,
        Self::StartsWith,
        Self::EndsWith,
    ];

    /// 操作符在规则中的写法
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Neq => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Contains => "~",
            Self::StartsWith => "^",
            Self::EndsWith => "$",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.symbol() == symbol)
    }

    /// 包装为可放入操作符表的谓词
    pub fn to_fn(self) -> OperatorFn {
        Arc::new(move |input: &Value, expected: &Value| {
            ConditionEvaluator::evaluate(input, self, expected)
        })
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// 操作符表
#[derive(Clone)]
pub struct OperatorTable {
    ops: HashMap<String, OperatorFn>,
}

impl OperatorTable {
    /// 空表，由调用方自行注册全部操作符
    pub fn empty() -> Self {
        Self {
            ops: HashMap::new(),
        }
    }

    /// 包含九个内置操作符的表
    pub fn builtin() -> Self {
        let ops = Operator::ALL
            .into_iter()
            .map(|op| (op.symbol().to_string(), op.to_fn()))
            .collect();

        Self { ops }
    }

    /// 注册操作符，返回被替换的旧实现
    pub fn insert<F>(&mut self, symbol: impl Into<String>, op: F) -> Option<OperatorFn>
    where
        F: Fn(&Value, &Value) -> Result<bool> + Send + Sync + 'static,
    {
        self.ops.insert(symbol.into(), Arc::new(op))
    }

    /// 链式注册
    pub fn with<F>(mut self, symbol: impl Into<String>, op: F) -> Self
    where
        F: Fn(&Value, &Value) -> Result<bool> + Send + Sync + 'static,
    {
        self.insert(symbol, op);
        self
    }

    pub fn get(&self, symbol: &str) -> Option<&OperatorFn> {
        self.ops.get(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.ops.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// 已注册的符号（排序后）
    pub fn symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self.ops.keys().map(String::as_str).collect();
        symbols.sort_unstable();
        symbols
    }
}

impl Default for OperatorTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for OperatorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorTable")
            .field("symbols", &self.symbols())
            .finish()
    }
}

//! 规则引擎领域模型
//!
//! 规则以 JSON 结构描述：
//!
//! ```json
//! [
//!   { "key": "event.type", "value": "PURCHASE" },
//!   { "every": [{ "key": "order.amount", "op": ">=", "value": 500 }],
//!     "some":  [{ "key": "user.level", "value": "gold" },
//!               { "key": "user.is_vip", "value": true }],
//!     "not":   { "key": "user.tags", "op": "~", "value": "blocked" } }
//! ]
//! ```
//!
//! 从 JSON 转换时不会拒绝任何输入：不是对象的节点、不是数组的 `every`/`some`
//! 会保留为 `Malformed`，在求值时按失败处理。数组节点例外：它没有可识别的键，
//! 按空节点求值。

use crate::evaluator::type_name;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// 规则集：单个节点或按顺序取 AND 的节点序列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum RuleSet {
    Single(RuleNode),
    Sequence(Vec<RuleNode>),
}

impl RuleSet {
    /// 统一视为节点序列
    pub fn nodes(&self) -> &[RuleNode] {
        match self {
            Self::Single(node) => std::slice::from_ref(node),
            Self::Sequence(nodes) => nodes,
        }
    }

    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Array(items) => Self::Sequence(items.iter().map(RuleNode::from_value).collect()),
            other => Self::Single(RuleNode::from_value(other)),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Single(node) => node.to_value(),
            Self::Sequence(nodes) => Value::Array(nodes.iter().map(RuleNode::to_value).collect()),
        }
    }
}

impl From<RuleNode> for RuleSet {
    fn from(node: RuleNode) -> Self {
        Self::Single(node)
    }
}

impl From<Vec<RuleNode>> for RuleSet {
    fn from(nodes: Vec<RuleNode>) -> Self {
        Self::Sequence(nodes)
    }
}

impl From<Value> for RuleSet {
    fn from(value: Value) -> Self {
        Self::from_value(&value)
    }
}

impl From<RuleSet> for Value {
    fn from(rules: RuleSet) -> Self {
        rules.to_value()
    }
}

/// 规则节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum RuleNode {
    Object(NodeFields),
    /// 不是对象的节点；数组按空节点求值，其余类型求值时报错
    Malformed(Value),
}

/// 节点上可识别的字段，均可缺省
///
/// `key` / `op` 保留原始 JSON 值：非字符串的 `key` 在求值时视为结构错误，
/// 非字符串的 `op` 视为未知操作符。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeFields {
    pub every: Option<Branch>,
    pub some: Option<Branch>,
    pub not: Option<Box<RuleSet>>,
    pub key: Option<Value>,
    pub op: Option<Value>,
    pub value: Option<Value>,
}

/// `every` / `some` 的子节点列表
#[derive(Debug, Clone, PartialEq)]
pub enum Branch {
    Nodes(Vec<RuleNode>),
    /// 不是数组的值
    Malformed(Value),
}

/// 节点求值的一个步骤，按 every → some → not → 比较 的顺序出现
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Clause<'a> {
    Every(&'a Branch),
    Some(&'a Branch),
    Not(&'a RuleSet),
    Compare,
}

impl Clause<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Every(_) => "every",
            Self::Some(_) => "some",
            Self::Not(_) => "not",
            Self::Compare => "compare",
        }
    }
}

impl NodeFields {
    /// 是否包含 every / some / not
    pub fn is_composite(&self) -> bool {
        self.every.is_some() || self.some.is_some() || self.not.is_some()
    }

    /// 同时具备 key 和 value 时才做比较
    pub fn has_comparison(&self) -> bool {
        self.key.is_some() && self.value.is_some()
    }

    /// 本节点需要执行的步骤，顺序固定
    pub fn clauses(&self) -> impl Iterator<Item = Clause<'_>> {
        [
            self.every.as_ref().map(Clause::Every),
            self.some.as_ref().map(Clause::Some),
            self.not.as_deref().map(Clause::Not),
            self.has_comparison().then_some(Clause::Compare),
        ]
        .into_iter()
        .flatten()
    }

    fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            every: map.get("every").map(Branch::from_value),
            some: map.get("some").map(Branch::from_value),
            not: map.get("not").map(|v| Box::new(RuleSet::from_value(v))),
            key: map.get("key").cloned(),
            op: map.get("op").cloned(),
            value: map.get("value").cloned(),
        }
    }

    fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        if let Some(every) = &self.every {
            map.insert("every".to_string(), every.to_value());
        }
        if let Some(some) = &self.some {
            map.insert("some".to_string(), some.to_value());
        }
        if let Some(not) = &self.not {
            map.insert("not".to_string(), not.to_value());
        }
        if let Some(key) = &self.key {
            map.insert("key".to_string(), key.clone());
        }
        if let Some(op) = &self.op {
            map.insert("op".to_string(), op.clone());
        }
        if let Some(value) = &self.value {
            map.insert("value".to_string(), value.clone());
        }
        map
    }
}

impl Branch {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Array(items) => Self::Nodes(items.iter().map(RuleNode::from_value).collect()),
            other => Self::Malformed(other.clone()),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Nodes(nodes) => Value::Array(nodes.iter().map(RuleNode::to_value).collect()),
            Self::Malformed(value) => value.clone(),
        }
    }
}

impl RuleNode {
    /// 使用默认操作符的比较节点
    pub fn leaf(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Object(NodeFields {
            key: Some(Value::String(key.into())),
            value: Some(value.into()),
            ..Default::default()
        })
    }

    /// 指定操作符的比较节点
    pub fn compare(key: impl Into<String>, op: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Object(NodeFields {
            key: Some(Value::String(key.into())),
            op: Some(Value::String(op.into())),
            value: Some(value.into()),
            ..Default::default()
        })
    }

    pub fn every(children: Vec<RuleNode>) -> Self {
        Self::Object(NodeFields::default()).and_every(children)
    }

    pub fn some(children: Vec<RuleNode>) -> Self {
        Self::Object(NodeFields::default()).and_some(children)
    }

    pub fn not(rules: impl Into<RuleSet>) -> Self {
        Self::Object(NodeFields::default()).and_not(rules)
    }

    /// 在同一节点上追加 every 子句
    pub fn and_every(mut self, children: Vec<RuleNode>) -> Self {
        if let Self::Object(fields) = &mut self {
            fields.every = Some(Branch::Nodes(children));
        }
        self
    }

    /// 在同一节点上追加 some 子句
    pub fn and_some(mut self, children: Vec<RuleNode>) -> Self {
        if let Self::Object(fields) = &mut self {
            fields.some = Some(Branch::Nodes(children));
        }
        self
    }

    /// 在同一节点上追加 not 子句
    pub fn and_not(mut self, rules: impl Into<RuleSet>) -> Self {
        if let Self::Object(fields) = &mut self {
            fields.not = Some(Box::new(rules.into()));
        }
        self
    }

    pub fn fields(&self) -> Option<&NodeFields> {
        match self {
            Self::Object(fields) => Some(fields),
            Self::Malformed(_) => None,
        }
    }

    pub fn is_composite(&self) -> bool {
        self.fields().is_some_and(NodeFields::is_composite)
    }

    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => Self::Object(NodeFields::from_map(map)),
            other => Self::Malformed(other.clone()),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Object(fields) => Value::Object(fields.to_map()),
            Self::Malformed(value) => value.clone(),
        }
    }

    /// 用于追踪输出的简短描述
    pub fn describe(&self) -> String {
        match self {
            Self::Object(fields) => {
                let key = match &fields.key {
                    Some(Value::String(k)) => k.clone(),
                    Some(other) => other.to_string(),
                    None => "<none>".to_string(),
                };
                let op = fields.op.as_ref().and_then(Value::as_str).unwrap_or("=");
                let value = fields
                    .value
                    .as_ref()
                    .map(Value::to_string)
                    .unwrap_or_else(|| "<none>".to_string());
                format!("{} {} {}", key, op, value)
            }
            Self::Malformed(value) => format!("<malformed {}>", type_name(value)),
        }
    }
}

impl From<Value> for RuleNode {
    fn from(value: Value) -> Self {
        Self::from_value(&value)
    }
}

impl From<RuleNode> for Value {
    fn from(node: RuleNode) -> Self {
        node.to_value()
    }
}

/// 带追踪信息的评估结果
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub matched: bool,
    pub trace: Vec<String>,
    pub elapsed: Duration,
}

//! 规则引擎
//!
//! 递归评估规则树，短路求值。每个节点是一个错误边界：节点内部任何步骤返回的
//! 错误（操作符执行失败、结构异常）都会被吸收，该节点按不匹配处理。
//!
//! 引擎不限制规则树的深度，调用方需要自行约束不可信输入的规模。

use crate::accessor::{DottedPathAccessor, FieldAccessor};
use crate::config::EngineConfig;
use crate::error::{Result, RuleError};
use crate::evaluator::type_name;
use crate::models::{Branch, Clause, Evaluation, NodeFields, RuleNode, RuleSet};
use crate::operators::{FALLBACK_OPERATOR, Operator, OperatorFn, OperatorTable};
use serde_json::Value;
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// 规则引擎
///
/// 构造后只读，可在多个线程间共享。
pub struct Engine<A = DottedPathAccessor> {
    operators: OperatorTable,
    fallback: OperatorFn,
    fallback_symbol: String,
    accessor: A,
    trace_enabled: bool,
}

impl Engine<DottedPathAccessor> {
    /// 使用九个内置操作符
    pub fn new() -> Self {
        Self {
            operators: OperatorTable::builtin(),
            fallback: Operator::Eq.to_fn(),
            fallback_symbol: FALLBACK_OPERATOR.to_string(),
            accessor: DottedPathAccessor,
            trace_enabled: false,
        }
    }

    /// 使用自定义操作符表（完全替换内置表）
    ///
    /// 表中必须包含 `=`，否则返回 `MissingFallbackOperator`。
    pub fn with_operators(operators: OperatorTable) -> Result<Self> {
        Self::build(operators, FALLBACK_OPERATOR, false)
    }

    /// 按配置构造
    ///
    /// 回退操作符取 `config.fallback_operator`（默认 `=`），表中必须包含该符号。
    pub fn from_config(config: &EngineConfig, operators: OperatorTable) -> Result<Self> {
        let engine = Self::build(operators, &config.fallback_operator, config.trace)?;

        info!(
            operators = engine.operators.len(),
            fallback = %engine.fallback_symbol,
            trace = engine.trace_enabled,
            "规则引擎已初始化"
        );

        Ok(engine)
    }

    fn build(operators: OperatorTable, fallback_symbol: &str, trace_enabled: bool) -> Result<Self> {
        let fallback = operators
            .get(fallback_symbol)
            .cloned()
            .ok_or_else(|| RuleError::MissingFallbackOperator(fallback_symbol.to_string()))?;

        Ok(Self {
            operators,
            fallback,
            fallback_symbol: fallback_symbol.to_string(),
            accessor: DottedPathAccessor,
            trace_enabled,
        })
    }
}

impl Default for Engine<DottedPathAccessor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: FieldAccessor> Engine<A> {
    /// 替换字段访问器
    pub fn with_accessor<B: FieldAccessor>(self, accessor: B) -> Engine<B> {
        Engine {
            operators: self.operators,
            fallback: self.fallback,
            fallback_symbol: self.fallback_symbol,
            accessor,
            trace_enabled: self.trace_enabled,
        }
    }

    /// 启用评估追踪，`evaluate` 会把每一步以 debug 级别输出
    pub fn with_trace(mut self) -> Self {
        self.trace_enabled = true;
        self
    }

    pub fn operators(&self) -> &OperatorTable {
        &self.operators
    }

    pub fn accessor(&self) -> &A {
        &self.accessor
    }

    pub fn fallback_operator(&self) -> &str {
        &self.fallback_symbol
    }

    /// 评估规则集，序列中的节点按顺序取 AND
    pub fn evaluate(&self, record: &Value, rules: &RuleSet) -> bool {
        if self.trace_enabled {
            let evaluation = self.explain(record, rules);
            for line in &evaluation.trace {
                debug!(target: "predicate_engine::trace", "{}", line);
            }
            return evaluation.matched;
        }

        self.eval_set(record, rules, &mut Trace::off(), "root")
    }

    /// 评估单个节点
    pub fn evaluate_node(&self, record: &Value, node: &RuleNode) -> bool {
        self.eval_node(record, node, &mut Trace::off(), "root")
    }

    /// 直接评估 JSON 形式的规则
    pub fn evaluate_value(&self, record: &Value, rules: &Value) -> bool {
        self.evaluate(record, &RuleSet::from_value(rules))
    }

    /// 评估叶子节点
    ///
    /// 组合节点（含 every / some / not）转交 `evaluate_node`。错误不在这里吸收，
    /// 由外层节点决定结果。
    pub fn evaluate_leaf(&self, record: &Value, node: &RuleNode) -> Result<bool> {
        self.eval_leaf(record, node, &mut Trace::off(), "root")
    }

    /// 评估并返回每一步的追踪记录
    #[instrument(skip_all)]
    pub fn explain(&self, record: &Value, rules: &RuleSet) -> Evaluation {
        let start = Instant::now();
        let mut trace = Trace::on();

        let matched = self.eval_set(record, rules, &mut trace, "root");

        Evaluation {
            matched,
            trace: trace.into_lines(),
            elapsed: start.elapsed(),
        }
    }

    fn eval_set(&self, record: &Value, rules: &RuleSet, trace: &mut Trace, path: &str) -> bool {
        let nodes = rules.nodes();
        let sequence = matches!(rules, RuleSet::Sequence(_));

        for (i, node) in nodes.iter().enumerate() {
            let node_path = if sequence {
                trace.child(path, format_args!("[{}]", i))
            } else {
                trace.child(path, format_args!(""))
            };

            if !self.eval_node(record, node, trace, &node_path) {
                if sequence && i + 1 < nodes.len() {
                    trace.record(|| format!("{}: AND 短路 - 节点 {} 不匹配", path, i));
                }
                return false;
            }
        }

        true
    }

    /// 节点边界：错误在这里折叠为 false
    fn eval_node(&self, record: &Value, node: &RuleNode, trace: &mut Trace, path: &str) -> bool {
        match self.try_node(record, node, trace, path) {
            Ok(matched) => matched,
            Err(e) => {
                debug!(error = %e, node = %node.describe(), "规则执行出错，按不匹配处理");
                trace.record(|| format!("{}: 执行出错 ({}) => NOT_MATCHED", path, e));
                false
            }
        }
    }

    fn try_node(
        &self,
        record: &Value,
        node: &RuleNode,
        trace: &mut Trace,
        path: &str,
    ) -> Result<bool> {
        let fields = match node {
            RuleNode::Object(fields) => fields,
            // 数组上没有可识别的键，等同于空节点
            RuleNode::Malformed(Value::Array(_)) => {
                trace.record(|| format!("{}: 数组节点无可识别的键 => MATCHED", path));
                return Ok(true);
            }
            RuleNode::Malformed(value) => {
                return Err(RuleError::MalformedNode(format!(
                    "节点应为对象, 实际为 {}",
                    type_name(value)
                )));
            }
        };

        for clause in fields.clauses() {
            let clause_path = trace.child(path, format_args!(".{}", clause.name()));

            let matched = match clause {
                Clause::Every(branch) => {
                    self.eval_branch(record, branch, true, trace, &clause_path)?
                }
                Clause::Some(branch) => {
                    self.eval_branch(record, branch, false, trace, &clause_path)?
                }
                Clause::Not(rules) => !self.eval_set(record, rules, trace, &clause_path),
                // 组合键已在前面的步骤处理，这里只做本节点的比较
                Clause::Compare => self.compare(record, fields, trace, &clause_path)?,
            };

            if !matched {
                trace.record(|| format!("{}: {} 不满足，跳过剩余步骤", path, clause.name()));
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// every（`all = true`）或 some（`all = false`）
    fn eval_branch(
        &self,
        record: &Value,
        branch: &Branch,
        all: bool,
        trace: &mut Trace,
        path: &str,
    ) -> Result<bool> {
        let children = match branch {
            Branch::Nodes(children) => children,
            Branch::Malformed(value) => {
                return Err(RuleError::MalformedNode(format!(
                    "子节点列表应为数组, 实际为 {}",
                    type_name(value)
                )));
            }
        };

        for (i, child) in children.iter().enumerate() {
            let child_path = trace.child(path, format_args!("[{}]", i));
            let matched = self.eval_leaf(record, child, trace, &child_path)?;

            if matched != all {
                if i + 1 < children.len() {
                    let kind = if all { "AND" } else { "OR" };
                    trace.record(|| format!("{}: {} 短路 - 子节点 {}", path, kind, i));
                }
                return Ok(matched);
            }
        }

        Ok(all)
    }

    fn eval_leaf(
        &self,
        record: &Value,
        node: &RuleNode,
        trace: &mut Trace,
        path: &str,
    ) -> Result<bool> {
        match node {
            RuleNode::Object(fields) if fields.is_composite() => {
                Ok(self.eval_node(record, node, trace, path))
            }
            RuleNode::Object(fields) => self.compare(record, fields, trace, path),
            // 数组没有 key，按字段缺失处理
            RuleNode::Malformed(Value::Array(_)) => {
                trace.record(|| format!("{}: 缺少 key => NOT_MATCHED", path));
                Ok(false)
            }
            RuleNode::Malformed(value) => Err(RuleError::MalformedNode(format!(
                "节点应为对象, 实际为 {}",
                type_name(value)
            ))),
        }
    }

    /// 单个 key / op / value 比较
    fn compare(
        &self,
        record: &Value,
        fields: &NodeFields,
        trace: &mut Trace,
        path: &str,
    ) -> Result<bool> {
        let key = match &fields.key {
            Some(Value::String(key)) => key.as_str(),
            Some(other) => {
                return Err(RuleError::MalformedNode(format!(
                    "key 应为字符串, 实际为 {}",
                    type_name(other)
                )));
            }
            None => {
                trace.record(|| format!("{}: 缺少 key => NOT_MATCHED", path));
                return Ok(false);
            }
        };

        let Some(input) = self.accessor.resolve(record, key) else {
            debug!(key, "无法从记录中取得字段，按不匹配处理");
            trace.record(|| format!("{}: {} 字段不存在 => NOT_MATCHED", path, key));
            return Ok(false);
        };

        let (symbol, op) = self.lookup(fields.op.as_ref(), key);
        let expected = fields.value.as_ref().unwrap_or(&Value::Null);

        let matched = op(input, expected)?;

        trace.record(|| {
            format!(
                "{}: {} {} {} => {}",
                path,
                key,
                symbol,
                expected,
                if matched { "MATCHED" } else { "NOT_MATCHED" }
            )
        });

        Ok(matched)
    }

    /// 查找操作符，未指定或未注册时使用回退操作符
    fn lookup<'s>(&'s self, op: Option<&'s Value>, key: &str) -> (&'s str, &'s OperatorFn) {
        let Some(requested) = op else {
            return (self.fallback_symbol.as_str(), &self.fallback);
        };

        if let Some(symbol) = requested.as_str() {
            if let Some(found) = self.operators.get(symbol) {
                return (symbol, found);
            }
        }

        debug!(
            key,
            op = %requested,
            fallback = %self.fallback_symbol,
            "未找到操作符，使用回退操作符"
        );
        (self.fallback_symbol.as_str(), &self.fallback)
    }
}

impl<A: fmt::Debug> fmt::Debug for Engine<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("operators", &self.operators)
            .field("fallback", &self.fallback_symbol)
            .field("accessor", &self.accessor)
            .field("trace_enabled", &self.trace_enabled)
            .finish()
    }
}

/// 单次评估的追踪记录，关闭时不分配
struct Trace {
    lines: Option<Vec<String>>,
}

impl Trace {
    fn off() -> Self {
        Self { lines: None }
    }

    fn on() -> Self {
        Self {
            lines: Some(Vec::new()),
        }
    }

    fn record(&mut self, line: impl FnOnce() -> String) {
        if let Some(lines) = &mut self.lines {
            lines.push(line());
        }
    }

    /// 子节点路径，仅在追踪开启时拼接
    fn child(&self, path: &str, suffix: fmt::Arguments<'_>) -> String {
        if self.lines.is_some() {
            format!("{}{}", path, suffix)
        } else {
            String::new()
        }
    }

    fn into_lines(self) -> Vec<String> {
        self.lines.unwrap_or_default()
    }
}

//! 谓词规则引擎
//!
//! 判断一条数据记录是否满足声明式规则，支持：
//! - 点号路径取值（`user.profile.age`）
//! - 可替换的操作符表（内置 `=` `!=` `>` `>=` `<` `<=` `~` `^` `$`）
//! - every / some / not 组合与短路求值
//! - 评估追踪
//!
//! ```
//! use predicate_engine::{Engine, RuleSet};
//! use serde_json::json;
//!
//! let engine = Engine::new();
//! let record = json!({"clicks": 2, "another": 77});
//! let rules = RuleSet::from_value(&json!({
//!     "every": [{"key": "clicks", "op": "<", "value": 10}],
//!     "some": [{"key": "another", "op": ">", "value": 10}]
//! }));
//!
//! assert!(engine.evaluate(&record, &rules));
//! ```

pub mod accessor;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod models;
pub mod operators;

pub use accessor::{DottedPathAccessor, FieldAccessor};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{Result, RuleError};
pub use evaluator::ConditionEvaluator;
pub use models::{Branch, Clause, Evaluation, NodeFields, RuleNode, RuleSet};
pub use operators::{FALLBACK_OPERATOR, Operator, OperatorFn, OperatorTable};

//! 规则引擎错误类型
//!
//! 运行期的数据问题（字段缺失、操作符执行失败、节点结构异常）只在引擎内部流转，
//! 在节点边界折叠为 `false`；只有操作符表缺少回退操作符会暴露给调用方。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("操作符 {operator} 类型不匹配: 期望 {expected}, 实际 {actual}")]
    TypeMismatch {
        operator: String,
        expected: String,
        actual: String,
    },

    #[error("操作符 {operator} 执行失败: {message}")]
    OperatorFailed { operator: String, message: String },

    #[error("规则节点结构无效: {0}")]
    MalformedNode(String),

    #[error("操作符表缺少回退操作符: {0}")]
    MissingFallbackOperator(String),

    #[error("配置加载失败: {0}")]
    Config(#[from] config::ConfigError),

    #[error("JSON 序列化错误: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl RuleError {
    /// 自定义操作符报告失败时使用
    pub fn operator_failed(operator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OperatorFailed {
            operator: operator.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RuleError>;

//! 条件评估器
//!
//! 内置操作符的比较逻辑。相等与大小比较遵循宽松的类型转换规则，
//! 字符串操作符要求输入为字符串，类型不符时返回 `TypeMismatch`。

use crate::error::{Result, RuleError};
use crate::operators::Operator;
use serde_json::Value;
use std::borrow::Cow;
use std::cmp::Ordering;

/// 条件评估器
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// 评估内置操作符
    ///
    /// # Arguments
    /// * `field_value` - 从记录中解析出的字段值
    /// * `operator` - 操作符
    /// * `expected_value` - 规则中定义的期望值
    pub fn evaluate(field_value: &Value, operator: Operator, expected_value: &Value) -> Result<bool> {
        match operator {
            Operator::Eq => Ok(Self::loose_eq(field_value, expected_value)),
            Operator::Neq => Ok(!Self::strict_eq(field_value, expected_value)),
            Operator::Gt => Ok(Self::compare(field_value, expected_value, Ordering::is_gt)),
            Operator::Gte => Ok(Self::compare(field_value, expected_value, Ordering::is_ge)),
            Operator::Lt => Ok(Self::compare(field_value, expected_value, Ordering::is_lt)),
            Operator::Lte => Ok(Self::compare(field_value, expected_value, Ordering::is_le)),
            Operator::Contains => Self::contains(field_value, expected_value),
            Operator::StartsWith => Self::starts_with(field_value, expected_value),
            Operator::EndsWith => Self::ends_with(field_value, expected_value),
        }
    }

    /// 宽松相等
    ///
    /// 两个字符串按内容比较；数值、布尔和数字字符串统一转为浮点数比较（`40 == "40"`）；
    /// `null` 只等于 `null`；数组和对象按结构比较。
    pub fn loose_eq(field: &Value, expected: &Value) -> bool {
        match (field, expected) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => {
                field == expected
            }
            _ => match (Self::as_f64(field), Self::as_f64(expected)) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    /// 严格相等：类型不同即不相等，数值按大小比较（`40 == 40.0`）
    pub fn strict_eq(field: &Value, expected: &Value) -> bool {
        match (field, expected) {
            (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
            _ => field == expected,
        }
    }

    /// 大小比较
    ///
    /// 两个字符串按字典序比较，其余情况转为数值比较；无法转换时结果为 false。
    fn compare<F>(field: &Value, expected: &Value, cmp: F) -> bool
    where
        F: Fn(Ordering) -> bool,
    {
        if let (Value::String(a), Value::String(b)) = (field, expected) {
            return cmp(a.as_str().cmp(b.as_str()));
        }

        match (Self::as_f64(field), Self::as_f64(expected)) {
            (Some(a), Some(b)) => a.partial_cmp(&b).is_some_and(cmp),
            _ => false,
        }
    }

    /// 字符串子串 / 数组元素包含
    fn contains(field: &Value, expected: &Value) -> Result<bool> {
        match field {
            Value::String(s) => {
                let needle = Self::text_operand(Operator::Contains, expected)?;
                Ok(s.contains(needle.as_ref()))
            }
            Value::Array(arr) => Ok(arr.iter().any(|item| Self::strict_eq(item, expected))),
            _ => Err(Self::mismatch(Operator::Contains, "string or array", field)),
        }
    }

    /// 字符串前缀检查
    fn starts_with(field: &Value, expected: &Value) -> Result<bool> {
        let s = field
            .as_str()
            .ok_or_else(|| Self::mismatch(Operator::StartsWith, "string", field))?;
        let prefix = Self::text_operand(Operator::StartsWith, expected)?;

        Ok(s.starts_with(prefix.as_ref()))
    }

    /// 字符串后缀检查
    fn ends_with(field: &Value, expected: &Value) -> Result<bool> {
        let s = field
            .as_str()
            .ok_or_else(|| Self::mismatch(Operator::EndsWith, "string", field))?;
        let suffix = Self::text_operand(Operator::EndsWith, expected)?;

        Ok(s.ends_with(suffix.as_ref()))
    }

    /// 字符串操作符的期望值，数值、布尔和 `null` 转为文本
    fn text_operand(operator: Operator, value: &Value) -> Result<Cow<'_, str>> {
        match value {
            Value::String(s) => Ok(Cow::Borrowed(s.as_str())),
            Value::Number(n) => Ok(Cow::Owned(n.to_string())),
            Value::Bool(b) => Ok(Cow::Owned(b.to_string())),
            Value::Null => Ok(Cow::Borrowed("null")),
            _ => Err(Self::mismatch(operator, "string", value)),
        }
    }

    /// 尝试将 Value 转换为 f64
    ///
    /// 布尔转为 1/0，`null` 和空白字符串转为 0。
    fn as_f64(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Null => Some(0.0),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Some(0.0)
                } else {
                    trimmed.parse().ok()
                }
            }
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    fn mismatch(operator: Operator, expected: &str, actual: &Value) -> RuleError {
        RuleError::TypeMismatch {
            operator: operator.to_string(),
            expected: expected.to_string(),
            actual: type_name(actual).to_string(),
        }
    }
}

/// 获取值的类型名称
pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eval(field: Value, operator: Operator, expected: Value) -> Result<bool> {
        ConditionEvaluator::evaluate(&field, operator, &expected)
    }

    #[test]
    fn test_eq_numbers() {
        assert!(eval(json!(100), Operator::Eq, json!(100)).unwrap());
        assert!(eval(json!(100.0), Operator::Eq, json!(100)).unwrap());
        assert!(!eval(json!(41), Operator::Eq, json!(40)).unwrap());
    }

    #[test]
    fn test_eq_coerces_numeric_strings() {
        assert!(eval(json!("40"), Operator::Eq, json!(40)).unwrap());
        assert!(eval(json!(1), Operator::Eq, json!(true)).unwrap());
        // 两个字符串不做数值转换
        assert!(!eval(json!("40"), Operator::Eq, json!("40.0")).unwrap());
    }

    #[test]
    fn test_eq_null() {
        assert!(eval(json!(null), Operator::Eq, json!(null)).unwrap());
        assert!(!eval(json!(null), Operator::Eq, json!(0)).unwrap());
        assert!(!eval(json!(0), Operator::Eq, json!(null)).unwrap());
    }

    #[test]
    fn test_eq_strings() {
        assert!(eval(json!("hello"), Operator::Eq, json!("hello")).unwrap());
        assert!(!eval(json!("hello"), Operator::Eq, json!("world")).unwrap());
    }

    #[test]
    fn test_neq_is_strict() {
        assert!(eval(json!(41), Operator::Neq, json!(40)).unwrap());
        assert!(!eval(json!(40), Operator::Neq, json!(40)).unwrap());
        assert!(!eval(json!(40.0), Operator::Neq, json!(40)).unwrap());
        assert!(eval(json!("40"), Operator::Neq, json!(40)).unwrap());
    }

    #[test]
    fn test_numeric_comparisons() {
        assert!(eval(json!(100), Operator::Gt, json!(50)).unwrap());
        assert!(eval(json!(100), Operator::Gte, json!(100)).unwrap());
        assert!(eval(json!(50), Operator::Lt, json!(100)).unwrap());
        assert!(eval(json!(100), Operator::Lte, json!(100)).unwrap());
        assert!(!eval(json!(12), Operator::Gt, json!(40)).unwrap());
        assert!(!eval(json!(1224), Operator::Lte, json!(40)).unwrap());
    }

    #[test]
    fn test_string_ordering() {
        assert!(eval(json!("b"), Operator::Gt, json!("a")).unwrap());
        // 字典序而非数值序
        assert!(eval(json!("10"), Operator::Lt, json!("9")).unwrap());
        assert!(eval(json!("10"), Operator::Gt, json!(9)).unwrap());
    }

    #[test]
    fn test_incomparable_is_false() {
        assert!(!eval(json!(40), Operator::Gt, json!("abc")).unwrap());
        assert!(!eval(json!(40), Operator::Lt, json!("abc")).unwrap());
        assert!(!eval(json!({"a": 1}), Operator::Gte, json!(0)).unwrap());
    }

    #[test]
    fn test_contains_string() {
        assert!(eval(json!("this is amazing"), Operator::Contains, json!("is")).unwrap());
        assert!(!eval(json!("this is amazing"), Operator::Contains, json!("what")).unwrap());
        assert!(eval(json!("room 101"), Operator::Contains, json!(101)).unwrap());
    }

    #[test]
    fn test_contains_array() {
        assert!(eval(json!(["a", "b", "c"]), Operator::Contains, json!("b")).unwrap());
        assert!(!eval(json!([1, 2, 3]), Operator::Contains, json!("2")).unwrap());
    }

    #[test]
    fn test_contains_type_mismatch() {
        let err = eval(json!(40), Operator::Contains, json!("4")).unwrap_err();
        assert!(matches!(err, RuleError::TypeMismatch { .. }));
    }

    #[test]
    fn test_starts_with() {
        assert!(eval(json!("this is amazing"), Operator::StartsWith, json!("this")).unwrap());
        assert!(!eval(json!("this is amazing"), Operator::StartsWith, json!("amazing")).unwrap());
    }

    #[test]
    fn test_ends_with() {
        assert!(eval(json!("this is amazing"), Operator::EndsWith, json!("amazing")).unwrap());
        assert!(!eval(json!("this is amazing"), Operator::EndsWith, json!("this")).unwrap());
    }

    #[test]
    fn test_string_operators_reject_non_strings() {
        assert!(eval(json!(40), Operator::StartsWith, json!("4")).is_err());
        assert!(eval(json!(["a"]), Operator::EndsWith, json!("a")).is_err());
        assert!(eval(json!("abc"), Operator::EndsWith, json!(["c"])).is_err());
    }

    #[test]
    fn test_null_operand_as_text() {
        assert!(eval(json!("xnull"), Operator::EndsWith, json!(null)).unwrap());
        assert!(eval(json!("nullable"), Operator::StartsWith, json!(null)).unwrap());
        assert!(!eval(json!("abc"), Operator::Contains, json!(null)).unwrap());
        // 数组输入仍按元素比较
        assert!(eval(json!([1, null]), Operator::Contains, json!(null)).unwrap());
    }
}

//! 嵌套字段访问器
//!
//! 按点号分隔的路径从记录中取值，路径无法解析时返回 `None`。

use serde_json::Value;

/// 字段访问器
///
/// 引擎只依赖这个 trait，调用方可以替换为自己的取值策略。
pub trait FieldAccessor: Send + Sync {
    /// 解析路径，`None` 表示字段不存在
    fn resolve<'a>(&self, record: &'a Value, path: &str) -> Option<&'a Value>;
}

/// 默认访问器：`"user.profile.age"` 逐级进入对象
///
/// 不支持数组下标和通配符，中间值不是对象时视为字段不存在。
#[derive(Debug, Clone, Copy, Default)]
pub struct DottedPathAccessor;

impl FieldAccessor for DottedPathAccessor {
    fn resolve<'a>(&self, record: &'a Value, path: &str) -> Option<&'a Value> {
        let mut current = record;

        for segment in path.split('.') {
            match current {
                Value::Object(map) => {
                    current = map.get(segment)?;
                }
                _ => return None,
            }
        }

        Some(current)
    }
}

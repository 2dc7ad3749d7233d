//! 引擎配置
//!
//! 加载顺序（后加载的覆盖先加载的）：
//! 1. config/default.toml
//! 2. config/predicate-engine.toml
//! 3. 环境变量（PREDICATE_ 前缀，如 PREDICATE_FALLBACK_OPERATOR）
//!
//! 配置目录可通过 `CONFIG_DIR` 指定，文件均为可选。

use crate::error::Result;
use crate::operators::FALLBACK_OPERATOR;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;

const CONFIG_NAME: &str = "predicate-engine";

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// 未指定或未注册操作符时使用的符号，默认 `=`
    ///
    /// 只对 `Engine::from_config` 生效；`Engine::new` 和 `Engine::with_operators`
    /// 固定使用 `=`。
    #[serde(default = "default_fallback_operator")]
    pub fallback_operator: String,

    /// 是否在 debug 日志中输出每一步的评估追踪
    #[serde(default)]
    pub trace: bool,
}

fn default_fallback_operator() -> String {
    FALLBACK_OPERATOR.to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fallback_operator: default_fallback_operator(),
            trace: false,
        }
    }
}

impl EngineConfig {
    /// 从配置文件和环境变量加载
    pub fn load() -> Result<Self> {
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
        Self::load_from(Path::new(&config_dir))
    }

    /// 从指定目录加载
    pub fn load_from(config_dir: &Path) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(
                File::from(config_dir.join(format!("{}.toml", CONFIG_NAME))).required(false),
            )
            // 字段名本身含下划线，层级分隔符使用双下划线
            .add_source(
                Environment::with_prefix("PREDICATE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// 从 TOML 文本加载，缺省字段使用默认值
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.fallback_operator, "=");
        assert!(!config.trace);
    }

    #[test]
    fn test_from_toml_str() {
        let config = EngineConfig::from_toml_str(
            r#"
            fallback_operator = "~"
            trace = true
            "#,
        )
        .unwrap();

        assert_eq!(config.fallback_operator, "~");
        assert!(config.trace);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = EngineConfig::from_toml_str("trace = true").unwrap();
        assert_eq!(config.fallback_operator, "=");
        assert!(config.trace);
    }

    #[test]
    fn test_load_from_missing_dir() {
        let config = EngineConfig::load_from(Path::new("does/not/exist")).unwrap();
        assert!(!config.trace);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(EngineConfig::from_toml_str("trace = [").is_err());
    }
}

//! 容器配置

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// 容器行为开关
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// 为 true 时 `get` 拒绝私有服务；引用解析不受影响
    pub strict_visibility: bool,
    /// 为 false 时首次 `get` 不会隐式编译，而是返回 `NotCompiled`
    pub auto_compile: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            strict_visibility: false,
            auto_compile: true,
        }
    }
}

impl ContainerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn strict() -> Self {
        Self {
            strict_visibility: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ContainerConfig::default();
        assert!(!config.strict_visibility);
        assert!(config.auto_compile);
    }

    #[test]
    fn test_from_toml_fills_missing_fields() {
        let config = ContainerConfig::from_toml_str("strict_visibility = true").unwrap();
        assert!(config.strict_visibility);
        assert!(config.auto_compile);

        let config = ContainerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ContainerConfig::default());
    }

    #[test]
    fn test_from_toml_rejects_bad_types() {
        let result = ContainerConfig::from_toml_str("auto_compile = \"yes\"");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }
}

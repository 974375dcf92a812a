//! TOML / JSON 编解码
//!
//! 两种格式共享同一个 serde 模型，缺省字段由 `contracts` 中的 `#[serde(default)]` 补齐。

use std::path::Path;

use contracts::{ContractError, StabilizerBlueprint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// 按扩展名识别，大小写不敏感
    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.eq_ignore_ascii_case("toml") {
            Some(Self::Toml)
        } else if ext.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else {
            None
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ContractError> {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return Err(ContractError::config_parse(format!(
                "{} has no extension, expected .toml or .json",
                path.display()
            )));
        };
        Self::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    fn name(self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
        }
    }

    fn parse_error<E>(self, e: E) -> ContractError
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ContractError::ConfigParse {
            message: format!("{} parse error: {e}", self.name()),
            source: Some(Box::new(e)),
        }
    }

    pub fn parse(self, content: &str) -> Result<StabilizerBlueprint, ContractError> {
        match self {
            Self::Toml => toml::from_str(content).map_err(|e| self.parse_error(e)),
            Self::Json => serde_json::from_str(content).map_err(|e| self.parse_error(e)),
        }
    }

    pub fn serialize(self, blueprint: &StabilizerBlueprint) -> Result<String, ContractError> {
        let out = match self {
            Self::Toml => toml::to_string_pretty(blueprint).map_err(|e| e.to_string()),
            Self::Json => serde_json::to_string_pretty(blueprint).map_err(|e| e.to_string()),
        };
        out.map_err(|e| ContractError::config_parse(format!("{} serialize error: {e}", self.name())))
    }
}

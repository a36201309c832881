//! # Config Loader
//!
//! 导出任务文件 (TOML / JSON) 的解析与校验，产出 `ExportBlueprint`。
//! CLI 先把任务文件与命令行参数合并，再调用 [`ConfigLoader::validate`]。
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("export.toml")).unwrap();
//! println!("log: {}", blueprint.input.path.display());
//! ```

mod parser;
mod validator;

pub use contracts::ExportBlueprint;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Export job loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a job file, picking the format from its extension (`.toml` / `.json`)
    ///
    /// # Errors
    /// Unreadable file, unknown extension, parse or validation failure.
    pub fn load_from_path(path: &Path) -> Result<ExportBlueprint, ContractError> {
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ConfigFormat::from_extension)
            .ok_or_else(|| {
                ContractError::config_parse(format!(
                    "{}: expected a .toml or .json job file",
                    path.display()
                ))
            })?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Parse and validate job text
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<ExportBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Validate a blueprint assembled elsewhere (e.g. from CLI flags)
    pub fn validate(blueprint: &ExportBlueprint) -> Result<(), ContractError> {
        validator::validate(blueprint)
    }

    pub fn to_toml(blueprint: &ExportBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("cannot write job as TOML: {e}")))
    }

    pub fn to_json(blueprint: &ExportBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("cannot write job as JSON: {e}")))
    }
}

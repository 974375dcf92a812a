//! # Config Loader
//!
//! Reads a gimbal config file into a [`StabilizerBlueprint`] and rejects
//! values the stabilizer cannot run with (see [`validate`]).
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("config.toml")).unwrap();
//! println!("Line delay: {}", blueprint.camera.line_delay_s);
//! ```

mod parser;
mod validator;

pub use contracts::StabilizerBlueprint;
pub use parser::ConfigFormat;
pub use validator::validate;

use contracts::ContractError;
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Format comes from the file extension (`.toml` or `.json`)
    pub fn load_from_path(path: &Path) -> Result<StabilizerBlueprint, ContractError> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Parse then validate
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<StabilizerBlueprint, ContractError> {
        let blueprint = format.parse(content)?;
        validate(&blueprint)?;
        Ok(blueprint)
    }

    pub fn to_toml(blueprint: &StabilizerBlueprint) -> Result<String, ContractError> {
        ConfigFormat::Toml.serialize(blueprint)
    }

    pub fn to_json(blueprint: &StabilizerBlueprint) -> Result<String, ContractError> {
        ConfigFormat::Json.serialize(blueprint)
    }
}

//! Configuration management for the CLI
//!
//! Configuration is layered, later sources overriding earlier ones field by
//! field:
//! - Default values
//! - The user config file (`<config dir>/cloudshift/config.{yaml,json,toml}`)
//! - A project file in the working directory (`.cloudshift.{yaml,json,toml}`)
//! - The file named by `--config` or `CLOUDSHIFT_CONFIG`
//!
//! Command-line flags are applied on top by the handlers.

use crate::cli::OutputFormat;
use crate::error::{Error, Result};
use cloudshift_core::EngineOptions;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Extensions accepted for config files, in lookup order
const EXTENSIONS: [&str; 3] = ["yaml", "json", "toml"];

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub defaults: DefaultsConfig,
    pub catalog: CatalogConfig,
    pub engine: EngineConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Provider pair used when `--from`/`--to` are omitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub source: String,
    pub target: Option<String>,
}

/// Where rules come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Include the catalog compiled into the binary
    pub builtin: bool,

    /// Extra catalog files or directories, merged after the bundled catalog
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Budget for each adapter-bound stage of one file
    pub adapter_timeout_ms: u64,

    /// Files transformed at the same time
    pub max_concurrent_files: usize,
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format (human, json, yaml, json-pretty)
    pub format: String,

    /// Use colored output by default
    pub color: bool,

    /// Show progress indicators
    pub progress: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level used when no `-v` flag is given
    pub level: Option<String>,

    /// Log format (compact, full, json)
    pub format: Option<String>,

    /// Log file path
    pub file: Option<PathBuf>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            source: "aws".to_string(),
            target: None,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            builtin: true,
            paths: Vec::new(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            adapter_timeout_ms: EngineOptions::default().adapter_timeout.as_millis() as u64,
            max_concurrent_files: 4,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "human".to_string(),
            color: true,
            progress: true,
        }
    }
}

impl Config {
    /// Load configuration from a file, choosing the format by extension
    pub fn from_file(path: &Path) -> Result<Self> {
        let value = read_value(path)?;
        Self::from_value(value)
    }

    /// Load the layered configuration, with `file` as the top layer
    pub fn load_with_file(file: Option<&Path>) -> Result<Self> {
        let mut merged = Value::Object(Default::default());

        let mut layers: Vec<PathBuf> = Vec::new();
        layers.extend(Self::user_config_path().filter(|p| p.exists()));
        layers.extend(Self::find_project_config());
        if let Some(path) = file {
            if !path.exists() {
                return Err(Error::FileNotFound {
                    path: path.to_path_buf(),
                });
            }
            layers.push(path.to_path_buf());
        }

        for path in &layers {
            tracing::debug!(path = %path.display(), "Reading config layer");
            merge_values(&mut merged, read_value(path)?);
        }

        let config = Self::from_value(merged)?;
        config.validate()?;
        Ok(config)
    }

    fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::config(format!("Invalid configuration: {}", e)))
    }

    /// User configuration file, whether or not it exists
    pub fn user_config_path() -> Option<PathBuf> {
        let dir = dirs::config_dir()?.join("cloudshift");
        let existing = EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("config.{}", ext)))
            .find(|p| p.exists());
        Some(existing.unwrap_or_else(|| dir.join("config.yaml")))
    }

    /// Project configuration file in the working directory, if any
    pub fn find_project_config() -> Option<PathBuf> {
        EXTENSIONS
            .iter()
            .map(|ext| PathBuf::from(format!(".cloudshift.{}", ext)))
            .find(|p| p.exists())
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.engine.adapter_timeout_ms == 0 {
            return Err(Error::config("engine.adapter_timeout_ms cannot be zero"));
        }
        if self.engine.max_concurrent_files == 0 {
            return Err(Error::config("engine.max_concurrent_files cannot be zero"));
        }
        self.output_format()?;
        Ok(())
    }

    /// Configured output format
    pub fn output_format(&self) -> Result<OutputFormat> {
        self.output
            .format
            .parse()
            .map_err(|e| Error::config(format!("output.format: {}", e)))
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions::default()
            .with_adapter_timeout(Duration::from_millis(self.engine.adapter_timeout_ms))
    }

    /// Serialize in the format implied by the extension of `path`
    pub fn to_string_for(&self, path: &Path) -> Result<String> {
        match extension(path) {
            "json" => Ok(serde_json::to_string_pretty(self)?),
            "toml" => toml::to_string_pretty(self)
                .map_err(|e| Error::config(format!("Failed to serialize as TOML: {}", e))),
            _ => Ok(serde_yaml::to_string(self)?),
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_string_for(path)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|s| s.to_str()).unwrap_or("")
}

/// Parse a config file into a generic value
fn read_value(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)?;
    let value: Value = match extension(path) {
        "yaml" | "yml" => serde_yaml::from_str(&content)?,
        "json" => serde_json::from_str(&content)?,
        "toml" => toml::from_str(&content)
            .map_err(|e| Error::config(format!("{}: {}", path.display(), e)))?,
        other => {
            return Err(Error::config(format!(
                "{}: unsupported config format '{}' (expected yaml, json or toml)",
                path.display(),
                other
            )))
        }
    };
    // An empty YAML file parses as null
    Ok(match value {
        Value::Null => Value::Object(Default::default()),
        value => value,
    })
}

/// Overlay `other` onto `base`, recursing into objects
fn merge_values(base: &mut Value, other: Value) {
    match (base, other) {
        (Value::Object(base), Value::Object(other)) => {
            for (key, value) in other {
                match base.get_mut(&key) {
                    Some(slot) => merge_values(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.defaults.source, "aws");
        assert!(config.catalog.builtin);
        assert_eq!(config.engine.adapter_timeout_ms, 5000);
        assert_eq!(config.output_format().unwrap(), OutputFormat::Human);
        config.validate().unwrap();
    }

    #[test]
    fn test_formats_by_extension() {
        let temp_dir = TempDir::new().unwrap();
        let yaml = temp_dir.path().join("a.yaml");
        fs::write(&yaml, "defaults:\n  target: azure\nengine:\n  max_concurrent_files: 2\n").unwrap();
        let toml_path = temp_dir.path().join("a.toml");
        fs::write(&toml_path, "[defaults]\ntarget = \"gcp\"\n").unwrap();
        let json_path = temp_dir.path().join("a.json");
        fs::write(&json_path, r#"{"output": {"format": "json"}}"#).unwrap();

        let config = Config::from_file(&yaml).unwrap();
        assert_eq!(config.defaults.target.as_deref(), Some("azure"));
        assert_eq!(config.engine.max_concurrent_files, 2);
        assert_eq!(config.engine.adapter_timeout_ms, 5000);

        assert_eq!(
            Config::from_file(&toml_path).unwrap().defaults.target.as_deref(),
            Some("gcp")
        );
        assert_eq!(
            Config::from_file(&json_path).unwrap().output_format().unwrap(),
            OutputFormat::Json
        );

        let ini = temp_dir.path().join("a.ini");
        fs::write(&ini, "x=1").unwrap();
        assert!(Config::from_file(&ini).is_err());
    }

    #[test]
    fn test_merge_is_field_by_field() {
        let mut base = json!({"defaults": {"source": "aws", "target": "azure"}, "engine": {"max_concurrent_files": 8}});
        merge_values(&mut base, json!({"defaults": {"target": "gcp"}}));
        assert_eq!(
            base,
            json!({"defaults": {"source": "aws", "target": "gcp"}, "engine": {"max_concurrent_files": 8}})
        );
    }

    #[test]
    fn test_explicit_file_must_exist_and_validate() {
        let temp_dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::load_with_file(Some(&temp_dir.path().join("missing.yaml"))),
            Err(Error::FileNotFound { .. })
        ));

        let bad = temp_dir.path().join("bad.yaml");
        fs::write(&bad, "engine:\n  adapter_timeout_ms: 0\n").unwrap();
        assert!(matches!(
            Config::load_with_file(Some(&bad)),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_save_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.defaults.target = Some("azure".to_string());
        config.catalog.paths.push(PathBuf::from("extra"));

        for name in ["c.yaml", "c.json", "c.toml"] {
            let path = temp_dir.path().join("nested").join(name);
            config.save(&path).unwrap();
            assert_eq!(Config::from_file(&path).unwrap(), config, "{}", name);
        }
    }

    #[test]
    fn test_engine_options() {
        let mut config = Config::default();
        config.engine.adapter_timeout_ms = 250;
        assert_eq!(
            config.engine_options().adapter_timeout,
            Duration::from_millis(250)
        );
    }
}

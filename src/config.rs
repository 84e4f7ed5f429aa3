//! Configuration management
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (shapes.toml)
//! - Environment variables (SHAPES__*)
//!
//! ## Example config file (shapes.toml):
//! ```toml
//! [synthesis]
//! max_depth = 5
//! max_fragments = 5000
//!
//! [validation]
//! max_depth = 64
//! max_diagnostics = 10000
//!
//! [export]
//! output_format = "pretty"
//! include_digest = true
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fragments::{SynthesisOptions, DEFAULT_MAX_DEPTH as DEFAULT_SYNTHESIS_DEPTH};
use crate::validate::{ValidationOptions, DEFAULT_MAX_DEPTH as DEFAULT_VALIDATION_DEPTH};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShapesConfig {
    /// Fragment synthesis settings
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Validator settings
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Output settings for the binaries
    #[serde(default)]
    pub export: ExportConfig,
}

/// Fragment synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Nested fragments deeper than this degrade to bare field names
    #[serde(default = "default_synthesis_depth")]
    pub max_depth: usize,

    /// Cap on fragments per run (unset = unlimited)
    #[serde(default)]
    pub max_fragments: Option<usize>,
}

/// Validator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Data nested deeper than this is not inspected
    #[serde(default = "default_validation_depth")]
    pub max_depth: usize,

    /// Cap on diagnostics per run (unset = unlimited)
    #[serde(default)]
    pub max_diagnostics: Option<usize>,
}

/// Export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Output format (pretty or compact)
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Include the fragment map digest in reports
    #[serde(default = "default_true")]
    pub include_digest: bool,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

impl OutputFormat {
    /// Render a JSON value in this format
    pub fn render<T: Serialize>(&self, value: &T) -> Result<String> {
        let rendered = match self {
            Self::Pretty => serde_json::to_string_pretty(value)?,
            Self::Compact => serde_json::to_string(value)?,
        };
        Ok(rendered)
    }
}

fn default_synthesis_depth() -> usize {
    DEFAULT_SYNTHESIS_DEPTH
}

fn default_validation_depth() -> usize {
    DEFAULT_VALIDATION_DEPTH
}

fn default_true() -> bool {
    true
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            max_depth: default_synthesis_depth(),
            max_fragments: None,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_depth: default_validation_depth(),
            max_diagnostics: None,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::Pretty,
            include_digest: true,
        }
    }
}

impl ShapesConfig {
    /// Load configuration from the default locations, adding a specific file
    /// that must exist
    pub fn load_from(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_locations = ["shapes.toml", ".shapes.toml", "config/shapes.toml"];
        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "graphql-shapes", "shapes") {
            let xdg_config = config_dir.config_dir().join("shapes.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // SHAPES__SYNTHESIS__MAX_DEPTH=3
        builder = builder.add_source(
            Environment::with_prefix("SHAPES")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn synthesis_options(&self) -> SynthesisOptions {
        SynthesisOptions {
            max_depth: self.synthesis.max_depth,
            max_fragments: self.synthesis.max_fragments,
        }
    }

    pub fn validation_options(&self) -> ValidationOptions {
        ValidationOptions {
            max_depth: self.validation.max_depth,
            max_diagnostics: self.validation.max_diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShapeError;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = ShapesConfig::default();
        assert_eq!(config.synthesis.max_depth, 5);
        assert_eq!(config.validation.max_depth, 64);
        assert!(config.synthesis.max_fragments.is_none());
        assert!(config.export.include_digest);
    }

    #[test]
    fn test_serialize_config() {
        let config = ShapesConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[synthesis]"));
        assert!(toml_str.contains("[validation]"));
        assert!(toml_str.contains("[export]"));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[synthesis]\nmax_depth = 2\nmax_fragments = 10\n\n[export]\noutput_format = \"compact\"\n",
        )
        .unwrap();

        let config = ShapesConfig::load_from(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(config.synthesis_options().max_depth, 2);
        assert_eq!(config.synthesis_options().max_fragments, Some(10));
        assert_eq!(config.export.output_format, OutputFormat::Compact);
        assert_eq!(config.validation_options().max_depth, 64);
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(
            ShapesConfig::load_from(Some(path.to_str().unwrap())),
            Err(ShapeError::Config(_))
        ));
    }

    #[test]
    fn test_save_to_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent/shapes.toml");
        assert!(matches!(
            ShapesConfig::default().save(path.to_str().unwrap()),
            Err(ShapeError::Io(_))
        ));
    }

    #[test]
    fn test_render_formats() {
        let value = serde_json::json!({ "a": 1 });
        assert_eq!(OutputFormat::Compact.render(&value).unwrap(), r#"{"a":1}"#);
        assert_eq!(OutputFormat::Pretty.render(&value).unwrap(), "{\n  \"a\": 1\n}");
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let mut config = ShapesConfig::default();
        config.validation.max_diagnostics = Some(25);
        config.save(path.to_str().unwrap()).unwrap();

        let loaded = ShapesConfig::load_from(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(loaded.validation.max_diagnostics, Some(25));
    }
}

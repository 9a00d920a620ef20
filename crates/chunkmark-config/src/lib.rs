use chunkmark_engine::cache::CacheConfig;
use chunkmark_engine::formula::MAX_RASTER_DIMENSION;
use chunkmark_engine::segment::SegmenterConfig;
use chunkmark_engine::style::StyleConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// Formula backends the host wires into the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormulaConfig {
    /// External TeX to SVG command for the fallback path. Receives the TeX on
    /// stdin and writes an SVG document to stdout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub svg_command: Option<String>,
    /// Largest rasterized fallback image, in points along either axis
    pub max_raster_dimension: f32,
}

impl Default for FormulaConfig {
    fn default() -> Self {
        Self {
            svg_command: None,
            max_raster_dimension: MAX_RASTER_DIMENSION,
        }
    }
}

/// Every section has defaults, so a partial file only overrides what it names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub style: StyleConfig,
    pub segmenter: SegmenterConfig,
    pub cache: CacheConfig,
    pub formula: FormulaConfig,
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the converter command
        config.formula.svg_command = config
            .formula
            .svg_command
            .map(|command| Self::expand(&command).unwrap_or(command));

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/chunkmark");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    fn expand(text: &str) -> Option<String> {
        match shellexpand::full(text) {
            Ok(expanded) => Some(expanded.into_owned()),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunkmark_engine::chunk::IdentityPolicy;
    use pretty_assertions::assert_eq;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        // Should not contain tilde anymore
        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/chunkmark/config.toml"));
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut original = Config::default();
        original.style.max_container_width = 480.0;
        original.segmenter.soft_cap = 500;
        original.segmenter.identity = IdentityPolicy::Random;
        original.formula.svg_command = Some("/usr/bin/tex2svg".into());

        let toml_str = toml::to_string(&original).unwrap();
        let deserialized: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(original, deserialized);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
[segmenter]
soft_cap = 100
split_block_quotes = true

[style.code]
highlight = false
"#,
        )
        .unwrap();

        assert_eq!(config.segmenter.soft_cap, 100);
        assert!(config.segmenter.split_block_quotes);
        assert!(!config.segmenter.formula_blocks);
        assert!(!config.style.code.highlight);
        assert_eq!(config.style.max_container_width, StyleConfig::default().max_container_width);
        assert_eq!(config.cache, CacheConfig::default());
        assert_eq!(config.formula, FormulaConfig::default());
    }

    #[test]
    fn test_identity_policy_is_snake_case() {
        let config: Config = toml::from_str("[segmenter]\nidentity = \"random\"\n").unwrap();
        assert_eq!(config.segmenter.identity, IdentityPolicy::Random);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_load_reports_parse_errors_with_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "[segmenter]\nsoft_cap = \"lots\"\n").unwrap();

        let err = Config::load_from_path(&config_file).unwrap_err();

        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested").join("config.toml");
        let mut test_config = Config::default();
        test_config.cache.formula_capacity = 5;

        test_config.save_to_path(&config_file).unwrap();
        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded_config, test_config);
    }

    #[test]
    fn test_svg_command_expands_env_var() {
        unsafe {
            env::set_var("CHUNKMARK_TEST_BIN", "/opt/tex/bin");
        }

        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(
            &config_file,
            "[formula]\nsvg_command = \"$CHUNKMARK_TEST_BIN/tex2svg --inline\"\n",
        )
        .unwrap();

        let config = Config::load_from_path(&config_file).unwrap().unwrap();
        assert_eq!(
            config.formula.svg_command.as_deref(),
            Some("/opt/tex/bin/tex2svg --inline")
        );

        unsafe {
            env::remove_var("CHUNKMARK_TEST_BIN");
        }
    }

    #[test]
    fn test_svg_command_expands_tilde() {
        let expanded = Config::expand("~/bin/tex2svg").unwrap();

        assert!(!expanded.starts_with('~'));
        assert!(expanded.ends_with("bin/tex2svg"));
    }
}

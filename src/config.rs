use std::path::{Path, PathBuf};

use log::debug;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::data::scatter::ScatterParams;
use crate::error::Result;

/// Default location of the application configuration.
pub const CONFIG_FILE: &str = "config.json";

/// Whether cached matrices are stored as exported or scatter-corrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrectionMode {
    #[default]
    Raw,
    Corrected,
}

/// Application configuration (`config.json`). Every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the raw instrument exports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_path: Option<PathBuf>,
    /// Artifact name of the raw cache; the corrected cache prefixes it
    /// with `corrected_`.
    pub cache_filename: String,
    /// Alias file name, looked up inside the data directory.
    pub rename_filename: String,
    /// Scatter removal applied when building the corrected cache. Fields
    /// missing from the file keep their [`ScatterParams::ingestion`] values.
    #[serde(deserialize_with = "scatter_over_ingestion")]
    pub scatter: ScatterParams,
}

fn scatter_over_ingestion<'de, D>(deserializer: D) -> std::result::Result<ScatterParams, D::Error>
where
    D: Deserializer<'de>,
{
    let overrides = serde_json::Map::<String, Value>::deserialize(deserializer)?;
    let mut merged = serde_json::to_value(ScatterParams::ingestion()).map_err(D::Error::custom)?;
    if let Value::Object(fields) = &mut merged {
        fields.extend(overrides);
    }
    serde_json::from_value(merged).map_err(D::Error::custom)
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            data_path: None,
            cache_filename: "rawdata_cache.parquet".to_string(),
            rename_filename: "rename.json".to_string(),
            scatter: ScatterParams::ingestion(),
        }
    }
}

impl AppConfig {
    /// Read a configuration file; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("no config at {}, using defaults", path.display());
            return Ok(AppConfig::default());
        }
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn with_data_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_path = Some(dir.into());
        self
    }

    /// Cache artifact name for `mode`.
    pub fn cache_filename_for(&self, mode: CorrectionMode) -> String {
        match mode {
            CorrectionMode::Raw => self.cache_filename.clone(),
            CorrectionMode::Corrected => format!("corrected_{}", self.cache_filename),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::scatter::{FillMode, TruncateMode};

    #[test]
    fn defaults_match_ingestion_settings() {
        let config = AppConfig::default();
        assert_eq!(config.scatter.excision_width, 25.0);
        assert_eq!(config.scatter.truncate, TruncateMode::Below);
        assert_eq!(config.scatter.fill, FillMode::Interpolate);
        assert_eq!(config.cache_filename_for(CorrectionMode::Raw), "rawdata_cache.parquet");
        assert_eq!(
            config.cache_filename_for(CorrectionMode::Corrected),
            "corrected_rawdata_cache.parquet"
        );
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{ "data_path": "/data/eem" }"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.data_path, Some(PathBuf::from("/data/eem")));
        assert_eq!(config.rename_filename, "rename.json");
    }

    #[test]
    fn partial_scatter_section_keeps_ingestion_values() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "scatter": { "fill": "zeros" } }"#).unwrap();
        assert_eq!(config.scatter.fill, FillMode::Zero);
        assert_eq!(config.scatter.excision_width, 25.0);
        assert_eq!(config.scatter.truncate, TruncateMode::Below);

        let config: AppConfig =
            serde_json::from_str(r#"{ "scatter": { "excision_width": 30.0 } }"#).unwrap();
        assert_eq!(config.scatter.excision_width, 30.0);
        assert_eq!(config.scatter.truncate, TruncateMode::Below);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let config = AppConfig::default().with_data_path("/data/eem");
        config.save(&path).unwrap();
        assert_eq!(AppConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, AppConfig::default());
    }
}

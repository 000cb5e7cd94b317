use std::collections::BTreeMap;
use std::path::Path;

use log::debug;

use crate::error::Result;

/// Display names per source file: `{ "file.csv": { "raw label": "display" } }`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasMap {
    files: BTreeMap<String, BTreeMap<String, String>>,
}

impl AliasMap {
    /// Load the alias file. A missing file yields an empty map.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("no alias file at {}", path.display());
            return Ok(AliasMap::default());
        }
        let text = std::fs::read_to_string(path)?;
        let files = serde_json::from_str(&text)?;
        Ok(AliasMap { files })
    }

    /// Display name for `label` in `file`, falling back to the raw label.
    pub fn resolve<'a>(&'a self, file: &str, label: &'a str) -> &'a str {
        self.files
            .get(file)
            .and_then(|names| names.get(label))
            .map_or(label, String::as_str)
    }
}

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Tunables for a discovery run: how sections map to media types, which
/// sections carry category subdirectories, and the folder cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Sections whose children are categories rather than item folders.
    pub categorized_sections: Vec<String>,
    /// Section name -> media type for the records discovered under it.
    pub media_types: BTreeMap<String, String>,
    /// Media type for sections missing from the table.
    pub default_media_type: String,
    /// Ceiling on discovered item folders per run. Discovery stops once
    /// reached, mid-section if necessary.
    pub folder_cap: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            categorized_sections: vec!["Read to Me Stories".to_string()],
            media_types: default_media_types(),
            default_media_type: "Book".to_string(),
            folder_cap: 1000,
        }
    }
}

impl IngestConfig {
    pub fn media_type_for(&self, section: &str) -> &str {
        self.media_types
            .get(section)
            .unwrap_or(&self.default_media_type)
    }

    pub fn is_categorized(&self, section: &str) -> bool {
        self.categorized_sections.iter().any(|s| s == section)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(Into::into)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(Into::into)
    }
}

fn default_media_types() -> BTreeMap<String, String> {
    [
        ("Read to Me Stories", "Read to Me"),
        ("Video Books", "Video Book"),
        ("Audiobooks", "Audiobook"),
        ("Books", "Book"),
        ("Videos", "Video"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn section_media_types() {
        let config = IngestConfig::default();
        assert_eq!(config.media_type_for("Read to Me Stories"), "Read to Me");
        assert_eq!(config.media_type_for("Video Books"), "Video Book");
        assert_eq!(config.media_type_for("Something Else"), "Book");
    }

    #[test]
    fn categorized_sections() {
        let config = IngestConfig::default();
        assert!(config.is_categorized("Read to Me Stories"));
        assert!(!config.is_categorized("Video Books"));
    }

    #[test]
    fn config_save_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let mut config = IngestConfig::default();
        config.folder_cap = 25;
        config.save(&path).unwrap();

        let loaded = IngestConfig::load(&path).unwrap();
        assert_eq!(loaded.folder_cap, 25);
        assert_eq!(loaded.media_type_for("Videos"), "Video");
    }
}

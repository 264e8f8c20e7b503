use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Keys with this prefix are pipeline bookkeeping and are stripped before
/// anything leaves the merge engine.
pub const INTERNAL_PREFIX: &str = "_";

/// Partial metadata produced by a single extraction strategy.
///
/// Field names are normalized (lowercase, canonical where a synonym table
/// applies); values are plain strings. A fragment makes no completeness
/// guarantee and may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    #[serde(flatten)]
    fields: BTreeMap<String, String>,
}

impl Fragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Insert only when the key is not already present. Extraction
    /// strategies run in priority order, so earlier values win.
    pub fn set_if_absent(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.entry(key.into()).or_insert_with(|| value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.fields.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.fields
    }
}

impl FromIterator<(String, String)> for Fragment {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Asset bucket a file falls into, decided purely by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    Audio,
    Video,
    Text,
    Other,
}

impl AssetKind {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "png" | "jpg" | "jpeg" | "gif" => Self::Image,
            "mp3" | "wav" | "m4a" | "aac" => Self::Audio,
            "mp4" | "mov" | "avi" | "mkv" => Self::Video,
            "txt" | "rtf" | "md" => Self::Text,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Text => "text",
            Self::Other => "other",
        })
    }
}

/// Inventory of the files directly inside an item folder, bucketed by kind.
/// Membership is what matters; buckets are kept sorted so reruns on an
/// unchanged folder produce an identical catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetCatalog {
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub audio: Vec<String>,
    #[serde(default)]
    pub video: Vec<String>,
    #[serde(default)]
    pub text: Vec<String>,
    #[serde(default)]
    pub other: Vec<String>,
}

impl AssetCatalog {
    pub fn insert(&mut self, kind: AssetKind, filename: impl Into<String>) {
        self.bucket_mut(kind).push(filename.into());
    }

    fn bucket_mut(&mut self, kind: AssetKind) -> &mut Vec<String> {
        match kind {
            AssetKind::Image => &mut self.images,
            AssetKind::Audio => &mut self.audio,
            AssetKind::Video => &mut self.video,
            AssetKind::Text => &mut self.text,
            AssetKind::Other => &mut self.other,
        }
    }

    pub fn normalize(&mut self) {
        for bucket in [
            &mut self.images,
            &mut self.audio,
            &mut self.video,
            &mut self.text,
            &mut self.other,
        ] {
            bucket.sort();
            bucket.dedup();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
            && self.audio.is_empty()
            && self.video.is_empty()
            && self.text.is_empty()
            && self.other.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.images.len()
            + self.audio.len()
            + self.video.len()
            + self.text.len()
            + self.other.len()
    }
}

/// One element of the ordered page sequence consumed by a URL-based viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageEntry {
    pub page_number: u32,
    pub file_path: String,
    pub file_name: String,
    pub is_cover: bool,
    #[serde(default)]
    pub is_left_page: bool,
    pub display_name: String,
    /// Number captured from the source naming convention, when the entry
    /// was rebuilt from legacy screenshot names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_number: Option<u32>,
}

/// Side-channel blob persisted alongside a record: where it came from,
/// what was in the folder, and how each field was resolved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    #[serde(default)]
    pub folder_path: String,
    #[serde(default)]
    pub files: AssetCatalog,
    #[serde(default)]
    pub page_sequence: Vec<PageEntry>,
    #[serde(default)]
    pub total_pages: u32,
    /// Field name -> winning source ("custom", "folder", "document",
    /// "filename", "located", "default").
    #[serde(default)]
    pub sources: BTreeMap<String, String>,
}

impl Provenance {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(blob: &str) -> serde_json::Result<Self> {
        serde_json::from_str(blob)
    }

    pub fn cover_entry(&self) -> Option<&PageEntry> {
        self.page_sequence.iter().find(|p| p.is_cover)
    }
}

/// The merged, final representation of one catalog item.
///
/// Title and author are never empty: unresolved fields fall back to the
/// literal "Unknown" during merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub fiction_type: String,
    pub media_type: String,
    pub reading_level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub source_files: Vec<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub date_added: String,
    #[serde(default)]
    pub date_modified: String,
    /// Non-canonical fields carried through from extraction (url, age,
    /// ar_level, lexile, ...), plus anything a custom parser added.
    #[serde(default)]
    pub extras: BTreeMap<String, String>,
    #[serde(default)]
    pub provenance: Provenance,
}

impl BookRecord {
    pub fn extra(&self, key: &str) -> &str {
        self.extras.get(key).map(String::as_str).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_first_value_wins() {
        let mut frag = Fragment::new();
        frag.set_if_absent("title", "First");
        frag.set_if_absent("title", "Second");
        assert_eq!(frag.get("title"), Some("First"));
    }

    #[test]
    fn asset_kind_from_extension() {
        assert_eq!(AssetKind::from_extension("PNG"), AssetKind::Image);
        assert_eq!(AssetKind::from_extension("mp3"), AssetKind::Audio);
        assert_eq!(AssetKind::from_extension("mov"), AssetKind::Video);
        assert_eq!(AssetKind::from_extension("rtf"), AssetKind::Text);
        assert_eq!(AssetKind::from_extension("pdf"), AssetKind::Other);
    }

    #[test]
    fn catalog_normalize_is_deterministic() {
        let mut a = AssetCatalog::default();
        a.insert(AssetKind::Image, "b.png");
        a.insert(AssetKind::Image, "a.png");
        a.normalize();

        let mut b = AssetCatalog::default();
        b.insert(AssetKind::Image, "a.png");
        b.insert(AssetKind::Image, "b.png");
        b.normalize();

        assert_eq!(a, b);
    }

    #[test]
    fn provenance_round_trip_preserves_page_sequence() {
        let prov = Provenance {
            folder_path: "/books/Art/A Gift for Sophie".to_string(),
            page_sequence: vec![
                PageEntry {
                    page_number: 1,
                    file_path: "/books/resized/crop-1.png".to_string(),
                    file_name: "crop-1.png".to_string(),
                    is_cover: true,
                    is_left_page: true,
                    display_name: "Cover".to_string(),
                    source_number: None,
                },
                PageEntry {
                    page_number: 2,
                    file_path: "/books/resized/crop-2.png".to_string(),
                    file_name: "crop-2.png".to_string(),
                    is_cover: false,
                    is_left_page: false,
                    display_name: "Page 2".to_string(),
                    source_number: None,
                },
            ],
            total_pages: 1,
            ..Default::default()
        };

        let blob = prov.to_json().unwrap();
        let parsed = Provenance::from_json(&blob).unwrap();

        assert_eq!(parsed.page_sequence, prov.page_sequence);
        assert_eq!(parsed.cover_entry().unwrap().file_name, "crop-1.png");
    }

    #[test]
    fn empty_sequence_has_no_cover() {
        let prov = Provenance::default();
        assert!(prov.cover_entry().is_none());
    }
}

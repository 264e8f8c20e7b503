use serde::{Deserialize, Serialize};
use std::path::Path;

use bookdex_core::BookRecord;

/// Column names of the external spreadsheet store, in sheet order.
pub const SHEET_COLUMNS: &[&str] = &[
    "Name",
    "Category",
    "Media",
    "Fiction Type",
    "URL",
    "Author",
    "Age",
    "Read time",
    "AR Level",
    "Lexile",
    "GRL",
    "Pages",
    "Audiobook Length",
    "Video Length",
    "Status",
    "Date Added",
    "Date Modified",
];

/// One flat spreadsheet row. Internal (underscore-prefixed) fields never
/// reach this shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SheetRow {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Media")]
    pub media: String,
    #[serde(rename = "Fiction Type")]
    pub fiction_type: String,
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Author")]
    pub author: String,
    #[serde(rename = "Age")]
    pub age: String,
    #[serde(rename = "Read time")]
    pub read_time: String,
    #[serde(rename = "AR Level")]
    pub ar_level: String,
    #[serde(rename = "Lexile")]
    pub lexile: String,
    #[serde(rename = "GRL")]
    pub grl: String,
    #[serde(rename = "Pages")]
    pub pages: String,
    #[serde(rename = "Audiobook Length")]
    pub audiobook_length: String,
    #[serde(rename = "Video Length")]
    pub video_length: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Date Added")]
    pub date_added: String,
    #[serde(rename = "Date Modified")]
    pub date_modified: String,
}

impl SheetRow {
    pub fn from_record(record: &BookRecord) -> Self {
        Self {
            name: record.title.clone(),
            category: if record.category.is_empty() {
                record.genre.clone()
            } else {
                record.category.clone()
            },
            media: record.media_type.clone(),
            fiction_type: record.fiction_type.clone(),
            url: row_url(record),
            author: record.author.clone(),
            age: record.extra("age").to_string(),
            read_time: record.extra("read_time").to_string(),
            ar_level: record.extra("ar_level").to_string(),
            lexile: record.extra("lexile").to_string(),
            grl: record.extra("grl").to_string(),
            pages: record.extra("pages").to_string(),
            audiobook_length: record.extra("audiobook_length").to_string(),
            video_length: record.extra("video_length").to_string(),
            status: record.status.clone(),
            date_added: record.date_added.clone(),
            date_modified: record.date_modified.clone(),
        }
    }

    /// Key the external store uses to spot duplicates.
    pub fn duplicate_key(&self) -> String {
        format!(
            "{}_{}",
            self.name.to_lowercase(),
            self.author.to_lowercase()
        )
    }
}

/// The sheet URL column: an extracted catalog URL when present, else the
/// path of the item's main source file.
fn row_url(record: &BookRecord) -> String {
    let url = record.extra("url");
    if !url.is_empty() {
        return url.to_string();
    }
    record
        .source_files
        .first()
        .map(|name| {
            Path::new(&record.provenance.folder_path)
                .join(name)
                .to_string_lossy()
                .to_string()
        })
        .unwrap_or_default()
}

pub fn to_rows(records: &[BookRecord]) -> Vec<SheetRow> {
    records.iter().map(SheetRow::from_record).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookdex_core::Provenance;

    fn record() -> BookRecord {
        BookRecord {
            title: "A Gift for Sophie".to_string(),
            author: "Jane Doe".to_string(),
            genre: "Unknown".to_string(),
            fiction_type: "Fiction".to_string(),
            media_type: "Read to Me".to_string(),
            reading_level: "Unknown".to_string(),
            cover_image: None,
            description: String::new(),
            section: "Read to Me Stories".to_string(),
            category: "Art".to_string(),
            source_files: vec!["story.mp3".to_string()],
            status: "Active".to_string(),
            date_added: "2024-01-01 00:00:00".to_string(),
            date_modified: "2024-01-01 00:00:00".to_string(),
            extras: [
                ("age".to_string(), "4-7".to_string()),
                ("ar_level".to_string(), "2.5".to_string()),
                ("_internal".to_string(), "never".to_string()),
            ]
            .into_iter()
            .collect(),
            provenance: Provenance {
                folder_path: "/books/Art/A Gift for Sophie".to_string(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn row_maps_named_columns() {
        let row = SheetRow::from_record(&record());
        assert_eq!(row.name, "A Gift for Sophie");
        assert_eq!(row.category, "Art");
        assert_eq!(row.media, "Read to Me");
        assert_eq!(row.author, "Jane Doe");
        assert_eq!(row.age, "4-7");
        assert_eq!(row.ar_level, "2.5");
        assert_eq!(row.status, "Active");
    }

    #[test]
    fn url_falls_back_to_source_file_path() {
        let row = SheetRow::from_record(&record());
        assert_eq!(row.url, "/books/Art/A Gift for Sophie/story.mp3");
    }

    #[test]
    fn internal_fields_never_serialize() {
        let row = SheetRow::from_record(&record());
        let json = serde_json::to_string(&row).unwrap();
        assert!(!json.contains("_internal"));
        assert!(json.contains("\"Name\""));
        assert!(json.contains("\"AR Level\""));
    }

    #[test]
    fn duplicate_key_is_lowercased_name_author() {
        let row = SheetRow::from_record(&record());
        assert_eq!(row.duplicate_key(), "a gift for sophie_jane doe");
    }

    #[test]
    fn empty_category_falls_back_to_genre() {
        let mut rec = record();
        rec.category = String::new();
        rec.genre = "Adventure".to_string();
        let row = SheetRow::from_record(&rec);
        assert_eq!(row.category, "Adventure");
    }
}

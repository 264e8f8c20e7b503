use chrono::Utc;
use std::path::Path;

use bookdex_core::{
    builtin_registry, detect_media_type, detect_reading_level, extract_description,
    extract_metadata, merge_fragments, parse_filename, BookRecord, Fragment, ParseInput,
    ParserRegistry, Provenance,
};

use crate::catalog::{catalog_assets, find_cover};
use crate::config::IngestConfig;
use crate::docmeta;
use crate::pages::page_sequence;
use crate::sidecar;
use crate::walker::{self, Discovery, ItemFolder, SkipNote, WalkError};

/// Everything a completed run returns: the records it could build and
/// the folders/extractors it had to skip. A run never fails because of
/// one bad item.
#[derive(Debug, Default)]
pub struct RunReport {
    pub records: Vec<BookRecord>,
    pub skipped: Vec<SkipNote>,
    pub truncated: bool,
}

/// The ingestion pipeline: walk, extract, merge, attach pages.
///
/// Synchronous and single-threaded; items are processed one at a time
/// and extractors within an item run sequentially. The parser registry
/// is injected at construction and read-only for the lifetime of a run.
pub struct Ingestor {
    config: IngestConfig,
    registry: ParserRegistry,
}

impl Ingestor {
    pub fn new(config: IngestConfig, registry: ParserRegistry) -> Self {
        Self { config, registry }
    }

    /// Default config with the built-in parser strategies.
    pub fn with_defaults() -> Self {
        Self::new(IngestConfig::default(), builtin_registry())
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn discover(&self, root: &Path) -> Result<Discovery, WalkError> {
        walker::discover(root, &self.config)
    }

    /// Run the whole pipeline over a library root.
    pub fn run(&self, root: &Path) -> Result<RunReport, WalkError> {
        let discovery = self.discover(root)?;
        let mut report = RunReport {
            records: Vec::new(),
            skipped: discovery.skipped,
            truncated: discovery.truncated,
        };

        for item in &discovery.items {
            match self.process_item(item, &mut report.skipped) {
                Ok(record) => report.records.push(record),
                Err(e) => report.skipped.push(SkipNote {
                    path: item.path.clone(),
                    reason: e.to_string(),
                }),
            }
        }

        Ok(report)
    }

    /// Build the canonical record for one item folder. Extractor failures
    /// are recorded in `diagnostics` and treated as empty fragments; only
    /// an unreadable folder fails the item.
    pub fn process_item(
        &self,
        item: &ItemFolder,
        diagnostics: &mut Vec<SkipNote>,
    ) -> anyhow::Result<BookRecord> {
        let catalog = catalog_assets(&item.path)?;

        // Primary document, if the folder carries one.
        let primary_doc: Option<String> = catalog
            .other
            .iter()
            .find(|name| docmeta::supported(Path::new(name.as_str())))
            .cloned();

        let folder_fragment = self.folder_fragment(item, primary_doc.as_deref(), diagnostics);

        let document_fragment = primary_doc.as_ref().and_then(|name| {
            let path = item.path.join(name);
            match docmeta::extract_properties(&path) {
                Ok(frag) => Some(frag),
                Err(e) => {
                    diagnostics.push(SkipNote {
                        path,
                        reason: format!("document properties: {}", e),
                    });
                    None
                }
            }
        });

        let folder_name = item
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let basis = primary_doc.clone().unwrap_or_else(|| folder_name.clone());
        let folder_str = item.path.to_string_lossy().to_string();

        let mut filename_fragment = parse_filename(&basis);
        filename_fragment
            .set_if_absent("media_type", detect_media_type(&basis, Some(&folder_str)));
        filename_fragment.set_if_absent(
            "reading_level",
            detect_reading_level(&basis, Some(&folder_str)),
        );

        let custom_fragment =
            self.run_custom_parsers(item, &catalog, primary_doc.as_deref(), diagnostics);

        let outcome = merge_fragments(
            custom_fragment.as_ref(),
            Some(&folder_fragment),
            document_fragment.as_ref(),
            Some(&filename_fragment),
        );
        let mut fields = outcome.fields;
        let mut sources = outcome.sources;

        let cover_image = match fields.remove("cover_image") {
            Some(path) if !path.is_empty() => Some(path),
            _ => find_cover(&item.path, &catalog).map(|path| {
                sources.insert("cover_image".to_string(), "located".to_string());
                path.to_string_lossy().to_string()
            }),
        };

        let pages = page_sequence(&item.path);
        let total_pages = pages.iter().filter(|p| !p.is_cover).count() as u32;
        if total_pages > 0 && fields.get("pages").is_none() {
            fields.set("pages", total_pages.to_string());
        }

        let mut source_files = Vec::new();
        if let Some(doc) = &primary_doc {
            source_files.push(doc.clone());
        }
        if let Some(video) = catalog.video.first() {
            source_files.push(video.clone());
        }
        if let Some(audio) = catalog.audio.first() {
            source_files.push(audio.clone());
        }

        let now = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let take = |fields: &mut Fragment, key: &str| fields.remove(key).unwrap_or_default();

        let record = BookRecord {
            title: take(&mut fields, "title"),
            author: take(&mut fields, "author"),
            genre: take(&mut fields, "genre"),
            fiction_type: take(&mut fields, "fiction_type"),
            media_type: take(&mut fields, "media_type"),
            reading_level: take(&mut fields, "reading_level"),
            cover_image,
            description: take(&mut fields, "description"),
            section: item.section.clone(),
            category: item.category.clone(),
            source_files,
            status: "Active".to_string(),
            date_added: now.clone(),
            date_modified: now,
            extras: fields.into_inner(),
            provenance: Provenance {
                folder_path: folder_str,
                files: catalog,
                page_sequence: pages,
                total_pages,
                sources,
            },
        };

        Ok(record)
    }

    /// Folder-tier metadata: the metadata.json sidecar wins, then the
    /// description file (or embedded document text as a last resort),
    /// then the walker's section-derived media type.
    fn folder_fragment(
        &self,
        item: &ItemFolder,
        primary_doc: Option<&str>,
        diagnostics: &mut Vec<SkipNote>,
    ) -> Fragment {
        let mut fragment = Fragment::new();

        let metadata_json = item.path.join("metadata.json");
        if metadata_json.is_file() {
            match read_metadata_json(&metadata_json) {
                Ok(frag) => {
                    for (key, value) in frag.iter() {
                        fragment.set_if_absent(key, value);
                    }
                }
                Err(e) => diagnostics.push(SkipNote {
                    path: metadata_json,
                    reason: format!("metadata.json: {}", e),
                }),
            }
        }

        if let Some(desc_path) = sidecar::find_description_file(&item.path) {
            match sidecar::load_text(&desc_path) {
                Ok(text) => {
                    for (key, value) in extract_description(&text).iter() {
                        fragment.set_if_absent(key, value);
                    }
                }
                Err(e) => diagnostics.push(SkipNote {
                    path: desc_path,
                    reason: format!("description file: {}", e),
                }),
            }
        } else if let Some(doc) = primary_doc {
            let path = item.path.join(doc);
            if path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("pdf"))
                .unwrap_or(false)
            {
                match sidecar::embedded_text(&path) {
                    Ok(text) if !text.is_empty() => {
                        for (key, value) in extract_metadata(&text).iter() {
                            fragment.set_if_absent(key, value);
                        }
                    }
                    Ok(_) => {}
                    Err(e) => diagnostics.push(SkipNote {
                        path,
                        reason: format!("embedded text: {}", e),
                    }),
                }
            }
        }

        fragment.set_if_absent("media_type", &item.media_type);
        fragment
    }

    fn run_custom_parsers(
        &self,
        item: &ItemFolder,
        catalog: &bookdex_core::AssetCatalog,
        primary_doc: Option<&str>,
        diagnostics: &mut Vec<SkipNote>,
    ) -> Option<Fragment> {
        // Consult the registry with the most identifying sources first:
        // the document, then the main media file, then the description
        // sidecar, then the folder itself. First non-empty fragment wins.
        let mut candidates: Vec<std::path::PathBuf> = Vec::new();
        if let Some(doc) = primary_doc {
            candidates.push(item.path.join(doc));
        }
        if let Some(video) = catalog.video.first() {
            candidates.push(item.path.join(video));
        }
        if let Some(audio) = catalog.audio.first() {
            candidates.push(item.path.join(audio));
        }
        if let Some(sidecar) = sidecar::find_description_file(&item.path) {
            candidates.push(sidecar);
        }
        candidates.push(item.path.clone());

        for candidate in candidates {
            let filename = candidate
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let input = ParseInput::new(&candidate, &filename, Some(&item.path));
            let outcome = self.registry.run(&input);

            for skip in outcome.skipped {
                diagnostics.push(SkipNote {
                    path: item.path.clone(),
                    reason: format!("parser {}: {}", skip.parser, skip.error),
                });
            }
            if outcome.fragment.is_some() {
                return outcome.fragment;
            }
        }

        None
    }

    /// Convenience for a single folder outside a full walk (debugging,
    /// the `inspect` command).
    pub fn process_folder(&self, path: &Path) -> anyhow::Result<(BookRecord, Vec<SkipNote>)> {
        let section = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let media_type = self.config.media_type_for(&section).to_string();
        let item = ItemFolder {
            path: path.to_path_buf(),
            section: section.clone(),
            category: section,
            media_type,
        };

        let mut diagnostics = Vec::new();
        let record = self.process_item(&item, &mut diagnostics)?;
        Ok((record, diagnostics))
    }
}

fn read_metadata_json(path: &Path) -> anyhow::Result<Fragment> {
    let content = std::fs::read_to_string(path)?;
    let value: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&content)?;

    let mut fragment = Fragment::new();
    for (key, value) in value {
        let text = match value {
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            _ => continue,
        };
        let key = key.trim().to_lowercase();
        if !key.is_empty() && !text.trim().is_empty() {
            fragment.set_if_absent(key, text.trim());
        }
    }
    Ok(fragment)
}

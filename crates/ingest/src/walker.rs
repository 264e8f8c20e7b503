use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::IngestConfig;

#[derive(Debug, Error)]
pub enum WalkError {
    #[error("root path does not exist: {0}")]
    RootMissing(PathBuf),
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Whether a candidate folder holds one item or is a collection of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderKind {
    Single,
    Collection,
}

/// A discovered item folder with its section/category provenance.
#[derive(Debug, Clone)]
pub struct ItemFolder {
    pub path: PathBuf,
    pub section: String,
    pub category: String,
    pub media_type: String,
}

/// A folder (or file) that could not be processed; the run continues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkipNote {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct Discovery {
    pub items: Vec<ItemFolder>,
    pub skipped: Vec<SkipNote>,
    /// True when the folder cap stopped discovery early.
    pub truncated: bool,
}

/// Walk a library root and queue item folders.
///
/// Top-level directories are sections. Sections listed as categorized
/// hold category subdirectories whose children are item candidates;
/// everywhere else the section's own children are the candidates,
/// tagged with the section name as their category.
///
/// A missing root is fatal; a malformed candidate is skipped and noted.
pub fn discover(root: &Path, config: &IngestConfig) -> Result<Discovery, WalkError> {
    if !root.exists() {
        return Err(WalkError::RootMissing(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(WalkError::NotADirectory(root.to_path_buf()));
    }

    let mut out = Discovery::default();

    for section in subdirectories(root)? {
        if out.truncated {
            break;
        }
        let section_name = dir_name(&section);
        let media_type = config.media_type_for(&section_name).to_string();

        if config.is_categorized(&section_name) {
            match subdirectories(&section) {
                Ok(categories) => {
                    for category in categories {
                        if out.truncated {
                            break;
                        }
                        let category_name = dir_name(&category);
                        collect_items(
                            &category,
                            &section_name,
                            &category_name,
                            &media_type,
                            config,
                            &mut out,
                        );
                    }
                }
                Err(e) => out.skipped.push(SkipNote {
                    path: section.clone(),
                    reason: e.to_string(),
                }),
            }
        } else {
            collect_items(
                &section,
                &section_name,
                &section_name,
                &media_type,
                config,
                &mut out,
            );
        }
    }

    Ok(out)
}

fn collect_items(
    parent: &Path,
    section: &str,
    category: &str,
    media_type: &str,
    config: &IngestConfig,
    out: &mut Discovery,
) {
    let candidates = match subdirectories(parent) {
        Ok(candidates) => candidates,
        Err(e) => {
            out.skipped.push(SkipNote {
                path: parent.to_path_buf(),
                reason: e.to_string(),
            });
            return;
        }
    };

    for candidate in candidates {
        if out.items.len() >= config.folder_cap {
            out.truncated = true;
            return;
        }

        match qualifying_subfolders(&candidate) {
            // Collections expand exactly one level; sub-subfolders are
            // not re-checked for collection-ness.
            Ok(subfolders) if subfolders.len() >= 2 => {
                for subfolder in subfolders {
                    if out.items.len() >= config.folder_cap {
                        out.truncated = true;
                        return;
                    }
                    out.items.push(item(subfolder, section, category, media_type));
                }
            }
            Ok(_) => out.items.push(item(candidate, section, category, media_type)),
            Err(e) => out.skipped.push(SkipNote {
                path: candidate,
                reason: e.to_string(),
            }),
        }
    }
}

fn item(path: PathBuf, section: &str, category: &str, media_type: &str) -> ItemFolder {
    ItemFolder {
        path,
        section: section.to_string(),
        category: category.to_string(),
        media_type: media_type.to_string(),
    }
}

/// Classify a candidate folder: ≥2 immediate subfolders with book-like
/// content make it a collection.
pub fn classify(dir: &Path) -> io::Result<FolderKind> {
    Ok(if qualifying_subfolders(dir)?.len() >= 2 {
        FolderKind::Collection
    } else {
        FolderKind::Single
    })
}

fn qualifying_subfolders(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut qualifying = Vec::new();
    for subfolder in subdirectories(dir)? {
        if has_book_content(&subfolder)? {
            qualifying.push(subfolder);
        }
    }
    Ok(qualifying)
}

/// Book-like content: a description file (description.txt or any .rtf)
/// or at least one media file (.mp4, .mp3, .png).
fn has_book_content(dir: &Path) -> io::Result<bool> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_lowercase();
        if name == "description.txt" {
            return Ok(true);
        }
        if let Some(ext) = name.rsplit('.').next() {
            if matches!(ext, "rtf" | "mp4" | "mp3" | "png") {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

fn subdirectories(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|e| e.path())
        .filter(|p| !is_hidden(p))
        .collect();
    dirs.sort();
    Ok(dirs)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

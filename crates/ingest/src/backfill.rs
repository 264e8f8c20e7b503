//! One-off backfill for already-persisted records whose folders used the
//! legacy `Screenshot (n).png` naming. The double-space variant is a known
//! data-quality quirk in old material and is tolerated here, nowhere else.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use bookdex_core::{AssetCatalog, BookRecord, PageEntry, Provenance};

use crate::pages::encode_viewer_path;

static LEGACY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^Screenshot\s*\((\d+)\)\.png$", // Screenshot (1).png / Screenshot  (1).png
        r"^Screenshot\s+(\d+)\.png$",     // Screenshot 1.png
        r"^Screenshot.*?(\d+)\.png$",     // anything else screenshot-shaped
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Rebuild a page sequence from legacy screenshot names in a persisted
/// asset catalog. Screenshot 1 is the cover/table of contents; content
/// pages renumber from 1.
pub fn legacy_sequence(files: &AssetCatalog, folder_path: &str) -> Vec<PageEntry> {
    let mut numbered: Vec<(u32, &str)> = files
        .images
        .iter()
        .filter_map(|name| {
            LEGACY_PATTERNS
                .iter()
                .find_map(|re| re.captures(name))
                .and_then(|c| c[1].parse().ok())
                .map(|n| (n, name.as_str()))
        })
        .collect();
    numbered.sort_by_key(|(n, _)| *n);

    numbered
        .iter()
        .map(|(number, name)| {
            let is_cover = *number == 1;
            let page_number = if is_cover { 0 } else { number - 1 };
            PageEntry {
                page_number,
                file_path: encode_viewer_path(&Path::new(folder_path).join(*name)),
                file_name: name.to_string(),
                is_cover,
                is_left_page: false,
                display_name: if is_cover {
                    "Cover/TOC".to_string()
                } else {
                    format!("Page {}", page_number)
                },
                source_number: Some(*number),
            }
        })
        .collect()
}

/// Fill in a missing page sequence on one provenance blob. Records that
/// already carry a non-empty sequence are left alone.
pub fn backfill_provenance(provenance: &mut Provenance) -> bool {
    if !provenance.page_sequence.is_empty() {
        return false;
    }

    let sequence = legacy_sequence(&provenance.files, &provenance.folder_path);
    if sequence.is_empty() {
        return false;
    }

    provenance.total_pages = sequence.iter().filter(|p| !p.is_cover).count() as u32;
    provenance.page_sequence = sequence;
    true
}

/// Backfill a batch of records, returning how many changed.
pub fn backfill_records(records: &mut [BookRecord]) -> usize {
    let mut fixed = 0;
    for record in records.iter_mut() {
        if backfill_provenance(&mut record.provenance) {
            fixed += 1;
        }
    }
    fixed
}

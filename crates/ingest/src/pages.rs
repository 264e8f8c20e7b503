use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::fs;
use std::path::{Path, PathBuf};

use bookdex_core::PageEntry;

/// The sequence is consumed by a URL-based viewer: spaces must be
/// percent-encoded and separators forward slashes.
const VIEWER_ENCODE: &AsciiSet = &CONTROLS.add(b' ');

pub fn encode_viewer_path(path: &Path) -> String {
    let raw = path.to_string_lossy().replace('\\', "/");
    utf8_percent_encode(&raw, VIEWER_ENCODE).to_string()
}

/// Reconstruct the ordered page sequence for an item folder.
///
/// Three mutually exclusive strategies, tried in order; the first that
/// yields at least one entry wins:
/// 1. resized/crop-1.png, crop-2.png, ... (contiguous probe),
/// 2. screenshot 1.png, screenshot 2.png, ... in the folder root,
/// 3. every other .png, sorted case-insensitively and renumbered from 1.
/// No strategy firing yields an empty sequence, not an error.
pub fn page_sequence(dir: &Path) -> Vec<PageEntry> {
    let pages = crop_sequence(dir);
    if !pages.is_empty() {
        return pages;
    }
    let pages = screenshot_sequence(dir);
    if !pages.is_empty() {
        return pages;
    }
    generic_sequence(dir)
}

fn crop_sequence(dir: &Path) -> Vec<PageEntry> {
    numbered_entries(numbered_probe(&dir.join("resized"), |n| {
        format!("crop-{}.png", n)
    }))
}

fn screenshot_sequence(dir: &Path) -> Vec<PageEntry> {
    numbered_entries(numbered_probe(dir, |n| format!("screenshot {}.png", n)))
}

/// Probe name(1), name(2), ... stopping at the first missing number.
/// Gaps end the sequence; numbering is preserved as found.
fn numbered_probe(dir: &Path, name_for: impl Fn(u32) -> String) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut n = 1u32;
    loop {
        let path = dir.join(name_for(n));
        if !path.is_file() {
            break;
        }
        found.push(path);
        n += 1;
    }
    found
}

fn numbered_entries(files: Vec<PathBuf>) -> Vec<PageEntry> {
    files
        .iter()
        .enumerate()
        .map(|(index, path)| page_entry(index as u32 + 1, index, path))
        .collect()
}

fn generic_sequence(dir: &Path) -> Vec<PageEntry> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|name| {
            let lower = name.to_lowercase();
            !name.starts_with('.')
                && lower.ends_with(".png")
                && lower != "cover.png"
                && lower != "thumbnail.png"
        })
        .collect();
    names.sort_by_key(|n| n.to_lowercase());

    names
        .iter()
        .enumerate()
        .map(|(index, name)| page_entry(index as u32 + 1, index, &dir.join(name)))
        .collect()
}

fn page_entry(number: u32, index: usize, path: &Path) -> PageEntry {
    PageEntry {
        page_number: number,
        file_path: encode_viewer_path(path),
        file_name: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        is_cover: number == 1,
        is_left_page: index % 2 == 0,
        display_name: if number == 1 {
            "Cover".to_string()
        } else {
            format!("Page {}", number)
        },
        source_number: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn crop_probe_stops_at_gap() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("resized").join("crop-1.png"));
        touch(&dir.path().join("resized").join("crop-2.png"));
        touch(&dir.path().join("resized").join("crop-4.png")); // gap at 3

        let pages = page_sequence(dir.path());

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].page_number, 1);
        assert!(pages[0].is_cover);
        assert_eq!(pages[0].display_name, "Cover");
        assert_eq!(pages[1].page_number, 2);
        assert!(!pages[1].is_cover);
        assert_eq!(pages[1].display_name, "Page 2");
    }

    #[test]
    fn crop_strategy_shadows_later_strategies() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("resized").join("crop-1.png"));
        touch(&dir.path().join("screenshot 1.png"));
        touch(&dir.path().join("unrelated.png"));

        let pages = page_sequence(dir.path());

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].file_name, "crop-1.png");
    }

    #[test]
    fn screenshot_strategy_shadows_generic() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("screenshot 1.png"));
        touch(&dir.path().join("screenshot 2.png"));
        touch(&dir.path().join("unrelated.png"));

        let pages = page_sequence(dir.path());

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].file_name, "screenshot 1.png");
        assert_eq!(pages[1].file_name, "screenshot 2.png");
    }

    #[test]
    fn generic_fallback_sorts_and_excludes_cover() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("b.png"));
        touch(&dir.path().join("a.png"));
        touch(&dir.path().join("cover.png"));

        let pages = page_sequence(dir.path());

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].file_name, "a.png");
        assert_eq!(pages[0].page_number, 1);
        assert!(pages[0].is_cover);
        assert_eq!(pages[1].file_name, "b.png");
        assert_eq!(pages[1].page_number, 2);
        assert!(!pages[1].is_cover);
    }

    #[test]
    fn no_images_yields_empty_sequence() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("description.txt"));

        let pages = page_sequence(dir.path());
        assert!(pages.is_empty());
        assert!(!pages.iter().any(|p| p.is_cover));
    }

    #[test]
    fn left_right_alternation_starts_left() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("resized").join("crop-1.png"));
        touch(&dir.path().join("resized").join("crop-2.png"));
        touch(&dir.path().join("resized").join("crop-3.png"));

        let pages = page_sequence(dir.path());

        assert!(pages[0].is_left_page);
        assert!(!pages[1].is_left_page);
        assert!(pages[2].is_left_page);
    }

    #[test]
    fn paths_are_viewer_encoded() {
        let dir = TempDir::new().unwrap();
        let book = dir.path().join("A Gift for Sophie");
        touch(&book.join("screenshot 1.png"));

        let pages = page_sequence(&book);

        assert_eq!(pages.len(), 1);
        assert!(pages[0].file_path.contains("A%20Gift%20for%20Sophie"));
        assert!(pages[0].file_path.ends_with("screenshot%201.png"));
        assert!(!pages[0].file_path.contains('\\'));
        // The raw filename stays readable.
        assert_eq!(pages[0].file_name, "screenshot 1.png");
    }

    #[test]
    fn screenshot_probe_is_lowercase_exact() {
        let dir = TempDir::new().unwrap();
        // Legacy parenthesized names do not satisfy the primary probe;
        // they fall through to the generic strategy.
        touch(&dir.path().join("Screenshot (1).png"));
        touch(&dir.path().join("Screenshot (2).png"));

        let pages = page_sequence(dir.path());

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].file_name, "Screenshot (1).png");
        assert!(pages[0].is_cover);
    }
}

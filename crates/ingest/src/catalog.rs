use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use bookdex_core::{AssetCatalog, AssetKind};

/// Inventory the files directly inside an item folder (one level, no
/// recursion), bucketed by extension.
pub fn catalog_assets(dir: &Path) -> anyhow::Result<AssetCatalog> {
    let mut catalog = AssetCatalog::default();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        let kind = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .map(AssetKind::from_extension)
            .unwrap_or(AssetKind::Other);
        catalog.insert(kind, name);
    }

    catalog.normalize();
    Ok(catalog)
}

const COVER_NAMES: &[&str] = &["cover.jpg", "cover.png", "cover.jpeg"];

/// Locate the canonical cover image. Tiers are tried in order and the
/// first hit wins:
/// 1-2. cover.jpg (then the other cover.* spellings) in the folder,
/// 3. the same names inside resized/, else resized/crop-1.png,
/// 4. "Screenshot (1).png",
/// 5. any cataloged image whose name contains "cover",
/// 6. the first image in the folder, else the first image in resized/.
/// No cover is not an error.
pub fn find_cover(dir: &Path, catalog: &AssetCatalog) -> Option<PathBuf> {
    for name in COVER_NAMES {
        let path = dir.join(name);
        if path.is_file() {
            return Some(path);
        }
    }

    let resized = dir.join("resized");
    if resized.is_dir() {
        for name in COVER_NAMES {
            let path = resized.join(name);
            if path.is_file() {
                return Some(path);
            }
        }
        let crop = resized.join("crop-1.png");
        if crop.is_file() {
            return Some(crop);
        }
    }

    let screenshot = dir.join("Screenshot (1).png");
    if screenshot.is_file() {
        return Some(screenshot);
    }

    let mut images: Vec<&String> = catalog.images.iter().collect();
    images.sort_by_key(|n| n.to_lowercase());

    if let Some(named_cover) = images
        .iter()
        .find(|n| n.to_lowercase().contains("cover"))
    {
        return Some(dir.join(named_cover.as_str()));
    }
    if let Some(first) = images.first() {
        return Some(dir.join(first.as_str()));
    }

    // Nothing at the folder root; fall back to resized/ contents.
    if resized.is_dir() {
        let mut resized_images: Vec<String> = fs::read_dir(&resized)
            .ok()?
            .filter_map(Result::ok)
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|n| {
                !n.starts_with('.')
                    && Path::new(n)
                        .extension()
                        .and_then(|e| e.to_str())
                        .map(|e| AssetKind::from_extension(e) == AssetKind::Image)
                        .unwrap_or(false)
            })
            .collect();
        resized_images.sort_by_key(|n| n.to_lowercase());
        if let Some(first) = resized_images.first() {
            return Some(resized.join(first));
        }
    }

    None
}

use anyhow::Context;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::Read;
use std::path::Path;

use bookdex_core::Fragment;

/// Formats with embedded properties we can read.
pub fn supported(path: &Path) -> bool {
    matches!(
        extension(path).as_deref(),
        Some("pdf") | Some("epub") | Some("docx")
    )
}

/// Read embedded document properties (title/author/subject). Purely
/// format-specific; no merge logic lives here.
pub fn extract_properties(path: &Path) -> anyhow::Result<Fragment> {
    match extension(path).as_deref() {
        Some("pdf") => pdf_properties(path),
        Some("epub") => epub_properties(path),
        Some("docx") => docx_properties(path),
        _ => Ok(Fragment::new()),
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

fn pdf_properties(path: &Path) -> anyhow::Result<Fragment> {
    let doc = lopdf::Document::load(path)?;

    let info_dict = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|info| info.as_reference().ok())
        .and_then(|info_ref| doc.get_dictionary(info_ref).ok());

    let get_string = |dict: &lopdf::Dictionary, key: &[u8]| -> Option<String> {
        dict.get(key)
            .ok()
            .and_then(|v| v.as_str().ok())
            .map(|s| String::from_utf8_lossy(s).to_string())
            .filter(|s| !s.trim().is_empty())
    };

    let mut frag = Fragment::new();
    if let Some(dict) = info_dict {
        if let Some(title) = get_string(dict, b"Title") {
            frag.set("title", title);
        }
        if let Some(author) = get_string(dict, b"Author") {
            frag.set("author", author);
        }
        if let Some(subject) = get_string(dict, b"Subject") {
            frag.set("subject", subject);
        }
    }
    Ok(frag)
}

fn epub_properties(path: &Path) -> anyhow::Result<Fragment> {
    let doc = epub::doc::EpubDoc::new(path)?;

    let mut frag = Fragment::new();
    if let Some(title) = doc.mdata("title") {
        frag.set("title", title.value.clone());
    }
    if let Some(author) = doc.mdata("creator") {
        frag.set("author", author.value.clone());
    }
    if let Some(subject) = doc.mdata("subject") {
        frag.set("subject", subject.value.clone());
    }
    Ok(frag)
}

/// DOCX keeps its Dublin Core properties in docProps/core.xml inside the
/// zip container.
fn docx_properties(path: &Path) -> anyhow::Result<Fragment> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut xml = String::new();
    archive
        .by_name("docProps/core.xml")
        .context("docProps/core.xml missing")?
        .read_to_string(&mut xml)?;

    let mut reader = Reader::from_str(&xml);
    reader.config_mut().trim_text(true);

    let mut frag = Fragment::new();
    let mut current: Option<&'static str> = None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                current = match local_name(e.name().as_ref()) {
                    b"title" => Some("title"),
                    b"creator" => Some("author"),
                    b"subject" => Some("subject"),
                    _ => None,
                };
                text.clear();
            }
            Ok(Event::Text(e)) => {
                if current.is_some() {
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::End(_)) => {
                if let Some(field) = current.take() {
                    let value = text.trim();
                    if !value.is_empty() {
                        frag.set(field, value);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => anyhow::bail!("core.xml parse error: {}", e),
            _ => {}
        }
    }

    Ok(frag)
}

fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().rposition(|&b| b == b':') {
        Some(i) => &name[i + 1..],
        None => name,
    }
}
